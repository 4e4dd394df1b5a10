use std::cell::Cell;
use std::fs;
use std::io;
use std::rc::Rc;

use qcsv::{
    Config, EscapeMode, Error, Reader, ReaderBuilder, Terminator, Writer,
    WriterBuilder,
};

fn read_all(data: &str, builder: &ReaderBuilder) -> Vec<Vec<String>> {
    let mut rdr = builder.from_reader(data.as_bytes());
    rdr.records().map(|r| r.unwrap().to_vec()).collect()
}

fn write_all(records: &[Vec<&str>], builder: &WriterBuilder) -> String {
    let mut wtr = builder.from_writer(vec![]);
    for record in records {
        wtr.write_record(record).unwrap();
    }
    String::from_utf8(wtr.into_inner().unwrap()).unwrap()
}

/// A source that hands out `data` once and then fails, and remembers being
/// dropped.
struct Flaky {
    data: Option<&'static [u8]>,
    dropped: Rc<Cell<bool>>,
}

impl io::Read for Flaky {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.take() {
            Some(data) => {
                buf[..data.len()].copy_from_slice(data);
                Ok(data.len())
            }
            None => Err(io::Error::new(io::ErrorKind::Other, "disk on fire")),
        }
    }
}

impl Drop for Flaky {
    fn drop(&mut self) {
        self.dropped.set(true);
    }
}

#[test]
fn single_record() {
    let mut rdr = Reader::parse("1,2");
    assert!(rdr.read_record().unwrap());
    assert_eq!(vec!["1", "2"], rdr.record().unwrap().to_vec());
    assert_eq!("1,2", rdr.raw_record().unwrap());
    assert_eq!(Some(0), rdr.current_record());
    assert!(!rdr.read_record().unwrap());
}

#[test]
fn qualified_field_with_doubled_quotes() {
    let got = read_all("\"bob said, \"\"Hey!\"\"\",2, 3 ", &ReaderBuilder::new());
    assert_eq!(vec![vec!["bob said, \"Hey!\"", "2", "3"]], got);
}

#[test]
fn lookup_by_header_name() {
    let mut rdr = Reader::parse("user_id,name\r\n1,Bruce");
    assert!(rdr.read_headers().unwrap());
    assert!(rdr.read_record().unwrap());
    assert_eq!("1", rdr.get_by_name("user_id").unwrap());
    assert_eq!("Bruce", rdr.get_by_name("name").unwrap());
}

#[test]
fn writer_qualifies_only_when_needed() {
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write("1,2").unwrap();
    wtr.write("3").unwrap();
    wtr.end_record().unwrap();
    assert_eq!(b"\"1,2\",3\r\n", &wtr.into_inner().unwrap()[..]);
}

#[test]
fn empty_line_is_not_a_record() {
    let mut rdr = Reader::parse("1\n\n2");
    assert!(rdr.read_record().unwrap());
    assert_eq!(("1", Some(0)), (rdr.get(0).unwrap(), rdr.current_record()));
    assert!(rdr.read_record().unwrap());
    assert_eq!(("2", Some(1)), (rdr.get(0).unwrap(), rdr.current_record()));
    assert!(!rdr.read_record().unwrap());
}

#[test]
fn round_trip_plain() {
    let records = vec![vec!["a", "b", "c"], vec!["1", "2", "3"]];
    let out = write_all(&records, &WriterBuilder::new());
    assert_eq!("a,b,c\r\n1,2,3\r\n", out);
    assert_eq!(records, read_all(&out, &ReaderBuilder::new()));
}

#[test]
fn round_trip_doubled() {
    let records = vec![
        vec!["say \"hi\"", "a,b", "x"],
        vec!["multi\r\nline", "#", "\"\""],
    ];
    let out = write_all(&records, &WriterBuilder::new());
    assert_eq!(records, read_all(&out, &ReaderBuilder::new()));
}

#[test]
fn round_trip_backslash() {
    let records = vec![
        vec!["a,b", "say \"hi\"", "c:\\temp"],
        vec!["#lead", "back\\\\slash", "plain"],
    ];
    let mut wb = WriterBuilder::new();
    wb.escape_mode(EscapeMode::Backslash);
    let mut rb = ReaderBuilder::new();
    rb.escape_mode(EscapeMode::Backslash);
    let out = write_all(&records, &wb);
    assert_eq!(records, read_all(&out, &rb));

    wb.use_qualifier(false);
    rb.use_qualifier(false);
    let out = write_all(&records, &wb);
    assert_eq!(records, read_all(&out, &rb));
}

#[test]
fn round_trip_custom_dialect() {
    let mut config = Config::default();
    config.delimiter = '\t';
    config.qualifier = '\'';
    config.terminator = Terminator::Any('|');
    let records = vec![vec!["it's", "a\tb"], vec!["c|d", "e"]];
    let out = write_all(&records, &WriterBuilder::from_config(config.clone()));
    assert_eq!("'it''s'\t'a\tb'|'c|d'\te|", out);
    assert_eq!(records, read_all(&out, &ReaderBuilder::from_config(config)));
}

#[test]
fn comments_survive_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comments.csv");

    let mut wtr = Writer::from_path(&path).unwrap();
    wtr.write_comment("generated").unwrap();
    wtr.write_record(&["#1", "2"]).unwrap();
    wtr.close().unwrap();
    assert_eq!(
        "#generated\r\n\"#1\",2\r\n",
        fs::read_to_string(&path).unwrap()
    );

    let mut rdr = ReaderBuilder::new().use_comments(true).from_path(&path).unwrap();
    assert!(rdr.read_record().unwrap());
    assert_eq!(vec!["#1", "2"], rdr.record().unwrap().to_vec());
    assert!(rdr.is_qualified(0).unwrap());
    assert_eq!(2, rdr.record().unwrap().position().unwrap().line());
    assert!(!rdr.read_record().unwrap());
}

#[test]
fn open_with_charset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin1.csv");

    let mut wtr = Writer::open(&path, ';', "latin1").unwrap();
    wtr.write_record(&["café", "ü,1"]).unwrap();
    wtr.close().unwrap();
    assert_eq!(b"caf\xe9;\xfc,1\r\n", &fs::read(&path).unwrap()[..]);

    let mut rdr = Reader::open(&path, ';', "latin1").unwrap();
    assert!(rdr.read_record().unwrap());
    assert_eq!(vec!["café", "ü,1"], rdr.record().unwrap().to_vec());

    // Decoding the same bytes as UTF-8 replaces them.
    let mut rdr = Reader::open(&path, ';', "utf-8").unwrap();
    assert!(rdr.read_record().unwrap());
    assert_eq!("caf\u{FFFD}", rdr.get(0).unwrap());
}

#[test]
fn utf8_bom_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bom.csv");
    fs::write(&path, b"\xef\xbb\xbfa,b\n").unwrap();

    let mut rdr = Reader::from_path(&path).unwrap();
    assert!(rdr.read_record().unwrap());
    assert_eq!(vec!["a", "b"], rdr.record().unwrap().to_vec());
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.csv");
    match Reader::from_path(&path) {
        Err(Error::FileNotFound { path: got }) => assert_eq!(path, got),
        res => panic!("unexpected result: {:?}", res.map(|_| ())),
    }
}

#[test]
fn invalid_arguments() {
    match Reader::open("", ',', "utf-8") {
        Err(Error::Argument { parameter: "path", .. }) => {}
        res => panic!("unexpected result: {:?}", res.map(|_| ())),
    }
    match Writer::open("", ',', "utf-8") {
        Err(Error::Argument { parameter: "path", .. }) => {}
        res => panic!("unexpected result: {:?}", res.map(|_| ())),
    }
    match Reader::open("data.csv", ',', "no-such-charset") {
        Err(err @ Error::Argument { parameter: "charset", .. }) => {
            assert!(!err.is_io_error());
        }
        res => panic!("unexpected result: {:?}", res.map(|_| ())),
    }
    match Writer::open("data.csv", ',', "") {
        Err(Error::Argument { parameter: "charset", .. }) => {}
        res => panic!("unexpected result: {:?}", res.map(|_| ())),
    }
}

#[test]
fn failing_source_is_released() {
    let dropped = Rc::new(Cell::new(false));
    let src = Flaky { data: Some(b"a,b\n"), dropped: dropped.clone() };
    let mut rdr = Reader::from_reader(src);
    assert!(rdr.read_record().unwrap());
    assert!(!dropped.get());

    let err = rdr.read_record().unwrap_err();
    assert!(err.is_io_error());
    assert!(matches!(err, Error::Io(_)));
    assert!(rdr.is_closed());
    assert!(dropped.get());
    assert!(matches!(rdr.read_record(), Err(Error::Closed { .. })));
    assert_eq!(Some(0), rdr.current_record());
}

#[test]
fn records_iterator_stops_after_failure() {
    let dropped = Rc::new(Cell::new(false));
    let src = Flaky { data: Some(b"1\n2\n"), dropped };
    let mut rdr = Reader::from_reader(src);
    let results: Vec<_> = rdr.records().collect();
    assert_eq!(3, results.len());
    assert_eq!(vec!["1"], results[0].as_ref().unwrap().to_vec());
    assert_eq!(vec!["2"], results[1].as_ref().unwrap().to_vec());
    assert!(matches!(results[2], Err(Error::Io(_))));
}

#[test]
fn safety_errors_keep_the_reader_open() {
    let data = format!("{}\nok", "a".repeat(100_001));
    let mut rdr = Reader::parse(&data);
    let err = rdr.read_record().unwrap_err();
    assert!(err.is_io_error());
    assert!(!rdr.is_closed());
    rdr.skip_line().unwrap();
    assert!(rdr.read_record().unwrap());
    assert_eq!("ok", rdr.get(0).unwrap());
}

#[test]
fn close_twice() {
    let mut rdr = Reader::parse("1");
    rdr.close();
    rdr.close();

    let mut wtr = Writer::from_writer(vec![]);
    wtr.close().unwrap();
    wtr.close().unwrap();
    assert!(matches!(wtr.write("x"), Err(Error::Closed { stream: "writer" })));
    assert!(matches!(wtr.end_record(), Err(Error::Closed { .. })));
    assert!(matches!(wtr.flush(), Err(Error::Closed { .. })));
}

#[test]
fn comment_char_is_data_when_comments_off() {
    let mut rdr = Reader::parse("city,pop\n# not a comment, since comments are off\n");
    rdr.read_headers().unwrap();
    let mut wtr = Writer::from_writer(vec![]);
    while rdr.read_record().unwrap() {
        wtr.write(rdr.get_by_name("city").unwrap()).unwrap();
        wtr.write(rdr.get_by_name("pop").unwrap()).unwrap();
        wtr.end_record().unwrap();
    }
    let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
    assert_eq!("\"# not a comment\",since comments are off\r\n", out);
}
