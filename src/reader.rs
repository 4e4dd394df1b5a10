use std::fs::File;
use std::io;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use log::debug;
use qcsv_core::{Action, Dialect, EscapeMode, Reader as CoreReader, Terminator};

use crate::buffer::{encoding_for_label, Buffer, DEFAULT_BUFFER_CAPACITY};
use crate::config::{Config, MAX_COLUMN_COUNT, MAX_COLUMN_LENGTH};
use crate::error::{Error, Result};
use crate::headers::HeaderIndex;
use crate::record::{Position, Record};

/// Builds a CSV reader with various configuration knobs.
///
/// Every knob sets the corresponding field of a [`Config`]. The built reader
/// owns its configuration, which stays adjustable through
/// [`Reader::config_mut`].
#[derive(Debug)]
pub struct ReaderBuilder {
    config: Config,
    encoding: &'static Encoding,
    capacity: usize,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder::from_config(Config::default())
    }
}

impl ReaderBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Create a new builder that starts from the given configuration.
    pub fn from_config(config: Config) -> ReaderBuilder {
        ReaderBuilder {
            config,
            encoding: UTF_8,
            capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    /// Build a CSV reader from this configuration that reads data from `rdr`.
    ///
    /// The source is buffered and decoded for you.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Reader<R> {
        Reader::new(self, rdr)
    }

    /// Build a CSV reader from this configuration that reads data from the
    /// file at `path`.
    ///
    /// An empty path is rejected and a missing file is reported as
    /// `Error::FileNotFound`.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Reader<File>> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::argument("path", "must not be empty"));
        }
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => {
                Error::FileNotFound { path: path.to_path_buf() }
            }
            _ => Error::Io(err),
        })?;
        debug!(
            "opened {} for reading as {}",
            path.display(),
            self.encoding.name()
        );
        Ok(Reader::new(self, file))
    }

    /// The field delimiter. The default is `,`.
    pub fn delimiter(&mut self, delimiter: char) -> &mut ReaderBuilder {
        self.config.delimiter = delimiter;
        self
    }

    /// The text qualifier. The default is `"`.
    pub fn qualifier(&mut self, qualifier: char) -> &mut ReaderBuilder {
        self.config.qualifier = qualifier;
        self
    }

    /// Whether text qualifiers are recognized. Enabled by default.
    ///
    /// When disabled, qualifier chars are ordinary field content.
    pub fn use_qualifier(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.config.use_qualifier = yes;
        self
    }

    /// How escapes are recognized. The default is `EscapeMode::Doubled`.
    pub fn escape_mode(&mut self, mode: EscapeMode) -> &mut ReaderBuilder {
        self.config.escape_mode = mode;
        self
    }

    /// The record terminator.
    ///
    /// The default is `Terminator::CRLF`, which treats any occurrence of
    /// `\r`, `\n` or `\r\n` as a single record terminator.
    pub fn terminator(&mut self, term: Terminator) -> &mut ReaderBuilder {
        self.config.terminator = term;
        self
    }

    /// The comment char. The default is `#`.
    pub fn comment(&mut self, comment: char) -> &mut ReaderBuilder {
        self.config.comment = comment;
        self
    }

    /// Whether lines starting with the comment char are skipped. Disabled by
    /// default.
    pub fn use_comments(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.config.use_comments = yes;
        self
    }

    /// Whether header lookups by name are case sensitive. Enabled by
    /// default.
    pub fn case_sensitive(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.config.case_sensitive = yes;
        self
    }

    /// Whether spaces and tabs around unqualified fields are dropped.
    /// Enabled by default.
    pub fn trim_whitespace(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.config.trim_whitespace = yes;
        self
    }

    /// Whether lines without any chars are skipped. Enabled by default.
    pub fn skip_empty_records(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.config.skip_empty_records = yes;
        self
    }

    /// Whether the source text of each record is kept. Enabled by default.
    pub fn capture_raw_record(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.config.capture_raw_record = yes;
        self
    }

    /// Whether field length and field count limits are enforced. Enabled by
    /// default.
    pub fn safety_switch(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.config.safety_switch = yes;
        self
    }

    /// The encoding of the source. The default is UTF-8.
    ///
    /// A byte order mark overrides this.
    pub fn encoding(&mut self, encoding: &'static Encoding) -> &mut ReaderBuilder {
        self.encoding = encoding;
        self
    }

    /// The initial size of the read buffer in chars. The default is 1024.
    ///
    /// The buffer grows on its own when a record does not fit.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ReaderBuilder {
        self.capacity = capacity;
        self
    }
}

/// A streaming CSV reader.
///
/// Each call to [`read_record`](Reader::read_record) parses one record and
/// makes it available through [`get`](Reader::get),
/// [`get_by_name`](Reader::get_by_name), [`record`](Reader::record) and
/// friends until the next call. `Ok(false)` means the source is exhausted.
///
/// Once [`close`](Reader::close)d, the source is released and every call that
/// touches record or header data fails with `Error::Closed`. A reader is also
/// closed when its source fails.
///
/// # Example
///
/// ```
/// use std::error::Error;
/// use qcsv::Reader;
///
/// # fn main() { example().unwrap(); }
/// fn example() -> Result<(), Box<dyn Error>> {
///     let mut rdr = Reader::parse("user_id,name\r\n1,Bruce");
///     rdr.read_headers()?;
///     assert!(rdr.read_record()?);
///     assert_eq!(rdr.get_by_name("user_id")?, "1");
///     assert_eq!(rdr.get_by_name("name")?, "Bruce");
///     assert_eq!(rdr.current_record(), Some(0));
///     assert!(!rdr.read_record()?);
///     Ok(())
/// }
/// ```
pub struct Reader<R> {
    config: Config,
    core: CoreReader,
    /// `None` once the reader is closed.
    buf: Option<Buffer<R>>,
    state: ReaderState,
    record: Record,
    headers: Option<HeaderIndex>,
}

#[derive(Debug)]
struct ReaderState {
    /// The text of the field in progress copied out of the buffer so far.
    field: String,
    /// The number of chars in the field in progress.
    field_len: usize,
    /// Trailing whitespace before this byte offset of `field` came from
    /// escapes and is never trimmed.
    trim_floor: usize,
    /// The number of records returned by `read_record`.
    records: u64,
    /// The position of the next unread char.
    pos: Position,
}

impl<'a> Reader<&'a [u8]> {
    /// Create a reader with the default configuration over in-memory text.
    pub fn parse(data: &'a str) -> Reader<&'a [u8]> {
        ReaderBuilder::new().from_reader(data.as_bytes())
    }
}

impl Reader<File> {
    /// Create a reader with the default configuration over the UTF-8 file at
    /// `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File>> {
        ReaderBuilder::new().from_path(path)
    }

    /// Create a reader over the file at `path` with the given delimiter and
    /// the encoding named by `charset`, e.g. `"utf-8"` or `"latin1"`.
    pub fn open<P: AsRef<Path>>(
        path: P,
        delimiter: char,
        charset: &str,
    ) -> Result<Reader<File>> {
        let encoding = encoding_for_label(charset)?;
        ReaderBuilder::new()
            .delimiter(delimiter)
            .encoding(encoding)
            .from_path(path)
    }
}

impl<R: io::Read> Reader<R> {
    /// Create a reader with the default configuration over UTF-8 data read
    /// from `rdr`.
    pub fn from_reader(rdr: R) -> Reader<R> {
        ReaderBuilder::new().from_reader(rdr)
    }

    fn new(builder: &ReaderBuilder, rdr: R) -> Reader<R> {
        builder.config.warn_ambiguities("reader");
        Reader {
            config: builder.config.clone(),
            core: CoreReader::new(builder.config.dialect()),
            buf: Some(Buffer::new(rdr, builder.encoding, builder.capacity)),
            state: ReaderState {
                field: String::new(),
                field_len: 0,
                trim_floor: 0,
                records: 0,
                pos: Position::new(),
            },
            record: Record::new(),
            headers: None,
        }
    }

    /// Read the next record.
    ///
    /// Returns `Ok(false)` when there are no more records. Records that only
    /// consist of a line terminator are skipped unless
    /// `skip_empty_records` is disabled, and comment lines are always
    /// skipped when comments are enabled.
    pub fn read_record(&mut self) -> Result<bool> {
        let read = self.read_or_release()?;
        if read {
            self.state.records += 1;
        }
        Ok(read)
    }

    /// Read the next record and use it as the header index.
    ///
    /// The record does not count towards `current_record`.
    pub fn read_headers(&mut self) -> Result<bool> {
        let read = self.read_or_release()?;
        if read {
            self.headers = Some(HeaderIndex::new(self.record.to_vec()));
        }
        Ok(read)
    }

    /// Read the next record without counting it.
    ///
    /// Its fields and raw text stay available until the next read.
    pub fn skip_record(&mut self) -> Result<bool> {
        self.read_or_release()
    }

    /// Discard input up to and including the next line terminator.
    ///
    /// Qualifiers are not interpreted, so this may stop inside a qualified
    /// field. Returns `Ok(false)` if there was nothing left to skip.
    pub fn skip_line(&mut self) -> Result<bool> {
        match self.skip_line_inner() {
            Err(Error::Io(err)) => Err(self.release(err)),
            res => res,
        }
    }

    /// Returns an iterator over the remaining records.
    ///
    /// Each record is an owned copy. The iterator stops after the first
    /// error that closes the reader.
    pub fn records(&mut self) -> RecordsIter<R> {
        RecordsIter { rdr: self, done: false }
    }

    fn read_or_release(&mut self) -> Result<bool> {
        match self.read_inner() {
            Err(Error::Io(err)) => Err(self.release(err)),
            res => res,
        }
    }

    fn release(&mut self, err: io::Error) -> Error {
        debug!("releasing CSV source after read failure: {}", err);
        self.close();
        Error::Io(err)
    }

    fn read_inner(&mut self) -> Result<bool> {
        let buf = match self.buf {
            Some(ref mut buf) => buf,
            None => return Err(Error::Closed { stream: "reader" }),
        };
        let config = &self.config;
        let core = &mut self.core;
        let st = &mut self.state;
        let record = &mut self.record;

        core.set_dialect(config.dialect());
        record.clear();
        st.field.clear();
        st.field_len = 0;
        st.trim_floor = 0;
        buf.line_start = buf.position;
        buf.column_start = buf.position;
        let mut start = st.pos.clone();
        loop {
            let next = if buf.ensure(config.capture_raw_record)? {
                buf.peek()
            } else {
                None
            };
            let (action, consumed) = match next {
                Some(c) => core.transition(c),
                None => (core.finish(), false),
            };
            let at = buf.position;
            let resume = if consumed { at + 1 } else { at };
            match action {
                Action::Keep => {
                    st.field_len += 1;
                    st.check_length(config, record.len())?;
                }
                Action::Skip => {
                    st.flush(buf);
                    buf.column_start = resume;
                }
                Action::Emit(c) => {
                    st.flush(buf);
                    st.field.push(c);
                    st.trim_floor = st.field.len();
                    st.field_len += 1;
                    st.check_length(config, record.len())?;
                    buf.column_start = resume;
                }
                Action::Discard => {
                    buf.line_start = resume;
                    buf.column_start = resume;
                }
                Action::Field { quoted } => {
                    st.flush(buf);
                    st.end_field(config, record, quoted)?;
                    buf.column_start = resume;
                }
                Action::Record { quoted } => {
                    st.flush(buf);
                    st.end_field(config, record, quoted)?;
                    if config.capture_raw_record {
                        record.raw_mut().extend(buf.line(at));
                    }
                    start.set_record(st.records);
                    record.set_position(Some(start));
                    if let (Some(c), true) = (next, consumed) {
                        st.advance(c);
                        buf.position = resume;
                    }
                    buf.line_start = buf.position;
                    buf.column_start = buf.position;
                    return Ok(true);
                }
                Action::End => return Ok(false),
            }
            if let (Some(c), true) = (next, consumed) {
                st.advance(c);
                buf.position = resume;
                if action == Action::Discard {
                    start = st.pos.clone();
                }
            }
        }
    }

    fn skip_line_inner(&mut self) -> Result<bool> {
        let buf = match self.buf {
            Some(ref mut buf) => buf,
            None => return Err(Error::Closed { stream: "reader" }),
        };
        self.record.clear();
        self.core.skip_line();
        let mut skipped = false;
        while !self.core.is_record_start() {
            let next = if buf.ensure(false)? { buf.peek() } else { None };
            let c = match next {
                Some(c) => c,
                None => {
                    self.core.finish();
                    break;
                }
            };
            let (_, consumed) = self.core.transition(c);
            if consumed {
                self.state.advance(c);
                buf.position += 1;
                buf.column_start = buf.position;
                buf.line_start = buf.position;
                skipped = true;
            }
        }
        Ok(skipped)
    }
}

impl<R> Reader<R> {
    /// The configuration of this reader.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A mutable reference to the configuration of this reader.
    ///
    /// Changes apply from the next record on.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Release the source.
    ///
    /// Closing twice is harmless. Afterwards, reads and accessors of record
    /// or header data fail with `Error::Closed`.
    pub fn close(&mut self) {
        if self.buf.take().is_some() {
            debug!("CSV reader closed after {} records", self.state.records);
        }
        self.headers = None;
        self.record.clear();
    }

    /// Returns true if this reader was closed.
    pub fn is_closed(&self) -> bool {
        self.buf.is_none()
    }

    /// The current record.
    pub fn record(&self) -> Result<&Record> {
        self.check_open()?;
        Ok(&self.record)
    }

    /// The value of field `i` of the current record.
    ///
    /// Out of range indices give an empty string.
    pub fn get(&self, i: usize) -> Result<&str> {
        self.check_open()?;
        Ok(self.record.get(i).unwrap_or(""))
    }

    /// The value of the field under header `name` in the current record.
    ///
    /// Unknown names, including any name before headers are set, give an
    /// empty string.
    pub fn get_by_name(&self, name: &str) -> Result<&str> {
        match self.index_of(name)? {
            Some(i) => self.get(i),
            None => Ok(""),
        }
    }

    /// Returns true if field `i` of the current record was enclosed in text
    /// qualifiers.
    pub fn is_qualified(&self, i: usize) -> Result<bool> {
        self.check_open()?;
        Ok(self.record.is_qualified(i))
    }

    /// The source text of the current record, without its terminator.
    ///
    /// This is empty when raw record capture is disabled.
    pub fn raw_record(&self) -> Result<&str> {
        self.check_open()?;
        Ok(self.record.raw())
    }

    /// The number of fields of the current record.
    pub fn column_count(&self) -> usize {
        self.record.len()
    }

    /// The index of the most recent record returned by `read_record`.
    ///
    /// `None` before the first record.
    pub fn current_record(&self) -> Option<u64> {
        self.state.records.checked_sub(1)
    }

    /// The position of the next unread char.
    pub fn position(&self) -> &Position {
        &self.state.pos
    }

    /// The header names, if headers were read or set.
    pub fn headers(&self) -> Result<Option<&[String]>> {
        self.check_open()?;
        Ok(self.headers.as_ref().map(|h| h.names()))
    }

    /// Replace the header names, or clear them with `None`.
    pub fn set_headers(&mut self, headers: Option<Vec<String>>) -> Result<()> {
        self.check_open()?;
        self.headers = headers.map(HeaderIndex::new);
        Ok(())
    }

    /// The name of header `i`, or an empty string if there is none.
    pub fn header(&self, i: usize) -> Result<&str> {
        self.check_open()?;
        Ok(self.headers.as_ref().and_then(|h| h.get(i)).unwrap_or(""))
    }

    /// The number of headers.
    pub fn header_count(&self) -> usize {
        self.headers.as_ref().map_or(0, |h| h.len())
    }

    /// The column position of header `name`.
    ///
    /// Lookups honor `case_sensitive`.
    pub fn index_of(&self, name: &str) -> Result<Option<usize>> {
        self.check_open()?;
        Ok(self
            .headers
            .as_ref()
            .and_then(|h| h.index_of(name, self.config.case_sensitive)))
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Closed { stream: "reader" })
        } else {
            Ok(())
        }
    }
}

impl ReaderState {
    /// Copy the uncopied part of the field in progress out of the buffer.
    fn flush<R>(&mut self, buf: &Buffer<R>) {
        self.field.extend(buf.column());
    }

    fn advance(&mut self, c: char) {
        let next = self.pos.char() + 1;
        self.pos.set_char(next);
        if c == '\n' {
            let line = self.pos.line() + 1;
            self.pos.set_line(line);
        }
    }

    fn check_length(&self, config: &Config, column: usize) -> Result<()> {
        if config.safety_switch && self.field_len > MAX_COLUMN_LENGTH {
            return Err(Error::ColumnLength {
                limit: MAX_COLUMN_LENGTH,
                record: self.records,
                column,
            });
        }
        Ok(())
    }

    fn end_field(
        &mut self,
        config: &Config,
        record: &mut Record,
        quoted: bool,
    ) -> Result<()> {
        if config.safety_switch && record.len() >= MAX_COLUMN_COUNT {
            return Err(Error::ColumnCount {
                limit: MAX_COLUMN_COUNT,
                record: self.records,
            });
        }
        if !quoted && config.trim_whitespace {
            let tail = &self.field[self.trim_floor..];
            let keep = tail.trim_end_matches(Dialect::is_blank).len();
            self.field.truncate(self.trim_floor + keep);
        }
        record.push(&self.field, quoted);
        self.field.clear();
        self.field_len = 0;
        self.trim_floor = 0;
        Ok(())
    }
}

/// An iterator over the records of a reader.
///
/// The lifetime parameter `'r` refers to the lifetime of the underlying
/// reader.
pub struct RecordsIter<'r, R: 'r> {
    rdr: &'r mut Reader<R>,
    done: bool,
}

impl<'r, R: io::Read> Iterator for RecordsIter<'r, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        if self.done {
            return None;
        }
        match self.rdr.read_record() {
            Ok(true) => Some(Ok(self.rdr.record.clone())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = self.rdr.is_closed();
                Some(Err(err))
            }
        }
    }
}
