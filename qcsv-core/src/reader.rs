use std::mem;

use crate::{Dialect, EscapeMode};

/// What the caller should do with the char it just fed to the tokenizer.
///
/// Field text is never copied by the tokenizer itself. Instead, each char
/// is classified, and the caller either appends it to the current field
/// (`Keep`), appends a translated char (`Emit`) or drops it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// The char is field content and is kept verbatim.
    Keep,
    /// The char belongs to the current record but not to any field: a
    /// qualifier, leading whitespace, an escape introducer or junk after a
    /// closing qualifier.
    Skip,
    /// An escape sequence produced the given char.
    ///
    /// When returned together with `consumed == false`, the sequence was cut
    /// short and the char that was fed must be fed again.
    Emit(char),
    /// The char is outside of any record: comment text, an empty line that is
    /// skipped or the `\n` of a `\r\n` pair.
    Discard,
    /// The current field ended. The record continues.
    Field {
        /// Whether the field opened with a text qualifier.
        quoted: bool,
    },
    /// The current field and its record ended.
    Record {
        /// Whether the last field opened with a text qualifier.
        quoted: bool,
    },
    /// There are no more records. Only returned by `finish`.
    End,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    StartRecord,
    StartField,
    InField,
    InQuotedField,
    AfterQuote,
    AfterQuotedField,
    Escaped { quoted: bool },
    EscapeSequence {
        quoted: bool,
        letter: char,
        radix: u32,
        width: u8,
        digits: u8,
        value: u32,
    },
    InComment,
}

impl State {
    fn field(quoted: bool) -> State {
        if quoted {
            State::InQuotedField
        } else {
            State::InField
        }
    }
}

/// A char level CSV tokenizer.
///
/// The tokenizer is a small state machine. Every char is fed to
/// [`transition`](Reader::transition), which returns an [`Action`] and
/// whether the char was consumed. At the end of input,
/// [`finish`](Reader::finish) is called until it returns `Action::End`.
///
/// A few details of the grammar:
///
/// * A comment char is only recognized as the very first char of a record,
///   and the comment runs to the end of the physical line.
/// * The delimiter wins over the record terminator when both match a char.
/// * Text after a closing qualifier is dropped up to the next delimiter or
///   terminator.
/// * In `EscapeMode::Backslash`, `\n`, `\r`, `\t`, `\b`, `\f`, `\e`, `\v`
///   and `\a` map to their control chars, `\dNNN`, `\oNNN`, `\NNN`, `\xHH`
///   and `\uHHHH` are numeric escapes and any other escaped char stands for
///   itself.
/// * Trailing whitespace of unqualified fields is not trimmed here since
///   the tokenizer never sees the field as a whole. Callers do that when a
///   field ends.
#[derive(Clone, Debug)]
pub struct Reader {
    dialect: Dialect,
    state: State,
    /// Set when a `\r` ended the previous line, so that an immediately
    /// following `\n` is part of the same terminator.
    after_cr: bool,
    /// Whether the field in progress opened with a qualifier.
    quoted: bool,
}

impl Default for Reader {
    fn default() -> Reader {
        Reader::new(Dialect::default())
    }
}

impl Reader {
    /// Create a new tokenizer for the given dialect.
    pub fn new(dialect: Dialect) -> Reader {
        Reader {
            dialect,
            state: State::StartRecord,
            after_cr: false,
            quoted: false,
        }
    }

    /// The dialect in use.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Replace the dialect.
    ///
    /// Parsing state is kept, so this is safe to call between records.
    pub fn set_dialect(&mut self, dialect: Dialect) {
        self.dialect = dialect;
    }

    /// Reset the tokenizer such that it behaves as if it had never been used.
    pub fn reset(&mut self) {
        self.state = State::StartRecord;
        self.after_cr = false;
        self.quoted = false;
    }

    /// Returns true when no char of the next record has been consumed yet.
    pub fn is_record_start(&self) -> bool {
        self.state == State::StartRecord
    }

    /// Discard everything up to and including the next line terminator.
    ///
    /// Quoting is ignored while a line is skipped. Chars fed afterwards are
    /// answered with `Action::Discard` until `is_record_start` is true again.
    pub fn skip_line(&mut self) {
        self.state = State::InComment;
        self.quoted = false;
    }

    /// Feed one char.
    ///
    /// Returns the action to take and whether `c` was consumed. A char that
    /// was not consumed must be fed again.
    pub fn transition(&mut self, c: char) -> (Action, bool) {
        use self::State::*;

        let d = self.dialect;
        match self.state {
            StartRecord => {
                if self.after_cr {
                    self.after_cr = false;
                    if c == '\n' {
                        return (Action::Discard, true);
                    }
                }
                if d.comments && c == d.comment {
                    self.state = InComment;
                    (Action::Discard, true)
                } else if c != d.delimiter && d.terminator == c {
                    self.after_cr = d.terminator.is_crlf() && c == '\r';
                    if d.skip_empty {
                        (Action::Discard, true)
                    } else {
                        (Action::Record { quoted: false }, true)
                    }
                } else {
                    self.start_field(c)
                }
            }
            StartField => self.start_field(c),
            InField => {
                if c == d.delimiter {
                    (self.end_field(), true)
                } else if d.terminator == c {
                    (self.end_record(c), true)
                } else if d.escape == EscapeMode::Backslash && c == '\\' {
                    self.state = Escaped { quoted: false };
                    (Action::Skip, true)
                } else {
                    (Action::Keep, true)
                }
            }
            InQuotedField => {
                if d.escape == EscapeMode::Backslash && c == '\\' {
                    self.state = Escaped { quoted: true };
                    (Action::Skip, true)
                } else if c == d.quote {
                    self.state = AfterQuote;
                    (Action::Skip, true)
                } else {
                    (Action::Keep, true)
                }
            }
            AfterQuote => {
                if d.escape == EscapeMode::Doubled && c == d.quote {
                    self.state = InQuotedField;
                    (Action::Keep, true)
                } else if c == d.delimiter {
                    (self.end_field(), true)
                } else if d.terminator == c {
                    (self.end_record(c), true)
                } else {
                    self.state = AfterQuotedField;
                    (Action::Skip, true)
                }
            }
            AfterQuotedField => {
                if c == d.delimiter {
                    (self.end_field(), true)
                } else if d.terminator == c {
                    (self.end_record(c), true)
                } else {
                    (Action::Skip, true)
                }
            }
            Escaped { quoted } => self.escaped(quoted, c),
            EscapeSequence { quoted, letter, radix, width, digits, value } => {
                match c.to_digit(radix) {
                    Some(digit) => {
                        let value = value * radix + digit;
                        let digits = digits + 1;
                        if digits == width {
                            self.state = State::field(quoted);
                            (Action::Emit(decode(value)), true)
                        } else {
                            self.state = EscapeSequence {
                                quoted,
                                letter,
                                radix,
                                width,
                                digits,
                                value,
                            };
                            (Action::Skip, true)
                        }
                    }
                    None => {
                        self.state = State::field(quoted);
                        let out = if digits == 0 { letter } else { decode(value) };
                        (Action::Emit(out), false)
                    }
                }
            }
            InComment => {
                if self.after_cr {
                    self.after_cr = false;
                    if c == '\n' {
                        return (Action::Discard, true);
                    }
                }
                if c == '\r' {
                    self.after_cr = true;
                    self.state = StartRecord;
                } else if c == '\n' {
                    self.state = StartRecord;
                }
                (Action::Discard, true)
            }
        }
    }

    /// Signal the end of input.
    ///
    /// Returns `Action::Record` if a record was in progress (preceded by an
    /// `Action::Emit` when a numeric escape was pending) and `Action::End`
    /// otherwise. Keep calling until `Action::End` is returned.
    pub fn finish(&mut self) -> Action {
        use self::State::*;

        match self.state {
            StartRecord | InComment => {
                self.state = StartRecord;
                self.after_cr = false;
                Action::End
            }
            EscapeSequence { quoted, letter, digits, value, .. } => {
                self.state = State::field(quoted);
                Action::Emit(if digits == 0 { letter } else { decode(value) })
            }
            StartField | InField | InQuotedField | AfterQuote
            | AfterQuotedField | Escaped { .. } => {
                self.state = StartRecord;
                Action::Record { quoted: mem::replace(&mut self.quoted, false) }
            }
        }
    }

    fn start_field(&mut self, c: char) -> (Action, bool) {
        let d = self.dialect;
        if d.quoting && c == d.quote {
            self.quoted = true;
            self.state = State::InQuotedField;
            (Action::Skip, true)
        } else if c == d.delimiter {
            (self.end_field(), true)
        } else if d.terminator == c {
            (self.end_record(c), true)
        } else if d.trim && Dialect::is_blank(c) {
            self.state = State::StartField;
            (Action::Skip, true)
        } else if d.escape == EscapeMode::Backslash && c == '\\' {
            self.state = State::Escaped { quoted: false };
            (Action::Skip, true)
        } else {
            self.state = State::InField;
            (Action::Keep, true)
        }
    }

    fn escaped(&mut self, quoted: bool, c: char) -> (Action, bool) {
        let sequence = |radix, width, digits, value| State::EscapeSequence {
            quoted,
            letter: c,
            radix,
            width,
            digits,
            value,
        };
        let out = match c {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'e' => '\u{1b}',
            'v' => '\u{b}',
            'a' => '\u{7}',
            'o' => {
                self.state = sequence(8, 3, 0, 0);
                return (Action::Skip, true);
            }
            'd' => {
                self.state = sequence(10, 3, 0, 0);
                return (Action::Skip, true);
            }
            'x' => {
                self.state = sequence(16, 2, 0, 0);
                return (Action::Skip, true);
            }
            'u' => {
                self.state = sequence(16, 4, 0, 0);
                return (Action::Skip, true);
            }
            '0'..='7' => {
                self.state = sequence(8, 3, 1, c as u32 - '0' as u32);
                return (Action::Skip, true);
            }
            c => c,
        };
        self.state = State::field(quoted);
        (Action::Emit(out), true)
    }

    fn end_field(&mut self) -> Action {
        self.state = State::StartField;
        Action::Field { quoted: mem::replace(&mut self.quoted, false) }
    }

    fn end_record(&mut self, c: char) -> Action {
        self.after_cr = self.dialect.terminator.is_crlf() && c == '\r';
        self.state = State::StartRecord;
        Action::Record { quoted: mem::replace(&mut self.quoted, false) }
    }
}

fn decode(value: u32) -> char {
    std::char::from_u32(value).unwrap_or(std::char::REPLACEMENT_CHARACTER)
}

#[cfg(test)]
mod tests {
    use std::mem;

    use super::{Action, Reader};
    use crate::{Dialect, EscapeMode, Terminator};

    type Csv = Vec<Vec<String>>;

    macro_rules! csv {
        ($([$($field:expr),*]),*) => {{
            #[allow(unused_mut)]
            let mut csv: Csv = vec![];
            $(
                csv.push(vec![$($field.to_string()),*]);
            )*
            csv
        }}
    }

    macro_rules! parses_to {
        ($name:ident, $data:expr, $expected:expr) => {
            parses_to!($name, $data, $expected, |_: &mut Dialect| {});
        };
        ($name:ident, $data:expr, $expected:expr, $config:expr) => {
            #[test]
            fn $name() {
                let mut dialect = Dialect::default();
                $config(&mut dialect);
                let mut rdr = Reader::new(dialect);
                let got = parse(&mut rdr, $data);
                let expected: Csv = $expected;
                assert_eq!(expected, got);
            }
        };
    }

    fn parse(rdr: &mut Reader, data: &str) -> Csv {
        let mut chars = data.chars().peekable();
        let mut csv = vec![];
        let mut row = vec![];
        let mut field = String::new();
        loop {
            let (action, c) = match chars.peek().copied() {
                Some(c) => {
                    let (action, consumed) = rdr.transition(c);
                    if consumed {
                        chars.next();
                    }
                    (action, Some(c))
                }
                None => (rdr.finish(), None),
            };
            match action {
                Action::Keep => field.extend(c),
                Action::Emit(c) => field.push(c),
                Action::Skip | Action::Discard => {}
                Action::Field { .. } => row.push(mem::take(&mut field)),
                Action::Record { .. } => {
                    row.push(mem::take(&mut field));
                    csv.push(mem::take(&mut row));
                }
                Action::End => return csv,
            }
        }
    }

    fn keep_empty(d: &mut Dialect) {
        d.skip_empty = false;
    }

    fn backslash(d: &mut Dialect) {
        d.escape = EscapeMode::Backslash;
    }

    parses_to!(empty, "", csv![]);
    parses_to!(one_row_one_field, "a", csv![["a"]]);
    parses_to!(one_row_many_fields, "a,b,c", csv![["a", "b", "c"]]);
    parses_to!(one_row_trailing_comma, "a,b,", csv![["a", "b", ""]]);
    parses_to!(only_comma, ",", csv![["", ""]]);
    parses_to!(one_row_lf, "a,b\n", csv![["a", "b"]]);
    parses_to!(one_row_cr, "a,b\r", csv![["a", "b"]]);
    parses_to!(one_row_crlf, "a,b\r\n", csv![["a", "b"]]);
    parses_to!(rows_lf, "1\n2", csv![["1"], ["2"]]);
    parses_to!(rows_cr, "1\r2", csv![["1"], ["2"]]);
    parses_to!(rows_crlf, "1\r\n2", csv![["1"], ["2"]]);
    parses_to!(leading_blank_skipped, "a, \tb", csv![["a", "b"]]);
    parses_to!(
        leading_blank_kept,
        "a, b",
        csv![["a", " b"]],
        |d: &mut Dialect| d.trim = false
    );
    parses_to!(blank_line_is_a_record, " \r\n1", csv![[""], ["1"]]);

    parses_to!(empty_lines_skipped, "1\n\n\r\n\r2", csv![["1"], ["2"]]);
    parses_to!(leading_empty_lines_skipped, "\n\n1", csv![["1"]]);
    parses_to!(
        empty_lines_kept,
        "1\n\n1\r\r1\r\n\r\n1\n\r1",
        csv![["1"], [""], ["1"], [""], ["1"], [""], ["1"], [""], ["1"]],
        keep_empty
    );
    parses_to!(crlf_is_one_terminator, "1\r\n2", csv![["1"], ["2"]], keep_empty);

    parses_to!(quoted, "\"a,b\",c", csv![["a,b", "c"]]);
    parses_to!(quoted_empty, "\"\"", csv![[""]]);
    parses_to!(quoted_doubled, "\"a\"\"b\"", csv![["a\"b"]]);
    parses_to!(
        quoted_doubled_twice,
        "\"double\"\"\"\"double quotes\"",
        csv![["double\"\"double quotes"]]
    );
    parses_to!(quoted_newline, "\"data \r\n here\"", csv![["data \r\n here"]]);
    parses_to!(quote_inside_unquoted, "a\"b,c", csv![["a\"b", "c"]]);
    parses_to!(
        junk_after_quote,
        "\"Mac \"The Knife\" Peter\",\"Boswell, Jr.\"",
        csv![["Mac ", "Boswell, Jr."]]
    );
    parses_to!(
        blank_before_quote,
        "  \" Chicane\"  junk here  ,x",
        csv![[" Chicane", "x"]]
    );
    parses_to!(
        single_quote_qualifier,
        "'a,''b'''",
        csv![["a,'b'"]],
        |d: &mut Dialect| d.quote = '\''
    );
    parses_to!(
        quoting_disabled,
        "\"a,b\"",
        csv![["\"a", "b\""]],
        |d: &mut Dialect| d.quoting = false
    );
    parses_to!(quote_at_eof, "\"abc", csv![["abc"]]);

    parses_to!(
        delimiter_wins_over_terminator,
        "1\r2\n",
        csv![["1", "2"]],
        |d: &mut Dialect| d.delimiter = '\r'
    );
    parses_to!(
        delimiter_cr_at_record_start,
        "\r\r\n1\r",
        csv![["", "", ""], ["1", ""]],
        |d: &mut Dialect| d.delimiter = '\r'
    );
    parses_to!(
        custom_terminator,
        "1;; ;1",
        csv![["1"], [""], ["1"]],
        |d: &mut Dialect| d.terminator = Terminator::Any(';')
    );
    parses_to!(
        custom_terminator_keeps_empty,
        "1;; ;1",
        csv![["1"], [""], [""], ["1"]],
        |d: &mut Dialect| {
            d.terminator = Terminator::Any(';');
            d.skip_empty = false;
        }
    );
    parses_to!(
        custom_terminator_newline_is_data,
        "a\nb;c",
        csv![["a\nb"], ["c"]],
        |d: &mut Dialect| d.terminator = Terminator::Any(';')
    );

    parses_to!(
        comment_line,
        "1\r\n# a comment, \"with\" quotes\r\n1",
        csv![["1"], ["1"]],
        |d: &mut Dialect| d.comments = true
    );
    parses_to!(comment_disabled, "#a\nb", csv![["#a"], ["b"]]);
    parses_to!(
        comment_only_at_record_start,
        "a,#b\n #c",
        csv![["a", "#b"], ["#c"]],
        |d: &mut Dialect| d.comments = true
    );
    parses_to!(
        comment_at_eof,
        "1\n#done",
        csv![["1"]],
        |d: &mut Dialect| d.comments = true
    );

    parses_to!(
        backslash_quote,
        "\"bob said, \\\"Hey!\\\"\",2",
        csv![["bob said, \"Hey!\"", "2"]],
        backslash
    );
    parses_to!(
        backslash_backslash,
        "\"double\\\\\\\\double backslash\"",
        csv![["double\\\\double backslash"]],
        backslash
    );
    parses_to!(backslash_unknown, "\"some \\stuff\"", csv![["some stuff"]], backslash);
    parses_to!(backslash_delimiter, "comma\\,,x", csv![["comma,", "x"]], backslash);
    parses_to!(
        backslash_control,
        "\\n\\r\\t\\b\\f\\e\\v\\a",
        csv![["\n\r\t\u{8}\u{c}\u{1b}\u{b}\u{7}"]],
        backslash
    );
    parses_to!(
        backslash_real_newline,
        "\"line 1\\\nline 2\"",
        csv![["line 1\nline 2"]],
        backslash
    );
    parses_to!(
        backslash_terminator,
        "a\\;b;c",
        csv![["a;b"], ["c"]],
        |d: &mut Dialect| {
            d.escape = EscapeMode::Backslash;
            d.terminator = Terminator::Any(';');
        }
    );
    parses_to!(
        backslash_numeric,
        "\\d065\\o101\\101\\x41\\u0041\\xfa\\u0AFA",
        csv![["AAAAA\u{fa}\u{afa}"]],
        backslash
    );
    parses_to!(backslash_numeric_short, "\\x4g", csv![["\u{4}g"]], backslash);
    parses_to!(backslash_numeric_no_digits, "\\xg", csv![["xg"]], backslash);
    parses_to!(backslash_nul, "\\08", csv![["\u{0}8"]], backslash);
    parses_to!(backslash_numeric_at_eof, "\\x4", csv![["\u{4}"]], backslash);
    parses_to!(backslash_at_eof, "a\\", csv![["a"]], backslash);
    parses_to!(backslash_off, "a\\,b", csv![["a\\", "b"]]);

    #[test]
    fn skip_line_swallows_crlf() {
        let mut rdr = Reader::default();
        rdr.skip_line();
        for c in "a,\"b\r".chars() {
            assert_eq!((Action::Discard, true), rdr.transition(c));
        }
        assert!(rdr.is_record_start());
        assert_eq!(csv![["c"]], parse(&mut rdr, "\nc"));
    }

    #[test]
    fn skip_line_after_cr_record() {
        let mut rdr = Reader::default();
        assert_eq!((Action::Keep, true), rdr.transition('a'));
        assert_eq!(
            (Action::Record { quoted: false }, true),
            rdr.transition('\r')
        );
        rdr.skip_line();
        assert_eq!((Action::Discard, true), rdr.transition('\n'));
        assert!(!rdr.is_record_start());
        assert_eq!(csv![["c"]], parse(&mut rdr, "skipped\nc"));
    }

    #[test]
    fn quoted_flag_reported() {
        let mut rdr = Reader::default();
        assert_eq!((Action::Skip, true), rdr.transition('"'));
        assert_eq!((Action::Skip, true), rdr.transition('"'));
        assert_eq!((Action::Field { quoted: true }, true), rdr.transition(','));
        assert_eq!((Action::Keep, true), rdr.transition('x'));
        assert_eq!(Action::Record { quoted: false }, rdr.finish());
        assert_eq!(Action::End, rdr.finish());
    }
}
