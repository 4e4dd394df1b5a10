use memchr::{memchr, memchr3};

use crate::{Dialect, EscapeMode, Terminator};

/// The quoting style to use when writing CSV data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuoteStyle {
    /// This puts quotes around every field. Always.
    Always,
    /// This puts quotes around fields only when necessary.
    ///
    /// They are necessary when a field contains a qualifier, delimiter or
    /// record terminator, when the first field of a record is empty or starts
    /// with the comment char, and when leading or trailing whitespace must
    /// survive a round trip.
    ///
    /// This is the default.
    Necessary,
    /// This *never* writes quotes.
    ///
    /// Fields are written as they are, except for backslash escapes when
    /// `EscapeMode::Backslash` is in use.
    Never,
}

impl Default for QuoteStyle {
    fn default() -> QuoteStyle {
        QuoteStyle::Necessary
    }
}

/// A writer for CSV data.
///
/// The writer tracks whether the next field starts a record and appends
/// delimiters, qualified or escaped field text and terminators to a caller
/// provided `String`.
#[derive(Clone, Debug)]
pub struct Writer {
    dialect: Dialect,
    first_field_in_record: bool,
}

impl Default for Writer {
    fn default() -> Writer {
        Writer::new(Dialect::default())
    }
}

impl Writer {
    /// Creates a new CSV writer for the given dialect.
    pub fn new(dialect: Dialect) -> Writer {
        Writer { dialect, first_field_in_record: true }
    }

    /// The dialect in use.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Replace the dialect. Takes effect with the next field.
    pub fn set_dialect(&mut self, dialect: Dialect) {
        self.dialect = dialect;
    }

    /// Returns true if the next field written starts a new record.
    pub fn is_record_start(&self) -> bool {
        self.first_field_in_record
    }

    /// Append one field, preceded by a delimiter unless it is the first field
    /// of its record.
    ///
    /// Unless `preserve_spaces` is set, chars up to and including `' '` are
    /// trimmed from both ends of `input` first.
    pub fn write_field(
        &mut self,
        input: &str,
        preserve_spaces: bool,
        output: &mut String,
    ) {
        let field = if preserve_spaces {
            input
        } else {
            input.trim_matches(|c: char| c <= ' ')
        };
        let first = self.first_field_in_record;
        if !first {
            output.push(self.dialect.delimiter);
        }
        self.first_field_in_record = false;

        let d = self.dialect;
        if self.should_quote(field, first, preserve_spaces) {
            output.push(d.quote);
            for c in field.chars() {
                match d.escape {
                    EscapeMode::Doubled => {
                        if c == d.quote {
                            output.push(d.quote);
                        }
                    }
                    EscapeMode::Backslash => {
                        if c == '\\' || c == d.quote {
                            output.push('\\');
                        }
                    }
                }
                output.push(c);
            }
            output.push(d.quote);
        } else if d.escape == EscapeMode::Backslash {
            for (i, c) in field.chars().enumerate() {
                if c == '\\'
                    || c == d.delimiter
                    || d.terminator == c
                    || (first && i == 0 && c == d.comment)
                {
                    output.push('\\');
                }
                output.push(c);
            }
        } else {
            output.push_str(field);
        }
    }

    /// Append a record terminator and start a new record.
    pub fn write_term(&mut self, output: &mut String) {
        match self.dialect.terminator {
            Terminator::CRLF => output.push_str("\r\n"),
            Terminator::Any(c) => output.push(c),
        }
        self.first_field_in_record = true;
    }

    /// Append a comment line: the comment char, `text` and a terminator.
    pub fn write_comment(&mut self, text: &str, output: &mut String) {
        output.push(self.dialect.comment);
        output.push_str(text);
        self.write_term(output);
    }

    /// Returns true if `field` must be qualified.
    ///
    /// `field` is taken as it will be written, i.e., after trimming.
    pub fn should_quote(
        &self,
        field: &str,
        first: bool,
        preserve_spaces: bool,
    ) -> bool {
        match self.dialect.quote_style() {
            QuoteStyle::Always => true,
            QuoteStyle::Never => false,
            QuoteStyle::Necessary => {
                // A lone empty field must not read back as an empty line.
                if first
                    && (field.is_empty() || field.starts_with(self.dialect.comment))
                {
                    return true;
                }
                if self.has_special(field) {
                    return true;
                }
                preserve_spaces
                    && (field.starts_with(&[' ', '\t'][..])
                        || field.ends_with(&[' ', '\t'][..]))
            }
        }
    }

    fn has_special(&self, field: &str) -> bool {
        let d = &self.dialect;
        let bytes = field.as_bytes();
        if d.delimiter.is_ascii() && d.quote.is_ascii() {
            let (delim, quote) = (d.delimiter as u8, d.quote as u8);
            match d.terminator {
                Terminator::CRLF => {
                    return memchr3(delim, quote, b'\r', bytes).is_some()
                        || memchr(b'\n', bytes).is_some();
                }
                Terminator::Any(t) if t.is_ascii() => {
                    return memchr3(delim, quote, t as u8, bytes).is_some();
                }
                Terminator::Any(_) => {}
            }
        }
        field
            .chars()
            .any(|c| c == d.delimiter || c == d.quote || d.terminator == c)
    }
}
