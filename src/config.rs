use std::fmt;

use log::warn;
use qcsv_core::{Dialect, EscapeMode, Terminator};

/// The longest field, in chars, a reader accepts while the safety switch is
/// on.
pub const MAX_COLUMN_LENGTH: usize = 100_000;

/// The most fields per record a reader accepts while the safety switch is on.
pub const MAX_COLUMN_COUNT: usize = 100_000;

/// The options shared by readers and writers.
///
/// A `Config` is a plain value. Readers and writers own a copy that can be
/// inspected and changed at any time through `config()` and `config_mut()`;
/// readers pick up changes at the start of the next record, writers with the
/// next field.
///
/// When the delimiter, qualifier, comment char or a custom terminator
/// coincide, the reader resolves the clash in a fixed order: a comment char
/// at the start of a record wins, then a qualifier at the start of a field,
/// then the delimiter, then the terminator. Builders log a warning for such
/// configurations, see [`Config::ambiguities`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// The field delimiter. Defaults to `,`.
    pub delimiter: char,
    /// The text qualifier. Defaults to `"`.
    pub qualifier: char,
    /// Whether text qualifiers are recognized and written. Defaults to true.
    pub use_qualifier: bool,
    /// How qualifiers and special chars are escaped. Defaults to
    /// `EscapeMode::Doubled`.
    pub escape_mode: EscapeMode,
    /// The record terminator. Defaults to `Terminator::CRLF`, which reads
    /// `\r`, `\n` and `\r\n` and writes `\r\n`.
    pub terminator: Terminator,
    /// The comment char. Defaults to `#`.
    pub comment: char,
    /// Whether the reader skips lines that start with the comment char.
    /// Defaults to false.
    pub use_comments: bool,
    /// Whether header lookups by name are case sensitive. Defaults to true.
    pub case_sensitive: bool,
    /// Whether the reader drops leading and trailing spaces and tabs of
    /// unqualified fields. Defaults to true.
    pub trim_whitespace: bool,
    /// Whether the reader skips lines that contain no chars at all.
    /// Defaults to true.
    pub skip_empty_records: bool,
    /// Whether the reader keeps the source text of each record. Defaults to
    /// true.
    pub capture_raw_record: bool,
    /// Whether the writer qualifies every field. Defaults to false.
    pub force_qualifier: bool,
    /// Whether the reader enforces [`MAX_COLUMN_LENGTH`] and
    /// [`MAX_COLUMN_COUNT`]. Defaults to true.
    pub safety_switch: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            delimiter: ',',
            qualifier: '"',
            use_qualifier: true,
            escape_mode: EscapeMode::Doubled,
            terminator: Terminator::CRLF,
            comment: '#',
            use_comments: false,
            case_sensitive: true,
            trim_whitespace: true,
            skip_empty_records: true,
            capture_raw_record: true,
            force_qualifier: false,
            safety_switch: true,
        }
    }
}

impl Config {
    /// Create a configuration with every option at its default.
    pub fn new() -> Config {
        Config::default()
    }

    /// The syntax subset of this configuration, as used by the tokenizer and
    /// the field writer.
    pub fn dialect(&self) -> Dialect {
        Dialect {
            delimiter: self.delimiter,
            quote: self.qualifier,
            quoting: self.use_qualifier,
            force_quote: self.force_qualifier,
            escape: self.escape_mode,
            terminator: self.terminator,
            comment: self.comment,
            comments: self.use_comments,
            trim: self.trim_whitespace,
            skip_empty: self.skip_empty_records,
        }
    }

    /// Lists the special chars of this configuration that coincide.
    ///
    /// The qualifier only counts while `use_qualifier` is set and the comment
    /// char only while `use_comments` is set.
    pub fn ambiguities(&self) -> Vec<Ambiguity> {
        let mut found = vec![];
        if self.use_qualifier && self.delimiter == self.qualifier {
            found.push(Ambiguity::DelimiterIsQualifier(self.delimiter));
        }
        if self.use_comments && self.delimiter == self.comment {
            found.push(Ambiguity::DelimiterIsComment(self.delimiter));
        }
        if self.use_qualifier
            && self.use_comments
            && self.qualifier == self.comment
        {
            found.push(Ambiguity::QualifierIsComment(self.qualifier));
        }
        if self.terminator == self.delimiter {
            found.push(Ambiguity::DelimiterIsTerminator(self.delimiter));
        }
        found
    }

    /// Logs a warning for each ambiguity of this configuration.
    pub(crate) fn warn_ambiguities(&self, stream: &str) {
        for ambiguity in self.ambiguities() {
            warn!("{} configured ambiguously: {}", stream, ambiguity);
        }
    }
}

/// Two special chars of a [`Config`] that are the same char.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Ambiguity {
    /// The delimiter is also the text qualifier.
    DelimiterIsQualifier(char),
    /// The delimiter is also the comment char.
    DelimiterIsComment(char),
    /// The text qualifier is also the comment char.
    QualifierIsComment(char),
    /// The delimiter is also a record terminator char.
    DelimiterIsTerminator(char),
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Ambiguity::DelimiterIsQualifier(c) => {
                write!(f, "{:?} is both delimiter and text qualifier", c)
            }
            Ambiguity::DelimiterIsComment(c) => {
                write!(f, "{:?} is both delimiter and comment char", c)
            }
            Ambiguity::QualifierIsComment(c) => {
                write!(f, "{:?} is both text qualifier and comment char", c)
            }
            Ambiguity::DelimiterIsTerminator(c) => {
                write!(f, "{:?} is both delimiter and record terminator", c)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use qcsv_core::{EscapeMode, Terminator};

    use super::{Ambiguity, Config};

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(',', config.delimiter);
        assert_eq!('"', config.qualifier);
        assert!(config.use_qualifier);
        assert_eq!(EscapeMode::Doubled, config.escape_mode);
        assert_eq!(Terminator::CRLF, config.terminator);
        assert_eq!('#', config.comment);
        assert!(!config.use_comments);
        assert!(config.case_sensitive);
        assert!(config.trim_whitespace);
        assert!(config.skip_empty_records);
        assert!(config.capture_raw_record);
        assert!(!config.force_qualifier);
        assert!(config.safety_switch);
        assert!(config.ambiguities().is_empty());
    }

    #[test]
    fn dialect_follows_config() {
        let mut config = Config::default();
        config.delimiter = ';';
        config.escape_mode = EscapeMode::Backslash;
        config.use_comments = true;
        let dialect = config.dialect();
        assert_eq!(';', dialect.delimiter);
        assert_eq!(EscapeMode::Backslash, dialect.escape);
        assert!(dialect.comments);
    }

    #[test]
    fn ambiguous() {
        let mut config = Config::default();
        config.delimiter = '"';
        assert_eq!(
            vec![Ambiguity::DelimiterIsQualifier('"')],
            config.ambiguities()
        );
        config.use_qualifier = false;
        assert!(config.ambiguities().is_empty());

        config.delimiter = '\r';
        assert_eq!(
            vec![Ambiguity::DelimiterIsTerminator('\r')],
            config.ambiguities()
        );
        config.terminator = Terminator::Any(';');
        assert!(config.ambiguities().is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let mut config = Config::default();
        config.escape_mode = EscapeMode::Backslash;
        config.terminator = Terminator::Any(';');
        let json = serde_json::to_string(&config).unwrap();
        let got: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, got);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_partial() {
        let got: Config =
            serde_json::from_str(r#"{"delimiter": "\t", "use_comments": true}"#)
                .unwrap();
        assert_eq!('\t', got.delimiter);
        assert!(got.use_comments);
        assert_eq!('"', got.qualifier);
    }
}
