/*!
`qcsv-core` provides the character level machinery behind the `qcsv` crate:
a tokenizer that turns a stream of chars into field and record boundaries,
and a writer that decides how each field must be qualified and escaped.

Neither type performs I/O or allocates record storage of its own. The
tokenizer is fed one `char` at a time and answers with an [`Action`] that
tells the caller what to do with that char, which lets the caller keep field
text in whatever buffer it likes. The writer appends to a caller provided
`String`.

Both are configured with a [`Dialect`], a small `Copy` value that can be
swapped between records.

# Example

```
use qcsv_core::{Action, Dialect, Reader};

let mut rdr = Reader::new(Dialect::default());
let mut fields = vec![String::new()];
for c in "a,\"b,c\"".chars() {
    match rdr.transition(c) {
        (Action::Keep, _) => fields.last_mut().unwrap().push(c),
        (Action::Field { .. }, _) => fields.push(String::new()),
        _ => {}
    }
}
assert_eq!(rdr.finish(), Action::Record { quoted: true });
assert_eq!(fields, vec!["a", "b,c"]);
```
*/

#![deny(missing_docs)]

pub use crate::reader::{Action, Reader};
pub use crate::writer::{QuoteStyle, Writer};

mod reader;
mod writer;

/// A record terminator.
///
/// The default is `CRLF`, which reads any of `\r`, `\n` or `\r\n` as a single
/// terminator and writes `\r\n`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Terminator {
    /// Reads `\r`, `\n` or `\r\n` as one terminator, writes `\r\n`.
    CRLF,
    /// Uses the given char, and only that char, as the terminator.
    Any(char),
}

impl Terminator {
    /// Returns true when this is the automatic `CRLF` terminator.
    pub fn is_crlf(&self) -> bool {
        match *self {
            Terminator::CRLF => true,
            Terminator::Any(_) => false,
        }
    }
}

impl Default for Terminator {
    fn default() -> Terminator {
        Terminator::CRLF
    }
}

impl PartialEq<char> for Terminator {
    #[inline]
    fn eq(&self, &other: &char) -> bool {
        match *self {
            Terminator::CRLF => other == '\r' || other == '\n',
            Terminator::Any(c) => other == c,
        }
    }
}

/// How qualifiers and special chars are escaped inside field data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EscapeMode {
    /// A qualifier inside a qualified field is written twice: `""`.
    Doubled,
    /// A backslash escapes the following char, e.g. `\"`, `\,` or `\n`.
    Backslash,
}

impl Default for EscapeMode {
    fn default() -> EscapeMode {
        EscapeMode::Doubled
    }
}

/// The syntax options shared by the tokenizer and the writer.
///
/// The default dialect uses `,` between fields, `"` as the text qualifier,
/// doubled qualifiers as escapes, automatic CR/LF/CRLF record terminators,
/// trims unqualified fields and skips empty lines. Comment lines are off.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Dialect {
    /// The field delimiter.
    pub delimiter: char,
    /// The text qualifier.
    pub quote: char,
    /// Whether the text qualifier is recognized on read and used on write.
    pub quoting: bool,
    /// Whether the writer qualifies every field.
    pub force_quote: bool,
    /// How escapes are written and recognized.
    pub escape: EscapeMode,
    /// The record terminator.
    pub terminator: Terminator,
    /// The comment char.
    pub comment: char,
    /// Whether lines starting with the comment char are skipped on read.
    pub comments: bool,
    /// Whether whitespace around unqualified fields is dropped on read.
    pub trim: bool,
    /// Whether a line without any chars produces no record on read.
    pub skip_empty: bool,
}

impl Default for Dialect {
    fn default() -> Dialect {
        Dialect {
            delimiter: ',',
            quote: '"',
            quoting: true,
            force_quote: false,
            escape: EscapeMode::Doubled,
            terminator: Terminator::CRLF,
            comment: '#',
            comments: false,
            trim: true,
            skip_empty: true,
        }
    }
}

impl Dialect {
    /// The quoting style the writer derives from this dialect.
    ///
    /// Forced quoting wins over disabled quoting.
    pub fn quote_style(&self) -> QuoteStyle {
        if self.force_quote {
            QuoteStyle::Always
        } else if self.quoting {
            QuoteStyle::Necessary
        } else {
            QuoteStyle::Never
        }
    }

    /// Whether `c` is one of the whitespace chars trimmed around fields.
    #[inline]
    pub fn is_blank(c: char) -> bool {
        c == ' ' || c == '\t'
    }
}
