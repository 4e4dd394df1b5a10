use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::result;

/// A type alias for `Result<T, qcsv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when processing CSV data.
///
/// Note that running out of records is not an error: readers report it by
/// returning `Ok(false)`.
#[derive(Debug)]
pub enum Error {
    /// An I/O error that occurred while reading or writing CSV data.
    ///
    /// When it comes from the source of a reader, the reader releases its
    /// source and is closed before this error is returned.
    Io(io::Error),
    /// A construction parameter was invalid, e.g. an empty path or an
    /// unknown encoding label.
    Argument {
        /// The name of the offending parameter.
        parameter: &'static str,
        /// What is wrong with it.
        message: String,
    },
    /// A file to read does not exist.
    FileNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },
    /// A reader or writer was used after it was closed.
    Closed {
        /// Either `"reader"` or `"writer"`.
        stream: &'static str,
    },
    /// A field was longer than the safety switch permits.
    ColumnLength {
        /// The maximum field length in chars.
        limit: usize,
        /// The index of the record being read.
        record: u64,
        /// The index of the field that was too long.
        column: usize,
    },
    /// A record had more fields than the safety switch permits.
    ColumnCount {
        /// The maximum number of fields per record.
        limit: usize,
        /// The index of the record being read.
        record: u64,
    },
}

impl Error {
    /// Returns true if this error belongs to the I/O class, i.e., it was
    /// raised while data was flowing rather than by misuse of the API.
    ///
    /// Safety switch violations are in this class.
    pub fn is_io_error(&self) -> bool {
        match *self {
            Error::Io(_)
            | Error::ColumnLength { .. }
            | Error::ColumnCount { .. } => true,
            Error::Argument { .. }
            | Error::FileNotFound { .. }
            | Error::Closed { .. } => false,
        }
    }

    pub(crate) fn argument(parameter: &'static str, message: &str) -> Error {
        Error::Argument { parameter, message: message.to_string() }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Argument { parameter, ref message } => {
                write!(f, "CSV error: invalid parameter {}: {}", parameter, message)
            }
            Error::FileNotFound { ref path } => {
                write!(f, "CSV error: file {} does not exist", path.display())
            }
            Error::Closed { stream } => {
                write!(f, "CSV error: this {} has already been closed", stream)
            }
            Error::ColumnLength { limit, record, column } => write!(
                f,
                "CSV parse error: record {}: field {} is longer than the \
                 maximum column length of {} chars; disable the safety \
                 switch to read longer fields",
                record, column, limit
            ),
            Error::ColumnCount { limit, record } => write!(
                f,
                "CSV parse error: record {} has more than the maximum column \
                 count of {} fields; disable the safety switch to read wider \
                 records",
                record, limit
            ),
        }
    }
}
