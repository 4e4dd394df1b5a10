/*!
The `qcsv` crate provides a streaming CSV reader and writer with text
qualifiers, doubled or backslash escapes, comment lines, raw record capture
and selectable encodings.

# Overview

The primary types in this crate are [`Reader`] and [`Writer`], for reading
and writing CSV data respectively. Both are configured with a [`Config`],
either directly or through [`ReaderBuilder`] and [`WriterBuilder`], and both
keep their configuration adjustable while they are in use.

Reading is pull based: every call to [`Reader::read_record`] parses exactly
one record, whose fields are then available by position, by header name or
as a [`Record`]. The reader decodes its source with
[`encoding_rs`](https://docs.rs/encoding_rs) and works on chars, so any char
can serve as delimiter, qualifier, comment char or record terminator.

Writing is the inverse: the writer decides per field whether it must be
qualified or escaped so that reading it back produces the same field.

The character level state machine and the field quoting engine live in the
`qcsv-core` crate, which performs no I/O.

# Example

```
use std::error::Error;
use qcsv::{Reader, Writer};

# fn main() { example().unwrap(); }
fn example() -> Result<(), Box<dyn Error>> {
    let data = "\
city,country,pop
\"Boston, MA\",United States,4628910
## not a comment, since comments are off
";
    let mut rdr = Reader::parse(data);
    rdr.read_headers()?;

    let mut wtr = Writer::from_writer(vec![]);
    while rdr.read_record()? {
        wtr.write(rdr.get_by_name("city")?)?;
        wtr.write(rdr.get_by_name("pop")?)?;
        wtr.end_record()?;
    }
    let out = String::from_utf8(wtr.into_inner()?)?;
    assert_eq!(out, "\"Boston, MA\",4628910\r\n\"# not a comment\",\r\n");
    Ok(())
}
```

# Error handling

Every fallible operation returns [`Result`]. Running out of records is not an
error: readers return `Ok(false)`. Failures of the underlying source or sink
are [`Error::Io`], and a reader whose source failed is closed. With the
safety switch on (the default), fields longer than [`MAX_COLUMN_LENGTH`]
chars and records with more than [`MAX_COLUMN_COUNT`] fields are rejected
with errors that [`Error::is_io_error`] also reports.

# Logging

Opening, closing and releasing sources and sinks, as well as read buffer
growth, are logged through the [`log`](https://docs.rs/log) facade.
*/

#![deny(missing_docs)]

pub use qcsv_core::{Dialect, EscapeMode, QuoteStyle, Terminator};

pub use crate::buffer::DEFAULT_BUFFER_CAPACITY;
pub use crate::buffered::DEFAULT_OUTPUT_CAPACITY;
pub use crate::config::{Ambiguity, Config, MAX_COLUMN_COUNT, MAX_COLUMN_LENGTH};
pub use crate::error::{Error, Result};
pub use crate::headers::HeaderIndex;
pub use crate::reader::{Reader, ReaderBuilder, RecordsIter};
pub use crate::record::{Position, Record, RecordIter};
pub use crate::writer::{Writer, WriterBuilder};

mod buffer;
mod buffered;
mod config;
mod error;
mod headers;
mod reader;
mod record;
mod writer;
