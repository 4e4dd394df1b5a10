use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use log::debug;
use qcsv_core::{EscapeMode, Terminator, Writer as CoreWriter};

use crate::buffer::encoding_for_label;
use crate::buffered::{Output, DEFAULT_OUTPUT_CAPACITY};
use crate::config::Config;
use crate::error::{Error, Result};

/// Builds a CSV writer with various configuration knobs.
///
/// Options that only affect reading, such as `use_comments` or
/// `safety_switch`, are ignored by writers.
#[derive(Debug)]
pub struct WriterBuilder {
    config: Config,
    encoding: &'static Encoding,
    capacity: usize,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder::from_config(Config::default())
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Create a new builder that starts from the given configuration.
    pub fn from_config(config: Config) -> WriterBuilder {
        WriterBuilder {
            config,
            encoding: UTF_8,
            capacity: DEFAULT_OUTPUT_CAPACITY,
        }
    }

    /// Build a CSV writer from this configuration that writes data to `wtr`.
    ///
    /// Output is buffered for you automatically.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Writer<W> {
        Writer::new(self, wtr)
    }

    /// Build a CSV writer from this configuration that writes data to the
    /// file at `path`.
    ///
    /// The file is created if it does not already exist and is truncated
    /// otherwise.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::argument("path", "must not be empty"));
        }
        let file = File::create(path)?;
        debug!(
            "opened {} for writing as {}",
            path.display(),
            self.encoding.output_encoding().name()
        );
        Ok(Writer::new(self, file))
    }

    /// The field delimiter. The default is `,`.
    pub fn delimiter(&mut self, delimiter: char) -> &mut WriterBuilder {
        self.config.delimiter = delimiter;
        self
    }

    /// The text qualifier. The default is `"`.
    pub fn qualifier(&mut self, qualifier: char) -> &mut WriterBuilder {
        self.config.qualifier = qualifier;
        self
    }

    /// Whether fields are qualified when necessary. Enabled by default.
    ///
    /// When disabled, fields are written as they are. In
    /// `EscapeMode::Backslash`, special chars are still escaped.
    pub fn use_qualifier(&mut self, yes: bool) -> &mut WriterBuilder {
        self.config.use_qualifier = yes;
        self
    }

    /// Whether every field is qualified. Disabled by default.
    ///
    /// This wins over `use_qualifier`.
    pub fn force_qualifier(&mut self, yes: bool) -> &mut WriterBuilder {
        self.config.force_qualifier = yes;
        self
    }

    /// How qualifiers and special chars are escaped. The default is
    /// `EscapeMode::Doubled`.
    pub fn escape_mode(&mut self, mode: EscapeMode) -> &mut WriterBuilder {
        self.config.escape_mode = mode;
        self
    }

    /// The record terminator.
    ///
    /// The default is `Terminator::CRLF`, which writes `\r\n` and makes
    /// fields containing `\r` or `\n` qualified.
    pub fn terminator(&mut self, term: Terminator) -> &mut WriterBuilder {
        self.config.terminator = term;
        self
    }

    /// The comment char used by `write_comment`. The default is `#`.
    ///
    /// A first field starting with it is qualified (or escaped) so that it
    /// does not read back as a comment.
    pub fn comment(&mut self, comment: char) -> &mut WriterBuilder {
        self.config.comment = comment;
        self
    }

    /// The encoding of the output. The default is UTF-8.
    ///
    /// Encodings that `encoding_rs` cannot encode to, such as UTF-16, write
    /// UTF-8 instead.
    pub fn encoding(&mut self, encoding: &'static Encoding) -> &mut WriterBuilder {
        self.encoding = encoding;
        self
    }

    /// The number of bytes of text buffered before it is written out. The
    /// default is 64 KiB.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }
}

/// A streaming CSV writer.
///
/// Fields are written one at a time with [`write`](Writer::write) and
/// [`write_field`](Writer::write_field) and records are terminated with
/// [`end_record`](Writer::end_record). [`write_record`](Writer::write_record)
/// does both.
///
/// Output is buffered. It reaches the underlying writer when the buffer is
/// full, on [`flush`](Writer::flush) and on [`close`](Writer::close). A writer
/// that is dropped without being closed flushes on a best effort basis.
///
/// One deviation from plain RFC 4180 quoting is that an empty first field is
/// always written as `""`. This ensures that a record with a single empty
/// field is not skipped as an empty line when it is read back.
///
/// # Example
///
/// ```
/// use std::error::Error;
/// use qcsv::Writer;
///
/// # fn main() { example().unwrap(); }
/// fn example() -> Result<(), Box<dyn Error>> {
///     let mut wtr = Writer::from_writer(vec![]);
///     wtr.write("1,2")?;
///     wtr.write("3")?;
///     wtr.end_record()?;
///     wtr.write_record(&["bob said, \"Hey!\"", ""])?;
///
///     let data = String::from_utf8(wtr.into_inner()?)?;
///     assert_eq!(data, "\"1,2\",3\r\n\"bob said, \"\"Hey!\"\"\",\r\n");
///     Ok(())
/// }
/// ```
pub struct Writer<W: io::Write> {
    config: Config,
    core: CoreWriter,
    /// `None` once the writer is closed.
    out: Option<Output<W>>,
}

impl Writer<File> {
    /// Create a writer with the default configuration that writes UTF-8 to
    /// the file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        WriterBuilder::new().from_path(path)
    }

    /// Create a writer to the file at `path` with the given delimiter and
    /// the encoding named by `charset`, e.g. `"utf-8"` or `"latin1"`.
    pub fn open<P: AsRef<Path>>(
        path: P,
        delimiter: char,
        charset: &str,
    ) -> Result<Writer<File>> {
        let encoding = encoding_for_label(charset)?;
        WriterBuilder::new()
            .delimiter(delimiter)
            .encoding(encoding)
            .from_path(path)
    }
}

impl<W: io::Write> Writer<W> {
    /// Create a writer with the default configuration that writes UTF-8 to
    /// `wtr`.
    pub fn from_writer(wtr: W) -> Writer<W> {
        WriterBuilder::new().from_writer(wtr)
    }

    fn new(builder: &WriterBuilder, wtr: W) -> Writer<W> {
        builder.config.warn_ambiguities("writer");
        Writer {
            config: builder.config.clone(),
            core: CoreWriter::new(builder.config.dialect()),
            out: Some(Output::new(wtr, builder.encoding, builder.capacity)),
        }
    }

    /// The configuration of this writer.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A mutable reference to the configuration of this writer.
    ///
    /// Changes apply from the next field on.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Write a field, trimming leading and trailing whitespace and control
    /// chars.
    pub fn write(&mut self, field: &str) -> Result<()> {
        self.write_field(field, false)
    }

    /// Write a field, qualifying it if needed.
    ///
    /// When `preserve_spaces` is false, chars up to and including `' '` are
    /// trimmed from both ends. When it is true, they are kept, and a leading
    /// or trailing space or tab makes the field qualified.
    pub fn write_field(&mut self, field: &str, preserve_spaces: bool) -> Result<()> {
        let out = output(&mut self.out)?;
        self.core.set_dialect(self.config.dialect());
        self.core.write_field(field, preserve_spaces, out.text());
        out.flush_if_full()?;
        Ok(())
    }

    /// Write a comment line.
    ///
    /// The comment char, `text` and a record terminator are written as they
    /// are, so `text` should not contain line terminators.
    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        let out = output(&mut self.out)?;
        self.core.set_dialect(self.config.dialect());
        self.core.write_comment(text, out.text());
        out.flush_if_full()?;
        Ok(())
    }

    /// Terminate the current record.
    pub fn end_record(&mut self) -> Result<()> {
        let out = output(&mut self.out)?;
        self.core.set_dialect(self.config.dialect());
        self.core.write_term(out.text());
        out.flush_if_full()?;
        Ok(())
    }

    /// Write every field of a record, trimmed, and terminate it.
    ///
    /// An empty record writes nothing at all.
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.write_record_with(record, false)
    }

    /// Write every field of a record and terminate it, with control over
    /// whitespace as in [`write_field`](Writer::write_field).
    ///
    /// An empty record writes nothing at all.
    pub fn write_record_with<I, T>(
        &mut self,
        record: I,
        preserve_spaces: bool,
    ) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        output(&mut self.out)?;
        let mut written = false;
        for field in record {
            self.write_field(field.as_ref(), preserve_spaces)?;
            written = true;
        }
        if written {
            self.end_record()?;
        }
        Ok(())
    }

    /// Flush the buffered output to the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        output(&mut self.out)?.flush()?;
        Ok(())
    }

    /// Flush and release the underlying writer.
    ///
    /// Closing an already closed writer does nothing. If the final flush
    /// fails, the underlying writer is released all the same and the error
    /// is returned.
    ///
    /// Unlike [`Reader::close`](crate::Reader::close), this can fail. Only
    /// the first call can return an error; dropping a writer ignores it.
    pub fn close(&mut self) -> Result<()> {
        match self.out.take() {
            None => Ok(()),
            Some(out) => {
                debug!("closing CSV writer");
                out.finish()?;
                Ok(())
            }
        }
    }

    /// Returns true if this writer was closed.
    pub fn is_closed(&self) -> bool {
        self.out.is_none()
    }

    /// Gets a reference to the underlying writer.
    ///
    /// Buffered output that was not flushed yet is not visible through it.
    pub fn get_ref(&self) -> Result<&W> {
        match self.out {
            Some(ref out) => Ok(out.get_ref()),
            None => Err(Error::Closed { stream: "writer" }),
        }
    }

    /// Flush the buffered output and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        match self.out.take() {
            Some(out) => Ok(out.finish()?),
            None => Err(Error::Closed { stream: "writer" }),
        }
    }
}

fn output<W: io::Write>(out: &mut Option<Output<W>>) -> Result<&mut Output<W>> {
    out.as_mut().ok_or(Error::Closed { stream: "writer" })
}

impl<W: io::Write> Drop for Writer<W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl<W: io::Write> fmt::Debug for Writer<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Writer")
            .field("config", &self.config)
            .field("out", &self.out)
            .finish()
    }
}
