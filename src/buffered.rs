use std::fmt;
use std::io;

use encoding_rs::{CoderResult, Encoder, Encoding, UTF_8};

/// The default number of bytes of text buffered before it is written out.
pub const DEFAULT_OUTPUT_CAPACITY: usize = 64 * 1024;

/// Buffers text and writes it to `inner` in the output encoding.
///
/// Text accumulates until `capacity` bytes are pending, at which point a
/// caller invoking `flush_if_full` pushes everything out in one write. UTF-8
/// output skips the encoder entirely.
pub(crate) struct Output<W: io::Write> {
    inner: W,
    text: String,
    capacity: usize,
    encoder: Option<Encoder>,
    bytes: Vec<u8>,
}

impl<W: io::Write> Output<W> {
    pub fn new(
        inner: W,
        encoding: &'static Encoding,
        capacity: usize,
    ) -> Output<W> {
        let encoding = encoding.output_encoding();
        let encoder = if encoding == UTF_8 {
            None
        } else {
            Some(encoding.new_encoder())
        };
        Output {
            inner,
            text: String::with_capacity(capacity),
            capacity,
            encoder,
            bytes: vec![],
        }
    }

    /// The pending text, for appending.
    pub fn text(&mut self) -> &mut String {
        &mut self.text
    }

    /// Gets a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Write out the pending text once it reaches capacity.
    pub fn flush_if_full(&mut self) -> io::Result<()> {
        if self.text.len() >= self.capacity {
            self.write_pending(false)?;
        }
        Ok(())
    }

    /// Write out the pending text and flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.write_pending(false)?;
        self.inner.flush()
    }

    /// Write out everything, including any final encoder state, and return
    /// the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.write_pending(true)?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    /// Encode and write the pending text.
    ///
    /// Pending text is consumed whether or not the write succeeds, so a
    /// failed write is never repeated by a later flush.
    fn write_pending(&mut self, last: bool) -> io::Result<()> {
        let res = match self.encoder {
            None => self.inner.write_all(self.text.as_bytes()),
            Some(ref mut encoder) => {
                self.bytes.clear();
                let mut src = &self.text[..];
                loop {
                    let need = encoder
                        .max_buffer_length_from_utf8_if_no_unmappables(src.len())
                        .unwrap_or(src.len() * 4 + 16);
                    // Unmappable chars become numeric character references.
                    self.bytes.reserve(need + 16);
                    let (res, nin, _) =
                        encoder.encode_from_utf8_to_vec(src, &mut self.bytes, last);
                    src = &src[nin..];
                    if res == CoderResult::InputEmpty {
                        break;
                    }
                }
                self.inner.write_all(&self.bytes)
            }
        };
        self.text.clear();
        self.bytes.clear();
        res
    }
}

impl<W: io::Write> fmt::Debug for Output<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Output")
            .field("pending", &self.text.len())
            .field("capacity", &self.capacity)
            .field("encoder", &self.encoder.as_ref().map(|e| e.encoding().name()))
            .finish()
    }
}
