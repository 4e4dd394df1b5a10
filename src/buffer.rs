use std::cmp;
use std::io;

use encoding_rs::{CoderResult, Decoder, Encoding};
use log::trace;

use crate::error::{Error, Result};

/// The initial number of chars held by a read buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

const READ_CHUNK: usize = 8 * 1024;

/// Looks up an encoding by its WHATWG label, e.g. `utf-8` or `latin1`.
pub(crate) fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
        Error::argument("charset", &format!("unknown encoding label {:?}", label))
    })
}

/// Turns a byte source into text with an `encoding_rs` decoder.
///
/// The decoder sniffs a BOM and replaces malformed sequences with U+FFFD.
struct Transcoder<R> {
    inner: R,
    decoder: Decoder,
    bytes: Vec<u8>,
    /// Bytes in `bytes[start..end]` have been read but not decoded.
    start: usize,
    end: usize,
    /// Decoded text not handed out yet, from `text_pos` on.
    text: String,
    text_pos: usize,
    /// The source returned no more bytes.
    eof: bool,
    /// The decoder was told about `eof` and is drained.
    done: bool,
}

impl<R: io::Read> Transcoder<R> {
    fn new(inner: R, encoding: &'static Encoding) -> Transcoder<R> {
        Transcoder {
            inner,
            decoder: encoding.new_decoder(),
            bytes: vec![0; READ_CHUNK],
            start: 0,
            end: 0,
            text: String::new(),
            text_pos: 0,
            eof: false,
            done: false,
        }
    }

    /// Append up to `max` chars to `out` and return how many were appended.
    ///
    /// Zero means the source is exhausted.
    fn read_chars(&mut self, out: &mut Vec<char>, max: usize) -> io::Result<usize> {
        let mut n = 0;
        while n < max {
            if self.text_pos < self.text.len() {
                for c in self.text[self.text_pos..].chars().take(max - n) {
                    out.push(c);
                    self.text_pos += c.len_utf8();
                    n += 1;
                }
            } else if n > 0 || !self.decode()? {
                break;
            }
        }
        Ok(n)
    }

    /// Decode more text. Returns false once everything has been decoded.
    fn decode(&mut self) -> io::Result<bool> {
        self.text.clear();
        self.text_pos = 0;
        while !self.done {
            if self.start == self.end && !self.eof {
                let n = self.read()?;
                self.start = 0;
                self.end = n;
                self.eof = n == 0;
            }
            let pending = self.end - self.start;
            let need = self
                .decoder
                .max_utf8_buffer_length(pending)
                .unwrap_or(pending * 3 + 16);
            self.text.reserve(need);
            let (res, nin, _) = self.decoder.decode_to_string(
                &self.bytes[self.start..self.end],
                &mut self.text,
                self.eof,
            );
            self.start += nin;
            if res == CoderResult::InputEmpty && self.eof {
                self.done = true;
            }
            if !self.text.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn read(&mut self) -> io::Result<usize> {
        loop {
            match self.inner.read(&mut self.bytes) {
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
                res => return res,
            }
        }
    }
}

/// A window of decoded chars over a byte source.
///
/// Chars before `column_start` and `line_start` (whichever is smaller) are
/// no longer needed and are dropped from the front on refill. The rest is
/// kept, so the text of the field in progress and the raw text of the record
/// in progress can always be sliced out of `data`. When the kept span fills
/// the whole window, the window doubles.
pub(crate) struct Buffer<R> {
    src: Transcoder<R>,
    data: Vec<char>,
    capacity: usize,
    /// The next char to read.
    pub position: usize,
    /// The first char of the field in progress not yet copied out.
    pub column_start: usize,
    /// The first char of the record in progress.
    pub line_start: usize,
    eof: bool,
}

impl<R> Buffer<R> {
    /// The next unread char.
    pub fn peek(&self) -> Option<char> {
        self.data.get(self.position).copied()
    }

    /// The uncopied text of the field in progress.
    pub fn column(&self) -> &[char] {
        &self.data[self.column_start..self.position]
    }

    /// The text of the record in progress, up to `end`.
    pub fn line(&self, end: usize) -> &[char] {
        &self.data[self.line_start..end]
    }

    /// The current size of the window in chars.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<R: io::Read> Buffer<R> {
    pub fn new(
        inner: R,
        encoding: &'static Encoding,
        capacity: usize,
    ) -> Buffer<R> {
        let capacity = cmp::max(1, capacity);
        Buffer {
            src: Transcoder::new(inner, encoding),
            data: Vec::with_capacity(capacity),
            capacity,
            position: 0,
            column_start: 0,
            line_start: 0,
            eof: false,
        }
    }

    /// Make sure at least one unread char is available.
    ///
    /// Returns false at the end of input. When `keep_line` is false, the
    /// record in progress is not retained across a refill.
    pub fn ensure(&mut self, keep_line: bool) -> io::Result<bool> {
        while self.position >= self.data.len() {
            if !self.fill(keep_line)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn fill(&mut self, keep_line: bool) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }
        let keep = if keep_line {
            cmp::min(self.column_start, self.line_start)
        } else {
            self.column_start
        };
        if keep > 0 {
            self.data.drain(..keep);
            self.position -= keep;
            self.column_start -= keep;
            self.line_start = self.line_start.saturating_sub(keep);
        }
        if self.data.len() >= self.capacity {
            self.capacity *= 2;
            trace!("read buffer grown to {} chars", self.capacity);
        }
        let room = self.capacity - self.data.len();
        let n = self.src.read_chars(&mut self.data, room)?;
        self.eof = n == 0;
        Ok(n > 0)
    }
}
