use std::cmp;
use std::iter::FromIterator;
use std::ops;

/// A position in CSV data.
///
/// A position is used to report where a record starts: the number of chars
/// read before it, the line it starts on and its record index.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Position {
    char: u64,
    line: u64,
    record: u64,
}

impl Position {
    /// Returns a new position initialized to the start value.
    pub fn new() -> Position {
        Position { char: 0, line: 1, record: 0 }
    }

    /// The char offset, starting at `0`, of this position.
    pub fn char(&self) -> u64 {
        self.char
    }

    /// The line number, starting at `1`, of this position.
    ///
    /// Lines are counted by occurrences of `\n`.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The record index, starting at `0`, of this position.
    pub fn record(&self) -> u64 {
        self.record
    }

    /// Set the char offset of this position.
    pub fn set_char(&mut self, char: u64) -> &mut Position {
        self.char = char;
        self
    }

    /// Set the line number of this position.
    ///
    /// If the line number is less than `1`, then this method panics.
    pub fn set_line(&mut self, line: u64) -> &mut Position {
        assert!(line > 0);
        self.line = line;
        self
    }

    /// Set the record index of this position.
    pub fn set_record(&mut self, record: u64) -> &mut Position {
        self.record = record;
        self
    }
}

/// A single parsed CSV record.
///
/// Besides its fields, a record remembers which fields were enclosed in text
/// qualifiers, the raw text it was parsed from (when raw capture is enabled)
/// and where it started.
///
/// Records can also be built from any iterator of strings, which is handy
/// for writing:
///
/// ```
/// use qcsv::Record;
///
/// let record = Record::from(vec!["a", "b"]);
/// assert_eq!(record.len(), 2);
/// assert_eq!(&record[1], "b");
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Record {
    /// All fields in this record, stored contiguously.
    fields: String,
    /// The number of and location of each field in this record.
    bounds: Bounds,
    /// Whether each field was enclosed in text qualifiers.
    qualified: Vec<bool>,
    /// The source text of this record, without its terminator.
    raw: String,
    /// Where this record started, if it was read.
    position: Option<Position>,
}

impl Record {
    /// Create a new empty `Record`.
    pub fn new() -> Record {
        Record::default()
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.bounds.get(i).map(|range| &self.fields[range])
    }

    /// Returns true if and only if this record has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of fields in this record.
    pub fn len(&self) -> usize {
        self.bounds.len
    }

    /// Returns true if field `i` was enclosed in text qualifiers.
    ///
    /// Out of range indices are never qualified.
    pub fn is_qualified(&self, i: usize) -> bool {
        i < self.len() && self.qualified[i]
    }

    /// The raw source text of this record, without its terminator.
    ///
    /// This is empty when raw record capture was disabled.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Where this record started in its source, if it was read from one.
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Returns an iterator over all fields in this record.
    pub fn iter(&self) -> RecordIter {
        RecordIter { r: self, start: 0, i: 0 }
    }

    /// Copy the fields into owned strings.
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(|field| field.to_string()).collect()
    }

    /// Clear this record so that it has zero fields and no raw text.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.bounds.len = 0;
        self.qualified.clear();
        self.raw.clear();
        self.position = None;
    }

    /// Add a new field.
    pub fn push_field(&mut self, field: &str) {
        self.push(field, false);
    }

    pub(crate) fn push(&mut self, field: &str, qualified: bool) {
        self.fields.push_str(field);
        self.bounds.add(self.fields.len());
        self.qualified.push(qualified);
    }

    pub(crate) fn raw_mut(&mut self) -> &mut String {
        &mut self.raw
    }

    pub(crate) fn set_position(&mut self, pos: Option<Position>) {
        self.position = pos;
    }
}

/// The bounds of fields in a single record.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct Bounds {
    /// The ending index of each field. Guaranteed to fall on char boundaries.
    ends: Vec<usize>,
    /// The number of fields in this record.
    len: usize,
}

impl Bounds {
    /// Returns the bounds of field `i`.
    fn get(&self, i: usize) -> Option<ops::Range<usize>> {
        if i >= self.len {
            return None;
        }
        let end = *self.ends.get(i)?;
        let start = match i.checked_sub(1).and_then(|i| self.ends.get(i)) {
            None => 0,
            Some(&start) => start,
        };
        Some(ops::Range { start, end })
    }

    /// Returns a slice of ending positions of all fields.
    fn ends(&self) -> &[usize] {
        &self.ends[..self.len]
    }

    /// Expand the capacity for storing field ending positions.
    fn expand(&mut self) {
        let new_len = self.ends.len().saturating_mul(2);
        self.ends.resize(cmp::max(4, new_len), 0);
    }

    /// Add a new field with the given ending position.
    fn add(&mut self, pos: usize) {
        if self.len >= self.ends.len() {
            self.expand();
        }
        self.ends[self.len] = pos;
        self.len += 1;
    }
}

impl ops::Index<usize> for Record {
    type Output = str;

    fn index(&self, i: usize) -> &str {
        match self.get(i) {
            Some(field) => field,
            None => panic!(
                "field index {} out of range for record with {} fields",
                i,
                self.len()
            ),
        }
    }
}

impl<T: AsRef<str>> FromIterator<T> for Record {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Record {
        let mut record = Record::new();
        for field in iter {
            record.push_field(field.as_ref());
        }
        record
    }
}

impl<T: AsRef<str>> From<Vec<T>> for Record {
    fn from(fields: Vec<T>) -> Record {
        fields.into_iter().collect()
    }
}

impl<'a, T: AsRef<str>> From<&'a [T]> for Record {
    fn from(fields: &'a [T]) -> Record {
        fields.iter().collect()
    }
}

impl<'a> IntoIterator for &'a Record {
    type IntoIter = RecordIter<'a>;
    type Item = &'a str;

    fn into_iter(self) -> RecordIter<'a> {
        self.iter()
    }
}

/// An iterator over the fields in a record.
pub struct RecordIter<'a> {
    r: &'a Record,
    start: usize,
    i: usize,
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        match self.r.bounds.ends().get(self.i) {
            None => None,
            Some(&end) => {
                let field = &self.r.fields[self.start..end];
                self.start = end;
                self.i += 1;
                Some(field)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.r.len() - self.i;
        (n, Some(n))
    }
}

impl<'a> ExactSizeIterator for RecordIter<'a> {}
