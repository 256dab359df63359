use std::fmt;
use std::iter::FromIterator;
use std::ops::{self, Range};

use serde::de::Deserialize;

use crate::deserializer::deserialize_record;
use crate::error::{Error, Result};
use crate::reader::Position;

/// A single CSV record of trimmed UTF-8 fields.
///
/// All fields are stored contiguously in one buffer, so reading many records
/// into the same `Record` with `Reader::read_record` amortizes allocation.
///
/// Two records are equal when their fields are equal. Their positions are
/// not compared.
#[derive(Clone)]
pub struct Record {
    /// Position of this record in the document it was read from, if any.
    pos: Option<Position>,
    /// All fields in this record, stored contiguously.
    fields: String,
    /// The end offset of each field in `fields`.
    ends: Vec<usize>,
}

impl Default for Record {
    fn default() -> Record {
        Record::new()
    }
}

impl Record {
    /// Create a new empty `Record`.
    pub fn new() -> Record {
        Record::with_capacity(0, 0)
    }

    /// Create a new empty `Record` with room for `buffer` bytes of field
    /// data spread over `fields` fields.
    pub fn with_capacity(buffer: usize, fields: usize) -> Record {
        Record {
            pos: None,
            fields: String::with_capacity(buffer),
            ends: Vec::with_capacity(fields),
        }
    }

    /// Deserialize this record into a value of type `D`.
    ///
    /// When `headers` is given, structs and maps are filled by matching
    /// header names to field names. Otherwise values are taken in column
    /// order. Fields may be borrowed directly from this record.
    ///
    /// # Example
    ///
    /// ```
    /// use serde::Deserialize;
    /// use trimcsv::Record;
    ///
    /// #[derive(Deserialize)]
    /// struct Row<'a> {
    ///     city: &'a str,
    ///     pop: u64,
    /// }
    ///
    /// let headers = Record::from(vec!["pop", "city"]);
    /// let record = Record::from(vec!["9686", "Boston"]);
    /// let row: Row = record.deserialize(Some(&headers)).unwrap();
    /// assert_eq!(row.city, "Boston");
    /// assert_eq!(row.pop, 9686);
    /// ```
    pub fn deserialize<'de, D: Deserialize<'de>>(
        &'de self,
        headers: Option<&'de Record>,
    ) -> Result<D> {
        deserialize_record(self, headers).map_err(|err| Error::Deserialize {
            pos: self.pos.clone(),
            err: err,
        })
    }

    /// Returns an iterator over all fields in this record.
    pub fn iter(&self) -> RecordIter {
        self.into_iter()
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.bounds(i).map(|range| &self.fields[range])
    }

    /// Returns true if and only if this record has no fields.
    ///
    /// Records produced by a reader always have at least one field.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of fields in this record.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Shrink this record to at most `n` fields.
    pub fn truncate(&mut self, n: usize) {
        if n >= self.len() {
            return;
        }
        if n == 0 {
            self.clear();
            return;
        }
        let end = self.ends[n - 1];
        self.fields.truncate(end);
        self.ends.truncate(n);
    }

    /// Clear this record so that it has zero fields.
    ///
    /// The position is cleared too. Note that it is not necessary to clear
    /// the record to reuse it with a reader.
    pub fn clear(&mut self) {
        self.pos = None;
        self.fields.clear();
        self.ends.clear();
    }

    /// Add a new field to the end of this record.
    ///
    /// The field is stored as given. Fields read by a reader are already
    /// trimmed.
    pub fn push_field(&mut self, field: &str) {
        self.fields.push_str(field);
        self.ends.push(self.fields.len());
    }

    /// Return the position of this record in its document, if known.
    pub fn position(&self) -> Option<&Position> {
        self.pos.as_ref()
    }

    /// Set the position of this record.
    pub fn set_position(&mut self, pos: Option<Position>) {
        self.pos = pos;
    }

    /// Copy the fields of this record into a vector of owned strings.
    pub fn into_vec(self) -> Vec<String> {
        self.iter().map(|field| field.to_string()).collect()
    }

    /// Returns the byte range of field `i` within `fields`.
    fn bounds(&self, i: usize) -> Option<Range<usize>> {
        let end = match self.ends.get(i) {
            None => return None,
            Some(&end) => end,
        };
        let start = match i.checked_sub(1).and_then(|i| self.ends.get(i)) {
            None => 0,
            Some(&start) => start,
        };
        Some(start..end)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fields: Vec<&str> = self.iter().collect();
        write!(f, "Record({:?})", fields)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Record) -> bool {
        self.ends == other.ends && self.fields == other.fields
    }
}

impl Eq for Record {}

impl<T: AsRef<str>> PartialEq<[T]> for Record {
    fn eq(&self, other: &[T]) -> bool {
        self.len() == other.len()
            && self.iter().zip(other).all(|(a, b)| a == b.as_ref())
    }
}

impl<'a, T: AsRef<str>> PartialEq<[T]> for &'a Record {
    fn eq(&self, other: &[T]) -> bool {
        **self == *other
    }
}

impl<T: AsRef<str>> PartialEq<Vec<T>> for Record {
    fn eq(&self, other: &Vec<T>) -> bool {
        *self == other[..]
    }
}

impl<'a, T: AsRef<str>> PartialEq<Vec<T>> for &'a Record {
    fn eq(&self, other: &Vec<T>) -> bool {
        **self == other[..]
    }
}

impl ops::Index<usize> for Record {
    type Output = str;

    fn index(&self, i: usize) -> &str {
        match self.get(i) {
            Some(field) => field,
            None => panic!(
                "field index {} out of bounds for record of length {}",
                i,
                self.len()
            ),
        }
    }
}

impl<T: AsRef<str>> Extend<T> for Record {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for field in iter {
            self.push_field(field.as_ref());
        }
    }
}

impl<T: AsRef<str>> FromIterator<T> for Record {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Record {
        let mut record = Record::new();
        record.extend(iter);
        record
    }
}

impl<T: AsRef<str>> From<Vec<T>> for Record {
    fn from(xs: Vec<T>) -> Record {
        Record::from_iter(xs)
    }
}

impl<'a, T: AsRef<str>> From<&'a [T]> for Record {
    fn from(xs: &'a [T]) -> Record {
        Record::from_iter(xs)
    }
}

impl From<Record> for Vec<String> {
    fn from(record: Record) -> Vec<String> {
        record.into_vec()
    }
}

impl<'r> IntoIterator for &'r Record {
    type IntoIter = RecordIter<'r>;
    type Item = &'r str;

    fn into_iter(self) -> RecordIter<'r> {
        RecordIter { r: self, front: 0, back: self.len() }
    }
}

/// An iterator over the fields in a record.
///
/// The `'r` lifetime variable refers to the lifetime of the `Record` that
/// is being iterated over.
#[derive(Clone)]
pub struct RecordIter<'r> {
    r: &'r Record,
    /// Index of the next field yielded from the front.
    front: usize,
    /// One past the index of the next field yielded from the back.
    back: usize,
}

impl<'r> Iterator for RecordIter<'r> {
    type Item = &'r str;

    fn next(&mut self) -> Option<&'r str> {
        if self.front == self.back {
            return None;
        }
        let field = self.r.get(self.front);
        self.front += 1;
        field
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<'r> DoubleEndedIterator for RecordIter<'r> {
    fn next_back(&mut self) -> Option<&'r str> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        self.r.get(self.back)
    }
}

impl<'r> ExactSizeIterator for RecordIter<'r> {}
