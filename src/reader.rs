use std::marker::PhantomData;

use log::{debug, trace};
use serde::de::DeserializeOwned;
use trimcsv_core::{trim, ReadFieldResult, Scanner};

use crate::error::Result;
use crate::record::Record;

/// Builds a CSV reader with various configuration knobs.
///
/// The dialect itself is fixed (`,` separated, `\n` terminated, `"`
/// quoted). What can be configured is how the reader presents records.
#[derive(Debug)]
pub struct ReaderBuilder {
    has_headers: bool,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder { has_headers: false }
    }
}

impl ReaderBuilder {
    /// Create a new builder for configuring CSV parsing.
    ///
    /// To convert a builder into a reader, call `ReaderBuilder::from_str`.
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Build a CSV reader over the given document.
    ///
    /// # Example
    ///
    /// ```
    /// use trimcsv::ReaderBuilder;
    ///
    /// let data = "city, pop\nBoston, 4628910\n";
    /// let mut rdr = ReaderBuilder::new().has_headers(true).from_str(data);
    /// assert_eq!(rdr.headers(), vec!["city", "pop"]);
    /// for record in rdr.records() {
    ///     assert_eq!(record, vec!["Boston", "4628910"]);
    /// }
    /// ```
    pub fn from_str<'a>(&self, doc: &'a str) -> Reader<'a> {
        Reader::new(self, doc)
    }

    /// Whether to treat the first row as a special header row.
    ///
    /// By default this is disabled, and the first row is returned by the
    /// record iterators like any other. When enabled, the first row is only
    /// available through `Reader::headers`, and deserialization matches
    /// struct fields by header name.
    ///
    /// `Reader::headers` returns the first row either way.
    pub fn has_headers(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.has_headers = yes;
        self
    }
}

/// A pull based CSV reader over one in-memory document.
///
/// Every field is trimmed of surrounding whitespace, quoted or not. The
/// reader never fails: unterminated quotes, ragged rows and stray quotes all
/// still produce records. See `trimcsv_core::Scanner` for the exact dialect.
///
/// The `'a` lifetime refers to the document being read.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    /// The low level scanner.
    core: Scanner<'a>,
    /// Buffer for the field currently being scanned.
    field: String,
    /// Whether the first record is a header row.
    has_headers: bool,
    /// The first record, once it has been read.
    headers: Option<Record>,
    /// Set when the first record was read by `headers` but still has to be
    /// yielded as a record.
    first_pending: bool,
    /// Where the next record starts.
    pos: Position,
}

impl<'a> Reader<'a> {
    fn new(builder: &ReaderBuilder, doc: &'a str) -> Reader<'a> {
        Reader {
            core: Scanner::new(doc),
            field: String::new(),
            has_headers: builder.has_headers,
            headers: None,
            first_pending: false,
            pos: Position::new(),
        }
    }

    /// Create a new CSV reader with a default configuration for the given
    /// document.
    ///
    /// # Example
    ///
    /// ```
    /// use trimcsv::Reader;
    ///
    /// let mut rdr = Reader::from_str("a, b\n\"c, d\"\n");
    /// let rows: Vec<_> = rdr.records().map(|r| r.into_vec()).collect();
    /// assert_eq!(rows, vec![vec!["a", "b"], vec!["c, d"]]);
    /// ```
    pub fn from_str(doc: &'a str) -> Reader<'a> {
        ReaderBuilder::new().from_str(doc)
    }

    /// Returns a borrowed iterator over all records.
    ///
    /// If `has_headers` was enabled, the header row is skipped.
    pub fn records(&mut self) -> RecordsIter<'_, 'a> {
        RecordsIter { rdr: self, rec: Record::new() }
    }

    /// Returns an owned iterator over all records.
    pub fn into_records(self) -> RecordsIntoIter<'a> {
        RecordsIntoIter { rdr: self, rec: Record::new() }
    }

    /// Returns a borrowed iterator over deserialized records.
    ///
    /// Each item is deserialized with serde. If `has_headers` was enabled,
    /// structs and maps are filled by matching header names. Otherwise
    /// values are taken in column order.
    ///
    /// # Example
    ///
    /// ```
    /// use serde::Deserialize;
    /// use trimcsv::ReaderBuilder;
    ///
    /// #[derive(Debug, Deserialize, PartialEq)]
    /// struct Row {
    ///     city: String,
    ///     pop: Option<u64>,
    /// }
    ///
    /// let data = "pop,city\n9686, Boston\n,Kinston\n";
    /// let mut rdr = ReaderBuilder::new().has_headers(true).from_str(data);
    /// let rows = rdr.deserialize().collect::<trimcsv::Result<Vec<Row>>>()
    ///     .unwrap();
    /// assert_eq!(rows[0], Row { city: "Boston".into(), pop: Some(9686) });
    /// assert_eq!(rows[1], Row { city: "Kinston".into(), pop: None });
    /// ```
    pub fn deserialize<D>(&mut self) -> DeserializeRecordsIter<'_, 'a, D>
    where
        D: DeserializeOwned,
    {
        DeserializeRecordsIter::new(self)
    }

    /// Returns an owned iterator over deserialized records.
    pub fn into_deserialize<D>(self) -> DeserializeRecordsIntoIter<'a, D>
    where
        D: DeserializeOwned,
    {
        DeserializeRecordsIntoIter::new(self)
    }

    /// Returns the first row of the document.
    ///
    /// The first row is read if it has not been already. This may be called
    /// at any time and regardless of whether `has_headers` is set. When
    /// `has_headers` is disabled, a first row read here is still yielded by
    /// the record iterators afterwards.
    ///
    /// For an empty document, the returned record has no fields.
    pub fn headers(&mut self) -> &Record {
        if self.headers.is_none() {
            let mut headers = Record::new();
            if self.read_record_raw(&mut headers) {
                debug!("read CSV headers: {:?}", headers);
                self.first_pending = !self.has_headers;
            } else {
                self.headers = Some(headers);
            }
        }
        match self.headers {
            Some(ref headers) => headers,
            None => unreachable!("headers were just read"),
        }
    }

    /// Returns true if the header row is excluded from records.
    pub fn has_headers(&self) -> bool {
        self.has_headers
    }

    /// Read the next record into `record`.
    ///
    /// Returns `false` once the document is exhausted, in which case
    /// `record` is left empty. The record's previous contents are discarded
    /// and its allocation reused.
    ///
    /// # Example
    ///
    /// ```
    /// use trimcsv::{Reader, Record};
    ///
    /// let mut rdr = Reader::from_str("a,b\nc");
    /// let mut record = Record::new();
    /// let mut count = 0;
    /// while rdr.read_record(&mut record) {
    ///     count += 1;
    /// }
    /// assert_eq!(count, 2);
    /// ```
    pub fn read_record(&mut self, record: &mut Record) -> bool {
        if self.headers.is_none() && self.has_headers {
            self.headers();
        }
        if self.first_pending {
            self.first_pending = false;
            if let Some(ref headers) = self.headers {
                record.clone_from(headers);
                return true;
            }
        }
        self.read_record_raw(record)
    }

    /// The position at which the next record starts.
    pub fn position(&self) -> &Position {
        &self.pos
    }

    /// Returns true once every record has been read.
    pub fn is_done(&self) -> bool {
        !self.first_pending && self.core.is_done()
    }

    /// Read the next record straight from the scanner.
    fn read_record_raw(&mut self, record: &mut Record) -> bool {
        record.clear();
        let pos = self.pos.clone();
        loop {
            self.field.clear();
            match self.core.read_field(&mut self.field) {
                ReadFieldResult::Field { record_end } => {
                    record.push_field(trim(&self.field));
                    if record_end {
                        break;
                    }
                }
                ReadFieldResult::End => {
                    debug_assert!(record.is_empty());
                    return false;
                }
            }
        }
        trace!("record {} at line {}: {:?}", pos.record, pos.line, record);
        let first = pos.record == 0;
        record.set_position(Some(pos));
        if first && self.headers.is_none() {
            self.headers = Some(record.clone());
        }
        self.pos.byte = self.core.position() as u64;
        self.pos.line = self.core.line();
        self.pos.record += 1;
        true
    }
}

/// A position in a CSV document.
///
/// Positions are attached to records and describe where each one starts.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Position {
    byte: u64,
    line: u64,
    record: u64,
}

impl Default for Position {
    fn default() -> Position {
        Position::new()
    }
}

impl Position {
    /// Returns a new position initialized to the start value.
    pub fn new() -> Position {
        Position { byte: 0, line: 1, record: 0 }
    }

    /// The byte offset, starting at `0`.
    pub fn byte(&self) -> u64 {
        self.byte
    }

    /// The line number, starting at `1`.
    ///
    /// Line feeds inside quoted fields count as line breaks.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The record index, starting at `0`.
    pub fn record(&self) -> u64 {
        self.record
    }

    /// Set the byte offset.
    pub fn set_byte(&mut self, byte: u64) -> &mut Position {
        self.byte = byte;
        self
    }

    /// Set the line number.
    pub fn set_line(&mut self, line: u64) -> &mut Position {
        assert!(line > 0);
        self.line = line;
        self
    }

    /// Set the record index.
    pub fn set_record(&mut self, record: u64) -> &mut Position {
        self.record = record;
        self
    }
}

/// A borrowed iterator over records.
///
/// The `'r` lifetime refers to the reader, and `'a` to its document.
pub struct RecordsIter<'r, 'a> {
    rdr: &'r mut Reader<'a>,
    rec: Record,
}

impl<'r, 'a> RecordsIter<'r, 'a> {
    /// Return a reference to the underlying reader.
    pub fn reader(&self) -> &Reader<'a> {
        &self.rdr
    }
}

impl<'r, 'a> Iterator for RecordsIter<'r, 'a> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.rdr.read_record(&mut self.rec) {
            Some(self.rec.clone())
        } else {
            None
        }
    }
}

/// An owned iterator over records.
pub struct RecordsIntoIter<'a> {
    rdr: Reader<'a>,
    rec: Record,
}

impl<'a> RecordsIntoIter<'a> {
    /// Return a reference to the underlying reader.
    pub fn reader(&self) -> &Reader<'a> {
        &self.rdr
    }

    /// Drop this iterator and return the underlying reader.
    pub fn into_reader(self) -> Reader<'a> {
        self.rdr
    }
}

impl<'a> Iterator for RecordsIntoIter<'a> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.rdr.read_record(&mut self.rec) {
            Some(self.rec.clone())
        } else {
            None
        }
    }
}

/// A borrowed iterator over deserialized records.
///
/// The type parameter `D` refers to the type that each record is
/// deserialized into.
pub struct DeserializeRecordsIter<'r, 'a, D> {
    rdr: &'r mut Reader<'a>,
    rec: Record,
    headers: Option<Record>,
    _priv: PhantomData<D>,
}

impl<'r, 'a, D: DeserializeOwned> DeserializeRecordsIter<'r, 'a, D> {
    fn new(rdr: &'r mut Reader<'a>) -> DeserializeRecordsIter<'r, 'a, D> {
        let headers = if rdr.has_headers {
            Some(rdr.headers().clone())
        } else {
            None
        };
        DeserializeRecordsIter {
            rdr: rdr,
            rec: Record::new(),
            headers: headers,
            _priv: PhantomData,
        }
    }

    /// Return a reference to the underlying reader.
    pub fn reader(&self) -> &Reader<'a> {
        &self.rdr
    }
}

impl<'r, 'a, D: DeserializeOwned> Iterator
    for DeserializeRecordsIter<'r, 'a, D>
{
    type Item = Result<D>;

    fn next(&mut self) -> Option<Result<D>> {
        if self.rdr.read_record(&mut self.rec) {
            Some(self.rec.deserialize(self.headers.as_ref()))
        } else {
            None
        }
    }
}

/// An owned iterator over deserialized records.
pub struct DeserializeRecordsIntoIter<'a, D> {
    rdr: Reader<'a>,
    rec: Record,
    headers: Option<Record>,
    _priv: PhantomData<D>,
}

impl<'a, D: DeserializeOwned> DeserializeRecordsIntoIter<'a, D> {
    fn new(mut rdr: Reader<'a>) -> DeserializeRecordsIntoIter<'a, D> {
        let headers = if rdr.has_headers {
            Some(rdr.headers().clone())
        } else {
            None
        };
        DeserializeRecordsIntoIter {
            rdr: rdr,
            rec: Record::new(),
            headers: headers,
            _priv: PhantomData,
        }
    }

    /// Return a reference to the underlying reader.
    pub fn reader(&self) -> &Reader<'a> {
        &self.rdr
    }

    /// Drop this iterator and return the underlying reader.
    pub fn into_reader(self) -> Reader<'a> {
        self.rdr
    }
}

impl<'a, D: DeserializeOwned> Iterator for DeserializeRecordsIntoIter<'a, D> {
    type Item = Result<D>;

    fn next(&mut self) -> Option<Result<D>> {
        if self.rdr.read_record(&mut self.rec) {
            Some(self.rec.deserialize(self.headers.as_ref()))
        } else {
            None
        }
    }
}
