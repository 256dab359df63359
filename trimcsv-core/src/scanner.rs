use memchr::{memchr, memchr3, memchr_iter};

/// The result of scanning at most one field from a document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReadFieldResult {
    /// The end of a field was found.
    ///
    /// Note that when `record_end` is true, then the end of this field also
    /// corresponds to the end of a record.
    Field {
        /// Whether this was the last field in a record or not.
        record_end: bool,
    },
    /// The whole document has been scanned.
    ///
    /// Once this is returned, every subsequent call returns it again until
    /// the scanner is reset.
    End,
}

impl ReadFieldResult {
    /// Returns true if and only if this result closes a record.
    pub fn is_record_end(&self) -> bool {
        match *self {
            ReadFieldResult::Field { record_end } => record_end,
            ReadFieldResult::End => false,
        }
    }
}

/// A scanner over one in-memory CSV document.
///
/// The scanner walks the document exactly once. Each call to `read_field`
/// appends the raw content of the next field to a caller provided buffer.
/// Quotes that open or close a quoted section are dropped and a doubled
/// quote inside a quoted section becomes a single quote; everything else is
/// copied verbatim, including surrounding whitespace.
///
/// # Dialect
///
/// * `,` separates fields and `\n` ends a record, but only outside quotes.
///   Inside quotes both are ordinary content.
/// * A `"` outside quotes opens a quoted section wherever it occurs in a
///   field. A `"` inside quotes that is not followed by another `"` closes
///   the section, and scanning continues in the same field.
/// * The last character of the document always ends the final field and
///   record. It is appended to the field first, whatever it is and whatever
///   the quote state is. So `a,` scans as one field `a,` and a trailing
///   `\n` lands in the last field (where trimming removes it).
/// * A document ending inside an unterminated quote still yields its last
///   record.
/// * An empty document yields no records at all.
#[derive(Clone, Debug)]
pub struct Scanner<'a> {
    /// The document being scanned.
    doc: &'a str,
    /// Byte offset of the next unscanned character.
    pos: usize,
    /// Whether the scanner is inside a quoted section.
    quoted: bool,
    /// The current line number, counting every line feed consumed so far.
    line: u64,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner positioned at the start of `doc`.
    pub fn new(doc: &'a str) -> Scanner<'a> {
        Scanner { doc: doc, pos: 0, quoted: false, line: 1 }
    }

    /// Rewind this scanner to the start of its document.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.quoted = false;
        self.line = 1;
    }

    /// The document this scanner reads.
    pub fn document(&self) -> &'a str {
        self.doc
    }

    /// The byte offset of the next character to be scanned.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The current line number, starting at `1`.
    ///
    /// Line feeds inside quoted fields are counted too.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Returns true if the scanner is currently inside a quoted section.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Returns true once the whole document has been consumed.
    pub fn is_done(&self) -> bool {
        self.pos >= self.doc.len()
    }

    /// Scan the next field, appending its raw content to `field`.
    ///
    /// `field` is not cleared first. Callers that reuse a buffer across
    /// fields should clear it between calls.
    pub fn read_field(&mut self, field: &mut String) -> ReadFieldResult {
        let doc = self.doc;
        let bytes = doc.as_bytes();
        if self.pos >= bytes.len() {
            return ReadFieldResult::End;
        }
        // Every byte we stop on is ASCII, so stopping on the final byte is
        // the same as stopping on the final character.
        let last = bytes.len() - 1;
        loop {
            let start = self.pos;
            if self.quoted {
                let at = match memchr(b'"', &bytes[start..]) {
                    None => return self.finish(field, start),
                    Some(i) => start + i,
                };
                self.copy(field, start, at);
                if at == last {
                    return self.finish(field, at);
                }
                if bytes[at + 1] == b'"' {
                    field.push('"');
                    self.pos = at + 2;
                    if self.pos == bytes.len() {
                        // The look-ahead swallowed the last character.
                        return ReadFieldResult::Field { record_end: true };
                    }
                } else {
                    self.quoted = false;
                    self.pos = at + 1;
                }
            } else {
                let at = match memchr3(b'"', b',', b'\n', &bytes[start..]) {
                    None => return self.finish(field, start),
                    Some(i) => start + i,
                };
                self.copy(field, start, at);
                if at == last {
                    return self.finish(field, at);
                }
                self.pos = at + 1;
                match bytes[at] {
                    b'"' => self.quoted = true,
                    b',' => {
                        return ReadFieldResult::Field { record_end: false };
                    }
                    _ => {
                        self.line += 1;
                        return ReadFieldResult::Field { record_end: true };
                    }
                }
            }
        }
    }

    /// Append `doc[start..end]` to `field`.
    #[inline]
    fn copy(&mut self, field: &mut String, start: usize, end: usize) {
        let chunk = &self.doc[start..end];
        self.line += memchr_iter(b'\n', chunk.as_bytes()).count() as u64;
        field.push_str(chunk);
    }

    /// Append the rest of the document, starting at `start`, to `field` and
    /// close the final record.
    fn finish(&mut self, field: &mut String, start: usize) -> ReadFieldResult {
        let end = self.doc.len();
        self.copy(field, start, end);
        self.pos = end;
        ReadFieldResult::Field { record_end: true }
    }
}

/// Strip leading and trailing whitespace from a raw field.
///
/// Whitespace is anything with the Unicode `White_Space` property, plus the
/// byte order mark `U+FEFF`.
pub fn trim(field: &str) -> &str {
    field.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

#[cfg(test)]
mod tests {
    use super::{trim, ReadFieldResult, Scanner};

    type Csv = Vec<Row>;
    type Row = Vec<String>;

    macro_rules! csv {
        ($([$($field:expr),*]),*) => {{
            #[allow(unused_mut)]
            fn x() -> Csv {
                let mut csv = Csv::new();
                $(
                    let mut row = Row::new();
                    $(
                        row.push(String::from($field));
                    )*
                    csv.push(row);
                )*
                csv
            }
            x()
        }}
    }

    macro_rules! parses_to {
        ($name:ident, $data:expr, $expected:expr) => {
            #[test]
            fn $name() {
                let got = parse(&mut Scanner::new($data), true);
                assert_eq!($expected, got);
            }
        };
    }

    macro_rules! scans_to {
        ($name:ident, $data:expr, $expected:expr) => {
            #[test]
            fn $name() {
                let got = parse(&mut Scanner::new($data), false);
                assert_eq!($expected, got);
            }
        };
    }

    fn parse(scanner: &mut Scanner, trimmed: bool) -> Csv {
        let mut csv = Csv::new();
        let mut row = Row::new();
        let mut field = String::new();
        loop {
            field.clear();
            match scanner.read_field(&mut field) {
                ReadFieldResult::Field { record_end } => {
                    if trimmed {
                        row.push(trim(&field).to_string());
                    } else {
                        row.push(field.clone());
                    }
                    if record_end {
                        csv.push(row);
                        row = Row::new();
                    }
                }
                ReadFieldResult::End => {
                    assert!(row.is_empty(), "partial row: {:?}", row);
                    return csv;
                }
            }
        }
    }

    parses_to!(empty, "", csv![]);
    parses_to!(one_row_one_field, "a", csv![["a"]]);
    parses_to!(one_row_many_fields, "a,b,c", csv![["a", "b", "c"]]);
    parses_to!(one_row_one_field_lf, "a\n", csv![["a"]]);
    parses_to!(one_row_many_fields_lf, "a,b,c\n", csv![["a", "b", "c"]]);
    parses_to!(one_row_trailing_comma_lf, "a,b,\n", csv![["a", "b", ""]]);
    parses_to!(many_rows_one_field, "a\nb", csv![["a"], ["b"]]);
    parses_to!(
        many_rows_many_fields,
        "a,b,c\nx,y,z", csv![["a", "b", "c"], ["x", "y", "z"]]);
    parses_to!(
        many_rows_many_fields_lf,
        "a,b,c\nx,y,z\n", csv![["a", "b", "c"], ["x", "y", "z"]]);
    parses_to!(ragged, "a,b\nc", csv![["a", "b"], ["c"]]);
    parses_to!(consecutive_commas, "a,,b", csv![["a", "", "b"]]);
    parses_to!(leading_comma, ",a", csv![["", "a"]]);
    parses_to!(only_lf, "\n", csv![[""]]);
    parses_to!(blank_line_kept, "a\n\nb", csv![["a"], [""], ["b"]]);
    parses_to!(
        many_trailing_lf, "a\n\n\n", csv![["a"], [""], [""]]);
    parses_to!(crlf_trimmed, "a,b\r\nc\r\n", csv![["a", "b"], ["c"]]);

    parses_to!(trim_unquoted, " hello ,x", csv![["hello", "x"]]);
    parses_to!(trim_quoted, "\" hello \",x", csv![["hello", "x"]]);
    parses_to!(trim_tabs, "\ta\t,\tb\t\n", csv![["a", "b"]]);
    parses_to!(trim_bom, "\u{FEFF}a,b", csv![["a", "b"]]);

    parses_to!(quote_delimiter, "\"a,b\",c", csv![["a,b", "c"]]);
    parses_to!(
        quote_doubled, "\"he said \"\"hi\"\"\",2",
        csv![["he said \"hi\"", "2"]]);
    parses_to!(
        quote_lf, "\"line1\nline2\",x", csv![["line1\nline2", "x"]]);
    parses_to!(quote_empty_lf, "\"\"\n", csv![[""]]);
    parses_to!(quote_then_text, "\"a\"b,c", csv![["ab", "c"]]);
    parses_to!(quote_mid_field, "a\"b,c\"d", csv![["ab,cd"]]);
    parses_to!(quote_unterminated, "\"a,b\nc", csv![["a,b\nc"]]);
    parses_to!(quote_doubled_at_end, "\"a\"\"", csv![["a\""]]);
    parses_to!(
        quote_doubled_at_end_second_row, "x\n\"a\"\"",
        csv![["x"], ["a\""]]);

    // The last character is always appended, even when it is a delimiter
    // or a quote.
    parses_to!(end_comma_is_content, "a,", csv![["a,"]]);
    parses_to!(end_comma_second_row, "a\nb,", csv![["a"], ["b,"]]);
    parses_to!(end_quote_closing, "x,\"y\"", csv![["x", "y\""]]);
    parses_to!(end_quote_lone, "\"", csv![["\""]]);
    parses_to!(end_quote_opening, "a,b\"", csv![["a", "b\""]]);

    parses_to!(
        unicode, "é, ü\n\"ñ,ß\",日本", csv![["é", "ü"], ["ñ,ß", "日本"]]);
    parses_to!(unicode_last_char, "a,日", csv![["a", "日"]]);

    scans_to!(raw_keeps_whitespace, " a , b ", csv![[" a ", " b "]]);
    scans_to!(raw_final_lf_appended, "a\n", csv![["a\n"]]);
    scans_to!(raw_inner_lf_dropped, "a\nb", csv![["a"], ["b"]]);
    scans_to!(raw_crlf, "a\r\nb", csv![["a\r"], ["b"]]);

    #[test]
    fn stream_fields() {
        use super::ReadFieldResult::*;

        let mut scanner = Scanner::new("foo,\"b,r\"\nbaz");
        let mut field = String::new();

        assert_eq!(Field { record_end: false }, scanner.read_field(&mut field));
        assert_eq!("foo", field);
        field.clear();

        assert_eq!(Field { record_end: true }, scanner.read_field(&mut field));
        assert_eq!("b,r", field);
        field.clear();

        assert_eq!(Field { record_end: true }, scanner.read_field(&mut field));
        assert_eq!("baz", field);
        field.clear();

        assert_eq!(End, scanner.read_field(&mut field));
        assert_eq!(End, scanner.read_field(&mut field));
        assert!(field.is_empty());
    }

    #[test]
    fn stream_empty() {
        let mut scanner = Scanner::new("");
        let mut field = String::new();
        assert!(scanner.is_done());
        assert_eq!(ReadFieldResult::End, scanner.read_field(&mut field));
    }

    #[test]
    fn field_buffer_not_cleared() {
        let mut scanner = Scanner::new("a,b");
        let mut field = String::new();
        scanner.read_field(&mut field);
        scanner.read_field(&mut field);
        assert_eq!("ab", field);
    }

    #[test]
    fn quote_state_visible() {
        let mut scanner = Scanner::new("\"a,b");
        let mut field = String::new();
        assert!(!scanner.is_quoted());
        assert!(scanner.read_field(&mut field).is_record_end());
        assert!(scanner.is_quoted());
        assert_eq!("a,b", field);
    }

    #[test]
    fn reset_works() {
        let mut scanner = Scanner::new("\"a\nb\",c\nd");
        let first = parse(&mut scanner, true);
        assert!(scanner.is_done());
        assert_eq!(3, scanner.line());

        scanner.reset();
        assert!(!scanner.is_done());
        assert_eq!(0, scanner.position());
        assert_eq!(1, scanner.line());
        assert_eq!(first, parse(&mut scanner, true));
    }

    #[test]
    fn line_numbers() {
        let mut scanner = Scanner::new("\n\nfoo,\"x\ny\"\nbar");
        let mut field = String::new();
        assert_eq!(1, scanner.line());

        scanner.read_field(&mut field);
        assert_eq!(2, scanner.line());
        scanner.read_field(&mut field);
        assert_eq!(3, scanner.line());

        scanner.read_field(&mut field);
        assert_eq!(3, scanner.line());
        assert_eq!(6, scanner.position());

        scanner.read_field(&mut field);
        assert_eq!(5, scanner.line());

        scanner.read_field(&mut field);
        assert_eq!(5, scanner.line());
        assert!(scanner.is_done());
    }

    #[test]
    fn trim_unicode_space() {
        assert_eq!("a", trim("\u{00A0}a\u{2003}"));
        assert_eq!("a b", trim("  a b\n"));
        assert_eq!("", trim(" \t\r\n"));
    }
}
