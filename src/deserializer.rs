use std::error::Error as StdError;
use std::fmt;
use std::iter::Peekable;
use std::str::FromStr;

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{
    self, Deserialize, DeserializeSeed, Deserializer, MapAccess, SeqAccess,
    Visitor,
};

use crate::record::{Record, RecordIter};

/// Deserialize one record, optionally keyed by a header record.
///
/// Fields are handed out left to right, already trimmed, and borrowed from
/// the record.
pub fn deserialize_record<'r, D: Deserialize<'r>>(
    record: &'r Record,
    headers: Option<&'r Record>,
) -> Result<D, DeserializeError> {
    let mut row = RowDeserializer {
        fields: record.iter().peekable(),
        headers: headers.map(|h| h.iter()),
        next: 0,
    };
    D::deserialize(&mut row)
}

struct RowDeserializer<'r> {
    fields: Peekable<RecordIter<'r>>,
    headers: Option<RecordIter<'r>>,
    /// Index of the next field to hand out.
    next: u64,
}

impl<'r> RowDeserializer<'r> {
    fn take(&mut self) -> Result<&'r str, DeserializeError> {
        match self.fields.next() {
            Some(field) => {
                self.next += 1;
                Ok(field)
            }
            None => Err(DeserializeError {
                field: Some(self.next),
                kind: DeserializeErrorKind::UnexpectedEndOfRow,
            }),
        }
    }

    /// An empty field, or no field at all, stands for a missing value.
    fn at_missing_value(&mut self) -> bool {
        self.fields.peek().map_or(true, |f| f.is_empty())
    }

    fn parse<T: FromStr>(
        &mut self,
        expected: &'static str,
    ) -> Result<T, DeserializeError> {
        let field = self.take()?;
        field.parse().map_err(|_| self.invalid(expected, field))
    }

    fn invalid(&self, expected: &'static str, value: &str) -> DeserializeError {
        DeserializeError {
            field: self.next.checked_sub(1),
            kind: DeserializeErrorKind::Invalid {
                expected,
                value: value.to_string(),
            },
        }
    }
}

macro_rules! parse_field {
    ($($method:ident => $visit:ident($ty:ty),)*) => {
        $(
            fn $method<V: Visitor<'de>>(
                self,
                visitor: V,
            ) -> Result<V::Value, DeserializeError> {
                visitor.$visit(self.parse::<$ty>(stringify!($ty))?)
            }
        )*
    };
}

impl<'a, 'de> Deserializer<'de> for &'a mut RowDeserializer<'de> {
    type Error = DeserializeError;

    /// Without a type hint, a field is its trimmed text.
    fn deserialize_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        visitor.visit_borrowed_str(self.take()?)
    }

    serde::forward_to_deserialize_any! {
        str string identifier
    }

    parse_field! {
        deserialize_bool => visit_bool(bool),
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_f32 => visit_f32(f32),
        deserialize_f64 => visit_f64(f64),
        deserialize_char => visit_char(char),
    }

    fn deserialize_bytes<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        visitor.visit_borrowed_bytes(self.take()?.as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        if !self.at_missing_value() {
            return visitor.visit_some(self);
        }
        if self.fields.next().is_some() {
            self.next += 1;
        }
        visitor.visit_none()
    }

    fn deserialize_unit<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        if let Some(field) = self.fields.next() {
            self.next += 1;
            if !field.is_empty() {
                return Err(self.invalid("an empty field", field));
            }
        }
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        visitor.visit_newtype_struct(self)
    }

    /// A sequence takes every field left in the row.
    fn deserialize_seq<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        visitor.visit_seq(self)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        visitor.visit_seq(Columns { row: self, left: len })
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        visitor.visit_seq(Columns { row: self, left: len })
    }

    fn deserialize_map<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        if self.headers.is_none() {
            return Err(DeserializeError {
                field: None,
                kind: DeserializeErrorKind::Unsupported("a map without headers"),
            });
        }
        visitor.visit_map(self)
    }

    /// With headers, struct fields are matched by name. Without them, they
    /// are filled in column order.
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        if self.headers.is_some() {
            visitor.visit_map(self)
        } else {
            visitor.visit_seq(Columns { row: self, left: fields.len() })
        }
    }

    /// Only unit variants can be named by a single field.
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        let field = self.take()?;
        let at = self.next - 1;
        BorrowedStrDeserializer::<DeserializeError>::new(field)
            .deserialize_enum(name, variants, visitor)
            .map_err(|mut err| {
                err.field.get_or_insert(at);
                err
            })
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DeserializeError> {
        self.take()?;
        visitor.visit_unit()
    }
}

impl<'a, 'de> SeqAccess<'de> for &'a mut RowDeserializer<'de> {
    type Error = DeserializeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DeserializeError> {
        if self.fields.peek().is_none() {
            return Ok(None);
        }
        seed.deserialize(&mut **self).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.fields.len())
    }
}

/// A fixed number of columns, as for tuples and structs without headers.
///
/// Unlike an open sequence, every element is asked for even past the end of
/// the row, so trailing optional values come out as `None`.
struct Columns<'a, 'r> {
    row: &'a mut RowDeserializer<'r>,
    left: usize,
}

impl<'a, 'de> SeqAccess<'de> for Columns<'a, 'de> {
    type Error = DeserializeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DeserializeError> {
        if self.left == 0 {
            return Ok(None);
        }
        self.left -= 1;
        seed.deserialize(&mut *self.row).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.left)
    }
}

/// Pairs header names with fields until either runs out, so a short row
/// leaves trailing struct fields absent.
impl<'a, 'de> MapAccess<'de> for &'a mut RowDeserializer<'de> {
    type Error = DeserializeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DeserializeError> {
        if self.fields.peek().is_none() {
            return Ok(None);
        }
        match self.headers.as_mut().and_then(|h| h.next()) {
            None => Ok(None),
            Some(name) => seed
                .deserialize(BorrowedStrDeserializer::<DeserializeError>::new(
                    name,
                ))
                .map(Some),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, DeserializeError> {
        seed.deserialize(&mut **self)
    }
}

/// An error that occurred while deserializing a record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeserializeError {
    field: Option<u64>,
    kind: DeserializeErrorKind,
}

impl DeserializeError {
    /// The index (starting at 0) of the field that caused this error, if
    /// known.
    pub fn field(&self) -> Option<u64> {
        self.field
    }

    /// The kind of this error.
    pub fn kind(&self) -> &DeserializeErrorKind {
        &self.kind
    }
}

/// The kind of a deserialization error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeserializeErrorKind {
    /// A message from serde or from the target type.
    Message(String),
    /// A shape that cannot be read from a row, such as a map with no
    /// header row to supply its keys.
    Unsupported(&'static str),
    /// The row ran out of fields before the value was complete.
    UnexpectedEndOfRow,
    /// A field's text is not a valid value of the expected type.
    Invalid {
        /// The type that was expected.
        expected: &'static str,
        /// The trimmed field text.
        value: String,
    },
}

impl de::Error for DeserializeError {
    fn custom<T: fmt::Display>(msg: T) -> DeserializeError {
        DeserializeError {
            field: None,
            kind: DeserializeErrorKind::Message(msg.to_string()),
        }
    }
}

impl StdError for DeserializeError {}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.field {
            Some(field) => write!(f, "field {}: {}", field, self.kind),
            None => self.kind.fmt(f),
        }
    }
}

impl fmt::Display for DeserializeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DeserializeErrorKind::Message(ref msg) => f.write_str(msg),
            DeserializeErrorKind::Unsupported(what) => {
                write!(f, "cannot deserialize {} from a row", what)
            }
            DeserializeErrorKind::UnexpectedEndOfRow => {
                f.write_str("row ended before the value was complete")
            }
            DeserializeErrorKind::Invalid { expected, ref value } => {
                write!(f, "expected {}, found {:?}", expected, value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::de::DeserializeOwned;
    use serde::Deserialize;
    use serde_bytes::ByteBuf;

    use crate::record::Record;

    use super::{deserialize_record, DeserializeError, DeserializeErrorKind};

    fn by_column<D: DeserializeOwned>(
        fields: &[&str],
    ) -> Result<D, DeserializeError> {
        deserialize_record(&Record::from(fields), None)
    }

    fn by_header<D: DeserializeOwned>(
        headers: &[&str],
        fields: &[&str],
    ) -> Result<D, DeserializeError> {
        deserialize_record(&Record::from(fields), Some(&Record::from(headers)))
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct City {
        name: String,
        pop: Option<u64>,
        coastal: bool,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Region {
        North,
        South,
    }

    #[test]
    fn struct_in_column_order() {
        let got: City = by_column(&["Boston", "9686", "true"]).unwrap();
        assert_eq!(got, City { name: "Boston".into(), pop: Some(9686), coastal: true });
    }

    #[test]
    fn struct_by_header_name() {
        let got: City =
            by_header(&["coastal", "pop", "name"], &["false", "", "Kinston"])
                .unwrap();
        assert_eq!(got, City { name: "Kinston".into(), pop: None, coastal: false });
    }

    #[test]
    fn header_extra_columns_ignored() {
        let got: City = by_header(
            &["id", "name", "pop", "coastal", "note"],
            &["7", "Salem", "44", "true", "old"],
        )
        .unwrap();
        assert_eq!(got, City { name: "Salem".into(), pop: Some(44), coastal: true });
    }

    #[test]
    fn short_row_leaves_optional_fields_absent() {
        let got: City =
            by_header(&["name", "coastal", "pop"], &["Ames", "false"]).unwrap();
        assert_eq!(got, City { name: "Ames".into(), pop: None, coastal: false });

        let err =
            by_header::<City>(&["name", "pop", "coastal"], &["Ames"]).unwrap_err();
        match *err.kind() {
            DeserializeErrorKind::Message(ref msg) => {
                assert!(msg.contains("coastal"), "{}", msg)
            }
            ref kind => panic!("unexpected error kind: {:?}", kind),
        }
    }

    #[test]
    fn empty_and_missing_fields_are_none() {
        let got: (Option<u8>, Option<u8>, Option<u8>) =
            by_column(&["", "5"]).unwrap();
        assert_eq!(got, (None, Some(5), None));
    }

    #[test]
    fn sequence_takes_rest_of_row() {
        let got: (String, Vec<Option<i32>>) =
            by_column(&["xs", "1", "", "-3"]).unwrap();
        assert_eq!(got, ("xs".to_string(), vec![Some(1), None, Some(-3)]));
    }

    #[test]
    fn borrows_from_record() {
        let rec = Record::from(vec!["a b", "c"]);
        let got: (&str, &str) = deserialize_record(&rec, None).unwrap();
        assert_eq!(got, ("a b", "c"));
    }

    #[test]
    fn bytes_and_chars() {
        let got: (ByteBuf, char) = by_column(&["abc", "é"]).unwrap();
        assert_eq!(got.0.into_vec(), b"abc".to_vec());
        assert_eq!(got.1, 'é');
    }

    #[test]
    fn untyped_values_are_text() {
        let got: BTreeMap<String, String> =
            by_header(&["a", "b"], &["1", "true"]).unwrap();
        assert_eq!(got["a"], "1");
        assert_eq!(got["b"], "true");
    }

    #[test]
    fn map_needs_headers() {
        let err = by_column::<BTreeMap<String, String>>(&["1"]).unwrap_err();
        assert_eq!(
            *err.kind(),
            DeserializeErrorKind::Unsupported("a map without headers")
        );
    }

    #[test]
    fn unit_variants() {
        let got: Vec<Region> = by_column(&["north", "south"]).unwrap();
        assert_eq!(got, vec![Region::North, Region::South]);

        let err = by_column::<(Region, Region)>(&["north", "west"]).unwrap_err();
        assert_eq!(err.field(), Some(1));
    }

    #[test]
    fn unit_needs_empty_field() {
        assert!(by_column::<((), u8)>(&["", "1"]).is_ok());
        let err = by_column::<()>(&["x"]).unwrap_err();
        assert_eq!(err.field(), Some(0));
    }

    #[test]
    fn invalid_field_reports_index() {
        let err = by_column::<(u8, u8, u8)>(&["1", "2", "300"]).unwrap_err();
        assert_eq!(err.field(), Some(2));
        assert_eq!(
            *err.kind(),
            DeserializeErrorKind::Invalid {
                expected: "u8",
                value: "300".to_string(),
            }
        );
        assert_eq!(err.to_string(), "field 2: expected u8, found \"300\"");
    }

    #[test]
    fn bool_is_strict() {
        let err = by_column::<bool>(&["yes"]).unwrap_err();
        assert_eq!(err.field(), Some(0));
    }

    #[test]
    fn short_row_in_column_order() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Town {
            name: String,
            pop: Option<u64>,
        }

        let got: Town = by_column(&["Ames"]).unwrap();
        assert_eq!(got, Town { name: "Ames".into(), pop: None });

        let err = by_column::<City>(&["Ames", ""]).unwrap_err();
        assert_eq!(err.field(), Some(2));
        assert_eq!(*err.kind(), DeserializeErrorKind::UnexpectedEndOfRow);
    }

    #[test]
    fn end_of_row() {
        let err = by_column::<(String, f64)>(&["only"]).unwrap_err();
        assert_eq!(err.field(), Some(1));
        assert_eq!(*err.kind(), DeserializeErrorKind::UnexpectedEndOfRow);
    }
}
