use std::error;
use std::fmt;
use std::result;

use crate::deserializer::DeserializeError;
use crate::reader::Position;

/// A type alias for `Result<T, trimcsv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when processing CSV data.
///
/// Parsing itself never fails: every document, however badly quoted, has a
/// parse. Errors only arise when converting records into other types.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// An error that occurred while deserializing a record into a Rust type.
    Deserialize {
        /// The position of the record in which this error occurred, if
        /// available.
        pos: Option<Position>,
        /// The deserialization error.
        err: DeserializeError,
    },
}

impl Error {
    /// The position of the record that caused this error, if known.
    pub fn position(&self) -> Option<&Position> {
        match *self {
            Error::Deserialize { ref pos, .. } => pos.as_ref(),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Deserialize { ref err, .. } => Some(err),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Deserialize { pos: None, ref err } => {
                write!(f, "CSV deserialize error: {}", err)
            }
            Error::Deserialize { pos: Some(ref pos), ref err } => {
                write!(
                    f,
                    "CSV deserialize error: record {} \
                     (byte {}, line {}): {}",
                    pos.record(), pos.byte(), pos.line(), err)
            }
        }
    }
}
