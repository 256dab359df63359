/*!
The `trimcsv` crate parses comma separated values held in memory into rows of
trimmed strings.

The dialect is deliberately simple and lenient:

* fields are separated by `,` and rows end at `\n`;
* a `"` starts a quoted section, in which `,` and `\n` are plain content
  and `""` stands for a literal `"`;
* every field is trimmed of leading and trailing whitespace, quoted or not;
* rows may have differing numbers of fields;
* parsing never fails. Malformed quoting only changes how the rest of the
  document is read.

The low level state machine lives in the
[`trimcsv-core`](https://docs.rs/trimcsv-core) crate.

# Example

The simplest entry point is [`parse`]:

```
let rows = trimcsv::parse("name, age\n\"Doe, Jane\", 30\nBob");
assert_eq!(rows, vec![
    vec!["name", "age"],
    vec!["Doe, Jane", "30"],
    vec!["Bob"],
]);
```

A [`Reader`] gives access to headers, positions and serde:

```
use serde::Deserialize;
use trimcsv::ReaderBuilder;

#[derive(Debug, Deserialize)]
struct Person {
    name: String,
    age: Option<u8>,
}

let data = "name, age\n\"Doe, Jane\", 30\nBob";
let mut rdr = ReaderBuilder::new().has_headers(true).from_str(data);
for result in rdr.deserialize() {
    let person: Person = result?;
    println!("{:?}", person);
}
# Ok::<(), trimcsv::Error>(())
```

# End of input

The final character of a document always closes the last field and row, and
it is kept as field content even when it is a delimiter or a quote. So
`a,` parses to the single field `a,`, and `x,"y"` parses to `x` and `y"`. A
trailing line feed is kept too, but trimming removes it, so `a\n` and `a`
both parse to `a`.
*/

#![deny(missing_docs)]

use log::debug;

pub use trimcsv_core::{trim, ReadFieldResult, Scanner};

pub use crate::deserializer::{DeserializeError, DeserializeErrorKind};
pub use crate::error::{Error, Result};
pub use crate::reader::{
    DeserializeRecordsIntoIter, DeserializeRecordsIter, Position, Reader,
    ReaderBuilder, RecordsIntoIter, RecordsIter,
};
pub use crate::record::{Record, RecordIter};

mod deserializer;
mod error;
mod reader;
mod record;

/// Parse a whole CSV document into rows of trimmed fields.
///
/// An empty document produces no rows at all, not one empty row. Every
/// other document produces at least one row, and every row has at least
/// one field.
///
/// # Example
///
/// ```
/// let rows = trimcsv::parse("\"he said \"\"hi\"\"\",2\na,,b\n");
/// assert_eq!(rows, vec![
///     vec!["he said \"hi\"", "2"],
///     vec!["a", "", "b"],
/// ]);
/// assert!(trimcsv::parse("").is_empty());
/// ```
pub fn parse(doc: &str) -> Vec<Vec<String>> {
    let mut rdr = Reader::from_str(doc);
    let mut record = Record::new();
    let mut rows: Vec<Vec<String>> = vec![];
    while rdr.read_record(&mut record) {
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }
    debug!("parsed {} rows from {} bytes", rows.len(), doc.len());
    rows
}
