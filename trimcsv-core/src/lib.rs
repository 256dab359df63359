/*!
`trimcsv-core` provides the state machine underneath `trimcsv`.

The dialect is fixed: fields are separated by `,`, rows end at `\n` and
fields may be quoted with `"`, where a doubled `""` inside quotes stands for
one literal quote. The scanner is lenient and total. It never reports an
error and always finds *a* parse, however malformed the quoting is.

The scanner hands back raw field content. Callers that want the values
`trimcsv` produces should pass each field through [`trim`].

# Example

```
use trimcsv_core::{ReadFieldResult, Scanner};

let mut scanner = Scanner::new("a, b\n\"c,d\"\n");
let mut field = String::new();
let mut rows = vec![];
let mut row = vec![];
loop {
    field.clear();
    match scanner.read_field(&mut field) {
        ReadFieldResult::Field { record_end } => {
            row.push(trimcsv_core::trim(&field).to_string());
            if record_end {
                rows.push(std::mem::replace(&mut row, vec![]));
            }
        }
        ReadFieldResult::End => break,
    }
}
assert_eq!(rows, vec![vec!["a", "b"], vec!["c,d"]]);
```
*/

#![deny(missing_docs)]

pub use crate::scanner::{trim, ReadFieldResult, Scanner};

mod scanner;
