/*!
`libcsv` reads and writes CSV data according to a configurable [`Dialect`].

A dialect bundles the rules shared by both directions: the delimiter, the
quote and escape characters, when fields are quoted, whether whitespace after
a delimiter is skipped, whether malformed quoting is an error and whether the
first record is a header row. The same dialect that wrote some data reads it
back to the same fields.

# Reading

```
use libcsv::{DialectBuilder, ReaderBuilder};

# fn main() -> libcsv::Result<()> {
let dialect = DialectBuilder::new()
    .delimiter(';')
    .escape(Some('\\'))
    .has_header(true)
    .build()?;
let data = "\
name;quote
Ada;\"said \\\"hi\\\"\"
Alan;\"one;two\"
";
let mut rdr = ReaderBuilder::new().dialect(dialect).from_reader(data.as_bytes())?;
assert_eq!(rdr.headers().map(|h| h.len()), Some(2));

let mut quotes = vec![];
while rdr.next()? {
    quotes.push(rdr.current()[1].to_string());
}
assert_eq!(quotes, vec!["said \"hi\"", "one;two"]);
# Ok(())
# }
```

# Writing

```
use libcsv::{Value, Writer};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mut wtr = Writer::from_writer(vec![])?;
wtr.write_row(&[Value::from("a \"b\""), Value::from(1.5), Value::Null])?;

let data = String::from_utf8(wtr.into_inner()?)?;
assert_eq!(data, "\"a \"\"b\"\"\",1.5,\r\n");
# Ok(())
# }
```

Files are opened with `ReaderBuilder::from_path` and `WriterBuilder::from_path`,
optionally in a text encoding other than UTF-8. Typed records are read and
written with Serde (the default `serde` feature), or with the callback based
[`Adapter`] and [`write_all`].
*/

#![deny(missing_docs)]

pub use libcsv_core::{
    Dialect, DialectBuilder, DialectError, ParseError, QuoteStyle,
    DEFAULT_FIELD_SIZE_LIMIT,
};

pub use crate::adapter::{write_all, Adapter, Cell, Converter};
pub use crate::error::{
    DeserializeError, DeserializeErrorKind, Error, IntoInnerError, Result,
    Utf8Error,
};
#[cfg(feature = "serde")]
pub use crate::reader::DeserializeRecordsIter;
pub use crate::reader::{Position, Reader, ReaderBuilder, StringRecordsIter};
pub use crate::string_record::{StringRecord, StringRecordIter};
pub use crate::value::Value;
pub use crate::writer::{Writer, WriterBuilder};

mod adapter;
#[cfg(feature = "serde")]
mod deserializer;
pub mod encoding;
mod error;
mod reader;
#[cfg(feature = "serde")]
mod serializer;
mod string_record;
mod value;
mod writer;
