/*!
`libcsv-core` provides the I/O free pieces of `libcsv`: the [`Dialect`] rule
set, the character level [`Tokenizer`] that turns one framed line into a
record, the byte level [`LineFramer`] that splits a stream into physical
lines, and the [`Quoter`] that renders fields so that the tokenizer can read
them back.

Nothing in this crate performs I/O. Callers feed it slices of input and
collect the results. The `libcsv` crate wires these pieces to `std::io`.

# Example

```
use libcsv_core::{Dialect, Tokenizer};

let dialect = Dialect::default();
let mut tok = Tokenizer::new(&dialect);
let fields = tok.tokenize(r#"1,"a ""quoted"" word",3"#).unwrap();
assert_eq!(fields, vec!["1", r#"a "quoted" word"#, "3"]);
```
*/

#![deny(missing_docs)]

pub use crate::dialect::{Dialect, DialectBuilder, DialectError, QuoteStyle};
pub use crate::framer::{FrameResult, LineEnding, LineFramer};
pub use crate::reader::{
    ParseError, ParseState, Tokenizer, DEFAULT_FIELD_SIZE_LIMIT,
};
pub use crate::writer::Quoter;

mod dialect;
mod framer;
mod reader;
mod writer;
