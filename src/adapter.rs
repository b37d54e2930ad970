/*!
Bulk reading and writing on top of [`Reader`] and [`Writer`].

An [`Adapter`] drains a reader, handing every data record (and the header
row, when there is one) to a callback, or converting fields to typed
[`Cell`]s with per column [`Converter`]s. [`write_all`] does the reverse:
it turns arbitrary rows into text fields with a callback and checks that
every row has the same shape.
*/

use std::collections::HashMap;
use std::io;

use log::debug;

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::string_record::StringRecord;
use crate::writer::Writer;

/// A typed field value produced by a [`Converter`].
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    /// An empty (or whitespace only) field.
    Null,
    /// Text, kept as is.
    Text(String),
    /// A signed integer.
    Integer(i64),
    /// A float.
    Float(f64),
    /// A boolean.
    Boolean(bool),
}

/// How the fields of one column are turned into [`Cell`]s.
///
/// Empty fields always become `Cell::Null`, whatever the converter.
#[derive(Clone, Copy, Debug)]
pub enum Converter {
    /// Keep the text.
    Text,
    /// Parse a signed 64 bit integer.
    Integer,
    /// Parse a float.
    Float,
    /// Parse `true` or `false`, ignoring ASCII case.
    Boolean,
    /// A caller supplied conversion. Returning `None` is a conversion error.
    Custom(fn(&str) -> Option<Cell>),
}

impl Converter {
    /// Convert `value`, found in `column`, to a cell.
    ///
    /// A value that does not convert fails with `Error::CannotConvert`.
    pub fn convert(&self, column: &str, value: &str) -> Result<Cell> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(Cell::Null);
        }
        let cell = match *self {
            Converter::Text => Some(Cell::Text(value.to_string())),
            Converter::Integer => trimmed.parse().ok().map(Cell::Integer),
            Converter::Float => trimmed.parse().ok().map(Cell::Float),
            Converter::Boolean => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Some(Cell::Boolean(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Some(Cell::Boolean(false))
                } else {
                    None
                }
            }
            Converter::Custom(f) => f(value),
        };
        cell.ok_or_else(|| Error::CannotConvert {
            column: column.to_string(),
            value: value.to_string(),
            expected: self.name(),
        })
    }

    fn name(&self) -> &'static str {
        match *self {
            Converter::Text => "text",
            Converter::Integer => "integer",
            Converter::Float => "float",
            Converter::Boolean => "boolean",
            Converter::Custom(_) => "custom value",
        }
    }
}

/// Reads every record of a [`Reader`] in one go.
///
/// # Example
///
/// ```
/// use libcsv::{Adapter, Cell, Converter, DialectBuilder, ReaderBuilder};
///
/// # fn main() -> libcsv::Result<()> {
/// let dialect = DialectBuilder::new().delimiter(';').has_header(true).build()?;
/// let data = "name;age\nAda;36\nAlan;\n";
/// let rdr = ReaderBuilder::new().dialect(dialect).from_reader(data.as_bytes())?;
///
/// let mut adapter = Adapter::new(rdr);
/// adapter.set_column("age", Converter::Integer);
/// let rows = adapter.read_typed()?;
/// assert_eq!(rows, vec![
///     vec![Cell::Text("Ada".into()), Cell::Integer(36)],
///     vec![Cell::Text("Alan".into()), Cell::Null],
/// ]);
/// # Ok(())
/// # }
/// ```
pub struct Adapter<R> {
    rdr: Reader<R>,
    columns: HashMap<String, Converter>,
}

impl<R: io::Read> Adapter<R> {
    /// Wrap a reader.
    pub fn new(rdr: Reader<R>) -> Adapter<R> {
        Adapter { rdr, columns: HashMap::new() }
    }

    /// Set the converter used by [`Adapter::read_typed`] for a column.
    ///
    /// Columns are named by their header alias. Without a header row, they
    /// are named by their index, starting at `"0"`. Columns without a
    /// converter are kept as text.
    pub fn set_column(
        &mut self,
        alias: &str,
        converter: Converter,
    ) -> &mut Adapter<R> {
        self.columns.insert(alias.to_string(), converter);
        self
    }

    /// The wrapped reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }

    /// Unwrap the reader.
    pub fn into_inner(self) -> Reader<R> {
        self.rdr
    }

    /// Call `f` once per remaining data record, with the header row when
    /// the dialect has one, and collect the results.
    ///
    /// The first error, from the reader or from `f`, stops reading.
    pub fn read_all<T, F>(&mut self, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&StringRecord, Option<&StringRecord>) -> Result<T>,
    {
        let mut out = vec![];
        while self.rdr.next()? {
            out.push(f(self.rdr.current(), self.rdr.headers())?);
        }
        debug!("adapter read {} records", out.len());
        Ok(out)
    }

    /// Read every remaining record, converting each field with the
    /// converter set for its column.
    pub fn read_typed(&mut self) -> Result<Vec<Vec<Cell>>> {
        let columns = &self.columns;
        let mut out = vec![];
        while self.rdr.next()? {
            let record = self.rdr.current();
            let headers = self.rdr.headers();
            let mut row = Vec::with_capacity(record.len());
            for (i, field) in record.iter().enumerate() {
                let alias = match headers.and_then(|h| h.get(i)) {
                    Some(alias) => alias.to_string(),
                    None => i.to_string(),
                };
                let cell = match columns.get(&alias) {
                    Some(conv) => conv.convert(&alias, field)?,
                    None => Cell::Text(field.to_string()),
                };
                row.push(cell);
            }
            out.push(row);
        }
        debug!("adapter converted {} records", out.len());
        Ok(out)
    }
}

/// Write `rows` to `wtr`, turning each one into text fields with `f`.
///
/// When a header is given, it is written first. The header, or else the
/// first row, fixes the number of fields: a row of any other length fails
/// with `Error::RowShapeMismatch`, even for a flexible writer. The writer is
/// flushed at the end.
///
/// # Example
///
/// ```
/// use libcsv::{write_all, DialectBuilder, QuoteStyle, WriterBuilder};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dialect = DialectBuilder::new()
///     .line_terminator("\n")
///     .quoting(QuoteStyle::None)
///     .build()?;
/// let mut wtr = WriterBuilder::new().dialect(dialect).from_writer(vec![])?;
/// let points = vec![(1, 2), (3, 4)];
/// write_all(&mut wtr, Some(&["x", "y"]), points, |(x, y)| {
///     vec![x.to_string(), y.to_string()]
/// })?;
///
/// let data = String::from_utf8(wtr.into_inner()?)?;
/// assert_eq!(data, "x,y\n1,2\n3,4\n");
/// # Ok(())
/// # }
/// ```
pub fn write_all<W, I, T, F>(
    wtr: &mut Writer<W>,
    header: Option<&[&str]>,
    rows: I,
    mut f: F,
) -> Result<()>
where
    W: io::Write,
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Vec<String>,
{
    let mut expected_len = None;
    let mut record = 0;
    if let Some(header) = header {
        wtr.write_record(header)?;
        expected_len = Some(header.len() as u64);
        record += 1;
    }
    for row in rows {
        let fields = f(row);
        let len = fields.len() as u64;
        match expected_len {
            None => expected_len = Some(len),
            Some(expected_len) if expected_len != len => {
                return Err(Error::RowShapeMismatch { expected_len, len, record });
            }
            Some(_) => {}
        }
        wtr.write_record(&fields)?;
        record += 1;
    }
    wtr.flush()?;
    debug!("adapter wrote {} records", record);
    Ok(())
}

#[cfg(test)]
mod tests {
    use libcsv_core::{Dialect, DialectBuilder, QuoteStyle};

    use super::{write_all, Adapter, Cell, Converter};
    use crate::error::Error;
    use crate::reader::ReaderBuilder;
    use crate::string_record::StringRecord;
    use crate::writer::{Writer, WriterBuilder};

    /// `;` separated, backslash escaped, no quoting.
    fn semi(has_header: bool) -> Dialect {
        DialectBuilder::new()
            .delimiter(';')
            .escape(Some('\\'))
            .skip_initial_space(true)
            .line_terminator("\n\r")
            .quoting(QuoteStyle::None)
            .strict(true)
            .has_header(has_header)
            .build()
            .unwrap()
    }

    fn adapter(dialect: Dialect, data: &str) -> Adapter<&[u8]> {
        let rdr = ReaderBuilder::new()
            .dialect(dialect)
            .from_reader(data.as_bytes())
            .unwrap();
        Adapter::new(rdr)
    }

    fn writer(dialect: Dialect) -> Writer<Vec<u8>> {
        WriterBuilder::new().dialect(dialect).from_writer(vec![]).unwrap()
    }

    #[test]
    fn read_all_with_header() {
        let data = "Header#1;Header#2;Header#3\r\n1;2;3\r\n4;5;6";
        let mut a = adapter(semi(true), data);
        let rows = a
            .read_all(|fields, aliases| {
                assert_eq!(
                    Some(&StringRecord::from(vec!["Header#1", "Header#2", "Header#3"])),
                    aliases
                );
                Ok(fields.clone().into_vec())
            })
            .unwrap();
        assert_eq!(vec![vec!["1", "2", "3"], vec!["4", "5", "6"]], rows);
    }

    #[test]
    fn read_all_without_header() {
        let mut a = adapter(semi(false), "1;2;3\r\n4;5;6");
        let rows = a
            .read_all(|fields, aliases| {
                assert!(aliases.is_none());
                Ok(fields.len())
            })
            .unwrap();
        assert_eq!(vec![3, 3], rows);
    }

    #[test]
    fn read_all_stops_on_callback_error() {
        let mut a = adapter(semi(false), "1\r\n2\r\n3");
        let mut seen = 0;
        let res: Result<Vec<()>, Error> = a.read_all(|_, _| {
            seen += 1;
            if seen == 2 {
                Err(Error::EmptyRow)
            } else {
                Ok(())
            }
        });
        assert!(matches!(res, Err(Error::EmptyRow)));
        assert_eq!(2, seen);
    }

    #[test]
    fn typed_columns_by_alias() {
        let data = "id;price;ok;name\n1;2.5;TRUE;a\n2; ;false;b\n";
        let mut a = adapter(semi(true), data);
        a.set_column("id", Converter::Integer)
            .set_column("price", Converter::Float)
            .set_column("ok", Converter::Boolean);
        let rows = a.read_typed().unwrap();
        assert_eq!(
            vec![
                vec![
                    Cell::Integer(1),
                    Cell::Float(2.5),
                    Cell::Boolean(true),
                    Cell::Text("a".into()),
                ],
                vec![
                    Cell::Integer(2),
                    Cell::Null,
                    Cell::Boolean(false),
                    Cell::Text("b".into()),
                ],
            ],
            rows
        );
    }

    #[test]
    fn typed_columns_by_index() {
        fn upper(s: &str) -> Option<Cell> {
            Some(Cell::Text(s.to_uppercase()))
        }
        let mut a = adapter(Dialect::default(), "x,7\ny,8\n");
        a.set_column("0", Converter::Custom(upper))
            .set_column("1", Converter::Integer);
        let rows = a.read_typed().unwrap();
        assert_eq!(
            vec![
                vec![Cell::Text("X".into()), Cell::Integer(7)],
                vec![Cell::Text("Y".into()), Cell::Integer(8)],
            ],
            rows
        );
    }

    #[test]
    fn conversion_error() {
        let mut a = adapter(semi(true), "id\nabc\n");
        a.set_column("id", Converter::Integer);
        match a.read_typed() {
            Err(Error::CannotConvert { column, value, expected }) => {
                assert_eq!("id", column);
                assert_eq!("abc", value);
                assert_eq!("integer", expected);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn write_without_header() {
        let data = vec![vec!["1", "2", "3"], vec!["4", "5", "6"]];
        let mut w = writer(semi(false));
        write_all(&mut w, None, data, |row| {
            row.into_iter().map(String::from).collect()
        })
        .unwrap();
        let got = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!("1;2;3\n\r4;5;6\n\r", got);
    }

    #[test]
    fn write_with_header() {
        let data = vec![vec!["1", "2", "3"], vec!["4", "5", "6"]];
        let mut w = writer(semi(true));
        let header = ["Header#1", "Header#2", "Header#3"];
        write_all(&mut w, Some(&header), data, |row| {
            row.into_iter().map(String::from).collect()
        })
        .unwrap();
        let got = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!("Header#1;Header#2;Header#3\n\r1;2;3\n\r4;5;6\n\r", got);
    }

    #[test]
    fn write_shape_mismatch() {
        let data = vec![vec!["1", "2", "3"], vec!["4", "5"]];
        let mut w = WriterBuilder::new()
            .dialect(semi(false))
            .flexible(true)
            .from_writer(vec![])
            .unwrap();
        let res = write_all(&mut w, None, data, |row| {
            row.into_iter().map(String::from).collect()
        });
        match res {
            Err(Error::RowShapeMismatch { expected_len: 3, len: 2, record: 1 }) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn write_shape_mismatch_with_header() {
        let mut w = writer(semi(true));
        let res = write_all(&mut w, Some(&["a", "b"]), vec![1], |n| {
            vec![n.to_string()]
        });
        assert!(matches!(
            res,
            Err(Error::RowShapeMismatch { expected_len: 2, len: 1, record: 1 })
        ));
    }
}
