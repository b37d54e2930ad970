use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::result;

use libcsv_core::{Dialect, Quoter};
use log::{debug, trace};
#[cfg(feature = "serde")]
use serde::Serialize;

use crate::encoding::{self, Sink};
use crate::error::{Error, IntoInnerError, Result};
#[cfg(feature = "serde")]
use crate::serializer;
use crate::value::Value;

const DEFAULT_CAPACITY: usize = 8 * (1 << 10);

/// Builds a CSV writer with various configuration knobs.
///
/// As with readers, a dialect must be given before a writer can be built.
///
/// # Example
///
/// ```
/// use libcsv::{DialectBuilder, QuoteStyle, Value, WriterBuilder};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dialect = DialectBuilder::new()
///     .delimiter(';')
///     .line_terminator("\n")
///     .quoting(QuoteStyle::Minimal)
///     .build()?;
/// let mut wtr = WriterBuilder::new().dialect(dialect).from_writer(vec![])?;
/// wtr.write_row(&[Value::from("a;b"), Value::from(42), Value::Null])?;
///
/// let data = String::from_utf8(wtr.into_inner()?)?;
/// assert_eq!(data, "\"a;b\";42;\n");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WriterBuilder {
    dialect: Option<Dialect>,
    flexible: bool,
    capacity: usize,
    encoding: Option<String>,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            dialect: None,
            flexible: false,
            capacity: DEFAULT_CAPACITY,
            encoding: None,
        }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer from this configuration that writes data to `wtr`.
    ///
    /// The writer is buffered for you automatically, and is ready for
    /// writing when this returns.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Result<Writer<W>> {
        let (dialect, enc) = self.resolve()?;
        Ok(Writer::new(self, dialect, Sink::new(wtr, enc), false))
    }

    /// Build a CSV writer from this configuration that writes data to the
    /// file at `path`.
    ///
    /// The file must already exist; it is truncated. An empty path fails with
    /// `Error::NoOutputSink`, and a file that cannot be opened with
    /// `Error::CannotOpenSink`. The file is closed by [`Writer::close`] or
    /// when the writer is dropped.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        let (dialect, enc) = self.resolve()?;
        let file = encoding::open_sink(path.as_ref())?;
        Ok(Writer::new(self, dialect, Sink::new(file, enc), true))
    }

    /// The dialect to write with.
    pub fn dialect(&mut self, dialect: Dialect) -> &mut WriterBuilder {
        self.dialect = Some(dialect);
        self
    }

    /// Whether the number of fields in records is allowed to change or not.
    ///
    /// When disabled (which is the default), writing a row whose field count
    /// differs from the first row written fails with
    /// `Error::RowShapeMismatch`.
    pub fn flexible(&mut self, yes: bool) -> &mut WriterBuilder {
        self.flexible = yes;
        self
    }

    /// Set the capacity (in bytes) of the internal buffer used in the CSV
    /// writer.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }

    /// The text encoding of the output, as a WHATWG label.
    ///
    /// The default is UTF-8. An unknown label makes building the writer fail
    /// with `Error::UnknownEncoding`.
    pub fn encoding(&mut self, label: &str) -> &mut WriterBuilder {
        self.encoding = Some(label.to_string());
        self
    }

    fn resolve(
        &self,
    ) -> Result<(&Dialect, Option<&'static encoding_rs::Encoding>)> {
        let dialect = self.dialect.as_ref().ok_or(Error::NoDialect)?;
        dialect.validate()?;
        let enc = match self.encoding {
            None => None,
            Some(ref label) => Some(encoding::lookup(label)?),
        };
        Ok((dialect, enc))
    }
}

/// A CSV writer.
///
/// Every row is rendered with the writer's dialect: fields are joined by the
/// delimiter and the row ends with the line terminator. Data is buffered, so
/// call [`Writer::flush`] (or drop the writer) to push it out.
///
/// A writer built from a caller supplied `io::Write` never closes it;
/// [`Writer::into_inner`] hands it back. A writer that opened a file itself
/// closes it in [`Writer::close`] or when dropped.
pub struct Writer<W: io::Write> {
    wtr: Option<io::BufWriter<Sink<W>>>,
    dialect: Dialect,
    quoter: Quoter,
    /// The row being rendered.
    buf: String,
    state: WriterState,
}

#[derive(Debug)]
struct WriterState {
    open: bool,
    /// Whether the sink was opened by the writer itself.
    owns_sink: bool,
    flexible: bool,
    /// The field count of the first row written.
    first_len: Option<u64>,
    /// The number of rows written so far.
    records: u64,
}

impl Writer<File> {
    /// Create a writer for the (existing) file at `path` using the default
    /// dialect.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        WriterBuilder::new().dialect(Dialect::default()).from_path(path)
    }
}

impl<W: io::Write> Writer<W> {
    fn new(
        builder: &WriterBuilder,
        dialect: &Dialect,
        sink: Sink<W>,
        owns_sink: bool,
    ) -> Writer<W> {
        Writer {
            wtr: Some(io::BufWriter::with_capacity(builder.capacity, sink)),
            dialect: dialect.clone(),
            quoter: Quoter::new(dialect),
            buf: String::new(),
            state: WriterState {
                open: true,
                owns_sink,
                flexible: builder.flexible,
                first_len: None,
                records: 0,
            },
        }
    }

    /// Create a writer for `wtr` using the default dialect.
    pub fn from_writer(wtr: W) -> Result<Writer<W>> {
        WriterBuilder::new().dialect(Dialect::default()).from_writer(wtr)
    }

    /// Make a closed writer ready for writing again.
    ///
    /// This only works while the writer still holds its sink, i.e. when the
    /// sink was supplied by the caller. A writer whose own file was closed
    /// fails with `Error::WriterClosed`. Opening an open writer does nothing.
    pub fn open(&mut self) -> Result<()> {
        if self.wtr.is_none() {
            return Err(Error::WriterClosed);
        }
        self.state.open = true;
        Ok(())
    }

    /// Returns true if rows can be written.
    pub fn is_open(&self) -> bool {
        self.state.open && self.wtr.is_some()
    }

    /// The dialect this writer writes with.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Write a single row.
    ///
    /// Text values are quoted according to the dialect. Other values are
    /// written in their plain form and only quoted when the quoting style is
    /// `QuoteStyle::All`. `Value::Null` becomes an empty field.
    ///
    /// An empty row fails with `Error::EmptyRow`.
    pub fn write_row(&mut self, row: &[Value]) -> Result<()> {
        self.check_open()?;
        self.buf.clear();
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                self.buf.push(self.dialect.delimiter());
            }
            value.write_to(&self.quoter, &mut self.buf);
        }
        self.finish_row(row.len() as u64)
    }

    /// Write a single record of text fields.
    ///
    /// This is equivalent to `write_row` with every field given as
    /// `Value::Str`.
    ///
    /// # Example
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut wtr = libcsv::Writer::from_writer(vec![])?;
    /// wtr.write_record(&["a", "b,c"])?;
    /// wtr.write_record(vec![String::from("x"), String::from("y")])?;
    ///
    /// let data = String::from_utf8(wtr.into_inner()?)?;
    /// assert_eq!(data, "\"a\",\"b,c\"\r\n\"x\",\"y\"\r\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.check_open()?;
        self.buf.clear();
        let mut len = 0;
        for field in record {
            if len > 0 {
                self.buf.push(self.dialect.delimiter());
            }
            self.quoter.quote_text(field.as_ref(), &mut self.buf);
            len += 1;
        }
        self.finish_row(len)
    }

    /// Serialize a single record using Serde.
    ///
    /// Structs, tuples, sequences and scalars are all written as one row.
    /// When the dialect has a header and nothing has been written yet, a
    /// struct's field names are written as a header row first.
    ///
    /// # Example
    ///
    /// ```
    /// use libcsv::{DialectBuilder, WriterBuilder};
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Row<'a> {
    ///     city: &'a str,
    ///     population: Option<u64>,
    /// }
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let dialect = DialectBuilder::new()
    ///     .has_header(true)
    ///     .line_terminator("\n")
    ///     .build()?;
    /// let mut wtr = WriterBuilder::new().dialect(dialect).from_writer(vec![])?;
    /// wtr.serialize(Row { city: "Boston", population: Some(4628910) })?;
    /// wtr.serialize(Row { city: "Concord", population: None })?;
    ///
    /// let data = String::from_utf8(wtr.into_inner()?)?;
    /// assert_eq!(data, "\
    /// \"city\",\"population\"
    /// \"Boston\",4628910
    /// \"Concord\",
    /// ");
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "serde")]
    pub fn serialize<S: Serialize>(&mut self, record: S) -> Result<()> {
        self.check_open()?;
        if self.dialect.has_header() && self.state.records == 0 {
            if let Some(names) = serializer::header_names(&record)? {
                self.write_record(&names)?;
            }
        }
        let row = serializer::serialize_values(&record)?;
        self.write_row(&row)
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        match self.wtr {
            Some(ref mut wtr) => wtr.flush(),
            None => Ok(()),
        }
    }

    /// Flush buffered data and stop accepting rows.
    ///
    /// A file opened by the writer itself is closed. A caller supplied sink
    /// is only flushed; it stays available through `into_inner`. Closing a
    /// closed writer does nothing.
    pub fn close(&mut self) -> Result<()> {
        if !self.state.open {
            return Ok(());
        }
        self.state.open = false;
        if !self.state.owns_sink {
            self.flush()?;
            return Ok(());
        }
        if let Some(mut wtr) = self.wtr.take() {
            wtr.flush()?;
            wtr.get_mut().finish()?;
            debug!("closed output file after {} rows", self.state.records);
        }
        Ok(())
    }

    /// Flush the contents of the internal buffer and return the underlying
    /// writer.
    pub fn into_inner(
        mut self,
    ) -> result::Result<W, IntoInnerError<Writer<W>>> {
        if let Err(err) = self.finish_sink() {
            return Err(IntoInnerError::new(self, err));
        }
        let buf = match self.wtr.take() {
            Some(buf) => buf,
            None => {
                let err = io::Error::new(io::ErrorKind::Other, "writer is closed");
                return Err(IntoInnerError::new(self, err));
            }
        };
        let sink = match buf.into_inner() {
            Ok(sink) => sink,
            Err(err) => {
                let cause = io::Error::new(err.error().kind(), err.to_string());
                self.wtr = Some(err.into_inner());
                return Err(IntoInnerError::new(self, cause));
            }
        };
        match sink.into_inner() {
            Ok(wtr) => Ok(wtr),
            Err(err) => Err(IntoInnerError::new(self, err)),
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::WriterClosed)
        }
    }

    /// Check the row shape, then write the rendered row in `buf`.
    fn finish_row(&mut self, len: u64) -> Result<()> {
        if len == 0 {
            return Err(Error::EmptyRow);
        }
        self.check_field_count(len)?;
        self.buf.push_str(self.dialect.line_terminator());
        match self.wtr {
            Some(ref mut wtr) => wtr.write_all(self.buf.as_bytes())?,
            None => return Err(Error::WriterClosed),
        }
        trace!("row {}: {} fields", self.state.records, len);
        self.state.records += 1;
        Ok(())
    }

    fn check_field_count(&mut self, len: u64) -> Result<()> {
        if self.state.flexible {
            return Ok(());
        }
        match self.state.first_len {
            None => {
                self.state.first_len = Some(len);
                Ok(())
            }
            Some(expected_len) if expected_len != len => {
                Err(Error::RowShapeMismatch {
                    expected_len,
                    len,
                    record: self.state.records,
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Flush everything, including any encoder state, into the sink.
    fn finish_sink(&mut self) -> io::Result<()> {
        match self.wtr {
            Some(ref mut wtr) => {
                wtr.flush()?;
                wtr.get_mut().finish()
            }
            None => Ok(()),
        }
    }
}

/// Dropping a writer flushes its buffer and finishes any text encoding.
/// Errors are ignored; call `close` or `into_inner` to see them.
impl<W: io::Write> Drop for Writer<W> {
    fn drop(&mut self) {
        let _ = self.finish_sink();
    }
}
