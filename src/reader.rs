use std::fs::File;
use std::io::{self, BufRead};
#[cfg(feature = "serde")]
use std::marker::PhantomData;
use std::path::Path;

use bstr::ByteSlice;
use libcsv_core::{
    Dialect, FrameResult, LineEnding, LineFramer, ParseError, Tokenizer,
    DEFAULT_FIELD_SIZE_LIMIT,
};
use log::{debug, trace, warn};
#[cfg(feature = "serde")]
use serde::de::DeserializeOwned;

use crate::encoding::{self, Source};
use crate::error::{new_utf8_error, Error, Result};
use crate::string_record::StringRecord;

const DEFAULT_CAPACITY: usize = 8 * (1 << 10);

/// Builds a CSV reader with various configuration knobs.
///
/// A dialect must be given before a reader can be built; building without
/// one fails with `Error::NoDialect`. The `Reader::from_reader` and
/// `Reader::from_path` shortcuts use `Dialect::default()`.
///
/// # Example
///
/// ```
/// use libcsv::{DialectBuilder, ReaderBuilder};
///
/// # fn main() -> libcsv::Result<()> {
/// let dialect = DialectBuilder::new().delimiter(';').has_header(true).build()?;
/// let data = "city;pop\nBoston;4628910\n";
/// let mut rdr = ReaderBuilder::new().dialect(dialect).from_reader(data.as_bytes())?;
///
/// assert_eq!(Some(vec!["city", "pop"]), rdr.headers().map(|h| h.iter().collect()));
/// assert!(rdr.next()?);
/// assert_eq!(vec!["Boston", "4628910"], rdr.current().iter().collect::<Vec<_>>());
/// assert!(!rdr.next()?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ReaderBuilder {
    dialect: Option<Dialect>,
    field_size_limit: usize,
    capacity: usize,
    encoding: Option<String>,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder {
            dialect: None,
            field_size_limit: DEFAULT_FIELD_SIZE_LIMIT,
            capacity: DEFAULT_CAPACITY,
            encoding: None,
        }
    }
}

impl ReaderBuilder {
    /// Create a new builder for configuring CSV parsing.
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Build a CSV reader from this configuration that reads data from `rdr`.
    ///
    /// The reader is buffered for you automatically. When the dialect has a
    /// header, the header row is read before this returns.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Result<Reader<R>> {
        let (dialect, enc) = self.resolve()?;
        let mut rdr = Reader::new(self, dialect, Source::new(rdr, enc));
        rdr.open()?;
        Ok(rdr)
    }

    /// Build a CSV reader from this configuration that reads data from the
    /// file at `path`.
    ///
    /// An empty path fails with `Error::NoInputSource`, and a file that
    /// cannot be opened with `Error::CannotOpenSource`. The file is closed
    /// when the reader is dropped.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Reader<File>> {
        let (dialect, enc) = self.resolve()?;
        let file = encoding::open_source(path.as_ref())?;
        let mut rdr = Reader::new(self, dialect, Source::new(file, enc));
        rdr.open()?;
        Ok(rdr)
    }

    /// The dialect to parse with.
    pub fn dialect(&mut self, dialect: Dialect) -> &mut ReaderBuilder {
        self.dialect = Some(dialect);
        self
    }

    /// The maximum number of characters in one field.
    ///
    /// A longer field fails with `Error::FieldTooLarge`. The default is
    /// 8000.
    pub fn field_size_limit(&mut self, limit: usize) -> &mut ReaderBuilder {
        self.field_size_limit = limit;
        self
    }

    /// Set the capacity (in bytes) of the buffer used in the CSV reader.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ReaderBuilder {
        self.capacity = capacity;
        self
    }

    /// The text encoding of the input, as a WHATWG label such as
    /// `"windows-1252"`.
    ///
    /// The default is UTF-8. An unknown label makes building the reader
    /// fail with `Error::UnknownEncoding`.
    pub fn encoding(&mut self, label: &str) -> &mut ReaderBuilder {
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

/// A CSV reader.
///
/// The reader pulls one record at a time with [`Reader::next`] and exposes
/// it through [`Reader::current`]. A header row, when the dialect has one,
/// is consumed as soon as the reader is built and is only available from
/// [`Reader::headers`].
///
/// Iteration stops at the end of the data and at the first line that is
/// empty or only holds whitespace.
///
/// A reader built from a caller supplied `io::Read` never closes it;
/// [`Reader::into_inner`] hands it back.
pub struct Reader<R> {
    rdr: io::BufReader<Source<R>>,
    tok: Tokenizer,
    framer: LineFramer,
    /// The current physical line, without its terminator.
    line: Vec<u8>,
    record: StringRecord,
    headers: Option<StringRecord>,
    state: ReaderState,
}

#[derive(Debug)]
struct ReaderState {
    opened: bool,
    /// Set once the underlying data is exhausted.
    eof: bool,
    /// Whether a UTF-8 byte order mark still needs checking for.
    check_bom: bool,
    /// The position of the next unread line.
    cur_pos: Position,
    /// The position of the most recently read record.
    rec_pos: Position,
}

impl Reader<File> {
    /// Create a reader for the file at `path` using the default dialect.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File>> {
        ReaderBuilder::new().dialect(Dialect::default()).from_path(path)
    }
}

impl<R: io::Read> Reader<R> {
    fn new(
        builder: &ReaderBuilder,
        dialect: &Dialect,
        src: Source<R>,
    ) -> Reader<R> {
        let mut tok = Tokenizer::new(dialect);
        tok.set_field_size_limit(builder.field_size_limit);
        Reader {
            rdr: io::BufReader::with_capacity(builder.capacity, src),
            tok,
            framer: LineFramer::new(),
            line: vec![],
            record: StringRecord::new(),
            headers: None,
            state: ReaderState {
                opened: false,
                eof: false,
                check_bom: true,
                cur_pos: Position::new(),
                rec_pos: Position::new(),
            },
        }
    }

    /// Create a reader for `rdr` using the default dialect.
    pub fn from_reader(rdr: R) -> Result<Reader<R>> {
        ReaderBuilder::new().dialect(Dialect::default()).from_reader(rdr)
    }

    /// Make the reader ready for reading records.
    ///
    /// When the dialect has a header, this reads the first record and keeps
    /// it as the header row. Blank lines before the header are skipped.
    /// Builders call this for you, and calling it again does nothing.
    pub fn open(&mut self) -> Result<()> {
        if self.state.opened {
            return Ok(());
        }
        self.state.opened = true;
        if !self.tok.dialect().has_header() {
            return Ok(());
        }
        while !self.state.eof {
            if let Some(headers) = self.read_record()? {
                debug!("captured header row with {} fields", headers.len());
                self.state.cur_pos.record += 1;
                self.headers = Some(headers);
                break;
            }
        }
        Ok(())
    }

    /// Read the next record.
    ///
    /// Returns `false` at the end of the data or when the next line is
    /// empty or only holds whitespace. A later call resumes after that line.
    pub fn next(&mut self) -> Result<bool> {
        self.open()?;
        match self.read_record()? {
            Some(record) => {
                trace!(
                    "record {} (line {}): {} fields",
                    self.state.rec_pos.record(),
                    self.state.rec_pos.line(),
                    record.len()
                );
                self.record = record;
                self.state.cur_pos.record += 1;
                Ok(true)
            }
            None => {
                self.record.clear();
                Ok(false)
            }
        }
    }

    /// The most recently read record.
    ///
    /// This is empty before the first call to `next` and after `next`
    /// returned `false`.
    pub fn current(&self) -> &StringRecord {
        &self.record
    }

    /// The header row, when the dialect has one and the data was not empty.
    pub fn headers(&self) -> Option<&StringRecord> {
        self.headers.as_ref()
    }

    /// The dialect this reader parses with.
    pub fn dialect(&self) -> &Dialect {
        self.tok.dialect()
    }

    /// The position at which the most recently read record started.
    pub fn position(&self) -> &Position {
        &self.state.rec_pos
    }

    /// Returns a borrowed iterator over the remaining records.
    ///
    /// The iterator ends where `next` would return `false`, and after the
    /// first error.
    pub fn records(&mut self) -> StringRecordsIter<R> {
        StringRecordsIter { rdr: self, done: false }
    }

    /// Returns a borrowed iterator over the remaining records, deserialized
    /// into `D`.
    ///
    /// With a header row, struct fields are matched to columns by name.
    /// Without one, fields are taken in order.
    ///
    /// # Example
    ///
    /// ```
    /// use libcsv::{DialectBuilder, ReaderBuilder};
    /// use serde::Deserialize;
    ///
    /// #[derive(Debug, Deserialize, PartialEq)]
    /// struct Row {
    ///     name: String,
    ///     age: u32,
    /// }
    ///
    /// # fn main() -> libcsv::Result<()> {
    /// let dialect = DialectBuilder::new().has_header(true).build()?;
    /// let data = "age,name\n36,Ada\n";
    /// let mut rdr = ReaderBuilder::new().dialect(dialect).from_reader(data.as_bytes())?;
    /// let rows: Vec<Row> = rdr.deserialize().collect::<libcsv::Result<_>>()?;
    /// assert_eq!(vec![Row { name: "Ada".into(), age: 36 }], rows);
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "serde")]
    pub fn deserialize<D>(&mut self) -> DeserializeRecordsIter<R, D>
    where
        D: DeserializeOwned,
    {
        DeserializeRecordsIter { rdr: self, done: false, _priv: PhantomData }
    }

    /// Unwrap the underlying `io::Read`.
    ///
    /// Any data that was buffered but not yet parsed is lost.
    pub fn into_inner(self) -> R {
        self.rdr.into_inner().into_inner()
    }

    fn read_record(&mut self) -> Result<Option<StringRecord>> {
        self.tok.reset();
        self.state.rec_pos = self.state.cur_pos.clone();
        let mut first = true;
        loop {
            let ending = match self.read_line()? {
                Some(ending) => ending,
                None if first => return Ok(None),
                None => {
                    if let Err(err) = self.tok.finish() {
                        return Err(parse_error(&self.state.rec_pos, err));
                    }
                    break;
                }
            };
            let text = match self.line.to_str() {
                Ok(text) => text,
                Err(err) => {
                    return Err(Error::Utf8 {
                        pos: self.state.rec_pos.clone(),
                        err: new_utf8_error(err.valid_up_to()),
                    });
                }
            };
            if first && text.trim().is_empty() {
                trace!("blank line {} ends the records", self.state.rec_pos.line());
                return Ok(None);
            }
            first = false;

            let folds = self.tok.folds();
            let ending = ending.map_or("", |e| e.as_str());
            let done = match self.tok.feed_line(text, ending) {
                Ok(done) => done,
                Err(err) => return Err(parse_error(&self.state.rec_pos, err)),
            };
            if self.tok.folds() > folds {
                warn!(
                    "record {} (line {}): data after a closing quote was \
                     kept as part of the field",
                    self.state.rec_pos.record(),
                    self.state.rec_pos.line()
                );
            }
            if done {
                break;
            }
        }
        Ok(Some(StringRecord::from(self.tok.take_record())))
    }

    /// Read one physical line into `self.line`.
    ///
    /// Returns `None` at the end of the data, and otherwise the terminator
    /// that ended the line (if any).
    fn read_line(&mut self) -> Result<Option<Option<LineEnding>>> {
        self.line.clear();
        loop {
            let (res, nin) = {
                let input = self.rdr.fill_buf()?;
                self.framer.frame(input, &mut self.line)
            };
            self.rdr.consume(nin);
            self.state.cur_pos.byte += nin as u64;
            match res {
                FrameResult::InputEmpty => continue,
                FrameResult::End => {
                    self.state.eof = true;
                    return Ok(None);
                }
                FrameResult::Line { ending } => {
                    self.state.cur_pos.line += 1;
                    if self.state.check_bom {
                        self.state.check_bom = false;
                        if encoding::has_utf8_bom(&self.line) {
                            self.line.drain(..3);
                        }
                    }
                    return Ok(Some(ending));
                }
            }
        }
    }
}

fn parse_error(pos: &Position, err: ParseError) -> Error {
    match err {
        ParseError::FieldTooLarge { limit } => {
            Error::FieldTooLarge { pos: pos.clone(), limit }
        }
        err => Error::BadFormat { pos: pos.clone(), err },
    }
}

/// A position in CSV data.
///
/// A position is used to report errors in CSV data. All positions include
/// the byte offset, line number and record index at which the error
/// occurred. Byte offsets are counted in the UTF-8 text seen by the parser.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
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

    /// The byte offset, starting at `0`, of this position.
    pub fn byte(&self) -> u64 {
        self.byte
    }

    /// The line number, starting at `1`, of this position.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The record index, starting with the first record at `0`.
    ///
    /// A header row counts as a record.
    pub fn record(&self) -> u64 {
        self.record
    }

    /// Set the byte offset of this position.
    pub fn set_byte(&mut self, byte: u64) -> &mut Position {
        self.byte = byte;
        self
    }

    /// Set the line number of this position.
    pub fn set_line(&mut self, line: u64) -> &mut Position {
        assert!(line > 0);
        self.line = line;
        self
    }

    /// Set the record index of this position.
    pub fn set_record(&mut self, record: u64) -> &mut Position {
        self.record = record;
        self
    }
}

/// A borrowed iterator over the records of a CSV reader.
pub struct StringRecordsIter<'r, R: 'r> {
    rdr: &'r mut Reader<R>,
    done: bool,
}

impl<'r, R: io::Read> StringRecordsIter<'r, R> {
    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }
}

impl<'r, R: io::Read> Iterator for StringRecordsIter<'r, R> {
    type Item = Result<StringRecord>;

    fn next(&mut self) -> Option<Result<StringRecord>> {
        if self.done {
            return None;
        }
        match self.rdr.next() {
            Ok(true) => Some(Ok(self.rdr.current().clone())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// A borrowed iterator over deserialized records.
///
/// The type parameter `D` is the type each record is deserialized into.
#[cfg(feature = "serde")]
pub struct DeserializeRecordsIter<'r, R: 'r, D> {
    rdr: &'r mut Reader<R>,
    done: bool,
    _priv: PhantomData<D>,
}

#[cfg(feature = "serde")]
impl<'r, R: io::Read, D: DeserializeOwned> Iterator
    for DeserializeRecordsIter<'r, R, D>
{
    type Item = Result<D>;

    fn next(&mut self) -> Option<Result<D>> {
        if self.done {
            return None;
        }
        match self.rdr.next() {
            Ok(true) => {
                let res = crate::deserializer::deserialize_string_record(
                    &self.rdr.record,
                    self.rdr.headers.as_ref(),
                );
                Some(res.map_err(|err| Error::Deserialize {
                    pos: Some(self.rdr.state.rec_pos.clone()),
                    err,
                }))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
