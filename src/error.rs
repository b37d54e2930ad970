use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::num;
use std::path::PathBuf;
use std::result;
use std::str;

use libcsv_core::{DialectError, ParseError};

use crate::reader::Position;

/// A type alias for `Result<T, libcsv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when reading or writing CSV data.
///
/// Every error is reported to the immediate caller. Nothing is retried, and
/// a reader or writer that opened a file itself still releases it when it
/// is dropped after an error.
#[derive(Debug)]
pub enum Error {
    /// An I/O error that occurred while reading or writing CSV data.
    Io(io::Error),
    /// A line of input was not valid UTF-8.
    Utf8 {
        /// The position of the record in which this error occurred.
        pos: Position,
        /// The corresponding UTF-8 error.
        err: Utf8Error,
    },
    /// A reader or writer was built without a dialect.
    NoDialect,
    /// The dialect breaks one of its invariants.
    InvalidDialect(DialectError),
    /// No input source was given, e.g. an empty file name.
    NoInputSource,
    /// No output sink was given, e.g. an empty file name.
    NoOutputSink,
    /// The named input file could not be opened.
    CannotOpenSource {
        /// The file that was asked for.
        path: PathBuf,
        /// The underlying I/O error.
        err: io::Error,
    },
    /// The named output file could not be opened.
    CannotOpenSink {
        /// The file that was asked for.
        path: PathBuf,
        /// The underlying I/O error.
        err: io::Error,
    },
    /// The requested text encoding label is not known.
    UnknownEncoding(String),
    /// The input does not follow the dialect.
    BadFormat {
        /// The position of the record in which this error occurred.
        pos: Position,
        /// What the tokenizer expected.
        err: ParseError,
    },
    /// A field is longer than the configured limit.
    FieldTooLarge {
        /// The position of the record in which this error occurred.
        pos: Position,
        /// The limit, in characters.
        limit: usize,
    },
    /// An attempt was made to write a row with no fields.
    EmptyRow,
    /// A row does not have the same number of fields as the first row
    /// written (or the header).
    RowShapeMismatch {
        /// The number of fields every row must have.
        expected_len: u64,
        /// The number of fields in the offending row.
        len: u64,
        /// The index of the offending row, counting from 0.
        record: u64,
    },
    /// The writer is closed.
    WriterClosed,
    /// A field could not be converted to the type asked for.
    CannotConvert {
        /// The header alias or index of the column.
        column: String,
        /// The text of the field.
        value: String,
        /// The name of the target type.
        expected: &'static str,
    },
    /// A value could not be serialized as a record.
    Serialize(String),
    /// A record could not be deserialized into a value.
    Deserialize {
        /// The position of the record in which this error occurred.
        pos: Option<Position>,
        /// The underlying deserialization error.
        err: DeserializeError,
    },
}

impl Error {
    /// The position of the record that caused this error, if any.
    pub fn position(&self) -> Option<&Position> {
        match *self {
            Error::Utf8 { ref pos, .. }
            | Error::BadFormat { ref pos, .. }
            | Error::FieldTooLarge { ref pos, .. } => Some(pos),
            Error::Deserialize { ref pos, .. } => pos.as_ref(),
            _ => None,
        }
    }

    /// Returns true if this is an I/O error.
    pub fn is_io_error(&self) -> bool {
        match *self {
            Error::Io(_)
            | Error::CannotOpenSource { .. }
            | Error::CannotOpenSink { .. } => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<DialectError> for Error {
    fn from(err: DialectError) -> Error {
        Error::InvalidDialect(err)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Utf8 { ref err, .. } => Some(err),
            Error::InvalidDialect(ref err) => Some(err),
            Error::CannotOpenSource { ref err, .. } => Some(err),
            Error::CannotOpenSink { ref err, .. } => Some(err),
            Error::BadFormat { ref err, .. } => Some(err),
            Error::Deserialize { ref err, .. } => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Utf8 { ref pos, ref err } => write!(
                f,
                "CSV parse error: record {} (byte {}, line {}): {}",
                pos.record(),
                pos.byte(),
                pos.line(),
                err
            ),
            Error::NoDialect => write!(f, "CSV error: set a dialect first"),
            Error::InvalidDialect(ref err) => {
                write!(f, "CSV error: invalid dialect: {}", err)
            }
            Error::NoInputSource => {
                write!(f, "CSV error: no input source (file name is empty)")
            }
            Error::NoOutputSink => {
                write!(f, "CSV error: no output sink (file name is empty)")
            }
            Error::CannotOpenSource { ref path, ref err } => write!(
                f,
                "CSV error: cannot read from file '{}': {}",
                path.display(),
                err
            ),
            Error::CannotOpenSink { ref path, ref err } => write!(
                f,
                "CSV error: cannot write to file '{}': {}",
                path.display(),
                err
            ),
            Error::UnknownEncoding(ref label) => {
                write!(f, "CSV error: unknown text encoding '{}'", label)
            }
            Error::BadFormat { ref pos, ref err } => write!(
                f,
                "CSV parse error: record {} (byte {}, line {}): \
                 bad format: {}",
                pos.record(),
                pos.byte(),
                pos.line(),
                err
            ),
            Error::FieldTooLarge { ref pos, limit } => write!(
                f,
                "CSV parse error: record {} (byte {}, line {}): \
                 field larger than field limit ({})",
                pos.record(),
                pos.byte(),
                pos.line(),
                limit
            ),
            Error::EmptyRow => {
                write!(f, "CSV write error: row is empty")
            }
            Error::RowShapeMismatch { expected_len, len, record } => write!(
                f,
                "CSV write error: record {}: found record with {} fields, \
                 but the previous record has {} fields",
                record, len, expected_len
            ),
            Error::WriterClosed => {
                write!(f, "CSV write error: writer is closed")
            }
            Error::CannotConvert { ref column, ref value, expected } => {
                write!(
                    f,
                    "CSV error: cannot convert '{}' in column '{}' to {}",
                    value, column, expected
                )
            }
            Error::Serialize(ref msg) => {
                write!(f, "CSV write error: {}", msg)
            }
            Error::Deserialize { pos: None, ref err } => {
                write!(f, "CSV deserialize error: {}", err)
            }
            Error::Deserialize { pos: Some(ref pos), ref err } => write!(
                f,
                "CSV deserialize error: record {} (line {}, byte {}): {}",
                pos.record(),
                pos.line(),
                pos.byte(),
                err
            ),
        }
    }
}

/// A UTF-8 validation error for one line of input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Utf8Error {
    valid_up_to: usize,
}

/// Create a new UTF-8 error.
pub(crate) fn new_utf8_error(valid_up_to: usize) -> Utf8Error {
    Utf8Error { valid_up_to }
}

impl Utf8Error {
    /// The byte offset in the line up to which the input was valid UTF-8.
    pub fn valid_up_to(&self) -> usize {
        self.valid_up_to
    }
}

impl fmt::Display for Utf8Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid UTF-8 in line near byte index {}", self.valid_up_to)
    }
}

impl StdError for Utf8Error {}

/// An error that occurs when turning a record into a typed value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeserializeError {
    pub(crate) field: Option<u64>,
    pub(crate) kind: DeserializeErrorKind,
}

/// The kind of a deserialization error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeserializeErrorKind {
    /// A free form message, usually from a `Deserialize` impl.
    Message(String),
    /// The record ran out of fields.
    UnexpectedEndOfRow,
    /// A field is not a boolean.
    ParseBool(str::ParseBoolError),
    /// A field is not an integer.
    ParseInt(num::ParseIntError),
    /// A field is not a float.
    ParseFloat(num::ParseFloatError),
}

impl DeserializeError {
    /// The index (starting at 0) of the field that failed, if known.
    pub fn field(&self) -> Option<u64> {
        self.field
    }

    /// The underlying error kind.
    pub fn kind(&self) -> &DeserializeErrorKind {
        &self.kind
    }
}

impl StdError for DeserializeError {}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(field) = self.field {
            write!(f, "field {}: {}", field, self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl fmt::Display for DeserializeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::DeserializeErrorKind::*;

        match *self {
            Message(ref msg) => write!(f, "{}", msg),
            UnexpectedEndOfRow => write!(f, "expected field, but got end of row"),
            ParseBool(ref err) => write!(f, "{}", err),
            ParseInt(ref err) => write!(f, "{}", err),
            ParseFloat(ref err) => write!(f, "{}", err),
        }
    }
}

/// An error returned by [`Writer::into_inner`](crate::Writer::into_inner)
/// when flushing the buffered data fails.
///
/// The writer is handed back so that nothing is lost.
pub struct IntoInnerError<W> {
    wtr: W,
    err: io::Error,
}

impl<W> IntoInnerError<W> {
    pub(crate) fn new(wtr: W, err: io::Error) -> IntoInnerError<W> {
        IntoInnerError { wtr, err }
    }

    /// The error that occurred while flushing.
    pub fn error(&self) -> &io::Error {
        &self.err
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.wtr
    }
}

impl<W> fmt::Debug for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IntoInnerError").field("err", &self.err).finish()
    }
}

impl<W> fmt::Display for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl<W> StdError for IntoInnerError<W> {}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;
    use std::io;

    use libcsv_core::{DialectError, ParseError};

    use super::Error;
    use crate::reader::Position;

    #[test]
    fn dialect_error_converts() {
        let err = Error::from(DialectError::DelimiterNotSet);
        assert!(matches!(err, Error::InvalidDialect(DialectError::DelimiterNotSet)));
        assert_eq!(
            "CSV error: invalid dialect: delimiter must be set",
            err.to_string()
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn bad_format_mentions_position() {
        let mut pos = Position::new();
        pos.set_byte(10).set_line(2).set_record(1);
        let err = Error::BadFormat {
            pos,
            err: ParseError::NulByte { column: 3 },
        };
        let msg = err.to_string();
        assert!(msg.contains("record 1"), "{}", msg);
        assert!(msg.contains("line 2"), "{}", msg);
        assert!(msg.contains("NUL"), "{}", msg);
        assert_eq!(Some(2), err.position().map(|p| p.line()));
    }

    #[test]
    fn io_errors() {
        let err = Error::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(err.is_io_error());
        assert!(!Error::EmptyRow.is_io_error());
    }
}
