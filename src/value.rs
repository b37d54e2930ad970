use std::borrow::Cow;
use std::fmt;

use libcsv_core::Quoter;

/// One value of a row handed to [`Writer::write_row`](crate::Writer::write_row).
///
/// The writer treats values differently depending on what they are: text is
/// quoted according to the dialect, numbers and other values are written in
/// their plain string form and only quoted when every field must be, and a
/// missing value becomes an empty field.
#[derive(Clone, Debug, PartialEq)]
pub enum Value<'a> {
    /// No value. Written as an empty field.
    Null,
    /// Text.
    Str(Cow<'a, str>),
    /// A signed integer.
    Integer(i64),
    /// An unsigned integer.
    Unsigned(u64),
    /// A double precision float.
    Float(f64),
    /// A single precision float.
    Float32(f32),
    /// A boolean, written as `true` or `false`.
    Bool(bool),
    /// Any other value, already rendered to its string form.
    Other(Cow<'a, str>),
}

impl<'a> Value<'a> {
    /// Build a value from anything implementing `Display`.
    ///
    /// The value is treated like a number: it is not quoted unless every
    /// field is.
    pub fn display<T: fmt::Display + ?Sized>(value: &T) -> Value<'static> {
        Value::Other(Cow::Owned(value.to_string()))
    }

    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        match *self {
            Value::Null => true,
            _ => false,
        }
    }

    /// Append this value, rendered as a field, to `out`.
    pub(crate) fn write_to(&self, quoter: &Quoter, out: &mut String) {
        match *self {
            Value::Null => {}
            Value::Str(ref s) => quoter.quote_text(s, out),
            Value::Integer(n) => {
                quoter.quote_plain(itoa::Buffer::new().format(n), out)
            }
            Value::Unsigned(n) => {
                quoter.quote_plain(itoa::Buffer::new().format(n), out)
            }
            Value::Float(n) => quoter.quote_plain(&format_f64(n), out),
            Value::Float32(n) => quoter.quote_plain(&format_f32(n), out),
            Value::Bool(b) => {
                quoter.quote_plain(if b { "true" } else { "false" }, out)
            }
            Value::Other(ref s) => quoter.quote_plain(s, out),
        }
    }
}

/// Floats go through `ryu`, except for values it renders in a form that
/// does not parse back (infinities and NaN).
fn format_f64(n: f64) -> String {
    if n.is_finite() {
        ryu::Buffer::new().format_finite(n).to_string()
    } else {
        n.to_string()
    }
}

fn format_f32(n: f32) -> String {
    if n.is_finite() {
        ryu::Buffer::new().format_finite(n).to_string()
    } else {
        n.to_string()
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Value<'a> {
        Value::Str(Cow::Borrowed(s))
    }
}

impl<'a> From<&'a String> for Value<'a> {
    fn from(s: &'a String) -> Value<'a> {
        Value::Str(Cow::Borrowed(s))
    }
}

impl<'a> From<String> for Value<'a> {
    fn from(s: String) -> Value<'a> {
        Value::Str(Cow::Owned(s))
    }
}

impl<'a> From<Cow<'a, str>> for Value<'a> {
    fn from(s: Cow<'a, str>) -> Value<'a> {
        Value::Str(s)
    }
}

macro_rules! from_signed {
    ($($ty:ty),*) => {
        $(
            impl<'a> From<$ty> for Value<'a> {
                fn from(n: $ty) -> Value<'a> {
                    Value::Integer(n as i64)
                }
            }
        )*
    }
}

macro_rules! from_unsigned {
    ($($ty:ty),*) => {
        $(
            impl<'a> From<$ty> for Value<'a> {
                fn from(n: $ty) -> Value<'a> {
                    Value::Unsigned(n as u64)
                }
            }
        )*
    }
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl<'a> From<f64> for Value<'a> {
    fn from(n: f64) -> Value<'a> {
        Value::Float(n)
    }
}

impl<'a> From<f32> for Value<'a> {
    fn from(n: f32) -> Value<'a> {
        Value::Float32(n)
    }
}

impl<'a> From<bool> for Value<'a> {
    fn from(b: bool) -> Value<'a> {
        Value::Bool(b)
    }
}

impl<'a> From<char> for Value<'a> {
    fn from(c: char) -> Value<'a> {
        Value::Other(Cow::Owned(c.to_string()))
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(v: Option<T>) -> Value<'a> {
        v.map_or(Value::Null, Into::into)
    }
}
