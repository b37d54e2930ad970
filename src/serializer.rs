use std::borrow::Cow;
use std::fmt;
use std::str;

use serde::ser::{
    Error as SerdeError, Impossible, Serialize, SerializeMap, SerializeSeq,
    SerializeStruct, SerializeStructVariant, SerializeTuple,
    SerializeTupleStruct, SerializeTupleVariant, Serializer,
};

use crate::error::{Error, Result};
use crate::value::Value;

/// Serialize `value` into the values of a single row.
///
/// Sequences, tuples and structs are flattened into consecutive fields.
pub(crate) fn serialize_values<S: Serialize + ?Sized>(
    value: &S,
) -> Result<Vec<Value<'static>>> {
    let mut ser = SeRecord { row: vec![] };
    value.serialize(&mut ser)?;
    Ok(ser.row)
}

/// Returns the field names of `value` when it is a struct.
///
/// Anything else has no names, and `None` is returned.
pub(crate) fn header_names<S: Serialize + ?Sized>(
    value: &S,
) -> Result<Option<Vec<String>>> {
    let mut ser = SeHeader { names: None };
    value.serialize(&mut ser)?;
    Ok(ser.names)
}

impl SerdeError for Error {
    fn custom<T: fmt::Display>(msg: T) -> Error {
        Error::Serialize(msg.to_string())
    }
}

struct SeRecord {
    row: Vec<Value<'static>>,
}

impl SeRecord {
    fn push(&mut self, value: Value<'static>) -> Result<()> {
        self.row.push(value);
        Ok(())
    }
}

impl<'a> Serializer for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Self;
    type SerializeStructVariant = Impossible<(), Error>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.push(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.push(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.push(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.push(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.push(v.into())
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.push(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.push(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.push(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.push(v.into())
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.push(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.push(v.into())
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.push(v.into())
    }

    fn serialize_str(self, value: &str) -> Result<()> {
        self.push(Value::Str(Cow::Owned(value.to_string())))
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<()> {
        match str::from_utf8(value) {
            Ok(s) => self.serialize_str(s),
            Err(err) => Err(Error::custom(format!(
                "byte field is not valid UTF-8: {}",
                err
            ))),
        }
    }

    fn serialize_none(self) -> Result<()> {
        self.push(Value::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.push(Value::Null)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<()> {
        self.push(Value::from(name))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.push(Value::from(variant))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self> {
        Ok(self)
    }

    fn serialize_map(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeMap> {
        Err(Error::custom("serializing maps is not supported"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(Error::custom("serializing enum struct variants is not supported"))
    }
}

impl<'a> SerializeSeq for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTuple for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTupleStruct for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTupleVariant for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeStruct for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Collects the field names of a top level struct. Values are never
/// inspected.
struct SeHeader {
    names: Option<Vec<String>>,
}

macro_rules! no_header {
    ($($method:ident($($arg:ident : $ty:ty),*);)*) => {
        $(
            fn $method(self, $(_: $ty),*) -> Result<()> {
                Ok(())
            }
        )*
    };
}

impl<'a> Serializer for &'a mut SeHeader {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    no_header! {
        serialize_bool(v: bool);
        serialize_i8(v: i8);
        serialize_i16(v: i16);
        serialize_i32(v: i32);
        serialize_i64(v: i64);
        serialize_u8(v: u8);
        serialize_u16(v: u16);
        serialize_u32(v: u32);
        serialize_u64(v: u64);
        serialize_f32(v: f32);
        serialize_f64(v: f64);
        serialize_char(v: char);
        serialize_str(v: &str);
        serialize_bytes(v: &[u8]);
        serialize_none();
        serialize_unit();
        serialize_unit_struct(name: &'static str);
        serialize_unit_variant(name: &'static str, index: u32, variant: &'static str);
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        Ok(())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self> {
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self> {
        self.names = Some(Vec::with_capacity(len));
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self> {
        Ok(self)
    }
}

macro_rules! ignore_elements {
    ($($trait:ident::$method:ident),*) => {
        $(
            impl<'a> $trait for &'a mut SeHeader {
                type Ok = ();
                type Error = Error;

                fn $method<T: ?Sized + Serialize>(
                    &mut self,
                    _value: &T,
                ) -> Result<()> {
                    Ok(())
                }

                fn end(self) -> Result<()> {
                    Ok(())
                }
            }
        )*
    };
}

ignore_elements!(
    SerializeSeq::serialize_element,
    SerializeTuple::serialize_element,
    SerializeTupleStruct::serialize_field,
    SerializeTupleVariant::serialize_field
);

impl<'a> SerializeMap for &'a mut SeHeader {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, _key: &T) -> Result<()> {
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(
        &mut self,
        _value: &T,
    ) -> Result<()> {
        Ok(())
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeStruct for &'a mut SeHeader {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        _value: &T,
    ) -> Result<()> {
        if let Some(ref mut names) = self.names {
            names.push(key.to_string());
        }
        Ok(())
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeStructVariant for &'a mut SeHeader {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> Result<()> {
        Ok(())
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}
