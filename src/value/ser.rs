use std::convert::TryFrom;

use serde::Serialize;

use crate::error::EncodingError;
use crate::value::Members;
use crate::{Error, Result, Value};

pub struct Serializer;

impl Serializer {
    pub fn new() -> Self {
        Serializer {}
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

fn fit_i32(v: i64) -> Result<i32> {
    i32::try_from(v).map_err(|_| EncodingError::IntegerOutOfRange(v).into())
}

impl serde::Serializer for Serializer {
    type Error = Error;
    type Ok = Value;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeVec;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeMap;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok> {
        Ok(Value::Int32(v as i32))
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok> {
        Ok(Value::Int32(v as i32))
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok> {
        Ok(Value::Int32(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok> {
        Ok(Value::Int32(fit_i32(v)?))
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok> {
        Ok(Value::Int32(v as i32))
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok> {
        Ok(Value::Int32(v as i32))
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok> {
        Ok(Value::Int32(fit_i32(v as i64)?))
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok> {
        // XML-RPC's only integer type is a 32-bit signed int.
        let v = i64::try_from(v).map_err(|_| EncodingError::IntegerOutOfRange(i64::MAX))?;
        Ok(Value::Int32(fit_i32(v)?))
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok> {
        Ok(Value::Double(v as f64))
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok> {
        Ok(Value::Double(v))
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok> {
        Ok(Value::string(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok> {
        Ok(Value::string(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok> {
        Ok(Value::bytestring(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Self::Ok> {
        Ok(Value::Nil)
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Self::Ok>
    where
        T: Serialize,
    {
        value.serialize(Serializer)
    }

    fn serialize_unit(self) -> Result<Self::Ok> {
        Ok(Value::Nil)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok> {
        Ok(Value::from_members(Members::new()))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok> {
        Ok(Value::string(variant))
    }

    fn serialize_newtype_struct<T: ?Sized>(self, _name: &'static str, value: &T) -> Result<Self::Ok>
    where
        T: Serialize,
    {
        value.serialize(Serializer)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok>
    where
        T: Serialize,
    {
        let mut members = Members::new();
        members.insert(variant.to_string(), value.serialize(Serializer)?);
        Ok(Value::from_members(members))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        self.serialize_tuple(len.unwrap_or(0))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        Ok(SerializeVec {
            vec: Vec::with_capacity(len),
        })
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.serialize_tuple(len)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(SerializeMap {
            map: Members::new(),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.serialize_map(Some(len))
    }
}

#[doc(hidden)]
pub struct SerializeVec {
    vec: Vec<Value>,
}

impl serde::ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.vec.push(value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Value::array(self.vec))
    }
}

impl serde::ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        serde::ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok> {
        serde::ser::SerializeSeq::end(self)
    }
}

impl serde::ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        serde::ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok> {
        serde::ser::SerializeSeq::end(self)
    }
}

impl serde::ser::SerializeTupleVariant for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        serde::ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok> {
        serde::ser::SerializeSeq::end(self)
    }
}

#[doc(hidden)]
pub struct SerializeMap {
    map: Members,
    next_key: Option<String>,
}

impl serde::ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<()>
    where
        T: Serialize,
    {
        // While we could technically allow for any type which can be serialized
        // to a string to be used as a key, it's a bit cleaner to only allow
        // "string" types.
        match key.serialize(Serializer)? {
            ref v @ Value::String(_) => {
                self.next_key = Some(v.as_str().expect("matched String variant").to_string());
                Ok(())
            }
            other => Err(EncodingError::InvalidKeyType(other.tag_name().to_string()).into()),
        }
    }

    fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let key = self
            .next_key
            .take()
            .expect("serialize_value called before serialize_key");
        let value = value.serialize(Serializer)?;

        self.map.insert(key, value);

        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::from_members(self.map))
    }
}

impl serde::ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        serde::ser::SerializeMap::serialize_entry(self, key, value)
    }

    fn end(self) -> Result<Value> {
        serde::ser::SerializeMap::end(self)
    }
}

impl serde::ser::SerializeStructVariant for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        serde::ser::SerializeMap::serialize_entry(self, key, value)
    }

    fn end(self) -> Result<Value> {
        serde::ser::SerializeMap::end(self)
    }
}

#[cfg(test)]
mod test {
    use serde::Serialize;

    use super::Serializer;

    #[derive(Serialize, Debug, PartialEq)]
    struct Test {
        hello: String,
    }

    #[derive(Serialize, Debug, PartialEq)]
    struct Test2 {
        val: Option<String>,
    }

    #[test]
    fn test_serde() {
        use crate::value::Members;
        use crate::Value;

        let x = Value::int(42);
        let y: i32 = 42;
        let y = y.serialize(Serializer).unwrap();
        assert_eq!(y, x);

        let x = Value::array(vec![Value::string("hello world")]);
        let y: Vec<String> = vec!["hello world".to_string()];
        let y = y.serialize(Serializer).unwrap();
        assert_eq!(y, x);

        let mut expected = Members::new();
        expected.insert("hello".to_string(), Value::string("world"));
        let x = Value::from_members(expected);
        let y = Test {
            hello: "world".to_string(),
        };
        let y = y.serialize(Serializer).unwrap();
        assert_eq!(y, x);

        let mut expected = Members::new();
        expected.insert("val".to_string(), Value::nil());
        let x = Value::from_members(expected);
        let y = Test2 { val: None };
        let y = y.serialize(Serializer).unwrap();
        assert_eq!(y, x);

        let mut expected = Members::new();
        expected.insert("val".to_string(), Value::string("hello"));
        let x = Value::from_members(expected);
        let y = Test2 {
            val: Some("hello".to_string()),
        };
        let y = y.serialize(Serializer).unwrap();
        assert_eq!(y, x);
    }

    #[test]
    fn out_of_range_i64_is_an_error() {
        let too_big: i64 = i64::from(i32::MAX) + 1;
        assert!(too_big.serialize(Serializer).is_err());
    }
}
