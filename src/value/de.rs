use serde::de::Visitor;
use serde::forward_to_deserialize_any;

use crate::error::ValueError;
use crate::value::Members;
use crate::{Error, Result, Value};

impl<'de> serde::Deserializer<'de> for Value {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match &self {
            Value::Int32(v) => visitor.visit_i32(*v),
            Value::Bool(v) => visitor.visit_bool(*v),
            Value::String(v) => visitor.visit_str(v),
            Value::Double(v) => visitor.visit_f64(*v),
            Value::DateTime(v) => visitor.visit_string(v.to_string()),
            Value::Bytestring(v) => visitor.visit_bytes(v),
            Value::Struct(v) => visitor.visit_map(MapDeserializer::new((**v).clone())),
            Value::Array(v) => visitor.visit_seq(SeqDeserializer::new((**v).clone())),
            Value::Nil => visitor.visit_none(),
            Value::Placeholder => Err(ValueError::Uninitialized.into()),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if let Value::Nil = self {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    forward_to_deserialize_any!(
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes
        byte_buf unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    );
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> serde::de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: serde::de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(value).map(Some),
            None => Ok(None),
        }
    }
}

struct MapDeserializer {
    iter: <Members as IntoIterator>::IntoIter,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(map: Members) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> serde::de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: serde::de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(Value::string(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<T>(&mut self, seed: T) -> Result<T::Value>
    where
        T: serde::de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(value),
            None => Err(serde::de::Error::custom("value is missing")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_transcode::transcode(deserializer, super::ser::Serializer::new())
            .map_err(serde::de::Error::custom)
    }
}

/// A thin wrapper so conversion from an existing [`Value`] reads as a constructor rather
/// than relying on `Value` itself implementing `serde::Deserializer`.
pub struct Deserializer(Value);

impl Deserializer {
    pub fn from_value(value: Value) -> Self {
        Deserializer(value)
    }
}

impl<'de> serde::Deserializer<'de> for Deserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.0.deserialize_any(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.0.deserialize_option(visitor)
    }

    forward_to_deserialize_any!(
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes
        byte_buf unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    );
}

#[cfg(test)]
mod test {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Test {
        hello: String,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Test2 {
        val: Option<String>,
    }

    #[test]
    fn test_serde() {
        use crate::value::Members;
        use crate::Value;

        let x = Value::int(42);
        let y = i32::deserialize(x).unwrap();
        assert_eq!(y, 42);

        let x = Value::array(vec![Value::string("hello world")]);
        let y: Vec<String> = Vec::deserialize(x).unwrap();
        assert_eq!(y, vec!["hello world".to_string()]);

        let mut members = Members::new();
        members.insert("hello".to_string(), Value::string("world"));
        let x = Value::from_members(members);
        let y = Test::deserialize(x).unwrap();
        assert_eq!(
            y,
            Test {
                hello: "world".to_string(),
            },
        );

        let x = Value::from_members(Members::new());
        let y = Test2::deserialize(x).unwrap();
        assert_eq!(y, Test2 { val: None });

        let mut members = Members::new();
        members.insert("val".to_string(), Value::nil());
        let x = Value::from_members(members);
        let y = Test2::deserialize(x).unwrap();
        assert_eq!(y, Test2 { val: None });

        let mut members = Members::new();
        members.insert("val".to_string(), Value::string("hello"));
        let x = Value::from_members(members);
        let y = Test2::deserialize(x).unwrap();
        assert_eq!(
            y,
            Test2 {
                val: Some("hello".to_string())
            },
        );
    }
}
