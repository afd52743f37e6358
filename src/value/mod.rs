use std::sync::Arc;

#[cfg(test)]
pub(crate) mod arbitrary;
pub mod datetime;
pub mod de;
pub mod members;
pub mod ser;

pub use datetime::DateTime;
pub use members::Members;

use crate::error::ValueError;

/// Any single XML-RPC value.
///
/// A `Value` is a cheap-to-clone handle: `Array` and `Struct` (and the two growable
/// scalar payloads, `String` and `Bytestring`) share their backing storage via `Arc`, so
/// cloning a `Value` never deep-copies a tree and a `Value` may be sent across threads.
/// `Value::uninit()` produces a placeholder handle; every accessor on it fails with
/// [`ValueError::Uninitialized`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A 32-bit signed integer (`<i4>` or `<int>`).
    Int32(i32),
    /// A boolean value (`<boolean>`, 0 == `false`, 1 == `true`).
    Bool(bool),
    /// A double-precision IEEE 754 floating point number (`<double>`).
    Double(f64),
    /// An ISO 8601 date/time value with no time zone (`<dateTime.iso8601>`).
    DateTime(DateTime),
    /// A string (`<string>`).
    String(Arc<String>),
    /// Base64-encoded binary data (`<base64>`).
    Bytestring(Arc<Vec<u8>>),
    /// A list of arbitrary (heterogeneous) values (`<array>`).
    Array(Arc<Vec<Value>>),
    /// A mapping of named values (`<struct>`), preserving insertion/document order.
    Struct(Arc<Members>),
    /// The present-but-empty value (`<nil/>`).
    Nil,
    /// An uninitialized placeholder handle. Every accessor fails on this variant.
    Placeholder,
}

impl Value {
    pub fn int(v: i32) -> Self {
        Value::Int32(v)
    }

    pub fn bool(v: bool) -> Self {
        Value::Bool(v)
    }

    pub fn double(v: f64) -> Self {
        Value::Double(v)
    }

    pub fn datetime(v: DateTime) -> Self {
        Value::DateTime(v)
    }

    pub fn string(v: impl Into<String>) -> Self {
        Value::String(Arc::new(v.into()))
    }

    pub fn bytestring(v: impl Into<Vec<u8>>) -> Self {
        Value::Bytestring(Arc::new(v.into()))
    }

    pub fn array(v: Vec<Value>) -> Self {
        Value::Array(Arc::new(v))
    }

    pub fn from_members(v: Members) -> Self {
        Value::Struct(Arc::new(v))
    }

    pub fn nil() -> Self {
        Value::Nil
    }

    /// An uninitialized placeholder handle (see [`Value::Placeholder`]).
    pub fn uninit() -> Self {
        Value::Placeholder
    }

    pub fn tag_name(&self) -> &'static str {
        match self {
            Value::Int32(_) => "int",
            Value::Bool(_) => "boolean",
            Value::Double(_) => "double",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::String(_) => "string",
            Value::Bytestring(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Nil => "nil",
            Value::Placeholder => "placeholder",
        }
    }

    fn mismatch<T>(&self, expected: &'static str) -> Result<T, ValueError> {
        if matches!(self, Value::Placeholder) {
            Err(ValueError::Uninitialized)
        } else {
            Err(ValueError::TypeMismatch {
                expected,
                found: self.tag_name(),
            })
        }
    }

    /// If the `Value` is `Int32`, returns the associated value.
    pub fn as_i32(&self) -> Result<i32, ValueError> {
        match self {
            Value::Int32(i) => Ok(*i),
            _ => self.mismatch("int"),
        }
    }

    /// If the `Value` is `Bool`, returns the associated value.
    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => self.mismatch("boolean"),
        }
    }

    /// If the `Value` is `String`, returns the associated value.
    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Value::String(s) => Ok(s),
            _ => self.mismatch("string"),
        }
    }

    /// If the `Value` is `Double`, returns the associated value.
    pub fn as_f64(&self) -> Result<f64, ValueError> {
        match self {
            Value::Double(d) => Ok(*d),
            _ => self.mismatch("double"),
        }
    }

    /// If the `Value` is `DateTime`, returns the associated value.
    pub fn as_datetime(&self) -> Result<DateTime, ValueError> {
        match self {
            Value::DateTime(dt) => Ok(*dt),
            _ => self.mismatch("dateTime.iso8601"),
        }
    }

    /// If the `Value` is `Bytestring`, returns the associated slice.
    pub fn as_bytes(&self) -> Result<&[u8], ValueError> {
        match self {
            Value::Bytestring(data) => Ok(data),
            _ => self.mismatch("base64"),
        }
    }

    /// If the `Value` is `Struct`, returns the associated members.
    pub fn as_struct(&self) -> Result<&Members, ValueError> {
        match self {
            Value::Struct(map) => Ok(map),
            _ => self.mismatch("struct"),
        }
    }

    /// If the `Value` is `Array`, returns the associated slice.
    pub fn as_array(&self) -> Result<&[Value], ValueError> {
        match self {
            Value::Array(array) => Ok(array),
            _ => self.mismatch("array"),
        }
    }

    /// Returns the number of elements if this is an `Array`.
    pub fn array_size(&self) -> Result<usize, ValueError> {
        self.as_array().map(<[Value]>::len)
    }

    /// Returns the element at `index` if this is an `Array`.
    pub fn array_get(&self, index: usize) -> Result<&Value, ValueError> {
        let array = self.as_array()?;
        array.get(index).ok_or(ValueError::ArrayIndex {
            index,
            len: array.len(),
        })
    }

    /// Returns the number of members if this is a `Struct`.
    pub fn struct_size(&self) -> Result<usize, ValueError> {
        self.as_struct().map(Members::len)
    }

    /// Returns whether `key` is a member, if this is a `Struct`.
    pub fn struct_has(&self, key: &str) -> Result<bool, ValueError> {
        self.as_struct().map(|m| m.contains_key(key))
    }

    /// Returns the member named `key` if this is a `Struct`.
    pub fn struct_get(&self, key: &str) -> Result<&Value, ValueError> {
        let members = self.as_struct()?;
        members
            .get(key)
            .ok_or_else(|| ValueError::NoSuchMember(key.to_string()))
    }
}

/// Tears down `Array`/`Struct` subtrees iteratively rather than recursively, so a
/// pathologically deep value tree cannot overflow the stack on drop. When the last
/// `Arc` to a composite's storage goes away, its children are moved onto a flat work
/// list instead of being dropped in place; dropping a child popped off the list repeats
/// the same flattening, one level at a time, instead of letting `Vec`'s built-in drop
/// glue descend the whole subtree in one recursive call.
impl Drop for Value {
    fn drop(&mut self) {
        let mut worklist = Vec::new();
        take_children(self, &mut worklist);

        while let Some(mut value) = worklist.pop() {
            take_children(&mut value, &mut worklist);
        }
    }
}

fn take_children(value: &mut Value, worklist: &mut Vec<Value>) {
    match value {
        Value::Array(arc) => {
            if let Some(elements) = Arc::get_mut(arc) {
                worklist.append(elements);
            }
        }
        Value::Struct(arc) => {
            if let Some(members) = Arc::get_mut(arc) {
                worklist.extend(members.take_values());
            }
        }
        _ => {}
    }
}

// Conversions into Value

impl From<i32> for Value {
    fn from(other: i32) -> Self {
        Value::Int32(other)
    }
}

impl From<bool> for Value {
    fn from(other: bool) -> Self {
        Value::Bool(other)
    }
}

impl From<String> for Value {
    fn from(other: String) -> Self {
        Value::string(other)
    }
}

impl From<&str> for Value {
    fn from(other: &str) -> Self {
        Value::string(other)
    }
}

impl From<f64> for Value {
    fn from(other: f64) -> Self {
        Value::Double(other)
    }
}

impl From<DateTime> for Value {
    fn from(other: DateTime) -> Self {
        Value::DateTime(other)
    }
}

impl From<Vec<Value>> for Value {
    fn from(other: Vec<Value>) -> Value {
        Value::array(other)
    }
}

impl From<Members> for Value {
    fn from(other: Members) -> Value {
        Value::from_members(other)
    }
}

impl From<Vec<u8>> for Value {
    fn from(other: Vec<u8>) -> Self {
        Value::bytestring(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_does_not_panic() {
        let v = Value::int(1);
        assert!(v.as_str().is_err());
        assert!(v.as_bool().is_err());
    }

    #[test]
    fn placeholder_reports_uninitialized() {
        let v = Value::uninit();
        match v.as_i32() {
            Err(ValueError::Uninitialized) => {}
            other => panic!("expected Uninitialized, got {:?}", other),
        }
    }

    #[test]
    fn array_and_struct_accessors() {
        let mut members = Members::new();
        members.insert("a".to_string(), Value::int(1));
        let s = Value::from_members(members);
        assert_eq!(s.struct_size().unwrap(), 1);
        assert!(s.struct_has("a").unwrap());
        assert_eq!(s.struct_get("a").unwrap().as_i32().unwrap(), 1);

        let arr = Value::array(vec![Value::int(1), Value::int(2)]);
        assert_eq!(arr.array_size().unwrap(), 2);
        assert_eq!(arr.array_get(1).unwrap().as_i32().unwrap(), 2);
        assert!(arr.array_get(5).is_err());
    }

    #[test]
    fn clone_is_a_cheap_handle_not_a_deep_copy() {
        let a = Value::array(vec![Value::int(1)]);
        let b = a.clone();
        if let (Value::Array(ra), Value::Array(rb)) = (&a, &b) {
            assert!(Arc::ptr_eq(ra, rb));
        } else {
            panic!("expected arrays");
        }
    }

    #[test]
    fn deeply_nested_array_drops_without_overflowing_the_stack() {
        let mut value = Value::array(vec![Value::int(0)]);
        for _ in 0..100_000 {
            value = Value::array(vec![value]);
        }
        drop(value);
    }
}
