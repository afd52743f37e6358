//! Ordered, positionally-typed call arguments (the `C3` component).

use crate::error::ParamError;
use crate::value::DateTime;
use crate::{Members, Value};

/// The ordered list of `<value>`s carried by a `<methodCall>` or a method handler's
/// parameters. Values are accessed positionally and by expected type; a mismatch
/// fails with [`ParamError::Type`] rather than panicking.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamList {
    values: Vec<Value>,
}

impl ParamList {
    pub fn new() -> Self {
        ParamList { values: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn add(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    fn get(&self, index: usize) -> std::result::Result<&Value, ParamError> {
        self.values.get(index).ok_or(ParamError::Index {
            index,
            len: self.values.len(),
        })
    }

    fn typed<T>(
        &self,
        index: usize,
        expected: &'static str,
        accessor: impl FnOnce(&Value) -> std::result::Result<T, crate::error::ValueError>,
    ) -> std::result::Result<T, ParamError> {
        let value = self.get(index)?;
        accessor(value).map_err(|_| ParamError::Type {
            index,
            expected,
            found: value.tag_name(),
        })
    }

    pub fn get_int(&self, index: usize) -> std::result::Result<i32, ParamError> {
        self.typed(index, "int", Value::as_i32)
    }

    pub fn get_bool(&self, index: usize) -> std::result::Result<bool, ParamError> {
        self.typed(index, "boolean", Value::as_bool)
    }

    pub fn get_double(&self, index: usize) -> std::result::Result<f64, ParamError> {
        self.typed(index, "double", Value::as_f64)
    }

    pub fn get_string(&self, index: usize) -> std::result::Result<String, ParamError> {
        self.typed(index, "string", |v| v.as_str().map(str::to_owned))
    }

    pub fn get_bytestring(&self, index: usize) -> std::result::Result<Vec<u8>, ParamError> {
        self.typed(index, "base64", |v| v.as_bytes().map(<[u8]>::to_vec))
    }

    pub fn get_datetime(&self, index: usize) -> std::result::Result<DateTime, ParamError> {
        self.typed(index, "dateTime.iso8601", Value::as_datetime)
    }

    pub fn get_array(&self, index: usize) -> std::result::Result<Vec<Value>, ParamError> {
        self.typed(index, "array", |v| v.as_array().map(<[Value]>::to_vec))
    }

    pub fn get_struct(&self, index: usize) -> std::result::Result<Members, ParamError> {
        self.typed(index, "struct", |v| v.as_struct().map(Members::clone))
    }

    pub fn get_nil(&self, index: usize) -> std::result::Result<(), ParamError> {
        let value = self.get(index)?;
        match value {
            Value::Nil => Ok(()),
            _ => Err(ParamError::Type {
                index,
                expected: "nil",
                found: value.tag_name(),
            }),
        }
    }

    /// Fails unless exactly `n` parameters are present.
    pub fn verify_end(&self, n: usize) -> std::result::Result<(), ParamError> {
        if self.values.len() == n {
            Ok(())
        } else {
            Err(ParamError::Count {
                expected: n,
                found: self.values.len(),
            })
        }
    }
}

impl From<Vec<Value>> for ParamList {
    fn from(values: Vec<Value>) -> Self {
        ParamList { values }
    }
}

impl From<ParamList> for Vec<Value> {
    fn from(params: ParamList) -> Self {
        params.values
    }
}

impl IntoIterator for ParamList {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_succeed_and_fail() {
        let params = ParamList::from(vec![Value::int(2), Value::string("hi")]);
        assert_eq!(params.get_int(0).unwrap(), 2);
        assert_eq!(params.get_string(1).unwrap(), "hi");

        match params.get_int(1) {
            Err(ParamError::Type { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected Type error, got {:?}", other),
        }
    }

    #[test]
    fn index_out_of_range_is_an_error() {
        let params = ParamList::new();
        match params.get_int(0) {
            Err(ParamError::Index { index, len }) => {
                assert_eq!(index, 0);
                assert_eq!(len, 0);
            }
            other => panic!("expected Index error, got {:?}", other),
        }
    }

    #[test]
    fn verify_end_checks_exact_count() {
        let mut params = ParamList::new();
        params.add(1);
        params.add("two");
        assert!(params.verify_end(2).is_ok());
        assert!(matches!(
            params.verify_end(1),
            Err(ParamError::Count {
                expected: 1,
                found: 2
            })
        ));
    }
}
