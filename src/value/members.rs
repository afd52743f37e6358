use std::iter::FromIterator;

use super::Value;

/// An ordered mapping from struct member names to values.
///
/// `<struct>` members preserve document order on decode and insertion order when built
/// programmatically. If the same key is inserted twice, the later value wins but the key
/// keeps its original position, matching how real XML-RPC senders that emit duplicate
/// member names are handled elsewhere in the ecosystem.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Members {
    entries: Vec<(String, Value)>,
}

impl Members {
    pub fn new() -> Self {
        Members::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `value` under `key`. If `key` is already present, its value is replaced
    /// in place (the key keeps its original position); otherwise the pair is appended.
    pub fn insert(&mut self, key: String, value: Value) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Empties `self` and returns its values, leaving the keys behind. Used by
    /// `Value`'s iterative `Drop` to flatten a struct's children onto a work list
    /// instead of dropping them recursively.
    pub(crate) fn take_values(&mut self) -> Vec<Value> {
        self.entries
            .drain(..)
            .map(|(_, v)| v)
            .collect()
    }
}

impl FromIterator<(String, Value)> for Members {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut members = Members::new();
        for (k, v) in iter {
            members.insert(k, v);
        }
        members
    }
}

impl IntoIterator for Members {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut m = Members::new();
        m.insert("b".to_string(), Value::from(1_i32));
        m.insert("a".to_string(), Value::from(2_i32));
        let keys: Vec<_> = m.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn duplicate_key_keeps_position_last_value_wins() {
        let mut m = Members::new();
        m.insert("a".to_string(), Value::from(1_i32));
        m.insert("b".to_string(), Value::from(2_i32));
        m.insert("a".to_string(), Value::from(3_i32));

        let keys: Vec<_> = m.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(m.get("a").unwrap().as_i32().unwrap(), 3);
    }
}
