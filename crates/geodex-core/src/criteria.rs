//! Field criteria passed to filters, lookups and constructors

use serde_json::{Map, Value};
use std::fmt;

/// Ordered `key -> value` pairs.
///
/// Keys are `path[__lookup]` expressions for queries and plain field names
/// for construction/update. Order is preserved so error messages echo the
/// caller's criteria as given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria(Vec<(String, Value)>);

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Criteria {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> From<Vec<(K, V)>> for Criteria {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<Map<String, Value>> for Criteria {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Criteria {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_preserves_order() {
        let criteria = Criteria::new().with("name", "Cafe").with("visibility", true);
        assert_eq!(criteria.to_string(), "name=\"Cafe\", visibility=true");
    }

    #[test]
    fn test_conversions() {
        let from_array = Criteria::from([("a", 1), ("b", 2)]);
        assert_eq!(from_array.len(), 2);
        assert_eq!(from_array.get("b"), Some(&json!(2)));

        let from_map = Criteria::from(json!({"x": null}).as_object().cloned().unwrap_or_default());
        assert_eq!(from_map.keys().collect::<Vec<_>>(), vec!["x"]);
        assert!(Criteria::new().is_empty());
    }
}
