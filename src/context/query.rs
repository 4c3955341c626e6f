//! Immutable query-string mapping.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Value of one query parameter.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// The name occurred once.
    Single(String),
    /// The name repeated; values are in occurrence order.
    Multiple(Vec<String>),
}

impl QueryValue {
    /// The value if the name occurred exactly once.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            QueryValue::Single(value) => Some(value),
            QueryValue::Multiple(_) => None,
        }
    }

    /// All values in occurrence order.
    pub fn values(&self) -> &[String] {
        match self {
            QueryValue::Single(value) => std::slice::from_ref(value),
            QueryValue::Multiple(values) => values,
        }
    }
}

/// Query parameters of a request.
///
/// Built once from the query string; there are no mutators.
///
/// ```compile_fail
/// use micro_pipeline::context::Query;
///
/// let mut query = Query::parse("a=b");
/// query.insert("a".to_string(), "x".to_string());
/// ```
///
/// ```compile_fail
/// use micro_pipeline::context::{Query, QueryValue};
///
/// let query = Query::parse("a=b&a=c");
/// if let Some(QueryValue::Multiple(values)) = query.get("a") {
///     values.push("x".to_string());
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    entries: Vec<(String, QueryValue)>,
}

impl Query {
    /// Parse an `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    /// Build from decoded name/value pairs. Names keep first-occurrence order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries: Vec<(String, QueryValue)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (name, value) in pairs {
            let name = name.into();
            let value = value.into();
            match index.get(&name) {
                Some(&i) => {
                    let slot = &mut entries[i].1;
                    *slot = match std::mem::replace(slot, QueryValue::Multiple(Vec::new())) {
                        QueryValue::Single(first) => QueryValue::Multiple(vec![first, value]),
                        QueryValue::Multiple(mut values) => {
                            values.push(value);
                            QueryValue::Multiple(values)
                        }
                    };
                }
                None => {
                    index.insert(name.clone(), entries.len());
                    entries.push((name, QueryValue::Single(value)));
                }
            }
        }

        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value() {
        let query = Query::parse("a=b");
        assert_eq!(query.get("a"), Some(&QueryValue::Single("b".into())));
        assert_eq!(query.len(), 1);
    }

    #[test]
    fn test_repeated_values_keep_order() {
        let query = Query::parse("a=b&x=1&a=c&a=d");
        assert_eq!(
            query.get("a"),
            Some(&QueryValue::Multiple(vec!["b".into(), "c".into(), "d".into()]))
        );
        let names: Vec<&str> = query.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "x"]);
    }

    #[test]
    fn test_decoding() {
        let query = Query::parse("q=hello+world&e=%C3%A9&flag");
        assert_eq!(query.get("q").and_then(QueryValue::as_single), Some("hello world"));
        assert_eq!(query.get("e").and_then(QueryValue::as_single), Some("é"));
        assert_eq!(query.get("flag").and_then(QueryValue::as_single), Some(""));
    }

    #[test]
    fn test_serializes_like_a_plain_object() {
        let query = Query::parse("a=b&a=c&z=1");
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            serde_json::json!({"a": ["b", "c"], "z": "1"})
        );
    }

    #[test]
    fn test_values_slice() {
        assert_eq!(QueryValue::Single("x".into()).values(), ["x".to_string()]);
        assert_eq!(QueryValue::Multiple(vec!["x".into(), "y".into()]).values().len(), 2);
    }
}
