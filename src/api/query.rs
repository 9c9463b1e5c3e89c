//! Query filtering over a JSON collection.
//!
//! Recognized parameters:
//! - `q` - case-insensitive substring match against top-level string fields
//! - `limit` - maximum number of results
//! - anything else - case-insensitive equality on that field

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::models::QueryMatch;

/// Parsed filter parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub text: Option<String>,
    pub fields: Vec<(String, String)>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn from_query(query: &BTreeMap<String, String>) -> Result<Self> {
        let mut filter = Filter::default();

        for (name, value) in query {
            match name.as_str() {
                "q" => filter.text = Some(value.to_lowercase()),
                "limit" => {
                    let limit = value.trim().parse::<usize>().map_err(|_| {
                        ApiError::BadRequest(format!(
                            "limit must be a non-negative integer, got {value:?}"
                        ))
                    })?;
                    filter.limit = Some(limit);
                }
                _ => filter.fields.push((name.clone(), value.to_lowercase())),
            }
        }

        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.fields.is_empty() && self.limit.is_none()
    }

    /// Returns true if `member` passes every condition.
    pub fn matches(&self, member: &Value) -> bool {
        if let Some(text) = &self.text {
            let found = match member {
                Value::String(s) => s.to_lowercase().contains(text.as_str()),
                Value::Object(map) => map.values().any(|field| match field {
                    Value::String(s) => s.to_lowercase().contains(text.as_str()),
                    _ => false,
                }),
                _ => false,
            };
            if !found {
                return false;
            }
        }

        self.fields.iter().all(|(name, expected)| {
            member
                .get(name)
                .is_some_and(|field| field_equals(field, expected))
        })
    }

    /// Filters the members of an object or array.
    ///
    /// Returns `None` when `collection` is a scalar.
    pub fn apply(&self, collection: &Value) -> Option<Vec<QueryMatch>> {
        let members: Box<dyn Iterator<Item = (String, &Value)>> = match collection {
            Value::Object(map) => Box::new(map.iter().map(|(k, v)| (k.clone(), v))),
            Value::Array(items) => Box::new(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v)),
            ),
            _ => return None,
        };

        Some(
            members
                .filter(|(_, value)| self.matches(value))
                .take(self.limit.unwrap_or(usize::MAX))
                .map(|(id, value)| QueryMatch {
                    id,
                    value: value.clone(),
                })
                .collect(),
        )
    }
}

/// `expected` is already lowercased.
fn field_equals(field: &Value, expected: &str) -> bool {
    match field {
        Value::String(s) => s.to_lowercase() == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        Value::Null => expected == "null",
        Value::Array(items) => items.iter().any(|item| field_equals(item, expected)),
        Value::Object(_) => false,
    }
}

/// Builds an RFC 6901 pointer from decoded path segments.
pub fn json_pointer(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_filter() {
        let filter = Filter::from_query(&query(&[("q", "Taco"), ("limit", "2"), ("hall", "Epicuria")]))
            .unwrap();

        assert_eq!(filter.text.as_deref(), Some("taco"));
        assert_eq!(filter.limit, Some(2));
        assert_eq!(filter.fields, vec![("hall".to_string(), "epicuria".to_string())]);
        assert!(Filter::from_query(&query(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_limit() {
        let result = Filter::from_query(&query(&[("limit", "ten")]));
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_text_and_field_matching() {
        let filter = Filter::from_query(&query(&[("q", "taco"), ("meal", "lunch")])).unwrap();

        assert!(filter.matches(&json!({"name": "Fish Tacos", "meal": "Lunch"})));
        assert!(!filter.matches(&json!({"name": "Fish Tacos", "meal": "dinner"})));
        assert!(!filter.matches(&json!({"name": "Pasta", "meal": "lunch"})));
        assert!(!filter.matches(&json!(42)));
    }

    #[test]
    fn test_array_and_scalar_fields() {
        let filter = Filter::from_query(&query(&[("tags", "vegan"), ("open", "true")])).unwrap();
        assert!(filter.matches(&json!({"tags": ["Halal", "Vegan"], "open": true})));
        assert!(!filter.matches(&json!({"tags": ["halal"], "open": true})));
    }

    #[test]
    fn test_apply_over_object_and_array() {
        let filter = Filter::from_query(&query(&[("q", "a")])).unwrap();

        let results = filter.apply(&json!({"x": "apple", "y": "plum", "z": "pear"})).unwrap();
        let ids: Vec<_> = results.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "z"]);

        let results = filter.apply(&json!(["kiwi", "banana"])).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "1");

        assert!(filter.apply(&json!("scalar")).is_none());
    }

    #[test]
    fn test_limit_truncates() {
        let filter = Filter::from_query(&query(&[("limit", "2")])).unwrap();
        let results = filter.apply(&json!([1, 2, 3, 4])).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_json_pointer_escaping() {
        let segments = vec!["a/b".to_string(), "c~d".to_string(), "0".to_string()];
        assert_eq!(json_pointer(&segments), "/a~1b/c~0d/0");
        assert_eq!(json_pointer(&[]), "");
    }
}
