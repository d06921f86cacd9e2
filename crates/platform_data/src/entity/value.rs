use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of an entity attribute. Multi-valued attributes keep their order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AttributeValue {
    /// Every stored value, one per metadata row.
    pub fn values(&self) -> &[String] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multiple(values) => values,
        }
    }

    pub fn first(&self) -> Option<&str> {
        self.values().first().map(String::as_str)
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }

    /// Appends a value, turning a single value into a list.
    pub fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Multiple(vec![first, value]);
            }
            Self::Multiple(values) => values.push(value),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multiple(values)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(value) => f.write_str(value),
            Self::Multiple(values) => f.write_str(&values.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_coalesces_into_a_list() {
        let mut value = AttributeValue::from("a");
        value.push("b".to_string());
        value.push("c".to_string());
        assert_eq!(value, AttributeValue::from(vec!["a", "b", "c"]));
        assert_eq!(value.first(), Some("a"));
    }

    #[test]
    fn serializes_untagged() {
        let single = serde_json::to_value(AttributeValue::from("x")).unwrap();
        assert_eq!(single, serde_json::json!("x"));
        let many: AttributeValue = serde_json::from_value(serde_json::json!(["a", "b"])).unwrap();
        assert_eq!(many.values(), ["a", "b"]);
    }
}
