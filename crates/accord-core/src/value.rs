//! Structural value model for expected and actual payloads.
//!
//! A [`Value`] is either plain JSON-like data or a [`MatcherNode`]: a
//! placeholder meaning "any value satisfying this rule", carrying an example
//! that is used whenever a concrete payload has to be produced.

use std::fmt;

use serde_json::Number;

use crate::error::DecodeError;
use crate::matchers::MatchingRule;

/// Recursive structural value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Object),
    Matcher(Box<MatcherNode>),
}

/// Placeholder node: the rule to apply plus the example it reifies to.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherNode {
    pub rule: MatchingRule,
    pub example: Value,
}

/// Primitive category of a value, as compared by type matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Null => "null",
            Category::Bool => "boolean",
            Category::Number => "number",
            Category::String => "string",
            Category::Array => "array",
            Category::Object => "object",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered object with unique keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, replacing the value in place if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

impl Value {
    pub fn matcher(rule: MatchingRule, example: Value) -> Self {
        Value::Matcher(Box::new(MatcherNode { rule, example }))
    }

    /// Category of the value; matcher nodes report their example's category.
    pub fn category(&self) -> Category {
        match self {
            Value::Null => Category::Null,
            Value::Bool(_) => Category::Bool,
            Value::Number(_) => Category::Number,
            Value::String(_) => Category::String,
            Value::Array(_) => Category::Array,
            Value::Object(_) => Category::Object,
            Value::Matcher(node) => node.example.category(),
        }
    }

    pub fn is_matcher(&self) -> bool {
        matches!(self, Value::Matcher(_))
    }

    /// True if this value or any descendant is a matcher node.
    pub fn contains_matchers(&self) -> bool {
        match self {
            Value::Matcher(_) => true,
            Value::Array(items) => items.iter().any(Value::contains_matchers),
            Value::Object(object) => object.iter().any(|(_, v)| v.contains_matchers()),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text form used for header, query and form values.
    pub fn as_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Matcher(node) => node.example.as_text(),
            other => other.to_string(),
        }
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Concrete JSON for this tree, with every matcher node reified to its example.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(object) => serde_json::Value::Object(
                object
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Matcher(node) => node.example.to_json(),
        }
    }

    /// Decode wire bytes as JSON.
    pub fn decode_json(bytes: &[u8]) -> Result<Value, DecodeError> {
        let text = std::str::from_utf8(bytes)?;
        let json: serde_json::Value = serde_json::from_str(text)?;
        Ok(Value::from_json(json))
    }
}

/// Compare two numbers by value rather than by encoding.
pub fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Deep equality with numbers compared by value; matcher nodes compare by example.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Matcher(node), other) | (other, Value::Matcher(node)) => {
            values_equal(&node.example, other)
        }
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_preserves_insertion_order() {
        let mut object = Object::new();
        object.insert("zebra", Value::from(1));
        object.insert("apple", Value::from(2));
        object.insert("mango", Value::from(3));
        let keys: Vec<_> = object.keys().cloned().collect();
        assert_eq!(keys, vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn test_object_insert_replaces_existing_key() {
        let mut object = Object::new();
        object.insert("a", Value::from(1));
        object.insert("b", Value::from(2));
        let previous = object.insert("a", Value::from(3));
        assert_eq!(previous, Some(Value::from(1)));
        assert_eq!(object.len(), 2);
        assert_eq!(object.get("a"), Some(&Value::from(3)));
        assert_eq!(object.keys().next().map(String::as_str), Some("a"));
    }

    #[test]
    fn test_numbers_equal_by_value() {
        let a: Number = serde_json::from_str("100.1").unwrap();
        let b: Number = serde_json::from_str("100.10").unwrap();
        assert!(numbers_equal(&a, &b));

        let int: Number = serde_json::from_str("1").unwrap();
        let float: Number = serde_json::from_str("1.0").unwrap();
        assert!(numbers_equal(&int, &float));

        let other: Number = serde_json::from_str("2").unwrap();
        assert!(!numbers_equal(&int, &other));
    }

    #[test]
    fn test_json_conversion_round_trip() {
        let json = json!({"name": "accord", "tags": ["a", "b"], "count": 3, "ok": true, "none": null});
        let value = Value::from_json(json.clone());
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_matcher_reifies_to_example() {
        let value = Value::Array(vec![Value::matcher(
            MatchingRule::any_type(),
            Value::from(100.10),
        )]);
        assert_eq!(value.to_json(), json!([100.1]));
        assert_eq!(value.to_string(), "[100.1]");
        assert!(value.contains_matchers());
    }

    #[test]
    fn test_category_of_matcher_is_example_category() {
        let value = Value::matcher(MatchingRule::any_type(), Value::from("text"));
        assert_eq!(value.category(), Category::String);
    }

    #[test]
    fn test_decode_json_rejects_malformed_bytes() {
        assert!(matches!(
            Value::decode_json(b"{not json"),
            Err(DecodeError::InvalidJson(_))
        ));
        assert!(matches!(
            Value::decode_json(&[0xff, 0xfe]),
            Err(DecodeError::InvalidUtf8(_))
        ));
        assert_eq!(
            Value::decode_json(br#"{"a": 1}"#).unwrap().to_json(),
            json!({"a": 1})
        );
    }

    #[test]
    fn test_values_equal_ignores_number_encoding() {
        let a = Value::from_json(json!({"price": 100.1, "qty": 1}));
        let b = Value::from_json(serde_json::from_str(r#"{"qty": 1.0, "price": 100.10}"#).unwrap());
        assert!(values_equal(&a, &b));
        assert!(!values_equal(&a, &Value::from_json(json!({"price": 100.1}))));
    }
}
