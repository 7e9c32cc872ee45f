//! JSON body builders with type and pattern placeholders.
//!
//! Placeholders become [`Value::Matcher`] nodes. When the body is attached
//! to a request, response or message, a rule is registered for every
//! placeholder at its position in the tree; the elements of a variable-length
//! array are addressed with `[*]`.

use crate::error::RuleError;
use crate::matchers::{MatchingRule, PathExpr};
use crate::value::{Object, Value};

use super::datetime::{example_for, format_to_regex};

const UUID_REGEX: &str = "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";
const UUID_EXAMPLE: &str = "e2490de5-5bd3-43d5-b7c4-526e33f71304";
const HEX_REGEX: &str = "[0-9a-fA-F]+";
const HEX_EXAMPLE: &str = "1234a";
const IP_REGEX: &str = r"(\d{1,3}\.)+\d{1,3}";
const IP_EXAMPLE: &str = "127.0.0.13";

/// A body ready to attach: the value tree plus the first construction error.
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) value: Value,
    pub(crate) error: Option<RuleError>,
}

impl Body {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn is_structured(&self) -> bool {
        matches!(
            self.value.category(),
            crate::value::Category::Object | crate::value::Category::Array
        )
    }

    /// Root-level array of any length whose elements are like `template`.
    ///
    /// Registers a type rule at `$` (with the bounds) and one at `$[*]`
    /// unless the template is itself a placeholder.
    pub fn array_like(template: impl Into<Body>, min: Option<usize>, max: Option<usize>) -> Body {
        let template = template.into();
        let element = if template.value.is_matcher() {
            template.value
        } else {
            type_of(template.value)
        };
        let copies = min.unwrap_or(1).max(1);
        Body {
            value: Value::matcher(
                MatchingRule::Type { min, max },
                Value::Array(vec![element; copies]),
            ),
            error: template.error,
        }
    }

    /// Root-level [`Body::array_like`] of objects built by `build`.
    pub fn each_like(build: impl FnOnce(JsonObject) -> JsonObject) -> Body {
        let (value, error) = array_like(None, None, build(JsonObject::new()));
        Body { value, error }
    }

    /// One rule per placeholder, in tree order.
    pub(crate) fn rules(&self) -> Vec<(PathExpr, MatchingRule)> {
        let mut rules = Vec::new();
        collect_rules(&self.value, &PathExpr::root(), &mut rules);
        rules
    }
}

fn collect_rules(value: &Value, path: &PathExpr, rules: &mut Vec<(PathExpr, MatchingRule)>) {
    match value {
        Value::Matcher(node) => {
            rules.push((path.clone(), node.rule.clone()));
            match (&node.rule, &node.example) {
                (MatchingRule::Type { .. }, Value::Array(items)) => {
                    if let Some(template) = items.first() {
                        collect_rules(template, &path.any_index(), rules);
                    }
                }
                (_, example) => collect_children(example, path, rules),
            }
        }
        other => collect_children(other, path, rules),
    }
}

fn collect_children(value: &Value, path: &PathExpr, rules: &mut Vec<(PathExpr, MatchingRule)>) {
    match value {
        Value::Object(object) => {
            for (key, child) in object.iter() {
                collect_rules(child, &path.field(key), rules);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_rules(child, &path.index(i), rules);
            }
        }
        _ => {}
    }
}

impl From<JsonObject> for Body {
    fn from(builder: JsonObject) -> Self {
        Body {
            value: Value::Object(builder.object),
            error: builder.error,
        }
    }
}

impl From<JsonArray> for Body {
    fn from(builder: JsonArray) -> Self {
        Body {
            value: Value::Array(builder.items),
            error: builder.error,
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body { value, error: None }
    }
}

impl From<serde_json::Value> for Body {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json).into()
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Value::from(text).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Value::from(text).into()
    }
}

fn type_of(example: impl Into<Value>) -> Value {
    Value::matcher(MatchingRule::any_type(), example.into())
}

/// Regex rule whose example satisfies its own pattern.
pub(crate) fn checked_regex(pattern: &str, example: &str) -> Result<MatchingRule, RuleError> {
    let rule = MatchingRule::regex(pattern)?;
    if let MatchingRule::Regex(regex) = &rule {
        if !regex.is_full_match(example) {
            return Err(RuleError::ExampleMismatch {
                example: example.to_string(),
                pattern: pattern.to_string(),
            });
        }
    }
    Ok(rule)
}

fn regex_placeholder(pattern: &str, example: &str) -> Result<Value, RuleError> {
    checked_regex(pattern, example).map(|rule| Value::matcher(rule, Value::from(example)))
}

fn datetime_placeholder(format: &str, example: Option<&str>) -> Result<Value, RuleError> {
    let pattern = format_to_regex(format)?;
    let example = match example {
        Some(example) => example.to_string(),
        None => example_for(format)?,
    };
    regex_placeholder(&pattern, &example)
}

fn array_like(min: Option<usize>, max: Option<usize>, template: JsonObject) -> (Value, Option<RuleError>) {
    let copies = min.unwrap_or(1).max(1);
    let element = Value::Object(template.object);
    let example = Value::Array(vec![element; copies]);
    (
        Value::matcher(MatchingRule::Type { min, max }, example),
        template.error,
    )
}

/// Builder for a JSON object body.
///
/// Methods consume and return the builder; the first invalid placeholder is
/// remembered and reported when the body is attached.
#[derive(Debug, Clone, Default)]
pub struct JsonObject {
    object: Object,
    error: Option<RuleError>,
}

impl JsonObject {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(mut self, name: &str, value: Result<Value, RuleError>) -> Self {
        match value {
            Ok(value) => {
                self.object.insert(name, value);
            }
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    fn put_nested(mut self, name: &str, value: Value, error: Option<RuleError>) -> Self {
        if let Some(e) = error {
            self.error.get_or_insert(e);
        }
        self.object.insert(name, value);
        self
    }

    pub fn string_value(self, name: &str, value: &str) -> Self {
        self.put(name, Ok(Value::from(value)))
    }

    pub fn number_value(self, name: &str, value: f64) -> Self {
        self.put(name, Ok(Value::from(value)))
    }

    pub fn integer_value(self, name: &str, value: i64) -> Self {
        self.put(name, Ok(Value::from(value)))
    }

    pub fn decimal_value(self, name: &str, value: f64) -> Self {
        self.put(name, Ok(Value::from(value)))
    }

    pub fn boolean_value(self, name: &str, value: bool) -> Self {
        self.put(name, Ok(Value::from(value)))
    }

    pub fn null_value(self, name: &str) -> Self {
        self.put(name, Ok(Value::Null))
    }

    pub fn string_type(self, name: &str, example: &str) -> Self {
        self.put(name, Ok(type_of(example)))
    }

    pub fn integer_type(self, name: &str, example: i64) -> Self {
        self.put(name, Ok(type_of(example)))
    }

    pub fn decimal_type(self, name: &str, example: f64) -> Self {
        self.put(name, Ok(type_of(example)))
    }

    pub fn number_type(self, name: &str, example: f64) -> Self {
        self.put(name, Ok(type_of(example)))
    }

    pub fn boolean_type(self, name: &str, example: bool) -> Self {
        self.put(name, Ok(type_of(example)))
    }

    /// Any value with the same shape as `example`.
    pub fn like(self, name: &str, example: impl Into<Body>) -> Self {
        let body = example.into();
        self.put_nested(name, type_of(body.value), body.error)
    }

    pub fn string_matcher(self, name: &str, regex: &str, example: &str) -> Self {
        self.put(name, regex_placeholder(regex, example))
    }

    pub fn date(self, name: &str, format: &str, example: Option<&str>) -> Self {
        self.put(name, datetime_placeholder(format, example))
    }

    pub fn time(self, name: &str, format: &str, example: Option<&str>) -> Self {
        self.put(name, datetime_placeholder(format, example))
    }

    pub fn timestamp(self, name: &str, format: &str, example: Option<&str>) -> Self {
        self.put(name, datetime_placeholder(format, example))
    }

    pub fn uuid(self, name: &str, example: Option<&str>) -> Self {
        self.put(name, regex_placeholder(UUID_REGEX, example.unwrap_or(UUID_EXAMPLE)))
    }

    pub fn hex(self, name: &str, example: Option<&str>) -> Self {
        self.put(name, regex_placeholder(HEX_REGEX, example.unwrap_or(HEX_EXAMPLE)))
    }

    pub fn ip_address(self, name: &str, example: Option<&str>) -> Self {
        self.put(name, regex_placeholder(IP_REGEX, example.unwrap_or(IP_EXAMPLE)))
    }

    pub fn equal_to(self, name: &str, value: impl Into<Value>) -> Self {
        self.put(name, Ok(Value::matcher(MatchingRule::Equality, value.into())))
    }

    pub fn object(self, name: &str, build: impl FnOnce(JsonObject) -> JsonObject) -> Self {
        let nested = build(JsonObject::new());
        self.put_nested(name, Value::Object(nested.object), nested.error)
    }

    pub fn array(self, name: &str, build: impl FnOnce(JsonArray) -> JsonArray) -> Self {
        let nested = build(JsonArray::new());
        self.put_nested(name, Value::Array(nested.items), nested.error)
    }

    /// Array of any length whose elements look like the template.
    pub fn each_like(self, name: &str, build: impl FnOnce(JsonObject) -> JsonObject) -> Self {
        let (value, error) = array_like(None, None, build(JsonObject::new()));
        self.put_nested(name, value, error)
    }

    pub fn min_array_like(
        self,
        name: &str,
        min: usize,
        build: impl FnOnce(JsonObject) -> JsonObject,
    ) -> Self {
        let (value, error) = array_like(Some(min), None, build(JsonObject::new()));
        self.put_nested(name, value, error)
    }

    pub fn max_array_like(
        self,
        name: &str,
        max: usize,
        build: impl FnOnce(JsonObject) -> JsonObject,
    ) -> Self {
        let (value, error) = array_like(None, Some(max), build(JsonObject::new()));
        self.put_nested(name, value, error)
    }
}

/// Builder for a JSON array body; elements are appended in order.
#[derive(Debug, Clone, Default)]
pub struct JsonArray {
    items: Vec<Value>,
    error: Option<RuleError>,
}

impl JsonArray {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, value: Result<Value, RuleError>) -> Self {
        match value {
            Ok(value) => self.items.push(value),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    fn push_nested(mut self, value: Value, error: Option<RuleError>) -> Self {
        if let Some(e) = error {
            self.error.get_or_insert(e);
        }
        self.items.push(value);
        self
    }

    pub fn string_value(self, value: &str) -> Self {
        self.push(Ok(Value::from(value)))
    }

    pub fn number_value(self, value: f64) -> Self {
        self.push(Ok(Value::from(value)))
    }

    pub fn integer_value(self, value: i64) -> Self {
        self.push(Ok(Value::from(value)))
    }

    pub fn decimal_value(self, value: f64) -> Self {
        self.push(Ok(Value::from(value)))
    }

    pub fn boolean_value(self, value: bool) -> Self {
        self.push(Ok(Value::from(value)))
    }

    pub fn null_value(self) -> Self {
        self.push(Ok(Value::Null))
    }

    pub fn string_type(self, example: &str) -> Self {
        self.push(Ok(type_of(example)))
    }

    pub fn integer_type(self, example: i64) -> Self {
        self.push(Ok(type_of(example)))
    }

    pub fn decimal_type(self, example: f64) -> Self {
        self.push(Ok(type_of(example)))
    }

    pub fn number_type(self, example: f64) -> Self {
        self.push(Ok(type_of(example)))
    }

    pub fn boolean_type(self, example: bool) -> Self {
        self.push(Ok(type_of(example)))
    }

    pub fn like(self, example: impl Into<Body>) -> Self {
        let body = example.into();
        self.push_nested(type_of(body.value), body.error)
    }

    pub fn string_matcher(self, regex: &str, example: &str) -> Self {
        self.push(regex_placeholder(regex, example))
    }

    pub fn date(self, format: &str, example: Option<&str>) -> Self {
        self.push(datetime_placeholder(format, example))
    }

    pub fn time(self, format: &str, example: Option<&str>) -> Self {
        self.push(datetime_placeholder(format, example))
    }

    pub fn timestamp(self, format: &str, example: Option<&str>) -> Self {
        self.push(datetime_placeholder(format, example))
    }

    pub fn uuid(self, example: Option<&str>) -> Self {
        self.push(regex_placeholder(UUID_REGEX, example.unwrap_or(UUID_EXAMPLE)))
    }

    pub fn hex(self, example: Option<&str>) -> Self {
        self.push(regex_placeholder(HEX_REGEX, example.unwrap_or(HEX_EXAMPLE)))
    }

    pub fn ip_address(self, example: Option<&str>) -> Self {
        self.push(regex_placeholder(IP_REGEX, example.unwrap_or(IP_EXAMPLE)))
    }

    pub fn equal_to(self, value: impl Into<Value>) -> Self {
        self.push(Ok(Value::matcher(MatchingRule::Equality, value.into())))
    }

    pub fn object(self, build: impl FnOnce(JsonObject) -> JsonObject) -> Self {
        let nested = build(JsonObject::new());
        self.push_nested(Value::Object(nested.object), nested.error)
    }

    pub fn array(self, build: impl FnOnce(JsonArray) -> JsonArray) -> Self {
        let nested = build(JsonArray::new());
        self.push_nested(Value::Array(nested.items), nested.error)
    }

    pub fn each_like(self, build: impl FnOnce(JsonObject) -> JsonObject) -> Self {
        let (value, error) = array_like(None, None, build(JsonObject::new()));
        self.push_nested(value, error)
    }

    pub fn min_array_like(self, min: usize, build: impl FnOnce(JsonObject) -> JsonObject) -> Self {
        let (value, error) = array_like(Some(min), None, build(JsonObject::new()));
        self.push_nested(value, error)
    }

    pub fn max_array_like(self, max: usize, build: impl FnOnce(JsonObject) -> JsonObject) -> Self {
        let (value, error) = array_like(None, Some(max), build(JsonObject::new()));
        self.push_nested(value, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule_paths(body: impl Into<Body>) -> Vec<(String, &'static str)> {
        body.into()
            .rules()
            .into_iter()
            .map(|(path, rule)| (path.to_string(), rule.kind()))
            .collect()
    }

    #[test]
    fn test_literals_have_no_rules() {
        let body = JsonObject::new()
            .string_value("name", "accord")
            .integer_value("count", 3)
            .boolean_value("ok", true)
            .null_value("none");
        assert!(rule_paths(body.clone()).is_empty());
        assert_eq!(
            Body::from(body).value.to_json(),
            json!({"name": "accord", "count": 3, "ok": true, "none": null})
        );
    }

    #[test]
    fn test_placeholder_rules_follow_tree_position() {
        let body = JsonObject::new()
            .string_type("name", "Jane")
            .object("address", |a| a.string_matcher("zip", r"\d{5}", "12345"))
            .array("scores", |a| a.integer_value(1).integer_type(2));
        assert_eq!(
            rule_paths(body),
            vec![
                ("$.name".to_string(), "type"),
                ("$.address.zip".to_string(), "regex"),
                ("$.scores[1]".to_string(), "type"),
            ]
        );
    }

    #[test]
    fn test_each_like_registers_wildcard_rules() {
        let body = JsonObject::new().min_array_like("items", 2, |o| {
            o.decimal_type("price", 9.99).string_value("currency", "EUR")
        });
        assert_eq!(
            rule_paths(body.clone()),
            vec![
                ("$.items".to_string(), "type"),
                ("$.items[*].price".to_string(), "type"),
            ]
        );
        assert_eq!(
            Body::from(body).value.to_json(),
            json!({"items": [
                {"price": 9.99, "currency": "EUR"},
                {"price": 9.99, "currency": "EUR"}
            ]})
        );
    }

    #[test]
    fn test_root_array_with_type_placeholders() {
        let body = JsonArray::new()
            .decimal_type(100.10)
            .string_type("Should be in an array");
        assert_eq!(
            rule_paths(body.clone()),
            vec![("$[0]".to_string(), "type"), ("$[1]".to_string(), "type")]
        );
        assert_eq!(
            Body::from(body).value.to_string(),
            r#"[100.1,"Should be in an array"]"#
        );
    }

    #[test]
    fn test_root_array_like() {
        let body = Body::array_like(Value::from(100.1), Some(2), None);
        assert_eq!(
            rule_paths(body.clone()),
            vec![("$".to_string(), "type"), ("$[*]".to_string(), "type")]
        );
        assert_eq!(body.value.to_string(), "[100.1,100.1]");

        let regex = Body::array_like(Value::from(json!("ab")), None, Some(3));
        assert_eq!(
            rule_paths(regex),
            vec![("$".to_string(), "type"), ("$[*]".to_string(), "type")]
        );

        let objects = Body::each_like(|o| o.integer_type("id", 7));
        assert_eq!(
            rule_paths(objects),
            vec![("$".to_string(), "type"), ("$[*].id".to_string(), "type")]
        );
    }

    #[test]
    fn test_root_array_like_keeps_placeholder_template() {
        let template = Value::matcher(MatchingRule::regex("[a-z]+").unwrap(), Value::from("abc"));
        let body = Body::array_like(template, None, None);
        assert_eq!(
            rule_paths(body),
            vec![("$".to_string(), "type"), ("$[*]".to_string(), "regex")]
        );
    }

    #[test]
    fn test_example_must_match_pattern() {
        let body = Body::from(JsonObject::new().string_matcher("zip", r"\d{5}", "abc"));
        assert_eq!(
            body.error,
            Some(RuleError::ExampleMismatch {
                example: "abc".to_string(),
                pattern: r"\d{5}".to_string()
            })
        );

        let nested = Body::from(
            JsonObject::new().each_like("items", |o| o.date("day", "%Q", None)),
        );
        assert_eq!(nested.error, Some(RuleError::InvalidFormat("%Q".to_string())));
    }

    #[test]
    fn test_generated_defaults() {
        let body = Body::from(
            JsonObject::new()
                .uuid("id", None)
                .ip_address("ip", None)
                .hex("hash", None)
                .date("day", "%Y-%m-%d", None),
        );
        assert!(body.error.is_none());
        let json = body.value.to_json();
        assert_eq!(json["id"], UUID_EXAMPLE);
        assert_eq!(json["ip"], IP_EXAMPLE);
        assert_eq!(json["day"].as_str().map(str::len), Some(10));
    }

    #[test]
    fn test_equal_to_and_like() {
        let body = JsonObject::new()
            .equal_to("status", "ACTIVE")
            .like("owner", json!({"name": "Jane"}));
        assert_eq!(
            rule_paths(body),
            vec![
                ("$.status".to_string(), "equality"),
                ("$.owner".to_string(), "type"),
            ]
        );
    }
}
