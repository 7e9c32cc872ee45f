//! XML bodies, compared structurally.
//!
//! Both documents are lifted into the value tree before matching. An element
//! becomes an object holding its attributes under `@name`, its direct text
//! under `#text` and its child elements grouped by tag into arrays, so
//!
//! ```text
//! <order id="7"><line>a</line><line>b</line></order>
//! ```
//!
//! is `{"order": {"@id": "7", "line": [{"#text": "a"}, {"#text": "b"}]}}` and
//! body rules address it as `$.order.line[*].#text`.

use sxd_document::dom::{ChildOfElement, ChildOfRoot, Element};
use sxd_document::parser;

use crate::matchers::{PathExpr, RuleSet};
use crate::value::{Object, Value};

use super::{match_values, MatchResult, Mismatch, MismatchKind};

const XMLNS: &str = "http://www.w3.org/2000/xmlns/";

pub fn is_xml_content_type(content_type: &str) -> bool {
    let mime = super::body::mime_type(content_type);
    mime == "application/xml" || mime == "text/xml" || mime.ends_with("+xml")
}

/// Match an actual XML document against an expected one.
pub fn match_xml(expected: &str, actual: &str, rules: &RuleSet) -> MatchResult {
    let root = PathExpr::root();
    let mut result = MatchResult::default();
    let Some(expected) = xml_to_value(expected) else {
        result.push(Mismatch::new(
            root,
            MismatchKind::TypeMismatch,
            "XML document",
            "unparseable expected body",
        ));
        return result;
    };
    let Some(actual_value) = xml_to_value(actual) else {
        result.push(Mismatch::new(
            root,
            MismatchKind::TypeMismatch,
            "XML document",
            format!("{actual:?}"),
        ));
        return result;
    };

    let (expected_name, actual_name) = (root_name(&expected), root_name(&actual_value));
    if expected_name != actual_name {
        result.push(Mismatch::new(
            root,
            MismatchKind::ValueMismatch,
            format!("<{expected_name}>"),
            format!("<{actual_name}>"),
        ));
        return result;
    }
    match_values(&expected, &actual_value, rules)
}

fn root_name(document: &Value) -> &str {
    match document {
        Value::Object(object) => object.keys().next().map_or("", String::as_str),
        _ => "",
    }
}

/// Parse a document into `{"<root>": <element>}`; `None` when it is not well-formed.
pub(crate) fn xml_to_value(text: &str) -> Option<Value> {
    let package = parser::parse(text).ok()?;
    let document = package.as_document();
    let root = document.root().children().into_iter().find_map(|child| match child {
        ChildOfRoot::Element(element) => Some(element),
        _ => None,
    })?;
    let mut object = Object::new();
    object.insert(root.name().local_part(), element_to_value(root));
    Some(Value::Object(object))
}

fn element_to_value(element: Element<'_>) -> Value {
    let mut object = Object::new();
    for attribute in element.attributes() {
        if attribute.name().namespace_uri() == Some(XMLNS) {
            continue;
        }
        object.insert(
            format!("@{}", attribute.name().local_part()),
            Value::String(attribute.value().to_string()),
        );
    }

    let mut text = String::new();
    let mut children: Vec<(String, Vec<Value>)> = Vec::new();
    for child in element.children() {
        match child {
            ChildOfElement::Element(child) => {
                let tag = child.name().local_part().to_string();
                let value = element_to_value(child);
                match children.iter_mut().find(|(name, _)| *name == tag) {
                    Some((_, group)) => group.push(value),
                    None => children.push((tag, vec![value])),
                }
            }
            ChildOfElement::Text(node) => text.push_str(node.text()),
            _ => {}
        }
    }

    let text = text.trim();
    if !text.is_empty() {
        object.insert("#text", Value::String(text.to_string()));
    }
    for (tag, group) in children {
        object.insert(tag, Value::Array(group));
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::matchers::MatchingRule;

    const ORDER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <order id="7" xmlns="urn:orders">
          <customer>Jane</customer>
          <line sku="A-1">2</line>
          <line sku="B-2">1</line>
        </order>"#;

    fn rules(entries: &[(&str, MatchingRule)]) -> RuleSet {
        let mut rules = RuleSet::new();
        for (pattern, rule) in entries {
            rules.add(PathExpr::parse(pattern).unwrap(), rule.clone());
        }
        rules
    }

    fn paths(result: &MatchResult) -> Vec<String> {
        result.iter().map(|m| m.path.to_string()).collect()
    }

    #[test]
    fn test_xml_content_type_detection() {
        assert!(is_xml_content_type("application/xml; charset=UTF-8"));
        assert!(is_xml_content_type("text/xml"));
        assert!(is_xml_content_type("application/atom+xml"));
        assert!(!is_xml_content_type("application/json"));
    }

    #[test]
    fn test_document_shape() {
        let value = xml_to_value(ORDER).unwrap();
        assert_eq!(
            value.to_json(),
            json!({"order": {
                "@id": "7",
                "customer": [{"#text": "Jane"}],
                "line": [
                    {"@sku": "A-1", "#text": "2"},
                    {"@sku": "B-2", "#text": "1"}
                ]
            }})
        );
    }

    #[test]
    fn test_identical_documents_match_regardless_of_formatting() {
        let compact = r#"<order xmlns="urn:orders" id="7"><customer>Jane</customer><line sku="A-1">2</line><line sku="B-2">1</line></order>"#;
        assert!(match_xml(ORDER, compact, &RuleSet::new()).is_match());
    }

    #[test]
    fn test_attribute_mismatch() {
        let actual = ORDER.replace(r#"sku="B-2""#, r#"sku="C-3""#);
        let result = match_xml(ORDER, &actual, &RuleSet::new());
        assert_eq!(paths(&result), vec!["$.order.line[1].@sku"]);
        assert_eq!(result.mismatches[0].kind, MismatchKind::ValueMismatch);

        let missing = ORDER.replace(r#" id="7""#, "");
        let result = match_xml(ORDER, &missing, &RuleSet::new());
        assert_eq!(paths(&result), vec!["$.order.@id"]);
        assert_eq!(result.mismatches[0].kind, MismatchKind::MissingKey);

        let pattern = rules(&[("$.order.line[*].@sku", MatchingRule::regex("[A-Z]-[0-9]").unwrap())]);
        assert!(match_xml(ORDER, &actual, &pattern).is_match());
    }

    #[test]
    fn test_text_mismatch() {
        let actual = ORDER.replace("<customer>Jane</customer>", "<customer>John</customer>");
        let result = match_xml(ORDER, &actual, &RuleSet::new());
        assert_eq!(paths(&result), vec!["$.order.customer[0].#text"]);

        let any_name = rules(&[("$.order.customer[0].#text", MatchingRule::regex("[A-Z][a-z]+").unwrap())]);
        assert!(match_xml(ORDER, &actual, &any_name).is_match());
        let lowercase = ORDER.replace("<customer>Jane</customer>", "<customer>john</customer>");
        let result = match_xml(ORDER, &lowercase, &any_name);
        assert_eq!(result.mismatches[0].kind, MismatchKind::RegexMismatch);
        assert_eq!(paths(&result), vec!["$.order.customer[0].#text"]);
    }

    #[test]
    fn test_repeated_children() {
        let three = ORDER.replace(
            r#"<line sku="B-2">1</line>"#,
            r#"<line sku="B-2">1</line><line sku="C-3">5</line>"#,
        );
        let result = match_xml(ORDER, &three, &RuleSet::new());
        assert_eq!(paths(&result), vec!["$.order.line"]);
        assert_eq!(result.mismatches[0].kind, MismatchKind::LengthMismatch);

        let each_line = rules(&[("$.order.line", MatchingRule::min_type(1))]);
        assert!(match_xml(ORDER, &three, &each_line).is_match());

        let bad_line = ORDER.replace(r#"<line sku="B-2">1</line>"#, "<line>1</line>");
        let result = match_xml(ORDER, &bad_line, &each_line);
        assert_eq!(paths(&result), vec!["$.order.line[1].@sku"]);
    }

    #[test]
    fn test_root_element_and_malformed_documents() {
        let result = match_xml(ORDER, "<invoice id=\"7\"/>", &RuleSet::new());
        assert_eq!(paths(&result), vec!["$"]);
        assert_eq!(result.mismatches[0].expected, "<order>");
        assert_eq!(result.mismatches[0].actual, "<invoice>");

        let result = match_xml(ORDER, "<order><unclosed></order>", &RuleSet::new());
        assert_eq!(result.mismatches[0].kind, MismatchKind::TypeMismatch);
    }
}
