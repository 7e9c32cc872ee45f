//! Body matching by content type: JSON, XML, plain text and url-encoded forms.

use std::collections::BTreeMap;

use crate::matchers::{MatchingRule, PathExpr, RuleSet};
use crate::model::{parse_query, ActualBody};
use crate::value::Value;

use super::xml::{is_xml_content_type, match_xml};
use super::{match_values, MatchResult, Mismatch, MismatchKind};

pub(super) fn mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_json_content_type(content_type: &str) -> bool {
    let mime = mime_type(content_type);
    mime == "application/json" || mime.ends_with("+json")
}

pub fn is_form_content_type(content_type: &str) -> bool {
    mime_type(content_type) == "application/x-www-form-urlencoded"
}

/// Match an actual body against an optional expected body.
///
/// No expected body means the body is not checked at all.
pub fn match_body(
    expected: Option<&Value>,
    actual: &ActualBody,
    content_type: Option<&str>,
    rules: &RuleSet,
) -> MatchResult {
    let Some(expected) = expected else {
        return MatchResult::default();
    };
    let root = PathExpr::root();

    match actual {
        ActualBody::Empty => {
            let mut result = MatchResult::default();
            result.push(Mismatch::new(
                root,
                MismatchKind::MissingBody,
                expected.to_string(),
                "<empty>",
            ));
            result
        }
        ActualBody::Json(actual) => {
            if is_text_shape(expected) && !actual.is_matcher() {
                if let Some(text) = non_string_text(actual) {
                    return match_text_body(expected, &text, rules);
                }
            }
            match_values(expected, actual, rules)
        }
        ActualBody::Text(text) => {
            if content_type.is_some_and(is_form_content_type) {
                return match_form(expected, text, rules);
            }
            if content_type.is_some_and(is_xml_content_type) && is_text_shape(expected) {
                return match_xml(&expected.as_text(), text, rules);
            }
            if is_text_shape(expected) {
                return match_text_body(expected, text, rules);
            }
            match serde_json::from_str::<serde_json::Value>(text) {
                Ok(json) => match_values(expected, &Value::from_json(json), rules),
                Err(_) => {
                    let mut result = MatchResult::default();
                    result.push(Mismatch::new(
                        root,
                        MismatchKind::TypeMismatch,
                        expected.category().as_str(),
                        "text",
                    ));
                    result
                }
            }
        }
    }
}

fn is_text_shape(expected: &Value) -> bool {
    match expected {
        Value::String(_) => true,
        Value::Matcher(node) => is_text_shape(&node.example),
        _ => false,
    }
}

/// Bodies decoded as JSON scalars still compare as text against a text shape.
fn non_string_text(actual: &Value) -> Option<String> {
    match actual {
        Value::Object(_) | Value::Array(_) => None,
        other => Some(other.as_text()),
    }
}

fn match_text_body(expected: &Value, actual: &str, rules: &RuleSet) -> MatchResult {
    let root = PathExpr::root();
    let (rule, example) = match expected {
        Value::Matcher(node) => (Some(&node.rule), node.example.as_text()),
        other => (rules.rule_for(&root), other.as_text()),
    };
    let mut result = MatchResult::default();
    match_text(&root, rule, &example, actual, &mut result);
    result
}

/// Url-encoded form: every expected parameter value must be present; extra parameters are ignored.
fn match_form(expected: &Value, actual: &str, rules: &RuleSet) -> MatchResult {
    let expected = parse_query(&expected.as_text());
    let actual = parse_query(actual);
    let mut result = MatchResult::default();
    match_parameters(&PathExpr::root(), &expected, &actual, rules, &mut result);
    result
}

/// Positional comparison of multi-valued parameters keyed by name.
pub(crate) fn match_parameters(
    base: &PathExpr,
    expected: &BTreeMap<String, Vec<String>>,
    actual: &BTreeMap<String, Vec<String>>,
    rules: &RuleSet,
    result: &mut MatchResult,
) {
    for (name, values) in expected {
        let path = base.field(name);
        let Some(actual_values) = actual.get(name) else {
            result.push(Mismatch::new(
                path,
                MismatchKind::MissingKey,
                format!("{values:?}"),
                "<absent>",
            ));
            continue;
        };
        if values.len() != actual_values.len() {
            result.push(Mismatch::new(
                path.clone(),
                MismatchKind::LengthMismatch,
                format!("{} values", values.len()),
                format!("{} values", actual_values.len()),
            ));
        }
        let key = PathExpr::root().field(name);
        for (i, (expected, actual)) in values.iter().zip(actual_values).enumerate() {
            let rule = rules
                .rule_for(&key.index(i))
                .or_else(|| rules.rule_for(&key));
            match_text(&path.index(i), rule, expected, actual, result);
        }
    }
}

/// Compare two strings under an optional rule.
pub(crate) fn match_text(
    path: &PathExpr,
    rule: Option<&MatchingRule>,
    expected: &str,
    actual: &str,
    result: &mut MatchResult,
) {
    match rule {
        Some(MatchingRule::Type { .. }) => {}
        Some(MatchingRule::Regex(regex)) => {
            if !regex.is_full_match(actual) {
                result.push(Mismatch::new(
                    path.clone(),
                    MismatchKind::RegexMismatch,
                    format!("/{}/", regex.as_str()),
                    format!("{actual:?}"),
                ));
            }
        }
        Some(MatchingRule::Equality) | None => {
            if expected != actual {
                result.push(Mismatch::new(
                    path.clone(),
                    MismatchKind::ValueMismatch,
                    format!("{expected:?}"),
                    format!("{actual:?}"),
                ));
            }
        }
    }
}
