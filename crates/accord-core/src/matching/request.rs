use std::collections::BTreeMap;

use crate::matchers::{PathExpr, RuleCategory};
use crate::model::{ActualRequest, MessageShape, RequestShape};
use crate::value::Value;

use super::body::{match_parameters, match_text};
use super::{match_body, match_values, match_with_rule, MatchResult, Mismatch, MismatchKind};

/// Match a decoded request against an expected request shape.
///
/// Headers are matched case-insensitively and extra headers are ignored;
/// unexpected query parameters are reported.
pub fn match_request(expected: &RequestShape, actual: &ActualRequest) -> MatchResult {
    let rules = expected.rules();
    let root = PathExpr::root();
    let mut result = MatchResult::default();

    if !expected.method().eq_ignore_ascii_case(&actual.method) {
        result.push(Mismatch::new(
            root.field("method"),
            MismatchKind::ValueMismatch,
            expected.method().to_ascii_uppercase(),
            actual.method.to_ascii_uppercase(),
        ));
    }

    match_text(
        &root.field("path"),
        rules.rule_for(RuleCategory::Path, &root),
        expected.path(),
        &actual.path,
        &mut result,
    );

    let query_path = root.field("query");
    match_parameters(
        &query_path,
        expected.query(),
        &actual.query,
        rules.category(RuleCategory::Query),
        &mut result,
    );
    for name in actual.query.keys() {
        if !expected.query().contains_key(name) {
            result.push(Mismatch::new(
                query_path.field(name),
                MismatchKind::UnexpectedParameter,
                "<absent>",
                format!("{:?}", actual.query[name]),
            ));
        }
    }

    match_headers(expected.headers(), actual, expected, &mut result);

    let content_type = expected
        .header("content-type")
        .or_else(|| actual.header("content-type"));
    result.extend(
        match_body(
            expected.body(),
            &actual.body,
            content_type,
            rules.category(RuleCategory::Body),
        )
        .rooted_at("body"),
    );

    result
}

fn match_headers(
    headers: &BTreeMap<String, String>,
    actual: &ActualRequest,
    expected: &RequestShape,
    result: &mut MatchResult,
) {
    let base = PathExpr::root().field("headers");
    for (name, value) in headers {
        let path = base.field(name);
        let Some(actual_value) = actual.header(name) else {
            result.push(Mismatch::new(
                path,
                MismatchKind::MissingKey,
                format!("{value:?}"),
                "<absent>",
            ));
            continue;
        };
        match expected.rules().header(name) {
            Some(rule) => match_text(&path, Some(rule), value, actual_value, result),
            None => {
                let (expected_value, actual_value) =
                    if name.eq_ignore_ascii_case("content-type") && !value.contains(';') {
                        (
                            value.trim().to_ascii_lowercase(),
                            actual_value
                                .split(';')
                                .next()
                                .unwrap_or_default()
                                .trim()
                                .to_ascii_lowercase(),
                        )
                    } else {
                        (normalize_header(value), normalize_header(actual_value))
                    };
                match_text(&path, None, &expected_value, &actual_value, result);
            }
        }
    }
}

/// Strip whitespace around commas so `a, b` and `a,b` compare equal.
fn normalize_header(value: &str) -> String {
    value.split(',').map(str::trim).collect::<Vec<_>>().join(",")
}

/// Match a received message against an expected message shape.
pub fn match_message(
    expected: &MessageShape,
    contents: &Value,
    metadata: &BTreeMap<String, serde_json::Value>,
) -> MatchResult {
    let rules = expected.rules();
    let mut result = MatchResult::default();

    if let Some(expected_contents) = expected.contents() {
        result.extend(
            match_values(
                expected_contents,
                contents,
                rules.category(RuleCategory::Body),
            )
            .rooted_at("contents"),
        );
    }

    let base = PathExpr::root().field("metadata");
    for (key, value) in expected.metadata() {
        let path = base.field(key);
        match metadata.get(key) {
            Some(actual) => result.extend(match_with_rule(
                &path,
                rules.metadata(key),
                &Value::from_json(value.clone()),
                &Value::from_json(actual.clone()),
            )),
            None => result.push(Mismatch::new(
                path,
                MismatchKind::MissingKey,
                value.to_string(),
                "<absent>",
            )),
        }
    }

    result
}
