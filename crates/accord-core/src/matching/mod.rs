//! Structural matching of actual values against expected shapes.
//!
//! Matching never fails: every disagreement is collected as a [`Mismatch`]
//! so a single run reports all of them. Objects are lenient (extra actual
//! keys are ignored) while arrays without an element wildcard must have the
//! exact expected length.

mod body;
mod request;
mod xml;

use std::fmt;

use serde::Serialize;

use crate::matchers::{MatchingRule, PathExpr, RuleSet};
use crate::value::{values_equal, Object, Value};

pub use body::{is_form_content_type, is_json_content_type, match_body};
pub use request::{match_message, match_request};
pub use xml::{is_xml_content_type, match_xml};

/// Why a location did not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MismatchKind {
    #[serde(rename = "missing key")]
    MissingKey,
    #[serde(rename = "length mismatch")]
    LengthMismatch,
    #[serde(rename = "value mismatch")]
    ValueMismatch,
    #[serde(rename = "type mismatch")]
    TypeMismatch,
    #[serde(rename = "regex mismatch")]
    RegexMismatch,
    #[serde(rename = "missing body")]
    MissingBody,
    #[serde(rename = "unexpected body")]
    UnexpectedBody,
    #[serde(rename = "unexpected parameter")]
    UnexpectedParameter,
}

impl MismatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MismatchKind::MissingKey => "missing key",
            MismatchKind::LengthMismatch => "length mismatch",
            MismatchKind::ValueMismatch => "value mismatch",
            MismatchKind::TypeMismatch => "type mismatch",
            MismatchKind::RegexMismatch => "regex mismatch",
            MismatchKind::MissingBody => "missing body",
            MismatchKind::UnexpectedBody => "unexpected body",
            MismatchKind::UnexpectedParameter => "unexpected parameter",
        }
    }
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One disagreement between expected and actual at a concrete path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub path: PathExpr,
    pub expected: String,
    pub actual: String,
    #[serde(rename = "reason")]
    pub kind: MismatchKind,
}

impl Mismatch {
    pub fn new(
        path: PathExpr,
        kind: MismatchKind,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            path,
            expected: expected.into(),
            actual: actual.into(),
            kind,
        }
    }

    /// Same mismatch with its path moved under `$.<field>`.
    pub fn rooted_at(mut self, field: &str) -> Self {
        self.path = self.path.rooted_at(field);
        self
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (expected {}, got {})",
            self.path, self.kind, self.expected, self.actual
        )
    }
}

/// Ordered mismatches; empty means the values matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    pub mismatches: Vec<Mismatch>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mismatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn push(&mut self, mismatch: Mismatch) {
        self.mismatches.push(mismatch);
    }

    pub fn extend(&mut self, other: MatchResult) {
        self.mismatches.extend(other.mismatches);
    }

    pub fn rooted_at(self, field: &str) -> Self {
        Self {
            mismatches: self
                .mismatches
                .into_iter()
                .map(|m| m.rooted_at(field))
                .collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mismatch> {
        self.mismatches.iter()
    }
}

impl IntoIterator for MatchResult {
    type Item = Mismatch;
    type IntoIter = std::vec::IntoIter<Mismatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.mismatches.into_iter()
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mismatches.is_empty() {
            return f.write_str("match");
        }
        for (i, mismatch) in self.mismatches.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{mismatch}")?;
        }
        Ok(())
    }
}

/// Compare `actual` against `expected`, consulting `rules` for path-keyed overrides.
pub fn match_values(expected: &Value, actual: &Value, rules: &RuleSet) -> MatchResult {
    let mut matcher = StructuralMatcher::new(rules);
    matcher.compare(&PathExpr::root(), expected, actual, Mode::Exact);
    matcher.finish()
}

/// Compare a single value under an optional rule (headers, metadata entries).
pub fn match_with_rule(
    path: &PathExpr,
    rule: Option<&MatchingRule>,
    expected: &Value,
    actual: &Value,
) -> MatchResult {
    static NO_RULES: RuleSet = RuleSet::new();
    let mut matcher = StructuralMatcher::new(&NO_RULES);
    match rule {
        Some(rule) => matcher.apply_rule(path, rule, expected, actual),
        None => matcher.compare(path, expected, actual, Mode::Exact),
    }
    matcher.finish()
}

/// Whether scalars are compared by value or only by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Exact,
    Type,
}

struct StructuralMatcher<'r> {
    rules: &'r RuleSet,
    result: MatchResult,
}

impl<'r> StructuralMatcher<'r> {
    fn new(rules: &'r RuleSet) -> Self {
        Self {
            rules,
            result: MatchResult::default(),
        }
    }

    fn finish(self) -> MatchResult {
        self.result
    }

    fn report(
        &mut self,
        path: &PathExpr,
        kind: MismatchKind,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) {
        self.result
            .push(Mismatch::new(path.clone(), kind, expected, actual));
    }

    fn compare(&mut self, path: &PathExpr, expected: &Value, actual: &Value, mode: Mode) {
        let actual = reified(actual);
        if let Value::Matcher(node) = expected {
            self.apply_rule(path, &node.rule, &node.example, actual);
            return;
        }
        if let Some(rule) = self.rules.rule_for(path) {
            self.apply_rule(path, rule, expected, actual);
            return;
        }
        self.compare_structure(path, expected, actual, mode);
    }

    fn apply_rule(&mut self, path: &PathExpr, rule: &MatchingRule, example: &Value, actual: &Value) {
        let example = reified(example);
        let actual = reified(actual);
        match rule {
            MatchingRule::Type { min, max } => {
                if example.category() != actual.category() {
                    self.type_mismatch(path, example, actual);
                    return;
                }
                match (example, actual) {
                    (Value::Array(template), Value::Array(items)) => {
                        self.check_bounds(path, *min, *max, items.len());
                        self.compare_elements(path, template, items, Mode::Type);
                    }
                    (Value::Object(expected), Value::Object(actual)) => {
                        self.compare_object(path, expected, actual, Mode::Type);
                    }
                    _ => {}
                }
            }
            MatchingRule::Regex(regex) => match actual {
                Value::String(text) => {
                    if !regex.is_full_match(text) {
                        self.report(
                            path,
                            MismatchKind::RegexMismatch,
                            format!("/{}/", regex.as_str()),
                            actual.to_string(),
                        );
                    }
                }
                _ => self.report(
                    path,
                    MismatchKind::TypeMismatch,
                    format!("string matching /{}/", regex.as_str()),
                    actual.category().as_str(),
                ),
            },
            MatchingRule::Equality => {
                if !values_equal(example, actual) {
                    self.report(
                        path,
                        MismatchKind::ValueMismatch,
                        example.to_string(),
                        actual.to_string(),
                    );
                }
            }
        }
    }

    fn compare_structure(&mut self, path: &PathExpr, expected: &Value, actual: &Value, mode: Mode) {
        if expected.category() != actual.category() {
            self.type_mismatch(path, expected, actual);
            return;
        }
        match (expected, actual) {
            (Value::Object(expected), Value::Object(actual)) => {
                self.compare_object(path, expected, actual, mode)
            }
            (Value::Array(expected), Value::Array(actual)) => {
                if mode == Mode::Type || self.rules.has_element_wildcard(path) {
                    self.compare_elements(path, expected, actual, mode);
                } else {
                    if expected.len() != actual.len() {
                        self.report(
                            path,
                            MismatchKind::LengthMismatch,
                            format!("{} elements", expected.len()),
                            format!("{} elements", actual.len()),
                        );
                    }
                    for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
                        self.compare(&path.index(i), e, a, mode);
                    }
                }
            }
            _ => {
                if mode == Mode::Exact && !values_equal(expected, actual) {
                    self.report(
                        path,
                        MismatchKind::ValueMismatch,
                        expected.to_string(),
                        actual.to_string(),
                    );
                }
            }
        }
    }

    fn compare_object(&mut self, path: &PathExpr, expected: &Object, actual: &Object, mode: Mode) {
        for (key, value) in expected.iter() {
            let child = path.field(key);
            match actual.get(key) {
                Some(actual) => self.compare(&child, value, actual, mode),
                None => self.report(
                    &child,
                    MismatchKind::MissingKey,
                    value.to_string(),
                    "<absent>",
                ),
            }
        }
    }

    /// Every actual element against the first expected element.
    fn compare_elements(&mut self, path: &PathExpr, template: &[Value], items: &[Value], mode: Mode) {
        if let Some(template) = template.first() {
            for (i, item) in items.iter().enumerate() {
                self.compare(&path.index(i), template, item, mode);
            }
        }
    }

    fn check_bounds(&mut self, path: &PathExpr, min: Option<usize>, max: Option<usize>, len: usize) {
        if let Some(min) = min.filter(|min| len < *min) {
            self.report(
                path,
                MismatchKind::LengthMismatch,
                format!("at least {min} elements"),
                format!("{len} elements"),
            );
        }
        if let Some(max) = max.filter(|max| len > *max) {
            self.report(
                path,
                MismatchKind::LengthMismatch,
                format!("at most {max} elements"),
                format!("{len} elements"),
            );
        }
    }

    fn type_mismatch(&mut self, path: &PathExpr, expected: &Value, actual: &Value) {
        self.report(
            path,
            MismatchKind::TypeMismatch,
            expected.category().as_str(),
            actual.category().as_str(),
        );
    }
}

fn reified(value: &Value) -> &Value {
    match value {
        Value::Matcher(node) => reified(&node.example),
        other => other,
    }
}
