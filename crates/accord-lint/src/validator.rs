//! Checks over a parsed contract artifact.
//!
//! Error codes:
//! - E001 unreadable file, E002 invalid JSON
//! - E003 missing required field, E004 unsupported spec version
//! - E005 invalid HTTP method, E006 status outside 100-599
//! - E007 invalid rule path or category, E008 invalid regex
//! - E009 unknown rule kind, E010 inconsistent rule bounds
//! - E011 wrongly typed field, E012 messages in a version 2 artifact
//!
//! Warning codes:
//! - W001 duplicate interaction description, W002 missing spec version
//! - W003 body rule addressing nothing in the example body

use crate::types::{LintIssue, LintOptions, LintResult};
use accord_core::contract::{declared_version, effective_version};
use accord_core::{PathExpr, SpecVersion};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

const HTTP_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

const RULE_KINDS: [&str; 3] = ["type", "regex", "equality"];

/// Validate a complete contract artifact.
pub fn validate_contract(file: &Path, doc: &Value, result: &mut LintResult, options: &LintOptions) {
    let Some(doc) = doc.as_object() else {
        result.add_issue(LintIssue::error(
            "E011",
            "Contract artifact must be a JSON object",
            file,
        ));
        return;
    };

    for role in ["consumer", "provider"] {
        let has_name = doc
            .get(role)
            .and_then(|p| p.get("name"))
            .is_some_and(Value::is_string);
        if !has_name {
            result.add_issue(
                LintIssue::error("E003", format!("Missing {role} name"), file)
                    .with_location(format!("{role}.name"))
                    .with_suggestion(format!("Add \"{role}\": {{\"name\": \"...\"}}")),
            );
        }
    }

    let version = check_spec_version(file, doc, result);

    let interactions = doc.get("interactions");
    let messages = doc.get("messages");
    if interactions.is_none() && messages.is_none() {
        result.add_issue(
            LintIssue::error("E003", "Missing required field: interactions", file)
                .with_suggestion("Add an \"interactions\" (or \"messages\") array"),
        );
        return;
    }

    let mut descriptions: HashMap<String, usize> = HashMap::new();

    if let Some(interactions) = interactions {
        match interactions.as_array() {
            Some(items) => {
                for (idx, item) in items.iter().enumerate() {
                    let location = format!("interactions[{idx}]");
                    validate_interaction(file, item, &location, result, options);
                    note_description(file, item, &location, &mut descriptions, result);
                }
            }
            None => result.add_issue(
                LintIssue::error("E011", "interactions must be an array", file)
                    .with_location("interactions"),
            ),
        }
    }

    if let Some(messages) = messages {
        match messages.as_array() {
            Some(items) => {
                if !items.is_empty() && version == Some(SpecVersion::V2) {
                    result.add_issue(
                        LintIssue::error(
                            "E012",
                            "Message contracts require specification version 3",
                            file,
                        )
                        .with_location("metadata.pactSpecification.version")
                        .with_suggestion("Set the version to \"3.0.0\""),
                    );
                }
                for (idx, item) in items.iter().enumerate() {
                    let location = format!("messages[{idx}]");
                    validate_message(file, item, &location, result, options);
                    note_description(file, item, &location, &mut descriptions, result);
                }
            }
            None => result.add_issue(
                LintIssue::error("E011", "messages must be an array", file)
                    .with_location("messages"),
            ),
        }
    }
}

fn check_spec_version(file: &Path, doc: &Map<String, Value>, result: &mut LintResult) -> Option<SpecVersion> {
    let location = "metadata.pactSpecification.version";
    match declared_version(doc) {
        Ok(Some(version)) => Some(version),
        Ok(None) => {
            let assumed = effective_version(doc, doc.contains_key("messages"))
                .unwrap_or_default();
            result.add_issue(
                LintIssue::warning("W002", "No specification version declared", file)
                    .with_location(location)
                    .with_suggestion(format!("Readers will assume version {assumed}")),
            );
            None
        }
        Err(e) => {
            result.add_issue(
                LintIssue::error("E004", e.to_string(), file)
                    .with_location(location)
                    .with_suggestion("Use \"2.0.0\" or \"3.0.0\""),
            );
            None
        }
    }
}

fn note_description(
    file: &Path,
    item: &Value,
    location: &str,
    seen: &mut HashMap<String, usize>,
    result: &mut LintResult,
) {
    let Some(description) = item.get("description").and_then(Value::as_str) else {
        return;
    };
    let count = seen.entry(description.to_string()).or_insert(0);
    *count += 1;
    if *count == 2 {
        result.add_issue(
            LintIssue::warning(
                "W001",
                format!("Duplicate interaction description '{description}'"),
                file,
            )
            .with_location(location)
            .with_suggestion("Give every interaction a distinct description"),
        );
    }
}

fn require<'a>(
    file: &Path,
    obj: &'a Value,
    field: &str,
    location: &str,
    result: &mut LintResult,
) -> Option<&'a Value> {
    let value = obj.get(field);
    if value.is_none() {
        result.add_issue(
            LintIssue::error("E003", format!("Missing required field: {field}"), file)
                .with_location(location),
        );
    }
    value
}

/// Validate one HTTP interaction.
pub fn validate_interaction(
    file: &Path,
    interaction: &Value,
    location: &str,
    result: &mut LintResult,
    options: &LintOptions,
) {
    if !interaction.is_object() {
        result.add_issue(
            LintIssue::error("E011", "Interaction must be an object", file).with_location(location),
        );
        return;
    }
    require(file, interaction, "description", location, result);

    if let Some(request) = require(file, interaction, "request", location, result) {
        validate_request(file, request, &format!("{location}.request"), result, options);
    }
    if let Some(response) = require(file, interaction, "response", location, result) {
        validate_response(file, response, &format!("{location}.response"), result, options);
    }
}

/// Validate an expected request.
pub fn validate_request(
    file: &Path,
    request: &Value,
    location: &str,
    result: &mut LintResult,
    options: &LintOptions,
) {
    if let Some(method) = require(file, request, "method", location, result) {
        let valid = method
            .as_str()
            .is_some_and(|m| HTTP_METHODS.contains(&m.to_ascii_uppercase().as_str()));
        if !valid {
            result.add_issue(
                LintIssue::error("E005", format!("Invalid HTTP method: {method}"), file)
                    .with_location(format!("{location}.method"))
                    .with_suggestion(format!("Use one of {}", HTTP_METHODS.join(", "))),
            );
        }
    }
    if let Some(path) = require(file, request, "path", location, result) {
        if !path.is_string() {
            result.add_issue(
                LintIssue::error("E011", "Request path must be a string", file)
                    .with_location(format!("{location}.path")),
            );
        }
    }
    if let Some(query) = request.get("query") {
        if !(query.is_string() || query.is_object()) {
            result.add_issue(
                LintIssue::error("E011", "Query must be a string or an object", file)
                    .with_location(format!("{location}.query")),
            );
        }
    }
    if let Some(headers) = request.get("headers") {
        validate_headers(file, headers, &format!("{location}.headers"), result);
    }
    if let Some(rules) = request.get("matchingRules") {
        validate_matching_rules(
            file,
            rules,
            request.get("body"),
            &format!("{location}.matchingRules"),
            result,
            options,
        );
    }
}

/// Validate a canned response.
pub fn validate_response(
    file: &Path,
    response: &Value,
    location: &str,
    result: &mut LintResult,
    options: &LintOptions,
) {
    if let Some(status) = require(file, response, "status", location, result) {
        match status.as_u64() {
            Some(code) if (100..=599).contains(&code) => {}
            Some(code) => result.add_issue(
                LintIssue::error("E006", format!("Invalid HTTP status code: {code}"), file)
                    .with_location(format!("{location}.status"))
                    .with_suggestion("Use a valid HTTP status code (100-599)"),
            ),
            None => result.add_issue(
                LintIssue::error("E006", format!("Status must be a number, got {status}"), file)
                    .with_location(format!("{location}.status")),
            ),
        }
    }
    if let Some(headers) = response.get("headers") {
        validate_headers(file, headers, &format!("{location}.headers"), result);
    }
    if let Some(rules) = response.get("matchingRules") {
        validate_matching_rules(
            file,
            rules,
            response.get("body"),
            &format!("{location}.matchingRules"),
            result,
            options,
        );
    }
}

/// Validate one message interaction.
pub fn validate_message(
    file: &Path,
    message: &Value,
    location: &str,
    result: &mut LintResult,
    options: &LintOptions,
) {
    if !message.is_object() {
        result.add_issue(
            LintIssue::error("E011", "Message must be an object", file).with_location(location),
        );
        return;
    }
    require(file, message, "description", location, result);
    if let Some(metadata) = message.get("metaData") {
        if !metadata.is_object() {
            result.add_issue(
                LintIssue::error("E011", "metaData must be an object", file)
                    .with_location(format!("{location}.metaData")),
            );
        }
    }
    if let Some(rules) = message.get("matchingRules") {
        validate_matching_rules(
            file,
            rules,
            message.get("contents"),
            &format!("{location}.matchingRules"),
            result,
            options,
        );
    }
}

/// Header values must be strings (or arrays of strings).
pub fn validate_headers(file: &Path, headers: &Value, location: &str, result: &mut LintResult) {
    let Some(headers) = headers.as_object() else {
        result.add_issue(
            LintIssue::error("E011", "Headers must be an object", file).with_location(location),
        );
        return;
    };
    for (name, value) in headers {
        let ok = match value {
            Value::String(_) => true,
            Value::Array(values) => values.iter().all(Value::is_string),
            _ => false,
        };
        if !ok {
            result.add_issue(
                LintIssue::error(
                    "E011",
                    format!("Header '{name}' value must be a string"),
                    file,
                )
                .with_location(format!("{location}.{name}"))
                .with_suggestion(format!("Change to: \"{name}\": \"{value}\"")),
            );
        }
    }
}

/// Validate a `matchingRules` block in either the flat or the categorised layout.
pub fn validate_matching_rules(
    file: &Path,
    rules: &Value,
    body: Option<&Value>,
    location: &str,
    result: &mut LintResult,
    options: &LintOptions,
) {
    let Some(rules) = rules.as_object() else {
        result.add_issue(
            LintIssue::error("E011", "matchingRules must be an object", file).with_location(location),
        );
        return;
    };

    for (key, spec) in rules {
        let key_location = format!("{location}.{key}");

        if key.starts_with('$') {
            let Some(path) = parse_rule_path(file, key, &key_location, result) else {
                continue;
            };
            let category = match path.tokens().get(1) {
                Some(accord_core::matchers::PathToken::Field(prefix)) => prefix.clone(),
                _ => String::new(),
            };
            match category.as_str() {
                "body" => {
                    if let Some(body_path) = path.strip_root_field("body") {
                        check_coverage(file, &body_path, body, &key_location, result, options);
                    }
                }
                "headers" | "header" | "query" | "path" | "metadata" | "metaData" => {}
                _ => {
                    result.add_issue(
                        LintIssue::error(
                            "E007",
                            format!("Rule path '{key}' does not start with a known category"),
                            file,
                        )
                        .with_location(&key_location)
                        .with_suggestion("Use $.body, $.headers, $.query or $.path"),
                    );
                    continue;
                }
            }
            validate_rule_entry(file, spec, &key_location, result);
            continue;
        }

        match key.as_str() {
            "path" => validate_rule_entry(file, spec, &key_location, result),
            "body" | "header" | "query" | "metadata" => {
                let Some(entries) = spec.as_object() else {
                    result.add_issue(
                        LintIssue::error("E011", "Rule category must be an object", file)
                            .with_location(&key_location),
                    );
                    continue;
                };
                for (name, entry) in entries {
                    let entry_location = format!("{key_location}.{name}");
                    if key == "body" {
                        let Some(path) = parse_rule_path(file, name, &entry_location, result) else {
                            continue;
                        };
                        check_coverage(file, &path, body, &entry_location, result, options);
                    }
                    validate_rule_entry(file, entry, &entry_location, result);
                }
            }
            other => result.add_issue(
                LintIssue::error("E007", format!("Unknown rule category '{other}'"), file)
                    .with_location(&key_location)
                    .with_suggestion("Use body, header, query, path or metadata"),
            ),
        }
    }
}

fn parse_rule_path(
    file: &Path,
    pattern: &str,
    location: &str,
    result: &mut LintResult,
) -> Option<PathExpr> {
    match PathExpr::parse(pattern) {
        Ok(path) => Some(path),
        Err(e) => {
            result.add_issue(
                LintIssue::error("E007", e.to_string(), file)
                    .with_location(location)
                    .with_suggestion("Paths look like $.items[*].price or $['first name']"),
            );
            None
        }
    }
}

/// `{"matchers": [..]}` or a bare rule object.
fn validate_rule_entry(file: &Path, entry: &Value, location: &str, result: &mut LintResult) {
    match entry.get("matchers") {
        Some(Value::Array(matchers)) => {
            for (idx, rule) in matchers.iter().enumerate() {
                validate_rule(file, rule, &format!("{location}.matchers[{idx}]"), result);
            }
        }
        Some(_) => result.add_issue(
            LintIssue::error("E011", "matchers must be an array", file)
                .with_location(format!("{location}.matchers")),
        ),
        None => validate_rule(file, entry, location, result),
    }
}

/// Validate a single rule object.
pub fn validate_rule(file: &Path, rule: &Value, location: &str, result: &mut LintResult) {
    let Some(rule) = rule.as_object() else {
        result.add_issue(
            LintIssue::error("E011", "Rule must be an object", file).with_location(location),
        );
        return;
    };

    let kind = match rule.get("match").map(Value::as_str) {
        Some(Some(kind)) => kind,
        Some(None) => {
            result.add_issue(
                LintIssue::error("E011", "Rule 'match' must be a string", file)
                    .with_location(format!("{location}.match")),
            );
            return;
        }
        None if rule.contains_key("regex") => "regex",
        None => "type",
    };

    if !RULE_KINDS.contains(&kind) {
        result.add_issue(
            LintIssue::error("E009", format!("Unknown rule kind '{kind}'"), file)
                .with_location(format!("{location}.match"))
                .with_suggestion(format!("Use one of {}", RULE_KINDS.join(", "))),
        );
        return;
    }

    if kind == "regex" {
        match rule.get("regex").and_then(Value::as_str) {
            Some(pattern) => {
                if let Err(e) = Regex::new(pattern) {
                    result.add_issue(
                        LintIssue::error("E008", format!("Invalid regex pattern: {e}"), file)
                            .with_location(format!("{location}.regex"))
                            .with_suggestion("Check regex syntax"),
                    );
                }
            }
            None => result.add_issue(
                LintIssue::error("E008", "Regex rule has no 'regex' pattern", file)
                    .with_location(location),
            ),
        }
    }

    if kind == "type" {
        let min = rule.get("min").and_then(Value::as_u64);
        let max = rule.get("max").and_then(Value::as_u64);
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                result.add_issue(
                    LintIssue::error("E010", format!("min {min} is greater than max {max}"), file)
                        .with_location(location),
                );
            }
        }
    }
}

/// Warn when a body rule pattern addresses no node of the example body.
fn check_coverage(
    file: &Path,
    pattern: &PathExpr,
    body: Option<&Value>,
    location: &str,
    result: &mut LintResult,
    options: &LintOptions,
) {
    if !options.check_rule_coverage {
        return;
    }
    let covered = body.is_some_and(|body| {
        let mut paths = Vec::new();
        collect_paths(body, PathExpr::root(), &mut paths);
        paths.iter().any(|concrete| pattern.matches(concrete))
    });
    if !covered {
        result.add_issue(
            LintIssue::warning(
                "W003",
                format!("Rule path '{pattern}' matches nothing in the body"),
                file,
            )
            .with_location(location)
            .with_suggestion("Remove the rule or add an example value at that path"),
        );
    }
}

fn collect_paths(value: &Value, path: PathExpr, out: &mut Vec<PathExpr>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                collect_paths(child, path.field(key), out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_paths(child, path.index(i), out);
            }
        }
        _ => {}
    }
    out.push(path);
}
