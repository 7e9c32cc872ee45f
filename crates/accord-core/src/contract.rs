//! Contract artifact serialization.
//!
//! Artifacts are pretty-printed JSON in the pact layout. Version 2 writes a
//! flat `matchingRules` map keyed by `$.body…`, `$.headers.<name>`,
//! `$.query.<name>` and `$.path`; version 3 groups rules by category and
//! frames message contracts as `messages[]`.
//!
//! Reading rebuilds matcher nodes: every body node whose path has a winning
//! rule becomes a placeholder carrying that rule, with the node as example.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value as Json};
use tracing::debug;

use crate::error::SerializationError;
use crate::matchers::{MatcherRegistry, MatchingRule, PathExpr, PathToken, RuleCategory, RuleSet};
use crate::model::{
    encode_query, parse_query, Contract, Interaction, InteractionKind, MessageShape,
    ProviderState, RequestShape, ResponseShape, SpecVersion,
};
use crate::value::Value;

type JsonMap = Map<String, Json>;

/// Encode a contract as artifact bytes.
pub fn serialize(contract: &Contract) -> Result<Vec<u8>, SerializationError> {
    let doc = to_json(contract)?;
    let bytes = serde_json::to_vec_pretty(&doc)?;
    debug!(
        "Serialized contract '{}' -> '{}' ({} interactions, spec {})",
        contract.consumer(),
        contract.provider(),
        contract.interactions().len(),
        contract.spec_version()
    );
    Ok(bytes)
}

/// Decode artifact bytes into a contract.
pub fn deserialize(bytes: &[u8]) -> Result<Contract, SerializationError> {
    let json: Json = serde_json::from_slice(bytes)?;
    let contract = from_json(&json)?;
    debug!(
        "Deserialized contract '{}' -> '{}' ({} interactions, spec {})",
        contract.consumer(),
        contract.provider(),
        contract.interactions().len(),
        contract.spec_version()
    );
    Ok(contract)
}

/// Artifact document for a contract.
pub fn to_json(contract: &Contract) -> Result<Json, SerializationError> {
    let version = contract.spec_version();
    let messages = contract.is_message_contract();
    if messages && version == SpecVersion::V2 {
        return Err(SerializationError::MessagesRequireV3);
    }

    let mut doc = JsonMap::new();
    doc.insert("consumer".into(), json!({ "name": contract.consumer() }));
    doc.insert("provider".into(), json!({ "name": contract.provider() }));
    let items = contract
        .interactions()
        .iter()
        .map(|interaction| write_interaction(interaction, version))
        .collect();
    let key = if messages { "messages" } else { "interactions" };
    doc.insert(key.into(), Json::Array(items));
    doc.insert(
        "metadata".into(),
        json!({
            "pactSpecification": { "version": version.as_str() },
            "accord": { "version": env!("CARGO_PKG_VERSION") },
        }),
    );
    Ok(Json::Object(doc))
}

/// Contract described by an artifact document.
pub fn from_json(json: &Json) -> Result<Contract, SerializationError> {
    let doc = as_object(json, "$")?;
    let consumer = participant(doc, "consumer")?;
    let provider = participant(doc, "provider")?;

    let interactions_json = doc.get("interactions");
    let messages_json = doc.get("messages");
    if interactions_json.is_none() && messages_json.is_none() {
        return Err(SerializationError::MissingField("interactions".to_string()));
    }
    let spec_version = effective_version(doc, messages_json.is_some())?;

    let mut interactions = Vec::new();
    if let Some(items) = interactions_json {
        for (i, item) in as_array(items, "interactions")?.iter().enumerate() {
            interactions.push(read_http(item, &format!("interactions[{i}]"))?);
        }
    }
    if let Some(items) = messages_json {
        let items = as_array(items, "messages")?;
        if !items.is_empty() && !interactions.is_empty() {
            return Err(SerializationError::MixedInteractionKinds);
        }
        if !items.is_empty() && spec_version == SpecVersion::V2 {
            return Err(SerializationError::MessagesRequireV3);
        }
        for (i, item) in items.iter().enumerate() {
            interactions.push(read_message(item, &format!("messages[{i}]"))?);
        }
    }

    Ok(Contract {
        consumer,
        provider,
        spec_version,
        interactions,
    })
}

// Writing

fn write_interaction(interaction: &Interaction, version: SpecVersion) -> Json {
    let mut out = JsonMap::new();
    out.insert("description".into(), json!(interaction.description()));
    write_provider_states(&mut out, interaction.provider_states(), version);

    match interaction.kind() {
        InteractionKind::Http { request, response } => {
            out.insert("request".into(), write_request(request, version));
            out.insert("response".into(), write_response(response, version));
        }
        InteractionKind::Message(message) => {
            if let Some(contents) = message.contents() {
                out.insert("contents".into(), contents.to_json());
            }
            if !message.metadata().is_empty() {
                let metadata: JsonMap = message
                    .metadata()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                out.insert("metaData".into(), Json::Object(metadata));
            }
            if let Some(rules) = write_rules(message.rules(), version) {
                out.insert("matchingRules".into(), rules);
            }
        }
    }
    Json::Object(out)
}

fn write_provider_states(out: &mut JsonMap, states: &[ProviderState], version: SpecVersion) {
    match version {
        // Version 2 has room for a single state name.
        SpecVersion::V2 => {
            if let Some(state) = states.first() {
                out.insert("providerState".into(), json!(state.name));
            }
        }
        SpecVersion::V3 => {
            if states.is_empty() {
                return;
            }
            let states = states
                .iter()
                .map(|state| {
                    let mut entry = JsonMap::new();
                    entry.insert("name".into(), json!(state.name));
                    if !state.params.is_empty() {
                        entry.insert("params".into(), Json::Object(state.params.clone()));
                    }
                    Json::Object(entry)
                })
                .collect();
            out.insert("providerStates".into(), Json::Array(states));
        }
    }
}

fn write_headers(out: &mut JsonMap, headers: &BTreeMap<String, String>) {
    if !headers.is_empty() {
        let headers: JsonMap = headers
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        out.insert("headers".into(), Json::Object(headers));
    }
}

fn write_request(request: &RequestShape, version: SpecVersion) -> Json {
    let mut out = JsonMap::new();
    out.insert("method".into(), json!(request.method()));
    out.insert("path".into(), json!(request.path()));
    if !request.query().is_empty() {
        let query = match version {
            SpecVersion::V2 => json!(encode_query(request.query())),
            SpecVersion::V3 => Json::Object(
                request
                    .query()
                    .iter()
                    .map(|(name, values)| (name.clone(), json!(values)))
                    .collect(),
            ),
        };
        out.insert("query".into(), query);
    }
    write_headers(&mut out, request.headers());
    if let Some(body) = request.body() {
        out.insert("body".into(), body.to_json());
    }
    if let Some(rules) = write_rules(request.rules(), version) {
        out.insert("matchingRules".into(), rules);
    }
    Json::Object(out)
}

fn write_response(response: &ResponseShape, version: SpecVersion) -> Json {
    let mut out = JsonMap::new();
    out.insert("status".into(), json!(response.status()));
    write_headers(&mut out, response.headers());
    if let Some(body) = response.body() {
        out.insert("body".into(), body.to_json());
    }
    if let Some(rules) = write_rules(response.rules(), version) {
        out.insert("matchingRules".into(), rules);
    }
    Json::Object(out)
}

/// Version 2 prefix of a category in flat rule keys.
fn flat_prefix(category: RuleCategory) -> &'static str {
    match category {
        RuleCategory::Path => "path",
        RuleCategory::Query => "query",
        RuleCategory::Header => "headers",
        RuleCategory::Body => "body",
        RuleCategory::Metadata => "metadata",
    }
}

fn write_rules(registry: &MatcherRegistry, version: SpecVersion) -> Option<Json> {
    if registry.is_empty() {
        return None;
    }
    let mut out = JsonMap::new();
    match version {
        SpecVersion::V2 => {
            for (category, rules) in registry.iter() {
                for entry in rules.iter() {
                    out.insert(
                        entry.path.rooted_at(flat_prefix(category)).to_string(),
                        rule_to_json(&entry.rule),
                    );
                }
            }
        }
        SpecVersion::V3 => {
            for (category, rules) in registry.iter() {
                if category == RuleCategory::Path {
                    let matchers: Vec<Json> =
                        rules.iter().map(|entry| rule_to_json(&entry.rule)).collect();
                    out.insert(category.as_str().into(), json!({ "matchers": matchers }));
                    continue;
                }
                let mut keyed = JsonMap::new();
                for entry in rules.iter() {
                    let key = match (category, entry.path.single_field()) {
                        (RuleCategory::Body, _) | (_, None) => entry.path.to_string(),
                        (_, Some(name)) => name.to_string(),
                    };
                    keyed.insert(
                        key,
                        json!({ "matchers": [rule_to_json(&entry.rule)], "combine": "AND" }),
                    );
                }
                out.insert(category.as_str().into(), Json::Object(keyed));
            }
        }
    }
    Some(Json::Object(out))
}

fn rule_to_json(rule: &MatchingRule) -> Json {
    match rule {
        MatchingRule::Type { min, max } => {
            let mut out = JsonMap::new();
            out.insert("match".into(), json!("type"));
            if let Some(min) = min {
                out.insert("min".into(), json!(min));
            }
            if let Some(max) = max {
                out.insert("max".into(), json!(max));
            }
            Json::Object(out)
        }
        MatchingRule::Regex(regex) => json!({ "match": "regex", "regex": regex.as_str() }),
        MatchingRule::Equality => json!({ "match": "equality" }),
    }
}

// Reading

/// Rule object as found in artifacts; older writers omit `match`.
#[derive(Debug, Deserialize)]
struct RuleDoc {
    #[serde(rename = "match", default)]
    kind: Option<String>,
    #[serde(default)]
    min: Option<usize>,
    #[serde(default)]
    max: Option<usize>,
    #[serde(default)]
    regex: Option<String>,
}

fn rule_from_json(json: &Json) -> Result<MatchingRule, SerializationError> {
    let doc = RuleDoc::deserialize(json)?;
    let kind = match doc.kind.as_deref() {
        Some(kind) => kind,
        None if doc.regex.is_some() => "regex",
        None => "type",
    };
    match kind {
        "type" => Ok(MatchingRule::Type {
            min: doc.min,
            max: doc.max,
        }),
        "regex" => {
            let pattern = doc
                .regex
                .ok_or_else(|| SerializationError::MissingField("regex".to_string()))?;
            Ok(MatchingRule::regex(&pattern)?)
        }
        "equality" => Ok(MatchingRule::Equality),
        other => Err(SerializationError::UnknownRule(other.to_string())),
    }
}

/// Rules listed under `matchers`, or a bare rule object.
fn matchers_of(json: &Json, ctx: &str) -> Result<Vec<MatchingRule>, SerializationError> {
    let entry = as_object(json, ctx)?;
    match entry.get("matchers") {
        Some(matchers) => as_array(matchers, &qualified(ctx, "matchers"))?
            .iter()
            .map(rule_from_json)
            .collect(),
        None => Ok(vec![rule_from_json(json)?]),
    }
}

fn category_for_prefix(prefix: &str) -> Option<RuleCategory> {
    match prefix {
        "body" => Some(RuleCategory::Body),
        "headers" | "header" => Some(RuleCategory::Header),
        "query" => Some(RuleCategory::Query),
        "path" => Some(RuleCategory::Path),
        "metadata" | "metaData" => Some(RuleCategory::Metadata),
        _ => None,
    }
}

/// `$.body.a` -> (Body, `$.a`); `$.path` -> (Path, `$`).
fn split_flat_key(key: &str) -> Result<(RuleCategory, PathExpr), SerializationError> {
    let path = PathExpr::parse(key)?;
    let prefix = match path.tokens() {
        [PathToken::Root, PathToken::Field(prefix), ..] => prefix.clone(),
        _ => return Err(SerializationError::UnknownCategory(key.to_string())),
    };
    let category = category_for_prefix(&prefix)
        .ok_or_else(|| SerializationError::UnknownCategory(prefix.clone()))?;
    let stripped = path
        .strip_root_field(&prefix)
        .ok_or_else(|| SerializationError::UnknownCategory(key.to_string()))?;
    Ok((category, stripped))
}

fn read_rules(json: Option<&Json>, ctx: &str) -> Result<MatcherRegistry, SerializationError> {
    let mut registry = MatcherRegistry::new();
    let Some(json) = json else {
        return Ok(registry);
    };
    let ctx = qualified(ctx, "matchingRules");
    for (key, spec) in as_object(json, &ctx)? {
        if key.starts_with('$') {
            let (category, path) = split_flat_key(key)?;
            registry.add_path(category, path, rule_from_json(spec)?);
            continue;
        }

        let category = RuleCategory::parse(key)
            .ok_or_else(|| SerializationError::UnknownCategory(key.clone()))?;
        let category_ctx = qualified(&ctx, key);
        if category == RuleCategory::Path {
            for rule in matchers_of(spec, &category_ctx)? {
                registry.add_path(category, PathExpr::root(), rule);
            }
            continue;
        }
        for (name, entry) in as_object(spec, &category_ctx)? {
            let path = if category == RuleCategory::Body || name.starts_with('$') {
                PathExpr::parse(name)?
            } else {
                PathExpr::root().field(name)
            };
            for rule in matchers_of(entry, &qualified(&category_ctx, name))? {
                registry.add_path(category, path.clone(), rule);
            }
        }
    }
    Ok(registry)
}

/// Turn every node with a winning rule into a placeholder, children first.
fn attach_rules(value: &mut Value, path: &PathExpr, rules: &RuleSet) {
    match value {
        Value::Object(object) => {
            for (key, child) in object.iter_mut() {
                attach_rules(child, &path.field(key), rules);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter_mut().enumerate() {
                attach_rules(child, &path.index(i), rules);
            }
        }
        _ => {}
    }
    if let Some(rule) = rules.rule_for(path) {
        let example = std::mem::replace(value, Value::Null);
        *value = Value::matcher(rule.clone(), example);
    }
}

fn read_body(json: Option<&Json>, rules: &MatcherRegistry) -> Option<Value> {
    json.map(|body| {
        let mut value = Value::from_json(body.clone());
        attach_rules(&mut value, &PathExpr::root(), rules.category(RuleCategory::Body));
        value
    })
}

/// Version declared in an artifact's metadata, `None` when absent.
///
/// Both `pactSpecification` and `pact-specification` are recognised.
pub fn declared_version(doc: &JsonMap) -> Result<Option<SpecVersion>, SerializationError> {
    let declared = doc.get("metadata").and_then(|metadata| {
        ["pactSpecification", "pact-specification"]
            .iter()
            .find_map(|key| metadata.get(key))
            .and_then(|spec| spec.get("version"))
    });
    let Some(version) = declared else {
        return Ok(None);
    };
    let version = as_str(version, "metadata.pactSpecification.version")?;
    SpecVersion::parse(version)
        .map(Some)
        .ok_or_else(|| SerializationError::UnsupportedVersion(version.to_string()))
}

/// Version an artifact is read as: the declared one, else 3 for message
/// contracts and 2 otherwise.
pub fn effective_version(doc: &JsonMap, has_messages: bool) -> Result<SpecVersion, SerializationError> {
    Ok(declared_version(doc)?.unwrap_or(if has_messages {
        SpecVersion::V3
    } else {
        SpecVersion::V2
    }))
}

fn participant(doc: &JsonMap, role: &str) -> Result<String, SerializationError> {
    let entry = as_object(field(doc, role, "")?, role)?;
    Ok(str_field(entry, "name", role)?.to_string())
}

fn read_states(obj: &JsonMap, ctx: &str) -> Result<Vec<ProviderState>, SerializationError> {
    if let Some(states) = obj.get("providerStates") {
        let ctx = qualified(ctx, "providerStates");
        return as_array(states, &ctx)?
            .iter()
            .enumerate()
            .map(|(i, state)| {
                let state_ctx = format!("{ctx}[{i}]");
                let state = as_object(state, &state_ctx)?;
                let name = str_field(state, "name", &state_ctx)?;
                let params = match state.get("params") {
                    None | Some(Json::Null) => Map::new(),
                    Some(params) => as_object(params, &qualified(&state_ctx, "params"))?.clone(),
                };
                Ok(ProviderState::with_params(name, params))
            })
            .collect();
    }
    match obj.get("providerState") {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(name) => Ok(vec![ProviderState::new(as_str(
            name,
            &qualified(ctx, "providerState"),
        )?)]),
    }
}

fn read_headers(obj: &JsonMap, ctx: &str) -> Result<BTreeMap<String, String>, SerializationError> {
    let mut headers = BTreeMap::new();
    let Some(json) = obj.get("headers") else {
        return Ok(headers);
    };
    let ctx = qualified(ctx, "headers");
    for (name, value) in as_object(json, &ctx)? {
        let value_ctx = qualified(&ctx, name);
        let value = match value {
            Json::Array(values) => values
                .iter()
                .map(|v| as_str(v, &value_ctx))
                .collect::<Result<Vec<_>, _>>()?
                .join(", "),
            other => as_str(other, &value_ctx)?.to_string(),
        };
        headers.insert(name.clone(), value);
    }
    Ok(headers)
}

fn read_query(obj: &JsonMap, ctx: &str) -> Result<BTreeMap<String, Vec<String>>, SerializationError> {
    let ctx = qualified(ctx, "query");
    match obj.get("query") {
        None | Some(Json::Null) => Ok(BTreeMap::new()),
        Some(Json::String(encoded)) => Ok(parse_query(encoded)),
        Some(Json::Object(params)) => params
            .iter()
            .map(|(name, values)| {
                let value_ctx = qualified(&ctx, name);
                let values = match values {
                    Json::Array(values) => values
                        .iter()
                        .map(|v| as_str(v, &value_ctx).map(str::to_string))
                        .collect::<Result<Vec<_>, _>>()?,
                    other => vec![as_str(other, &value_ctx)?.to_string()],
                };
                Ok((name.clone(), values))
            })
            .collect(),
        Some(_) => Err(SerializationError::WrongType {
            field: ctx,
            expected: "a string or an object",
        }),
    }
}

fn read_http(item: &Json, ctx: &str) -> Result<Interaction, SerializationError> {
    let obj = as_object(item, ctx)?;
    let description = str_field(obj, "description", ctx)?.to_string();
    let provider_states = read_states(obj, ctx)?;

    let request_ctx = qualified(ctx, "request");
    let request_obj = as_object(field(obj, "request", ctx)?, &request_ctx)?;
    let mut request = RequestShape::new(
        str_field(request_obj, "method", &request_ctx)?.to_ascii_uppercase(),
        str_field(request_obj, "path", &request_ctx)?,
    );
    request.query = read_query(request_obj, &request_ctx)?;
    request.headers = read_headers(request_obj, &request_ctx)?;
    request.rules = read_rules(request_obj.get("matchingRules"), &request_ctx)?;
    request.body = read_body(request_obj.get("body"), &request.rules);

    let response_ctx = qualified(ctx, "response");
    let response_obj = as_object(field(obj, "response", ctx)?, &response_ctx)?;
    let status_ctx = qualified(&response_ctx, "status");
    let status = field(response_obj, "status", &response_ctx)?
        .as_u64()
        .and_then(|status| u16::try_from(status).ok())
        .ok_or(SerializationError::WrongType {
            field: status_ctx,
            expected: "an HTTP status code",
        })?;
    let mut response = ResponseShape::new(status);
    response.headers = read_headers(response_obj, &response_ctx)?;
    response.rules = read_rules(response_obj.get("matchingRules"), &response_ctx)?;
    response.body = read_body(response_obj.get("body"), &response.rules);

    Ok(Interaction {
        description,
        provider_states,
        kind: InteractionKind::Http { request, response },
    })
}

fn read_message(item: &Json, ctx: &str) -> Result<Interaction, SerializationError> {
    let obj = as_object(item, ctx)?;
    let description = str_field(obj, "description", ctx)?.to_string();
    let provider_states = read_states(obj, ctx)?;

    let mut message = MessageShape::new();
    if let Some(metadata) = obj.get("metaData").or_else(|| obj.get("metadata")) {
        message.metadata = as_object(metadata, &qualified(ctx, "metaData"))?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
    }
    message.rules = read_rules(obj.get("matchingRules"), ctx)?;
    message.contents = read_body(obj.get("contents"), &message.rules);

    Ok(Interaction {
        description,
        provider_states,
        kind: InteractionKind::Message(message),
    })
}

fn qualified(ctx: &str, name: &str) -> String {
    if ctx.is_empty() {
        name.to_string()
    } else {
        format!("{ctx}.{name}")
    }
}

fn field<'a>(obj: &'a JsonMap, name: &str, ctx: &str) -> Result<&'a Json, SerializationError> {
    obj.get(name)
        .ok_or_else(|| SerializationError::MissingField(qualified(ctx, name)))
}

fn str_field<'a>(obj: &'a JsonMap, name: &str, ctx: &str) -> Result<&'a str, SerializationError> {
    as_str(field(obj, name, ctx)?, &qualified(ctx, name))
}

fn as_object<'a>(json: &'a Json, field: &str) -> Result<&'a JsonMap, SerializationError> {
    json.as_object().ok_or_else(|| SerializationError::WrongType {
        field: field.to_string(),
        expected: "an object",
    })
}

fn as_array<'a>(json: &'a Json, field: &str) -> Result<&'a Vec<Json>, SerializationError> {
    json.as_array().ok_or_else(|| SerializationError::WrongType {
        field: field.to_string(),
        expected: "an array",
    })
}

fn as_str<'a>(json: &'a Json, field: &str) -> Result<&'a str, SerializationError> {
    json.as_str().ok_or_else(|| SerializationError::WrongType {
        field: field.to_string(),
        expected: "a string",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{ContractBuilder, JsonObject};
    use crate::error::RuleError;

    fn order_contract(version: SpecVersion) -> Contract {
        ContractBuilder::new("OrderWeb", "OrderApi")
            .spec_version(version)
            .given("an order exists")
            .upon_receiving("fetch order lines")
            .method("GET")
            .matching_path(r"/orders/\d+", "/orders/1")
            .query_param("expand", "lines")
            .will_respond_with()
            .status(200)
            .body(
                JsonObject::new()
                    .integer_type("id", 1)
                    .each_like("lines", |line| line.string_type("sku", "A-1")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_v3_layout() {
        let doc = to_json(&order_contract(SpecVersion::V3)).unwrap();
        assert_eq!(doc["consumer"]["name"], "OrderWeb");
        assert_eq!(doc["metadata"]["pactSpecification"]["version"], "3.0.0");
        assert_eq!(doc["metadata"]["accord"]["version"], env!("CARGO_PKG_VERSION"));

        let interaction = &doc["interactions"][0];
        assert_eq!(interaction["providerStates"], json!([{"name": "an order exists"}]));
        assert_eq!(interaction["request"]["query"], json!({"expand": ["lines"]}));
        assert_eq!(
            interaction["request"]["matchingRules"]["path"],
            json!({"matchers": [{"match": "regex", "regex": r"/orders/\d+"}]})
        );

        let body_rules = &interaction["response"]["matchingRules"]["body"];
        assert_eq!(
            body_rules["$.lines"],
            json!({"matchers": [{"match": "type"}], "combine": "AND"})
        );
        assert_eq!(
            body_rules["$.lines[*].sku"]["matchers"][0],
            json!({"match": "type"})
        );
        assert_eq!(
            interaction["response"]["body"],
            json!({"id": 1, "lines": [{"sku": "A-1"}]})
        );
    }

    #[test]
    fn test_v2_layout() {
        let doc = to_json(&order_contract(SpecVersion::V2)).unwrap();
        let interaction = &doc["interactions"][0];
        assert_eq!(interaction["providerState"], "an order exists");
        assert!(interaction.get("providerStates").is_none());
        assert_eq!(interaction["request"]["query"], "expand=lines");
        assert_eq!(
            interaction["request"]["matchingRules"]["$.path"],
            json!({"match": "regex", "regex": r"/orders/\d+"})
        );
        assert_eq!(
            interaction["response"]["matchingRules"]["$.body.lines"],
            json!({"match": "type"})
        );
        assert_eq!(
            interaction["response"]["matchingRules"]["$.body.lines[*].sku"],
            json!({"match": "type"})
        );
    }

    #[test]
    fn test_v2_rejects_messages() {
        let mut contract = ContractBuilder::new("c", "p")
            .spec_version(SpecVersion::V3)
            .expects_to_receive("event")
            .with_content(json!({"id": 1}))
            .build()
            .unwrap();
        contract.spec_version = SpecVersion::V2;
        assert!(matches!(
            serialize(&contract),
            Err(SerializationError::MessagesRequireV3)
        ));
    }

    #[test]
    fn test_reads_placeholders_back() {
        for version in [SpecVersion::V2, SpecVersion::V3] {
            let contract = order_contract(version);
            let bytes = serialize(&contract).unwrap();
            let decoded = deserialize(&bytes).unwrap();
            assert_eq!(decoded, contract, "round trip for {version}");
        }
    }

    #[test]
    fn test_reads_legacy_flat_rules() {
        let artifact = json!({
            "consumer": {"name": "c"},
            "provider": {"name": "p"},
            "interactions": [{
                "description": "legacy",
                "request": {"method": "get", "path": "/", "headers": {"Accept": ["a", "b"]}},
                "response": {
                    "status": 200,
                    "body": {"id": "abc", "tags": ["x", "y"]},
                    "matchingRules": {
                        "$.body.id": {"regex": "[a-z]+"},
                        "$.body.tags": {"min": 1},
                        "$.headers.Content-Type": {"match": "type"}
                    }
                }
            }],
            "metadata": {"pact-specification": {"version": "2.0.0"}}
        });
        let contract = from_json(&artifact).unwrap();
        assert_eq!(contract.spec_version(), SpecVersion::V2);

        let interaction = &contract.interactions()[0];
        let request = interaction.request().unwrap();
        assert_eq!(request.method(), "GET");
        assert_eq!(request.header("accept"), Some("a, b"));

        let response = interaction.response().unwrap();
        assert!(matches!(
            response.body().unwrap(),
            Value::Object(object) if object.get("id").is_some_and(Value::is_matcher)
                && object.get("tags").is_some_and(Value::is_matcher)
        ));
        assert_eq!(
            response.rules().header("content-type"),
            Some(&MatchingRule::any_type())
        );
    }

    #[test]
    fn test_schema_errors() {
        let missing_consumer = json!({"provider": {"name": "p"}, "interactions": []});
        assert!(matches!(
            from_json(&missing_consumer),
            Err(SerializationError::MissingField(f)) if f == "consumer"
        ));

        let no_interactions = json!({"consumer": {"name": "c"}, "provider": {"name": "p"}});
        assert!(matches!(
            from_json(&no_interactions),
            Err(SerializationError::MissingField(f)) if f == "interactions"
        ));

        let bad_version = json!({
            "consumer": {"name": "c"}, "provider": {"name": "p"}, "interactions": [],
            "metadata": {"pactSpecification": {"version": "4.0.0"}}
        });
        assert!(matches!(
            from_json(&bad_version),
            Err(SerializationError::UnsupportedVersion(v)) if v == "4.0.0"
        ));

        let bad_status = json!({
            "consumer": {"name": "c"}, "provider": {"name": "p"},
            "interactions": [{
                "description": "d",
                "request": {"method": "GET", "path": "/"},
                "response": {"status": "ok"}
            }]
        });
        assert!(matches!(
            from_json(&bad_status),
            Err(SerializationError::WrongType { field, .. }) if field == "interactions[0].response.status"
        ));

        assert!(matches!(
            deserialize(b"{not json"),
            Err(SerializationError::Json(_))
        ));
    }

    #[test]
    fn test_rule_errors() {
        assert!(matches!(
            rule_from_json(&json!({"match": "include", "value": "x"})),
            Err(SerializationError::UnknownRule(kind)) if kind == "include"
        ));
        assert!(matches!(
            rule_from_json(&json!({"match": "regex", "regex": "("})),
            Err(SerializationError::Rule(RuleError::InvalidRegex { .. }))
        ));
        assert!(matches!(
            rule_from_json(&json!({"match": "regex"})),
            Err(SerializationError::MissingField(_))
        ));
        assert!(matches!(
            split_flat_key("$.cookies.a"),
            Err(SerializationError::UnknownCategory(c)) if c == "cookies"
        ));
    }

    #[test]
    fn test_message_artifact() {
        let contract = ContractBuilder::new("MessageConsumer", "MessageProvider")
            .spec_version(SpecVersion::V3)
            .expects_to_receive("order created")
            .metadata_value("topic", "orders")
            .with_content(JsonObject::new().integer_type("id", 7))
            .build()
            .unwrap();
        let doc = to_json(&contract).unwrap();
        assert!(doc.get("interactions").is_none());
        let message = &doc["messages"][0];
        assert_eq!(message["contents"], json!({"id": 7}));
        assert_eq!(message["metaData"]["topic"], "orders");
        assert_eq!(
            message["matchingRules"]["body"]["$.id"]["matchers"][0],
            json!({"match": "type"})
        );

        let decoded = from_json(&doc).unwrap();
        assert_eq!(decoded, contract);
    }
}
