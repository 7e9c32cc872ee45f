//! Fluent construction of contracts.
//!
//! ```
//! use accord_core::dsl::{ContractBuilder, JsonObject};
//! use accord_core::model::SpecVersion;
//!
//! let contract = ContractBuilder::new("consumer", "provider")
//!     .spec_version(SpecVersion::V3)
//!     .given("an account exists")
//!     .upon_receiving("a request for the account")
//!     .method("GET")
//!     .path("/accounts/1")
//!     .will_respond_with()
//!     .status(200)
//!     .body(JsonObject::new().integer_type("id", 1).string_type("owner", "Jane"))
//!     .build()
//!     .unwrap();
//! assert_eq!(contract.interactions().len(), 1);
//! ```

mod body;
mod datetime;

use std::collections::BTreeMap;

pub use body::{Body, JsonArray, JsonObject};
pub use datetime::format_to_regex;

use body::checked_regex;
use crate::error::{BuildError, RuleError};
use crate::matchers::{MatcherRegistry, PathExpr, RuleCategory};
use crate::model::{
    parse_query, Contract, Interaction, InteractionKind, MessageShape, ProviderState,
    RequestShape, ResponseShape, SpecVersion,
};
use crate::value::Value;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Entry point of the DSL; accumulates finished interactions.
#[derive(Debug, Clone)]
pub struct ContractBuilder {
    consumer: String,
    provider: String,
    spec_version: SpecVersion,
    interactions: Vec<Interaction>,
    pending_states: Vec<ProviderState>,
    error: Option<BuildError>,
}

impl ContractBuilder {
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            spec_version: SpecVersion::default(),
            interactions: Vec::new(),
            pending_states: Vec::new(),
            error: None,
        }
    }

    pub fn spec_version(mut self, version: SpecVersion) -> Self {
        self.spec_version = version;
        self
    }

    /// Provider state for the next interaction. Repeatable.
    pub fn given(mut self, state: impl Into<String>) -> Self {
        self.pending_states.push(ProviderState::new(state));
        self
    }

    /// Provider state with parameters; non-object `params` are ignored.
    pub fn given_with_params(mut self, state: impl Into<String>, params: serde_json::Value) -> Self {
        let params = match params {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        self.pending_states
            .push(ProviderState::with_params(state, params));
        self
    }

    pub fn upon_receiving(mut self, description: impl Into<String>) -> RequestBuilder {
        let provider_states = std::mem::take(&mut self.pending_states);
        RequestBuilder {
            contract: self,
            description: description.into(),
            provider_states,
            method: None,
            path: None,
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            rules: MatcherRegistry::new(),
            error: None,
        }
    }

    pub fn expects_to_receive(mut self, description: impl Into<String>) -> MessageBuilder {
        let provider_states = std::mem::take(&mut self.pending_states);
        MessageBuilder {
            contract: self,
            description: description.into(),
            provider_states,
            message: MessageShape::new(),
            error: None,
        }
    }

    fn fail(&mut self, error: BuildError) {
        self.error.get_or_insert(error);
    }

    fn push(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    pub fn build(self) -> Result<Contract, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let messages = self.interactions.iter().filter(|i| i.is_message()).count();
        if messages > 0 && messages < self.interactions.len() {
            return Err(BuildError::MixedInteractionKinds);
        }
        if messages > 0 && self.spec_version == SpecVersion::V2 {
            return Err(BuildError::MessagesRequireV3);
        }
        tracing::debug!(
            consumer = %self.consumer,
            provider = %self.provider,
            interactions = self.interactions.len(),
            "Built contract"
        );
        Ok(Contract {
            consumer: self.consumer,
            provider: self.provider,
            spec_version: self.spec_version,
            interactions: self.interactions,
        })
    }
}

/// Registers a body and its placeholder rules, keeping the first error.
fn attach_body(
    body: Body,
    rules: &mut MatcherRegistry,
    category: RuleCategory,
    error: &mut Option<RuleError>,
) -> Value {
    for (path, rule) in body.rules() {
        rules.add_path(category, path, rule);
    }
    if let Some(e) = body.error {
        error.get_or_insert(e);
    }
    body.value
}

/// Expected request of an HTTP interaction.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    contract: ContractBuilder,
    description: String,
    provider_states: Vec<ProviderState>,
    method: Option<String>,
    path: Option<String>,
    query: BTreeMap<String, Vec<String>>,
    headers: BTreeMap<String, String>,
    body: Option<Value>,
    rules: MatcherRegistry,
    error: Option<RuleError>,
}

impl RequestBuilder {
    pub fn method(mut self, method: &str) -> Self {
        self.method = Some(method.to_ascii_uppercase());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Path matched by regex; `example` is what gets recorded and sent.
    pub fn matching_path(mut self, regex: &str, example: &str) -> Self {
        match checked_regex(regex, example) {
            Ok(rule) => {
                self.rules.add_path(RuleCategory::Path, PathExpr::root(), rule);
            }
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self.path = Some(example.to_string());
        self
    }

    pub fn query_param(mut self, name: &str, value: &str) -> Self {
        self.query
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Add every parameter of an encoded query string.
    pub fn query(mut self, query: &str) -> Self {
        for (name, values) in parse_query(query) {
            self.query.entry(name).or_default().extend(values);
        }
        self
    }

    pub fn matching_query(mut self, name: &str, regex: &str, example: &str) -> Self {
        match checked_regex(regex, example) {
            Ok(rule) => self.rules.add_named(RuleCategory::Query, name, rule),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self.query_param(name, example)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn headers<'a>(mut self, headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn matching_header(mut self, name: &str, regex: &str, example: &str) -> Self {
        match checked_regex(regex, example) {
            Ok(rule) => self.rules.add_named(RuleCategory::Header, name, rule),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self.header(name, example)
    }

    /// Structured bodies add a JSON content type unless one is declared.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        let body = body.into();
        if body.is_structured() && !has_header(&self.headers, "content-type") {
            self.headers
                .insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        }
        self.body = Some(attach_body(
            body,
            &mut self.rules,
            RuleCategory::Body,
            &mut self.error,
        ));
        self
    }

    pub fn will_respond_with(self) -> ResponseBuilder {
        ResponseBuilder {
            request: self,
            status: 200,
            headers: BTreeMap::new(),
            body: None,
            rules: MatcherRegistry::new(),
            error: None,
        }
    }
}

fn has_header(headers: &BTreeMap<String, String>, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

/// Canned response of an HTTP interaction.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    request: RequestBuilder,
    status: u16,
    headers: BTreeMap<String, String>,
    body: Option<Value>,
    rules: MatcherRegistry,
    error: Option<RuleError>,
}

impl ResponseBuilder {
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn headers<'a>(mut self, headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn matching_header(mut self, name: &str, regex: &str, example: &str) -> Self {
        match checked_regex(regex, example) {
            Ok(rule) => self.rules.add_named(RuleCategory::Header, name, rule),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self.header(name, example)
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        let body = body.into();
        if body.is_structured() && !has_header(&self.headers, "content-type") {
            self.headers
                .insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        }
        self.body = Some(attach_body(
            body,
            &mut self.rules,
            RuleCategory::Body,
            &mut self.error,
        ));
        self
    }

    /// Close this interaction and return to the contract.
    fn finish(self) -> ContractBuilder {
        let ResponseBuilder {
            request,
            status,
            headers,
            body,
            rules,
            error,
        } = self;
        let mut contract = request.contract;
        let description = request.description;
        let provider_states = request.provider_states;

        if let Some(source) = request.error.or(error) {
            contract.fail(BuildError::Rule {
                interaction: description,
                source,
            });
            return contract;
        }
        let Some(method) = request.method else {
            contract.fail(BuildError::MissingMethod(description));
            return contract;
        };
        let Some(path) = request.path else {
            contract.fail(BuildError::MissingPath(description));
            return contract;
        };
        if !(100..=599).contains(&status) {
            contract.fail(BuildError::InvalidStatus(description, status));
            return contract;
        }

        let request = RequestShape {
            method,
            path,
            query: request.query,
            headers: request.headers,
            body: request.body,
            rules: request.rules,
        };
        let response = ResponseShape {
            status,
            headers,
            body,
            rules,
        };
        contract.push(Interaction {
            description,
            provider_states,
            kind: InteractionKind::Http { request, response },
        });
        contract
    }

    pub fn given(self, state: impl Into<String>) -> ContractBuilder {
        self.finish().given(state)
    }

    pub fn given_with_params(self, state: impl Into<String>, params: serde_json::Value) -> ContractBuilder {
        self.finish().given_with_params(state, params)
    }

    pub fn upon_receiving(self, description: impl Into<String>) -> RequestBuilder {
        self.finish().upon_receiving(description)
    }

    pub fn expects_to_receive(self, description: impl Into<String>) -> MessageBuilder {
        self.finish().expects_to_receive(description)
    }

    pub fn build(self) -> Result<Contract, BuildError> {
        self.finish().build()
    }
}

/// Expected asynchronous message.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    contract: ContractBuilder,
    description: String,
    provider_states: Vec<ProviderState>,
    message: MessageShape,
    error: Option<RuleError>,
}

impl MessageBuilder {
    pub fn with_metadata<K, V>(mut self, metadata: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        for (key, value) in metadata {
            self.message.metadata.insert(key.into(), value.into());
        }
        self
    }

    pub fn metadata_value(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.message.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn matching_metadata(mut self, key: &str, regex: &str, example: &str) -> Self {
        match checked_regex(regex, example) {
            Ok(rule) => self
                .message
                .rules
                .add_named(RuleCategory::Metadata, key, rule),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self.metadata_value(key, example)
    }

    pub fn with_content(mut self, body: impl Into<Body>) -> Self {
        let body = body.into();
        if body.is_structured() && !self.message.metadata.contains_key("contentType") {
            self.message
                .metadata
                .insert("contentType".to_string(), JSON_CONTENT_TYPE.into());
        }
        self.message.contents = Some(attach_body(
            body,
            &mut self.message.rules,
            RuleCategory::Body,
            &mut self.error,
        ));
        self
    }

    fn finish(self) -> ContractBuilder {
        let mut contract = self.contract;
        if let Some(source) = self.error {
            contract.fail(BuildError::Rule {
                interaction: self.description,
                source,
            });
            return contract;
        }
        contract.push(Interaction {
            description: self.description,
            provider_states: self.provider_states,
            kind: InteractionKind::Message(self.message),
        });
        contract
    }

    pub fn given(self, state: impl Into<String>) -> ContractBuilder {
        self.finish().given(state)
    }

    pub fn expects_to_receive(self, description: impl Into<String>) -> MessageBuilder {
        self.finish().expects_to_receive(description)
    }

    pub fn upon_receiving(self, description: impl Into<String>) -> RequestBuilder {
        self.finish().upon_receiving(description)
    }

    pub fn build(self) -> Result<Contract, BuildError> {
        self.finish().build()
    }
}
