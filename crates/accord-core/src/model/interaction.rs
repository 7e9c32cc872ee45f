use std::collections::BTreeMap;

use bytes::Bytes;

use crate::matchers::MatcherRegistry;
use crate::matching::is_json_content_type;
use crate::value::Value;

/// Named precondition the provider must establish before an interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderState {
    pub name: String,
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ProviderState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_params(
        name: impl Into<String>,
        params: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

fn find_header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Expected HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestShape {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) query: BTreeMap<String, Vec<String>>,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) body: Option<Value>,
    pub(crate) rules: MatcherRegistry,
}

impl RequestShape {
    pub(crate) fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            rules: MatcherRegistry::new(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &BTreeMap<String, Vec<String>> {
        &self.query
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn rules(&self) -> &MatcherRegistry {
        &self.rules
    }
}

/// Canned HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseShape {
    pub(crate) status: u16,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) body: Option<Value>,
    pub(crate) rules: MatcherRegistry,
}

/// A response ready to be written to a socket.
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseShape {
    pub(crate) fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
            rules: MatcherRegistry::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn rules(&self) -> &MatcherRegistry {
        &self.rules
    }

    /// Reify the body and fill in a content type when none was declared.
    ///
    /// String bodies without a JSON content type are sent as plain text;
    /// everything else is sent as JSON.
    pub fn to_wire(&self) -> WireResponse {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let declared = self.header("content-type");

        let body = match &self.body {
            None => Bytes::new(),
            Some(body) => {
                let json = body.to_json();
                let as_text = matches!(json, serde_json::Value::String(_))
                    && !declared.is_some_and(is_json_content_type);
                if as_text {
                    if declared.is_none() {
                        headers.push((
                            "Content-Type".to_string(),
                            "text/plain; charset=UTF-8".to_string(),
                        ));
                    }
                    Bytes::from(body.as_text())
                } else {
                    if declared.is_none() {
                        headers.push((
                            "Content-Type".to_string(),
                            "application/json; charset=UTF-8".to_string(),
                        ));
                    }
                    Bytes::from(json.to_string())
                }
            }
        };

        WireResponse {
            status: self.status,
            headers,
            body,
        }
    }
}

/// Expected asynchronous message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageShape {
    pub(crate) metadata: BTreeMap<String, serde_json::Value>,
    pub(crate) contents: Option<Value>,
    pub(crate) rules: MatcherRegistry,
}

impl MessageShape {
    pub(crate) fn new() -> Self {
        Self {
            metadata: BTreeMap::new(),
            contents: None,
            rules: MatcherRegistry::new(),
        }
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn contents(&self) -> Option<&Value> {
        self.contents.as_ref()
    }

    pub fn rules(&self) -> &MatcherRegistry {
        &self.rules
    }

    /// Reified payload bytes: JSON for structured contents, raw text for strings.
    pub fn payload_bytes(&self) -> Bytes {
        match &self.contents {
            None => Bytes::new(),
            Some(contents) => match contents.to_json() {
                serde_json::Value::String(text) => Bytes::from(text),
                json => Bytes::from(json.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionKind {
    Http {
        request: RequestShape,
        response: ResponseShape,
    },
    Message(MessageShape),
}

/// One declared exchange. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub(crate) description: String,
    pub(crate) provider_states: Vec<ProviderState>,
    pub(crate) kind: InteractionKind,
}

impl Interaction {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn provider_states(&self) -> &[ProviderState] {
        &self.provider_states
    }

    pub fn kind(&self) -> &InteractionKind {
        &self.kind
    }

    pub fn is_message(&self) -> bool {
        matches!(self.kind, InteractionKind::Message(_))
    }

    pub fn request(&self) -> Option<&RequestShape> {
        match &self.kind {
            InteractionKind::Http { request, .. } => Some(request),
            InteractionKind::Message(_) => None,
        }
    }

    pub fn response(&self) -> Option<&ResponseShape> {
        match &self.kind {
            InteractionKind::Http { response, .. } => Some(response),
            InteractionKind::Message(_) => None,
        }
    }

    pub fn message(&self) -> Option<&MessageShape> {
        match &self.kind {
            InteractionKind::Message(message) => Some(message),
            InteractionKind::Http { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_response_gets_default_content_type() {
        let mut response = ResponseShape::new(200);
        response.body = Some(Value::from_json(json!({"responsetest": true, "version": "v3"})));
        let wire = response.to_wire();
        assert_eq!(wire.status, 200);
        assert_eq!(
            wire.headers,
            vec![(
                "Content-Type".to_string(),
                "application/json; charset=UTF-8".to_string()
            )]
        );
        let body: serde_json::Value = serde_json::from_slice(&wire.body).unwrap();
        assert_eq!(body, json!({"responsetest": true, "version": "v3"}));
    }

    #[test]
    fn test_declared_content_type_is_kept() {
        let mut response = ResponseShape::new(200);
        response
            .headers
            .insert("content-type".into(), "text/plain".into());
        response.body = Some(Value::from("hello"));
        let wire = response.to_wire();
        assert_eq!(wire.headers.len(), 1);
        assert_eq!(&wire.body[..], b"hello");
    }

    #[test]
    fn test_empty_response() {
        let wire = ResponseShape::new(204).to_wire();
        assert!(wire.body.is_empty());
        assert!(wire.headers.is_empty());
    }

    #[test]
    fn test_message_payload_bytes_reify_matchers() {
        use crate::matchers::MatchingRule;
        let mut message = MessageShape::new();
        message.contents = Some(Value::Array(vec![
            Value::matcher(MatchingRule::any_type(), Value::from(100.10)),
            Value::matcher(MatchingRule::any_type(), Value::from("Should be in an array")),
        ]));
        assert_eq!(
            &message.payload_bytes()[..],
            br#"[100.1,"Should be in an array"]"#
        );
    }
}
