use std::collections::BTreeMap;

use serde_json::json;

use crate::error::DecodeError;
use crate::matching::is_json_content_type;
use crate::value::Value;

/// Request body as decoded from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ActualBody {
    Empty,
    Json(Value),
    Text(String),
}

impl ActualBody {
    /// Decode body bytes according to the content type.
    ///
    /// A JSON content type with unparseable bytes is an error. Without a
    /// content type, bytes that parse as JSON are treated as JSON.
    pub fn decode(bytes: &[u8], content_type: Option<&str>) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Ok(ActualBody::Empty);
        }
        match content_type {
            Some(ct) if is_json_content_type(ct) => Ok(ActualBody::Json(Value::decode_json(bytes)?)),
            Some(_) => Ok(ActualBody::Text(decode_text(bytes)?)),
            None => match Value::decode_json(bytes) {
                Ok(value) => Ok(ActualBody::Json(value)),
                Err(_) => Ok(ActualBody::Text(decode_text(bytes)?)),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ActualBody::Empty)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ActualBody::Empty => serde_json::Value::Null,
            ActualBody::Json(value) => value.to_json(),
            ActualBody::Text(text) => serde_json::Value::String(text.clone()),
        }
    }
}

fn decode_text(bytes: &[u8]) -> Result<String, DecodeError> {
    Ok(std::str::from_utf8(bytes)?.to_string())
}

/// A request received by the mock service.
#[derive(Debug, Clone, PartialEq)]
pub struct ActualRequest {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, Vec<String>>,
    /// Lower-cased names; repeated headers are joined with `", "`.
    pub headers: BTreeMap<String, String>,
    pub body: ActualBody,
}

impl ActualRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: ActualBody::Empty,
        }
    }

    /// Build from raw request parts, decoding the body.
    pub fn from_parts<'a>(
        method: &str,
        path: &str,
        query: Option<&str>,
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
        body: &[u8],
    ) -> Result<Self, DecodeError> {
        let mut request = ActualRequest::new(method, path);
        request.query = query.map(parse_query).unwrap_or_default();
        for (name, value) in headers {
            request.add_header(name, value);
        }
        request.body = ActualBody::decode(body, request.header("content-type"))?;
        Ok(request)
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = parse_query(query);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn with_body(mut self, body: ActualBody) -> Self {
        self.body = body;
        self
    }

    fn add_header(&mut self, name: &str, value: &str) {
        self.headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// JSON form used in logs and mismatch responses.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "headers": self.headers,
            "body": self.body.to_json(),
        })
    }
}

/// Parse `a=1&b=2&a=3` into values grouped by name, keeping value order.
///
/// `+` decodes to a space; undecodable escapes are kept verbatim.
pub fn parse_query(query: &str) -> BTreeMap<String, Vec<String>> {
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(decode_component(name))
            .or_default()
            .push(decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

/// Inverse of [`parse_query`], names in sorted order.
pub fn encode_query(query: &BTreeMap<String, Vec<String>>) -> String {
    query
        .iter()
        .flat_map(|(name, values)| {
            values
                .iter()
                .map(move |value| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_groups_repeated_names() {
        let query = parse_query("tag=a&name=Jane+Doe&tag=b&flag&city=S%C3%A3o%20Paulo");
        assert_eq!(query["tag"], vec!["a", "b"]);
        assert_eq!(query["name"], vec!["Jane Doe"]);
        assert_eq!(query["flag"], vec![""]);
        assert_eq!(query["city"], vec!["São Paulo"]);
    }

    #[test]
    fn test_encode_query() {
        let query = parse_query("b=2&a=x y&a=z");
        assert_eq!(encode_query(&query), "a=x%20y&a=z&b=2");
        assert_eq!(parse_query(&encode_query(&query)), query);
    }

    #[test]
    fn test_headers_are_case_insensitive_and_joined() {
        let request = ActualRequest::from_parts(
            "GET",
            "/",
            None,
            [("Accept", "text/plain"), ("ACCEPT", "application/json")],
            b"",
        )
        .unwrap();
        assert_eq!(request.header("accept"), Some("text/plain, application/json"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_body_decoding_by_content_type() {
        let json = ActualBody::decode(br#"{"a":1}"#, Some("application/json")).unwrap();
        assert!(matches!(json, ActualBody::Json(_)));

        let text = ActualBody::decode(br#"{"a":1}"#, Some("text/plain")).unwrap();
        assert_eq!(text, ActualBody::Text(r#"{"a":1}"#.to_string()));

        let sniffed = ActualBody::decode(b"[1,2]", None).unwrap();
        assert!(matches!(sniffed, ActualBody::Json(_)));

        let plain = ActualBody::decode(b"hello", None).unwrap();
        assert_eq!(plain, ActualBody::Text("hello".to_string()));
    }

    #[test]
    fn test_malformed_json_body_is_an_error() {
        let result = ActualRequest::from_parts(
            "POST",
            "/items",
            None,
            [("Content-Type", "application/json")],
            b"{broken",
        );
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_invalid_utf8_text_body_is_an_error() {
        let bytes = b"caf\xe9 au lait";
        assert!(matches!(
            ActualBody::decode(bytes, Some("text/plain")),
            Err(DecodeError::InvalidUtf8(_))
        ));
        assert!(matches!(
            ActualBody::decode(bytes, Some("application/x-www-form-urlencoded")),
            Err(DecodeError::InvalidUtf8(_))
        ));
        assert!(matches!(
            ActualBody::decode(bytes, None),
            Err(DecodeError::InvalidUtf8(_))
        ));
    }
}
