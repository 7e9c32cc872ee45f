//! Per-request handling: decode, match against the contract, respond, record.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::{debug, warn};

use super::log::{LogEntry, MatchLog, MatchOutcome};
use crate::matching::{match_request, MatchResult};
use crate::model::{ActualBody, ActualRequest, Contract, WireResponse};

/// Header marking synthetic mismatch responses.
pub const MISMATCH_HEADER: &str = "x-accord-mismatch";

const JSON_UTF8: &str = "application/json; charset=UTF-8";

/// State shared by every connection of one mock service.
#[derive(Debug)]
pub(crate) struct ServiceState {
    pub contract: Arc<Contract>,
    pub log: Arc<MatchLog>,
}

pub(crate) async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServiceState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let headers = headers.iter().map(|(k, v)| (k.as_str(), v.as_str()));
    let wire = match req.into_body().collect().await {
        Ok(collected) => respond(
            &state.contract,
            &state.log,
            &method,
            &path,
            query.as_deref(),
            headers,
            &collected.to_bytes(),
        ),
        Err(e) => reject_malformed(
            &state.log,
            &method,
            &path,
            query.as_deref(),
            headers,
            &[],
            &format!("failed to read request body: {e}"),
        ),
    };
    Ok(build_response(wire))
}

/// Decode and route one request; every outcome is recorded in the log.
pub(crate) fn respond<'a>(
    contract: &Contract,
    log: &MatchLog,
    method: &str,
    path: &str,
    query: Option<&str>,
    headers: impl IntoIterator<Item = (&'a str, &'a str)> + Clone,
    body: &[u8],
) -> WireResponse {
    match ActualRequest::from_parts(method, path, query, headers.clone(), body) {
        Ok(actual) => route(contract, log, actual),
        Err(e) => reject_malformed(log, method, path, query, headers, body, &e.to_string()),
    }
}

/// Answer 400 and log the exchange as malformed; it never reaches routing.
fn reject_malformed<'a>(
    log: &MatchLog,
    method: &str,
    path: &str,
    query: Option<&str>,
    headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    body: &[u8],
    error: &str,
) -> WireResponse {
    warn!("Malformed request body for {} {}: {}", method, path, error);
    let mut request = ActualRequest::from_parts(method, path, query, headers, &[])
        .unwrap_or_else(|_| ActualRequest::new(method, path));
    if !body.is_empty() {
        request.body = ActualBody::Text(String::from_utf8_lossy(body).into_owned());
    }
    let payload = json!({
        "error": "Malformed request body",
        "detail": error,
        "request": request.to_json(),
    });
    log.record(LogEntry {
        request,
        outcome: MatchOutcome::Malformed {
            error: error.to_string(),
        },
    });
    json_response(400, false, &payload)
}

/// First interaction (in declaration order) with zero mismatches wins.
fn route(contract: &Contract, log: &MatchLog, actual: ActualRequest) -> WireResponse {
    let mut closest: Option<(usize, MatchResult)> = None;

    for (index, interaction) in contract.http_interactions() {
        let (Some(expected), Some(response)) = (interaction.request(), interaction.response())
        else {
            continue;
        };
        let result = match_request(expected, &actual);
        if result.is_match() {
            debug!(
                "Matched {} {} to interaction '{}'",
                actual.method,
                actual.path,
                interaction.description()
            );
            log.record(LogEntry {
                request: actual,
                outcome: MatchOutcome::Matched { interaction: index },
            });
            return response.to_wire();
        }
        let closer = closest
            .as_ref()
            .map_or(true, |(_, best)| result.len() < best.len());
        if closer {
            closest = Some((index, result));
        }
    }

    warn!(
        "No interaction matched {} {} ({} candidates)",
        actual.method,
        actual.path,
        contract.http_interactions().count()
    );

    let closest_json = closest.as_ref().map(|(index, result)| {
        json!({
            "description": contract
                .interaction(*index)
                .map(|i| i.description())
                .unwrap_or_default(),
            "mismatches": result.mismatches,
        })
    });
    let payload = json!({
        "error": "No interaction matched the request",
        "request": actual.to_json(),
        "closest": closest_json,
    });

    let (closest, mismatches) = match closest {
        Some((index, result)) => (Some(index), result.mismatches),
        None => (None, Vec::new()),
    };
    log.record(LogEntry {
        request: actual,
        outcome: MatchOutcome::Unmatched {
            closest,
            mismatches,
        },
    });

    json_response(500, true, &payload)
}

fn json_response(status: u16, mismatch: bool, payload: &serde_json::Value) -> WireResponse {
    let mut headers = vec![("Content-Type".to_string(), JSON_UTF8.to_string())];
    if mismatch {
        headers.push((MISMATCH_HEADER.to_string(), "true".to_string()));
    }
    WireResponse {
        status,
        headers,
        body: Bytes::from(payload.to_string()),
    }
}

fn build_response(wire: WireResponse) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(wire.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in &wire.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(Full::new(wire.body)).unwrap_or_else(|_| {
        let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{ContractBuilder, JsonObject};
    use crate::model::SpecVersion;
    use tracing_test::traced_test;

    fn contract() -> Contract {
        ContractBuilder::new("c", "p")
            .spec_version(SpecVersion::V3)
            .upon_receiving("get root")
            .method("GET")
            .path("/")
            .will_respond_with()
            .status(200)
            .body(JsonObject::new().string_value("version", "v3"))
            .upon_receiving("create item")
            .method("POST")
            .path("/items")
            .body(JsonObject::new().string_type("name", "widget"))
            .will_respond_with()
            .status(201)
            .build()
            .unwrap()
    }

    fn no_headers() -> std::iter::Empty<(&'static str, &'static str)> {
        std::iter::empty()
    }

    #[test]
    fn test_matched_request_returns_canned_response() {
        let contract = contract();
        let log = MatchLog::new();
        let wire = respond(&contract, &log, "GET", "/", None, no_headers(), b"");
        assert_eq!(wire.status, 200);
        assert_eq!(&wire.body[..], br#"{"version":"v3"}"#);
        assert!(log.entries()[0].is_matched());
    }

    #[test]
    fn test_unmatched_request_reports_closest_interaction() {
        let contract = contract();
        let log = MatchLog::new();
        let wire = respond(
            &contract,
            &log,
            "POST",
            "/items",
            None,
            [("content-type", "application/json")],
            br#"{"name": 42}"#,
        );
        assert_eq!(wire.status, 500);
        assert!(wire
            .headers
            .iter()
            .any(|(k, v)| k == MISMATCH_HEADER && v == "true"));

        let body: serde_json::Value = serde_json::from_slice(&wire.body).unwrap();
        assert_eq!(body["closest"]["description"], "create item");
        assert_eq!(body["closest"]["mismatches"][0]["path"], "$.body.name");
        assert_eq!(body["closest"]["mismatches"][0]["reason"], "type mismatch");
        assert_eq!(body["request"]["path"], "/items");

        match &log.entries()[0].outcome {
            MatchOutcome::Unmatched { closest, mismatches } => {
                assert_eq!(*closest, Some(1));
                assert_eq!(mismatches.len(), 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    #[traced_test]
    fn test_unmatched_request_is_logged() {
        let contract = contract();
        let log = MatchLog::new();
        let wire = respond(&contract, &log, "DELETE", "/nowhere", None, no_headers(), b"");
        assert_eq!(wire.status, 500);
        assert!(logs_contain("No interaction matched DELETE /nowhere (2 candidates)"));
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let contract = contract();
        let log = MatchLog::new();
        let wire = respond(
            &contract,
            &log,
            "POST",
            "/items",
            None,
            [("content-type", "application/json")],
            b"{oops",
        );
        assert_eq!(wire.status, 400);
        let body: serde_json::Value = serde_json::from_slice(&wire.body).unwrap();
        assert_eq!(body["error"], "Malformed request body");
        assert!(matches!(
            log.entries()[0].outcome,
            MatchOutcome::Malformed { .. }
        ));
    }

    #[test]
    fn test_build_response_copies_headers() {
        let response = build_response(WireResponse {
            status: 201,
            headers: vec![("X-Test".to_string(), "yes".to_string())],
            body: Bytes::from_static(b"ok"),
        });
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-test"], "yes");
    }
}
