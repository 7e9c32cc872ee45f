//! Error types for Accord.
//!
//! Structural disagreement is never an error: it is reported as
//! [`Mismatch`](crate::matching::Mismatch) data. The types here cover the
//! failures no caller can recover from locally.

use std::time::Duration;

use crate::mock::VerificationReport;

/// Payload bytes could not be decoded into a value tree.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A matching rule could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("invalid path expression '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
    #[error("invalid date/time format '{0}'")]
    InvalidFormat(String),
    #[error("example '{example}' does not match '{pattern}'")]
    ExampleMismatch { example: String, pattern: String },
}

/// The contract builder was given an inconsistent interaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("interaction '{0}' has no request method")]
    MissingMethod(String),
    #[error("interaction '{0}' has no request path")]
    MissingPath(String),
    #[error("interaction '{0}' has an invalid status code {1}")]
    InvalidStatus(String, u16),
    #[error("a contract cannot mix HTTP interactions and messages")]
    MixedInteractionKinds,
    #[error("message contracts require specification version 3")]
    MessagesRequireV3,
    #[error("interaction '{interaction}': {source}")]
    Rule {
        interaction: String,
        #[source]
        source: RuleError,
    },
}

/// The contract artifact does not conform to the expected schema.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("artifact is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing field '{0}'")]
    MissingField(String),
    #[error("field '{field}' has the wrong type, expected {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("unsupported specification version '{0}'")]
    UnsupportedVersion(String),
    #[error("unknown matching rule '{0}'")]
    UnknownRule(String),
    #[error("unknown matching rule category '{0}'")]
    UnknownCategory(String),
    #[error("message contracts cannot be written as specification version 2")]
    MessagesRequireV3,
    #[error("artifact mixes HTTP interactions and messages")]
    MixedInteractionKinds,
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// The mock service failed to start or stop.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },
    #[error("mock service did not start listening within {0:?}")]
    StartupTimeout(Duration),
    #[error("mock service is already running")]
    AlreadyRunning,
    #[error("invalid mock service configuration: {0}")]
    Config(String),
}

/// Outcome of a scoped consumer test that did not pass.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerTestError {
    #[error(transparent)]
    Lifecycle(#[from] ServiceError),
    #[error("consumer test panicked: {0}")]
    Panicked(String),
    #[error("consumer test did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("contract verification failed: {0}")]
    Verification(VerificationReport),
}
