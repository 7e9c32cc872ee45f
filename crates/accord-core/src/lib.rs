//! Consumer-driven contract testing.
//!
//! A consumer declares the interactions it expects from a provider with the
//! [`dsl`] builder, exercises its client code against an in-process
//! [`mock`] service, and writes the resulting [`model::Contract`] out with
//! [`contract::serialize`] for the provider to verify later.

// ===== Data model =====
pub mod matchers;
pub mod model;
pub mod value;

// ===== Matching and construction =====
pub mod dsl;
pub mod matching;

// ===== Runtime =====
pub mod config;
pub mod contract;
pub mod logging;
pub mod mock;

pub mod error;

pub use config::MockServiceConfig;
pub use contract::{deserialize, serialize};
pub use dsl::{ContractBuilder, JsonArray, JsonObject};
pub use error::{
    BuildError, ConsumerTestError, DecodeError, RuleError, SerializationError, ServiceError,
};
pub use matchers::{MatcherRegistry, MatchingRule, PathExpr, RuleCategory};
pub use matching::{match_request, match_values, MatchResult, Mismatch, MismatchKind};
pub use mock::{run_consumer_test, run_message_test, MockServer, MockService, VerificationReport};
pub use model::{Contract, Interaction, SpecVersion};
pub use value::Value;
