//! In-process mock provider.
//!
//! [`MockService`] binds a listener, answers every request with the canned
//! response of the first interaction it matches, and records what happened
//! in a [`MatchLog`]. [`run_consumer_test`] wraps the start/run/stop/verify
//! lifecycle for a single test. Message contracts skip the socket entirely:
//! [`run_message_test`] hands each payload straight to the consumer.

mod handler;
mod log;
mod message;
mod runner;
mod server;

pub use handler::MISMATCH_HEADER;
pub use log::{
    LogEntry, MatchLog, MatchOutcome, UnmatchedInteraction, UnmatchedRequest, VerificationReport,
};
pub use message::{message_payloads, run_message_test, MessageFailure, MessagePayload, MessageTestReport};
pub use runner::{run_consumer_test, MockServer};
pub use server::{MockService, ServiceStatus};
