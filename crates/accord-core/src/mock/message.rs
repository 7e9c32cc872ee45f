//! Direct delivery of expected messages to a message consumer.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};

use super::runner::panic_message;
use crate::model::{Contract, ProviderState};

/// One message as a consumer would receive it from the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePayload {
    pub description: String,
    pub provider_states: Vec<ProviderState>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub bytes: Bytes,
}

impl MessagePayload {
    /// Payload decoded as JSON, if it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.bytes).ok()
    }
}

/// Reified payloads of every message interaction, in declaration order.
pub fn message_payloads(contract: &Contract) -> Vec<MessagePayload> {
    contract
        .interactions()
        .iter()
        .filter_map(|interaction| {
            interaction.message().map(|message| MessagePayload {
                description: interaction.description().to_string(),
                provider_states: interaction.provider_states().to_vec(),
                metadata: message.metadata().clone(),
                bytes: message.payload_bytes(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageFailure {
    pub description: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageTestReport {
    pub delivered: usize,
    pub failures: Vec<MessageFailure>,
}

impl MessageTestReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for MessageTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} message(s) delivered, {} failed",
            self.delivered,
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n  {}: {}", failure.description, failure.error)?;
        }
        Ok(())
    }
}

/// Hand every message of `contract` to `handler`, collecting failures.
///
/// A handler error or panic fails that message only; delivery continues
/// with the next one.
pub fn run_message_test<F, E>(contract: &Contract, mut handler: F) -> MessageTestReport
where
    F: FnMut(&MessagePayload) -> Result<(), E>,
    E: fmt::Display,
{
    let mut report = MessageTestReport::default();
    for payload in message_payloads(contract) {
        report.delivered += 1;
        let outcome = catch_unwind(AssertUnwindSafe(|| handler(&payload)));
        let error = match outcome {
            Ok(Ok(())) => {
                debug!("Message '{}' accepted by consumer", payload.description);
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("consumer panicked: {}", panic_message(&*panic)),
        };
        warn!("Message '{}' rejected: {}", payload.description, error);
        report.failures.push(MessageFailure {
            description: payload.description,
            error,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{ContractBuilder, JsonObject};
    use crate::model::SpecVersion;
    use serde_json::json;

    fn events() -> Contract {
        ContractBuilder::new("MessageConsumer", "MessageProvider")
            .spec_version(SpecVersion::V3)
            .given("an order exists")
            .expects_to_receive("order created")
            .with_content(JsonObject::new().integer_type("id", 7).string_value("status", "NEW"))
            .expects_to_receive("order cancelled")
            .metadata_value("topic", "orders")
            .with_content(JsonObject::new().integer_type("id", 8))
            .build()
            .unwrap()
    }

    #[test]
    fn test_payloads_are_reified() {
        let payloads = message_payloads(&events());
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].description, "order created");
        assert_eq!(payloads[0].provider_states[0].name, "an order exists");
        assert_eq!(payloads[0].json(), Some(json!({"id": 7, "status": "NEW"})));
        assert_eq!(payloads[1].metadata["topic"], json!("orders"));
        assert!(payloads[1].provider_states.is_empty());
    }

    #[test]
    fn test_all_messages_accepted() {
        let mut seen = Vec::new();
        let report = run_message_test(&events(), |payload| -> Result<(), String> {
            seen.push(payload.description.clone());
            Ok(())
        });
        assert!(report.is_ok());
        assert_eq!(report.delivered, 2);
        assert_eq!(seen, vec!["order created", "order cancelled"]);
    }

    #[test]
    fn test_failures_are_collected_per_message() {
        let report = run_message_test(&events(), |payload| {
            let body = payload.json().ok_or("not json")?;
            if body["id"] == json!(8) {
                panic!("cannot cancel");
            }
            if body.get("status").is_some() {
                return Err("unexpected status field");
            }
            Ok(())
        });
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].error, "unexpected status field");
        assert_eq!(report.failures[1].error, "consumer panicked: cannot cancel");
        assert!(report.to_string().starts_with("2 message(s) delivered, 2 failed"));
    }
}
