//! Ordered record of the traffic a mock service received.

use std::collections::BTreeSet;
use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

use crate::matching::Mismatch;
use crate::model::{ActualRequest, Contract};

/// What happened to one received request.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched {
        interaction: usize,
    },
    Unmatched {
        closest: Option<usize>,
        mismatches: Vec<Mismatch>,
    },
    Malformed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub request: ActualRequest,
    pub outcome: MatchOutcome,
}

impl LogEntry {
    pub fn is_matched(&self) -> bool {
        matches!(self.outcome, MatchOutcome::Matched { .. })
    }
}

/// Append-only log shared by all connection handlers of one service.
#[derive(Debug, Default)]
pub struct MatchLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: LogEntry) {
        self.entries.lock().push(entry);
    }

    /// Snapshot in arrival order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// A declared HTTP interaction no request matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedInteraction {
    pub index: usize,
    pub description: String,
}

/// A received request no interaction matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedRequest {
    pub method: String,
    pub path: String,
    pub request: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Mismatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of checking the log against the contract after a test.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationReport {
    pub matched_requests: usize,
    pub unmatched_interactions: Vec<UnmatchedInteraction>,
    pub unmatched_requests: Vec<UnmatchedRequest>,
}

impl VerificationReport {
    pub fn from_log(contract: &Contract, entries: &[LogEntry]) -> Self {
        let mut matched = BTreeSet::new();
        let mut report = VerificationReport::default();

        for entry in entries {
            let describe = |index: Option<usize>| {
                index
                    .and_then(|i| contract.interaction(i))
                    .map(|i| i.description().to_string())
            };
            match &entry.outcome {
                MatchOutcome::Matched { interaction } => {
                    matched.insert(*interaction);
                    report.matched_requests += 1;
                }
                MatchOutcome::Unmatched {
                    closest,
                    mismatches,
                } => report.unmatched_requests.push(UnmatchedRequest {
                    method: entry.request.method.clone(),
                    path: entry.request.path.clone(),
                    request: entry.request.to_json(),
                    closest: describe(*closest),
                    mismatches: mismatches.clone(),
                    error: None,
                }),
                MatchOutcome::Malformed { error } => {
                    report.unmatched_requests.push(UnmatchedRequest {
                        method: entry.request.method.clone(),
                        path: entry.request.path.clone(),
                        request: entry.request.to_json(),
                        closest: None,
                        mismatches: Vec::new(),
                        error: Some(error.clone()),
                    })
                }
            }
        }

        report.unmatched_interactions = contract
            .http_interactions()
            .filter(|(index, _)| !matched.contains(index))
            .map(|(index, interaction)| UnmatchedInteraction {
                index,
                description: interaction.description().to_string(),
            })
            .collect();

        report
    }

    pub fn is_ok(&self) -> bool {
        self.unmatched_interactions.is_empty() && self.unmatched_requests.is_empty()
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "{} request(s) matched", self.matched_requests);
        }
        write!(
            f,
            "{} unmatched interaction(s), {} unmatched request(s)",
            self.unmatched_interactions.len(),
            self.unmatched_requests.len()
        )?;
        for interaction in &self.unmatched_interactions {
            write!(f, "\n  never received: {}", interaction.description)?;
        }
        for request in &self.unmatched_requests {
            write!(f, "\n  unexpected: {} {}", request.method, request.path)?;
            if let Some(error) = &request.error {
                write!(f, " ({error})")?;
            }
            if let Some(closest) = &request.closest {
                write!(f, "\n    closest interaction: {closest}")?;
            }
            for mismatch in &request.mismatches {
                write!(f, "\n    {mismatch}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::ContractBuilder;
    use crate::matchers::PathExpr;
    use crate::matching::MismatchKind;

    fn two_interactions() -> Contract {
        ContractBuilder::new("c", "p")
            .upon_receiving("first")
            .method("GET")
            .path("/one")
            .will_respond_with()
            .upon_receiving("second")
            .method("GET")
            .path("/two")
            .will_respond_with()
            .build()
            .unwrap()
    }

    #[test]
    fn test_all_matched() {
        let contract = two_interactions();
        let log = MatchLog::new();
        for (index, path) in [(0, "/one"), (1, "/two"), (0, "/one")] {
            log.record(LogEntry {
                request: ActualRequest::new("GET", path),
                outcome: MatchOutcome::Matched { interaction: index },
            });
        }
        let report = VerificationReport::from_log(&contract, &log.entries());
        assert!(report.is_ok());
        assert_eq!(report.matched_requests, 3);
        assert_eq!(report.to_string(), "3 request(s) matched");
    }

    #[test]
    fn test_unmatched_interactions_and_requests_are_separate() {
        let contract = two_interactions();
        let log = MatchLog::new();
        log.record(LogEntry {
            request: ActualRequest::new("GET", "/one"),
            outcome: MatchOutcome::Matched { interaction: 0 },
        });
        log.record(LogEntry {
            request: ActualRequest::new("GET", "/three"),
            outcome: MatchOutcome::Unmatched {
                closest: Some(1),
                mismatches: vec![Mismatch::new(
                    PathExpr::root().field("path"),
                    MismatchKind::ValueMismatch,
                    "\"/two\"",
                    "\"/three\"",
                )],
            },
        });
        log.record(LogEntry {
            request: ActualRequest::new("POST", "/one"),
            outcome: MatchOutcome::Malformed {
                error: "body is not valid JSON".to_string(),
            },
        });

        let report = VerificationReport::from_log(&contract, &log.entries());
        assert!(!report.is_ok());
        assert_eq!(
            report.unmatched_interactions,
            vec![UnmatchedInteraction {
                index: 1,
                description: "second".to_string()
            }]
        );
        assert_eq!(report.unmatched_requests.len(), 2);
        assert_eq!(report.unmatched_requests[0].closest.as_deref(), Some("second"));
        assert!(report.unmatched_requests[1].error.is_some());

        let text = report.to_string();
        assert!(text.starts_with("1 unmatched interaction(s), 2 unmatched request(s)"));
        assert!(text.contains("never received: second"));
        assert!(text.contains("$.path: value mismatch"));
    }
}
