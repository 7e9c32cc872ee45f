//! Scoped consumer test: start, run, always stop, then verify.

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};

use super::log::VerificationReport;
use super::server::MockService;
use crate::config::MockServiceConfig;
use crate::error::ConsumerTestError;
use crate::model::Contract;

/// Handle given to the consumer code under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockServer {
    addr: SocketAddr,
}

impl MockServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:41235`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.url(), path)
        } else {
            format!("{}/{}", self.url(), path)
        }
    }
}

/// Run `test` against a fresh mock service for `contract`.
///
/// The service is stopped on every exit path, including a panic inside
/// `test` and the optional `test_timeout`. The report is returned when
/// every interaction was exercised and no unexpected request arrived.
pub async fn run_consumer_test<F, Fut>(
    contract: Arc<Contract>,
    config: MockServiceConfig,
    test: F,
) -> Result<VerificationReport, ConsumerTestError>
where
    F: FnOnce(MockServer) -> Fut,
    Fut: Future<Output = ()>,
{
    let test_timeout = config.test_timeout();
    let mut service = MockService::new(contract, config);
    let addr = service.start().await?;
    let server = MockServer { addr };

    let run = AssertUnwindSafe(async move { test(server).await }).catch_unwind();
    let outcome = match test_timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(result) => result.map_err(|panic| ConsumerTestError::Panicked(panic_message(&*panic))),
            Err(_) => Err(ConsumerTestError::TimedOut(limit)),
        },
        None => run
            .await
            .map_err(|panic| ConsumerTestError::Panicked(panic_message(&*panic))),
    };

    service.stop().await;
    outcome?;

    let report = service.verify();
    if report.is_ok() {
        info!("Consumer test passed: {}", report);
        Ok(report)
    } else {
        warn!("Consumer test failed verification: {}", report);
        Err(ConsumerTestError::Verification(report))
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
