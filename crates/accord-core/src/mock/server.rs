//! MockService - lifecycle of one in-process mock provider.
//!
//! One accept loop per service; each accepted connection is served by a
//! tracked task that handles a single exchange (keep-alive is disabled).

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::handler::{handle_request, ServiceState};
use super::log::{LogEntry, MatchLog, VerificationReport};
use crate::config::MockServiceConfig;
use crate::error::ServiceError;
use crate::model::Contract;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Stopped,
    Starting,
    Listening,
    Stopping,
}

struct Running {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    accept_task: JoinHandle<()>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

/// In-process stand-in for the provider, serving one contract.
pub struct MockService {
    state: Arc<ServiceState>,
    config: MockServiceConfig,
    status: ServiceStatus,
    running: Option<Running>,
}

impl MockService {
    pub fn new(contract: Arc<Contract>, config: MockServiceConfig) -> Self {
        Self {
            state: Arc::new(ServiceState {
                contract,
                log: Arc::new(MatchLog::new()),
            }),
            config,
            status: ServiceStatus::Stopped,
            running: None,
        }
    }

    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    /// Address while listening.
    pub fn addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    pub fn contract(&self) -> &Contract {
        &self.state.contract
    }

    /// Bind the listener and start accepting connections.
    pub async fn start(&mut self) -> Result<SocketAddr, ServiceError> {
        if self.running.is_some() {
            return Err(ServiceError::AlreadyRunning);
        }
        self.config
            .validate()
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        self.status = ServiceStatus::Starting;
        let bind_addr = self.config.bind_addr();
        let startup_timeout = self.config.startup_timeout();

        let listener = match tokio::time::timeout(startup_timeout, TcpListener::bind(&bind_addr)).await
        {
            Ok(Ok(listener)) => listener,
            Ok(Err(e)) => {
                self.status = ServiceStatus::Stopped;
                return Err(ServiceError::Bind {
                    addr: bind_addr,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                self.status = ServiceStatus::Stopped;
                return Err(ServiceError::StartupTimeout(startup_timeout));
            }
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.status = ServiceStatus::Stopped;
                return Err(ServiceError::Bind {
                    addr: bind_addr,
                    reason: e.to_string(),
                });
            }
        };

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        let state = Arc::clone(&self.state);
        let connections = tracker.clone();
        let connection_cancel = cancel.clone();

        let accept_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer)) => {
                                let state = Arc::clone(&state);
                                let cancel = connection_cancel.clone();
                                connections.spawn(async move {
                                    let io = TokioIo::new(stream);
                                    let service = service_fn(move |req| {
                                        handle_request(req, Arc::clone(&state))
                                    });
                                    let conn = http1::Builder::new()
                                        .keep_alive(false)
                                        .serve_connection(io, service);
                                    tokio::select! {
                                        result = conn => {
                                            if let Err(e) = result {
                                                debug!("Connection error from {}: {}", peer, e);
                                            }
                                        }
                                        _ = cancel.cancelled() => {
                                            debug!("Connection from {} aborted", peer);
                                        }
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Accept error on {}: {}", addr, e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Accept loop on {} shutting down", addr);
                        break;
                    }
                }
            }
        });

        self.running = Some(Running {
            addr,
            shutdown_tx,
            accept_task,
            tracker,
            cancel,
        });
        self.status = ServiceStatus::Listening;
        info!(
            "Mock service for '{}' -> '{}' listening on {}",
            self.state.contract.consumer(),
            self.state.contract.provider(),
            addr
        );
        Ok(addr)
    }

    /// Stop accepting, let in-flight exchanges finish within the grace period.
    ///
    /// Connections still open after the grace period are aborted. The
    /// listener is released before this returns. Stopping a stopped service
    /// is a no-op.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        self.status = ServiceStatus::Stopping;

        let _ = running.shutdown_tx.send(());
        if let Err(e) = running.accept_task.await {
            if !e.is_cancelled() {
                error!("Accept loop on {} failed: {}", running.addr, e);
            }
        }

        running.tracker.close();
        let grace = self.config.shutdown_grace();
        if tokio::time::timeout(grace, running.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                "Aborting {} connection(s) on {} still running after {:?} grace period",
                running.tracker.len(),
                running.addr,
                grace
            );
            running.cancel.cancel();
            running.tracker.wait().await;
        }

        self.status = ServiceStatus::Stopped;
        info!("Mock service on {} stopped", running.addr);
    }

    /// Snapshot of the received traffic, in arrival order.
    pub fn log(&self) -> Vec<LogEntry> {
        self.state.log.entries()
    }

    pub fn verify(&self) -> VerificationReport {
        VerificationReport::from_log(&self.state.contract, &self.state.log.entries())
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.accept_task.abort();
            running.cancel.cancel();
            running.tracker.close();
        }
    }
}
