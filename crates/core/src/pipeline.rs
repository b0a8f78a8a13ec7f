//! Pipeline lifecycle trait and the process-wide shutdown signal.
//!
//! # Lifecycle
//! ```text
//! Initialized -> start() -> Running -> stop() -> Stopped
//! ```
//!
//! Every unit (tailer, alert engine, stats engine, renderer) observes the same
//! [`PipelineControl`]. Once signaled it stays signaled; each loop checks it at
//! its iteration boundary and races it against any suspension point.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::HttpmonError;

/// Health of a pipeline as reported by [`Pipeline::health_check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// All units are running.
    Healthy,
    /// Running, but something needs attention.
    Degraded(String),
    /// Not running.
    Unhealthy(String),
}

impl HealthStatus {
    /// `true` for [`HealthStatus::Healthy`].
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// `true` for [`HealthStatus::Unhealthy`].
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

/// A set of concurrently running units with a start/stop lifecycle.
pub trait Pipeline: Send {
    /// Opens resources and spawns every unit.
    ///
    /// Startup failures (for example a missing log file) are returned here and
    /// nothing is left running.
    fn start(&mut self) -> impl Future<Output = Result<(), HttpmonError>> + Send;

    /// Signals shutdown and waits until every unit has exited.
    fn stop(&mut self) -> impl Future<Output = Result<(), HttpmonError>> + Send;

    /// Reports the current health.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// Process-wide shutdown signal.
///
/// Cloning yields another handle to the same signal. Signaling is idempotent
/// and can never be undone.
#[derive(Debug, Clone, Default)]
pub struct PipelineControl {
    token: CancellationToken,
}

impl PipelineControl {
    /// Creates an unsignaled control.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown of every unit sharing this control.
    pub fn signal(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("pipeline shutdown signaled");
        }
        self.token.cancel();
    }

    /// Non-blocking check used at loop iteration boundaries.
    pub fn is_signaled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been signaled.
    pub async fn signaled(&self) {
        self.token.cancelled().await;
    }
}
