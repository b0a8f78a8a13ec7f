//! # httpmon-core
//!
//! Shared building blocks for httpmon: the parsed [`LogEvent`], the
//! [`Pipeline`] lifecycle trait with its [`PipelineControl`] shutdown signal,
//! the error taxonomy, TOML configuration and metric names.

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;

// Errors
pub use error::{ConfigError, HttpmonError, PipelineError};

// Configuration
pub use config::HttpmonConfig;

// Events
pub use event::{LogEvent, StatusClass};

// Pipeline
pub use pipeline::{HealthStatus, Pipeline, PipelineControl};
