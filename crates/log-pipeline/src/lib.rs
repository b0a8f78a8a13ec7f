//! # httpmon-log-pipeline
//!
//! Follows an HTTP access log and keeps two independent views of its traffic.
//!
//! # Modules
//!
//! - [`collector`]: file tailer that parses appended lines and fans events out
//! - [`parser`]: CSV access-log line parser
//! - [`alert`]: sliding-window high-traffic alerting
//! - [`stats`]: fixed-interval hit, byte, section and status-class statistics
//! - [`snapshot`]: lock-free snapshot hand-off to readers
//! - [`pipeline`]: wiring of the above behind the core `Pipeline` trait
//! - [`config`]: pipeline settings derived from the core configuration
//! - [`error`]: domain error type
//!
//! # Architecture
//!
//! ```text
//! access.log -> FileTailer -+-> AlertEngine -> AlertSnapshot -+
//!                           |                                 +-> renderer
//!                           +-> StatsEngine -> StatsSnapshot -+
//! ```

pub mod alert;
pub mod collector;
pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod snapshot;
pub mod stats;

// Pipeline
pub use pipeline::{MonitorPipeline, MonitorPipelineBuilder};

// Configuration
pub use config::{PipelineConfig, PipelineConfigBuilder};

// Errors
pub use error::LogPipelineError;

// Parser
pub use parser::AccessLogParser;

// Tailer
pub use collector::{FileTailer, TailerSummary};

// Consumers
pub use alert::{AlertEngine, AlertSnapshot, AlertTransition, AlertWindow, TransitionKind};
pub use stats::{IntervalStats, SectionStat, StatsEngine, StatsSnapshot, StatsWindow};

// Snapshots
pub use snapshot::SnapshotCell;
