//! httpmon library.
//!
//! Exposes the binary's modules for integration testing. In production,
//! `httpmon` is used as a binary (main.rs).

pub mod cli;
pub mod display;
pub mod logging;
pub mod metrics_server;
pub mod replay;
pub mod supervisor;
