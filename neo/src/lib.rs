//! NEO - The Orchestrator
//!
//! Drives the trap block by block: pulls each block from the chain data
//! source, appends it to the correlation window it owns, asks ORACLE for a
//! verdict and hands any alert to the configured sink.
//!
//! # Responsibilities
//! - Own the correlation window and its retention
//! - Log and count chain data source failures
//! - Scan block ranges or follow the chain head
//! - Route alerts out of the process

pub mod demo;
pub mod monitor;

use thiserror::Error;

pub use monitor::{Monitor, ScanReport};

/// NEO errors
#[derive(Error, Debug)]
pub enum NeoError {
    #[error("Config error: {0}")]
    Config(#[from] trap_config::ConfigError),

    #[error("Window error: {0}")]
    Window(#[from] oracle::WindowError),

    #[error("Source error: {0}")]
    Source(#[from] morpheus::SourceError),

    #[error("Alert sink closed: {0}")]
    AlertSink(String),
}

/// Monitor status
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorStatus {
    Starting,
    Running,
    Stopped,
    Failed(String),
}
