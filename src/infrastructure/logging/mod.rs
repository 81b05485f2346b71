//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty stderr output
//! - Optional rolling JSON log files

pub mod logger;

pub use logger::{init_logging, parse_log_level, Logger};
