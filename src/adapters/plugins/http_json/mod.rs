//! Generic item source for JSON list endpoints.

pub mod config;
pub mod source;

pub use config::HttpSourceConfig;
pub use source::HttpJsonSource;
