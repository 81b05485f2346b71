//! Item source integrations.
//!
//! Each plugin implements [`ItemSource`](crate::domain::ports::ItemSource)
//! for one kind of remote system.

pub mod http_json;
pub mod static_feed;

pub use http_json::{HttpJsonSource, HttpSourceConfig};
pub use static_feed::StaticItemSource;
