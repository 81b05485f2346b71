//! Field mapping for [`HttpJsonSource`](super::HttpJsonSource).

use serde::{Deserialize, Serialize};

use crate::domain::errors::SourceError;

/// Where to find items, keys, timestamps and the next-page cursor in a
/// JSON response.
///
/// Field locations are JSON pointers (`/data/items`). A bare name such as
/// `id` is shorthand for the top-level pointer `/id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    pub url: String,

    /// Location of the item array in the response body. Empty means the
    /// body itself is the array.
    #[serde(default)]
    pub items_pointer: String,

    /// Location of the stable key within an item.
    #[serde(default = "default_key_field")]
    pub key_field: String,

    /// Location of the creation/update time within an item.
    #[serde(default)]
    pub timestamp_field: Option<String>,

    /// Location of the next-page cursor in the response body.
    #[serde(default)]
    pub cursor_field: Option<String>,

    /// Query parameter that carries the cursor on follow-up requests.
    #[serde(default = "default_cursor_param")]
    pub cursor_param: String,

    #[serde(default)]
    pub page_size_param: Option<String>,

    #[serde(default)]
    pub page_size: Option<u32>,

    /// Query parameter that receives the stored high-water-mark (epoch ms)
    /// so the server can filter.
    #[serde(default)]
    pub since_param: Option<String>,
}

fn default_key_field() -> String {
    "id".to_string()
}

fn default_cursor_param() -> String {
    "cursor".to_string()
}

impl HttpSourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            items_pointer: String::new(),
            key_field: default_key_field(),
            timestamp_field: None,
            cursor_field: None,
            cursor_param: default_cursor_param(),
            page_size_param: None,
            page_size: None,
            since_param: None,
        }
    }

    pub fn with_items_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.items_pointer = pointer.into();
        self
    }

    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }

    pub fn with_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = Some(field.into());
        self
    }

    pub fn with_cursor_field(mut self, field: impl Into<String>) -> Self {
        self.cursor_field = Some(field.into());
        self
    }

    pub fn with_page_size(mut self, param: impl Into<String>, size: u32) -> Self {
        self.page_size_param = Some(param.into());
        self.page_size = Some(size);
        self
    }

    pub fn with_since_param(mut self, param: impl Into<String>) -> Self {
        self.since_param = Some(param.into());
        self
    }

    /// Reject configurations that cannot produce a request or a key.
    pub fn validate(&self) -> Result<(), SourceError> {
        let url = reqwest::Url::parse(&self.url)
            .map_err(|e| SourceError::InvalidConfig(format!("Invalid url '{}': {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceError::InvalidConfig(format!(
                "Unsupported url scheme '{}'",
                url.scheme()
            )));
        }
        if self.key_field.trim().is_empty() {
            return Err(SourceError::InvalidConfig("key_field must not be empty".to_string()));
        }
        if self.cursor_param.trim().is_empty() {
            return Err(SourceError::InvalidConfig("cursor_param must not be empty".to_string()));
        }
        if self.page_size == Some(0) {
            return Err(SourceError::InvalidConfig("page_size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Turn a field name or pointer into a JSON pointer.
pub(crate) fn to_pointer(field: &str) -> String {
    let field = field.trim();
    if field.is_empty() || field.starts_with('/') {
        field.to_string()
    } else {
        // Escape per RFC 6901 so dotted or slashed names stay one segment.
        format!("/{}", field.replace('~', "~0").replace('/', "~1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_yaml() {
        let config: HttpSourceConfig = serde_yaml::from_str("url: https://api.example.com/pins").unwrap();
        assert_eq!(config.key_field, "id");
        assert_eq!(config.cursor_param, "cursor");
        assert!(config.items_pointer.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url_and_zero_page_size() {
        assert!(HttpSourceConfig::new("not a url").validate().is_err());
        assert!(HttpSourceConfig::new("ftp://example.com").validate().is_err());
        assert!(HttpSourceConfig::new("https://example.com")
            .with_page_size("limit", 0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_to_pointer() {
        assert_eq!(to_pointer("id"), "/id");
        assert_eq!(to_pointer("/meta/next"), "/meta/next");
        assert_eq!(to_pointer(""), "");
        assert_eq!(to_pointer("a/b"), "/a~1b");
    }
}
