//! HTTP client that turns a JSON list endpoint into candidate pages.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::config::{to_pointer, HttpSourceConfig};
use crate::domain::errors::SourceError;
use crate::domain::models::{Candidate, DedupState, PagePolicy, TriggerContext};
use crate::domain::ports::{ItemSource, PageCursor, SourcePage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("pollgate/", env!("CARGO_PKG_VERSION"));

/// [`ItemSource`] for JSON endpoints described by a [`HttpSourceConfig`].
///
/// Sends the bearer token from the trigger's [`AuthCredentials`] when one
/// is present.
///
/// [`AuthCredentials`]: crate::domain::models::AuthCredentials
#[derive(Debug, Clone)]
pub struct HttpJsonSource {
    name: String,
    http: Client,
    config: HttpSourceConfig,
    policy: PagePolicy,
}

impl HttpJsonSource {
    pub fn new(name: impl Into<String>, config: HttpSourceConfig) -> Result<Self, SourceError> {
        config.validate()?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            http,
            config,
            policy: PagePolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: PagePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn query(&self, prior: Option<&DedupState>, cursor: Option<&PageCursor>) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let (Some(param), Some(size)) = (&self.config.page_size_param, self.config.page_size) {
            query.push((param.clone(), size.to_string()));
        }
        if let Some(param) = &self.config.since_param {
            if let Some(state) = prior.and_then(DedupState::as_timebased) {
                if state.last_fetch_epoch_ms > i64::MIN {
                    query.push((param.clone(), state.last_fetch_epoch_ms.to_string()));
                }
            }
        }
        if let Some(cursor) = cursor {
            query.push((self.config.cursor_param.clone(), cursor.as_str().to_string()));
        }
        query
    }

    /// Map a response body to a page.
    pub fn parse_page(&self, body: &Value) -> Result<SourcePage, SourceError> {
        let items_pointer = to_pointer(&self.config.items_pointer);
        let items = body
            .pointer(&items_pointer)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SourceError::Decode(format!("No item array at '{}'", self.config.items_pointer))
            })?;

        let key_pointer = to_pointer(&self.config.key_field);
        let ts_pointer = self.config.timestamp_field.as_deref().map(to_pointer);

        let mut candidates = Vec::with_capacity(items.len());
        for item in items {
            let Some(key) = item.pointer(&key_pointer).and_then(scalar_to_string) else {
                tracing::warn!(
                    source = %self.name,
                    key_field = %self.config.key_field,
                    "Skipping item without a key"
                );
                continue;
            };
            let mut candidate = Candidate::new(key, item.clone());
            if let Some(ts) = ts_pointer
                .as_deref()
                .and_then(|p| item.pointer(p))
                .and_then(parse_timestamp_ms)
            {
                candidate = candidate.with_timestamp_ms(ts);
            }
            candidates.push(candidate);
        }

        let next_cursor = self
            .config
            .cursor_field
            .as_deref()
            .and_then(|field| body.pointer(&to_pointer(field)))
            .and_then(scalar_to_string)
            .map(PageCursor::new);

        Ok(SourcePage {
            candidates,
            next_cursor,
        })
    }
}

#[async_trait]
impl ItemSource for HttpJsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_policy(&self) -> PagePolicy {
        self.policy
    }

    async fn fetch_page(
        &self,
        ctx: &TriggerContext,
        prior: Option<&DedupState>,
        cursor: Option<&PageCursor>,
    ) -> Result<SourcePage, SourceError> {
        let mut request = self
            .http
            .get(&self.config.url)
            .header("Accept", "application/json")
            .query(&self.query(prior, cursor));
        if let Some(token) = ctx.auth.token() {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| SourceError::Transient(format!("{} request failed: {e}", self.name)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                return Err(SourceError::Transient(format!("{} returned {status}", self.name)));
            }
            return Err(SourceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(format!("{} response: {e}", self.name)))?;
        self.parse_page(&body)
    }
}

/// Non-empty string or number rendered as a string.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Epoch milliseconds from an integer, a numeric string, or an RFC 3339
/// string.
pub fn parse_timestamp_ms(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp_millis())),
        _ => None,
    }
}
