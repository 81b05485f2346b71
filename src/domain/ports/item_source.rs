//! Item source port.
//!
//! Each integration supplies one [`ItemSource`]. The engine treats it as an
//! opaque producer of candidate pages and never depends on concrete
//! integration types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::SourceError;
use crate::domain::models::{Candidate, DedupState, PagePolicy, TriggerContext};

/// Opaque continuation token returned by a source for its next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(cursor: impl Into<String>) -> Self {
        Self(cursor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePage {
    pub candidates: Vec<Candidate>,
    /// `None` when this is the final page.
    pub next_cursor: Option<PageCursor>,
}

impl SourcePage {
    /// A final page.
    pub fn last(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            next_cursor: None,
        }
    }

    /// A page followed by `next`.
    pub fn with_next(candidates: Vec<Candidate>, next: PageCursor) -> Self {
        Self {
            candidates,
            next_cursor: Some(next),
        }
    }
}

/// Port for integration-specific fetch logic.
///
/// Time-based sources should return pages newest-first: pagination stops
/// early once a page holds nothing newer than the stored high-water-mark.
/// Last-item sources are expected to return a bounded recent window; the
/// engine does not cap snapshot size.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Short integration name used in logs (e.g. "pinterest-pins").
    fn name(&self) -> &str;

    /// Page budget and pacing for this integration.
    fn page_policy(&self) -> PagePolicy {
        PagePolicy::default()
    }

    /// Fetch one page.
    ///
    /// `prior` is the persisted state, if any, so sources that support
    /// server-side filtering (e.g. a `since` parameter) can use it. `cursor`
    /// is `None` for the first page of a tick.
    async fn fetch_page(
        &self,
        ctx: &TriggerContext,
        prior: Option<&DedupState>,
        cursor: Option<&PageCursor>,
    ) -> Result<SourcePage, SourceError>;
}
