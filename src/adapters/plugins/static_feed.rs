//! Item source over pages supplied up front.
//!
//! Used by tests and demos. The page cursor is the index of the next page.
//! A failure can be injected at any page index to exercise partial ticks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::errors::SourceError;
use crate::domain::models::{Candidate, DedupState, PagePolicy, TriggerContext};
use crate::domain::ports::{ItemSource, PageCursor, SourcePage};

#[derive(Debug)]
pub struct StaticItemSource {
    name: String,
    pages: Mutex<Vec<Vec<Candidate>>>,
    fail_at: Mutex<Option<usize>>,
    calls: AtomicUsize,
    policy: Option<PagePolicy>,
}

impl StaticItemSource {
    pub fn new(name: impl Into<String>, pages: Vec<Vec<Candidate>>) -> Self {
        Self {
            name: name.into(),
            pages: Mutex::new(pages),
            fail_at: Mutex::new(None),
            calls: AtomicUsize::new(0),
            policy: None,
        }
    }

    /// Fail every fetch of page `index` (zero-based).
    pub fn failing_at(self, index: usize) -> Self {
        self.fail_at_page(Some(index));
        self
    }

    /// Report `policy` from [`ItemSource::page_policy`].
    pub fn with_policy(mut self, policy: PagePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Replace the pages served from the next fetch on.
    pub fn set_pages(&self, pages: Vec<Vec<Candidate>>) {
        *self.pages.lock().unwrap_or_else(PoisonError::into_inner) = pages;
    }

    /// Change or clear the injected failure.
    pub fn fail_at_page(&self, index: Option<usize>) {
        *self.fail_at.lock().unwrap_or_else(PoisonError::into_inner) = index;
    }

    /// Fetch attempts so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_fetch_count(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    fn page_index(cursor: Option<&PageCursor>) -> Result<usize, SourceError> {
        cursor.map_or(Ok(0), |c| {
            c.as_str()
                .parse()
                .map_err(|_| SourceError::InvalidConfig(format!("Bad page cursor '{}'", c.as_str())))
        })
    }
}

#[async_trait]
impl ItemSource for StaticItemSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_policy(&self) -> PagePolicy {
        self.policy.unwrap_or_default()
    }

    async fn fetch_page(
        &self,
        _ctx: &TriggerContext,
        _prior: Option<&DedupState>,
        cursor: Option<&PageCursor>,
    ) -> Result<SourcePage, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index = Self::page_index(cursor)?;

        if *self.fail_at.lock().unwrap_or_else(PoisonError::into_inner) == Some(index) {
            return Err(SourceError::Transient(format!(
                "{}: injected failure at page {index}",
                self.name
            )));
        }

        let pages = self.pages.lock().unwrap_or_else(PoisonError::into_inner);
        let candidates = pages.get(index).cloned().unwrap_or_default();
        if index + 1 < pages.len() {
            Ok(SourcePage::with_next(candidates, PageCursor::new((index + 1).to_string())))
        } else {
            Ok(SourcePage::last(candidates))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_serves_pages_in_order() {
        let source = StaticItemSource::new(
            "feed",
            vec![vec![Candidate::new("a", json!(1))], vec![Candidate::new("b", json!(2))]],
        );
        let ctx = TriggerContext::new("t");

        let first = source.fetch_page(&ctx, None, None).await.unwrap();
        assert_eq!(first.candidates[0].key, "a");
        let next = first.next_cursor.unwrap();

        let second = source.fetch_page(&ctx, None, Some(&next)).await.unwrap();
        assert_eq!(second.candidates[0].key, "b");
        assert!(second.next_cursor.is_none());
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure_can_be_cleared() {
        let source = StaticItemSource::new("feed", vec![vec![]]).failing_at(0);
        let ctx = TriggerContext::new("t");

        assert!(source.fetch_page(&ctx, None, None).await.unwrap_err().is_transient());
        source.fail_at_page(None);
        assert!(source.fetch_page(&ctx, None, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_no_pages_is_one_empty_final_page() {
        let source = StaticItemSource::new("empty", vec![]);
        let page = source.fetch_page(&TriggerContext::new("t"), None, None).await.unwrap();
        assert_eq!(page, SourcePage::default());
    }
}
