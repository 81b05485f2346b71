//! Lifecycle orchestration for polling triggers.
//!
//! [`TriggerLifecycle`] wires one item source, one state store and the dedup
//! engine into the four operations a scheduler invokes: `on_enable`,
//! `on_disable`, `test` and `poll`.
//!
//! State is written at most once per operation, after everything for the
//! tick has been fetched and deduplicated. A process killed mid-tick has
//! persisted nothing for that tick and resumes from the last written state.
//! The caller must not run two polls for the same instance concurrently.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::domain::errors::{TriggerError, TriggerResult};
use crate::domain::models::{
    DedupState, DedupStrategy, PollOutcome, PollStats, StopReason, TriggerContext,
    TriggerStatus,
};
use crate::domain::ports::{Clock, EmitSink, ItemSource, StateStore, SystemClock};
use crate::services::dedup_engine;
use crate::services::page_controller::{PageController, PageRun};

/// Runs the trigger lifecycle for instances of one trigger definition.
///
/// The strategy is fixed per definition. Any number of instances may share
/// a lifecycle; they are distinguished by [`TriggerContext::instance`].
pub struct TriggerLifecycle {
    strategy: DedupStrategy,
    source: Arc<dyn ItemSource>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    pages: PageController,
}

impl std::fmt::Debug for TriggerLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerLifecycle")
            .field("strategy", &self.strategy)
            .field("source", &self.source.name())
            .field("pages", &self.pages)
            .finish_non_exhaustive()
    }
}

/// A deduplicated tick that has not been committed yet.
struct PendingTick {
    prior: DedupState,
    outcome: PollOutcome,
}

impl TriggerLifecycle {
    /// Create a lifecycle using the source's own page policy and the
    /// system clock.
    pub fn new(
        strategy: DedupStrategy,
        source: Arc<dyn ItemSource>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let pages = PageController::new(source.page_policy());
        Self {
            strategy,
            source,
            store,
            clock: Arc::new(SystemClock),
            pages,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the source's page policy.
    pub fn with_page_controller(mut self, pages: PageController) -> Self {
        self.pages = pages;
        self
    }

    pub fn strategy(&self) -> DedupStrategy {
        self.strategy
    }

    /// Whether the instance currently has persisted state.
    pub async fn status(&self, ctx: &TriggerContext) -> TriggerResult<TriggerStatus> {
        Ok(match self.store.get(&ctx.instance).await? {
            Some(_) => TriggerStatus::Enabled,
            None => TriggerStatus::Disabled,
        })
    }

    /// Capture a baseline so the first poll emits nothing historical.
    ///
    /// Never emits. Returns the persisted baseline.
    pub async fn on_enable(&self, ctx: &TriggerContext) -> TriggerResult<DedupState> {
        let span = tracing::info_span!(
            "trigger_enable",
            instance = %ctx.instance,
            strategy = %self.strategy,
            source = self.source.name(),
        );
        async move {
            let (state, _run) = self.establish_baseline(ctx).await?;
            tracing::info!("Trigger enabled");
            Ok(state)
        }
        .instrument(span)
        .await
    }

    /// Delete the instance's state. Disabling twice is a no-op.
    pub async fn on_disable(&self, ctx: &TriggerContext) -> TriggerResult<()> {
        self.store.delete(&ctx.instance).await?;
        tracing::info!(instance = %ctx.instance, "Trigger disabled, dedup state removed");
        Ok(())
    }

    /// Preview what a poll would emit, without touching the store.
    pub async fn test(&self, ctx: &TriggerContext) -> TriggerResult<Vec<serde_json::Value>> {
        Ok(self.test_report(ctx).await?.into_payloads())
    }

    /// [`test`](Self::test) with the full outcome.
    ///
    /// Runs against an ephemeral copy of the stored state; with no usable
    /// state, everything fetched counts as new. Fails only if the store
    /// cannot be read or the very first page cannot be fetched.
    pub async fn test_report(&self, ctx: &TriggerContext) -> TriggerResult<PollOutcome> {
        let span = tracing::info_span!(
            "trigger_test",
            instance = %ctx.instance,
            strategy = %self.strategy,
            source = self.source.name(),
        );
        async move {
            let stored = self
                .store
                .get(&ctx.instance)
                .await?
                .filter(|state| state.strategy() == self.strategy);
            let ephemeral = stored
                .clone()
                .unwrap_or_else(|| DedupState::initial(self.strategy));

            let mut run = self
                .pages
                .run(self.source.as_ref(), ctx, self.strategy, stored.as_ref())
                .await;
            if run.failed_outright() {
                if let Some(err) = run.error.take() {
                    return Err(err.into());
                }
            }

            let outcome = self.dedupe_run(run, &ephemeral)?;
            tracing::info!(
                emitted = outcome.emitted.len(),
                fetched = outcome.stats.fetched,
                "Test run complete, state untouched"
            );
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Run one tick and return the new payloads.
    pub async fn poll(&self, ctx: &TriggerContext) -> TriggerResult<Vec<serde_json::Value>> {
        Ok(self.poll_report(ctx).await?.into_payloads())
    }

    /// [`poll`](Self::poll) with the full outcome.
    ///
    /// State is persisted before this returns. If persisting fails the
    /// error propagates and nothing is emitted, so the next tick delivers
    /// the same items again.
    pub async fn poll_report(&self, ctx: &TriggerContext) -> TriggerResult<PollOutcome> {
        let span = self.poll_span(ctx);
        async move {
            let pending = match self.prepare_tick(ctx).await? {
                Ok(pending) => pending,
                Err(baselined) => return Ok(baselined),
            };
            self.commit(ctx, pending).await
        }
        .instrument(span)
        .await
    }

    /// Run one tick and hand new items to `sink` before persisting state.
    ///
    /// If delivery fails the state is left as it was and the error
    /// propagates.
    pub async fn poll_into(
        &self,
        ctx: &TriggerContext,
        sink: &dyn EmitSink,
    ) -> TriggerResult<PollOutcome> {
        let span = self.poll_span(ctx);
        async move {
            let pending = match self.prepare_tick(ctx).await? {
                Ok(pending) => pending,
                Err(baselined) => return Ok(baselined),
            };
            if !pending.outcome.emitted.is_empty() {
                sink.deliver(&ctx.instance, &pending.outcome.emitted).await?;
            }
            self.commit(ctx, pending).await
        }
        .instrument(span)
        .await
    }

    fn poll_span(&self, ctx: &TriggerContext) -> tracing::Span {
        tracing::info_span!(
            "trigger_poll",
            tick_id = %Uuid::new_v4(),
            instance = %ctx.instance,
            strategy = %self.strategy,
            source = self.source.name(),
        )
    }

    /// Fetch and dedupe one tick.
    ///
    /// The inner `Err` carries a finished baseline outcome when the
    /// instance had no usable state.
    async fn prepare_tick(
        &self,
        ctx: &TriggerContext,
    ) -> TriggerResult<Result<PendingTick, PollOutcome>> {
        let prior = match self.store.get(&ctx.instance).await? {
            Some(state) if state.strategy() == self.strategy => state,
            Some(stale) => {
                tracing::warn!(
                    stored = %stale.strategy(),
                    "Stored state belongs to another strategy, discarding and rebaselining"
                );
                return self.baseline_tick(ctx).await.map(Err);
            }
            None => {
                tracing::info!("No dedup state found, treating this tick as a baseline");
                return self.baseline_tick(ctx).await.map(Err);
            }
        };

        let run = self
            .pages
            .run(self.source.as_ref(), ctx, self.strategy, Some(&prior))
            .await;
        let outcome = self.dedupe_run(run, &prior)?;

        Ok(Ok(PendingTick { prior, outcome }))
    }

    /// Persist the tick's state if it changed.
    async fn commit(&self, ctx: &TriggerContext, pending: PendingTick) -> TriggerResult<PollOutcome> {
        let PendingTick { prior, mut outcome } = pending;

        if outcome.next_state != prior {
            self.store.put(&ctx.instance, &outcome.next_state).await?;
            outcome.stats.state_written = true;
        }

        tracing::info!(
            emitted = outcome.emitted.len(),
            fetched = outcome.stats.fetched,
            dropped = outcome.stats.dropped,
            pages = outcome.stats.pages_fetched,
            state_written = outcome.stats.state_written,
            "Poll complete"
        );
        Ok(outcome)
    }

    /// Dedupe a page run. A partial run keeps what the unread pages may
    /// still hold in the next state.
    fn dedupe_run(&self, run: PageRun, prior: &DedupState) -> TriggerResult<PollOutcome> {
        let fetched = run.candidates.len();
        let partial = run.stop.is_partial();
        let reached_prior = dedup_engine::reaches_prior(prior, &run.candidates);
        let deduped = dedup_engine::dedupe(self.strategy, run.candidates, prior)?;

        let mut next_state = deduped.next_state;
        if partial {
            next_state = dedup_engine::carry_over_partial(prior, next_state, reached_prior);
            if !reached_prior {
                if let DedupState::Timebased(mark) = prior {
                    tracing::warn!(
                        mark = mark.last_fetch_epoch_ms,
                        emitted = deduped.new_items.len(),
                        "Partial poll did not reach the stored mark, holding it; fetched items will be delivered again"
                    );
                }
            }
        }

        Ok(PollOutcome {
            emitted: deduped.new_items,
            next_state,
            stats: PollStats {
                fetched,
                dropped: deduped.dropped,
                pages_fetched: run.pages_fetched,
                stop: run.stop,
                baselined: false,
                state_written: false,
            },
        })
    }

    async fn baseline_tick(&self, ctx: &TriggerContext) -> TriggerResult<PollOutcome> {
        let (state, run) = self.establish_baseline(ctx).await?;
        Ok(PollOutcome {
            emitted: Vec::new(),
            next_state: state,
            stats: PollStats {
                fetched: run.candidates.len(),
                dropped: 0,
                pages_fetched: run.pages_fetched,
                stop: run.stop,
                baselined: true,
                state_written: true,
            },
        })
    }

    /// Fetch the current remote state and persist it as the baseline.
    ///
    /// A time-based baseline needs only the newest page and survives a
    /// failed fetch by falling back to the clock. A last-item baseline needs
    /// the full snapshot; an incomplete one would flood the next poll, so
    /// any fetch failure propagates.
    async fn establish_baseline(&self, ctx: &TriggerContext) -> TriggerResult<(DedupState, PageRun)> {
        let pages = match self.strategy {
            DedupStrategy::Timebased => self.pages.limited_to(1),
            DedupStrategy::LastItem => self.pages,
        };
        let mut run = pages
            .run(self.source.as_ref(), ctx, self.strategy, None)
            .await;

        if let Some(err) = run.error.take() {
            match self.strategy {
                DedupStrategy::LastItem => return Err(TriggerError::Source(err)),
                DedupStrategy::Timebased => tracing::warn!(
                    error = %err,
                    "Baseline fetch failed, using the current time as the high-water-mark"
                ),
            }
        }

        let (state, dropped) =
            dedup_engine::baseline_state(self.strategy, &run.candidates, self.clock.now_ms());
        if dropped > 0 {
            tracing::warn!(dropped, "Ignored candidates without a timestamp while baselining");
        }
        self.store.put(&ctx.instance, &state).await?;

        if matches!(run.stop, StopReason::BudgetReached) && self.strategy == DedupStrategy::LastItem {
            tracing::warn!("Baseline snapshot truncated by the page budget");
        }
        tracing::debug!(fetched = run.candidates.len(), "Baseline stored");
        Ok((state, run))
    }
}
