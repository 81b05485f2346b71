//! One-shot trigger commands: enable, disable, test, poll, state.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;

use super::{build_lifecycle, open_sqlite_store, StateArgs, TriggerArgs};
use crate::cli::output::{items_table, list_table, output, render_list, CommandOutput};
use crate::domain::models::{Candidate, Config, DedupState, DedupStrategy, InstanceKey, PollStats};
use crate::domain::ports::StateStore;

#[derive(Debug, Serialize)]
pub struct EnableOutput {
    pub instance: String,
    pub strategy: DedupStrategy,
    pub state: DedupState,
}

impl CommandOutput for EnableOutput {
    fn to_human(&self) -> String {
        format!(
            "Enabled {} ({}), baseline: {}",
            self.instance,
            self.strategy,
            describe_state(&self.state)
        )
    }
}

#[derive(Debug, Serialize)]
pub struct DisableOutput {
    pub instance: String,
    pub success: bool,
}

impl CommandOutput for DisableOutput {
    fn to_human(&self) -> String {
        format!("Disabled {}; dedup state cleared", self.instance)
    }
}

/// Items from a `test` or `poll` run.
#[derive(Debug, Serialize)]
pub struct ItemsOutput {
    pub instance: String,
    /// `true` for a `test` preview that left state untouched.
    pub preview: bool,
    pub items: Vec<Candidate>,
    pub stats: PollStats,
}

impl CommandOutput for ItemsOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![render_list("new item", &items_table(&self.items), self.items.len())];
        if self.stats.baselined {
            lines.push("No prior state: baseline established, nothing emitted.".to_string());
        }
        if self.stats.stop.is_partial() {
            lines.push(format!("Warning: pagination stopped early ({:?})", self.stats.stop));
        }
        lines.push(format!(
            "Fetched {} candidate(s) over {} page(s), dropped {}{}",
            self.stats.fetched,
            self.stats.pages_fetched,
            self.stats.dropped,
            if self.preview { " (preview, state unchanged)" } else { "" }
        ));
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct StateEntry {
    pub instance: String,
    pub strategy: DedupStrategy,
    pub updated_at: Option<String>,
    pub state: DedupState,
}

#[derive(Debug, Serialize)]
pub struct StateListOutput {
    pub instances: Vec<StateEntry>,
    pub total: usize,
}

impl CommandOutput for StateListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["instance", "strategy", "state", "updated"]);
        for entry in &self.instances {
            table.add_row(vec![
                entry.instance.clone(),
                entry.strategy.to_string(),
                describe_state(&entry.state),
                entry.updated_at.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }
        render_list("trigger instance", &table, self.total)
    }
}

fn describe_state(state: &DedupState) -> String {
    match state {
        DedupState::Timebased(s) => chrono::DateTime::<chrono::Utc>::from_timestamp_millis(s.last_fetch_epoch_ms)
            .map_or_else(
                || format!("mark {}", s.last_fetch_epoch_ms),
                |dt| format!("mark {}", dt.to_rfc3339()),
            ),
        DedupState::LastItem(s) => format!("{} key(s) in snapshot", s.last_seen_keys.len()),
    }
}

pub async fn execute_enable(
    args: &TriggerArgs,
    config: &Config,
    store: Arc<dyn StateStore>,
    json_mode: bool,
) -> Result<()> {
    let (lifecycle, ctx) = build_lifecycle(args, config, store)?;
    let state = lifecycle.on_enable(&ctx).await?;
    output(
        &EnableOutput {
            instance: args.instance.clone(),
            strategy: args.strategy,
            state,
        },
        json_mode,
    );
    Ok(())
}

pub async fn execute_disable(
    args: &TriggerArgs,
    config: &Config,
    store: Arc<dyn StateStore>,
    json_mode: bool,
) -> Result<()> {
    let (lifecycle, ctx) = build_lifecycle(args, config, store)?;
    lifecycle.on_disable(&ctx).await?;
    output(
        &DisableOutput {
            instance: args.instance.clone(),
            success: true,
        },
        json_mode,
    );
    Ok(())
}

pub async fn execute_test(
    args: &TriggerArgs,
    config: &Config,
    store: Arc<dyn StateStore>,
    json_mode: bool,
) -> Result<()> {
    let (lifecycle, ctx) = build_lifecycle(args, config, store)?;
    let outcome = lifecycle.test_report(&ctx).await?;
    output(
        &ItemsOutput {
            instance: args.instance.clone(),
            preview: true,
            items: outcome.emitted,
            stats: outcome.stats,
        },
        json_mode,
    );
    Ok(())
}

pub async fn execute_poll(
    args: &TriggerArgs,
    config: &Config,
    store: Arc<dyn StateStore>,
    json_mode: bool,
) -> Result<()> {
    let (lifecycle, ctx) = build_lifecycle(args, config, store)?;
    let outcome = lifecycle.poll_report(&ctx).await?;
    output(
        &ItemsOutput {
            instance: args.instance.clone(),
            preview: false,
            items: outcome.emitted,
            stats: outcome.stats,
        },
        json_mode,
    );
    Ok(())
}

pub async fn execute_state(args: &StateArgs, config: &Config, memory: bool, json_mode: bool) -> Result<()> {
    if memory {
        bail!("The in-memory store does not outlive a command; inspect state without --memory");
    }
    let store = open_sqlite_store(config).await?;

    let instances = match &args.instance {
        Some(instance) => {
            let key = InstanceKey::new(instance.as_str());
            match store.get(&key).await? {
                Some(state) => vec![StateEntry {
                    instance: instance.clone(),
                    strategy: state.strategy(),
                    updated_at: None,
                    state,
                }],
                None => Vec::new(),
            }
        }
        None => {
            let mut entries = Vec::new();
            for (key, strategy, updated_at) in store.list().await? {
                if let Some(state) = store.get(&key).await? {
                    entries.push(StateEntry {
                        instance: key.to_string(),
                        strategy,
                        updated_at: Some(updated_at),
                        state,
                    });
                }
            }
            entries
        }
    };

    output(
        &StateListOutput {
            total: instances.len(),
            instances,
        },
        json_mode,
    );
    Ok(())
}
