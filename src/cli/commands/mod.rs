//! Command handlers and the wiring they share.

pub mod lifecycle;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::adapters::memory::InMemoryStateStore;
use crate::adapters::plugins::{HttpJsonSource, HttpSourceConfig};
use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteStateStore};
use crate::domain::models::{AuthCredentials, Config, DedupStrategy, PagePolicy, TriggerContext};
use crate::domain::ports::StateStore;
use crate::services::TriggerLifecycle;

/// Identifies a trigger instance and the endpoint it polls.
#[derive(Args, Debug, Clone)]
pub struct TriggerArgs {
    /// Trigger instance key (state is partitioned by it)
    #[arg(short, long)]
    pub instance: String,

    /// Dedup strategy: timebased or last_item
    #[arg(short, long, value_parser = parse_strategy, default_value = "timebased")]
    pub strategy: DedupStrategy,

    /// JSON list endpoint to poll
    #[arg(long)]
    pub url: String,

    /// JSON pointer to the item array (empty: the body is the array)
    #[arg(long, default_value = "")]
    pub items_pointer: String,

    /// Field or JSON pointer holding each item's stable key
    #[arg(long, default_value = "id")]
    pub key_field: String,

    /// Field or JSON pointer holding each item's creation time
    #[arg(long)]
    pub timestamp_field: Option<String>,

    /// Field or JSON pointer holding the next-page cursor
    #[arg(long)]
    pub cursor_field: Option<String>,

    /// Query parameter that carries the cursor
    #[arg(long, default_value = "cursor")]
    pub cursor_param: String,

    /// Query parameter that carries the stored high-water-mark
    #[arg(long)]
    pub since_param: Option<String>,

    /// Override the configured page budget for this run
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Bearer token for the endpoint
    #[arg(long, env = "POLLGATE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub trigger: TriggerArgs,

    /// Seconds between ticks (defaults to polling.interval_secs)
    #[arg(long)]
    pub interval_secs: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct StateArgs {
    /// Show only this instance
    #[arg(short, long)]
    pub instance: Option<String>,
}

fn parse_strategy(s: &str) -> Result<DedupStrategy, String> {
    DedupStrategy::from_str(s).ok_or_else(|| format!("unknown strategy '{s}' (expected timebased or last_item)"))
}

impl TriggerArgs {
    pub fn source_config(&self) -> HttpSourceConfig {
        HttpSourceConfig {
            url: self.url.clone(),
            items_pointer: self.items_pointer.clone(),
            key_field: self.key_field.clone(),
            timestamp_field: self.timestamp_field.clone(),
            cursor_field: self.cursor_field.clone(),
            cursor_param: self.cursor_param.clone(),
            page_size_param: None,
            page_size: None,
            since_param: self.since_param.clone(),
        }
    }

    pub fn context(&self) -> TriggerContext {
        let auth = self
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map_or_else(AuthCredentials::none, AuthCredentials::bearer);
        TriggerContext::new(self.instance.as_str())
            .with_auth(auth)
            .with_config("url", serde_json::Value::String(self.url.clone()))
    }

    pub fn page_policy(&self, config: &Config) -> PagePolicy {
        let policy = PagePolicy::from(&config.polling);
        match self.max_pages {
            Some(max_pages) => policy.with_max_pages(max_pages),
            None => policy,
        }
    }
}

/// Open the SQLite store named by `config`, migrating it if needed.
pub async fn open_sqlite_store(config: &Config) -> Result<SqliteStateStore> {
    let pool_config = PoolConfig::default().with_max_connections(config.database.max_connections);
    let pool = initialize_database(&config.database.url(), Some(pool_config))
        .await
        .with_context(|| format!("Failed to open state database at {}", config.database.path))?;
    Ok(SqliteStateStore::new(pool))
}

pub async fn open_store(config: &Config, memory: bool) -> Result<Arc<dyn StateStore>> {
    if memory {
        tracing::debug!("Using in-memory state store");
        return Ok(Arc::new(InMemoryStateStore::new()));
    }
    Ok(Arc::new(open_sqlite_store(config).await?))
}

/// Wire an HTTP source and `store` into a lifecycle for `args`.
pub fn build_lifecycle(
    args: &TriggerArgs,
    config: &Config,
    store: Arc<dyn StateStore>,
) -> Result<(TriggerLifecycle, TriggerContext)> {
    let source = HttpJsonSource::new(args.instance.clone(), args.source_config())
        .context("Invalid source options")?
        .with_policy(args.page_policy(config));
    let lifecycle = TriggerLifecycle::new(args.strategy, Arc::new(source), store);
    Ok((lifecycle, args.context()))
}
