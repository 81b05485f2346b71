//! `pollgate watch`: poll on a fixed interval until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use super::{build_lifecycle, WatchArgs};
use crate::cli::output::{items_table, render_list};
use crate::domain::errors::{DeliveryError, TriggerError};
use crate::domain::models::{Candidate, Config, InstanceKey};
use crate::domain::ports::{EmitSink, StateStore};

/// Prints delivered items to stdout, one JSON line per item in JSON mode.
#[derive(Debug, Clone, Copy)]
pub struct StdoutSink {
    json_mode: bool,
}

impl StdoutSink {
    pub fn new(json_mode: bool) -> Self {
        Self { json_mode }
    }

    pub fn render(&self, instance: &InstanceKey, items: &[Candidate]) -> Result<String, DeliveryError> {
        if self.json_mode {
            let lines = items
                .iter()
                .map(|item| {
                    serde_json::to_string(&serde_json::json!({
                        "instance": instance.as_str(),
                        "key": item.key,
                        "payload": item.payload,
                    }))
                    .map_err(|e| DeliveryError(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(lines.join("\n"))
        } else {
            Ok(render_list("new item", &items_table(items), items.len()))
        }
    }
}

#[async_trait]
impl EmitSink for StdoutSink {
    async fn deliver(&self, instance: &InstanceKey, items: &[Candidate]) -> Result<(), DeliveryError> {
        if items.is_empty() {
            return Ok(());
        }
        println!("{}", self.render(instance, items)?);
        Ok(())
    }
}

pub async fn execute(args: &WatchArgs, config: &Config, store: Arc<dyn StateStore>, json_mode: bool) -> Result<()> {
    let interval_secs = args.interval_secs.unwrap_or(config.polling.interval_secs);
    if interval_secs == 0 {
        bail!("--interval-secs must be at least 1");
    }

    let (lifecycle, ctx) = build_lifecycle(&args.trigger, config, store)?;
    let sink = StdoutSink::new(json_mode);

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tracing::info!(instance = %ctx.instance, interval_secs, "Watching trigger");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let tick = async {
                    match lifecycle.poll_into(&ctx, &sink).await {
                        Ok(outcome) => {
                            tracing::info!(
                                emitted = outcome.emitted.len(),
                                pages = outcome.stats.pages_fetched,
                                baselined = outcome.stats.baselined,
                                "Tick complete"
                            );
                            Ok(())
                        }
                        // The source may recover by the next tick.
                        Err(TriggerError::Source(err)) => {
                            tracing::warn!(error = %err, transient = err.is_transient(), "Tick failed");
                            Ok(())
                        }
                        Err(err) => Err(err),
                    }
                };
                tick.instrument(tracing::info_span!("watch_tick")).await?;
            }
            _ = &mut shutdown => {
                tracing::info!(instance = %ctx.instance, "Interrupted, stopping watch");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_render_is_one_line_per_item() {
        let sink = StdoutSink::new(true);
        let items = vec![
            Candidate::new("a", json!({"n": 1})),
            Candidate::new("b", json!({"n": 2})),
        ];
        let rendered = sink.render(&InstanceKey::new("flow-1"), &items).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, json!({"instance": "flow-1", "key": "a", "payload": {"n": 1}}));
    }

    #[tokio::test]
    async fn test_empty_delivery_is_ok() {
        StdoutSink::new(false).deliver(&InstanceKey::new("x"), &[]).await.unwrap();
    }
}
