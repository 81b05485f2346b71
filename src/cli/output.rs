//! Output formatting utilities for the CLI.

use chrono::{DateTime, Utc};
use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::domain::models::Candidate;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to at most `max_len` characters, appending "..." if
/// truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Borderless table with upper-cased headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Emitted items as a table: key, timestamp and a compact payload.
pub fn items_table(items: &[Candidate]) -> Table {
    let mut table = list_table(&["key", "timestamp", "payload"]);
    for item in items {
        let timestamp = item
            .timestamp_ms
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map_or_else(|| "-".to_string(), |dt| dt.to_rfc3339());
        table.add_row(vec![
            truncate(&item.key, 32),
            timestamp,
            truncate(&item.payload.to_string(), 60),
        ]);
    }
    table
}

/// Render a table under a count line, or a "none found" message.
pub fn render_list(entity_name: &str, table: &Table, total: usize) -> String {
    match total {
        0 => format!("No {entity_name}s found."),
        1 => format!("1 {entity_name}:\n{table}"),
        n => format!("{n} {entity_name}s:\n{table}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_items_table_renders_rows() {
        let items = vec![
            Candidate::timestamped("p1", 1_700_000_000_000, json!({"title": "Sunset"})),
            Candidate::new("p2", json!(null)),
        ];
        let rendered = render_list("item", &items_table(&items), items.len());

        assert!(rendered.starts_with("2 items:"));
        assert!(rendered.contains("2023-11-14T22:13:20+00:00"));
        assert!(rendered.contains("p2"));
    }

    #[test]
    fn test_render_empty_list() {
        assert_eq!(render_list("item", &items_table(&[]), 0), "No items found.");
    }
}
