//! Output formatting utilities for CLI commands
//!
//! Provides consistent formatting for:
//! - Tables with column alignment
//! - Timestamps (relative)
//! - Scores, money, and truncated text

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use trendpress_jobs::JobStage;

/// Print a table with headers and rows
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }

    println!("{}", table);
}

/// Print a table with custom column colors
pub fn print_table_colored(headers: &[&str], rows: Vec<Vec<(String, Option<Color>)>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        let cells: Vec<Cell> = row
            .into_iter()
            .map(|(text, color)| match color {
                Some(c) => Cell::new(text).fg(c),
                None => Cell::new(text),
            })
            .collect();
        table.add_row(cells);
    }

    println!("{}", table);
}

/// Pretty-printed JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn stage_color(stage: JobStage) -> Option<Color> {
    match stage {
        JobStage::Done => Some(Color::Green),
        JobStage::Error => Some(Color::Red),
        JobStage::Idle => None,
        _ => Some(Color::Yellow),
    }
}

/// Format a timestamp as "X time ago" relative to `now`
pub fn format_ago(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - time).num_seconds();
    if secs < 0 {
        return "just now".to_string();
    }
    let secs = secs as u64;

    if secs < 60 {
        format!("{} second{} ago", secs, if secs == 1 { "" } else { "s" })
    } else if secs < 3600 {
        let mins = secs / 60;
        format!("{} minute{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if secs < 86400 {
        let hours = secs / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if secs < 604800 {
        let days = secs / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        time.format("%Y-%m-%d %H:%M").to_string()
    }
}

pub fn format_usd(amount: f64) -> String {
    if amount > 0.0 && amount < 0.01 {
        format!("${:.4}", amount)
    } else {
        format!("${:.2}", amount)
    }
}

/// Similarity ratio as a whole percentage
pub fn format_ratio(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_ago() {
        let now = Utc::now();
        assert_eq!(format_ago(now - Duration::seconds(5), now), "5 seconds ago");
        assert_eq!(format_ago(now - Duration::seconds(1), now), "1 second ago");
        assert_eq!(format_ago(now - Duration::seconds(120), now), "2 minutes ago");
        assert_eq!(format_ago(now - Duration::seconds(3600), now), "1 hour ago");
        assert_eq!(format_ago(now - Duration::seconds(86400), now), "1 day ago");
        assert_eq!(format_ago(now + Duration::seconds(3), now), "just now");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(0.0042), "$0.0042");
        assert_eq!(format_usd(1.5), "$1.50");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("정부지원금 총정리", 20), "정부지원금 총정리");
        assert_eq!(truncate("정부지원금 총정리", 4), "정부지…");
        assert_eq!(format_ratio(0.876), "88%");
    }
}
