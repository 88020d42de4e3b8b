//! Output formatting utilities for the CLI.

use anyhow::Result;
use serde::Serialize;

use crate::domain::models::SearchResult;
use crate::services::{DependencyHealth, EnsureAction, EnsureReport, HealthReport};

/// A command result that can print itself for humans or as JSON.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) -> Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{}", result.to_human());
    }
    Ok(())
}

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

fn status_line(dependency: &DependencyHealth) -> String {
    let status = if dependency.healthy { "ok" } else { "FAILED" };
    let mut line = format!("  {:<14} {status} ({} ms)", dependency.name, dependency.latency_ms);
    if let Some(error) = &dependency.error {
        line.push_str(&format!("\n  {:<14} {}", "", truncate(error, 200)));
    }
    line
}

impl CommandOutput for HealthReport {
    fn to_human(&self) -> String {
        let overall = if self.healthy { "healthy" } else { "unhealthy" };
        [
            format!("Status:     {overall}"),
            format!("Model:      {}", self.model),
            format!("Dimension:  {}", self.dimension),
            format!("Collection: {}", self.collection),
            format!("Checked at: {}", self.checked_at.format("%Y-%m-%d %H:%M:%S UTC")),
            "Dependencies:".to_string(),
            status_line(&self.embedding),
            status_line(&self.vector_store),
        ]
        .join("\n")
    }
}

impl CommandOutput for EnsureReport {
    fn to_human(&self) -> String {
        let action = match &self.action {
            EnsureAction::Unchanged => "already up to date".to_string(),
            EnsureAction::Created => "created".to_string(),
            EnsureAction::Recreated => "recreated (previous dimension unreadable)".to_string(),
            EnsureAction::Migrated { from, to, rows } => {
                format!("migrated from dimension {from} to {to} ({rows} rows re-embedded)")
            }
        };
        format!(
            "Collection '{}' (dimension {}): {action}",
            self.collection, self.dimension
        )
    }
}

/// Result of the `search` command.
#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub query: String,
    pub top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base_id: Option<String>,
    pub results: Vec<SearchResult>,
}

impl CommandOutput for SearchOutput {
    fn to_human(&self) -> String {
        if self.results.is_empty() {
            return "No results found.".to_string();
        }
        let mut lines = vec![format!("Results for \"{}\":", self.query)];
        for (rank, hit) in self.results.iter().enumerate() {
            lines.push(format!(
                "{:>2}. [{:.4}] doc {} (kb {}): {}",
                rank + 1,
                hit.score,
                hit.document_id,
                hit.knowledge_base_id,
                truncate(&hit.content.replace('\n', " "), 100)
            ));
        }
        lines.join("\n")
    }
}
