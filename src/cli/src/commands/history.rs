//! History and uptime commands.

use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct HistoryArgs {
    /// Maximum number of entries
    #[arg(short, long, default_value = "20")]
    limit: usize,

    /// Only entries at or after this RFC 3339 timestamp
    #[arg(short, long)]
    since: Option<String>,
}

#[derive(Args)]
pub struct UptimeArgs {
    /// Only entries at or after this RFC 3339 timestamp
    #[arg(short, long)]
    since: Option<String>,
}

// ── API response types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
struct CheckSnapshot {
    name: String,
    status: String,
    response_time_ms: u64,
}

#[derive(Debug, Deserialize, Serialize)]
struct HistoryEntry {
    timestamp: String,
    status: String,
    checks: Vec<CheckSnapshot>,
}

#[derive(Debug, Deserialize, Serialize, Tabled)]
struct HistoryRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Checks")]
    checks: usize,
    #[tabled(rename = "Failing")]
    failing: String,
}

impl From<HistoryEntry> for HistoryRow {
    fn from(e: HistoryEntry) -> Self {
        let failing: Vec<String> = e
            .checks
            .iter()
            .filter(|c| c.status != "healthy")
            .map(|c| c.name.clone())
            .collect();
        Self {
            timestamp: e.timestamp,
            status: output::status_label(&e.status).to_string(),
            checks: e.checks.len(),
            failing: failing.join(", "),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct UptimeStats {
    uptime: f64,
    total_checks: usize,
    healthy_checks: usize,
    degraded_checks: usize,
    unhealthy_checks: usize,
}

// ── Execution ───────────────────────────────────────────────────────────────

fn since_param(since: Option<&str>) -> Result<String> {
    match since {
        Some(s) => {
            let ts = chrono::DateTime::parse_from_rfc3339(s)
                .map_err(|e| anyhow::anyhow!("Invalid --since '{}': {}", s, e))?;
            // '+' must be escaped in a query string.
            Ok(format!("since={}", ts.to_rfc3339().replace('+', "%2B")))
        }
        None => Ok(String::new()),
    }
}

pub async fn history(args: HistoryArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let mut path = format!("/health/history?limit={}", args.limit);
    let since = since_param(args.since.as_deref())?;
    if !since.is_empty() {
        path.push('&');
        path.push_str(&since);
    }

    let entries: Vec<HistoryEntry> = client.get(&path).await?;
    match format {
        OutputFormat::Table => {
            let rows: Vec<HistoryRow> = entries.into_iter().map(Into::into).collect();
            output::print_list(&rows, format)
        }
        _ => output::print_item(&entries, format),
    }
}

pub async fn uptime(args: UptimeArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let since = since_param(args.since.as_deref())?;
    let path = if since.is_empty() {
        "/health/uptime".to_string()
    } else {
        format!("/health/uptime?{}", since)
    };

    let stats: UptimeStats = client.get(&path).await?;
    match format {
        OutputFormat::Table => {
            output::print_header("Uptime");
            output::print_detail("Uptime", format!("{:.2}%", stats.uptime));
            output::print_detail("Evaluations", stats.total_checks);
            output::print_detail("Healthy", stats.healthy_checks);
            output::print_detail("Degraded", stats.degraded_checks);
            output::print_detail("Unhealthy", stats.unhealthy_checks);
            Ok(())
        }
        _ => output::print_item(&stats, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_since_param() {
        assert_eq!(since_param(None).unwrap(), "");
        assert_eq!(
            since_param(Some("2026-01-01T00:00:00+02:00")).unwrap(),
            "since=2026-01-01T00:00:00%2B02:00"
        );
        assert!(since_param(Some("yesterday")).is_err());
    }
}
