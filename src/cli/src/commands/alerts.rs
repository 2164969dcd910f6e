//! Alert commands.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum AlertCommands {
    /// List alerts, newest first
    List {
        /// Include resolved alerts
        #[arg(short, long)]
        all: bool,
    },

    /// Counts of active alerts by severity
    Summary,

    /// Acknowledge an alert
    Ack {
        /// Alert ID
        id: String,
    },

    /// Drop resolved alerts
    Clear,
}

// ── API response types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
struct AlertInfo {
    id: String,
    component: String,
    severity: String,
    message: String,
    message_ro: String,
    status: String,
    previous_status: String,
    created_at: String,
    #[serde(default)]
    acknowledged_at: Option<String>,
    #[serde(default)]
    resolved_at: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Created")]
    created_at: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<AlertInfo> for AlertRow {
    fn from(a: AlertInfo) -> Self {
        let state = if a.resolved_at.is_some() {
            "resolved"
        } else if a.acknowledged_at.is_some() {
            "acknowledged"
        } else {
            "open"
        };
        Self {
            id: a.id.chars().take(8).collect(),
            component: a.component,
            severity: a.severity,
            message: a.message,
            created_at: a.created_at,
            state: state.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct AlertSummary {
    active: usize,
    critical: usize,
    warning: usize,
    acknowledged: usize,
    recent: Vec<AlertInfo>,
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(cmd: AlertCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        AlertCommands::List { all } => {
            let alerts: Vec<AlertInfo> = client
                .get(&format!("/health/alerts?include_resolved={}", all))
                .await?;
            match format {
                OutputFormat::Table => {
                    let rows: Vec<AlertRow> = alerts.into_iter().map(Into::into).collect();
                    output::print_list(&rows, format)?;
                }
                _ => output::print_item(&alerts, format)?,
            }
        }

        AlertCommands::Summary => {
            let summary: AlertSummary = client.get("/health/alerts/summary").await?;
            match format {
                OutputFormat::Table => {
                    output::print_header("Alerts");
                    output::print_detail("Active", summary.active);
                    output::print_detail("Critical", summary.critical);
                    output::print_detail("Warning", summary.warning);
                    output::print_detail("Acknowledged", summary.acknowledged);
                    if !summary.recent.is_empty() {
                        output::print_header("Recent");
                        let rows: Vec<AlertRow> =
                            summary.recent.into_iter().map(Into::into).collect();
                        output::print_list(&rows, format)?;
                    }
                }
                _ => output::print_item(&summary, format)?,
            }
        }

        AlertCommands::Ack { id } => {
            let alert: AlertInfo = client
                .post(&format!("/health/alerts/{}/acknowledge", id))
                .await?;
            match format {
                OutputFormat::Table => output::print_success(&format!(
                    "Alert {} on {} acknowledged",
                    alert.id, alert.component
                )),
                _ => output::print_item(&alert, format)?,
            }
        }

        AlertCommands::Clear => {
            let resp: serde_json::Value = client.delete("/health/alerts/resolved").await?;
            match format {
                OutputFormat::Table => {
                    let removed = resp.get("removed").and_then(|v| v.as_u64()).unwrap_or(0);
                    output::print_success(&format!("Removed {} resolved alerts", removed));
                }
                _ => output::print_item(&resp, format)?,
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_row_state() {
        let alert: AlertInfo = serde_json::from_value(serde_json::json!({
            "id": "0b7f1f6e-1111-2222-3333-444455556666",
            "component": "db",
            "severity": "critical",
            "message": "refused",
            "message_ro": "Bază de date nu funcționează corect",
            "status": "unhealthy",
            "previous_status": "healthy",
            "created_at": "2026-01-01T00:00:00Z",
            "acknowledged_at": "2026-01-01T00:01:00Z"
        }))
        .unwrap();

        let row = AlertRow::from(alert);
        assert_eq!(row.id, "0b7f1f6e");
        assert_eq!(row.state, "acknowledged");
    }
}
