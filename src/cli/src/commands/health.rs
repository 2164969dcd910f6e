//! Health, probe and metrics commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct HealthArgs {
    /// Include one row per component
    #[arg(short, long)]
    detailed: bool,

    #[command(subcommand)]
    probe: Option<ProbeCommand>,
}

#[derive(Subcommand)]
enum ProbeCommand {
    /// Liveness probe
    Live,
    /// Readiness probe, answered from cached results
    Ready,
}

// ── API response types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct Component {
    pub name: String,
    #[serde(default)]
    pub name_ro: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub status: String,
    pub response_time_ms: u64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    pub last_checked: String,
}

#[derive(Debug, Deserialize, Serialize, Tabled)]
pub(crate) struct ComponentRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    component_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Time")]
    response_time: String,
    #[tabled(rename = "Attempts")]
    attempts: u32,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<Component> for ComponentRow {
    fn from(c: Component) -> Self {
        Self {
            name: c.name,
            component_type: c.component_type,
            status: output::status_label(&c.status).to_string(),
            response_time: format!("{}ms", c.response_time_ms),
            attempts: c.attempts,
            message: c.message.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct SystemHealth {
    status: String,
    uptime_secs: u64,
    version: String,
    environment: String,
    timestamp: String,
    components: Vec<Component>,
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(args: HealthArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match args.probe {
        Some(ProbeCommand::Live) => return probe(client, "/health/live", "alive", format).await,
        Some(ProbeCommand::Ready) => return probe(client, "/health/ready", "ready", format).await,
        None => {}
    }

    let (_, body) = client.probe("/health").await?;
    if !matches!(format, OutputFormat::Table) {
        return output::print_item(&body, format);
    }
    let health: SystemHealth = serde_json::from_value(body)?;

    output::print_header("System Health");
    output::print_detail("Status", output::status_label(&health.status));
    output::print_detail("API URL", client.base_url());
    output::print_detail("Version", &health.version);
    output::print_detail("Environment", &health.environment);
    output::print_detail("Uptime", format!("{}s", health.uptime_secs));
    output::print_detail("Timestamp", &health.timestamp);

    let unhealthy: Vec<String> = health
        .components
        .iter()
        .filter(|c| c.status == "unhealthy")
        .map(|c| c.name.clone())
        .collect();
    let status = health.status.clone();

    if args.detailed {
        output::print_header("Components");
        let rows: Vec<ComponentRow> = health.components.into_iter().map(Into::into).collect();
        output::print_list(&rows, format)?;
    } else if !unhealthy.is_empty() {
        output::print_detail("Unhealthy", unhealthy.join(", "));
    }

    println!();
    match status.as_str() {
        "healthy" => output::print_success("All systems operational"),
        "degraded" => output::print_warning("System degraded"),
        other => output::print_error(&format!("System status: {}", other)),
    }
    Ok(())
}

async fn probe(client: &ApiClient, path: &str, field: &str, format: OutputFormat) -> Result<()> {
    let (status, body) = client.probe(path).await?;
    if !matches!(format, OutputFormat::Table) {
        return output::print_item(&body, format);
    }

    if body.get(field).and_then(|v| v.as_bool()).unwrap_or(false) {
        output::print_success(&format!("{} ({})", field, status));
    } else {
        let reason = body
            .get("reason")
            .and_then(|v| v.as_str())
            .unwrap_or("no reason given");
        output::print_error(&format!("not {}: {}", field, reason));
    }
    Ok(())
}

/// `sentinel metrics`
pub async fn metrics(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let metrics: serde_json::Value = client.get("/health/metrics").await?;
    if !matches!(format, OutputFormat::Table) {
        return output::print_item(&metrics, format);
    }

    let num = |pointer: &str| metrics.pointer(pointer).and_then(|v| v.as_f64()).unwrap_or(0.0);

    output::print_header("Resources");
    output::print_detail("CPU", format!("{:.1}% ({} cores)", num("/cpu/usage"), num("/cpu/cores")));
    output::print_detail("Memory", format!("{:.1}%", num("/memory/usage_percent")));
    output::print_detail("Disk", format!("{:.1}%", num("/disk/usage_percent")));
    output::print_detail("Connections", num("/network/connections_active"));

    output::print_header("Requests");
    output::print_detail("Total", num("/requests/total"));
    output::print_detail("Failed", num("/requests/failed"));
    output::print_detail("Error rate", format!("{:.2}%", num("/requests/error_rate")));
    output::print_detail("Per minute", format!("{:.1}", num("/requests/requests_per_minute")));
    output::print_detail(
        "Latency",
        format!(
            "avg {:.1}ms, p50 {:.1}ms, p95 {:.1}ms, p99 {:.1}ms",
            num("/requests/average_response_time_ms"),
            num("/requests/latency/p50_ms"),
            num("/requests/latency/p95_ms"),
            num("/requests/latency/p99_ms"),
        ),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_row_from_result() {
        colored::control::set_override(false);
        let component: Component = serde_json::from_value(serde_json::json!({
            "name": "db",
            "name_ro": "Bază de date",
            "type": "database",
            "status": "unhealthy",
            "response_time_ms": 42,
            "message": "refused",
            "details": {},
            "attempts": 2,
            "last_checked": "2026-01-01T00:00:00Z"
        }))
        .unwrap();

        let row = ComponentRow::from(component);
        assert_eq!(row.status, "unhealthy");
        assert_eq!(row.response_time, "42ms");
        assert_eq!(row.message, "refused");
    }
}
