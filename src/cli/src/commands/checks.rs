//! Check management commands.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use super::health::{Component, ComponentRow};
use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum CheckCommands {
    /// List registered checks
    List,

    /// Run one check, or every enabled check when no name is given
    Run {
        /// Check name
        name: Option<String>,
    },

    /// Enable a check and start its timer
    Enable {
        /// Check name
        name: String,
    },

    /// Disable a check and stop its timer
    Disable {
        /// Check name
        name: String,
    },

    /// Change how often a check runs
    Interval {
        /// Check name
        name: String,
        /// New interval in milliseconds
        interval_ms: u64,
    },

    /// Unregister a check
    Remove {
        /// Check name
        name: String,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

// ── API response types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
struct CheckInfo {
    name: String,
    name_ro: String,
    #[serde(rename = "type")]
    component_type: String,
    interval: String,
    timeout: String,
    retries: u32,
    critical: bool,
    enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Tabled)]
struct CheckRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Display")]
    name_ro: String,
    #[tabled(rename = "Type")]
    component_type: String,
    #[tabled(rename = "Interval")]
    interval: String,
    #[tabled(rename = "Timeout")]
    timeout: String,
    #[tabled(rename = "Retries")]
    retries: u32,
    #[tabled(rename = "Critical")]
    critical: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

impl From<CheckInfo> for CheckRow {
    fn from(c: CheckInfo) -> Self {
        let flag = |b: bool| if b { "yes" } else { "no" }.to_string();
        Self {
            name: c.name,
            name_ro: c.name_ro,
            component_type: c.component_type,
            interval: c.interval,
            timeout: c.timeout,
            retries: c.retries,
            critical: flag(c.critical),
            enabled: flag(c.enabled),
        }
    }
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(cmd: CheckCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        CheckCommands::List => {
            let checks: Vec<CheckInfo> = client.get("/health/checks").await?;
            let rows: Vec<CheckRow> = checks.into_iter().map(Into::into).collect();
            output::print_list(&rows, format)?;
        }

        CheckCommands::Run { name: Some(name) } => {
            let result: Component = client
                .post(&format!("/health/checks/{}/run", name))
                .await?;
            output::print_list(&[ComponentRow::from(result)], format)?;
        }

        CheckCommands::Run { name: None } => {
            let results: Vec<Component> = client.post("/health/checks/run").await?;
            let rows: Vec<ComponentRow> = results.into_iter().map(Into::into).collect();
            output::print_list(&rows, format)?;
        }

        CheckCommands::Enable { name } => {
            let resp: serde_json::Value = client
                .post(&format!("/health/checks/{}/enable", name))
                .await?;
            report(&resp, &format!("Check {} enabled", name), format)?;
        }

        CheckCommands::Disable { name } => {
            let resp: serde_json::Value = client
                .post(&format!("/health/checks/{}/disable", name))
                .await?;
            report(&resp, &format!("Check {} disabled", name), format)?;
        }

        CheckCommands::Interval { name, interval_ms } => {
            if interval_ms == 0 {
                anyhow::bail!("Interval must be positive");
            }
            let resp: serde_json::Value = client
                .put(
                    &format!("/health/checks/{}/interval", name),
                    &serde_json::json!({ "interval_ms": interval_ms }),
                )
                .await?;
            report(
                &resp,
                &format!("Check {} now runs every {}ms", name, interval_ms),
                format,
            )?;
        }

        CheckCommands::Remove { name, force } => {
            if !force {
                output::print_info("This will unregister the check. Use --force to confirm.");
                return Ok(());
            }
            let resp: serde_json::Value =
                client.delete(&format!("/health/checks/{}", name)).await?;
            report(&resp, &format!("Check {} removed", name), format)?;
        }
    }

    Ok(())
}

fn report(resp: &serde_json::Value, message: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            output::print_success(message);
            Ok(())
        }
        _ => output::print_item(resp, format),
    }
}
