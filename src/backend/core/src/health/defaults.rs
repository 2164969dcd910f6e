//! Built-in check set registered at start-up.

use std::sync::Arc;
use std::time::Duration;

use super::check::ComponentType;
use super::probe::{DiskProbe, HttpProbe, MemoryProbe, ProcessProbe};
use super::registry::CheckDefinition;
use super::system::MetricsSource;
use crate::config::{HealthEngineConfig, HttpCheckConfig};
use crate::error::Result;

/// The `api`, `memory` and `disk` checks.
pub fn default_checks(
    config: &HealthEngineConfig,
    source: Arc<dyn MetricsSource>,
) -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::new("api", "API", ComponentType::Custom, Arc::new(ProcessProbe::new()))
            .with_interval(Duration::from_secs(30))
            .critical(),
        CheckDefinition::new(
            "memory",
            "Memorie",
            ComponentType::System,
            Arc::new(MemoryProbe::new(
                Arc::clone(&source),
                config.memory_threshold_percent,
            )),
        )
        .with_interval(Duration::from_secs(60)),
        CheckDefinition::new(
            "disk",
            "Spațiu disc",
            ComponentType::Storage,
            Arc::new(DiskProbe::new(source, config.disk_threshold_percent)),
        )
        .with_interval(Duration::from_secs(300)),
    ]
}

/// One check per configured HTTP endpoint, sharing one client.
pub fn http_checks(configs: &[HttpCheckConfig]) -> Result<Vec<CheckDefinition>> {
    if configs.is_empty() {
        return Ok(Vec::new());
    }
    let client = reqwest::Client::builder()
        .user_agent(concat!("sentinel/", env!("CARGO_PKG_VERSION")))
        .build()?;

    Ok(configs
        .iter()
        .map(|c| {
            let probe = HttpProbe::new(&c.url)
                .with_client(client.clone())
                .with_expected_status(c.expected_status.clone());
            let mut definition = CheckDefinition::new(
                &c.name,
                c.name_ro.as_deref().unwrap_or(&c.name),
                c.component_type,
                Arc::new(probe),
            )
            .with_interval(c.interval)
            .with_timeout(c.timeout)
            .with_retries(c.retries);
            definition.critical = c.critical;
            definition.enabled = c.enabled;
            definition
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::system::StaticMetricsSource;

    #[test]
    fn test_default_set() {
        let checks = default_checks(
            &HealthEngineConfig::default(),
            Arc::new(StaticMetricsSource::default()),
        );
        let names: Vec<_> = checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["api", "memory", "disk"]);
        assert!(checks[0].critical);
        assert!(!checks[1].critical);
        assert_eq!(checks[2].interval, Duration::from_secs(300));
        assert_eq!(checks[2].name_ro, "Spațiu disc");
    }

    #[test]
    fn test_http_checks_from_config() {
        let config = HttpCheckConfig {
            name: "efactura".into(),
            name_ro: None,
            component_type: ComponentType::EFactura,
            url: "http://localhost:1/health".into(),
            expected_status: vec![200],
            interval: Duration::from_secs(120),
            timeout: Duration::from_secs(3),
            retries: 3,
            critical: true,
            enabled: false,
        };
        let checks = http_checks(&[config]).unwrap();

        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].name_ro, "efactura");
        assert_eq!(checks[0].retries, 3);
        assert!(checks[0].critical);
        assert!(!checks[0].enabled);
    }
}
