use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use pulsemap::query::client::DEFAULT_ENDPOINT;
use pulsemap::{MapOptions, WidgetConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub bind: SocketAddr,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub retention_secs: u64,
    pub report_secs: u64,
    pub generator: GeneratorConfig,
    pub map: MapOptions,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            access_token: Some("pk.simulated".to_string()),
            retention_secs: 120,
            report_secs: 5,
            generator: GeneratorConfig::default(),
            map: MapOptions::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading simulator config {}", path_ref.display()))?;
        let config: SimulatorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing simulator config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Configuration the headless widget is driven with.
    pub fn widget_config(&self) -> WidgetConfig {
        WidgetConfig::new(
            self.access_token.clone(),
            Some(self.generator.account_id),
        )
    }

    pub fn retention_ms(&self) -> i64 {
        i64::try_from(self.retention_secs.saturating_mul(1_000)).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_point_at_local_backend() {
        let cfg = SimulatorConfig::default();
        assert_eq!(cfg.bind.port(), 9000);
        assert_eq!(cfg.endpoint, "http://127.0.0.1:9000/nrql");
        assert_eq!(cfg.widget_config().account_id, Some(1));
        assert_eq!(cfg.retention_ms(), 120_000);
    }

    #[test]
    fn config_load_reads_yaml_with_defaults() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"bind: 127.0.0.1:9100\naccess_token: pk.yaml\ngenerator:\n  account_id: 42\n  events_per_second: 10.0\nmap:\n  zoom: 2.0\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = SimulatorConfig::load(&path).unwrap();
        assert_eq!(cfg.bind.port(), 9100);
        assert_eq!(cfg.generator.account_id, 42);
        assert_eq!(cfg.generator.events_per_second, 10.0);
        assert_eq!(cfg.generator.slow_fraction, 0.2);
        assert_eq!(cfg.map.zoom, 2.0);
        assert_eq!(cfg.report_secs, 5);
        assert_eq!(
            cfg.widget_config(),
            WidgetConfig::new(Some("pk.yaml".into()), Some(42))
        );
    }

    #[test]
    fn config_load_reports_missing_file() {
        let err = SimulatorConfig::load("/nonexistent/simulator.yaml").unwrap_err();
        assert!(err.to_string().contains("reading simulator config"));
    }
}
