use anyhow::Context;
use clap::Parser;
use pulsemap::query::client::DEFAULT_ENDPOINT;
use pulsemap::{MapOptions, PollSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Realtime interaction map")]
pub struct Args {
    /// Load viewer settings from YAML
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Query endpoint accepting `{accountId, query}` POSTs
    #[arg(long)]
    pub endpoint: Option<String>,
    #[arg(long)]
    pub api_key: Option<String>,
    /// Map access token to start with
    #[arg(long)]
    pub token: Option<String>,
    #[arg(long)]
    pub account_id: Option<u64>,
    /// Poll interval in seconds
    #[arg(long)]
    pub poll_secs: Option<u64>,
}

/// Everything the viewer needs before the first frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub account_id: Option<u64>,
    pub poll_secs: u64,
    pub map: MapOptions,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            access_token: None,
            account_id: None,
            poll_secs: 30,
            map: MapOptions::default(),
        }
    }
}

impl ViewerSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading viewer settings {}", path_ref.display()))?;
        let settings: ViewerSettings = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing viewer settings {}", path_ref.display()))?;
        Ok(settings)
    }

    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        let mut settings = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(endpoint) = &args.endpoint {
            settings.endpoint = endpoint.clone();
        }
        if args.api_key.is_some() {
            settings.api_key = args.api_key.clone();
        }
        if args.token.is_some() {
            settings.access_token = args.token.clone();
        }
        if args.account_id.is_some() {
            settings.account_id = args.account_id;
        }
        if let Some(secs) = args.poll_secs {
            settings.poll_secs = secs;
        }
        Ok(settings)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_secs.max(1)),
            ..PollSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn args_override_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"endpoint: http://example.test/nrql\naccount_id: 5\nmap:\n  style: mapbox://styles/mapbox/dark-v10\n")
            .unwrap();
        let path = temp.into_temp_path();

        let args = Args {
            config: Some(path.to_path_buf()),
            account_id: Some(6),
            poll_secs: Some(5),
            ..Args::default()
        };
        let settings = ViewerSettings::from_args(&args).unwrap();
        assert_eq!(settings.endpoint, "http://example.test/nrql");
        assert_eq!(settings.account_id, Some(6));
        assert_eq!(settings.map.style, "mapbox://styles/mapbox/dark-v10");
        assert_eq!(settings.poll_settings().interval, Duration::from_secs(5));
    }

    #[test]
    fn defaults_poll_every_thirty_seconds() {
        let settings = ViewerSettings::from_args(&Args::default()).unwrap();
        assert_eq!(settings.poll_settings(), PollSettings::default());
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
    }
}
