use crate::model::LngLat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const POLL_INTERVAL: Duration = Duration::from_millis(30_000);
pub const QUERY_WINDOW_MS: i64 = 30_000;
pub const MARKER_LIFETIME: Duration = Duration::from_millis(3_000);
pub const DEFAULT_STYLE: &str = "mapbox://styles/mapbox/light-v10";

/// Configuration delivered by the host: both values are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub access_token: Option<String>,
    pub account_id: Option<u64>,
}

impl WidgetConfig {
    pub fn new(access_token: Option<String>, account_id: Option<u64>) -> Self {
        Self {
            access_token,
            account_id,
        }
    }

    /// Token, unless missing or blank.
    pub fn token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Account id, unless missing or zero.
    pub fn account(&self) -> Option<u64> {
        self.account_id.filter(|id| *id != 0)
    }

    pub fn is_complete(&self) -> bool {
        self.token().is_some() && self.account().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ControlPosition {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// How the map view is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    pub style: String,
    pub center: LngLat,
    pub zoom: f64,
    pub navigation_control: Option<ControlPosition>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            style: DEFAULT_STYLE.to_string(),
            center: LngLat::new(41.2284, 80.9098),
            zoom: 0.0,
            navigation_control: Some(ControlPosition::TopLeft),
        }
    }
}

/// Timing of the poll loop and marker lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub window_ms: i64,
    pub marker_lifetime: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            window_ms: QUERY_WINDOW_MS,
            marker_lifetime: MARKER_LIFETIME,
        }
    }
}
