use serde::{Deserialize, Serialize};

/// One `BrowserInteraction` event as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRow {
    pub duration: f64,
    #[serde(rename = "asnLatitude", alias = "latitude", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "asnLongitude", alias = "longitude", default)]
    pub longitude: Option<f64>,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl QueryRow {
    pub fn new(duration: f64, latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            duration,
            latitude: Some(latitude),
            longitude: Some(longitude),
            timestamp,
        }
    }
}
