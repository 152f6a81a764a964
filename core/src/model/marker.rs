use crate::model::geo::LngLat;
use crate::prelude::MarkerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Visual severity derived from the mean interaction duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Green,
    Yellow,
    Red,
}

impl Severity {
    pub fn color(self) -> &'static str {
        match self {
            Severity::Green => "green",
            Severity::Yellow => "yellow",
            Severity::Red => "red",
        }
    }

    /// Style class attached to the marker element.
    pub fn css_class(self) -> String {
        format!("{}-dot", self.color())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.color())
    }
}

/// What the renderer asks a surface to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub coordinate: LngLat,
    pub severity: Severity,
    pub mean_duration: f64,
}

/// A marker currently attached to a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedMarker {
    pub id: MarkerId,
    pub spec: MarkerSpec,
    pub placed_at: Instant,
}

impl PlacedMarker {
    /// Fraction of `lifetime` elapsed at `now`, clamped to `0.0..=1.0`.
    pub fn progress(&self, now: Instant, lifetime: std::time::Duration) -> f32 {
        if lifetime.is_zero() {
            return 1.0;
        }
        let age = now.saturating_duration_since(self.placed_at);
        (age.as_secs_f32() / lifetime.as_secs_f32()).clamp(0.0, 1.0)
    }
}
