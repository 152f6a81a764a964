use serde::{Deserialize, Serialize};
use std::fmt;

/// Longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Formats `value` with one decimal place, rounding ties away from zero.
///
/// Returns `None` for NaN and infinities.
pub fn fixed_one_decimal(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    // Negative zero renders as plain zero.
    let value = if value == 0.0 { 0.0 } else { value };
    // Only odd multiples of 0.25 sit exactly on a tie at one decimal.
    let quarters = value * 4.0;
    let on_tie = quarters.fract() == 0.0 && quarters % 2.0 != 0.0;
    let adjusted = if on_tie {
        value + value.signum() * 0.05
    } else {
        value
    };
    Some(format!("{adjusted:.1}"))
}

/// Bucket key for a rounded location, e.g. `at10.1x20.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey(String);

impl LocationKey {
    /// Rounds both coordinates and returns the key with the rounded position.
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Option<(Self, LngLat)> {
        let lat = fixed_one_decimal(latitude)?;
        let lng = fixed_one_decimal(longitude)?;
        let position = LngLat::new(
            lng.parse().unwrap_or(longitude),
            lat.parse().unwrap_or(latitude),
        );
        Some((Self(format!("at{lat}x{lng}")), position))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(fixed_one_decimal(10.05).as_deref(), Some("10.1"));
        assert_eq!(fixed_one_decimal(-33.86).as_deref(), Some("-33.9"));
        assert_eq!(fixed_one_decimal(0.0).as_deref(), Some("0.0"));
    }

    #[test]
    fn exact_ties_round_away_from_zero() {
        assert_eq!(fixed_one_decimal(0.25).as_deref(), Some("0.3"));
        assert_eq!(fixed_one_decimal(-1.75).as_deref(), Some("-1.8"));
        assert_eq!(fixed_one_decimal(0.15).as_deref(), Some("0.1"));
    }

    #[test]
    fn negative_zero_shares_the_zero_key() {
        assert_eq!(fixed_one_decimal(-0.0).as_deref(), Some("0.0"));
        assert_eq!(fixed_one_decimal(-0.04).as_deref(), Some("-0.0"));
        let (negative, _) = LocationKey::from_coordinates(-0.0, 5.0).unwrap();
        let (positive, _) = LocationKey::from_coordinates(0.0, 5.0).unwrap();
        assert_eq!(negative, positive);
        assert_eq!(negative.as_str(), "at0.0x5.0");
    }

    #[test]
    fn non_finite_values_have_no_rendering() {
        assert_eq!(fixed_one_decimal(f64::NAN), None);
        assert_eq!(fixed_one_decimal(f64::INFINITY), None);
    }

    #[test]
    fn location_key_keeps_rounded_position() {
        let (key, position) = LocationKey::from_coordinates(10.05, 20.05).unwrap();
        assert_eq!(key.as_str(), "at10.1x20.1");
        assert_eq!(position, LngLat::new(20.1, 10.1));
    }
}
