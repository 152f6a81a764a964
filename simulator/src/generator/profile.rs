use pulsemap::model::QueryRow;
use pulsemap::query::QueryWindow;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Population centers interactions are scattered around: (name, lat, lng).
const CITIES: &[(&str, f64, f64)] = &[
    ("San Francisco", 37.77, -122.42),
    ("New York", 40.71, -74.01),
    ("Sao Paulo", -23.55, -46.63),
    ("London", 51.51, -0.13),
    ("Lagos", 6.52, 3.38),
    ("Berlin", 52.52, 13.40),
    ("Mumbai", 19.08, 72.88),
    ("Singapore", 1.35, 103.82),
    ("Tokyo", 35.68, 139.69),
    ("Sydney", -33.87, 151.21),
];

/// An interaction event tagged with the account it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub account_id: u64,
    pub row: QueryRow,
}

/// Configuration for generating synthetic `BrowserInteraction` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub account_id: u64,
    pub events_per_second: f64,
    pub seed: u64,
    /// Scatter around each city, in degrees.
    pub jitter_deg: f64,
    /// Share of events that take longer than the yellow threshold.
    pub slow_fraction: f64,
    /// Share of events reported without a location.
    pub unlocated_fraction: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            account_id: 1,
            events_per_second: 4.0,
            seed: 0,
            jitter_deg: 0.3,
            slow_fraction: 0.2,
            unlocated_fraction: 0.02,
        }
    }
}

pub struct InteractionGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl InteractionGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    pub fn next_event(&mut self, timestamp: i64) -> StoredEvent {
        let (_, lat, lng) = CITIES[self.rng.gen_range(0..CITIES.len())];
        let jitter = self.config.jitter_deg.abs();

        let duration = if self.rng.gen_bool(self.config.slow_fraction.clamp(0.0, 1.0)) {
            self.rng.gen_range(1.2..9.0)
        } else {
            self.rng.gen_range(0.05..1.2)
        };

        let located = !self
            .rng
            .gen_bool(self.config.unlocated_fraction.clamp(0.0, 1.0));
        let (latitude, longitude) = if located {
            (
                Some(lat + self.offset(jitter)),
                Some(lng + self.offset(jitter)),
            )
        } else {
            (None, None)
        };

        StoredEvent {
            account_id: self.config.account_id,
            row: QueryRow {
                duration,
                latitude,
                longitude,
                timestamp,
            },
        }
    }

    fn offset(&mut self, jitter: f64) -> f64 {
        if jitter > 0.0 {
            self.rng.gen_range(-jitter..jitter)
        } else {
            0.0
        }
    }

    /// Events spread uniformly over `window` at the configured rate.
    pub fn batch(&mut self, window: QueryWindow) -> Vec<StoredEvent> {
        let span_ms = (window.until_ms - window.since_ms).max(0);
        let expected = self.config.events_per_second.max(0.0) * span_ms as f64 / 1_000.0;
        let count = expected.round() as usize;

        let mut events: Vec<StoredEvent> = (0..count)
            .map(|_| {
                let timestamp = if span_ms > 0 {
                    window.since_ms + self.rng.gen_range(0..=span_ms)
                } else {
                    window.until_ms
                };
                self.next_event(timestamp)
            })
            .collect();
        events.sort_by_key(|event| event.row.timestamp);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_matches_rate_and_window() {
        let mut generator = InteractionGenerator::new(GeneratorConfig {
            events_per_second: 5.0,
            ..Default::default()
        });
        let window = QueryWindow::ending_at(100_000, 30_000);
        let events = generator.batch(window);
        assert_eq!(events.len(), 150);
        assert!(events.iter().all(|e| window.contains(e.row.timestamp)));
        assert!(events.windows(2).all(|w| w[0].row.timestamp <= w[1].row.timestamp));
    }

    #[test]
    fn same_seed_replays_the_same_events() {
        let config = GeneratorConfig {
            seed: 13,
            ..Default::default()
        };
        let window = QueryWindow::ending_at(50_000, 10_000);
        let first = InteractionGenerator::new(config.clone()).batch(window);
        let second = InteractionGenerator::new(config).batch(window);
        assert_eq!(first, second);
    }

    #[test]
    fn fractions_control_slow_and_unlocated_events() {
        let mut generator = InteractionGenerator::new(GeneratorConfig {
            account_id: 9,
            slow_fraction: 1.0,
            unlocated_fraction: 1.0,
            ..Default::default()
        });
        let event = generator.next_event(1);
        assert_eq!(event.account_id, 9);
        assert!(event.row.duration >= 1.2);
        assert_eq!(event.row.latitude, None);

        let mut generator = InteractionGenerator::new(GeneratorConfig {
            slow_fraction: 0.0,
            unlocated_fraction: 0.0,
            jitter_deg: 0.0,
            ..Default::default()
        });
        let event = generator.next_event(1);
        assert!(event.row.duration < 1.2);
        assert!(CITIES
            .iter()
            .any(|(_, lat, lng)| event.row.latitude == Some(*lat) && event.row.longitude == Some(*lng)));
    }
}
