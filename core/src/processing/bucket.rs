use crate::model::{LngLat, LocationKey, QueryRow};
use crate::telemetry::log::LogManager;
use std::collections::BTreeMap;
use std::time::Duration;

/// Durations seen at one rounded location.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationBucket {
    pub durations: Vec<f64>,
    pub coordinate: LngLat,
}

pub type LocationBuckets = BTreeMap<LocationKey, LocationBucket>;

/// Rows grouped by elapsed milliseconds, then by rounded location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeBuckets {
    buckets: BTreeMap<i64, LocationBuckets>,
}

impl TimeBuckets {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn get(&self, elapsed_ms: i64) -> Option<&LocationBuckets> {
        self.buckets.get(&elapsed_ms)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i64, &LocationBuckets)> {
        self.buckets.iter()
    }

    /// Buckets paired with the delay before they should be rendered.
    ///
    /// Negative elapsed values (events stamped after the query time) render
    /// immediately.
    pub fn into_schedule(self) -> Vec<(Duration, LocationBuckets)> {
        self.buckets
            .into_iter()
            .map(|(elapsed_ms, locations)| {
                let delay = Duration::from_millis(u64::try_from(elapsed_ms).unwrap_or(0));
                (delay, locations)
            })
            .collect()
    }
}

/// Groups query rows into time and location buckets.
pub struct Bucketer {
    logger: LogManager,
}

impl Bucketer {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("bucketer"),
        }
    }

    /// Buckets `rows` relative to the query time `now_ms`.
    pub fn bucketize(&self, rows: &[QueryRow], now_ms: i64) -> TimeBuckets {
        let mut result = TimeBuckets::default();
        let mut skipped = 0usize;

        for row in rows {
            let Some((key, coordinate)) = row
                .latitude
                .zip(row.longitude)
                .and_then(|(lat, lng)| LocationKey::from_coordinates(lat, lng))
            else {
                skipped += 1;
                continue;
            };

            let elapsed_ms = now_ms - row.timestamp;
            result
                .buckets
                .entry(elapsed_ms)
                .or_default()
                .entry(key)
                .or_insert_with(|| LocationBucket {
                    durations: Vec::new(),
                    coordinate,
                })
                .durations
                .push(row.duration);
        }

        if skipped > 0 {
            self.logger
                .debug(&format!("skipped {skipped} rows without a usable location"));
        }
        result
    }
}

impl Default for Bucketer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_030_000;

    fn row(duration: f64, lat: Option<f64>, lng: Option<f64>, ago: i64) -> QueryRow {
        QueryRow {
            duration,
            latitude: lat,
            longitude: lng,
            timestamp: NOW - ago,
        }
    }

    #[test]
    fn same_elapsed_and_location_share_a_bucket() {
        let rows = vec![
            QueryRow::new(5.0, 10.05, 20.05, NOW - 1_000),
            QueryRow::new(0.5, 10.05, 20.05, NOW - 1_000),
        ];
        let buckets = Bucketer::new().bucketize(&rows, NOW);

        assert_eq!(buckets.len(), 1);
        let locations = buckets.get(1_000).unwrap();
        assert_eq!(locations.len(), 1);
        let bucket = locations.values().next().unwrap();
        assert_eq!(locations.keys().next().unwrap().as_str(), "at10.1x20.1");
        assert_eq!(bucket.durations, vec![5.0, 0.5]);
        assert_eq!(bucket.coordinate, LngLat::new(20.1, 10.1));
    }

    #[test]
    fn different_elapsed_values_split_buckets() {
        let rows = vec![
            QueryRow::new(1.0, 1.0, 1.0, NOW - 10),
            QueryRow::new(1.0, 1.0, 1.0, NOW - 11),
            QueryRow::new(1.0, 1.04, 1.0, NOW - 10),
        ];
        let buckets = Bucketer::new().bucketize(&rows, NOW);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets.get(10).unwrap().values().next().unwrap().durations.len(), 2);
        assert_eq!(buckets.get(11).unwrap().len(), 1);
    }

    #[test]
    fn rows_without_usable_coordinates_are_excluded() {
        let rows = vec![
            row(1.0, None, Some(2.0), 5),
            row(1.0, Some(2.0), None, 5),
            row(1.0, Some(f64::NAN), Some(2.0), 5),
            row(1.0, Some(2.0), Some(f64::INFINITY), 6),
        ];
        assert!(Bucketer::new().bucketize(&rows, NOW).is_empty());
    }

    #[test]
    fn zero_coordinates_are_kept() {
        let rows = vec![row(0.3, Some(0.0), Some(0.0), 5)];
        let buckets = Bucketer::new().bucketize(&rows, NOW);
        assert_eq!(buckets.get(5).unwrap().keys().next().unwrap().as_str(), "at0.0x0.0");
    }

    #[test]
    fn signed_zero_rows_share_a_location() {
        let rows = vec![
            row(1.0, Some(-0.0), Some(5.0), 5),
            row(3.0, Some(0.0), Some(5.0), 5),
        ];
        let buckets = Bucketer::new().bucketize(&rows, NOW);
        let locations = buckets.get(5).unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations.values().next().unwrap().durations, vec![1.0, 3.0]);
    }

    #[test]
    fn empty_rows_produce_no_buckets() {
        let buckets = Bucketer::new().bucketize(&[], NOW);
        assert!(buckets.is_empty());
        assert!(buckets.into_schedule().is_empty());
    }

    #[test]
    fn bucketing_is_repeatable() {
        let rows = vec![
            QueryRow::new(2.0, 51.5, -0.12, NOW - 2_500),
            QueryRow::new(6.0, 40.71, -74.0, NOW - 100),
            QueryRow::new(0.1, 40.74, -74.01, NOW - 100),
        ];
        let bucketer = Bucketer::new();
        assert_eq!(bucketer.bucketize(&rows, NOW), bucketer.bucketize(&rows, NOW));
    }

    #[test]
    fn schedule_delays_by_elapsed_and_clamps_future_rows() {
        let rows = vec![
            QueryRow::new(1.0, 1.0, 1.0, NOW - 2_000),
            QueryRow::new(1.0, 1.0, 1.0, NOW + 50),
        ];
        let delays: Vec<Duration> = Bucketer::new()
            .bucketize(&rows, NOW)
            .into_schedule()
            .into_iter()
            .map(|(delay, _)| delay)
            .collect();
        assert_eq!(delays, vec![Duration::ZERO, Duration::from_millis(2_000)]);
    }
}
