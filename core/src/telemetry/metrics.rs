use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub polls: usize,
    pub rows: usize,
    pub markers_placed: usize,
    pub markers_removed: usize,
    pub query_errors: usize,
    pub surface_errors: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_poll(&self) {
        self.update(|m| m.polls += 1);
    }

    pub fn record_rows(&self, count: usize) {
        self.update(|m| m.rows += count);
    }

    pub fn record_marker_placed(&self) {
        self.update(|m| m.markers_placed += 1);
    }

    pub fn record_marker_removed(&self) {
        self.update(|m| m.markers_removed += 1);
    }

    pub fn record_query_error(&self) {
        self.update(|m| m.query_errors += 1);
    }

    pub fn record_surface_error(&self) {
        self.update(|m| m.surface_errors += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = MetricsRecorder::new();
        metrics.record_poll();
        metrics.record_rows(3);
        metrics.record_rows(2);
        metrics.record_marker_placed();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.polls, 1);
        assert_eq!(snapshot.rows, 5);
        assert_eq!(snapshot.markers_placed, 1);
        assert_eq!(snapshot.markers_removed, 0);
    }
}
