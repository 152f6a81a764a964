use crate::model::MarkerSpec;
use crate::prelude::{MapSurface, MarkerId};
use crate::processing::bucket::LocationBuckets;
use crate::processing::severity::classify_durations;
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::widget::SurfaceSlot;
use std::sync::Arc;
use std::time::Duration;

/// Places one marker per location and schedules its removal.
#[derive(Clone)]
pub struct MarkerRenderer {
    slot: SurfaceSlot,
    lifetime: Duration,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl MarkerRenderer {
    pub fn new(slot: SurfaceSlot, lifetime: Duration, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            slot,
            lifetime,
            metrics,
            logger: LogManager::new("renderer"),
        }
    }

    /// Renders every location synchronously. Must run inside a tokio runtime.
    pub fn render(&self, locations: &LocationBuckets) -> Vec<MarkerId> {
        let Some(surface) = self.slot.get() else {
            return Vec::new();
        };

        let mut placed = Vec::with_capacity(locations.len());
        for (key, bucket) in locations {
            let (mean_duration, severity) = classify_durations(&bucket.durations);
            let id = surface.add_marker(MarkerSpec {
                coordinate: bucket.coordinate,
                severity,
                mean_duration,
            });
            self.metrics.record_marker_placed();
            self.logger.debug(&format!(
                "{key}: {} events, mean {mean_duration:.2}s -> {severity}",
                bucket.durations.len()
            ));

            let remover = Remover {
                surface: surface.clone(),
                metrics: self.metrics.clone(),
            };
            let lifetime = self.lifetime;
            tokio::spawn(async move {
                tokio::time::sleep(lifetime).await;
                remover.remove(id);
            });
            placed.push(id);
        }
        placed
    }
}

/// Detaches a marker from the surface it was placed on.
pub struct Remover {
    surface: Arc<dyn MapSurface>,
    metrics: Arc<MetricsRecorder>,
}

impl Remover {
    pub fn remove(&self, id: MarkerId) {
        self.surface.remove_marker(id);
        self.metrics.record_marker_removed();
    }
}
