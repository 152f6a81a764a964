use crate::config::MapOptions;
use crate::prelude::{SurfaceError, SurfaceFactory};
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::widget::SurfaceSlot;
use std::sync::Arc;

/// Activates the map surface from an access credential.
pub struct Initializer {
    factory: Arc<dyn SurfaceFactory>,
    options: MapOptions,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl Initializer {
    pub fn new(
        factory: Arc<dyn SurfaceFactory>,
        options: MapOptions,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            factory,
            options,
            metrics,
            logger: LogManager::new("initializer"),
        }
    }

    /// Replaces whatever surface `slot` holds with one built from `token`.
    ///
    /// Returns `Ok(false)` without a token. A construction failure is logged
    /// and leaves the slot empty.
    pub fn activate(&self, token: Option<&str>, slot: &SurfaceSlot) -> Result<bool, SurfaceError> {
        if let Some(previous) = slot.replace(None) {
            previous.teardown();
        }

        let Some(token) = token else {
            return Ok(false);
        };

        match self.factory.create(token, &self.options) {
            Ok(surface) => {
                slot.replace(Some(surface));
                self.logger.record(&format!(
                    "map surface ready ({}, zoom {})",
                    self.options.style, self.options.zoom
                ));
                Ok(true)
            }
            Err(err) => {
                self.metrics.record_surface_error();
                self.logger.error(&format!("map surface construction failed: {err}"));
                Err(err)
            }
        }
    }
}
