//! The widget runtime: configuration in, markers out.
//!
//! [`RealtimeMap`] wires the [`Initializer`], the [`Poller`] and the
//! [`MarkerRenderer`] together and reacts to configuration changes the way a
//! host dashboard delivers them.

pub mod initializer;
pub mod poller;
pub mod renderer;

pub use initializer::Initializer;
pub use poller::{epoch_millis, PollContext, PollHandle, Poller};
pub use renderer::{MarkerRenderer, Remover};

use crate::config::{MapOptions, PollSettings, WidgetConfig};
use crate::prelude::{MapSurface, QuerySource, SurfaceFactory};
use crate::telemetry::{LogManager, MetricsRecorder};
use std::sync::{Arc, RwLock};
use tokio::runtime::Handle;
use tokio::sync::watch;

/// What the widget should currently display.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetStatus {
    /// Token or account id missing.
    Empty,
    /// Surface active, first poll not answered yet.
    Connecting,
    Live { last_poll_ms: i64, rows: usize },
    Error(String),
}

/// Holder of the single active map surface.
#[derive(Clone, Default)]
pub struct SurfaceSlot(Arc<RwLock<Option<Arc<dyn MapSurface>>>>);

impl SurfaceSlot {
    pub fn get(&self) -> Option<Arc<dyn MapSurface>> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Stores `surface` and returns the previous one.
    pub fn replace(&self, surface: Option<Arc<dyn MapSurface>>) -> Option<Arc<dyn MapSurface>> {
        let mut guard = match self.0.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, surface)
    }

    pub fn is_active(&self) -> bool {
        self.get().is_some()
    }
}

/// Map widget with periodic interaction polling.
pub struct RealtimeMap {
    runtime: Handle,
    initializer: Initializer,
    source: Arc<dyn QuerySource>,
    settings: PollSettings,
    config: WidgetConfig,
    slot: SurfaceSlot,
    renderer: MarkerRenderer,
    poller: Option<PollHandle>,
    status: Arc<watch::Sender<WidgetStatus>>,
    metrics: Arc<MetricsRecorder>,
    clock: fn() -> i64,
    logger: LogManager,
}

impl RealtimeMap {
    pub fn new(
        runtime: Handle,
        factory: Arc<dyn SurfaceFactory>,
        source: Arc<dyn QuerySource>,
        options: MapOptions,
        settings: PollSettings,
    ) -> Self {
        let metrics = Arc::new(MetricsRecorder::new());
        let slot = SurfaceSlot::default();
        let renderer = MarkerRenderer::new(slot.clone(), settings.marker_lifetime, metrics.clone());
        let (status, _) = watch::channel(WidgetStatus::Empty);

        Self {
            runtime,
            initializer: Initializer::new(factory, options, metrics.clone()),
            source,
            settings,
            config: WidgetConfig::default(),
            slot,
            renderer,
            poller: None,
            status: Arc::new(status),
            metrics,
            clock: epoch_millis,
            logger: LogManager::new("widget"),
        }
    }

    /// Replaces the wall clock used to anchor query windows.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn status(&self) -> WidgetStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WidgetStatus> {
        self.status.subscribe()
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        self.metrics.clone()
    }

    pub fn is_surface_active(&self) -> bool {
        self.slot.is_active()
    }

    pub fn polling_account(&self) -> Option<u64> {
        self.poller.as_ref().map(PollHandle::account_id)
    }

    /// Applies a configuration delivered by the host.
    ///
    /// A new token rebuilds the surface (and restarts polling); a new account
    /// id alone restarts polling.
    pub fn update_config(&mut self, next: WidgetConfig) {
        let token_changed = next.token() != self.config.token();
        let account_changed = next.account() != self.config.account();
        self.config = next;

        if token_changed {
            self.map_and_load();
        } else if account_changed {
            self.load_map_data();
        }

        if !self.config.is_complete() {
            self.status.send_replace(WidgetStatus::Empty);
        }
    }

    fn map_and_load(&mut self) {
        self.stop_polling();
        match self.initializer.activate(self.config.token(), &self.slot) {
            Ok(true) => self.load_map_data(),
            Ok(false) => {}
            Err(err) => {
                self.status
                    .send_replace(WidgetStatus::Error(format!("map unavailable: {err}")));
            }
        }
    }

    fn load_map_data(&mut self) {
        self.stop_polling();
        let Some(account_id) = self.config.account() else {
            return;
        };

        let context = PollContext {
            account_id,
            source: self.source.clone(),
            slot: self.slot.clone(),
            renderer: self.renderer.clone(),
            settings: self.settings.clone(),
            status: self.status.clone(),
            metrics: self.metrics.clone(),
            clock: self.clock,
        };
        self.poller = Poller::start(&self.runtime, context);
        if self.poller.is_some() {
            self.status.send_replace(WidgetStatus::Connecting);
            self.logger
                .record(&format!("polling started for account {account_id}"));
        }
    }

    fn stop_polling(&mut self) {
        if let Some(handle) = self.poller.take() {
            self.logger
                .record(&format!("polling stopped for account {}", handle.account_id()));
            handle.cancel();
        }
    }

    /// Stops polling and releases the surface.
    pub fn shutdown(&mut self) {
        self.stop_polling();
        if let Some(surface) = self.slot.replace(None) {
            surface.teardown();
        }
    }
}

impl Drop for RealtimeMap {
    fn drop(&mut self) {
        self.shutdown();
    }
}
