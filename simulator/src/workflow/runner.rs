use crate::workflow::config::SimulatorConfig;
use log::{info, log, Level};
use pulsemap::query::HttpQuerySource;
use pulsemap::surface::{BoardSurfaceFactory, SharedBoard};
use pulsemap::telemetry::MetricsSnapshot;
use pulsemap::{PollSettings, QuerySource, RealtimeMap, WidgetStatus};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Drives the widget without a window, logging what would be drawn.
pub struct Watcher {
    config: SimulatorConfig,
    settings: PollSettings,
}

impl Watcher {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            settings: PollSettings::default(),
        }
    }

    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> MetricsSnapshot {
        let source: Arc<dyn QuerySource> = Arc::new(
            HttpQuerySource::new(self.config.endpoint.clone())
                .with_api_key(self.config.api_key.clone())
                .with_timeout(self.settings.interval),
        );
        self.run_with_source(source, shutdown).await
    }

    pub async fn run_with_source(
        &self,
        source: Arc<dyn QuerySource>,
        shutdown: impl Future<Output = ()>,
    ) -> MetricsSnapshot {
        let board = SharedBoard::new();
        let mut widget = RealtimeMap::new(
            Handle::current(),
            Arc::new(BoardSurfaceFactory::new(board.clone())),
            source,
            self.config.map.clone(),
            self.settings.clone(),
        );
        let mut status = widget.subscribe();
        widget.update_config(self.config.widget_config());
        report_status(&widget.status());

        let metrics = widget.metrics();
        let mut report = tokio::time::interval(Duration::from_secs(self.config.report_secs.max(1)));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = status.borrow_and_update().clone();
                    report_status(&current);
                }
                _ = report.tick() => {
                    let snapshot = metrics.snapshot();
                    let live = board.snapshot();
                    let mut line = format!(
                        "polls={} rows={} placed={} removed={} errors={} live={}",
                        snapshot.polls,
                        snapshot.rows,
                        snapshot.markers_placed,
                        snapshot.markers_removed,
                        snapshot.query_errors,
                        live.len()
                    );
                    for marker in live.iter().take(5) {
                        line.push_str(&format!(
                            " [{} {:.1},{:.1}]",
                            marker.spec.severity, marker.spec.coordinate.lat, marker.spec.coordinate.lng
                        ));
                    }
                    info!("{line}");
                }
            }
        }

        widget.shutdown();
        metrics.snapshot()
    }
}

/// Failures stay visible under `RUST_LOG=warn`.
fn status_level(status: &WidgetStatus) -> Level {
    match status {
        WidgetStatus::Error(_) => Level::Warn,
        _ => Level::Info,
    }
}

fn report_status(status: &WidgetStatus) {
    let line = match status {
        WidgetStatus::Empty => {
            "access token & account ID are required to display the visualization".to_string()
        }
        WidgetStatus::Connecting => "waiting for the first poll".to_string(),
        WidgetStatus::Live { last_poll_ms, rows } => {
            format!("poll at {last_poll_ms} returned {rows} rows")
        }
        WidgetStatus::Error(message) => format!("error state: {message}"),
    };
    log!(status_level(status), "{line}");
}
