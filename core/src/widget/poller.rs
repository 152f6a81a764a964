use crate::config::PollSettings;
use crate::prelude::QuerySource;
use crate::processing::Bucketer;
use crate::query::{InteractionQuery, QueryWindow};
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::widget::renderer::MarkerRenderer;
use crate::widget::{SurfaceSlot, WidgetStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};

/// Everything one poll loop needs.
pub struct PollContext {
    pub account_id: u64,
    pub source: Arc<dyn QuerySource>,
    pub slot: SurfaceSlot,
    pub renderer: MarkerRenderer,
    pub settings: PollSettings,
    pub status: Arc<watch::Sender<WidgetStatus>>,
    pub metrics: Arc<MetricsRecorder>,
    /// Wall clock in epoch milliseconds.
    pub clock: fn() -> i64,
}

/// Running poll loop. Dropping the handle stops it along with any
/// renders it still has pending.
pub struct PollHandle {
    account_id: u64,
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn account_id(&self) -> u64 {
        self.account_id
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        // Abort only takes effect at the task's next await point; a cycle
        // still running on another worker must not publish after this.
        self.active.store(false, Ordering::SeqCst);
        self.task.abort();
    }
}

pub struct Poller;

impl Poller {
    /// Starts polling, unless the account is zero or no surface is active.
    pub fn start(runtime: &Handle, context: PollContext) -> Option<PollHandle> {
        if context.account_id == 0 || !context.slot.is_active() {
            return None;
        }
        let account_id = context.account_id;
        let active = Arc::new(AtomicBool::new(true));
        let task = runtime.spawn(run(Arc::new(context), active.clone()));
        Some(PollHandle {
            account_id,
            active,
            task,
        })
    }
}

/// Publishes `next` unless the loop has been cancelled.
///
/// The flag is read under the channel's write lock, so a status sent after
/// cancellation is never overwritten by a late cycle.
fn publish(
    status: &watch::Sender<WidgetStatus>,
    active: &AtomicBool,
    next: WidgetStatus,
) -> bool {
    status.send_if_modified(|current| {
        if !active.load(Ordering::SeqCst) {
            return false;
        }
        *current = next;
        true
    })
}

async fn run(context: Arc<PollContext>, active: Arc<AtomicBool>) {
    let logger = LogManager::new("poller");
    let period = context.settings.interval.max(Duration::from_millis(1));
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycles = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                cycles.spawn(run_cycle(context.clone(), active.clone()));
            }
            Some(finished) = cycles.join_next(), if !cycles.is_empty() => {
                if let Err(err) = finished {
                    if err.is_panic() {
                        logger.error(&format!("poll cycle panicked: {err}"));
                    }
                }
            }
        }
    }
}

/// One query plus the delayed renders of its buckets.
async fn run_cycle(context: Arc<PollContext>, active: Arc<AtomicBool>) {
    if !context.slot.is_active() {
        return;
    }
    let logger = LogManager::new("poller");
    context.metrics.record_poll();

    let now_ms = (context.clock)();
    logger.record(&format!(
        "polling data at {now_ms} for account {}",
        context.account_id
    ));

    let window = QueryWindow::ending_at(now_ms, context.settings.window_ms);
    let request = InteractionQuery::new(window).request(context.account_id);

    let rows = match context.source.query(request).await {
        Ok(rows) => rows,
        Err(err) => {
            context.metrics.record_query_error();
            logger.error(&format!("query failed: {err}"));
            publish(
                &context.status,
                &active,
                WidgetStatus::Error(format!("query failed: {err}")),
            );
            return;
        }
    };

    context.metrics.record_rows(rows.len());
    let live = WidgetStatus::Live {
        last_poll_ms: now_ms,
        rows: rows.len(),
    };
    if !publish(&context.status, &active, live) || rows.is_empty() {
        return;
    }

    let mut renders = JoinSet::new();
    for (delay, locations) in Bucketer::new().bucketize(&rows, now_ms).into_schedule() {
        let renderer = context.renderer.clone();
        let active = active.clone();
        renders.spawn(async move {
            time::sleep(delay).await;
            if active.load(Ordering::SeqCst) {
                renderer.render(&locations);
            }
        });
    }
    while renders.join_next().await.is_some() {}
}

pub fn epoch_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MapOptions, MARKER_LIFETIME};
    use crate::model::{QueryRow, Severity};
    use crate::prelude::{QueryError, QueryFuture, SurfaceFactory};
    use crate::query::NrqlRequest;
    use crate::surface::{BoardSurfaceFactory, SharedBoard};
    use std::sync::Mutex;
    use tokio::time::sleep;

    const NOW: i64 = 1_700_000_000_000;

    fn fixed_clock() -> i64 {
        NOW
    }

    #[derive(Clone, Copy)]
    enum Reply {
        Rows,
        Fail,
        /// Fails on the first call, answers rows afterwards.
        FailOnce,
        Hang,
    }

    struct FakeSource {
        reply: Reply,
        requests: Mutex<Vec<NrqlRequest>>,
    }

    impl FakeSource {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl QuerySource for FakeSource {
        fn query(&self, request: NrqlRequest) -> QueryFuture {
            let calls = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(request);
                requests.len()
            };
            let reply = match self.reply {
                Reply::FailOnce if calls == 1 => Reply::Fail,
                Reply::FailOnce => Reply::Rows,
                other => other,
            };
            Box::pin(async move {
                match reply {
                    Reply::Rows | Reply::FailOnce => Ok(vec![
                        QueryRow::new(5.0, 10.05, 20.05, NOW - 1_000),
                        QueryRow::new(0.5, 10.05, 20.05, NOW - 1_000),
                    ]),
                    Reply::Fail => Err(QueryError::Transport("connection refused".into())),
                    Reply::Hang => std::future::pending().await,
                }
            })
        }
    }

    struct Harness {
        board: SharedBoard,
        status: watch::Receiver<WidgetStatus>,
        metrics: Arc<MetricsRecorder>,
        handle: PollHandle,
    }

    fn start(source: Arc<FakeSource>) -> Harness {
        let board = SharedBoard::new();
        let slot = SurfaceSlot::default();
        slot.replace(Some(
            BoardSurfaceFactory::new(board.clone())
                .create("pk.test", &MapOptions::default())
                .unwrap(),
        ));
        let metrics = Arc::new(MetricsRecorder::new());
        let (status, receiver) = watch::channel(WidgetStatus::Connecting);
        let context = PollContext {
            account_id: 42,
            source,
            slot: slot.clone(),
            renderer: MarkerRenderer::new(slot, MARKER_LIFETIME, metrics.clone()),
            settings: PollSettings::default(),
            status: Arc::new(status),
            metrics: metrics.clone(),
            clock: fixed_clock,
        };
        let handle = Poller::start(&Handle::current(), context).unwrap();
        Harness {
            board,
            status: receiver,
            metrics,
            handle,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_and_every_interval() {
        let source = FakeSource::new(Reply::Rows);
        let harness = start(source.clone());

        sleep(Duration::from_millis(10)).await;
        assert_eq!(source.count(), 1);
        sleep(Duration::from_secs(61)).await;
        assert_eq!(source.count(), 3);

        let request = source.requests.lock().unwrap()[0].clone();
        assert_eq!(request.account_id, 42);
        assert!(request
            .query
            .contains(&format!("SINCE {} UNTIL {}", NOW - 30_000, NOW)));
        assert_eq!(harness.handle.account_id(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_queries_do_not_delay_the_next_poll() {
        let source = FakeSource::new(Reply::Hang);
        let _harness = start(source.clone());
        sleep(Duration::from_secs(90) + Duration::from_millis(10)).await;
        assert_eq!(source.count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_set_error_status_and_polling_continues() {
        let source = FakeSource::new(Reply::Fail);
        let harness = start(source.clone());
        sleep(Duration::from_secs(31)).await;

        assert_eq!(source.count(), 2);
        assert!(matches!(&*harness.status.borrow(), WidgetStatus::Error(msg) if msg.contains("connection refused")));
        assert_eq!(harness.metrics.snapshot().query_errors, 2);
        assert!(harness.board.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn next_successful_poll_clears_the_error_state() {
        let source = FakeSource::new(Reply::FailOnce);
        let harness = start(source.clone());

        sleep(Duration::from_millis(10)).await;
        assert!(matches!(&*harness.status.borrow(), WidgetStatus::Error(_)));

        sleep(Duration::from_secs(30)).await;
        assert_eq!(source.count(), 2);
        assert_eq!(
            *harness.status.borrow(),
            WidgetStatus::Live {
                last_poll_ms: NOW,
                rows: 2
            }
        );
        assert_eq!(harness.metrics.snapshot().query_errors, 1);
    }

    #[test]
    fn cancelled_loop_does_not_publish_status() {
        let (status, receiver) = watch::channel(WidgetStatus::Empty);
        let active = AtomicBool::new(false);
        assert!(!publish(&status, &active, WidgetStatus::Error("late".into())));
        assert_eq!(*receiver.borrow(), WidgetStatus::Empty);

        active.store(true, Ordering::SeqCst);
        assert!(publish(&status, &active, WidgetStatus::Connecting));
        assert_eq!(*receiver.borrow(), WidgetStatus::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn buckets_render_after_their_elapsed_delay_and_expire() {
        let source = FakeSource::new(Reply::Rows);
        let harness = start(source);

        sleep(Duration::from_millis(500)).await;
        assert!(harness.board.lock().is_empty());
        assert_eq!(
            *harness.status.borrow(),
            WidgetStatus::Live {
                last_poll_ms: NOW,
                rows: 2
            }
        );

        sleep(Duration::from_millis(1_000)).await;
        let markers = harness.board.snapshot();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].spec.severity, Severity::Yellow);
        assert_eq!(markers[0].spec.mean_duration, 2.75);

        sleep(Duration::from_millis(2_000)).await;
        assert_eq!(harness.board.lock().len(), 1);

        sleep(Duration::from_millis(1_000)).await;
        assert!(harness.board.lock().is_empty());
        assert_eq!(harness.metrics.snapshot().markers_placed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_loop_stops_polling_and_pending_renders() {
        let source = FakeSource::new(Reply::Rows);
        let harness = start(source.clone());
        sleep(Duration::from_millis(100)).await;
        harness.handle.cancel();

        sleep(Duration::from_secs(65)).await;
        assert_eq!(source.count(), 1);
        assert!(harness.board.lock().is_empty());
        assert_eq!(harness.metrics.snapshot().markers_placed, 0);
    }

    #[tokio::test]
    async fn start_requires_an_active_surface_and_account() {
        let metrics = Arc::new(MetricsRecorder::new());
        let slot = SurfaceSlot::default();
        let (status, _receiver) = watch::channel(WidgetStatus::Empty);
        let context = PollContext {
            account_id: 42,
            source: FakeSource::new(Reply::Rows),
            slot: slot.clone(),
            renderer: MarkerRenderer::new(slot, MARKER_LIFETIME, metrics.clone()),
            settings: PollSettings::default(),
            status: Arc::new(status),
            metrics,
            clock: fixed_clock,
        };
        assert!(Poller::start(&Handle::current(), context).is_none());
    }
}
