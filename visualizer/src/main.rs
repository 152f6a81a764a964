mod map_canvas;
mod outline;
mod settings;

use clap::Parser;
use iced::{
    time,
    widget::{button, column, row, scrollable, text, text_input, Canvas, Column, Container},
    Alignment, Element, Length, Subscription, Task, Theme,
};
use log::{info, warn};
use map_canvas::WorldMap;
use pulsemap::query::HttpQuerySource;
use pulsemap::surface::{BoardSurfaceFactory, SharedBoard};
use pulsemap::{RealtimeMap, WidgetConfig, WidgetStatus};
use settings::{Args, ViewerSettings};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio::sync::watch;

const EMPTY_STATE: &str = "Map access token & account ID are required to display the visualization";
const ERROR_STATE: &str = "Oops! Something went wrong.";
const ZOOM_STEP: f64 = 0.5;

static SETTINGS: OnceLock<ViewerSettings> = OnceLock::new();
static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let settings = ViewerSettings::from_args(&Args::parse())?;
    info!("querying {} every {}s", settings.endpoint, settings.poll_secs);
    let _ = SETTINGS.set(settings);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let _ = RUNTIME.set(runtime);

    iced::application(Visualizer::boot, Visualizer::update, Visualizer::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()?;
    Ok(())
}

fn application_title(_: &Visualizer) -> String {
    "Realtime Interaction Map".into()
}

fn application_subscription(_: &Visualizer) -> Subscription<Message> {
    time::every(Duration::from_millis(50)).map(|_| Message::Tick)
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Light
}

struct Visualizer {
    form: ConfigForm,
    widget: Option<RealtimeMap>,
    board: SharedBoard,
    status: Option<watch::Receiver<WidgetStatus>>,
    current: WidgetStatus,
    lifetime: Duration,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    TokenChanged(String),
    AccountChanged(String),
    ApplyConfig,
    Zoom(f64),
    Pan(f64, f64),
}

impl Visualizer {
    fn boot() -> (Self, Task<Message>) {
        let settings = SETTINGS.get_or_init(ViewerSettings::default).clone();
        let board = SharedBoard::new();
        let poll = settings.poll_settings();
        let lifetime = poll.marker_lifetime;

        let widget = RUNTIME.get().map(|runtime| {
            let source = HttpQuerySource::new(settings.endpoint.clone())
                .with_api_key(settings.api_key.clone())
                .with_timeout(poll.interval);
            RealtimeMap::new(
                runtime.handle().clone(),
                Arc::new(BoardSurfaceFactory::new(board.clone())),
                Arc::new(source),
                settings.map.clone(),
                poll,
            )
        });

        let mut state = Visualizer {
            form: ConfigForm {
                token: settings.access_token.clone().unwrap_or_default(),
                account_id: settings
                    .account_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
            },
            status: widget.as_ref().map(RealtimeMap::subscribe),
            widget,
            board,
            current: WidgetStatus::Empty,
            lifetime,
            history: Vec::new(),
        };
        state.apply_config();
        (state, Task::none())
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                let changed = state
                    .status
                    .as_mut()
                    .filter(|receiver| receiver.has_changed().unwrap_or(false))
                    .map(|receiver| receiver.borrow_and_update().clone());
                if let Some(status) = changed {
                    state.push_history(describe(&status));
                    state.current = status;
                }
            }
            Message::TokenChanged(value) => state.form.token = value,
            Message::AccountChanged(value) => state.form.account_id = value,
            Message::ApplyConfig => state.apply_config(),
            Message::Zoom(delta) => {
                if let Some(view) = state.board.lock().view_mut() {
                    view.zoom_by(delta);
                }
            }
            Message::Pan(d_lng, d_lat) => {
                if let Some(view) = state.board.lock().view_mut() {
                    let step = 45.0 / 2f64.powf(view.zoom);
                    view.pan_by(d_lng * step, d_lat * step);
                }
            }
        }
        Task::none()
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let metrics = state
            .widget
            .as_ref()
            .map(|widget| widget.metrics().snapshot())
            .unwrap_or_default();

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No activity yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                })
        };

        let config_column = column![
            text("Configuration").size(26),
            text_input("Map access token", &state.form.token)
                .on_input(Message::TokenChanged)
                .padding(6),
            text_input("Account ID", &state.form.account_id)
                .on_input(Message::AccountChanged)
                .padding(6),
            button("Apply").on_press(Message::ApplyConfig).padding(10),
            text(describe(&state.current)).size(14),
            column![
                text("Legend").size(16),
                text("green: mean duration up to 1.2s").size(12),
                text("yellow: mean duration up to 4.8s").size(12),
                text("red: mean duration above 4.8s").size(12),
            ]
            .spacing(4)
            .padding(6),
            text(format!(
                "Polls {} | rows {} | markers {} | errors {}",
                metrics.polls, metrics.rows, metrics.markers_placed, metrics.query_errors
            ))
            .size(12),
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(160.0))).padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fixed(320.0));

        let layout = row![config_column, state.map_panel()]
            .spacing(20)
            .align_y(Alignment::Start)
            .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn map_panel(&self) -> Element<'_, Message> {
        if !self.form_config().is_complete() {
            return Container::new(text(EMPTY_STATE).size(22))
                .padding(24)
                .width(Length::Fill)
                .into();
        }
        if let WidgetStatus::Error(detail) = &self.current {
            if self.board.view().is_none() {
                return Container::new(
                    column![text(ERROR_STATE).size(22), text(detail.clone()).size(14)].spacing(8),
                )
                .padding(24)
                .width(Length::Fill)
                .into();
            }
        }

        let Some(view) = self.board.view() else {
            return Container::new(text("Preparing map...").size(16))
                .padding(24)
                .into();
        };

        let controls = row![
            button("+").on_press(Message::Zoom(ZOOM_STEP)),
            button("-").on_press(Message::Zoom(-ZOOM_STEP)),
            button("<").on_press(Message::Pan(-1.0, 0.0)),
            button(">").on_press(Message::Pan(1.0, 0.0)),
            button("^").on_press(Message::Pan(0.0, 1.0)),
            button("v").on_press(Message::Pan(0.0, -1.0)),
        ]
        .spacing(4);

        let map = Canvas::new(WorldMap {
            view: view.clone(),
            markers: self.board.snapshot(),
            lifetime: self.lifetime,
            now: Instant::now(),
        })
        .width(Length::Fill)
        .height(Length::Fill);

        let mut panel = Column::new().spacing(8);
        if view.navigation_control.is_some() {
            panel = panel.push(controls);
        }
        panel = panel.push(map);
        if let WidgetStatus::Error(detail) = &self.current {
            panel = panel.push(text(format!("{ERROR_STATE} {detail}")).size(12));
        }
        panel.width(Length::Fill).height(Length::Fill).into()
    }

    fn form_config(&self) -> WidgetConfig {
        let token = Some(self.form.token.clone()).filter(|t| !t.trim().is_empty());
        let account_id = self.form.account_id.trim().parse::<u64>().ok();
        WidgetConfig::new(token, account_id)
    }

    fn apply_config(&mut self) {
        let config = self.form_config();
        match self.widget.as_mut() {
            Some(widget) => widget.update_config(config),
            None => warn!("no runtime available, configuration ignored"),
        }
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

fn describe(status: &WidgetStatus) -> String {
    match status {
        WidgetStatus::Empty => "Waiting for token and account".into(),
        WidgetStatus::Connecting => "Map ready, polling...".into(),
        WidgetStatus::Live { last_poll_ms, rows } => {
            format!("Poll at {last_poll_ms}: {rows} interactions")
        }
        WidgetStatus::Error(detail) => format!("Error: {detail}"),
    }
}

#[derive(Debug, Clone, Default)]
struct ConfigForm {
    token: String,
    account_id: String,
}
