use anyhow::Context;
use bridge::server::{feed, serve};
use bridge::store::EventStore;
use clap::Parser;
use generator::profile::InteractionGenerator;
use log::info;
use pulsemap::processing::{severity::classify_durations, Bucketer};
use pulsemap::query::QueryWindow;
use pulsemap::widget::epoch_millis;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::SimulatorConfig;
use workflow::runner::Watcher;

mod bridge;
mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Interaction backend simulator for the realtime map")]
struct Args {
    /// Bucket one generated query window and print the markers it would produce
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Serve the synthetic query backend
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Run the widget headless against the query endpoint
    #[arg(long, default_value_t = false)]
    watch: bool,
    /// Load simulator settings from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<SocketAddr>,
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    account_id: Option<u64>,
    /// Map access token handed to the headless widget
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    events_per_second: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut SimulatorConfig) {
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(account_id) = self.account_id {
            config.generator.account_id = account_id;
        }
        if let Some(token) = &self.token {
            config.access_token = Some(token.clone());
        }
        if let Some(rate) = self.events_per_second {
            config.generator.events_per_second = rate;
        }
        if let Some(seed) = self.seed {
            config.generator.seed = seed;
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = &args.config {
        SimulatorConfig::load(path)?
    } else {
        SimulatorConfig::default()
    };
    args.apply(&mut config);

    if args.offline {
        offline_report(&config);
    }

    if args.serve || args.watch {
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime")?;
        runtime.block_on(run_services(config, args.serve, args.watch))?;
    }

    Ok(())
}

async fn run_services(config: SimulatorConfig, serve_backend: bool, watch: bool) -> anyhow::Result<()> {
    if serve_backend {
        let store = EventStore::new(config.retention_ms());
        tokio::spawn(feed(store.clone(), config.generator.clone()));
        tokio::spawn(serve(store, config.bind));
    }

    if watch {
        let metrics = Watcher::new(config)
            .run(async {
                let _ = signal::ctrl_c().await;
            })
            .await;
        info!(
            "watch finished: {} polls, {} markers placed, {} query errors",
            metrics.polls, metrics.markers_placed, metrics.query_errors
        );
    } else {
        info!("backend running (Ctrl+C to stop)...");
        signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
    }
    Ok(())
}

fn offline_report(config: &SimulatorConfig) {
    let now_ms = epoch_millis();
    let window = QueryWindow::ending_at(now_ms, pulsemap::config::QUERY_WINDOW_MS);
    let events = InteractionGenerator::new(config.generator.clone()).batch(window);
    let rows: Vec<_> = events.into_iter().map(|event| event.row).collect();
    let buckets = Bucketer::new().bucketize(&rows, now_ms);

    println!(
        "Offline window -> {} rows, {} buckets",
        rows.len(),
        buckets.len()
    );
    for (elapsed_ms, locations) in buckets.iter() {
        for (key, bucket) in locations {
            let (mean, severity) = classify_durations(&bucket.durations);
            println!(
                "+{elapsed_ms:>6}ms {key:<16} n={} mean={mean:.2}s {severity}",
                bucket.durations.len()
            );
        }
    }
}
