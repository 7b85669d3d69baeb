use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sc_analysis::{AnalysisOrchestrator, AnalysisRequest};
use sc_hub::{BroadcastHub, PollingLoop, ReconnectPolicy, StockSnapshot, SubscriberSession};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

mod chart;
mod client;
mod config;
mod server;

use chart::ChartSource;
use client::WsTransport;
use config::RelayConfig;

#[derive(Parser, Debug)]
#[clap(name = "signalcast", about = "Stock signal engine and live broadcast relay")]
struct Args {
    /// YAML config file; built-in defaults when omitted
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the websocket relay and the quote poller
    Serve {
        /// Override the configured listen address
        #[clap(long)]
        bind: Option<String>,
    },
    /// Follow a relay and log every update
    Watch {
        #[clap(long, default_value = "ws://127.0.0.1:8001")]
        url: String,
    },
    /// Analyze one ticker and print the result as JSON
    Analyze {
        ticker: String,
        #[clap(long)]
        start: NaiveDate,
        #[clap(long)]
        end: NaiveDate,
        #[clap(long, default_value_t = 60)]
        lookback: usize,
        /// Forward the next-day prediction to this relay
        #[clap(long)]
        publish: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    sc_hub::init_tracing();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            RelayConfig::load(path)?
        }
        None => RelayConfig::default(),
    };

    match args.command {
        Command::Serve { bind } => run_serve(config, bind).await,
        Command::Watch { url } => run_watch(config, url).await,
        Command::Analyze {
            ticker,
            start,
            end,
            lookback,
            publish,
        } => run_analyze(config, AnalysisRequest::new(ticker, start, end, lookback), publish).await,
    }
}

async fn run_serve(config: RelayConfig, bind: Option<String>) -> Result<()> {
    let hub = Arc::new(BroadcastHub::with_queue_capacity(config.hub.session_queue_capacity));
    let source = Arc::new(ChartSource::new(&config.chart_endpoint)?);

    let (stop_tx, stop_rx) = watch::channel(false);

    let poller = PollingLoop::new(hub.clone(), source, config.hub.watchlist.clone())
        .with_error_backoff(config.hub.error_backoff());
    let poller = tokio::spawn(poller.run(stop_rx.clone()));

    let bind_addr = bind.unwrap_or(config.bind_addr);
    let listener = TcpListener::bind(&bind_addr).await?;
    let relay = tokio::spawn(server::serve(listener, hub, stop_rx));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    stop_tx.send(true)?;

    poller.await?;
    relay.await??;
    Ok(())
}

async fn run_watch(config: RelayConfig, url: String) -> Result<()> {
    let policy = ReconnectPolicy::from(config.hub.reconnect);
    let mut session = SubscriberSession::new(WsTransport::new(url), policy);

    loop {
        tokio::select! {
            event = session.next_event() => {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        error!("Watcher stopped: {}", e);
                        return Err(e.into());
                    }
                };
                for snapshot in event.snapshots() {
                    info!(
                        "{:<6} {:>10.2} {:>+7.2}% {}",
                        snapshot.ticker, snapshot.price, snapshot.change_percent, snapshot.signal
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.close().await;
                return Ok(());
            }
        }
    }
}

async fn run_analyze(config: RelayConfig, request: AnalysisRequest, publish: Option<String>) -> Result<()> {
    let source = Arc::new(ChartSource::new(&config.chart_endpoint)?);
    let orchestrator = AnalysisOrchestrator::new(source, config.analysis);

    let result = orchestrator.analyze(&request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(url) = publish {
        let snapshot = StockSnapshot::from_prediction(&result.ticker, &result.next_day);
        client::publish(&url, &snapshot).await?;
    }
    Ok(())
}
