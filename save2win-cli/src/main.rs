use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use save2win_finance::{NarrativeContent, apply_game_rules, summarize};
use save2win_ingest::{parse_csv_file, transactions_from_any};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod engine;
mod error;
mod gateway;
mod health;
mod llm;
mod state;
#[cfg(test)]
mod test_support;
mod upstream;

use config::Config;
use state::{EngineState, GatewayState};

#[derive(Parser, Debug)]
#[command(name = "save2win", version, about = "Save2Win transaction context and game-state services")]
struct Cli {
    /// Optional TOML config file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one of the HTTP services
    Serve {
        #[command(subcommand)]
        service: Service,

        /// Listen port (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Summarize raw transactions from a .json or .csv file
    Summarize {
        file: PathBuf,

        /// Anchor for the rolling windows (RFC 3339, default: now)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// Compute game state for raw transactions from a .json or .csv file
    Game {
        file: PathBuf,

        /// Quest text (default: fallback content)
        #[arg(long)]
        quest: Option<String>,

        /// Tip text (default: fallback content)
        #[arg(long)]
        tip: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Service {
    /// Transaction context gateway
    Gateway,
    /// Game-state engine
    Engine,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug,tower_http=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { service, port } => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(p) = port {
                config.server.port = p;
            }
            serve(service, Arc::new(config)).await?;
        }

        Command::Summarize { file, now } => {
            let txns = load_records(&file)?;
            let summary = summarize(&txns, now.unwrap_or_else(Utc::now));
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Game { file, quest, tip } => {
            let txns = load_records(&file)?;
            let mut content = NarrativeContent::fallback();
            if let Some(q) = quest {
                content.quest = q;
            }
            if let Some(t) = tip {
                content.tip = t;
            }
            let state = apply_game_rules(&txns, &content);
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}

async fn serve(service: Service, config: Arc<Config>) -> Result<()> {
    let app = match service {
        Service::Gateway => gateway::router(GatewayState::new(config.clone())?),
        Service::Engine => engine::router(EngineState::new(config.clone(), &auth::SIGNING_KEY)?),
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(
        "{:?} listening on {} (build {})",
        service,
        listener.local_addr()?,
        env!("SAVE2WIN_BUILD_SHA")
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// Raw records from a local file: CSV by extension, JSON otherwise.
fn load_records(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        return parse_csv_file(path);
    }

    let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(transactions_from_any(value))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("error installing ctrl+c handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!("error installing signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}
