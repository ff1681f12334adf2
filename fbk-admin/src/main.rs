//! fbk-admin - terminal review dashboard
//!
//! Loads all reviews, follows the live feed and redraws on every change.
//! Commands on stdin while running:
//! - `r`             retry the bulk load
//! - `s <all|1-5>`   star filter
//! - `f [text]`      business name search (empty clears)
//! - `q`             quit

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fbk_admin::dashboard::render_text;
use fbk_admin::{AdminView, ReviewQuery, StarFilter};
use fbk_common::build_info;
use fbk_common::config::{ConfigResolver, API_URL_ENV};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for fbk-admin
#[derive(Parser, Debug)]
#[command(name = "fbk-admin")]
#[command(about = "Live dashboard for customer reviews")]
#[command(version)]
struct Args {
    /// Backend base URL
    #[arg(long, env = API_URL_ENV)]
    api_url: Option<String>,

    /// TOML config file (default: ~/.config/fbk/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Star filter: "all" or 1-5
    #[arg(long, default_value = "all")]
    stars: StarFilter,

    /// Case-insensitive business name search
    #[arg(long, default_value = "")]
    search: String,

    /// Render once after the initial load and exit
    #[arg(long)]
    once: bool,
}

enum Command {
    Reload,
    Query(ReviewQuery),
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new()
        .with_cli_url(args.api_url.clone())
        .with_config_file(args.config.clone())
        .resolve()
        .context("Failed to resolve configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "{}",
        build_info::banner("FBK Admin Dashboard", "fbk-admin", env!("CARGO_PKG_VERSION"))
    );
    info!("Backend: {}", config.base_url);

    let mut query = ReviewQuery::new(args.stars, args.search);
    let mut view = AdminView::activate(config).context("Failed to start admin view")?;

    if args.once {
        let loaded = view.initial_load().await;
        draw(&view, &query);
        view.shutdown().await;
        return loaded.context("Initial review load failed");
    }

    let mut changes = view.changes();
    let mut load_changes = view.load_changes();
    let mut connection_changes = view.connection_changes();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    draw(&view, &query);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Ok(()) = changes.changed() => {}
            Ok(()) = load_changes.changed() => {}
            Ok(()) = connection_changes.changed() => {}
            line = stdin.next_line() => match line {
                Ok(Some(line)) => match parse_command(&line, &query) {
                    Some(Command::Quit) => break,
                    Some(Command::Reload) => {
                        if !view.reload_in_background() {
                            info!("Reload already running");
                        }
                    }
                    Some(Command::Query(next)) => query = next,
                    None => {
                        warn!("Unknown command: {:?}", line.trim());
                        continue;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            },
        }

        draw(&view, &query);
    }

    view.shutdown().await;
    info!("Dashboard shutdown complete");
    Ok(())
}

fn parse_command(line: &str, current: &ReviewQuery) -> Option<Command> {
    let line = line.trim();
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));

    match verb {
        "q" => Some(Command::Quit),
        "r" => Some(Command::Reload),
        "s" => rest
            .parse::<StarFilter>()
            .ok()
            .map(|stars| Command::Query(ReviewQuery::new(stars, current.search.clone()))),
        "f" => Some(Command::Query(ReviewQuery::new(current.stars, rest.trim()))),
        _ => None,
    }
}

fn draw(view: &AdminView, query: &ReviewQuery) {
    match view.render_model(query) {
        Ok(model) => print!("\x1b[2J\x1b[H{}", render_text(&model)),
        Err(e) => warn!("Failed to render dashboard: {}", e),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
