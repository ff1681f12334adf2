//! fbk-submit - post one review from the command line

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fbk_common::build_info;
use fbk_common::config::{ConfigResolver, API_URL_ENV};
use fbk_common::ApiClient;
use fbk_submit::{ReviewForm, SubmissionClient};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for fbk-submit
#[derive(Parser, Debug)]
#[command(name = "fbk-submit")]
#[command(about = "Submit a customer review")]
#[command(version)]
struct Args {
    /// Backend base URL
    #[arg(long, env = API_URL_ENV)]
    api_url: Option<String>,

    /// TOML config file (default: ~/.config/fbk/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Business name, e.g. "Joe's Pizza"
    #[arg(short, long, default_value = "")]
    business: String,

    /// Rating from 1 to 5
    #[arg(short, long, default_value_t = 5)]
    stars: i64,

    /// Review text
    #[arg(short, long, default_value = "")]
    text: String,

    /// Print the stored review and any AI response as JSON
    #[arg(long)]
    json: bool,

    /// Only check that the backend is up
    #[arg(long)]
    health: bool,
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
        build_info::banner("FBK Review Submit", "fbk-submit", env!("CARGO_PKG_VERSION"))
    );

    let api = ApiClient::new(config).context("Failed to create backend client")?;

    if args.health {
        let message = api.health().await.context("Backend health check failed")?;
        println!("{}", message);
        return Ok(());
    }

    let client = SubmissionClient::with_api(api);
    let mut form = ReviewForm {
        business_name: args.business,
        text: args.text,
        ..ReviewForm::default()
    };
    form.set_stars(args.stars)?;

    let outcome = form.submit(&client).await?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to encode review")?
        );
        return Ok(());
    }

    println!("{}", outcome.message());
    if let Some(ai) = &outcome.ai_response {
        println!();
        println!("Our AI Response");
        println!("Summary: {}", ai.summary);
        if let Some(action) = &ai.action {
            println!("Action:  {}", action);
        }
    }

    Ok(())
}
