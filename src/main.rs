//! CLI for relay
//!
//! Subcommands:
//! - `broker`: run the broker service
//! - `submit`: send one submission and print the per-backend outcomes

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use relay::broker::start_broker;
use relay::client::SubmissionClient;
use relay::config::{DEFAULT_SUBMISSION_ENDPOINT, load_config, load_config_from};
use relay::transport::TransportContext;
use relay::utils::logging;
use serde_json::Value;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "relay")]
enum Command {
    /// Accept submissions and relay them to every configured publisher
    Broker {
        /// Configuration file; defaults to config/default.* in the working directory
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Submit a single message to a running broker
    Submit {
        #[arg(long, default_value = DEFAULT_SUBMISSION_ENDPOINT)]
        endpoint: String,
        #[arg(long)]
        topic: String,
        /// JSON object of string headers
        #[arg(long, default_value = "{}")]
        headers: String,
        /// Any JSON value
        #[arg(long, default_value = "{}")]
        body: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cmd = Command::parse();

    let result = match cmd {
        Command::Broker { config } => run_broker(config).await,
        Command::Submit {
            endpoint,
            topic,
            headers,
            body,
        } => {
            logging::init("warn");
            run_submit(&endpoint, &topic, &headers, &body).await
        }
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run_broker(config: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            return Err(e.into());
        }
    };
    logging::init(&settings.logging.level);
    info!("Starting the relay broker service");

    let ctx = TransportContext::new();
    let broker = start_broker(&settings, &ctx);
    tokio::pin!(broker);

    tokio::select! {
        result = &mut broker => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            ctx.shutdown();
            broker.await?;
        }
    }

    Ok(())
}

async fn run_submit(
    endpoint: &str,
    topic: &str,
    headers: &str,
    body: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let headers: HashMap<String, String> = serde_json::from_str(headers)?;
    let body: Value = serde_json::from_str(body)?;

    let ctx = TransportContext::new();
    let mut client = SubmissionClient::connect(endpoint, &ctx).await?;
    let outcomes = client.submit(topic, headers, body).await?;

    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}
