use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use portal_client::config::{load_config, loader};
use portal_client::observability::init_logging;
use portal_client::{ClientConfig, MemoryCredentialStore, RequestClient, RequestOptions};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "portal-cli")]
#[command(
    about = "Issue requests against the portal API through the resilient client",
    long_about = None
)]
struct Cli {
    /// Base URL of the API (overrides config file and PORTAL_API_BASE_URL)
    #[arg(short, long)]
    url: Option<String>,

    /// Access token sent as a bearer credential
    #[arg(short, long)]
    token: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Retry budget for the request
    #[arg(short, long)]
    retries: Option<u32>,

    /// Print cache statistics after the request
    #[arg(long)]
    stats: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a path
    Get { path: String },
    /// POST a JSON body to a path
    Post {
        path: String,
        #[arg(short, long, default_value = "{}")]
        body: String,
    },
    /// DELETE a path
    Delete { path: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => loader::from_env()?,
    };
    if let Some(url) = cli.url {
        config.base_url = url;
    }
    init_logging(&config.observability)?;

    let client = build_client(config, cli.token)?;
    let retries = cli.retries.unwrap_or_else(|| client.default_retries());

    let (path, options) = match cli.command {
        Commands::Get { path } => (path, RequestOptions::get()),
        Commands::Post { path, body } => {
            let body: Value = serde_json::from_str(&body)?;
            (path, RequestOptions::post(body))
        }
        Commands::Delete { path } => (path, RequestOptions::delete()),
    };

    match client.request_value(&path, options, retries).await {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(e) => {
            eprintln!("Error ({}): {}", e.kind(), e);
            if let Some(status) = e.status() {
                eprintln!("Status: {}", status);
            }
            std::process::exit(1);
        }
    }

    if cli.stats {
        println!("{}", serde_json::to_string_pretty(&client.stats())?);
    }

    Ok(())
}

fn build_client(
    config: ClientConfig,
    token: Option<String>,
) -> Result<RequestClient, Box<dyn std::error::Error>> {
    let builder = RequestClient::builder(config);
    let builder = match token {
        Some(token) => {
            let store = MemoryCredentialStore::with_access_token(token);
            builder.credentials(Arc::new(store))
        }
        None => builder,
    };
    Ok(builder.build()?)
}
