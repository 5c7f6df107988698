use clap::Parser;
use paperdesk_server::config::{ServerConfig, CONFIG_ENV};
use paperdesk_server::routes::run_server;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Paper-trading server", long_about = None)]
struct Args {
    /// Path to a TOML config file. Falls back to the PAPERDESK_CONFIG
    /// environment variable, then to built-in defaults.
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    paperdesk_telemetry::init_logging()?;
    info!("Starting paperdesk-server v{}", env!("CARGO_PKG_VERSION"));

    let path = args.config.or_else(|| std::env::var(CONFIG_ENV).ok());
    let config = match path {
        Some(path) => {
            info!("Loading config from {}", path);
            ServerConfig::from_file(&path)?
        }
        None => {
            info!("No config file given, using defaults");
            ServerConfig::default()
        }
    };

    run_server(config).await?;
    Ok(())
}
