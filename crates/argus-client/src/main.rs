//! Headless console client: connects to the backend, mirrors fleet state
//! and runs supervised countdowns until interrupted.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use argus_client::{ClientConfig, ConsoleClient};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::from_env();
    info!(ws = %config.ws_url, api = %config.api_base, "starting argus console");

    let mut client = match ConsoleClient::new(config) {
        Ok(client) => client,
        Err(error) => {
            error!("invalid configuration: {error}");
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = client.run() => {
            if let Err(error) = result {
                error!("client stopped: {error}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    client.shutdown().await;
}
