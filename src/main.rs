//! compass-server binary entry point

use anyhow::Result;
use clap::Parser;

use compass_server_lib::{server, AppState, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.clone()),
    )
    .init();

    log::info!("Starting BluePeak Compass server");

    let state = AppState::new(settings);

    // Ctrl-C flips the shared shutdown flag; the server drains and exits
    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.request_shutdown();
        }
    });

    server::run_server(state).await.map_err(anyhow::Error::msg)
}
