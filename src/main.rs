use std::path::Path;

use anyhow::Error;
use log::{info, warn};
use rusty_neopixel::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // First argument, if any, is the config file
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_PATH.to_string());
    let config = Config::load_from(&path)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();
    if Path::new(&path).exists() {
        info!("Config: loaded {}", path);
    } else {
        warn!("Config: {} not found, running on defaults", path);
    }

    let lights = LightController::init(&config)?;
    let running = rusty_neopixel::launch(&config, lights, LogDisplay).await?;

    match (running.address, running.local_addr) {
        (Some(ip), Some(addr)) => info!("Control page at http://{}:{}", ip, addr.port()),
        _ => warn!("Running without a network, lights only"),
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    running.actuator.abort();
    if let Some(server) = running.server {
        server.abort();
    }

    Ok(())
}
