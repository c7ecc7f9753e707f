use std::sync::Arc;

use aspenlog::app;
use aspenlog::config::Config;
use aspenlog::credentials;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let store = credentials::open_store(&config)?;
    log::info!("Backend at {}", config.backend_url);

    // Start the local shell
    app::run(config, Arc::from(store)).await?;

    Ok(())
}
