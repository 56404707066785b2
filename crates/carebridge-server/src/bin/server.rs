//! CareBridge server binary

use anyhow::{bail, Result};
use carebridge_common_log::{init, LogConfig};
use carebridge_server::{
    config::{load_config, validate_config},
    Server,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = load_config()?;

    let log_config =
        LogConfig::from_settings(&config.logging.level, &config.logging.format).with_env_overrides();
    init(log_config)?;

    if let Err(errors) = validate_config(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        bail!("{} configuration error(s)", errors.len());
    }

    info!("Starting CareBridge server v{}", env!("CARGO_PKG_VERSION"));

    let server = Server::new(config)?;
    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}
