//! Keynes game server.
//!
//! Configuration comes from the environment (`KEYNES_BIND` or `PORT`,
//! `KEYNES_SNAPSHOT_PATH`, `KEYNES_SNAPSHOT_INTERVAL_SECS`). Log levels
//! follow `RUST_LOG`, e.g. `RUST_LOG=keynes=debug`.

use keynes::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), KeynesError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keynes=info")))
        .with_target(true)
        .init();

    let config = ServerConfig::from_env()?;
    let server = KeynesServer::builder().config(config).build().await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server.run().await
}
