//! Quickdraw server binary.
//!
//! Configured through `QUICKDRAW_*` environment variables (see
//! [`ServerConfig::from_env`]) and `RUST_LOG`.

use quickdraw::{QuickdrawServer, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quickdraw=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(bind = %config.bind_addr, "starting Quickdraw");

    let server = QuickdrawServer::builder().config(config).build().await?;
    server.run().await?;

    Ok(())
}
