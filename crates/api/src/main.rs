//! Drowsiness analysis server
//!
//! Usage: `drowsiness-server [config.toml]`

use std::path::PathBuf;

use api::{config::AppConfig, init_logging, run_server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(path.as_deref())?;
    init_logging(&config.logging)?;

    info!("=== Drowsiness Analyzer v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "EAR threshold {:.2}, {} consecutive frames",
        config.dms.ear_threshold, config.dms.consec_frames
    );

    run_server(config).await
}
