//! Live drowsiness monitor
//!
//! Plays a captured frame sequence through a detection session and logs
//! alerts as they are raised and cleared.
//!
//! Usage: `drowsiness-monitor [config.toml]`
//!
//! While running, an empty line or `ack` on stdin acknowledges the alarm;
//! `stop`, `q` or Ctrl-C end the session.

use std::path::PathBuf;

use alerting::{AlertManager, LogSink};
use anyhow::{anyhow, Context};
use api::{config::AppConfig, init_logging};
use camera_capture::ImageSequenceSource;
use dms::{load_landmark_source, session_channel, DetectionSession, SessionHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(path.as_deref())?;
    init_logging(&config.logging)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let landmarks = load_landmark_source(&config.dms)?
        .ok_or_else(|| anyhow!("Model not initialized yet: set dms.model_path and build with --features onnx"))?;

    let mut source = ImageSequenceSource::open(&config.capture)
        .with_context(|| format!("opening {}", config.capture.directory.display()))?;
    info!(
        "Monitoring {} frames from {} at {} fps",
        source.len(),
        config.capture.directory.display(),
        config.capture.fps
    );

    let mut session = DetectionSession::new(landmarks, config.dms.clone())?;
    let mut sink = (LogSink, AlertManager::default());
    let (handle, commands) = session_channel();

    tokio::spawn(forward_controls(handle));

    let summary = session.run(&mut source, &mut sink, commands).await?;
    let snapshot = sink.1.snapshot();

    info!(
        "Processed {} frames ({} without a face)",
        summary.frames, summary.no_face_frames
    );
    info!(
        "Alerts: {} raised, {} cleared, {} acknowledged",
        snapshot.fire_count, snapshot.clear_count, snapshot.ack_count
    );

    Ok(())
}

/// Map Ctrl-C and stdin lines onto session commands
async fn forward_controls(handle: SessionHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, stopping");
                handle.stop();
                return;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => match line.trim() {
                    "" | "ack" => {
                        if !handle.acknowledge() {
                            return;
                        }
                    }
                    "stop" | "q" => {
                        handle.stop();
                        return;
                    }
                    other => warn!("Unknown command: {:?}", other),
                },
                // stdin closed; Ctrl-C still works
                Ok(None) => {
                    let _ = tokio::signal::ctrl_c().await;
                    handle.stop();
                    return;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    handle.stop();
                    return;
                }
            },
        }
    }
}
