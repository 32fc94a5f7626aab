//! Regenerate the sketch on every document change

use anyhow::{Context, Result};
use blocksmith_core::{Config, Document};
use blocksmith_runtime::{Edit, FileSink, Session};
use std::path::Path;
use std::time::{Duration, SystemTime};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Run the watch command
pub async fn run(config_path: &str) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let sketch = config.sketch_path();
    let output = config
        .output_dir()
        .join(format!("{}.ino", config.project.name));

    let mut session = Session::from_config(&config, FileSink::new(&output))?;
    tracing::info!(
        "Watching {} → {} (Ctrl+C to stop)",
        sketch.display(),
        output.display()
    );

    let mut last_seen = modified(&sketch);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let current = modified(&sketch);
                if current == last_seen {
                    continue;
                }
                last_seen = current;

                // Editors save in several writes; the scheduler coalesces them
                match Document::read(&sketch) {
                    Ok(document) => {
                        if let Err(e) = session.apply(Edit::Load { document }) {
                            tracing::error!("{:#}", e);
                        }
                    }
                    Err(e) => tracing::warn!("Skipping unreadable sketch: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }

    session.shutdown().await?;
    tracing::info!("Blocksmith watch stopped");
    Ok(())
}
