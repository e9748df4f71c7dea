//! One-off research run from the command line.

use super::output::Output;
use crate::research::{ResearchCoordinator, RunContext, RunOutcome};
use crate::types::{AppError, Result};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;

/// Default directory for reports written by `deepdive run`
pub const REPORTS_DIR: &str = "reports";

/// Run the pipeline for `query`, printing progress events as they happen.
pub async fn execute(
    coordinator: &ResearchCoordinator,
    query: &str,
    event_capacity: usize,
    output: Output,
) -> Result<RunOutcome> {
    let ctx = RunContext::new(query, event_capacity);
    let mut rx = ctx.events.subscribe();

    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => output.event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    output.warning(&format!("{} progress events not shown", skipped))
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = coordinator.run(&ctx).await;

    // Dropping the last log handle closes the channel and ends the printer
    drop(ctx);
    if let Err(e) = printer.await {
        tracing::warn!("Progress printer stopped: {}", e);
    }

    result
}

/// Where to write the report: the explicit path or `reports/<file name>`
pub fn output_path(explicit: Option<PathBuf>, file_name: &str) -> PathBuf {
    explicit.unwrap_or_else(|| Path::new(REPORTS_DIR).join(file_name))
}

pub fn write_report(path: &Path, markdown: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::Internal(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }
    std::fs::write(path, markdown)
        .map_err(|e| AppError::Internal(format!("Failed to write {}: {}", path.display(), e)))
}
