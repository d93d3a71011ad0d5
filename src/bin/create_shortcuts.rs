//! Create Drive shortcuts for every row of the configured worklist.

use anyhow::{Context, Result};
use core_runtime::logging::init_logging;
use core_service::{CoreService, StdinCodePrompt};
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let service = CoreService::load().context("Failed to load configuration")?;
    init_logging(service.config().logging.clone()).context("Failed to initialize logging")?;

    let report = service.create_shortcuts(&StdinCodePrompt).await?;

    if report.summary.failed > 0 {
        warn!(
            failed = report.summary.failed,
            path = %service.config().shortcuts.failure_report_path.display(),
            "Some rows could not be processed"
        );
    }
    Ok(())
}
