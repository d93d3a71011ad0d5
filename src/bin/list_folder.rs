//! Write the folder tree under the configured root to an xlsx file.

use anyhow::{Context, Result};
use core_runtime::logging::init_logging;
use core_service::{CoreService, StdinCodePrompt};

#[tokio::main]
async fn main() -> Result<()> {
    let service = CoreService::load().context("Failed to load configuration")?;
    init_logging(service.config().logging.clone()).context("Failed to initialize logging")?;

    let summary = service.list_folder(&StdinCodePrompt).await?;
    println!(
        "Excel file created: {} ({} folders, {} files)",
        service.config().inventory.output_path.display(),
        summary.folders,
        summary.files
    );
    Ok(())
}
