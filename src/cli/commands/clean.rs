//! Staging cleanup command.

use crate::cli::RuntimeConfig;
use crate::config::RunConfig;
use crate::error::{ErrorExt, Result};

/// Remove the staging root: per-run directories, cache, and dist.
pub async fn execute_clean(config: &RuntimeConfig) -> Result<i32> {
    let run_config = RunConfig::new(false)?;
    let root = &run_config.staging_root;

    if !root.exists() {
        config.println("nothing to clean");
        return Ok(0);
    }

    tokio::fs::remove_dir_all(root)
        .await
        .fs_context("removing staging root", root)?;

    config.success_println(&format!("removed {}", root.display()));
    Ok(0)
}
