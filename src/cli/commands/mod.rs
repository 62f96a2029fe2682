//! Command executors.
//!
//! One executor per subcommand. Executors map pipeline errors to a
//! status line naming the failing stage plus a nonzero exit code; only
//! argument validation short-circuits before that.

mod build;
mod clean;
mod patch;

use crate::cli::{Args, Command, OutputManager, RuntimeConfig};
use crate::error::{Error, Result};

use build::execute_build;
use clean::execute_clean;
use patch::{execute_patch_installed, execute_patch_only};

/// Execute the parsed command, returning the process exit code.
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = OutputManager::new(false, false);
        output.error(&format!("invalid arguments: {validation_error}"));
        return Ok(2);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Build { keep_workdir, url, sha256 } => {
            execute_build(*keep_workdir, url.clone(), sha256.clone(), &config).await
        }
        Command::PatchOnly { keep_workdir, url, sha256 } => {
            execute_patch_only(*keep_workdir, url.clone(), sha256.clone(), &config).await
        }
        Command::PatchInstalled { keep_workdir, install_path, layout } => {
            execute_patch_installed(*keep_workdir, install_path.clone(), layout.clone(), &config)
                .await
        }
        Command::Clean => execute_clean(&config).await,
    };

    match result {
        Ok(code) => Ok(code),
        Err(e) => {
            report_failure(&config, &e);
            Ok(1)
        }
    }
}

/// Print the human-readable status line identifying the failing stage.
fn report_failure(config: &RuntimeConfig, error: &Error) {
    match error.stage() {
        Some(stage) => config.error_println(&format!("stage '{stage}' failed: {error}")),
        None => config.error_println(&format!("failed: {error}")),
    }
}
