//! Command line interface.
//!
//! Argument parsing, colored output, and one executor per subcommand.
//! The pipeline itself lives in [`crate::pipeline`]; this layer only
//! wires configuration together and turns errors into status lines and
//! exit codes.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point.
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
