//! vendor-repack binary entry point.
//!
//! The pipeline future runs under `tokio::select!` against the ctrl-c
//! signal; cancellation drops the future, which drops the staging
//! `WorkDir` guard, so interrupt cleanup needs no extra handler.

use std::process;

use vendor_repack::cli;
use vendor_repack::cli::OutputManager;

#[tokio::main]
async fn main() {
    env_logger::init();

    let code = tokio::select! {
        result = cli::run() => match result {
            Ok(code) => code,
            Err(e) => {
                let output = OutputManager::new(false, false);
                output.error(&format!("fatal error: {e}"));
                1
            }
        },
        _ = tokio::signal::ctrl_c() => {
            let output = OutputManager::new(false, false);
            output.error("interrupted");
            130
        }
    };

    process::exit(code);
}
