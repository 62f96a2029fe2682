//! Command line argument parsing and validation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{ENV_INSTALL_PATH, ENV_INSTALLED_LAYOUT};

/// Repack a vendor Windows installer into a patched, portable Linux AppImage.
#[derive(Parser, Debug)]
#[command(
    name = "vendor-repack",
    version,
    about = "Repack a vendor Windows installer into a patched, portable Linux AppImage",
    long_about = "Downloads the vendor installer, extracts its nested archives, applies the \
Linux platform patch to the resource bundle, repacks it, and assembles a portable AppImage.

Usage:
  vendor-repack build
  vendor-repack patch-only
  vendor-repack patch-installed
  vendor-repack clean"
)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Show verbose progress output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Pipeline subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full from-source pipeline and produce an AppImage
    Build {
        /// Keep the staging directory after the run for debugging
        #[arg(long)]
        keep_workdir: bool,
        /// Override the vendor installer URL
        #[arg(long)]
        url: Option<String>,
        /// Expected SHA-256 of the installer (hex), checked on first download
        #[arg(long)]
        sha256: Option<String>,
    },
    /// Stop after patching and repacking; export the resource container
    PatchOnly {
        /// Keep the staging directory after the run for debugging
        #[arg(long)]
        keep_workdir: bool,
        /// Override the vendor installer URL
        #[arg(long)]
        url: Option<String>,
        /// Expected SHA-256 of the installer (hex), checked on first download
        #[arg(long)]
        sha256: Option<String>,
    },
    /// Patch an already-installed bundle in place and reinstall it
    PatchInstalled {
        /// Keep the staging directory after the run for debugging
        #[arg(long)]
        keep_workdir: bool,
        /// Where the installed bundle lives
        #[arg(long, env = ENV_INSTALL_PATH)]
        install_path: Option<PathBuf>,
        /// Installed bundle layout directory to patch
        #[arg(long, env = ENV_INSTALLED_LAYOUT)]
        layout: Option<PathBuf>,
    },
    /// Remove the staging root, download cache, and exported artifacts
    Clean,
}

impl Args {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency.
    pub fn validate(&self) -> Result<(), String> {
        let sha256 = match &self.command {
            Command::Build { sha256, .. } | Command::PatchOnly { sha256, .. } => sha256.as_deref(),
            _ => None,
        };
        if let Some(digest) = sha256
            && (digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Err(format!(
                "--sha256 must be a 64-character hex digest, got {} characters",
                digest.len()
            ));
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager.
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print a plain message.
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print an error message (always shown).
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print a warning message.
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print a success message.
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print indented text.
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }
}
