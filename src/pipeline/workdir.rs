//! Ephemeral staging directory with guaranteed cleanup.
//!
//! Each pipeline invocation owns one uniquely named directory under the
//! configured staging root. Cleanup runs in `Drop`, so it covers every
//! exit path: success, error propagation, and cancellation of the
//! pipeline future on interrupt. `retain` opts out for debugging.

use std::path::{Path, PathBuf};

use crate::error::{ErrorExt, Result};

/// Staging root for one pipeline run.
#[derive(Debug)]
pub struct WorkDir {
    root: PathBuf,
    retain: bool,
}

impl WorkDir {
    /// Create a fresh, uniquely named staging directory under `staging_root`.
    pub fn create(staging_root: &Path) -> Result<Self> {
        let root = staging_root.join(format!("run-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).fs_context("creating staging directory", &root)?;
        log::debug!("staging directory {}", root.display());
        Ok(Self { root, retain: false })
    }

    /// Path of the staging root.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Keep the directory after the run instead of removing it.
    pub fn retain(&mut self) {
        self.retain = true;
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.retain {
            log::info!("retaining staging directory {}", self.root.display());
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if self.root.exists() {
                log::warn!("failed to clean staging directory {}: {e}", self.root.display());
            }
        } else {
            log::debug!("removed staging directory {}", self.root.display());
        }
    }
}
