//! In-place installation of the assembled bundle.
//!
//! Before the first overwrite of an existing install, its bytes are
//! preserved at `<path>.backup`. A later install never clobbers that
//! backup, so the pre-repack vendor state stays recoverable.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Copy `bundle` over `dest`, backing up a pre-existing install once.
pub async fn install(bundle: &Path, dest: &Path) -> Result<()> {
    let fail = |reason: String| Error::InstallFailure {
        dest: dest.to_path_buf(),
        reason,
    };

    if dest.exists() {
        let backup = backup_path(dest);
        if backup.exists() {
            log::info!("backup {} already exists, keeping it", backup.display());
        } else {
            tokio::fs::copy(dest, &backup)
                .await
                .map_err(|e| fail(format!("creating backup {}: {e}", backup.display())))?;
            log::info!("backed up existing install to {}", backup.display());
        }
    } else if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| fail(format!("creating {}: {e}", parent.display())))?;
    }

    tokio::fs::copy(bundle, dest)
        .await
        .map_err(|e| fail(e.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| fail(format!("setting permissions: {e}")))?;
    }

    log::info!("installed {}", dest.display());
    Ok(())
}

/// Backup location for an installed bundle.
pub fn backup_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}
