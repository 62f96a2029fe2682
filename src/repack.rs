//! Resource container rebuilding.
//!
//! The patched directory tree is packed into a fresh container next to
//! the original, then renamed over it. The rename keeps the replacement
//! atomic: an interrupt mid-operation leaves either the old container or
//! the new one, never zero or two.

use std::path::Path;

use crate::error::{Error, Result};
use crate::tools::ArchiveTools;

/// Pack `dir` into a container replacing `original`.
pub async fn repack<T: ArchiveTools>(tools: &T, dir: &Path, original: &Path) -> Result<()> {
    let file_name = original
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::RepackFailure {
            container: original.to_path_buf(),
            reason: "container path has no file name".into(),
        })?;

    // Same directory as the original so the final rename cannot cross a
    // filesystem boundary.
    let tmp = original.with_file_name(format!("{file_name}.tmp-{}", uuid::Uuid::new_v4()));

    log::info!("packing {} into {}", dir.display(), tmp.display());
    if let Err(e) = tools.pack(dir, &tmp).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(Error::RepackFailure {
            container: original.to_path_buf(),
            reason: e.to_string(),
        });
    }

    if !tmp.exists() {
        return Err(Error::RepackFailure {
            container: original.to_path_buf(),
            reason: "packing tool produced no container".into(),
        });
    }

    tokio::fs::rename(&tmp, original)
        .await
        .map_err(|e| Error::RepackFailure {
            container: original.to_path_buf(),
            reason: format!("renaming {} into place: {e}", tmp.display()),
        })?;

    log::info!("replaced container {}", original.display());
    Ok(())
}
