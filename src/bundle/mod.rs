//! Portable bundle assembly.
//!
//! Lays out an AppDir (launcher, desktop entry, icon, embedded runtime,
//! patched resource container) and drives the external bundling tool to
//! compress it into a single distributable image. The tool's exit code
//! is not fully trusted: the output artifact must exist afterwards, or
//! the build is treated as failed.

pub mod desktop;
pub mod launcher;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, ErrorExt, Result};
use crate::tools::ArchiveTools;

use desktop::DesktopEntry;

/// Inputs to one bundle assembly.
#[derive(Debug, Clone)]
pub struct BundleSpec<'a> {
    /// Display name, also used for the AppDir directory name
    pub product_name: &'a str,
    /// Lowercase identifier for desktop/icon file names
    pub app_id: &'a str,
    /// Version string read from the unpacked package metadata
    pub version: &'a str,
    /// Architecture tag for the artifact name and the bundling tool
    pub arch: &'a str,
    /// Unpacked runtime distribution tree
    pub runtime_dir: &'a Path,
    /// Finalized (patched, repacked) resource container
    pub resource_container: &'a Path,
    /// Optional PNG icon
    pub icon: Option<&'a Path>,
    /// Directory receiving the AppDir and the final artifact
    pub output_dir: &'a Path,
}

/// Metadata describing the assembled output.
#[derive(Debug, Clone)]
pub struct BundleManifest {
    /// Version string of the bundled application
    pub version: String,
    /// Target platform tag, e.g. `linux-x86_64`
    pub platform: String,
    /// Path of the distributable image
    pub artifact: PathBuf,
}

/// Build the AppDir layout and produce the distributable image.
pub async fn assemble<T: ArchiveTools>(tools: &T, spec: &BundleSpec<'_>) -> Result<BundleManifest> {
    let app_dir = spec.output_dir.join(format!("{}.AppDir", spec.product_name));
    build_layout(spec, &app_dir).await?;

    let artifact = spec.output_dir.join(format!(
        "{}-{}-{}.AppImage",
        spec.product_name, spec.version, spec.arch
    ));
    compress_layout(tools, &app_dir, &artifact, spec.arch).await?;

    Ok(BundleManifest {
        version: spec.version.to_string(),
        platform: format!("linux-{}", spec.arch),
        artifact,
    })
}

/// Invoke the bundling tool on an existing layout and verify its output.
///
/// Shared with the patch-installed variant, which reuses the layout
/// already on disk instead of building a fresh one.
pub async fn compress_layout<T: ArchiveTools>(
    tools: &T,
    app_dir: &Path,
    artifact: &Path,
    arch: &str,
) -> Result<()> {
    if artifact.exists() {
        tokio::fs::remove_file(artifact)
            .await
            .fs_context("removing stale artifact", artifact)?;
    }

    log::info!("assembling bundle image {}", artifact.display());
    let tool_result = tools.assemble_bundle(app_dir, artifact, arch).await;

    // Existence of the artifact is authoritative, not the exit code.
    if !artifact.exists() {
        let reason = match tool_result {
            Err(e) => e.to_string(),
            Ok(()) => "tool reported success but wrote no output file".into(),
        };
        return Err(Error::BundleBuildFailure {
            artifact: artifact.to_path_buf(),
            reason,
        });
    }
    if let Err(e) = tool_result {
        log::warn!("bundling tool reported an error but produced the artifact: {e}");
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(artifact, std::fs::Permissions::from_mode(0o755))
            .await
            .fs_context("setting artifact permissions", artifact)?;
    }

    log::info!("created bundle {}", artifact.display());
    Ok(())
}

/// Lay out the AppDir contents.
async fn build_layout(spec: &BundleSpec<'_>, app_dir: &Path) -> Result<()> {
    if app_dir.exists() {
        tokio::fs::remove_dir_all(app_dir)
            .await
            .fs_context("removing old AppDir", app_dir)?;
    }
    tokio::fs::create_dir_all(app_dir)
        .await
        .fs_context("creating AppDir", app_dir)?;

    // Embedded runtime.
    let runtime_dest = app_dir.join("usr/lib/runtime");
    copy_dir_all(spec.runtime_dir, &runtime_dest).await?;

    // Patched resources, where the runtime looks for them.
    let resources_dir = runtime_dest.join("resources");
    tokio::fs::create_dir_all(&resources_dir)
        .await
        .fs_context("creating resources directory", &resources_dir)?;
    let container_dest = resources_dir.join("app.asar");
    tokio::fs::copy(spec.resource_container, &container_dest)
        .await
        .fs_context("copying resource container", &container_dest)?;

    // Launcher entry point.
    let app_run = app_dir.join("AppRun");
    tokio::fs::write(&app_run, launcher::render_launcher())
        .await
        .fs_context("writing launcher", &app_run)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&app_run, std::fs::Permissions::from_mode(0o755))
            .await
            .fs_context("setting launcher permissions", &app_run)?;
    }

    // Desktop integration metadata.
    let entry = DesktopEntry {
        name: spec.product_name,
        comment: "Repacked vendor application",
        icon: spec.app_id,
        categories: "Office;Utility;",
        wm_class: spec.app_id,
    };
    let desktop_path = app_dir.join(format!("{}.desktop", spec.app_id));
    tokio::fs::write(&desktop_path, desktop::render_desktop_entry(&entry))
        .await
        .fs_context("writing desktop entry", &desktop_path)?;

    match spec.icon {
        Some(icon) => {
            let icon_name = format!("{}.png", spec.app_id);
            let icon_dest = app_dir.join(&icon_name);
            tokio::fs::copy(icon, &icon_dest)
                .await
                .fs_context("copying icon", &icon_dest)?;
            #[cfg(unix)]
            {
                let diricon = app_dir.join(".DirIcon");
                tokio::fs::symlink(&icon_name, &diricon)
                    .await
                    .fs_context("creating .DirIcon symlink", &diricon)?;
            }
        }
        None => log::warn!("no icon available; bundle will use a generic one"),
    }

    Ok(())
}

/// Recursively copy a directory tree, preserving file permissions.
pub async fn copy_dir_all(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Generic(format!("path outside copy root: {e}")))?;
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            tokio::fs::create_dir_all(&target)
                .await
                .fs_context("creating directory", &target)?;
        } else if entry.file_type().is_symlink() {
            let link = tokio::fs::read_link(entry.path())
                .await
                .fs_context("reading symlink", entry.path())?;
            #[cfg(unix)]
            tokio::fs::symlink(&link, &target)
                .await
                .fs_context("recreating symlink", &target)?;
        } else {
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .fs_context("creating directory", parent)?;
            }
            tokio::fs::copy(entry.path(), &target)
                .await
                .fs_context("copying file", &target)?;
        }
    }
    Ok(())
}
