//! External tool invocation.
//!
//! Container formats handled by the pipeline (self-extracting installer,
//! nested update package, packed resource container, AppImage) are all
//! driven through external tools. The [`ArchiveTools`] trait is the seam:
//! production code uses [`SystemTools`], which shells out, while tests
//! provide in-memory fakes so pipeline logic runs without real archives.

use std::path::Path;
use std::process::Stdio;

use crate::archive::ContainerKind;
use crate::error::{Error, Result};

/// Host tools the pipeline shells out to, in pre-flight check order.
pub const REQUIRED_TOOLS: &[&str] = &["7z", "asar", "appimagetool"];

/// Capability interface over the external archive/bundling tools.
pub trait ArchiveTools {
    /// Extract `archive` into `dest`, which already exists and is empty.
    fn unpack(
        &self,
        archive: &Path,
        dest: &Path,
        kind: ContainerKind,
    ) -> impl Future<Output = Result<()>>;

    /// Pack the directory tree at `dir` into a resource container at `container`.
    fn pack(&self, dir: &Path, container: &Path) -> impl Future<Output = Result<()>>;

    /// Compress the bundle layout at `app_dir` into a single image at `output`.
    ///
    /// Callers must not trust the tool's exit code alone; existence of
    /// `output` afterwards is the authoritative success signal.
    fn assemble_bundle(
        &self,
        app_dir: &Path,
        output: &Path,
        arch: &str,
    ) -> impl Future<Output = Result<()>>;
}

/// Production implementation shelling out to `7z`, `asar`, and `appimagetool`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTools;

impl ArchiveTools for SystemTools {
    async fn unpack(&self, archive: &Path, dest: &Path, kind: ContainerKind) -> Result<()> {
        match kind {
            ContainerKind::Installer | ContainerKind::PackageContainer => {
                run_tool(
                    "7z",
                    &[
                        "x".as_ref(),
                        "-y".as_ref(),
                        format!("-o{}", dest.display()).as_ref(),
                        archive.as_os_str(),
                    ],
                )
                .await
            }
            ContainerKind::ResourceContainer => {
                run_tool(
                    "asar",
                    &["extract".as_ref(), archive.as_os_str(), dest.as_os_str()],
                )
                .await
            }
        }
    }

    async fn pack(&self, dir: &Path, container: &Path) -> Result<()> {
        run_tool(
            "asar",
            &["pack".as_ref(), dir.as_os_str(), container.as_os_str()],
        )
        .await
    }

    async fn assemble_bundle(&self, app_dir: &Path, output: &Path, arch: &str) -> Result<()> {
        let mut cmd = tokio::process::Command::new("appimagetool");
        cmd.env("ARCH", arch)
            .arg(app_dir)
            .arg(output)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        run_command(cmd, "appimagetool").await
    }
}

/// Verify all required host tools are present before any stage runs.
///
/// Collects every missing tool rather than failing on the first, so one
/// run reports the complete set to install.
pub fn ensure_host_tools() -> Result<()> {
    let mut missing = Vec::new();
    for tool in REQUIRED_TOOLS {
        match which::which(tool) {
            Ok(path) => log::debug!("found {} at {}", tool, path.display()),
            Err(_) => missing.push((*tool).to_string()),
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingDependency { tools: missing })
    }
}

async fn run_tool(program: &str, args: &[&std::ffi::OsStr]) -> Result<()> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
    run_command(cmd, program).await
}

/// Run a prepared command to completion, mapping spawn failures and
/// nonzero exits to [`Error::CommandFailed`] with a stderr summary.
async fn run_command(mut cmd: tokio::process::Command, program: &str) -> Result<()> {
    log::debug!("running {:?}", cmd.as_std());

    let output = cmd.output().await.map_err(|e| Error::CommandFailed {
        command: program.to_string(),
        reason: e.to_string(),
    })?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let summary = lines[lines.len().saturating_sub(4)..].join("; ");
        Err(Error::CommandFailed {
            command: program.to_string(),
            reason: format!(
                "exit code {:?}: {}",
                output.status.code(),
                summary.trim()
            ),
        })
    }
}
