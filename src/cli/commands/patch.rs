//! Patch-only and patch-installed commands.

use std::path::PathBuf;

use crate::cli::RuntimeConfig;
use crate::config::RunConfig;
use crate::error::Result;
use crate::fetch::HttpTransfer;
use crate::pipeline::{Pipeline, WorkDir};
use crate::tools::{SystemTools, ensure_host_tools};

/// Run the front half of the pipeline and export the patched container.
pub async fn execute_patch_only(
    keep_workdir: bool,
    url: Option<String>,
    sha256: Option<String>,
    config: &RuntimeConfig,
) -> Result<i32> {
    ensure_host_tools()?;

    let mut run_config = RunConfig::new(keep_workdir)?;
    if let Some(url) = url {
        run_config.installer_url = url;
    }
    if let Some(sha256) = sha256 {
        run_config.installer_sha256 = Some(sha256);
    }

    let _ = config.output().section("patch-only");

    let mut workdir = WorkDir::create(&run_config.staging_root)?;
    if run_config.keep_workdir {
        workdir.retain();
    }

    let tools = SystemTools;
    let pipeline = Pipeline::new(&run_config, &tools, HttpTransfer);
    let exported = pipeline.run_patch_only(&workdir).await?;

    config.success_println("patched resource container ready");
    config.indent(&format!("container: {}", exported.display()));
    Ok(0)
}

/// Patch an installed bundle's resources in place and reinstall it.
pub async fn execute_patch_installed(
    keep_workdir: bool,
    install_path: Option<PathBuf>,
    layout: Option<PathBuf>,
    config: &RuntimeConfig,
) -> Result<i32> {
    ensure_host_tools()?;

    let mut run_config = RunConfig::new(keep_workdir)?;
    if let Some(path) = install_path {
        run_config.install_path = path;
    }
    if let Some(layout) = layout {
        run_config.installed_layout = layout;
    }

    let _ = config.output().section("patch-installed");
    config.println(&format!("layout: {}", run_config.installed_layout.display()));

    let mut workdir = WorkDir::create(&run_config.staging_root)?;
    if run_config.keep_workdir {
        workdir.retain();
    }

    let tools = SystemTools;
    let pipeline = Pipeline::new(&run_config, &tools, HttpTransfer);
    let manifest = pipeline.run_patch_installed(&workdir).await?;

    config.success_println(&format!(
        "patched and reinstalled {} {}",
        run_config.product_name, manifest.version
    ));
    config.indent(&format!("installed at: {}", manifest.artifact.display()));
    Ok(0)
}
