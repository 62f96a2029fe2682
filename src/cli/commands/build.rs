//! Full from-source build command.

use crate::cli::RuntimeConfig;
use crate::config::RunConfig;
use crate::error::Result;
use crate::fetch::HttpTransfer;
use crate::pipeline::{Pipeline, WorkDir};
use crate::tools::{SystemTools, ensure_host_tools};

/// Run the complete pipeline: fetch, unpack, patch, repack, assemble.
pub async fn execute_build(
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

    let _ = config.output().section("build");
    config.println(&format!("installer: {}", run_config.installer_url));

    let mut workdir = WorkDir::create(&run_config.staging_root)?;
    if run_config.keep_workdir {
        workdir.retain();
    }

    let tools = SystemTools;
    let pipeline = Pipeline::new(&run_config, &tools, HttpTransfer);
    let manifest = pipeline.run_build(&workdir).await?;

    config.success_println(&format!(
        "built {} {} for {}",
        run_config.product_name, manifest.version, manifest.platform
    ));
    config.indent(&format!("artifact: {}", manifest.artifact.display()));
    Ok(0)
}
