//! Run configuration.
//!
//! A [`RunConfig`] is constructed once per invocation from CLI arguments
//! and environment overrides, then passed to every pipeline stage. There
//! is no ambient global state; everything a stage needs to know about
//! paths, URLs, and policy travels through this value.

use std::path::PathBuf;

use crate::error::{Context, Result};

/// Environment variable overriding where the installed bundle lives.
pub const ENV_INSTALL_PATH: &str = "VENDOR_REPACK_INSTALL_PATH";

/// Environment variable overriding the installed bundle layout directory.
pub const ENV_INSTALLED_LAYOUT: &str = "VENDOR_REPACK_LAYOUT";

/// Environment variable overriding the staging root directory.
pub const ENV_STAGING_ROOT: &str = "VENDOR_REPACK_STAGING";

/// Default URL of the vendor's self-extracting Windows installer.
pub const DEFAULT_INSTALLER_URL: &str =
    "https://downloads.vendor-app.example/stable/VendorAppSetup-x64.exe";

/// Default URL template of the embedded runtime distribution.
///
/// `{arch}` is substituted with the target architecture tag.
pub const DEFAULT_RUNTIME_URL: &str =
    "https://github.com/electron/electron/releases/download/v33.3.1/electron-v33.3.1-linux-{arch}.zip";

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Display name used in desktop metadata and the AppDir name
    pub product_name: String,
    /// Lowercase identifier used for file names and StartupWMClass
    pub app_id: String,
    /// URL of the vendor installer blob
    pub installer_url: String,
    /// Optional expected SHA-256 of the installer (hex), verified on first download
    pub installer_sha256: Option<String>,
    /// URL of the runtime distribution archive
    pub runtime_url: String,
    /// Parent directory for per-run staging and the download cache
    pub staging_root: PathBuf,
    /// Where the assembled bundle gets installed
    pub install_path: PathBuf,
    /// Existing bundle layout directory, used by the patch-installed variant
    pub installed_layout: PathBuf,
    /// Architecture tag for the output artifact ("x86_64" or "aarch64")
    pub target_arch: &'static str,
    /// Retain the staging directory after the run for debugging
    pub keep_workdir: bool,
}

impl RunConfig {
    /// Build a configuration from defaults plus environment overrides.
    ///
    /// Fails only when no home directory can be determined and neither
    /// install-path nor staging overrides are set.
    pub fn new(keep_workdir: bool) -> Result<Self> {
        let product_name = "VendorApp".to_string();
        let app_id = "vendor-app".to_string();
        let arch = target_arch()?;

        let staging_root = match std::env::var_os(ENV_STAGING_ROOT) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join("vendor-repack"),
        };

        let home = dirs::home_dir().context("could not determine home directory")?;
        let install_path = match std::env::var_os(ENV_INSTALL_PATH) {
            Some(p) => PathBuf::from(p),
            None => home.join(".local/bin").join(format!("{app_id}.AppImage")),
        };
        let installed_layout = match std::env::var_os(ENV_INSTALLED_LAYOUT) {
            Some(dir) => PathBuf::from(dir),
            None => home
                .join(".local/share")
                .join(&app_id)
                .join(format!("{product_name}.AppDir")),
        };

        Ok(Self {
            product_name,
            app_id,
            installer_url: DEFAULT_INSTALLER_URL.to_string(),
            installer_sha256: None,
            runtime_url: DEFAULT_RUNTIME_URL.replace("{arch}", runtime_arch(arch)),
            staging_root,
            install_path,
            installed_layout,
            target_arch: arch,
            keep_workdir,
        })
    }

    /// Directory where downloaded artifacts are cached across runs.
    pub fn cache_dir(&self) -> PathBuf {
        self.staging_root.join("cache")
    }

    /// Directory receiving finished artifacts, outside per-run staging.
    pub fn dist_dir(&self) -> PathBuf {
        self.staging_root.join("dist")
    }

    /// File name of the output artifact, e.g. `VendorApp-0.9.3-x86_64.AppImage`.
    pub fn artifact_name(&self, version: &str) -> String {
        format!("{}-{}-{}.AppImage", self.product_name, version, self.target_arch)
    }
}

/// Map the host architecture to the artifact architecture tag.
fn target_arch() -> Result<&'static str> {
    match std::env::consts::ARCH {
        "x86_64" => Ok("x86_64"),
        "aarch64" => Ok("aarch64"),
        other => crate::bail!("unsupported architecture for AppImage: {}", other),
    }
}

/// Runtime release archives use a different arch naming scheme.
fn runtime_arch(arch: &str) -> &'static str {
    if arch == "aarch64" { "arm64" } else { "x64" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_name_includes_version_and_arch() {
        let mut config = RunConfig::new(false).expect("config");
        config.product_name = "VendorApp".into();
        let name = config.artifact_name("0.9.3");
        assert!(name.starts_with("VendorApp-0.9.3-"));
        assert!(name.ends_with(".AppImage"));
    }

    #[test]
    #[allow(unsafe_code)]
    fn installed_layout_env_override() {
        // set_var is unsafe in this edition; no other test reads this
        // variable.
        unsafe { std::env::set_var(ENV_INSTALLED_LAYOUT, "/opt/vendor/VendorApp.AppDir") };
        let config = RunConfig::new(false).expect("config");
        unsafe { std::env::remove_var(ENV_INSTALLED_LAYOUT) };

        assert_eq!(
            config.installed_layout,
            PathBuf::from("/opt/vendor/VendorApp.AppDir")
        );
    }

    #[test]
    fn runtime_arch_mapping() {
        assert_eq!(runtime_arch("x86_64"), "x64");
        assert_eq!(runtime_arch("aarch64"), "arm64");
    }
}
