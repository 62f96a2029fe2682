//! Pipeline orchestration.
//!
//! Two variants over the same stages, both strictly sequential with
//! short-circuit on first failure:
//!
//! - **build**: fetch installer → unpack installer → unpack package
//!   container → unpack resource container → patch → repack → fetch and
//!   unpack runtime → assemble bundle.
//! - **patch-installed**: locate the installed layout → unpack its
//!   resource container → patch → repack → re-compress the layout →
//!   install with backup.
//!
//! Stage failures propagate with `?`; nothing after a failed stage runs.
//! The caller owns the [`WorkDir`], so staging cleanup happens on every
//! exit path including cancellation.

pub mod workdir;

pub use workdir::WorkDir;

use std::path::{Path, PathBuf};

use crate::archive::{ArchiveUnpacker, ContainerKind, NamePattern, find_required};
use crate::bundle::{self, BundleManifest, BundleSpec};
use crate::config::RunConfig;
use crate::error::{Context, Error, Result};
use crate::fetch::{Fetcher, Transfer};
use crate::install;
use crate::patch::{self, rules};
use crate::repack::repack;
use crate::tools::ArchiveTools;

/// Update package nested in the installer.
pub const PACKAGE_PATTERN: NamePattern = NamePattern::Suffix(".nupkg");

/// Packed resource container nested in the update package.
pub const RESOURCE_PATTERN: NamePattern = NamePattern::Exact("app.asar");

/// The minified script bundle inside the resource container.
pub const PATCH_TARGET_PATTERN: NamePattern = NamePattern::Exact("index.js");

/// Icon shipped inside the update package.
const ICON_PATTERN: NamePattern = NamePattern::Suffix(".png");

/// Sequences the pipeline stages over injected capabilities.
pub struct Pipeline<'a, T: ArchiveTools, X: Transfer> {
    config: &'a RunConfig,
    tools: &'a T,
    fetcher: Fetcher<X>,
}

impl<'a, T: ArchiveTools, X: Transfer> Pipeline<'a, T, X> {
    /// Create a pipeline over a configuration and capabilities.
    pub fn new(config: &'a RunConfig, tools: &'a T, transfer: X) -> Self {
        Self {
            config,
            tools,
            fetcher: Fetcher::new(transfer),
        }
    }

    /// Build-from-source variant. Returns the output manifest.
    pub async fn run_build(&self, workdir: &WorkDir) -> Result<BundleManifest> {
        let patched = self.patch_from_installer(workdir).await?;

        let runtime_dir = self.stage("runtime", self.fetch_runtime(workdir)).await?;

        let dist = self.config.dist_dir();
        tokio::fs::create_dir_all(&dist).await?;

        let spec = BundleSpec {
            product_name: &self.config.product_name,
            app_id: &self.config.app_id,
            version: &patched.version,
            arch: self.config.target_arch,
            runtime_dir: &runtime_dir,
            resource_container: &patched.container,
            icon: patched.icon.as_deref(),
            output_dir: &dist,
        };
        self.stage("bundle", bundle::assemble(self.tools, &spec)).await
    }

    /// Patch-only variant: stop after repack and export the container.
    pub async fn run_patch_only(&self, workdir: &WorkDir) -> Result<PathBuf> {
        let patched = self.patch_from_installer(workdir).await?;

        let dist = self.config.dist_dir();
        tokio::fs::create_dir_all(&dist).await?;
        let exported = dist.join(format!("app-{}.asar", patched.version));
        tokio::fs::copy(&patched.container, &exported).await?;

        log::info!("patched container exported to {}", exported.display());
        Ok(exported)
    }

    /// In-place variant against an already-installed bundle layout.
    pub async fn run_patch_installed(&self, workdir: &WorkDir) -> Result<BundleManifest> {
        let layout = &self.config.installed_layout;
        if !layout.is_dir() {
            return Err(Error::Generic(format!(
                "no installed bundle layout at {} (pass --layout or set {})",
                layout.display(),
                crate::config::ENV_INSTALLED_LAYOUT,
            )));
        }

        let container = self
            .stage("unpack", async { find_required(layout, RESOURCE_PATTERN) })
            .await?;
        let version = self.patch_container(workdir, &container, None).await?;

        let dist = self.config.dist_dir();
        tokio::fs::create_dir_all(&dist).await?;
        let artifact = dist.join(self.config.artifact_name(&version));
        self.stage(
            "bundle",
            bundle::compress_layout(self.tools, layout, &artifact, self.config.target_arch),
        )
        .await?;

        self.stage("install", install::install(&artifact, &self.config.install_path))
            .await?;

        Ok(BundleManifest {
            version,
            platform: format!("linux-{}", self.config.target_arch),
            artifact: self.config.install_path.clone(),
        })
    }

    /// Shared front half of the build and patch-only variants:
    /// fetch → unpack chain → patch → repack.
    async fn patch_from_installer(&self, workdir: &WorkDir) -> Result<PatchedResources> {
        let installer_dest = self.config.cache_dir().join(url_file_name(&self.config.installer_url));
        let installer = self
            .stage(
                "fetch",
                self.fetcher.fetch(
                    &self.config.installer_url,
                    &installer_dest,
                    self.config.installer_sha256.as_deref(),
                ),
            )
            .await?;

        let unpacker = ArchiveUnpacker::new(self.tools, workdir.path());

        let installer_dir = self
            .stage("unpack", unpacker.unpack(&installer.path, ContainerKind::Installer))
            .await?;
        let package = find_required(&installer_dir, PACKAGE_PATTERN)?;

        let package_dir = self
            .stage("unpack", unpacker.unpack(&package, ContainerKind::PackageContainer))
            .await?;
        let container = find_required(&package_dir, RESOURCE_PATTERN)?;

        let version = self
            .patch_container(workdir, &container, Some(package.as_path()))
            .await?;

        let icon = match find_required(&package_dir, ICON_PATTERN) {
            Ok(icon) => Some(icon),
            Err(_) => {
                log::warn!("no icon found in the update package");
                None
            }
        };

        Ok(PatchedResources { container, version, icon })
    }

    /// Unpack a resource container, patch its script bundle, repack it
    /// atomically over the original.
    ///
    /// Returns the application version, read from the unpacked package
    /// metadata or, failing that, parsed from the update package's file
    /// name when one is available.
    async fn patch_container(
        &self,
        workdir: &WorkDir,
        container: &Path,
        package: Option<&Path>,
    ) -> Result<String> {
        let unpacker = ArchiveUnpacker::new(self.tools, workdir.path());
        let resources_dir = self
            .stage("unpack", unpacker.unpack(container, ContainerKind::ResourceContainer))
            .await?;

        let version = read_version(&resources_dir)
            .or_else(|| package.and_then(version_from_package_name))
            .context("could not determine application version from package metadata")?;
        log::info!("application version {version}");

        let target = find_required(&resources_dir, PATCH_TARGET_PATTERN)?;
        self.stage("patch", async {
            let outcomes = patch::apply_rules(&target, &rules::default_rules())?;
            for (name, outcome) in &outcomes {
                log::info!("rule '{name}': {outcome:?}");
            }
            Ok(())
        })
        .await?;

        // All rules verified; stash the backup at the staging root so it
        // stays inspectable but never ends up inside the repacked container.
        let backup = patch::backup_path(&target);
        if backup.exists()
            && let Some(name) = backup.file_name()
        {
            tokio::fs::rename(&backup, workdir.path().join(name)).await?;
        }

        self.stage("repack", repack(self.tools, &resources_dir, container))
            .await?;

        Ok(version)
    }

    /// Fetch the runtime distribution (cached across runs) and unpack it.
    async fn fetch_runtime(&self, workdir: &WorkDir) -> Result<PathBuf> {
        let dest = self.config.cache_dir().join(url_file_name(&self.config.runtime_url));
        let archive = self.fetcher.fetch(&self.config.runtime_url, &dest, None).await?;

        let unpacker = ArchiveUnpacker::new(self.tools, workdir.path());
        unpacker
            .unpack_named(&archive.path, ContainerKind::Installer, "runtime")
            .await
    }

    /// Run one named stage, logging its boundary and failure.
    async fn stage<O>(
        &self,
        name: &'static str,
        fut: impl Future<Output = Result<O>>,
    ) -> Result<O> {
        log::info!("stage {name}: starting");
        match fut.await {
            Ok(value) => {
                log::info!("stage {name}: done");
                Ok(value)
            }
            Err(e) => {
                log::error!("stage {name}: failed: {e}");
                Err(e)
            }
        }
    }
}

/// Output of the shared fetch→patch→repack front half.
struct PatchedResources {
    container: PathBuf,
    version: String,
    icon: Option<PathBuf>,
}

/// Read the application version from the unpacked `package.json`.
fn read_version(resources_dir: &Path) -> Option<String> {
    let manifest = resources_dir.join("package.json");
    let text = std::fs::read_to_string(manifest).ok()?;
    let value: serde_json::Value = serde_json::from_str(&text).ok()?;
    value.get("version")?.as_str().map(str::to_string)
}

/// Fall back to the version embedded in the update-package file name,
/// e.g. `VendorApp-0.9.3-full.nupkg` → `0.9.3`.
fn version_from_package_name(package: &Path) -> Option<String> {
    let stem = package.file_stem()?.to_str()?;
    stem.split('-')
        .find(|part| {
            !part.is_empty()
                && part.contains('.')
                && part.chars().all(|c| c.is_ascii_digit() || c == '.')
        })
        .map(str::to_string)
}

/// Last path segment of a URL, used as the cache file name.
fn url_file_name(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("artifact.bin")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parsed_from_package_file_name() {
        assert_eq!(
            version_from_package_name(Path::new("/x/VendorApp-0.9.3-full.nupkg")).as_deref(),
            Some("0.9.3")
        );
        assert_eq!(
            version_from_package_name(Path::new("app-12.0.1.nupkg")).as_deref(),
            Some("12.0.1")
        );
        assert_eq!(version_from_package_name(Path::new("no-version-here.nupkg")), None);
    }

    #[test]
    fn version_read_from_package_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name":"vendor-app","version":"0.9.3"}"#,
        )
        .expect("write");
        assert_eq!(read_version(dir.path()).as_deref(), Some("0.9.3"));
    }

    #[test]
    fn url_file_name_takes_last_segment() {
        assert_eq!(url_file_name("https://h/a/b/Setup-x64.exe"), "Setup-x64.exe");
        assert_eq!(url_file_name("https://h/dir/"), "artifact.bin");
    }
}
