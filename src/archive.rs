//! Nested container extraction.
//!
//! The vendor ships a linear chain of containers: a self-extracting
//! Windows installer, an update package nested inside it, and a packed
//! resource container inside that. Each layer is extracted into its own
//! fresh subdirectory of the staging area, then searched for the single
//! file the next layer needs.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, ErrorExt, Result};
use crate::tools::ArchiveTools;

/// One layer of the nested container chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Self-extracting Windows-style installer (outermost)
    Installer,
    /// Update-package archive nested inside the installer
    PackageContainer,
    /// Packed container of application scripts/assets (innermost)
    ResourceContainer,
}

impl ContainerKind {
    /// Stable name used for the layer's extraction subdirectory.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Installer => "installer",
            Self::PackageContainer => "package",
            Self::ResourceContainer => "resources",
        }
    }
}

/// Case-sensitive file name pattern with optional prefix and suffix.
///
/// This is deliberately simpler than a glob engine: the pipeline only
/// ever needs "ends with `.nupkg`" style matches against file names.
#[derive(Debug, Clone, Copy)]
pub enum NamePattern {
    /// File name equal to the given string.
    Exact(&'static str),
    /// File name ending with the given suffix.
    Suffix(&'static str),
    /// File name starting with the prefix and ending with the suffix.
    Affixes(&'static str, &'static str),
}

impl NamePattern {
    fn matches(&self, name: &str) -> bool {
        match *self {
            Self::Exact(e) => name == e,
            Self::Suffix(s) => name.ends_with(s),
            Self::Affixes(p, s) => name.starts_with(p) && name.ends_with(s),
        }
    }
}

impl std::fmt::Display for NamePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Exact(e) => write!(f, "{e}"),
            Self::Suffix(s) => write!(f, "*{s}"),
            Self::Affixes(p, s) => write!(f, "{p}*{s}"),
        }
    }
}

/// Extracts container layers into a staging directory.
pub struct ArchiveUnpacker<'a, T: ArchiveTools> {
    tools: &'a T,
    staging: &'a Path,
}

impl<'a, T: ArchiveTools> ArchiveUnpacker<'a, T> {
    /// Create an unpacker staging layers under `staging` (the WorkDir root).
    pub fn new(tools: &'a T, staging: &'a Path) -> Self {
        Self { tools, staging }
    }

    /// Extract one container layer and return its extraction directory.
    ///
    /// The directory is created fresh; a leftover from an earlier layer
    /// of the same kind is removed first so stale files cannot leak into
    /// the required-file search.
    pub async fn unpack(&self, archive: &Path, kind: ContainerKind) -> Result<PathBuf> {
        self.unpack_named(archive, kind, kind.dir_name()).await
    }

    /// Like [`unpack`](Self::unpack), with an explicit subdirectory name.
    ///
    /// Used when the same container format is extracted more than once
    /// per run (the runtime distribution shares the installer's format).
    pub async fn unpack_named(
        &self,
        archive: &Path,
        kind: ContainerKind,
        dir_name: &str,
    ) -> Result<PathBuf> {
        let dest = self.staging.join(dir_name);
        if dest.exists() {
            tokio::fs::remove_dir_all(&dest)
                .await
                .fs_context("clearing extraction directory", &dest)?;
        }
        tokio::fs::create_dir_all(&dest)
            .await
            .fs_context("creating extraction directory", &dest)?;

        log::info!("extracting {} into {}", archive.display(), dest.display());
        self.tools.unpack(archive, &dest, kind).await?;
        Ok(dest)
    }
}

/// Locate the single required file under `dir` matching `pattern`.
///
/// Zero matches means the vendor's package layout changed and is fatal.
/// With multiple matches the lexicographically first path wins, keeping
/// repeated runs reproducible.
pub fn find_required(dir: &Path, pattern: NamePattern) -> Result<PathBuf> {
    let mut matches: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && pattern.matches(name)
        {
            matches.push(entry.into_path());
        }
    }

    matches.sort();
    match matches.into_iter().next() {
        Some(path) => {
            log::debug!("required file {} -> {}", pattern, path.display());
            Ok(path)
        }
        None => Err(Error::ArchiveNotFound {
            pattern: pattern.to_string(),
            dir: dir.to_path_buf(),
        }),
    }
}
