//! # vendor-repack
//!
//! Transforms a vendor-distributed Windows application package into a
//! redistributable, patched, self-contained Linux AppImage.
//!
//! The pipeline unpacks the vendor's chain of nested containers
//! (self-extracting installer → update package → packed resource
//! container), applies a narrow, idempotent text patch to the embedded
//! script bundle to unlock the Linux code path the vendor omitted,
//! repacks the resources, and assembles a portable executable bundle
//! around an embedded runtime.
//!
//! ## Pipeline
//!
//! ```text
//! Fetcher → ArchiveUnpacker → PatchEngine → ResourceRepacker → BundleAssembler
//! ```
//!
//! Stages run strictly sequentially and fail fast; the staging
//! directory is cleaned up on every exit path. Container formats are
//! driven through external tools behind the [`tools::ArchiveTools`]
//! trait, so the patch and orchestration logic is testable with
//! in-memory fakes.
//!
//! ## Usage
//!
//! ```bash
//! vendor-repack build              # full from-source pipeline
//! vendor-repack patch-only         # stop after patch + repack
//! vendor-repack patch-installed    # patch an installed bundle in place
//! vendor-repack clean              # drop staging, cache, and dist
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod archive;
pub mod bundle;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod install;
pub mod patch;
pub mod pipeline;
pub mod repack;
pub mod tools;

// Re-export main types for public API
pub use archive::{ArchiveUnpacker, ContainerKind, NamePattern};
pub use bundle::{BundleManifest, BundleSpec};
pub use config::RunConfig;
pub use error::{Context, Error, ErrorExt, Result};
pub use fetch::{Fetcher, HttpTransfer, SourceArtifact, Transfer};
pub use patch::{PatchOutcome, PatchRule, ReplaceScope, Severity};
pub use pipeline::{Pipeline, WorkDir};
pub use tools::{ArchiveTools, SystemTools};
