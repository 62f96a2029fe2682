//! Error types for the repack pipeline.
//!
//! One crate-wide [`Error`] enum covers every stage of the pipeline,
//! from pre-flight tool checks to the final install. Variants that
//! correspond to a pipeline stage expose that stage's name through
//! [`Error::stage`], which the CLI uses for its failure status line.
//!
//! Also provides the [`Context`] trait for wrapping errors with a
//! message, the [`ErrorExt`] trait for filesystem operations with
//! automatic path context, and the `bail!` macro for early returns.

use std::{fmt::Display, io, path::PathBuf};
use thiserror::Error as DeriveError;

/// Errors returned by the repack pipeline.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "reading resource file")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Child process execution error.
    ///
    /// Used when an external tool cannot be spawned or exits nonzero.
    #[error("failed to run command {command}: {reason}")]
    CommandFailed {
        /// Command that failed
        command: String,
        /// Spawn error or captured stderr summary
        reason: String,
    },

    /// One or more required host tools are absent from PATH.
    ///
    /// Raised by the pre-flight check before any pipeline stage runs.
    #[error("missing required host tools: {}", tools.join(", "))]
    MissingDependency {
        /// Names of the tools that could not be found
        tools: Vec<String>,
    },

    /// Network fetch of a source artifact failed.
    ///
    /// No retry is attempted; transient failures are reported, not retried.
    #[error("download of {url} failed: {reason}")]
    DownloadFailure {
        /// URL that was being fetched
        url: String,
        /// Underlying transport or status error
        reason: String,
    },

    /// A downloaded artifact did not match its expected checksum.
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// URL the artifact came from
        url: String,
        /// Expected hex digest
        expected: String,
        /// Actual hex digest
        actual: String,
    },

    /// A required file was not found inside an extracted container.
    ///
    /// Signals that the vendor's package layout changed.
    #[error("no file matching {pattern} found under {dir}")]
    ArchiveNotFound {
        /// The name pattern that had zero matches
        pattern: String,
        /// Directory that was searched
        dir: PathBuf,
    },

    /// A required patch rule's literal fragment is absent from the target.
    #[error("patch rule '{rule}' found no match in {path}")]
    PatchFragmentNotFound {
        /// Name of the rule whose fragment was missing
        rule: &'static str,
        /// File that was searched
        path: PathBuf,
    },

    /// The idempotency marker was absent after a patch was written.
    ///
    /// The original file has been restored from its backup.
    #[error("patch rule '{rule}' did not verify against {path}; original restored from backup")]
    PatchVerificationFailure {
        /// Name of the rule that failed verification
        rule: &'static str,
        /// File that was being patched
        path: PathBuf,
    },

    /// Rebuilding the resource container failed.
    #[error("repacking {container} failed: {reason}")]
    RepackFailure {
        /// Container that was being rebuilt
        container: PathBuf,
        /// Underlying tool or rename error
        reason: String,
    },

    /// The bundling tool ran but the output artifact is absent.
    ///
    /// Artifact existence is the authoritative success signal; the
    /// tool's exit code alone is not trusted.
    #[error("bundle build produced no artifact at {artifact}: {reason}")]
    BundleBuildFailure {
        /// Expected output artifact path
        artifact: PathBuf,
        /// Tool failure detail, or "output file missing"
        reason: String,
    },

    /// Installing the assembled bundle over the existing path failed.
    ///
    /// The pre-existing installation remains recoverable from its backup.
    #[error("install to {dest} failed: {reason}")]
    InstallFailure {
        /// Destination install path
        dest: PathBuf,
        /// Underlying copy or permission error
        reason: String,
    },

    /// Generic I/O error.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// Error walking a directory tree.
    #[error("{0}")]
    Walkdir(#[from] walkdir::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Name of the pipeline stage this error belongs to, if any.
    ///
    /// Used by the CLI to print a status line identifying the failing
    /// stage. Context wrappers delegate to the wrapped error.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::Context(_, inner) => inner.stage(),
            Self::MissingDependency { .. } => Some("preflight"),
            Self::DownloadFailure { .. } | Self::ChecksumMismatch { .. } => Some("fetch"),
            Self::ArchiveNotFound { .. } => Some("unpack"),
            Self::PatchFragmentNotFound { .. } | Self::PatchVerificationFailure { .. } => {
                Some("patch")
            }
            Self::RepackFailure { .. } => Some("repack"),
            Self::BundleBuildFailure { .. } => Some("bundle"),
            Self::InstallFailure { .. } => Some("install"),
            _ => None,
        }
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Works with both `Result<T>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::Generic(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::Generic(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
///
/// The `context` should be a present-tense verb phrase describing the
/// operation, e.g., "reading resource file", "creating staging directory".
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with a formatted [`Error::Generic`].
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::error::Error::Generic($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::error::Error::Generic($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::Generic(format!($fmt, $($arg)*)))
    };
}
