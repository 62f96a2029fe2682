//! Exact-match, idempotent text patching.
//!
//! The vendor's resource bundle is a minified script; the patch is a
//! declarative rule, not a diff. Each [`PatchRule`] carries a literal
//! fragment to find, a literal replacement, and an idempotency marker
//! whose presence proves the rule has already been applied. Matching is
//! exact by requirement: an inexact match risks producing a
//! syntactically broken script, so there is no fuzzy fallback.
//!
//! Application is a pure function of current file content
//! ([`apply_to_content`]); file I/O, backup handling, and post-write
//! verification live in [`apply_to_file`].

pub mod rules;

use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorExt, Result};

/// How to treat a rule whose fragment is absent from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Missing fragment is fatal. Used for the platform-detection rule.
    Required,
    /// Missing fragment logs a warning and the pipeline continues.
    BestEffort,
}

/// How many occurrences of the fragment to replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceScope {
    /// Replace only the first occurrence.
    First,
    /// Replace every occurrence.
    All,
}

/// A declarative substitution rule.
///
/// Invariant: `marker` must be a substring of `replacement` and must not
/// occur in any unpatched target, so "already applied" is decidable by a
/// substring test alone.
#[derive(Debug, Clone, Copy)]
pub struct PatchRule {
    /// Short identifier used in logs and errors
    pub name: &'static str,
    /// Literal fragment that must be present in unpatched content
    pub fragment: &'static str,
    /// Literal text replacing the fragment
    pub replacement: &'static str,
    /// Substring present if and only if the rule has been applied
    pub marker: &'static str,
    /// Fatal or warn-and-continue when the fragment is missing
    pub severity: Severity,
    /// First-occurrence or global replacement
    pub scope: ReplaceScope,
}

/// Result of applying one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The rule was applied and the content changed.
    Applied,
    /// The marker was already present; nothing was written.
    AlreadyApplied,
    /// A best-effort rule found no fragment; nothing was written.
    SkippedMissingFragment,
}

/// Apply a rule to content, without touching the filesystem.
///
/// Returns the (possibly unchanged) content and what happened. The only
/// error is a `Required` rule whose fragment is absent; `path` is used
/// solely to report that error.
pub fn apply_to_content(
    content: &str,
    rule: &PatchRule,
    path: &Path,
) -> Result<(String, PatchOutcome)> {
    if content.contains(rule.marker) {
        return Ok((content.to_string(), PatchOutcome::AlreadyApplied));
    }

    if !content.contains(rule.fragment) {
        return match rule.severity {
            Severity::Required => Err(Error::PatchFragmentNotFound {
                rule: rule.name,
                path: path.to_path_buf(),
            }),
            Severity::BestEffort => {
                log::warn!(
                    "patch rule '{}' found no match in {}; continuing",
                    rule.name,
                    path.display()
                );
                Ok((content.to_string(), PatchOutcome::SkippedMissingFragment))
            }
        };
    }

    let patched = match rule.scope {
        ReplaceScope::First => content.replacen(rule.fragment, rule.replacement, 1),
        ReplaceScope::All => content.replace(rule.fragment, rule.replacement),
    };
    Ok((patched, PatchOutcome::Applied))
}

/// Apply a rule to the file at `path`.
///
/// Before the first write the original is preserved at `<path>.orig`;
/// after the write the content is re-read and must contain the marker,
/// otherwise the original is restored from the backup and
/// [`Error::PatchVerificationFailure`] is returned.
pub fn apply_to_file(path: &Path, rule: &PatchRule) -> Result<PatchOutcome> {
    let content = std::fs::read_to_string(path).fs_context("reading patch target", path)?;

    let (patched, outcome) = apply_to_content(&content, rule, path)?;
    if outcome != PatchOutcome::Applied {
        log::info!("patch rule '{}': {:?}, no write", rule.name, outcome);
        return Ok(outcome);
    }

    let backup = backup_path(path);
    if !backup.exists() {
        std::fs::copy(path, &backup).fs_context("writing patch backup", &backup)?;
    }

    std::fs::write(path, &patched).fs_context("writing patched file", path)?;

    // Trust the filesystem, not our own buffer, for verification.
    let written = std::fs::read_to_string(path).fs_context("re-reading patched file", path)?;
    if !written.contains(rule.marker) {
        std::fs::copy(&backup, path).fs_context("restoring patch backup", path)?;
        return Err(Error::PatchVerificationFailure {
            rule: rule.name,
            path: path.to_path_buf(),
        });
    }

    log::info!("patch rule '{}' applied to {}", rule.name, path.display());
    Ok(PatchOutcome::Applied)
}

/// Apply rules in order, reporting each outcome.
///
/// A failing required rule aborts the remainder; best-effort rules
/// never abort.
pub fn apply_rules(path: &Path, rules: &[PatchRule]) -> Result<Vec<(&'static str, PatchOutcome)>> {
    let mut outcomes = Vec::with_capacity(rules.len());
    for rule in rules {
        let outcome = apply_to_file(path, rule)?;
        outcomes.push((rule.name, outcome));
    }
    Ok(outcomes)
}

/// Backup location for a patch target.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".orig");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rules::platform_rule;

    const SCENARIO_A: &str = concat!(
        "function t(){}getPlatform(){const e=process.arch;",
        "if(platform===\"darwin\")return e===\"arm64\"?\"darwin-arm64\":\"darwin-x64\";",
        "if(platform===\"win32\")return\"win32-x64\";",
        "throw new Error(`Unsupported platform: ${platform}`)}"
    );

    fn best_effort_rule() -> PatchRule {
        PatchRule {
            name: "test-optional",
            fragment: "NOT_PRESENT",
            replacement: "X",
            marker: "X",
            severity: Severity::BestEffort,
            scope: ReplaceScope::First,
        }
    }

    #[test]
    fn platform_rule_inserts_linux_branch_before_throw() {
        let rule = platform_rule();
        let (patched, outcome) =
            apply_to_content(SCENARIO_A, &rule, Path::new("bundle.js")).expect("apply");

        assert_eq!(outcome, PatchOutcome::Applied);
        assert!(patched.contains(
            "if(platform===\"linux\")return e===\"arm64\"?\"linux-arm64\":\"linux-x64\";"
        ));
        // Inserted immediately before the terminal throw clause.
        let linux = patched.find(rule.marker).expect("marker present");
        let throw = patched.find("throw new Error").expect("throw present");
        assert_eq!(linux + rule.marker.len(), throw);
    }

    #[test]
    fn second_application_is_a_no_op() {
        let rule = platform_rule();
        let (once, _) = apply_to_content(SCENARIO_A, &rule, Path::new("bundle.js")).expect("apply");
        let (twice, outcome) =
            apply_to_content(&once, &rule, Path::new("bundle.js")).expect("re-apply");

        assert_eq!(outcome, PatchOutcome::AlreadyApplied);
        assert_eq!(once, twice);
    }

    #[test]
    fn required_rule_with_missing_fragment_is_fatal() {
        let rule = platform_rule();
        let err = apply_to_content("nothing to see here", &rule, Path::new("bundle.js"))
            .unwrap_err();
        assert!(matches!(err, Error::PatchFragmentNotFound { .. }));
        assert_eq!(err.stage(), Some("patch"));
    }

    #[test]
    fn best_effort_rule_with_missing_fragment_continues() {
        let (content, outcome) =
            apply_to_content("nothing to see here", &best_effort_rule(), Path::new("b.js"))
                .expect("best-effort never errors on missing fragment");
        assert_eq!(outcome, PatchOutcome::SkippedMissingFragment);
        assert_eq!(content, "nothing to see here");
    }

    #[test]
    fn file_patch_writes_backup_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("bundle.js");
        std::fs::write(&target, SCENARIO_A).expect("write");

        let rule = platform_rule();
        assert_eq!(apply_to_file(&target, &rule).expect("patch"), PatchOutcome::Applied);

        let backup = backup_path(&target);
        assert_eq!(std::fs::read_to_string(&backup).expect("backup"), SCENARIO_A);

        // Second run: marker present, no write, backup untouched.
        assert_eq!(
            apply_to_file(&target, &rule).expect("re-patch"),
            PatchOutcome::AlreadyApplied
        );
        assert_eq!(std::fs::read_to_string(&backup).expect("backup"), SCENARIO_A);
    }

    #[test]
    fn verification_failure_restores_original() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("bundle.js");
        std::fs::write(&target, "alpha beta gamma").expect("write");

        // Replacement does not contain the marker, so verification must fail.
        let broken = PatchRule {
            name: "broken",
            fragment: "beta",
            replacement: "BETA",
            marker: "__never_written__",
            severity: Severity::Required,
            scope: ReplaceScope::First,
        };

        let err = apply_to_file(&target, &broken).unwrap_err();
        assert!(matches!(err, Error::PatchVerificationFailure { .. }));
        assert_eq!(
            std::fs::read_to_string(&target).expect("read"),
            "alpha beta gamma"
        );
    }

    #[test]
    fn global_scope_replaces_all_occurrences() {
        let rule = PatchRule {
            name: "global",
            fragment: "aa",
            replacement: "bb",
            marker: "bb",
            severity: Severity::Required,
            scope: ReplaceScope::All,
        };
        let (patched, _) = apply_to_content("aa-aa-aa", &rule, Path::new("x")).expect("apply");
        assert_eq!(patched, "bb-bb-bb");
    }
}
