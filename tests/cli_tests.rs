//! Command surface tests against the real binary.
//!
//! Only offline code paths are exercised: argument validation and the
//! clean subcommand against an empty staging root.

use assert_cmd::Command;
use predicates::prelude::*;

fn vendor_repack() -> Command {
    Command::cargo_bin("vendor-repack").expect("binary builds")
}

#[test]
fn help_lists_all_subcommands() {
    vendor_repack()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("patch-only"))
        .stdout(predicate::str::contains("patch-installed"))
        .stdout(predicate::str::contains("clean"));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    vendor_repack()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn malformed_sha256_exits_with_code_two() {
    vendor_repack()
        .args(["build", "--sha256", "nothex"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid arguments"));
}

#[test]
fn verbose_and_quiet_conflict() {
    vendor_repack()
        .args(["build", "--verbose", "--quiet"])
        .assert()
        .failure();
}

#[test]
fn clean_with_empty_staging_root_succeeds() {
    let staging = tempfile::tempdir().expect("tempdir");
    let empty = staging.path().join("never-created");

    vendor_repack()
        .arg("clean")
        .env("VENDOR_REPACK_STAGING", &empty)
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to clean"));
}
