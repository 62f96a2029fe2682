//! End-to-end pipeline tests over in-memory fake tools.
//!
//! The fake container format encodes a directory tree as hex-encoded
//! `path content` lines, so unpack/pack round-trips are exact and no
//! real archive tools are needed.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use vendor_repack::config::RunConfig;
use vendor_repack::error::{Error, Result};
use vendor_repack::pipeline::{Pipeline, WorkDir};
use vendor_repack::tools::ArchiveTools;
use vendor_repack::{ContainerKind, Transfer};

const SCRIPT_BUNDLE: &str = concat!(
    "function t(){}getPlatform(){const e=process.arch;",
    "if(platform===\"darwin\")return e===\"arm64\"?\"darwin-arm64\":\"darwin-x64\";",
    "if(platform===\"win32\")return\"win32-x64\";",
    "throw new Error(`Unsupported platform: ${platform}`)}"
);

const LINUX_MARKER: &str =
    "if(platform===\"linux\")return e===\"arm64\"?\"linux-arm64\":\"linux-x64\";";

// ---- fake container codec ----

type Tree = BTreeMap<String, Vec<u8>>;

fn encode_tree(tree: &Tree) -> Vec<u8> {
    let mut out = String::from("FAKEARC1\n");
    for (path, content) in tree {
        out.push_str(&hex::encode(path.as_bytes()));
        out.push(' ');
        out.push_str(&hex::encode(content));
        out.push('\n');
    }
    out.into_bytes()
}

fn decode_tree(data: &[u8]) -> Tree {
    let text = std::str::from_utf8(data).expect("fake archive is utf-8");
    let mut tree = Tree::new();
    for line in text.lines().skip(1) {
        let (path, content) = line.split_once(' ').expect("fake archive line");
        tree.insert(
            String::from_utf8(hex::decode(path).expect("hex path")).expect("utf-8 path"),
            hex::decode(content).expect("hex content"),
        );
    }
    tree
}

fn read_dir_tree(dir: &Path) -> Tree {
    let mut tree = Tree::new();
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.expect("walk");
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(dir)
                .expect("under root")
                .to_str()
                .expect("utf-8 rel path")
                .to_string();
            tree.insert(rel, std::fs::read(entry.path()).expect("read"));
        }
    }
    tree
}

fn write_dir_tree(dir: &Path, tree: &Tree) {
    for (rel, content) in tree {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, content).expect("write");
    }
}

// ---- fake tools ----

#[derive(Default)]
struct Counts {
    unpack: usize,
    pack: usize,
    assemble: usize,
}

struct FakeTools {
    counts: Mutex<Counts>,
    /// When set, assemble_bundle returns Ok but writes no output file.
    swallow_bundle_output: bool,
}

impl FakeTools {
    fn new() -> Self {
        Self {
            counts: Mutex::new(Counts::default()),
            swallow_bundle_output: false,
        }
    }

    fn counts(&self) -> (usize, usize, usize) {
        let c = self.counts.lock().expect("lock");
        (c.unpack, c.pack, c.assemble)
    }
}

impl ArchiveTools for FakeTools {
    async fn unpack(&self, archive: &Path, dest: &Path, _kind: ContainerKind) -> Result<()> {
        self.counts.lock().expect("lock").unpack += 1;
        let tree = decode_tree(&std::fs::read(archive).expect("read archive"));
        write_dir_tree(dest, &tree);
        Ok(())
    }

    async fn pack(&self, dir: &Path, container: &Path) -> Result<()> {
        self.counts.lock().expect("lock").pack += 1;
        std::fs::write(container, encode_tree(&read_dir_tree(dir))).expect("write container");
        Ok(())
    }

    async fn assemble_bundle(&self, app_dir: &Path, output: &Path, _arch: &str) -> Result<()> {
        self.counts.lock().expect("lock").assemble += 1;
        assert!(app_dir.is_dir(), "assemble called without a layout");
        if !self.swallow_bundle_output {
            std::fs::write(output, b"BUNDLE-IMAGE").expect("write bundle");
        }
        Ok(())
    }
}

// ---- fake transfer ----

struct FakeTransfer {
    bodies: BTreeMap<String, Vec<u8>>,
    calls: AtomicUsize,
}

impl Transfer for &FakeTransfer {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| Error::DownloadFailure {
                url: url.to_string(),
                reason: "no such fixture".into(),
            })
    }
}

// ---- fixtures ----

const INSTALLER_URL: &str = "https://fixtures.invalid/VendorAppSetup-x64.exe";
const RUNTIME_URL: &str = "https://fixtures.invalid/runtime-linux.zip";

fn resource_container_bytes() -> Vec<u8> {
    let mut resources = Tree::new();
    resources.insert("index.js".into(), SCRIPT_BUNDLE.as_bytes().to_vec());
    resources.insert(
        "package.json".into(),
        br#"{"name":"vendor-app","version":"0.9.3"}"#.to_vec(),
    );
    encode_tree(&resources)
}

fn installer_bytes() -> Vec<u8> {
    let mut package = Tree::new();
    package.insert(
        "lib/net45/resources/app.asar".into(),
        resource_container_bytes(),
    );
    package.insert("lib/net45/app.png".into(), b"\x89PNG".to_vec());

    let mut installer = Tree::new();
    installer.insert(
        "VendorApp-0.9.3-full.nupkg".into(),
        encode_tree(&package),
    );
    installer.insert("Setup.exe".into(), b"MZ".to_vec());
    encode_tree(&installer)
}

fn runtime_bytes() -> Vec<u8> {
    let mut runtime = Tree::new();
    runtime.insert("electron".into(), b"\x7fELF".to_vec());
    runtime.insert("version".into(), b"v33.3.1".to_vec());
    encode_tree(&runtime)
}

fn fixture_transfer() -> FakeTransfer {
    let mut bodies = BTreeMap::new();
    bodies.insert(INSTALLER_URL.to_string(), installer_bytes());
    bodies.insert(RUNTIME_URL.to_string(), runtime_bytes());
    FakeTransfer {
        bodies,
        calls: AtomicUsize::new(0),
    }
}

fn test_config(staging: &Path) -> RunConfig {
    let mut config = RunConfig::new(false).expect("config");
    config.staging_root = staging.to_path_buf();
    config.installer_url = INSTALLER_URL.to_string();
    config.runtime_url = RUNTIME_URL.to_string();
    config.install_path = staging.join("installed/vendor-app.AppImage");
    config.installed_layout = staging.join("installed/VendorApp.AppDir");
    config
}

// ---- tests ----

#[tokio::test]
async fn build_produces_patched_bundle() {
    let staging = tempfile::tempdir().expect("tempdir");
    let config = test_config(staging.path());
    let tools = FakeTools::new();
    let transfer = fixture_transfer();

    let pipeline = Pipeline::new(&config, &tools, &transfer);
    let workdir = WorkDir::create(&config.staging_root).expect("workdir");
    let manifest = pipeline.run_build(&workdir).await.expect("build");

    assert_eq!(manifest.version, "0.9.3");
    assert_eq!(manifest.platform, format!("linux-{}", config.target_arch));
    assert!(manifest.artifact.exists());

    // The AppDir embeds the runtime and the patched container.
    let app_dir = config.dist_dir().join("VendorApp.AppDir");
    assert!(app_dir.join("AppRun").exists());
    assert!(app_dir.join("vendor-app.desktop").exists());
    assert!(app_dir.join("usr/lib/runtime/electron").exists());

    let container = app_dir.join("usr/lib/runtime/resources/app.asar");
    let tree = decode_tree(&std::fs::read(container).expect("read container"));
    let script = String::from_utf8(tree["index.js"].clone()).expect("utf-8");
    assert!(script.contains(LINUX_MARKER));
    // The patch backup never leaks into the repacked container.
    assert!(!tree.contains_key("index.js.orig"));

    let (_, pack, assemble) = tools.counts();
    assert_eq!(pack, 1);
    assert_eq!(assemble, 1);
}

#[tokio::test]
async fn second_build_reuses_cached_downloads() {
    let staging = tempfile::tempdir().expect("tempdir");
    let config = test_config(staging.path());
    let tools = FakeTools::new();
    let transfer = fixture_transfer();

    let pipeline = Pipeline::new(&config, &tools, &transfer);

    let workdir = WorkDir::create(&config.staging_root).expect("workdir");
    pipeline.run_build(&workdir).await.expect("first build");
    drop(workdir);

    let workdir = WorkDir::create(&config.staging_root).expect("workdir");
    pipeline.run_build(&workdir).await.expect("second build");

    // One transfer per URL (installer, runtime), across both runs.
    assert_eq!(transfer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn version_falls_back_to_package_file_name() {
    let staging = tempfile::tempdir().expect("tempdir");
    let config = test_config(staging.path());
    let tools = FakeTools::new();

    // Resource container whose metadata carries no version field, so
    // the version must come from the update package's file name.
    let mut resources = Tree::new();
    resources.insert("index.js".into(), SCRIPT_BUNDLE.as_bytes().to_vec());
    resources.insert("package.json".into(), br#"{"name":"vendor-app"}"#.to_vec());

    let mut package = Tree::new();
    package.insert("lib/net45/resources/app.asar".into(), encode_tree(&resources));

    let mut installer = Tree::new();
    installer.insert("VendorApp-1.2.3-full.nupkg".into(), encode_tree(&package));

    let mut bodies = BTreeMap::new();
    bodies.insert(INSTALLER_URL.to_string(), encode_tree(&installer));
    bodies.insert(RUNTIME_URL.to_string(), runtime_bytes());
    let transfer = FakeTransfer { bodies, calls: AtomicUsize::new(0) };

    let pipeline = Pipeline::new(&config, &tools, &transfer);
    let workdir = WorkDir::create(&config.staging_root).expect("workdir");
    let manifest = pipeline.run_build(&workdir).await.expect("build");

    assert_eq!(manifest.version, "1.2.3");
}

#[tokio::test]
async fn missing_nested_package_halts_the_pipeline() {
    let staging = tempfile::tempdir().expect("tempdir");
    let config = test_config(staging.path());
    let tools = FakeTools::new();

    // Installer with no update package inside.
    let mut bodies = BTreeMap::new();
    let mut installer = Tree::new();
    installer.insert("Setup.exe".into(), b"MZ".to_vec());
    bodies.insert(INSTALLER_URL.to_string(), encode_tree(&installer));
    bodies.insert(RUNTIME_URL.to_string(), runtime_bytes());
    let transfer = FakeTransfer { bodies, calls: AtomicUsize::new(0) };

    let pipeline = Pipeline::new(&config, &tools, &transfer);
    let workdir = WorkDir::create(&config.staging_root).expect("workdir");
    let err = pipeline.run_build(&workdir).await.unwrap_err();

    assert!(matches!(err, Error::ArchiveNotFound { .. }));
    assert_eq!(err.stage(), Some("unpack"));

    // No stage after the failed unpack ran.
    let (_, pack, assemble) = tools.counts();
    assert_eq!(pack, 0);
    assert_eq!(assemble, 0);
}

#[tokio::test]
async fn fake_container_round_trips_directory_trees() {
    let dir = tempfile::tempdir().expect("tempdir");
    let src = dir.path().join("tree");
    let mut tree = Tree::new();
    tree.insert("a.txt".into(), b"alpha".to_vec());
    tree.insert("nested/deep/b.bin".into(), vec![0, 159, 146, 150]);
    tree.insert("empty.dat".into(), Vec::new());
    std::fs::create_dir_all(&src).expect("mkdir");
    write_dir_tree(&src, &tree);

    let tools = FakeTools::new();
    let container = dir.path().join("tree.asar");
    tools.pack(&src, &container).await.expect("pack");

    let dest = dir.path().join("unpacked");
    std::fs::create_dir_all(&dest).expect("mkdir");
    tools
        .unpack(&container, &dest, ContainerKind::ResourceContainer)
        .await
        .expect("unpack");

    assert_eq!(read_dir_tree(&dest), tree);
}

#[tokio::test]
async fn patch_installed_reinstalls_with_backup() {
    let staging = tempfile::tempdir().expect("tempdir");
    let config = test_config(staging.path());
    let tools = FakeTools::new();
    let transfer = fixture_transfer();

    // Seed an existing install: layout with an unpatched container,
    // plus an installed image worth backing up.
    let resources_path = config.installed_layout.join("usr/lib/runtime/resources");
    std::fs::create_dir_all(&resources_path).expect("mkdir");
    std::fs::write(resources_path.join("app.asar"), resource_container_bytes())
        .expect("seed container");
    std::fs::create_dir_all(config.install_path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&config.install_path, b"vendor original install").expect("seed install");

    let pipeline = Pipeline::new(&config, &tools, &transfer);
    let workdir = WorkDir::create(&config.staging_root).expect("workdir");
    let manifest = pipeline.run_patch_installed(&workdir).await.expect("patch");

    assert_eq!(manifest.version, "0.9.3");

    // The layout's container is patched in place.
    let tree = decode_tree(&std::fs::read(resources_path.join("app.asar")).expect("read"));
    let script = String::from_utf8(tree["index.js"].clone()).expect("utf-8");
    assert!(script.contains(LINUX_MARKER));

    // Backup holds the pre-install bytes; the install was replaced.
    let backup = vendor_repack::install::backup_path(&config.install_path);
    assert_eq!(std::fs::read(&backup).expect("backup"), b"vendor original install");
    assert_eq!(std::fs::read(&config.install_path).expect("install"), b"BUNDLE-IMAGE");

    // The in-place variant never touches the network.
    assert_eq!(transfer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn bundle_tool_without_output_artifact_is_a_failure() {
    let staging = tempfile::tempdir().expect("tempdir");
    let config = test_config(staging.path());
    let mut tools = FakeTools::new();
    tools.swallow_bundle_output = true;
    let transfer = fixture_transfer();

    let pipeline = Pipeline::new(&config, &tools, &transfer);
    let workdir = WorkDir::create(&config.staging_root).expect("workdir");
    let err = pipeline.run_build(&workdir).await.unwrap_err();

    assert!(matches!(err, Error::BundleBuildFailure { .. }));
    assert_eq!(err.stage(), Some("bundle"));
}

#[test]
fn workdir_is_cleaned_after_a_failed_run() {
    let staging = tempfile::tempdir().expect("tempdir");
    let run_path;
    {
        let workdir = WorkDir::create(staging.path()).expect("workdir");
        run_path = workdir.path().to_path_buf();
        std::fs::write(run_path.join("partial.bin"), b"x").expect("write");
        // Failure path: the guard drops without retain().
    }
    assert!(!run_path.exists());
    assert!(staging.path().exists());
}
