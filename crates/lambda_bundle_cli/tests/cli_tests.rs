use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn project(assets_dir: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir should be created");
    fs::write(dir.path().join("requirements.txt"), "requests==2.0.0\n").unwrap();
    fs::write(dir.path().join("riots.py"), "print('riots')\n").unwrap();
    fs::create_dir_all(dir.path().join(assets_dir)).unwrap();
    fs::write(dir.path().join(assets_dir).join("index.html"), "<html></html>\n").unwrap();
    dir
}

fn lambda_bundle(project_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lambda-bundle").expect("binary should be built");
    cmd.env_remove("RUST_LOG")
        .env("LAMBDA_BUNDLE_PROJECT_DIR", project_dir);
    cmd
}

/// Writes an executable that answers `--version` and otherwise behaves like
/// `pip install -r <manifest> -t <target>` by running `body` with the target in `$5`.
#[cfg(unix)]
fn fake_installer(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-pip");
    let script = format!(
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo 'pip 0.0 (fake)'; exit 0; fi\n{body}\n"
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn plan_lists_every_step() {
    let dir = project("site");

    lambda_bundle(dir.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Prepare staging directory"))
        .stdout(predicate::str::contains("6. Remove staging directory"));

    assert!(!dir.path().join("build_func").exists());
}

#[test]
fn plan_with_keep_staging_skips_removal() {
    let dir = project("site");

    lambda_bundle(dir.path())
        .args(["plan", "--keep-staging"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5. Write archive"))
        .stdout(predicate::str::contains("Remove staging directory").not());
}

#[test]
fn plan_rejects_staging_over_project_root() {
    let dir = project("site");

    lambda_bundle(dir.path())
        .args(["plan", "--staging-dir", "."])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid bundle layout"));
}

#[test]
fn missing_manifest_fails_with_generic_code() {
    let dir = project("site");
    fs::remove_file(dir.path().join("requirements.txt")).unwrap();

    lambda_bundle(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("manifest not found"));
}

#[test]
fn unknown_installer_kind_is_a_usage_error() {
    let dir = project("site");

    lambda_bundle(dir.path())
        .args(["--installer", "conda"])
        .assert()
        .code(2);
}

#[cfg(unix)]
#[test]
fn default_run_packages_the_project() {
    let dir = project("site");
    let installer = fake_installer(
        dir.path(),
        "mkdir -p \"$5/requests\" && : > \"$5/requests/__init__.py\"",
    );

    lambda_bundle(dir.path())
        .arg("--installer-program")
        .arg(&installer)
        .assert()
        .success()
        .stderr(predicate::str::contains("Packaged artifact"));

    assert!(dir.path().join("lambda.zip").is_file());
    assert!(!dir.path().join("build_func").exists());

    lambda_bundle(dir.path())
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("requests/__init__.py"))
        .stdout(predicate::str::contains("riots.py"))
        .stdout(predicate::str::contains("site/index.html"))
        .stdout(predicate::str::contains("5 entries"));
}

#[cfg(unix)]
#[test]
fn assets_dir_can_come_from_environment() {
    let dir = project("sites");
    let installer = fake_installer(dir.path(), "mkdir -p \"$5/requests\"");

    lambda_bundle(dir.path())
        .env("LAMBDA_BUNDLE_ASSETS_DIR", "sites")
        .env("LAMBDA_BUNDLE_INSTALLER_PROGRAM", &installer)
        .args(["package", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sha256\""));

    lambda_bundle(dir.path())
        .args(["inspect", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sites/index.html"));
}

#[cfg(unix)]
#[test]
fn installer_failure_propagates_exit_code() {
    let dir = project("site");
    fs::write(dir.path().join("lambda.zip"), "previous archive").unwrap();
    let installer = fake_installer(dir.path(), "mkdir -p \"$5/partial\"\nexit 3");

    lambda_bundle(dir.path())
        .arg("--installer-program")
        .arg(&installer)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("failed with exit status 3"));

    assert!(!dir.path().join("lambda.zip").exists());
    assert!(!dir.path().join("build_func").exists());
}

#[test]
fn missing_installer_is_reported() {
    let dir = project("site");

    lambda_bundle(dir.path())
        .args(["--installer-program", "lambda-bundle-test-no-such-installer"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not available"));

    assert!(!dir.path().join("build_func").exists());
}
