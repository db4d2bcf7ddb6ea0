//! End-to-end tests for global CLI behavior and the `check` command.
//!
//! Only descriptions without resolvable URLs are used, so no test touches the
//! network.

#[allow(dead_code)]
mod common;
#[allow(unused_imports)]
use common::prelude::*;

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("depends-on");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("patch"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_version() {
    let mut cmd = cargo_bin_cmd!("depends-on");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_is_usage_error() {
    let mut cmd = cargo_bin_cmd!("depends-on");
    cmd.assert().code(2);
}

#[test]
fn test_check_without_dependencies() {
    let mut cmd = cargo_bin_cmd!("depends-on");
    cmd.env_remove("DEPENDS_ON_CHANGE_URL")
        .arg("--color")
        .arg("never")
        .arg("check")
        .arg("--description")
        .arg("Refactor the parser, nothing else needed")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] No Depends-On dependency"));
}

#[test]
fn test_check_ignores_commented_dependency() {
    let mut cmd = cargo_bin_cmd!("depends-on");
    cmd.env_remove("DEPENDS_ON_CHANGE_URL")
        .arg("check")
        .arg("--description")
        .arg("<!-- Depends-On: https://github.com/acme/lib/pull/1 -->")
        .assert()
        .success();
}

#[test]
fn test_check_invalid_dependency_url_fails() {
    let mut cmd = cargo_bin_cmd!("depends-on");
    cmd.env_remove("DEPENDS_ON_CHANGE_URL")
        .arg("check")
        .arg("--description")
        .arg("Depends-On: https://github.com/acme/lib/issues/4")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("https://github.com/acme/lib/issues/4"));
}

#[test]
fn test_check_reads_description_file() {
    let fixture = TestFixture::new();
    fixture.project_file("body.md", "Just a typo fix\n");

    let mut cmd = cargo_bin_cmd!("depends-on");
    cmd.env_remove("DEPENDS_ON_CHANGE_URL")
        .arg("check")
        .arg("--description-file")
        .arg(fixture.project().join("body.md"))
        .assert()
        .success();
}

#[test]
fn test_check_reads_sidecar_description() {
    let fixture = TestFixture::new();
    fixture.project_file(
        "depends-on.json",
        r#"{ "description": "No dependency here" }"#,
    );

    let mut cmd = cargo_bin_cmd!("depends-on");
    cmd.env_remove("DEPENDS_ON_CHANGE_URL")
        .arg("check")
        .arg("--project-dir")
        .arg(fixture.project())
        .assert()
        .success();
}

#[test]
fn test_check_without_sidecar_fails() {
    let fixture = TestFixture::new();

    let mut cmd = cargo_bin_cmd!("depends-on");
    cmd.env_remove("DEPENDS_ON_CHANGE_URL")
        .arg("check")
        .arg("--project-dir")
        .arg(fixture.project())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("depends-on.json"));
}

#[test]
fn test_conflicting_description_sources() {
    let mut cmd = cargo_bin_cmd!("depends-on");
    cmd.env_remove("DEPENDS_ON_CHANGE_URL")
        .arg("check")
        .arg("--description")
        .arg("text")
        .arg("--description-file")
        .arg("body.md")
        .assert()
        .code(2);
}

#[test]
fn test_run_without_dependencies_changes_nothing() {
    let fixture = TestFixture::new();
    fixture.project_file("package.json", "{\n  \"name\": \"app\"\n}\n");

    let mut cmd = cargo_bin_cmd!("depends-on");
    cmd.env_remove("DEPENDS_ON_CHANGE_URL")
        .arg("run")
        .arg("--project-dir")
        .arg(fixture.project())
        .arg("--description")
        .arg("Nothing to link")
        .assert()
        .success();

    assert_eq!(
        fixture.read_project_file("package.json"),
        "{\n  \"name\": \"app\"\n}\n"
    );
}
