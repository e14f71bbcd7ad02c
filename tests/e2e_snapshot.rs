#![cfg(unix)]

mod common;

use common::cli::{SnapWorkspace, extract_json_payload, run_chartsnap};
use predicates::prelude::*;
use serde_json::Value;
use std::time::Duration;

const RENDERED: &str = "---
# Source: app/templates/service.yaml
apiVersion: v1
kind: Service
metadata:
  name: app
spec:
  type: ClusterIP
---
# Source: app/templates/configmap.yaml
kind: ConfigMap
apiVersion: v1
metadata:
  name: app-config
data:
  mode: production
";

const EXPECTED_SNAPSHOT: &str = "apiVersion: v1
data:
  mode: production
kind: ConfigMap
metadata:
  name: app-config
---
apiVersion: v1
kind: Service
metadata:
  name: app
spec:
  type: ClusterIP
";

const SECRET: &str = "apiVersion: v1
kind: Secret
metadata:
  name: app-auth
data:
  token: TOKEN
";

const MASKED_VALUES: &str = "replicas: 1
testSpec:
  desc: masks the generated token
  dynamicFields:
    - apiVersion: v1
      kind: Secret
      name: app-auth
      jsonPath:
        - /data/token
";

#[test]
fn e2e_update_creates_snapshot_then_matches() {
    let _log = common::test_log("e2e_update_creates_snapshot_then_matches");
    let workspace = SnapWorkspace::new();
    workspace.set_render("default", RENDERED);

    let update = run_chartsnap(&workspace, ["-u"], "update");
    assert!(update.success(), "update failed: {}", update.stderr);
    assert!(predicate::str::contains(" RUNS ").eval(&update.stdout));
    assert!(predicate::str::contains(" PASS ").eval(&update.stdout));
    assert_eq!(workspace.read(&workspace.default_snapshot()), EXPECTED_SNAPSHOT);

    let check = run_chartsnap(&workspace, Vec::<String>::new(), "check");
    assert!(check.success(), "check failed: {}", check.stdout);
    assert!(predicate::str::contains("All 1 snapshot test(s) passed").eval(&check.stdout));
}

#[test]
fn e2e_changed_output_fails_with_diff() {
    let _log = common::test_log("e2e_changed_output_fails_with_diff");
    let workspace = SnapWorkspace::new();
    workspace.set_render("default", RENDERED);
    let update = run_chartsnap(&workspace, ["-u"], "update");
    assert!(update.success(), "update failed: {}", update.stderr);

    workspace.set_render("default", &RENDERED.replace("production", "debug"));
    let check = run_chartsnap(&workspace, Vec::<String>::new(), "check");
    assert_eq!(check.status.code(), Some(1));
    assert!(check.stdout.contains(" FAIL "));
    assert!(check.stdout.contains("snapshot does not match"));
    assert!(check.stdout.contains("-   mode: production"));
    assert!(check.stdout.contains("+   mode: debug"));

    // The stored snapshot is left alone.
    assert_eq!(workspace.read(&workspace.default_snapshot()), EXPECTED_SNAPSHOT);
}

#[test]
fn e2e_missing_snapshot_suggests_update() {
    let _log = common::test_log("e2e_missing_snapshot_suggests_update");
    let workspace = SnapWorkspace::new();
    workspace.set_render("default", RENDERED);

    let check = run_chartsnap(&workspace, Vec::<String>::new(), "check");
    assert_eq!(check.status.code(), Some(1));
    assert!(check.stdout.contains("snapshot not found"));
    assert!(check.stdout.contains("--update-snapshot"));
    assert!(!workspace.default_snapshot().exists());
}

#[test]
fn e2e_dynamic_fields_are_masked() {
    let _log = common::test_log("e2e_dynamic_fields_are_masked");
    let workspace = SnapWorkspace::new();
    let values = workspace.write_values("test/masked.yaml", MASKED_VALUES);
    workspace.set_render("masked.yaml", &SECRET.replace("TOKEN", "xYz123"));

    let values_arg = values.to_string_lossy().into_owned();
    let update = run_chartsnap(&workspace, ["-u", "-f", &values_arg], "update");
    assert!(update.success(), "update failed: {}", update.stderr);

    let snapshot = workspace.root.join("test/__snapshot__/masked.yaml.snap");
    let text = workspace.read(&snapshot);
    assert!(text.contains("###DYNAMIC_FIELD###"));
    assert!(!text.contains("xYz123"));

    workspace.set_render("masked.yaml", &SECRET.replace("TOKEN", "aBc987"));
    let check = run_chartsnap(&workspace, ["-f", &values_arg], "check");
    assert!(check.success(), "masked field leaked into comparison: {}", check.stdout);

    // The chart sees the values file itself.
    let calls = workspace.helm_calls();
    assert!(calls.iter().all(|c| c.contains("--values") && c.contains("masked.yaml")));
}

#[test]
fn e2e_render_stderr_is_snapshotted() {
    let _log = common::test_log("e2e_render_stderr_is_snapshotted");
    let workspace = SnapWorkspace::new();
    workspace.set_render("default", RENDERED);
    workspace.set_render_stderr("default", "walk.go:74: found symbolic link in path\n");

    let update = run_chartsnap(&workspace, ["-u"], "update");
    assert!(update.success(), "update failed: {}", update.stderr);
    assert!(update.stderr.contains("failed to recognize a resource"));

    let text = workspace.read(&workspace.default_snapshot());
    assert!(text.starts_with(EXPECTED_SNAPSHOT));
    assert!(text.ends_with("---\nwalk.go:74: found symbolic link in path\n"));
}

#[test]
fn e2e_values_directory_runs_every_case() {
    let _log = common::test_log("e2e_values_directory_runs_every_case");
    let workspace = SnapWorkspace::new();
    workspace.write_values("values/a.yaml", "replicas: 1\n");
    workspace.write_values("values/b.yml", "replicas: 2\n");
    workspace.write_values("values/README.md", "not a values file\n");
    workspace.set_render("a.yaml", RENDERED);
    workspace.set_render("b.yml", SECRET);

    let update = run_chartsnap(&workspace, ["-u", "-f", "values"], "update");
    assert!(update.success(), "update failed: {}", update.stdout);
    assert_eq!(update.stdout.matches(" RUNS ").count(), 2);
    assert!(update.stdout.contains("2 snapshot(s) updated"));

    let dir = workspace.root.join("values/__snapshot__");
    assert_eq!(workspace.read(&dir.join("a.yaml.snap")), EXPECTED_SNAPSHOT);
    assert!(workspace.read(&dir.join("b.yml.snap")).contains("kind: Secret"));
    assert!(!dir.join("README.md.snap").exists());
}

#[test]
fn e2e_one_failing_case_does_not_stop_others() {
    let _log = common::test_log("e2e_one_failing_case_does_not_stop_others");
    let workspace = SnapWorkspace::new();
    workspace.write_values("values/good.yaml", "replicas: 1\n");
    workspace.write_values("values/bad.yaml", "replicas: 2\n");
    workspace.set_render("good.yaml", RENDERED);
    workspace.fail_render("bad.yaml", "Error: template: app/templates/cm.yaml:3: boom\n");

    let update = run_chartsnap(
        &workspace,
        ["-u", "--no-fail-fast", "-f", "values"],
        "update",
    );
    assert_eq!(update.status.code(), Some(1));
    assert!(update.stdout.contains("'helm template' command failed"));
    assert!(update.stdout.contains("1 of 2 snapshot test(s) failed"));
    assert!(workspace.root.join("values/__snapshot__/good.yaml.snap").is_file());
    assert!(!workspace.root.join("values/__snapshot__/bad.yaml.snap").exists());
}

#[test]
fn e2e_first_failure_cancels_hanging_render() {
    let _log = common::test_log("e2e_first_failure_cancels_hanging_render");
    let workspace = SnapWorkspace::new();
    workspace.write_values("values/bad.yaml", "replicas: 1\n");
    workspace.write_values("values/hang.yaml", "replicas: 2\n");
    workspace.fail_render("bad.yaml", "Error: template: boom\n");
    workspace.hang_render("hang.yaml");

    let run = run_chartsnap(&workspace, ["-u", "-f", "values"], "fail_fast");
    assert_eq!(run.status.code(), Some(1));
    assert!(run.stdout.contains("'helm template' command failed"));
    assert!(run.stdout.contains("hang.yaml cancelled"));
    assert!(run.stdout.contains("2 of 2 snapshot test(s) failed"));
    assert!(
        run.duration < Duration::from_secs(30),
        "hanging render was not killed: {:?}",
        run.duration
    );
    assert!(!workspace.root.join("values/__snapshot__/hang.yaml.snap").exists());
}

#[test]
fn e2e_same_stem_values_files_keep_separate_snapshots() {
    let _log = common::test_log("e2e_same_stem_values_files_keep_separate_snapshots");
    let workspace = SnapWorkspace::new();
    workspace.write_values("values/a.yaml", "replicas: 1\n");
    workspace.write_values("values/a.yml", "replicas: 2\n");
    workspace.set_render("a.yaml", RENDERED);
    workspace.set_render("a.yml", SECRET);

    let update = run_chartsnap(&workspace, ["-u", "-f", "values"], "update");
    assert!(update.success(), "update failed: {}", update.stdout);
    let check = run_chartsnap(&workspace, ["-f", "values"], "check");
    assert!(check.success(), "check failed: {}", check.stdout);

    let dir = workspace.root.join("values/__snapshot__");
    assert_eq!(workspace.read(&dir.join("a.yaml.snap")), EXPECTED_SNAPSHOT);
    assert!(workspace.read(&dir.join("a.yml.snap")).contains("kind: Secret"));
}

#[test]
fn e2e_empty_values_directory_is_an_error() {
    let _log = common::test_log("e2e_empty_values_directory_is_an_error");
    let workspace = SnapWorkspace::new();
    std::fs::create_dir_all(workspace.root.join("empty")).unwrap();

    let run = run_chartsnap(&workspace, ["-f", "empty"], "empty_dir");
    assert_eq!(run.status.code(), Some(1));
    assert!(run.stderr.contains("no values files"));
    assert!(workspace.helm_calls().is_empty());
}

#[test]
fn e2e_extra_args_are_forwarded() {
    let _log = common::test_log("e2e_extra_args_are_forwarded");
    let workspace = SnapWorkspace::new();
    workspace.set_render("default", RENDERED);

    let run = run_chartsnap(
        &workspace,
        ["-u", "--namespace", "prod", "--", "--skip-tests"],
        "extra_args",
    );
    assert!(run.success(), "run failed: {}", run.stderr);

    let calls = workspace.helm_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("template testrelease "));
    assert!(calls[0].contains("--namespace prod"));
    assert!(calls[0].ends_with("--skip-tests"));
}

#[test]
fn e2e_json_report() {
    let _log = common::test_log("e2e_json_report");
    let workspace = SnapWorkspace::new();
    workspace.set_render("default", RENDERED);

    let run = run_chartsnap(&workspace, ["--json"], "json");
    assert_eq!(run.status.code(), Some(1));
    assert!(!run.stdout.contains(" RUNS "));

    let report: Value = serde_json::from_str(&extract_json_payload(&run.stdout)).unwrap();
    assert_eq!(report["passed"], false);
    assert_eq!(report["total"], 1);
    assert_eq!(report["cases"][0]["status"], "failed");
    assert_eq!(report["cases"][0]["error"]["code"], "SNAPSHOT_NOT_FOUND");
}
