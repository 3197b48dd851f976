use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

const MANIFEST: &str = r#"
flag_sets:
  deploy:
    - name: region
      type: string
      shortcut: r
      default: eu-west
      usage: Target region
commands:
  - name: deploy
    usage: deploy [flags] <service>
    flag_sets: [deploy]
    args:
      - name: service
        required: true
  - name: rollback
    parents: [deploy]
"#;

fn write_manifest(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("tool.yaml");
    fs::write(&path, contents).expect("failed to write manifest");
    path
}

fn cmdtree(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_cmdtree"))
        .args(args)
        .output()
        .expect("failed to run cmdtree")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_lists_every_path() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), MANIFEST);

    let out = cmdtree(&["check", manifest.to_str().unwrap()]);
    assert!(out.status.success());

    let rows = stdout_json(&out);
    let paths: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["deploy", "deploy.rollback"]);
}

#[test]
fn check_reports_registration_phase() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        dir.path(),
        r#"
flag_sets:
  dup:
    - name: same
      type: bool
    - name: same
      type: bool
commands:
  - name: run
    flag_sets: [dup]
"#,
    );

    let out = cmdtree(&["check", manifest.to_str().unwrap()]);
    assert!(!out.status.success());
    let report = stdout_json(&out);
    assert_eq!(report["phase"], "registration");
    assert_eq!(report["errors"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

#[test]
fn resolve_reports_bound_values() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), MANIFEST);

    let out = cmdtree(&[
        "resolve",
        manifest.to_str().unwrap(),
        "--",
        "-q",
        "deploy",
        "api",
        "-r",
        "us-east",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let report = stdout_json(&out);
    assert_eq!(report["path"], "deploy");
    assert_eq!(report["args"]["service"], "api");
    assert_eq!(report["flags"]["region"], "us-east");
    assert_eq!(report["options"]["quiet"], true);
}

#[test]
fn resolve_reports_unknown_flags() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), MANIFEST);

    let out = cmdtree(&[
        "resolve",
        manifest.to_str().unwrap(),
        "--",
        "deploy",
        "api",
        "--regoin=us",
    ]);
    assert!(!out.status.success());
    let report = stdout_json(&out);
    assert_eq!(report["phase"], "unknown-flags");
    assert_eq!(report["errors"][0], "unknown flag: --regoin=us");
}

#[test]
fn resolve_honors_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), MANIFEST);
    let config = dir.path().join("cmdtree.yml");
    fs::write(&config, "validate_raw_flags: false\n").unwrap();

    let out = cmdtree(&[
        "resolve",
        manifest.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--",
        "deploy",
        "api",
        "--regoin=us",
    ]);
    assert!(out.status.success());
    assert_eq!(stdout_json(&out)["path"], "deploy");
}

// ---------------------------------------------------------------------------
// examples
// ---------------------------------------------------------------------------

#[test]
fn examples_use_exe_name() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), MANIFEST);

    let out = cmdtree(&["examples", manifest.to_str().unwrap(), "--exe", "tool"]);
    assert!(out.status.success());

    let examples = stdout_json(&out);
    let cmds: Vec<&str> = examples
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["cmd"].as_str().unwrap())
        .collect();
    assert!(cmds.contains(&"tool help deploy rollback"));
    assert!(cmds.contains(&"tool deploy [flags] <service> --region=eu-west <service>"));
}

#[test]
fn yaml_format_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), MANIFEST);

    let out = cmdtree(&["--format", "yaml", "check", manifest.to_str().unwrap()]);
    assert!(out.status.success());
    let rows: serde_yaml::Value = serde_yaml::from_slice(&out.stdout).unwrap();
    assert_eq!(rows.as_sequence().unwrap().len(), 2);
}
