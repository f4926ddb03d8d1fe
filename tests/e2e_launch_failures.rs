mod common;

use common::{stderr_of, warden_cmd, write_config, write_ok_ping};
use std::fs;
use tempfile::tempdir;

#[test]
fn e2e_missing_interpreter_exits_127() {
    let base = tempdir().expect("tmpdir");
    let stubs = base.path().join("stubs");
    fs::create_dir(&stubs).unwrap();
    write_ok_ping(&stubs);
    let active = base.path().join("active");
    fs::create_dir_all(&active).unwrap();
    fs::write(active.join("strider.py"), "pass").unwrap();
    write_config(
        base.path(),
        "core:
  gateway: 127.0.0.1
  network: {}
  check_packages: false
  remote_update: false
  normal_pace_ms: 1
  error_pace_ms: 1
target:
  script_name: strider.py
  run_with: warden-test-no-such-interpreter
  manifest: null
",
    );

    let out = warden_cmd(base.path())
        .env("PATH", &stubs)
        .output()
        .expect("run warden");
    assert_eq!(out.status.code(), Some(127));
    let err = stderr_of(&out);
    assert!(err.contains("could not launch"), "unexpected stderr:\n{err}");
}

#[test]
fn e2e_missing_target_script_aborts_with_1() {
    let base = tempdir().expect("tmpdir");
    let stubs = base.path().join("stubs");
    fs::create_dir(&stubs).unwrap();
    write_ok_ping(&stubs);
    write_config(
        base.path(),
        "core:
  gateway: 127.0.0.1
  network: {}
  check_packages: false
  remote_update: false
target:
  script_name: strider.py
  run_with: null
  manifest: null
",
    );

    let out = warden_cmd(base.path())
        .env("PATH", &stubs)
        .output()
        .expect("run warden");
    assert_eq!(out.status.code(), Some(1));
    let err = stderr_of(&out);
    assert!(
        err.contains("target script missing"),
        "unexpected stderr:\n{err}"
    );
}
