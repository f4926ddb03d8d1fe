mod common;

use common::{stderr_of, warden_cmd, write_config, write_ok_ping, write_stub};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_no_fetch_never_invokes_git() {
    let base = tempdir().expect("tmpdir");
    let stubs = base.path().join("stubs");
    fs::create_dir(&stubs).unwrap();
    write_ok_ping(&stubs);
    write_stub(
        &stubs,
        "git",
        "#!/bin/sh\nexport PATH=/usr/bin:/bin:/usr/sbin:/sbin\n: > \"$GIT_MARKER\"\nexit 0\n",
    );
    let marker = base.path().join("git-was-called");
    let active = base.path().join("active");
    fs::create_dir_all(&active).unwrap();
    fs::write(active.join("strider.py"), "pass").unwrap();
    write_config(
        base.path(),
        "core:
  gateway: 127.0.0.1
  network: {}
  check_packages: false
  normal_pace_ms: 1
  error_pace_ms: 1
target:
  script_name: strider.py
  repository: apasz/strider
  run_with: null
  manifest: null
",
    );

    let out = warden_cmd(base.path())
        .arg("--no-fetch")
        .arg("--no-launch")
        .env("PATH", &stubs)
        .env("GIT_MARKER", &marker)
        .output()
        .expect("run warden");
    assert_eq!(
        out.status.code(),
        Some(0),
        "stderr:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(!marker.exists(), "--no-fetch must keep git out of it");
}

#[test]
fn test_no_launch_never_runs_the_target() {
    let base = tempdir().expect("tmpdir");
    let stubs = base.path().join("stubs");
    fs::create_dir(&stubs).unwrap();
    write_ok_ping(&stubs);
    let active = base.path().join("active");
    fs::create_dir_all(&active).unwrap();
    write_stub(
        &active,
        "strider.sh",
        "#!/bin/sh\nexport PATH=/usr/bin:/bin:/usr/sbin:/sbin\n: > launched.marker\nexit 0\n",
    );
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
  script_name: strider.sh
  run_with: null
  manifest: null
",
    );

    let out = warden_cmd(base.path())
        .arg("--no-launch")
        .env("PATH", &stubs)
        .output()
        .expect("run warden");
    assert_eq!(out.status.code(), Some(0));
    assert!(
        !active.join("launched.marker").exists(),
        "--no-launch must keep the target down"
    );
}

#[test]
fn test_quiet_suppresses_the_banner() {
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
  run_with: null
  manifest: null
",
    );

    let loud = warden_cmd(base.path())
        .arg("--no-launch")
        .env("PATH", &stubs)
        .output()
        .expect("run warden");
    assert!(stderr_of(&loud).contains("warden v"), "banner expected");

    let quiet = warden_cmd(base.path())
        .arg("--no-launch")
        .arg("--quiet")
        .env("PATH", &stubs)
        .output()
        .expect("run warden");
    assert_eq!(quiet.status.code(), Some(0));
    assert!(
        !stderr_of(&quiet).contains("🛡"),
        "banner should be suppressed:\n{}",
        stderr_of(&quiet)
    );
}
