mod common;

use common::{entry_names, warden_cmd, write_config, write_ok_ping, write_stub};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const CONFIG: &str = "core:
  gateway: 127.0.0.1
  network: {}
  check_packages: false
  launch_target: false
  normal_pace_ms: 1
  error_pace_ms: 1
target:
  script_name: strider.py
  repository: apasz/strider
  manifest: null
  run_with: null
";

fn setup(base: &Path, git_stub: &str) -> PathBuf {
    let stubs = base.join("stubs");
    fs::create_dir(&stubs).unwrap();
    write_ok_ping(&stubs);
    write_stub(&stubs, "git", git_stub);

    let active = base.join("active");
    fs::create_dir_all(&active).unwrap();
    fs::write(active.join("strider.py"), "current").unwrap();
    fs::write(active.join("changelog.json"), r#"{"1.0.0": ["first"]}"#).unwrap();
    write_config(base, CONFIG);
    stubs
}

fn assert_active_untouched(base: &Path) {
    let active = base.join("active");
    assert_eq!(fs::read_to_string(active.join("strider.py")).unwrap(), "current");
    let changelog = fs::read_to_string(active.join("changelog.json")).unwrap();
    assert!(changelog.contains("1.0.0") && !changelog.contains("0.5.0"));
    assert!(entry_names(&base.join("archive")).is_empty());
    assert!(!base.join("gitDown").exists(), "staged fetch not discarded");
}

#[test]
fn e2e_older_fetch_is_discarded() {
    let base = tempdir().expect("tmpdir");
    let stubs = setup(
        base.path(),
        r#"#!/bin/sh
export PATH=/usr/bin:/bin:/usr/sbin:/sbin
for a in "$@"; do dest="$a"; done
mkdir -p "$dest"
printf '{"0.5.0": ["old"]}' > "$dest/changelog.json"
printf 'stale' > "$dest/strider.py"
exit 0
"#,
    );

    let out = warden_cmd(base.path())
        .env("PATH", &stubs)
        .output()
        .expect("run warden");
    assert_eq!(
        out.status.code(),
        Some(0),
        "stderr:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert_active_untouched(base.path());
}

#[test]
fn e2e_fetch_without_changelog_is_discarded() {
    let base = tempdir().expect("tmpdir");
    let stubs = setup(
        base.path(),
        r#"#!/bin/sh
export PATH=/usr/bin:/bin:/usr/sbin:/sbin
for a in "$@"; do dest="$a"; done
mkdir -p "$dest"
printf 'who knows' > "$dest/strider.py"
exit 0
"#,
    );

    let out = warden_cmd(base.path())
        .env("PATH", &stubs)
        .output()
        .expect("run warden");
    assert_eq!(
        out.status.code(),
        Some(0),
        "stderr:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert_active_untouched(base.path());
}

#[test]
fn e2e_disabled_gate_swaps_an_older_fetch() {
    let base = tempdir().expect("tmpdir");
    let stubs = setup(
        base.path(),
        r#"#!/bin/sh
export PATH=/usr/bin:/bin:/usr/sbin:/sbin
for a in "$@"; do dest="$a"; done
mkdir -p "$dest"
printf '{"0.5.0": ["old"]}' > "$dest/changelog.json"
printf 'stale' > "$dest/strider.py"
exit 0
"#,
    );
    let config = format!("{CONFIG}  check_version: false\n");
    write_config(base.path(), &config);

    let out = warden_cmd(base.path())
        .env("PATH", &stubs)
        .output()
        .expect("run warden");
    assert_eq!(
        out.status.code(),
        Some(0),
        "stderr:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
    let changelog =
        fs::read_to_string(base.path().join("active").join("changelog.json")).unwrap();
    assert!(changelog.contains("0.5.0"), "gate off should swap anyway");
    assert_eq!(entry_names(&base.path().join("archive")).len(), 1);
}
