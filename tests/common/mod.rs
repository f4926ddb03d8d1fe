use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Path of the warden binary under test.
pub fn warden_bin() -> &'static str {
    env!("CARGO_BIN_EXE_warden")
}

/// Command for the binary with a pinned base dir and a scrubbed
/// environment, so ambient WARDEN_* settings cannot leak into tests.
pub fn warden_cmd(base: &Path) -> Command {
    let mut cmd = Command::new(warden_bin());
    cmd.arg("--base-dir")
        .arg(base)
        .current_dir(base)
        .env_remove("WARDEN_LOG")
        .env_remove("WARDEN_CONFIG")
        .env_remove("WARDEN_BASE_DIR")
        .env_remove("WARDEN_COLOR")
        .env_remove("NO_COLOR");
    cmd
}

/// Write `warden.yaml` under the base dir.
pub fn write_config(base: &Path, yaml: &str) {
    fs::write(base.join("warden.yaml"), yaml).expect("write warden.yaml");
}

/// Write an executable stub script into `dir`. The script text must be
/// complete, shebang included.
pub fn write_stub(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, script).expect("write stub");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path).expect("stub metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod stub");
    }
    path
}

/// A ping that always succeeds. Stubs get a sane PATH of their own; the
/// test controls only the PATH of the warden process.
pub fn write_ok_ping(dir: &Path) -> PathBuf {
    write_stub(
        dir,
        "ping",
        "#!/bin/sh\nexport PATH=/usr/bin:/bin:/usr/sbin:/sbin\nexit 0\n",
    )
}

#[allow(dead_code)]
pub fn entry_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[allow(dead_code)]
pub fn stderr_of(out: &std::process::Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}
