//! Staging area layout and base directory resolution.
//!
//! Everything the warden touches lives under one base directory:
//! the active copy of the target, the archive of prior versions and the
//! transient `gitDown` staging directory used during fetches.

use std::env;
use std::path::{Path, PathBuf};

use crate::config::TargetSettings;

/// Name of the transient directory a fetch clones into.
pub const STAGING_DIR_NAME: &str = "gitDown";

/// Default config file name looked up under the base directory.
pub const CONFIG_FILE_NAME: &str = "warden.yaml";

/// Log file written next to the console stream.
pub const LOG_FILE_NAME: &str = "warden.log";

/// Resolved directory layout for one supervised target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPaths {
    /// Root under which all other paths live.
    pub base: PathBuf,
    /// Directory holding the currently-live version of the target.
    pub active: PathBuf,
    /// Directory collecting renamed prior versions.
    pub archive: PathBuf,
    /// Transient clone destination, cleared before every fetch.
    pub staging: PathBuf,
}

impl StagingPaths {
    /// Derive the full layout from a base directory and the target's
    /// configured directory names.
    pub fn derive(base: &Path, target: &TargetSettings) -> Self {
        StagingPaths {
            base: base.to_path_buf(),
            active: base.join(&target.active_dir),
            archive: base.join(&target.archive_dir),
            staging: base.join(STAGING_DIR_NAME),
        }
    }

    /// Absolute path of the target script inside the active directory.
    pub fn target_script(&self, script_name: &str) -> PathBuf {
        self.active.join(script_name)
    }
}

/// Resolve the base directory. Precedence: CLI flag, `WARDEN_BASE_DIR`,
/// the directory holding the warden executable, then the current directory.
pub fn resolve_base_dir(cli_override: Option<&Path>) -> PathBuf {
    if let Some(p) = cli_override {
        return p.to_path_buf();
    }
    if let Ok(v) = env::var("WARDEN_BASE_DIR") {
        if !v.is_empty() {
            return PathBuf::from(v);
        }
    }
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            return dir.to_path_buf();
        }
    }
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolve the config file path. Precedence: CLI flag, `WARDEN_CONFIG`,
/// `warden.yaml` under the base directory.
pub fn resolve_config_path(cli_override: Option<&Path>, base: &Path) -> PathBuf {
    if let Some(p) = cli_override {
        return p.to_path_buf();
    }
    if let Ok(v) = env::var("WARDEN_CONFIG") {
        if !v.is_empty() {
            return PathBuf::from(v);
        }
    }
    base.join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetSettings;

    #[test]
    fn derive_places_all_dirs_under_base() {
        let target = TargetSettings::example();
        let paths = StagingPaths::derive(Path::new("/srv/warden"), &target);
        assert_eq!(paths.active, Path::new("/srv/warden/active"));
        assert_eq!(paths.archive, Path::new("/srv/warden/archive"));
        assert_eq!(paths.staging, Path::new("/srv/warden/gitDown"));
    }

    #[test]
    fn cli_override_wins_for_base_dir() {
        let p = resolve_base_dir(Some(Path::new("/opt/override")));
        assert_eq!(p, PathBuf::from("/opt/override"));
    }

    #[test]
    fn cli_override_wins_for_config_path() {
        let p = resolve_config_path(Some(Path::new("/etc/warden/custom.yaml")), Path::new("/srv"));
        assert_eq!(p, PathBuf::from("/etc/warden/custom.yaml"));
    }
}
