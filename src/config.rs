//! Run configuration: the `core` block tunes the warden itself, the
//! `target` block describes the one script being supervised.
//!
//! Loaded from YAML (`warden.yaml` by default). Every field except
//! `target.script_name` has a default, so a two-line config is enough to
//! start. Optional sub-commands (`run_with`, `manifest`,
//! `bootstrap_command`) distinguish "absent, use the default" from an
//! explicit `null`, which disables the feature.

use std::fs;
use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::errors::ConfigError;

/// Hosts to probe, in document order. A `null` host means the default
/// gateway resolved from the OS routing table.
pub type NetworkTargets = IndexMap<String, Option<String>>;

/// Settings for the warden itself.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreSettings {
    /// Log level for the file layer (`error`..`trace`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Failed probe rounds tolerated before giving up; rounds = limit + 1.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Pause after each successful probe, in milliseconds.
    #[serde(default = "default_normal_pace_ms")]
    pub normal_pace_ms: u64,
    /// Pause after a failure before the next attempt, in milliseconds.
    #[serde(default = "default_error_pace_ms")]
    pub error_pace_ms: u64,
    /// Gateway host to probe before anything else. `null` asks the OS
    /// for the default route.
    #[serde(default)]
    pub gateway: Option<String>,
    /// Hosts the warden itself needs (package index, git host).
    #[serde(default = "default_core_network")]
    pub network: NetworkTargets,
    /// Fetch and compare remote versions at all.
    #[serde(default = "default_true")]
    pub remote_update: bool,
    /// Install dependency manifests before fetching.
    #[serde(default = "default_true")]
    pub check_packages: bool,
    /// Hand over to the target after the update pipeline finishes.
    #[serde(default = "default_true")]
    pub launch_target: bool,
    /// Separator between repo name and date in archive entry names.
    #[serde(default = "default_archive_separator")]
    pub archive_separator: String,
    /// Manifest for the warden's own environment, under the base dir.
    #[serde(default = "default_manifest_name")]
    pub required_manifest: String,
    /// Installer argv; the manifest path is appended as the last argument.
    #[serde(default = "default_install_command")]
    pub install_command: Vec<String>,
    /// One-shot argv run before any install. Absent means the stock
    /// interpreter bootstrap; `null` disables it.
    #[serde(default = "default_bootstrap_command")]
    pub bootstrap_command: Option<Vec<String>>,
}

/// Settings for the supervised target.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSettings {
    /// Script file inside the active directory. The only required field.
    pub script_name: String,
    /// Interpreter the script is handed to. Absent means `python3`;
    /// `null` executes the script directly.
    #[serde(default = "default_run_with")]
    pub run_with: Option<String>,
    /// Dependency manifest inside the active directory. Absent means
    /// `requirements.txt`; `null` means the target declares none.
    #[serde(default = "default_target_manifest")]
    pub manifest: Option<String>,
    /// Files the target cannot run without; created empty when missing.
    #[serde(default)]
    pub required_files: Vec<String>,
    /// Files preserved across swaps when present.
    #[serde(default)]
    pub optional_files: Vec<String>,
    /// Folders the target cannot run without; created when missing.
    #[serde(default)]
    pub required_folders: Vec<String>,
    /// Folders preserved across swaps when present.
    #[serde(default)]
    pub optional_folders: Vec<String>,
    /// `owner/name` shorthand for a GitHub repo, or a full clone URL.
    #[serde(default)]
    pub repository: Option<String>,
    /// Directory name of the live version, under the base dir.
    #[serde(default = "default_active_dir")]
    pub active_dir: String,
    /// Directory name collecting archived versions, under the base dir.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: String,
    /// Hosts the target needs before it is launched.
    #[serde(default)]
    pub network: NetworkTargets,
    /// Gate the swap on the changelog comparison.
    #[serde(default = "default_true")]
    pub check_version: bool,
    /// Exit code the target uses to request a relaunch.
    #[serde(default = "default_restart_code")]
    pub restart_code: i32,
}

/// Complete configuration for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub core: CoreSettings,
    pub target: TargetSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_retry_limit() -> u32 {
    3
}

fn default_normal_pace_ms() -> u64 {
    75
}

fn default_error_pace_ms() -> u64 {
    3_000
}

fn default_core_network() -> NetworkTargets {
    let mut map = NetworkTargets::new();
    map.insert("PyPi".to_string(), Some("www.pypi.org".to_string()));
    map
}

fn default_true() -> bool {
    true
}

fn default_archive_separator() -> String {
    ";".to_string()
}

fn default_manifest_name() -> String {
    "requirements.txt".to_string()
}

fn default_install_command() -> Vec<String> {
    ["python3", "-m", "pip", "install", "-r"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_bootstrap_command() -> Option<Vec<String>> {
    Some(
        ["python3", "-m", "ensurepip", "--upgrade"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    )
}

fn default_run_with() -> Option<String> {
    Some("python3".to_string())
}

fn default_target_manifest() -> Option<String> {
    Some("requirements.txt".to_string())
}

fn default_active_dir() -> String {
    "active".to_string()
}

fn default_archive_dir() -> String {
    "archive".to_string()
}

fn default_restart_code() -> i32 {
    94
}

impl Default for CoreSettings {
    fn default() -> Self {
        CoreSettings {
            log_level: default_log_level(),
            retry_limit: default_retry_limit(),
            normal_pace_ms: default_normal_pace_ms(),
            error_pace_ms: default_error_pace_ms(),
            gateway: None,
            network: default_core_network(),
            remote_update: true,
            check_packages: true,
            launch_target: true,
            archive_separator: default_archive_separator(),
            required_manifest: default_manifest_name(),
            install_command: default_install_command(),
            bootstrap_command: default_bootstrap_command(),
        }
    }
}

impl CoreSettings {
    /// Pause after a success.
    pub fn normal_pace(&self) -> Duration {
        Duration::from_millis(self.normal_pace_ms)
    }

    /// Pause after a failure.
    pub fn error_pace(&self) -> Duration {
        Duration::from_millis(self.error_pace_ms)
    }

    /// Long pause between gateway retry blocks.
    pub fn long_backoff(&self) -> Duration {
        Duration::from_millis(self.error_pace_ms.saturating_mul(20))
    }

    /// Probe rounds before giving up.
    pub fn rounds(&self) -> u32 {
        self.retry_limit.saturating_add(1)
    }
}

impl TargetSettings {
    /// Last path segment of the repository, without a `.git` suffix.
    /// `APasz/Strider` and `https://host/x/Strider.git` both give `Strider`.
    pub fn repo_short_name(&self) -> Option<&str> {
        let repo = self.repository.as_deref()?;
        let tail = repo.trim_end_matches('/').rsplit('/').next().unwrap_or(repo);
        let tail = tail.strip_suffix(".git").unwrap_or(tail);
        if tail.is_empty() {
            None
        } else {
            Some(tail)
        }
    }

    /// Clone URL for the repository. A value containing `://` is taken
    /// verbatim; anything else is treated as a GitHub `owner/name` pair.
    pub fn clone_url(&self) -> Option<String> {
        let repo = self.repository.as_deref()?;
        if repo.contains("://") {
            Some(repo.to_string())
        } else {
            Some(format!("https://github.com/{}.git", repo))
        }
    }

    #[cfg(test)]
    pub fn example() -> Self {
        serde_yaml::from_str("script_name: bot.py").expect("example target settings")
    }
}

/// Load and validate a config file.
pub fn load(path: &Path) -> Result<RunConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: RunConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    cfg.validate()?;
    Ok(cfg)
}

impl RunConfig {
    /// Reject configs that could not possibly complete a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn plain_name(label: &str, value: &str) -> Result<(), ConfigError> {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("{label} must not be empty")));
            }
            if value.contains('/') || value.contains('\\') {
                return Err(ConfigError::Invalid(format!(
                    "{label} must be a plain name, not a path: {value}"
                )));
            }
            Ok(())
        }

        plain_name("target.script_name", &self.target.script_name)?;
        plain_name("target.active_dir", &self.target.active_dir)?;
        plain_name("target.archive_dir", &self.target.archive_dir)?;
        if self.target.active_dir == self.target.archive_dir {
            return Err(ConfigError::Invalid(
                "target.active_dir and target.archive_dir must differ".to_string(),
            ));
        }
        if self.target.active_dir == crate::paths::STAGING_DIR_NAME
            || self.target.archive_dir == crate::paths::STAGING_DIR_NAME
        {
            return Err(ConfigError::Invalid(format!(
                "directory name {} is reserved for fetch staging",
                crate::paths::STAGING_DIR_NAME
            )));
        }
        if self.core.remote_update {
            match self.target.repository.as_deref() {
                None => {
                    return Err(ConfigError::Invalid(
                        "core.remote_update is enabled but target.repository is not set"
                            .to_string(),
                    ));
                }
                Some(repo) if !repo.contains("://") && !repo.contains('/') => {
                    return Err(ConfigError::Invalid(format!(
                        "target.repository must be owner/name or a full clone URL: {repo}"
                    )));
                }
                Some(_) => {}
            }
        }
        if self.core.archive_separator.is_empty() {
            return Err(ConfigError::Invalid(
                "core.archive_separator must not be empty".to_string(),
            ));
        }
        if self.core.check_packages && self.core.install_command.is_empty() {
            return Err(ConfigError::Invalid(
                "core.install_command must name a program when core.check_packages is enabled"
                    .to_string(),
            ));
        }
        if let Some(cmd) = &self.core.bootstrap_command {
            if cmd.is_empty() {
                return Err(ConfigError::Invalid(
                    "core.bootstrap_command must name a program or be null".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> RunConfig {
        serde_yaml::from_str(yaml).expect("config parses")
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg = parse("target:\n  script_name: bot.py\n");
        assert_eq!(cfg.core.retry_limit, 3);
        assert_eq!(cfg.core.normal_pace_ms, 75);
        assert_eq!(cfg.core.error_pace_ms, 3_000);
        assert_eq!(cfg.core.archive_separator, ";");
        assert_eq!(cfg.core.network.get("PyPi"), Some(&Some("www.pypi.org".to_string())));
        assert_eq!(cfg.target.run_with.as_deref(), Some("python3"));
        assert_eq!(cfg.target.manifest.as_deref(), Some("requirements.txt"));
        assert_eq!(cfg.target.active_dir, "active");
        assert_eq!(cfg.target.archive_dir, "archive");
        assert_eq!(cfg.target.restart_code, 94);
        assert!(cfg.target.check_version);
    }

    #[test]
    fn explicit_null_disables_optional_commands() {
        let cfg = parse(
            "core:\n  bootstrap_command: null\ntarget:\n  script_name: bot.py\n  run_with: null\n  manifest: null\n",
        );
        assert!(cfg.core.bootstrap_command.is_none());
        assert!(cfg.target.run_with.is_none());
        assert!(cfg.target.manifest.is_none());
    }

    #[test]
    fn rounds_is_retry_limit_plus_one() {
        let mut core = CoreSettings::default();
        core.retry_limit = 2;
        assert_eq!(core.rounds(), 3);
        assert_eq!(core.long_backoff(), Duration::from_millis(60_000));
    }

    #[test]
    fn network_targets_keep_document_order() {
        let cfg = parse(
            "target:\n  script_name: bot.py\n  network:\n    Discord: www.discord.com\n    Gateway: null\n    PyPi: www.pypi.org\n",
        );
        let names: Vec<&str> = cfg.target.network.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Discord", "Gateway", "PyPi"]);
        assert_eq!(cfg.target.network.get("Gateway"), Some(&None));
    }

    #[test]
    fn repo_short_name_handles_shorthand_and_url() {
        let mut target = TargetSettings::example();
        target.repository = Some("APasz/Strider".to_string());
        assert_eq!(target.repo_short_name(), Some("Strider"));
        assert_eq!(
            target.clone_url().as_deref(),
            Some("https://github.com/APasz/Strider.git")
        );

        target.repository = Some("https://gitlab.com/group/widget.git".to_string());
        assert_eq!(target.repo_short_name(), Some("widget"));
        assert_eq!(
            target.clone_url().as_deref(),
            Some("https://gitlab.com/group/widget.git")
        );
    }

    #[test]
    fn validate_requires_repository_for_remote_update() {
        let cfg = parse("target:\n  script_name: bot.py\n");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("repository"));

        let cfg = parse("core:\n  remote_update: false\ntarget:\n  script_name: bot.py\n");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bare_repository_name() {
        let cfg = parse("target:\n  script_name: bot.py\n  repository: strider\n");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("owner/name"));

        let cfg = parse("target:\n  script_name: bot.py\n  repository: APasz/Strider\n");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_path_like_names() {
        let cfg = parse("target:\n  script_name: sub/bot.py\n  repository: a/b\n");
        assert!(cfg.validate().is_err());

        let cfg = parse("target:\n  script_name: bot.py\n  repository: a/b\n  active_dir: gitDown\n");
        assert!(cfg.validate().is_err());
    }
}
