//! Error mapping guide:
//! - Map io::ErrorKind::NotFound to exit code 127; all others to 1.
//! - Every pipeline component owns a dedicated error kind so the abort log
//!   names the failing stage without string matching.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::deps::DepEnv;
use crate::staging::ItemKind;

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

/// A filesystem staging operation failed. Carries the item kind and the
/// path(s) involved so the operator can act without re-running at debug level.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("could not create {kind} {path:?}: {source}")]
    Creation {
        kind: ItemKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not remove {kind} {path:?}: {source}")]
    Removal {
        kind: ItemKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not transfer {kind} {from:?} -> {to:?}: {source}")]
    Transfer {
        kind: ItemKind,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reachability probing gave up or could not start.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("default gateway could not be determined: {0}")]
    GatewayUnavailable(String),
    #[error("network unreachable: {failed} of {total} targets still failing after {rounds} rounds")]
    NetworkUnreachable {
        failed: usize,
        total: usize,
        rounds: u32,
    },
}

/// Dependency installation failed for one environment.
#[derive(Debug, Error)]
#[error("dependency install failed for {env} environment: {detail}")]
pub struct DepsError {
    pub env: DepEnv,
    pub detail: String,
}

/// The repository fetch failed. One kind covers missing git, clone
/// failures and staging cleanup problems alike.
#[derive(Debug, Error)]
#[error("fetch of {repo} failed: {detail}")]
pub struct FetchError {
    pub repo: String,
    pub detail: String,
}

/// Version metadata could not be read. Never aborts a run on its own:
/// the comparison degrades to an inconclusive verdict instead.
#[derive(Debug, Error)]
pub enum ChangelogError {
    #[error("changelog missing at {0:?}")]
    Missing(PathBuf),
    #[error("changelog at {path:?} is unusable: {detail}")]
    Malformed { path: PathBuf, detail: String },
}

/// Spawning or waiting on the target process failed.
#[derive(Debug, Error)]
#[error("could not launch {script:?}: {source}")]
pub struct LaunchError {
    pub script: PathBuf,
    #[source]
    pub source: io::Error,
}

impl LaunchError {
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Configuration could not be loaded or fails validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Umbrella error for a supervised run. ChangelogError is deliberately
/// absent: version trouble downgrades the comparison, it never aborts.
#[derive(Debug, Error)]
pub enum WardenError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Deps(#[from] DepsError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error("target script missing: {0:?}")]
    TargetScriptMissing(PathBuf),
}

/// Convert a run error to the warden's own exit code. 127 is reserved for
/// a missing program; a missing file during staging is an ordinary failure.
pub fn exit_code_for(e: &WardenError) -> u8 {
    match e {
        WardenError::Launch(launch) => exit_code_for_io_error(&launch.source),
        _ => 1,
    }
}
