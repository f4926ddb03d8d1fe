//! Repository fetcher: shallow-clones the default branch of the target's
//! repository into the transient staging directory.
//!
//! The staging directory is cleared before every fetch and removed again
//! when a clone fails, so a partial download can never be mistaken for a
//! complete version by a later stage.

use std::fs;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::TargetSettings;
use crate::errors::FetchError;
use crate::paths::StagingPaths;
use crate::staging::{self, ItemKind};
use crate::util::exec::{ExecRequest, ExecService};

const FETCH_TIMEOUT: Duration = Duration::from_secs(600);

/// Fetch the newest version into `paths.staging`.
pub fn fetch(target: &TargetSettings, paths: &StagingPaths) -> Result<(), FetchError> {
    let repo = target
        .repository
        .clone()
        .unwrap_or_else(|| "<unset>".to_string());
    let fail = |detail: String| FetchError {
        repo: repo.clone(),
        detail,
    };

    let url = target
        .clone_url()
        .ok_or_else(|| fail("no repository configured".to_string()))?;
    if which::which("git").is_err() {
        return Err(fail("git not found in PATH".to_string()));
    }

    staging::remove(&paths.staging, ItemKind::Folder)
        .map_err(|err| fail(format!("could not clear staging directory: {err}")))?;
    staging::create(&paths.staging, ItemKind::Folder, false)
        .map_err(|err| fail(format!("could not create staging directory: {err}")))?;

    info!(url = %url, dest = %paths.staging.display(), "cloning default branch");
    let exec = ExecService::new(FETCH_TIMEOUT);
    let request = ExecRequest::new("git")
        .args(["clone", "--depth", "1"])
        .arg(&url)
        .arg(&paths.staging)
        .capture_output(true);
    let out = match exec.run(request) {
        Ok(out) => out,
        Err(err) => {
            cleanup_partial(paths);
            return Err(fail(err.to_string()));
        }
    };
    if !out.status.success() {
        cleanup_partial(paths);
        return Err(fail(format!(
            "git clone exited with {:?}: {}",
            out.status.code(),
            out.stderr_tail().unwrap_or("no output")
        )));
    }

    info!(secs = out.duration.as_secs(), "fetch complete");
    Ok(())
}

fn cleanup_partial(paths: &StagingPaths) {
    if let Err(err) = fs::remove_dir_all(&paths.staging) {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!(
                path = %paths.staging.display(),
                error = %err,
                "could not clean up partial fetch"
            );
        }
    }
}
