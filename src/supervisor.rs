//! Process supervisor: launches the target script from the active
//! directory, waits for it, and relaunches it whenever it exits with the
//! configured restart code. Any other exit code becomes the warden's
//! own exit code.

use std::path::Path;
use std::process::Command;
use std::thread;

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::errors::LaunchError;
use crate::paths::StagingPaths;

/// True when the exit code is the target's restart request.
pub fn should_restart(code: i32, restart_code: i32) -> bool {
    code == restart_code
}

/// Book-keeping for one supervised target across relaunches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisionState {
    /// OS pid of the most recent launch.
    pub pid: u32,
    /// Exit code of the most recent completed run, if any.
    pub last_exit_code: Option<i32>,
    /// Whether the most recent exit asked for a relaunch.
    pub restart_eligible: bool,
    /// Launches so far, the first included.
    pub launches: u32,
}

impl SupervisionState {
    fn launched(pid: u32, launches: u32) -> Self {
        SupervisionState {
            pid,
            last_exit_code: None,
            restart_eligible: false,
            launches,
        }
    }

    fn record_exit(&mut self, code: i32, restart_code: i32) {
        self.last_exit_code = Some(code);
        self.restart_eligible = should_restart(code, restart_code);
    }
}

/// Run the target until it exits with something other than the restart
/// code. Returns that exit code. The child inherits the console; the
/// warden does nothing but wait while the target runs.
pub fn supervise(cfg: &RunConfig, paths: &StagingPaths) -> Result<i32, LaunchError> {
    let script = paths.target_script(&cfg.target.script_name);
    let mut launches: u32 = 0;
    loop {
        launches += 1;
        let mut child = build_command(cfg, paths, &script)
            .spawn()
            .map_err(|source| LaunchError {
                script: script.clone(),
                source,
            })?;
        let mut state = SupervisionState::launched(child.id(), launches);
        info!(
            pid = state.pid,
            launches = state.launches,
            script = %script.display(),
            "target launched"
        );

        let status = child.wait().map_err(|source| LaunchError {
            script: script.clone(),
            source,
        })?;
        let code = match status.code() {
            Some(code) => code,
            None => {
                // Killed by a signal; treat as a plain failure.
                warn!(status = %status, "target terminated without an exit code");
                1
            }
        };
        state.record_exit(code, cfg.target.restart_code);

        if state.restart_eligible {
            info!(
                code,
                pause_ms = cfg.core.error_pace_ms,
                "target requested a restart"
            );
            thread::sleep(cfg.core.error_pace());
            continue;
        }
        info!(code, launches = state.launches, "target exited; passing its code through");
        return Ok(code);
    }
}

fn build_command(cfg: &RunConfig, paths: &StagingPaths, script: &Path) -> Command {
    let mut cmd = match &cfg.target.run_with {
        Some(interpreter) => {
            let mut cmd = Command::new(interpreter);
            cmd.arg(script);
            cmd
        }
        None => Command::new(script),
    };
    cmd.current_dir(&paths.active);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::StagingPaths;
    use std::fs;
    use tempfile::tempdir;

    fn config(yaml: &str) -> RunConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn restart_code_matches_exactly() {
        assert!(should_restart(94, 94));
        assert!(!should_restart(0, 94));
        assert!(!should_restart(-94, 94));
    }

    #[test]
    fn state_tracks_exit_events() {
        let mut state = SupervisionState::launched(4321, 1);
        assert_eq!(state.last_exit_code, None);
        assert!(!state.restart_eligible);

        state.record_exit(94, 94);
        assert_eq!(state.last_exit_code, Some(94));
        assert!(state.restart_eligible);

        state.record_exit(7, 94);
        assert_eq!(state.last_exit_code, Some(7));
        assert!(!state.restart_eligible);
    }

    #[test]
    fn exits_pass_through() {
        let dir = tempdir().unwrap();
        let cfg = config(
            "core:\n  error_pace_ms: 0\ntarget:\n  script_name: run.sh\n  run_with: sh\n",
        );
        let paths = StagingPaths::derive(dir.path(), &cfg.target);
        fs::create_dir_all(&paths.active).unwrap();
        fs::write(paths.active.join("run.sh"), "exit 7\n").unwrap();

        let code = supervise(&cfg, &paths).unwrap();
        assert_eq!(code, 7);
    }

    #[test]
    fn restart_code_relaunches_until_a_real_exit() {
        let dir = tempdir().unwrap();
        let cfg = config(
            "core:\n  error_pace_ms: 0\ntarget:\n  script_name: run.sh\n  run_with: sh\n  restart_code: 94\n",
        );
        let paths = StagingPaths::derive(dir.path(), &cfg.target);
        fs::create_dir_all(&paths.active).unwrap();
        // First run asks for a restart, second exits clean.
        fs::write(
            paths.active.join("run.sh"),
            "if [ -f marker ]; then exit 0; else touch marker; exit 94; fi\n",
        )
        .unwrap();

        let code = supervise(&cfg, &paths).unwrap();
        assert_eq!(code, 0);
        assert!(paths.active.join("marker").exists());
    }

    #[test]
    fn missing_interpreter_is_a_launch_error() {
        let dir = tempdir().unwrap();
        let cfg = config(
            "target:\n  script_name: run.sh\n  run_with: warden-missing-interpreter\n",
        );
        let paths = StagingPaths::derive(dir.path(), &cfg.target);
        fs::create_dir_all(&paths.active).unwrap();
        fs::write(paths.active.join("run.sh"), "exit 0\n").unwrap();

        let err = supervise(&cfg, &paths).unwrap_err();
        assert!(err.is_not_found());
    }
}
