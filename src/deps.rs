//! Dependency installation for the warden's own environment and for the
//! supervised target, in that order. The installer command comes from
//! config and is judged solely by its exit status.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::errors::DepsError;
use crate::paths::StagingPaths;
use crate::util::display_command;
use crate::util::exec::{ExecRequest, ExecService};

/// Installs can legitimately take a while on slow links.
const INSTALL_TIMEOUT: Duration = Duration::from_secs(900);

/// Which environment an install ran for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepEnv {
    Core,
    Target,
}

impl DepEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepEnv::Core => "core",
            DepEnv::Target => "target",
        }
    }
}

impl fmt::Display for DepEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run the bootstrap command, then install the core manifest, then the
/// target manifest. The target install only runs once the core one
/// succeeded; a target without a manifest is a success.
pub fn install_all(cfg: &RunConfig, paths: &StagingPaths) -> Result<(), DepsError> {
    let exec = ExecService::new(INSTALL_TIMEOUT);

    // Opportunistic: a distro-managed interpreter may refuse the
    // bootstrap while the real install still works.
    if let Some(bootstrap) = &cfg.core.bootstrap_command {
        if let Err(err) = run_install(&exec, bootstrap, None, DepEnv::Core) {
            warn!(error = %err, "bootstrap command failed; continuing");
        }
    } else {
        info!("bootstrap command disabled");
    }

    let core_manifest = paths.base.join(&cfg.core.required_manifest);
    run_install(
        &exec,
        &cfg.core.install_command,
        Some(&core_manifest),
        DepEnv::Core,
    )?;

    match &cfg.target.manifest {
        Some(manifest) => {
            let target_manifest = paths.active.join(manifest);
            run_install(
                &exec,
                &cfg.core.install_command,
                Some(&target_manifest),
                DepEnv::Target,
            )
        }
        None => {
            info!("target declares no manifest; nothing to install");
            Ok(())
        }
    }
}

fn run_install(
    exec: &ExecService,
    argv: &[String],
    manifest: Option<&Path>,
    env: DepEnv,
) -> Result<(), DepsError> {
    let program = argv.first().ok_or_else(|| DepsError {
        env,
        detail: "empty installer command".to_string(),
    })?;

    let mut request = ExecRequest::new(program)
        .args(&argv[1..])
        .capture_output(true);
    if let Some(manifest) = manifest {
        request = request.arg(manifest);
    }

    let manifest_label = manifest
        .map(|m| m.display().to_string())
        .unwrap_or_else(|| "none".to_string());
    info!(
        env = %env,
        command = %display_command(argv),
        manifest = %manifest_label,
        "running installer"
    );
    match exec.run(request) {
        Ok(out) if out.status.success() => {
            info!(env = %env, secs = out.duration.as_secs(), "install finished");
            Ok(())
        }
        Ok(out) => Err(DepsError {
            env,
            detail: format!(
                "installer exited with {:?}: {}",
                out.status.code(),
                out.stderr_tail().unwrap_or("no output")
            ),
        }),
        Err(err) => Err(DepsError {
            env,
            detail: err.to_string(),
        }),
    }
}
