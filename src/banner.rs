use crate::config::RunConfig;
use crate::paths::StagingPaths;

/// Console-only startup summary. The same facts go to the log file as a
/// structured event; this is for the person watching the terminal.
pub fn print_startup_banner(cfg: &RunConfig, paths: &StagingPaths) {
    let version = env!("CARGO_PKG_VERSION");
    let built = option_env!("WARDEN_BUILD_DATE").unwrap_or("unknown");
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    eprintln!();
    eprintln!("────────────────────────────────────────────────────────────────────");
    eprintln!(" 🛡  warden v{version}  -  supervised update-and-launch controller");
    eprintln!("────────────────────────────────────────────────────────────────────");
    eprintln!("    - Version: {version} (built {built})");
    eprintln!("    - Platform: {os}/{arch}, pid {}", std::process::id());
    eprintln!("    - Base dir: {}", paths.base.display());
    eprintln!(
        "    - Active: {} | Archive: {}",
        paths.active.display(),
        paths.archive.display()
    );
    eprintln!(
        "    - Target: {} (run with {})",
        cfg.target.script_name,
        cfg.target.run_with.as_deref().unwrap_or("direct exec")
    );
    eprintln!(
        "    - Repository: {}",
        cfg.target.repository.as_deref().unwrap_or("(none)")
    );
    eprintln!(
        "    - Updates: {} | Installs: {} | Launch: {}",
        on_off(cfg.core.remote_update),
        on_off(cfg.core.check_packages),
        on_off(cfg.core.launch_target)
    );
    eprintln!("────────────────────────────────────────────────────────────────────");
    eprintln!();
}

fn on_off(v: bool) -> &'static str {
    if v {
        "on"
    } else {
        "off"
    }
}
