use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use warden::banner::print_startup_banner;
use warden::cli::{Cli, Cmd};
use warden::doctor::run_doctor;
use warden::errors::exit_code_for;
use warden::orchestrator::Orchestrator;
use warden::{config, logging, paths, probe, supervisor};

fn main() -> ExitCode {
    // Best-effort: a .env next to the working directory may carry WARDEN_* vars.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let base = paths::resolve_base_dir(cli.base_dir.as_deref());

    // Doctor runs diagnostics on stderr and never touches the log file.
    if let Some(Cmd::Doctor) = &cli.command {
        run_doctor(cli.config.as_deref(), cli.base_dir.as_deref(), cli.verbose);
        return ExitCode::from(0);
    }

    let config_path = paths::resolve_config_path(cli.config.as_deref(), &base);
    let mut cfg = match config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("warden: {e}");
            return ExitCode::from(1);
        }
    };
    if cli.no_launch {
        cfg.core.launch_target = false;
    }
    if cli.no_fetch {
        cfg.core.remote_update = false;
    }

    let stages = paths::StagingPaths::derive(&base, &cfg.target);
    let _log_guard = match logging::init(
        cli.console_directive(),
        &cfg.core.log_level,
        &base,
        cli.color_mode(),
    ) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("warden: {e:#}");
            return ExitCode::from(1);
        }
    };

    if !cli.quiet {
        print_startup_banner(&cfg, &stages);
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        base = %base.display(),
        config = %config_path.display(),
        "warden starting"
    );

    let report = match Orchestrator::new(&cfg, &stages).run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("warden: {e}");
            return ExitCode::from(exit_code_for(&e));
        }
    };
    info!(
        fetched = report.fetched,
        swapped = report.swapped,
        "update pipeline finished"
    );

    if !cfg.core.launch_target {
        info!("launching is disabled; exiting after the update pipeline");
        return ExitCode::from(0);
    }

    // The target gets its own reachability check right before launch.
    if let Err(e) = probe::probe(&cfg.target.network, false, &cfg.core) {
        error!(error = %e, "target network is unreachable; refusing to launch");
        eprintln!("warden: {e}");
        return ExitCode::from(1);
    }

    match supervisor::supervise(&cfg, &stages) {
        Ok(code) => {
            info!(code, "target finished; passing its exit code through");
            ExitCode::from(code as u8)
        }
        Err(e) => {
            error!(error = %e, "could not launch the target");
            eprintln!("warden: {e}");
            if e.is_not_found() {
                return ExitCode::from(127);
            }
            ExitCode::from(1)
        }
    }
}
