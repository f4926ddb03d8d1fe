use std::path::Path;
use std::process::Command;

use crate::changelog;
use crate::config::{self, RunConfig};
use crate::paths::{self, StagingPaths};

/// Print a diagnostic report: build info, capability programs, the
/// staging layout and the effective configuration. Purely informative;
/// nothing here mutates the staging area.
pub fn run_doctor(cli_config: Option<&Path>, cli_base: Option<&Path>, verbose: bool) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("warden doctor");
    eprintln!();
    eprintln!("  version: v{}", version);
    eprintln!(
        "  build:   {} ({}, {})",
        option_env!("WARDEN_BUILD_DATE").unwrap_or("unknown"),
        option_env!("WARDEN_BUILD_PROFILE").unwrap_or("unknown"),
        option_env!("WARDEN_BUILD_TARGET").unwrap_or("unknown")
    );
    if verbose {
        eprintln!(
            "  rustc:   {}",
            option_env!("WARDEN_BUILD_RUSTC").unwrap_or("unknown")
        );
    }
    eprintln!(
        "  host:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    eprintln!();

    let base = paths::resolve_base_dir(cli_base);
    eprintln!(
        "  base dir: {} ({})",
        base.display(),
        present(base.is_dir())
    );

    let config_path = paths::resolve_config_path(cli_config, &base);
    let cfg = match config::load(&config_path) {
        Ok(cfg) => {
            eprintln!("  config: {} (ok)", config_path.display());
            Some(cfg)
        }
        Err(err) => {
            eprintln!("  config: {} ({err})", config_path.display());
            None
        }
    };
    eprintln!();

    eprintln!("  capabilities:");
    report_program("ping", Some("ping"));
    report_program("git", Some("git"));
    if let Some(cfg) = &cfg {
        report_program("installer", cfg.core.install_command.first().map(String::as_str));
        report_program(
            "bootstrap",
            cfg.core
                .bootstrap_command
                .as_ref()
                .and_then(|c| c.first())
                .map(String::as_str),
        );
        report_program("interpreter", cfg.target.run_with.as_deref());
    }
    eprintln!();

    if let Some(cfg) = &cfg {
        report_layout(cfg, &base);
    }
}

fn report_program(label: &str, program: Option<&str>) {
    let Some(program) = program else {
        eprintln!("    {label}: disabled");
        return;
    };
    match which::which(program) {
        Ok(path) => {
            let mut line = format!("    {label}: {}", path.display());
            if let Some(ver) = version_of(&path) {
                line.push_str(&format!(" ({ver})"));
            }
            eprintln!("{line}");
        }
        Err(_) => eprintln!("    {label}: {program} not found in PATH"),
    }
}

/// Best-effort `--version` probe; ping has no portable version flag.
fn version_of(path: &Path) -> Option<String> {
    if path.file_stem().map(|s| s == "ping").unwrap_or(false) {
        return None;
    }
    let out = Command::new(path).arg("--version").output().ok()?;
    if !out.status.success() {
        return None;
    }
    let first = String::from_utf8_lossy(&out.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())?;
    if first.is_empty() {
        None
    } else {
        Some(first)
    }
}

fn report_layout(cfg: &RunConfig, base: &Path) {
    let layout = StagingPaths::derive(base, &cfg.target);
    eprintln!("  layout:");
    eprintln!(
        "    active:  {} ({})",
        layout.active.display(),
        present(layout.active.is_dir())
    );
    eprintln!(
        "    archive: {} ({})",
        layout.archive.display(),
        present(layout.archive.is_dir())
    );
    eprintln!(
        "    staging: {} ({})",
        layout.staging.display(),
        present(layout.staging.is_dir())
    );

    let script = layout.target_script(&cfg.target.script_name);
    eprintln!(
        "    script:  {} ({})",
        script.display(),
        present(script.is_file())
    );
    match changelog::latest_entry(&layout.active) {
        Ok(token) => eprintln!("    active version: {token}"),
        Err(err) => eprintln!("    active version: unknown ({err})"),
    }
    eprintln!();

    eprintln!("  target:");
    eprintln!(
        "    repository: {}",
        cfg.target.repository.as_deref().unwrap_or("(none)")
    );
    if let Some(url) = cfg.target.clone_url() {
        eprintln!("    clone url:  {url}");
    }
    eprintln!("    restart code: {}", cfg.target.restart_code);
}

fn present(yes: bool) -> String {
    let word = if yes { "present" } else { "missing" };
    if atty::is(atty::Stream::Stderr) {
        format!("\x1b[34;1m{word}\x1b[0m")
    } else {
        word.to_string()
    }
}
