use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Console color choice.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Run the update pipeline, then launch and supervise the target (default)
    Run,
    /// Report capabilities, directories and configuration, then exit
    Doctor,
}

#[derive(Parser, Debug)]
#[command(
    name = "warden",
    version,
    about = "Keep a target script updated from its repository and relaunch it on request.",
    after_long_help = "Examples:\n  warden\n  warden --base-dir /srv/bot --config /etc/warden.yaml\n  warden --no-fetch --no-launch\n  warden doctor\n"
)]
pub struct Cli {
    /// Config file (default: warden.yaml under the base directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base directory holding the active, archive and staging directories
    #[arg(long = "base-dir")]
    pub base_dir: Option<PathBuf>,

    /// Update only; do not launch the target afterwards
    #[arg(long = "no-launch")]
    pub no_launch: bool,

    /// Skip fetching; verify, probe and install only
    #[arg(long = "no-fetch")]
    pub no_fetch: bool,

    /// Debug-level console output
    #[arg(long)]
    pub verbose: bool,

    /// Suppress the startup banner and routine console output
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Colorize console output: auto|always|never
    #[arg(long = "color", value_enum)]
    pub color: Option<ColorMode>,

    #[command(subcommand)]
    pub command: Option<Cmd>,
}

impl Cli {
    /// Console log filter implied by the verbosity flags.
    pub fn console_directive(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_run_command() {
        let cli = Cli::parse_from(["warden"]);
        assert!(cli.command.is_none());
        assert!(!cli.no_launch);
        assert_eq!(cli.console_directive(), "info");
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::parse_from([
            "warden",
            "--base-dir",
            "/srv/bot",
            "--no-fetch",
            "--verbose",
            "--color",
            "never",
        ]);
        assert_eq!(cli.base_dir.as_deref(), Some(std::path::Path::new("/srv/bot")));
        assert!(cli.no_fetch);
        assert_eq!(cli.console_directive(), "debug");
        assert_eq!(cli.color_mode(), ColorMode::Never);
    }

    #[test]
    fn doctor_subcommand_parses() {
        let cli = Cli::parse_from(["warden", "doctor"]);
        assert_eq!(cli.command, Some(Cmd::Doctor));
    }
}
