//! Update orchestrator: drives one supervised run through its stages,
//! from staging verification to the atomic version swap. Every stage
//! transition is logged; any stage failure aborts the run.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use time::format_description::FormatItem;
use time::macros::format_description;
use tracing::{debug, error, info, warn};

use crate::changelog::{self, SwapVerdict};
use crate::config::RunConfig;
use crate::deps;
use crate::errors::{StagingError, WardenError};
use crate::fetch;
use crate::paths::StagingPaths;
use crate::probe;
use crate::staging::{self, ItemKind};

const ARCHIVE_DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Stages of one update run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    VerifyingStaging,
    ProbingNetwork,
    InstallingDependencies,
    Fetching,
    ComparingVersion,
    Swapping,
    ReconcilingArtifacts,
    Done,
    Aborted,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::VerifyingStaging => "verifying-staging",
            Stage::ProbingNetwork => "probing-network",
            Stage::InstallingDependencies => "installing-dependencies",
            Stage::Fetching => "fetching",
            Stage::ComparingVersion => "comparing-version",
            Stage::Swapping => "swapping",
            Stage::ReconcilingArtifacts => "reconciling-artifacts",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an update run accomplished.
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    /// A fetch was performed (remote updates enabled and reachable).
    pub fetched: bool,
    /// The active directory now holds a new version.
    pub swapped: bool,
    /// Where the prior active version was archived, if a swap happened.
    pub archived_to: Option<PathBuf>,
}

pub struct Orchestrator<'a> {
    cfg: &'a RunConfig,
    paths: &'a StagingPaths,
    report: UpdateReport,
}

impl<'a> Orchestrator<'a> {
    pub fn new(cfg: &'a RunConfig, paths: &'a StagingPaths) -> Self {
        Orchestrator {
            cfg,
            paths,
            report: UpdateReport::default(),
        }
    }

    /// Run the pipeline to completion.
    pub fn run(mut self) -> Result<UpdateReport, WardenError> {
        let mut stage = Stage::Idle;
        while stage != Stage::Done {
            let next = match self.step(stage) {
                Ok(next) => next,
                Err(err) => {
                    info!(from = %stage, to = %Stage::Aborted, "stage transition");
                    error!(stage = %stage, error = %err, "update run aborted");
                    return Err(err);
                }
            };
            info!(from = %stage, to = %next, "stage transition");
            stage = next;
        }
        info!(
            fetched = self.report.fetched,
            swapped = self.report.swapped,
            "update run complete"
        );
        Ok(self.report)
    }

    fn step(&mut self, stage: Stage) -> Result<Stage, WardenError> {
        match stage {
            Stage::Idle => Ok(Stage::VerifyingStaging),
            Stage::VerifyingStaging => {
                self.verify_staging()?;
                Ok(Stage::ProbingNetwork)
            }
            Stage::ProbingNetwork => {
                probe::probe(&self.cfg.core.network, true, &self.cfg.core)?;
                Ok(Stage::InstallingDependencies)
            }
            Stage::InstallingDependencies => {
                if self.cfg.core.check_packages {
                    deps::install_all(self.cfg, self.paths)?;
                } else {
                    info!("package checks disabled; skipping installs");
                }
                Ok(Stage::Fetching)
            }
            Stage::Fetching => {
                if !self.cfg.core.remote_update {
                    info!("remote updates disabled; keeping the current version");
                    return Ok(Stage::Done);
                }
                fetch::fetch(&self.cfg.target, self.paths)?;
                self.report.fetched = true;
                Ok(Stage::ComparingVersion)
            }
            Stage::ComparingVersion => {
                if !self.cfg.target.check_version {
                    info!("version gate disabled; swapping unconditionally");
                    return Ok(Stage::Swapping);
                }
                match changelog::swap_verdict(&self.paths.staging, &self.paths.active) {
                    SwapVerdict::Newer => Ok(Stage::Swapping),
                    verdict => {
                        info!(verdict = ?verdict, "staged fetch is not newer; discarding it");
                        if let Err(err) = staging::remove(&self.paths.staging, ItemKind::Folder) {
                            warn!(error = %err, "could not discard the staged fetch");
                        }
                        Ok(Stage::Done)
                    }
                }
            }
            Stage::Swapping => {
                let entry = archive_entry_name(
                    self.cfg.target.repo_short_name().unwrap_or("version"),
                    &self.cfg.core.archive_separator,
                    &today_utc(),
                );
                let archived = swap_into_active(self.paths, &entry)?;
                self.report.swapped = true;
                self.report.archived_to = Some(archived);
                Ok(Stage::ReconcilingArtifacts)
            }
            Stage::ReconcilingArtifacts => {
                if let Some(archived) = self.report.archived_to.clone() {
                    self.reconcile(&archived);
                }
                Ok(Stage::Done)
            }
            Stage::Done | Stage::Aborted => Ok(Stage::Done),
        }
    }

    /// Make sure the staging area is complete enough to run: the layout
    /// directories, the core manifest, the target script and every
    /// required artifact. Required items other than the script are
    /// created empty when missing; the script itself cannot be invented.
    fn verify_staging(&self) -> Result<(), WardenError> {
        let target = &self.cfg.target;

        ensure_item(&self.paths.active, ItemKind::Folder)?;
        ensure_item(&self.paths.archive, ItemKind::Folder)?;
        ensure_item(
            &self.paths.base.join(&self.cfg.core.required_manifest),
            ItemKind::File,
        )?;

        let script = self.paths.target_script(&target.script_name);
        if !staging::exists(&script, ItemKind::File) {
            return Err(WardenError::TargetScriptMissing(script));
        }

        if let Some(manifest) = &target.manifest {
            let path = self.paths.active.join(manifest);
            if staging::exists(&path, ItemKind::File) {
                debug!(path = %path.display(), "target manifest present");
            } else {
                warn!(path = %path.display(), "target manifest declared but missing");
            }
        }

        for name in &target.required_files {
            ensure_item(&self.paths.active.join(name), ItemKind::File)?;
        }
        for name in &target.required_folders {
            ensure_item(&self.paths.active.join(name), ItemKind::Folder)?;
        }
        for name in &target.optional_files {
            if !staging::exists(&self.paths.active.join(name), ItemKind::File) {
                info!(item = %name, "optional file absent");
            }
        }
        for name in &target.optional_folders {
            if !staging::exists(&self.paths.active.join(name), ItemKind::Folder) {
                info!(item = %name, "optional folder absent");
            }
        }
        Ok(())
    }

    /// Copy preserved artifacts from the archived version into the fresh
    /// active directory, replacing whatever defaults the fetch brought.
    /// Failures are logged and skipped; the new version is already live.
    fn reconcile(&self, archived: &Path) {
        let target = &self.cfg.target;
        let files = target.required_files.iter().chain(&target.optional_files);
        let folders = target
            .required_folders
            .iter()
            .chain(&target.optional_folders);

        let items = files
            .map(|name| (name, ItemKind::File))
            .chain(folders.map(|name| (name, ItemKind::Folder)));
        for (name, kind) in items {
            let src = archived.join(name);
            if !staging::exists(&src, kind) {
                debug!(item = %name, "nothing to carry over");
                continue;
            }
            let dst = self.paths.active.join(name);
            if let Err(err) = staging::copy_or_move(&src, &dst, kind, true, true) {
                warn!(item = %name, error = %err, "could not carry artifact over");
            }
        }
    }
}

/// Create `path` if missing. A path occupied by the wrong kind aborts:
/// silently sidestepping a required item would hide real breakage.
fn ensure_item(path: &Path, kind: ItemKind) -> Result<(), StagingError> {
    if staging::exists(path, kind) {
        return Ok(());
    }
    if path.exists() {
        return Err(StagingError::Creation {
            kind,
            path: path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "path exists with a different kind",
            ),
        });
    }
    info!(kind = %kind, path = %path.display(), "required item missing; creating");
    staging::create(path, kind, false).map(|_| ())
}

/// Archive entry name for today's swap: `<repo> <separator> <date>`.
pub fn archive_entry_name(short_name: &str, separator: &str, date: &str) -> String {
    format!("{short_name} {separator} {date}")
}

/// Today's UTC date, `YYYY-MM-DD`.
pub fn today_utc() -> String {
    time::OffsetDateTime::now_utc()
        .date()
        .format(&ARCHIVE_DATE_FORMAT)
        .unwrap_or_else(|_| "unknown-date".to_string())
}

/// Move the active directory to `archive/<entry_name>` (sidestepped on
/// collision), then move the staged fetch into the active slot. The
/// active directory is gone between the two moves; a failure of the
/// second one is logged as critical and leaves the archive intact.
pub fn swap_into_active(paths: &StagingPaths, entry_name: &str) -> Result<PathBuf, WardenError> {
    let archive_dest = paths.archive.join(entry_name);
    let archived =
        staging::copy_or_move(&paths.active, &archive_dest, ItemKind::Folder, false, false)?;
    info!(archived = %archived.display(), "active version archived");

    if paths.active.exists() {
        // Moving the staged fetch in now would mix two versions.
        let err = StagingError::Transfer {
            kind: ItemKind::Folder,
            from: paths.staging.clone(),
            to: paths.active.clone(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "active slot still occupied after archiving",
            ),
        };
        error!(
            severity = "critical",
            archived = %archived.display(),
            error = %err,
            "active slot occupied; staged version not installed"
        );
        return Err(err.into());
    }

    match staging::copy_or_move(&paths.staging, &paths.active, ItemKind::Folder, false, false) {
        Ok(_) => Ok(archived),
        Err(err) => {
            error!(
                severity = "critical",
                archived = %archived.display(),
                error = %err,
                "staged version could not be installed; active directory is empty until restored"
            );
            Err(err.into())
        }
    }
}
