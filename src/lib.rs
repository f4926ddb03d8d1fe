//! Supervised update-and-launch controller for a scripted target.
//!
//! The library is split along the lifecycle of one controller run:
//! staging verification, reachability probing, dependency installs,
//! repository fetch, version gating, the atomic swap, and finally
//! process supervision. `orchestrator` drives the whole sequence and
//! `supervisor` keeps the target alive afterwards.

pub mod banner;
pub mod changelog;
pub mod cli;
pub mod config;
pub mod deps;
pub mod doctor;
pub mod errors;
pub mod fetch;
pub mod logging;
pub mod orchestrator;
pub mod paths;
pub mod probe;
pub mod staging;
pub mod supervisor;
pub mod util;

pub use config::RunConfig;
pub use errors::{exit_code_for, WardenError};
pub use orchestrator::{Orchestrator, UpdateReport};
pub use paths::StagingPaths;
