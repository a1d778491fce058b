//! nixup core library: domain types, typed failures, configuration, and the
//! command-runner seam shared by the pipeline and the CLI.
//!
//! - [`types`]: working-tree changes, generations, pipeline outcome
//! - [`error`]: [`ConfigError`], [`UpdateError`]
//! - [`config`]: load / save `~/.nixup/config.yaml`
//! - [`runner`]: [`CommandRunner`] and the process-backed [`SystemRunner`]
//! - [`fakes`]: in-memory [`fakes::FakeHost`] for tests

pub mod config;
pub mod error;
pub mod fakes;
pub mod runner;
pub mod types;

pub use config::UpdateConfig;
pub use error::{ConfigError, GitOperation, UpdateError};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use types::{
    ChangeKind, ChangeSummary, Generation, PipelineOutcome, WorkingTreeChange,
};
