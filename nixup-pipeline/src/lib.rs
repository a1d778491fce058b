//! # nixup-pipeline
//!
//! The update pipeline: synchronize the configuration repository with its
//! remote, stage local edits, rebuild the system, commit and push.
//!
//! Build a [`Pipeline`] over any [`nixup_core::CommandRunner`] and call
//! [`Pipeline::run`].

pub mod commit;
pub mod generations;
pub mod git;
pub mod message;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod rebuild;
pub mod stage;
pub mod status;
pub mod sync;

pub use commit::{CommitProducer, CommitResult};
pub use generations::{GenerationEntry, GenerationLister};
pub use git::Git;
pub use message::{DisabledGenerator, MessageGenerator, OpenRouterGenerator};
pub use pipeline::{Pipeline, PipelineRun, Stage};
pub use progress::{Progress, SilentProgress};
pub use publish::PublishOutcome;
pub use rebuild::RebuildExecutor;
pub use status::SystemSnapshot;
pub use sync::{SyncReport, Synchronizer};
