//! Pipeline Orchestrator.
//!
//! ```text
//! start → synchronized → staged → rebuilt → {committed|skipped} → {published|pending} → reported
//! ```
//!
//! Typed failures from preflight, synchronization, staging, rebuild and
//! commit end the run. A failed push only changes the final report.

use nixup_core::{CommandRunner, PipelineOutcome, UpdateConfig, UpdateError};

use crate::commit::{CommitProducer, CommitResult};
use crate::generations::GenerationLister;
use crate::git::Git;
use crate::message::MessageGenerator;
use crate::progress::Progress;
use crate::publish::publish;
use crate::rebuild::RebuildExecutor;
use crate::stage::stage_local_changes;
use crate::sync::{stash_label, Synchronizer};

/// States the orchestrator passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Synchronized,
    Staged,
    Rebuilt,
    Committed,
    Skipped,
    Published,
    Pending,
    Reported,
}

/// A run that made it through the rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    pub outcome: PipelineOutcome,
    pub stages: Vec<Stage>,
}

pub struct Pipeline<'a> {
    runner: &'a dyn CommandRunner,
    generator: &'a dyn MessageGenerator,
    progress: &'a dyn Progress,
    config: &'a UpdateConfig,
    push: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        generator: &'a dyn MessageGenerator,
        progress: &'a dyn Progress,
        config: &'a UpdateConfig,
    ) -> Self {
        Self {
            runner,
            generator,
            progress,
            config,
            push: true,
        }
    }

    /// Skip the push; a new commit is reported as pending.
    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    /// The repository directory exists and is a git work tree.
    pub fn preflight(&self) -> Result<(), UpdateError> {
        let path = &self.config.repo_path;
        if !path.is_dir() {
            return Err(UpdateError::RepoMissing { path: path.clone() });
        }
        if !Git::new(self.runner, &self.config.remote).is_repository() {
            return Err(UpdateError::NotARepository { path: path.clone() });
        }
        Ok(())
    }

    /// Configured host, else the machine's hostname.
    pub fn resolve_host(&self) -> Result<String, UpdateError> {
        if let Some(host) = self.config.host.as_deref().map(str::trim) {
            if !host.is_empty() {
                return Ok(host.to_owned());
            }
        }
        let out = self.runner.run(&["hostname"]);
        let host = out.stdout.trim();
        if !out.success || host.is_empty() {
            return Err(UpdateError::HostUnknown);
        }
        Ok(host.to_owned())
    }

    pub fn run(&self) -> Result<PipelineRun, UpdateError> {
        self.preflight()?;
        let host = self.resolve_host()?;
        let mut stages = vec![Stage::Start];
        let git = Git::new(self.runner, &self.config.remote);

        let report = Synchronizer::new(&git, self.progress).run(&stash_label())?;
        tracing::debug!(?report, "synchronized");
        stages.push(Stage::Synchronized);

        stage_local_changes(&git, self.progress)?;
        stages.push(Stage::Staged);

        let flake_ref = self.config.flake_ref(&host);
        RebuildExecutor::new(self.runner, &self.config.rebuild).run(
            &git,
            &flake_ref,
            self.progress,
        )?;
        let generation = GenerationLister::new(self.runner, &self.config.rebuild).current();
        self.progress.success("NixOS rebuild completed successfully");
        if let Some(id) = &generation {
            self.progress.info(&format!("Current generation: {id}"));
        }
        stages.push(Stage::Rebuilt);

        let had_changes = git.has_staged();
        let commit = if had_changes {
            CommitProducer::new(&git, self.generator, &self.config.commit).run(self.progress)?
        } else {
            self.progress.step("No changes to commit");
            CommitResult::NothingStaged
        };
        let commit_message = match commit {
            CommitResult::Committed { message } => {
                stages.push(Stage::Committed);
                Some(message)
            }
            CommitResult::NothingStaged => {
                stages.push(Stage::Skipped);
                None
            }
        };

        let mut pushed = false;
        if commit_message.is_some() {
            pushed = if self.push {
                publish(&git, self.progress).is_published()
            } else {
                self.progress.info("Push skipped");
                false
            };
            stages.push(if pushed { Stage::Published } else { Stage::Pending });
        }

        let outcome = PipelineOutcome {
            had_changes,
            committed: commit_message.is_some(),
            pushed,
            commit_message,
            generation,
            last_commit: git.last_commit_line(),
        };
        stages.push(Stage::Reported);
        tracing::debug!(summary = %outcome.summary(), "update finished");
        Ok(PipelineRun { outcome, stages })
    }
}
