//! Read-only snapshot of the machine and its configuration repository.

use serde::Serialize;

use nixup_core::{CommandRunner, UpdateConfig};

use crate::generations::GenerationLister;
use crate::git::Git;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemSnapshot {
    pub hostname: String,
    pub generation: Option<String>,
    pub kernel: String,
    pub branch: String,
    pub total_commits: u64,
    pub local_changes: usize,
    pub last_commit: Option<String>,
}

impl SystemSnapshot {
    /// Query every field; unavailable values degrade to empty/zero/`None`.
    pub fn capture(runner: &dyn CommandRunner, config: &UpdateConfig) -> Self {
        let git = Git::new(runner, &config.remote);
        Self {
            hostname: stdout_of(runner, &["hostname"]),
            generation: GenerationLister::new(runner, &config.rebuild).current(),
            kernel: stdout_of(runner, &["uname", "-r"]),
            branch: git.current_branch(),
            total_commits: git.total_commits().unwrap_or(0),
            local_changes: git.status().len(),
            last_commit: git.last_commit_line_relative(),
        }
    }
}

fn stdout_of(runner: &dyn CommandRunner, argv: &[&str]) -> String {
    runner
        .run(argv)
        .ok_stdout()
        .map(|s| s.trim().to_owned())
        .unwrap_or_default()
}
