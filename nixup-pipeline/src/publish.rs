//! Remote Publisher. A failed push never aborts the run: the commit is
//! already safe locally and can be pushed by hand.

use nixup_core::{GitOperation, UpdateError};

use crate::git::Git;
use crate::progress::Progress;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// Not pushed; `hint` tells the operator how to finish by hand.
    Pending { hint: String },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published)
    }
}

pub fn publish(git: &Git<'_>, progress: &dyn Progress) -> PublishOutcome {
    let branch = git.current_branch();
    let hint = format!("You may need to push manually: git push {} {branch}", git.remote());
    if branch.is_empty() {
        progress.warning("Not on a branch; skipping push");
        return PublishOutcome::Pending { hint };
    }

    progress.step("Pushing to remote");
    if git.push(&branch) {
        progress.success("Pushed to remote");
        return PublishOutcome::Published;
    }

    let err = UpdateError::git_with_hint(GitOperation::Push, hint.clone());
    tracing::warn!(error = %err, "push failed, continuing");
    progress.warning(&format!("{err}. {hint}"));
    PublishOutcome::Pending { hint }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::RecordingProgress;
    use nixup_core::fakes::{FailPoint, FakeHost};

    #[test]
    fn pushes_current_branch() {
        let host = FakeHost::new();
        let git = Git::new(&host, "origin");
        assert!(publish(&git, &RecordingProgress::new()).is_published());
        assert_eq!(host.state().pushed, vec!["main".to_owned()]);
    }

    #[test]
    fn push_failure_is_pending_with_hint() {
        let host = FakeHost::new().failing(FailPoint::Push);
        let git = Git::new(&host, "origin");
        let progress = RecordingProgress::new();

        let outcome = publish(&git, &progress);
        assert_eq!(
            outcome,
            PublishOutcome::Pending {
                hint: "You may need to push manually: git push origin main".into()
            }
        );
        assert!(progress
            .events()
            .iter()
            .any(|e| e.starts_with("warning: Git operation failed: push")));
    }
}
