//! Repository Synchronizer: bring the local branch up to date with its
//! remote before anything is built.
//!
//! ## Protocol
//!
//! 1. `git fetch <remote>`; failure aborts before anything local is touched.
//! 2. Count commits on `<remote>/<branch>` missing locally. Zero ⇒ done.
//! 3. Clean tree ⇒ `git pull --rebase`.
//! 4. Dirty tree ⇒ stash (tracked + untracked) under a unique label, pull,
//!    then pop. A conflicting pop leaves the entry on the stash stack and
//!    is reported with recovery instructions. A push that saved nothing
//!    (same stash depth before and after) continues as a clean pull; an
//!    unreadable `git stash list` is treated as a saved entry.
//!
//! Every exit path either restores local edits or names the stash entry
//! that still holds them.

use chrono::Utc;
use nixup_core::{GitOperation, UpdateError};

use crate::git::Git;
use crate::progress::Progress;

/// Unique label for the autostash entry of this run.
pub fn stash_label() -> String {
    format!("nixup-autostash-{}", Utc::now().timestamp_millis())
}

/// What the synchronizer did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    UpToDate,
    Pulled { commits: u32 },
    /// Local edits were stashed around the pull and restored.
    PulledWithStash { commits: u32, label: String },
}

pub struct Synchronizer<'a> {
    git: &'a Git<'a>,
    progress: &'a dyn Progress,
}

impl<'a> Synchronizer<'a> {
    pub fn new(git: &'a Git<'a>, progress: &'a dyn Progress) -> Self {
        Self { git, progress }
    }

    /// Run the protocol; `label` names the stash entry if one is needed.
    pub fn run(&self, label: &str) -> Result<SyncReport, UpdateError> {
        self.progress.step("Fetching from remote");
        if !self.git.fetch() {
            return Err(UpdateError::git_with_hint(
                GitOperation::Fetch,
                "Check your network connection",
            ));
        }

        let branch = self.git.current_branch();
        if branch.is_empty() {
            tracing::warn!("detached HEAD, skipping pull");
            self.progress
                .warning("Not on a branch; skipping synchronization");
            return Ok(SyncReport::UpToDate);
        }

        let behind = self.git.behind_count(&branch);
        if behind == 0 {
            self.progress.success("Already up to date");
            return Ok(SyncReport::UpToDate);
        }
        self.progress
            .info(&format!("Pulling {behind} new commit(s) from remote"));

        if !self.git.is_dirty() {
            return self.pull_clean(&branch, behind);
        }

        self.progress.info("Stashing local changes");
        let depth_before = self.git.stash_depth();
        if !self.git.stash_push(label) {
            return Err(UpdateError::git_with_hint(
                GitOperation::Stash,
                "Please commit or stash your changes manually before running this script",
            ));
        }
        // An unreadable list counts as "entry created".
        if let (Some(before), Some(after)) = (depth_before, self.git.stash_depth()) {
            if after <= before {
                // Nothing was saved; popping now would restore an unrelated entry.
                tracing::debug!(label, "stash created no entry");
                return self.pull_clean(&branch, behind);
            }
        }
        self.pull_stashed(&branch, behind, label)
    }

    fn pull_stashed(
        &self,
        branch: &str,
        behind: u32,
        label: &str,
    ) -> Result<SyncReport, UpdateError> {
        if !self.git.pull_rebase(branch) {
            let restored = self.git.stash_pop();
            tracing::warn!(label, restored, "pull failed with local changes stashed");
            let mut hint = self.rebase_hint(branch);
            if !restored {
                hint.push_str(&format!(
                    ". Local changes remain in stash '{label}': inspect with git stash show -p, restore with git stash pop"
                ));
            }
            return Err(UpdateError::git_with_hint(GitOperation::Pull, hint));
        }

        self.progress.info("Restoring local changes");
        if !self.git.stash_pop() {
            return Err(UpdateError::git_with_hint(
                GitOperation::StashPop,
                "Conflict restoring local changes. Run: git stash show -p, resolve, then git stash drop",
            ));
        }

        self.progress.success("Synchronized with remote");
        Ok(SyncReport::PulledWithStash {
            commits: behind,
            label: label.to_owned(),
        })
    }

    fn pull_clean(&self, branch: &str, behind: u32) -> Result<SyncReport, UpdateError> {
        if !self.git.pull_rebase(branch) {
            return Err(UpdateError::git_with_hint(
                GitOperation::Pull,
                self.rebase_hint(branch),
            ));
        }
        self.progress.success("Synchronized with remote");
        Ok(SyncReport::Pulled { commits: behind })
    }

    fn rebase_hint(&self, branch: &str) -> String {
        format!(
            "Conflicts detected. Resolve manually: git rebase {}/{branch}",
            self.git.remote()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentProgress;
    use nixup_core::fakes::{FailPoint, FakeHost};

    fn sync(host: &FakeHost) -> Result<SyncReport, UpdateError> {
        let git = Git::new(host, "origin");
        Synchronizer::new(&git, &SilentProgress).run("nixup-autostash-test")
    }

    #[test]
    fn label_is_unique_per_millisecond() {
        assert!(stash_label().starts_with("nixup-autostash-"));
    }

    #[test]
    fn up_to_date_touches_nothing() {
        let host = FakeHost::new().with_unstaged(" M", "a.nix");
        assert_eq!(sync(&host).unwrap(), SyncReport::UpToDate);
        assert_eq!(host.count_calls(&["git", "stash"]), 0);
        assert_eq!(host.count_calls(&["git", "pull"]), 0);
        assert_eq!(host.count_calls(&["git", "push"]), 0);
    }

    #[test]
    fn fetch_failure_is_typed() {
        let host = FakeHost::new().failing(FailPoint::Fetch);
        let err = sync(&host).unwrap_err();
        assert_eq!(err.operation(), "fetch");
        assert_eq!(err.hint(), Some("Check your network connection"));
    }

    #[test]
    fn stash_failure_leaves_tree_untouched() {
        let host = FakeHost::new()
            .behind(1)
            .with_unstaged(" M", "a.nix")
            .failing(FailPoint::Stash);
        let err = sync(&host).unwrap_err();
        assert_eq!(err.operation(), "stash");
        assert_eq!(host.state().unstaged.len(), 1);
        assert_eq!(host.count_calls(&["git", "pull"]), 0);
    }

    #[test]
    fn clean_pull_failure_names_rebase_command() {
        let host = FakeHost::new().behind(2).failing(FailPoint::Pull);
        let err = sync(&host).unwrap_err();
        assert_eq!(err.operation(), "pull");
        assert!(err.hint().unwrap().contains("git rebase origin/main"));
    }

    #[test]
    fn unreadable_stash_list_still_restores_local_edits() {
        let host = FakeHost::new()
            .behind(1)
            .with_unstaged(" M", "a.nix")
            .failing(FailPoint::StashList);
        let report = sync(&host).unwrap();
        assert!(matches!(report, SyncReport::PulledWithStash { commits: 1, .. }));
        assert_eq!(host.count_calls(&["git", "stash", "pop"]), 1);
        let state = host.state();
        assert!(state.stashes.is_empty());
        assert_eq!(state.unstaged[0].path, "a.nix");
    }

    #[test]
    fn untracked_only_tree_round_trips_through_stash() {
        let host = FakeHost::new().behind(1).with_unstaged("??", "new.nix");
        let report = sync(&host).unwrap();
        assert!(matches!(report, SyncReport::PulledWithStash { commits: 1, .. }));
        let state = host.state();
        assert!(state.stashes.is_empty());
        assert_eq!(state.unstaged[0].path, "new.nix");
    }
}
