//! Thin, typed wrapper over the git commands the pipeline issues.
//!
//! Every method maps to exactly one git invocation and reports plain
//! success/failure; translating a failure into an [`UpdateError`] is the
//! caller's job.
//!
//! [`UpdateError`]: nixup_core::UpdateError

use nixup_core::{CommandRunner, WorkingTreeChange};

pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
    remote: &'a str,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner, remote: &'a str) -> Self {
        Self { runner, remote }
    }

    pub fn remote(&self) -> &str {
        self.remote
    }

    fn ok(&self, argv: &[&str]) -> bool {
        self.runner.run(argv).success
    }

    /// Stdout regardless of exit status (empty on failure).
    fn text(&self, argv: &[&str]) -> String {
        self.runner.run(argv).stdout
    }

    // -- queries ------------------------------------------------------------

    pub fn is_repository(&self) -> bool {
        self.ok(&["git", "rev-parse", "--git-dir"])
    }

    /// Current branch; empty on a detached HEAD.
    pub fn current_branch(&self) -> String {
        self.text(&["git", "branch", "--show-current"])
            .trim()
            .to_owned()
    }

    /// Commits on `<remote>/<branch>` missing locally; 0 if unknown.
    pub fn behind_count(&self, branch: &str) -> u32 {
        let range = format!("HEAD..{}/{}", self.remote, branch);
        let out = self.runner.run(&["git", "rev-list", "--count", &range]);
        if !out.success {
            tracing::warn!(range = %range, stderr = %out.stderr, "rev-list failed, assuming up to date");
            return 0;
        }
        out.stdout.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(range = %range, output = %out.stdout, "unreadable behind count, assuming up to date");
            0
        })
    }

    pub fn status(&self) -> Vec<WorkingTreeChange> {
        WorkingTreeChange::parse_all(&self.text(&["git", "status", "--porcelain"]))
    }

    pub fn is_dirty(&self) -> bool {
        !self.status().is_empty()
    }

    pub fn staged_paths(&self) -> Vec<String> {
        self.text(&["git", "diff", "--cached", "--name-only"])
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn has_staged(&self) -> bool {
        !self.staged_paths().is_empty()
    }

    /// First `max_lines` lines of `git diff --cached --stat`.
    pub fn diff_stat(&self, max_lines: usize) -> String {
        self.text(&["git", "diff", "--cached", "--stat"])
            .lines()
            .take(max_lines)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of stash entries; `None` if the list cannot be read.
    pub fn stash_depth(&self) -> Option<usize> {
        let out = self.runner.run(&["git", "stash", "list"]);
        if !out.success {
            tracing::warn!(stderr = %out.stderr, "could not read stash list");
            return None;
        }
        Some(out.stdout.lines().filter(|l| !l.trim().is_empty()).count())
    }

    pub fn last_subject(&self) -> Option<String> {
        let subject = self.text(&["git", "log", "-1", "--pretty=format:%s"]);
        (!subject.is_empty()).then_some(subject)
    }

    /// Every commit subject, newest first.
    pub fn subjects(&self) -> Vec<String> {
        self.text(&["git", "log", "--pretty=format:%s"])
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// `<short-hash> - <subject>` of HEAD.
    pub fn last_commit_line(&self) -> Option<String> {
        let line = self.text(&["git", "log", "-1", "--pretty=format:%h - %s"]);
        (!line.is_empty()).then_some(line)
    }

    /// `<short-hash> - <subject> (<relative date>)` of HEAD.
    pub fn last_commit_line_relative(&self) -> Option<String> {
        let line = self.text(&["git", "log", "-1", "--pretty=format:%h - %s (%cr)"]);
        (!line.is_empty()).then_some(line)
    }

    pub fn total_commits(&self) -> Option<u64> {
        self.text(&["git", "rev-list", "--count", "HEAD"]).trim().parse().ok()
    }

    /// Subject of the newest commit made at or before `date`.
    pub fn subject_before(&self, date: &str) -> String {
        let until = format!("--until={date}");
        self.text(&["git", "log", "-1", "--format=%s", &until])
    }

    // -- mutations ----------------------------------------------------------

    pub fn fetch(&self) -> bool {
        self.ok(&["git", "fetch", self.remote])
    }

    /// Stash tracked and untracked edits under `label`.
    pub fn stash_push(&self, label: &str) -> bool {
        self.ok(&["git", "stash", "push", "--include-untracked", "-m", label])
    }

    pub fn stash_pop(&self) -> bool {
        self.ok(&["git", "stash", "pop"])
    }

    pub fn pull_rebase(&self, branch: &str) -> bool {
        self.ok(&["git", "pull", "--rebase", self.remote, branch])
    }

    pub fn add_all(&self) -> bool {
        self.ok(&["git", "add", "-A"])
    }

    /// Reset the index to HEAD, keeping worktree edits.
    pub fn reset_index(&self) -> bool {
        self.ok(&["git", "reset", "HEAD"])
    }

    pub fn commit(&self, message: &str) -> bool {
        self.ok(&["git", "commit", "-m", message])
    }

    pub fn push(&self, branch: &str) -> bool {
        self.ok(&["git", "push", self.remote, branch])
    }
}
