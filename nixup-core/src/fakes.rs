//! In-memory fake of a git working tree plus the NixOS rebuild tool
//! (testing only).
//!
//! [`FakeHost`] implements [`CommandRunner`] by interpreting the argv the
//! pipeline issues against a small repository model. It behaves like git
//! where the pipeline's correctness depends on it:
//!
//! - `pull --rebase` refuses to run over tracked local edits
//! - a conflicting `stash pop` leaves the stash entry in place
//! - `reset HEAD` on an empty index is a no-op
//! - ignored (`!!`) entries are never stashed and never block a pull
//!
//! Failures are injected per operation with [`FailPoint`].

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::runner::{CommandOutput, CommandRunner};
use crate::types::{Generation, WorkingTreeChange};

/// Operation that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    RevParse,
    Fetch,
    Stash,
    Pull,
    StashPop,
    StashList,
    Add,
    Commit,
    Push,
    Rebuild,
    ListGenerations,
    Hostname,
}

/// One entry on the fake stash stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashEntry {
    pub label: String,
    pub changes: Vec<WorkingTreeChange>,
}

/// Observable state of a [`FakeHost`].
#[derive(Debug, Clone)]
pub struct FakeState {
    pub is_repo: bool,
    pub branch: String,
    /// Commits on the remote tracking branch not yet pulled.
    pub behind: u32,
    /// Subjects delivered by the next successful pull, newest first.
    pub incoming: Vec<String>,
    /// Worktree-side porcelain entries (` M`, ` D`, `??`, ...).
    pub unstaged: Vec<WorkingTreeChange>,
    /// Index-side porcelain entries (`M `, `D `, `A `, ...).
    pub staged: Vec<WorkingTreeChange>,
    /// Stash stack; index 0 is `stash@{0}`.
    pub stashes: Vec<StashEntry>,
    /// Commit subjects, newest first.
    pub commits: Vec<String>,
    /// Local commits not yet pushed.
    pub ahead: u32,
    /// Branches successfully pushed, in order.
    pub pushed: Vec<String>,
    pub hostname: String,
    pub kernel: String,
    /// Generation table, oldest first.
    pub generations: Vec<Generation>,
    pub fail: HashSet<FailPoint>,
    /// Every captured invocation, in order.
    pub calls: Vec<Vec<String>>,
    /// Every live (streamed) invocation, in order.
    pub live_calls: Vec<Vec<String>>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            is_repo: true,
            branch: "main".into(),
            behind: 0,
            incoming: Vec::new(),
            unstaged: Vec::new(),
            staged: Vec::new(),
            stashes: Vec::new(),
            commits: vec!["Update #1".into()],
            ahead: 0,
            pushed: Vec::new(),
            hostname: "desktop".into(),
            kernel: "6.6.52".into(),
            generations: vec![Generation {
                id: "1".into(),
                built_at: "2025-01-01 10:00:00".into(),
                current: true,
            }],
            fail: HashSet::new(),
            calls: Vec::new(),
            live_calls: Vec::new(),
        }
    }
}

/// Scriptable in-memory host; see the module docs.
#[derive(Debug, Default)]
pub struct FakeHost {
    state: Mutex<FakeState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Remote is `n` commits ahead; the pull delivers `Remote change <i>`.
    pub fn behind(self, n: u32) -> Self {
        {
            let mut s = self.lock();
            s.behind = n;
            s.incoming = (1..=n).rev().map(|i| format!("Remote change {i}")).collect();
        }
        self
    }

    /// Add a worktree entry, e.g. `(" M", "hosts/desktop.nix")`.
    pub fn with_unstaged(self, code: &str, path: &str) -> Self {
        self.lock().unstaged.push(WorkingTreeChange {
            code: code.into(),
            path: path.into(),
        });
        self
    }

    /// Add an index entry, e.g. `("M ", "flake.lock")`.
    pub fn with_staged(self, code: &str, path: &str) -> Self {
        self.lock().staged.push(WorkingTreeChange {
            code: code.into(),
            path: path.into(),
        });
        self
    }

    /// Replace history; subjects are newest first.
    pub fn with_commits<I, S>(self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().commits = subjects.into_iter().map(Into::into).collect();
        self
    }

    pub fn not_a_repo(self) -> Self {
        self.lock().is_repo = false;
        self
    }

    pub fn failing(self, point: FailPoint) -> Self {
        self.lock().fail.insert(point);
        self
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FakeState {
        self.lock().clone()
    }

    /// Number of captured calls whose argv starts with `prefix`.
    pub fn count_calls(&self, prefix: &[&str]) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|argv| starts_with(argv, prefix))
            .count()
    }

    /// Position of the first captured call starting with `prefix`.
    pub fn position(&self, prefix: &[&str]) -> Option<usize> {
        self.lock()
            .calls
            .iter()
            .position(|argv| starts_with(argv, prefix))
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        // A panic while holding the lock only happens inside a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn starts_with(argv: &[String], prefix: &[&str]) -> bool {
    argv.len() >= prefix.len() && argv.iter().zip(prefix).all(|(a, p)| a == p)
}

impl CommandRunner for FakeHost {
    fn run(&self, argv: &[&str]) -> CommandOutput {
        let mut s = self.lock();
        s.calls.push(argv.iter().map(|a| a.to_string()).collect());
        s.dispatch(argv)
    }

    fn run_live(&self, argv: &[&str]) -> bool {
        let mut s = self.lock();
        s.live_calls.push(argv.iter().map(|a| a.to_string()).collect());
        if !argv.contains(&"--flake") {
            return false;
        }
        if s.fail.contains(&FailPoint::Rebuild) {
            return false;
        }
        s.activate_new_generation();
        true
    }
}

// ---------------------------------------------------------------------------
// Command interpretation
// ---------------------------------------------------------------------------

impl FakeState {
    fn failing(&self, point: FailPoint) -> bool {
        self.fail.contains(&point)
    }

    fn dispatch(&mut self, argv: &[&str]) -> CommandOutput {
        match argv {
            ["git", rest @ ..] => self.git(rest),
            ["hostname"] => {
                if self.failing(FailPoint::Hostname) {
                    CommandOutput::failed("hostname: unavailable")
                } else {
                    CommandOutput::ok(self.hostname.clone())
                }
            }
            ["uname", "-r"] => CommandOutput::ok(self.kernel.clone()),
            _ if argv.contains(&"list-generations") => {
                if self.failing(FailPoint::ListGenerations) {
                    CommandOutput::failed("sudo: a password is required")
                } else {
                    CommandOutput::ok(self.generation_table())
                }
            }
            _ => CommandOutput::failed(format!("unsupported by FakeHost: {}", argv.join(" "))),
        }
    }

    fn git(&mut self, args: &[&str]) -> CommandOutput {
        match args {
            ["rev-parse", "--git-dir"] => {
                if self.is_repo && !self.failing(FailPoint::RevParse) {
                    CommandOutput::ok(".git")
                } else {
                    CommandOutput::failed("fatal: not a git repository")
                }
            }
            ["fetch", _remote] => {
                if self.failing(FailPoint::Fetch) {
                    CommandOutput::failed("fatal: unable to access remote")
                } else {
                    CommandOutput::ok("")
                }
            }
            ["branch", "--show-current"] => CommandOutput::ok(self.branch.clone()),
            ["rev-list", "--count", "HEAD"] => CommandOutput::ok(self.commits.len().to_string()),
            ["rev-list", "--count", _range] => CommandOutput::ok(self.behind.to_string()),
            ["status", "--porcelain"] => CommandOutput::ok(self.porcelain()),
            ["stash", "push", ..] => self.stash_push(args),
            ["stash", "pop"] => self.stash_pop(),
            ["stash", "list"] if self.failing(FailPoint::StashList) => {
                CommandOutput::failed("fatal: unable to read refs/stash")
            }
            ["stash", "list"] => CommandOutput::ok(
                self.stashes
                    .iter()
                    .enumerate()
                    .map(|(i, e)| format!("stash@{{{i}}}: On {}: {}", self.branch, e.label))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            ["pull", "--rebase", _remote, _branch] => self.pull(),
            ["add", "-A"] => {
                if self.failing(FailPoint::Add) {
                    return CommandOutput::failed("fatal: Unable to create index.lock");
                }
                let moved: Vec<_> = self.unstaged.drain(..).map(to_index_side).collect();
                self.staged.extend(moved);
                CommandOutput::ok("")
            }
            ["diff", "--cached", "--name-only"] => CommandOutput::ok(
                self.staged
                    .iter()
                    .map(|c| c.path.clone())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            ["diff", "--cached", "--stat"] => CommandOutput::ok(self.diff_stat()),
            ["reset", "HEAD"] => {
                let moved: Vec<_> = self.staged.drain(..).map(to_worktree_side).collect();
                self.unstaged.extend(moved);
                CommandOutput::ok("")
            }
            ["log", "-1", "--pretty=format:%s"] => {
                CommandOutput::ok(self.commits.first().cloned().unwrap_or_default())
            }
            ["log", "--pretty=format:%s"] => CommandOutput::ok(self.commits.join("\n")),
            ["log", "-1", "--pretty=format:%h - %s"] => CommandOutput::ok(
                self.commits
                    .first()
                    .map(|s| format!("{} - {s}", self.head_hash()))
                    .unwrap_or_default(),
            ),
            ["log", "-1", "--pretty=format:%h - %s (%cr)"] => CommandOutput::ok(
                self.commits
                    .first()
                    .map(|s| format!("{} - {s} (2 minutes ago)", self.head_hash()))
                    .unwrap_or_default(),
            ),
            ["log", "-1", "--format=%s", until] if until.starts_with("--until=") => {
                CommandOutput::ok(self.commits.first().cloned().unwrap_or_default())
            }
            ["commit", "-m", message] => {
                if self.failing(FailPoint::Commit) {
                    return CommandOutput::failed("error: gpg failed to sign the data");
                }
                if self.staged.is_empty() {
                    return CommandOutput::failed("nothing to commit, working tree clean");
                }
                self.staged.clear();
                self.commits.insert(0, (*message).to_owned());
                self.ahead += 1;
                CommandOutput::ok(format!("[{} {}] {message}", self.branch, self.head_hash()))
            }
            ["push", _remote, branch] => {
                if self.failing(FailPoint::Push) {
                    return CommandOutput::failed("fatal: could not read from remote repository");
                }
                self.pushed.push((*branch).to_owned());
                self.ahead = 0;
                CommandOutput::ok("")
            }
            _ => CommandOutput::failed(format!("unsupported by FakeHost: git {}", args.join(" "))),
        }
    }

    fn porcelain(&self) -> String {
        self.staged
            .iter()
            .chain(self.unstaged.iter())
            .map(|c| format!("{} {}", c.code, c.path))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn diff_stat(&self) -> String {
        if self.staged.is_empty() {
            return String::new();
        }
        let mut lines: Vec<String> = self
            .staged
            .iter()
            .map(|c| format!(" {} | 2 +-", c.path))
            .collect();
        lines.push(format!(
            " {} files changed, {} insertions(+), {} deletions(-)",
            self.staged.len(),
            self.staged.len(),
            self.staged.len()
        ));
        lines.join("\n")
    }

    fn stash_push(&mut self, args: &[&str]) -> CommandOutput {
        if self.failing(FailPoint::Stash) {
            return CommandOutput::failed("error: could not write index");
        }
        let label = args
            .iter()
            .position(|a| *a == "-m")
            .and_then(|i| args.get(i + 1))
            .map(|l| (*l).to_owned())
            .unwrap_or_else(|| format!("WIP on {}", self.branch));
        let include_untracked = args.contains(&"--include-untracked");

        let (mut taken, kept): (Vec<_>, Vec<_>) = self
            .unstaged
            .drain(..)
            .partition(|c| c.code != "!!" && (include_untracked || c.code != "??"));
        self.unstaged = kept;
        taken.extend(self.staged.drain(..).map(to_worktree_side));
        if taken.is_empty() {
            return CommandOutput::ok("No local changes to save");
        }
        self.stashes.insert(
            0,
            StashEntry {
                label: label.clone(),
                changes: taken,
            },
        );
        CommandOutput::ok(format!("Saved working directory and index state On {}: {label}", self.branch))
    }

    fn stash_pop(&mut self) -> CommandOutput {
        if self.stashes.is_empty() {
            return CommandOutput::failed("No stash entries found.");
        }
        if self.failing(FailPoint::StashPop) {
            // git keeps the entry when the pop conflicts.
            return CommandOutput::failed("CONFLICT (content): Merge conflict in configuration.nix");
        }
        let entry = self.stashes.remove(0);
        self.unstaged.extend(entry.changes);
        CommandOutput::ok("Dropped refs/stash@{0}")
    }

    fn pull(&mut self) -> CommandOutput {
        if self.failing(FailPoint::Pull) {
            return CommandOutput::failed("CONFLICT (content): could not apply 1a2b3c4");
        }
        let tracked_dirty = self.unstaged.iter().any(|c| c.code != "??" && c.code != "!!");
        if tracked_dirty || !self.staged.is_empty() {
            return CommandOutput::failed(
                "error: cannot pull with rebase: You have unstaged changes.",
            );
        }
        let incoming: Vec<_> = self.incoming.drain(..).collect();
        for subject in incoming.into_iter().rev() {
            self.commits.insert(0, subject);
        }
        self.behind = 0;
        CommandOutput::ok("Successfully rebased and updated refs/heads/main.")
    }

    fn head_hash(&self) -> String {
        format!("{:07x}", 0xabc0000 + self.commits.len())
    }

    fn activate_new_generation(&mut self) {
        let next = self
            .generations
            .iter()
            .filter_map(|g| g.id.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        for g in &mut self.generations {
            g.current = false;
        }
        self.generations.push(Generation {
            id: next.to_string(),
            built_at: format!("2025-01-01 10:{:02}:00", next % 60),
            current: true,
        });
    }

    /// Newest-first table shaped like `nixos-rebuild list-generations`.
    fn generation_table(&self) -> String {
        let mut lines = vec![
            "Generation  Build-date           NixOS version  Kernel  Configuration Revision  Specialisation  Current"
                .to_owned(),
        ];
        for g in self.generations.iter().rev() {
            lines.push(format!(
                "{:<11} {:<20} {:<14} {:<7} {:<23} {:<15} {}",
                g.id,
                g.built_at,
                "24.11",
                self.kernel,
                "",
                "*",
                if g.current { "True" } else { "False" }
            ));
        }
        lines.join("\n")
    }
}

fn to_index_side(change: WorkingTreeChange) -> WorkingTreeChange {
    let code = match change.code.as_str() {
        "??" => "A ".to_owned(),
        " M" | "MM" => "M ".to_owned(),
        " D" => "D ".to_owned(),
        other => other.to_owned(),
    };
    WorkingTreeChange { code, ..change }
}

fn to_worktree_side(change: WorkingTreeChange) -> WorkingTreeChange {
    let code = match change.code.as_str() {
        "A " => "??".to_owned(),
        "M " => " M".to_owned(),
        "D " => " D".to_owned(),
        other => other.to_owned(),
    };
    WorkingTreeChange { code, ..change }
}
