//! Domain types for the update pipeline.
//!
//! Repository state is never stored: these types are built fresh from tool
//! output on every run and dropped when the run ends.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Working-tree changes
// ---------------------------------------------------------------------------

/// Operator-facing classification of a porcelain status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Untracked file (`??`).
    New,
    /// Modified in the worktree, the index, or both (` M`, `M `, `MM`).
    Modified,
    /// Deleted from the worktree or the index (` D`, `D `).
    Deleted,
    /// Anything else (renames, copies, conflicts); keeps the raw code.
    Other(String),
}

impl ChangeKind {
    /// Classify a two-character porcelain status code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "??" => ChangeKind::New,
            " M" | "M " | "MM" => ChangeKind::Modified,
            " D" | "D " => ChangeKind::Deleted,
            other => ChangeKind::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::New => write!(f, "new"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Deleted => write!(f, "deleted"),
            ChangeKind::Other(code) => write!(f, "{}", code.trim()),
        }
    }
}

/// One line of `git status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingTreeChange {
    /// Raw two-character status code, e.g. `" M"` or `"??"`.
    pub code: String,
    /// Path text as printed by git (rename entries keep the `a -> b` form).
    pub path: String,
}

impl WorkingTreeChange {
    /// Parse a porcelain line of the form `XY <path>`.
    ///
    /// Returns `None` for lines too short to carry a code and a path.
    pub fn parse(line: &str) -> Option<Self> {
        let code = line.get(..2)?;
        let path = line.get(3..)?.trim_end();
        if path.is_empty() {
            return None;
        }
        Some(Self {
            code: code.to_owned(),
            path: path.to_owned(),
        })
    }

    /// Parse every non-empty line of porcelain output.
    pub fn parse_all(porcelain: &str) -> Vec<Self> {
        porcelain
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(Self::parse)
            .collect()
    }

    pub fn kind(&self) -> ChangeKind {
        ChangeKind::from_code(&self.code)
    }
}

// ---------------------------------------------------------------------------
// Generations
// ---------------------------------------------------------------------------

/// One row of the rebuild tool's generation listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub id: String,
    /// Build timestamp as printed by the tool (`YYYY-MM-DD HH:MM:SS`).
    pub built_at: String,
    pub current: bool,
}

// ---------------------------------------------------------------------------
// Pipeline outcome
// ---------------------------------------------------------------------------

/// Terminal record of one successful-through-rebuild run.
///
/// Built once by the orchestrator after the last step; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    pub had_changes: bool,
    pub committed: bool,
    pub pushed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    /// Active generation id after the rebuild, if the listing could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<String>,
}

/// What happened to local changes, for the final report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSummary {
    NoLocalChanges,
    CommittedAndPushed,
    CommittedPushPending,
}

impl PipelineOutcome {
    pub fn summary(&self) -> ChangeSummary {
        match (self.had_changes && self.committed, self.pushed) {
            (false, _) => ChangeSummary::NoLocalChanges,
            (true, true) => ChangeSummary::CommittedAndPushed,
            (true, false) => ChangeSummary::CommittedPushPending,
        }
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeSummary::NoLocalChanges => write!(f, "No local changes"),
            ChangeSummary::CommittedAndPushed => write!(f, "Committed and pushed"),
            ChangeSummary::CommittedPushPending => write!(f, "Committed (push pending)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
