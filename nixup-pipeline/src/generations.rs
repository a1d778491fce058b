//! Generation listing from `nixos-rebuild list-generations`.
//!
//! The table looks like:
//!
//! ```text
//! Generation  Build-date           NixOS version  Kernel  ...  Current
//! 42          2025-01-03 09:12:44  24.11          6.6.52  ...  True
//! 41          2025-01-02 18:01:10  24.11          6.6.52  ...  False
//! ```
//!
//! Rows are newest first. The current row is the one whose last column is
//! the literal `True`.

use chrono::NaiveDateTime;
use serde::Serialize;

use nixup_core::config::RebuildConfig;
use nixup_core::{CommandRunner, Generation};

use crate::git::Git;

const BUILD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SUBJECT_WIDTH: usize = 45;

/// A generation annotated with the commit it was most likely built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationEntry {
    #[serde(flatten)]
    pub generation: Generation,
    pub commit_subject: String,
}

/// Parse every data row; the header and blank lines are skipped.
pub fn parse_generations(table: &str) -> Vec<Generation> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            let id = *cols.first()?;
            let built_at = match (cols.get(1), cols.get(2)) {
                (Some(date), Some(time)) => format!("{date} {time}"),
                _ => String::new(),
            };
            Some(Generation {
                id: id.to_owned(),
                built_at,
                current: line.trim_end().ends_with("True"),
            })
        })
        .collect()
}

/// Id of the row marked current, if any.
pub fn current_generation(table: &str) -> Option<String> {
    table
        .lines()
        .find(|l| l.trim_end().ends_with("True"))
        .and_then(|l| l.split_whitespace().next())
        .map(str::to_owned)
}

/// Reads the generation table through the configured rebuild tool.
pub struct GenerationLister<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a RebuildConfig,
}

impl<'a> GenerationLister<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a RebuildConfig) -> Self {
        Self { runner, config }
    }

    fn table(&self) -> Option<String> {
        let mut argv: Vec<&str> = self.config.command.iter().map(String::as_str).collect();
        argv.push("list-generations");
        let out = self.runner.run(&argv);
        if !out.success {
            tracing::warn!(stderr = %out.stderr, "could not list generations");
            return None;
        }
        Some(out.stdout)
    }

    pub fn list(&self) -> Vec<Generation> {
        self.table().map(|t| parse_generations(&t)).unwrap_or_default()
    }

    pub fn current(&self) -> Option<String> {
        self.table().and_then(|t| current_generation(&t))
    }

    /// The newest `limit` generations, each paired with the subject of the
    /// last commit made at or before its build time.
    pub fn recent(&self, git: &Git<'_>, limit: usize) -> Vec<GenerationEntry> {
        self.list()
            .into_iter()
            .take(limit)
            .map(|generation| {
                let commit_subject = if is_build_date(&generation.built_at) {
                    truncate_chars(&git.subject_before(&generation.built_at), SUBJECT_WIDTH)
                } else {
                    String::new()
                };
                GenerationEntry {
                    generation,
                    commit_subject,
                }
            })
            .collect()
    }
}

fn is_build_date(s: &str) -> bool {
    NaiveDateTime::parse_from_str(s, BUILD_DATE_FORMAT).is_ok()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
