//! Commit Producer: turn the staged index into a commit.

use nixup_core::config::CommitConfig;
use nixup_core::{GitOperation, UpdateError};

use crate::git::Git;
use crate::message::MessageGenerator;
use crate::progress::Progress;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    Committed { message: String },
    NothingStaged,
}

pub struct CommitProducer<'a> {
    git: &'a Git<'a>,
    generator: &'a dyn MessageGenerator,
    config: &'a CommitConfig,
}

impl<'a> CommitProducer<'a> {
    pub fn new(
        git: &'a Git<'a>,
        generator: &'a dyn MessageGenerator,
        config: &'a CommitConfig,
    ) -> Self {
        Self {
            git,
            generator,
            config,
        }
    }

    pub fn run(&self, progress: &dyn Progress) -> Result<CommitResult, UpdateError> {
        if !self.git.has_staged() {
            tracing::debug!("nothing staged, skipping commit");
            return Ok(CommitResult::NothingStaged);
        }

        progress.step("Committing changes");
        let message = self.resolve_message(progress);
        if !self.git.commit(&message) {
            return Err(UpdateError::git_with_hint(
                GitOperation::Commit,
                format!("Changes are still staged. Commit manually: git commit -m \"{message}\""),
            ));
        }
        progress.success(&format!("Committed: {message}"));
        Ok(CommitResult::Committed { message })
    }

    /// Generated message if one is available, numbered fallback otherwise.
    fn resolve_message(&self, progress: &dyn Progress) -> String {
        let diff_stat = self.git.diff_stat(self.config.diff_stat_lines);
        if !diff_stat.is_empty() {
            if let Some(raw) = self.generator.generate(&diff_stat) {
                let message = sanitize(&raw, self.config.max_message_len);
                if !message.is_empty() {
                    return message;
                }
                tracing::warn!("generated message was empty after sanitizing");
            }
        }
        let fallback = self.fallback_message();
        progress.info(&format!("Using fallback message: {fallback}"));
        fallback
    }

    fn fallback_message(&self) -> String {
        let prefix = &self.config.fallback_prefix;
        let n = self
            .git
            .last_subject()
            .and_then(|s| leading_number(&s, prefix))
            .and_then(|n| n.checked_add(1))
            .unwrap_or_else(|| next_sequence_number(&self.git.subjects(), prefix));
        format!("{prefix}{n}")
    }
}

/// Highest `<prefix><n>` anywhere in `subjects`, plus one; 1 if none.
/// Numbers with no successor in `u64` are ignored.
pub fn next_sequence_number(subjects: &[String], prefix: &str) -> u64 {
    subjects
        .iter()
        .flat_map(|s| {
            s.match_indices(prefix)
                .filter_map(move |(i, _)| leading_number(&s[i..], prefix))
        })
        .filter_map(|n| n.checked_add(1))
        .max()
        .unwrap_or(1)
}

/// `n` if `subject` starts with `<prefix><digits>`.
fn leading_number(subject: &str, prefix: &str) -> Option<u64> {
    let rest = subject.strip_prefix(prefix)?;
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Strip newlines and double quotes, trim, and cut to `max` characters.
pub fn sanitize(raw: &str, max: usize) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '"'))
        .collect();
    cleaned.trim().chars().take(max).collect::<String>().trim_end().to_owned()
}
