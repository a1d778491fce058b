//! Change Stager: stage every local edit as the next commit's contents.

use nixup_core::{GitOperation, UpdateError, WorkingTreeChange};

use crate::git::Git;
use crate::progress::Progress;

/// Stage all local changes with `git add -A`.
///
/// Returns the manifest that was staged; empty means there was nothing to
/// do and nothing was run.
pub fn stage_local_changes(
    git: &Git<'_>,
    progress: &dyn Progress,
) -> Result<Vec<WorkingTreeChange>, UpdateError> {
    let changes = git.status();
    if changes.is_empty() {
        tracing::debug!("working tree clean, nothing to stage");
        return Ok(changes);
    }

    progress.step("Local changes detected");
    progress.changes(&changes);
    if !git.add_all() {
        return Err(UpdateError::git_with_hint(
            GitOperation::Stage,
            "Could not stage changes. Check repository permissions, then run: git add -A",
        ));
    }
    tracing::debug!(count = changes.len(), "staged local changes");
    Ok(changes)
}
