//! Rebuild Executor: apply the flake to the running system.

use nixup_core::config::RebuildConfig;
use nixup_core::{CommandRunner, UpdateError};

use crate::git::Git;
use crate::progress::Progress;

pub struct RebuildExecutor<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a RebuildConfig,
}

impl<'a> RebuildExecutor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a RebuildConfig) -> Self {
        Self { runner, config }
    }

    /// `<command…> <action> --flake <flake_ref> [--impure]`
    pub fn argv(&self, flake_ref: &str) -> Vec<String> {
        let mut argv = self.config.command.clone();
        argv.push(self.config.action.clone());
        argv.push("--flake".into());
        argv.push(flake_ref.into());
        if self.config.impure {
            argv.push("--impure".into());
        }
        argv
    }

    /// Run the rebuild with output streamed to the terminal.
    ///
    /// On failure, anything staged is unstaged before [`UpdateError::Rebuild`]
    /// is returned, so a configuration that did not build is never committed.
    pub fn run(
        &self,
        git: &Git<'_>,
        flake_ref: &str,
        progress: &dyn Progress,
    ) -> Result<(), UpdateError> {
        let argv = self.argv(flake_ref);
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();

        progress.rebuild_started(flake_ref);
        let success = self.runner.run_live(&argv);
        progress.rebuild_finished(success);
        if success {
            return Ok(());
        }

        if rollback_staged(git) {
            progress.warning("Unstaged changes so the failed configuration is not committed");
        }
        Err(UpdateError::Rebuild)
    }
}

/// Reset the index to HEAD if anything is staged. Returns whether a reset
/// ran. Safe to call repeatedly.
pub fn rollback_staged(git: &Git<'_>) -> bool {
    if !git.has_staged() {
        return false;
    }
    if !git.reset_index() {
        tracing::warn!("git reset HEAD failed; staged changes left in place");
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentProgress;
    use nixup_core::fakes::{FailPoint, FakeHost};

    #[test]
    fn argv_carries_flake_and_impure() {
        let host = FakeHost::new();
        let cfg = RebuildConfig::default();
        let exec = RebuildExecutor::new(&host, &cfg);
        assert_eq!(
            exec.argv("/home/me/nixos#desktop"),
            vec![
                "sudo",
                "nixos-rebuild",
                "switch",
                "--flake",
                "/home/me/nixos#desktop",
                "--impure"
            ]
        );
    }

    #[test]
    fn pure_rebuild_omits_flag() {
        let host = FakeHost::new();
        let cfg = RebuildConfig {
            impure: false,
            action: "boot".into(),
            ..RebuildConfig::default()
        };
        let argv = RebuildExecutor::new(&host, &cfg).argv("r#h");
        assert_eq!(argv.last().map(String::as_str), Some("r#h"));
        assert!(argv.contains(&"boot".to_owned()));
    }

    #[test]
    fn success_leaves_index_alone() {
        let host = FakeHost::new().with_staged("M ", "a.nix");
        let git = Git::new(&host, "origin");
        let cfg = RebuildConfig::default();
        RebuildExecutor::new(&host, &cfg)
            .run(&git, "r#h", &SilentProgress)
            .unwrap();
        assert_eq!(host.state().staged.len(), 1);
        assert_eq!(host.state().live_calls.len(), 1);
    }

    #[test]
    fn failure_unstages_and_rollback_is_idempotent() {
        let host = FakeHost::new()
            .with_staged("M ", "a.nix")
            .failing(FailPoint::Rebuild);
        let git = Git::new(&host, "origin");
        let cfg = RebuildConfig::default();

        let err = RebuildExecutor::new(&host, &cfg)
            .run(&git, "r#h", &SilentProgress)
            .unwrap_err();
        assert_eq!(err, UpdateError::Rebuild);
        assert!(host.state().staged.is_empty());
        assert_eq!(host.state().unstaged.len(), 1);

        assert!(!rollback_staged(&git));
        assert!(host.state().staged.is_empty());
        assert_eq!(host.count_calls(&["git", "reset"]), 1);
    }
}
