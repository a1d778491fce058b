use nixup_core::fakes::{FailPoint, FakeHost, FakeState, StashEntry};
use nixup_core::{ChangeSummary, GitOperation, UpdateConfig, UpdateError};
use nixup_pipeline::git::Git;
use nixup_pipeline::progress::RecordingProgress;
use nixup_pipeline::rebuild::rollback_staged;
use nixup_pipeline::{
    DisabledGenerator, MessageGenerator, Pipeline, PipelineRun, SilentProgress, SyncReport,
    Synchronizer,
};
use tempfile::TempDir;

struct Canned(&'static str);

impl MessageGenerator for Canned {
    fn generate(&self, _diff_stat: &str) -> Option<String> {
        Some(self.0.to_owned())
    }
}

fn repo_config(repo: &TempDir) -> UpdateConfig {
    let mut cfg = UpdateConfig::default_for_home(repo.path());
    cfg.repo_path = repo.path().to_path_buf();
    cfg
}

fn run(
    host: &FakeHost,
    generator: &dyn MessageGenerator,
) -> Result<PipelineRun, UpdateError> {
    let repo = TempDir::new().expect("repo");
    let cfg = repo_config(&repo);
    Pipeline::new(host, generator, &SilentProgress, &cfg).run()
}

fn synchronize(host: &FakeHost) -> Result<SyncReport, UpdateError> {
    let git = Git::new(host, "origin");
    Synchronizer::new(&git, &SilentProgress).run("nixup-autostash-1")
}

// ---- synchronizer ----

#[test]
fn zero_behind_never_stashes_pulls_or_pushes() {
    for host in [
        FakeHost::new(),
        FakeHost::new().with_unstaged(" M", "configuration.nix"),
        FakeHost::new().with_staged("M ", "flake.lock"),
    ] {
        assert_eq!(synchronize(&host).expect("sync"), SyncReport::UpToDate);
        assert_eq!(host.count_calls(&["git", "stash"]), 0);
        assert_eq!(host.count_calls(&["git", "pull"]), 0);
        assert_eq!(host.count_calls(&["git", "push"]), 0);
    }
}

#[test]
fn clean_tree_behind_pulls_once_without_stash() {
    for n in [1, 2, 7] {
        let host = FakeHost::new().behind(n);
        assert_eq!(
            synchronize(&host).expect("sync"),
            SyncReport::Pulled { commits: n }
        );
        assert_eq!(host.count_calls(&["git", "pull", "--rebase"]), 1);
        assert_eq!(host.count_calls(&["git", "stash", "push"]), 0);
        assert_eq!(host.state().commits[0], format!("Remote change {n}"));
    }
}

#[test]
fn dirty_tree_stashes_before_pull_and_pops_after() {
    let host = FakeHost::new()
        .behind(2)
        .with_unstaged(" M", "hosts/desktop.nix");

    let report = synchronize(&host).expect("sync");
    assert_eq!(
        report,
        SyncReport::PulledWithStash {
            commits: 2,
            label: "nixup-autostash-1".into()
        }
    );

    let stash = host.position(&["git", "stash", "push"]).expect("stash");
    let pull = host.position(&["git", "pull", "--rebase"]).expect("pull");
    let pop = host.position(&["git", "stash", "pop"]).expect("pop");
    assert!(stash < pull && pull < pop);

    let state = host.state();
    assert!(state.stashes.is_empty());
    assert_eq!(state.unstaged[0].path, "hosts/desktop.nix");
}

#[test]
fn conflicting_pop_keeps_stash_and_explains_recovery() {
    let host = FakeHost::new()
        .behind(1)
        .with_unstaged(" M", "configuration.nix")
        .failing(FailPoint::StashPop);

    let err = synchronize(&host).expect_err("pop conflict");
    assert_eq!(
        err,
        UpdateError::git_with_hint(
            GitOperation::StashPop,
            "Conflict restoring local changes. Run: git stash show -p, resolve, then git stash drop"
        )
    );
    let state = host.state();
    assert_eq!(state.stashes.len(), 1);
    assert_eq!(state.stashes[0].label, "nixup-autostash-1");
}

#[test]
fn pull_failure_restores_stash_and_reports_pull() {
    let host = FakeHost::new()
        .behind(1)
        .with_unstaged(" M", "configuration.nix")
        .failing(FailPoint::Pull);

    let err = synchronize(&host).expect_err("pull conflict");
    assert_eq!(err.operation(), "pull");
    assert_eq!(
        err.hint(),
        Some("Conflicts detected. Resolve manually: git rebase origin/main")
    );
    let state = host.state();
    assert!(state.stashes.is_empty());
    assert_eq!(state.unstaged.len(), 1);
}

#[test]
fn pull_failure_with_failed_restore_names_the_stash() {
    let host = FakeHost::new()
        .behind(1)
        .with_unstaged(" M", "configuration.nix")
        .failing(FailPoint::Pull)
        .failing(FailPoint::StashPop);

    let err = synchronize(&host).expect_err("pull conflict");
    assert_eq!(err.operation(), "pull");
    let hint = err.hint().expect("hint");
    assert!(hint.contains("stash 'nixup-autostash-1'"));
    assert!(hint.contains("git stash pop"));
    assert_eq!(host.state().stashes.len(), 1);
}

#[test]
fn pre_existing_stash_is_never_popped() {
    // Ignored entries are reported dirty but never saved by the stash.
    let state = FakeState {
        stashes: vec![StashEntry {
            label: "older work".into(),
            changes: Vec::new(),
        }],
        ..FakeState::default()
    };
    let host = FakeHost::from_state(state)
        .behind(1)
        .with_unstaged("!!", "result");

    synchronize(&host).expect("sync");
    assert_eq!(host.count_calls(&["git", "stash", "push"]), 1);
    assert_eq!(host.count_calls(&["git", "stash", "pop"]), 0);
    let state = host.state();
    assert_eq!(state.stashes.len(), 1);
    assert_eq!(state.stashes[0].label, "older work");
}

// ---- rebuild / commit ----

#[test]
fn rollback_after_failed_rebuild_is_idempotent() {
    let host = FakeHost::new()
        .with_unstaged(" M", "configuration.nix")
        .with_unstaged("??", "modules/gpu.nix")
        .failing(FailPoint::Rebuild);

    let err = run(&host, &DisabledGenerator).expect_err("rebuild fails");
    assert_eq!(err, UpdateError::Rebuild);
    assert_eq!(err.operation(), "rebuild");
    assert!(host.state().staged.is_empty());

    let git = Git::new(&host, "origin");
    rollback_staged(&git);
    rollback_staged(&git);
    let state = host.state();
    assert!(state.staged.is_empty());
    assert_eq!(state.unstaged.len(), 2);
    assert_eq!(host.count_calls(&["git", "commit"]), 0);
}

#[test]
fn commit_failure_aborts_without_push() {
    let host = FakeHost::new()
        .with_unstaged(" M", "configuration.nix")
        .failing(FailPoint::Commit);

    let err = run(&host, &DisabledGenerator).expect_err("commit fails");
    assert_eq!(err.operation(), "commit");
    assert_eq!(host.count_calls(&["git", "push"]), 0);
    assert_eq!(host.state().staged.len(), 1);
}

#[test]
fn generated_message_is_used_when_available() {
    let host = FakeHost::new().with_unstaged(" M", "flake.lock");
    let run = run(&host, &Canned("Bump nixpkgs input")).expect("run");
    assert_eq!(run.outcome.commit_message.as_deref(), Some("Bump nixpkgs input"));
    assert_eq!(host.state().commits[0], "Bump nixpkgs input");
}

// ---- end to end ----

#[test]
fn clean_and_current_reports_no_local_changes() {
    let host = FakeHost::new();
    let repo = TempDir::new().expect("repo");
    let cfg = repo_config(&repo);
    let progress = RecordingProgress::new();

    let run = Pipeline::new(&host, &DisabledGenerator, &progress, &cfg)
        .run()
        .expect("run");
    let outcome = run.outcome;
    assert!(!outcome.had_changes);
    assert!(!outcome.committed);
    assert!(!outcome.pushed);
    assert_eq!(outcome.summary(), ChangeSummary::NoLocalChanges);
    assert_eq!(outcome.generation.as_deref(), Some("2"));
    assert_eq!(host.count_calls(&["git", "commit"]), 0);
    assert!(progress
        .events()
        .contains(&"info: Current generation: 2".to_owned()));

    let live = &host.state().live_calls[0];
    assert!(live.contains(&"--impure".to_owned()));
    assert_eq!(live[4], format!("{}#desktop", repo.path().display()));
}

#[test]
fn dirty_behind_with_failed_push_reports_push_pending() {
    let host = FakeHost::new()
        .behind(2)
        .with_unstaged(" M", "hosts/desktop.nix")
        .failing(FailPoint::Push)
        .with_commits(["Update #3", "Update #1"]);

    let run = run(&host, &DisabledGenerator).expect("push failure is not fatal");
    let outcome = run.outcome;
    assert!(outcome.had_changes);
    assert!(outcome.committed);
    assert!(!outcome.pushed);
    assert_eq!(outcome.summary(), ChangeSummary::CommittedPushPending);
    assert_eq!(outcome.summary().to_string(), "Committed (push pending)");

    let state = host.state();
    assert!(state.stashes.is_empty());
    assert_eq!(state.ahead, 1);
    assert_eq!(state.commits[0], "Update #4");
}

#[test]
fn successful_push_reports_committed_and_pushed() {
    let host = FakeHost::new().with_unstaged("??", "modules/new.nix");
    let run = run(&host, &DisabledGenerator).expect("run");
    assert_eq!(run.outcome.summary(), ChangeSummary::CommittedAndPushed);
    assert_eq!(host.state().pushed, vec!["main".to_owned()]);
    assert!(run
        .outcome
        .last_commit
        .as_deref()
        .is_some_and(|l| l.ends_with("Update #2")));
}
