//! `nixup update` — the full pull / rebuild / commit / push cycle.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use nixup_core::{
    ChangeKind, ChangeSummary, PipelineOutcome, SystemRunner, UpdateConfig, UpdateError,
    WorkingTreeChange,
};
use nixup_pipeline::{
    DisabledGenerator, GenerationLister, Git, MessageGenerator, OpenRouterGenerator, Pipeline,
    Progress, SystemSnapshot,
};

const RECENT_GENERATIONS: usize = 5;

/// Arguments for `nixup update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Configuration repository (overrides `repo_path`).
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Flake host output to build (overrides `host` and `hostname`).
    #[arg(long)]
    pub host: Option<String>,

    /// Always use the numbered fallback commit message.
    #[arg(long)]
    pub no_ai: bool,

    /// Commit but do not push.
    #[arg(long)]
    pub no_push: bool,
}

impl UpdateArgs {
    pub fn run(self) -> Result<ExitCode> {
        let config = super::load_config(self.repo.as_deref(), self.host.as_deref())?;
        let runner = SystemRunner::new(&config.repo_path);
        let generator: Box<dyn MessageGenerator> = if self.no_ai || !config.generator.enabled {
            Box::new(DisabledGenerator)
        } else {
            Box::new(OpenRouterGenerator::new(&config.generator))
        };
        let progress = TerminalProgress;
        let pipeline = Pipeline::new(&runner, generator.as_ref(), &progress, &config)
            .with_push(!self.no_push);

        if let Err(err) = pipeline.preflight() {
            report_failure(&err);
            return Ok(ExitCode::FAILURE);
        }

        println!("{}\n", "NixOS Flake Update Manager".bold().cyan());
        super::status::print_snapshot(&SystemSnapshot::capture(&runner, &config));

        match pipeline.run() {
            Ok(run) => {
                print_summary(&run.outcome);
                print_recent_generations(&runner, &config);
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                report_failure(&err);
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn report_failure(err: &UpdateError) {
    eprintln!("{} {}", "✗".red().bold(), err.to_string().red());
    if let Some(hint) = err.hint() {
        eprintln!("  {}", hint.dimmed());
    }
}

// ---------------------------------------------------------------------------
// Terminal progress
// ---------------------------------------------------------------------------

struct TerminalProgress;

fn rule() -> String {
    "─".repeat(61).dimmed().to_string()
}

impl Progress for TerminalProgress {
    fn step(&self, message: &str) {
        println!("\n{} {}", "==>".blue().bold(), message.bold());
    }

    fn info(&self, message: &str) {
        println!("  {} {message}", "•".blue());
    }

    fn success(&self, message: &str) {
        println!("  {} {message}", "✓".green().bold());
    }

    fn warning(&self, message: &str) {
        println!("  {} {}", "⚠".yellow().bold(), message.yellow());
    }

    fn changes(&self, changes: &[WorkingTreeChange]) {
        for change in changes {
            let mark = match change.kind() {
                ChangeKind::New => "+ (new)     ".green(),
                ChangeKind::Modified => "~ (modified)".yellow(),
                ChangeKind::Deleted => "- (deleted) ".red(),
                ChangeKind::Other(code) => format!("? ({})", code.trim()).blue(),
            };
            println!("    {mark} {}", change.path);
        }
    }

    fn rebuild_started(&self, flake_ref: &str) {
        println!("\n{} {}", "==>".blue().bold(), "Rebuilding NixOS configuration".bold());
        println!("  {} Flake: {flake_ref}", "•".blue());
        println!("{}", rule());
    }

    fn rebuild_finished(&self, _success: bool) {
        println!("{}", rule());
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

fn print_summary(outcome: &PipelineOutcome) {
    println!("\n{}", "Update Complete".bold().green());
    println!("  {}", "Summary:".bold());
    println!(
        "  • Generation: {}",
        outcome.generation.as_deref().unwrap_or("?").green()
    );
    println!(
        "  • Last commit: {}",
        outcome.last_commit.as_deref().unwrap_or("None").cyan()
    );
    let summary = outcome.summary();
    let changes = summary.to_string();
    let changes = match summary {
        ChangeSummary::CommittedAndPushed => changes.green(),
        ChangeSummary::CommittedPushPending => changes.yellow(),
        ChangeSummary::NoLocalChanges => changes.dimmed(),
    };
    println!("  • Changes: {changes}");
}

fn print_recent_generations(runner: &SystemRunner, config: &UpdateConfig) {
    let git = Git::new(runner, &config.remote);
    let entries = GenerationLister::new(runner, &config.rebuild).recent(&git, RECENT_GENERATIONS);
    if entries.is_empty() {
        return;
    }

    println!("\n  {}", "Recent Generations:".bold());
    println!("  {}", format!("  {:<4}  {:<19}  Commit", "Gen", "Built").dimmed());
    for entry in entries {
        let g = &entry.generation;
        if g.current {
            let line = format!("→ {:<4}  {:<19}  {}", g.id, g.built_at, entry.commit_subject);
            println!("  {}", line.green());
        } else {
            let line = format!("  {:<4}  {:<19}  {}", g.id, g.built_at, entry.commit_subject);
            println!("  {}", line.dimmed());
        }
    }
    println!();
}
