//! `nixup generations` — recent system generations and their commits.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use nixup_core::SystemRunner;
use nixup_pipeline::{GenerationLister, Git};

/// Arguments for `nixup generations`.
#[derive(Args, Debug)]
pub struct GenerationsArgs {
    /// Configuration repository (overrides `repo_path`).
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Number of generations to show, newest first.
    #[arg(long, short = 'n', default_value_t = 10)]
    pub limit: usize,
}

#[derive(Tabled)]
struct GenerationRow {
    #[tabled(rename = "")]
    current: &'static str,
    #[tabled(rename = "gen")]
    id: String,
    #[tabled(rename = "built")]
    built_at: String,
    #[tabled(rename = "commit")]
    commit: String,
}

impl GenerationsArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config(self.repo.as_deref(), None)?;
        if !config.repo_path.is_dir() {
            bail!(
                "NixOS configuration directory not found: {}",
                config.repo_path.display()
            );
        }
        let runner = SystemRunner::new(&config.repo_path);
        let git = Git::new(&runner, &config.remote);
        let entries = GenerationLister::new(&runner, &config.rebuild).recent(&git, self.limit);
        if entries.is_empty() {
            println!("No generations found (is the rebuild tool available?).");
            return Ok(());
        }

        let rows: Vec<GenerationRow> = entries
            .into_iter()
            .map(|e| GenerationRow {
                current: if e.generation.current { "→" } else { "" },
                id: e.generation.id,
                built_at: e.generation.built_at,
                commit: e.commit_subject,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
