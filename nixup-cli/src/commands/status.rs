//! `nixup status` — host and repository overview.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use nixup_core::SystemRunner;
use nixup_pipeline::SystemSnapshot;

/// Arguments for `nixup status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Configuration repository (overrides `repo_path`).
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config(self.repo.as_deref(), None)?;
        if !config.repo_path.is_dir() {
            bail!(
                "NixOS configuration directory not found: {}",
                config.repo_path.display()
            );
        }
        let runner = SystemRunner::new(&config.repo_path);
        let snapshot = SystemSnapshot::capture(&runner, &config);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&snapshot)
                    .context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_snapshot(&snapshot);
        Ok(())
    }
}

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "")]
    field: &'static str,
    #[tabled(rename = "")]
    value: String,
}

pub fn print_snapshot(snapshot: &SystemSnapshot) {
    let rows = vec![
        SnapshotRow {
            field: "Hostname",
            value: snapshot.hostname.green().to_string(),
        },
        SnapshotRow {
            field: "Generation",
            value: snapshot
                .generation
                .as_deref()
                .unwrap_or("?")
                .green()
                .to_string(),
        },
        SnapshotRow {
            field: "Kernel",
            value: snapshot.kernel.green().to_string(),
        },
        SnapshotRow {
            field: "Branch",
            value: or_unknown(&snapshot.branch).yellow().to_string(),
        },
        SnapshotRow {
            field: "Total commits",
            value: snapshot.total_commits.to_string().yellow().to_string(),
        },
        SnapshotRow {
            field: "Local changes",
            value: format!("{} file(s)", snapshot.local_changes)
                .yellow()
                .to_string(),
        },
        SnapshotRow {
            field: "Last commit",
            value: snapshot
                .last_commit
                .as_deref()
                .unwrap_or("No commits")
                .dimmed()
                .to_string(),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}\n");
}

fn or_unknown(s: &str) -> &str {
    if s.is_empty() {
        "unknown"
    } else {
        s
    }
}
