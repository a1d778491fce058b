//! `nixup init [--repo <path>] [--host <name>] [--force]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use nixup_core::{config, UpdateConfig};

/// Write a fresh ~/.nixup/config.yaml.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Flake repository holding the machine configuration (default ~/nixos).
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Flake host output to build (default: the machine's hostname).
    #[arg(long)]
    pub host: Option<String>,

    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let mut cfg = UpdateConfig::default_for_home(&home);
        super::apply_overrides(&mut cfg, self.repo.as_deref(), self.host.as_deref())?;

        let path = config::init_at(&home, &cfg, self.force)
            .with_context(|| format!("failed to write config under '{}'", home.display()))?;

        println!("✓ Wrote {}", path.display());
        println!("  Repository: {}", cfg.repo_path.display());
        if let Some(host) = &cfg.host {
            println!("  Host: {host}");
        }
        Ok(())
    }
}
