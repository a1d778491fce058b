pub mod generations;
pub mod init;
pub mod status;
pub mod update;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nixup_core::{config, UpdateConfig};

/// `~/.nixup/config.yaml` (or defaults) with command-line overrides applied.
pub fn load_config(repo: Option<&Path>, host: Option<&str>) -> Result<UpdateConfig> {
    let mut cfg = config::load().context("failed to load ~/.nixup/config.yaml")?;
    apply_overrides(&mut cfg, repo, host)?;
    Ok(cfg)
}

pub fn apply_overrides(cfg: &mut UpdateConfig, repo: Option<&Path>, host: Option<&str>) -> Result<()> {
    if let Some(repo) = repo {
        cfg.repo_path = absolute(repo)?;
    }
    if let Some(host) = host {
        cfg.host = Some(host.to_owned());
    }
    Ok(())
}

/// The flake locator needs an absolute path; the directory may not exist.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("cannot read current directory")?;
    Ok(cwd.join(path))
}
