//! Update configuration, stored as YAML.
//!
//! # Storage layout
//!
//! ```text
//! ~/.nixup/
//!   config.yaml    (mode 0600, written by `nixup init`)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home, used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! A missing file is not an error: [`load_at`] returns the defaults for that
//! home. Every field carries a serde default so partial files load.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-5-nano";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Flake repository holding the machine configuration; empty in the
    /// file means `<home>/nixos`.
    #[serde(default)]
    pub repo_path: PathBuf,
    /// Flake output to build; `None` means "ask `hostname`".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default)]
    pub rebuild: RebuildConfig,
    #[serde(default)]
    pub commit: CommitConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebuildConfig {
    /// Privileged rebuild tool argv prefix.
    pub command: Vec<String>,
    pub action: String,
    pub impure: bool,
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            command: vec!["sudo".into(), "nixos-rebuild".into()],
            action: "switch".into(),
            impure: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    /// Prefix of numbered fallback messages (`Update #12`).
    pub fallback_prefix: String,
    /// Lines of `git diff --cached --stat` handed to the generator.
    pub diff_stat_lines: usize,
    /// Generated messages are cut to this many characters.
    pub max_message_len: usize,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            fallback_prefix: "Update #".into(),
            diff_stat_lines: 20,
            max_message_len: 72,
        }
    }
}

/// Where the generator's API key comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CredentialSource {
    /// Read and trim the contents of a file.
    File { path: PathBuf },
    /// Read an environment variable.
    Env { var: String },
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub credential: CredentialSource,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.into(),
            model: DEFAULT_MODEL.into(),
            max_tokens: 2000,
            timeout_secs: 30,
            credential: CredentialSource::None,
        }
    }
}

impl GeneratorConfig {
    fn for_home(home: &Path) -> Self {
        Self {
            credential: CredentialSource::File {
                path: default_key_file(home),
            },
            ..Self::default()
        }
    }
}

impl UpdateConfig {
    /// Defaults rooted at `home`: repo at `<home>/nixos`, key file under
    /// `<home>/.config/secrets/`.
    pub fn default_for_home(home: &Path) -> Self {
        Self {
            repo_path: home.join("nixos"),
            host: None,
            remote: default_remote(),
            rebuild: RebuildConfig::default(),
            commit: CommitConfig::default(),
            generator: GeneratorConfig::for_home(home),
        }
    }

    /// `<repo>#<host>` locator passed to the rebuild tool.
    pub fn flake_ref(&self, host: &str) -> String {
        format!("{}#{}", self.repo_path.display(), host)
    }
}

fn default_remote() -> String {
    DEFAULT_REMOTE.to_owned()
}

fn default_key_file(home: &Path) -> PathBuf {
    home.join(".config").join("secrets").join("openrouter_api_key")
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.nixup/`
pub fn config_dir_at(home: &Path) -> PathBuf {
    home.join(".nixup")
}

/// `<home>/.nixup/config.yaml` (pure, no I/O).
pub fn config_path_at(home: &Path) -> PathBuf {
    config_dir_at(home).join("config.yaml")
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load `<home>/.nixup/config.yaml`, or the defaults for `home` if absent.
///
/// Returns `ConfigError::Parse` (with path) if the file is malformed.
pub fn load_at(home: &Path) -> Result<UpdateConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(UpdateConfig::default_for_home(home));
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let mut config: UpdateConfig =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?;
    if config.repo_path.as_os_str().is_empty() {
        config.repo_path = home.join("nixos");
    }
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<UpdateConfig, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the config to `<home>/.nixup/config.yaml`.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &UpdateConfig) -> Result<PathBuf, ConfigError> {
    let dir = config_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(&path, e));
    }
    Ok(path)
}

/// Write a fresh config unless one exists (or `force` is set).
pub fn init_at(home: &Path, config: &UpdateConfig, force: bool) -> Result<PathBuf, ConfigError> {
    let path = config_path_at(home);
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists { path });
    }
    save_at(home, config)
}

/// Home directory from `dirs::home_dir()`.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
