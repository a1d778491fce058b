//! Error types for nixup.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or saving `~/.nixup/config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, read-only filesystem, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// `init` refused to replace an existing file.
    #[error("config already exists at {path}; pass --force to overwrite")]
    AlreadyExists { path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

/// Version-control operation that produced a typed failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitOperation {
    Fetch,
    Stash,
    Pull,
    StashPop,
    Stage,
    Commit,
    Push,
}

impl GitOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            GitOperation::Fetch => "fetch",
            GitOperation::Stash => "stash",
            GitOperation::Pull => "pull",
            GitOperation::StashPop => "stash-pop",
            GitOperation::Stage => "stage",
            GitOperation::Commit => "commit",
            GitOperation::Push => "push",
        }
    }

    /// Whether a failure of this operation stops the pipeline.
    pub fn is_fatal(self) -> bool {
        !matches!(self, GitOperation::Push)
    }
}

impl fmt::Display for GitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure of an update run.
///
/// Carries only what the operator needs to recover: the failing operation
/// and an optional manual-recovery instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    #[error("Git operation failed: {operation}")]
    Git {
        operation: GitOperation,
        hint: Option<String>,
    },

    #[error("NixOS rebuild failed! Check the output above and fix the issues.")]
    Rebuild,

    #[error("NixOS configuration directory not found: {path}")]
    RepoMissing { path: PathBuf },

    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    #[error("could not determine host name for the flake target; set `host` in the config")]
    HostUnknown,
}

impl UpdateError {
    pub fn git_with_hint(operation: GitOperation, hint: impl Into<String>) -> Self {
        UpdateError::Git {
            operation,
            hint: Some(hint.into()),
        }
    }

    /// Short name of the failing operation (`"fetch"`, `"rebuild"`, ...).
    pub fn operation(&self) -> &'static str {
        match self {
            UpdateError::Git { operation, .. } => operation.as_str(),
            UpdateError::Rebuild => "rebuild",
            UpdateError::RepoMissing { .. } | UpdateError::NotARepository { .. } => "preflight",
            UpdateError::HostUnknown => "host",
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            UpdateError::Git { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }
}
