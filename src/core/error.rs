use std::path::PathBuf;
use thiserror::Error;

use crate::core::backends::Source;

/// Central error type for the whole tool.
/// Every module returns `Result<T, McpmError>`.
#[derive(Debug, Error)]
pub enum McpmError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Registry ────────────────────────────────────────
    /// The remote registry answered with its own error shape, or with a body
    /// we could not make sense of.
    #[error("The {registry} API returned an error: {message}")]
    Registry { registry: Source, message: String },

    #[error("{0} is not a plugin registry")]
    NotAPluginRegistry(Source),

    // ── Resolution ──────────────────────────────────────
    #[error("{0}")]
    NotAvailable(String),

    // ── Lock / manifest agreement ───────────────────────
    #[error(
        "The mcpm.lock uses loader '{locked}', but mcpm.toml specifies loader '{declared}'.\n\
         Please delete mcpm.lock in order to switch loaders."
    )]
    LoaderMismatch { locked: String, declared: String },

    #[error(
        "The mcpm.lock uses Minecraft {locked}, but mcpm.toml specifies version {declared}.\n\
         Please delete mcpm.lock in order to switch game versions."
    )]
    VersionMismatch { locked: String, declared: String },

    #[error("Plugin {0} is not in mcpm.lock; add it to mcpm.toml and run 'mcpm lock' first")]
    PluginNotLocked(String),

    #[error("Plugin {0} is declared more than once")]
    DuplicatePlugin(String),

    #[error("The mcpm.lock has no server entry; run 'mcpm lock' first")]
    MissingServer,

    // ── Integrity ───────────────────────────────────────
    #[error("{algorithm} mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("Unsupported checksum algorithm '{0}'")]
    UnsupportedChecksum(String),

    #[error("Refusing to write artifact with unsafe file name '{0}'")]
    InvalidFilename(String),

    // ── Manifest / lock files ───────────────────────────
    #[error("Invalid mcpm.toml: {0}")]
    Manifest(String),

    #[error("Invalid mcpm.lock: {0}")]
    Lock(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml_edit::TomlError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type McpmResult<T> = Result<T, McpmError>;

/// The two failure families a caller can tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Something about the request, the project files or the disk.
    Operation,
    /// A registry (or the network in front of it) misbehaved.
    Registry,
}

impl McpmError {
    /// Anything the remote side got wrong counts as a registry failure,
    /// whether the request never completed (`Http`) or came back with a bad
    /// status (`DownloadFailed`).
    pub fn category(&self) -> ErrorCategory {
        match self {
            McpmError::Registry { .. } | McpmError::Http(_) | McpmError::DownloadFailed { .. } => {
                ErrorCategory::Registry
            }
            _ => ErrorCategory::Operation,
        }
    }

    /// Build a registry error for the given backend.
    pub fn registry(registry: Source, message: impl Into<String>) -> Self {
        McpmError::Registry {
            registry,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        McpmError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for McpmError {
    fn from(source: std::io::Error) -> Self {
        McpmError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_errors_are_distinguishable_from_operation_errors() {
        let err = McpmError::registry(Source::Modrinth, "(not_found): no such project");
        assert_eq!(err.category(), ErrorCategory::Registry);
        assert_eq!(
            err.to_string(),
            "The Modrinth API returned an error: (not_found): no such project"
        );

        let err = McpmError::NotAvailable("Plugin x is not available".into());
        assert_eq!(err.category(), ErrorCategory::Operation);
    }

    #[test]
    fn bad_download_status_is_a_registry_failure() {
        let err = McpmError::DownloadFailed {
            url: "https://cdn.modrinth.com/data/x/a.jar".into(),
            status: 404,
        };
        assert_eq!(err.category(), ErrorCategory::Registry);
    }

    #[test]
    fn loader_mismatch_tells_the_user_what_to_do() {
        let err = McpmError::LoaderMismatch {
            locked: "paper".into(),
            declared: "velocity".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'paper'"));
        assert!(msg.contains("'velocity'"));
        assert!(msg.contains("delete mcpm.lock"));
    }
}
