use std::path::PathBuf;
use thiserror::Error;

use crate::core::java::RuntimeId;
use crate::core::server::ServerStatus;

/// Central error type for the entire backend.
/// Every module returns `Result<T, HostError>`.
#[derive(Debug, Error)]
pub enum HostError {
    // ── Validation ──────────────────────────────────────
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("operation '{operation}' is not valid while the server is {status}")]
    InvalidState {
        operation: &'static str,
        status: ServerStatus,
    },

    // ── Runtime resolution ──────────────────────────────
    #[error("Java {0} is not installed")]
    RuntimeNotInstalled(RuntimeId),

    #[error("failed to install Java {id}: {reason}")]
    InstallationFailed { id: RuntimeId, reason: String },

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("no download available for {0}")]
    NoDownloadAvailable(String),

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Process ─────────────────────────────────────────
    #[error("failed to spawn process: {0}")]
    Spawn(String),

    #[error("process {0} not found")]
    ProcessNotFound(u32),

    #[error("process {0} is not running")]
    ProcessNotRunning(u32),

    // ── Archive ─────────────────────────────────────────
    #[error("zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type HostResult<T> = Result<T, HostError>;

impl HostError {
    /// Wrap an IO error with the path the operation was touching.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HostError::Io {
            path: path.into(),
            source,
        }
    }
}

// ── Serialization for the presentation boundary ─────────
// Errors cross to the attached presentation layer as their display form.
impl serde::Serialize for HostError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
