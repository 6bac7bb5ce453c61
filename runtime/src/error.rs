//! Error types shared by the renderer, extractor, and log store.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`TrackerError`], stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Browser discovery or launch failed before any page was fetched.
    Setup,
    /// Navigation, network, or page evaluation failed.
    Fetch,
    /// The target widget or one of its attributes was unusable.
    Parse,
    /// A log file could not be read, locked, or written.
    Persistence,
    /// The configuration is invalid.
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Persistence => "persistence",
            Self::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("browser setup failed: {0}")]
    Setup(String),

    #[error("fetching {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("page did not render {selectors:?} within {timeout_ms}ms")]
    RenderTimeout {
        selectors: Vec<String>,
        timeout_ms: u64,
    },

    #[error("no <{tag}> element in the rendered page")]
    NotFound { tag: String },

    #[error("<{tag}> has no `{attribute}` attribute")]
    MissingAttribute { tag: String, attribute: &'static str },

    #[error("<{tag}> attribute `{attribute}` is not numeric: {value:?}")]
    Coercion {
        tag: String,
        attribute: &'static str,
        value: String,
    },

    #[error("`{tag}` is not a usable tag selector: {reason}")]
    InvalidSelector { tag: String, reason: String },

    #[error("{} does not hold a JSON array of records: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode records: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not lock {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Setup(_) => ErrorKind::Setup,
            Self::Fetch { .. } | Self::RenderTimeout { .. } => ErrorKind::Fetch,
            Self::NotFound { .. }
            | Self::MissingAttribute { .. }
            | Self::Coercion { .. }
            | Self::InvalidSelector { .. } => ErrorKind::Parse,
            Self::Decode { .. } | Self::Encode(_) | Self::Io { .. } | Self::Lock { .. } => {
                ErrorKind::Persistence
            }
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;
