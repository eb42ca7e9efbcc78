//! Error taxonomy for the map pipeline.
//!
//! Row-level validation problems are not errors: they are collected as
//! [`crate::data::SkippedRow`] values and reported in the ingestion summary.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse error category, used for user-facing messages and exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Boundary source unreachable or answered with a non-success status
    Fetch,
    /// Malformed table or malformed geodata payload
    Parse,
    /// Remote artifact changed since it was read
    PublishConflict,
    /// Any other publishing failure
    Publish,
    /// Local file system failure
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Fetch => "fetch",
            ErrorKind::Parse => "parse",
            ErrorKind::PublishConflict => "publish_conflict",
            ErrorKind::Publish => "publish",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("[fetch] boundary layer '{layer}' could not be fetched from {location}: {reason}")]
    Fetch {
        layer: String,
        location: String,
        reason: String,
    },

    #[error("[parse] {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("[publish_conflict] {path} changed on the remote since it was read; re-fetch and retry")]
    PublishConflict { path: String },

    #[error("[publish] {path}: {reason}")]
    Publish { path: String, reason: String },

    #[error("[io] {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MapError::Fetch { .. } => ErrorKind::Fetch,
            MapError::Parse { .. } => ErrorKind::Parse,
            MapError::PublishConflict { .. } => ErrorKind::PublishConflict,
            MapError::Publish { .. } => ErrorKind::Publish,
            MapError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn fetch(layer: impl Into<String>, location: impl Into<String>, reason: impl fmt::Display) -> Self {
        MapError::Fetch {
            layer: layer.into(),
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(what: impl Into<String>, reason: impl fmt::Display) -> Self {
        MapError::Parse {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn publish(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        MapError::Publish {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MapError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MapError>;
