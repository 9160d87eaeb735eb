//! # BbsError
//!
//! Centralized error handling for the data-access layer.
//! The facade relies on the not-found / format distinction: a missing
//! article index is an empty board, a malformed one never is.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::traits::Capability;

/// The primary error type for all bbs-core operations.
#[derive(Debug, Error)]
pub enum BbsError {
    /// Configuration error: no driver registered under the given name.
    #[error("driver `{0}` is not registered")]
    DriverNotFound(String),

    /// A driver's `open` failed (bad data-source string, missing root, ...).
    #[error("driver `{driver}` failed to open")]
    DriverOpen {
        driver: String,
        #[source]
        source: Box<BbsError>,
    },

    /// A resolved path does not exist.
    #[error("{}: no such record file", .0.display())]
    NotFound(PathBuf),

    /// Bytes at a resolved path do not match the expected record layout.
    #[error("malformed record file {}: {detail}", .path.display())]
    Format { path: PathBuf, detail: String },

    /// The bound driver does not implement the required optional capability.
    #[error("driver does not support {0}")]
    CapabilityMissing(Capability),

    /// Operation intentionally stubbed out in the baseline facade.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// I/O failure other than not-found.
    #[error("i/o error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A lower-level error tagged with the facade operation that hit it.
    #[error("{op} failed")]
    Op {
        op: &'static str,
        #[source]
        source: Box<BbsError>,
    },

    /// Driver-internal failure with no finer classification.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BbsError {
    /// Classifies an I/O error against the path it occurred on.
    /// `ErrorKind::NotFound` becomes [`BbsError::NotFound`] so the facade
    /// can apply its missing-index tolerance.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            BbsError::NotFound(path)
        } else {
            BbsError::Io { path, source }
        }
    }

    pub fn format(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        BbsError::Format {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// True if this error is a not-found, looking through operation tags.
    pub fn is_not_found(&self) -> bool {
        match self {
            BbsError::NotFound(_) => true,
            BbsError::Op { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    pub(crate) fn op(self, op: &'static str) -> Self {
        BbsError::Op {
            op,
            source: Box::new(self),
        }
    }
}

/// A specialized Result type for bbs-core logic.
pub type Result<T> = std::result::Result<T, BbsError>;
