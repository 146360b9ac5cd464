//! Error taxonomy shared by the controller, recorders, and configuration.
//!
//! Only setup and I/O problems are errors. A sub-iteration loop that runs out
//! of iterations is reported as data on the step report, never through this type.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchwarzError {
    /// Malformed or inconsistent setup. Fatal, raised at construction time.
    #[error("configuration error in `{field}`: {reason}")]
    Configuration { field: String, reason: String },

    /// An output or input target could not be opened, written, or read.
    #[error("I/O error on {}: {source}", target.display())]
    Io {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data handed to a recorder (or found by a reader) violates the binary format.
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

pub type Result<T> = std::result::Result<T, SchwarzError>;

impl SchwarzError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SchwarzError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn io(target: &Path, source: std::io::Error) -> Self {
        SchwarzError::Io {
            target: target.to_path_buf(),
            source,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, SchwarzError::Configuration { .. })
    }
}

/// Returns the value or a `missing` configuration error for `field`.
pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| SchwarzError::config(field, "missing"))
}
