//! Domain-specific errors.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::app::minify::MinifyError;

/// Failures raised while automating a page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AutomationError {
    /// An awaited condition never became true within its budget.
    #[error("timeout waiting for {target} after {}ms", waited.as_millis())]
    Timeout { target: String, waited: Duration },
    /// A required element or control is absent.
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unexpected(String),
}

impl AutomationError {
    pub fn timeout(target: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            target: target.into(),
            waited,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

/// Failure packaging a single bookmarklet unit. Never aborts the whole build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid metadata in {}", path.display())]
    InvalidMeta {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to embed templates for '{unit}'")]
    Template {
        unit: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unit '{unit}' declares unknown helper '{helper}'")]
    UnknownHelper { unit: String, helper: String },
    #[error("failed to minify '{unit}'")]
    Minify {
        unit: String,
        #[source]
        source: MinifyError,
    },
}
