//! Error types for table loading and plot generation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading measurements or producing a plot.
///
/// Every variant produced during plot generation carries the metric key so the
/// caller can tell which output failed.
#[derive(Debug, Error)]
pub enum PlotError {
    /// Missing or malformed column in the input table.
    #[error("data format error in {}: {message}", path.display())]
    DataFormat { path: PathBuf, message: String },

    /// An ideal time curve needs a P=1 row for this N.
    #[error("metric '{metric}': no P=1 baseline row for N={n}")]
    BaselineMissing { metric: String, n: u64 },

    /// A requested N group has no rows.
    #[error("metric '{metric}': no rows for N={n}")]
    EmptySeries { metric: String, n: u64 },

    /// The plotting backend failed.
    #[error("metric '{metric}': rendering failed: {message}")]
    Render { metric: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PlotError {
    pub(crate) fn data_format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PlotError::DataFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlotError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = PlotError> = std::result::Result<T, E>;
