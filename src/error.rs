//! Error types for the waypoint tools.
//!
//! Every failure is fatal to the run. Each variant carries the file it
//! concerns and, where one is known, the id of the offending feature.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for waypoint operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading an input file failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that could not be read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing an output file (or creating its directory) failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File that could not be written.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input is not valid JSON or does not have the expected shape.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Input is well-formed but a feature is missing a required value.
    #[error("{}", schema_message(.path, .id, .message))]
    Schema {
        /// File containing the feature.
        path: PathBuf,
        /// Id of the feature, when it has one.
        id: Option<String>,
        /// Which requirement was violated.
        message: String,
    },

    /// A degrees-minutes-seconds string could not be converted.
    #[error("invalid coordinate '{value}': {message}")]
    Coordinate {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        message: String,
    },

    /// A CSV input file is malformed.
    #[error("failed to read CSV {path}: {source}")]
    Csv {
        /// The CSV file.
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

fn schema_message(path: &std::path::Path, id: &Option<String>, message: &str) -> String {
    match id {
        Some(id) => format!("invalid feature '{}' in {}: {}", id, path.display(), message),
        None => format!("invalid feature in {}: {}", path.display(), message),
    }
}

/// A specialized Result type for waypoint operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a parse error for `path`.
    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a schema error for a feature in `path`.
    #[must_use]
    pub fn schema(
        path: impl Into<PathBuf>,
        id: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::Schema {
            path: path.into(),
            id: id.map(str::to_owned),
            message: message.into(),
        }
    }

    /// Create a coordinate conversion error.
    #[must_use]
    pub fn coordinate(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Coordinate {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Check if this error was caused by malformed input data.
    #[must_use]
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::Schema { .. } | Self::Coordinate { .. } | Self::Csv { .. }
        )
    }
}
