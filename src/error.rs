//! Error taxonomy shared by the channel, correlator, parser and compiler.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    /// Socket connect, bind, accept or write failure.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("no data received within {0:?}")]
    Timeout(Duration),

    #[error("format error in {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("invalid window: end {end} is not after start {start}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("no power samples strictly inside window {start} .. {end}")]
    EmptyWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("dataset has no rows: {}", path.display())]
    EmptyDataset { path: PathBuf },

    #[error("no profile row for location {0:?}")]
    NotFound(String),

    #[error("run log {} already holds a run", path.display())]
    RunLogInUse { path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BenchError {
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly kind, used in exclusion reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Timeout(_) => "timeout",
            Self::Format { .. } => "format",
            Self::InvalidWindow { .. } => "invalid-window",
            Self::EmptyWindow { .. } => "empty-window",
            Self::EmptyDataset { .. } => "empty-dataset",
            Self::NotFound(_) => "not-found",
            Self::RunLogInUse { .. } => "run-log-in-use",
            Self::Config(_) => "config",
            Self::Io { .. } => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
