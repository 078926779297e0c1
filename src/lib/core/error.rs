//! Error types for the txcov library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Malformed interval for transcript {transcript_id}: {reason}")]
    MalformedInterval {
        transcript_id: String,
        reason: String,
    },

    #[error("Depth source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Duplicate stat for sample {sample_id} and transcript {transcript_id}")]
    DuplicateStat {
        sample_id: String,
        transcript_id: String,
    },

    #[error("Region {region_id} has no value for threshold {threshold}")]
    MissingThreshold { region_id: String, threshold: u32 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CoverageError>;

impl From<serde_yaml::Error> for CoverageError {
    fn from(err: serde_yaml::Error) -> Self {
        CoverageError::Config(format!("YAML error: {}", err))
    }
}

impl CoverageError {
    /// Shorthand used by the annotation and depth parsers.
    pub(crate) fn parse_at(source: &str, line_no: usize, msg: impl AsRef<str>) -> Self {
        CoverageError::Parse(format!("{}:{}: {}", source, line_no, msg.as_ref()))
    }
}
