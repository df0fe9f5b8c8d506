use serde::{Deserialize, Serialize};
use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for chromosome banding extraction
#[derive(Error, Debug)]
pub enum BandingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    JsonOutput(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("Dimension mismatch: {what} is {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Empty image")]
    EmptyInput,

    #[error("No path detected: {0}")]
    NoSkeletonPath(String),

    #[error("Circular structure detected: {0}")]
    CircularStructure(String),

    #[error("Multiple blobs detected ({0}), early rejection")]
    MultipleBlobsRejected(usize),

    #[error("End extrapolation did not leave the blob mask within {0} steps")]
    ExtrapolationRunaway(usize),

    #[error("No cross-section could be sampled along the medial axis")]
    EmptyProfile,
}

/// Classification of a failed extraction, carried in structured results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    EmptyInput,
    NoSkeletonPath,
    CircularStructure,
    MultipleBlobsRejected,
    ExtrapolationRunaway,
    EmptyProfile,
    InvalidInput,
    Io,
    Internal,
}

impl BandingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BandingError::EmptyInput => ErrorKind::EmptyInput,
            BandingError::NoSkeletonPath(_) => ErrorKind::NoSkeletonPath,
            BandingError::CircularStructure(_) => ErrorKind::CircularStructure,
            BandingError::MultipleBlobsRejected(_) => ErrorKind::MultipleBlobsRejected,
            BandingError::ExtrapolationRunaway(_) => ErrorKind::ExtrapolationRunaway,
            BandingError::EmptyProfile => ErrorKind::EmptyProfile,
            BandingError::Config(_)
            | BandingError::ConfigLoad { .. }
            | BandingError::InvalidPath(_)
            | BandingError::DimensionMismatch { .. } => ErrorKind::InvalidInput,
            BandingError::Io(_)
            | BandingError::Image(_)
            | BandingError::CsvOutput(_)
            | BandingError::JsonOutput(_) => ErrorKind::Io,
        }
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, BandingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_kind() {
        assert_eq!(BandingError::EmptyInput.kind(), ErrorKind::EmptyInput);
        assert_eq!(
            BandingError::CircularStructure("loop".into()).kind(),
            ErrorKind::CircularStructure
        );
        assert_eq!(
            BandingError::MultipleBlobsRejected(3).kind(),
            ErrorKind::MultipleBlobsRejected
        );
        assert_eq!(
            BandingError::Config("bad".into()).kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn messages_mention_details() {
        let err = BandingError::MultipleBlobsRejected(2);
        assert!(err.to_string().contains("2"));
        let err = BandingError::ExtrapolationRunaway(5000);
        assert!(err.to_string().contains("5000"));
    }
}
