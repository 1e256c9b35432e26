//! Archive export and import error types
//!
//! ```rust
//! use refedit::errors::{ArchiveError, MissingModelLabel};
//!
//! let err = ArchiveError::MissingModelLabels(vec![MissingModelLabel {
//!     entry_id: "p1".to_string(),
//!     target_id: "t1".to_string(),
//!     file_name: "result.png".to_string(),
//! }]);
//! assert!(err.is_validation());
//! assert_eq!(err.error_code(), "MISSING_MODEL_LABELS");
//! ```

use std::fmt;

use thiserror::Error;

/// A target image that has no model label yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingModelLabel {
    pub entry_id: String,
    pub target_id: String,
    pub file_name: String,
}

impl fmt::Display for MissingModelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (entry {})", self.file_name, self.entry_id)
    }
}

/// Archive operation errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Export pre-flight: some target images have no model label
    #[error(
        "Validation failed: {} target result(s) have no model name",
        .0.len()
    )]
    MissingModelLabels(Vec<MissingModelLabel>),

    /// The archive holds no usable per-case metadata document
    #[error("No valid 'metadata.json' files found in the archive")]
    NoMetadata,

    /// Metadata documents were found but none produced an entry
    #[error("No valid data could be parsed from the metadata files")]
    NoEntries,

    /// Another export or import is still running
    #[error("An {0} is already in progress")]
    Busy(&'static str),

    /// Archive path escapes the archive root
    #[error("Invalid path in archive entry: {0}")]
    InvalidPath(String),

    /// Zip container error
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Export was blocked before any archive construction began
    pub fn is_validation(&self) -> bool {
        matches!(self, ArchiveError::MissingModelLabels(_))
    }

    /// Import found nothing it could turn into a collection
    pub fn is_structural(&self) -> bool {
        matches!(self, ArchiveError::NoMetadata | ArchiveError::NoEntries)
    }

    /// Caused by user-supplied data rather than the environment
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ArchiveError::MissingModelLabels(_)
                | ArchiveError::NoMetadata
                | ArchiveError::NoEntries
                | ArchiveError::InvalidPath(_)
                | ArchiveError::Zip(_)
        )
    }

    /// Get error code for alerts and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            ArchiveError::MissingModelLabels(_) => "MISSING_MODEL_LABELS",
            ArchiveError::NoMetadata => "NO_METADATA",
            ArchiveError::NoEntries => "NO_ENTRIES",
            ArchiveError::Busy(_) => "BUSY",
            ArchiveError::InvalidPath(_) => "INVALID_PATH",
            ArchiveError::Zip(_) => "ZIP_ERROR",
            ArchiveError::Serialization(_) => "SERIALIZATION_ERROR",
            ArchiveError::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_labels() {
        let err = ArchiveError::MissingModelLabels(vec![
            MissingModelLabel {
                entry_id: "a".to_string(),
                target_id: "t1".to_string(),
                file_name: "one.png".to_string(),
            },
            MissingModelLabel {
                entry_id: "a".to_string(),
                target_id: "t2".to_string(),
                file_name: "two.png".to_string(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: 2 target result(s) have no model name"
        );
        assert!(err.is_validation());
        assert!(!err.is_structural());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_structural_errors() {
        assert!(ArchiveError::NoMetadata.is_structural());
        assert!(ArchiveError::NoEntries.is_structural());
        assert_eq!(ArchiveError::NoEntries.error_code(), "NO_ENTRIES");
        assert_eq!(
            ArchiveError::NoMetadata.to_string(),
            "No valid 'metadata.json' files found in the archive"
        );
    }

    #[test]
    fn test_busy() {
        let err = ArchiveError::Busy("import");
        assert_eq!(err.to_string(), "An import is already in progress");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_serialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = ArchiveError::from(json_err);
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }
}
