//! Domain-specific error types for refedit-core
//!
//! Each domain gets its own structured error enum so callers can tell a
//! blocking failure (abort, leave prior state untouched) from a local one.
//!
//! # Error Categories
//!
//! - **ArchiveError**: export validation, import structure and archive I/O
//! - **StoreError**: collection mutations addressing unknown entries or images
//! - **HandleError**: display handle bookkeeping
//!
//! # Examples
//!
//! ```rust
//! use refedit::errors::{ArchiveError, StoreError};
//!
//! let err = ArchiveError::NoMetadata;
//! assert!(err.is_structural());
//!
//! let err = StoreError::EntryNotFound("abc".to_string());
//! assert_eq!(err.error_code(), "ENTRY_NOT_FOUND");
//! ```

pub mod archive;
pub mod store;

pub use archive::{ArchiveError, MissingModelLabel};
pub use store::{HandleError, StoreError};

/// Result type alias for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Result type alias for collection store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for display handle operations
pub type HandleResult<T> = Result<T, HandleError>;
