//! Collection store and display handle errors

use thiserror::Error;

/// Display handle bookkeeping errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// Handle was never issued or has already been revoked
    #[error("Display handle '{0}' is not live")]
    UnknownHandle(String),
}

/// Collection store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No entry with this id
    #[error("Prompt entry '{0}' not found")]
    EntryNotFound(String),

    /// No reference or target with this id inside the entry
    #[error("Image '{image_id}' not found in prompt entry '{entry_id}'")]
    ImageNotFound { entry_id: String, image_id: String },

    /// Releasing a display handle failed
    #[error(transparent)]
    Handle(#[from] HandleError),
}

impl StoreError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::EntryNotFound(_) | StoreError::ImageNotFound { .. }
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            StoreError::ImageNotFound { .. } => "IMAGE_NOT_FOUND",
            StoreError::Handle(_) => "HANDLE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_not_found() {
        let err = StoreError::ImageNotFound {
            entry_id: "p1".to_string(),
            image_id: "r9".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Image 'r9' not found in prompt entry 'p1'"
        );
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), "IMAGE_NOT_FOUND");
    }

    #[test]
    fn test_handle_error_is_transparent() {
        let err = StoreError::from(HandleError::UnknownHandle("blob:refedit/x".to_string()));
        assert_eq!(err.to_string(), "Display handle 'blob:refedit/x' is not live");
        assert!(!err.is_not_found());
    }
}
