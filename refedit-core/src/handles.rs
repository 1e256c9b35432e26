//! Display handles: revocable, in-session references to image bytes.
//!
//! Every [`DisplayHandle`] value is one owner of a registry slot. A slot is
//! revoked when its last owner is released. Handles are deliberately not
//! `Clone`; a second owner can only be obtained through
//! [`HandleRegistry::share`].

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{HandleError, HandleResult};
use crate::model::FilePayload;

const HANDLE_SCHEME: &str = "blob:refedit/";

#[derive(PartialEq, Eq, Hash)]
pub struct DisplayHandle(String);

impl DisplayHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayHandle({})", self.0)
    }
}

impl fmt::Display for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct HandleSlot {
    owners: usize,
    payload: FilePayload,
}

/// Issues and revokes display handles.
#[derive(Default)]
pub struct HandleRegistry {
    slots: DashMap<String, HandleSlot>,
}

impl HandleRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a fresh handle for `payload`.
    pub fn acquire(&self, payload: &FilePayload) -> DisplayHandle {
        let key = format!("{}{}", HANDLE_SCHEME, Uuid::new_v4());
        self.slots.insert(
            key.clone(),
            HandleSlot {
                owners: 1,
                payload: payload.clone(),
            },
        );
        debug!("Acquired display handle {} for {}", key, payload.name);
        DisplayHandle(key)
    }

    /// Add an owner to an existing live handle.
    pub fn share(&self, handle: &DisplayHandle) -> HandleResult<DisplayHandle> {
        let mut slot = self
            .slots
            .get_mut(handle.as_str())
            .ok_or_else(|| HandleError::UnknownHandle(handle.0.clone()))?;
        slot.owners += 1;
        Ok(DisplayHandle(handle.0.clone()))
    }

    /// Drop one owner. Returns `true` when this was the last owner and the
    /// handle has been revoked.
    pub fn release(&self, handle: DisplayHandle) -> HandleResult<bool> {
        let remaining = {
            let mut slot = self
                .slots
                .get_mut(handle.as_str())
                .ok_or_else(|| HandleError::UnknownHandle(handle.0.clone()))?;
            slot.owners -= 1;
            slot.owners
        };

        if remaining == 0 {
            self.slots.remove(handle.as_str());
            debug!("Revoked display handle {}", handle);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Resolve a live handle to the bytes it renders.
    pub fn resolve(&self, handle: &DisplayHandle) -> Option<FilePayload> {
        self.slots.get(handle.as_str()).map(|slot| slot.payload.clone())
    }

    pub fn is_live(&self, handle: &DisplayHandle) -> bool {
        self.slots.contains_key(handle.as_str())
    }

    pub fn owners(&self, handle: &DisplayHandle) -> usize {
        self.slots
            .get(handle.as_str())
            .map(|slot| slot.owners)
            .unwrap_or(0)
    }

    /// Number of handles not yet revoked.
    pub fn live_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> FilePayload {
        FilePayload::new("cat.png", vec![0u8, 1, 2])
    }

    #[test]
    fn test_acquire_and_release() {
        let registry = HandleRegistry::new();
        let handle = registry.acquire(&payload());
        assert!(handle.as_str().starts_with("blob:refedit/"));
        assert_eq!(registry.live_count(), 1);

        let revoked = registry.release(handle).expect("release live handle");
        assert!(revoked);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_shared_handle_revoked_by_last_owner() {
        let registry = HandleRegistry::new();
        let first = registry.acquire(&payload());
        let second = registry.share(&first).expect("share live handle");
        assert_eq!(first, second);
        assert_eq!(registry.owners(&first), 2);

        assert!(!registry.release(second).expect("release shared owner"));
        assert!(registry.is_live(&first));
        assert_eq!(
            registry.resolve(&first).map(|p| p.name),
            Some("cat.png".to_string())
        );

        assert!(registry.release(first).expect("release last owner"));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_release_after_revocation_fails() {
        let registry = HandleRegistry::new();
        let handle = registry.acquire(&payload());
        let stale = DisplayHandle(handle.as_str().to_string());
        registry.release(handle).expect("release live handle");

        let err = registry.release(stale).unwrap_err();
        assert!(matches!(err, HandleError::UnknownHandle(_)));
    }
}
