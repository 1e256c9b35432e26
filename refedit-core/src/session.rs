//! The editing session: one collection, one writer, and at most one archive
//! operation in flight.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use crate::archive::directory::archive_directory;
use crate::archive::import::{apply_import, read_archive, ImportOutcome};
use crate::archive::{ExportedArchive, Exporter};
use crate::config::ArchiveConfig;
use crate::errors::{ArchiveError, ArchiveResult};
use crate::handles::HandleRegistry;
use crate::preview::{preview, DatasetPreview};
use crate::store::CollectionStore;

const IDLE: u8 = 0;
const EXPORTING: u8 = 1;
const IMPORTING: u8 = 2;

fn activity_name(activity: u8) -> &'static str {
    match activity {
        EXPORTING => "export",
        _ => "import",
    }
}

/// Marks an archive operation as running until dropped.
struct BusyGuard<'a> {
    activity: &'a AtomicU8,
}

impl<'a> BusyGuard<'a> {
    fn enter(activity: &'a AtomicU8, operation: u8) -> ArchiveResult<Self> {
        activity
            .compare_exchange(IDLE, operation, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|running| ArchiveError::Busy(activity_name(running)))?;
        Ok(Self { activity })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.activity.store(IDLE, Ordering::Release);
    }
}

pub struct Session {
    store: RwLock<CollectionStore>,
    registry: Arc<HandleRegistry>,
    exporter: Exporter,
    activity: AtomicU8,
}

impl Session {
    /// A session holding one blank entry.
    pub fn new(config: ArchiveConfig) -> Self {
        let registry = HandleRegistry::new();
        let store = CollectionStore::with_blank_entry(registry.clone());
        Self::with_store(store, config)
    }

    pub fn with_store(store: CollectionStore, config: ArchiveConfig) -> Self {
        Self {
            registry: store.registry().clone(),
            store: RwLock::new(store),
            exporter: Exporter::new(config),
            activity: AtomicU8::new(IDLE),
        }
    }

    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, CollectionStore> {
        self.store.read().await
    }

    /// Exclusive access for collection mutations.
    pub async fn write(&self) -> RwLockWriteGuard<'_, CollectionStore> {
        self.store.write().await
    }

    pub fn is_exporting(&self) -> bool {
        self.activity.load(Ordering::Acquire) == EXPORTING
    }

    pub fn is_importing(&self) -> bool {
        self.activity.load(Ordering::Acquire) == IMPORTING
    }

    pub async fn export(&self) -> ArchiveResult<ExportedArchive> {
        self.export_at(Utc::now()).await
    }

    pub async fn export_at(&self, generated_at: DateTime<Utc>) -> ArchiveResult<ExportedArchive> {
        let _busy = BusyGuard::enter(&self.activity, EXPORTING)?;
        let store = self.store.read().await;
        self.exporter.export_at(store.entries(), generated_at)
    }

    /// Parse `bytes` off the async runtime, then swap the collection in one
    /// step. The collection is untouched when the import fails.
    pub async fn import(&self, bytes: Vec<u8>) -> ArchiveResult<ImportOutcome> {
        let _busy = BusyGuard::enter(&self.activity, IMPORTING)?;
        let dataset = tokio::task::spawn_blocking(move || read_archive(&bytes))
            .await
            .map_err(|e| ArchiveError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        let mut store = self.store.write().await;
        Ok(apply_import(&mut store, dataset))
    }

    pub async fn import_directory(&self, source_dir: &Path) -> ArchiveResult<ImportOutcome> {
        let bytes = archive_directory(source_dir)?;
        info!("Packed dataset directory {:?} for import", source_dir);
        self.import(bytes).await
    }

    pub async fn preview(&self) -> DatasetPreview {
        let store = self.store.read().await;
        preview(store.entries(), Utc::now())
    }
}
