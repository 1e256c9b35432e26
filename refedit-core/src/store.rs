//! In-memory collection of prompt entries for the current session.
//!
//! The store is the only writer of the collection. Every path that drops an
//! image record (explicit removal, entry removal, wholesale replacement)
//! goes through [`CollectionStore::release_handle`], so each display handle
//! owner is released exactly once.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{MissingModelLabel, StoreError, StoreResult};
use crate::handles::{DisplayHandle, HandleRegistry};
use crate::model::{
    default_scope, mint_id, EntryDraft, EntryField, FilePayload, PromptEntry, ReferenceImage,
    TargetImage,
};

pub struct CollectionStore {
    entries: Vec<PromptEntry>,
    registry: Arc<HandleRegistry>,
}

impl CollectionStore {
    pub fn new(registry: Arc<HandleRegistry>) -> Self {
        Self {
            entries: Vec::new(),
            registry,
        }
    }

    /// A store holding a single blank entry, the state a new session opens with.
    pub fn with_blank_entry(registry: Arc<HandleRegistry>) -> Self {
        let mut store = Self::new(registry);
        store.add_entry();
        store
    }

    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    pub fn entries(&self) -> &[PromptEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &str) -> Option<&PromptEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a blank entry and return its id.
    pub fn add_entry(&mut self) -> String {
        let id = mint_id();
        self.entries.push(PromptEntry {
            id: id.clone(),
            text: String::new(),
            scope: default_scope().to_string(),
            purpose: String::new(),
            references: Vec::new(),
            targets: Vec::new(),
        });
        id
    }

    /// Duplicate an entry right after the original. Images get new ids but
    /// share the payload bytes and display handles of the original.
    pub fn clone_entry(&mut self, id: &str) -> StoreResult<String> {
        let index = self.position(id)?;
        let original = &self.entries[index];

        let mut references = Vec::with_capacity(original.references.len());
        for reference in &original.references {
            references.push(ReferenceImage {
                id: mint_id(),
                handle: self.registry.share(&reference.handle)?,
                file: reference.file.clone(),
            });
        }

        let mut targets = Vec::with_capacity(original.targets.len());
        for target in &original.targets {
            targets.push(TargetImage {
                id: mint_id(),
                handle: self.registry.share(&target.handle)?,
                file: target.file.clone(),
                model: target.model.clone(),
            });
        }

        let copy = PromptEntry {
            id: mint_id(),
            text: original.text.clone(),
            scope: original.scope.clone(),
            purpose: original.purpose.clone(),
            references,
            targets,
        };
        let new_id = copy.id.clone();
        self.entries.insert(index + 1, copy);
        debug!("Cloned prompt entry {} as {}", id, new_id);
        Ok(new_id)
    }

    pub fn remove_entry(&mut self, id: &str) -> StoreResult<()> {
        let index = self.position(id)?;
        let entry = self.entries.remove(index);
        self.release_entry(entry);
        Ok(())
    }

    pub fn update_entry_field(
        &mut self,
        id: &str,
        field: EntryField,
        value: impl Into<String>,
    ) -> StoreResult<()> {
        let entry = self.entry_mut(id)?;
        let value = value.into();
        match field {
            EntryField::Text => entry.text = value,
            EntryField::Scope => entry.scope = value,
            EntryField::Purpose => entry.purpose = value,
        }
        Ok(())
    }

    /// Append references in input order; returns the new image ids.
    pub fn add_references(
        &mut self,
        entry_id: &str,
        files: Vec<FilePayload>,
    ) -> StoreResult<Vec<String>> {
        let index = self.position(entry_id)?;
        let images: Vec<ReferenceImage> = files
            .into_iter()
            .map(|file| ReferenceImage {
                id: mint_id(),
                handle: self.registry.acquire(&file),
                file,
            })
            .collect();
        let ids = images.iter().map(|r| r.id.clone()).collect();
        self.entries[index].references.extend(images);
        Ok(ids)
    }

    pub fn remove_reference(&mut self, entry_id: &str, ref_id: &str) -> StoreResult<()> {
        let entry = self.entry_mut(entry_id)?;
        let index = entry
            .references
            .iter()
            .position(|r| r.id == ref_id)
            .ok_or_else(|| image_not_found(entry_id, ref_id))?;
        let removed = entry.references.remove(index);
        self.release_handle(removed.handle)
    }

    /// Append targets in input order with empty model labels; returns the
    /// new image ids.
    pub fn add_targets(
        &mut self,
        entry_id: &str,
        files: Vec<FilePayload>,
    ) -> StoreResult<Vec<String>> {
        let index = self.position(entry_id)?;
        let images: Vec<TargetImage> = files
            .into_iter()
            .map(|file| TargetImage {
                id: mint_id(),
                handle: self.registry.acquire(&file),
                file,
                model: String::new(),
            })
            .collect();
        let ids = images.iter().map(|t| t.id.clone()).collect();
        self.entries[index].targets.extend(images);
        Ok(ids)
    }

    pub fn remove_target(&mut self, entry_id: &str, target_id: &str) -> StoreResult<()> {
        let entry = self.entry_mut(entry_id)?;
        let index = entry
            .targets
            .iter()
            .position(|t| t.id == target_id)
            .ok_or_else(|| image_not_found(entry_id, target_id))?;
        let removed = entry.targets.remove(index);
        self.release_handle(removed.handle)
    }

    pub fn set_target_model(
        &mut self,
        entry_id: &str,
        target_id: &str,
        model: impl Into<String>,
    ) -> StoreResult<()> {
        let entry = self.entry_mut(entry_id)?;
        let target = entry
            .targets
            .iter_mut()
            .find(|t| t.id == target_id)
            .ok_or_else(|| image_not_found(entry_id, target_id))?;
        target.model = model.into();
        Ok(())
    }

    /// Swap the whole collection for `drafts`, releasing every handle of the
    /// previous collection first.
    pub fn replace_all(&mut self, drafts: Vec<EntryDraft>) {
        let previous = std::mem::take(&mut self.entries);
        for entry in previous {
            self.release_entry(entry);
        }

        let entries: Vec<PromptEntry> = drafts
            .into_iter()
            .map(|draft| self.materialize(draft))
            .collect();
        self.entries = entries;
    }

    /// Targets that still need a model label, in collection order.
    pub fn missing_model_labels(&self) -> Vec<MissingModelLabel> {
        missing_model_labels(&self.entries)
    }

    fn materialize(&self, draft: EntryDraft) -> PromptEntry {
        let references = draft
            .references
            .into_iter()
            .map(|file| ReferenceImage {
                id: mint_id(),
                handle: self.registry.acquire(&file),
                file,
            })
            .collect();
        let targets = draft
            .targets
            .into_iter()
            .map(|target| TargetImage {
                id: mint_id(),
                handle: self.registry.acquire(&target.file),
                file: target.file,
                model: target.model,
            })
            .collect();

        PromptEntry {
            id: draft.id,
            text: draft.text,
            scope: draft.scope,
            purpose: draft.purpose,
            references,
            targets,
        }
    }

    fn release_entry(&self, entry: PromptEntry) {
        let entry_id = entry.id;
        let handles = entry
            .references
            .into_iter()
            .map(|r| r.handle)
            .chain(entry.targets.into_iter().map(|t| t.handle));
        for handle in handles {
            if let Err(e) = self.release_handle(handle) {
                warn!("Failed to release handle of entry {}: {}", entry_id, e);
            }
        }
    }

    fn release_handle(&self, handle: DisplayHandle) -> StoreResult<()> {
        self.registry.release(handle)?;
        Ok(())
    }

    fn position(&self, id: &str) -> StoreResult<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StoreError::EntryNotFound(id.to_string()))
    }

    fn entry_mut(&mut self, id: &str) -> StoreResult<&mut PromptEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::EntryNotFound(id.to_string()))
    }
}

impl Drop for CollectionStore {
    fn drop(&mut self) {
        for entry in std::mem::take(&mut self.entries) {
            self.release_entry(entry);
        }
    }
}

pub fn missing_model_labels(entries: &[PromptEntry]) -> Vec<MissingModelLabel> {
    entries
        .iter()
        .flat_map(|entry| {
            entry
                .targets
                .iter()
                .filter(|t| !t.has_model())
                .map(move |t| MissingModelLabel {
                    entry_id: entry.id.clone(),
                    target_id: t.id.clone(),
                    file_name: t.file.name.clone(),
                })
        })
        .collect()
}

fn image_not_found(entry_id: &str, image_id: &str) -> StoreError {
    StoreError::ImageNotFound {
        entry_id: entry_id.to_string(),
        image_id: image_id.to_string(),
    }
}
