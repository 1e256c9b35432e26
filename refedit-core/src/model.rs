//! Entity model for prompt entries and their images.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handles::DisplayHandle;

/// Task scopes offered by the scope selector. Free text is also accepted.
pub const PRESET_SCOPES: [&str; 7] = [
    "Style Transfer (风格迁移)",
    "Object Replacement (物体替换)",
    "Character Reference (角色参考)",
    "Worldview & Scenario (世界观与场景)",
    "Text & Layout (文字与排版)",
    "Comics/Manga (漫画/分镜生成)",
    "Corner Cases (高难度综合题)",
];

/// Suggested labels for the system that produced a target image.
pub const PRESET_MODEL_NAMES: [&str; 6] = [
    "GPT-Image-1",
    "Gemini 2.5 Flash Image",
    "FLUX.1 Kontext",
    "Seedream 4.0",
    "Qwen-Image-Edit",
    "Midjourney v7",
];

pub fn default_scope() -> &'static str {
    PRESET_SCOPES[0]
}

pub fn is_preset_scope(scope: &str) -> bool {
    PRESET_SCOPES.contains(&scope)
}

pub(crate) fn mint_id() -> String {
    Uuid::new_v4().to_string()
}

/// Raw bytes of an image plus the name it was supplied under.
///
/// Cloning is cheap: the byte buffer is shared, never copied.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Arc<[u8]>,
}

impl FilePayload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Suffix after the last `.` of the file name, verbatim. `None` when the
    /// name has no dot or ends with one.
    pub fn extension(&self) -> Option<&str> {
        let (_, ext) = self.name.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext)
        }
    }
}

impl fmt::Debug for FilePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePayload")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// An input image guiding the requested edit.
#[derive(Debug)]
pub struct ReferenceImage {
    pub id: String,
    pub handle: DisplayHandle,
    pub file: FilePayload,
}

/// A result image produced by a named model.
#[derive(Debug)]
pub struct TargetImage {
    pub id: String,
    pub handle: DisplayHandle,
    pub file: FilePayload,
    pub model: String,
}

impl TargetImage {
    pub fn has_model(&self) -> bool {
        !self.model.trim().is_empty()
    }
}

/// One case of the dataset.
#[derive(Debug)]
pub struct PromptEntry {
    pub id: String,
    pub text: String,
    pub scope: String,
    pub purpose: String,
    pub references: Vec<ReferenceImage>,
    pub targets: Vec<TargetImage>,
}

impl PromptEntry {
    /// No text, no references and no targets. Such entries are not exported.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.references.is_empty() && self.targets.is_empty()
    }

    pub fn field(&self, field: EntryField) -> &str {
        match field {
            EntryField::Text => &self.text,
            EntryField::Scope => &self.scope,
            EntryField::Purpose => &self.purpose,
        }
    }

    /// Display handles owned by this entry, references first.
    pub fn handles(&self) -> impl Iterator<Item = &DisplayHandle> {
        self.references
            .iter()
            .map(|r| &r.handle)
            .chain(self.targets.iter().map(|t| &t.handle))
    }
}

/// Text fields of a [`PromptEntry`] that may be edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryField {
    Text,
    Scope,
    Purpose,
}

impl std::str::FromStr for EntryField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "prompt" => Ok(EntryField::Text),
            "scope" => Ok(EntryField::Scope),
            "purpose" => Ok(EntryField::Purpose),
            other => Err(format!("Unknown entry field: {}", other)),
        }
    }
}

/// A target image waiting to be materialized by the store.
#[derive(Debug, Clone)]
pub struct TargetDraft {
    pub file: FilePayload,
    pub model: String,
}

/// A prompt entry without display handles, as reconstructed from an archive.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub id: String,
    pub text: String,
    pub scope: String,
    pub purpose: String,
    pub references: Vec<FilePayload>,
    pub targets: Vec<TargetDraft>,
}

impl EntryDraft {
    pub fn missing_model_labels(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| t.model.trim().is_empty())
            .count()
    }
}
