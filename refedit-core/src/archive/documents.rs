//! JSON documents stored in the archive.
//!
//! Writing always produces the canonical shapes ([`CaseMetadata`],
//! [`DatasetSummary`]). Reading goes through [`CaseDocument`], which accepts
//! the canonical shape plus the looser variants other tools produce.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Per-case `metadata.json`, as written on export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseMetadata {
    pub id: String,
    pub prompt: String,
    pub scope: String,
    pub purpose: String,
    pub references: Vec<String>,
    pub targets: Vec<String>,
    pub target_models: Vec<TargetModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetModel {
    pub file: String,
    pub model: String,
}

/// Root `dataset_summary.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub generated_at: String,
    pub total_cases: usize,
    pub cases: Vec<SummaryCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCase {
    pub folder: String,
    pub scope: String,
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// One element of a `references` or `targets` list.
#[derive(Debug, Clone, PartialEq)]
pub enum FileRef {
    /// `"target_1.png"`
    FileName(String),
    /// `{ "file" | "saved_as" | "filename": ..., "model": ... }`
    Record {
        file: Option<String>,
        model: Option<String>,
    },
    /// Anything else; kept for the warning.
    Malformed(Value),
}

impl FileRef {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(name) => FileRef::FileName(name.clone()),
            Value::Object(record) => {
                let file = ["file", "saved_as", "filename"]
                    .iter()
                    .find_map(|key| non_empty_string(record, key));
                FileRef::Record {
                    file,
                    model: non_empty_string(record, "model"),
                }
            }
            other => FileRef::Malformed(other.clone()),
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            FileRef::FileName(name) if !name.is_empty() => Some(name),
            FileRef::Record { file: Some(file), .. } => Some(file),
            _ => None,
        }
    }

    /// Model label carried by the record itself.
    pub fn embedded_model(&self) -> Option<&str> {
        match self {
            FileRef::Record { model: Some(model), .. } => Some(model),
            _ => None,
        }
    }
}

/// A `metadata.json` read leniently. Every field is optional; empty strings
/// count as absent.
#[derive(Debug, Clone, Default)]
pub struct CaseDocument {
    pub id: Option<String>,
    pub prompt: Option<String>,
    pub scope: Option<String>,
    pub purpose: Option<String>,
    pub references: Vec<FileRef>,
    /// `None` when the document has no usable `targets` array.
    pub targets: Option<Vec<FileRef>>,
    /// Saved file name to model label, from `target_models`.
    pub target_models: HashMap<String, String>,
}

impl CaseDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let object = match value {
            Value::Object(object) => object,
            other => return Err(DocumentError::NotAnObject(json_kind(&other))),
        };
        Ok(Self::from_object(&object))
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let id = match object.get("id") {
            Some(Value::Number(number)) => Some(number.to_string()),
            _ => non_empty_string(object, "id"),
        };

        let references = object
            .get("references")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(FileRef::from_value).collect())
            .unwrap_or_default();

        let targets = object
            .get("targets")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(FileRef::from_value).collect());

        let mut target_models = HashMap::new();
        if let Some(items) = object.get("target_models").and_then(Value::as_array) {
            for item in items.iter().filter_map(Value::as_object) {
                if let Some(file) = non_empty_string(item, "file") {
                    let model = non_empty_string(item, "model").unwrap_or_default();
                    target_models.insert(file, model);
                }
            }
        }

        Self {
            id,
            prompt: non_empty_string(object, "prompt"),
            scope: non_empty_string(object, "scope"),
            purpose: non_empty_string(object, "purpose"),
            references,
            targets,
            target_models,
        }
    }

    /// Model label for a target: the record's own field, then the
    /// `target_models` lookup, then empty.
    pub fn model_for(&self, target: &FileRef, file_name: &str) -> String {
        target
            .embedded_model()
            .map(str::to_string)
            .or_else(|| self.target_models.get(file_name).cloned())
            .unwrap_or_default()
    }
}

fn non_empty_string(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
