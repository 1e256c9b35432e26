//! Read-only projection of the collection for on-screen display.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::archive::documents::{iso_timestamp, TargetModel};
use crate::archive::export::plan_cases;
use crate::model::PromptEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CasePreview {
    pub folder: String,
    pub prompt: String,
    pub scope: String,
    pub purpose: String,
    pub references: Vec<String>,
    pub targets: Vec<String>,
    pub target_models: Vec<TargetModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetPreview {
    pub generated_at: String,
    pub total_cases: usize,
    pub cases: Vec<CasePreview>,
}

/// What an export taken now would contain, without building it.
pub fn preview(entries: &[PromptEntry], now: DateTime<Utc>) -> DatasetPreview {
    let cases: Vec<CasePreview> = plan_cases(entries)
        .iter()
        .map(|plan| {
            let metadata = plan.metadata();
            CasePreview {
                folder: plan.folder.clone(),
                prompt: metadata.prompt,
                scope: metadata.scope,
                purpose: metadata.purpose,
                references: metadata.references,
                targets: metadata.targets,
                target_models: metadata.target_models,
            }
        })
        .collect();

    DatasetPreview {
        generated_at: iso_timestamp(now),
        total_cases: cases.len(),
        cases,
    }
}
