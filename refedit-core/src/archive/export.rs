use std::io::{Cursor, Seek, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;
use zip::write::FileOptions;
use zip::ZipWriter;

use super::directory::extract_archive;
use super::documents::{iso_timestamp, CaseMetadata, DatasetSummary, SummaryCase, TargetModel};
use super::layout::{
    archive_file_name, case_folder_name, root_folder_name, saved_file_name, METADATA_FILE,
    REFERENCE_PREFIX, SUMMARY_FILE, TARGET_PREFIX,
};
use crate::config::ArchiveConfig;
use crate::errors::{ArchiveError, ArchiveResult};
use crate::model::{FilePayload, PromptEntry};
use crate::store::missing_model_labels;

/// An image with the name it is stored under inside its case folder.
#[derive(Debug)]
pub struct PlannedFile<'a> {
    pub saved_as: String,
    pub file: &'a FilePayload,
}

#[derive(Debug)]
pub struct PlannedTarget<'a> {
    pub saved_as: String,
    pub file: &'a FilePayload,
    pub model: &'a str,
}

/// Folder and file name assignment for one exported entry.
#[derive(Debug)]
pub struct CasePlan<'a> {
    pub folder: String,
    pub entry: &'a PromptEntry,
    pub references: Vec<PlannedFile<'a>>,
    pub targets: Vec<PlannedTarget<'a>>,
}

impl CasePlan<'_> {
    pub fn metadata(&self) -> CaseMetadata {
        CaseMetadata {
            id: self.entry.id.clone(),
            prompt: self.entry.text.clone(),
            scope: self.entry.scope.clone(),
            purpose: self.entry.purpose.clone(),
            references: self.references.iter().map(|r| r.saved_as.clone()).collect(),
            targets: self.targets.iter().map(|t| t.saved_as.clone()).collect(),
            target_models: self
                .targets
                .iter()
                .map(|t| TargetModel {
                    file: t.saved_as.clone(),
                    model: t.model.to_string(),
                })
                .collect(),
        }
    }
}

/// Assign case folders and file names in one pass over `entries`, skipping
/// empty entries. Numbering follows the surviving entries only.
pub fn plan_cases(entries: &[PromptEntry]) -> Vec<CasePlan<'_>> {
    entries
        .iter()
        .filter(|entry| !entry.is_empty())
        .enumerate()
        .map(|(index, entry)| CasePlan {
            folder: case_folder_name(index),
            entry,
            references: entry
                .references
                .iter()
                .enumerate()
                .map(|(i, r)| PlannedFile {
                    saved_as: saved_file_name(REFERENCE_PREFIX, i, &r.file),
                    file: &r.file,
                })
                .collect(),
            targets: entry
                .targets
                .iter()
                .enumerate()
                .map(|(i, t)| PlannedTarget {
                    saved_as: saved_file_name(TARGET_PREFIX, i, &t.file),
                    file: &t.file,
                    model: &t.model,
                })
                .collect(),
        })
        .collect()
}

pub fn summarize(plans: &[CasePlan<'_>], generated_at: DateTime<Utc>) -> DatasetSummary {
    DatasetSummary {
        generated_at: iso_timestamp(generated_at),
        total_cases: plans.len(),
        cases: plans
            .iter()
            .map(|plan| SummaryCase {
                folder: plan.folder.clone(),
                scope: plan.entry.scope.clone(),
            })
            .collect(),
    }
}

/// Export pre-flight: every target needs a model label.
pub fn validate_model_labels(entries: &[PromptEntry]) -> ArchiveResult<()> {
    let missing = missing_model_labels(entries);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ArchiveError::MissingModelLabels(missing))
    }
}

/// A packaged dataset ready to be offered for download.
#[derive(Debug, Clone)]
pub struct ExportedArchive {
    pub filename: String,
    pub root_folder: String,
    pub bytes: Vec<u8>,
    pub summary: DatasetSummary,
}

#[derive(Debug, Clone, Default)]
pub struct Exporter {
    config: ArchiveConfig,
}

impl Exporter {
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    pub fn export(&self, entries: &[PromptEntry]) -> ArchiveResult<ExportedArchive> {
        self.export_at(entries, Utc::now())
    }

    /// Export with an explicit generation time, which drives the root folder
    /// name, the download name and the summary timestamp.
    pub fn export_at(
        &self,
        entries: &[PromptEntry],
        generated_at: DateTime<Utc>,
    ) -> ArchiveResult<ExportedArchive> {
        validate_model_labels(entries)?;

        let plans = plan_cases(entries);
        let summary = summarize(&plans, generated_at);
        let root_folder = root_folder_name(generated_at);

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut cursor);
            let options = FileOptions::default().compression_method(self.config.compression);

            if self.config.directory_entries {
                zip.add_directory(format!("{}/", root_folder), options)?;
            }

            for plan in &plans {
                let case_dir = format!("{}/{}", root_folder, plan.folder);
                if self.config.directory_entries {
                    zip.add_directory(format!("{}/", case_dir), options)?;
                }

                for reference in &plan.references {
                    let path = format!("{}/{}", case_dir, reference.saved_as);
                    write_member(&mut zip, &path, &reference.file.bytes, options)?;
                }
                for target in &plan.targets {
                    let path = format!("{}/{}", case_dir, target.saved_as);
                    write_member(&mut zip, &path, &target.file.bytes, options)?;
                }

                let metadata = serde_json::to_vec_pretty(&plan.metadata())?;
                let path = format!("{}/{}", case_dir, METADATA_FILE);
                write_member(&mut zip, &path, &metadata, options)?;
            }

            let summary_bytes = serde_json::to_vec_pretty(&summary)?;
            let path = format!("{}/{}", root_folder, SUMMARY_FILE);
            write_member(&mut zip, &path, &summary_bytes, options)?;

            zip.finish()?;
        }

        let skipped = entries.len() - plans.len();
        info!(
            "Exported {} case(s) into {} ({} empty entr{} skipped)",
            plans.len(),
            root_folder,
            skipped,
            if skipped == 1 { "y" } else { "ies" }
        );

        Ok(ExportedArchive {
            filename: archive_file_name(generated_at),
            root_folder,
            bytes: cursor.into_inner(),
            summary,
        })
    }

    /// Export and unpack the result under `target_dir`.
    pub fn export_to_directory(
        &self,
        entries: &[PromptEntry],
        target_dir: &Path,
    ) -> ArchiveResult<ExportedArchive> {
        let archive = self.export(entries)?;
        extract_archive(&archive.bytes, target_dir)?;
        Ok(archive)
    }
}

fn write_member<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    path: &str,
    bytes: &[u8],
    options: FileOptions,
) -> ArchiveResult<()> {
    zip.start_file(path, options)?;
    zip.write_all(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::HandleRegistry;
    use crate::model::EntryField;
    use crate::store::CollectionStore;
    use chrono::TimeZone;
    use std::io::Read;
    use zip::ZipArchive;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap()
    }

    fn sample_store() -> CollectionStore {
        let mut store = CollectionStore::new(HandleRegistry::new());
        let blank = store.add_entry();
        let id = store.add_entry();
        store
            .update_entry_field(&id, EntryField::Text, "swap the hat")
            .unwrap();
        store
            .add_references(
                &id,
                vec![
                    FilePayload::new("hat.JPG", vec![1u8, 2]),
                    FilePayload::new("noext", vec![3u8]),
                ],
            )
            .unwrap();
        let targets = store
            .add_targets(&id, vec![FilePayload::new("out.webp", vec![4u8])])
            .unwrap();
        store.set_target_model(&id, &targets[0], "GPT-Image-1").unwrap();
        assert!(store.entry(&blank).unwrap().is_empty());
        store
    }

    fn read_member(bytes: &[u8], path: &str) -> Vec<u8> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(path).unwrap();
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_plan_skips_empty_entries_and_numbers_survivors() {
        let store = sample_store();
        let plans = plan_cases(store.entries());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].folder, "case_01");
        let names: Vec<&str> = plans[0].references.iter().map(|r| r.saved_as.as_str()).collect();
        assert_eq!(names, vec!["ref_1.JPG", "ref_2.png"]);
        assert_eq!(plans[0].targets[0].saved_as, "target_1.webp");
    }

    #[test]
    fn test_export_layout() {
        let store = sample_store();
        let archive = Exporter::default().export_at(store.entries(), at()).unwrap();
        assert_eq!(archive.root_folder, "RefEdit_Dataset_2025-06-01");
        assert_eq!(archive.filename, "RefEdit_Dataset_1748766600000.zip");

        let mut zip = ZipArchive::new(Cursor::new(archive.bytes.as_slice())).unwrap();
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "RefEdit_Dataset_2025-06-01/",
                "RefEdit_Dataset_2025-06-01/case_01/",
                "RefEdit_Dataset_2025-06-01/case_01/metadata.json",
                "RefEdit_Dataset_2025-06-01/case_01/ref_1.JPG",
                "RefEdit_Dataset_2025-06-01/case_01/ref_2.png",
                "RefEdit_Dataset_2025-06-01/case_01/target_1.webp",
                "RefEdit_Dataset_2025-06-01/dataset_summary.json",
            ]
        );
        assert!(zip.by_name("RefEdit_Dataset_2025-06-01/case_01/").unwrap().is_dir());

        let image = read_member(&archive.bytes, "RefEdit_Dataset_2025-06-01/case_01/ref_1.JPG");
        assert_eq!(image, vec![1u8, 2]);

        let metadata: CaseMetadata = serde_json::from_slice(&read_member(
            &archive.bytes,
            "RefEdit_Dataset_2025-06-01/case_01/metadata.json",
        ))
        .unwrap();
        assert_eq!(metadata.prompt, "swap the hat");
        assert_eq!(metadata.targets, vec!["target_1.webp"]);
        assert_eq!(metadata.target_models[0].model, "GPT-Image-1");

        let summary: DatasetSummary = serde_json::from_slice(&read_member(
            &archive.bytes,
            "RefEdit_Dataset_2025-06-01/dataset_summary.json",
        ))
        .unwrap();
        assert_eq!(summary, archive.summary);
        assert_eq!(summary.total_cases, 1);
        assert_eq!(summary.generated_at, "2025-06-01T08:30:00.000Z");
    }

    #[test]
    fn test_export_without_directory_entries() {
        let store = sample_store();
        let exporter = Exporter::new(ArchiveConfig {
            compression: zip::CompressionMethod::Stored,
            directory_entries: false,
        });
        let archive = exporter.export_at(store.entries(), at()).unwrap();
        let zip = ZipArchive::new(Cursor::new(archive.bytes.as_slice())).unwrap();
        assert!(zip.file_names().all(|name| !name.ends_with('/')));
        assert_eq!(zip.len(), 5);
    }

    #[test]
    fn test_metadata_is_deterministic() {
        let store = sample_store();
        let first = Exporter::default().export_at(store.entries(), at()).unwrap();
        let later = at() + chrono::Duration::days(3);
        let second = Exporter::default().export_at(store.entries(), later).unwrap();

        let first_meta = read_member(
            &first.bytes,
            &format!("{}/case_01/metadata.json", first.root_folder),
        );
        let second_meta = read_member(
            &second.bytes,
            &format!("{}/case_01/metadata.json", second.root_folder),
        );
        assert_eq!(first_meta, second_meta);
    }

    #[test]
    fn test_missing_model_blocks_export() {
        let mut store = sample_store();
        let id = store.entries()[1].id.clone();
        store
            .add_targets(&id, vec![FilePayload::new("second.png", vec![9u8])])
            .unwrap();

        let err = Exporter::default().export_at(store.entries(), at()).unwrap_err();
        assert!(err.is_validation());
        match err {
            ArchiveError::MissingModelLabels(missing) => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].file_name, "second.png");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
