//! Rebuilding a collection from a dataset archive.
//!
//! Parsing is tolerant: a broken metadata document drops only its own case,
//! a missing image drops only that image. The import fails as a whole only
//! when nothing usable is left. Targets are resolved by one of the
//! [`TargetStrategy`] variants.

use std::collections::HashSet;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::Path;

use tracing::{info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use super::directory::archive_directory;
use super::documents::{CaseDocument, FileRef};
use super::layout::{
    case_prefix, content_type_for, is_legacy_target_name, is_platform_artifact, METADATA_FILE,
};
use crate::errors::{ArchiveError, ArchiveResult};
use crate::model::{default_scope, mint_id, EntryDraft, FilePayload, TargetDraft};
use crate::store::CollectionStore;

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Reference,
    Target,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Reference => f.write_str("reference"),
            ImageKind::Target => f.write_str("target"),
        }
    }
}

/// How the target list of a case was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStrategy {
    /// The document's own `targets` array.
    Declared,
    /// Older exports wrote target images without listing them; pick up
    /// `target_<n>.<ext>` files from the case folder instead.
    LegacyFolderScan,
}

/// Something skipped during import without failing it.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportWarning {
    UnreadableMetadata {
        path: String,
        reason: String,
    },
    MissingImage {
        kind: ImageKind,
        path: String,
    },
    UnreadableImage {
        kind: ImageKind,
        path: String,
        reason: String,
    },
    MalformedImageRef {
        kind: ImageKind,
        metadata_path: String,
        value: String,
    },
    DuplicateEntryId {
        metadata_path: String,
        id: String,
        replacement: String,
    },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::UnreadableMetadata { path, reason } => {
                write!(f, "Failed to parse metadata file {}: {}", path, reason)
            }
            ImportWarning::MissingImage { kind, path } => {
                write!(f, "{} image not found in archive: {}", capitalized(*kind), path)
            }
            ImportWarning::UnreadableImage { kind, path, reason } => {
                write!(f, "Failed to read {} image {}: {}", kind, path, reason)
            }
            ImportWarning::MalformedImageRef {
                kind,
                metadata_path,
                value,
            } => write!(
                f,
                "Ignoring malformed {} entry {} in {}",
                kind, value, metadata_path
            ),
            ImportWarning::DuplicateEntryId {
                metadata_path,
                id,
                replacement,
            } => write!(
                f,
                "Entry id {} in {} is already taken, using {}",
                id, metadata_path, replacement
            ),
        }
    }
}

fn capitalized(kind: ImageKind) -> &'static str {
    match kind {
        ImageKind::Reference => "Reference",
        ImageKind::Target => "Target",
    }
}

/// Result of parsing an archive, before it touches any collection.
#[derive(Debug, Clone)]
pub struct ImportedDataset {
    pub entries: Vec<EntryDraft>,
    pub warnings: Vec<ImportWarning>,
    /// Qualifying metadata documents found, parsed or not.
    pub metadata_documents: usize,
}

impl ImportedDataset {
    pub fn missing_model_labels(&self) -> usize {
        self.entries.iter().map(EntryDraft::missing_model_labels).sum()
    }
}

/// What an import did to the collection.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub imported_entries: usize,
    pub warnings: Vec<ImportWarning>,
    pub missing_model_labels: usize,
}

impl ImportOutcome {
    /// Some imported targets still need a model label before the next export.
    pub fn needs_model_labels(&self) -> bool {
        self.missing_model_labels > 0
    }
}

/// Where an image lives in the archive and the name it keeps afterwards.
struct ImageLocation {
    archive_path: String,
    file_name: String,
}

fn is_case_metadata(path: &str) -> bool {
    !path.ends_with('/') && path.ends_with(METADATA_FILE) && !is_platform_artifact(path)
}

/// Parse `bytes` into entry drafts. Fails only when the archive cannot be
/// opened, holds no qualifying metadata document, or none of them yields
/// an entry.
pub fn read_archive(bytes: &[u8]) -> ArchiveResult<ImportedDataset> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let all_paths: Vec<String> = archive.file_names().map(str::to_string).collect();

    let mut metadata_paths: Vec<&str> = all_paths
        .iter()
        .map(String::as_str)
        .filter(|path| is_case_metadata(path))
        .collect();
    metadata_paths.sort_unstable();

    if metadata_paths.is_empty() {
        return Err(ArchiveError::NoMetadata);
    }

    let mut warnings = Vec::new();
    let mut entries = Vec::new();
    let mut seen_ids = HashSet::new();

    for metadata_path in &metadata_paths {
        let document = match read_member(&mut archive, metadata_path)
            .map_err(|e| e.to_string())
            .and_then(|data| CaseDocument::parse(&data).map_err(|e| e.to_string()))
        {
            Ok(document) => document,
            Err(reason) => {
                record(
                    &mut warnings,
                    ImportWarning::UnreadableMetadata {
                        path: metadata_path.to_string(),
                        reason,
                    },
                );
                continue;
            }
        };

        let mut draft = build_draft(&mut archive, &all_paths, metadata_path, &document, &mut warnings);

        if !seen_ids.insert(draft.id.clone()) {
            let replacement = mint_id();
            record(
                &mut warnings,
                ImportWarning::DuplicateEntryId {
                    metadata_path: metadata_path.to_string(),
                    id: draft.id.clone(),
                    replacement: replacement.clone(),
                },
            );
            seen_ids.insert(replacement.clone());
            draft.id = replacement;
        }

        entries.push(draft);
    }

    if entries.is_empty() {
        return Err(ArchiveError::NoEntries);
    }

    Ok(ImportedDataset {
        entries,
        warnings,
        metadata_documents: metadata_paths.len(),
    })
}

fn build_draft(
    archive: &mut Archive<'_>,
    all_paths: &[String],
    metadata_path: &str,
    document: &CaseDocument,
    warnings: &mut Vec<ImportWarning>,
) -> EntryDraft {
    let prefix = case_prefix(metadata_path);

    let mut references = Vec::new();
    for reference in &document.references {
        let Some(name) = reference.file_name() else {
            record(warnings, malformed(ImageKind::Reference, metadata_path, reference));
            continue;
        };
        let location = ImageLocation {
            archive_path: format!("{}{}", prefix, name),
            file_name: name.to_string(),
        };
        if let Some(payload) = load_image(archive, &location, ImageKind::Reference, warnings) {
            references.push(payload);
        }
    }

    let strategy = if document.targets.is_some() {
        TargetStrategy::Declared
    } else {
        TargetStrategy::LegacyFolderScan
    };

    let mut targets = Vec::new();
    for (target, location) in resolve_targets(strategy, document, all_paths, prefix) {
        let Some(location) = location else {
            record(warnings, malformed(ImageKind::Target, metadata_path, &target));
            continue;
        };
        if let Some(payload) = load_image(archive, &location, ImageKind::Target, warnings) {
            targets.push(TargetDraft {
                model: document.model_for(&target, &location.file_name),
                file: payload,
            });
        }
    }

    EntryDraft {
        id: document.id.clone().unwrap_or_else(mint_id),
        text: document.prompt.clone().unwrap_or_default(),
        scope: document
            .scope
            .clone()
            .unwrap_or_else(|| default_scope().to_string()),
        purpose: document.purpose.clone().unwrap_or_default(),
        references,
        targets,
    }
}

/// Target references paired with their archive location. A `None`
/// location marks a reference that names no file.
fn resolve_targets(
    strategy: TargetStrategy,
    document: &CaseDocument,
    all_paths: &[String],
    prefix: &str,
) -> Vec<(FileRef, Option<ImageLocation>)> {
    match strategy {
        TargetStrategy::Declared => document
            .targets
            .iter()
            .flatten()
            .map(|target| {
                let location = target.file_name().map(|name| ImageLocation {
                    archive_path: format!("{}{}", prefix, name),
                    file_name: name.to_string(),
                });
                (target.clone(), location)
            })
            .collect(),
        TargetStrategy::LegacyFolderScan => scan_legacy_targets(all_paths, prefix)
            .into_iter()
            .map(|location| (FileRef::FileName(location.file_name.clone()), Some(location)))
            .collect(),
    }
}

/// `target_<n>.<ext>` files directly inside the case folder, sorted by
/// path. The folder prefix is matched without regard to ASCII case.
fn scan_legacy_targets(all_paths: &[String], prefix: &str) -> Vec<ImageLocation> {
    let mut found: Vec<ImageLocation> = all_paths
        .iter()
        .filter_map(|path| {
            let rest = strip_prefix_ignore_ascii_case(path, prefix)?;
            if rest.contains('/') || !is_legacy_target_name(rest) {
                return None;
            }
            Some(ImageLocation {
                archive_path: path.clone(),
                file_name: rest.to_string(),
            })
        })
        .collect();
    found.sort_by(|a, b| a.archive_path.cmp(&b.archive_path));
    found
}

fn strip_prefix_ignore_ascii_case<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if path.len() < prefix.len() || !path.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, rest) = path.split_at(prefix.len());
    if head.eq_ignore_ascii_case(prefix) {
        Some(rest)
    } else {
        None
    }
}

fn load_image(
    archive: &mut Archive<'_>,
    location: &ImageLocation,
    kind: ImageKind,
    warnings: &mut Vec<ImportWarning>,
) -> Option<FilePayload> {
    match read_member(archive, &location.archive_path) {
        Ok(bytes) => Some(
            FilePayload::new(location.file_name.clone(), bytes)
                .with_content_type(content_type_for(&location.file_name)),
        ),
        Err(ArchiveError::Zip(ZipError::FileNotFound)) => {
            record(
                warnings,
                ImportWarning::MissingImage {
                    kind,
                    path: location.archive_path.clone(),
                },
            );
            None
        }
        Err(e) => {
            record(
                warnings,
                ImportWarning::UnreadableImage {
                    kind,
                    path: location.archive_path.clone(),
                    reason: e.to_string(),
                },
            );
            None
        }
    }
}

fn read_member(archive: &mut Archive<'_>, path: &str) -> ArchiveResult<Vec<u8>> {
    let mut file = archive.by_name(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn malformed(kind: ImageKind, metadata_path: &str, value: &FileRef) -> ImportWarning {
    let value = match value {
        FileRef::FileName(name) => format!("{:?}", name),
        FileRef::Record { file, model } => format!("{{file: {:?}, model: {:?}}}", file, model),
        FileRef::Malformed(value) => value.to_string(),
    };
    ImportWarning::MalformedImageRef {
        kind,
        metadata_path: metadata_path.to_string(),
        value,
    }
}

fn record(warnings: &mut Vec<ImportWarning>, warning: ImportWarning) {
    warn!("{}", warning);
    warnings.push(warning);
}

/// Swap the parsed entries into `store`, releasing the old collection.
pub fn apply_import(store: &mut CollectionStore, dataset: ImportedDataset) -> ImportOutcome {
    let missing_model_labels = dataset.missing_model_labels();
    let imported_entries = dataset.entries.len();
    store.replace_all(dataset.entries);

    info!(
        "Imported {} entr{} from {} metadata document(s), {} warning(s)",
        imported_entries,
        if imported_entries == 1 { "y" } else { "ies" },
        dataset.metadata_documents,
        dataset.warnings.len()
    );
    if missing_model_labels > 0 {
        warn!(
            "{} imported target result(s) have no model name yet",
            missing_model_labels
        );
    }

    ImportOutcome {
        imported_entries,
        warnings: dataset.warnings,
        missing_model_labels,
    }
}

/// Parse `bytes` and, if anything usable was found, replace the contents of
/// `store`. On error the store is left untouched.
pub fn import_archive(store: &mut CollectionStore, bytes: &[u8]) -> ArchiveResult<ImportOutcome> {
    let dataset = read_archive(bytes)?;
    Ok(apply_import(store, dataset))
}

/// Import an unpacked dataset folder.
pub fn import_directory(store: &mut CollectionStore, source_dir: &Path) -> ArchiveResult<ImportOutcome> {
    let bytes = archive_directory(source_dir)?;
    import_archive(store, &bytes)
}
