//! Dataset archive: export, import and folder bridging.

pub mod directory;
pub mod documents;
pub mod export;
pub mod import;
pub mod layout;

pub use directory::{archive_directory, extract_archive};
pub use documents::{CaseDocument, CaseMetadata, DatasetSummary, FileRef, SummaryCase, TargetModel};
pub use export::{plan_cases, validate_model_labels, CasePlan, ExportedArchive, Exporter};
pub use import::{
    apply_import, import_archive, import_directory, read_archive, ImageKind, ImportOutcome,
    ImportWarning, ImportedDataset, TargetStrategy,
};
