pub mod archive;
pub mod config;
pub mod errors;
pub mod handles;
pub mod model;
pub mod preview;
pub mod session;
pub mod store;

pub use archive::{ExportedArchive, Exporter, ImportOutcome, ImportWarning};
pub use config::ArchiveConfig;
pub use handles::{DisplayHandle, HandleRegistry};
pub use model::{EntryField, FilePayload, PromptEntry, ReferenceImage, TargetImage};
pub use session::Session;
pub use store::CollectionStore;
