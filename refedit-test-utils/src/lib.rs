pub mod archive;
pub mod temp;

pub use archive::ArchiveBuilder;
pub use temp::TempDir;
