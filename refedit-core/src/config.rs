use zip::CompressionMethod;

/// Archive writing knobs. Naming of folders, files and documents is fixed
/// and not configurable.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveConfig {
    /// Compression applied to every archive member.
    pub compression: CompressionMethod,
    /// Write explicit entries for the root and case folders.
    pub directory_entries: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
            directory_entries: true,
        }
    }
}

impl ArchiveConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            compression: std::env::var("REFEDIT_ARCHIVE_COMPRESSION")
                .ok()
                .and_then(|value| parse_compression(&value))
                .unwrap_or(defaults.compression),
            directory_entries: std::env::var("REFEDIT_ARCHIVE_DIRECTORY_ENTRIES")
                .ok()
                .and_then(|value| parse_flag(&value))
                .unwrap_or(defaults.directory_entries),
        }
    }
}

fn parse_compression(value: &str) -> Option<CompressionMethod> {
    match value.trim().to_lowercase().as_str() {
        "deflated" | "deflate" => Some(CompressionMethod::Deflated),
        "stored" | "none" => Some(CompressionMethod::Stored),
        _ => None,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
