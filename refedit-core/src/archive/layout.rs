//! Naming rules for the dataset archive.
//!
//! ```text
//! RefEdit_Dataset_<date>/
//!   dataset_summary.json
//!   case_01/
//!     metadata.json
//!     ref_1.<ext>, ref_2.<ext>, ...
//!     target_1.<ext>, target_2.<ext>, ...
//! ```

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::FilePayload;

pub const DATASET_PREFIX: &str = "RefEdit_Dataset";
pub const METADATA_FILE: &str = "metadata.json";
pub const SUMMARY_FILE: &str = "dataset_summary.json";
pub const DEFAULT_EXTENSION: &str = "png";

pub const REFERENCE_PREFIX: &str = "ref_";
pub const TARGET_PREFIX: &str = "target_";

/// Directory injected by the macOS archiver.
pub const PLATFORM_ARTIFACT_DIR: &str = "__MACOSX";
/// AppleDouble resource-fork files.
pub const HIDDEN_FILE_PREFIX: &str = "._";

static LEGACY_TARGET_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^target_\d+\.(png|jpe?g|webp|gif|bmp|svg)$").expect("valid target name pattern")
});

/// `case_01`, `case_02`, ... for zero-based `index`.
pub fn case_folder_name(index: usize) -> String {
    format!("case_{:02}", index + 1)
}

/// `ref_3.JPG` style name for the image at zero-based `index`.
pub fn saved_file_name(prefix: &str, index: usize, file: &FilePayload) -> String {
    format!(
        "{}{}.{}",
        prefix,
        index + 1,
        file.extension().unwrap_or(DEFAULT_EXTENSION)
    )
}

/// Top-level folder inside the archive.
pub fn root_folder_name(generated_at: DateTime<Utc>) -> String {
    format!("{}_{}", DATASET_PREFIX, generated_at.format("%Y-%m-%d"))
}

/// Name offered for the downloaded archive.
pub fn archive_file_name(generated_at: DateTime<Utc>) -> String {
    format!("{}_{}.zip", DATASET_PREFIX, generated_at.timestamp_millis())
}

/// Lowercased extension of `name`, `png` when there is none.
pub fn normalized_extension(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

pub fn content_type_for(name: &str) -> String {
    let ext = normalized_extension(name);
    if ext == "svg" {
        "image/svg+xml".to_string()
    } else {
        format!("image/{}", ext)
    }
}

/// Matches `target_<n>.<image ext>`, ignoring case.
pub fn is_legacy_target_name(file_name: &str) -> bool {
    LEGACY_TARGET_NAME.is_match(&file_name.to_lowercase())
}

/// Paths planted by archiving tools rather than by the user.
pub fn is_platform_artifact(path: &str) -> bool {
    if path.split('/').any(|component| component == PLATFORM_ARTIFACT_DIR) {
        return true;
    }
    path.rsplit('/')
        .next()
        .map(|name| name.starts_with(HIDDEN_FILE_PREFIX))
        .unwrap_or(false)
}

/// Folder prefix of a metadata document path, `""` at the archive root.
pub fn case_prefix(metadata_path: &str) -> &str {
    metadata_path
        .strip_suffix(METADATA_FILE)
        .unwrap_or(metadata_path)
}
