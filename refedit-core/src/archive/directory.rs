//! Bridging between archives and unpacked dataset folders on disk.

use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::{ArchiveError, ArchiveResult};

fn has_hidden_component(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(value) => value.to_string_lossy().starts_with('.'),
        Component::ParentDir | Component::RootDir | Component::Prefix(_) => true,
        Component::CurDir => false,
    })
}

fn sanitize_relative_path(path: &str) -> ArchiveResult<PathBuf> {
    let candidate = Path::new(path);
    if candidate.is_absolute()
        || candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ArchiveError::InvalidPath(path.to_string()));
    }
    Ok(candidate.components().collect())
}

/// Unpack `bytes` under `target_dir`, skipping hidden entries. Returns the
/// relative paths written.
pub fn extract_archive(bytes: &[u8], target_dir: &Path) -> ArchiveResult<Vec<PathBuf>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut written = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let rel_path = sanitize_relative_path(entry.name())?;
        if has_hidden_component(&rel_path) {
            continue;
        }

        let out_path = target_dir.join(&rel_path);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = fs::File::create(&out_path)?;
        std::io::copy(&mut entry, &mut outfile)?;
        debug!("Extracted {:?}", out_path);

        written.push(rel_path);
    }

    Ok(written)
}

/// Pack every non-hidden file below `source_dir` into an archive, with
/// paths relative to `source_dir`.
pub fn archive_directory(source_dir: &Path) -> ArchiveResult<Vec<u8>> {
    if !source_dir.is_dir() {
        return Err(ArchiveError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Dataset directory {:?} does not exist", source_dir),
        )));
    }

    fn collect(dir: &Path, root: &Path, acc: &mut Vec<PathBuf>) -> ArchiveResult<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let rel = path
                .strip_prefix(root)
                .map_err(|_| ArchiveError::InvalidPath(path.display().to_string()))?;
            if has_hidden_component(rel) {
                continue;
            }
            if path.is_dir() {
                collect(&path, root, acc)?;
            } else {
                acc.push(rel.to_path_buf());
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    collect(source_dir, source_dir, &mut files)?;
    files.sort();

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for rel in files {
            let mut file = fs::File::open(source_dir.join(&rel))?;
            let rel_string = rel.to_string_lossy().replace('\\', "/");
            writer.start_file(rel_string, options)?;
            std::io::copy(&mut file, &mut writer)?;
        }

        writer.finish()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_relative_path() {
        assert!(sanitize_relative_path("case_01/metadata.json").is_ok());
        assert!(matches!(
            sanitize_relative_path("../escape.png"),
            Err(ArchiveError::InvalidPath(_))
        ));
        assert!(sanitize_relative_path("/etc/passwd").is_err());
    }

    #[test]
    fn test_hidden_components() {
        assert!(has_hidden_component(Path::new("root/.DS_Store")));
        assert!(has_hidden_component(Path::new(".git/config")));
        assert!(!has_hidden_component(Path::new("root/case_01/ref_1.png")));
    }
}
