use std::io::{Cursor, Write};

use anyhow::Result;
use serde_json::Value;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builds zip archives by hand, for shapes the exporter never produces.
#[derive(Default)]
pub struct ArchiveBuilder {
    members: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.members.push((path.to_string(), bytes.into()));
        self
    }

    pub fn json(self, path: &str, value: &Value) -> Self {
        let bytes = serde_json::to_vec_pretty(value).unwrap_or_default();
        self.file(path, bytes)
    }

    pub fn build(self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut cursor);
            let options = FileOptions::default().compression_method(CompressionMethod::Stored);
            for (path, bytes) in self.members {
                zip.start_file(path, options)?;
                zip.write_all(&bytes)?;
            }
            zip.finish()?;
        }
        Ok(cursor.into_inner())
    }
}
