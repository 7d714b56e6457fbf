use std::io::{Cursor, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::MaterializeError;
use crate::runtime::archive_name::{ArchiveName, ARCHIVE_EXTENSION};

/// In-memory flat zip: one entry per destination path.
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    entries: usize,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            entries: 0,
        }
    }

    pub fn add_entry(&mut self, path: &str, content: &[u8]) -> Result<(), MaterializeError> {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer.start_file(path, options)?;
        self.writer.write_all(content).map_err(ZipError::Io)?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn finish(mut self) -> Result<Vec<u8>, MaterializeError> {
        Ok(self.writer.finish()?.into_inner())
    }
}

/// Writes the archive to the scratch directory for a file upload. The file
/// is deleted when the returned handle drops.
pub fn stage_archive(
    scratch_dir: &Path,
    name: &ArchiveName,
    bytes: &[u8],
) -> Result<NamedTempFile, MaterializeError> {
    let stem = format!("{}{}", name.content_hash, name.suffix);
    let mut staged = tempfile::Builder::new()
        .prefix(&stem)
        .suffix(ARCHIVE_EXTENSION)
        .tempfile_in(scratch_dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    Ok(staged)
}
