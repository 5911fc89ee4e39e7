//! Zip-family archive extraction.

use std::fs::File;
use std::path::Path;

use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{PipelineError, PipelineResult};

use super::ArchiveExtractor;

/// Extensions handled as zip archives
const ZIP_EXTENSIONS: &[&str] = &["zip", "jar", "war", "ear", "sar", "rar", "par"];

/// Extracts zip, jar and related archives
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    /// Whether the file name has a supported extension
    pub fn supports(archive: &Path) -> bool {
        archive
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ZIP_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive: &Path, destination: &Path) -> PipelineResult<()> {
        if !Self::supports(archive) {
            return Err(PipelineError::archive(archive)(ZipError::UnsupportedArchive(
                "unsupported archive format",
            )));
        }

        std::fs::create_dir_all(destination).map_err(PipelineError::io(destination))?;

        let file = File::open(archive).map_err(PipelineError::io(archive))?;
        let mut zip = ZipArchive::new(file).map_err(PipelineError::archive(archive))?;
        debug!(
            archive = %archive.display(),
            destination = %destination.display(),
            entries = zip.len(),
            "Extracting archive"
        );
        zip.extract(destination).map_err(PipelineError::archive(archive))?;

        Ok(())
    }
}
