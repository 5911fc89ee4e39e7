//! Archive repackaging.
//!
//! Builds a new archive from every entry of a base archive followed by the
//! entries of a second archive, minus an excluded name prefix. Used to bundle
//! the coverage runtime into an instrumented JAR.
//!
//! The base archive is first copied to `original.jar` next to the output.
//! The new archive is written to a temporary file in the output directory
//! and only renamed over the output once complete, so a failure leaves the
//! previous output in place.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use zip::{ZipArchive, ZipWriter};

use crate::config::paths;
use crate::domain::RepackageRequest;
use crate::error::{PipelineError, PipelineResult};

/// Entry counts for one repackaging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepackageSummary {
    /// Entries copied from the base archive
    pub from_base: usize,

    /// Entries copied from the append archive
    pub from_append: usize,

    /// Append entries dropped by the excluded prefix
    pub excluded: usize,

    /// Base entries replaced by an append entry of the same name
    pub collisions: usize,
}

fn open_archive(path: &Path) -> PipelineResult<ZipArchive<File>> {
    let file = File::open(path).map_err(PipelineError::io(path))?;
    ZipArchive::new(file).map_err(PipelineError::archive(path))
}

/// Both paths exist and name the same file
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn is_excluded(name: &str, prefix: Option<&str>) -> bool {
    match prefix {
        Some(prefix) if !prefix.is_empty() => name.starts_with(prefix),
        _ => false,
    }
}

/// Names of the non-directory entries the append archive contributes
fn appended_names<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    prefix: Option<&str>,
    path: &Path,
) -> PipelineResult<HashSet<String>> {
    let mut names = HashSet::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(PipelineError::archive(path))?;
        if !entry.is_dir() && !is_excluded(entry.name(), prefix) {
            names.insert(entry.name().to_string());
        }
    }
    Ok(names)
}

/// Repackage `base_archive` + `append_archive` into `output_archive`
#[tracing::instrument(skip_all, fields(output = %request.output_archive.display()))]
pub fn repackage(request: &RepackageRequest) -> PipelineResult<RepackageSummary> {
    let output = &request.output_archive;
    let output_dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(output_dir).map_err(PipelineError::io(output_dir))?;

    // Read the base from a staged copy; the output path may be the base itself
    let staged = paths::staging_archive(output);
    if same_file(&request.base_archive, &staged) {
        debug!(staged = %staged.display(), "Base archive is already staged");
    } else {
        std::fs::copy(&request.base_archive, &staged).map_err(PipelineError::io(&request.base_archive))?;
        debug!(staged = %staged.display(), "Staged base archive");
    }

    let prefix = request.exclude_namespace_prefix.as_deref();
    let mut base = open_archive(&staged)?;
    let mut append = open_archive(&request.append_archive)?;
    let replaced = appended_names(&mut append, prefix, &request.append_archive)?;

    let mut temp = NamedTempFile::new_in(output_dir).map_err(PipelineError::io(output_dir))?;
    let mut summary = RepackageSummary::default();

    {
        let mut writer = ZipWriter::new(temp.as_file_mut());

        for i in 0..base.len() {
            let entry = base.by_index_raw(i).map_err(PipelineError::archive(&staged))?;
            if entry.is_dir() {
                continue;
            }
            if replaced.contains(entry.name()) {
                warn!(
                    entry = entry.name(),
                    append = %request.append_archive.display(),
                    "Entry exists in both archives, keeping the appended one"
                );
                summary.collisions += 1;
                continue;
            }
            writer.raw_copy_file(entry).map_err(PipelineError::archive(output))?;
            writer.flush().map_err(PipelineError::io(output))?;
            summary.from_base += 1;
        }

        for i in 0..append.len() {
            let entry = append
                .by_index_raw(i)
                .map_err(PipelineError::archive(&request.append_archive))?;
            if entry.is_dir() {
                continue;
            }
            if is_excluded(entry.name(), prefix) {
                debug!(entry = entry.name(), "Excluded");
                summary.excluded += 1;
                continue;
            }
            writer.raw_copy_file(entry).map_err(PipelineError::archive(output))?;
            writer.flush().map_err(PipelineError::io(output))?;
            summary.from_append += 1;
        }

        writer.finish().map_err(PipelineError::archive(output))?;
    }

    // Temp files are created owner-only; keep the mode of the file being replaced
    let permissions = std::fs::metadata(output)
        .or_else(|_| std::fs::metadata(&request.base_archive))
        .map(|m| m.permissions())
        .map_err(PipelineError::io(&request.base_archive))?;
    temp.as_file()
        .set_permissions(permissions)
        .map_err(PipelineError::io(output))?;

    // On any error above, dropping `temp` removes the partial archive
    temp.persist(output)
        .map_err(|e| PipelineError::io(output)(e.error))?;

    info!(
        from_base = summary.from_base,
        from_append = summary.from_append,
        excluded = summary.excluded,
        collisions = summary.collisions,
        "Repackaged {}",
        output.display()
    );

    Ok(summary)
}
