//! Path aggregation across direct files, file sets and resolved artifacts.
//!
//! Sources are appended in the order the caller pushes them. Paths are
//! de-duplicated by normalized absolute value; the first occurrence keeps
//! its position and provenance.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::adapters::ResolvedArtifact;
use crate::domain::path::absolute;
use crate::domain::{FileSetSpec, Outcome, Provenance, ResolvedPath};
use crate::error::{PipelineError, PipelineResult};

use super::scanner::CompiledFileSet;

/// Order-preserving, de-duplicating path collector
#[derive(Debug)]
pub struct PathAggregator {
    /// What is being collected, for diagnostics (e.g. "JAR", "data")
    label: String,
    paths: Vec<ResolvedPath>,
    seen: HashSet<PathBuf>,
}

impl PathAggregator {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            paths: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn push(&mut self, path: &Path, provenance: Provenance) -> bool {
        let normalized = absolute(path);
        if !self.seen.insert(normalized.clone()) {
            debug!(path = %normalized.display(), %provenance, "Skipping duplicate path");
            return false;
        }
        self.paths.push(ResolvedPath::new(normalized, provenance));
        true
    }

    /// Add explicitly listed files. Missing files are skipped with a warning.
    pub fn push_direct<I, P>(&mut self, files: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for file in files {
            let file = file.as_ref();
            if file.exists() {
                self.push(file, Provenance::DirectFile);
            } else {
                warn!("{} {} not found!", self.label, absolute(file).display());
            }
        }
        self
    }

    /// Add the files matched by a file set.
    ///
    /// An unset base directory is a configuration error; a base directory
    /// that does not exist is skipped with a warning.
    pub fn push_file_set(&mut self, spec: &FileSetSpec) -> PipelineResult<&mut Self> {
        self.push_set(spec, true, false)
    }

    /// Add the directories matched by a file set
    pub fn push_dir_set(&mut self, spec: &FileSetSpec) -> PipelineResult<&mut Self> {
        self.push_set(spec, false, true)
    }

    fn push_set(&mut self, spec: &FileSetSpec, files: bool, dirs: bool) -> PipelineResult<&mut Self> {
        let directory = spec.directory.as_ref().ok_or_else(|| {
            PipelineError::config(format!("Missing base directory for {} set {}", self.label, spec))
        })?;

        if !directory.is_dir() {
            warn!(
                "Ignored non-existing {} set directory {}",
                self.label,
                directory.display()
            );
            return Ok(self);
        }

        for path in CompiledFileSet::new(spec)?.scan(files, dirs) {
            self.push(&path, Provenance::FileSetMatch);
        }
        Ok(self)
    }

    /// Add resolved artifact files
    pub fn push_artifacts<'a, I>(&mut self, artifacts: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a ResolvedArtifact>,
    {
        for artifact in artifacts {
            self.push(&artifact.file, Provenance::ResolvedArtifact);
        }
        self
    }

    /// Add a path produced by the pipeline itself (e.g. an extraction directory)
    pub fn push_resolved(&mut self, path: &Path, provenance: Provenance) -> &mut Self {
        self.push(path, provenance);
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Paths collected so far, in order
    pub fn paths(&self) -> &[ResolvedPath] {
        &self.paths
    }

    /// Finish aggregation; no paths at all is [`Outcome::NothingToDo`]
    pub fn finish(self) -> Outcome<Vec<ResolvedPath>> {
        if self.paths.is_empty() {
            return Outcome::NothingToDo(format!("No {} files found", self.label));
        }
        for path in &self.paths {
            debug!("  {} ({})", path.path.display(), path.provenance);
        }
        Outcome::Completed(self.paths)
    }

    /// Finish aggregation, keeping an empty list as a plain value
    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths.into_iter().map(|p| p.path).collect()
    }
}
