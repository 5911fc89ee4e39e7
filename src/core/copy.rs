//! Repository copying.
//!
//! Mirrors the local-repository directories of artifact items, or of their
//! runtime dependencies when resolved transitively, into a separate
//! repository tree, then instruments the copied main artifacts. Integration tests can point a
//! forked build at that tree and run against instrumented dependencies.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::adapters::{CoverageEngine, RepositoryResolver, ResolvedArtifact};
use crate::config::paths;
use crate::domain::{ArtifactCoordinate, CoverageFilter, OutputMode};
use crate::error::{PipelineError, PipelineResult};

use super::instrument::{build_request, instrument};

/// `copy` goal configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Artifacts to copy
    #[serde(default, alias = "artifactItems")]
    pub artifact_items: Vec<ArtifactCoordinate>,

    /// Target repository directory (default: `<build>/fake-repo`)
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// What a copy run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopySummary {
    /// Target directories, in copy order
    pub copied: Vec<PathBuf>,

    /// Copied main artifacts that were instrumented
    pub instrumented: Vec<PathBuf>,
}

/// Recursively copy `from` into `to`, overwriting existing files
pub fn copy_dir(from: &Path, to: &Path) -> PipelineResult<()> {
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            PipelineError::Io {
                path,
                source: e.into(),
            }
        })?;

        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(PipelineError::io(&target))?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(PipelineError::io(entry.path()))?;
        }
    }
    Ok(())
}

/// Repository copier over external collaborators
pub struct RepositoryCopier<'a> {
    engine: &'a dyn CoverageEngine,
    resolver: &'a dyn RepositoryResolver,
    build_dir: PathBuf,
}

impl<'a> RepositoryCopier<'a> {
    pub fn new(
        engine: &'a dyn CoverageEngine,
        resolver: &'a dyn RepositoryResolver,
        build_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            resolver,
            build_dir: build_dir.into(),
        }
    }

    /// Target location of an artifact file inside `output`
    fn target_of(&self, file: &Path, output: &Path) -> PipelineResult<(PathBuf, PathBuf)> {
        let root = self.resolver.local_root().ok_or_else(|| {
            PipelineError::config("Repository copy needs a local repository")
        })?;
        let source_dir = file.parent().unwrap_or(root);
        let relative = source_dir.strip_prefix(root).map_err(|_| {
            PipelineError::config(format!(
                "Artifact {} is outside the local repository {}",
                file.display(),
                root.display()
            ))
        })?;
        Ok((source_dir.to_path_buf(), output.join(relative)))
    }

    /// Copy the directory holding `file`; returns the copied file's new path
    fn copy_artifact(
        &self,
        file: &Path,
        output: &Path,
        copied: &mut HashSet<PathBuf>,
        summary: &mut CopySummary,
    ) -> PipelineResult<PathBuf> {
        let (source_dir, target_dir) = self.target_of(file, output)?;
        let target_file = match file.file_name() {
            Some(name) => target_dir.join(name),
            None => target_dir.clone(),
        };

        if copied.insert(target_dir.clone()) {
            debug!(from = %source_dir.display(), to = %target_dir.display(), "Copying artifact directory");
            copy_dir(&source_dir, &target_dir)?;
            summary.copied.push(target_dir);
        }
        Ok(target_file)
    }

    #[tracing::instrument(skip_all, fields(build_dir = %self.build_dir.display()))]
    pub fn run(&self, config: &CopyConfig) -> PipelineResult<CopySummary> {
        let output = config
            .output
            .clone()
            .unwrap_or_else(|| paths::fake_repo(&self.build_dir));

        let mut summary = CopySummary::default();
        let mut copied = HashSet::new();
        let mut instrumented = HashSet::new();

        for item in &config.artifact_items {
            let main = self.resolver.resolve(item)?;

            // The closure stands for the item's dependencies; the item itself
            // is copied below only when it gets instrumented
            let members = if item.resolve_transitively {
                self.resolver
                    .resolve_closure(item)?
                    .into_iter()
                    .filter(|member| member.coordinate != *item)
                    .collect()
            } else {
                vec![ResolvedArtifact {
                    coordinate: item.clone(),
                    file: main.clone(),
                }]
            };

            for member in &members {
                self.copy_artifact(&member.file, &output, &mut copied, &mut summary)?;
            }

            if item.instrument {
                let target = self.copy_artifact(&main, &output, &mut copied, &mut summary)?;
                if instrumented.insert(target.clone()) {
                    let request = build_request(
                        vec![target.clone()],
                        CoverageFilter::none(),
                        OutputMode::Overwrite,
                        paths::metadata_file(&self.build_dir),
                    );
                    instrument(self.engine, &request)?;
                    summary.instrumented.push(target);
                }
            }
        }

        info!(
            directories = summary.copied.len(),
            instrumented = summary.instrumented.len(),
            output = %output.display(),
            "Repository copy finished"
        );

        Ok(summary)
    }
}
