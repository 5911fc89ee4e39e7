//! Instrumentation of the project's own output archive.
//!
//! The archive is copied into `<build>/emma/` and the copy is instrumented,
//! leaving the regular build output untouched. Optionally the EMMA runtime
//! classes are bundled into the instrumented copy so it can run without
//! extra classpath entries.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapters::{CoverageEngine, RepositoryResolver};
use crate::config::paths;
use crate::domain::{ArtifactCoordinate, CoverageFilter, OutputMode, RepackageRequest};
use crate::error::{PipelineError, PipelineResult};

use super::instrument::{build_request, default_output_mode, instrument};
use super::repackage::{repackage, RepackageSummary};

/// Coordinate of the EMMA runtime bundled by `append_emma`
pub fn emma_runtime() -> ArtifactCoordinate {
    ArtifactCoordinate::new("emma", "emma", "2.0.5312")
}

/// `instrument_project` goal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInstrumentConfig {
    /// The project's packaged archive
    #[serde(default)]
    pub artifact: Option<PathBuf>,

    /// Class include filter
    #[serde(default)]
    pub includes: Vec<String>,

    /// Class exclude filter
    #[serde(default)]
    pub excludes: Vec<String>,

    /// One of overwrite, copy, fullcopy
    #[serde(default = "default_output_mode", alias = "outputMode")]
    pub output_mode: String,

    /// Bundle the EMMA runtime into the instrumented archive
    #[serde(default, alias = "appendEmma")]
    pub append_emma: bool,
}

impl Default for ProjectInstrumentConfig {
    fn default() -> Self {
        Self {
            artifact: None,
            includes: Vec::new(),
            excludes: Vec::new(),
            output_mode: default_output_mode(),
            append_emma: false,
        }
    }
}

/// What a project instrumentation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    /// Instrumented copy under `<build>/emma/`
    pub instrumented: PathBuf,

    pub metadata_file: PathBuf,

    /// Present when the runtime was bundled
    pub repackaged: Option<RepackageSummary>,
}

/// Project archive instrumentation over external collaborators
pub struct ProjectInstrumenter<'a> {
    engine: &'a dyn CoverageEngine,
    resolver: &'a dyn RepositoryResolver,
    build_dir: PathBuf,
}

impl<'a> ProjectInstrumenter<'a> {
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

    #[tracing::instrument(skip_all, fields(build_dir = %self.build_dir.display()))]
    pub fn run(&self, config: &ProjectInstrumentConfig) -> PipelineResult<ProjectSummary> {
        let artifact = config
            .artifact
            .as_ref()
            .filter(|artifact| artifact.is_file())
            .ok_or_else(|| PipelineError::config("Unable to find project artifact file!"))?;
        let output_mode: OutputMode = config.output_mode.parse()?;
        let file_name = artifact
            .file_name()
            .ok_or_else(|| PipelineError::config(format!("Invalid artifact path {}", artifact.display())))?;

        let emma_dir = paths::emma_dir(&self.build_dir);
        std::fs::create_dir_all(&emma_dir).map_err(PipelineError::io(&emma_dir))?;

        let instrumented = emma_dir.join(file_name);
        std::fs::copy(artifact, &instrumented).map_err(PipelineError::io(artifact))?;

        let metadata_file = paths::metadata_file(&self.build_dir);
        let request = build_request(
            vec![instrumented.clone()],
            CoverageFilter::compose(&config.includes, &config.excludes),
            output_mode,
            metadata_file.clone(),
        );
        instrument(self.engine, &request)?;

        let repackaged = if config.append_emma {
            Some(self.append_runtime(&instrumented)?)
        } else {
            None
        };

        Ok(ProjectSummary {
            instrumented,
            metadata_file,
            repackaged,
        })
    }

    fn append_runtime(&self, instrumented: &Path) -> PipelineResult<RepackageSummary> {
        let runtime = self.resolver.resolve(&emma_runtime())?;
        info!(runtime = %runtime.display(), "Bundling EMMA runtime");

        repackage(&RepackageRequest {
            base_archive: instrumented.to_path_buf(),
            append_archive: runtime,
            exclude_namespace_prefix: Some(paths::META_INF.to_string()),
            output_archive: instrumented.to_path_buf(),
        })
    }
}
