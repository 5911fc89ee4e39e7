//! Instrumentation of dependency and ad-hoc JARs.
//!
//! Collects the instrumentation path (artifact items, then direct JAR files,
//! then JAR sets), composes the coverage filter and hands everything to the
//! coverage engine. Metadata always accumulates into `emma/coverage.em`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::adapters::{CoverageEngine, RepositoryResolver, ResolvedArtifact};
use crate::config::paths;
use crate::domain::{
    ArtifactCoordinate, CoverageFilter, FileSetSpec, InstrumentationRequest, Outcome, OutputMode,
    ResolvedPath,
};
use crate::error::{PipelineError, PipelineResult};

use super::aggregator::PathAggregator;

/// `instrument` goal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Artifacts resolved from the repository and instrumented
    #[serde(default, alias = "artifactItems")]
    pub artifact_items: Vec<ArtifactCoordinate>,

    /// JAR files listed explicitly
    #[serde(default, alias = "jarFiles")]
    pub jar_files: Vec<PathBuf>,

    /// JAR file sets
    #[serde(default, alias = "jarSets")]
    pub jar_sets: Vec<FileSetSpec>,

    /// Class include filter
    #[serde(default)]
    pub includes: Vec<String>,

    /// Class exclude filter
    #[serde(default)]
    pub excludes: Vec<String>,

    /// One of overwrite, copy, fullcopy (validated at run time)
    #[serde(default = "default_output_mode", alias = "outputMode")]
    pub output_mode: String,
}

pub(crate) fn default_output_mode() -> String {
    OutputMode::Overwrite.to_string()
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            artifact_items: Vec::new(),
            jar_files: Vec::new(),
            jar_sets: Vec::new(),
            includes: Vec::new(),
            excludes: Vec::new(),
            output_mode: default_output_mode(),
        }
    }
}

impl InstrumentConfig {
    /// Resolve relative file and file set paths against `root`
    pub fn rooted_at(mut self, root: &Path) -> Self {
        self.jar_files = self
            .jar_files
            .into_iter()
            .map(|f| if f.is_absolute() { f } else { root.join(f) })
            .collect();
        self.jar_sets = self.jar_sets.into_iter().map(|s| s.rooted_at(root)).collect();
        self
    }

    pub fn filter(&self) -> CoverageFilter {
        CoverageFilter::compose(&self.includes, &self.excludes)
    }
}

/// What an instrumentation run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentSummary {
    pub paths: Vec<ResolvedPath>,
    pub metadata_file: PathBuf,
    pub output_mode: OutputMode,
}

/// Build a request that merges into `metadata_file`
pub fn build_request(
    input_paths: Vec<PathBuf>,
    filter: CoverageFilter,
    output_mode: OutputMode,
    metadata_file: PathBuf,
) -> InstrumentationRequest {
    InstrumentationRequest {
        input_paths,
        filter,
        output_mode,
        output_directory: None,
        metadata_output_file: metadata_file,
        merge_with_existing: true,
    }
}

/// Create the metadata directory and invoke the engine
pub fn instrument(engine: &dyn CoverageEngine, request: &InstrumentationRequest) -> PipelineResult<()> {
    if let Some(dir) = request.metadata_output_file.parent() {
        // create_dir_all succeeds if another process created it first
        std::fs::create_dir_all(dir).map_err(PipelineError::io(dir))?;
    }

    info!(
        engine = engine.name(),
        paths = request.input_paths.len(),
        mode = %request.output_mode,
        metadata = %request.metadata_output_file.display(),
        "Instrumenting"
    );
    engine.instrument(request)
}

/// Resolve each coordinate to one file; any failure is fatal
pub fn resolve_all(
    resolver: &dyn RepositoryResolver,
    items: &[ArtifactCoordinate],
) -> PipelineResult<Vec<ResolvedArtifact>> {
    items
        .iter()
        .map(|coordinate| -> PipelineResult<ResolvedArtifact> {
            let file = resolver.resolve(coordinate)?;
            Ok(ResolvedArtifact {
                coordinate: coordinate.clone(),
                file,
            })
        })
        .collect()
}

/// Instrumentation pipeline over external collaborators
pub struct InstrumentPipeline<'a> {
    engine: &'a dyn CoverageEngine,
    resolver: &'a dyn RepositoryResolver,
    build_dir: PathBuf,
}

impl<'a> InstrumentPipeline<'a> {
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

    /// Collect the instrumentation path without invoking the engine
    pub fn collect_paths(&self, config: &InstrumentConfig) -> PipelineResult<PathAggregator> {
        debug!("Collecting JAR files");

        let mut aggregator = PathAggregator::new("JAR");

        if !config.artifact_items.is_empty() {
            let artifacts = resolve_all(self.resolver, &config.artifact_items)?;
            aggregator.push_artifacts(&artifacts);
        }

        aggregator.push_direct(&config.jar_files);

        for set in &config.jar_sets {
            aggregator.push_file_set(set)?;
        }

        Ok(aggregator)
    }

    /// Run the goal
    #[tracing::instrument(skip_all, fields(build_dir = %self.build_dir.display()))]
    pub fn run(&self, config: &InstrumentConfig) -> PipelineResult<Outcome<InstrumentSummary>> {
        let output_mode: OutputMode = config.output_mode.parse()?;

        let paths = match self.collect_paths(config)?.finish() {
            Outcome::Completed(paths) => paths,
            Outcome::NothingToDo(_) => {
                error!("Nothing found to instrument!");
                return Ok(Outcome::NothingToDo("Nothing found to instrument".to_string()));
            }
        };

        let metadata_file = paths::metadata_file(&self.build_dir);
        let request = build_request(
            paths.iter().map(|p| p.path.clone()).collect(),
            config.filter(),
            output_mode,
            metadata_file.clone(),
        );
        instrument(self.engine, &request)?;

        Ok(Outcome::Completed(InstrumentSummary {
            paths,
            metadata_file,
            output_mode,
        }))
    }
}
