//! emma4it - EMMA coverage for integration tests
//!
//! Collects the binary artifacts that take part in a build (dependency
//! JARs, project output, ad-hoc file sets), hands them to the EMMA
//! instrumentation engine, merges the coverage metadata that independent
//! modules leave behind and produces coverage reports.
//!
//! # Architecture
//!
//! The pipeline never instruments or renders anything itself:
//! - Coverage engines, repository resolution and archive extraction sit
//!   behind traits in `adapters`
//! - `core` decides which files participate and builds the engine requests
//! - An empty input is an [`Outcome::NothingToDo`], not an error
//!
//! # Modules
//!
//! - `adapters`: External collaborators (EMMA CLI, local repository, zip)
//! - `core`: Scanning, aggregation and the goal pipelines
//! - `domain`: Data structures (coordinates, file sets, filters, requests)
//! - `config`: Configuration and build-directory layout
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Instrument configured JARs into target/emma/coverage.em
//! emma4it instrument
//!
//! # Merge coverage.ec / coverage.em files from a multi-module build
//! emma4it merge --search-path it/target
//!
//! # Render reports
//! emma4it report --formats html,xml
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use adapters::{
    ArchiveExtractor, CoverageEngine, EmmaCli, LocalRepository, MergeEngine, ReportEngine,
    RepositoryResolver, ResolvedArtifact, ZipExtractor,
};
pub use crate::core::{
    merge_all, repackage, scan, InstrumentPipeline, PathAggregator, ProjectInstrumenter,
    ReportPipeline, RepositoryCopier,
};
pub use domain::{
    ArtifactCoordinate, CoverageFilter, FileSetSpec, FilterRule, InstrumentationRequest,
    MergeRequest, Outcome, OutputMode, Provenance, RepackageRequest, ReportFormat, ReportRequest,
    ResolvedPath,
};
pub use error::{PipelineError, PipelineResult, ResolutionFailure};
