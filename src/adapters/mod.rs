//! Adapter interfaces for external systems.
//!
//! The coverage work itself (instrumentation, merging, reporting) and
//! artifact resolution are done by collaborators outside this crate. The
//! pipeline only talks to them through these traits.

pub mod emma;
pub mod extractor;
pub mod pom;
pub mod repository;

use std::path::{Path, PathBuf};

use crate::domain::{ArtifactCoordinate, InstrumentationRequest, MergeRequest, ReportRequest};
use crate::error::{PipelineResult, ResolutionFailure};

pub use emma::EmmaCli;
pub use extractor::ZipExtractor;
pub use repository::LocalRepository;

/// A coordinate paired with the local file it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub coordinate: ArtifactCoordinate,
    pub file: PathBuf,
}

/// Bytecode instrumentation engine
pub trait CoverageEngine {
    /// Human-readable engine name
    fn name(&self) -> &str;

    /// Instrument the request's input paths, updating the metadata file
    fn instrument(&self, request: &InstrumentationRequest) -> PipelineResult<()>;
}

/// Metadata merge engine; overwrites the request's output file
pub trait MergeEngine {
    fn name(&self) -> &str;

    fn merge(&self, request: &MergeRequest) -> PipelineResult<()>;
}

/// Report rendering engine
pub trait ReportEngine {
    fn name(&self) -> &str;

    fn report(&self, request: &ReportRequest) -> PipelineResult<()>;
}

/// Artifact repository
pub trait RepositoryResolver {
    /// Resolve a single coordinate to one local file
    fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<PathBuf, ResolutionFailure>;

    /// Resolve a coordinate and its whole runtime dependency closure.
    ///
    /// The coordinate itself comes first. Either every member resolves or
    /// the call fails.
    fn resolve_closure(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Vec<ResolvedArtifact>, ResolutionFailure>;

    /// Root directory of the local repository, when there is one
    fn local_root(&self) -> Option<&Path>;
}

/// Unpacks archives into a directory
pub trait ArchiveExtractor {
    fn extract(&self, archive: &Path, destination: &Path) -> PipelineResult<()>;
}
