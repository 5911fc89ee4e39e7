//! Domain types for the emma4it pipeline.
//!
//! This module contains the core data structures:
//! - Coordinates: Artifact identities in a repository
//! - File sets: Base directory plus glob patterns
//! - Filters: Include/exclude rules for coverage
//! - Requests: Inputs for the external engines

pub mod coordinate;
pub mod fileset;
pub mod filter;
pub mod path;
pub mod request;

// Re-export commonly used types
pub use coordinate::{ArtifactCoordinate, SOURCES_CLASSIFIER, TESTS_CLASSIFIER};
pub use fileset::FileSetSpec;
pub use filter::{CoverageFilter, FilterRule};
pub use path::{Outcome, Provenance, ResolvedPath};
pub use request::{
    InstrumentationRequest, MergeRequest, OutputMode, RepackageRequest, ReportFormat,
    ReportRequest,
};
