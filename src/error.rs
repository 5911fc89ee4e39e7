//! Error taxonomy for pipeline invocations.
//!
//! Leaf components return these typed errors; call sites decide whether a
//! given failure stops the invocation or is downgraded to a warning. An empty
//! input is not an error, see [`crate::domain::Outcome`].

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::ArtifactCoordinate;

/// Result alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// A coordinate could not be resolved to a local file
#[derive(Debug, Clone, Error)]
#[error("Unable to resolve artifact {coordinate}: {message}")]
pub struct ResolutionFailure {
    /// The coordinate that failed
    pub coordinate: ArtifactCoordinate,

    /// Root cause reported by the repository
    pub message: String,
}

impl ResolutionFailure {
    pub fn new(coordinate: &ArtifactCoordinate, message: impl Into<String>) -> Self {
        Self {
            coordinate: coordinate.clone(),
            message: message.into(),
        }
    }
}

/// Fatal pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionFailure),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error on {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{engine} engine failed: {message}")]
    Engine { engine: String, message: String },
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Adapter for `map_err` on I/O calls against `path`
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| Self::Io { path, source }
    }

    /// Adapter for `map_err` on archive calls against `path`
    pub fn archive(path: impl AsRef<Path>) -> impl FnOnce(zip::result::ZipError) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| Self::Archive { path, source }
    }

    pub fn engine(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Engine {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised before any external engine was invoked
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
