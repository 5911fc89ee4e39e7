//! Resolved paths and invocation outcomes.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where a path came from (diagnostics only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Listed explicitly in configuration
    DirectFile,

    /// Matched by a file set scan
    FileSetMatch,

    /// Produced by coordinate resolution
    ResolvedArtifact,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Provenance::DirectFile => "direct-file",
            Provenance::FileSetMatch => "file-set-match",
            Provenance::ResolvedArtifact => "resolved-artifact",
        };
        f.write_str(label)
    }
}

/// An absolute file path tagged with its provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub provenance: Provenance,
}

impl ResolvedPath {
    pub fn new(path: impl Into<PathBuf>, provenance: Provenance) -> Self {
        Self {
            path: path.into(),
            provenance,
        }
    }
}

/// Result of an invocation that may legitimately find nothing to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation ran
    Completed(T),

    /// No input was found; nothing was invoked or written
    NothingToDo(String),
}

impl<T> Outcome<T> {
    pub fn is_nothing_to_do(&self) -> bool {
        matches!(self, Outcome::NothingToDo(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::NothingToDo(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::NothingToDo(reason) => Outcome::NothingToDo(reason),
        }
    }
}

/// Make `path` absolute against the current directory without touching the
/// file system.
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        normalize(&cwd.join(path))
    }
}

/// Lexically remove `.` and `..` components
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out
}
