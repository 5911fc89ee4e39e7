//! File set specifications.
//!
//! A file set is a base directory plus Ant-style include/exclude patterns.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// An Ant-like file set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSetSpec {
    /// Base directory; must be set before scanning
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Inclusion patterns (`None` includes everything)
    #[serde(default)]
    pub includes: Option<Vec<String>>,

    /// Exclusion patterns (`None` excludes nothing beyond the defaults)
    #[serde(default)]
    pub excludes: Option<Vec<String>>,
}

impl FileSetSpec {
    /// Create a file set rooted at `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            includes: None,
            excludes: None,
        }
    }

    /// Set the inclusion patterns
    pub fn with_includes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the exclusion patterns
    pub fn with_excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Resolve a relative base directory against `root`
    pub fn rooted_at(mut self, root: &std::path::Path) -> Self {
        if let Some(dir) = self.directory.take() {
            self.directory = Some(if dir.is_absolute() { dir } else { root.join(dir) });
        }
        self
    }
}

impl fmt::Display for FileSetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let directory = self
            .directory
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "<unset>".to_string());
        write!(
            f,
            "FileSet[directory={}, includes={:?}, excludes={:?}]",
            directory, self.includes, self.excludes
        )
    }
}
