//! Discovery and merging of coverage metadata scattered over a build tree.
//!
//! Independent modules each leave their own `coverage.em` / `coverage.ec`
//! behind. For every base name, all files with exactly that name under the
//! search root are merged into one file in the output directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::adapters::MergeEngine;
use crate::config::paths::{METADATA_FILE, RUNTIME_DATA_FILE};
use crate::domain::{MergeRequest, Outcome};
use crate::error::{PipelineError, PipelineResult};

/// `merge` goal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Directory searched recursively (default: the test output directory)
    #[serde(default, alias = "searchPath")]
    pub search_path: Option<PathBuf>,

    /// File names to merge
    #[serde(default = "default_base_names", alias = "baseNames")]
    pub base_names: Vec<String>,
}

fn default_base_names() -> Vec<String> {
    vec![RUNTIME_DATA_FILE.to_string(), METADATA_FILE.to_string()]
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            search_path: None,
            base_names: default_base_names(),
        }
    }
}

/// Result for one base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub base_name: String,
    pub outcome: Outcome<MergeRequest>,
}

/// Every file under `root` whose name is exactly `base_name`
pub fn find_named(root: &Path, base_name: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == base_name)
        .map(|entry| entry.into_path())
        .collect()
}

/// Merge every discovered file of each base name into `output_dir/<base name>`.
///
/// A base name with no matches is reported as [`Outcome::NothingToDo`] and
/// does not reach the engine.
#[tracing::instrument(skip(engine), fields(engine = engine.name()))]
pub fn merge_all(
    engine: &dyn MergeEngine,
    base_names: &[String],
    search_root: &Path,
    output_dir: &Path,
) -> PipelineResult<Vec<MergeOutcome>> {
    if !search_root.is_dir() {
        return Err(PipelineError::config(format!(
            "SearchPath {} not found.",
            search_root.display()
        )));
    }

    let mut outcomes = Vec::with_capacity(base_names.len());

    for base_name in base_names {
        info!("Merging {}", base_name);

        let found = find_named(search_root, base_name);
        let output = output_dir.join(base_name);
        let Some(request) = MergeRequest::new(found, &output) else {
            error!("{} metadata not found.", base_name);
            outcomes.push(MergeOutcome {
                base_name: base_name.clone(),
                outcome: Outcome::NothingToDo(format!(
                    "No {} found under {}",
                    base_name,
                    search_root.display()
                )),
            });
            continue;
        };

        std::fs::create_dir_all(output_dir).map_err(PipelineError::io(output_dir))?;
        info!(
            inputs = request.input_paths().len(),
            output = %output.display(),
            "Merging metadata"
        );
        engine.merge(&request)?;

        outcomes.push(MergeOutcome {
            base_name: base_name.clone(),
            outcome: Outcome::Completed(request),
        });
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_named_matches_exactly() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::write(root.join("coverage.ec"), b"").unwrap();
        std::fs::write(root.join("a/b/coverage.ec"), b"").unwrap();
        std::fs::write(root.join("a/coverage.ec.bak"), b"").unwrap();
        std::fs::write(root.join("a/xcoverage.ec"), b"").unwrap();
        // a directory with the same name is not a match
        std::fs::create_dir_all(root.join("a/coverage.ec.d/coverage.ec")).unwrap();

        let found = find_named(root, "coverage.ec");
        assert_eq!(found.len(), 2);
        assert!(found.contains(&root.join("coverage.ec")));
        assert!(found.contains(&root.join("a/b/coverage.ec")));
    }

    #[test]
    fn test_default_base_names() {
        let config = MergeConfig::default();
        assert_eq!(config.base_names, vec!["coverage.ec", "coverage.em"]);
    }
}
