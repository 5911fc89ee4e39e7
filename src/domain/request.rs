//! Requests handed to the external coverage engines.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

use super::filter::CoverageFilter;

/// How the instrumentation engine writes its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Rewrite the input files in place
    Overwrite,

    /// Write instrumented classes to the output directory
    Copy,

    /// Copy everything, instrumented or not, to the output directory
    FullCopy,
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::Overwrite
    }
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Overwrite => "overwrite",
            OutputMode::Copy => "copy",
            OutputMode::FullCopy => "fullcopy",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overwrite" => Ok(OutputMode::Overwrite),
            "copy" => Ok(OutputMode::Copy),
            "fullcopy" => Ok(OutputMode::FullCopy),
            other => Err(PipelineError::config(format!(
                "invalid outputMode value: {}",
                other
            ))),
        }
    }
}

/// Input for one instrumentation engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentationRequest {
    pub input_paths: Vec<PathBuf>,
    pub filter: CoverageFilter,
    pub output_mode: OutputMode,
    /// Only meaningful for `copy`/`fullcopy`
    pub output_directory: Option<PathBuf>,
    pub metadata_output_file: PathBuf,
    pub merge_with_existing: bool,
}

/// Input for one merge engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    input_paths: Vec<PathBuf>,
    output_file: PathBuf,
}

impl MergeRequest {
    /// Returns `None` for an empty input set; merging nothing would truncate
    /// the output.
    pub fn new(input_paths: Vec<PathBuf>, output_file: impl Into<PathBuf>) -> Option<Self> {
        if input_paths.is_empty() {
            return None;
        }
        Some(Self {
            input_paths,
            output_file: output_file.into(),
        })
    }

    pub fn input_paths(&self) -> &[PathBuf] {
        &self.input_paths
    }

    pub fn output_file(&self) -> &PathBuf {
        &self.output_file
    }
}

/// Input for the archive repackager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepackageRequest {
    pub base_archive: PathBuf,
    pub append_archive: PathBuf,
    pub exclude_namespace_prefix: Option<String>,
    pub output_archive: PathBuf,
}

/// Report formats understood by the report engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Txt,
    Xml,
    Html,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [ReportFormat::Txt, ReportFormat::Xml, ReportFormat::Html];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Txt => "txt",
            ReportFormat::Xml => "xml",
            ReportFormat::Html => "html",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = PipelineError;

    // Case-sensitive, like the engine
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "txt" => Ok(ReportFormat::Txt),
            "xml" => Ok(ReportFormat::Xml),
            "html" => Ok(ReportFormat::Html),
            other => Err(PipelineError::config(format!(
                "Unsupported report format: {}",
                other
            ))),
        }
    }
}

/// Input for one report engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub data_paths: Vec<PathBuf>,
    pub source_paths: Vec<PathBuf>,
    pub formats: Vec<ReportFormat>,
    pub properties: BTreeMap<String, String>,
}
