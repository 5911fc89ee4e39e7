//! EMMA command-line adapter.
//!
//! Runs the EMMA tool as a subprocess (`java -cp emma.jar emma <command>`),
//! one blocking call per request. Implements all three engine traits.

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::domain::{InstrumentationRequest, MergeRequest, ReportRequest};
use crate::error::{PipelineError, PipelineResult};

use super::{CoverageEngine, MergeEngine, ReportEngine};

/// EMMA adapter using subprocess mode
#[derive(Debug, Clone)]
pub struct EmmaCli {
    /// Java launcher (default: "java")
    java: String,

    /// Path to emma.jar
    emma_jar: PathBuf,
}

impl EmmaCli {
    /// Create an adapter for the given emma.jar using `java` from PATH
    pub fn new(emma_jar: impl Into<PathBuf>) -> Self {
        Self {
            java: "java".to_string(),
            emma_jar: emma_jar.into(),
        }
    }

    /// Use a custom Java launcher
    pub fn with_java(mut self, java: impl Into<String>) -> Self {
        self.java = java.into();
        self
    }

    /// Arguments for `emma instr`
    pub fn instr_args(request: &InstrumentationRequest) -> Vec<String> {
        let mut args = vec![
            "instr".to_string(),
            "-ip".to_string(),
            join_paths(&request.input_paths),
            "-m".to_string(),
            request.output_mode.to_string(),
            "-out".to_string(),
            request.metadata_output_file.display().to_string(),
            "-merge".to_string(),
            yes_no(request.merge_with_existing).to_string(),
        ];

        if let Some(dir) = &request.output_directory {
            args.push("-d".to_string());
            args.push(dir.display().to_string());
        }

        if let Some(filters) = request.filter.to_engine_args() {
            args.push("-ix".to_string());
            args.push(filters.join(","));
        }

        args
    }

    /// Arguments for `emma merge`
    pub fn merge_args(request: &MergeRequest) -> Vec<String> {
        vec![
            "merge".to_string(),
            "-in".to_string(),
            join_paths(request.input_paths()),
            "-out".to_string(),
            request.output_file().display().to_string(),
        ]
    }

    /// Arguments for `emma report`
    pub fn report_args(request: &ReportRequest) -> Vec<String> {
        let formats: Vec<&str> = request.formats.iter().map(|f| f.as_str()).collect();
        let mut args = vec![
            "report".to_string(),
            "-r".to_string(),
            formats.join(","),
            "-in".to_string(),
            join_paths(&request.data_paths),
        ];

        if !request.source_paths.is_empty() {
            args.push("-sp".to_string());
            args.push(join_paths(&request.source_paths));
        }

        for (key, value) in &request.properties {
            args.push(format!("-D{}={}", key, value));
        }

        args
    }

    fn run(&self, args: Vec<String>) -> PipelineResult<()> {
        let command = args.first().cloned().unwrap_or_default();
        debug!(java = %self.java, command = %command, ?args, "Invoking emma");

        let output = Command::new(&self.java)
            .arg("-cp")
            .arg(&self.emma_jar)
            .arg("emma")
            .args(&args)
            .output()
            .map_err(|e| {
                PipelineError::engine(
                    "emma",
                    format!("failed to spawn '{}' for emma {}: {}", self.java, command, e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            return Err(PipelineError::engine(
                "emma",
                format!(
                    "emma {} failed with exit code {}: {}",
                    command,
                    exit_code,
                    stderr.trim()
                ),
            ));
        }

        Ok(())
    }
}

impl CoverageEngine for EmmaCli {
    fn name(&self) -> &str {
        "emma"
    }

    fn instrument(&self, request: &InstrumentationRequest) -> PipelineResult<()> {
        self.run(Self::instr_args(request))
    }
}

impl MergeEngine for EmmaCli {
    fn name(&self) -> &str {
        "emma"
    }

    fn merge(&self, request: &MergeRequest) -> PipelineResult<()> {
        self.run(Self::merge_args(request))
    }
}

impl ReportEngine for EmmaCli {
    fn name(&self) -> &str {
        "emma"
    }

    fn report(&self, request: &ReportRequest) -> PipelineResult<()> {
        self.run(Self::report_args(request))
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "y"
    } else {
        "n"
    }
}
