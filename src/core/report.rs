//! Coverage report assembly.
//!
//! Collects the data path (metadata and runtime coverage files) and the
//! source path (source attachments of artifact items plus source
//! directories), then hands both to the report engine together with the
//! output file properties.
//!
//! Two flavours exist:
//! - [`ReportPipeline::run`] scans file sets and tolerates missing sources
//! - [`ReportPipeline::run_standalone`] takes explicit files that must exist

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::adapters::{ArchiveExtractor, ReportEngine, RepositoryResolver};
use crate::config::paths;
use crate::domain::path::absolute;
use crate::domain::{ArtifactCoordinate, FileSetSpec, Outcome, Provenance, ReportFormat, ReportRequest};
use crate::error::{PipelineError, PipelineResult};

use super::aggregator::PathAggregator;

/// Sort order handed to the report engine
pub const SORT_ORDER: &str = "+name,+block,+method,+class";

/// Encoding of every generated report
pub const REPORT_ENCODING: &str = "UTF-8";

/// `report` goal configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report formats (default: txt, xml, html)
    #[serde(default)]
    pub formats: Vec<String>,

    /// Coverage data file sets (default: `*.e[cms]` in the project directory
    /// and `**/*.e[cms]` in the build directory)
    #[serde(default, alias = "dataSets")]
    pub data_sets: Vec<FileSetSpec>,

    /// Source directory sets
    #[serde(default, alias = "sourceSets")]
    pub source_sets: Vec<FileSetSpec>,

    /// Artifacts whose `sources` attachment is added to the source path
    #[serde(default, alias = "artifactItems")]
    pub artifact_items: Vec<ArtifactCoordinate>,

    /// Report output directory (default: `<build>/site/emma`)
    #[serde(default, alias = "reportDirectory")]
    pub report_dir: Option<PathBuf>,

    /// Extraction directory for source attachments (default: `<build>/emma`)
    #[serde(default, alias = "sourcesDirectory")]
    pub sources_dir: Option<PathBuf>,
}

/// `standalone_report` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandaloneReportConfig {
    /// Report formats; must not be empty
    #[serde(default = "default_standalone_formats")]
    pub formats: Vec<String>,

    /// Metadata files (default: `<build>/emma/coverage.em`)
    #[serde(default)]
    pub instrumentations: Option<Vec<PathBuf>>,

    /// Runtime coverage files (default: `<build>/emma/coverage.ec`)
    #[serde(default)]
    pub metadatas: Option<Vec<PathBuf>>,

    /// Artifacts whose `sources` attachment is added to the source path
    #[serde(default, alias = "artifactItems")]
    pub artifact_items: Vec<ArtifactCoordinate>,

    /// Source directories
    #[serde(default, alias = "sourceFolders")]
    pub source_folders: Vec<PathBuf>,

    /// HTML output directory (default: `<build>/site/emma`)
    #[serde(default, alias = "outputDirectory")]
    pub output_dir: Option<PathBuf>,
}

fn default_standalone_formats() -> Vec<String> {
    vec![ReportFormat::Html.to_string(), ReportFormat::Xml.to_string()]
}

impl Default for StandaloneReportConfig {
    fn default() -> Self {
        Self {
            formats: default_standalone_formats(),
            instrumentations: None,
            metadatas: None,
            artifact_items: Vec::new(),
            source_folders: Vec::new(),
            output_dir: None,
        }
    }
}

/// Locations the report falls back to when not configured
#[derive(Debug, Clone)]
pub struct ReportDefaults {
    /// Project base directory
    pub base_dir: PathBuf,

    /// Build output directory
    pub build_dir: PathBuf,

    /// Where source attachments are extracted
    pub sources_dir: PathBuf,
}

impl ReportDefaults {
    pub fn new(base_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        let build_dir = build_dir.into();
        Self {
            base_dir: base_dir.into(),
            sources_dir: paths::emma_dir(&build_dir),
            build_dir,
        }
    }

    /// `*.ec, *.em, *.es` in the base directory, recursively in the build directory
    pub fn data_sets(&self) -> Vec<FileSetSpec> {
        vec![
            FileSetSpec::new(&self.base_dir).with_includes(["*.ec", "*.em", "*.es"]),
            FileSetSpec::new(&self.build_dir).with_includes(["**/*.ec", "**/*.em", "**/*.es"]),
        ]
    }
}

/// Inputs gathered for one report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportInputs {
    pub data_paths: Vec<PathBuf>,
    pub source_paths: Vec<PathBuf>,
}

/// Parse format names; an empty list selects every format
pub fn parse_formats<S: AsRef<str>>(names: &[S]) -> PipelineResult<Vec<ReportFormat>> {
    if names.is_empty() {
        return Ok(ReportFormat::ALL.to_vec());
    }
    names.iter().map(|name| name.as_ref().parse()).collect()
}

/// Output file and formatting properties for a report directory
pub fn report_properties(report_dir: &Path) -> BTreeMap<String, String> {
    let report_dir = absolute(report_dir);
    let mut properties = BTreeMap::new();
    properties.insert(
        "report.html.out.file".to_string(),
        report_dir.join("index.html").display().to_string(),
    );
    properties.insert(
        "report.xml.out.file".to_string(),
        report_dir.join("coverage.xml").display().to_string(),
    );
    properties.insert(
        "report.txt.out.file".to_string(),
        report_dir.join("coverage.txt").display().to_string(),
    );
    properties.insert("report.sort".to_string(), SORT_ORDER.to_string());
    for key in ["report.out.encoding", "report.xml.out.encoding", "report.html.out.encoding"] {
        properties.insert(key.to_string(), REPORT_ENCODING.to_string());
    }
    properties
}

/// Resolve each item's sources attachment and extract it below `sources_dir`.
///
/// With `strict` unset, resolution and extraction failures only skip the
/// item. With `strict` set, extraction failures are fatal.
fn extract_sources(
    resolver: &dyn RepositoryResolver,
    extractor: &dyn ArchiveExtractor,
    items: &[ArtifactCoordinate],
    sources_dir: &Path,
    strict: bool,
    aggregator: &mut PathAggregator,
) -> PipelineResult<()> {
    for item in items {
        let sources = item.sources();
        let archive = match resolver.resolve(&sources) {
            Ok(archive) => archive,
            Err(e) => {
                warn!("Artifact {} source not available at repository: {}", sources, e.message);
                continue;
            }
        };

        let destination = sources_dir.join(&item.name);
        match extractor.extract(&archive, &destination) {
            Ok(()) => {
                aggregator.push_resolved(&destination, Provenance::ResolvedArtifact);
            }
            Err(e) if !strict => {
                warn!("Unable to extract {} sources: {}", sources, e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Collect the data and source paths of a report.
///
/// Without data sets the defaults from [`ReportDefaults::data_sets`] are
/// scanned. Source sets contribute directories only.
pub fn assemble(
    resolver: &dyn RepositoryResolver,
    extractor: &dyn ArchiveExtractor,
    items: &[ArtifactCoordinate],
    data_sets: &[FileSetSpec],
    source_sets: &[FileSetSpec],
    defaults: &ReportDefaults,
) -> PipelineResult<ReportInputs> {
    debug!("Collecting data files");
    let mut data = PathAggregator::new("data");
    let default_sets;
    let data_sets = if data_sets.is_empty() {
        default_sets = defaults.data_sets();
        &default_sets[..]
    } else {
        data_sets
    };
    for set in data_sets {
        data.push_file_set(set)?;
    }

    debug!("Collecting source directories");
    let mut sources = PathAggregator::new("source");
    extract_sources(resolver, extractor, items, &defaults.sources_dir, false, &mut sources)?;
    for set in source_sets {
        sources.push_dir_set(set)?;
    }

    for path in data.paths().iter().chain(sources.paths()) {
        debug!("  {}", path.path.display());
    }

    Ok(ReportInputs {
        data_paths: data.into_paths(),
        source_paths: sources.into_paths(),
    })
}

/// Report pipeline over external collaborators
pub struct ReportPipeline<'a> {
    engine: &'a dyn ReportEngine,
    resolver: &'a dyn RepositoryResolver,
    extractor: &'a dyn ArchiveExtractor,
    base_dir: PathBuf,
    build_dir: PathBuf,
}

impl<'a> ReportPipeline<'a> {
    pub fn new(
        engine: &'a dyn ReportEngine,
        resolver: &'a dyn RepositoryResolver,
        extractor: &'a dyn ArchiveExtractor,
        base_dir: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            resolver,
            extractor,
            base_dir: base_dir.into(),
            build_dir: build_dir.into(),
        }
    }

    fn default_report_dir(&self) -> PathBuf {
        self.build_dir.join("site").join(paths::EMMA_DIR)
    }

    fn render(&self, request: &ReportRequest) -> PipelineResult<()> {
        info!(
            engine = self.engine.name(),
            data = request.data_paths.len(),
            sources = request.source_paths.len(),
            formats = ?request.formats,
            "Generating coverage report"
        );
        self.engine.report(request)
    }

    /// Run the `report` goal
    #[tracing::instrument(skip_all, fields(build_dir = %self.build_dir.display()))]
    pub fn run(&self, config: &ReportConfig) -> PipelineResult<Outcome<ReportRequest>> {
        let formats = parse_formats(&config.formats)?;

        let mut defaults = ReportDefaults::new(&self.base_dir, &self.build_dir);
        if let Some(sources_dir) = &config.sources_dir {
            defaults.sources_dir = sources_dir.clone();
        }

        let inputs = assemble(
            self.resolver,
            self.extractor,
            &config.artifact_items,
            &config.data_sets,
            &config.source_sets,
            &defaults,
        )?;

        if inputs.data_paths.is_empty() {
            error!("No coverage data found to report on!");
            return Ok(Outcome::NothingToDo("No coverage data found".to_string()));
        }

        let report_dir = config
            .report_dir
            .clone()
            .unwrap_or_else(|| self.default_report_dir());

        let request = ReportRequest {
            data_paths: inputs.data_paths,
            source_paths: inputs.source_paths,
            formats,
            properties: report_properties(&report_dir),
        };
        self.render(&request)?;

        Ok(Outcome::Completed(request))
    }

    /// Run a report over explicitly named files.
    ///
    /// Every metadata and runtime data file must exist, and at least one
    /// valid format must be named. Only the HTML report goes to the output
    /// directory; the XML and text reports stay in `<build>/emma`.
    #[tracing::instrument(skip_all, fields(build_dir = %self.build_dir.display()))]
    pub fn run_standalone(&self, config: &StandaloneReportConfig) -> PipelineResult<ReportRequest> {
        let instrumentations = config
            .instrumentations
            .clone()
            .unwrap_or_else(|| vec![paths::metadata_file(&self.build_dir)]);
        for file in &instrumentations {
            if !file.exists() {
                return Err(PipelineError::config(format!(
                    "Instrumentation file {} not found.",
                    absolute(file).display()
                )));
            }
        }

        let metadatas = config
            .metadatas
            .clone()
            .unwrap_or_else(|| vec![paths::runtime_data_file(&self.build_dir)]);
        for file in &metadatas {
            if !file.exists() {
                return Err(PipelineError::config(format!(
                    "Metadata file {} not found.",
                    absolute(file).display()
                )));
            }
        }

        if config.formats.is_empty() {
            return Err(PipelineError::config("Format must be specified"));
        }
        let formats = parse_formats(&config.formats)?;

        let mut sources = PathAggregator::new("source");
        extract_sources(
            self.resolver,
            self.extractor,
            &config.artifact_items,
            &paths::emma_dir(&self.build_dir),
            true,
            &mut sources,
        )?;
        for folder in &config.source_folders {
            if folder.is_dir() {
                sources.push_resolved(folder, Provenance::DirectFile);
            } else {
                warn!("Source folder {} not found!", absolute(folder).display());
            }
        }

        let emma_dir = absolute(&paths::emma_dir(&self.build_dir));
        let output_dir = config
            .output_dir
            .clone()
            .unwrap_or_else(|| self.default_report_dir());
        let mut properties = BTreeMap::new();
        properties.insert(
            "report.html.out.file".to_string(),
            absolute(&output_dir).join("index.html").display().to_string(),
        );
        properties.insert(
            "report.xml.out.file".to_string(),
            emma_dir.join("coverage.xml").display().to_string(),
        );
        properties.insert(
            "report.txt.out.file".to_string(),
            emma_dir.join("coverage.txt").display().to_string(),
        );

        let request = ReportRequest {
            data_paths: instrumentations
                .iter()
                .chain(&metadatas)
                .map(|p| absolute(p))
                .collect(),
            source_paths: sources.into_paths(),
            formats,
            properties,
        };
        self.render(&request)?;

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_formats() {
        let formats = parse_formats::<&str>(&[]).unwrap();
        assert_eq!(formats, vec![ReportFormat::Txt, ReportFormat::Xml, ReportFormat::Html]);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let err = parse_formats(&["html", "pdf"]).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Unsupported report format: pdf"));
    }

    #[test]
    fn test_report_properties() {
        let properties = report_properties(Path::new("/project/target/site/emma"));
        assert_eq!(
            properties["report.html.out.file"],
            "/project/target/site/emma/index.html"
        );
        assert_eq!(
            properties["report.xml.out.file"],
            "/project/target/site/emma/coverage.xml"
        );
        assert_eq!(properties["report.sort"], "+name,+block,+method,+class");
        assert_eq!(properties["report.html.out.encoding"], "UTF-8");
        assert_eq!(properties.len(), 7);
    }

    #[test]
    fn test_default_data_sets() {
        let defaults = ReportDefaults::new("/project", "/project/target");
        let sets = defaults.data_sets();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].directory.as_deref(), Some(Path::new("/project")));
        assert_eq!(
            sets[1].includes.as_deref(),
            Some(&["**/*.ec".to_string(), "**/*.em".to_string(), "**/*.es".to_string()][..])
        );
        assert_eq!(defaults.sources_dir, PathBuf::from("/project/target/emma"));
    }
}
