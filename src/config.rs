//! Configuration for emma4it.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (EMMA4IT_BUILD_DIR, EMMA4IT_LOCAL_REPOSITORY,
//!    EMMA4IT_EMMA_JAR, EMMA4IT_JAVA)
//! 2. Config file (.emma4it/config.yaml)
//! 3. Defaults (`target`, `~/.m2/repository`, `java`)
//!
//! Config file discovery:
//! - Searches the start directory and its parents for .emma4it/config.yaml
//! - The project root is the parent of `.emma4it/`; relative paths in the
//!   file resolve against it

pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::LocalRepository;
use crate::core::project::emma_runtime;
use crate::core::{
    CopyConfig, InstrumentConfig, MergeConfig, ProjectInstrumentConfig, ReportConfig,
    StandaloneReportConfig,
};
use crate::domain::FileSetSpec;

/// Directory holding the config file
pub const CONFIG_DIR: &str = ".emma4it";

/// Config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.yaml";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub instrument: InstrumentConfig,
    #[serde(default)]
    pub instrument_project: ProjectInstrumentConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub standalone_report: StandaloneReportConfig,
    #[serde(default)]
    pub copy: CopyConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Build output directory (relative to the project root)
    pub build_dir: Option<String>,
    /// Local artifact repository
    pub local_repository: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// EMMA jar; defaults to emma:emma:2.0.5312 in the local repository
    pub emma_jar: Option<String>,
    /// Java launcher
    pub java: Option<String>,
}

/// Environment overrides
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub build_dir: Option<PathBuf>,
    pub local_repository: Option<PathBuf>,
    pub emma_jar: Option<PathBuf>,
    pub java: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            build_dir: std::env::var_os("EMMA4IT_BUILD_DIR").map(PathBuf::from),
            local_repository: std::env::var_os("EMMA4IT_LOCAL_REPOSITORY").map(PathBuf::from),
            emma_jar: std::env::var_os("EMMA4IT_EMMA_JAR").map(PathBuf::from),
            java: std::env::var("EMMA4IT_JAVA").ok(),
        }
    }
}

/// Goal sections with every relative path resolved
#[derive(Debug, Clone, Default, Serialize)]
pub struct Goals {
    pub instrument: InstrumentConfig,
    pub instrument_project: ProjectInstrumentConfig,
    pub merge: MergeConfig,
    pub report: ReportConfig,
    pub standalone_report: StandaloneReportConfig,
    pub copy: CopyConfig,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Project root
    pub base_dir: PathBuf,
    /// Build output directory
    pub build_dir: PathBuf,
    /// Local artifact repository
    pub local_repository: PathBuf,
    /// EMMA jar used by the command-line engine
    pub emma_jar: PathBuf,
    /// Java launcher
    pub java: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Goal settings
    pub goals: Goals,
}

impl ResolvedConfig {
    /// Default test output directory searched by `merge`
    pub fn test_classes_dir(&self) -> PathBuf {
        self.build_dir.join("test-classes")
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn root_file_set(base: &Path, set: FileSetSpec) -> FileSetSpec {
    set.rooted_at(base)
}

fn root_all(base: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.into_iter().map(|p| resolve_path(base, p)).collect()
}

/// Resolve every relative path in the goal sections against `base`
fn root_goals(file: &ConfigFile, base: &Path) -> Goals {
    let instrument = file.instrument.clone().rooted_at(base);

    let mut instrument_project = file.instrument_project.clone();
    instrument_project.artifact = instrument_project.artifact.map(|p| resolve_path(base, p));

    let mut merge = file.merge.clone();
    merge.search_path = merge.search_path.map(|p| resolve_path(base, p));

    let mut report = file.report.clone();
    report.data_sets = report.data_sets.into_iter().map(|s| root_file_set(base, s)).collect();
    report.source_sets = report.source_sets.into_iter().map(|s| root_file_set(base, s)).collect();
    report.report_dir = report.report_dir.map(|p| resolve_path(base, p));
    report.sources_dir = report.sources_dir.map(|p| resolve_path(base, p));

    let mut standalone_report = file.standalone_report.clone();
    standalone_report.instrumentations = standalone_report.instrumentations.map(|p| root_all(base, p));
    standalone_report.metadatas = standalone_report.metadatas.map(|p| root_all(base, p));
    standalone_report.source_folders = root_all(base, standalone_report.source_folders);
    standalone_report.output_dir = standalone_report.output_dir.map(|p| resolve_path(base, p));

    let mut copy = file.copy.clone();
    copy.output = copy.output.map(|p| resolve_path(base, p));

    Goals {
        instrument,
        instrument_project,
        merge,
        report,
        standalone_report,
        copy,
    }
}

/// Combine a parsed config file, its location and overrides
pub fn resolve(
    file: ConfigFile,
    config_file: Option<PathBuf>,
    base_dir: &Path,
    overrides: Overrides,
) -> Result<ResolvedConfig> {
    let build_dir = overrides
        .build_dir
        .map(|p| resolve_path(base_dir, p))
        .or_else(|| file.paths.build_dir.as_ref().map(|p| resolve_path(base_dir, p)))
        .unwrap_or_else(|| base_dir.join("target"));

    let local_repository = match overrides.local_repository {
        Some(repo) => repo,
        None => match &file.paths.local_repository {
            Some(repo) => resolve_path(base_dir, repo),
            None => LocalRepository::default_root().context("Failed to determine home directory")?,
        },
    };

    let emma_jar = overrides
        .emma_jar
        .or_else(|| file.engine.emma_jar.as_ref().map(|p| resolve_path(base_dir, p)))
        .unwrap_or_else(|| LocalRepository::new(&local_repository).artifact_path(&emma_runtime()));

    let java = overrides
        .java
        .or_else(|| file.engine.java.clone())
        .unwrap_or_else(|| "java".to_string());

    let goals = root_goals(&file, base_dir);

    Ok(ResolvedConfig {
        base_dir: base_dir.to_path_buf(),
        build_dir,
        local_repository,
        emma_jar,
        java,
        config_file,
        goals,
    })
}

/// Load an explicit config file; its grandparent (or parent) is the project root
pub fn load_config_at(path: &Path) -> Result<ResolvedConfig> {
    let file = load_config_file(path)?;
    let parent = path.parent().unwrap_or(Path::new("."));
    let base_dir = if parent.file_name().map(|n| n == CONFIG_DIR).unwrap_or(false) {
        parent.parent().unwrap_or(Path::new("."))
    } else {
        parent
    };
    resolve(file, Some(path.to_path_buf()), base_dir, Overrides::from_env())
}

/// Load configuration by searching upwards from `dir`
pub fn load_config_from(dir: &Path) -> Result<ResolvedConfig> {
    match find_config_file(dir) {
        Some(config_path) => load_config_at(&config_path),
        None => resolve(ConfigFile::default(), None, dir, Overrides::from_env()),
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_config_from(&cwd)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
