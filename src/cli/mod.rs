//! Command-line interface for emma4it.
//!
//! One subcommand per goal. Each loads the configuration, wires the EMMA
//! command-line engine and the local repository into the matching pipeline
//! and runs it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::adapters::{EmmaCli, LocalRepository, ZipExtractor};
use crate::config::{self, ResolvedConfig};
use crate::core::{
    merge_all, InstrumentPipeline, ProjectInstrumenter, ReportPipeline, RepositoryCopier,
};
use crate::domain::Outcome;

/// emma4it - EMMA coverage for integration tests
#[derive(Parser, Debug)]
#[command(name = "emma4it")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: .emma4it/config.yaml in this or a parent directory)
    #[arg(long, global = true, env = "EMMA4IT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Instrument dependency and ad-hoc JARs
    Instrument,

    /// Instrument a copy of the project's own archive
    InstrumentProject {
        /// Project archive (overrides the config file)
        #[arg(short, long)]
        artifact: Option<PathBuf>,

        /// Bundle the EMMA runtime into the instrumented copy
        #[arg(long)]
        append_emma: bool,
    },

    /// Merge coverage files found under a directory
    Merge {
        /// Directory to search (default: <build>/test-classes)
        #[arg(short, long)]
        search_path: Option<PathBuf>,
    },

    /// Generate the coverage report
    Report {
        /// Report over explicit files instead of scanning data sets
        #[arg(long)]
        standalone: bool,

        /// Report formats (comma-separated: txt,xml,html)
        #[arg(short, long, value_delimiter = ',')]
        formats: Vec<String>,
    },

    /// Copy artifacts into a separate repository and instrument them
    Copy {
        /// Target repository directory (default: <build>/fake-repo)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the files the instrument goal would process
    Paths {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let cfg = load(self.config.as_ref())?;

        match self.command {
            Commands::Instrument => instrument(&cfg),
            Commands::InstrumentProject {
                artifact,
                append_emma,
            } => instrument_project(&cfg, artifact, append_emma),
            Commands::Merge { search_path } => merge(&cfg, search_path),
            Commands::Report {
                standalone,
                formats,
            } => report(&cfg, standalone, formats),
            Commands::Copy { output } => copy(&cfg, output),
            Commands::Paths { json } => show_paths(&cfg, json),
            Commands::Config => show_config(&cfg),
        }
    }
}

fn load(path: Option<&PathBuf>) -> Result<ResolvedConfig> {
    match path {
        Some(path) => config::load_config_at(path),
        None => Ok(config::config()?.clone()),
    }
}

fn engine(cfg: &ResolvedConfig) -> EmmaCli {
    EmmaCli::new(&cfg.emma_jar).with_java(&cfg.java)
}

fn repository(cfg: &ResolvedConfig) -> LocalRepository {
    LocalRepository::new(&cfg.local_repository)
}

fn report_outcome<T>(goal: &str, outcome: &Outcome<T>) {
    match outcome {
        Outcome::Completed(_) => info!("{} finished", goal),
        Outcome::NothingToDo(reason) => info!("{}: nothing to do ({})", goal, reason),
    }
}

/// Run the instrument goal
fn instrument(cfg: &ResolvedConfig) -> Result<()> {
    let engine = engine(cfg);
    let repository = repository(cfg);
    let pipeline = InstrumentPipeline::new(&engine, &repository, &cfg.build_dir);

    let outcome = pipeline
        .run(&cfg.goals.instrument)
        .context("Instrumentation failed")?;
    report_outcome("instrument", &outcome);

    if let Outcome::Completed(summary) = outcome {
        eprintln!(
            "Instrumented {} path(s), metadata in {}",
            summary.paths.len(),
            summary.metadata_file.display()
        );
    }
    Ok(())
}

/// Run the instrument-project goal
fn instrument_project(cfg: &ResolvedConfig, artifact: Option<PathBuf>, append_emma: bool) -> Result<()> {
    let engine = engine(cfg);
    let repository = repository(cfg);
    let instrumenter = ProjectInstrumenter::new(&engine, &repository, &cfg.build_dir);

    let mut goal = cfg.goals.instrument_project.clone();
    if artifact.is_some() {
        goal.artifact = artifact;
    }
    goal.append_emma |= append_emma;

    let summary = instrumenter
        .run(&goal)
        .context("Project instrumentation failed")?;

    eprintln!("Instrumented copy: {}", summary.instrumented.display());
    if let Some(repackaged) = summary.repackaged {
        eprintln!(
            "Bundled EMMA runtime ({} entries added, {} excluded)",
            repackaged.from_append, repackaged.excluded
        );
    }
    Ok(())
}

/// Run the merge goal
fn merge(cfg: &ResolvedConfig, search_path: Option<PathBuf>) -> Result<()> {
    let engine = engine(cfg);
    let goal = &cfg.goals.merge;
    let search_root = search_path
        .or_else(|| goal.search_path.clone())
        .unwrap_or_else(|| cfg.test_classes_dir());
    let output_dir = config::paths::emma_dir(&cfg.build_dir);

    let outcomes = merge_all(&engine, &goal.base_names, &search_root, &output_dir)
        .context("Metadata merge failed")?;

    for merged in &outcomes {
        report_outcome(&format!("merge {}", merged.base_name), &merged.outcome);
        if let Outcome::Completed(request) = &merged.outcome {
            eprintln!(
                "Merged {} file(s) into {}",
                request.input_paths().len(),
                request.output_file().display()
            );
        }
    }
    Ok(())
}

/// Run the report goal
fn report(cfg: &ResolvedConfig, standalone: bool, formats: Vec<String>) -> Result<()> {
    let engine = engine(cfg);
    let repository = repository(cfg);
    let extractor = ZipExtractor;
    let pipeline = ReportPipeline::new(&engine, &repository, &extractor, &cfg.base_dir, &cfg.build_dir);

    if standalone {
        let mut goal = cfg.goals.standalone_report.clone();
        if !formats.is_empty() {
            goal.formats = formats;
        }
        let request = pipeline
            .run_standalone(&goal)
            .context("Report generation failed")?;
        eprintln!("Report written ({} data file(s))", request.data_paths.len());
        return Ok(());
    }

    let mut goal = cfg.goals.report.clone();
    if !formats.is_empty() {
        goal.formats = formats;
    }
    let outcome = pipeline.run(&goal).context("Report generation failed")?;
    report_outcome("report", &outcome);
    Ok(())
}

/// Run the copy goal
fn copy(cfg: &ResolvedConfig, output: Option<PathBuf>) -> Result<()> {
    let engine = engine(cfg);
    let repository = repository(cfg);
    let copier = RepositoryCopier::new(&engine, &repository, &cfg.build_dir);

    let mut goal = cfg.goals.copy.clone();
    if output.is_some() {
        goal.output = output;
    }

    let summary = copier.run(&goal).context("Repository copy failed")?;
    eprintln!(
        "Copied {} artifact director(ies), instrumented {}",
        summary.copied.len(),
        summary.instrumented.len()
    );
    Ok(())
}

/// List the instrumentation path without invoking the engine
fn show_paths(cfg: &ResolvedConfig, json: bool) -> Result<()> {
    let engine = engine(cfg);
    let repository = repository(cfg);
    let pipeline = InstrumentPipeline::new(&engine, &repository, &cfg.build_dir);

    let aggregator = pipeline
        .collect_paths(&cfg.goals.instrument)
        .context("Failed to collect instrumentation paths")?;

    if json {
        println!("{}", serde_json::to_string_pretty(aggregator.paths())?);
        return Ok(());
    }

    if aggregator.is_empty() {
        println!("Nothing found to instrument");
        return Ok(());
    }

    println!("{:<20} {}", "SOURCE", "PATH");
    println!("{}", "-".repeat(80));
    for path in aggregator.paths() {
        println!("{:<20} {}", path.provenance.to_string(), path.path.display());
    }
    println!("\nTotal: {} path(s)", aggregator.len());

    Ok(())
}

/// Show resolved configuration (debug)
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("emma4it Configuration");
    println!("{}", "=".repeat(60));
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Project root:     {}", cfg.base_dir.display());
    println!("  Build directory:  {}", cfg.build_dir.display());
    println!("  Local repository: {}", cfg.local_repository.display());
    println!("  Metadata:         {}", config::paths::metadata_file(&cfg.build_dir).display());
    println!();
    println!("Engine:");
    println!("  Java:     {}", cfg.java);
    println!("  EMMA jar: {}", cfg.emma_jar.display());
    println!();
    println!("Goals:");
    println!("{}", serde_yaml::to_string(&cfg.goals)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_formats() {
        let cli = Cli::try_parse_from(["emma4it", "report", "--formats", "html,xml"]).unwrap();
        match cli.command {
            Commands::Report {
                standalone,
                formats,
            } => {
                assert!(!standalone);
                assert_eq!(formats, vec!["html", "xml"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["emma4it", "paths", "--json", "--config", "ci.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("ci.yaml")));
        assert!(matches!(cli.command, Commands::Paths { json: true }));
    }
}
