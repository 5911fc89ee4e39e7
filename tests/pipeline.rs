//! Instrumentation Pipeline Integration Tests
//!
//! Runs the instrument, instrument-project and copy goals against recording
//! engines and an on-disk local repository.

use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use emma4it::adapters::{CoverageEngine, LocalRepository};
use emma4it::core::{
    CopyConfig, InstrumentConfig, InstrumentPipeline, ProjectInstrumentConfig, ProjectInstrumenter,
    RepositoryCopier,
};
use emma4it::domain::{
    ArtifactCoordinate, FileSetSpec, FilterRule, InstrumentationRequest, OutputMode, Provenance,
};
use emma4it::error::{PipelineError, PipelineResult};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Coverage engine that records every request
#[derive(Default)]
struct RecordingEngine {
    calls: RefCell<Vec<InstrumentationRequest>>,
}

impl RecordingEngine {
    fn calls(&self) -> Vec<InstrumentationRequest> {
        self.calls.borrow().clone()
    }
}

impl CoverageEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn instrument(&self, request: &InstrumentationRequest) -> PipelineResult<()> {
        self.calls.borrow_mut().push(request.clone());
        Ok(())
    }
}

/// Engine that always fails
struct FailingEngine;

impl CoverageEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    fn instrument(&self, _request: &InstrumentationRequest) -> PipelineResult<()> {
        Err(PipelineError::engine("failing", "exit status 1"))
    }
}

fn write_jar(path: &Path, entries: &[&str]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for name in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(name.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn entry_names(path: &Path) -> Vec<String> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Install an artifact (and an optional POM) into a Maven-layout repository
fn install(repo: &Path, coordinate: &ArtifactCoordinate, pom: Option<&str>) -> PathBuf {
    let repository = LocalRepository::new(repo);
    let jar = repository.artifact_path(coordinate);
    write_jar(&jar, &["META-INF/MANIFEST.MF", "org/example/Main.class"]);
    if let Some(pom) = pom {
        std::fs::write(repository.artifact_path(&coordinate.pom()), pom).unwrap();
    }
    jar
}

fn list_files(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

#[test]
fn test_lib_scenario_instruments_only_included_jars() {
    let temp = TempDir::new().unwrap();
    let lib = temp.path().join("lib");
    write_jar(&lib.join("a.jar"), &["A.class"]);
    write_jar(&lib.join("b.jar"), &["B.class"]);
    let build = temp.path().join("target");

    let engine = RecordingEngine::default();
    let repository = LocalRepository::new(temp.path().join("repo"));
    let pipeline = InstrumentPipeline::new(&engine, &repository, &build);

    let config = InstrumentConfig {
        jar_sets: vec![FileSetSpec::new(&lib).with_includes(["*.jar"]).with_excludes(["b.jar"])],
        ..InstrumentConfig::default()
    };

    let summary = pipeline.run(&config).unwrap().completed().unwrap();
    assert_eq!(summary.paths.len(), 1);
    assert_eq!(summary.paths[0].path, lib.join("a.jar"));
    assert_eq!(summary.paths[0].provenance, Provenance::FileSetMatch);

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].input_paths, vec![lib.join("a.jar")]);
    assert_eq!(calls[0].output_mode, OutputMode::Overwrite);
    assert_eq!(calls[0].metadata_output_file, build.join("emma/coverage.em"));
    assert!(calls[0].merge_with_existing);
    assert!(calls[0].output_directory.is_none());
    assert!(calls[0].filter.is_none());
    assert!(build.join("emma").is_dir());
}

#[test]
fn test_empty_configuration_is_nothing_to_do() {
    let temp = TempDir::new().unwrap();
    let build = temp.path().join("target");

    let engine = RecordingEngine::default();
    let repository = LocalRepository::new(temp.path().join("repo"));
    let pipeline = InstrumentPipeline::new(&engine, &repository, &build);

    let outcome = pipeline.run(&InstrumentConfig::default()).unwrap();

    assert!(outcome.is_nothing_to_do());
    assert!(engine.calls().is_empty());
    assert!(!build.exists());
    assert!(list_files(temp.path()).is_empty());
}

#[test]
fn test_sources_are_aggregated_in_order_without_duplicates() {
    let temp = TempDir::new().unwrap();
    let repo = temp.path().join("repo");
    let coordinate = ArtifactCoordinate::new("org.example", "core", "1.0");
    let resolved = install(&repo, &coordinate, None);

    let lib = temp.path().join("lib");
    write_jar(&lib.join("a.jar"), &["A.class"]);
    write_jar(&lib.join("z.jar"), &["Z.class"]);

    let engine = RecordingEngine::default();
    let repository = LocalRepository::new(&repo);
    let pipeline = InstrumentPipeline::new(&engine, &repository, temp.path().join("target"));

    let config = InstrumentConfig {
        artifact_items: vec![coordinate],
        jar_files: vec![lib.join("z.jar"), lib.join("missing.jar"), resolved.clone()],
        jar_sets: vec![FileSetSpec::new(&lib).with_includes(["*.jar"])],
        includes: vec!["org.example.*".to_string()],
        excludes: vec!["org.example.Generated*".to_string()],
        ..InstrumentConfig::default()
    };

    let summary = pipeline.run(&config).unwrap().completed().unwrap();
    let paths: Vec<_> = summary.paths.iter().map(|p| (p.path.clone(), p.provenance)).collect();
    assert_eq!(
        paths,
        vec![
            (resolved, Provenance::ResolvedArtifact),
            (lib.join("z.jar"), Provenance::DirectFile),
            (lib.join("a.jar"), Provenance::FileSetMatch),
        ]
    );

    let filter = &engine.calls()[0].filter;
    assert_eq!(
        filter.rules().unwrap(),
        &[
            FilterRule::Include("org.example.*".to_string()),
            FilterRule::Exclude("org.example.Generated*".to_string()),
        ]
    );
}

#[test]
fn test_invalid_output_mode_fails_before_any_work() {
    let temp = TempDir::new().unwrap();
    let lib = temp.path().join("lib");
    write_jar(&lib.join("a.jar"), &["A.class"]);
    let build = temp.path().join("target");

    let engine = RecordingEngine::default();
    let repository = LocalRepository::new(temp.path().join("repo"));
    let pipeline = InstrumentPipeline::new(&engine, &repository, &build);

    let config = InstrumentConfig {
        jar_files: vec![lib.join("a.jar")],
        output_mode: "inplace".to_string(),
        ..InstrumentConfig::default()
    };

    let err = pipeline.run(&config).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("invalid outputMode value: inplace"));
    assert!(engine.calls().is_empty());
    assert!(!build.exists());
}

#[test]
fn test_unresolvable_artifact_is_fatal() {
    let temp = TempDir::new().unwrap();
    let engine = RecordingEngine::default();
    let repository = LocalRepository::new(temp.path().join("repo"));
    let pipeline = InstrumentPipeline::new(&engine, &repository, temp.path().join("target"));

    let config = InstrumentConfig {
        artifact_items: vec![ArtifactCoordinate::new("org.example", "absent", "1.0")],
        ..InstrumentConfig::default()
    };

    let err = pipeline.run(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Resolution(_)));
    assert!(err.to_string().contains("org.example:absent"));
    assert!(engine.calls().is_empty());
}

#[test]
fn test_engine_failure_propagates() {
    let temp = TempDir::new().unwrap();
    let lib = temp.path().join("lib");
    write_jar(&lib.join("a.jar"), &["A.class"]);

    let repository = LocalRepository::new(temp.path().join("repo"));
    let pipeline = InstrumentPipeline::new(&FailingEngine, &repository, temp.path().join("target"));

    let config = InstrumentConfig {
        jar_files: vec![lib.join("a.jar")],
        ..InstrumentConfig::default()
    };

    let err = pipeline.run(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Engine { .. }));
}

#[test]
fn test_project_artifact_with_emma_runtime() {
    let temp = TempDir::new().unwrap();
    let repo = temp.path().join("repo");
    let runtime = ArtifactCoordinate::new("emma", "emma", "2.0.5312");
    let runtime_jar = LocalRepository::new(&repo).artifact_path(&runtime);
    write_jar(
        &runtime_jar,
        &["META-INF/MANIFEST.MF", "com/vladium/emma/rt/RT.class"],
    );

    let project_jar = temp.path().join("target/app-1.0.jar");
    write_jar(&project_jar, &["META-INF/MANIFEST.MF", "org/example/App.class"]);
    let build = temp.path().join("target");

    let engine = RecordingEngine::default();
    let repository = LocalRepository::new(&repo);
    let instrumenter = ProjectInstrumenter::new(&engine, &repository, &build);

    let summary = instrumenter
        .run(&ProjectInstrumentConfig {
            artifact: Some(project_jar.clone()),
            excludes: vec!["org.example.Generated*".to_string()],
            append_emma: true,
            ..ProjectInstrumentConfig::default()
        })
        .unwrap();

    assert_eq!(summary.instrumented, build.join("emma/app-1.0.jar"));
    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].input_paths, vec![build.join("emma/app-1.0.jar")]);

    let repackaged = summary.repackaged.unwrap();
    assert_eq!(repackaged.from_base, 2);
    assert_eq!(repackaged.from_append, 1);
    assert_eq!(repackaged.excluded, 1);
    assert_eq!(
        entry_names(&summary.instrumented),
        vec!["META-INF/MANIFEST.MF", "org/example/App.class", "com/vladium/emma/rt/RT.class"]
    );
    assert!(build.join("emma/original.jar").is_file());

    // The regular build output is left alone
    assert_eq!(entry_names(&project_jar).len(), 2);
}

#[test]
fn test_missing_project_artifact() {
    let temp = TempDir::new().unwrap();
    let engine = RecordingEngine::default();
    let repository = LocalRepository::new(temp.path().join("repo"));
    let instrumenter = ProjectInstrumenter::new(&engine, &repository, temp.path().join("target"));

    let err = instrumenter
        .run(&ProjectInstrumentConfig {
            artifact: Some(temp.path().join("target/app.jar")),
            ..ProjectInstrumentConfig::default()
        })
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(engine.calls().is_empty());
}

#[test]
fn test_copy_repository_with_closure() {
    let temp = TempDir::new().unwrap();
    let repo = temp.path().join("repo");
    let app = ArtifactCoordinate::new("org.example", "app", "1.0");
    let util = ArtifactCoordinate::new("org.example", "util", "2.0");
    install(
        &repo,
        &app,
        Some(
            r#"<project>
  <groupId>org.example</groupId>
  <artifactId>app</artifactId>
  <version>1.0</version>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>util</artifactId>
      <version>2.0</version>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
</project>"#,
        ),
    );
    install(
        &repo,
        &util,
        Some("<project><groupId>org.example</groupId><artifactId>util</artifactId><version>2.0</version></project>"),
    );

    let build = temp.path().join("target");
    let engine = RecordingEngine::default();
    let repository = LocalRepository::new(&repo);
    let copier = RepositoryCopier::new(&engine, &repository, &build);

    let summary = copier
        .run(&CopyConfig {
            artifact_items: vec![app],
            output: None,
        })
        .unwrap();

    let fake_repo = build.join("fake-repo");
    assert!(fake_repo.join("org/example/app/1.0/app-1.0.jar").is_file());
    assert!(fake_repo.join("org/example/app/1.0/app-1.0.pom").is_file());
    assert!(fake_repo.join("org/example/util/2.0/util-2.0.jar").is_file());
    assert!(!fake_repo.join("junit").exists());
    assert_eq!(summary.copied.len(), 2);

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].input_paths, vec![fake_repo.join("org/example/app/1.0/app-1.0.jar")]);
    assert_eq!(calls[0].output_mode, OutputMode::Overwrite);
    assert!(calls[0].filter.is_none());
}

#[test]
fn test_copy_closure_without_instrumentation_skips_item() {
    let temp = TempDir::new().unwrap();
    let repo = temp.path().join("repo");
    let app = ArtifactCoordinate::new("org.example", "app", "1.0").with_instrument(false);
    let util = ArtifactCoordinate::new("org.example", "util", "2.0");
    install(
        &repo,
        &app,
        Some(
            "<project><groupId>org.example</groupId><artifactId>app</artifactId><version>1.0</version>\
             <dependencies><dependency><groupId>org.example</groupId><artifactId>util</artifactId>\
             <version>2.0</version></dependency></dependencies></project>",
        ),
    );
    install(
        &repo,
        &util,
        Some("<project><groupId>org.example</groupId><artifactId>util</artifactId><version>2.0</version></project>"),
    );

    let build = temp.path().join("target");
    let engine = RecordingEngine::default();
    let repository = LocalRepository::new(&repo);
    let copier = RepositoryCopier::new(&engine, &repository, &build);

    let summary = copier
        .run(&CopyConfig {
            artifact_items: vec![app],
            output: None,
        })
        .unwrap();

    let fake_repo = build.join("fake-repo");
    assert!(fake_repo.join("org/example/util/2.0/util-2.0.jar").is_file());
    assert!(!fake_repo.join("org/example/app").exists());
    assert_eq!(summary.copied, vec![fake_repo.join("org/example/util/2.0")]);
    assert!(engine.calls().is_empty());
}

#[test]
fn test_copy_without_instrumentation_or_closure() {
    let temp = TempDir::new().unwrap();
    let repo = temp.path().join("repo");
    let app = ArtifactCoordinate::new("org.example", "app", "1.0")
        .with_resolve_transitively(false)
        .with_instrument(false);
    let jar = install(&repo, &app, None);

    let output = temp.path().join("mirror");
    let engine = RecordingEngine::default();
    let repository = LocalRepository::new(&repo);
    let copier = RepositoryCopier::new(&engine, &repository, temp.path().join("target"));

    copier
        .run(&CopyConfig {
            artifact_items: vec![app],
            output: Some(output.clone()),
        })
        .unwrap();

    let mut copied = Vec::new();
    File::open(output.join("org/example/app/1.0/app-1.0.jar"))
        .unwrap()
        .read_to_end(&mut copied)
        .unwrap();
    assert_eq!(copied, std::fs::read(jar).unwrap());
    assert!(engine.calls().is_empty());
}
