//! Archive Repackaging Integration Tests
//!
//! Tests for merging two archives with namespace exclusion.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use emma4it::core::repackage;
use emma4it::domain::RepackageRequest;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

fn write_archive(path: &Path, entries: &[(&str, &str)], method: CompressionMethod) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(method);
    for (name, content) in entries {
        if let Some(dir) = name.strip_suffix('/') {
            zip.add_directory(dir, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
    }
    zip.finish().unwrap();
}

fn read_archive(path: &Path) -> Vec<(String, String, CompressionMethod)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            (entry.name().to_string(), content, entry.compression())
        })
        .collect()
}

#[test]
fn test_append_manifest_is_excluded() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("base.jar");
    let append = temp.path().join("append.jar");
    let output = temp.path().join("out.jar");

    write_archive(
        &base,
        &[("A", "a"), ("META-INF/MANIFEST.MF", "base manifest")],
        CompressionMethod::Deflated,
    );
    write_archive(
        &append,
        &[("B", "b"), ("META-INF/MANIFEST.MF", "append manifest")],
        CompressionMethod::Deflated,
    );

    let summary = repackage(&RepackageRequest {
        base_archive: base,
        append_archive: append,
        exclude_namespace_prefix: Some("META-INF".to_string()),
        output_archive: output.clone(),
    })
    .unwrap();

    let entries: Vec<_> = read_archive(&output)
        .into_iter()
        .map(|(name, content, _)| (name, content))
        .collect();
    assert_eq!(
        entries,
        vec![
            ("A".to_string(), "a".to_string()),
            ("META-INF/MANIFEST.MF".to_string(), "base manifest".to_string()),
            ("B".to_string(), "b".to_string()),
        ]
    );
    assert_eq!(summary.from_base, 2);
    assert_eq!(summary.from_append, 1);
    assert_eq!(summary.excluded, 1);
    assert_eq!(summary.collisions, 0);
}

#[test]
fn test_directories_are_skipped_and_compression_kept() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("base.jar");
    let append = temp.path().join("append.jar");
    let output = temp.path().join("out.jar");

    write_archive(
        &base,
        &[("org/", ""), ("org/A.class", "stored")],
        CompressionMethod::Stored,
    );
    write_archive(
        &append,
        &[("com/", ""), ("com/B.class", "deflated")],
        CompressionMethod::Deflated,
    );

    repackage(&RepackageRequest {
        base_archive: base,
        append_archive: append,
        exclude_namespace_prefix: None,
        output_archive: output.clone(),
    })
    .unwrap();

    assert_eq!(
        read_archive(&output),
        vec![
            ("org/A.class".to_string(), "stored".to_string(), CompressionMethod::Stored),
            ("com/B.class".to_string(), "deflated".to_string(), CompressionMethod::Deflated),
        ]
    );
}

#[test]
fn test_output_may_replace_base() {
    let temp = TempDir::new().unwrap();
    let jar = temp.path().join("app.jar");
    let runtime = temp.path().join("runtime.jar");

    write_archive(&jar, &[("App.class", "app")], CompressionMethod::Deflated);
    write_archive(&runtime, &[("RT.class", "rt")], CompressionMethod::Deflated);

    repackage(&RepackageRequest {
        base_archive: jar.clone(),
        append_archive: runtime,
        exclude_namespace_prefix: Some("META-INF".to_string()),
        output_archive: jar.clone(),
    })
    .unwrap();

    let names: Vec<_> = read_archive(&jar).into_iter().map(|(name, _, _)| name).collect();
    assert_eq!(names, vec!["App.class", "RT.class"]);

    // Staged copy keeps the original content
    let staged: Vec<_> = read_archive(&temp.path().join("original.jar"))
        .into_iter()
        .map(|(name, _, _)| name)
        .collect();
    assert_eq!(staged, vec!["App.class"]);
}
