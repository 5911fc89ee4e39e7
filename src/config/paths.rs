//! Canonical build-output layout.
//!
//! Single source of truth - use these instead of hardcoding paths.
//!
//! | Location | Purpose |
//! |----------|---------|
//! | `<build>/emma/coverage.em` | Instrumentation metadata |
//! | `<build>/emma/coverage.ec` | Runtime coverage data |
//! | `<build>/emma/original.jar` | Staging copy while repackaging |
//! | `<build>/emma/<artifactId>/` | Extracted source attachments |
//! | `<build>/fake-repo/` | Repository copy with instrumented artifacts |

use std::path::{Path, PathBuf};

/// Directory under the build directory owned by this tool
pub const EMMA_DIR: &str = "emma";

/// Instrumentation metadata file name
pub const METADATA_FILE: &str = "coverage.em";

/// Runtime coverage data file name
pub const RUNTIME_DATA_FILE: &str = "coverage.ec";

/// Staging copy of the base archive during repackaging
pub const STAGING_ARCHIVE: &str = "original.jar";

/// Default repository copy directory name
pub const FAKE_REPO_DIR: &str = "fake-repo";

/// Prefix of entries skipped when appending the runtime library
pub const META_INF: &str = "META-INF";

/// `<build>/emma`
pub fn emma_dir(build_dir: &Path) -> PathBuf {
    build_dir.join(EMMA_DIR)
}

/// `<build>/emma/coverage.em`
pub fn metadata_file(build_dir: &Path) -> PathBuf {
    emma_dir(build_dir).join(METADATA_FILE)
}

/// `<build>/emma/coverage.ec`
pub fn runtime_data_file(build_dir: &Path) -> PathBuf {
    emma_dir(build_dir).join(RUNTIME_DATA_FILE)
}

/// Staging file next to an archive being replaced
pub fn staging_archive(archive: &Path) -> PathBuf {
    archive
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(STAGING_ARCHIVE)
}

/// `<build>/fake-repo`
pub fn fake_repo(build_dir: &Path) -> PathBuf {
    build_dir.join(FAKE_REPO_DIR)
}
