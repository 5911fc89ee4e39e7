//! Ant-style file set scanning.
//!
//! Patterns are matched against paths relative to the file set's base
//! directory, using `/` as separator:
//! - `*` and `?` stay within one path segment
//! - `**` spans any number of segments, including none
//! - a trailing `/` is shorthand for `/**`, and `dir/**` also matches `dir`
//!
//! A fixed set of version-control and editor metadata patterns is always
//! excluded.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::path::absolute;
use crate::domain::FileSetSpec;
use crate::error::{PipelineError, PipelineResult};

/// Patterns excluded from every scan
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // Miscellaneous typical temporary files
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/._*",
    // CVS
    "**/CVS",
    "**/CVS/**",
    "**/.cvsignore",
    // RCS
    "**/RCS",
    "**/RCS/**",
    // SCCS
    "**/SCCS",
    "**/SCCS/**",
    // Visual SourceSafe
    "**/vssver.scc",
    // Subversion
    "**/.svn",
    "**/.svn/**",
    // Arch
    "**/.arch-ids",
    "**/.arch-ids/**",
    // Bazaar
    "**/.bzr",
    "**/.bzr/**",
    "**/.bzrignore",
    // SurroundSCM
    "**/.MySCMServerInfo",
    // Mac
    "**/.DS_Store",
    // Serena Dimensions
    "**/.metadata",
    "**/.metadata/**",
    // Mercurial
    "**/.hg",
    "**/.hg/**",
    "**/.hgignore",
    // git
    "**/.git",
    "**/.git/**",
    "**/.gitignore",
    "**/.gitattributes",
    // BitKeeper
    "**/BitKeeper",
    "**/BitKeeper/**",
    "**/ChangeSet",
    "**/ChangeSet/**",
    // darcs
    "**/_darcs",
    "**/_darcs/**",
    "**/.darcsrepo",
    "**/.darcsrepo/**",
    "**/-darcs-backup*",
    "**/.darcs-temp-mail",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One Ant pattern compiled to glob form
#[derive(Debug, Clone)]
pub struct AntPattern {
    /// Full pattern
    pattern: Pattern,

    /// For `dir/**` patterns, a pattern matching `dir` itself
    subtree_root: Option<Pattern>,
}

impl AntPattern {
    pub fn new(raw: &str) -> PipelineResult<Self> {
        let mut normalized = raw.trim().replace('\\', "/");
        if normalized.ends_with('/') {
            normalized.push_str("**");
        }

        let pattern = compile(raw, &normalized)?;
        let subtree_root = match normalized.strip_suffix("/**") {
            Some(prefix) if !prefix.is_empty() => Some(compile(raw, prefix)?),
            _ => None,
        };

        Ok(Self {
            pattern,
            subtree_root,
        })
    }

    /// Match a `/`-separated relative path
    pub fn matches(&self, relative: &str) -> bool {
        self.pattern.matches_with(relative, MATCH_OPTIONS)
            || self
                .subtree_root
                .as_ref()
                .map(|root| root.matches_with(relative, MATCH_OPTIONS))
                .unwrap_or(false)
    }

    /// Whether everything below the directory `relative` matches too
    pub fn matches_subtree(&self, relative: &str) -> bool {
        self.subtree_root
            .as_ref()
            .map(|root| root.matches_with(relative, MATCH_OPTIONS))
            .unwrap_or(false)
    }
}

/// Rewrite Ant syntax into `glob` syntax. `[` and `]` are literal in Ant
/// patterns, and `**` inside a segment (`**.jar`, `foo**`) means `*`.
fn compile(raw: &str, normalized: &str) -> PipelineResult<Pattern> {
    let mut escaped = String::with_capacity(normalized.len());
    for (i, segment) in normalized.split('/').enumerate() {
        if i > 0 {
            escaped.push('/');
        }
        if segment == "**" {
            escaped.push_str(segment);
            continue;
        }
        let mut previous_star = false;
        for c in segment.chars() {
            match c {
                '*' if previous_star => continue,
                '[' => escaped.push_str("[[]"),
                ']' => escaped.push_str("[]]"),
                other => escaped.push(other),
            }
            previous_star = c == '*';
        }
    }

    Pattern::new(&escaped)
        .map_err(|e| PipelineError::config(format!("Invalid pattern '{}': {}", raw, e)))
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> PipelineResult<Vec<AntPattern>> {
    patterns.iter().map(|p| AntPattern::new(p.as_ref())).collect()
}

/// A file set with its patterns compiled
#[derive(Debug, Clone)]
pub struct CompiledFileSet {
    base: PathBuf,
    includes: Vec<AntPattern>,
    excludes: Vec<AntPattern>,
}

impl CompiledFileSet {
    /// Compile a file set; fails if the base directory is unset or a pattern
    /// is malformed.
    pub fn new(spec: &FileSetSpec) -> PipelineResult<Self> {
        let base = spec.directory.as_ref().ok_or_else(|| {
            PipelineError::config(format!("The base directory has not been set: {}", spec))
        })?;

        let includes = match &spec.includes {
            Some(patterns) if !patterns.is_empty() => compile_all(patterns)?,
            _ => vec![AntPattern::new("**")?],
        };

        let mut excludes = compile_all(DEFAULT_EXCLUDES)?;
        if let Some(patterns) = &spec.excludes {
            excludes.extend(compile_all(patterns)?);
        }

        Ok(Self {
            base: absolute(base),
            includes,
            excludes,
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Whether a relative path is selected by this file set
    pub fn is_selected(&self, relative: &str) -> bool {
        self.includes.iter().any(|p| p.matches(relative))
            && !self.excludes.iter().any(|p| p.matches(relative))
    }

    fn prunes(&self, relative: &str) -> bool {
        self.excludes.iter().any(|p| p.matches_subtree(relative))
    }

    /// Walk the base directory and collect selected paths.
    ///
    /// Files come first, then directories; each group follows a depth-first
    /// walk with entries sorted by file name.
    pub fn scan(&self, want_files: bool, want_dirs: bool) -> Vec<PathBuf> {
        if !self.base.is_dir() {
            debug!(base = %self.base.display(), "File set base directory does not exist");
            return Vec::new();
        }

        let mut files = Vec::new();
        let mut dirs = Vec::new();

        let walker = WalkDir::new(&self.base)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir() && self.prunes(&relative_path(&self.base, entry.path())))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(base = %self.base.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let relative = relative_path(&self.base, entry.path());
            if !self.is_selected(&relative) {
                continue;
            }

            if entry.file_type().is_dir() {
                if want_dirs {
                    dirs.push(entry.path().to_path_buf());
                }
            } else if want_files {
                files.push(entry.path().to_path_buf());
            }
        }

        files.extend(dirs);
        files
    }
}

fn relative_path(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scan a file set for matching files and/or directories.
///
/// Fails with a configuration error when the base directory is unset;
/// returns an empty list when it does not exist.
pub fn scan(spec: &FileSetSpec, want_files: bool, want_dirs: bool) -> PipelineResult<Vec<PathBuf>> {
    Ok(CompiledFileSet::new(spec)?.scan(want_files, want_dirs))
}
