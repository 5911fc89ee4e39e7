//! Artifact coordinates.
//!
//! A coordinate names one artifact in a Maven-layout repository. The two
//! behavioural flags (`resolve_transitively`, `instrument`) travel with the
//! coordinate in configuration but are not part of its identity.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Classifier used for source attachments
pub const SOURCES_CLASSIFIER: &str = "sources";

/// Classifier implied by the `test-jar` type
pub const TESTS_CLASSIFIER: &str = "tests";

/// A (group, name, version, classifier, type) artifact coordinate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    /// Group id (e.g. "org.example")
    #[serde(alias = "groupId")]
    pub group: String,

    /// Artifact id
    #[serde(alias = "artifactId")]
    pub name: String,

    /// Version string
    pub version: String,

    /// Optional classifier (e.g. "sources", "tests")
    #[serde(default)]
    pub classifier: Option<String>,

    /// Packaging type (default: "jar")
    #[serde(default = "default_kind", rename = "type")]
    pub kind: String,

    /// Expand to the transitive closure where the pipeline supports it
    #[serde(default = "default_true", alias = "resolveTransitively")]
    pub resolve_transitively: bool,

    /// Instrument the resolved artifact where the pipeline supports it
    #[serde(default = "default_true")]
    pub instrument: bool,
}

fn default_kind() -> String {
    "jar".to_string()
}

fn default_true() -> bool {
    true
}

impl ArtifactCoordinate {
    /// Create a plain jar coordinate with default flags
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            classifier: None,
            kind: default_kind(),
            resolve_transitively: true,
            instrument: true,
        }
    }

    /// Same coordinate with a different classifier
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Same coordinate with a different packaging type
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the transitive-resolution flag
    pub fn with_resolve_transitively(mut self, value: bool) -> Self {
        self.resolve_transitively = value;
        self
    }

    /// Set the instrument flag
    pub fn with_instrument(mut self, value: bool) -> Self {
        self.instrument = value;
        self
    }

    /// The "sources" attachment of this coordinate
    pub fn sources(&self) -> Self {
        self.clone().with_classifier(SOURCES_CLASSIFIER)
    }

    /// The project descriptor (pom) of this coordinate
    pub fn pom(&self) -> Self {
        Self {
            classifier: None,
            kind: "pom".to_string(),
            ..self.clone()
        }
    }

    /// Classifier, treating an empty string as absent. `test-jar` without
    /// an explicit classifier means `tests`.
    pub fn classifier(&self) -> Option<&str> {
        match self.classifier.as_deref().filter(|c| !c.is_empty()) {
            None if self.kind == "test-jar" => Some(TESTS_CLASSIFIER),
            other => other,
        }
    }

    /// File extension for the packaging type
    pub fn extension(&self) -> &str {
        match self.kind.as_str() {
            "jar" | "test-jar" | "maven-plugin" | "ejb" | "ejb-client" | "java-source" | "javadoc" => "jar",
            other => other,
        }
    }

    fn identity(&self) -> (&str, &str, &str, Option<&str>, &str) {
        (
            &self.group,
            &self.name,
            &self.version,
            self.classifier(),
            &self.kind,
        )
    }
}

impl PartialEq for ArtifactCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ArtifactCoordinate {}

impl Hash for ArtifactCoordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.kind)?;
        if let Some(classifier) = self.classifier() {
            write!(f, ":{}", classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_ignores_flags() {
        let a = ArtifactCoordinate::new("org.example", "lib", "1.0");
        let b = a.clone().with_instrument(false).with_resolve_transitively(false);
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_empty_classifier_is_absent() {
        let a = ArtifactCoordinate::new("g", "n", "1");
        let b = ArtifactCoordinate::new("g", "n", "1").with_classifier("");
        assert_eq!(a, b);
        assert_eq!(b.to_string(), "g:n:jar:1");
    }

    #[test]
    fn test_display_with_classifier() {
        let coord = ArtifactCoordinate::new("org.example", "lib", "2.1").sources();
        assert_eq!(coord.to_string(), "org.example:lib:jar:sources:2.1");
    }

    #[test]
    fn test_yaml_defaults_and_aliases() {
        let coord: ArtifactCoordinate = serde_yaml::from_str(
            "groupId: emma\nartifactId: emma\nversion: 2.0.5312\n",
        )
        .unwrap();
        assert_eq!(coord.kind, "jar");
        assert!(coord.resolve_transitively);
        assert!(coord.instrument);
        assert_eq!(coord.classifier(), None);
    }

    #[test]
    fn test_extension_mapping() {
        let coord = ArtifactCoordinate::new("g", "n", "1");
        assert_eq!(coord.extension(), "jar");
        assert_eq!(coord.clone().with_kind("test-jar").extension(), "jar");
        assert_eq!(coord.pom().extension(), "pom");
        assert_eq!(coord.with_kind("zip").extension(), "zip");
    }

    #[test]
    fn test_test_jar_implies_tests_classifier() {
        let coord = ArtifactCoordinate::new("g", "n", "1").with_kind("test-jar");
        assert_eq!(coord.classifier(), Some(TESTS_CLASSIFIER));
        assert_eq!(coord.to_string(), "g:n:test-jar:tests:1");
        assert_eq!(coord.pom().classifier(), None);
    }
}
