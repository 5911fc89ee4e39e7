//! Minimal project descriptor (pom.xml) reader.
//!
//! Extracts only what dependency closure needs: coordinates, parent,
//! properties, managed versions and the runtime dependency list. Build
//! plugins, profiles and reporting sections are ignored.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use roxmltree::{Document, Node};
use thiserror::Error;

use crate::domain::ArtifactCoordinate;

/// Maximum nesting of `${...}` expansion
const MAX_INTERPOLATION_DEPTH: usize = 16;

/// Scopes that never reach a runtime classpath
const NON_TRANSITIVE_SCOPES: &[&str] = &["test", "provided", "system", "import"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PomError {
    #[error("Malformed descriptor: {0}")]
    Malformed(String),

    #[error("Unresolvable expression '{expression}' in {field}")]
    Unresolved { field: String, expression: String },

    #[error("Dependency {group}:{name} has no version")]
    MissingVersion { group: String, name: String },

    #[error("Project has no {0}")]
    MissingField(&'static str),
}

/// Whether `(group, name)` matches any exclusion; `*` matches anything
pub fn is_excluded(exclusions: &[(String, String)], group: &str, name: &str) -> bool {
    exclusions
        .iter()
        .any(|(g, n)| (g == "*" || g == group) && (n == "*" || n == name))
}

/// One `<dependency>` block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomDependency {
    pub group: String,
    pub name: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub kind: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    /// (group, name) pairs; `*` matches anything
    pub exclusions: Vec<(String, String)>,
}

impl PomDependency {
    /// Whether this dependency belongs on the runtime classpath of dependents
    pub fn is_transitive(&self) -> bool {
        if self.optional {
            return false;
        }
        match self.scope.as_deref() {
            Some(scope) => !NON_TRANSITIVE_SCOPES.contains(&scope),
            None => true,
        }
    }

    /// Versionless key used for nearest-wins de-duplication
    pub fn management_key(&self) -> (String, String, String, Option<String>) {
        (
            self.group.clone(),
            self.name.clone(),
            self.kind.clone().unwrap_or_else(|| "jar".to_string()),
            self.classifier.clone(),
        )
    }
}

/// The parts of a project descriptor the resolver needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pom {
    pub parent: Option<ArtifactCoordinate>,
    pub group: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub properties: HashMap<String, String>,
    pub managed: Vec<PomDependency>,
    pub dependencies: Vec<PomDependency>,
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
}

fn node_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|c| c.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn parse_parent(node: Node<'_, '_>) -> Option<ArtifactCoordinate> {
    Some(
        ArtifactCoordinate::new(
            node_text(&node, "groupId")?,
            node_text(&node, "artifactId")?,
            node_text(&node, "version")?,
        )
        .with_kind("pom"),
    )
}

fn parse_properties(project: &Node<'_, '_>) -> HashMap<String, String> {
    child(project, "properties")
        .map(|props| {
            props
                .children()
                .filter(|c| c.is_element())
                .map(|prop| {
                    let value = prop.text().map(|t| t.trim().to_string()).unwrap_or_default();
                    (prop.tag_name().name().to_string(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_dependency(node: Node<'_, '_>) -> Option<PomDependency> {
    let exclusions: Vec<(String, String)> = child(&node, "exclusions")
        .map(|section| {
            section
                .children()
                .filter(|c| c.is_element() && c.tag_name().name() == "exclusion")
                .filter_map(|ex| Some((node_text(&ex, "groupId")?, node_text(&ex, "artifactId")?)))
                .collect()
        })
        .unwrap_or_default();

    Some(PomDependency {
        group: node_text(&node, "groupId")?,
        name: node_text(&node, "artifactId")?,
        version: node_text(&node, "version"),
        classifier: node_text(&node, "classifier"),
        kind: node_text(&node, "type"),
        scope: node_text(&node, "scope"),
        optional: node_text(&node, "optional")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        exclusions,
    })
}

fn parse_dependency_list(section: Option<Node<'_, '_>>) -> Vec<PomDependency> {
    section
        .map(|s| {
            s.children()
                .filter(|c| c.is_element() && c.tag_name().name() == "dependency")
                .filter_map(parse_dependency)
                .collect()
        })
        .unwrap_or_default()
}

impl Pom {
    /// Parse descriptor text
    pub fn parse(content: &str) -> Result<Self, PomError> {
        let document = Document::parse(content).map_err(|e| PomError::Malformed(e.to_string()))?;
        let project = document.root_element();
        if project.tag_name().name() != "project" {
            return Err(PomError::MissingField("<project> element"));
        }

        let parent = child(&project, "parent").and_then(parse_parent);
        let managed = parse_dependency_list(
            child(&project, "dependencyManagement").and_then(|m| child(&m, "dependencies")),
        );
        let dependencies = parse_dependency_list(child(&project, "dependencies"));

        Ok(Pom {
            group: node_text(&project, "groupId").or_else(|| parent.as_ref().map(|p| p.group.clone())),
            name: node_text(&project, "artifactId"),
            version: node_text(&project, "version").or_else(|| parent.as_ref().map(|p| p.version.clone())),
            properties: parse_properties(&project),
            parent,
            managed,
            dependencies,
        })
    }

    /// Overlay this (child) descriptor on an already effective parent
    pub fn inherit(mut self, parent: &Pom) -> Self {
        let mut properties = parent.properties.clone();
        properties.extend(self.properties.drain());
        self.properties = properties;

        let mut managed = self.managed.clone();
        for dep in &parent.managed {
            if !managed.iter().any(|m| m.management_key() == dep.management_key()) {
                managed.push(dep.clone());
            }
        }
        self.managed = managed;

        let mut dependencies = parent.dependencies.clone();
        for dep in self.dependencies.drain(..) {
            dependencies.retain(|d| d.management_key() != dep.management_key());
            dependencies.push(dep);
        }
        self.dependencies = dependencies;
        self
    }

    /// Expand `${...}` expressions against project fields and properties
    pub fn interpolate(&self, field: &str, value: &str) -> Result<String, PomError> {
        static EXPR: OnceLock<Regex> = OnceLock::new();
        let re = EXPR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex must compile"));

        let mut current = value.to_string();
        for _ in 0..MAX_INTERPOLATION_DEPTH {
            let Some(cap) = re.captures(&current) else {
                return Ok(current);
            };
            let expression = cap[1].to_string();
            let replacement = self.lookup(&expression).ok_or_else(|| PomError::Unresolved {
                field: field.to_string(),
                expression: format!("${{{}}}", expression),
            })?;
            current = current.replacen(&cap[0], &replacement, 1);
        }

        Err(PomError::Unresolved {
            field: field.to_string(),
            expression: value.to_string(),
        })
    }

    fn lookup(&self, expression: &str) -> Option<String> {
        match expression {
            "project.version" | "pom.version" | "version" => self.version.clone(),
            "project.groupId" | "pom.groupId" | "groupId" => self.group.clone(),
            "project.artifactId" | "pom.artifactId" | "artifactId" => self.name.clone(),
            "project.parent.version" | "parent.version" => self.parent.as_ref().map(|p| p.version.clone()),
            "project.parent.groupId" | "parent.groupId" => self.parent.as_ref().map(|p| p.group.clone()),
            other => self.properties.get(other).cloned(),
        }
    }

    /// Runtime dependencies as coordinates, with managed versions applied
    pub fn runtime_dependencies(&self) -> Result<Vec<(ArtifactCoordinate, PomDependency)>, PomError> {
        let mut out = Vec::new();
        for dep in &self.dependencies {
            let managed = self
                .managed
                .iter()
                .find(|m| m.management_key() == dep.management_key());

            let scope = dep.scope.clone().or_else(|| managed.and_then(|m| m.scope.clone()));
            let effective = PomDependency {
                scope,
                ..dep.clone()
            };
            if !effective.is_transitive() {
                continue;
            }

            let group = self.interpolate("groupId", &dep.group)?;
            let name = self.interpolate("artifactId", &dep.name)?;
            let version = dep
                .version
                .clone()
                .or_else(|| managed.and_then(|m| m.version.clone()))
                .ok_or_else(|| PomError::MissingVersion {
                    group: group.clone(),
                    name: name.clone(),
                })?;
            let version = self.interpolate("version", &version)?;

            let mut coordinate = ArtifactCoordinate::new(group, name, version)
                .with_kind(dep.kind.clone().unwrap_or_else(|| "jar".to_string()));
            if let Some(classifier) = &dep.classifier {
                coordinate = coordinate.with_classifier(self.interpolate("classifier", classifier)?);
            }
            out.push((coordinate, effective));
        }
        Ok(out)
    }
}
