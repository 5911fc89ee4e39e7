//! Local Maven-layout repository resolver.
//!
//! Resolves coordinates to files under a repository root such as
//! `~/.m2/repository`. Nothing is downloaded: an artifact missing from the
//! local repository is a resolution failure.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::domain::ArtifactCoordinate;
use crate::error::ResolutionFailure;

use super::pom::{is_excluded, Pom, PomDependency};
use super::{RepositoryResolver, ResolvedArtifact};

/// Parent chains deeper than this are treated as cycles
const MAX_PARENT_DEPTH: usize = 32;

/// Resolver over a local repository directory
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location: `~/.m2/repository`
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".m2").join("repository"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every file of one coordinate version
    pub fn artifact_dir(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        let mut dir = self.root.clone();
        for segment in coordinate.group.split('.') {
            dir.push(segment);
        }
        dir.join(&coordinate.name).join(&coordinate.version)
    }

    /// Expected file for a coordinate, whether or not it exists
    pub fn artifact_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        let mut file_name = format!("{}-{}", coordinate.name, coordinate.version);
        if let Some(classifier) = coordinate.classifier() {
            file_name.push('-');
            file_name.push_str(classifier);
        }
        file_name.push('.');
        file_name.push_str(coordinate.extension());
        self.artifact_dir(coordinate).join(file_name)
    }

    fn load_pom(&self, coordinate: &ArtifactCoordinate, depth: usize) -> Result<Pom, ResolutionFailure> {
        if depth > MAX_PARENT_DEPTH {
            return Err(ResolutionFailure::new(coordinate, "parent chain too deep"));
        }

        let pom_coordinate = coordinate.pom();
        let path = self.resolve(&pom_coordinate)?;
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ResolutionFailure::new(&pom_coordinate, format!("failed to read {}: {}", path.display(), e))
        })?;

        let pom = Pom::parse(&content).map_err(|e| {
            ResolutionFailure::new(&pom_coordinate, format!("failed to parse {}: {}", path.display(), e))
        })?;
        match pom.parent.clone() {
            Some(parent) => {
                let parent_pom = self.load_pom(&parent, depth + 1)?;
                Ok(pom.inherit(&parent_pom))
            }
            None => Ok(pom),
        }
    }
}

impl RepositoryResolver for LocalRepository {
    fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<PathBuf, ResolutionFailure> {
        let path = self.artifact_path(coordinate);
        if path.is_file() {
            debug!(%coordinate, path = %path.display(), "Resolved artifact");
            Ok(path)
        } else {
            Err(ResolutionFailure::new(
                coordinate,
                format!("{} not found in local repository", path.display()),
            ))
        }
    }

    #[instrument(skip_all, fields(coordinate = %coordinate))]
    fn resolve_closure(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Vec<ResolvedArtifact>, ResolutionFailure> {
        let root_file = self.resolve(coordinate)?;
        let mut resolved = vec![ResolvedArtifact {
            coordinate: coordinate.clone(),
            file: root_file,
        }];

        let root_key = PomDependency {
            group: coordinate.group.clone(),
            name: coordinate.name.clone(),
            kind: Some(coordinate.kind.clone()),
            classifier: coordinate.classifier().map(str::to_string),
            ..Default::default()
        }
        .management_key();

        let mut seen: HashSet<_> = HashSet::from([root_key]);
        let mut queue: VecDeque<(ArtifactCoordinate, Vec<(String, String)>)> =
            VecDeque::from([(coordinate.clone(), Vec::new())]);

        // Breadth-first so the nearest declaration of a library wins
        while let Some((current, exclusions)) = queue.pop_front() {
            let pom = self.load_pom(&current, 0)?;
            let dependencies = pom
                .runtime_dependencies()
                .map_err(|e| ResolutionFailure::new(&current, e.to_string()))?;

            for (dep_coordinate, dep) in dependencies {
                let excluded = is_excluded(&exclusions, &dep_coordinate.group, &dep_coordinate.name);
                if excluded || !seen.insert(dep.management_key()) {
                    continue;
                }

                let file = self.resolve(&dep_coordinate)?;
                resolved.push(ResolvedArtifact {
                    coordinate: dep_coordinate.clone(),
                    file,
                });

                let mut child_exclusions = exclusions.clone();
                child_exclusions.extend(dep.exclusions.iter().cloned());
                queue.push_back((dep_coordinate, child_exclusions));
            }
        }

        debug!(count = resolved.len(), "Resolved dependency closure");
        Ok(resolved)
    }

    fn local_root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn install(repo: &LocalRepository, coordinate: &ArtifactCoordinate, pom: Option<&str>) {
        let jar = repo.artifact_path(coordinate);
        std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
        std::fs::write(&jar, b"PK").unwrap();
        if let Some(pom) = pom {
            std::fs::write(repo.artifact_path(&coordinate.pom()), pom).unwrap();
        }
    }

    fn pom_with(deps: &str) -> String {
        format!("<project><groupId>g</groupId><artifactId>x</artifactId><version>1</version><dependencies>{}</dependencies></project>", deps)
    }

    #[test]
    fn test_artifact_path_layout() {
        let repo = LocalRepository::new("/repo");
        let coord = ArtifactCoordinate::new("org.example.sub", "lib", "1.0").sources();
        assert_eq!(
            repo.artifact_path(&coord),
            PathBuf::from("/repo/org/example/sub/lib/1.0/lib-1.0-sources.jar")
        );
    }

    #[test]
    fn test_test_jar_layout() {
        let repo = LocalRepository::new("/repo");
        let coord = ArtifactCoordinate::new("g", "n", "1").with_kind("test-jar");
        assert_eq!(repo.artifact_path(&coord), PathBuf::from("/repo/g/n/1/n-1-tests.jar"));

        let explicit = coord.with_classifier("it");
        assert_eq!(repo.artifact_path(&explicit), PathBuf::from("/repo/g/n/1/n-1-it.jar"));
    }

    #[test]
    fn test_resolve_missing_artifact() {
        let temp = TempDir::new().unwrap();
        let repo = LocalRepository::new(temp.path());
        let coord = ArtifactCoordinate::new("g", "missing", "1");
        let err = repo.resolve(&coord).unwrap_err();
        assert_eq!(err.coordinate, coord);
        assert!(err.message.contains("not found"));
    }

    #[test]
    fn test_closure_walks_dependencies() {
        let temp = TempDir::new().unwrap();
        let repo = LocalRepository::new(temp.path());

        let app = ArtifactCoordinate::new("g", "app", "1");
        let lib = ArtifactCoordinate::new("g", "lib", "1");
        let util = ArtifactCoordinate::new("g", "util", "1");
        let dep = |name: &str| format!("<dependency><groupId>g</groupId><artifactId>{}</artifactId><version>1</version></dependency>", name);

        install(&repo, &app, Some(&pom_with(&(dep("lib") + &dep("util")))));
        install(&repo, &lib, Some(&pom_with(&dep("util"))));
        install(&repo, &util, Some(&pom_with("")));

        let closure = repo.resolve_closure(&app).unwrap();
        let names: Vec<&str> = closure.iter().map(|a| a.coordinate.name.as_str()).collect();
        assert_eq!(names, vec!["app", "lib", "util"]);
    }

    #[test]
    fn test_closure_is_atomic() {
        let temp = TempDir::new().unwrap();
        let repo = LocalRepository::new(temp.path());

        let app = ArtifactCoordinate::new("g", "app", "1");
        install(
            &repo,
            &app,
            Some(&pom_with("<dependency><groupId>g</groupId><artifactId>gone</artifactId><version>1</version></dependency>")),
        );

        let err = repo.resolve_closure(&app).unwrap_err();
        assert_eq!(err.coordinate.name, "gone");
    }

    #[test]
    fn test_closure_honors_exclusions() {
        let temp = TempDir::new().unwrap();
        let repo = LocalRepository::new(temp.path());

        let app = ArtifactCoordinate::new("g", "app", "1");
        let lib = ArtifactCoordinate::new("g", "lib", "1");
        install(
            &repo,
            &app,
            Some(&pom_with(
                "<dependency><groupId>g</groupId><artifactId>lib</artifactId><version>1</version>\
                 <exclusions><exclusion><groupId>g</groupId><artifactId>never</artifactId></exclusion></exclusions>\
                 </dependency>",
            )),
        );
        install(
            &repo,
            &lib,
            Some(&pom_with("<dependency><groupId>g</groupId><artifactId>never</artifactId><version>1</version></dependency>")),
        );

        let closure = repo.resolve_closure(&app).unwrap();
        assert_eq!(closure.len(), 2);
    }

    #[test]
    fn test_closure_reports_malformed_descriptor() {
        let temp = TempDir::new().unwrap();
        let repo = LocalRepository::new(temp.path());

        let app = ArtifactCoordinate::new("g", "app", "1");
        install(&repo, &app, Some("<project><dependencies></project>"));

        let err = repo.resolve_closure(&app).unwrap_err();
        assert!(err.message.contains("failed to parse"));
    }
}
