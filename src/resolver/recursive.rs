use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::trace;

use crate::maven::DescriptorFetcher;
use crate::maven::coordinates::{ArtifactDependency, ArtifactIdentifier};
use crate::pom::PomDocument;
use crate::resolver::DependencyResolver;
use crate::resolver::classifier::classify_dependencies;
use crate::resolver::error::ResolverError;
use crate::resolver::hierarchy::{Hierarchy, ImportDocument};
use crate::resolver::parent_chain::{build_parent_chain, fetch_document};
use crate::resolver::result::ResolverResult;

/// A dependency resolver that parses descriptors itself and loads referenced descriptors on
///  demand. It is a lot faster than invoking Maven, at the price of some approximations:
///  - exclusions are not taken into account
///  - scope conflicts between declarations are not reconciled
///  - properties are looked up in the parent hierarchy and in directly imported BOMs, but not
///     in the parent hierarchy of an imported BOM
pub struct RecursiveResolver {
    fetcher: Arc<dyn DescriptorFetcher>,
    include_profile_dependencies: bool,
}
impl RecursiveResolver {
    pub fn new(fetcher: Arc<dyn DescriptorFetcher>, include_profile_dependencies: bool) -> RecursiveResolver {
        RecursiveResolver {
            fetcher,
            include_profile_dependencies,
        }
    }
}

#[async_trait]
impl DependencyResolver for RecursiveResolver {
    async fn resolve(&self, descriptor: Bytes, identifier: &ArtifactIdentifier) -> ResolverResult {
        let mut result = ResolverResult::new(identifier.clone());
        let mut errors = vec![];

        match self.resolve_hierarchy(&descriptor, identifier, &mut errors).await {
            Ok((dependencies, parent_identifier)) => {
                result.parent_identifier = parent_identifier;
                result.results = Some(dependencies);
            }
            Err(fatal) => errors.push(fatal),
        }

        result.errors = errors;
        result
    }
}

impl RecursiveResolver {
    /// Returns the final dependency set and parent, or the error that made resolution impossible.
    ///  Non-fatal errors are collected in `errors`.
    async fn resolve_hierarchy(
        &self,
        descriptor: &[u8],
        identifier: &ArtifactIdentifier,
        errors: &mut Vec<ResolverError>,
    ) -> Result<(BTreeSet<ArtifactDependency>, Option<ArtifactIdentifier>), ResolverError> {
        let document = PomDocument::parse(descriptor)
            .map_err(|e| ResolverError::parsing("failed to parse POM", identifier.coordinates()).with_cause(e))?;

        let levels = build_parent_chain(self.fetcher.as_ref(), identifier.clone(), document).await?;
        trace!("{} has {} level(s) in its parent hierarchy", identifier, levels.len());

        let mut hierarchy = Hierarchy::new(levels);
        for level in hierarchy.levels.iter_mut() {
            let classified = classify_dependencies(&level.document, &level.identifier, false, self.include_profile_dependencies);
            level.dependencies.extend(classified.dependencies);
            level.management.extend(classified.management);
            errors.extend(classified.errors);
        }

        for level in 0..hierarchy.levels.len() {
            self.expand_imports(&mut hierarchy, level, errors).await;
        }

        let dependencies = assemble(&hierarchy, errors);
        Ok((dependencies, hierarchy.parent_identifier().cloned()))
    }

    /// Adds the documents referenced by import-scoped management entries of one level to that
    ///  level, until no new import document turns up. Imported documents are classified into the
    ///  level's own buckets, so their management entries (including further imports) take part
    ///  in lookups from this level on.
    async fn expand_imports(&self, hierarchy: &mut Hierarchy, level: usize, errors: &mut Vec<ResolverError>) {
        let mut expanded: HashSet<ArtifactIdentifier> = HashSet::new();
        let mut settled: HashSet<usize> = HashSet::new();

        loop {
            let mut added_import = false;
            // failing entries may become resolvable through a later import, so their errors are
            //  only reported once nothing changes any more
            let mut unresolved = vec![];

            let mut index = 0;
            while index < hierarchy.levels[level].management.len() {
                let spec = &hierarchy.levels[level].management[index];
                index += 1;

                if settled.contains(&(index - 1)) || !spec.is_import_scope() {
                    continue;
                }

                let import_identifier = match hierarchy.resolve_dependency(spec, level) {
                    Ok(resolved) => resolved.identifier,
                    Err(e) => {
                        unresolved.push(e);
                        continue;
                    }
                };
                settled.insert(index - 1);

                if !expanded.insert(import_identifier.clone()) {
                    continue;
                }

                trace!("expanding import of {} on level {}", import_identifier, level);
                match fetch_document(self.fetcher.as_ref(), &import_identifier, "import POM").await {
                    Ok(document) => {
                        let classified = classify_dependencies(&document, &import_identifier, true, self.include_profile_dependencies);
                        let current = &mut hierarchy.levels[level];
                        current.dependencies.extend(classified.dependencies);
                        current.management.extend(classified.management);
                        current.imports.push(ImportDocument {
                            identifier: import_identifier,
                            document,
                        });
                        errors.extend(classified.errors);
                        added_import = true;
                    }
                    Err(e) => errors.push(e),
                }
            }

            if !added_import {
                errors.extend(unresolved);
                break;
            }
        }
    }
}

/// Flattens the hierarchy into the final dependency set. Levels are visited nearest first, so for
///  each (groupId, artifactId, scope) the nearest declaration that resolves wins.
fn assemble(hierarchy: &Hierarchy, errors: &mut Vec<ResolverError>) -> BTreeSet<ArtifactDependency> {
    let mut dependencies = BTreeSet::new();
    let mut seen = HashSet::new();

    for (index, level) in hierarchy.levels.iter().enumerate() {
        for spec in level.dependencies.iter().filter(|s| !s.is_declared_in_import_pom) {
            match hierarchy.resolve_dependency(spec, index) {
                Ok(dependency) => {
                    let (group_id, artifact_id, scope) = dependency.dedup_key();
                    if seen.insert((group_id.to_string(), artifact_id.to_string(), scope.to_string())) {
                        dependencies.insert(dependency);
                    }
                }
                Err(e) => errors.push(e),
            }
        }
    }

    dependencies
}

#[cfg(test)]
mod test {
    use crate::maven::transient_repo::TransientMavenRepo;
    use super::*;

    fn dependency(g: &str, a: &str, v: Option<&str>, scope: Option<&str>) -> String {
        format!(
            "<dependency><groupId>{}</groupId><artifactId>{}</artifactId>{}{}</dependency>",
            g, a,
            v.map(|v| format!("<version>{}</version>", v)).unwrap_or_default(),
            scope.map(|s| format!("<scope>{}</scope>", s)).unwrap_or_default(),
        )
    }

    fn bom_import(g: &str, a: &str, v: &str) -> String {
        format!(
            "<dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version><type>pom</type><scope>import</scope></dependency>",
            g, a, v,
        )
    }

    fn pom(parent: Option<&str>, properties: &str, management: &[String], dependencies: &[String]) -> String {
        let parent = parent.map(|p| {
            let id: ArtifactIdentifier = p.parse().unwrap();
            format!("<parent><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version></parent>", id.group_id, id.artifact_id, id.version)
        });
        format!(
            r#"<?xml version="1.0"?>
            <project xmlns="http://maven.apache.org/POM/4.0.0">
                {}
                <properties>{}</properties>
                <dependencyManagement><dependencies>{}</dependencies></dependencyManagement>
                <dependencies>{}</dependencies>
            </project>"#,
            parent.unwrap_or_default(), properties, management.concat(), dependencies.concat(),
        )
    }

    async fn resolve(repo: TransientMavenRepo, root: &str) -> ResolverResult {
        let identifier: ArtifactIdentifier = root.parse().unwrap();
        let root_pom = repo.fetch(&identifier).await.unwrap();
        RecursiveResolver::new(Arc::new(repo), false)
            .resolve(root_pom.data, &identifier)
            .await
    }

    fn coordinates(result: &ResolverResult) -> Vec<String> {
        result.results.as_ref().unwrap().iter().map(|d| d.coordinates()).collect()
    }

    #[tokio::test]
    async fn test_scope_defaults_to_compile() {
        let repo = TransientMavenRepo::new()
            .with("g:root:1", &pom(None, "", &[], &[
                dependency("x", "a", Some("1"), None),
                dependency("x", "b", Some("2"), Some("test")),
            ]));

        let result = resolve(repo, "g:root:1").await;
        assert!(!result.has_errors());
        assert_eq!(coordinates(&result), vec!["x:a:1:compile", "x:b:2:test"]);
        assert_eq!(result.parent_identifier, None);
    }

    #[tokio::test]
    async fn test_inherits_dependencies_management_and_properties() {
        let repo = TransientMavenRepo::new()
            .with("g:parent:5", &pom(
                None,
                "<lib.version>3.1</lib.version>",
                &[dependency("x", "managed", Some("${lib.version}"), None)],
                &[dependency("x", "inherited", Some("${project.version}"), None)],
            ))
            .with("g:root:1", &pom(Some("g:parent:5"), "", &[], &[
                dependency("x", "managed", None, None),
                dependency("${project.groupId}", "sibling", Some("${project.version}"), None),
                dependency("g", "from-parent-version", Some("${project.parent.version}"), None),
            ]));

        let result = resolve(repo, "g:root:1").await;
        assert!(!result.has_errors(), "{:?}", result.errors);
        assert_eq!(coordinates(&result), vec![
            "g:from-parent-version:5:compile",
            "g:sibling:1:compile",
            "x:inherited:5:compile",
            "x:managed:3.1:compile",
        ]);
        assert_eq!(result.parent_identifier, Some(ArtifactIdentifier::new("g", "parent", "5")));
    }

    #[tokio::test]
    async fn test_child_property_overrides_parent_property() {
        let repo = TransientMavenRepo::new()
            .with("g:parent:5", &pom(
                None,
                "<lib.version>1.0</lib.version>",
                &[dependency("x", "lib", Some("${lib.version}"), None)],
                &[],
            ))
            .with("g:root:1", &pom(Some("g:parent:5"), "<lib.version>2.0</lib.version>", &[], &[
                dependency("x", "lib", None, None),
            ]));

        let result = resolve(repo, "g:root:1").await;
        assert_eq!(coordinates(&result), vec!["x:lib:2.0:compile"]);
    }

    #[tokio::test]
    async fn test_unresolvable_reference_drops_only_that_dependency() {
        let repo = TransientMavenRepo::new()
            .with("g:root:1", &pom(None, "", &[], &[
                dependency("x", "broken", Some("${missing.version}"), None),
                dependency("x", "fine", Some("1"), None),
            ]));

        let result = resolve(repo, "g:root:1").await;
        assert_eq!(coordinates(&result), vec!["x:fine:1:compile"]);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].is_parsing_related());
        assert_eq!(result.errors[0].affected_element.as_deref(), Some("${missing.version}"));
        assert!(!result.has_download_errors());
    }

    #[tokio::test]
    async fn test_unresolvable_artifact_id_drops_only_that_dependency() {
        let repo = TransientMavenRepo::new()
            .with("g:root:1", &pom(None, "<known>k</known>", &[], &[
                dependency("x", "${missing.artifact}", Some("1"), None),
                dependency("x", "${known}", Some("2"), None),
                dependency("x", "fine", Some("1"), None),
            ]));

        let result = resolve(repo, "g:root:1").await;
        assert_eq!(coordinates(&result), vec!["x:fine:1:compile", "x:k:2:compile"]);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].is_parsing_related());
        assert_eq!(result.errors[0].affected_element.as_deref(), Some("${missing.artifact}"));
        assert!(!result.has_download_errors());
    }

    #[tokio::test]
    async fn test_nearest_declaration_wins() {
        let repo = TransientMavenRepo::new()
            .with("g:parent:5", &pom(None, "", &[], &[
                dependency("x", "lib", Some("1.0"), None),
                dependency("x", "lib", Some("1.0"), Some("test")),
            ]))
            .with("g:root:1", &pom(Some("g:parent:5"), "", &[], &[
                dependency("x", "lib", Some("2.0"), None),
            ]));

        let result = resolve(repo, "g:root:1").await;
        assert_eq!(coordinates(&result), vec!["x:lib:1.0:test", "x:lib:2.0:compile"]);
    }

    #[tokio::test]
    async fn test_transitive_bom_chain_is_expanded() {
        let repo = TransientMavenRepo::new()
            .with("g:bom-c:3", &pom(None, "<z.version>9.9</z.version>", &[dependency("z", "z", Some("${z.version}"), None)], &[]))
            .with("g:bom-b:2", &pom(None, "", &[bom_import("g", "bom-c", "3")], &[]))
            .with("g:root:1", &pom(None, "", &[bom_import("g", "bom-b", "2")], &[
                dependency("z", "z", None, None),
            ]));

        let result = resolve(repo, "g:root:1").await;
        assert!(!result.has_errors(), "{:?}", result.errors);
        assert_eq!(coordinates(&result), vec!["z:z:9.9:compile"]);
    }

    #[tokio::test]
    async fn test_bom_version_from_property() {
        let repo = TransientMavenRepo::new()
            .with("g:bom:2", &pom(None, "", &[dependency("z", "z", Some("${project.version}"), None)], &[]))
            .with("g:root:1", &pom(None, "<bom.version>2</bom.version>", &[bom_import("g", "bom", "${bom.version}")], &[
                dependency("z", "z", None, None),
            ]));

        let result = resolve(repo, "g:root:1").await;
        assert!(!result.has_errors(), "{:?}", result.errors);
        assert_eq!(coordinates(&result), vec!["z:z:2:compile"]);
    }

    #[tokio::test]
    async fn test_import_documents_do_not_contribute_dependencies() {
        let repo = TransientMavenRepo::new()
            .with("g:bom:2", &pom(None, "", &[], &[dependency("y", "bom-own", Some("1"), None)]))
            .with("g:root:1", &pom(None, "", &[bom_import("g", "bom", "2")], &[]));

        let result = resolve(repo, "g:root:1").await;
        assert!(!result.has_errors());
        assert!(result.results.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_imports_are_expanded_once() {
        let repo = TransientMavenRepo::new()
            .with("g:bom-c:3", &pom(None, "", &[], &[]))
            .with("g:bom-b:2", &pom(None, "", &[bom_import("g", "bom-c", "3")], &[]))
            .with("g:root:1", &pom(None, "", &[bom_import("g", "bom-b", "2"), bom_import("g", "bom-c", "3")], &[]));

        let identifier: ArtifactIdentifier = "g:root:1".parse().unwrap();
        let repo = Arc::new(repo);
        let root_pom = repo.fetch(&identifier).await.unwrap();
        let result = RecursiveResolver::new(repo.clone(), false)
            .resolve(root_pom.data, &identifier)
            .await;

        assert!(!result.has_errors());
        // root + one fetch per distinct import
        assert_eq!(repo.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_import_is_not_fatal() {
        let repo = TransientMavenRepo::new()
            .with("g:root:1", &pom(None, "", &[bom_import("g", "gone", "1")], &[
                dependency("x", "fine", Some("1"), None),
            ]));

        let result = resolve(repo, "g:root:1").await;
        assert_eq!(coordinates(&result), vec!["x:fine:1:compile"]);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].is_parsing_related());
        assert!(result.has_download_errors());
    }

    #[tokio::test]
    async fn test_unparseable_import_is_not_fatal() {
        let repo = TransientMavenRepo::new()
            .with("g:root:1", &pom(None, "", &[bom_import("g", "broken-bom", "2"), bom_import("g", "bom", "1")], &[
                dependency("x", "managed", None, None),
                dependency("x", "fine", Some("1"), None),
            ]))
            .with("g:broken-bom:2", "<project><dependencyManagement></project>")
            .with("g:bom:1", &pom(None, "", &[dependency("x", "managed", Some("3"), None)], &[]));

        let result = resolve(repo, "g:root:1").await;
        assert_eq!(coordinates(&result), vec!["x:fine:1:compile", "x:managed:3:compile"]);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].is_parsing_related());
        assert_eq!(result.errors[0].affected_element.as_deref(), Some("g:broken-bom:2"));
        // the import was fetched, so this is not a download problem
        assert!(!result.has_download_errors());
    }

    #[tokio::test]
    async fn test_missing_parent_yields_no_result() {
        let repo = TransientMavenRepo::new()
            .with("g:root:1", &pom(Some("g:parent:5"), "", &[], &[dependency("x", "a", Some("1"), None)]));

        let result = resolve(repo, "g:root:1").await;
        assert!(!result.has_results());
        assert!(result.has_download_errors());
    }

    #[tokio::test]
    async fn test_malformed_root_yields_no_result() {
        let identifier: ArtifactIdentifier = "g:root:1".parse().unwrap();
        let result = RecursiveResolver::new(Arc::new(TransientMavenRepo::new()), false)
            .resolve(Bytes::from_static(b"<project><dependencies></project>"), &identifier)
            .await;

        assert!(!result.has_results());
        assert_eq!(result.errors.len(), 1);
        assert!(!result.has_download_errors());
    }

    #[tokio::test]
    async fn test_profile_dependencies_are_opt_in() {
        let xml = r#"<project><profiles><profile><dependencies>
                <dependency><groupId>p</groupId><artifactId>q</artifactId><version>1</version></dependency>
            </dependencies></profile></profiles></project>"#;
        let identifier: ArtifactIdentifier = "g:root:1".parse().unwrap();
        let fetcher = Arc::new(TransientMavenRepo::new());

        let without = RecursiveResolver::new(fetcher.clone(), false)
            .resolve(Bytes::copy_from_slice(xml.as_bytes()), &identifier)
            .await;
        let with = RecursiveResolver::new(fetcher, true)
            .resolve(Bytes::copy_from_slice(xml.as_bytes()), &identifier)
            .await;

        assert!(coordinates(&without).is_empty());
        assert_eq!(coordinates(&with), vec!["p:q:1:compile"]);
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let repo = Arc::new(TransientMavenRepo::new()
            .with("g:bom:2", &pom(None, "", &[dependency("z", "z", Some("4"), None)], &[]))
            .with("g:parent:5", &pom(None, "<v>7</v>", &[bom_import("g", "bom", "2")], &[dependency("x", "p", Some("${v}"), None)]))
            .with("g:root:1", &pom(Some("g:parent:5"), "", &[], &[dependency("z", "z", None, None), dependency("x", "c", Some("${v}"), None)])));

        let identifier: ArtifactIdentifier = "g:root:1".parse().unwrap();
        let root_pom = repo.fetch(&identifier).await.unwrap();
        let resolver = RecursiveResolver::new(repo, false);

        let first = resolver.resolve(root_pom.data.clone(), &identifier).await;
        let second = resolver.resolve(root_pom.data, &identifier).await;
        assert_eq!(first.results, second.results);
        assert_eq!(coordinates(&first), vec!["x:c:7:compile", "x:p:7:compile", "z:z:4:compile"]);
    }

    #[tokio::test]
    #[ignore = "requires access to Maven Central"]
    async fn test_okapi_ir_against_maven_central() {
        let result = resolve_remote("org.opencypher:okapi-ir:1.0.0-beta3").await;
        assert!(!result.has_errors(), "{:?}", result.errors);
        assert_eq!(result.results.unwrap().len(), 17);
    }

    #[tokio::test]
    #[ignore = "requires access to Maven Central"]
    async fn test_quarkus_bom_imports_against_maven_central() {
        let result = resolve_remote("io.quarkus:quarkus-rest-client-jsonb:1.11.4.Final").await;
        let dependencies = result.results.unwrap();
        assert_eq!(dependencies.len(), 5);
        assert!(dependencies.contains(&ArtifactDependency::new(
            ArtifactIdentifier::new("org.jboss.resteasy", "resteasy-json-binding-provider", "4.5.9.Final"),
            Some("compile".to_string()),
        )));
    }

    async fn resolve_remote(coordinates: &str) -> ResolverResult {
        let repo = Arc::new(crate::maven::remote_repo::RemoteMavenRepo::new("https://repo1.maven.org/maven2".to_string()).unwrap());
        let identifier: ArtifactIdentifier = coordinates.parse().unwrap();
        let root_pom = repo.fetch(&identifier).await.unwrap();
        RecursiveResolver::new(repo, false)
            .resolve(root_pom.data, &identifier)
            .await
    }
}
