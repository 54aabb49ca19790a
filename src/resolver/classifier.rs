use crate::maven::coordinates::ArtifactIdentifier;
use crate::pom::{ElementId, PomDocument};
use crate::resolver::error::ResolverError;
use crate::resolver::hierarchy::DependencySpec;

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
enum DeclarationContext {
    DependencyManagement,
    Plugin,
    Profile,
    Project,
}

/// the dependency declarations of one document, by the section they appear in
#[derive(Default)]
pub struct ClassifiedDependencies {
    pub dependencies: Vec<DependencySpec>,
    pub management: Vec<DependencySpec>,
    pub errors: Vec<ResolverError>,
}

/// Collects all `<dependency>` declarations of a document in document order. Plugin dependencies
///  are dropped, and so are profile dependencies unless `include_profiles` is set.
pub fn classify_dependencies(
    document: &PomDocument,
    declared_in: &ArtifactIdentifier,
    is_import_document: bool,
    include_profiles: bool,
) -> ClassifiedDependencies {
    let mut result = ClassifiedDependencies::default();

    for element in document.elements_named("dependency") {
        let group_id = document.child_text(element, "groupId");
        let artifact_id = document.child_text(element, "artifactId");

        let (group_id, artifact_id) = match (group_id, artifact_id) {
            (Some(g), Some(a)) => (g, a),
            (g, a) => {
                result.errors.push(ResolverError::parsing(
                    "incomplete dependency specification found",
                    format!("{}:{} in {}", g.as_deref().unwrap_or("null"), a.as_deref().unwrap_or("null"), declared_in),
                ));
                continue;
            }
        };

        let spec = DependencySpec {
            group_id,
            artifact_id,
            version: document.child_text(element, "version"),
            scope: document.child_text(element, "scope"),
            declared_in: declared_in.clone(),
            is_declared_in_import_pom: is_import_document,
        };

        match declaration_context(document, element) {
            DeclarationContext::DependencyManagement => result.management.push(spec),
            DeclarationContext::Project => result.dependencies.push(spec),
            DeclarationContext::Profile if include_profiles => result.dependencies.push(spec),
            DeclarationContext::Profile | DeclarationContext::Plugin => {}
        }
    }

    result
}

/// the innermost enclosing section that determines how a declaration is treated
fn declaration_context(document: &PomDocument, element: ElementId) -> DeclarationContext {
    for ancestor in document.ancestors(element) {
        let name = document.name(ancestor);
        if name.eq_ignore_ascii_case("dependencyManagement") {
            return DeclarationContext::DependencyManagement;
        }
        if name.eq_ignore_ascii_case("plugin") {
            return DeclarationContext::Plugin;
        }
        if name.eq_ignore_ascii_case("profile") {
            return DeclarationContext::Profile;
        }
    }
    DeclarationContext::Project
}
