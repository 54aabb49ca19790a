use std::fmt::{Display, Formatter};

use lazy_static::lazy_static;
use regex::Regex;

use crate::maven::coordinates::{ArtifactDependency, ArtifactIdentifier};
use crate::pom::PomDocument;
use crate::resolver::error::ResolverError;

lazy_static! {
    static ref PROPERTY_REFERENCE_REGEX: Regex = Regex::new(r"\$\{([^}]*)\}").unwrap();
}

/// A dependency declaration as found in a document, before interpolation and version lookup.
#[derive(Debug, Clone)]
pub struct DependencySpec {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    /// the document that contains the declaration
    pub declared_in: ArtifactIdentifier,
    pub is_declared_in_import_pom: bool,
}
impl DependencySpec {
    pub fn is_import_scope(&self) -> bool {
        self.scope.as_deref()
            .map(|s| s.eq_ignore_ascii_case("import"))
            .unwrap_or(false)
    }
}

impl Display for DependencySpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}:{}",
               self.group_id,
               self.artifact_id,
               self.version.as_deref().unwrap_or("null"),
               self.scope.as_deref().unwrap_or("null"),
        )
    }
}

/// a BOM pulled in by an import-scoped management entry
#[derive(Debug)]
pub struct ImportDocument {
    pub identifier: ArtifactIdentifier,
    pub document: PomDocument,
}

/// One document of the parent chain (index 0 is the artifact itself) with the declarations
///  collected for it, including those contributed by its import documents.
#[derive(Debug)]
pub struct HierarchyLevel {
    pub identifier: ArtifactIdentifier,
    pub document: PomDocument,
    pub dependencies: Vec<DependencySpec>,
    pub management: Vec<DependencySpec>,
    pub imports: Vec<ImportDocument>,
}
impl HierarchyLevel {
    pub fn new(identifier: ArtifactIdentifier, document: PomDocument) -> HierarchyLevel {
        HierarchyLevel {
            identifier,
            document,
            dependencies: vec![],
            management: vec![],
            imports: vec![],
        }
    }
}

/// The parent chain of one artifact, nearest first. Lookups always start at some level and move
///  towards more distant ancestors, which is what gives nearer declarations precedence.
pub struct Hierarchy {
    pub levels: Vec<HierarchyLevel>,
}
impl Hierarchy {
    pub fn new(levels: Vec<HierarchyLevel>) -> Hierarchy {
        Hierarchy { levels }
    }

    /// the artifact's immediate parent, if it has one
    pub fn parent_identifier(&self) -> Option<&ArtifactIdentifier> {
        self.levels.get(1).map(|l| &l.identifier)
    }

    /// Interpolates the declared coordinates of `spec` and looks up its version if none is
    ///  declared. The scope defaults to 'compile'.
    pub fn resolve_dependency(&self, spec: &DependencySpec, level: usize) -> Result<ArtifactDependency, ResolverError> {
        let group_id = self.resolve_value(&spec.group_id, spec, level)?;
        let artifact_id = self.resolve_value(&spec.artifact_id, spec, level)?;

        let version = match &spec.version {
            Some(version) => self.resolve_value(version, spec, level)?,
            None => {
                let source = self.resolve_missing_version(&group_id, &artifact_id, spec, level)
                    .ok_or_else(|| ResolverError::parsing("failed to resolve missing version", spec.to_string()))?;
                // resolve_missing_version only returns specs with a version
                let declared = source.version.as_deref().unwrap_or_default();
                self.resolve_value(declared, source, level)?
            }
        };

        Ok(ArtifactDependency::new(
            ArtifactIdentifier::new(group_id, artifact_id, version),
            spec.scope.clone(),
        ))
    }

    /// Replaces all `${...}` references in `value`, including references inside property values.
    ///  Fails on the first reference that can not be resolved, naming that reference.
    pub fn resolve_value(&self, value: &str, spec: &DependencySpec, level: usize) -> Result<String, ResolverError> {
        let value = self.interpolate(value, spec, level, &mut vec![])?;

        if value.contains("${") {
            return Err(ResolverError::parsing("unterminated property reference", value));
        }
        Ok(value)
    }

    /// `expanding` holds the properties whose values are being interpolated further up the call
    ///  chain; meeting one of them again can never terminate.
    fn interpolate(&self, value: &str, spec: &DependencySpec, level: usize, expanding: &mut Vec<String>) -> Result<String, ResolverError> {
        let mut result = String::new();
        let mut rest = value;

        while let Some(reference) = PROPERTY_REFERENCE_REGEX.find(rest) {
            result.push_str(&rest[..reference.start()]);
            rest = &rest[reference.end()..];

            let reference = reference.as_str();
            let name = reference[2..reference.len() - 1].trim();

            if expanding.iter().any(|n| n == name) {
                return Err(ResolverError::parsing("cyclic property reference", reference));
            }

            let raw = self.resolve_property(name, spec, level)
                .ok_or_else(|| ResolverError::parsing("failed to resolve property value", reference))?;

            expanding.push(name.to_string());
            let replacement = self.interpolate(&raw, spec, level, expanding)?;
            expanding.pop();

            result.push_str(&replacement);
        }

        result.push_str(rest);
        Ok(result)
    }

    /// Looks up a property starting at `level`: each level's own document first, then the
    ///  level's import documents (but not their ancestors), then the next level.
    pub fn resolve_property(&self, name: &str, spec: &DependencySpec, level: usize) -> Option<String> {
        for (index, current) in self.levels.iter().enumerate().skip(level) {
            let parent = self.levels.get(index + 1).map(|l| &l.identifier);

            if let Some(value) = property_in_document(name, &current.document, &current.identifier, parent, spec) {
                return Some(value);
            }

            for import in &current.imports {
                if let Some(value) = property_in_document(name, &import.document, &import.identifier, None, spec) {
                    return Some(value);
                }
            }
        }
        None
    }

    /// Finds the declaration whose version applies to a dependency declared without one:
    ///  management sections from `start_level` upwards take precedence over plain dependency
    ///  declarations anywhere in the hierarchy.
    pub fn resolve_missing_version(&self, group_id: &str, artifact_id: &str, spec: &DependencySpec, start_level: usize) -> Option<&DependencySpec> {
        let levels = &self.levels[start_level.min(self.levels.len())..];

        levels.iter()
            .flat_map(|l| l.management.iter())
            .find(|candidate| candidate.version.is_some()
                && candidate.group_id == group_id
                && self.management_artifact_matches(candidate, artifact_id, spec, start_level))
            .or_else(|| levels.iter()
                .flat_map(|l| l.dependencies.iter())
                .find(|candidate| candidate.version.is_some()
                    && candidate.group_id == group_id
                    && candidate.artifact_id == artifact_id))
    }

    fn management_artifact_matches(&self, candidate: &DependencySpec, artifact_id: &str, spec: &DependencySpec, level: usize) -> bool {
        if candidate.artifact_id == artifact_id {
            return true;
        }
        // management entries occasionally use properties in their artifact id; these are
        //  resolved on demand and a failure here is not an error of the dependency at hand
        candidate.artifact_id.contains("${")
            && self.resolve_value(&candidate.artifact_id, spec, level)
                .map(|resolved| resolved == artifact_id)
                .unwrap_or(false)
    }
}

fn property_in_document(
    name: &str,
    document: &PomDocument,
    document_identifier: &ArtifactIdentifier,
    parent_identifier: Option<&ArtifactIdentifier>,
    spec: &DependencySpec,
) -> Option<String> {
    if let Some(value) = document.property(name) {
        return Some(value);
    }

    if spec.declared_in != *document_identifier {
        return None;
    }

    let built_in = name.strip_prefix("project.")
        .or_else(|| name.strip_prefix("pom."))?
        .trim()
        .to_ascii_lowercase();

    match built_in.as_str() {
        "groupid" => Some(document_identifier.group_id.clone()),
        "artifactid" => Some(document_identifier.artifact_id.clone()),
        "version" => Some(document_identifier.version.clone()),
        "parent.version" if !spec.is_declared_in_import_pom => parent_identifier.map(|p| p.version.clone()),
        _ => None,
    }
}
