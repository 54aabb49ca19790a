use std::collections::BTreeSet;

use crate::maven::coordinates::{ArtifactDependency, ArtifactIdentifier};
use crate::resolver::error::ResolverError;

/// The outcome of resolving one artifact. `results` is `None` if resolution failed as a whole;
///  an empty set is a legitimate result for an artifact without dependencies.
#[derive(Debug)]
pub struct ResolverResult {
    pub root_identifier: ArtifactIdentifier,
    pub parent_identifier: Option<ArtifactIdentifier>,
    pub results: Option<BTreeSet<ArtifactDependency>>,
    pub errors: Vec<ResolverError>,
    /// epoch millis of the root descriptor, if known
    pub last_modified: Option<i64>,
}
impl ResolverResult {
    pub fn new(root_identifier: ArtifactIdentifier) -> ResolverResult {
        ResolverResult {
            root_identifier,
            parent_identifier: None,
            results: None,
            errors: vec![],
            last_modified: None,
        }
    }

    pub fn has_results(&self) -> bool {
        self.results.is_some()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_download_errors(&self) -> bool {
        self.errors.iter().any(|e| e.is_caused_by_missing_file)
    }

    pub fn has_parent_identifier(&self) -> bool {
        self.parent_identifier.is_some()
    }

    pub fn append_error(&mut self, error: ResolverError) {
        self.errors.push(error);
    }
}
