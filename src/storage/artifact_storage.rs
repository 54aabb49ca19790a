use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::maven::coordinates::ArtifactIdentifier;
use crate::resolver::result::ResolverResult;

/// The persisted outcome of mining one artifact.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub coordinates: String,
    /// last modification of the artifact's descriptor, epoch millis
    pub created_at: Option<i64>,
    pub parent_coordinates: Option<String>,
    pub resolver_error_count: usize,
    pub has_download_errors: bool,
    /// `g:a:v:scope` of every direct dependency, sorted
    pub dependencies: Vec<String>,
}
impl StoredArtifact {
    pub fn from_result(result: &ResolverResult) -> StoredArtifact {
        let identifier = &result.root_identifier;
        StoredArtifact {
            group_id: identifier.group_id.clone(),
            artifact_id: identifier.artifact_id.clone(),
            version: identifier.version.clone(),
            coordinates: identifier.coordinates(),
            created_at: result.last_modified,
            parent_coordinates: result.parent_identifier.as_ref().map(|p| p.coordinates()),
            resolver_error_count: result.errors.len(),
            has_download_errors: result.has_download_errors(),
            dependencies: result.results.iter()
                .flatten()
                .map(|d| d.coordinates())
                .collect(),
        }
    }
}

/// a relation between two stored artifacts, identified by their `g:a:v` coordinates
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactRelation {
    DependsOn {
        from: String,
        to: String,
        scope: String,
    },
    ChildOf {
        child: String,
        parent: String,
    },
}

/// Persistence for mining results. Each call is a unit of its own: there is no atomicity across
///  calls, so an interrupted run loses at most the writes that were in flight.
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    async fn store_artifact_batch(&self, artifacts: Vec<StoredArtifact>) -> anyhow::Result<()>;

    /// artifacts for which resolution failed entirely
    async fn store_failed_identifiers(&self, identifiers: Vec<ArtifactIdentifier>) -> anyhow::Result<()>;

    async fn load_artifacts(&self) -> anyhow::Result<Vec<StoredArtifact>>;

    async fn store_relations(&self, relations: Vec<ArtifactRelation>) -> anyhow::Result<()>;
}
