use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::maven::coordinates::ArtifactIdentifier;

pub mod coordinates;
pub mod paths;
pub mod remote_repo;
#[cfg(test)]
pub mod transient_repo;

/// an artifact's raw descriptor document as retrieved from a repository
#[derive(Clone, Debug)]
pub struct FetchedDescriptor {
    pub data: Bytes,
    /// epoch millis, if the repository reported it
    pub last_modified: Option<i64>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("descriptor not found in repository: {0}")]
    NotFound(ArtifactIdentifier),
    #[error("failed to fetch descriptor: {0:#}")]
    Io(#[from] anyhow::Error),
}

/// Resolves an artifact identifier to its descriptor (POM) document.
#[async_trait]
pub trait DescriptorFetcher: Send + Sync {
    async fn fetch(&self, identifier: &ArtifactIdentifier) -> Result<FetchedDescriptor, FetchError>;
}
