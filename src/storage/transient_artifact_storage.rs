use std::sync::Mutex;

use async_trait::async_trait;

use crate::maven::coordinates::ArtifactIdentifier;
use crate::storage::artifact_storage::{ArtifactRelation, ArtifactStorage, StoredArtifact};

/// in-memory result storage, for testing purposes
pub struct TransientArtifactStorage {
    artifacts: Mutex<Vec<StoredArtifact>>,
    failed: Mutex<Vec<ArtifactIdentifier>>,
    relations: Mutex<Vec<ArtifactRelation>>,
    /// number of non-empty writes, to observe batching
    num_writes: Mutex<usize>,
}
impl TransientArtifactStorage {
    pub fn new() -> TransientArtifactStorage {
        TransientArtifactStorage {
            artifacts: Default::default(),
            failed: Default::default(),
            relations: Default::default(),
            num_writes: Default::default(),
        }
    }

    pub fn with_artifacts(artifacts: Vec<StoredArtifact>) -> TransientArtifactStorage {
        let result = TransientArtifactStorage::new();
        *result.artifacts.lock().unwrap() = artifacts;
        result
    }

    pub fn artifacts(&self) -> Vec<StoredArtifact> {
        self.artifacts.lock().unwrap().clone()
    }

    pub fn failed_identifiers(&self) -> Vec<ArtifactIdentifier> {
        self.failed.lock().unwrap().clone()
    }

    pub fn relations(&self) -> Vec<ArtifactRelation> {
        self.relations.lock().unwrap().clone()
    }

    pub fn num_writes(&self) -> usize {
        *self.num_writes.lock().unwrap()
    }

    fn count_write(&self, len: usize) {
        if len > 0 {
            *self.num_writes.lock().unwrap() += 1;
        }
    }
}

#[async_trait]
impl ArtifactStorage for TransientArtifactStorage {
    async fn store_artifact_batch(&self, artifacts: Vec<StoredArtifact>) -> anyhow::Result<()> {
        self.count_write(artifacts.len());
        self.artifacts.lock().unwrap().extend(artifacts);
        Ok(())
    }

    async fn store_failed_identifiers(&self, identifiers: Vec<ArtifactIdentifier>) -> anyhow::Result<()> {
        self.count_write(identifiers.len());
        self.failed.lock().unwrap().extend(identifiers);
        Ok(())
    }

    async fn load_artifacts(&self) -> anyhow::Result<Vec<StoredArtifact>> {
        Ok(self.artifacts())
    }

    async fn store_relations(&self, relations: Vec<ArtifactRelation>) -> anyhow::Result<()> {
        self.count_write(relations.len());
        self.relations.lock().unwrap().extend(relations);
        Ok(())
    }
}
