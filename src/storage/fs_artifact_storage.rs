use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs::{create_dir_all, read_dir, remove_file, rename, try_exists, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{error, trace};
use uuid::Uuid;

use crate::maven::coordinates::ArtifactIdentifier;
use crate::storage::artifact_storage::{ArtifactRelation, ArtifactStorage, StoredArtifact};

const ARTIFACTS_DIR: &str = "artifacts";
const FAILED_DIR: &str = "failed";
const RELATIONS_DIR: &str = "relations";

/// Stores every write as a JSON lines file of its own, named by a fresh UUID. Files are written
///  under a temporary name and renamed when complete, so readers never see partial writes.
pub struct FsArtifactStorage {
    root: PathBuf,
}
impl FsArtifactStorage {
    pub fn new(root: impl Into<PathBuf>) -> FsArtifactStorage {
        FsArtifactStorage {
            root: root.into(),
        }
    }

    async fn write_records<T: Serialize>(&self, kind: &str, records: &[T]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let directory_path = self.root.join(kind);
        create_dir_all(&directory_path).await?;

        let key = Uuid::new_v4();
        let file_path = directory_path.join(format!("{}.jsonl", key.as_hyphenated()));
        let temp_file_path = directory_path.join(format!("{}.jsonl.inserting", key.as_hyphenated()));

        trace!("writing {} {} record(s) to {}", records.len(), kind, file_path.display());

        match Self::do_write(&temp_file_path, records).await {
            Ok(_) => {
                rename(temp_file_path, file_path).await?;
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup_error) = remove_file(&temp_file_path).await {
                    error!("error cleaning up {} after failed attempt to write: {}", temp_file_path.display(), cleanup_error);
                }
                Err(e)
            }
        }
    }

    async fn do_write<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(path)
            .await?;

        for record in records {
            let mut line = serde_json::to_string(record)?;
            line.push('\n');
            file.write_all(line.as_bytes()).await?;
        }
        file.flush().await?;
        Ok(())
    }

    /// all records of one kind, ignoring files that are still being written
    async fn read_records<T: DeserializeOwned>(&self, kind: &str) -> anyhow::Result<Vec<T>> {
        let directory_path = self.root.join(kind);
        if !try_exists(&directory_path).await? {
            return Ok(vec![]);
        }

        let mut result = vec![];
        let mut entries = read_dir(&directory_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|ext| ext != "jsonl").unwrap_or(true) {
                continue;
            }

            trace!("reading {} records from {}", kind, path.display());
            let mut lines = FramedRead::new(File::open(&path).await?, LinesCodec::new());
            while let Some(line) = lines.next().await {
                let line = line?;
                if !line.trim().is_empty() {
                    result.push(serde_json::from_str(&line)?);
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
impl FsArtifactStorage {
    pub async fn load_failed_identifiers(&self) -> anyhow::Result<Vec<ArtifactIdentifier>> {
        self.read_records(FAILED_DIR).await
    }

    pub async fn load_relations(&self) -> anyhow::Result<Vec<ArtifactRelation>> {
        self.read_records(RELATIONS_DIR).await
    }
}

#[async_trait]
impl ArtifactStorage for FsArtifactStorage {
    async fn store_artifact_batch(&self, artifacts: Vec<StoredArtifact>) -> anyhow::Result<()> {
        self.write_records(ARTIFACTS_DIR, &artifacts).await
    }

    async fn store_failed_identifiers(&self, identifiers: Vec<ArtifactIdentifier>) -> anyhow::Result<()> {
        self.write_records(FAILED_DIR, &identifiers).await
    }

    async fn load_artifacts(&self) -> anyhow::Result<Vec<StoredArtifact>> {
        self.read_records(ARTIFACTS_DIR).await
    }

    async fn store_relations(&self, relations: Vec<ArtifactRelation>) -> anyhow::Result<()> {
        self.write_records(RELATIONS_DIR, &relations).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("fs-artifact-storage-{}", Uuid::new_v4()))
    }

    fn artifact(coordinates: &str) -> StoredArtifact {
        let id: ArtifactIdentifier = coordinates.parse().unwrap();
        StoredArtifact {
            group_id: id.group_id.clone(),
            artifact_id: id.artifact_id.clone(),
            version: id.version.clone(),
            coordinates: id.coordinates(),
            created_at: Some(1),
            parent_coordinates: None,
            resolver_error_count: 0,
            has_download_errors: false,
            dependencies: vec!["x:y:1:compile".to_string()],
        }
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let root = temp_root();
        let storage = FsArtifactStorage::new(&root);

        storage.store_artifact_batch(vec![artifact("g:a:1"), artifact("g:b:1")]).await.unwrap();
        storage.store_artifact_batch(vec![artifact("g:c:1")]).await.unwrap();
        storage.store_failed_identifiers(vec![ArtifactIdentifier::new("g", "broken", "1")]).await.unwrap();

        let mut loaded = storage.load_artifacts().await.unwrap();
        loaded.sort_by(|a, b| a.coordinates.cmp(&b.coordinates));
        assert_eq!(loaded, vec![artifact("g:a:1"), artifact("g:b:1"), artifact("g:c:1")]);
        assert_eq!(storage.load_failed_identifiers().await.unwrap(), vec![ArtifactIdentifier::new("g", "broken", "1")]);

        let files = std::fs::read_dir(root.join(ARTIFACTS_DIR)).unwrap().count();
        assert_eq!(files, 2);

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_empty_writes_create_no_files() {
        let root = temp_root();
        let storage = FsArtifactStorage::new(&root);

        storage.store_relations(vec![]).await.unwrap();
        assert!(!root.exists());
        assert!(storage.load_relations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_files_are_ignored() {
        let root = temp_root();
        let storage = FsArtifactStorage::new(&root);
        storage.store_artifact_batch(vec![artifact("g:a:1")]).await.unwrap();

        std::fs::write(root.join(ARTIFACTS_DIR).join("pending.jsonl.inserting"), "{not json").unwrap();
        assert_eq!(storage.load_artifacts().await.unwrap().len(), 1);

        std::fs::remove_dir_all(root).unwrap();
    }
}
