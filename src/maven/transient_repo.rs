use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::maven::{DescriptorFetcher, FetchError, FetchedDescriptor};
use crate::maven::coordinates::ArtifactIdentifier;

/// in-memory descriptor source for tests
pub struct TransientMavenRepo {
    descriptors: Mutex<HashMap<ArtifactIdentifier, Bytes>>,
    fetch_count: Mutex<usize>,
}
impl TransientMavenRepo {
    pub fn new() -> TransientMavenRepo {
        TransientMavenRepo {
            descriptors: Default::default(),
            fetch_count: Default::default(),
        }
    }

    /// coordinates in `g:a:v` form
    pub fn with(self, coordinates: &str, descriptor: &str) -> TransientMavenRepo {
        self.insert(
            coordinates.parse().expect("valid coordinates"),
            Bytes::copy_from_slice(descriptor.as_bytes()),
        );
        self
    }

    pub fn insert(&self, identifier: ArtifactIdentifier, descriptor: Bytes) {
        self.descriptors.lock()
            .unwrap()
            .insert(identifier, descriptor);
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetch_count.lock().unwrap()
    }
}

#[async_trait]
impl DescriptorFetcher for TransientMavenRepo {
    async fn fetch(&self, identifier: &ArtifactIdentifier) -> Result<FetchedDescriptor, FetchError> {
        *self.fetch_count.lock().unwrap() += 1;

        match self.descriptors.lock().unwrap().get(identifier) {
            Some(data) => Ok(FetchedDescriptor {
                data: data.clone(),
                last_modified: Some(0),
            }),
            None => Err(FetchError::NotFound(identifier.clone())),
        }
    }
}
