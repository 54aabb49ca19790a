use async_trait::async_trait;
use tracing::trace;

use crate::maven::{DescriptorFetcher, FetchError, FetchedDescriptor};
use crate::maven::coordinates::ArtifactIdentifier;
use crate::maven::paths::pom_path;
use crate::util::validating_http_downloader::ValidatingHttpDownloader;

/// a Maven repository reachable over HTTP(S), e.g. Maven Central
pub struct RemoteMavenRepo {
    downloader: ValidatingHttpDownloader,
}
impl RemoteMavenRepo {
    pub fn new(base_uri: String) -> anyhow::Result<RemoteMavenRepo> {
        Ok(RemoteMavenRepo {
            downloader: ValidatingHttpDownloader::new(base_uri)?,
        })
    }
}

#[async_trait]
impl DescriptorFetcher for RemoteMavenRepo {
    async fn fetch(&self, identifier: &ArtifactIdentifier) -> Result<FetchedDescriptor, FetchError> {
        trace!("fetching descriptor for {}", identifier);

        match self.downloader.get(&pom_path(identifier)).await? {
            None => Err(FetchError::NotFound(identifier.clone())),
            Some(blob) => {
                if blob.sha1.is_none() && blob.md5.is_none() {
                    trace!("no checksum reported for descriptor of {}, skipping validation", identifier);
                }
                let last_modified = blob.last_modified;
                Ok(FetchedDescriptor {
                    data: blob.into_bytes().await?,
                    last_modified,
                })
            }
        }
    }
}
