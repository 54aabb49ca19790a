use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use futures_core::Stream;

/// A downloaded file, with its body not yet materialized.
pub struct Blob {
    pub data: Pin<Box<dyn Stream<Item = anyhow::Result<Bytes>> + Send + 'static>>,
    pub md5: Option<[u8;16]>,
    pub sha1: Option<[u8;20]>,
    /// epoch millis, taken from the 'last-modified' header
    pub last_modified: Option<i64>,
}
impl Blob {
    /// Drains the body. Validation failures of the underlying stream surface as errors here.
    pub async fn into_bytes(self) -> anyhow::Result<Bytes> {
        let mut data = self.data;
        let mut result = BytesMut::new();

        while let Some(chunk) = data.next().await {
            result.extend_from_slice(&chunk?);
        }
        Ok(result.freeze())
    }
}
