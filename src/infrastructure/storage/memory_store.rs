use std::io;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutPayload};

use crate::application::ports::{MediaStore, MediaStoreError};
use crate::domain::StoragePath;

/// Volatile media store for tests.
pub struct InMemoryMediaStore {
    inner: InMemory,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self {
            inner: InMemory::new(),
        }
    }
}

impl Default for InMemoryMediaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn store(
        &self,
        path: &StoragePath,
        mut stream: BoxStream<'_, Result<Bytes, io::Error>>,
        _content_length: Option<u64>,
    ) -> Result<u64, MediaStoreError> {
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk.map_err(MediaStoreError::Io)?);
        }
        let total = data.len() as u64;
        self.store_bytes(path, data).await?;
        Ok(total)
    }

    async fn store_bytes(&self, path: &StoragePath, data: Vec<u8>) -> Result<(), MediaStoreError> {
        self.inner
            .put(&StorePath::from(path.as_str()), PutPayload::from(data))
            .await
            .map(|_| ())
            .map_err(|e| MediaStoreError::UploadFailed(e.to_string()))
    }

    async fn fetch(&self, path: &StoragePath) -> Result<Vec<u8>, MediaStoreError> {
        let result = self
            .inner
            .get(&StorePath::from(path.as_str()))
            .await
            .map_err(|e| MediaStoreError::NotFound(e.to_string()))?;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| MediaStoreError::DownloadFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, path: &StoragePath) -> Result<(), MediaStoreError> {
        self.inner
            .delete(&StorePath::from(path.as_str()))
            .await
            .map_err(|e| MediaStoreError::DeleteFailed(e.to_string()))
    }

    async fn head(&self, path: &StoragePath) -> Result<u64, MediaStoreError> {
        let meta = self
            .inner
            .head(&StorePath::from(path.as_str()))
            .await
            .map_err(|e| MediaStoreError::NotFound(e.to_string()))?;
        Ok(meta.size as u64)
    }
}
