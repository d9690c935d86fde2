use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::{BucketError, BucketStore, MemoryBucketStore, ObjectLocation};

/// Reads through to the wrapped store but keeps every write in memory.
///
/// Used for dry runs: a job sees its own uploads while the real buckets stay untouched.
#[derive(Clone)]
pub struct StagedBucketStore {
    inner: Arc<dyn BucketStore>,
    staged: MemoryBucketStore,
}

impl StagedBucketStore {
    pub fn new(inner: Arc<dyn BucketStore>) -> Self {
        Self {
            inner,
            staged: MemoryBucketStore::new(),
        }
    }

    /// Objects written during the run, none of which reached the wrapped store.
    pub fn staged(&self) -> Vec<ObjectLocation> {
        self.staged.locations()
    }
}

#[async_trait]
impl BucketStore for StagedBucketStore {
    async fn put_object(
        &self,
        location: &ObjectLocation,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        debug!(%location, size = bytes.len(), "staging object instead of uploading");
        self.staged.insert(location.clone(), bytes, content_type);
        Ok(())
    }

    async fn get_object(&self, location: &ObjectLocation) -> Result<Bytes, BucketError> {
        match self.staged.contents(location) {
            Some(bytes) => Ok(bytes),
            None => self.inner.get_object(location).await,
        }
    }

    async fn exists(&self, location: &ObjectLocation) -> Result<bool, BucketError> {
        if self.staged.contents(location).is_some() {
            return Ok(true);
        }
        self.inner.exists(location).await
    }
}
