use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BucketError, BucketStore, ObjectLocation};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Bytes,
    content_type: String,
}

/// Process-local store used by tests and dry runs. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBucketStore {
    objects: Arc<Mutex<BTreeMap<ObjectLocation, StoredObject>>>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, location: ObjectLocation, bytes: impl Into<Bytes>, content_type: &str) {
        self.lock().insert(
            location,
            StoredObject {
                bytes: bytes.into(),
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn contents(&self, location: &ObjectLocation) -> Option<Bytes> {
        self.lock().get(location).map(|object| object.bytes.clone())
    }

    pub fn content_type(&self, location: &ObjectLocation) -> Option<String> {
        self.lock()
            .get(location)
            .map(|object| object.content_type.clone())
    }

    pub fn locations(&self) -> Vec<ObjectLocation> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ObjectLocation, StoredObject>> {
        // A poisoned map is still structurally valid.
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn put_object(
        &self,
        location: &ObjectLocation,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        self.insert(location.clone(), bytes, content_type);
        Ok(())
    }

    async fn get_object(&self, location: &ObjectLocation) -> Result<Bytes, BucketError> {
        self.contents(location)
            .ok_or_else(|| BucketError::NotFound(location.clone()))
    }

    async fn exists(&self, location: &ObjectLocation) -> Result<bool, BucketError> {
        Ok(self.lock().contains_key(location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_objects() {
        let store = MemoryBucketStore::new();
        let location = ObjectLocation::new("fishsoop-email", "0028/plot.svg");

        assert!(!store.exists(&location).await.unwrap());
        store
            .put_object(&location, Bytes::from_static(b"<svg/>"), "image/svg+xml")
            .await
            .unwrap();
        assert!(store.exists(&location).await.unwrap());
        assert_eq!(store.get_object(&location).await.unwrap(), "<svg/>");
        assert_eq!(store.content_type(&location).as_deref(), Some("image/svg+xml"));

        let missing = ObjectLocation::new("fishsoop-email", "0028/other.svg");
        assert!(matches!(
            store.get_object(&missing).await,
            Err(BucketError::NotFound(location)) if location == missing
        ));
    }

    #[tokio::test]
    async fn clones_share_contents() {
        let store = MemoryBucketStore::new();
        let handle = store.clone();
        let location = ObjectLocation::new("fishsoop-webstats", "fishsoop-web-stats.html");
        handle.insert(location.clone(), "<html/>", "text/html");
        assert!(store.exists(&location).await.unwrap());
    }
}
