//! The object-store collaborator consumed by the sync pipeline.

use std::io::Read;

use crate::error::StoreError;

/// Streamed object body returned by [`ObjectStore::get_object`].
pub type ObjectReader = Box<dyn Read + Send + 'static>;

/// One `{key, content tag}` pair from a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    /// Raw tag as reported by the store; may still carry wrapping quotes.
    pub etag: String,
}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<ObjectSummary>,
    /// Token for the next page; `None` once the listing is exhausted.
    pub next_continuation: Option<String>,
}

/// Blocking access to a key/value object store.
///
/// Implementations hold no per-run state: every call is independent, so one
/// store value can serve concurrent pipeline runs with different configs.
pub trait ObjectStore: Send + Sync {
    /// `Ok(false)` when the store reports the bucket as absent.
    fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError>;

    fn create_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    /// Fetch one listing page, starting after `continuation` when given.
    fn list_page(&self, bucket: &str, continuation: Option<&str>)
        -> Result<ListPage, StoreError>;

    fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError>;

    /// Stream `length` bytes from `body` under `key`, returning the content
    /// tag the store assigned. The body is never buffered whole.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &mut dyn Read,
        length: u64,
    ) -> Result<String, StoreError>;

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        (**self).bucket_exists(bucket)
    }

    fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        (**self).create_bucket(bucket)
    }

    fn list_page(
        &self,
        bucket: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        (**self).list_page(bucket, continuation)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError> {
        (**self).get_object(bucket, key)
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &mut dyn Read,
        length: u64,
    ) -> Result<String, StoreError> {
        (**self).put_object(bucket, key, body, length)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        (**self).delete_object(bucket, key)
    }
}
