//! In-memory object store.
//!
//! Behaves like a single-part-upload S3 bucket: the content tag of an object
//! is the quoted MD5 of its body. Listing is paginated with a configurable
//! page size so callers exercise continuation handling. Faults can be
//! injected per operation and key, and every mutating or reading call is
//! recorded for later inspection.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bucketsync_core::fingerprint_bytes;

use crate::error::StoreError;
use crate::store::{ListPage, ObjectReader, ObjectStore, ObjectSummary};

const DEFAULT_PAGE_SIZE: usize = 1000;

/// An operation to fail on purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    BucketExists,
    CreateBucket,
    /// Fail the listing page requested with this continuation token
    /// (`None` = the first page).
    List(Option<String>),
    Get(String),
    Put(String),
    Delete(String),
}

/// A call observed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateBucket(String),
    List { bucket: String },
    Get { bucket: String, key: String },
    Put { bucket: String, key: String },
    Delete { bucket: String, key: String },
}

#[derive(Debug, Default)]
struct Inner {
    buckets: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    faults: Vec<Fault>,
    log: Vec<Operation>,
}

/// Thread-safe in-memory [`ObjectStore`].
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Listing pages hold at most `page_size` objects (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Create an empty bucket, keeping it intact if it already exists.
    pub fn with_bucket(self, bucket: &str) -> Self {
        self.lock().buckets.entry(bucket.to_string()).or_default();
        self
    }

    /// Place an object directly, bypassing fault injection and the call log.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.lock()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock().buckets.get(bucket)?.get(key).cloned()
    }

    /// Sorted keys of `bucket`; empty if the bucket does not exist.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.lock().buckets.contains_key(bucket)
    }

    /// Make every future matching call fail with [`StoreError::Injected`].
    pub fn fail_on(&self, fault: Fault) {
        self.lock().faults.push(fault);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Every recorded call, oldest first.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().log.clone()
    }

    /// Forget recorded calls.
    pub fn clear_operations(&self) {
        self.lock().log.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn check(&self, fault: &Fault) -> Result<(), StoreError> {
        if self.faults.contains(fault) {
            return Err(StoreError::Injected(format!("{fault:?}")));
        }
        Ok(())
    }

    fn bucket_mut(&mut self, bucket: &str) -> Result<&mut BTreeMap<String, Vec<u8>>, StoreError> {
        self.buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))
    }
}

fn etag_of(body: &[u8]) -> String {
    format!("\"{}\"", fingerprint_bytes(body))
}

impl ObjectStore for MemoryStore {
    fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        let inner = self.lock();
        inner.check(&Fault::BucketExists)?;
        Ok(inner.buckets.contains_key(bucket))
    }

    fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check(&Fault::CreateBucket)?;
        inner.log.push(Operation::CreateBucket(bucket.to_string()));
        inner.buckets.entry(bucket.to_string()).or_default();
        Ok(())
    }

    fn list_page(
        &self,
        bucket: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let mut inner = self.lock();
        inner.check(&Fault::List(continuation.map(str::to_owned)))?;
        inner.log.push(Operation::List {
            bucket: bucket.to_string(),
        });
        let objects = inner.bucket_mut(bucket)?;

        let mut page: Vec<ObjectSummary> = objects
            .iter()
            .filter(|(key, _)| continuation.map_or(true, |after| key.as_str() > after))
            .take(self.page_size + 1)
            .map(|(key, body)| ObjectSummary {
                key: key.clone(),
                etag: etag_of(body),
            })
            .collect();

        let next_continuation = if page.len() > self.page_size {
            page.truncate(self.page_size);
            page.last().map(|last| last.key.clone())
        } else {
            None
        };
        Ok(ListPage {
            objects: page,
            next_continuation,
        })
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError> {
        let mut inner = self.lock();
        inner.check(&Fault::Get(key.to_string()))?;
        inner.log.push(Operation::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        let body = inner
            .bucket_mut(bucket)?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        Ok(Box::new(Cursor::new(body)))
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &mut dyn Read,
        length: u64,
    ) -> Result<String, StoreError> {
        let mut inner = self.lock();
        inner.check(&Fault::Put(key.to_string()))?;
        inner.log.push(Operation::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        let objects = inner.bucket_mut(bucket)?;

        let mut stored = Vec::new();
        Read::take(body, length).read_to_end(&mut stored)?;
        if stored.len() as u64 != length {
            return Err(StoreError::Protocol(format!(
                "body for '{key}' ended after {} of {length} byte(s)",
                stored.len()
            )));
        }
        let tag = etag_of(&stored);
        objects.insert(key.to_string(), stored);
        Ok(tag)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check(&Fault::Delete(key.to_string()))?;
        inner.log.push(Operation::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        // Deleting an absent key succeeds, as it does on S3.
        inner.bucket_mut(bucket)?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn put_returns_quoted_md5_etag() {
        let store = MemoryStore::new().with_bucket("b");
        let tag = store.put_object("b", "a.txt", &mut &b"x"[..], 1).unwrap();
        assert_eq!(tag, "\"9dd4e461268c8034f5c8564e155c67a6\"");
    }

    #[test]
    fn put_reads_exactly_the_declared_length() {
        let store = MemoryStore::new().with_bucket("b");
        store.put_object("b", "k", &mut &b"abcdef"[..], 3).unwrap();
        assert_eq!(store.object("b", "k").unwrap(), b"abc");

        let err = store.put_object("b", "short", &mut &b"ab"[..], 5).unwrap_err();
        assert!(matches!(err, StoreError::Protocol(_)), "got: {err}");
        assert!(store.object("b", "short").is_none());
    }

    #[test]
    fn get_streams_stored_bytes() {
        let store = MemoryStore::new();
        store.insert("b", "k", "hello");
        let mut body = String::new();
        store
            .get_object("b", "k")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "hello");
    }

    #[test]
    fn missing_bucket_and_key_errors() {
        let store = MemoryStore::new().with_bucket("b");
        assert!(matches!(
            store.list_page("nope", None),
            Err(StoreError::NoSuchBucket(_))
        ));
        assert!(matches!(
            store.get_object("b", "nope"),
            Err(StoreError::NoSuchKey { .. })
        ));
    }

    #[test]
    fn listing_pages_until_exhausted() {
        let store = MemoryStore::new().with_page_size(2);
        for key in ["a", "b", "c", "d", "e"] {
            store.insert("b", key, key);
        }

        let mut seen = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0;
        loop {
            let page = store.list_page("b", token.as_deref()).unwrap();
            pages += 1;
            seen.extend(page.objects.into_iter().map(|o| o.key));
            match page.next_continuation {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(pages, 3);
    }

    #[test]
    fn exact_multiple_of_page_size_has_no_empty_trailing_page() {
        let store = MemoryStore::new().with_page_size(2);
        store.insert("b", "a", "1");
        store.insert("b", "b", "2");
        let page = store.list_page("b", None).unwrap();
        assert_eq!(page.objects.len(), 2);
        assert!(page.next_continuation.is_none());
    }

    #[test]
    fn injected_faults_fail_only_the_named_key() {
        let store = MemoryStore::new().with_bucket("b");
        store.fail_on(Fault::Put("bad".into()));
        assert!(matches!(
            store.put_object("b", "bad", &mut &b"1"[..], 1),
            Err(StoreError::Injected(_))
        ));
        assert!(store.put_object("b", "good", &mut &b"1"[..], 1).is_ok());
        store.clear_faults();
        assert!(store.put_object("b", "bad", &mut &b"1"[..], 1).is_ok());
    }

    #[test]
    fn operations_are_recorded_in_order() {
        let store = MemoryStore::new().with_bucket("b");
        store.put_object("b", "k", &mut &b"v"[..], 1).unwrap();
        store.delete_object("b", "k").unwrap();
        assert_eq!(
            store.operations(),
            vec![
                Operation::Put {
                    bucket: "b".into(),
                    key: "k".into()
                },
                Operation::Delete {
                    bucket: "b".into(),
                    key: "k".into()
                },
            ]
        );
    }
}
