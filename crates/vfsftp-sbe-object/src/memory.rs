//! An [`ObjectStore`] that keeps everything in memory.

use crate::client::{Body, ListRequest, ListResponse, ObjectMeta, ObjectStore, ObjectSummary};
use async_trait::async_trait;
use bytes::Bytes;
use std::{collections::BTreeMap, io::Cursor, time::SystemTime};
use tokio::{io::AsyncReadExt, sync::RwLock};
use vfsftp_core::storage::{Error, ErrorKind};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    modified: SystemTime,
}

/// Buckets of objects in sorted maps, listed with the same prefix and delimiter semantics as S3
/// and GCS. Retry counts are ignored since nothing here fails transiently.
#[derive(Debug)]
pub struct MemoryObjectStore {
    buckets: RwLock<BTreeMap<String, BTreeMap<String, StoredObject>>>,
    page_size: usize,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        MemoryObjectStore {
            buckets: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl MemoryObjectStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest page a listing returns. Smaller pages make callers paginate.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Stores an object directly.
    pub async fn insert<B: Into<Bytes>>(&self, bucket: &str, key: &str, data: B) {
        let object = StoredObject {
            data: data.into(),
            modified: SystemTime::now(),
        };
        self.buckets.write().await.entry(bucket.to_string()).or_default().insert(key.to_string(), object);
    }

    /// The content of an object, if present.
    pub async fn contents(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets.read().await.get(bucket)?.get(key).map(|o| o.data.clone())
    }

    /// All keys of a bucket, sorted.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets.read().await.get(bucket).map(|b| b.keys().cloned().collect()).unwrap_or_default()
    }
}

fn not_found(bucket: &str, key: &str) -> Error {
    Error::new(ErrorKind::PermanentFileNotAvailable, format!("no object {}/{}", bucket, key))
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, bucket: &str, request: &ListRequest, _retries: u32) -> Result<ListResponse, Error> {
        let limit = request.max_keys.unwrap_or(self.page_size).min(self.page_size).max(1);
        let mut response = ListResponse::new(request.prefix.as_str());
        let buckets = self.buckets.read().await;
        let Some(objects) = buckets.get(bucket) else {
            return Ok(response);
        };

        let mut count = 0;
        let mut last_marker: Option<String> = None;
        for (key, object) in objects.range(request.prefix.clone()..) {
            if !key.starts_with(&request.prefix) {
                break;
            }
            let rest = &key[request.prefix.len()..];
            let common = request
                .delimiter
                .and_then(|d| rest.find(d).map(|i| &key[..request.prefix.len() + i + d.len_utf8()]));
            // Each entry is identified by the common prefix it rolls up into, or by its own key.
            let marker = common.unwrap_or(key.as_str());
            if request.page_token.as_deref().is_some_and(|token| marker <= token) {
                continue;
            }
            if common.is_some() && last_marker.as_deref() == Some(marker) {
                continue;
            }
            if count == limit {
                response.next_token = last_marker;
                break;
            }
            match common {
                Some(prefix) => response.common_prefixes.push(prefix.to_string()),
                None => response.objects.push(ObjectSummary {
                    key: key.clone(),
                    size: object.data.len() as u64,
                    last_modified: Some(object.modified),
                }),
            }
            last_marker = Some(marker.to_string());
            count += 1;
        }
        Ok(response)
    }

    async fn head(&self, bucket: &str, key: &str, _retries: u32) -> Result<ObjectMeta, Error> {
        let buckets = self.buckets.read().await;
        let object = buckets.get(bucket).and_then(|b| b.get(key)).ok_or_else(|| not_found(bucket, key))?;
        Ok(ObjectMeta {
            size: object.data.len() as u64,
            last_modified: Some(object.modified),
        })
    }

    async fn get(&self, bucket: &str, key: &str, _retries: u32) -> Result<Body, Error> {
        let data = self.contents(bucket, key).await.ok_or_else(|| not_found(bucket, key))?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn put(&self, bucket: &str, key: &str, mut body: Body, _retries: u32) -> Result<u64, Error> {
        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;
        let len = data.len() as u64;
        self.insert(bucket, key, data).await;
        Ok(len)
    }

    async fn delete(&self, bucket: &str, key: &str, _retries: u32) -> Result<(), Error> {
        let mut buckets = self.buckets.write().await;
        match buckets.get_mut(bucket).and_then(|b| b.remove(key)) {
            Some(_) => Ok(()),
            None => Err(not_found(bucket, key)),
        }
    }

    async fn copy(&self, bucket: &str, from: &str, to: &str, _retries: u32) -> Result<(), Error> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets.get_mut(bucket).ok_or_else(|| not_found(bucket, from))?;
        let object = objects.get(from).cloned().ok_or_else(|| not_found(bucket, from))?;
        objects.insert(
            to.to_string(),
            StoredObject {
                modified: SystemTime::now(),
                ..object
            },
        );
        Ok(())
    }
}
