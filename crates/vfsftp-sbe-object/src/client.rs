//! The interface to the object storage client that performs the actual requests.
//!
//! Request signing, transport and HTTP level retries are the client's business. Callers only
//! state how many times an idempotent call may be retried.

use async_trait::async_trait;
use std::{fmt::Debug, time::SystemTime};
use tokio::io::AsyncRead;
use vfsftp_core::storage::Error;

/// A readable object body.
pub type Body = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// A prefix listing request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Only keys starting with this prefix are returned.
    pub prefix: String,
    /// When set, keys containing the delimiter after the prefix are rolled up into common
    /// prefixes.
    pub delimiter: Option<char>,
    /// Continuation token from a previous page.
    pub page_token: Option<String>,
    /// Upper bound on the number of entries in one page.
    pub max_keys: Option<usize>,
}

impl ListRequest {
    /// Lists everything below `prefix`, recursively.
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        ListRequest {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    /// Groups the result one level deep on `delimiter`.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Limits the page size.
    pub fn max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }
}

/// A stored object as reported by a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectSummary {
    /// The full key.
    pub key: String,
    /// Length in bytes.
    pub size: u64,
    /// Last modification time, if the store reports it.
    pub last_modified: Option<SystemTime>,
}

/// One page of a listing, or several pages merged with [`ListResponse::absorb`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListResponse {
    /// The prefix that was queried.
    pub prefix: String,
    /// Keys that did not roll up into a common prefix, in store order.
    pub objects: Vec<ObjectSummary>,
    /// Rolled up prefixes including their trailing delimiter, in store order.
    pub common_prefixes: Vec<String>,
    /// Set when more pages follow.
    pub next_token: Option<String>,
}

impl ListResponse {
    /// An empty response for `prefix`.
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        ListResponse {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    /// Appends the entries of a following page. The continuation token is taken over from it.
    pub fn absorb(&mut self, page: ListResponse) {
        self.objects.extend(page.objects);
        self.common_prefixes.extend(page.common_prefixes);
        self.next_token = page.next_token;
    }

    /// True if the page holds neither objects nor common prefixes.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.common_prefixes.is_empty()
    }
}

/// Object metadata, as returned by a HEAD request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Length in bytes.
    pub size: u64,
    /// Last modification time, if the store reports it.
    pub last_modified: Option<SystemTime>,
}

/// The object storage operations the back-end needs. Implementations report a missing object as
/// [`PermanentFileNotAvailable`](vfsftp_core::storage::ErrorKind::PermanentFileNotAvailable) and
/// throttling or connection trouble as
/// [`TransientFileNotAvailable`](vfsftp_core::storage::ErrorKind::TransientFileNotAvailable).
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    /// Lists one page of keys in `bucket`.
    async fn list(&self, bucket: &str, request: &ListRequest, retries: u32) -> Result<ListResponse, Error>;

    /// Fetches the metadata of one object.
    async fn head(&self, bucket: &str, key: &str, retries: u32) -> Result<ObjectMeta, Error>;

    /// Opens an object for reading.
    async fn get(&self, bucket: &str, key: &str, retries: u32) -> Result<Body, Error>;

    /// Writes a whole object, replacing what was there. Returns the number of bytes stored.
    async fn put(&self, bucket: &str, key: &str, body: Body, retries: u32) -> Result<u64, Error>;

    /// Removes an object.
    async fn delete(&self, bucket: &str, key: &str, retries: u32) -> Result<(), Error>;

    /// Copies an object within `bucket`.
    async fn copy(&self, bucket: &str, from: &str, to: &str, retries: u32) -> Result<(), Error>;
}
