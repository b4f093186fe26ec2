//! The key/value store client interface, modelled on the Redis commands the back-end uses.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;
use vfsftp_core::storage::Error;

/// A key/value store with string and set values.
///
/// As in Redis, a set that loses its last member ceases to exist, and set commands on a missing
/// key behave as if the set were empty.
#[async_trait]
pub trait KvStore: Send + Sync + Debug {
    /// The string value at `key`.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, Error>;

    /// The length of the string value at `key`.
    async fn strlen(&self, key: &str) -> Result<Option<u64>, Error>;

    /// Stores a string value, replacing whatever was at `key`.
    async fn set(&self, key: &str, value: Bytes) -> Result<(), Error>;

    /// Removes `key`. Returns whether it existed.
    async fn del(&self, key: &str) -> Result<bool, Error>;

    /// Renames `from` to `to`, replacing any value at `to`. Fails if `from` does not exist.
    async fn rename(&self, from: &str, to: &str) -> Result<(), Error>;

    /// All keys starting with `prefix`, sorted.
    async fn scan(&self, prefix: &str) -> Result<Vec<String>, Error>;

    /// The members of the set at `key`, sorted.
    async fn smembers(&self, key: &str) -> Result<Vec<String>, Error>;

    /// Whether `member` is in the set at `key`.
    async fn sismember(&self, key: &str, member: &str) -> Result<bool, Error>;

    /// Adds `member` to the set at `key`. Returns whether it was new.
    async fn sadd(&self, key: &str, member: &str) -> Result<bool, Error>;

    /// Removes `member` from the set at `key`. Returns whether it was present.
    async fn srem(&self, key: &str, member: &str) -> Result<bool, Error>;
}
