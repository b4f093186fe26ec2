//! A [`KvStore`] kept in process memory.

use crate::store::KvStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;
use vfsftp_core::storage::{Error, ErrorKind};

#[derive(Clone, Debug)]
enum Value {
    String(Bytes),
    Set(BTreeSet<String>),
}

fn wrong_type(key: &str) -> Error {
    Error::new(ErrorKind::LocalError, format!("WRONGTYPE operation against {}", key))
}

/// An in-memory [`KvStore`] with Redis semantics for the commands it offers.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemoryKvStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, Error> {
        match self.values.read().await.get(key) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(Value::Set(_)) => Err(wrong_type(key)),
        }
    }

    async fn strlen(&self, key: &str) -> Result<Option<u64>, Error> {
        Ok(self.get(key).await?.map(|value| value.len() as u64))
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), Error> {
        self.values.write().await.insert(key.to_string(), Value::String(value));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, Error> {
        Ok(self.values.write().await.remove(key).is_some())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), Error> {
        let mut values = self.values.write().await;
        let value = values
            .remove(from)
            .ok_or_else(|| Error::new(ErrorKind::PermanentFileNotAvailable, format!("no such key {}", from)))?;
        values.insert(to.to_string(), value);
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>, Error> {
        let values = self.values.read().await;
        Ok(values
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, Error> {
        match self.values.read().await.get(key) {
            None => Ok(vec![]),
            Some(Value::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(Value::String(_)) => Err(wrong_type(key)),
        }
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, Error> {
        match self.values.read().await.get(key) {
            None => Ok(false),
            Some(Value::Set(members)) => Ok(members.contains(member)),
            Some(Value::String(_)) => Err(wrong_type(key)),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, Error> {
        let mut values = self.values.write().await;
        match values.entry(key.to_string()).or_insert_with(|| Value::Set(BTreeSet::new())) {
            Value::Set(members) => Ok(members.insert(member.to_string())),
            Value::String(_) => Err(wrong_type(key)),
        }
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, Error> {
        let mut values = self.values.write().await;
        let (removed, now_empty) = match values.get_mut(key) {
            None => return Ok(false),
            Some(Value::Set(members)) => (members.remove(member), members.is_empty()),
            Some(Value::String(_)) => return Err(wrong_type(key)),
        };
        if now_empty {
            values.remove(key);
        }
        Ok(removed)
    }
}
