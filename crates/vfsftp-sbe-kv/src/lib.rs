//! A storage back-end for vfsftp that keeps a whole directory tree in a key/value store such as
//! Redis.
//!
//! Two key families make up the tree:
//!
//! - `data:/<path>` holds the bytes of the file at `<path>`.
//! - `dir:/<path>` is a set naming the children of the directory at `<path>`. Subdirectories are
//!   listed with a trailing `/`.
//!
//! The sets are the directory index: a path exists when its parent's set names it, whatever the
//! data keys say. Every mutation changes a value and an index entry together and undoes the first
//! change when the second one fails.
//!
//! Standard users live below `/<username>`, which always exists. Administrators see the whole tree.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vfsftp_sbe_kv::{KvStorage, MemoryKvStore};
//!
//! let storage = KvStorage::new(Arc::new(MemoryKvStore::new())).prefix("ftp:");
//! ```

pub mod memory;
pub mod options;
pub mod store;

pub use memory::MemoryKvStore;
pub use store::KvStore;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use options::Options;
use std::{fmt::Debug, io::Cursor, path::Path, sync::Arc};
use tokio::io::AsyncReadExt;
use vfsftp_core::{
    auth::{CredentialSource, User},
    storage::{DirEntry, Error, ErrorKind, FanOut, Result, StorageBackend, with_pseudo_dirs},
    vfs::{self, DELIMITER, Namespace, ScopedKey, Segment, Shape, ShapeTable},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    File,
    Dir,
}

fn dir_member(name: &str) -> String {
    format!("{}{}", name, DELIMITER)
}

// The parent directory and the name under which a key is indexed.
fn entry(key: &ScopedKey) -> Result<(ScopedKey, String)> {
    match (key.parent(), key.file_name()) {
        (Some(parent), Some(name)) => Ok((parent, name.to_string())),
        _ => Err(Error::new(ErrorKind::PermissionDenied, "the root has no parent")),
    }
}

fn is_home(user: &User, key: &ScopedKey) -> bool {
    match Namespace::of(user) {
        Namespace::Own(name) => key.as_str() == name,
        Namespace::Global => key.is_root(),
    }
}

/// A [`StorageBackend`] that emulates a directory tree in a [`KvStore`]. It always accepts
/// mutations.
#[derive(Clone, Debug)]
pub struct KvStorage {
    store: Arc<dyn KvStore>,
    options: Options,
    shapes: ShapeTable<()>,
    logger: slog::Logger,
}

impl KvStorage {
    /// Creates a back-end on `store` with default options.
    pub fn new<S: KvStore + 'static>(store: Arc<S>) -> Self {
        Self::with_options(store, Options::default())
    }

    /// Creates a back-end with the given options.
    pub fn with_options<S: KvStore + 'static>(store: Arc<S>, options: Options) -> Self {
        let shapes = ShapeTable::new()
            .shape(Shape::new(vec![]), ())
            .shape(Shape::new(vec![Segment::Namespace]).with_subtree(), ());
        KvStorage {
            store,
            options,
            shapes,
            logger: slog::Logger::root(slog::Discard, slog::o!()),
        }
    }

    /// Sets the logger.
    pub fn logger(mut self, logger: slog::Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Sets the prefix put in front of every key.
    pub fn prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.options.prefix = prefix.into();
        self
    }

    /// Sets how many store requests listings and directory removals keep in flight.
    pub fn fan_out<F: Into<FanOut>>(mut self, fan_out: F) -> Self {
        self.options.fan_out = fan_out.into();
        self
    }

    fn data_key(&self, key: &ScopedKey) -> String {
        format!("{}data:/{}", self.options.prefix, key)
    }

    fn dir_key(&self, key: &ScopedKey) -> String {
        format!("{}dir:/{}", self.options.prefix, key)
    }

    fn scope<P: AsRef<Path>>(&self, user: &User, path: P) -> Result<ScopedKey> {
        let key = vfs::scope(path, user)?;
        if self.shapes.classify(&key, &Namespace::of(user)).is_none() {
            slog::debug!(self.logger, "Rejected path outside the user's namespace"; "username" => user.username(), "key" => key.as_str());
            return Err(Error::new(ErrorKind::PermissionDenied, format!("{} is not served", key)));
        }
        Ok(key)
    }

    async fn kind_of(&self, user: &User, key: &ScopedKey) -> Result<Option<Kind>> {
        if is_home(user, key) {
            return Ok(Some(Kind::Dir));
        }
        let (parent, name) = entry(key)?;
        let index = self.dir_key(&parent);
        if self.store.sismember(&index, &name).await? {
            Ok(Some(Kind::File))
        } else if self.store.sismember(&index, &dir_member(&name)).await? {
            Ok(Some(Kind::Dir))
        } else {
            Ok(None)
        }
    }

    async fn require_dir(&self, user: &User, key: &ScopedKey) -> Result<()> {
        match self.kind_of(user, key).await? {
            Some(Kind::Dir) => Ok(()),
            _ => Err(Error::new(ErrorKind::PermanentDirectoryNotAvailable, format!("no directory {}", key))),
        }
    }

    // Fails for the parent of `key` missing or `key` already taken.
    async fn require_vacancy(&self, user: &User, key: &ScopedKey, parent: &ScopedKey) -> Result<()> {
        self.require_dir(user, parent).await?;
        match self.kind_of(user, key).await? {
            None => Ok(()),
            Some(_) => Err(Error::new(ErrorKind::PermissionDenied, format!("{} already exists", key))),
        }
    }

    // Lists a standard user's home in the root set so administrators find it.
    async fn register_home(&self, user: &User) -> Result<()> {
        if let Namespace::Own(name) = Namespace::of(user) {
            self.store.sadd(&self.dir_key(&ScopedKey::default()), &dir_member(&name)).await?;
        }
        Ok(())
    }

    // Removes the value and the index entry of a file. With `indexed_only`, a file its directory
    // does not name is reported missing and its value is left alone.
    async fn unlink(&self, parent: &ScopedKey, name: &str, indexed_only: bool) -> Result<()> {
        let index = self.dir_key(parent);
        let was_indexed = self.store.srem(&index, name).await?;
        if !was_indexed && indexed_only {
            return Err(Error::new(ErrorKind::PermanentFileNotAvailable, format!("no file {}", parent.join(name))));
        }
        if let Err(e) = self.store.del(&self.data_key(&parent.join(name))).await {
            if was_indexed {
                if let Err(undo) = self.store.sadd(&index, name).await {
                    slog::error!(self.logger, "Index entry lost"; "dir" => parent.as_str(), "name" => name, "error" => %undo);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    // Every key of one family at or below `family_key`.
    async fn subtree(&self, family_key: &str) -> Result<Vec<String>> {
        let below = format!("{}{}", family_key, DELIMITER);
        Ok(self
            .store
            .scan(family_key)
            .await?
            .into_iter()
            .filter(|k| k == family_key || k.starts_with(&below))
            .collect())
    }

    async fn undo_renames(&self, done: &[(String, String)]) {
        for (old, new) in done.iter().rev() {
            if let Err(e) = self.store.rename(new, old).await {
                slog::error!(self.logger, "Could not undo rename"; "from" => new, "to" => old, "error" => %e);
            }
        }
    }

    // Renames every pair in order. On failure the finished ones are reversed.
    async fn rename_all(&self, moves: &[(String, String)]) -> Result<()> {
        for (i, (old, new)) in moves.iter().enumerate() {
            if let Err(e) = self.store.rename(old, new).await {
                self.undo_renames(&moves[..i]).await;
                return Err(e);
            }
        }
        Ok(())
    }

    // Moves the index entry once the values are in place, reversing the value moves on failure.
    async fn reindex(&self, from: (&ScopedKey, &str), to: (&ScopedKey, &str), moves: &[(String, String)]) -> Result<()> {
        let (from_index, to_index) = (self.dir_key(from.0), self.dir_key(to.0));
        if let Err(e) = self.store.sadd(&to_index, to.1).await {
            self.undo_renames(moves).await;
            return Err(e);
        }
        if let Err(e) = self.store.srem(&from_index, from.1).await {
            if let Err(undo) = self.store.srem(&to_index, to.1).await {
                slog::error!(self.logger, "Index entry left behind"; "dir" => to.0.as_str(), "name" => to.1, "error" => %undo);
            }
            self.undo_renames(moves).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for KvStorage {
    fn name(&self) -> &str {
        "kv"
    }

    #[tracing_attributes::instrument]
    async fn cwd<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()> {
        let key = self.scope(user, path)?;
        self.require_dir(user, &key).await
    }

    #[tracing_attributes::instrument]
    async fn list<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<Vec<DirEntry>> {
        let key = self.scope(user, path)?;
        self.require_dir(user, &key).await?;
        let members = self.store.smembers(&self.dir_key(&key)).await?;
        let (dirs, files): (Vec<String>, Vec<String>) = members.into_iter().partition(|m| m.ends_with(DELIMITER));

        let dir = &key;
        let sized: Vec<(String, Option<u64>)> = stream::iter(files)
            .map(|name| async move {
                let size = self.store.strlen(&self.data_key(&dir.join(&name))).await;
                size.map(|size| (name, size))
            })
            .buffered(self.options.fan_out.get())
            .collect::<Vec<Result<_>>>()
            .await
            .into_iter()
            .collect::<Result<_>>()?;
        // The index decides what exists. A value gone missing shows as an empty file.
        let files = sized.into_iter().map(|(name, size)| {
            if size.is_none() {
                slog::warn!(self.logger, "Indexed file has no value"; "dir" => key.as_str(), "name" => &name);
            }
            DirEntry::file(name, size.unwrap_or(0))
        });
        let dirs = dirs.into_iter().map(|m| DirEntry::dir(m.trim_end_matches(DELIMITER)));
        Ok(with_pseudo_dirs(dirs, files.collect::<Vec<_>>()))
    }

    #[tracing_attributes::instrument]
    async fn size<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<u64> {
        let key = self.scope(user, path)?;
        if is_home(user, &key) {
            return Err(Error::new(ErrorKind::PermanentFileNotAvailable, "the root is a directory"));
        }
        self.store
            .strlen(&self.data_key(&key))
            .await?
            .ok_or_else(|| Error::new(ErrorKind::PermanentFileNotAvailable, format!("no file {}", key)))
    }

    #[tracing_attributes::instrument]
    async fn get<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<Box<dyn tokio::io::AsyncRead + Send + Sync + Unpin>> {
        let key = self.scope(user, path)?;
        if is_home(user, &key) {
            return Err(Error::new(ErrorKind::PermanentFileNotAvailable, "the root is a directory"));
        }
        match self.store.get(&self.data_key(&key)).await? {
            Some(value) => Ok(Box::new(Cursor::new(value))),
            None => Err(Error::new(ErrorKind::PermanentFileNotAvailable, format!("no file {}", key))),
        }
    }

    #[tracing_attributes::instrument(skip(input))]
    async fn put<P: AsRef<Path> + Send + Debug, R: tokio::io::AsyncRead + Send + Sync + Unpin + 'static>(
        &self,
        user: &User,
        input: R,
        path: P,
    ) -> Result<u64> {
        let key = self.scope(user, path)?;
        if is_home(user, &key) {
            return Err(Error::new(ErrorKind::PermissionDenied, "the root is a directory"));
        }
        let (parent, name) = entry(&key)?;
        self.require_dir(user, &parent).await?;
        if self.kind_of(user, &key).await? == Some(Kind::Dir) {
            return Err(Error::new(ErrorKind::PermissionDenied, format!("{} is a directory", key)));
        }
        self.register_home(user).await?;

        let mut input = input;
        let mut buf = Vec::new();
        input.read_to_end(&mut buf).await?;
        let len = buf.len() as u64;

        let data_key = self.data_key(&key);
        let previous = self.store.get(&data_key).await?;
        self.store.set(&data_key, Bytes::from(buf)).await?;
        if let Err(e) = self.store.sadd(&self.dir_key(&parent), &name).await {
            let undo = match previous {
                Some(value) => self.store.set(&data_key, value).await,
                None => self.store.del(&data_key).await.map(|_| ()),
            };
            if let Err(undo) = undo {
                slog::error!(self.logger, "Unindexed value left behind"; "key" => &data_key, "error" => %undo);
            }
            return Err(e);
        }
        Ok(len)
    }

    #[tracing_attributes::instrument]
    async fn del<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()> {
        let key = self.scope(user, path)?;
        if is_home(user, &key) {
            return Err(Error::new(ErrorKind::PermissionDenied, "the root is a directory"));
        }
        let (parent, name) = entry(&key)?;
        self.unlink(&parent, &name, true).await
    }

    #[tracing_attributes::instrument]
    async fn rmd<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()> {
        let key = self.scope(user, path)?;
        if is_home(user, &key) {
            return Err(Error::new(ErrorKind::PermissionDenied, "the root cannot be removed"));
        }
        let (parent, name) = entry(&key)?;
        self.require_dir(user, &key).await?;

        let data_family = self.data_key(&ScopedKey::default());
        let files: Vec<ScopedKey> = self
            .subtree(&self.data_key(&key))
            .await?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&data_family).map(ScopedKey::new))
            .collect();
        let total = files.len();
        let results: Vec<Result<()>> = stream::iter(files)
            .map(|file| async move {
                let (dir, name) = entry(&file)?;
                self.unlink(&dir, &name, false).await
            })
            .buffer_unordered(self.options.fan_out.get())
            .collect()
            .await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        if let Some(e) = results.into_iter().find_map(|r| r.err()) {
            slog::warn!(self.logger, "Directory only partially removed"; "key" => key.as_str(), "failed" => failed, "total" => total);
            return Err(e);
        }

        // Deepest sets first, so every step leaves a consistent tree.
        let mut dirs = self.subtree(&self.dir_key(&key)).await?;
        dirs.sort_by_key(|k| std::cmp::Reverse(k.matches(DELIMITER).count()));
        for dir in &dirs {
            self.store.del(dir).await?;
        }
        self.store.srem(&self.dir_key(&parent), &dir_member(&name)).await?;
        Ok(())
    }

    #[tracing_attributes::instrument]
    async fn rename<P: AsRef<Path> + Send + Debug>(&self, user: &User, from: P, to: P) -> Result<()> {
        let from = self.scope(user, from)?;
        let to = self.scope(user, to)?;
        if is_home(user, &from) || is_home(user, &to) {
            return Err(Error::new(ErrorKind::PermissionDenied, "the root cannot be moved"));
        }
        let (from_parent, from_name) = entry(&from)?;
        let (to_parent, to_name) = entry(&to)?;
        let kind = self
            .kind_of(user, &from)
            .await?
            .ok_or_else(|| Error::new(ErrorKind::PermanentFileNotAvailable, format!("no such file or directory {}", from)))?;
        if from == to {
            return Ok(());
        }
        if from.contains(&to) {
            return Err(Error::new(ErrorKind::PermissionDenied, format!("cannot move {} into itself", from)));
        }
        self.require_vacancy(user, &to, &to_parent).await?;
        self.register_home(user).await?;

        match kind {
            Kind::File => {
                let moves = [(self.data_key(&from), self.data_key(&to))];
                self.rename_all(&moves).await?;
                self.reindex((&from_parent, &from_name), (&to_parent, &to_name), &moves).await
            }
            Kind::Dir => {
                let mut moves = Vec::new();
                for (old_root, new_root) in [(self.data_key(&from), self.data_key(&to)), (self.dir_key(&from), self.dir_key(&to))] {
                    for old in self.subtree(&old_root).await? {
                        let new = format!("{}{}", new_root, &old[old_root.len()..]);
                        moves.push((old, new));
                    }
                }
                self.rename_all(&moves).await?;
                self.reindex((&from_parent, &dir_member(&from_name)), (&to_parent, &dir_member(&to_name)), &moves)
                    .await
            }
        }
    }

    #[tracing_attributes::instrument]
    async fn mkd<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()> {
        let key = self.scope(user, path)?;
        if is_home(user, &key) {
            return Err(Error::new(ErrorKind::PermissionDenied, "the root already exists"));
        }
        let (parent, name) = entry(&key)?;
        self.require_vacancy(user, &key, &parent).await?;
        self.register_home(user).await?;
        self.store.sadd(&self.dir_key(&parent), &dir_member(&name)).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialSource for KvStorage {
    async fn credential_table(&self) -> Result<Vec<u8>> {
        let key = format!("{}{}", self.options.prefix, self.options.passwd_key);
        match self.store.get(&key).await? {
            Some(value) => Ok(value.to_vec()),
            None => Err(Error::new(ErrorKind::PermanentFileNotAvailable, "no credential table")),
        }
    }
}
