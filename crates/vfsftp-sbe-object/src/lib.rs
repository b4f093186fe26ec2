//! A storage back-end for vfsftp that serves per-user publication directories out of a prefix
//! addressed object store (S3, GCS and the like).
//!
//! The bucket is laid out as `<user>/<store>/...`. Every store directory holds the data files
//! (by default `publish_data.csv`), a manifest (`publish_images.csv`) and an `image` directory
//! whose contents are not stored under the store at all: the manifest maps each image name to the
//! bucket and key holding its bytes. What a client may address is fixed:
//!
//! | Virtual path (relative to the user root) | What it is |
//! |---|---|
//! | `/` | the user's namespace root, listing the stores |
//! | `/<store>` | a store, listing the data files and the image directory |
//! | `/<store>/<data file>` | a data file, read (and written in read-write mode) directly |
//! | `/<store>/image`, `/<store>/image/*` | the image directory, listed from the manifest |
//! | `/<store>/image/<name>` | an image, resolved through the manifest (read only) |
//!
//! Administrators see every namespace: their root lists nothing, `/<user>` is a user's root.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vfsftp_core::auth::PasswdAuthenticator;
//! use vfsftp_core::storage::AccessMode;
//! use vfsftp_sbe_object::{MemoryObjectStore, ObjectStorage};
//!
//! let storage = Arc::new(ObjectStorage::new(Arc::new(MemoryObjectStore::new()), "publications").access(AccessMode::ReadWrite));
//! let authenticator = PasswdAuthenticator::new(storage.clone());
//! ```

pub mod client;
pub mod listing;
pub mod manifest;
pub mod memory;
pub mod options;

pub use client::ObjectStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use client::{Body, ListRequest, ListResponse};
use futures::{StreamExt, TryStreamExt, future, stream};
use manifest::{Manifest, ManifestRecord};
use options::{FanOut, GET_RETRIES, HEAD_RETRIES, LIST_RETRIES, Options, WRITE_RETRIES};
use std::{fmt::Debug, io::SeekFrom, path::Path, sync::Arc};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use vfsftp_core::{
    auth::{CredentialSource, User},
    storage::{AccessMode, DirEntry, Error, ErrorKind, Result, StorageBackend, with_pseudo_dirs},
    vfs::{self, DELIMITER, Namespace, ScopedKey, Segment, Shape, ShapeTable},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Place {
    StoreRoot,
    NamespaceRoot,
    Store,
    ImageDir,
    ImageGlob,
    DataFile,
    ImageFile,
}

fn places(options: &Options) -> ShapeTable<Place> {
    let image = || Segment::Literal(options.image_dir.clone());
    let mut table = ShapeTable::new()
        .shape(Shape::new(vec![]), Place::StoreRoot)
        .shape(Shape::new(vec![Segment::Namespace]), Place::NamespaceRoot)
        .shape(Shape::new(vec![Segment::Namespace, Segment::Any]), Place::Store)
        .shape(Shape::new(vec![Segment::Namespace, Segment::Any, image()]), Place::ImageDir)
        .shape(
            Shape::new(vec![Segment::Namespace, Segment::Any, image(), Segment::Literal("*".to_string())]),
            Place::ImageGlob,
        )
        .shape(Shape::new(vec![Segment::Namespace, Segment::Any, image(), Segment::Any]), Place::ImageFile);
    for name in &options.data_files {
        table = table.shape(Shape::new(vec![Segment::Namespace, Segment::Any, Segment::Literal(name.clone())]), Place::DataFile);
    }
    table
}

// The `<ns>/<store>` part of a key below a store.
fn store_dir(key: &ScopedKey) -> ScopedKey {
    ScopedKey::new(key.segments().take(2).collect::<Vec<_>>().join("/"))
}

fn dir_prefix(key: &ScopedKey) -> Result<String> {
    key.dir_prefix().ok_or_else(|| Error::from(ErrorKind::PermanentDirectoryNotAvailable))
}

fn is_missing(e: &Error) -> bool {
    e.kind() == ErrorKind::PermanentFileNotAvailable
}

/// A [`StorageBackend`] projecting an [`ObjectStore`] bucket onto per-user store directories.
#[derive(Clone, Debug)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    options: Options,
    places: ShapeTable<Place>,
    logger: slog::Logger,
}

impl ObjectStorage {
    /// Creates a read-only back-end serving `bucket` through `store`, with default options.
    pub fn new<S, B>(store: Arc<S>, bucket: B) -> Self
    where
        S: ObjectStore + 'static,
        B: Into<String>,
    {
        Self::with_options(store, bucket, Options::default())
    }

    /// Creates a back-end with the given options.
    pub fn with_options<S, B>(store: Arc<S>, bucket: B, options: Options) -> Self
    where
        S: ObjectStore + 'static,
        B: Into<String>,
    {
        ObjectStorage {
            store,
            bucket: bucket.into(),
            places: places(&options),
            options,
            logger: slog::Logger::root(slog::Discard, slog::o!()),
        }
    }

    /// Sets the logger.
    pub fn logger(mut self, logger: slog::Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Enables or disables mutations.
    pub fn access<M: Into<AccessMode>>(mut self, mode: M) -> Self {
        self.options.access_mode = mode.into();
        self
    }

    /// Sets the name of the manifest driven directory.
    pub fn image_dir<S: Into<String>>(mut self, name: S) -> Self {
        self.options.image_dir = name.into();
        self.places = places(&self.options);
        self
    }

    /// Sets the name of the manifest object.
    pub fn manifest<S: Into<String>>(mut self, name: S) -> Self {
        self.options.manifest = name.into();
        self
    }

    /// Sets the data files a store directory shows.
    pub fn data_files<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.data_files = names.into_iter().map(Into::into).collect();
        self.places = places(&self.options);
        self
    }

    /// Sets the key of the credential table.
    pub fn passwd_key<S: Into<String>>(mut self, key: S) -> Self {
        self.options.passwd_key = key.into();
        self
    }

    /// Sets how many requests bulk operations keep in flight.
    pub fn fan_out<F: Into<FanOut>>(mut self, fan_out: F) -> Self {
        self.options.fan_out = fan_out.into();
        self
    }

    fn locate<P: AsRef<Path>>(&self, user: &User, path: P) -> Result<(ScopedKey, Place)> {
        let key = vfs::scope(path, user)?;
        match self.places.classify(&key, &Namespace::of(user)) {
            Some(place) => Ok((key, *place)),
            None => {
                slog::debug!(self.logger, "Rejected path outside the served layout"; "username" => user.username(), "key" => key.as_str());
                Err(Error::new(ErrorKind::PermissionDenied, format!("{} is not served", key)))
            }
        }
    }

    fn writable(&self) -> Result<()> {
        match self.options.access_mode {
            AccessMode::ReadWrite => Ok(()),
            AccessMode::ReadOnly => Err(Error::new(ErrorKind::CommandNotImplemented, "storage is read-only")),
        }
    }

    async fn list_all(&self, prefix: String, delimiter: Option<char>) -> Result<ListResponse> {
        let mut request = ListRequest::new(prefix.as_str());
        request.delimiter = delimiter;
        let mut listing = ListResponse::new(prefix);
        loop {
            let page = self.store.list(&self.bucket, &request, LIST_RETRIES).await?;
            let next = page.next_token.clone();
            listing.absorb(page);
            match next {
                Some(token) => request.page_token = Some(token),
                None => return Ok(listing),
            }
        }
    }

    async fn exists_below(&self, prefix: String) -> Result<bool> {
        let page = self.store.list(&self.bucket, &ListRequest::new(prefix).max_keys(1), LIST_RETRIES).await?;
        Ok(!page.is_empty())
    }

    // The image directory exists when its manifest does, or when something is stored below it.
    async fn has_image_dir(&self, store: &ScopedKey) -> Result<bool> {
        let manifest = store.join(&self.options.manifest);
        match self.store.head(&self.bucket, manifest.as_str(), HEAD_RETRIES).await {
            Ok(_) => return Ok(true),
            Err(e) if is_missing(&e) => {}
            Err(e) => return Err(e),
        }
        self.exists_below(dir_prefix(&store.join(&self.options.image_dir))?).await
    }

    async fn load_manifest(&self, store: &ScopedKey) -> Result<Manifest> {
        let key = store.join(&self.options.manifest);
        let mut body = self
            .store
            .get(&self.bucket, key.as_str(), GET_RETRIES)
            .await
            .map_err(|e| Error::new(ErrorKind::PermanentFileNotAvailable, e))?;
        let mut text = String::new();
        body.read_to_string(&mut text)
            .await
            .map_err(|e| Error::new(ErrorKind::PermanentFileNotAvailable, e))?;
        Ok(Manifest::parse(&text))
    }

    async fn resolve(&self, image: &ScopedKey) -> Result<ManifestRecord> {
        let name = image.file_name().unwrap_or_default();
        let manifest = self.load_manifest(&store_dir(image)).await?;
        match manifest.resolve(name) {
            Some(record) => Ok(record.clone()),
            None => Err(Error::new(ErrorKind::PermanentFileNotAvailable, format!("{} has no manifest record", image))),
        }
    }

    // The bucket and key holding the bytes of a readable file.
    async fn object_of(&self, key: &ScopedKey, place: Place) -> Result<(String, String)> {
        match place {
            Place::DataFile => Ok((self.bucket.clone(), key.to_string())),
            Place::ImageFile => self.resolve(key).await.map(|r| (r.bucket, r.key)),
            _ => Err(Error::new(ErrorKind::PermanentFileNotAvailable, format!("{} is a directory", key))),
        }
    }

    async fn list_store(&self, key: &ScopedKey) -> Result<Vec<DirEntry>> {
        let prefix = dir_prefix(key)?;
        let listing = self.list_all(prefix.clone(), Some(DELIMITER)).await?;
        let image = self.options.image_dir.as_str();
        let mut entries = listing::project(&listing, |name| self.options.data_files.iter().any(|f| f == name), |name| name == image);

        let manifest_key = format!("{}{}", prefix, self.options.manifest);
        let image_listed = entries.iter().any(|e| e.is_directory && e.name == image);
        if !image_listed && listing.objects.iter().any(|o| o.key == manifest_key) {
            entries.insert(2, DirEntry::dir(image));
        }
        Ok(entries)
    }

    async fn list_images(&self, store: &ScopedKey) -> Result<Vec<DirEntry>> {
        let manifest = match self.load_manifest(store).await {
            Ok(manifest) => manifest,
            Err(e) => {
                slog::debug!(self.logger, "No manifest, image directory is empty"; "store" => store.as_str(), "error" => %e);
                return Ok(with_pseudo_dirs(vec![], vec![]));
            }
        };
        let records: Vec<ManifestRecord> = manifest.listable().cloned().collect();
        let files: Vec<DirEntry> = stream::iter(records)
            .map(|record| async move {
                match self.store.head(&record.bucket, &record.key, HEAD_RETRIES).await {
                    Ok(meta) => Ok(Some(DirEntry::file(record.name.as_str(), meta.size).modified(meta.last_modified))),
                    Err(e) if is_missing(&e) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .buffered(self.options.fan_out.get())
            .try_filter_map(|entry| future::ready(Ok(entry)))
            .try_collect::<Vec<_>>()
            .await?;
        Ok(with_pseudo_dirs(vec![], files))
    }
}

// Downloads into an anonymous temporary file and hands it back rewound.
async fn spool(mut body: Body) -> Result<tokio::fs::File> {
    let file = tokio::task::spawn_blocking(tempfile::tempfile)
        .await
        .map_err(|e| Error::new(ErrorKind::LocalError, e))??;
    let mut file = tokio::fs::File::from_std(file);
    tokio::io::copy(&mut body, &mut file).await?;
    file.flush().await?;
    file.seek(SeekFrom::Start(0)).await?;
    Ok(file)
}

#[async_trait]
impl StorageBackend for ObjectStorage {
    fn name(&self) -> &str {
        "object"
    }

    fn access_mode(&self) -> AccessMode {
        self.options.access_mode
    }

    #[tracing_attributes::instrument]
    async fn cwd<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()> {
        let (key, place) = self.locate(user, path)?;
        let exists = match place {
            Place::StoreRoot => true,
            Place::NamespaceRoot if !user.is_admin() => true,
            Place::NamespaceRoot | Place::Store => self.exists_below(dir_prefix(&key)?).await?,
            Place::ImageDir => self.has_image_dir(&store_dir(&key)).await?,
            Place::ImageGlob | Place::DataFile | Place::ImageFile => false,
        };
        if exists {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::PermanentDirectoryNotAvailable, format!("no directory {}", key)))
        }
    }

    #[tracing_attributes::instrument]
    async fn list<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<Vec<DirEntry>> {
        let (key, place) = self.locate(user, path)?;
        match place {
            Place::StoreRoot => Err(Error::new(ErrorKind::PermanentDirectoryNotAvailable, "the store root cannot be listed")),
            Place::NamespaceRoot => {
                let listing = self.list_all(dir_prefix(&key)?, Some(DELIMITER)).await?;
                Ok(listing::project(&listing, |_| false, listing::any))
            }
            Place::Store => self.list_store(&key).await,
            Place::ImageDir | Place::ImageGlob => self.list_images(&store_dir(&key)).await,
            Place::DataFile | Place::ImageFile => Err(Error::new(ErrorKind::PermanentDirectoryNotAvailable, format!("{} is a file", key))),
        }
    }

    #[tracing_attributes::instrument]
    async fn size<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<u64> {
        let (key, place) = self.locate(user, path)?;
        let (bucket, object) = self.object_of(&key, place).await?;
        Ok(self.store.head(&bucket, &object, HEAD_RETRIES).await?.size)
    }

    #[tracing_attributes::instrument]
    async fn get<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<Box<dyn tokio::io::AsyncRead + Send + Sync + Unpin>> {
        let (key, place) = self.locate(user, path)?;
        let (bucket, object) = self.object_of(&key, place).await?;
        let body = self.store.get(&bucket, &object, GET_RETRIES).await?;
        Ok(Box::new(spool(body).await?))
    }

    #[tracing_attributes::instrument(skip(input))]
    async fn put<P: AsRef<Path> + Send + Debug, R: tokio::io::AsyncRead + Send + Sync + Unpin + 'static>(
        &self,
        user: &User,
        input: R,
        path: P,
    ) -> Result<u64> {
        self.writable()?;
        let (key, place) = self.locate(user, path)?;
        if place != Place::DataFile {
            return Err(Error::new(ErrorKind::PermissionDenied, format!("{} is not writable", key)));
        }
        self.store.put(&self.bucket, key.as_str(), Box::new(input), WRITE_RETRIES).await
    }

    #[tracing_attributes::instrument]
    async fn del<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()> {
        self.writable()?;
        let (key, place) = self.locate(user, path)?;
        if place != Place::DataFile {
            return Err(Error::new(ErrorKind::PermissionDenied, format!("{} is not deletable", key)));
        }
        self.store.delete(&self.bucket, key.as_str(), WRITE_RETRIES).await
    }

    #[tracing_attributes::instrument]
    async fn rmd<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()> {
        self.writable()?;
        let (key, place) = self.locate(user, path)?;
        if place != Place::Store {
            return Err(Error::new(ErrorKind::PermissionDenied, format!("{} is not removable", key)));
        }
        let listing = self.list_all(dir_prefix(&key)?, None).await?;
        if listing.objects.is_empty() {
            return Err(Error::new(ErrorKind::PermanentDirectoryNotAvailable, format!("no directory {}", key)));
        }

        let keys: Vec<String> = listing.objects.into_iter().map(|object| object.key).collect();
        let results: Vec<Result<()>> = stream::iter(keys)
            .map(|object| async move { self.store.delete(&self.bucket, &object, WRITE_RETRIES).await })
            .buffer_unordered(self.options.fan_out.get())
            .collect()
            .await;
        let total = results.len();
        let mut failures = results.into_iter().filter_map(|r| r.err()).collect::<Vec<_>>();
        if failures.is_empty() {
            return Ok(());
        }
        slog::warn!(self.logger, "Directory only partially removed"; "key" => key.as_str(), "failed" => failures.len(), "total" => total);
        Err(failures.swap_remove(0))
    }

    #[tracing_attributes::instrument]
    async fn rename<P: AsRef<Path> + Send + Debug>(&self, user: &User, from: P, to: P) -> Result<()> {
        self.writable()?;
        let (from, from_place) = self.locate(user, from)?;
        let (to, to_place) = self.locate(user, to)?;
        if from_place != Place::DataFile || to_place != Place::DataFile {
            return Err(Error::new(ErrorKind::PermissionDenied, format!("cannot move {} to {}", from, to)));
        }
        if from == to {
            return self.store.head(&self.bucket, from.as_str(), HEAD_RETRIES).await.map(|_| ());
        }

        self.store.copy(&self.bucket, from.as_str(), to.as_str(), WRITE_RETRIES).await?;
        if let Err(e) = self.store.delete(&self.bucket, from.as_str(), WRITE_RETRIES).await {
            slog::warn!(self.logger, "Copied but could not remove the source, both objects exist"; "from" => from.as_str(), "to" => to.as_str(), "error" => %e);
            return Err(e);
        }
        Ok(())
    }

    #[tracing_attributes::instrument]
    async fn mkd<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()> {
        self.writable()?;
        let (key, place) = self.locate(user, path)?;
        if !matches!(place, Place::Store | Place::ImageDir) {
            return Err(Error::new(ErrorKind::PermissionDenied, format!("cannot create {}", key)));
        }
        let marker = dir_prefix(&key)?;
        self.store
            .put(&self.bucket, &marker, Box::new(tokio::io::empty()), WRITE_RETRIES)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl CredentialSource for ObjectStorage {
    async fn credential_table(&self) -> Result<Vec<u8>> {
        let mut body = self.store.get(&self.bucket, &self.options.passwd_key, GET_RETRIES).await?;
        let mut raw = Vec::new();
        body.read_to_end(&mut raw).await?;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vfsftp_core::auth::Role;

    fn classify(storage: &ObjectStorage, user: &User, path: &str) -> Option<Place> {
        storage.locate(user, path).ok().map(|(_, place)| place)
    }

    #[test]
    fn standard_user_layout() {
        let storage = ObjectStorage::new(Arc::new(MemoryObjectStore::new()), "b");
        let alice = User::new("alice", Role::Standard);
        assert_eq!(classify(&storage, &alice, "/"), Some(Place::NamespaceRoot));
        assert_eq!(classify(&storage, &alice, "/store1"), Some(Place::Store));
        assert_eq!(classify(&storage, &alice, "/store1/image"), Some(Place::ImageDir));
        assert_eq!(classify(&storage, &alice, "/store1/image/*"), Some(Place::ImageGlob));
        assert_eq!(classify(&storage, &alice, "/store1/image/a.png"), Some(Place::ImageFile));
        assert_eq!(classify(&storage, &alice, "/store1/publish_data.csv"), Some(Place::DataFile));
        assert_eq!(classify(&storage, &alice, "/store1/publish_images.csv"), None);
        assert_eq!(classify(&storage, &alice, "/store1/image/a/b"), None);
    }

    #[test]
    fn administrator_layout() {
        let storage = ObjectStorage::new(Arc::new(MemoryObjectStore::new()), "b");
        let root = User::new("root", Role::Administrator);
        assert_eq!(classify(&storage, &root, "/"), Some(Place::StoreRoot));
        assert_eq!(classify(&storage, &root, "/bob"), Some(Place::NamespaceRoot));
        assert_eq!(classify(&storage, &root, "/bob/store1/publish_data.csv"), Some(Place::DataFile));
        assert_eq!(classify(&storage, &root, "/publish_data.csv"), Some(Place::NamespaceRoot));
    }

    #[test]
    fn configured_names_reshape_the_layout() {
        let storage = ObjectStorage::new(Arc::new(MemoryObjectStore::new()), "b")
            .image_dir("pictures")
            .data_files(["a.csv", "b.csv"]);
        let alice = User::new("alice", Role::Standard);
        assert_eq!(classify(&storage, &alice, "/s/pictures"), Some(Place::ImageDir));
        assert_eq!(classify(&storage, &alice, "/s/image"), None);
        assert_eq!(classify(&storage, &alice, "/s/b.csv"), Some(Place::DataFile));
        assert_eq!(classify(&storage, &alice, "/s/publish_data.csv"), None);
    }

    #[test]
    fn store_dir_of_nested_keys() {
        assert_eq!(store_dir(&ScopedKey::new("alice/s/image/a.png")), ScopedKey::new("alice/s"));
        assert_eq!(store_dir(&ScopedKey::new("alice/s")), ScopedKey::new("alice/s"));
    }
}
