//! Contains the [`StorageBackend`] trait that is implemented to project a flat store onto the
//! hierarchical file system an FTP client navigates.
//!
//! Two implementations ship with vfsftp (`vfsftp-sbe-object` and `vfsftp-sbe-kv`). To create
//! another one:
//!
//! 1. Declare dependencies on the async-trait, tokio and vfsftp-core crates.
//!
//! 2. Implement the [`StorageBackend`] trait. Convert every incoming path with
//!    [`VirtualPath::parse`](crate::vfs::VirtualPath::parse) and scope it to the calling user
//!    before touching the store:
//!
//! ```no_run
//! use async_trait::async_trait;
//! use std::{fmt::Debug, path::Path};
//! use vfsftp_core::{
//!     auth::User,
//!     storage::{DirEntry, Error, ErrorKind, Result, StorageBackend},
//!     vfs::VirtualPath,
//! };
//!
//! #[derive(Debug)]
//! struct Empty;
//!
//! #[async_trait]
//! impl StorageBackend for Empty {
//!     async fn cwd<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()> {
//!         let key = VirtualPath::parse(path)?.scope(user);
//!         if key.dir_prefix().is_none() { Ok(()) } else { Err(Error::from(ErrorKind::PermanentDirectoryNotAvailable)) }
//!     }
//!
//!     async fn list<P: AsRef<Path> + Send + Debug>(&self, _user: &User, _path: P) -> Result<Vec<DirEntry>> {
//!         Ok(vfsftp_core::storage::with_pseudo_dirs(vec![], vec![]))
//!     }
//!
//!     async fn size<P: AsRef<Path> + Send + Debug>(&self, _user: &User, _path: P) -> Result<u64> {
//!         Err(Error::from(ErrorKind::PermanentFileNotAvailable))
//!     }
//!
//!     async fn get<P: AsRef<Path> + Send + Debug>(&self, _user: &User, _path: P) -> Result<Box<dyn tokio::io::AsyncRead + Send + Sync + Unpin>> {
//!         Err(Error::from(ErrorKind::PermanentFileNotAvailable))
//!     }
//!
//!     async fn put<P: AsRef<Path> + Send + Debug, R: tokio::io::AsyncRead + Send + Sync + Unpin + 'static>(
//!         &self,
//!         _user: &User,
//!         _input: R,
//!         _path: P,
//!     ) -> Result<u64> {
//!         Err(Error::from(ErrorKind::CommandNotImplemented))
//!     }
//!
//!     async fn del<P: AsRef<Path> + Send + Debug>(&self, _user: &User, _path: P) -> Result<()> {
//!         Err(Error::from(ErrorKind::CommandNotImplemented))
//!     }
//!
//!     async fn rmd<P: AsRef<Path> + Send + Debug>(&self, _user: &User, _path: P) -> Result<()> {
//!         Err(Error::from(ErrorKind::CommandNotImplemented))
//!     }
//!
//!     async fn rename<P: AsRef<Path> + Send + Debug>(&self, _user: &User, _from: P, _to: P) -> Result<()> {
//!         Err(Error::from(ErrorKind::CommandNotImplemented))
//!     }
//!
//!     async fn mkd<P: AsRef<Path> + Send + Debug>(&self, _user: &User, _path: P) -> Result<()> {
//!         Err(Error::from(ErrorKind::CommandNotImplemented))
//!     }
//! }
//! ```
//!
//! 3. Hand it to a `libvfsftp::Session` together with an authenticator.

mod dir_entry;
pub use dir_entry::{DirEntry, pseudo_dirs, with_pseudo_dirs};

mod error;
pub use error::{Error, ErrorKind};

mod fan_out;
pub use fan_out::FanOut;

mod storage_backend;
pub use storage_backend::{AccessMode, Result, StorageBackend};
