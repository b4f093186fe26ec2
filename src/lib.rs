//! libvfsftp lets an FTP server serve flat stores as if they were file systems.
//!
//! An FTP engine drives a [`Session`] per client connection. The session authenticates the
//! client against the credential table kept in the store and then turns every file system verb
//! into a call on a [`StorageBackend`](storage::StorageBackend). Two back-ends exist, each in its
//! own crate:
//!
//! - `vfsftp-sbe-object`: per-user publication directories in a prefix addressed object store,
//!   with an image directory resolved through a manifest.
//! - `vfsftp-sbe-kv`: a full read-write directory tree emulated with string and set values in a
//!   key/value store.
//!
//! ```no_run
//! use libvfsftp::Session;
//! use libvfsftp::auth::PasswdAuthenticator;
//! use std::sync::Arc;
//! use vfsftp_sbe_kv::{KvStorage, MemoryKvStore};
//!
//! # async fn demo() {
//! let storage = Arc::new(KvStorage::new(Arc::new(MemoryKvStore::new())));
//! let mut session = Session::new(storage.clone(), Arc::new(PasswdAuthenticator::new(storage)));
//! if session.authenticate("alice", "secret").await {
//!     let entries = session.dir_contents("/").await;
//!     assert_eq!(entries[0].name, ".");
//! }
//! # }
//! ```

pub use vfsftp_core::{auth, storage, vfs};

mod session;
pub use session::Session;
