//! Core traits and types for vfsftp storage back-ends.
//!
//! A storage back-end projects a flat store (an object store, a key/value store) onto the
//! hierarchical file system an FTP client expects. The pieces every back-end shares live here:
//!
//! - [`storage`]: the [`StorageBackend`](storage::StorageBackend) trait, its error type and the
//!   [`DirEntry`](storage::DirEntry) records listings are made of.
//! - [`auth`]: users, roles and the credential-table [`Authenticator`](auth::Authenticator).
//! - [`vfs`]: conversion of client supplied paths into user scoped keys and the path shape
//!   matcher back-ends use to decide which paths are operable.
//! - [`csv`]: the field splitting shared by the comma separated tables kept in the stores.

pub mod auth;
pub mod csv;
pub mod storage;
pub mod vfs;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
