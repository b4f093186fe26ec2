//! Defines the service provider interface for storage back-end implementors.

use super::{DirEntry, error::Error};
use crate::auth::User;
use async_trait::async_trait;
use derive_more::Display;
use serde::Deserialize;
use std::{fmt::Debug, path::Path, result};

/// Result type used by traits in this module
pub type Result<T> = result::Result<T, Error>;

/// Whether a back-end accepts mutations (put, delete, rename, make directory).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    /// Every mutation fails with [`CommandNotImplemented`](super::ErrorKind::CommandNotImplemented)
    /// without reaching the store.
    #[default]
    #[display("read-only")]
    ReadOnly,
    /// Mutations are translated into store writes.
    #[display("read-write")]
    ReadWrite,
}

impl From<bool> for AccessMode {
    fn from(writable: bool) -> Self {
        if writable { AccessMode::ReadWrite } else { AccessMode::ReadOnly }
    }
}

/// The `StorageBackend` trait is the polymorphic storage strategy behind a session. Every method
/// receives the authenticated [`User`], whose role decides how the virtual path is scoped, and a
/// virtual path exactly as the FTP engine resolved it.
///
/// Implementations must never touch their store for a path they reject.
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// Implement to set the name of the storage back-end. By default it returns the type signature.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Tells whether the back-end accepts mutations.
    fn access_mode(&self) -> AccessMode {
        AccessMode::ReadWrite
    }

    /// Succeeds when the given directory exists and may be entered.
    async fn cwd<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()>;

    /// Returns the entries of the given directory, starting with `.` and `..`.
    async fn list<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<Vec<DirEntry>>;

    /// Returns the listing as `ls -l` style lines that can be sent to the client as is.
    #[tracing_attributes::instrument]
    async fn list_fmt<P>(&self, user: &User, path: P) -> Result<std::io::Cursor<Vec<u8>>>
    where
        P: AsRef<Path> + Send + Debug,
    {
        let list = self.list(user, path).await?;
        let lines: Vec<u8> = list.iter().map(|entry| format!("{}\r\n", entry)).collect::<String>().into_bytes();
        Ok(std::io::Cursor::new(lines))
    }

    /// Returns the size in bytes of the given file.
    async fn size<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<u64>;

    /// Returns the content of the given file, readable from offset 0.
    async fn get<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<Box<dyn tokio::io::AsyncRead + Send + Sync + Unpin>>;

    /// Replaces the file at the given path with everything read from `input`. Returns the number
    /// of bytes written.
    async fn put<P: AsRef<Path> + Send + Debug, R: tokio::io::AsyncRead + Send + Sync + Unpin + 'static>(
        &self,
        user: &User,
        input: R,
        path: P,
    ) -> Result<u64>;

    /// Deletes the file at the given path.
    async fn del<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()>;

    /// Deletes the given directory and everything below it.
    async fn rmd<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()>;

    /// Moves `from` to `to`.
    async fn rename<P: AsRef<Path> + Send + Debug>(&self, user: &User, from: P, to: P) -> Result<()>;

    /// Creates the given directory.
    async fn mkd<P: AsRef<Path> + Send + Debug>(&self, user: &User, path: P) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_mode_from_bool() {
        assert_eq!(AccessMode::from(true), AccessMode::ReadWrite);
        assert_eq!(AccessMode::from(false), AccessMode::ReadOnly);
        assert_eq!(AccessMode::default(), AccessMode::ReadOnly);
    }
}
