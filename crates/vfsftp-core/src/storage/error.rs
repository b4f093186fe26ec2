use crate::BoxError;
use derive_more::Display;
use thiserror::Error;

/// The Error returned by storage back-ends and by the store clients they talk to. The `ErrorKind`
/// determines what the FTP engine reports to its client, so choose it carefully.
#[derive(Debug, Error)]
#[error("storage error: {kind}")]
pub struct Error {
    kind: ErrorKind,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    /// Creates a new storage error
    pub fn new<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error {
            kind,
            source: Some(error.into()),
        }
    }

    /// Detailed information about what the FTP engine should do with the failure
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Attempts to get a reference to the inner `std::io::Error` if there is one.
    pub fn get_io_error(&self) -> Option<&std::io::Error> {
        self.source.as_ref()?.downcast_ref::<std::io::Error>()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::from(ErrorKind::PermanentFileNotAvailable),
            std::io::ErrorKind::PermissionDenied => Error::from(ErrorKind::PermissionDenied),
            _ => Error::new(ErrorKind::LocalError, err),
        }
    }
}

/// The `ErrorKind` variants that can be produced by [`StorageBackend`] implementations and store
/// clients.
///
/// [`StorageBackend`]: super::StorageBackend
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum ErrorKind {
    /// The store reported a failure that may succeed when retried, e.g. throttling or a dropped
    /// connection.
    #[display("450 Transient file not available")]
    TransientFileNotAvailable,
    /// The object does not exist, or a manifest or credential lookup found no matching record.
    #[display("550 Permanent file not available")]
    PermanentFileNotAvailable,
    /// The directory does not exist, or is not a directory.
    #[display("550 Permanent directory not available")]
    PermanentDirectoryNotAvailable,
    /// The path is outside the shapes the back-end allows for the operation, or the session is not
    /// authenticated. Nothing was sent to the store.
    #[display("550 Permission denied")]
    PermissionDenied,
    /// An internal failure of the back-end or of the store client.
    #[display("451 Local error")]
    LocalError,
    /// The path could not be turned into a scoped key, e.g. it contains a `..` segment.
    #[display("553 File name not allowed error")]
    FileNameNotAllowedError,
    /// The back-end declines the operation regardless of its input, e.g. mutations on a read-only
    /// object store.
    #[display("502 Command not implemented")]
    CommandNotImplemented,
}
