//! The capability interface an FTP engine calls, one [`Session`] per client.

use slog::Drain;
use std::fmt::{self, Debug, Formatter};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncRead;
use vfsftp_core::{
    auth::{Authenticator, User},
    storage::{self, DirEntry, StorageBackend},
};

/// The stream handed out for a download, positioned at the first byte.
pub type Download = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// The state of one client connection: the storage back-end it works on and the user it
/// authenticated as.
///
/// Every operation resolves to a single plain value. Failures of any kind, including a missing
/// login, collapse into the failure value of the operation (`false`, `None` or an empty listing)
/// and are logged; the client is never told more than that.
pub struct Session<Storage>
where
    Storage: StorageBackend,
{
    storage: Arc<Storage>,
    authenticator: Arc<dyn Authenticator>,
    user: Option<User>,
    logger: slog::Logger,
}

impl<Storage> Debug for Session<Storage>
where
    Storage: StorageBackend,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("storage", &self.storage.name())
            .field("authenticator", &self.authenticator.name())
            .field("user", &self.user)
            .finish()
    }
}

impl<Storage> Session<Storage>
where
    Storage: StorageBackend,
{
    /// Creates an unauthenticated session logging through the `log` crate.
    pub fn new(storage: Arc<Storage>, authenticator: Arc<dyn Authenticator>) -> Self {
        Session {
            storage,
            authenticator,
            user: None,
            logger: slog::Logger::root(slog_stdlog::StdLog.fuse(), slog::o!()),
        }
    }

    /// Sets the logger the session reports its operations to.
    pub fn logger(mut self, logger: slog::Logger) -> Self {
        self.logger = logger;
        self
    }

    /// The user the session is authenticated as, if any.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Authenticates the client. A failed attempt also ends any earlier login.
    #[tracing_attributes::instrument(skip(self, password))]
    pub async fn authenticate(&mut self, username: &str, password: &str) -> bool {
        let logger = self.logger.new(slog::o!("username" => username.to_string()));
        match self.authenticator.authenticate(username, password).await {
            Ok(user) => {
                slog::info!(logger, "Authenticated as {}", user);
                self.user = Some(user);
                true
            }
            Err(err) => {
                slog::warn!(logger, "Authentication failed: {}", err);
                self.user = None;
                false
            }
        }
    }

    /// Whether `path` is a directory the user may change into.
    #[tracing_attributes::instrument(skip(self))]
    pub async fn change_dir<P: AsRef<Path> + Debug>(&self, path: P) -> bool {
        let path = path.as_ref().to_path_buf();
        match self.current_user("CWD", &path) {
            Some(user) => {
                let result = self.storage.cwd(user, &path).await;
                self.settle(user, "CWD", &path, result).is_some()
            }
            None => false,
        }
    }

    /// The entries of the directory at `path`, starting with `.` and `..`. Empty on failure.
    #[tracing_attributes::instrument(skip(self))]
    pub async fn dir_contents<P: AsRef<Path> + Debug>(&self, path: P) -> Vec<DirEntry> {
        let path = path.as_ref().to_path_buf();
        match self.current_user("LIST", &path) {
            Some(user) => {
                let result = self.storage.list(user, &path).await;
                self.settle(user, "LIST", &path, result).unwrap_or_default()
            }
            None => vec![],
        }
    }

    /// The size in bytes of the file at `path`.
    #[tracing_attributes::instrument(skip(self))]
    pub async fn bytes<P: AsRef<Path> + Debug>(&self, path: P) -> Option<u64> {
        let path = path.as_ref().to_path_buf();
        let user = self.current_user("SIZE", &path)?;
        let result = self.storage.size(user, &path).await;
        self.settle(user, "SIZE", &path, result)
    }

    /// The contents of the file at `path`.
    #[tracing_attributes::instrument(skip(self))]
    pub async fn get_file<P: AsRef<Path> + Debug>(&self, path: P) -> Option<Download> {
        let path = path.as_ref().to_path_buf();
        let user = self.current_user("RETR", &path)?;
        let result = self.storage.get(user, &path).await;
        self.settle(user, "RETR", &path, result)
    }

    /// Stores `input` as the file at `path`, returning the number of bytes written.
    #[tracing_attributes::instrument(skip(self, input))]
    pub async fn put_file<P, R>(&self, path: P, input: R) -> Option<u64>
    where
        P: AsRef<Path> + Debug,
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        let path = path.as_ref().to_path_buf();
        let user = self.current_user("STOR", &path)?;
        let result = self.storage.put(user, input, &path).await;
        self.settle(user, "STOR", &path, result)
    }

    /// Deletes the file at `path`.
    #[tracing_attributes::instrument(skip(self))]
    pub async fn delete_file<P: AsRef<Path> + Debug>(&self, path: P) -> bool {
        let path = path.as_ref().to_path_buf();
        match self.current_user("DELE", &path) {
            Some(user) => {
                let result = self.storage.del(user, &path).await;
                self.settle(user, "DELE", &path, result).is_some()
            }
            None => false,
        }
    }

    /// Deletes the directory at `path` with everything below it.
    #[tracing_attributes::instrument(skip(self))]
    pub async fn delete_dir<P: AsRef<Path> + Debug>(&self, path: P) -> bool {
        let path = path.as_ref().to_path_buf();
        match self.current_user("RMD", &path) {
            Some(user) => {
                let result = self.storage.rmd(user, &path).await;
                self.settle(user, "RMD", &path, result).is_some()
            }
            None => false,
        }
    }

    /// Moves `from` to `to`.
    #[tracing_attributes::instrument(skip(self))]
    pub async fn rename<P: AsRef<Path> + Debug>(&self, from: P, to: P) -> bool {
        let from = from.as_ref().to_path_buf();
        let to = to.as_ref().to_path_buf();
        match self.current_user("RNTO", &from) {
            Some(user) => {
                let result = self.storage.rename(user, &from, &to).await;
                self.settle(user, "RNTO", &to, result).is_some()
            }
            None => false,
        }
    }

    /// Creates the directory at `path`.
    #[tracing_attributes::instrument(skip(self))]
    pub async fn make_dir<P: AsRef<Path> + Debug>(&self, path: P) -> bool {
        let path = path.as_ref().to_path_buf();
        match self.current_user("MKD", &path) {
            Some(user) => {
                let result = self.storage.mkd(user, &path).await;
                self.settle(user, "MKD", &path, result).is_some()
            }
            None => false,
        }
    }

    fn current_user(&self, command: &str, path: &Path) -> Option<&User> {
        if self.user.is_none() {
            slog::warn!(self.logger, "{} {:?} refused: not logged in", command, path);
        }
        self.user.as_ref()
    }

    fn settle<T>(&self, user: &User, command: &str, path: &Path, result: storage::Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                slog::info!(self.logger, "{} {:?}", command, path; "username" => user.username());
                Some(value)
            }
            Err(err) => {
                slog::warn!(self.logger, "{} {:?} failed: {}", command, path, err; "username" => user.username());
                None
            }
        }
    }
}
