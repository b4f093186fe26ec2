//! [`Authenticator`] implementation that checks credentials against a `passwd` table kept in the
//! backing store.

use super::{AuthenticationError, Authenticator, Role, User};
use crate::csv::split_record;
use crate::storage::Error;
use crate::vfs::DELIMITER;
use async_trait::async_trait;
use std::{collections::HashMap, fmt, fmt::Debug, sync::Arc};

const USER: usize = 0;
const PASS: usize = 1;
const ADMIN: usize = 2;

/// Something that can hand out the raw credential table. Storage back-ends implement this by
/// reading the table from their own store.
#[async_trait]
pub trait CredentialSource: Send + Sync + Debug {
    /// Fetches the current table. Called once per authentication attempt.
    async fn credential_table(&self) -> Result<Vec<u8>, Error>;
}

#[derive(Clone)]
struct Entry {
    secret: String,
    role: Role,
}

impl Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entry {{ secret: *******, role: {} }}", self.role)
    }
}

/// A parsed credential table.
///
/// Each line holds `name,secret[,flag]`. A flag of `Y` (in any case) marks an administrator.
/// Fields may be double quoted, so a secret can contain commas.
/// Lines with fewer than two fields, an empty name, or a name containing the path delimiter are
/// skipped. When a name occurs twice the later line wins.
#[derive(Clone, Debug, Default)]
pub struct CredentialTable {
    users: HashMap<String, Entry>,
}

impl CredentialTable {
    /// Parses the table text.
    pub fn parse(text: &str) -> Self {
        let mut users = HashMap::new();
        for line in text.lines() {
            let fields = split_record(line);
            if fields.len() <= PASS || fields[USER].is_empty() || fields[USER].contains(DELIMITER) {
                continue;
            }
            let admin = fields.get(ADMIN).is_some_and(|flag| flag.eq_ignore_ascii_case("y"));
            users.insert(
                fields[USER].clone(),
                Entry {
                    secret: fields[PASS].clone(),
                    role: if admin { Role::Administrator } else { Role::Standard },
                },
            );
        }
        CredentialTable { users }
    }

    /// Succeeds only if `username` is present and `password` equals its secret exactly.
    pub fn verify(&self, username: &str, password: &str) -> Result<User, AuthenticationError> {
        match self.users.get(username) {
            Some(entry) if entry.secret == password => Ok(User::new(username, entry.role)),
            Some(_) => Err(AuthenticationError::BadPassword),
            None => Err(AuthenticationError::BadUser),
        }
    }

    /// The number of users in the table.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// True if the table holds no usable row.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// [`Authenticator`] that fetches the credential table from a [`CredentialSource`] on every
/// attempt. Nothing is cached between attempts, so edits to the table take effect at the next
/// login.
#[derive(Debug)]
pub struct PasswdAuthenticator<S> {
    source: Arc<S>,
    logger: slog::Logger,
}

impl<S: CredentialSource> PasswdAuthenticator<S> {
    /// Creates an authenticator reading from `source`.
    pub fn new(source: Arc<S>) -> Self {
        PasswdAuthenticator {
            source,
            logger: slog::Logger::root(slog::Discard, slog::o!()),
        }
    }

    /// Sets the logger failures are reported to.
    pub fn logger(mut self, logger: slog::Logger) -> Self {
        self.logger = logger;
        self
    }
}

#[async_trait]
impl<S: CredentialSource + 'static> Authenticator for PasswdAuthenticator<S> {
    #[tracing_attributes::instrument(skip(self, password))]
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthenticationError> {
        let raw = match self.source.credential_table().await {
            Ok(raw) => raw,
            Err(e) => {
                slog::warn!(self.logger, "Could not fetch the credential table: {}", e);
                return Err(AuthenticationError::with_source("credential table unavailable", e));
            }
        };
        let text = String::from_utf8(raw).map_err(|e| AuthenticationError::with_source("credential table is not valid UTF-8", e))?;

        let result = CredentialTable::parse(&text).verify(username, password);
        if let Err(e) = &result {
            slog::debug!(self.logger, "Rejected login"; "username" => username, "reason" => %e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ErrorKind;
    use pretty_assertions::assert_eq;

    const TABLE: &str = "alice,wonderland,N\nroot,toor,Y\r\nbob,builder\n\nbroken\n,nameless,Y\nev/il,x,Y\ncarol,first\ncarol,second,y\n";

    #[test]
    fn parses_rows() {
        let table = CredentialTable::parse(TABLE);
        assert_eq!(table.len(), 4);
        assert_eq!(table.verify("alice", "wonderland").unwrap(), User::new("alice", Role::Standard));
        assert_eq!(table.verify("root", "toor").unwrap(), User::new("root", Role::Administrator));
        assert_eq!(table.verify("bob", "builder").unwrap(), User::new("bob", Role::Standard));
    }

    #[test]
    fn later_rows_win() {
        let table = CredentialTable::parse(TABLE);
        assert!(matches!(table.verify("carol", "first"), Err(AuthenticationError::BadPassword)));
        assert_eq!(table.verify("carol", "second").unwrap().role(), Role::Administrator);
    }

    #[test]
    fn only_exact_matches_succeed() {
        let table = CredentialTable::parse(TABLE);
        assert!(matches!(table.verify("alice", "Wonderland"), Err(AuthenticationError::BadPassword)));
        assert!(matches!(table.verify("alice", "wonderland "), Err(AuthenticationError::BadPassword)));
        assert!(matches!(table.verify("Alice", "wonderland"), Err(AuthenticationError::BadUser)));
        assert!(matches!(table.verify("broken", ""), Err(AuthenticationError::BadUser)));
        assert!(matches!(table.verify("ev/il", "x"), Err(AuthenticationError::BadUser)));
    }

    #[test]
    fn quoted_secret_with_comma_authenticates() {
        let table = CredentialTable::parse("dave,\"pa,ss\",N\n\"erin\",\"say \"\"hi\"\"\",Y\n");
        assert_eq!(table.verify("dave", "pa,ss").unwrap(), User::new("dave", Role::Standard));
        assert!(matches!(table.verify("dave", "\"pa"), Err(AuthenticationError::BadPassword)));
        assert_eq!(table.verify("erin", "say \"hi\"").unwrap().role(), Role::Administrator);
    }

    #[derive(Debug)]
    struct Source(Option<&'static str>);

    #[async_trait]
    impl CredentialSource for Source {
        async fn credential_table(&self) -> Result<Vec<u8>, Error> {
            self.0.map(|s| s.as_bytes().to_vec()).ok_or_else(|| Error::from(ErrorKind::PermanentFileNotAvailable))
        }
    }

    #[tokio::test]
    async fn authenticates_against_fetched_table() {
        let authenticator = PasswdAuthenticator::new(Arc::new(Source(Some(TABLE))));
        assert_eq!(authenticator.authenticate("root", "toor").await.unwrap(), User::new("root", Role::Administrator));
        assert!(authenticator.authenticate("root", "guess").await.is_err());
    }

    #[tokio::test]
    async fn missing_table_fails() {
        let authenticator = PasswdAuthenticator::new(Arc::new(Source(None)));
        assert!(matches!(
            authenticator.authenticate("alice", "wonderland").await,
            Err(AuthenticationError::ImplPropagated(_, Some(_)))
        ));
    }
}
