use derive_more::Display;
use std::fmt;

/// What a user may see of the store.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum Role {
    /// Confined to the keys below its own name.
    #[display("standard")]
    Standard,
    /// Sees the whole store, unprefixed.
    #[display("administrator")]
    Administrator,
}

/// An authenticated user. Immutable once produced by an [`Authenticator`](super::Authenticator).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct User {
    username: String,
    role: Role,
}

impl User {
    /// Creates a user with the given role.
    pub fn new<S: Into<String>>(username: S, role: Role) -> Self {
        User {
            username: username.into(),
            role,
        }
    }

    /// The name the user logged in with. For standard users this is also the namespace segment.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The user's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Shorthand for `role() == Role::Administrator`.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.role)
    }
}
