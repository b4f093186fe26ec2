use crate::auth::{Role, User};
use crate::storage::{Error, ErrorKind};
use std::fmt;
use std::path::Path;

/// The delimiter between path segments, both in virtual paths and in store keys.
pub const DELIMITER: char = '/';

/// An absolute, slash delimited path in the namespace the FTP client sees. Empty and `.` segments
/// are dropped while parsing; a `..` segment makes the path invalid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VirtualPath {
    segments: Vec<String>,
}

impl VirtualPath {
    /// Parses the path the FTP engine handed over. Relative paths are taken relative to the root.
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_str().ok_or_else(|| Error::from(ErrorKind::FileNameNotAllowedError))?;
        let mut segments = Vec::new();
        for segment in path.split(DELIMITER) {
            match segment {
                "" | "." => continue,
                ".." => return Err(Error::new(ErrorKind::FileNameNotAllowedError, format!("parent segment in {}", path))),
                s => segments.push(s.to_string()),
            }
        }
        Ok(VirtualPath { segments })
    }

    /// True for `/`.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segments, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Scopes the path to `user`: standard users get their own namespace segment injected in
    /// front, administrators address the store unprefixed.
    pub fn scope(&self, user: &User) -> ScopedKey {
        let mut key = match Namespace::of(user) {
            Namespace::Own(name) => name,
            Namespace::Global => String::new(),
        };
        for segment in &self.segments {
            if !key.is_empty() {
                key.push(DELIMITER);
            }
            key.push_str(segment);
        }
        ScopedKey { key }
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", DELIMITER, self.segments.join("/"))
    }
}

/// Parses `path` and scopes it to `user` in one go.
pub fn scope<P: AsRef<Path>>(path: P, user: &User) -> Result<ScopedKey, Error> {
    Ok(VirtualPath::parse(path)?.scope(user))
}

/// The part of the store a user may see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Namespace {
    /// Keys below the user's own name.
    Own(String),
    /// The whole store.
    Global,
}

impl Namespace {
    /// The namespace of `user`, decided by its role.
    pub fn of(user: &User) -> Self {
        match user.role() {
            Role::Administrator => Namespace::Global,
            Role::Standard => Namespace::Own(user.username().to_string()),
        }
    }

    /// Whether `segment` may stand in the namespace position of a key.
    pub fn accepts(&self, segment: &str) -> bool {
        match self {
            Namespace::Own(name) => name == segment,
            Namespace::Global => !segment.is_empty(),
        }
    }
}

/// A store key derived from a [`VirtualPath`]. For standard users it always begins with their
/// namespace segment. It never has a leading or trailing delimiter; the empty key is the store
/// root and can only be produced for administrators.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopedKey {
    key: String,
}

impl ScopedKey {
    /// Wraps a key as reported by a store, stripping leading and trailing delimiters.
    pub fn new<S: AsRef<str>>(key: S) -> Self {
        ScopedKey {
            key: key.as_ref().trim_matches(DELIMITER).to_string(),
        }
    }

    /// The key itself.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// True for the store root.
    pub fn is_root(&self) -> bool {
        self.key.is_empty()
    }

    /// The key with a trailing delimiter, as used for prefix listings. The store root has no
    /// directory form and yields `None`.
    pub fn dir_prefix(&self) -> Option<String> {
        if self.key.is_empty() {
            None
        } else {
            Some(format!("{}{}", self.key, DELIMITER))
        }
    }

    /// The segments of the key.
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.key.split(DELIMITER).filter(|s| !s.is_empty())
    }

    /// The last segment.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().next_back()
    }

    /// The key one level up. The root has no parent.
    pub fn parent(&self) -> Option<ScopedKey> {
        if self.key.is_empty() {
            return None;
        }
        Some(match self.key.rfind(DELIMITER) {
            Some(i) => ScopedKey { key: self.key[..i].to_string() },
            None => ScopedKey::default(),
        })
    }

    /// The key of child `name`.
    pub fn join(&self, name: &str) -> ScopedKey {
        if self.key.is_empty() {
            ScopedKey::new(name)
        } else {
            ScopedKey::new(format!("{}{}{}", self.key, DELIMITER, name))
        }
    }

    /// True if `other` is this key or lies below it.
    pub fn contains(&self, other: &ScopedKey) -> bool {
        match self.dir_prefix() {
            None => true,
            Some(prefix) => other == self || other.key.starts_with(&prefix),
        }
    }
}

impl AsRef<str> for ScopedKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ScopedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
