use chrono::prelude::{DateTime, Utc};
use std::fmt::{self, Formatter};
use std::time::SystemTime;

/// One record of a directory listing, relative to the listed directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// Name relative to the listed directory, without any delimiter.
    pub name: String,
    /// True for directories, including the `.` and `..` pseudo entries.
    pub is_directory: bool,
    /// Size in bytes. Always zero for directories.
    pub size: u64,
    /// Last modification time, when the store reports one.
    pub modified: Option<SystemTime>,
}

impl DirEntry {
    /// A directory entry.
    pub fn dir<S: Into<String>>(name: S) -> Self {
        DirEntry {
            name: name.into(),
            is_directory: true,
            size: 0,
            modified: None,
        }
    }

    /// A file entry of `size` bytes.
    pub fn file<S: Into<String>>(name: S, size: u64) -> Self {
        DirEntry {
            name: name.into(),
            is_directory: false,
            size,
            modified: None,
        }
    }

    /// Sets the modification time.
    pub fn modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }
}

/// The `.` and `..` entries every listing starts with.
pub fn pseudo_dirs() -> [DirEntry; 2] {
    [DirEntry::dir("."), DirEntry::dir("..")]
}

/// Assembles a listing: the pseudo entries, then `dirs`, then `files`, each in the order given.
pub fn with_pseudo_dirs<D, F>(dirs: D, files: F) -> Vec<DirEntry>
where
    D: IntoIterator<Item = DirEntry>,
    F: IntoIterator<Item = DirEntry>,
{
    pseudo_dirs().into_iter().chain(dirs).chain(files).collect()
}

// Formats like a line of `ls -l`, which is what FTP LIST replies are expected to look like.
impl fmt::Display for DirEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let modified: String = self
            .modified
            .map(|x| DateTime::<Utc>::from(x).format("%b %d %H:%M").to_string())
            .unwrap_or_else(|| "--- -- --:--".to_string());
        write!(
            f,
            "{filetype}{permissions} {links:>12} {owner:>12} {group:>12} {size:#14} {modified:>12} {name}",
            filetype = if self.is_directory { "d" } else { "-" },
            permissions = if self.is_directory { "rwxr-xr-x" } else { "rw-r--r--" },
            links = 1,
            owner = 0,
            group = 0,
            size = self.size,
            modified = modified,
            name = self.name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_listing_still_has_pseudo_dirs() {
        let listing = with_pseudo_dirs(vec![], vec![]);
        assert_eq!(listing, vec![DirEntry::dir("."), DirEntry::dir("..")]);
    }

    #[test]
    fn dirs_come_before_files() {
        let listing = with_pseudo_dirs(vec![DirEntry::dir("sub")], vec![DirEntry::file("a.txt", 10)]);
        let names: Vec<&str> = listing.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![".", "..", "sub", "a.txt"]);
    }

    #[test]
    fn display_looks_like_ls() {
        let line = DirEntry::file("a.txt", 10).to_string();
        assert!(line.starts_with("-rw-r--r--"));
        assert!(line.ends_with("--- -- --:-- a.txt"));
        assert!(DirEntry::dir("sub").to_string().starts_with("drwxr-xr-x"));
    }
}
