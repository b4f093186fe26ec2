//! Turns prefix listings into directory entries.

use crate::client::ListResponse;
use vfsftp_core::storage::{DirEntry, with_pseudo_dirs};
use vfsftp_core::vfs::DELIMITER;

/// A filter that lets every name through.
pub fn any(_name: &str) -> bool {
    true
}

/// Projects a delimited listing onto the entries of the listed directory.
///
/// Common prefixes become directories and objects become files, both named relative to the queried
/// prefix. The object equal to the prefix is the directory's own marker and is left out, as is
/// every other zero-byte object. The filters see the relative name and decide what stays. The
/// result starts with `.` and `..`, then directories, then files, each in store order.
pub fn project<F, D>(response: &ListResponse, file_filter: F, dir_filter: D) -> Vec<DirEntry>
where
    F: Fn(&str) -> bool,
    D: Fn(&str) -> bool,
{
    let prefix = response.prefix.as_str();
    let dirs = response
        .common_prefixes
        .iter()
        .filter_map(|p| p.strip_prefix(prefix))
        .map(|name| name.trim_end_matches(DELIMITER))
        .filter(|name| !name.is_empty() && !name.contains(DELIMITER) && dir_filter(name))
        .map(DirEntry::dir);
    let files = response
        .objects
        .iter()
        .filter(|object| object.key != prefix && object.size > 0)
        .filter_map(|object| object.key.strip_prefix(prefix).map(|name| (name, object)))
        .filter(|(name, _)| !name.is_empty() && !name.contains(DELIMITER) && file_filter(name))
        .map(|(name, object)| DirEntry::file(name, object.size).modified(object.last_modified));
    with_pseudo_dirs(dirs, files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ObjectSummary;
    use pretty_assertions::assert_eq;

    fn object(key: &str, size: u64) -> ObjectSummary {
        ObjectSummary {
            key: key.to_string(),
            size,
            last_modified: None,
        }
    }

    fn names(entries: &[DirEntry]) -> Vec<(&str, bool, u64)> {
        entries.iter().map(|e| (e.name.as_str(), e.is_directory, e.size)).collect()
    }

    #[test]
    fn marker_and_empty_objects_are_not_files() {
        let response = ListResponse {
            prefix: "alice/".into(),
            objects: vec![object("alice/a.txt", 10), object("alice/", 0)],
            common_prefixes: vec!["alice/sub/".into()],
            next_token: None,
        };
        let entries = project(&response, any, any);
        assert_eq!(names(&entries), vec![(".", true, 0), ("..", true, 0), ("sub", true, 0), ("a.txt", false, 10)]);
    }

    #[test]
    fn empty_listing_has_pseudo_dirs_only() {
        let entries = project(&ListResponse::new("alice/"), any, any);
        assert_eq!(names(&entries), vec![(".", true, 0), ("..", true, 0)]);
    }

    #[test]
    fn zero_byte_object_still_shows_as_directory_via_prefix() {
        let response = ListResponse {
            prefix: "alice/".into(),
            objects: vec![object("alice/empty", 0)],
            common_prefixes: vec!["alice/empty/".into()],
            next_token: None,
        };
        let entries = project(&response, any, any);
        assert_eq!(names(&entries), vec![(".", true, 0), ("..", true, 0), ("empty", true, 0)]);
    }

    #[test]
    fn filters_apply_to_relative_names() {
        let response = ListResponse {
            prefix: "alice/store1/".into(),
            objects: vec![
                object("alice/store1/publish_images.csv", 40),
                object("alice/store1/publish_data.csv", 12),
                object("alice/store1/notes.txt", 3),
            ],
            common_prefixes: vec!["alice/store1/image/".into(), "alice/store1/tmp/".into()],
            next_token: None,
        };
        let entries = project(&response, |n| n == "publish_data.csv", |n| n == "image");
        assert_eq!(names(&entries), vec![(".", true, 0), ("..", true, 0), ("image", true, 0), ("publish_data.csv", false, 12)]);
    }

    #[test]
    fn store_order_is_kept() {
        let response = ListResponse {
            prefix: "".into(),
            objects: vec![object("b", 1), object("a", 1)],
            common_prefixes: vec!["z/".into(), "y/".into()],
            next_token: None,
        };
        let entries = project(&response, any, any);
        let order: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(order, vec![".", "..", "z", "y", "b", "a"]);
    }
}
