//! Contains code pertaining to the setup options that can be given to the [`ObjectStorage`](crate::ObjectStorage) builder.

use serde::Deserialize;
pub use vfsftp_core::storage::FanOut;
use vfsftp_core::storage::AccessMode;

pub(crate) const DEFAULT_IMAGE_DIR: &str = "image";
pub(crate) const DEFAULT_MANIFEST: &str = "publish_images.csv";
pub(crate) const DEFAULT_DATA_FILE: &str = "publish_data.csv";
pub(crate) const DEFAULT_PASSWD_KEY: &str = "passwd";

// Reads are idempotent and get a retry. HEAD is only a lookup and writes are not retried.
pub(crate) const LIST_RETRIES: u32 = 1;
pub(crate) const GET_RETRIES: u32 = 1;
pub(crate) const HEAD_RETRIES: u32 = 0;
pub(crate) const WRITE_RETRIES: u32 = 0;

/// Settings of an [`ObjectStorage`](crate::ObjectStorage). Every field has a default, so an
/// embedding application only needs to deserialize what it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Whether mutations reach the store. Defaults to read-only.
    pub access_mode: AccessMode,
    /// Name of the manifest driven directory inside every store directory.
    pub image_dir: String,
    /// Name of the manifest object, stored next to the image directory.
    pub manifest: String,
    /// The files a store directory shows. Every other object in it stays hidden.
    pub data_files: Vec<String>,
    /// Key of the credential table in the home bucket.
    pub passwd_key: String,
    /// How many store requests a bulk operation keeps in flight.
    pub fan_out: FanOut,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            access_mode: AccessMode::default(),
            image_dir: DEFAULT_IMAGE_DIR.to_string(),
            manifest: DEFAULT_MANIFEST.to_string(),
            data_files: vec![DEFAULT_DATA_FILE.to_string()],
            passwd_key: DEFAULT_PASSWD_KEY.to_string(),
            fan_out: FanOut::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let options = Options::default();
        assert_eq!(options.access_mode, AccessMode::ReadOnly);
        assert_eq!(options.image_dir, "image");
        assert_eq!(options.manifest, "publish_images.csv");
        assert_eq!(options.data_files, vec!["publish_data.csv".to_string()]);
        assert_eq!(options.fan_out.get(), 5);
    }

    #[test]
    fn deserializes_partial_settings() {
        let options: Options = serde_json::from_str(r#"{"access_mode": "read-write", "fan_out": 0, "data_files": ["a.csv", "b.csv"]}"#).unwrap();
        assert_eq!(options.access_mode, AccessMode::ReadWrite);
        assert_eq!(options.fan_out, FanOut::from(1));
        assert_eq!(options.data_files.len(), 2);
        assert_eq!(options.passwd_key, "passwd");
    }
}
