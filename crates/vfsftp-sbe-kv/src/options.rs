//! Contains the setup options of the [`KvStorage`](crate::KvStorage) back-end.

use serde::Deserialize;
use vfsftp_core::storage::FanOut;

pub(crate) const DEFAULT_PASSWD_KEY: &str = "passwd";

/// Settings of a [`KvStorage`](crate::KvStorage).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Put in front of every key, e.g. `ftp:`. Empty by default.
    pub prefix: String,
    /// Key of the credential table, below the prefix.
    pub passwd_key: String,
    /// How many store requests a directory listing or removal keeps in flight.
    pub fan_out: FanOut,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            prefix: String::new(),
            passwd_key: DEFAULT_PASSWD_KEY.to_string(),
            fan_out: FanOut::default(),
        }
    }
}
