//! The image manifest: a comma separated document mapping virtual names to the bucket and key
//! that actually hold the bytes.

use std::collections::HashSet;
use vfsftp_core::csv::split_record;

const NAME: usize = 0;
const BUCKET: usize = 1;
const KEY: usize = 2;

/// One line of a manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestRecord {
    /// The name the file is listed under.
    pub name: String,
    /// The bucket holding the bytes.
    pub bucket: String,
    /// The key holding the bytes.
    pub key: String,
}

/// A parsed manifest. Lines with fewer than three fields are ignored, extra fields are allowed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    records: Vec<ManifestRecord>,
}

impl Manifest {
    /// Parses the manifest text.
    pub fn parse(text: &str) -> Self {
        let records = text
            .lines()
            .map(split_record)
            .filter(|fields| fields.len() > KEY && !fields[NAME].is_empty())
            .map(|mut fields| ManifestRecord {
                key: std::mem::take(&mut fields[KEY]),
                bucket: std::mem::take(&mut fields[BUCKET]),
                name: std::mem::take(&mut fields[NAME]),
            })
            .collect();
        Manifest { records }
    }

    /// The first record listed under exactly `name`.
    pub fn resolve(&self, name: &str) -> Option<&ManifestRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// The records a listing shows: the resolvable ones, in document order. A name that occurs
    /// again is skipped since [`resolve`](Manifest::resolve) would never return it.
    pub fn listable(&self) -> impl Iterator<Item = &ManifestRecord> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(move |r| !r.name.contains(vfsftp_core::vfs::DELIMITER) && seen.insert(r.name.as_str()))
    }

    /// All records in document order.
    pub fn records(&self) -> &[ManifestRecord] {
        &self.records
    }
}
