//! Resumable-upload locations keyed by declared filename.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Hex SHA-256 of a declared filename, used as the location-map key.
#[must_use]
pub fn filename_key(filename: &str) -> String {
    let digest = Sha256::digest(filename.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Upload locations per filename plus the most recent one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TusLocations {
    by_name: BTreeMap<String, Vec<String>>,
    last: Option<String>,
}

impl TusLocations {
    /// Records a `Location` returned by an upload creation request.
    pub fn record(&mut self, filename: &str, upload_url: impl Into<String>) {
        let location = upload_url.into();
        self.by_name
            .entry(filename_key(filename))
            .or_default()
            .push(location.clone());
        self.last = Some(location);
    }

    /// Location of the `index`-th upload created for `filename`.
    #[must_use]
    pub fn get(&self, filename: &str, index: usize) -> Option<&str> {
        self.by_name
            .get(&filename_key(filename))
            .and_then(|locations| locations.get(index))
            .map(String::as_str)
    }

    /// Location of the most recent upload for `filename`.
    #[must_use]
    pub fn latest_for(&self, filename: &str) -> Option<&str> {
        self.by_name
            .get(&filename_key(filename))
            .and_then(|locations| locations.last())
            .map(String::as_str)
    }

    /// Most recently created upload location of any file.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}
