//! Loading of the `usernames.json` replacement manifest.

use std::collections::BTreeMap;
use std::io;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;

use super::CredentialError;

/// Concrete values standing in for one symbolic user.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Replacement {
    /// Replacement login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Replacement display name.
    #[serde(default)]
    pub displayname: Option<String>,
    /// Replacement email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Replacement password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Symbolic-to-concrete user mapping for environments that cannot use the
/// default fixture names.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UsernameReplacements {
    entries: BTreeMap<String, Replacement>,
}

impl UsernameReplacements {
    /// Returns an empty mapping; every lookup passes through.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Parse`] when the text is not a JSON object
    /// of replacement records.
    pub fn from_json(source: &str, text: &str) -> Result<Self, CredentialError> {
        let entries: BTreeMap<String, Replacement> =
            serde_json::from_str(text).map_err(|err| CredentialError::Parse {
                path: source.to_owned(),
                message: err.to_string(),
            })?;
        Ok(Self { entries })
    }

    /// Reads and parses the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Manifest`] when the file cannot be read and
    /// [`CredentialError::Parse`] when it is not valid JSON.
    pub fn load(path: &Utf8Path) -> Result<Self, CredentialError> {
        let parent = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = path.file_name().ok_or_else(|| CredentialError::Manifest {
            path: path.to_string(),
            message: String::from("manifest path is missing a filename"),
        })?;
        let io_error = |err: io::Error| CredentialError::Manifest {
            path: path.to_string(),
            message: err.to_string(),
        };
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(io_error)?;
        let text = dir.read_to_string(file_name).map_err(io_error)?;
        Self::from_json(path.as_str(), &text)
    }

    /// Looks a symbolic user up by exact key, then by lowercase key.
    #[must_use]
    pub fn lookup(&self, symbolic: &str) -> Option<&Replacement> {
        self.entries
            .get(symbolic)
            .or_else(|| self.entries.get(&symbolic.to_lowercase()))
    }

    /// Number of mapped users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
