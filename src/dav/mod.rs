//! WebDAV path layout and request-body shaping.
//!
//! The product exposes three URL layouts for its DAV endpoints (old per-user
//! `webdav`, new `dav/files/<user>`, and space-identifier based
//! `dav/spaces/<id>`). [`DavLayout`] turns a layout, a resource kind and an
//! identifier into exactly one canonical prefix. The [`bodies`] module
//! synthesises the XML envelopes for PROPFIND, PROPPATCH and LOCK.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub mod bodies;
mod paths;

pub use bodies::{
    Depth, NamespacedProperty, lock_body, ocs_style_body, propfind_body, proppatch_body,
    proppatch_remove_body,
};
pub use paths::{DavLayout, SHARES_SPACE_ID, escape_path, is_dav_request, sanitize_url};

/// Selects which URL layout the DAV endpoints expect.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DavVersion {
    /// `remote.php/webdav`.
    Old,
    /// `remote.php/dav/files/<user>`.
    New,
    /// `remote.php/dav/spaces/<space-id>`.
    Spaces,
}

impl DavVersion {
    /// Numeric selector used in configuration.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Old => 1,
            Self::New => 2,
            Self::Spaces => 3,
        }
    }
}

impl TryFrom<u8> for DavVersion {
    type Error = DavError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Old),
            2 => Ok(Self::New),
            3 => Ok(Self::Spaces),
            other => Err(DavError::InvalidVersion(other)),
        }
    }
}

/// Kind of DAV resource addressed by a request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DavResource {
    /// Regular files of a user or space.
    Files,
    /// Files reachable through a public link token.
    PublicFiles,
    /// Trash bin of a user or space.
    TrashBin,
    /// Version history of a file, addressed by file id.
    Versions,
    /// Archive (zip) downloads.
    Archive,
    /// Comments endpoint.
    Comments,
    /// Bare DAV root, used for REPORT requests.
    Root,
}

impl DavResource {
    /// Name used in step text and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::PublicFiles => "public-files",
            Self::TrashBin => "trash-bin",
            Self::Versions => "versions",
            Self::Archive => "archive",
            Self::Comments => "comments",
            Self::Root => "root",
        }
    }
}

impl fmt::Display for DavResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DavResource {
    type Err = DavError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "files" => Ok(Self::Files),
            "public-files" => Ok(Self::PublicFiles),
            "trash-bin" => Ok(Self::TrashBin),
            "versions" => Ok(Self::Versions),
            "archive" => Ok(Self::Archive),
            "comments" => Ok(Self::Comments),
            "root" => Ok(Self::Root),
            other => Err(DavError::UnknownResource(other.to_owned())),
        }
    }
}

/// Errors raised while building DAV paths and bodies.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DavError {
    /// Raised for a layout selector other than 1, 2 or 3.
    #[error("Invalid DAV path: {0}")]
    InvalidVersion(u8),
    /// Raised when an endpoint needs an identifier that was not supplied.
    #[error("Space ID is required for {resource} endpoint")]
    MissingId {
        /// Resource kind that needed the identifier.
        resource: DavResource,
    },
    /// Raised for an unrecognised resource name.
    #[error("unknown DAV resource type '{0}'")]
    UnknownResource(String),
    /// Raised for a PROPFIND depth other than `0`, `1` or `infinity`.
    #[error("Invalid depth value {0}")]
    InvalidDepth(String),
    /// Raised for a namespace declaration not shaped like `prefix='uri'`.
    #[error("invalid namespace declaration '{0}', expected prefix='uri'")]
    InvalidNamespace(String),
}
