//! Canonical DAV URL prefixes, path escaping and URL clean-up.

use super::{DavError, DavResource, DavVersion};

/// Identifier of the virtual "Shares" space that mounts received shares.
pub const SHARES_SPACE_ID: &str =
    "a0ca6a90-a365-4782-871e-d44447bbc668$a0ca6a90-a365-4782-871e-d44447bbc668";

const REMOTE_PHP_PREFIX: &str = "remote.php/";

/// Characters the HTTP client would otherwise treat as URL syntax.
const ESCAPED_CHARACTERS: [(char, &str); 3] = [('%', "%25"), ('#', "%23"), ('?', "%3F")];

/// A DAV path layout plus the `remote.php/` toggle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DavLayout {
    /// Selected layout.
    pub version: DavVersion,
    /// Whether the `remote.php/` prefix is added.
    pub with_remote_php: bool,
}

impl DavLayout {
    /// Creates a layout.
    #[must_use]
    pub const fn new(version: DavVersion, with_remote_php: bool) -> Self {
        Self {
            version,
            with_remote_php,
        }
    }

    /// Adds `remote.php/` in front of `path` unless disabled.
    #[must_use]
    pub fn prefix_remote_php(&self, path: &str) -> String {
        if self.with_remote_php {
            format!("{REMOTE_PHP_PREFIX}{path}")
        } else {
            path.to_owned()
        }
    }

    /// Returns the DAV prefix for `resource`.
    ///
    /// `id` is the user, file id, space id or public token depending on the
    /// resource and layout. A missing id renders as an empty segment except
    /// where the endpoint cannot work without one.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::MissingId`] for the spaces trash bin without a
    /// space id.
    pub fn path(&self, id: Option<&str>, resource: DavResource) -> Result<String, DavError> {
        let segment = id.unwrap_or_default();
        let path = match resource {
            DavResource::Archive => format!("dav/archive/{segment}/files"),
            DavResource::Versions => format!("dav/meta/{segment}/v"),
            DavResource::Comments => String::from("dav/comments/files"),
            _ => self.layout_path(id, resource)?,
        };
        Ok(self.prefix_remote_php(&path))
    }

    fn layout_path(&self, id: Option<&str>, resource: DavResource) -> Result<String, DavError> {
        let segment = id.unwrap_or_default();
        match self.version {
            DavVersion::Spaces => match (resource, id) {
                (DavResource::TrashBin, None) => Err(DavError::MissingId { resource }),
                (DavResource::TrashBin, Some(space)) => Ok(format!("dav/spaces/trash-bin/{space}")),
                (DavResource::PublicFiles, _) => Ok(format!("dav/public-files/{segment}")),
                (_, None) => Ok(String::from("dav/spaces")),
                (_, Some(space)) => Ok(format!("dav/spaces/{space}")),
            },
            DavVersion::Old | DavVersion::New if resource == DavResource::TrashBin => {
                Ok(format!("dav/trash-bin/{segment}"))
            }
            DavVersion::Old => Ok(String::from("webdav")),
            DavVersion::New => Ok(match resource {
                DavResource::Files => format!("dav/files/{segment}"),
                DavResource::PublicFiles => format!("dav/public-files/{segment}"),
                _ => String::from("dav"),
            }),
        }
    }
}

/// Escapes `%`, `#` and `?` so they survive as part of a path.
#[must_use]
pub fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for ch in path.chars() {
        match ESCAPED_CHARACTERS.iter().find(|(raw, _)| *raw == ch) {
            Some((_, replacement)) => escaped.push_str(replacement),
            None => escaped.push(ch),
        }
    }
    escaped
}

/// Removes doubled slashes that do not follow a scheme separator, and
/// normalises the trailing slash.
#[must_use]
pub fn sanitize_url(url: &str, trailing_slash: bool) -> String {
    let input = if trailing_slash {
        format!("{url}/")
    } else {
        url.trim_end_matches('/').to_owned()
    };

    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch == '/' && output.ends_with('/') {
            let before_slash = output.chars().rev().nth(1);
            if before_slash.is_some_and(|prev| prev != ':') {
                continue;
            }
        }
        output.push(ch);
    }
    output
}

/// Returns true when the URL addresses a WebDAV endpoint (`webdav` or `dav`
/// as a whole word).
#[must_use]
pub fn is_dav_request(url: &str) -> bool {
    url.split(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .any(|word| word == "webdav" || word == "dav")
}
