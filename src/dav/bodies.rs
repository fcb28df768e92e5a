//! XML envelopes for PROPFIND, PROPPATCH and LOCK requests.

use super::DavError;

const XML_DECLARATION: &str = r#"<?xml version="1.0"?>"#;
const OC_NAMESPACE: &str = "http://owncloud.org/ns";

/// A property to request, optionally qualified by a namespace declaration
/// of the form `prefix='uri'`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NamespacedProperty {
    /// Namespace declaration such as `x1='http://example.org/ns'`.
    pub namespace: Option<String>,
    /// Property name, optionally prefixed (`oc:fileid`).
    pub property: String,
}

impl NamespacedProperty {
    /// A property without an extra namespace declaration.
    #[must_use]
    pub fn plain(property: impl Into<String>) -> Self {
        Self {
            namespace: None,
            property: property.into(),
        }
    }

    /// A property qualified by `namespace` (`prefix='uri'`).
    #[must_use]
    pub fn qualified(namespace: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            property: property.into(),
        }
    }
}

/// PROPFIND depth header value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Depth {
    /// Only the addressed resource.
    Zero,
    /// The resource and its direct children.
    One,
    /// The whole subtree.
    Infinity,
}

impl Depth {
    /// Parses a step-supplied depth. An empty value means the server
    /// default of `1`.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::InvalidDepth`] for anything other than `0`, `1`,
    /// `infinity` or an empty string.
    pub fn parse(value: &str) -> Result<Self, DavError> {
        match value {
            "0" => Ok(Self::Zero),
            "1" | "" => Ok(Self::One),
            "infinity" => Ok(Self::Infinity),
            other => Err(DavError::InvalidDepth(other.to_owned())),
        }
    }

    /// Header value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "0",
            Self::One => "1",
            Self::Infinity => "infinity",
        }
    }
}

/// Splits `prefix='uri'` into its parts.
fn parse_namespace(declaration: &str) -> Result<(&str, &str), DavError> {
    let invalid = || DavError::InvalidNamespace(declaration.to_owned());
    let (prefix, quoted) = declaration.split_once('=').ok_or_else(invalid)?;
    let uri = quoted
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .ok_or_else(invalid)?;
    Ok((prefix, uri))
}

/// Builds a PROPFIND body. Properties without a prefix use `d:`; a prefix in
/// the property name wins over the one from its namespace declaration.
///
/// # Errors
///
/// Returns [`DavError::InvalidNamespace`] for a malformed declaration.
pub fn propfind_body(properties: &[NamespacedProperty]) -> Result<String, DavError> {
    let mut extra_namespaces = String::new();
    let mut props = String::new();
    for entry in properties {
        let mut prefix = String::from("d");
        if let Some(declaration) = entry.namespace.as_deref() {
            let (ns_prefix, uri) = parse_namespace(declaration)?;
            extra_namespaces.push_str(&format!(r#" xmlns:{ns_prefix}="{uri}""#));
            ns_prefix.clone_into(&mut prefix);
        }
        let name = match entry.property.split_once(':') {
            Some((explicit, name)) => {
                explicit.clone_into(&mut prefix);
                name
            }
            None => entry.property.as_str(),
        };
        props.push_str(&format!("<{prefix}:{name}/>"));
    }
    Ok(format!(
        concat!(
            "{decl}<d:propfind xmlns:d=\"DAV:\" xmlns:oc=\"{oc}\"",
            " xmlns:ocs=\"http://open-collaboration-services.org/ns\"{extra}>",
            "<d:prop>{props}</d:prop></d:propfind>"
        ),
        decl = XML_DECLARATION,
        oc = OC_NAMESPACE,
        extra = extra_namespaces,
        props = props,
    ))
}

/// Builds the single-property body used when probing an endpoint with an
/// arbitrary DAV method. Returns `None` for methods that carry no body and
/// an empty body for an empty property.
#[must_use]
pub fn ocs_style_body(method: &str, property: &str) -> Option<String> {
    if property.is_empty() {
        return Some(String::new());
    }
    match method {
        "PROPFIND" => Some(format!(
            r#"{XML_DECLARATION}<d:propfind xmlns:d="DAV:" xmlns:oc="{OC_NAMESPACE}"><d:prop><{property}/></d:prop></d:propfind>"#
        )),
        "LOCK" => Some(format!(
            "<?xml version='1.0' encoding='UTF-8'?><d:lockinfo xmlns:d='DAV:'> <d:lockscope><{property} /></d:lockscope></d:lockinfo>"
        )),
        "PROPPATCH" => {
            let prop = if property == "favorite" {
                format!(r#"<oc:favorite xmlns:oc="{OC_NAMESPACE}">1</oc:favorite>"#)
            } else {
                property.to_owned()
            };
            Some(format!(
                r#"{XML_DECLARATION}<d:propertyupdate xmlns:d="DAV:" xmlns:oc="{OC_NAMESPACE}"><d:set><d:prop>{prop}</d:prop></d:set></d:propertyupdate>"#
            ))
        }
        _ => None,
    }
}

fn render_property(
    namespace: Option<&str>,
    name: &str,
    value: Option<&str>,
) -> Result<String, DavError> {
    let (open, close) = match namespace {
        Some(declaration) => {
            let (prefix, uri) = parse_namespace(declaration)?;
            let bare = name.split_once(':').map_or(name, |(_, bare)| bare);
            (
                format!(r#"{prefix}:{bare} xmlns:{prefix}="{uri}""#),
                format!("{prefix}:{bare}"),
            )
        }
        None => (name.to_owned(), name.to_owned()),
    };
    Ok(match value {
        Some(text) => format!("<{open}>{text}</{close}>"),
        None => format!("<{open}/>"),
    })
}

/// Builds a PROPPATCH body setting each `(name, value)` pair. With a
/// namespace declaration every property is qualified by it.
///
/// # Errors
///
/// Returns [`DavError::InvalidNamespace`] for a malformed declaration.
pub fn proppatch_body(
    properties: &[(String, String)],
    namespace: Option<&str>,
) -> Result<String, DavError> {
    let mut props = String::new();
    for (name, value) in properties {
        props.push_str(&render_property(namespace, name, Some(value))?);
    }
    Ok(format!(
        r#"{XML_DECLARATION}<d:propertyupdate xmlns:d="DAV:" xmlns:oc="{OC_NAMESPACE}"><d:set><d:prop>{props}</d:prop></d:set></d:propertyupdate>"#
    ))
}

/// Builds a PROPPATCH body removing the named properties.
///
/// # Errors
///
/// Returns [`DavError::InvalidNamespace`] for a malformed declaration.
pub fn proppatch_remove_body(
    properties: &[String],
    namespace: Option<&str>,
) -> Result<String, DavError> {
    let mut props = String::new();
    for name in properties {
        props.push_str(&render_property(namespace, name, None)?);
    }
    Ok(format!(
        r#"{XML_DECLARATION}<d:propertyupdate xmlns:d="DAV:" xmlns:oc="{OC_NAMESPACE}"><d:remove><d:prop>{props}</d:prop></d:remove></d:propertyupdate>"#
    ))
}

/// Builds a LOCK body from `(property, value)` rows. A `timeout` row becomes
/// the `Timeout` header instead of XML.
#[must_use]
pub fn lock_body(rows: &[(String, String)]) -> (String, Vec<(String, String)>) {
    let mut body = String::from("<?xml version='1.0' encoding='UTF-8'?><d:lockinfo xmlns:d='DAV:'> ");
    let mut headers = Vec::new();
    for (property, value) in rows {
        if property == "timeout" {
            headers.push((String::from("Timeout"), value.clone()));
        } else {
            body.push_str(&format!("<d:{property}><d:{value}/></d:{property}>"));
        }
    }
    body.push_str("</d:lockinfo>");
    (body, headers)
}
