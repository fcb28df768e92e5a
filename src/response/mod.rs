//! The last response of a scenario and the status codes accumulated by
//! table-driven steps.

use serde_json::Value;

/// Sentinel stored when a body carries no OCS status code.
pub const OCS_STATUS_NOT_SET: &str = "notset";

/// A received HTTP response with its body fully read.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Headers in received order; names may repeat.
    pub headers: Vec<(String, String)>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with a text body and no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into().into_bytes(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of header `name`, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value of header `name`, case-insensitively.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Body decoded as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body decoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the body is not JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Whether the status is 400 or above.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.status >= 400
    }
}

/// Reads the OCS status code, trying the JSON envelope before the XML one.
#[must_use]
pub fn ocs_status_code(response: &HttpResponse) -> Option<String> {
    if let Ok(document) = response.json()
        && let Some(code) = document
            .get("ocs")
            .and_then(|ocs| ocs.get("meta"))
            .and_then(|meta| meta.get("statuscode"))
    {
        return Some(match code {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        });
    }
    let text = response.text();
    let document = roxmltree::Document::parse(&text).ok()?;
    document
        .root_element()
        .children()
        .find(|node| node.has_tag_name("meta"))?
        .children()
        .find(|node| node.has_tag_name("statuscode"))
        .and_then(|node| node.text())
        .map(|code| code.trim().to_owned())
}

/// Holds the last response and the status-code accumulators.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResponseRecorder {
    last: Option<HttpResponse>,
    owner: Option<String>,
    http_status_codes: Vec<String>,
    ocs_status_codes: Vec<String>,
}

impl ResponseRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `response` as the last one, owned by `owner`.
    pub fn set(&mut self, response: HttpResponse, owner: Option<&str>) {
        self.last = Some(response);
        self.owner = owner.map(str::to_owned);
    }

    /// The last response, if any request was made.
    #[must_use]
    pub const fn get(&self) -> Option<&HttpResponse> {
        self.last.as_ref()
    }

    /// User who made the last request.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Appends the HTTP code and the OCS code (or `notset`) of `response`.
    pub fn push_status_codes(&mut self, response: &HttpResponse) {
        self.http_status_codes.push(response.status.to_string());
        self.ocs_status_codes.push(
            ocs_status_code(response).unwrap_or_else(|| OCS_STATUS_NOT_SET.to_owned()),
        );
    }

    /// Appends `notset` to both lists for a request that got no response,
    /// keeping one entry per sent request.
    pub fn push_unanswered(&mut self) {
        self.http_status_codes.push(OCS_STATUS_NOT_SET.to_owned());
        self.ocs_status_codes.push(OCS_STATUS_NOT_SET.to_owned());
    }

    /// Accumulated HTTP codes.
    #[must_use]
    pub fn http_status_codes(&self) -> &[String] {
        &self.http_status_codes
    }

    /// Accumulated OCS codes.
    #[must_use]
    pub fn ocs_status_codes(&self) -> &[String] {
        &self.ocs_status_codes
    }

    /// Clears the HTTP accumulator.
    pub fn clear_http_status_codes(&mut self) {
        self.http_status_codes.clear();
    }

    /// Clears the OCS accumulator.
    pub fn clear_ocs_status_codes(&mut self) {
        self.ocs_status_codes.clear();
    }

    /// Clears both accumulators.
    pub fn clear_status_codes(&mut self) {
        self.clear_http_status_codes();
        self.clear_ocs_status_codes();
    }
}

#[cfg(test)]
mod tests;
