//! Requests to be presigned.

use chrono::{DateTime, Utc};

use crate::DEFAULT_EXPIRES;

/// HTTP method of a presigned request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read an object.
    Get,
    /// Upload an object.
    Put,
    /// Remove an object.
    Delete,
}

impl Method {
    /// The HTTP verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Everything needed to sign one S3 request.
///
/// The signing time is captured up front so that the `X-Amz-Date` on the URL
/// and the expiry reported to callers are derived from the same instant.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    key: String,
    expires: u64,
    time: DateTime<Utc>,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
}

impl Request {
    /// Create a request for `key` signed at `time`.
    pub fn new(method: Method, key: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            method,
            key: key.into(),
            expires: DEFAULT_EXPIRES,
            time,
            params: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(key: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self::new(Method::Get, key, time)
    }

    /// Shorthand for a PUT request.
    pub fn put(key: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self::new(Method::Put, key, time)
    }

    /// Shorthand for a DELETE request.
    pub fn delete(key: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self::new(Method::Delete, key, time)
    }

    /// Set the URL lifetime in seconds.
    pub fn with_expires(mut self, seconds: u64) -> Self {
        self.expires = seconds;
        self
    }

    /// Add a query parameter that becomes part of the signature.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Add a header that the client must send verbatim.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The object key (path inside the bucket, without leading slash).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// URL lifetime in seconds.
    pub fn expires(&self) -> u64 {
        self.expires
    }

    /// The signing time.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Extra signed query parameters.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Extra signed headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}
