//! Pre-parsed request consumed by the dispatcher.
//!
//! Network parsing belongs to the transport; it hands over method, target,
//! headers and the raw body, and this type splits the query string off the
//! target and decodes the body on demand.

use crate::dispatcher::HttpError;
use crate::multipart::{self, FormData, Uploads};
use crate::response::{find_header, HeaderVec};
use http::Method;
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One incoming request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path without the query string
    pub path: String,
    /// Decoded query parameters; for repeated keys the last value wins
    pub query: Map<String, Value>,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl Request {
    /// Build a request from a target such as `/test/200?foo=1`. The path is
    /// percent-decoded, so captures reach handlers decoded.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method,
            path,
            query,
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    #[must_use]
    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body with a matching content type.
    #[must_use]
    pub fn with_json(self, value: &Value) -> Self {
        self.with_header("Content-Type", "application/json")
            .with_body(value.to_string())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Media type of the body without parameters, lowercased.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Decode the body according to its content type.
    ///
    /// - empty body: `null`
    /// - `application/json`: the parsed document
    /// - `application/x-www-form-urlencoded`: an object of strings
    /// - `multipart/form-data`: an object of the plain fields; files are
    ///   in [`Request::uploads`]
    /// - anything else: the body as a string
    ///
    /// # Errors
    ///
    /// A 400 [`HttpError`] for malformed JSON or multipart bodies.
    pub fn parsed_body(&self) -> anyhow::Result<Value> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }
        match self.content_type().as_deref() {
            Some("application/json") => serde_json::from_slice(&self.body).map_err(|e| {
                HttpError::bad_request(format!("malformed JSON body: {e}")).into()
            }),
            Some("application/x-www-form-urlencoded") => Ok(Value::Object(decode_form(&self.body))),
            Some("multipart/form-data") => Ok(Value::Object(self.form_data()?.fields)),
            _ => Ok(Value::String(
                String::from_utf8_lossy(&self.body).into_owned(),
            )),
        }
    }

    /// Files of a `multipart/form-data` body; empty for any other body.
    ///
    /// # Errors
    ///
    /// A 400 [`HttpError`] for a malformed multipart body.
    pub fn uploads(&self) -> anyhow::Result<Uploads> {
        if self.body.is_empty() || self.content_type().as_deref() != Some("multipart/form-data") {
            return Ok(Uploads::default());
        }
        Ok(self.form_data()?.uploads)
    }

    fn form_data(&self) -> anyhow::Result<FormData> {
        multipart::parse(self.header("content-type").unwrap_or_default(), &self.body)
    }

    /// Headers as a JSON object with lowercased names.
    #[must_use]
    pub fn headers_object(&self) -> Value {
        Value::Object(
            self.headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), Value::String(v.clone())))
                .collect(),
        )
    }
}

/// Split off the query string and percent-decode the path.
fn split_target(target: &str) -> (String, Map<String, Value>) {
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, decode_form(query.as_bytes())),
        None => (target, Map::new()),
    };
    let path = percent_decode_str(path).decode_utf8_lossy().into_owned();
    (path, query)
}

fn decode_form(input: &[u8]) -> Map<String, Value> {
    url::form_urlencoded::parse(input)
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect()
}
