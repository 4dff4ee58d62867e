use super::reply::{Body, Reply};
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum inline headers before heap allocation.
/// Most responses carry ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Ordered header storage shared by requests and responses.
///
/// Names are compared case-insensitively; insertion order is kept so
/// responses are emitted in the order handlers set them.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Case-insensitive lookup in a [`HeaderVec`].
#[inline]
#[must_use]
pub fn find_header<'a>(headers: &'a HeaderVec, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// The canonical `{body, code, headers}` record a dispatch works on.
///
/// Mutated only within one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    pub body: Body,
    pub code: u16,
    pub headers: HeaderVec,
}

impl Default for ResponseRecord {
    fn default() -> Self {
        Self {
            body: Body::Empty,
            code: 200,
            headers: HeaderVec::new(),
        }
    }
}

impl ResponseRecord {
    #[must_use]
    pub fn new(code: u16, body: Body) -> Self {
        Self {
            body,
            code,
            headers: HeaderVec::new(),
        }
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Add or replace a header, keeping a single entry for `name`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            slot.1 = value;
            return;
        }
        self.headers.push((Arc::from(name), value));
    }

    /// Add a header even if one with the same name exists (`Set-Cookie`).
    pub fn append_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((Arc::from(name), value.into()));
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Apply a reply on top of this record.
    ///
    /// A body in the reply overwrites the body, a status overwrites the code,
    /// headers are merged. Parts the reply does not mention stay untouched.
    pub fn apply(&mut self, reply: Reply) {
        match reply {
            Reply::Body(body) => self.body = body,
            Reply::Status(code) => self.code = code,
            Reply::Header(name, value) => self.set_header(&name, value),
            Reply::Composite(parts) => {
                for part in parts {
                    self.apply(part);
                }
            }
        }
    }
}

/// Turn a handler's reply into a fresh record (200, empty body, no headers).
#[must_use]
pub fn normalize(reply: Reply) -> ResponseRecord {
    let mut record = ResponseRecord::default();
    record.apply(reply);
    record
}

/// The wire-level result of a dispatch, ready for a transport to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Get a header by name (case-insensitive per RFC 7230)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a repeatable header, in emission order.
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, lossily.
    #[must_use]
    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// `"200 OK"`.
    #[must_use]
    pub fn status_line(&self) -> String {
        format!("{} {}", self.status, self.reason)
    }
}
