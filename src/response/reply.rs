use serde_json::Value;
use std::time::SystemTime;

/// A response body before serialization.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    /// Structured data; serialized to JSON when the response is finalized
    Data(Value),
}

impl Body {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Text(s) => s.is_empty(),
            Body::Bytes(b) => b.is_empty(),
            Body::Data(_) => false,
        }
    }

    /// JSON view of the body, as handed to post-processors and templates.
    ///
    /// Bytes are decoded lossily.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Body::Empty => Value::Null,
            Body::Text(s) => Value::String(s.clone()),
            Body::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            Body::Data(v) => v.clone(),
        }
    }

    /// Raw bytes as they will be sent, with the content type they imply.
    ///
    /// `None` for the content type means "whatever the application default is".
    #[must_use]
    pub fn to_bytes(&self) -> (Vec<u8>, Option<&'static str>) {
        match self {
            Body::Empty => (Vec::new(), None),
            Body::Text(s) => (s.as_bytes().to_vec(), None),
            Body::Bytes(b) => (b.clone(), None),
            Body::Data(v) => (
                serde_json::to_vec(v).unwrap_or_default(),
                Some("application/json; charset=utf-8"),
            ),
        }
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Bytes(b)
    }
}

impl From<Value> for Body {
    fn from(v: Value) -> Self {
        Body::Data(v)
    }
}

/// What a handler returns.
///
/// A bare body, a bare status code, a single header, or any mix of them. In a
/// [`Reply::Composite`] the last body and the last status win; headers are
/// merged in order, a later value replacing an earlier one of the same name.
///
/// ```rust
/// use brrtdispatch::response::Reply;
///
/// let reply = Reply::from("created")
///     .with_status(201)
///     .with_header("Location", "/items/7");
/// assert!(matches!(reply, Reply::Composite(ref parts) if parts.len() == 3));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Body(Body),
    Status(u16),
    Header(String, String),
    Composite(Vec<Reply>),
}

impl Reply {
    /// An empty composite: 200 with no body.
    #[must_use]
    pub fn empty() -> Self {
        Reply::Composite(Vec::new())
    }

    pub fn body(body: impl Into<Body>) -> Self {
        Reply::Body(body.into())
    }

    #[must_use]
    pub fn status(code: u16) -> Self {
        Reply::Status(code)
    }

    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Reply::Header(name.into(), value.into())
    }

    /// Structured body, serialized as JSON.
    pub fn json(value: impl Into<Value>) -> Self {
        Reply::Body(Body::Data(value.into()))
    }

    /// A `Last-Modified` header in HTTP date format.
    #[must_use]
    pub fn last_modified(at: SystemTime) -> Self {
        Reply::Header("Last-Modified".to_string(), httpdate::fmt_http_date(at))
    }

    /// Append `other`, flattening into one composite.
    #[must_use]
    pub fn with(self, other: impl Into<Reply>) -> Self {
        let mut parts = match self {
            Reply::Composite(parts) => parts,
            single => vec![single],
        };
        parts.push(other.into());
        Reply::Composite(parts)
    }

    #[must_use]
    pub fn with_status(self, code: u16) -> Self {
        self.with(Reply::Status(code))
    }

    #[must_use]
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(Reply::header(name, value))
    }
}

impl From<Body> for Reply {
    fn from(body: Body) -> Self {
        Reply::Body(body)
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Body(Body::from(s))
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Body(Body::from(s))
    }
}

impl From<Vec<u8>> for Reply {
    fn from(b: Vec<u8>) -> Self {
        Reply::Body(Body::Bytes(b))
    }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        Reply::Body(Body::Data(v))
    }
}

/// A bare integer is a status code with an empty body.
impl From<u16> for Reply {
    fn from(code: u16) -> Self {
        Reply::Status(code)
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Reply::empty()
    }
}

impl From<Vec<Reply>> for Reply {
    fn from(parts: Vec<Reply>) -> Self {
        Reply::Composite(parts)
    }
}

/// Redirect to `url`: 301 when `permanent`, 302 otherwise.
pub fn redirect(url: impl Into<String>, permanent: bool) -> Reply {
    let code = if permanent { 301 } else { 302 };
    Reply::Composite(vec![
        Reply::Status(code),
        Reply::Header("Location".to_string(), url.into()),
    ])
}
