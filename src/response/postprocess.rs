use super::record::ResponseRecord;
use super::reply::{Body, Reply};
use crate::registry::{invoke, Arg, Callable, ParamSource, Registry};
use crate::templates::Templates;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

type BodyFn = dyn Fn(Body) -> anyhow::Result<Body> + Send + Sync;

/// One step of a handler's return annotation.
///
/// Handlers declare an ordered list of these; an empty list leaves the
/// normalized response alone.
#[derive(Clone)]
pub enum PostProcessor {
    /// Receives only the body and replaces it.
    Body {
        label: &'static str,
        apply: Arc<BodyFn>,
    },
    /// Runs through the invoker against the response so far, then the
    /// registry. The returned [`Reply`] overwrites the body and code it
    /// mentions and merges its headers.
    ///
    /// Parameter names offered by the response: `body`, `code`, `headers`
    /// and `response` (a [`ResponseRecord`] snapshot).
    Invoke(Callable<Reply>),
}

impl PostProcessor {
    pub fn body<F>(label: &'static str, apply: F) -> Self
    where
        F: Fn(Body) -> anyhow::Result<Body> + Send + Sync + 'static,
    {
        PostProcessor::Body {
            label,
            apply: Arc::new(apply),
        }
    }

    #[must_use]
    pub fn invoke(callable: Callable<Reply>) -> Self {
        PostProcessor::Invoke(callable)
    }

    /// Strong `ETag` computed from the serialized body (SHA-256).
    #[must_use]
    pub fn etag() -> Self {
        PostProcessor::Invoke(
            Callable::new("etag", |args| {
                let record = args.dependency::<ResponseRecord>("response")?;
                let (bytes, _) = record.body.to_bytes();
                if bytes.is_empty() {
                    return Ok(Reply::empty());
                }
                let digest = Sha256::digest(&bytes);
                Ok(Reply::header("ETag", format!("\"{digest:x}\"")))
            })
            .param("response"),
        )
    }

    /// Force a JSON body: text becomes a JSON string, empty becomes `null`.
    #[must_use]
    pub fn json() -> Self {
        PostProcessor::body("json", |body| match body {
            Body::Data(value) => Ok(Body::Data(value)),
            Body::Empty => Ok(Body::Data(Value::Null)),
            Body::Text(text) => Ok(Body::Data(Value::String(text))),
            Body::Bytes(bytes) => String::from_utf8(bytes)
                .map(|text| Body::Data(Value::String(text)))
                .map_err(|e| anyhow::anyhow!("binary body cannot be sent as JSON: {e}")),
        })
    }

    /// Render the template `name` with the body as its context.
    ///
    /// Needs the `templates` dependency.
    pub fn render(name: impl Into<String>) -> Self {
        let name = name.into();
        PostProcessor::Invoke(
            Callable::new(format!("render:{name}"), move |args| {
                let templates = args.dependency::<Templates>("templates")?;
                let html = templates.render(&name, args.value("body")?)?;
                Ok(Reply::body(html))
            })
            .param("body")
            .param("templates"),
        )
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            PostProcessor::Body { label, .. } => *label,
            PostProcessor::Invoke(callable) => callable.name(),
        }
    }

    /// Apply this step to `record`.
    ///
    /// # Errors
    ///
    /// Whatever the processor raises, including a missing parameter.
    pub fn apply(&self, record: &mut ResponseRecord, registry: &mut Registry) -> anyhow::Result<()> {
        match self {
            PostProcessor::Body { apply, .. } => {
                let body = std::mem::take(&mut record.body);
                record.body = apply(body)?;
            }
            PostProcessor::Invoke(callable) => {
                let reply = {
                    let mut view = ResponseView { record: &*record };
                    invoke(callable, &mut [&mut view, registry])?
                };
                record.apply(reply);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PostProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostProcessor::Body { label, .. } => write!(f, "PostProcessor::Body({label})"),
            PostProcessor::Invoke(callable) => {
                f.debug_tuple("PostProcessor::Invoke").field(callable).finish()
            }
        }
    }
}

/// The response so far, as a parameter source.
struct ResponseView<'a> {
    record: &'a ResponseRecord,
}

impl ParamSource for ResponseView<'_> {
    fn provide(&mut self, name: &str) -> Option<anyhow::Result<Arg>> {
        let arg = match name {
            "body" => Arg::Value(self.record.body.to_value()),
            "code" => Arg::Value(Value::from(self.record.code)),
            "headers" => Arg::Value(Value::Object(
                self.record
                    .headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
                    .collect::<Map<String, Value>>(),
            )),
            "response" => Arg::Instance(Arc::new(self.record.clone())),
            _ => return None,
        };
        Some(Ok(arg))
    }
}
