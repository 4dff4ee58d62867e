use super::annotation::Annotation;
use super::param::Param;
use crate::registry::Args;
use crate::response::{PostProcessor, Reply};
use crate::router::RouteTarget;
use std::fmt;
use std::sync::Arc;

type HandlerFn = dyn Fn(Args) -> anyhow::Result<Reply> + Send + Sync;

/// A request handler with the metadata captured at registration time.
///
/// The parameter list decides what the binder supplies; the return
/// annotation is the ordered post-processor chain applied to the normalized
/// response.
///
/// ```rust
/// use brrtdispatch::handler::{Annotation, Handler, Param};
///
/// let add = Handler::new("add", |args| {
///     Ok((args.i64("bar")? + args.i64("foo")?).to_string())
/// })
/// .param(Param::new("bar").annotate(Annotation::integer()))
/// .param(Param::new("foo").default(0).annotate(Annotation::integer()));
///
/// assert_eq!(add.name(), "add");
/// assert_eq!(add.params().len(), 2);
/// ```
#[derive(Clone)]
pub struct Handler {
    name: String,
    params: Vec<Param>,
    returns: Vec<PostProcessor>,
    body: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F, R>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Args) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: Vec::new(),
            body: Arc::new(move |args| body(args).map(Into::into)),
        }
    }

    #[must_use]
    pub fn param(mut self, param: impl Into<Param>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Declare `name` with a transform or schema annotation.
    #[must_use]
    pub fn annotated(self, name: &str, annotation: Annotation) -> Self {
        self.param(Param::new(name).annotate(annotation))
    }

    /// Append a post-processor to the return annotation.
    #[must_use]
    pub fn returns(mut self, processor: PostProcessor) -> Self {
        self.returns.push(processor);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    #[must_use]
    pub fn post_processors(&self) -> &[PostProcessor] {
        &self.returns
    }

    /// Run the handler body with bound arguments.
    ///
    /// # Errors
    ///
    /// Whatever the body returns.
    pub fn call(&self, args: Args) -> anyhow::Result<Reply> {
        (self.body)(args)
    }
}

impl RouteTarget for Handler {
    fn route_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}
