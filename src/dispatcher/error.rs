use crate::registry::RegistryError;
use std::fmt;

/// An error user code returns to choose the response status.
///
/// Handlers, transforms, factories and post-processors may return it (or
/// wrap it with `anyhow` context); the dispatcher finds it anywhere in the
/// cause chain and answers with `status` and `message`.
///
/// ```rust
/// use brrtdispatch::dispatcher::HttpError;
///
/// let err: anyhow::Error = HttpError::not_found("no such pet").into();
/// assert_eq!(err.downcast_ref::<HttpError>().map(|e| e.status), Some(404));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: u16,
    pub message: String,
}

impl HttpError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Everything that can end a dispatch early.
///
/// Each kind maps to a fixed status; see [`DispatchError::status`].
#[derive(Debug)]
pub enum DispatchError {
    /// No bucket/verb/matcher combination accepted the request
    RouteNotFound { method: String, path: String },
    /// An annotated parameter was not supplied by the request
    MissingRequiredParameter { name: String },
    /// A bound value failed its schema
    SchemaValidationFailed { name: String, message: String },
    /// A parameter's schema does not compile
    SchemaDefinitionInvalid { name: String, message: String },
    /// A handler parameter nothing can supply
    UnresolvableParameter { handler: String, name: String },
    /// A schema or transform annotation on a parameter bound to an opaque
    /// dependency instance
    InvalidAnnotation { name: String },
    /// Dependency resolution failed
    Dependency(RegistryError),
    /// User code raised [`HttpError`]
    Http(HttpError),
    /// Anything else raised by a handler, transform or post-processor,
    /// including panics
    UncaughtHandlerFailure(anyhow::Error),
    /// The response code has no entry in the status table
    UnknownStatus { code: u16 },
}

impl DispatchError {
    /// Classify a failure raised by user code.
    ///
    /// An [`HttpError`] anywhere in the chain wins; a top-level
    /// [`RegistryError`] stays a dependency failure; anything else is an
    /// uncaught handler failure.
    #[must_use]
    pub fn from_failure(err: anyhow::Error) -> Self {
        let http = err
            .downcast_ref::<HttpError>()
            .or_else(|| err.chain().find_map(|e| e.downcast_ref::<HttpError>()));
        if let Some(http) = http {
            return DispatchError::Http(http.clone());
        }
        match err.downcast::<RegistryError>() {
            Ok(registry) => DispatchError::Dependency(registry),
            Err(err) => DispatchError::UncaughtHandlerFailure(err),
        }
    }

    /// Classify a dependency resolution failure.
    #[must_use]
    pub fn from_registry(err: RegistryError) -> Self {
        Self::from_failure(anyhow::Error::from(err))
    }

    /// The status this error surfaces as.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::RouteNotFound { .. } => 404,
            DispatchError::MissingRequiredParameter { .. }
            | DispatchError::SchemaValidationFailed { .. } => 400,
            DispatchError::Http(http) => http.status,
            DispatchError::SchemaDefinitionInvalid { .. }
            | DispatchError::UnresolvableParameter { .. }
            | DispatchError::InvalidAnnotation { .. }
            | DispatchError::Dependency(_)
            | DispatchError::UncaughtHandlerFailure(_)
            | DispatchError::UnknownStatus { .. } => 500,
        }
    }

    /// Stable snake_case tag for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::RouteNotFound { .. } => "route_not_found",
            DispatchError::MissingRequiredParameter { .. } => "missing_required_parameter",
            DispatchError::SchemaValidationFailed { .. } => "schema_validation_failed",
            DispatchError::SchemaDefinitionInvalid { .. } => "schema_definition_invalid",
            DispatchError::UnresolvableParameter { .. } => "unresolvable_parameter",
            DispatchError::InvalidAnnotation { .. } => "invalid_annotation",
            DispatchError::Dependency(inner) => inner.kind(),
            DispatchError::Http(_) => "http_error",
            DispatchError::UncaughtHandlerFailure(_) => "uncaught_handler_failure",
            DispatchError::UnknownStatus { .. } => "unknown_status",
        }
    }

    /// True for client-caused failures (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::RouteNotFound { method, path } => {
                write!(f, "no route for {method} {path}")
            }
            DispatchError::MissingRequiredParameter { name } => write!(f, "{name} is required"),
            DispatchError::SchemaValidationFailed { message, .. } => f.write_str(message),
            DispatchError::SchemaDefinitionInvalid { name, message } => {
                write!(f, "invalid schema for parameter '{name}': {message}")
            }
            DispatchError::UnresolvableParameter { handler, name } => {
                write!(f, "{name} is required by {handler} but nothing can supply it")
            }
            DispatchError::InvalidAnnotation { name } => {
                write!(
                    f,
                    "parameter '{name}' is annotated but bound to a dependency instance"
                )
            }
            DispatchError::Dependency(_) => f.write_str("dependency resolution failed"),
            DispatchError::Http(http) => write!(f, "{http}"),
            DispatchError::UncaughtHandlerFailure(inner) => write!(f, "{inner:#}"),
            DispatchError::UnknownStatus { code } => write!(f, "unknown status code {code}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Dependency(inner) => Some(inner),
            _ => None,
        }
    }
}
