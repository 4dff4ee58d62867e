use super::annotation::Annotation;
use serde_json::Value;

/// One declared parameter of a handler, factory or listener.
///
/// Captured once at registration time: the name used for lookup, an optional
/// default, and an optional annotation.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    default: Option<Value>,
    annotation: Option<Annotation>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            annotation: None,
        }
    }

    /// Value used when no source supplies the parameter.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Shorthand for `annotate(Annotation::schema(..))`.
    #[must_use]
    pub fn schema(self, definition: Value) -> Self {
        self.annotate(Annotation::schema(definition))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }
}

impl From<&str> for Param {
    fn from(name: &str) -> Self {
        Param::new(name)
    }
}

impl From<String> for Param {
    fn from(name: String) -> Self {
        Param::new(name)
    }
}
