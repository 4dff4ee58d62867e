//! Per-parameter annotations: schema validation or value transformation.
//!
//! Annotating a parameter also marks it as a required, request-supplied
//! input: when nothing binds it the client gets a 400 instead of a 500.

use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Compiled-once JSON Schema.
///
/// The schema is compiled lazily on first use and the outcome (validator or
/// compile error) is shared by every clone, so a broken schema is reported on
/// each request that reaches it without being recompiled.
#[derive(Clone)]
pub struct Schema {
    definition: Arc<Value>,
    compiled: Arc<OnceLock<Result<jsonschema::Validator, String>>>,
}

/// Outcome of validating one value against a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaCheck {
    Valid,
    /// The value does not satisfy the schema; carries the validator's message.
    Invalid(String),
    /// The schema itself does not compile.
    BrokenSchema(String),
}

impl Schema {
    #[must_use]
    pub fn new(definition: Value) -> Self {
        Self {
            definition: Arc::new(definition),
            compiled: Arc::new(OnceLock::new()),
        }
    }

    #[must_use]
    pub fn definition(&self) -> &Value {
        &self.definition
    }

    /// Validate `value`, compiling the schema on first use.
    #[must_use]
    pub fn check(&self, value: &Value) -> SchemaCheck {
        let compiled = self.compiled.get_or_init(|| {
            debug!(schema = %self.definition, "Compiling parameter schema");
            jsonschema::validator_for(&self.definition).map_err(|e| e.to_string())
        });
        match compiled {
            Err(message) => SchemaCheck::BrokenSchema(message.clone()),
            Ok(validator) => match validator.iter_errors(value).next() {
                None => SchemaCheck::Valid,
                Some(error) => SchemaCheck::Invalid(error.to_string()),
            },
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schema").field(&self.definition).finish()
    }
}

type TransformFn = dyn Fn(Value) -> anyhow::Result<Value> + Send + Sync;

/// A coercion applied to a bound value; its output replaces the value.
#[derive(Clone)]
pub struct Transform {
    label: &'static str,
    apply: Arc<TransformFn>,
}

impl Transform {
    pub fn new<F>(label: &'static str, apply: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            label,
            apply: Arc::new(apply),
        }
    }

    /// Parse strings as `i64`; integral numbers pass through.
    #[must_use]
    pub fn integer() -> Self {
        Self::new("integer", |value| match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
            Value::String(s) => {
                let parsed: i64 = s
                    .trim()
                    .parse()
                    .map_err(|e| anyhow::anyhow!("invalid integer '{s}': {e}"))?;
                Ok(Value::from(parsed))
            }
            Value::Bool(b) => Ok(Value::from(i64::from(b))),
            other => Err(anyhow::anyhow!("cannot convert {other} to an integer")),
        })
    }

    /// Parse strings as `f64`; numbers pass through.
    #[must_use]
    pub fn number() -> Self {
        Self::new("number", |value| match value {
            Value::Number(n) => Ok(Value::Number(n)),
            Value::String(s) => {
                let parsed: f64 = s
                    .trim()
                    .parse()
                    .map_err(|e| anyhow::anyhow!("invalid number '{s}': {e}"))?;
                serde_json::Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(|| anyhow::anyhow!("number '{s}' is not finite"))
            }
            other => Err(anyhow::anyhow!("cannot convert {other} to a number")),
        })
    }

    /// Render any value as a string (strings pass through unchanged).
    #[must_use]
    pub fn string() -> Self {
        Self::new("string", |value| match value {
            Value::String(s) => Ok(Value::String(s)),
            Value::Null => Ok(Value::String(String::new())),
            other => Ok(Value::String(other.to_string())),
        })
    }

    /// Accept `true/false/1/0/yes/no/on/off` (case-insensitive).
    #[must_use]
    pub fn boolean() -> Self {
        Self::new("boolean", |value| match value {
            Value::Bool(b) => Ok(Value::Bool(b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" | "" => Ok(Value::Bool(false)),
                _ => Err(anyhow::anyhow!("invalid boolean '{s}'")),
            },
            Value::Number(n) => Ok(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
            other => Err(anyhow::anyhow!("cannot convert {other} to a boolean")),
        })
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// # Errors
    ///
    /// Whatever the transform raises; callers treat it as a handler failure.
    pub fn apply(&self, value: Value) -> anyhow::Result<Value> {
        (self.apply)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transform({})", self.label)
    }
}

/// What a handler declares about one of its parameters.
#[derive(Debug, Clone)]
pub enum Annotation {
    /// Validate only; the bound value passes through unchanged.
    Schema(Schema),
    /// Coerce; the transform's output replaces the bound value.
    Transform(Transform),
}

impl Annotation {
    #[must_use]
    pub fn schema(definition: Value) -> Self {
        Annotation::Schema(Schema::new(definition))
    }

    pub fn transform<F>(label: &'static str, apply: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Annotation::Transform(Transform::new(label, apply))
    }

    #[must_use]
    pub fn integer() -> Self {
        Annotation::Transform(Transform::integer())
    }

    #[must_use]
    pub fn number() -> Self {
        Annotation::Transform(Transform::number())
    }

    #[must_use]
    pub fn string() -> Self {
        Annotation::Transform(Transform::string())
    }

    #[must_use]
    pub fn boolean() -> Self {
        Annotation::Transform(Transform::boolean())
    }
}
