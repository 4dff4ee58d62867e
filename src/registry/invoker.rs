//! Generic call mechanism shared by dependency factories, event listeners and
//! post-processors.
//!
//! A [`Callable`] declares its parameters up front. [`invoke`] fills each one
//! from the first [`ParamSource`] that offers the name, then from the
//! parameter's declared default, and otherwise fails with
//! [`MissingParameter`]. Explicit sources always beat defaults.

use crate::handler::Param;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A resolved dependency: any shareable value.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// One bound argument.
#[derive(Debug, Clone)]
pub enum Arg {
    /// Plain data: request captures, query values, defaults, JSON dependencies
    Value(Value),
    /// An opaque dependency instance
    Instance(Instance),
}

impl Arg {
    /// Unwrap JSON-valued instances into [`Arg::Value`] so annotations can
    /// validate and transform them like request data.
    #[must_use]
    pub fn from_instance(instance: Instance) -> Self {
        match instance.downcast::<Value>() {
            Ok(value) => Arg::Value((*value).clone()),
            Err(other) => Arg::Instance(other),
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(v) => Some(v),
            Arg::Instance(_) => None,
        }
    }
}

/// Ordered, named arguments handed to a callable.
#[derive(Debug, Clone, Default)]
pub struct Args {
    entries: Vec<(String, Arg)>,
}

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append or replace `name`, keeping its original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, arg: Arg) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = arg,
            None => self.entries.push((name, arg)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, arg)| arg)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Argument names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The JSON value bound to `name`.
    ///
    /// # Errors
    ///
    /// Fails when `name` is absent or bound to an opaque instance.
    pub fn value(&self, name: &str) -> anyhow::Result<&Value> {
        match self.get(name) {
            Some(Arg::Value(v)) => Ok(v),
            Some(Arg::Instance(_)) => Err(anyhow::anyhow!(
                "argument `{name}` is a dependency instance, not a value"
            )),
            None => Err(anyhow::anyhow!("argument `{name}` was not bound")),
        }
    }

    /// The string bound to `name`.
    ///
    /// # Errors
    ///
    /// Fails when `name` is absent or not a JSON string.
    pub fn str(&self, name: &str) -> anyhow::Result<&str> {
        self.value(name)?
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("argument `{name}` is not a string"))
    }

    /// The integer bound to `name`.
    ///
    /// # Errors
    ///
    /// Fails when `name` is absent or not an integral JSON number.
    pub fn i64(&self, name: &str) -> anyhow::Result<i64> {
        self.value(name)?
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("argument `{name}` is not an integer"))
    }

    /// Deserialize the value bound to `name`.
    ///
    /// # Errors
    ///
    /// Fails when `name` is absent or does not deserialize into `T`.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self.value(name)?.clone();
        serde_json::from_value(value)
            .map_err(|e| anyhow::anyhow!("argument `{name}` has the wrong shape: {e}"))
    }

    /// The dependency instance bound to `name`, downcast to `T`.
    ///
    /// JSON-valued dependencies are unwrapped into values at binding time;
    /// ask for them with [`Args::value`] instead.
    ///
    /// # Errors
    ///
    /// Fails when `name` is absent or holds a different type.
    pub fn dependency<T: Any + Send + Sync>(&self, name: &str) -> anyhow::Result<Arc<T>> {
        match self.get(name) {
            Some(Arg::Instance(instance)) => Arc::clone(instance).downcast::<T>().map_err(|_| {
                anyhow::anyhow!(
                    "argument `{name}` is not a {}",
                    std::any::type_name::<T>()
                )
            }),
            Some(Arg::Value(_)) => Err(anyhow::anyhow!(
                "argument `{name}` is a value, not a dependency instance"
            )),
            None => Err(anyhow::anyhow!("argument `{name}` was not bound")),
        }
    }
}

/// Something parameters can be looked up in, by key or by attribute.
pub trait ParamSource {
    /// `None` when this source does not know `name`; `Some(Err)` when it
    /// knows the name but producing the value failed.
    fn provide(&mut self, name: &str) -> Option<anyhow::Result<Arg>>;
}

impl ParamSource for Map<String, Value> {
    fn provide(&mut self, name: &str) -> Option<anyhow::Result<Arg>> {
        self.get(name).cloned().map(|v| Ok(Arg::Value(v)))
    }
}

impl ParamSource for HashMap<String, Value> {
    fn provide(&mut self, name: &str) -> Option<anyhow::Result<Arg>> {
        self.get(name).cloned().map(|v| Ok(Arg::Value(v)))
    }
}

impl ParamSource for Args {
    fn provide(&mut self, name: &str) -> Option<anyhow::Result<Arg>> {
        self.get(name).cloned().map(Ok)
    }
}

/// Raised by [`invoke`] when a declared parameter has no source and no default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingParameter {
    pub callable: String,
    pub name: String,
}

impl fmt::Display for MissingParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is required by {}", self.name, self.callable)
    }
}

impl std::error::Error for MissingParameter {}

type CallableFn<R> = dyn Fn(Args) -> anyhow::Result<R> + Send + Sync;

/// A function plus the parameter list it declares.
pub struct Callable<R> {
    name: String,
    params: Vec<Param>,
    body: Arc<CallableFn<R>>,
}

impl<R> Clone for Callable<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            params: self.params.clone(),
            body: Arc::clone(&self.body),
        }
    }
}

impl<R> fmt::Debug for Callable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl<R> Callable<R> {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Args) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: Vec::new(),
            body: Arc::new(body),
        }
    }

    #[must_use]
    pub fn param(mut self, param: impl Into<Param>) -> Self {
        self.params.push(param.into());
        self
    }

    #[must_use]
    pub fn params_from<I, P>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
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

    /// Call with already-collected arguments.
    ///
    /// # Errors
    ///
    /// Whatever the body returns.
    pub fn call(&self, args: Args) -> anyhow::Result<R> {
        (self.body)(args)
    }
}

/// Resolve every declared parameter of `params` against `sources`.
///
/// # Errors
///
/// [`MissingParameter`] when a parameter has no source and no default, or the
/// error a source raised while producing a value.
pub fn collect_args(
    callable: &str,
    params: &[Param],
    sources: &mut [&mut dyn ParamSource],
) -> anyhow::Result<Args> {
    let mut args = Args::new();
    for param in params {
        let mut found = None;
        for source in sources.iter_mut() {
            if let Some(provided) = source.provide(param.name()) {
                found = Some(provided?);
                break;
            }
        }
        let arg = match (found, param.default_value()) {
            (Some(arg), _) => arg,
            (None, Some(default)) => Arg::Value(default.clone()),
            (None, None) => {
                return Err(MissingParameter {
                    callable: callable.to_string(),
                    name: param.name().to_string(),
                }
                .into())
            }
        };
        args.insert(param.name(), arg);
    }
    Ok(args)
}

/// Collect arguments for `callable` from `sources` and call it.
///
/// # Errors
///
/// See [`collect_args`]; otherwise whatever the callable returns.
pub fn invoke<R>(callable: &Callable<R>, sources: &mut [&mut dyn ParamSource]) -> anyhow::Result<R> {
    let args = collect_args(callable.name(), callable.params(), sources)?;
    callable.call(args)
}
