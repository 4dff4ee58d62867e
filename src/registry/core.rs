use super::error::RegistryError;
use super::invoker::{invoke, Arg, Callable, Instance, ParamSource};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default bound on nested factory resolution.
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 32;

/// Lifetime of a memoized dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Lives as long as the registry
    Persistent,
    /// Evicted by [`Registry::reset_request_scope`] after every dispatch
    Request,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Persistent => "persistent",
            Scope::Request => "request",
        })
    }
}

type ConstructorFn = dyn Fn() -> anyhow::Result<Instance> + Send + Sync;

/// How a dependency is produced on first resolution.
#[derive(Clone)]
pub enum Factory {
    /// A ready-made instance, memoized as-is
    Instance(Instance),
    /// Zero-argument constructor
    Constructor(Arc<ConstructorFn>),
    /// Constructor fed from a fixed parameter bundle first, then the registry
    Configured {
        bundle: Map<String, Value>,
        build: Callable<Instance>,
    },
    /// Function whose parameters are resolved recursively from the registry
    Resolver(Callable<Instance>),
}

impl Factory {
    pub fn instance<T: Any + Send + Sync>(value: T) -> Self {
        Factory::Instance(Arc::new(value))
    }

    /// A JSON value; handlers receive it as plain data.
    #[must_use]
    pub fn value(value: Value) -> Self {
        Factory::Instance(Arc::new(value))
    }

    pub fn constructor<T, F>(build: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Factory::Constructor(Arc::new(move || Ok(Arc::new(build()?) as Instance)))
    }

    pub fn resolver<T: Any + Send + Sync>(build: Callable<T>) -> Self {
        Factory::Resolver(erase(build))
    }

    pub fn configured<T: Any + Send + Sync>(bundle: Map<String, Value>, build: Callable<T>) -> Self {
        Factory::Configured {
            bundle,
            build: erase(build),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Factory::Instance(_) => "instance",
            Factory::Constructor(_) => "constructor",
            Factory::Configured { .. } => "configured",
            Factory::Resolver(_) => "resolver",
        }
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factory::Configured { bundle, build } => f
                .debug_struct("Configured")
                .field("bundle", bundle)
                .field("build", build)
                .finish(),
            Factory::Resolver(build) => f.debug_tuple("Resolver").field(build).finish(),
            other => f.write_str(other.label()),
        }
    }
}

fn erase<T: Any + Send + Sync>(build: Callable<T>) -> Callable<Instance> {
    let params = build.params().to_vec();
    let name = build.name().to_string();
    Callable::new(name, move |args| Ok(Arc::new(build.call(args)?) as Instance)).params_from(params)
}

#[derive(Debug, Clone)]
struct Registration {
    factory: Factory,
    scope: Scope,
}

/// Lazy dependency container with persistent and request scopes.
///
/// Nothing is constructed at registration time. The first [`Registry::resolve`]
/// of a name runs its factory, whose own parameters may be resolved from this
/// registry, and memoizes the instance under the registration's scope.
///
/// A registry serves one dispatch at a time. Workers that dispatch in
/// parallel each get their own registry through [`Registry::fork`].
#[derive(Debug)]
pub struct Registry {
    registrations: HashMap<String, Registration>,
    persistent: HashMap<String, Instance>,
    request: HashMap<String, Instance>,
    resolving: Vec<String>,
    max_depth: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_RESOLUTION_DEPTH)
    }

    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            registrations: HashMap::new(),
            persistent: HashMap::new(),
            request: HashMap::new(),
            resolving: Vec::new(),
            max_depth,
        }
    }

    /// Store or overwrite a registration. Overwriting drops any memoized
    /// instance so the next resolution uses the new factory.
    pub fn register(&mut self, name: impl Into<String>, factory: Factory, scope: Scope) {
        let name = name.into();
        debug!(dependency = %name, scope = %scope, factory = factory.label(), "Dependency registered");
        self.evict(&name);
        self.registrations
            .insert(name, Registration { factory, scope });
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.registrations.contains_key(name)
    }

    #[must_use]
    pub fn scope_of(&self, name: &str) -> Option<Scope> {
        self.registrations.get(name).map(|r| r.scope)
    }

    /// Registered names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registrations.keys().map(String::as_str)
    }

    /// Resolve `name`, constructing and memoizing it on first use in its scope.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownDependency`] for unregistered names,
    /// [`RegistryError::Cycle`] or [`RegistryError::DepthExceeded`] for runaway
    /// factory graphs, [`RegistryError::Factory`] when a factory fails.
    pub fn resolve(&mut self, name: &str) -> Result<Instance, RegistryError> {
        let Some(registration) = self.registrations.get(name) else {
            return Err(RegistryError::UnknownDependency {
                name: name.to_string(),
            });
        };
        let scope = registration.scope;
        if let Some(instance) = self.memo(scope).get(name) {
            return Ok(Arc::clone(instance));
        }

        if self.resolving.iter().any(|n| n == name) {
            let mut chain = self.resolving.clone();
            chain.push(name.to_string());
            warn!(dependency = %name, chain = ?chain, "Dependency cycle detected");
            return Err(RegistryError::Cycle { chain });
        }
        if self.resolving.len() >= self.max_depth {
            warn!(dependency = %name, limit = self.max_depth, "Resolution depth exceeded");
            return Err(RegistryError::DepthExceeded {
                name: name.to_string(),
                limit: self.max_depth,
            });
        }

        let factory = registration.factory.clone();
        self.resolving.push(name.to_string());
        let built = self.instantiate(name, &factory);
        self.resolving.pop();
        let instance = built?;

        debug!(dependency = %name, scope = %scope, depth = self.resolving.len(), "Dependency resolved");
        self.memo_mut(scope)
            .insert(name.to_string(), Arc::clone(&instance));
        Ok(instance)
    }

    /// Resolve `name` and downcast it to `T`.
    ///
    /// # Errors
    ///
    /// Everything [`Registry::resolve`] returns, plus
    /// [`RegistryError::TypeMismatch`].
    pub fn resolve_as<T: Any + Send + Sync>(&mut self, name: &str) -> Result<Arc<T>, RegistryError> {
        self.resolve(name)?
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Place a ready instance in the memo of `name`'s scope (request scope
    /// when unregistered), as if it had just been resolved.
    pub fn seed(&mut self, name: impl Into<String>, instance: Instance) {
        let name = name.into();
        let scope = self.scope_of(&name).unwrap_or(Scope::Request);
        self.memo_mut(scope).insert(name, instance);
    }

    /// True iff `name` is memoized in the current request scope.
    #[must_use]
    pub fn was_accessed(&self, name: &str) -> bool {
        self.request.contains_key(name)
    }

    /// Drop any memoized instance of `name` in either scope.
    pub fn evict(&mut self, name: &str) -> bool {
        let persistent = self.persistent.remove(name).is_some();
        let request = self.request.remove(name).is_some();
        persistent || request
    }

    /// Evict every request-scoped instance. Returns how many were dropped.
    pub fn reset_request_scope(&mut self) -> usize {
        let evicted = self.request.len();
        self.request.clear();
        self.resolving.clear();
        evicted
    }

    /// A registry with the same registrations and empty memo tables.
    ///
    /// Dependencies registered as [`Factory::Instance`] stay shared between
    /// the forks; everything else is constructed again per fork.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            registrations: self.registrations.clone(),
            persistent: HashMap::new(),
            request: HashMap::new(),
            resolving: Vec::new(),
            max_depth: self.max_depth,
        }
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    fn memo(&self, scope: Scope) -> &HashMap<String, Instance> {
        match scope {
            Scope::Persistent => &self.persistent,
            Scope::Request => &self.request,
        }
    }

    fn memo_mut(&mut self, scope: Scope) -> &mut HashMap<String, Instance> {
        match scope {
            Scope::Persistent => &mut self.persistent,
            Scope::Request => &mut self.request,
        }
    }

    fn instantiate(&mut self, name: &str, factory: &Factory) -> Result<Instance, RegistryError> {
        let built = match factory {
            Factory::Instance(instance) => return Ok(Arc::clone(instance)),
            Factory::Constructor(build) => build(),
            Factory::Configured { bundle, build } => {
                let mut bundle = bundle.clone();
                invoke(build, &mut [&mut bundle, self])
            }
            Factory::Resolver(build) => invoke(build, &mut [self]),
        };
        built.map_err(|source| match source.downcast::<RegistryError>() {
            // nested resolution failures surface unchanged
            Ok(nested) => nested,
            Err(source) => RegistryError::Factory {
                name: name.to_string(),
                source,
            },
        })
    }
}

impl ParamSource for Registry {
    fn provide(&mut self, name: &str) -> Option<anyhow::Result<Arg>> {
        if !self.contains(name) {
            return None;
        }
        Some(
            self.resolve(name)
                .map(Arg::from_instance)
                .map_err(anyhow::Error::from),
        )
    }
}
