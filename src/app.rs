//! # Application Assembly
//!
//! [`App`] collects routes, dependencies, status listeners and finalizers,
//! then freezes into a [`Dispatcher`]. Assembly is single-threaded and
//! mutable; the frozen dispatcher never changes its route table again.
//!
//! ## Built-in dependencies
//!
//! | Name | Scope | Provides |
//! |---|---|---|
//! | `request` | request | the [`Request`] being dispatched (seeded) |
//! | `body` | request | [`Request::parsed_body`] |
//! | `uploads` | request | [`Request::uploads`] (files of a multipart body) |
//! | `query` | request | the query object |
//! | `headers` | request | headers as an object with lowercased names |
//! | `router` | persistent | the frozen [`Routes`] |
//! | `cache` | persistent | the process [`MemoryCache`] |
//! | `cookies` | request | a [`CookieJar`] over the `Cookie` header |
//! | `session` | request | the cookie-keyed [`Session`] |
//! | `config` | persistent | the [`AppConfig`] |
//!
//! Any of them can be replaced with [`App::provide`].
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::app::App;
//! use brrtdispatch::handler::{Annotation, Handler};
//! use brrtdispatch::request::Request;
//!
//! let mut app = App::new();
//! app.get(
//!     "/hello/<name>",
//!     Handler::new("hello", |args| Ok(format!("hello {}", args.str("name")?))),
//! )
//! .unwrap();
//! app.get(
//!     "/add/<a>",
//!     Handler::new("add", |args| Ok((args.i64("a")? + 1).to_string()))
//!         .annotated("a", Annotation::integer()),
//! )
//! .unwrap();
//!
//! let mut dispatcher = app.into_dispatcher();
//! assert_eq!(dispatcher.dispatch(Request::get("/hello/klar")).body_str(), "hello klar");
//! assert_eq!(dispatcher.dispatch(Request::get("/add/41")).body_str(), "42");
//! ```

use crate::cache::MemoryCache;
use crate::cookies::CookieJar;
use crate::dispatcher::{Dispatcher, Finalizer, Routes};
use crate::events::EventEmitter;
use crate::handler::Handler;
use crate::registry::{Args, Callable, Factory, Instance, Registry, Scope};
use crate::request::Request;
use crate::resource::Resource;
use crate::router::{RouteError, Verb};
use crate::runtime_config::AppConfig;
use crate::session::{Session, SessionSettings};
use crate::templates::Templates;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// An application under assembly.
#[derive(Debug)]
pub struct App {
    routes: Routes,
    registry: Registry,
    events: EventEmitter,
    finalizers: Vec<Finalizer>,
    config: AppConfig,
    cache: Arc<MemoryCache>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// An application with [`AppConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    #[must_use]
    pub fn with_config(config: AppConfig) -> Self {
        let cache = Arc::new(MemoryCache::new(config.cache_capacity));
        let mut app = Self {
            routes: Routes::new(),
            registry: Registry::with_max_depth(config.max_resolution_depth),
            events: EventEmitter::new(),
            finalizers: Vec::new(),
            config,
            cache,
        };
        app.register_builtins();
        app
    }

    fn register_builtins(&mut self) {
        self.registry.register(
            "request",
            Factory::constructor(|| -> anyhow::Result<Request> {
                anyhow::bail!("the request is only available while dispatching")
            }),
            Scope::Request,
        );
        self.registry.register(
            "body",
            Factory::resolver(
                Callable::new("body", |args: Args| args.dependency::<Request>("request")?.parsed_body())
                    .param("request"),
            ),
            Scope::Request,
        );
        self.registry.register(
            "uploads",
            Factory::resolver(
                Callable::new("uploads", |args: Args| args.dependency::<Request>("request")?.uploads())
                    .param("request"),
            ),
            Scope::Request,
        );
        self.registry.register(
            "query",
            Factory::resolver(
                Callable::new("query", |args: Args| {
                    Ok(Value::Object(args.dependency::<Request>("request")?.query.clone()))
                })
                .param("request"),
            ),
            Scope::Request,
        );
        self.registry.register(
            "headers",
            Factory::resolver(
                Callable::new("headers", |args: Args| {
                    Ok(args.dependency::<Request>("request")?.headers_object())
                })
                .param("request"),
            ),
            Scope::Request,
        );
        self.registry.register(
            "cache",
            Factory::Instance(Arc::clone(&self.cache) as Instance),
            Scope::Persistent,
        );
        self.registry.register(
            "cookies",
            Factory::resolver(
                Callable::new("cookies", |args: Args| {
                    let request = args.dependency::<Request>("request")?;
                    Ok(CookieJar::from_header(request.header("cookie")))
                })
                .param("request"),
            ),
            Scope::Request,
        );

        let settings = SessionSettings::from(&self.config.session);
        self.registry.register(
            "session",
            Factory::resolver(
                Callable::new("session", move |args: Args| {
                    Ok(Session::load(
                        args.dependency::<CookieJar>("cookies")?,
                        args.dependency::<MemoryCache>("cache")?,
                        settings.clone(),
                    ))
                })
                .param("cookies")
                .param("cache"),
            ),
            Scope::Request,
        );
        self.registry.register(
            "config",
            Factory::instance(self.config.clone()),
            Scope::Persistent,
        );

        self.finalizers.push(Finalizer::new("session", |registry, _record| {
            let session = registry.resolve_as::<Session>("session")?;
            session.flush();
            Ok(())
        }));
        self.finalizers.push(Finalizer::new("cookies", |registry, record| {
            let jar = registry.resolve_as::<CookieJar>("cookies")?;
            for header in jar.set_cookie_headers() {
                record.append_header("Set-Cookie", header);
            }
            Ok(())
        }));
    }

    /// Register `handler` for `verb` and `pattern`.
    ///
    /// # Errors
    ///
    /// [`RouteError`] when the pattern does not compile.
    pub fn route(
        &mut self,
        verb: Verb,
        pattern: &str,
        handler: Handler,
    ) -> Result<&mut Self, RouteError> {
        self.routes.add(verb, pattern, Arc::new(handler))?;
        Ok(self)
    }

    /// # Errors
    ///
    /// [`RouteError`] when the pattern does not compile.
    pub fn get(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.route(Verb::Get, pattern, handler)
    }

    /// # Errors
    ///
    /// [`RouteError`] when the pattern does not compile.
    pub fn post(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.route(Verb::Post, pattern, handler)
    }

    /// # Errors
    ///
    /// [`RouteError`] when the pattern does not compile.
    pub fn put(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.route(Verb::Put, pattern, handler)
    }

    /// # Errors
    ///
    /// [`RouteError`] when the pattern does not compile.
    pub fn patch(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.route(Verb::Patch, pattern, handler)
    }

    /// # Errors
    ///
    /// [`RouteError`] when the pattern does not compile.
    pub fn delete(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.route(Verb::Delete, pattern, handler)
    }

    /// # Errors
    ///
    /// [`RouteError`] when the pattern does not compile.
    pub fn head(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.route(Verb::Head, pattern, handler)
    }

    /// Expand `resource` under `path`.
    ///
    /// # Errors
    ///
    /// [`RouteError`] when a generated pattern does not compile (for example
    /// a path segment that is not a valid placeholder name).
    pub fn resource(&mut self, path: &str, resource: &Resource) -> Result<&mut Self, RouteError> {
        let routes = resource.routes(path);
        debug!(path = %path, resource = %resource.name(), routes = routes.len(), "Resource expanded");
        for (verb, pattern, handler) in routes {
            self.route(verb, &pattern, handler)?;
        }
        Ok(self)
    }

    /// Mount each resource at `prefix/<resource name>`.
    ///
    /// # Errors
    ///
    /// [`RouteError`] as for [`App::resource`].
    pub fn resources<'a, I>(&mut self, prefix: &str, resources: I) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = &'a Resource>,
    {
        for resource in resources {
            let path = format!("{}/{}", prefix.trim_end_matches('/'), resource.name());
            self.resource(&path, resource)?;
        }
        Ok(self)
    }

    /// Register (or replace) a dependency.
    pub fn provide(&mut self, name: impl Into<String>, factory: Factory, scope: Scope) -> &mut Self {
        self.registry.register(name, factory, scope);
        self
    }

    /// Listen for dispatches ending with `code`.
    pub fn on(&mut self, code: u16, listener: Callable<()>) -> &mut Self {
        self.events.on(code, listener);
        self
    }

    /// Register the persistent `templates` dependency rooted at `root`.
    pub fn templates(&mut self, root: impl Into<PathBuf>) -> &mut Self {
        self.provide("templates", Factory::instance(Templates::new(root)), Scope::Persistent)
    }

    /// Run `finalizer` after any dispatch that resolved its dependency.
    pub fn finalizer(&mut self, finalizer: Finalizer) -> &mut Self {
        self.finalizers.push(finalizer);
        self
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    /// The process cache shared by every dispatcher built from this app.
    #[must_use]
    pub fn cache(&self) -> Arc<MemoryCache> {
        Arc::clone(&self.cache)
    }

    /// Freeze the route table and hand everything to a [`Dispatcher`].
    #[must_use]
    pub fn into_dispatcher(self) -> Dispatcher {
        let Self {
            routes,
            mut registry,
            events,
            finalizers,
            config,
            cache: _,
        } = self;

        let routes = Arc::new(routes);
        registry.register(
            "router",
            Factory::Instance(Arc::clone(&routes) as Instance),
            Scope::Persistent,
        );
        info!(
            routes = routes.len(),
            finalizers = finalizers.len(),
            "Application assembled"
        );
        Dispatcher::assemble(routes, registry, events, finalizers, config)
    }
}
