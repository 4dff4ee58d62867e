//! Dispatcher core module - hot path for request dispatch.
//!
//! One call to [`Dispatcher::dispatch`] walks the request through
//! `Routing → Binding → Invoking → Normalizing → FreshnessCheck → Finalizing`.
//! Every failure short-circuits to `Finalizing` as an error record, panics
//! included. Listeners and finalizers are user code too; a panic in one of
//! them is logged like a failure and the remaining ones still run. The request
//! scope is reset on every path out.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]

use super::error::DispatchError;
use crate::events::EventEmitter;
use crate::handler::{bind, Handler};
use crate::ids::RequestId;
use crate::registry::{Instance, Registry};
use crate::request::Request;
use crate::response::{freshness, normalize, status, Body, HttpResponse, ResponseRecord};
use crate::router::RouteTable;
use crate::runtime_config::AppConfig;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

/// The route table as the dispatcher holds it.
pub type Routes = RouteTable<Arc<Handler>>;

/// Dispatch state, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Routing,
    Binding,
    Invoking,
    Normalizing,
    FreshnessCheck,
    Finalizing,
}

type FinalizeFn = dyn Fn(&mut Registry, &mut ResponseRecord) -> anyhow::Result<()> + Send + Sync;

/// Side effect tied to a request-scoped dependency, run at `Finalizing`
/// only when that dependency was resolved during the request and the
/// response is not a 500.
#[derive(Clone)]
pub struct Finalizer {
    dependency: String,
    run: Arc<FinalizeFn>,
}

impl Finalizer {
    pub fn new<F>(dependency: impl Into<String>, run: F) -> Self
    where
        F: Fn(&mut Registry, &mut ResponseRecord) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            dependency: dependency.into(),
            run: Arc::new(run),
        }
    }

    #[must_use]
    pub fn dependency(&self) -> &str {
        &self.dependency
    }
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finalizer")
            .field("dependency", &self.dependency)
            .finish_non_exhaustive()
    }
}

/// Runs requests against a frozen route table and a dependency registry.
///
/// A dispatcher handles one request at a time (`dispatch` takes `&mut self`).
/// For parallel workers, [`Dispatcher::fork`] one per worker: forks share the
/// route table, registrations, listeners and finalizers, and each gets empty
/// memo tables.
pub struct Dispatcher {
    routes: Arc<Routes>,
    registry: Registry,
    events: Arc<EventEmitter>,
    finalizers: Arc<[Finalizer]>,
    config: Arc<AppConfig>,
}

impl Dispatcher {
    /// A dispatcher with default configuration, no listeners and no finalizers.
    #[must_use]
    pub fn new(routes: Routes, registry: Registry) -> Self {
        Self::assemble(
            Arc::new(routes),
            registry,
            EventEmitter::new(),
            Vec::new(),
            AppConfig::default(),
        )
    }

    pub(crate) fn assemble(
        routes: Arc<Routes>,
        registry: Registry,
        events: EventEmitter,
        finalizers: Vec<Finalizer>,
        config: AppConfig,
    ) -> Self {
        routes.log_summary();
        Self {
            routes,
            registry,
            events: Arc::new(events),
            finalizers: finalizers.into(),
            config: Arc::new(config),
        }
    }

    /// An independent worker over the same application.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
            registry: self.registry.fork(),
            events: Arc::clone(&self.events),
            finalizers: Arc::clone(&self.finalizers),
            config: Arc::clone(&self.config),
        }
    }

    #[must_use]
    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Reverse routing through the frozen table.
    pub fn path_for<I, K, V>(&self, name: &str, params: I) -> Option<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        self.routes.path_for(name, params)
    }

    /// Dispatch one request. Never panics and never fails: every outcome is a
    /// response.
    pub fn dispatch(&mut self, request: Request) -> HttpResponse {
        let request_id = RequestId::from_header_or_new(request.header("x-request-id"));
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            method = %request.method,
            path = %request.path
        );
        let _entered = span.enter();
        let start = Instant::now();

        let request = Arc::new(request);
        self.registry
            .seed("request", Arc::clone(&request) as Instance);

        let response = catch_unwind(AssertUnwindSafe(|| {
            let outcome = catch_unwind(AssertUnwindSafe(|| self.run(&request))).unwrap_or_else(|panic| {
                let panic_message = panic_message(panic.as_ref());
                error!(panic_message = %panic_message, "Handler panicked - CRITICAL");
                Err(DispatchError::UncaughtHandlerFailure(anyhow::anyhow!(
                    "handler panicked: {panic_message}"
                )))
            });
            let record = match outcome {
                Ok(record) => record,
                Err(err) => self.error_record(&err),
            };
            self.finalize(&request, record)
        }))
        .unwrap_or_else(|panic| {
            error!(
                panic_message = %panic_message(panic.as_ref()),
                "Finalizing panicked - CRITICAL"
            );
            self.panic_response()
        });

        let evicted = self.registry.reset_request_scope();
        info!(
            status = response.status,
            latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
            evicted,
            "Dispatch complete"
        );
        response
    }

    fn run(&mut self, request: &Request) -> Result<ResponseRecord, DispatchError> {
        transition(Stage::Routing);
        let (handler, captures) = match self.routes.dispatch(&request.method, &request.path) {
            Some(route_match) => (Arc::clone(route_match.target), route_match.captures),
            None => {
                return Err(DispatchError::RouteNotFound {
                    method: request.method.to_string(),
                    path: request.path.clone(),
                })
            }
        };

        transition(Stage::Binding);
        let args = bind(&handler, &captures, &request.query, &mut self.registry)?;

        transition(Stage::Invoking);
        info!(handler_name = %handler.name(), "Request dispatched to handler");
        let reply = handler.call(args).map_err(DispatchError::from_failure)?;

        transition(Stage::Normalizing);
        let mut record = normalize(reply);
        for processor in handler.post_processors() {
            debug!(handler_name = %handler.name(), processor = %processor.label(), "Post-processing");
            processor
                .apply(&mut record, &mut self.registry)
                .map_err(DispatchError::from_failure)?;
        }

        if record.code == 200 {
            transition(Stage::FreshnessCheck);
            let verdict = freshness::check(&mut record, &request.headers);
            debug!(freshness = ?verdict, status = record.code, "Freshness evaluated");
        }
        Ok(record)
    }

    fn error_record(&self, err: &DispatchError) -> ResponseRecord {
        let status = err.status();
        let detail = describe(err);
        if err.is_client_error() {
            warn!(kind = err.kind(), status, error = %detail, "Request rejected");
        } else {
            error!(kind = err.kind(), status, error = %detail, "Dispatch failed");
        }

        let body = match err {
            DispatchError::RouteNotFound { .. } => Body::Empty,
            _ if status >= 500 && !self.config.expose_errors => {
                Body::Text(status::reason(status).unwrap_or("Internal Server Error").to_string())
            }
            DispatchError::Http(http) => Body::Text(http.message.clone()),
            _ => Body::Text(detail),
        };
        ResponseRecord::new(status, body)
    }

    fn finalize(&mut self, request: &Request, mut record: ResponseRecord) -> HttpResponse {
        transition(Stage::Finalizing);

        let reason = match status::reason(record.code) {
            Some(reason) => reason,
            None => {
                record = self.error_record(&DispatchError::UnknownStatus { code: record.code });
                status::reason(record.code).unwrap_or("Internal Server Error")
            }
        };

        self.events.emit(
            record.code,
            &request.path,
            request.method.as_str(),
            &mut self.registry,
        );

        if record.code != 500 {
            for finalizer in self.finalizers.iter() {
                if !self.registry.was_accessed(&finalizer.dependency) {
                    continue;
                }
                debug!(dependency = %finalizer.dependency, "Running finalizer");
                let registry = &mut self.registry;
                let outcome = catch_unwind(AssertUnwindSafe(|| (finalizer.run)(registry, &mut record)))
                    .unwrap_or_else(|panic| {
                        Err(anyhow::anyhow!(
                            "finalizer panicked: {}",
                            panic_message(panic.as_ref())
                        ))
                    });
                if let Err(err) = outcome {
                    error!(
                        dependency = %finalizer.dependency,
                        error = %format!("{err:#}"),
                        "Finalizer failed"
                    );
                }
            }
        }

        let (body, implied_type) = record.body.to_bytes();
        if record.get_header("content-type").is_none() {
            let content_type = implied_type.unwrap_or(self.config.default_content_type.as_str());
            record.set_header("Content-Type", content_type);
        }

        HttpResponse {
            status: record.code,
            reason,
            headers: record
                .headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            body,
        }
    }
}

impl Dispatcher {
    /// Last-resort response when finalizing itself panicked.
    fn panic_response(&self) -> HttpResponse {
        let reason = status::reason(500).unwrap_or("Internal Server Error");
        HttpResponse {
            status: 500,
            reason,
            headers: vec![(
                "Content-Type".to_string(),
                self.config.default_content_type.clone(),
            )],
            body: reason.as_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.len())
            .field("finalizers", &self.finalizers)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn transition(stage: Stage) {
    debug!(stage = ?stage, "Dispatch stage");
}

/// The error and every cause below it, joined with `": "`.
fn describe(err: &DispatchError) -> String {
    let mut out = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
