//! # brrtdispatch
//!
//! **brrtdispatch** is the request-dispatch core of a small web framework: a
//! prefix-indexed route table, a scoped dependency registry, a parameter
//! binder and a dispatcher that turns one pre-parsed request into one
//! finished response.
//!
//! ## Architecture
//!
//! - **[`router`]** - `<name>` path patterns, static-prefix buckets, reverse routing
//! - **[`registry`]** - lazy, memoized dependencies in persistent and request scope,
//!   plus the invoker every callable runs through
//! - **[`handler`]** - handler metadata, parameter annotations and the binder
//! - **[`response`]** - the reply sum type, normalization, post-processors,
//!   freshness checks and the status table
//! - **[`dispatcher`]** - the `Routing → … → Finalizing` state machine and the
//!   error taxonomy
//! - **[`app`]** - application assembly and the built-in dependencies
//! - **[`resource`]**, **[`events`]**, **[`cookies`]**, **[`session`]**,
//!   **[`cache`]**, **[`multipart`]**, **[`templates`]** - framework features
//!   layered on the core
//!
//! ## Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport
//!     participant Dispatcher
//!     participant Router as RouteTable
//!     participant Binder
//!     participant Registry
//!     participant Handler
//!
//!     Transport->>Dispatcher: dispatch(Request)
//!     Dispatcher->>Router: dispatch(method, path)
//!     alt No Route Match
//!         Router-->>Dispatcher: None (404)
//!     end
//!     Router-->>Dispatcher: handler + captures
//!     Dispatcher->>Binder: bind(handler, captures, query)
//!     Binder->>Registry: resolve(dependency names)
//!     Registry-->>Binder: memoized instances
//!     Binder-->>Dispatcher: Args (or 400/500)
//!     Dispatcher->>Handler: call(Args)
//!     Handler-->>Dispatcher: Reply
//!     Dispatcher->>Dispatcher: normalize, post-process, freshness
//!     Dispatcher->>Dispatcher: status check, events, finalizers
//!     Dispatcher->>Registry: reset_request_scope()
//!     Dispatcher-->>Transport: HttpResponse
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtdispatch::app::App;
//! use brrtdispatch::handler::Handler;
//! use brrtdispatch::request::Request;
//!
//! let mut app = App::new();
//! app.get(
//!     "/hello/<name>",
//!     Handler::new("hello", |args| Ok(format!("hello {}", args.str("name")?))),
//! )
//! .unwrap();
//!
//! let mut dispatcher = app.into_dispatcher();
//! let response = dispatcher.dispatch(Request::get("/hello/klar"));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body_str(), "hello klar");
//! ```
//!
//! ## Runtime Considerations
//!
//! Dispatch is synchronous and takes `&mut Dispatcher`; one dispatch runs to
//! completion before the next. Run several workers with
//! [`dispatcher::Dispatcher::fork`]: forks share the frozen route table and
//! registrations but keep their own memo tables. Persistent dependencies are
//! shared across forks and must do their own locking.

pub mod app;
pub mod cache;
pub mod cli;
pub mod cookies;
pub mod dispatcher;
pub mod echo;
pub mod events;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod multipart;
pub mod registry;
pub mod request;
pub mod resource;
pub mod response;
pub mod router;
pub mod runtime_config;
pub mod session;
pub mod templates;

pub use app::App;
pub use dispatcher::{DispatchError, Dispatcher, HttpError};
pub use handler::{Annotation, Handler, Param};
pub use registry::{Callable, Factory, Registry, Scope};
pub use request::Request;
pub use response::{HttpResponse, Reply};
