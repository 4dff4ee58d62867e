//! # Dispatcher Module
//!
//! Drives one request from route lookup to a finished [`HttpResponse`].
//!
//! ## Request Flow
//!
//! 1. **Routing** - the route table picks a handler and path captures; no
//!    match is a 404 with an empty body
//! 2. **Binding** - every declared handler parameter is filled from, in
//!    rising precedence, its default, the query string, the path captures
//!    and finally the dependency registry; annotations validate or convert
//! 3. **Invoking** - the handler runs with the bound arguments
//! 4. **Normalizing** - the handler's reply is folded into a response record,
//!    then the handler's post-processors run over it in order
//! 5. **FreshnessCheck** - a 200 whose `Last-Modified` or `ETag` satisfies
//!    the request's conditional headers becomes a bodiless 304
//! 6. **Finalizing** - the status is checked against the status table,
//!    status listeners fire, finalizers for accessed request-scoped
//!    dependencies run, and the body is serialized
//!
//! Any stage may fail; failures (panics included) become an error record
//! with the status [`DispatchError::status`] assigns and skip straight to
//! `Finalizing`. The request scope is reset whatever happens.
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::dispatcher::{Dispatcher, Routes};
//! use brrtdispatch::handler::Handler;
//! use brrtdispatch::registry::Registry;
//! use brrtdispatch::request::Request;
//! use brrtdispatch::router::Verb;
//! use std::sync::Arc;
//!
//! let mut routes = Routes::new();
//! let hello = Handler::new("hello", |_args| Ok("klar"));
//! routes.add(Verb::Get, "/hello", Arc::new(hello)).unwrap();
//!
//! let mut dispatcher = Dispatcher::new(routes, Registry::new());
//! let response = dispatcher.dispatch(Request::get("/hello"));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body_str(), "klar");
//! ```

mod core;
mod error;

pub(crate) use core::panic_message;
pub use core::{Dispatcher, Finalizer, Routes, Stage};
pub use error::{DispatchError, HttpError};
