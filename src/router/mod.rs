//! # Router Module
//!
//! The route table: `(verb, pattern, handler)` triples indexed by static path
//! prefix, plus reverse routing from a handler name back to a concrete URL.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling declarative patterns (`/hello/<name>`) into anchored matchers
//! - Bucketing routes by the literal prefix before their first placeholder
//! - Matching incoming requests and extracting captures in declaration order
//! - Generating URLs for a named handler (`path_for`)
//!
//! ## Matching order
//!
//! A lookup tries the bucket for the full request path, then the bucket for
//! each shorter prefix ending in `/`. Inside a bucket, routes are tested in
//! registration order and the first match wins. Two overlapping patterns in
//! the same bucket therefore shadow each other by registration order; this is
//! intentional and decides which handler answers an ambiguous request.
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::router::{RouteTable, Verb};
//! use http::Method;
//!
//! let mut table: RouteTable<&'static str> = RouteTable::new();
//! table.add(Verb::Get, "/hello/<name>", "hello").unwrap();
//!
//! let m = table.dispatch(&Method::GET, "/hello/klar").unwrap();
//! assert_eq!(*m.target, "hello");
//! assert_eq!(m.capture("name"), Some("klar"));
//! assert_eq!(
//!     table.path_for("hello", [("name", "klar")]).as_deref(),
//!     Some("/hello/klar")
//! );
//! ```

mod core;
mod pattern;
mod verb;
#[cfg(test)]
mod tests;

pub use core::{Route, RouteMatch, RouteTable, RouteTarget};
pub use pattern::{CompiledMatcher, ParamVec, RouteError, MAX_INLINE_PARAMS};
pub use verb::Verb;
