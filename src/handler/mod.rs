//! # Handler Module
//!
//! Handlers and the metadata the dispatcher needs to call them.
//!
//! A [`Handler`] is a closure over [`Args`](crate::registry::Args) plus an
//! explicit parameter list declared at registration time. Each [`Param`]
//! carries a name, an optional default and an optional [`Annotation`]:
//!
//! - [`Annotation::Schema`] validates the bound value against a JSON Schema
//! - [`Annotation::Transform`] replaces the bound value with a coerced one
//!
//! [`bind`] turns a route match, the query string and the dependency
//! registry into the handler's arguments.

mod annotation;
mod binder;
mod core;
mod param;

#[cfg(test)]
mod tests;

pub use annotation::{Annotation, Schema, SchemaCheck, Transform};
pub use binder::bind;
pub use core::Handler;
pub use param::Param;
