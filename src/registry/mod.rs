//! # Registry Module
//!
//! Lazy dependency injection for handlers, factories, listeners and
//! post-processors.
//!
//! ## Overview
//!
//! A [`Registry`] maps logical names to [`Factory`] values. Nothing is built
//! until a name is first resolved; the instance is then memoized in one of two
//! scopes:
//!
//! - [`Scope::Persistent`] - lives as long as the registry (the application)
//! - [`Scope::Request`] - dropped by [`Registry::reset_request_scope`], which the
//!   dispatcher calls after every request, including failed ones
//!
//! Factories may declare parameters. Those are filled through the generic
//! [`invoke`] mechanism, with the registry itself as a parameter source, which
//! turns the registrations into a dependency graph. Cycles fail fast with
//! [`RegistryError::Cycle`] and runaway graphs hit a depth guard.
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::registry::{Callable, Factory, Registry, Scope};
//! use serde_json::json;
//!
//! let mut registry = Registry::new();
//! registry.register("greeting", Factory::value(json!("hello")), Scope::Persistent);
//! registry.register(
//!     "message",
//!     Factory::resolver(
//!         Callable::new("message", |args| Ok(format!("{} world", args.str("greeting")?)))
//!             .param("greeting"),
//!     ),
//!     Scope::Request,
//! );
//!
//! let message = registry.resolve_as::<String>("message").unwrap();
//! assert_eq!(message.as_str(), "hello world");
//! assert!(registry.was_accessed("message"));
//! registry.reset_request_scope();
//! assert!(!registry.was_accessed("message"));
//! ```

mod core;
mod error;
mod invoker;


pub use core::{Factory, Registry, Scope, DEFAULT_MAX_RESOLUTION_DEPTH};
pub use error::RegistryError;
pub use invoker::{
    collect_args, invoke, Arg, Args, Callable, Instance, MissingParameter, ParamSource,
};
