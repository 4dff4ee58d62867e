//! # Response Module
//!
//! From a handler's [`Reply`] to the wire-level [`HttpResponse`].
//!
//! ## Stages
//!
//! 1. [`normalize`] folds a reply (bare body, bare status, header pairs, or a
//!    composite of those) into a [`ResponseRecord`]. Defaults are code 200,
//!    an empty body and no headers; the last body and last status win.
//! 2. The handler's [`PostProcessor`] chain rewrites the record in order.
//! 3. [`freshness::check`] downgrades a fresh 200 to 304.
//! 4. The dispatcher serializes the body: [`Body::Data`] becomes JSON and
//!    switches the content type unless the handler set one explicitly.
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::response::{normalize, Body, Reply};
//!
//! let record = normalize(
//!     Reply::from("first")
//!         .with_status(201)
//!         .with_header("X-Trace", "a")
//!         .with("second"),
//! );
//! assert_eq!(record.code, 201);
//! assert_eq!(record.body, Body::Text("second".into()));
//! assert_eq!(record.get_header("x-trace"), Some("a"));
//! ```

pub mod freshness;
mod postprocess;
mod record;
mod reply;
pub mod status;


pub use freshness::Freshness;
pub use postprocess::PostProcessor;
pub use record::{find_header, normalize, HeaderVec, HttpResponse, ResponseRecord, MAX_INLINE_HEADERS};
pub use reply::{redirect, Body, Reply};
