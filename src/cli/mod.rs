//! # CLI Module
//!
//! Command-line front end over the built-in demo application
//! ([`crate::echo::demo_app`]). There is no network server: each invocation
//! assembles the application, optionally dispatches one synthetic request,
//! and prints the result.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! Print the route table in registration order:
//!
//! ```bash
//! brrtdispatch routes
//! ```
//!
//! ### `request`
//!
//! Dispatch one request and print status line, headers and body:
//!
//! ```bash
//! brrtdispatch request GET '/test/200?foo=1'
//! brrtdispatch request POST /echo -H 'Content-Type: application/json' --data '{"a":1}'
//! brrtdispatch --config app.yaml request GET /visits -H 'Cookie: ksid=01J...'
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use brrtdispatch::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{build_request, render_response, run_cli, Cli, Commands};
