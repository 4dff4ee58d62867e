use crate::echo::demo_app;
use crate::logging::{init_logging, LogConfig};
use crate::request::Request;
use crate::response::HttpResponse;
use crate::router::Verb;
use crate::runtime_config::AppConfig;
use anyhow::Context;
use clap::{Parser, Subcommand};
use http::Method;
use std::path::PathBuf;

/// Command-line interface for brrtdispatch
///
/// Drives the built-in demo application through the dispatch core without a
/// network server.
#[derive(Debug, Parser)]
#[command(name = "brrtdispatch", version)]
#[command(about = "Dispatch synthetic requests through the demo application", long_about = None)]
pub struct Cli {
    /// YAML application config; `BRRTD_*` environment variables override it
    #[arg(long, global = true, env = "BRRTD_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the route table
    Routes,
    /// Dispatch one request and print the response
    Request {
        /// HTTP method (GET, POST, ...)
        method: String,

        /// Request target, e.g. `/test/200?foo=1`
        target: String,

        /// Request header as `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body
        #[arg(short, long)]
        data: Option<String>,
    },
}

/// Run the CLI with parsed arguments
///
/// # Errors
///
/// Fails for unreadable config files, malformed methods or headers, and
/// route patterns in the demo application that do not compile.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    init_logging(&LogConfig::from_env())?;
    let config = load_config(cli.config.as_ref())?;
    let app = demo_app(config)?;

    match cli.command {
        Commands::Routes => {
            print!("{}", app.routes());
        }
        Commands::Request {
            method,
            target,
            headers,
            data,
        } => {
            let request = build_request(&method, &target, &headers, data)?;
            let mut dispatcher = app.into_dispatcher();
            let response = dispatcher.dispatch(request);
            print!("{}", render_response(&response));
        }
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_yaml_file(path)?,
        None => AppConfig::default(),
    };
    Ok(config.with_env_overrides())
}

/// Assemble a [`Request`] from command-line pieces.
///
/// # Errors
///
/// Fails for methods outside the verb table and headers without a colon.
pub fn build_request(
    method: &str,
    target: &str,
    headers: &[String],
    data: Option<String>,
) -> anyhow::Result<Request> {
    let verb = Verb::parse(method).with_context(|| format!("unsupported method '{method}'"))?;
    let mut request = Request::new(Method::from(verb), target);
    for raw in headers {
        let (name, value) = raw
            .split_once(':')
            .with_context(|| format!("header '{raw}' is not of the form 'Name: value'"))?;
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(data) = data {
        request = request.with_body(data);
    }
    Ok(request)
}

/// Status line, headers, blank line, body.
#[must_use]
pub fn render_response(response: &HttpResponse) -> String {
    let mut out = response.status_line();
    out.push('\n');
    for (name, value) in &response.headers {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&response.body_str());
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
