//! Unit tests for CLI commands

use crate::cli::{build_request, render_response, Cli, Commands};
use crate::echo::demo_app;
use crate::runtime_config::AppConfig;
use clap::Parser;
use http::Method;

#[test]
fn test_routes_command_parses() {
    let cli = Cli::try_parse_from(["brrtdispatch", "routes"]).unwrap();
    assert!(matches!(cli.command, Commands::Routes));
    assert!(cli.config.is_none());
}

#[test]
fn test_request_command_with_flags() {
    let cli = Cli::try_parse_from([
        "brrtdispatch",
        "--config",
        "app.yaml",
        "request",
        "post",
        "/echo",
        "-H",
        "Content-Type: application/json",
        "--data",
        "{\"a\":1}",
    ])
    .unwrap();

    assert_eq!(cli.config.unwrap().to_string_lossy(), "app.yaml");
    match cli.command {
        Commands::Request {
            method,
            target,
            headers,
            data,
        } => {
            assert_eq!(method, "post");
            assert_eq!(target, "/echo");
            assert_eq!(headers, ["Content-Type: application/json"]);
            assert_eq!(data.as_deref(), Some("{\"a\":1}"));
        }
        Commands::Routes => panic!("Expected Request command"),
    }
}

#[test]
fn test_request_requires_target() {
    assert!(Cli::try_parse_from(["brrtdispatch", "request", "GET"]).is_err());
}

#[test]
fn test_build_request() {
    let request = build_request(
        "patch",
        "/posts/3?draft=1",
        &["X-Trace : abc".to_string()],
        Some("hi".to_string()),
    )
    .unwrap();
    assert_eq!(request.method, Method::PATCH);
    assert_eq!(request.path, "/posts/3");
    assert_eq!(request.query["draft"], "1");
    assert_eq!(request.header("x-trace"), Some("abc"));
    assert_eq!(request.body, b"hi");
}

#[test]
fn test_build_request_rejects_bad_input() {
    assert!(build_request("OPTIONS", "/", &[], None).is_err());
    assert!(build_request("GET", "/", &["no-colon".to_string()], None).is_err());
}

#[test]
fn test_render_response() {
    let mut dispatcher = demo_app(AppConfig::default()).unwrap().into_dispatcher();
    let request = build_request("GET", "/hello", &[], None).unwrap();
    let rendered = render_response(&dispatcher.dispatch(request));
    assert!(rendered.starts_with("200 OK\n"));
    assert!(rendered.contains("Content-Type: text/html; charset=utf-8\n"));
    assert!(rendered.ends_with("\nklar\n"));
}
