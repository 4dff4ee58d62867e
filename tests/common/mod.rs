//! Shared helpers for integration tests.

#![allow(dead_code)]

use brrtdispatch::logging::{init_logging, LogConfig, LogFormat};
use brrtdispatch::{Dispatcher, HttpResponse, Request};

/// Install a quiet subscriber once per test binary; later calls are no-ops.
pub fn init_test_logging() {
    let config = LogConfig {
        log_level: "warn".to_string(),
        format: LogFormat::Pretty,
    };
    init_logging(&config).expect("test subscriber setup");
}

/// Dispatch a GET and return the response.
pub fn get(dispatcher: &mut Dispatcher, target: &str) -> HttpResponse {
    dispatcher.dispatch(Request::get(target))
}

/// The `name=value` part of every `Set-Cookie` header.
pub fn set_cookies(response: &HttpResponse) -> Vec<String> {
    response
        .headers_named("set-cookie")
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
        .collect()
}
