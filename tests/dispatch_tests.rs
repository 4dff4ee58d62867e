//! End-to-end tests for the dispatch state machine
//!
//! # Test Coverage
//!
//! Drives `App` → `Dispatcher::dispatch` for:
//! - routing hits and misses
//! - parameter binding precedence, annotations and their 400/500 split
//! - reply normalization, content types and post-processor chains
//! - conditional requests (ETag, Last-Modified)
//! - failure isolation: handler errors, panics, unknown status codes

mod common;

use brrtdispatch::dispatcher::HttpError;
use brrtdispatch::handler::{Annotation, Handler, Param};
use brrtdispatch::registry::Callable;
use brrtdispatch::response::{Body, PostProcessor, Reply};
use brrtdispatch::runtime_config::AppConfig;
use brrtdispatch::{App, Request};
use common::{get, init_test_logging};
use serde_json::{json, Value};
use std::time::{Duration, SystemTime};

fn app() -> App {
    init_test_logging();
    let mut app = App::new();
    app.get(
        "/hello/<name>",
        Handler::new("hello", |args| Ok(format!("hello {}", args.str("name")?))),
    )
    .unwrap()
    .get(
        "/test/<bar>",
        Handler::new("add", |args| {
            Ok((args.i64("bar")? + args.i64("foo")?).to_string())
        })
        .annotated("bar", Annotation::integer())
        .param(Param::new("foo").default(0).annotate(Annotation::integer())),
    )
    .unwrap()
    .post(
        "/list",
        Handler::new("list", |args| Ok(Reply::json(args.value("body")?.clone())))
            .annotated("body", Annotation::schema(json!({ "type": "array" }))),
    )
    .unwrap();
    app
}

#[test]
fn test_hello_scenario() {
    let mut dispatcher = app().into_dispatcher();
    let response = get(&mut dispatcher, "/hello/klar");
    assert_eq!(response.status, 200);
    assert_eq!(response.reason, "OK");
    assert_eq!(response.body_str(), "hello klar");
    assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
}

#[test]
fn test_captures_are_percent_decoded() {
    let mut dispatcher = app().into_dispatcher();
    assert_eq!(get(&mut dispatcher, "/hello/kl%20ar").body_str(), "hello kl ar");

    let link = dispatcher
        .path_for("hello", [("name", "kl ar/é")])
        .unwrap();
    assert_eq!(link, "/hello/kl%20ar%2F%C3%A9");
    // an encoded `/` decodes into the path and no longer fits one segment
    assert_eq!(get(&mut dispatcher, &link).status, 404);

    let link = dispatcher.path_for("hello", [("name", "kl ar é")]).unwrap();
    assert_eq!(get(&mut dispatcher, &link).body_str(), "hello kl ar é");
}

#[test]
fn test_integer_params_with_default() {
    let mut dispatcher = app().into_dispatcher();
    assert_eq!(get(&mut dispatcher, "/test/200?foo=1").body_str(), "201");
    assert_eq!(get(&mut dispatcher, "/test/200").body_str(), "200");
    // path capture wins over a same-named query value
    assert_eq!(get(&mut dispatcher, "/test/5?bar=100&foo=2").body_str(), "7");
}

#[test]
fn test_failing_transform_is_500() {
    let mut dispatcher = app().into_dispatcher();
    let response = get(&mut dispatcher, "/test/abc");
    assert_eq!(response.status, 500);
    assert!(response.body_str().contains("invalid integer 'abc'"));
}

#[test]
fn test_route_miss_is_empty_404() {
    let mut dispatcher = app().into_dispatcher();
    let response = get(&mut dispatcher, "/nothing/here");
    assert_eq!(response.status, 404);
    assert_eq!(response.status_line(), "404 Not Found");
    assert!(response.body.is_empty());

    // registered path, unregistered method
    let response = dispatcher.dispatch(Request::new(http::Method::DELETE, "/hello/klar"));
    assert_eq!(response.status, 404);
    let response = dispatcher.dispatch(Request::new(http::Method::OPTIONS, "/hello/klar"));
    assert_eq!(response.status, 404);
}

#[test]
fn test_schema_annotated_body() {
    let mut dispatcher = app().into_dispatcher();

    let response = dispatcher.dispatch(Request::post("/list").with_json(&json!({ "key": "value" })));
    assert_eq!(response.status, 400);
    assert!(response.body_str().contains("array"));

    let response = dispatcher.dispatch(Request::post("/list").with_json(&json!(["key", "value"])));
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("application/json; charset=utf-8"));
    let echoed: Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(echoed, json!(["key", "value"]));
}

#[test]
fn test_malformed_json_body_is_400() {
    let mut dispatcher = app().into_dispatcher();
    let request = Request::post("/list")
        .with_header("Content-Type", "application/json")
        .with_body("[1, 2");
    let response = dispatcher.dispatch(request);
    assert_eq!(response.status, 400);
    assert!(response.body_str().starts_with("malformed JSON body"));
}

#[test]
fn test_missing_required_and_unresolvable() {
    let mut app = app();
    app.get(
        "/search",
        Handler::new("search", |args| Ok(args.str("q")?.to_string()))
            .annotated("q", Annotation::string()),
    )
    .unwrap()
    .get(
        "/broken",
        Handler::new("broken", |_| Ok("never")).param("mystery"),
    )
    .unwrap();
    let mut dispatcher = app.into_dispatcher();

    let response = get(&mut dispatcher, "/search");
    assert_eq!(response.status, 400);
    assert_eq!(response.body_str(), "q is required");
    assert_eq!(get(&mut dispatcher, "/search?q=rust").body_str(), "rust");

    let response = get(&mut dispatcher, "/broken");
    assert_eq!(response.status, 500);
    assert!(response.body_str().contains("mystery"));
}

#[test]
fn test_http_error_chooses_status() {
    let mut app = app();
    app.get(
        "/private",
        Handler::new("private", |_| -> anyhow::Result<&'static str> {
            Err(anyhow::Error::from(HttpError::forbidden("members only")).context("checking access"))
        }),
    )
    .unwrap();
    let mut dispatcher = app.into_dispatcher();

    let response = get(&mut dispatcher, "/private");
    assert_eq!(response.status, 403);
    assert_eq!(response.reason, "Forbidden");
    assert_eq!(response.body_str(), "members only");
}

#[test]
fn test_panic_is_contained() {
    let mut app = app();
    app.get(
        "/panic",
        Handler::new("panic", |_| -> anyhow::Result<&'static str> { panic!("boom") }),
    )
    .unwrap();
    let mut dispatcher = app.into_dispatcher();

    let response = get(&mut dispatcher, "/panic");
    assert_eq!(response.status, 500);
    assert!(response.body_str().contains("boom"));

    // the dispatcher keeps serving
    assert_eq!(get(&mut dispatcher, "/hello/again").body_str(), "hello again");
}

#[test]
fn test_hidden_error_detail() {
    init_test_logging();
    let config = AppConfig {
        expose_errors: false,
        ..AppConfig::default()
    };
    let mut app = App::with_config(config);
    app.get(
        "/fail",
        Handler::new("fail", |_| -> anyhow::Result<&'static str> { anyhow::bail!("secret detail") }),
    )
    .unwrap();
    let mut dispatcher = app.into_dispatcher();

    let response = get(&mut dispatcher, "/fail");
    assert_eq!(response.status, 500);
    assert_eq!(response.body_str(), "Internal Server Error");
}

#[test]
fn test_unknown_status_is_500() {
    let mut app = app();
    app.get("/weird", Handler::new("weird", |_| Ok(Reply::status(799))))
        .unwrap();
    let mut dispatcher = app.into_dispatcher();

    let response = get(&mut dispatcher, "/weird");
    assert_eq!(response.status, 500);
    assert!(response.body_str().contains("799"));
}

#[test]
fn test_composite_reply() {
    let mut app = app();
    app.post(
        "/items",
        Handler::new("create", |_| {
            Ok(Reply::from("first")
                .with(Reply::json(json!({ "id": 7 })))
                .with_status(201)
                .with_header("Location", "/items/7"))
        }),
    )
    .unwrap()
    .get(
        "/raw",
        Handler::new("raw", |_| {
            Ok(Reply::body(Body::Text("a,b".into())).with_header("Content-Type", "text/csv"))
        }),
    )
    .unwrap()
    .get("/gone", Handler::new("gone", |_| Ok(204u16)))
    .unwrap();
    let mut dispatcher = app.into_dispatcher();

    let response = dispatcher.dispatch(Request::post("/items"));
    assert_eq!(response.status, 201);
    assert_eq!(response.header("location"), Some("/items/7"));
    assert_eq!(response.body_str(), r#"{"id":7}"#);
    assert_eq!(response.header("content-type"), Some("application/json; charset=utf-8"));

    let response = get(&mut dispatcher, "/raw");
    assert_eq!(response.header("content-type"), Some("text/csv"));
    assert_eq!(response.body_str(), "a,b");

    let response = get(&mut dispatcher, "/gone");
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());
}

#[test]
fn test_post_processor_chain() {
    let mut app = app();
    app.get(
        "/shout",
        Handler::new("shout", |_| Ok("quiet"))
            .returns(PostProcessor::body("upper", |body| match body {
                Body::Text(text) => Ok(Body::Text(text.to_uppercase())),
                other => Ok(other),
            }))
            .returns(PostProcessor::invoke(
                Callable::new("stamp", |args| {
                    Ok(Reply::header("X-Length", args.str("body")?.len().to_string())
                        .with_status(202))
                })
                .param("body"),
            )),
    )
    .unwrap();
    let mut dispatcher = app.into_dispatcher();

    let response = get(&mut dispatcher, "/shout");
    assert_eq!(response.status, 202);
    assert_eq!(response.body_str(), "QUIET");
    assert_eq!(response.header("x-length"), Some("5"));
}

#[test]
fn test_failing_post_processor_is_500() {
    let mut app = app();
    app.get(
        "/bad",
        Handler::new("bad", |_| Ok("fine")).returns(PostProcessor::body("explode", |_| {
            anyhow::bail!("processor failed")
        })),
    )
    .unwrap();
    let mut dispatcher = app.into_dispatcher();
    let response = get(&mut dispatcher, "/bad");
    assert_eq!(response.status, 500);
    assert!(response.body_str().contains("processor failed"));
}

#[test]
fn test_etag_round_trip() {
    let mut app = app();
    app.get(
        "/doc",
        Handler::new("doc", |_| Ok("document")).returns(PostProcessor::etag()),
    )
    .unwrap();
    let mut dispatcher = app.into_dispatcher();

    let first = get(&mut dispatcher, "/doc");
    assert_eq!(first.status, 200);
    let etag = first.header("etag").unwrap().to_string();

    let cached = dispatcher.dispatch(Request::get("/doc").with_header("If-None-Match", etag.clone()));
    assert_eq!(cached.status, 304);
    assert!(cached.body.is_empty());
    assert_eq!(cached.header("etag"), Some(etag.as_str()));

    let stale = dispatcher.dispatch(Request::get("/doc").with_header("If-None-Match", "\"other\""));
    assert_eq!(stale.status, 200);
    assert_eq!(stale.body_str(), "document");
}

#[test]
fn test_last_modified_round_trip() {
    let modified = SystemTime::now() - Duration::from_secs(86_400);
    let mut app = app();
    app.get(
        "/page",
        Handler::new("page", move |_| {
            Ok(Reply::from("page").with(Reply::last_modified(modified)))
        }),
    )
    .unwrap();
    let mut dispatcher = app.into_dispatcher();

    let since = httpdate::fmt_http_date(SystemTime::now());
    let response = dispatcher.dispatch(Request::get("/page").with_header("If-Modified-Since", since));
    assert_eq!(response.status, 304);

    let response = dispatcher.dispatch(Request::get("/page").with_header("If-Modified-Since", "garbage"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body_str(), "page");
}

#[test]
fn test_redirect_reply() {
    let mut app = app();
    app.get(
        "/old",
        Handler::new("old", |_| Ok(brrtdispatch::response::redirect("/new", false))),
    )
    .unwrap();
    let mut dispatcher = app.into_dispatcher();
    let response = get(&mut dispatcher, "/old");
    assert_eq!(response.status, 302);
    assert_eq!(response.header("location"), Some("/new"));
}

#[test]
fn test_first_registered_overlap_wins() {
    let mut app = app();
    app.get("/files/<name>", Handler::new("file", |_| Ok("file")))
        .unwrap()
        .get("/files/<name>", Handler::new("shadowed", |_| Ok("shadowed")))
        .unwrap();
    let mut dispatcher = app.into_dispatcher();
    assert_eq!(get(&mut dispatcher, "/files/a.txt").body_str(), "file");
}

#[test]
fn test_path_for_round_trip() {
    let dispatcher = app().into_dispatcher();
    let path = dispatcher.path_for("add", [("bar", 42)]).unwrap();
    assert_eq!(path, "/test/42");
    let mut dispatcher = dispatcher;
    assert_eq!(get(&mut dispatcher, &path).body_str(), "42");

    assert!(dispatcher.path_for("add", Vec::<(&str, i32)>::new()).is_none());
    assert!(dispatcher.path_for("unknown", [("bar", 1)]).is_none());
}
