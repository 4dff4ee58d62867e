use super::core::prefixes_of;
use super::{CompiledMatcher, RouteError, RouteTable, Verb};
use http::Method;

fn table() -> RouteTable<&'static str> {
    let mut table = RouteTable::new();
    table.add(Verb::Get, "/", "handler4").unwrap();
    table.add(Verb::Get, "/path", "handler").unwrap();
    table.add(Verb::Post, "/path", "handler2").unwrap();
    table.add(Verb::Get, "/error", "handler3").unwrap();
    table
}

#[test]
fn test_dispatch_static_routes() {
    let table = table();

    let m = table.dispatch(&Method::GET, "/path").unwrap();
    assert_eq!(*m.target, "handler");
    assert!(m.captures.is_empty());

    let m = table.dispatch(&Method::POST, "/path").unwrap();
    assert_eq!(*m.target, "handler2");

    let m = table.dispatch(&Method::GET, "/error").unwrap();
    assert_eq!(*m.target, "handler3");

    let m = table.dispatch(&Method::GET, "/").unwrap();
    assert_eq!(*m.target, "handler4");
}

#[test]
fn test_unregistered_method_is_not_found() {
    let table = table();
    assert!(table.dispatch(&Method::DELETE, "/path").is_none());
    assert!(table.dispatch(&Method::OPTIONS, "/path").is_none());
    assert!(table.dispatch(&Method::GET, "/missing").is_none());
}

#[test]
fn test_dispatch_with_params() {
    let mut table = RouteTable::new();
    table.add(Verb::Get, "/res/<key>:<value>", "handler").unwrap();

    assert!(table.dispatch(&Method::GET, "/res").is_none());
    assert!(table.dispatch(&Method::GET, "/res/key:").is_none());

    let m = table.dispatch(&Method::GET, "/res/_k1:=v1").unwrap();
    assert_eq!(*m.target, "handler");
    assert_eq!(m.capture("key"), Some("_k1"));
    assert_eq!(m.capture("value"), Some("=v1"));
}

#[test]
fn test_captures_keep_declaration_order() {
    let mut table = RouteTable::new();
    table
        .add(Verb::Get, "/users/<user_id>/posts/<post_id>", "get_post")
        .unwrap();
    let m = table.dispatch(&Method::GET, "/users/7/posts/abc").unwrap();
    let names: Vec<&str> = m.captures.iter().map(|(k, _)| k.as_ref()).collect();
    assert_eq!(names, vec!["user_id", "post_id"]);
    assert_eq!(m.pattern, "/users/<user_id>/posts/<post_id>");
}

#[test]
fn test_patterns_are_anchored() {
    let mut table = RouteTable::new();
    table.add(Verb::Get, "/hello/<name>", "hello").unwrap();
    assert!(table.dispatch(&Method::GET, "/hello/klar/extra").is_none());
    assert!(table.dispatch(&Method::GET, "/prefix/hello/klar").is_none());
    assert!(table.dispatch(&Method::GET, "/hello/").is_none());
}

#[test]
fn test_reverse() {
    let mut table = RouteTable::new();
    table.add(Verb::Get, "/avatar/<id>.<ext>", "handler").unwrap();
    let url = table.path_for("handler", [("id", "13132"), ("ext", "png")]);
    assert_eq!(url.as_deref(), Some("/avatar/13132.png"));
}

#[test]
fn test_reverse_failures() {
    let mut table = RouteTable::new();
    table.add(Verb::Get, "/avatar/<id>.<ext>", "handler").unwrap();
    assert_eq!(table.path_for("handler", [("id", "1")]), None);
    assert_eq!(table.path_for("unknown", [("id", "1"), ("ext", "png")]), None);
}

#[test]
fn test_reverse_round_trips_through_dispatch() {
    let mut table = RouteTable::new();
    table.add(Verb::Get, "/", "root").unwrap();
    table.add(Verb::Put, "/zoo/<kind>/<id>", "update").unwrap();
    table.add(Verb::Get, "/files/<name>.<ext>", "file").unwrap();

    let cases: Vec<(&str, Method, Vec<(&str, &str)>)> = vec![
        ("root", Method::GET, vec![]),
        ("update", Method::PUT, vec![("kind", "cats"), ("id", "42")]),
        ("file", Method::GET, vec![("name", "report"), ("ext", "pdf")]),
    ];
    for (name, method, params) in cases {
        let path = table.path_for(name, params.clone()).unwrap();
        let m = table.dispatch(&method, &path).unwrap();
        assert_eq!(*m.target, name);
        for (k, v) in params {
            assert_eq!(m.capture(k), Some(v), "capture {k} for {path}");
        }
    }
}

#[test]
fn test_first_registered_wins_within_bucket() {
    let mut table = RouteTable::new();
    table.add(Verb::Get, "/items/<id>", "show").unwrap();
    table.add(Verb::Get, "/items/<slug>", "by_slug").unwrap();
    let m = table.dispatch(&Method::GET, "/items/abc").unwrap();
    assert_eq!(*m.target, "show");

    let mut reversed = RouteTable::new();
    reversed.add(Verb::Get, "/items/<slug>", "by_slug").unwrap();
    reversed.add(Verb::Get, "/items/<id>", "show").unwrap();
    let m = reversed.dispatch(&Method::GET, "/items/abc").unwrap();
    assert_eq!(*m.target, "by_slug");
}

#[test]
fn test_longer_bucket_is_consulted_first() {
    let mut table = RouteTable::new();
    table.add(Verb::Get, "/items/<id>", "show").unwrap();
    table.add(Verb::Get, "/items/new", "new").unwrap();
    assert_eq!(*table.dispatch(&Method::GET, "/items/new").unwrap().target, "new");
    assert_eq!(*table.dispatch(&Method::GET, "/items/7").unwrap().target, "show");
}

#[test]
fn test_falls_back_to_shorter_bucket() {
    let mut table = RouteTable::new();
    table.add(Verb::Get, "/a/<rest>/c", "deep").unwrap();
    table.add(Verb::Get, "/a/b/<x>", "literal_b").unwrap();
    // "/a/b/" bucket only holds literal_b; "/a/b/c" matches it first.
    assert_eq!(*table.dispatch(&Method::GET, "/a/b/c").unwrap().target, "literal_b");
    // "/a/z/c" has no "/a/z/" bucket and falls back to "/a/".
    assert_eq!(*table.dispatch(&Method::GET, "/a/z/c").unwrap().target, "deep");
}

#[test]
fn test_candidate_prefixes() {
    assert_eq!(prefixes_of("/hello/klar"), vec!["/hello/klar", "/hello/", "/"]);
    assert_eq!(prefixes_of("/hello/"), vec!["/hello/", "/"]);
    assert_eq!(prefixes_of("/"), vec!["/"]);
}

#[test]
fn test_static_prefix() {
    let key = |p: &str| CompiledMatcher::compile(p).unwrap().static_prefix().to_string();
    assert_eq!(key("/"), "/");
    assert_eq!(key("/foo"), "/foo");
    assert_eq!(key("/hello/<name>"), "/hello/");
    assert_eq!(key("/avatar/img-<id>"), "/avatar/");
    assert_eq!(key("/<a>/<b>"), "/");
}

#[test]
fn test_invalid_patterns() {
    for pattern in ["no-slash", "/open/<name", "/empty/<>", "/bad/<1x>", "/dup/<a>/<a>"] {
        let err = CompiledMatcher::compile(pattern).unwrap_err();
        assert!(matches!(err, RouteError::InvalidPattern { .. }), "{pattern}");
    }
}

#[test]
fn test_literal_regex_characters_are_escaped() {
    let mut table = RouteTable::new();
    table.add(Verb::Get, "/v1.0/<id>", "versioned").unwrap();
    assert!(table.dispatch(&Method::GET, "/v1.0/5").is_some());
    assert!(table.dispatch(&Method::GET, "/v1x0/5").is_none());
}

#[test]
fn test_display_lists_routes() {
    let rendered = table().to_string();
    assert!(rendered.contains("GET    /path -> handler"));
    assert!(rendered.contains("POST   /path -> handler2"));
}

#[test]
fn test_reverse_routing_encodes_values() {
    let mut table = RouteTable::new();
    table.add(Verb::Get, "/hello/<name>", "hello").unwrap();
    assert_eq!(
        table.path_for("hello", [("name", "kl ar/é?")]).as_deref(),
        Some("/hello/kl%20ar%2F%C3%A9%3F")
    );
}
