use super::*;
use crate::dispatcher::{DispatchError, HttpError};
use crate::registry::{Arg, Factory, Registry, Scope};
use crate::router::ParamVec;
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn captures(pairs: &[(&str, &str)]) -> ParamVec {
    pairs
        .iter()
        .map(|(k, v)| (Arc::from(*k), (*v).to_string()))
        .collect()
}

fn query(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn noop(name: &str) -> Handler {
    Handler::new(name.to_string(), |_| Ok(()))
}

#[test]
fn test_captures_beat_query_beat_defaults() {
    let handler = noop("h")
        .param(Param::new("a").default("default"))
        .param(Param::new("b").default("default"))
        .param(Param::new("c").default("default"));
    let mut registry = Registry::new();

    let args = bind(
        &handler,
        &captures(&[("a", "path")]),
        &query(json!({ "a": "query", "b": "query" })),
        &mut registry,
    )
    .unwrap();

    assert_eq!(args.str("a").unwrap(), "path");
    assert_eq!(args.str("b").unwrap(), "query");
    assert_eq!(args.str("c").unwrap(), "default");
}

#[test]
fn test_dependencies_beat_request_values() {
    let handler = noop("h").param("db");
    let mut registry = Registry::new();
    registry.register("db", Factory::value(json!("injected")), Scope::Persistent);

    let args = bind(
        &handler,
        &captures(&[("db", "path")]),
        &query(json!({ "db": "query" })),
        &mut registry,
    )
    .unwrap();
    assert_eq!(args.str("db").unwrap(), "injected");
}

#[test]
fn test_only_declared_params_in_declared_order() {
    let handler = noop("h").param("second").param("first");
    let mut registry = Registry::new();
    let args = bind(
        &handler,
        &ParamVec::new(),
        &query(json!({ "first": "1", "second": "2", "extra": "3" })),
        &mut registry,
    )
    .unwrap();
    assert_eq!(args.names().collect::<Vec<_>>(), ["second", "first"]);
}

#[test]
fn test_missing_annotated_param_is_400() {
    let handler = noop("h").annotated("bar", Annotation::integer());
    let err = bind(&handler, &ParamVec::new(), &Map::new(), &mut Registry::new()).unwrap_err();
    assert!(matches!(err, DispatchError::MissingRequiredParameter { ref name } if name == "bar"));
    assert_eq!(err.status(), 400);
    assert_eq!(err.to_string(), "bar is required");
}

#[test]
fn test_missing_plain_param_is_500() {
    let handler = noop("h").param("mystery");
    let err = bind(&handler, &ParamVec::new(), &Map::new(), &mut Registry::new()).unwrap_err();
    assert!(matches!(err, DispatchError::UnresolvableParameter { .. }));
    assert_eq!(err.status(), 500);
}

#[test]
fn test_schema_rejects_object_for_array() {
    let handler = noop("h").annotated("items", Annotation::schema(json!({ "type": "array" })));
    let mut registry = Registry::new();
    registry.register("items", Factory::value(json!({ "key": "value" })), Scope::Request);

    let err = bind(&handler, &ParamVec::new(), &Map::new(), &mut registry).unwrap_err();
    assert!(matches!(err, DispatchError::SchemaValidationFailed { .. }));
    assert_eq!(err.status(), 400);
}

#[test]
fn test_schema_passes_value_through() {
    let handler = noop("h").annotated("items", Annotation::schema(json!({ "type": "array" })));
    let mut registry = Registry::new();
    registry.register("items", Factory::value(json!(["key", "value"])), Scope::Request);

    let args = bind(&handler, &ParamVec::new(), &Map::new(), &mut registry).unwrap();
    assert_eq!(args.value("items").unwrap(), &json!(["key", "value"]));
}

#[test]
fn test_broken_schema_is_500() {
    let handler = noop("h").annotated("x", Annotation::schema(json!({ "type": 12 })));
    let err = bind(
        &handler,
        &ParamVec::new(),
        &query(json!({ "x": "1" })),
        &mut Registry::new(),
    )
    .unwrap_err();
    assert!(matches!(err, DispatchError::SchemaDefinitionInvalid { .. }));
    assert_eq!(err.status(), 500);
}

#[test]
fn test_transform_applies_to_capture_and_default() {
    let handler = noop("add")
        .annotated("bar", Annotation::integer())
        .param(Param::new("foo").default("0").annotate(Annotation::integer()));
    let args = bind(
        &handler,
        &captures(&[("bar", "200")]),
        &Map::new(),
        &mut Registry::new(),
    )
    .unwrap();
    assert_eq!(args.i64("bar").unwrap(), 200);
    assert_eq!(args.i64("foo").unwrap(), 0);
}

#[test]
fn test_failing_transform_is_uncaught_failure() {
    let handler = noop("h").annotated("n", Annotation::integer());
    let err = bind(
        &handler,
        &captures(&[("n", "abc")]),
        &Map::new(),
        &mut Registry::new(),
    )
    .unwrap_err();
    assert!(matches!(err, DispatchError::UncaughtHandlerFailure(_)));
    assert_eq!(err.status(), 500);
}

#[test]
fn test_transform_may_raise_http_error() {
    let handler = noop("h").annotated(
        "age",
        Annotation::transform("adult", |value| {
            if value.as_str().and_then(|s| s.parse::<u32>().ok()).unwrap_or(0) >= 18 {
                Ok(value)
            } else {
                Err(HttpError::forbidden("too young").into())
            }
        }),
    );
    let err = bind(
        &handler,
        &captures(&[("age", "12")]),
        &Map::new(),
        &mut Registry::new(),
    )
    .unwrap_err();
    assert_eq!(err.status(), 403);
    assert_eq!(err.to_string(), "too young");
}

#[test]
fn test_annotation_on_instance_is_rejected() {
    struct Db;
    let handler = noop("h").annotated("db", Annotation::string());
    let mut registry = Registry::new();
    registry.register("db", Factory::instance(Db), Scope::Persistent);

    let err = bind(&handler, &ParamVec::new(), &Map::new(), &mut registry).unwrap_err();
    assert!(matches!(err, DispatchError::InvalidAnnotation { .. }));
}

#[test]
fn test_unknown_factory_failure_is_dependency_error() {
    let handler = noop("h").param("broken");
    let mut registry = Registry::new();
    registry.register(
        "broken",
        Factory::constructor(|| -> anyhow::Result<u8> { anyhow::bail!("no connection") }),
        Scope::Request,
    );

    let err = bind(&handler, &ParamVec::new(), &Map::new(), &mut registry).unwrap_err();
    assert!(matches!(err, DispatchError::Dependency(_)));
    assert_eq!(err.status(), 500);
}

#[test]
fn test_opaque_dependency_binds_as_instance() {
    struct Db(&'static str);
    let handler = Handler::new("h", |args| Ok(args.dependency::<Db>("db")?.0))
        .param("db");
    let mut registry = Registry::new();
    registry.register("db", Factory::instance(Db("sqlite")), Scope::Persistent);

    let args = bind(&handler, &ParamVec::new(), &Map::new(), &mut registry).unwrap();
    assert!(matches!(args.get("db"), Some(Arg::Instance(_))));
    assert!(matches!(handler.call(args).unwrap(), crate::response::Reply::Body(_)));
}

#[test]
fn test_handler_metadata() {
    let handler = noop("h")
        .param("a")
        .annotated("b", Annotation::boolean())
        .returns(crate::response::PostProcessor::json());
    assert_eq!(handler.params().len(), 2);
    assert!(handler.params()[0].annotation().is_none());
    assert!(handler.params()[1].annotation().is_some());
    assert_eq!(handler.post_processors().len(), 1);
}
