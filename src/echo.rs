//! Demo application behind the `brrtdispatch` binary.
//!
//! Small handlers that echo their inputs back, one per feature of the
//! dispatch core, so the CLI can exercise routing, binding, post-processing,
//! sessions and resources without a socket server.

use crate::app::App;
use crate::handler::{Annotation, Handler, Param};
use crate::multipart::Uploads;
use crate::registry::Callable;
use crate::request::Request;
use crate::resource::Resource;
use crate::response::{redirect, PostProcessor, Reply};
use crate::runtime_config::AppConfig;
use crate::session::Session;
use serde_json::json;
use tracing::info;

/// Build the demo application.
///
/// # Errors
///
/// Only if one of the built-in patterns fails to compile.
pub fn demo_app(config: AppConfig) -> anyhow::Result<App> {
    let mut app = App::with_config(config);

    app.get("/hello", Handler::new("hello", |_| Ok("klar")))?
        .get(
            "/hello/<name>",
            Handler::new("greet", |args| Ok(format!("hello {}", args.str("name")?))),
        )?
        .get(
            "/test/<bar>",
            Handler::new("add", |args| {
                Ok((args.i64("bar")? + args.i64("foo")?).to_string())
            })
            .annotated("bar", Annotation::integer())
            .param(Param::new("foo").default(0).annotate(Annotation::integer())),
        )?
        .get(
            "/items/<item>",
            Handler::new("item", |args| Ok(Reply::json(json!({ "item": args.value("item")? }))))
                .annotated(
                    "item",
                    Annotation::schema(json!({ "type": "string", "pattern": "^[0-9]+$" })),
                ),
        )?
        .post(
            "/echo",
            Handler::new("echo", |args| Ok(Reply::json(args.value("body")?.clone())))
                .param("body")
                .returns(PostProcessor::etag()),
        )?
        .get(
            "/request",
            Handler::new("inspect", |args| {
                let request = args.dependency::<Request>("request")?;
                Ok(Reply::json(json!({
                    "method": request.method.as_str(),
                    "path": request.path,
                    "query": args.value("query")?,
                    "headers": args.value("headers")?,
                })))
            })
            .param("request")
            .param("query")
            .param("headers"),
        )?
        .post(
            "/upload",
            Handler::new("upload", |args| {
                let uploads = args.dependency::<Uploads>("uploads")?;
                let files: Vec<_> = uploads
                    .iter()
                    .map(|u| json!({ "field": u.field, "filename": u.filename, "size": u.len() }))
                    .collect();
                Ok(Reply::json(json!({ "fields": args.value("body")?, "files": files })))
            })
            .param("uploads")
            .param("body"),
        )?
        .get(
            "/visits",
            Handler::new("visits", |args| {
                let session = args.dependency::<Session>("session")?;
                let visits = session.get("visits").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
                session.set("visits", visits);
                Ok(visits.to_string())
            })
            .param("session"),
        )?
        .get("/old", Handler::new("old", |_| Ok(redirect("/hello", true))))?;

    let posts = Resource::new("posts")
        .handler(Handler::new("query", |_| Ok(Reply::json(json!([])))))
        .handler(Handler::new("new", |_| Ok("new post form")))
        .handler(Handler::new("show", |args| {
            Ok(format!("post {}", args.str("posts_id")?))
        }));
    app.resource("/posts", &posts)?;

    app.on(
        404,
        Callable::new("log_miss", |args| {
            info!(path = %args.str("path")?, method = %args.str("method")?, "Demo route miss");
            Ok(())
        })
        .param("path")
        .param("method"),
    );

    Ok(app)
}
