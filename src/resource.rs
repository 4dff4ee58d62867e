//! REST resources.
//!
//! A [`Resource`] is a bag of handlers. Handlers named after one of the
//! standard [`Action`]s get the conventional route for that action; every
//! other handler becomes a custom action under `path/<id>/<handler name>`.
//! The id placeholder is named `<last path segment>_id`, so a resource at
//! `/posts` captures `posts_id`.

use crate::handler::Handler;
use crate::router::Verb;
use std::fmt;

/// The conventional REST actions, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Query,
    Create,
    Show,
    Replace,
    Modify,
    Destroy,
    New,
    Edit,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Query,
        Action::Create,
        Action::Show,
        Action::Replace,
        Action::Modify,
        Action::Destroy,
        Action::New,
        Action::Edit,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Action::Query => "query",
            Action::Create => "create",
            Action::Show => "show",
            Action::Replace => "replace",
            Action::Modify => "modify",
            Action::Destroy => "destroy",
            Action::New => "new",
            Action::Edit => "edit",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Action::ALL.into_iter().find(|action| action.name() == name)
    }

    #[must_use]
    pub fn verb(self) -> Verb {
        match self {
            Action::Query | Action::Show | Action::New | Action::Edit => Verb::Get,
            Action::Create => Verb::Post,
            Action::Replace => Verb::Put,
            Action::Modify => Verb::Patch,
            Action::Destroy => Verb::Delete,
        }
    }

    /// The route pattern for this action on a resource mounted at `path`.
    #[must_use]
    pub fn pattern(self, path: &str, id: &str) -> String {
        match self {
            Action::Query | Action::Create => path.to_string(),
            Action::Show | Action::Replace | Action::Modify | Action::Destroy => {
                format!("{path}/<{id}>")
            }
            Action::New => format!("{path}/new"),
            Action::Edit => format!("{path}/<{id}>/edit"),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handlers grouped under one resource name.
///
/// ```rust
/// use brrtdispatch::handler::Handler;
/// use brrtdispatch::resource::Resource;
///
/// let posts = Resource::new("posts")
///     .handler(Handler::new("query", |_| Ok("all posts")))
///     .handler(Handler::new("publish", |_| Ok("published")));
///
/// let routes: Vec<String> = posts
///     .routes("/posts")
///     .iter()
///     .map(|(verb, pattern, _)| format!("{verb} {pattern}"))
///     .collect();
/// assert_eq!(routes, ["GET /posts", "GET /posts/<posts_id>/publish"]);
/// ```
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    standard: Vec<(Action, Handler)>,
    custom: Vec<(Verb, Handler)>,
}

impl Resource {
    /// `name` is the path segment used when mounted with `App::resources`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            standard: Vec::new(),
            custom: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a handler; a custom action is routed for GET.
    #[must_use]
    pub fn handler(self, handler: Handler) -> Self {
        self.handler_with(Verb::Get, handler)
    }

    /// Add a handler; `verb` applies only when it is a custom action.
    #[must_use]
    pub fn handler_with(mut self, verb: Verb, handler: Handler) -> Self {
        match Action::from_name(handler.name()) {
            Some(action) => {
                self.standard.retain(|(existing, _)| *existing != action);
                self.standard.push((action, handler));
            }
            None => self.custom.push((verb, handler)),
        }
        self
    }

    /// Expand into `(verb, pattern, handler)` triples for a mount point.
    ///
    /// Standard actions come first in [`Action::ALL`] order, then custom
    /// actions in the order they were added.
    #[must_use]
    pub fn routes(&self, path: &str) -> Vec<(Verb, String, Handler)> {
        let path = path.trim_end_matches('/');
        let id = format!("{}_id", path.rsplit('/').next().unwrap_or_default());

        let mut routes = Vec::with_capacity(self.standard.len() + self.custom.len());
        for action in Action::ALL {
            if let Some((_, handler)) = self.standard.iter().find(|(a, _)| *a == action) {
                routes.push((action.verb(), action.pattern(path, &id), handler.clone()));
            }
        }
        for (verb, handler) in &self.custom {
            routes.push((
                *verb,
                format!("{path}/<{id}>/{}", handler.name()),
                handler.clone(),
            ));
        }
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Handler {
        Handler::new(name.to_string(), |_| Ok(()))
    }

    #[test]
    fn test_full_expansion_order() {
        let mut resource = Resource::new("posts");
        for action in Action::ALL.iter().rev() {
            resource = resource.handler(named(action.name()));
        }
        let expanded: Vec<String> = resource
            .routes("/posts")
            .iter()
            .map(|(verb, pattern, handler)| format!("{verb} {pattern} {}", handler.name()))
            .collect();
        assert_eq!(
            expanded,
            [
                "GET /posts query",
                "POST /posts create",
                "GET /posts/<posts_id> show",
                "PUT /posts/<posts_id> replace",
                "PATCH /posts/<posts_id> modify",
                "DELETE /posts/<posts_id> destroy",
                "GET /posts/new new",
                "GET /posts/<posts_id>/edit edit",
            ]
        );
    }

    #[test]
    fn test_custom_action_verb() {
        let resource = Resource::new("users").handler_with(Verb::Post, named("ban"));
        let routes = resource.routes("/admin/users/");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].0, Verb::Post);
        assert_eq!(routes[0].1, "/admin/users/<users_id>/ban");
    }

    #[test]
    fn test_standard_name_ignores_custom_verb() {
        let resource = Resource::new("posts").handler_with(Verb::Delete, named("show"));
        let routes = resource.routes("/posts");
        assert_eq!(routes[0].0, Verb::Get);
    }

    #[test]
    fn test_duplicate_action_replaces() {
        let resource = Resource::new("posts")
            .handler(named("query"))
            .handler(named("query"));
        assert_eq!(resource.routes("/posts").len(), 1);
    }
}
