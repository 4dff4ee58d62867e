//! Route table core - hot path for request routing.
//!
//! Routes are bucketed by the literal prefix in front of their first
//! placeholder. A lookup walks the request path from its full length back to
//! `/`, one trailing segment at a time, and regex-tests only the routes in the
//! buckets it finds.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]

use super::pattern::{CompiledMatcher, ParamVec, RouteError};
use super::verb::Verb;
use http::Method;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Anything that can sit behind a route: it must expose the stable name used
/// for reverse routing.
pub trait RouteTarget {
    fn route_name(&self) -> &str;
}

impl RouteTarget for &'static str {
    fn route_name(&self) -> &str {
        self
    }
}

impl RouteTarget for String {
    fn route_name(&self) -> &str {
        self
    }
}

impl<T: RouteTarget + ?Sized> RouteTarget for std::sync::Arc<T> {
    fn route_name(&self) -> &str {
        (**self).route_name()
    }
}

/// One `(verb, pattern, target)` binding.
#[derive(Debug, Clone)]
pub struct Route<H> {
    pub verb: Verb,
    pub matcher: CompiledMatcher,
    pub target: H,
}

/// Result of successfully matching a request path to a route.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    /// The route's target (handler)
    pub target: &'a H,
    /// The pattern the request matched, e.g. `/hello/<name>`
    pub pattern: &'a str,
    /// Captured placeholder values in declaration order
    pub captures: ParamVec,
}

impl<H> RouteMatch<'_, H> {
    /// Get a captured value by name.
    #[inline]
    #[must_use]
    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Prefix-indexed route table.
///
/// Written once while the application is assembled, read-only afterwards.
/// Among overlapping patterns the longest static-index bucket is consulted
/// first and, inside a bucket, the first-registered route wins. Pattern
/// specificity is never considered.
#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    routes: Vec<Route<H>>,
    index: HashMap<String, Vec<usize>>,
    reverse: HashMap<String, usize>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            index: HashMap::new(),
            reverse: HashMap::new(),
        }
    }
}

impl<H: RouteTarget> RouteTable<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern` and append the route to its static-index bucket.
    ///
    /// The first route registered for a target name owns that name for
    /// [`RouteTable::path_for`].
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] when the pattern does not compile.
    pub fn add(&mut self, verb: Verb, pattern: &str, target: H) -> Result<(), RouteError> {
        let matcher = CompiledMatcher::compile(pattern)?;
        let key = matcher.static_prefix().to_string();
        let position = self.routes.len();

        self.reverse
            .entry(target.route_name().to_string())
            .or_insert(position);

        debug!(
            verb = %verb,
            pattern = %pattern,
            handler_name = %target.route_name(),
            bucket = %key,
            "Route registered"
        );

        self.index.entry(key).or_default().push(position);
        self.routes.push(Route {
            verb,
            matcher,
            target,
        });
        Ok(())
    }

    /// Match a request to a route.
    ///
    /// # Returns
    ///
    /// * `Some(RouteMatch)` - the first route, longest bucket first, whose verb
    ///   matches and whose matcher accepts the full path
    /// * `None` - no bucket/verb/matcher combination succeeds (results in 404)
    #[must_use]
    pub fn dispatch(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, H>> {
        debug!(method = %method, path = %path, "Route match attempt");

        let Some(verb) = Verb::from_method(method) else {
            warn!(method = %method, path = %path, "Unsupported method");
            return None;
        };

        for prefix in candidate_prefixes(path) {
            let Some(bucket) = self.index.get(prefix) else {
                continue;
            };
            for &position in bucket {
                let route = &self.routes[position];
                if route.verb != verb {
                    continue;
                }
                if let Some(captures) = route.matcher.captures(path) {
                    debug!(
                        method = %method,
                        path = %path,
                        handler_name = %route.target.route_name(),
                        route_pattern = %route.matcher.source(),
                        bucket = %prefix,
                        path_params = ?captures,
                        "Route matched"
                    );
                    return Some(RouteMatch {
                        target: &route.target,
                        pattern: route.matcher.source(),
                        captures,
                    });
                }
            }
        }

        warn!(method = %method, path = %path, "No route matched");
        None
    }

    /// Reverse routing: expand the pattern registered for `name` with `params`.
    ///
    /// Returns `None` when `name` was never registered or a placeholder has no
    /// value. Extra parameters are ignored.
    pub fn path_for<I, K, V>(&self, name: &str, params: I) -> Option<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let route = &self.routes[*self.reverse.get(name)?];
        let values: HashMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
            .collect();
        route
            .matcher
            .expand(|placeholder| values.get(placeholder).map(String::as_str))
    }

    /// Log a one-line summary of the table at startup.
    pub fn log_summary(&self) {
        let routes_summary: Vec<String> = self
            .routes
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.verb, r.matcher.source()))
            .collect();
        info!(
            routes_count = self.routes.len(),
            buckets = self.index.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );
    }
}

impl<H> RouteTable<H> {
    /// Registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route<H>> {
        self.routes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<H: RouteTarget> fmt::Display for RouteTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for route in &self.routes {
            writeln!(
                f,
                "{:<6} {} -> {}",
                route.verb.as_str(),
                route.matcher.source(),
                route.target.route_name()
            )?;
        }
        Ok(())
    }
}

/// The full path, then every prefix ending in `/`, longest first.
fn candidate_prefixes(path: &str) -> impl Iterator<Item = &str> {
    let full = path.len();
    std::iter::once(path).chain(
        path.char_indices()
            .rev()
            .filter(move |&(i, c)| c == '/' && i + 1 < full)
            .map(move |(i, _)| &path[..=i]),
    )
}

#[cfg(test)]
pub(crate) fn prefixes_of(path: &str) -> Vec<&str> {
    candidate_prefixes(path).collect()
}
