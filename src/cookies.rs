//! Request-scoped cookie jar.
//!
//! Reads the incoming `Cookie` header once and records every change made
//! during the request. The dispatcher emits one `Set-Cookie` header per
//! changed cookie, and only when the jar was resolved at all.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Attributes of an outgoing cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<u64>,
    pub expires: Option<SystemTime>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<String>,
}

impl CookieOptions {
    #[must_use]
    pub fn http_only() -> Self {
        Self {
            http_only: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// A cookie set during the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl Cookie {
    /// The `Set-Cookie` header value.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        let options = &self.options;
        if let Some(expires) = options.expires {
            out.push_str("; Expires=");
            out.push_str(&httpdate::fmt_http_date(expires));
        }
        if let Some(max_age) = options.max_age {
            out.push_str("; Max-Age=");
            out.push_str(&max_age.to_string());
        }
        if let Some(domain) = &options.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if let Some(path) = &options.path {
            out.push_str("; Path=");
            out.push_str(path);
        }
        if options.secure {
            out.push_str("; Secure");
        }
        if options.http_only {
            out.push_str("; HttpOnly");
        }
        if let Some(same_site) = &options.same_site {
            out.push_str("; SameSite=");
            out.push_str(same_site);
        }
        out
    }
}

#[derive(Debug, Default)]
struct JarState {
    incoming: HashMap<String, String>,
    changed: Vec<Cookie>,
}

/// Cookies of one request, registered as the request-scoped `cookies`
/// dependency.
#[derive(Debug, Default)]
pub struct CookieJar {
    state: Mutex<JarState>,
}

impl CookieJar {
    /// Parse a `Cookie` request header (`a=1; b=2`).
    #[must_use]
    pub fn from_header(header: Option<&str>) -> Self {
        let incoming = header
            .map(|raw| {
                raw.split(';')
                    .filter_map(|pair| {
                        let (name, value) = pair.trim().split_once('=')?;
                        let name = name.trim();
                        if name.is_empty() {
                            return None;
                        }
                        Some((
                            name.to_string(),
                            value.trim().trim_matches('"').to_string(),
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            state: Mutex::new(JarState {
                incoming,
                changed: Vec::new(),
            }),
        }
    }

    /// Current value: a cookie set during this request wins over the
    /// incoming one.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let state = self.lock();
        state
            .changed
            .iter()
            .rfind(|c| c.name == name)
            .map(|c| c.value.clone())
            .or_else(|| state.incoming.get(name).cloned())
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>, options: CookieOptions) {
        let cookie = Cookie {
            name: name.into(),
            value: value.into(),
            options,
        };
        let mut state = self.lock();
        match state.changed.iter_mut().find(|c| c.name == cookie.name) {
            Some(slot) => *slot = cookie,
            None => state.changed.push(cookie),
        }
    }

    /// Set a cookie that lives for `lifetime` (`Max-Age` and `Expires`).
    pub fn set_for(&self, name: impl Into<String>, value: impl Into<String>, lifetime: Duration) {
        let options = CookieOptions {
            max_age: Some(lifetime.as_secs()),
            expires: Some(SystemTime::now() + lifetime),
            ..CookieOptions::default()
        };
        self.set(name, value, options);
    }

    /// Expire `name` on the client. No-op for unknown cookies.
    pub fn delete(&self, name: &str) {
        if self.get(name).is_none() {
            return;
        }
        let options = CookieOptions {
            expires: Some(UNIX_EPOCH),
            ..CookieOptions::default()
        };
        self.set(name, "", options);
    }

    /// Cookies changed during this request, in the order first set.
    #[must_use]
    pub fn changes(&self) -> Vec<Cookie> {
        self.lock().changed.clone()
    }

    /// One `Set-Cookie` value per changed cookie.
    #[must_use]
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.lock()
            .changed
            .iter()
            .map(Cookie::to_header_value)
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, JarState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
