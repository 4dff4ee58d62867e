//! Cookie-keyed session data backed by the cache.

use crate::cache::MemoryCache;
use crate::cookies::{CookieJar, CookieOptions};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use ulid::Ulid;

/// Where a session keeps its id and data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Cookie carrying the session id
    pub cookie_name: String,
    /// Prefix of the cache key holding the data
    pub key_prefix: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "ksid".to_string(),
            key_prefix: "sid:".to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    sid: Option<String>,
    data: Map<String, Value>,
    dirty: bool,
}

/// Request-scoped session, registered as the `session` dependency.
///
/// The id comes from the session cookie when the cache still knows it. A new
/// id (a ULID) is minted only when one is first needed, which also sets an
/// `HttpOnly` session cookie. [`Session::flush`] writes back only after a
/// change.
#[derive(Debug)]
pub struct Session {
    cookies: Arc<CookieJar>,
    cache: Arc<MemoryCache>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
}

impl Session {
    /// Load the session named by the request's cookie, if any.
    #[must_use]
    pub fn load(cookies: Arc<CookieJar>, cache: Arc<MemoryCache>, settings: SessionSettings) -> Self {
        let mut state = SessionState::default();
        if let Some(sid) = cookies.get(&settings.cookie_name) {
            if let Some(Value::Object(data)) = cache.get(&format!("{}{sid}", settings.key_prefix)) {
                debug!(sid = %sid, keys = data.len(), "Session loaded");
                state.sid = Some(sid);
                state.data = data;
            }
        }
        Self {
            cookies,
            cache,
            settings,
            state: Mutex::new(state),
        }
    }

    /// The session id, minting one (and its cookie) on first need.
    #[must_use]
    pub fn sid(&self) -> String {
        let mut state = self.lock();
        self.ensure_sid(&mut state)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().data.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut state = self.lock();
        state.data.insert(key.into(), value.into());
        state.dirty = true;
    }

    pub fn delete(&self, key: &str) {
        let mut state = self.lock();
        if state.data.remove(key).is_some() {
            state.dirty = true;
        }
    }

    /// Drop all data, the cache entry and the session cookie.
    pub fn destroy(&self) {
        let mut state = self.lock();
        let sid = self.ensure_sid(&mut state);
        state.data.clear();
        state.dirty = false;
        self.cache.delete(&self.cache_key(&sid));
        self.cookies.delete(&self.settings.cookie_name);
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Persist the data when it changed during this request.
    pub fn flush(&self) -> bool {
        let mut state = self.lock();
        if !state.dirty {
            return false;
        }
        let sid = self.ensure_sid(&mut state);
        self.cache
            .set(self.cache_key(&sid), Value::Object(state.data.clone()));
        state.dirty = false;
        debug!(sid = %sid, keys = state.data.len(), "Session flushed");
        true
    }

    fn ensure_sid(&self, state: &mut SessionState) -> String {
        if let Some(sid) = &state.sid {
            return sid.clone();
        }
        let sid = Ulid::new().to_string();
        self.cookies
            .set(&self.settings.cookie_name, &sid, CookieOptions::http_only());
        state.sid = Some(sid.clone());
        sid
    }

    fn cache_key(&self, sid: &str) -> String {
        format!("{}{sid}", self.settings.key_prefix)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fresh(cookie: Option<&str>, cache: &Arc<MemoryCache>) -> (Arc<CookieJar>, Session) {
        let jar = Arc::new(CookieJar::from_header(cookie));
        let session = Session::load(Arc::clone(&jar), Arc::clone(cache), SessionSettings::default());
        (jar, session)
    }

    #[test]
    fn test_untouched_session_writes_nothing() {
        let cache = Arc::new(MemoryCache::new(8));
        let (jar, session) = fresh(None, &cache);
        assert_eq!(session.get("user"), None);
        assert!(!session.flush());
        assert!(cache.is_empty());
        assert!(jar.set_cookie_headers().is_empty());
    }

    #[test]
    fn test_set_flush_and_reload() {
        let cache = Arc::new(MemoryCache::new(8));
        let (jar, session) = fresh(None, &cache);
        session.set("user", "ana");
        assert!(session.flush());
        let sid = session.sid();
        assert_eq!(cache.get(&format!("sid:{sid}")), Some(json!({"user": "ana"})));
        assert_eq!(
            jar.set_cookie_headers(),
            vec![format!("ksid={sid}; HttpOnly")]
        );

        let (_, reloaded) = fresh(Some(&format!("ksid={sid}")), &cache);
        assert_eq!(reloaded.get("user"), Some(json!("ana")));
        assert_eq!(reloaded.sid(), sid);
    }

    #[test]
    fn test_unknown_sid_is_replaced() {
        let cache = Arc::new(MemoryCache::new(8));
        let (_, session) = fresh(Some("ksid=stale"), &cache);
        assert_ne!(session.sid(), "stale");
    }

    #[test]
    fn test_destroy_clears_cache_and_cookie() {
        let cache = Arc::new(MemoryCache::new(8));
        let (_, first) = fresh(None, &cache);
        first.set("n", 1);
        first.flush();
        let sid = first.sid();

        let (jar, session) = fresh(Some(&format!("ksid={sid}")), &cache);
        session.destroy();
        assert!(!session.flush());
        assert!(cache.is_empty());
        assert_eq!(
            jar.set_cookie_headers(),
            vec!["ksid=; Expires=Thu, 01 Jan 1970 00:00:00 GMT".to_string()]
        );
    }
}
