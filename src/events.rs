//! Status-code listeners.
//!
//! Listeners run after a dispatch settles on its final code. They see the
//! code, path and method first, then the registry, through the same invoker
//! as every other callable. A failing or panicking listener is logged; it
//! never changes the response and never stops the listeners after it.

use crate::dispatcher::panic_message;
use crate::registry::{invoke, Callable, Registry};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error};

/// Listeners keyed by status code, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct EventEmitter {
    listeners: HashMap<u16, Vec<Callable<()>>>,
}

impl EventEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, code: u16, listener: Callable<()>) {
        debug!(code, listener = %listener.name(), "Listener registered");
        self.listeners.entry(code).or_default().push(listener);
    }

    #[must_use]
    pub fn listener_count(&self, code: u16) -> usize {
        self.listeners.get(&code).map_or(0, Vec::len)
    }

    /// Run every listener registered for `code`. Returns how many succeeded.
    pub fn emit(&self, code: u16, path: &str, method: &str, registry: &mut Registry) -> usize {
        let Some(listeners) = self.listeners.get(&code) else {
            return 0;
        };
        let mut event = Map::new();
        event.insert("code".to_string(), Value::from(code));
        event.insert("path".to_string(), Value::from(path));
        event.insert("method".to_string(), Value::from(method));

        let mut succeeded = 0;
        for listener in listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                invoke(listener, &mut [&mut event, &mut *registry])
            }))
            .unwrap_or_else(|panic| {
                Err(anyhow::anyhow!(
                    "listener panicked: {}",
                    panic_message(panic.as_ref())
                ))
            });
            match outcome {
                Ok(()) => succeeded += 1,
                Err(err) => error!(
                    code,
                    path = %path,
                    listener = %listener.name(),
                    error = %format!("{err:#}"),
                    "Event listener failed"
                ),
            }
        }
        succeeded
    }
}
