//! Route dispatch with ordered before/after hooks.
//!
//! A [`Dispatcher`] owns a name→handler route table plus ordered hook
//! lists. Hooks are plain closures over shared state (rate counters, log
//! sinks) whose lifetime is independent of any single request; `handle()`
//! itself is stateless with respect to the route table.
//!
//! # Pipeline
//!
//! 1. Before hooks run in registration order; the first hook returning a
//!    value short-circuits — that value becomes the response and no
//!    handler or after hook runs.
//! 2. Otherwise the route handler runs (`NotFound` if the route is
//!    absent).
//! 3. After hooks run in registration order, each mutating the response
//!    in place. After hooks never run when a before hook short-circuited.
//!
//! Everything inside `handle()` runs synchronously on the calling thread.

pub mod limits;

pub use limits::{ConcurrencyLimit, RateLimit};

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};

/// A route handler: takes the request payload, returns the response.
pub type RouteHandler = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// A before hook: may short-circuit by returning a response.
pub type BeforeHook = Arc<dyn Fn(&str, &Value) -> Option<Value> + Send + Sync>;

/// An after hook: mutates the response in place.
pub type AfterHook = Arc<dyn Fn(&str, &Value, &mut Value) + Send + Sync>;

/// A name→handler route table with ordered before/after hooks.
#[derive(Default, Clone)]
pub struct Dispatcher {
    routes: IndexMap<String, RouteHandler>,
    before: Vec<BeforeHook>,
    after: Vec<AfterHook>,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route handler, replacing any previous handler for the
    /// same name.
    pub fn route(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    ) {
        self.routes.insert(name.into(), Arc::new(handler));
    }

    /// Registers a before hook.
    pub fn before(&mut self, hook: impl Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static) {
        self.before.push(Arc::new(hook));
    }

    /// Registers a shared before hook.
    pub fn before_arc(&mut self, hook: BeforeHook) {
        self.before.push(hook);
    }

    /// Registers an after hook.
    pub fn after(&mut self, hook: impl Fn(&str, &Value, &mut Value) + Send + Sync + 'static) {
        self.after.push(Arc::new(hook));
    }

    /// Registers a shared after hook.
    pub fn after_arc(&mut self, hook: AfterHook) {
        self.after.push(hook);
    }

    /// Returns `true` if a route with this name is registered.
    #[must_use]
    pub fn has_route(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Returns the registered route names in registration order.
    #[must_use]
    pub fn route_names(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    /// Runs the dispatch pipeline for one request.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unregistered routes and propagates handler
    /// errors.
    pub fn handle(&self, name: &str, payload: &Value) -> Result<Value> {
        for hook in &self.before {
            if let Some(response) = hook(name, payload) {
                tracing::debug!(route = name, "before hook short-circuited dispatch");
                return Ok(response);
            }
        }

        let handler = self
            .routes
            .get(name)
            .ok_or_else(|| Error::not_found(format!("route '{name}'")))?;

        let mut response = handler(payload)?;

        for hook in &self.after {
            hook(name, payload, &mut response);
        }

        Ok(response)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.len())
            .field("before_hooks", &self.before.len())
            .field("after_hooks", &self.after.len())
            .finish()
    }
}
