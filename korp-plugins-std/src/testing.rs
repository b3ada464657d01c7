//! Testing utilities for Korp plugins.
//!
//! This module provides stand-ins for the host framework so that plugins
//! and callers can be exercised without a web server.
//!
//! # Features
//!
//! - [`TestRequest`]: A request with an endpoint and parameters
//! - [`ProxyRequest`]: A wrapper that resolves to another request
//! - [`CallLog`]: A shared, cloneable record of callback invocations
//! - [`RecordingSink`]: A route sink that keeps the routes it is given

use crate::endpoint::{RouteDef, RouteSink};
use korp_plugins_core::{Request, RequestId};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

// ============================================================================
// Requests
// ============================================================================

/// A request for tests, with a fresh identity.
///
/// # Example
///
/// ```rust,ignore
/// let request = TestRequest::new()
///     .endpoint("query")
///     .param("corpus", "suomi24");
/// ```
#[derive(Debug, Clone)]
pub struct TestRequest {
    id: RequestId,
    endpoint: Option<String>,
    params: HashMap<String, String>,
}

impl TestRequest {
    /// Create a request with a fresh identity.
    pub fn new() -> Self {
        Self {
            id: RequestId::next(),
            endpoint: None,
            params: HashMap::new(),
        }
    }

    /// Set the endpoint name.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add a request parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

impl Default for TestRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl Request for TestRequest {
    fn id(&self) -> RequestId {
        self.id
    }

    fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// A wrapper with its own identity that resolves to an inner request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    id: RequestId,
    inner: Arc<dyn Request>,
}

impl ProxyRequest {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn Request>) -> Self {
        Self {
            id: RequestId::next(),
            inner,
        }
    }
}

impl Request for ProxyRequest {
    fn id(&self) -> RequestId {
        self.id
    }

    fn endpoint(&self) -> Option<&str> {
        self.inner.endpoint()
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.inner.param(name)
    }

    fn resolve(&self) -> Option<&dyn Request> {
        Some(self.inner.as_ref())
    }
}

// ============================================================================
// Call Log
// ============================================================================

/// A shared log of entries recorded by callbacks.
///
/// Clones share the same log.
///
/// # Example
///
/// ```rust,ignore
/// let log = CallLog::new();
/// log.record("logger::enter_handler");
/// assert_eq!(log.entries(), vec!["logger::enter_handler"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    /// Get a copy of the entries.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

// ============================================================================
// Recording Sink
// ============================================================================

/// A route sink that keeps every route it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    routes: Vec<RouteDef>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The routes received so far, in order.
    pub fn routes(&self) -> &[RouteDef] {
        &self.routes
    }

    /// The route with the given rule.
    pub fn route(&self, rule: &str) -> Option<&RouteDef> {
        self.routes.iter().find(|route| route.rule == rule)
    }
}

impl RouteSink for RecordingSink {
    fn add_route(&mut self, route: RouteDef) {
        self.routes.push(route);
    }
}
