//! Directory of live callers, keyed by request identity.
//!
//! Code that only holds the request (or nothing at all, relying on the
//! ambient request of the current thread) reaches the request's [`Caller`]
//! through a [`CallerDirectory`]. Lookups and updates are safe from any
//! number of threads.

use crate::{ambient, caller::Caller};
use dashmap::DashMap;
use korp_plugins_core::{HookArgs, PluginError, Request, RequestId, identity};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::warn;

static GLOBAL: LazyLock<Arc<CallerDirectory>> =
    LazyLock::new(|| Arc::new(CallerDirectory::new()));

/// Thread-safe mapping from request identity to the request's live caller.
#[derive(Debug, Default)]
pub struct CallerDirectory {
    callers: DashMap<RequestId, Arc<Caller>>,
}

impl CallerDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide directory.
    pub fn global() -> &'static Arc<CallerDirectory> {
        &GLOBAL
    }

    pub(crate) fn insert(&self, caller: Arc<Caller>) {
        let id = caller.id();
        if self.callers.insert(id, caller).is_some() {
            warn!(request = %id, "replaced the live plugin caller of a request");
        }
    }

    pub(crate) fn remove_caller(&self, caller: &Caller) -> bool {
        self.callers
            .remove_if(&caller.id(), |_, current| std::ptr::eq(Arc::as_ptr(current), caller))
            .is_some()
    }

    /// The live caller of `request`, or of the ambient request if `None`.
    pub fn get_instance(&self, request: Option<&dyn Request>) -> Result<Arc<Caller>, PluginError> {
        let id = match request {
            Some(request) => identity(request),
            None => {
                let ambient = ambient::current().ok_or(PluginError::NoAmbientRequest)?;
                identity(ambient.as_ref())
            }
        };
        self.get(id).ok_or(PluginError::NoCaller(id))
    }

    /// The live caller registered under `id`.
    pub fn get(&self, id: RequestId) -> Option<Arc<Caller>> {
        self.callers.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a caller is registered under `id`.
    pub fn contains(&self, id: RequestId) -> bool {
        self.callers.contains_key(&id)
    }

    /// Number of live callers.
    pub fn len(&self) -> usize {
        self.callers.len()
    }

    /// Whether no caller is live.
    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }

    /// [`Caller::call`] on the caller of `request` (or the ambient request).
    pub fn call_for_request(
        &self,
        hook_point: &str,
        args: impl Into<HookArgs>,
        request: Option<&dyn Request>,
    ) -> Result<(), PluginError> {
        self.get_instance(request)?.call(hook_point, args)
    }

    /// [`Caller::call_collect`] on the caller of `request` (or the ambient request).
    pub fn call_collect_for_request(
        &self,
        hook_point: &str,
        args: impl Into<HookArgs>,
        request: Option<&dyn Request>,
    ) -> Result<Vec<Value>, PluginError> {
        self.get_instance(request)?.call_collect(hook_point, args)
    }

    /// [`Caller::call_chain`] on the caller of `request` (or the ambient request).
    pub fn call_chain_for_request(
        &self,
        hook_point: &str,
        value: impl Into<Value>,
        args: impl Into<HookArgs>,
        request: Option<&dyn Request>,
    ) -> Result<Value, PluginError> {
        self.get_instance(request)?.call_chain(hook_point, value, args)
    }
}
