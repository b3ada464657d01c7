//! Per-request dispatch.
//!
//! A [`Caller`] binds one request to a frozen [`Registry`] and invokes the
//! callbacks of a hook point with one of three strategies:
//!
//! - [`call`](Caller::call) runs every applicable callback for its effects.
//! - [`call_collect`](Caller::call_collect) gathers the contributed values.
//! - [`call_chain`](Caller::call_chain) threads a value through the callbacks.
//!
//! All three walk the same registration list in the same order and stop at
//! the first predicate or callback error.

use crate::{directory::CallerDirectory, registry::Registry};
use korp_plugins_core::{ArgError, BoxError, HookArgs, PluginError, Request, RequestId, identity};
use serde_json::Value;
use std::{fmt, sync::Arc};
use tracing::trace;

/// Dispatcher of hook points for a single request.
pub struct Caller {
    request: Arc<dyn Request>,
    id: RequestId,
    registry: Arc<Registry>,
    directory: Arc<CallerDirectory>,
}

impl Caller {
    /// Create a caller for `request` and record it in `directory`.
    ///
    /// A live caller already recorded for the same request identity is
    /// replaced.
    pub fn new(
        request: Arc<dyn Request>,
        registry: Arc<Registry>,
        directory: &Arc<CallerDirectory>,
    ) -> Arc<Self> {
        let id = identity(request.as_ref());
        let caller = Arc::new(Self {
            request,
            id,
            registry,
            directory: Arc::clone(directory),
        });
        directory.insert(Arc::clone(&caller));
        caller
    }

    /// The request this caller dispatches for.
    pub fn request(&self) -> &dyn Request {
        self.request.as_ref()
    }

    /// Identity of the underlying request.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// The registry callbacks are looked up in.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Remove this caller from its directory.
    ///
    /// Only an entry that still points at this caller is removed. A stale
    /// caller whose slot was taken over by a newer caller for the same
    /// request leaves the newer entry in place, and a repeated cleanup is a
    /// no-op. Both cases return `false` instead of failing.
    pub fn cleanup(&self) -> bool {
        self.directory.remove_caller(self)
    }

    /// Invoke every applicable callback of `hook_point`, discarding results.
    pub fn call(&self, hook_point: &str, args: impl Into<HookArgs>) -> Result<(), PluginError> {
        let mut args = args.into();
        self.dispatch(hook_point, &mut args, |_, _| Ok(()))
    }

    /// Invoke every applicable callback of `hook_point` and collect the
    /// values they contribute, in callback order.
    pub fn call_collect(
        &self,
        hook_point: &str,
        args: impl Into<HookArgs>,
    ) -> Result<Vec<Value>, PluginError> {
        let mut args = args.into();
        let mut collected = Vec::new();
        self.dispatch(hook_point, &mut args, |result, _| {
            collected.extend(result);
            Ok(())
        })?;
        Ok(collected)
    }

    /// Thread `value` through the applicable callbacks of `hook_point`.
    ///
    /// Each callback sees the running value as positional argument 0 followed
    /// by `args`. A contributed value replaces the running value; `None`
    /// keeps it, including any change made to it in place. With no
    /// applicable callbacks `value` is returned unchanged.
    ///
    /// Callbacks may edit arguments in place but must not add or remove
    /// positional arguments: the running value would no longer be argument
    /// 0. A callback that does fails with [`ArgError::Reshaped`].
    pub fn call_chain(
        &self,
        hook_point: &str,
        value: impl Into<Value>,
        args: impl Into<HookArgs>,
    ) -> Result<Value, PluginError> {
        let mut args = args.into();
        args.insert(0, value.into());
        let expected = args.len();
        self.dispatch(hook_point, &mut args, |result, args| {
            if args.len() != expected {
                return Err(ArgError::Reshaped {
                    expected,
                    found: args.len(),
                }
                .into());
            }
            if let Some(value) = result {
                args.replace(0, value);
            }
            Ok(())
        })?;
        Ok(args.remove(0).unwrap_or_default())
    }

    fn dispatch<F>(
        &self,
        hook_point: &str,
        args: &mut HookArgs,
        mut combine: F,
    ) -> Result<(), PluginError>
    where
        F: FnMut(Option<Value>, &mut HookArgs) -> Result<(), BoxError>,
    {
        let request = self.request();
        for registration in self.registry.lookup(hook_point) {
            let applies = registration
                .applies_to(request)
                .map_err(|source| PluginError::Predicate {
                    plugin: registration.plugin(),
                    hook_point: hook_point.to_string(),
                    source,
                })?;
            if !applies {
                trace!(
                    hook_point,
                    callback = registration.qualname(),
                    request = %self.id,
                    "callback does not apply"
                );
                continue;
            }

            trace!(
                hook_point,
                callback = registration.qualname(),
                request = %self.id,
                "invoking callback"
            );
            registration
                .invoke(args, request)
                .and_then(|result| combine(result, args))
                .map_err(|source| PluginError::Callback {
                    plugin: registration.plugin(),
                    hook_point: hook_point.to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caller")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
