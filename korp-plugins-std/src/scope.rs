//! Request-scoped callers.

use crate::{
    ambient::{self, AmbientGuard},
    caller::Caller,
    directory::CallerDirectory,
    registry::Registry,
};
use korp_plugins_core::Request;
use std::{ops::Deref, sync::Arc};

/// A caller that lives exactly as long as the handling of one request.
///
/// Entering the scope creates the request's [`Caller`], records it in the
/// directory and makes the request ambient on this thread. Dropping the
/// scope undoes both, also when the handler unwinds.
///
/// ```rust,ignore
/// let scope = RequestScope::enter(request, registry.clone(), CallerDirectory::global());
/// scope.call(hook_points::ENTER_HANDLER, hook_args![args.clone()])?;
/// let result = handler(&args)?;
/// let result = scope.call_chain(hook_points::FILTER_RESULT, result, ())?;
/// ```
#[derive(Debug)]
#[must_use = "the caller is cleaned up when the scope is dropped"]
pub struct RequestScope {
    caller: Arc<Caller>,
    _ambient: AmbientGuard,
}

impl RequestScope {
    /// Enter the scope of `request`.
    pub fn enter(
        request: Arc<dyn Request>,
        registry: Arc<Registry>,
        directory: &Arc<CallerDirectory>,
    ) -> Self {
        let ambient = ambient::enter(Arc::clone(&request));
        let caller = Caller::new(request, registry, directory);
        Self {
            caller,
            _ambient: ambient,
        }
    }

    /// The scoped caller.
    pub fn caller(&self) -> &Arc<Caller> {
        &self.caller
    }
}

impl Deref for RequestScope {
    type Target = Caller;

    fn deref(&self) -> &Caller {
        &self.caller
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.caller.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{registry::RegistryBuilder, testing::TestRequest};
    use korp_plugins_core::{HookArgs, PluginError};
    use serde_json::json;
    use std::panic::{self, AssertUnwindSafe};

    fn registry() -> Arc<Registry> {
        Arc::new(
            RegistryBuilder::new()
                .register_fn("t", "filter_result", |_: &mut HookArgs, _: &dyn Request| {
                    json!("ok")
                })
                .build(),
        )
    }

    #[test]
    fn test_scope_registers_and_cleans_up() {
        let directory = Arc::new(CallerDirectory::new());
        let request = Arc::new(TestRequest::new());
        {
            let scope = RequestScope::enter(request.clone(), registry(), &directory);
            assert!(directory.contains(request.id()));

            let ambient = directory.get_instance(None).unwrap();
            assert!(Arc::ptr_eq(&ambient, scope.caller()));
            assert_eq!(scope.call_collect("filter_result", ()).unwrap(), vec![json!("ok")]);
        }
        assert!(directory.is_empty());
        assert!(ambient::current().is_none());
        assert!(matches!(
            directory.get_instance(Some(request.as_ref())),
            Err(PluginError::NoCaller(_))
        ));
    }

    #[test]
    fn test_scope_cleans_up_on_unwind() {
        let directory = Arc::new(CallerDirectory::new());
        let request = Arc::new(TestRequest::new());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _scope = RequestScope::enter(request.clone(), registry(), &directory);
            panic!("handler failed");
        }));

        assert!(outcome.is_err());
        assert!(directory.is_empty());
        assert!(ambient::current().is_none());
    }

    #[test]
    fn test_scopes_dropped_in_creation_order() {
        let directory = Arc::new(CallerDirectory::new());
        let first = Arc::new(TestRequest::new());
        let second = Arc::new(TestRequest::new());

        let mut scopes = vec![
            RequestScope::enter(first.clone(), registry(), &directory),
            RequestScope::enter(second.clone(), registry(), &directory),
        ];
        drop(scopes.remove(0));

        assert!(!directory.contains(first.id()));
        let ambient = directory.get_instance(None).unwrap();
        assert_eq!(ambient.id(), second.id());
        assert!(Arc::ptr_eq(&ambient, scopes[0].caller()));

        drop(scopes);
        assert!(directory.is_empty());
        assert!(ambient::current().is_none());
    }

    #[test]
    fn test_manual_cleanup_before_drop() {
        let directory = Arc::new(CallerDirectory::new());
        let scope = RequestScope::enter(Arc::new(TestRequest::new()), registry(), &directory);
        assert!(scope.cleanup());
        drop(scope);
        assert!(directory.is_empty());
    }
}
