//! The ambient request of the current thread.
//!
//! Hosts that serve each request on one thread enter the request here so
//! that code without a request handle can still reach the request's caller
//! via [`CallerDirectory::get_instance(None)`](crate::CallerDirectory::get_instance).
//! Entries nest; the most recently entered one that is still alive is
//! current.

use korp_plugins_core::Request;
use std::{
    cell::{Cell, RefCell},
    marker::PhantomData,
    sync::Arc,
};

thread_local! {
    static AMBIENT: RefCell<Vec<(u64, Arc<dyn Request>)>> = const { RefCell::new(Vec::new()) };
    static NEXT_TOKEN: Cell<u64> = const { Cell::new(0) };
}

/// The innermost ambient request of this thread.
pub fn current() -> Option<Arc<dyn Request>> {
    AMBIENT.with_borrow(|stack| stack.last().map(|(_, request)| Arc::clone(request)))
}

/// Make `request` the ambient request until the guard is dropped.
pub fn enter(request: Arc<dyn Request>) -> AmbientGuard {
    let token = NEXT_TOKEN.replace(NEXT_TOKEN.get().wrapping_add(1));
    AMBIENT.with_borrow_mut(|stack| stack.push((token, request)));
    AmbientGuard {
        token,
        _not_send: PhantomData,
    }
}

/// Withdraws its request from the ambient stack when dropped.
///
/// Guards may be dropped in any order. Dropping an inner guard restores the
/// previous ambient request; dropping an outer one leaves the inner request
/// current.
#[must_use = "the request stops being ambient when the guard is dropped"]
#[derive(Debug)]
pub struct AmbientGuard {
    token: u64,
    _not_send: PhantomData<*const ()>,
}

impl Drop for AmbientGuard {
    fn drop(&mut self) {
        AMBIENT.with_borrow_mut(|stack| {
            if let Some(at) = stack.iter().rposition(|(token, _)| *token == self.token) {
                stack.remove(at);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestRequest;

    #[test]
    fn test_enter_nests() {
        assert!(current().is_none());

        let outer = Arc::new(TestRequest::new());
        let inner = Arc::new(TestRequest::new());
        {
            let _outer = enter(outer.clone());
            assert_eq!(current().unwrap().id(), outer.id());
            {
                let _inner = enter(inner.clone());
                assert_eq!(current().unwrap().id(), inner.id());
            }
            assert_eq!(current().unwrap().id(), outer.id());
        }
        assert!(current().is_none());
    }

    #[test]
    fn test_guards_dropped_in_creation_order() {
        let first = Arc::new(TestRequest::new());
        let second = Arc::new(TestRequest::new());

        let first_guard = enter(first.clone());
        let second_guard = enter(second.clone());
        drop(first_guard);
        assert_eq!(current().unwrap().id(), second.id());

        drop(second_guard);
        assert!(current().is_none());
    }

    #[test]
    fn test_same_request_entered_twice() {
        let request = Arc::new(TestRequest::new());
        let outer = enter(request.clone());
        let inner = enter(request.clone());
        drop(outer);
        assert_eq!(current().unwrap().id(), request.id());
        drop(inner);
        assert!(current().is_none());
    }

    #[test]
    fn test_ambient_is_per_thread() {
        let request = Arc::new(TestRequest::new());
        let _guard = enter(request);
        let seen = std::thread::spawn(|| current().is_some()).join().unwrap();
        assert!(!seen);
    }
}
