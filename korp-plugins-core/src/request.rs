//! # Request identity
//!
//! The host framework owns the request object; plugins only see it through
//! the [`Request`] trait. Each in-flight request carries a [`RequestId`],
//! a stable handle used to key per-request state such as the caller
//! directory.
//!
//! Hosts that hand out wrappers (a proxy that forwards to the real request)
//! implement [`Request::resolve`] on the wrapper so that [`identity`] always
//! lands on the concrete request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable, unique identity of an in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw identifier chosen by the host.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Mint a fresh identifier from a process-wide counter.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The host's view of an in-flight request.
///
/// Only [`id`](Request::id) is required. Plugins typically restrict
/// themselves to certain endpoints in `applies_to`, so hosts should also
/// report the endpoint name.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a plugin request",
    label = "missing `Request` implementation",
    note = "Implement `Request` for the host's request type (at least `id`)."
)]
pub trait Request: Send + Sync + 'static {
    /// Identity of this request.
    fn id(&self) -> RequestId;

    /// Name of the endpoint handling the request, if routed.
    fn endpoint(&self) -> Option<&str> {
        None
    }

    /// A request parameter by name.
    fn param(&self, _name: &str) -> Option<&str> {
        None
    }

    /// The concrete request behind a proxy-like wrapper.
    ///
    /// Returns `None` for concrete requests.
    fn resolve(&self) -> Option<&dyn Request> {
        None
    }
}

/// Identity of `request`, looking through proxies to the concrete request.
pub fn identity(request: &dyn Request) -> RequestId {
    match request.resolve() {
        Some(inner) => identity(inner),
        None => request.id(),
    }
}

impl fmt::Debug for dyn Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &identity(self))
            .field("endpoint", &self.endpoint())
            .finish()
    }
}
