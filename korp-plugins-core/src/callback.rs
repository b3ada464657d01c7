//! # Callback results
//!
//! A callback either contributes a value or has nothing to say. The
//! "nothing" case is an explicit `None`, kept apart from a contributed
//! `Some(Value::Null)`:
//!
//! - `call` discards every result.
//! - `call_collect` keeps the `Some` results in callback order.
//! - `call_chain` replaces the running value with a `Some` result and keeps
//!   it on `None`.
//!
//! Plugin methods may return any type implementing [`IntoCallbackResult`],
//! so side-effect-only callbacks can simply return `()`.

use crate::error::BoxError;
use serde_json::Value;

/// Outcome of one callback invocation.
pub type CallbackResult = Result<Option<Value>, BoxError>;

/// Conversion of a callback method's return type into a [`CallbackResult`].
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be returned from a plugin callback",
    label = "unsupported callback return type",
    note = "Return `()`, `Value`, `Option<Value>` or a `Result` of one of these."
)]
pub trait IntoCallbackResult {
    /// Perform the conversion.
    fn into_callback_result(self) -> CallbackResult;
}

impl IntoCallbackResult for () {
    fn into_callback_result(self) -> CallbackResult {
        Ok(None)
    }
}

impl IntoCallbackResult for Value {
    fn into_callback_result(self) -> CallbackResult {
        Ok(Some(self))
    }
}

impl IntoCallbackResult for Option<Value> {
    fn into_callback_result(self) -> CallbackResult {
        Ok(self)
    }
}

impl<T, E> IntoCallbackResult for Result<T, E>
where
    T: IntoCallbackResult,
    E: Into<BoxError>,
{
    fn into_callback_result(self) -> CallbackResult {
        self.map_err(Into::into)?.into_callback_result()
    }
}

/// Conversion of an `applies_to` return type into a predicate outcome.
pub trait IntoApplicability {
    /// Perform the conversion.
    fn into_applicability(self) -> Result<bool, BoxError>;
}

impl IntoApplicability for bool {
    fn into_applicability(self) -> Result<bool, BoxError> {
        Ok(self)
    }
}

impl<E: Into<BoxError>> IntoApplicability for Result<bool, E> {
    fn into_applicability(self) -> Result<bool, BoxError> {
        self.map_err(Into::into)
    }
}
