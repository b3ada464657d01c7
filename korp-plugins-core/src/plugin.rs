//! # Callback plugins
//!
//! A callback plugin is a type whose methods run at hook points. The hook
//! point of a method is its name: every `&self` method whose name starts
//! with a lowercase letter is a callback, except the base methods of
//! [`CallbackPlugin`] itself.
//!
//! The `#[callback_plugin]` attribute macro scans an `impl` block and
//! generates [`CallbackPlugin::hook_methods`] from that rule. Plugins that
//! prefer to spell the table out implement the trait by hand:
//!
//! ```rust,ignore
//! impl CallbackPlugin for SqlEcho {
//!     fn create(_ctx: &PluginContext<'_>) -> Result<Self, BoxError> {
//!         Ok(SqlEcho)
//!     }
//!
//!     fn hook_methods() -> Vec<HookMethod<Self>> {
//!         vec![HookMethod::new("filter_sql", |this, args, request| {
//!             this.filter_sql(args, request).into_callback_result()
//!         })]
//!     }
//! }
//! ```

use crate::{
    args::HookArgs, callback::CallbackResult, config::PluginContext, error::BoxError,
    request::Request,
};
use std::fmt;

/// Names of the [`CallbackPlugin`] methods, which are never callbacks.
pub const BASE_METHODS: &[&str] = &["applies_to", "create", "hook_methods"];

/// Whether a method called `name` qualifies as a callback.
pub fn is_callback_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_lowercase) && !BASE_METHODS.contains(&name)
}

/// Signature of a callback method bound through a plugin reference.
pub type HookFn<P> = fn(&P, &mut HookArgs, &dyn Request) -> CallbackResult;

/// A callback method of plugin `P` together with its hook point name.
pub struct HookMethod<P> {
    name: &'static str,
    method: HookFn<P>,
}

impl<P> HookMethod<P> {
    /// Pair a hook point name with a method.
    pub const fn new(name: &'static str, method: HookFn<P>) -> Self {
        Self { name, method }
    }

    /// The hook point this method is registered for.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invoke the method on `plugin`.
    pub fn invoke(
        &self,
        plugin: &P,
        args: &mut HookArgs,
        request: &dyn Request,
    ) -> CallbackResult {
        (self.method)(plugin, args, request)
    }
}

impl<P> Clone for HookMethod<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for HookMethod<P> {}

impl<P> fmt::Debug for HookMethod<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookMethod").field("name", &self.name).finish()
    }
}

/// A plugin contributing callbacks at hook points.
///
/// Exactly one instance of each plugin type lives in a registry; it is
/// built once through [`create`](CallbackPlugin::create).
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a callback plugin",
    label = "missing `CallbackPlugin` implementation",
    note = "Annotate the plugin's `impl` block with `#[callback_plugin]`."
)]
pub trait CallbackPlugin: Send + Sync + Sized + 'static {
    /// Construct the plugin instance. Errors abort plugin loading.
    fn create(ctx: &PluginContext<'_>) -> Result<Self, BoxError>;

    /// The plugin's callbacks, in declaration order.
    fn hook_methods() -> Vec<HookMethod<Self>>;

    /// Whether this plugin's callbacks fire for `request`.
    ///
    /// Evaluated on every dispatch. An error aborts the dispatch.
    fn applies_to(&self, _request: &dyn Request) -> Result<bool, BoxError> {
        Ok(true)
    }
}
