//! # korp-plugins - Callback and Endpoint Plugins for the Korp Backend
//!
//! `korp-plugins` lets independently written plugins hook into the request
//! handling of a Korp backend. A plugin may
//!
//! - register callbacks that run at named *hook points* of the request
//!   pipeline, and
//! - contribute whole endpoints through a [`Blueprint`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use korp_plugins::prelude::*;
//!
//! #[derive(Default)]
//! struct Logger;
//!
//! #[callback_plugin(plugin = "logger")]
//! impl Logger {
//!     fn enter_handler(&self, args: &mut HookArgs, request: &dyn Request) {
//!         tracing::info!(request = %request.id(), ?args, "enter");
//!     }
//! }
//!
//! // At startup
//! let decorators = EndpointDecorators::new().with(MAIN_HANDLER, |handler| handler);
//! let loaded = PluginLoader::new(LoaderConfig::default())
//!     .decorators(decorators)
//!     .load(&mut routes, ["logger"])?;
//! let registry = Arc::new(loaded.registry);
//!
//! // Per request
//! let scope = RequestScope::enter(request, registry.clone(), CallerDirectory::global());
//! scope.call(hook_points::ENTER_HANDLER, hook_args![args.clone()])?;
//! let result = scope.call_chain(hook_points::FILTER_RESULT, result, ())?;
//! ```
//!
//! ## Dispatch strategies
//!
//! | Method | Result |
//! |--------|--------|
//! | [`Caller::call`] | Results discarded |
//! | [`Caller::call_collect`] | Contributed values, in callback order |
//! | [`Caller::call_chain`] | A value threaded through every callback |

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

extern crate self as korp_plugins;

pub use korp_plugins_core::{
    // Errors
    ArgError,
    BoxError,
    // Callbacks
    CallbackPlugin,
    CallbackResult,
    ConfigError,
    // Arguments
    HookArgs,
    HookFn,
    HookMethod,
    IntoApplicability,
    IntoCallbackResult,
    LoadError,
    // Configuration
    PluginContext,
    PluginError,
    // Requests
    Request,
    RequestId,
    hook_args,
    hook_points,
    host_config_key,
    identity,
    is_callback_name,
    resolve_config,
    resolve_layers,
};

// Registration and dispatch
pub use korp_plugins_std::{
    Caller, CallerDirectory, Registration, Registry, RegistryBuilder, RequestScope, ambient,
};

// Loading
pub use korp_plugins_std::{
    BlueprintDescriptor, LoadedPlugin, LoadedPlugins, LoaderConfig, NotFoundPolicy,
    PluginDescriptor, PluginInfo, PluginLoader, PluginSpec, install_plugin, plugin_info,
    submit_blueprint,
};

// Endpoints
pub use korp_plugins_std::{
    Blueprint, EndpointDecorator, EndpointDecorators, EndpointFn, MAIN_HANDLER, RouteDef,
    RouteOptions, RouteSink,
};

/// Testing utilities.
pub mod testing {
    pub use korp_plugins_std::testing::{CallLog, ProxyRequest, RecordingSink, TestRequest};
}

/// Prelude module - common imports for Korp plugins.
///
/// # Usage
///
/// ```rust,ignore
/// use korp_plugins::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BoxError, Caller, CallerDirectory, EndpointDecorators, HookArgs, IntoCallbackResult,
        LoaderConfig, MAIN_HANDLER, PluginContext, PluginError, PluginLoader, Registry,
        RegistryBuilder, Request, RequestScope, hook_args, hook_points,
    };

    #[cfg(feature = "macros")]
    pub use crate::callback_plugin;
}

#[cfg(feature = "macros")]
pub use korp_plugins_macros::callback_plugin;

#[doc(hidden)]
pub use inventory;
#[doc(hidden)]
pub use serde_json;
