//! # korp-plugins-core
//!
//! Core traits for the Korp plugin framework.
//!
//! This crate has few dependencies and is designed to be imported by
//! plugins that don't need the registry and loader in `korp-plugins-std`.
//!
//! # Building Blocks
//!
//! ## Requests ([`Request`])
//!
//! The host's request, seen only through its identity, endpoint and
//! parameters. Every callback receives the current request as its trailing
//! parameter.
//!
//! ## Hook arguments ([`HookArgs`])
//!
//! The positional and keyword values passed at a hook point. Their meaning
//! is a convention between the host and its plugins.
//!
//! ## Callback plugins ([`CallbackPlugin`])
//!
//! A type whose lowercase-named methods are callbacks for the hook point of
//! the same name, plus an optional [`applies_to`](CallbackPlugin::applies_to)
//! predicate restricting the requests it serves.
//!
//! ## Configuration ([`PluginContext`])
//!
//! Layered resolution of plugin settings from the load list, the host
//! configuration and the plugin's defaults.
//!
//! # Error Types
//!
//! - [`PluginError`] - Top-level error type
//! - [`LoadError`] - Plugin loading errors
//! - [`ConfigError`] - Configuration errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod args;
mod callback;
mod config;
mod error;
pub mod hook_points;
mod plugin;
mod request;

// Re-exports
pub use args::HookArgs;
pub use callback::{CallbackResult, IntoApplicability, IntoCallbackResult};
pub use config::{PluginContext, host_config_key, resolve_config, resolve_layers};
pub use error::{ArgError, BoxError, ConfigError, LoadError, PluginError};
pub use plugin::{BASE_METHODS, CallbackPlugin, HookFn, HookMethod, is_callback_name};
pub use request::{Request, RequestId, identity};

#[doc(hidden)]
pub use serde_json;
