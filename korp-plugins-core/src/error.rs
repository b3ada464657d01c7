//! Error types for the Korp plugin framework.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`PluginError`] - Top-level error type for dispatch and registration
//! - [`LoadError`] - Errors while loading plugins by name
//! - [`ConfigError`] - Errors while resolving plugin configuration
//! - [`ArgError`] - Errors while reading typed values out of hook arguments

use crate::request::RequestId;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
///
/// Callbacks, predicates and plugin constructors report failures with this
/// type so that plugins are free to use their own error types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all plugin operations.
#[derive(Error, Debug)]
pub enum PluginError {
    /// No caller is registered for the request.
    #[error("no plugin caller registered for request {0}")]
    NoCaller(RequestId),

    /// A directory lookup needed the ambient request but none was active.
    #[error("no ambient request is active on this thread")]
    NoAmbientRequest,

    /// A callback failed; the remaining callbacks for the hook point were skipped.
    #[error("callback `{plugin}` failed at hook point `{hook_point}`")]
    Callback {
        /// Plugin owning the callback.
        plugin: &'static str,
        /// Hook point being dispatched.
        hook_point: String,
        /// The error returned by the callback.
        #[source]
        source: BoxError,
    },

    /// An applicability predicate failed.
    #[error("applicability check of `{plugin}` failed at hook point `{hook_point}`")]
    Predicate {
        /// Plugin owning the predicate.
        plugin: &'static str,
        /// Hook point being dispatched.
        hook_point: String,
        /// The error returned by the predicate.
        #[source]
        source: BoxError,
    },

    /// The plugin type already has an instance in the registry.
    #[error("plugin `{0}` is already registered")]
    DuplicatePlugin(&'static str),

    /// Loading plugins failed.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// Resolving configuration failed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PluginError {
    /// The error returned by the failing callback or predicate, if any.
    pub fn plugin_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            PluginError::Callback { source, .. } | PluginError::Predicate { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

/// Errors that can occur while loading plugins.
#[derive(Error, Debug)]
pub enum LoadError {
    /// No plugin with the requested name was linked into the binary.
    #[error("plugin `{0}` not found")]
    NotFound(String),

    /// Constructing a plugin instance failed.
    #[error("constructing plugin `{plugin}` failed")]
    Construct {
        /// Name of the plugin being loaded.
        plugin: String,
        /// The error returned by the constructor.
        #[source]
        source: BoxError,
    },

    /// The endpoint decorators given to the loader lack `main_handler`.
    #[error("endpoint decorators must contain `main_handler`")]
    MissingMainHandler,
}

/// Errors that can occur while resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration layer or default value was not a JSON object.
    #[error("configuration for `{0}` is not an object")]
    NotAnObject(String),

    /// The resolved configuration could not be converted to the target type.
    #[error("invalid configuration for `{plugin}`")]
    Invalid {
        /// Plugin (or `pluginlib`) whose configuration was being resolved.
        plugin: String,
        /// The underlying conversion error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur when reading hook arguments.
#[derive(Error, Debug)]
pub enum ArgError {
    /// No positional argument at the index.
    #[error("missing positional argument {0}")]
    Missing(usize),

    /// No keyword argument with the name.
    #[error("missing keyword argument `{0}`")]
    MissingKeyword(String),

    /// The argument could not be converted to the requested type.
    #[error("invalid argument `{name}`")]
    Invalid {
        /// Index or keyword of the argument.
        name: String,
        /// The underlying conversion error.
        #[source]
        source: serde_json::Error,
    },

    /// A chained callback added or removed positional arguments.
    #[error("callback changed the number of positional arguments from {expected} to {found}")]
    Reshaped {
        /// Positional arguments passed to the callback.
        expected: usize,
        /// Positional arguments left after the callback returned.
        found: usize,
    },
}
