//! # korp-plugins-std
//!
//! Standard implementations for the Korp plugin framework.
//!
//! This crate provides:
//! - **Registration**: [`RegistryBuilder`], [`Registry`]
//! - **Dispatch**: [`Caller`], [`CallerDirectory`], [`RequestScope`]
//! - **Loading**: [`PluginLoader`] over the link-time plugin inventory
//! - **Endpoints**: [`Blueprint`], [`EndpointDecorators`], [`RouteSink`]
//! - **Testing**: request and route-sink stand-ins in [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use korp_plugins_core;

// Modules
pub mod ambient;
mod caller;
pub mod descriptor;
mod directory;
pub mod endpoint;
pub mod loader;
mod registry;
mod scope;
pub mod testing;

pub use caller::Caller;
pub use descriptor::{
    BlueprintDescriptor, PluginDescriptor, PluginInfo, install_plugin,
};
pub use directory::CallerDirectory;
pub use endpoint::{
    Blueprint, EndpointDecorator, EndpointDecorators, EndpointFn, MAIN_HANDLER, RouteDef,
    RouteOptions, RouteSink,
};
pub use loader::{
    LoadedPlugin, LoadedPlugins, LoaderConfig, NotFoundPolicy, PluginLoader, PluginSpec,
};
pub use registry::{
    CallbackFn, PredicateFn, RegisteredCallback, Registration, Registry, RegistryBuilder,
};
pub use scope::RequestScope;

#[doc(hidden)]
pub use inventory;
