//! Registry module for callback management.
//!
//! This module provides a builder for registering plugins and callbacks
//! and a frozen registry for immutable, thread-safe dispatch.

use korp_plugins_core::{
    BoxError, CallbackPlugin, CallbackResult, HookArgs, IntoCallbackResult, LoadError,
    PluginContext, PluginError, Request, is_callback_name,
};
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};
use tracing::{debug, warn};

/// A callback bound to its plugin instance.
pub type CallbackFn = dyn Fn(&mut HookArgs, &dyn Request) -> CallbackResult + Send + Sync;

/// An applicability predicate bound to its plugin instance.
pub type PredicateFn = dyn Fn(&dyn Request) -> Result<bool, BoxError> + Send + Sync;

type PluginInstance = Arc<dyn Any + Send + Sync>;

/// A callback registered for a hook point, with its plugin's predicate.
#[derive(Clone)]
pub struct Registration {
    plugin: &'static str,
    qualname: String,
    callback: Arc<CallbackFn>,
    predicate: Arc<PredicateFn>,
}

impl Registration {
    /// Type name of the plugin owning the callback.
    pub fn plugin(&self) -> &'static str {
        self.plugin
    }

    /// Fully qualified callback name, e.g. `my_plugins::Logger::filter_sql`.
    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    /// Evaluate the plugin's predicate for `request`.
    pub fn applies_to(&self, request: &dyn Request) -> Result<bool, BoxError> {
        (self.predicate)(request)
    }

    /// Invoke the callback.
    pub fn invoke(&self, args: &mut HookArgs, request: &dyn Request) -> CallbackResult {
        (self.callback)(args, request)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("plugin", &self.plugin)
            .field("qualname", &self.qualname)
            .finish_non_exhaustive()
    }
}

/// A callback added since the last [`RegistryBuilder::drain_registered`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCallback {
    /// Hook point the callback was registered for.
    pub hook_point: String,
    /// Fully qualified callback name.
    pub qualname: String,
}

// ============================================================================
// RegistryBuilder - for constructing registries
// ============================================================================

/// Builder for constructing a [`Registry`].
///
/// Plugins are registered in load order; within a hook point their
/// callbacks run in that order. Call `.build()` to freeze the result.
///
/// # Example
/// ```ignore
/// let mut builder = RegistryBuilder::new();
/// builder.register(ContentHider::new(conf))?;
/// builder.install::<Logger>(&ctx)?;
/// let registry = Arc::new(builder.build());
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    callbacks: HashMap<String, Vec<Registration>>,
    plugins: HashMap<TypeId, PluginInstance>,
    registered: Vec<RegisteredCallback>,
}

impl RegistryBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructed plugin instance as its type's singleton.
    ///
    /// Fails with [`PluginError::DuplicatePlugin`] if the type already has
    /// an instance.
    pub fn register<P: CallbackPlugin>(&mut self, plugin: P) -> Result<Arc<P>, PluginError> {
        if self.contains::<P>() {
            return Err(PluginError::DuplicatePlugin(std::any::type_name::<P>()));
        }
        Ok(self.attach(Arc::new(plugin)))
    }

    /// Get the singleton of `P`, constructing and registering it if absent.
    pub fn install<P: CallbackPlugin>(
        &mut self,
        ctx: &PluginContext<'_>,
    ) -> Result<Arc<P>, PluginError> {
        if let Some(existing) = self.plugin::<P>() {
            debug!(
                plugin = std::any::type_name::<P>(),
                "plugin already installed"
            );
            return Ok(existing);
        }
        let plugin = P::create(ctx).map_err(|source| LoadError::Construct {
            plugin: ctx.plugin().to_string(),
            source,
        })?;
        Ok(self.attach(Arc::new(plugin)))
    }

    /// Register a free callback for `hook_point` that applies to every request.
    pub fn register_fn<F, R>(mut self, plugin: &'static str, hook_point: &str, callback: F) -> Self
    where
        F: Fn(&mut HookArgs, &dyn Request) -> R + Send + Sync + 'static,
        R: IntoCallbackResult,
    {
        self.register_fn_mut(plugin, hook_point, callback);
        self
    }

    /// Register a free callback (mutable version).
    pub fn register_fn_mut<F, R>(&mut self, plugin: &'static str, hook_point: &str, callback: F)
    where
        F: Fn(&mut HookArgs, &dyn Request) -> R + Send + Sync + 'static,
        R: IntoCallbackResult,
    {
        let callback: Arc<CallbackFn> =
            Arc::new(move |args: &mut HookArgs, request: &dyn Request| {
                callback(args, request).into_callback_result()
            });
        let predicate: Arc<PredicateFn> = Arc::new(|_: &dyn Request| Ok(true));
        self.push(
            hook_point,
            Registration {
                plugin,
                qualname: format!("{plugin}::{hook_point}"),
                callback,
                predicate,
            },
        );
    }

    /// Whether `P` already has an instance.
    pub fn contains<P: CallbackPlugin>(&self) -> bool {
        self.plugins.contains_key(&TypeId::of::<P>())
    }

    /// The singleton of `P`, if registered.
    pub fn plugin<P: CallbackPlugin>(&self) -> Option<Arc<P>> {
        downcast_plugin(&self.plugins)
    }

    /// Take the record of callbacks registered since the last call.
    pub fn drain_registered(&mut self) -> Vec<RegisteredCallback> {
        std::mem::take(&mut self.registered)
    }

    /// Get the number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.values().map(Vec::len).sum()
    }

    /// Check if the builder has no callbacks.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Build the immutable Registry.
    pub fn build(self) -> Registry {
        Registry {
            callbacks: self.callbacks,
            plugins: self.plugins,
        }
    }

    fn attach<P: CallbackPlugin>(&mut self, plugin: Arc<P>) -> Arc<P> {
        let type_name = std::any::type_name::<P>();

        let owner = Arc::clone(&plugin);
        let predicate: Arc<PredicateFn> =
            Arc::new(move |request: &dyn Request| owner.applies_to(request));

        for method in P::hook_methods() {
            let name = method.name();
            if !is_callback_name(name) {
                warn!(
                    plugin = type_name,
                    method = name,
                    "skipping method that is not a callback name"
                );
                continue;
            }
            let bound = Arc::clone(&plugin);
            let callback: Arc<CallbackFn> =
                Arc::new(move |args: &mut HookArgs, request: &dyn Request| {
                    method.invoke(&bound, args, request)
                });
            self.push(
                name,
                Registration {
                    plugin: type_name,
                    qualname: format!("{type_name}::{name}"),
                    callback,
                    predicate: Arc::clone(&predicate),
                },
            );
        }

        self.plugins
            .insert(TypeId::of::<P>(), Arc::clone(&plugin) as PluginInstance);
        plugin
    }

    fn push(&mut self, hook_point: &str, registration: Registration) {
        debug!(
            hook_point,
            callback = %registration.qualname,
            "registered callback"
        );
        self.registered.push(RegisteredCallback {
            hook_point: hook_point.to_string(),
            qualname: registration.qualname.clone(),
        });
        self.callbacks
            .entry(hook_point.to_string())
            .or_default()
            .push(registration);
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("callbacks", &self.callbacks)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

fn downcast_plugin<P: CallbackPlugin>(
    plugins: &HashMap<TypeId, PluginInstance>,
) -> Option<Arc<P>> {
    plugins
        .get(&TypeId::of::<P>())
        .cloned()
        .and_then(|instance| instance.downcast::<P>().ok())
}

// ============================================================================
// Registry - immutable, thread-safe callback storage
// ============================================================================

/// An immutable, thread-safe registry of callbacks indexed by hook point.
///
/// Created by calling [`RegistryBuilder::build`]; share it through an
/// `Arc` with every request's caller.
#[derive(Default)]
pub struct Registry {
    callbacks: HashMap<String, Vec<Registration>>,
    plugins: HashMap<TypeId, PluginInstance>,
}

impl Registry {
    /// Callbacks for `hook_point` in registration order.
    ///
    /// Unknown hook points yield an empty slice.
    pub fn lookup(&self, hook_point: &str) -> &[Registration] {
        self.callbacks
            .get(hook_point)
            .map_or(&[], Vec::as_slice)
    }

    /// All hook points with at least one callback.
    pub fn hook_points(&self) -> impl Iterator<Item = &str> {
        self.callbacks.keys().map(String::as_str)
    }

    /// The singleton of `P`, if registered.
    pub fn plugin<P: CallbackPlugin>(&self) -> Option<Arc<P>> {
        downcast_plugin(&self.plugins)
    }

    /// Get the number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.values().map(Vec::len).sum()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("callbacks", &self.callbacks)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}
