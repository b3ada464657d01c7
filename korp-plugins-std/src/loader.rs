//! # Plugin loading
//!
//! [`PluginLoader`] turns a list of plugin names into a frozen [`Registry`]
//! and a set of routes. Each name is looked up in the link-time inventory
//! (see [`descriptor`](crate::descriptor)); the plugin's callback types are
//! installed in declaration order and its blueprints are collected. Once
//! every plugin is in, the blueprints' routes are handed to the host's
//! [`RouteSink`].
//!
//! ```rust,ignore
//! let decorators = EndpointDecorators::new().with(MAIN_HANDLER, main_handler);
//! let loaded = PluginLoader::new(LoaderConfig::from_host(&host)?)
//!     .host_config(host)
//!     .decorators(decorators)
//!     .load(&mut app, ["logger", "contenthider"])?;
//! let registry = Arc::new(loaded.registry);
//! ```

use crate::{
    descriptor::{PluginInfo, blueprints_for, descriptors_for, info_for},
    endpoint::{Blueprint, EndpointDecorators, MAIN_HANDLER, RouteSink},
    registry::{RegisteredCallback, Registry, RegistryBuilder},
};
use korp_plugins_core::{ConfigError, LoadError, PluginContext, PluginError, resolve_config};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Host configuration key of the loader settings.
pub const LOADER_CONFIG_KEY: &str = "PLUGINLIB_CONFIG";

/// What to do when a requested plugin is not linked in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotFoundPolicy {
    /// Skip silently.
    Ignore,
    /// Skip with a warning.
    #[default]
    Warn,
    /// Fail with [`LoadError::NotFound`].
    Error,
}

/// Loader settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// 0: silent; 1: one line per plugin; 2: also callbacks, routes and
    /// configuration.
    pub load_verbosity: u8,
    /// Handling of plugins that cannot be found.
    pub handle_not_found: NotFoundPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            load_verbosity: 1,
            handle_not_found: NotFoundPolicy::Warn,
        }
    }
}

impl LoaderConfig {
    /// Settings from the host's `PLUGINLIB_CONFIG` entry over the defaults.
    pub fn from_host(host: &Map<String, Value>) -> Result<Self, ConfigError> {
        let layers: Vec<&Map<String, Value>> = match host.get(LOADER_CONFIG_KEY) {
            Some(Value::Object(entry)) => vec![entry],
            Some(_) => return Err(ConfigError::NotAnObject(LOADER_CONFIG_KEY.to_string())),
            None => Vec::new(),
        };
        resolve_config("pluginlib", &layers).map(|(config, _)| config)
    }
}

/// A requested plugin, optionally with configuration overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSpec {
    name: String,
    config: Option<Map<String, Value>>,
}

impl PluginSpec {
    /// Request the plugin called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
        }
    }

    /// Override configuration values of the plugin.
    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = Some(config);
        self
    }

    /// Plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for PluginSpec {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PluginSpec {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl<S: Into<String>> From<(S, Map<String, Value>)> for PluginSpec {
    fn from((name, config): (S, Map<String, Value>)) -> Self {
        Self::new(name).with_config(config)
    }
}

/// Record of one loaded plugin.
#[derive(Debug, Clone)]
pub struct LoadedPlugin {
    /// Plugin name as requested.
    pub name: String,
    /// Module path the plugin was found in.
    pub module: &'static str,
    /// Information submitted by the plugin.
    pub info: Option<PluginInfo>,
    /// Configuration resolved while constructing the plugin.
    pub config: Option<Map<String, Value>>,
    /// Callbacks the plugin registered.
    pub callbacks: Vec<RegisteredCallback>,
    /// Route rules the plugin contributed.
    pub routes: Vec<String>,
}

/// Result of [`PluginLoader::load`].
#[derive(Debug)]
pub struct LoadedPlugins {
    /// Registry holding every loaded callback.
    pub registry: Registry,
    /// Loaded plugins in load order.
    pub plugins: Vec<LoadedPlugin>,
}

impl LoadedPlugins {
    /// The record of the plugin called `name`.
    pub fn get(&self, name: &str) -> Option<&LoadedPlugin> {
        self.plugins.iter().find(|plugin| plugin.name == name)
    }

    /// Names of the loaded plugins in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|plugin| plugin.name.as_str())
    }
}

/// Loads plugins by name from the link-time inventory.
#[derive(Debug, Default)]
pub struct PluginLoader {
    config: LoaderConfig,
    host_config: Map<String, Value>,
    decorators: EndpointDecorators,
}

impl PluginLoader {
    /// Create a loader with the given settings.
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the host configuration searched for `PLUGIN_CONFIG_<NAME>`.
    pub fn host_config(mut self, host_config: Map<String, Value>) -> Self {
        self.host_config = host_config;
        self
    }

    /// Set the endpoint decorators; they must include `main_handler`.
    pub fn decorators(mut self, decorators: EndpointDecorators) -> Self {
        self.decorators = decorators;
        self
    }

    /// Load `plugins` in order and register their routes with `sink`.
    pub fn load<S, I>(mut self, sink: &mut S, plugins: I) -> Result<LoadedPlugins, PluginError>
    where
        S: RouteSink + ?Sized,
        I: IntoIterator,
        I::Item: Into<PluginSpec>,
    {
        if !self.decorators.contains(MAIN_HANDLER) {
            return Err(LoadError::MissingMainHandler.into());
        }

        let mut builder = RegistryBuilder::new();
        let mut loaded: Vec<LoadedPlugin> = Vec::new();
        let mut blueprints: Vec<Blueprint> = Vec::new();

        for spec in plugins {
            let spec: PluginSpec = spec.into();
            if loaded.iter().any(|plugin| plugin.name == spec.name) {
                debug!(plugin = %spec.name, "plugin already loaded");
                continue;
            }

            let descriptors = descriptors_for(&spec.name);
            let blueprint_descriptors = blueprints_for(&spec.name);
            let info = info_for(&spec.name);
            let module = descriptors
                .first()
                .map(|descriptor| descriptor.module())
                .or_else(|| blueprint_descriptors.first().map(|descriptor| descriptor.module()))
                .or_else(|| info.map(|info| info.module));
            let Some(module) = module else {
                match self.config.handle_not_found {
                    NotFoundPolicy::Ignore => {}
                    NotFoundPolicy::Warn => warn!(plugin = %spec.name, "plugin not found"),
                    NotFoundPolicy::Error => return Err(LoadError::NotFound(spec.name).into()),
                }
                continue;
            };

            let overrides = spec.config.unwrap_or_default();
            let config = {
                let ctx = PluginContext::new(&spec.name)
                    .with_overrides(&overrides)
                    .with_host_config(&self.host_config);
                for descriptor in &descriptors {
                    descriptor.install(&mut builder, &ctx)?;
                }
                ctx.resolved().cloned()
            };

            let mut routes = Vec::new();
            for descriptor in &blueprint_descriptors {
                let blueprint = descriptor.build();
                self.decorators.extend(blueprint.decorators());
                routes.extend(blueprint.rules().map(str::to_string));
                blueprints.push(blueprint);
            }

            let plugin = LoadedPlugin {
                name: spec.name,
                module,
                info: info.copied(),
                config,
                callbacks: builder.drain_registered(),
                routes,
            };
            self.report(&plugin);
            loaded.push(plugin);
        }

        for blueprint in blueprints {
            blueprint.register(sink, &self.decorators);
        }

        Ok(LoadedPlugins {
            registry: builder.build(),
            plugins: loaded,
        })
    }

    fn report(&self, plugin: &LoadedPlugin) {
        let verbosity = self.config.load_verbosity;
        if verbosity >= 1 {
            let description = plugin.info.as_ref().and_then(PluginInfo::describe);
            info!(
                plugin = %plugin.name,
                module = plugin.module,
                description = description.as_deref().unwrap_or_default(),
                "Loaded Korp plugin"
            );
        }
        if verbosity >= 2 {
            if let Some(config) = &plugin.config {
                let configuration = Value::Object(config.clone());
                info!(plugin = %plugin.name, %configuration, "  configuration");
            }
            for callback in &plugin.callbacks {
                info!(
                    plugin = %plugin.name,
                    hook_point = %callback.hook_point,
                    callback = %callback.qualname,
                    "  callback"
                );
            }
            for rule in &plugin.routes {
                info!(plugin = %plugin.name, rule = %rule, "  route");
            }
        }
    }
}
