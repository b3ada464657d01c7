//! Link-time plugin inventory.
//!
//! Plugins announce themselves with `inventory` submissions so that the
//! loader can find them by name:
//!
//! - [`PluginDescriptor`]: one per callback plugin type, submitted by
//!   `#[callback_plugin]`.
//! - [`PluginInfo`]: optional human-readable information, submitted by
//!   [`plugin_info!`](crate::plugin_info).
//! - [`BlueprintDescriptor`]: endpoint blueprint constructors, submitted by
//!   [`submit_blueprint!`](crate::submit_blueprint).
//!
//! Every entry is attributed to a plugin name. Unless given explicitly, the
//! name is the last segment of the submitting module's path, so the
//! contents of `my_app::plugins::logger` belong to plugin `logger`.

use crate::{endpoint::Blueprint, registry::RegistryBuilder};
use korp_plugins_core::{CallbackPlugin, PluginContext, PluginError};
use serde::Serialize;
use std::fmt;

/// Installer of one plugin type into a registry builder.
pub type InstallFn = fn(&mut RegistryBuilder, &PluginContext<'_>) -> Result<(), PluginError>;

/// Install the singleton of `P` unless already present.
pub fn install_plugin<P: CallbackPlugin>(
    builder: &mut RegistryBuilder,
    ctx: &PluginContext<'_>,
) -> Result<(), PluginError> {
    builder.install::<P>(ctx).map(drop)
}

fn module_leaf(module: &'static str) -> &'static str {
    module.rsplit("::").next().unwrap_or(module)
}

/// A callback plugin type linked into the binary.
pub struct PluginDescriptor {
    module: &'static str,
    plugin: Option<&'static str>,
    type_name: &'static str,
    line: u32,
    install: InstallFn,
}

impl PluginDescriptor {
    /// Describe a plugin type declared in `module` at `line`.
    pub const fn new(
        module: &'static str,
        plugin: Option<&'static str>,
        type_name: &'static str,
        line: u32,
        install: InstallFn,
    ) -> Self {
        Self {
            module,
            plugin,
            type_name,
            line,
            install,
        }
    }

    /// Name of the plugin the type belongs to.
    pub fn plugin_name(&self) -> &'static str {
        self.plugin.unwrap_or_else(|| module_leaf(self.module))
    }

    /// Module path of the declaration.
    pub fn module(&self) -> &'static str {
        self.module
    }

    /// Name of the plugin type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Source line of the declaration.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Install the plugin type into `builder`.
    pub fn install(
        &self,
        builder: &mut RegistryBuilder,
        ctx: &PluginContext<'_>,
    ) -> Result<(), PluginError> {
        (self.install)(builder, ctx)
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("plugin", &self.plugin_name())
            .field("module", &self.module)
            .field("type_name", &self.type_name)
            .field("line", &self.line)
            .finish()
    }
}

inventory::collect!(PluginDescriptor);

/// Descriptive information about a plugin.
///
/// Built with const setters so it can be submitted to the inventory:
///
/// ```rust,ignore
/// korp_plugins::plugin_info!(
///     name = "Korp backend plugin for logging",
///     version = "0.3",
///     date = "2020-12-10",
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    /// Module path of the submission.
    pub module: &'static str,
    /// Explicit plugin name.
    #[serde(skip)]
    pub plugin: Option<&'static str>,
    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    /// Version string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'static str>,
    /// Release date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<&'static str>,
}

impl PluginInfo {
    /// Information submitted from `module`, with all fields empty.
    pub const fn new(module: &'static str) -> Self {
        Self {
            module,
            plugin: None,
            name: None,
            version: None,
            date: None,
        }
    }

    /// Attribute the information to `plugin` instead of the module name.
    pub const fn plugin(mut self, plugin: &'static str) -> Self {
        self.plugin = Some(plugin);
        self
    }

    /// Set the human-readable name.
    pub const fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Set the version.
    pub const fn version(mut self, version: &'static str) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the date.
    pub const fn date(mut self, date: &'static str) -> Self {
        self.date = Some(date);
        self
    }

    /// Name of the plugin the information belongs to.
    pub fn plugin_name(&self) -> &'static str {
        self.plugin.unwrap_or_else(|| module_leaf(self.module))
    }

    /// One-line description: `name, version V, date`, skipping absent parts.
    pub fn describe(&self) -> Option<String> {
        let parts: Vec<String> = [
            self.name.map(str::to_string),
            self.version.map(|version| format!("version {version}")),
            self.date.map(str::to_string),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

inventory::collect!(PluginInfo);

/// Constructor of an endpoint blueprint.
pub type BlueprintFn = fn() -> Blueprint;

/// An endpoint blueprint linked into the binary.
pub struct BlueprintDescriptor {
    module: &'static str,
    plugin: Option<&'static str>,
    build: BlueprintFn,
}

impl BlueprintDescriptor {
    /// Describe a blueprint constructor submitted from `module`.
    pub const fn new(
        module: &'static str,
        plugin: Option<&'static str>,
        build: BlueprintFn,
    ) -> Self {
        Self {
            module,
            plugin,
            build,
        }
    }

    /// Name of the plugin the blueprint belongs to.
    pub fn plugin_name(&self) -> &'static str {
        self.plugin.unwrap_or_else(|| module_leaf(self.module))
    }

    /// Module path of the submission.
    pub fn module(&self) -> &'static str {
        self.module
    }

    /// Construct the blueprint.
    pub fn build(&self) -> Blueprint {
        (self.build)()
    }
}

impl fmt::Debug for BlueprintDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlueprintDescriptor")
            .field("plugin", &self.plugin_name())
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

inventory::collect!(BlueprintDescriptor);

/// Plugin type descriptors of `plugin`, ordered by module path and line.
pub fn descriptors_for(plugin: &str) -> Vec<&'static PluginDescriptor> {
    let mut found: Vec<&'static PluginDescriptor> = inventory::iter::<PluginDescriptor>
        .into_iter()
        .filter(|descriptor| descriptor.plugin_name() == plugin)
        .collect();
    found.sort_by_key(|descriptor| (descriptor.module, descriptor.line));
    found
}

/// Blueprint descriptors of `plugin`, ordered by module path.
pub fn blueprints_for(plugin: &str) -> Vec<&'static BlueprintDescriptor> {
    let mut found: Vec<&'static BlueprintDescriptor> = inventory::iter::<BlueprintDescriptor>
        .into_iter()
        .filter(|descriptor| descriptor.plugin_name() == plugin)
        .collect();
    found.sort_by_key(|descriptor| descriptor.module);
    found
}

/// The information submitted for `plugin`, if any.
pub fn info_for(plugin: &str) -> Option<&'static PluginInfo> {
    inventory::iter::<PluginInfo>
        .into_iter()
        .find(|info| info.plugin_name() == plugin)
}

/// Submit [`PluginInfo`] for the plugin of the current module.
///
/// Accepts any of `plugin`, `name`, `version` and `date` as
/// `key = "literal"` pairs.
#[macro_export]
macro_rules! plugin_info {
    ($($key:ident = $value:literal),* $(,)?) => {
        $crate::inventory::submit! {
            $crate::PluginInfo::new(module_path!())$(.$key($value))*
        }
    };
}

/// Submit a blueprint constructor for the plugin of the current module.
///
/// ```rust,ignore
/// korp_plugins::submit_blueprint!(routes);
/// korp_plugins::submit_blueprint!(plugin = "test1", routes);
/// ```
#[macro_export]
macro_rules! submit_blueprint {
    (plugin = $plugin:literal, $build:path) => {
        $crate::inventory::submit! {
            $crate::BlueprintDescriptor::new(module_path!(), Some($plugin), $build)
        }
    };
    ($build:path) => {
        $crate::inventory::submit! {
            $crate::BlueprintDescriptor::new(module_path!(), None, $build)
        }
    };
}
