//! # Layered configuration
//!
//! Configuration values are resolved from a stack of layers, highest
//! precedence first. The *last non-empty* layer is the defaults layer: it
//! decides which keys exist at all. Every other layer may only override
//! those keys; anything else it carries is ignored.
//!
//! For plugins the stack is
//!
//! 1. the configuration given with the plugin in the load list,
//! 2. the host configuration entry `PLUGIN_CONFIG_<NAME>`,
//! 3. the plugin's own typed defaults.
//!
//! ```rust,ignore
//! #[derive(Default, Serialize, Deserialize)]
//! struct HiderConfig {
//!     hidden_struct_names: Vec<String>,
//!     hidden_value_pos_attr: String,
//! }
//!
//! fn create(ctx: &PluginContext<'_>) -> Result<Self, BoxError> {
//!     let conf: HiderConfig = ctx.config()?;
//!     Ok(Self { conf })
//! }
//! ```

use crate::error::ConfigError;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::cell::OnceCell;

/// Resolve `layers` (highest precedence first) into one map.
///
/// The last non-empty layer supplies the keys and their default values;
/// each key then takes its value from the first earlier layer defining it.
pub fn resolve_layers(layers: &[&Map<String, Value>]) -> Map<String, Value> {
    let Some(defaults_at) = layers.iter().rposition(|layer| !layer.is_empty()) else {
        return Map::new();
    };
    let overrides = &layers[..defaults_at];
    let mut resolved = layers[defaults_at].clone();
    for (key, value) in resolved.iter_mut() {
        if let Some(found) = overrides.iter().find_map(|layer| layer.get(key)) {
            *value = found.clone();
        }
    }
    resolved
}

/// Resolve `layers` on top of `T::default()` and convert the result.
///
/// Returns the typed value and the resolved map it was built from.
pub fn resolve_config<T>(
    name: &str,
    layers: &[&Map<String, Value>],
) -> Result<(T, Map<String, Value>), ConfigError>
where
    T: Serialize + DeserializeOwned + Default,
{
    let defaults = match serde_json::to_value(T::default()) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(ConfigError::NotAnObject(name.to_string())),
        Err(source) => {
            return Err(ConfigError::Invalid {
                plugin: name.to_string(),
                source,
            });
        }
    };
    let mut stack = layers.to_vec();
    stack.push(&defaults);
    let resolved = resolve_layers(&stack);
    let typed = from_map(name, &resolved)?;
    Ok((typed, resolved))
}

fn from_map<T: DeserializeOwned>(name: &str, map: &Map<String, Value>) -> Result<T, ConfigError> {
    T::deserialize(Value::Object(map.clone())).map_err(|source| ConfigError::Invalid {
        plugin: name.to_string(),
        source,
    })
}

/// Host configuration key holding the configuration of `plugin`.
pub fn host_config_key(plugin: &str) -> String {
    format!("PLUGIN_CONFIG_{}", plugin.to_uppercase())
}

/// Construction context handed to a plugin's `create`.
///
/// One context is shared by every plugin type of the same plugin. Each
/// typed request resolves the layers against its own defaults; the first
/// resolved map is kept and reported as the plugin's configuration.
#[derive(Debug)]
pub struct PluginContext<'a> {
    plugin: &'a str,
    overrides: Option<&'a Map<String, Value>>,
    host: Option<&'a Map<String, Value>>,
    resolved: OnceCell<Map<String, Value>>,
}

impl<'a> PluginContext<'a> {
    /// Context for the plugin named `plugin` with no configuration layers.
    pub fn new(plugin: &'a str) -> Self {
        Self {
            plugin,
            overrides: None,
            host: None,
            resolved: OnceCell::new(),
        }
    }

    /// Set the load-list configuration of the plugin.
    pub fn with_overrides(mut self, overrides: &'a Map<String, Value>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Set the host configuration, searched for `PLUGIN_CONFIG_<NAME>`.
    pub fn with_host_config(mut self, host: &'a Map<String, Value>) -> Self {
        self.host = Some(host);
        self
    }

    /// Name of the plugin being constructed.
    pub fn plugin(&self) -> &str {
        self.plugin
    }

    /// Typed configuration of the plugin, defaulting to `T::default()`.
    pub fn config<T>(&self) -> Result<T, ConfigError>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let layers = self.layers()?;
        let (typed, resolved) = resolve_config(self.plugin, &layers)?;
        let _ = self.resolved.set(resolved);
        Ok(typed)
    }

    /// Untyped configuration of the plugin.
    ///
    /// Returns the map recorded by an earlier call if there is one.
    /// Otherwise no defaults apply and the keys come from the last non-empty
    /// of the host entry and the load-list configuration.
    pub fn config_map(&self) -> Result<&Map<String, Value>, ConfigError> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved);
        }
        let resolved = resolve_layers(&self.layers()?);
        Ok(self.resolved.get_or_init(|| resolved))
    }

    /// The configuration resolved so far, if any.
    pub fn resolved(&self) -> Option<&Map<String, Value>> {
        self.resolved.get()
    }

    fn layers(&self) -> Result<Vec<&'a Map<String, Value>>, ConfigError> {
        let mut layers = Vec::with_capacity(2);
        if let Some(overrides) = self.overrides {
            layers.push(overrides);
        }
        if let Some(host) = self.host {
            let key = host_config_key(self.plugin);
            match host.get(&key) {
                Some(Value::Object(entry)) => layers.push(entry),
                Some(_) => return Err(ConfigError::NotAnObject(key)),
                None => {}
            }
        }
        Ok(layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct LoggerConfig {
        log_level: String,
        log_categories: Vec<String>,
        log_enable_debug_param: bool,
    }

    impl Default for LoggerConfig {
        fn default() -> Self {
            Self {
                log_level: "info".into(),
                log_categories: vec!["auth".into(), "params".into()],
                log_enable_debug_param: true,
            }
        }
    }

    #[test]
    fn test_last_non_empty_layer_defines_keys() {
        let high = map(json!({"a": 1, "unknown": 9}));
        let empty = Map::new();
        let defaults = map(json!({"a": 0, "b": 0}));

        let resolved = resolve_layers(&[&high, &defaults, &empty]);

        assert_eq!(Value::Object(resolved), json!({"a": 1, "b": 0}));
    }

    #[test]
    fn test_first_layer_wins() {
        let first = map(json!({"a": "first"}));
        let second = map(json!({"a": "second", "b": "second"}));
        let defaults = map(json!({"a": "default", "b": "default", "c": "default"}));

        let resolved = resolve_layers(&[&first, &second, &defaults]);

        assert_eq!(
            Value::Object(resolved),
            json!({"a": "first", "b": "second", "c": "default"})
        );
    }

    #[test]
    fn test_all_layers_empty() {
        let empty = Map::new();
        assert!(resolve_layers(&[&empty, &empty]).is_empty());
        assert!(resolve_layers(&[]).is_empty());
    }

    #[test]
    fn test_plugin_precedence() {
        let overrides = map(json!({"log_level": "debug"}));
        let host = map(json!({
            "PLUGIN_CONFIG_LOGGER": {"log_level": "warning", "log_enable_debug_param": false},
            "PLUGIN_CONFIG_OTHER": {"log_level": "error"},
        }));

        let ctx = PluginContext::new("logger")
            .with_overrides(&overrides)
            .with_host_config(&host);
        let conf: LoggerConfig = ctx.config().unwrap();

        assert_eq!(conf.log_level, "debug");
        assert!(!conf.log_enable_debug_param);
        assert_eq!(conf.log_categories, vec!["auth", "params"]);
        assert_eq!(ctx.resolved().unwrap()["log_level"], json!("debug"));
    }

    #[test]
    fn test_defaults_only() {
        let ctx = PluginContext::new("logger");
        let conf: LoggerConfig = ctx.config().unwrap();
        assert_eq!(conf, LoggerConfig::default());
    }

    #[test]
    fn test_resolution_is_cached() {
        let overrides = map(json!({"log_level": "debug"}));
        let ctx = PluginContext::new("logger").with_overrides(&overrides);

        let first: LoggerConfig = ctx.config().unwrap();
        let again: LoggerConfig = ctx.config().unwrap();
        assert_eq!(first, again);

        let untyped = ctx.config_map().unwrap();
        assert_eq!(untyped["log_level"], json!("debug"));
        assert!(untyped.contains_key("log_categories"));
    }

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct AuditConfig {
        log_level: String,
        audit_path: String,
    }

    #[test]
    fn test_each_type_gets_its_own_defaults() {
        let overrides = map(json!({"log_level": "debug"}));
        let ctx = PluginContext::new("logger").with_overrides(&overrides);

        let untyped = ctx.config_map().unwrap();
        assert_eq!(Value::Object(untyped.clone()), json!({"log_level": "debug"}));

        let logger: LoggerConfig = ctx.config().unwrap();
        assert_eq!(logger.log_level, "debug");
        assert_eq!(logger.log_categories, vec!["auth", "params"]);

        let audit: AuditConfig = ctx.config().unwrap();
        assert_eq!(audit.log_level, "debug");
        assert_eq!(audit.audit_path, "");
        assert_eq!(ctx.resolved().unwrap().len(), 1);
    }

    #[test]
    fn test_untyped_without_defaults() {
        let overrides = map(json!({"x": 1}));
        let host = map(json!({"PLUGIN_CONFIG_TEST1": {"x": 2, "y": 2}}));
        let ctx = PluginContext::new("test1")
            .with_overrides(&overrides)
            .with_host_config(&host);

        let resolved = ctx.config_map().unwrap();
        assert_eq!(Value::Object(resolved.clone()), json!({"x": 1, "y": 2}));
    }

    #[test]
    fn test_host_entry_must_be_object() {
        let host = map(json!({"PLUGIN_CONFIG_LOGGER": "verbose"}));
        let ctx = PluginContext::new("logger").with_host_config(&host);
        let err = ctx.config::<LoggerConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::NotAnObject(key) if key == "PLUGIN_CONFIG_LOGGER"));
    }

    #[test]
    fn test_invalid_override_type() {
        let overrides = map(json!({"log_enable_debug_param": "yes"}));
        let ctx = PluginContext::new("logger").with_overrides(&overrides);
        assert!(matches!(
            ctx.config::<LoggerConfig>(),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
