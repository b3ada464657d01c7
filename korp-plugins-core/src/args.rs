//! # Hook arguments
//!
//! Hook points are invoked with an arbitrary number of positional and
//! keyword arguments whose meaning is fixed by convention between the host
//! and the plugins. [`HookArgs`] carries both as JSON values.
//!
//! Callbacks receive `&mut HookArgs`, so a filter may edit an argument in
//! place and report "no change" by returning `None`.
//!
//! ```rust,ignore
//! let args = hook_args![json!({"corpus": "suomi24"}), 1.5; debug = true];
//! caller.call("enter_handler", args)?;
//! ```

use crate::error::ArgError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Positional and keyword arguments for a hook point invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookArgs {
    positional: Vec<Value>,
    keyword: Map<String, Value>,
}

impl HookArgs {
    /// Empty arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(key.into(), value.into());
        self
    }

    /// Append a positional argument (mutable version).
    pub fn push(&mut self, value: impl Into<Value>) {
        self.positional.push(value.into());
    }

    /// Insert a positional argument at `index`, shifting the rest.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: Value) {
        self.positional.insert(index, value);
    }

    /// Remove the positional argument at `index`, if present.
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        (index < self.positional.len()).then(|| self.positional.remove(index))
    }

    /// Replace the positional argument at `index`, returning the old value.
    pub fn replace(&mut self, index: usize, value: Value) -> Option<Value> {
        self.positional
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, value))
    }

    /// Positional argument at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Mutable positional argument at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.positional.get_mut(index)
    }

    /// Keyword argument by name.
    pub fn kw(&self, key: &str) -> Option<&Value> {
        self.keyword.get(key)
    }

    /// Mutable keyword argument by name.
    pub fn kw_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.keyword.get_mut(key)
    }

    /// Deserialize the positional argument at `index`.
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgError> {
        let value = self.get(index).ok_or(ArgError::Missing(index))?;
        T::deserialize(value).map_err(|source| ArgError::Invalid {
            name: index.to_string(),
            source,
        })
    }

    /// Deserialize the keyword argument `key`.
    pub fn parse_kw<T: DeserializeOwned>(&self, key: &str) -> Result<T, ArgError> {
        let value = self
            .kw(key)
            .ok_or_else(|| ArgError::MissingKeyword(key.to_string()))?;
        T::deserialize(value).map_err(|source| ArgError::Invalid {
            name: key.to_string(),
            source,
        })
    }

    /// All positional arguments.
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// All keyword arguments.
    pub fn keyword(&self) -> &Map<String, Value> {
        &self.keyword
    }

    /// Number of positional arguments.
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    /// Whether there are no positional and no keyword arguments.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

impl From<()> for HookArgs {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Vec<Value>> for HookArgs {
    fn from(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keyword: Map::new(),
        }
    }
}

impl From<Map<String, Value>> for HookArgs {
    fn from(keyword: Map<String, Value>) -> Self {
        Self {
            positional: Vec::new(),
            keyword,
        }
    }
}

/// Build [`HookArgs`] from positional values and optional `key = value` pairs.
///
/// Each value goes through `serde_json::Value::from`; use `json!` for
/// anything more structured.
#[macro_export]
macro_rules! hook_args {
    ($($arg:expr),* $(,)?) => {
        $crate::HookArgs::new()$(.arg($crate::serde_json::Value::from($arg)))*
    };
    ($($arg:expr),* ; $($key:ident = $val:expr),* $(,)?) => {
        $crate::HookArgs::new()
            $(.arg($crate::serde_json::Value::from($arg)))*
            $(.kwarg(stringify!($key), $crate::serde_json::Value::from($val)))*
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_access() {
        let args = HookArgs::new()
            .arg(json!({"q": "[word = \"talo\"]"}))
            .arg(3)
            .kwarg("debug", true);

        assert_eq!(args.len(), 2);
        assert_eq!(args.get(1), Some(&json!(3)));
        assert_eq!(args.kw("debug"), Some(&json!(true)));
        assert!(args.get(2).is_none());
        assert!(!args.is_empty());
    }

    #[test]
    fn test_insert_replace_remove() {
        let mut args = HookArgs::from(vec![json!("b")]);
        args.insert(0, json!("a"));
        assert_eq!(args.positional(), &[json!("a"), json!("b")]);

        assert_eq!(args.replace(0, json!("z")), Some(json!("a")));
        assert_eq!(args.replace(5, json!("x")), None);

        assert_eq!(args.remove(0), Some(json!("z")));
        assert_eq!(args.remove(3), None);
        assert_eq!(args.positional(), &[json!("b")]);
    }

    #[test]
    fn test_parse_typed() {
        let args = HookArgs::new().arg("SELECT 1").kwarg("limit", 10);

        let sql: String = args.parse(0).unwrap();
        assert_eq!(sql, "SELECT 1");
        let limit: u32 = args.parse_kw("limit").unwrap();
        assert_eq!(limit, 10);

        assert!(matches!(args.parse::<String>(1), Err(ArgError::Missing(1))));
        assert!(matches!(
            args.parse_kw::<u32>("offset"),
            Err(ArgError::MissingKeyword(_))
        ));
        assert!(matches!(
            args.parse::<u32>(0),
            Err(ArgError::Invalid { .. })
        ));
    }

    #[test]
    fn test_in_place_mutation() {
        let mut args = HookArgs::new().arg(json!({"show_struct": ""}));
        if let Some(Value::Object(map)) = args.get_mut(0) {
            map.insert("show_struct".into(), json!("text_removed"));
        }
        assert_eq!(args.get(0), Some(&json!({"show_struct": "text_removed"})));
    }

    #[test]
    fn test_hook_args_macro() {
        let args = crate::hook_args!["cqp", 2; verbose = true];
        assert_eq!(args.positional(), &[json!("cqp"), json!(2)]);
        assert_eq!(args.kw("verbose"), Some(&json!(true)));

        let empty = crate::hook_args![];
        assert!(empty.is_empty());
    }
}
