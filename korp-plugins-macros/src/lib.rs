//! Procedural macros for the Korp plugin framework.
//!
//! - `#[callback_plugin]` - turns an inherent `impl` block into a callback
//!   plugin registered in the link-time inventory.

use proc_macro::TokenStream;
use syn::{ItemImpl, parse_macro_input};

mod callback_plugin;

/// Declare a callback plugin.
///
/// Every `&self` method of the annotated `impl` block whose name starts with
/// a lowercase letter becomes a callback for the hook point of the same
/// name. Callbacks take `&mut HookArgs` and `&dyn Request` (either may be
/// omitted from the right) and return anything implementing
/// `IntoCallbackResult`. An inherent `applies_to(&self, &dyn Request)`
/// returning `bool` or `Result<bool, E>` becomes the plugin's predicate.
///
/// # Arguments
///
/// - `plugin = "name"`: plugin the type belongs to (defaults to the module name)
/// - `init = path`: constructor `fn(&PluginContext) -> Result<Self, E>`
///   (defaults to `Default::default`)
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct SqlLimiter;
///
/// #[callback_plugin(plugin = "limits")]
/// impl SqlLimiter {
///     fn filter_sql(&self, args: &mut HookArgs) -> Result<Value, ArgError> {
///         let sql: String = args.parse(0)?;
///         Ok(json!(format!("{sql} LIMIT 1000")))
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn callback_plugin(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as callback_plugin::PluginArgs);
    let input = parse_macro_input!(item as ItemImpl);

    callback_plugin::expand(args, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
