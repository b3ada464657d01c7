//! # Endpoint plugins
//!
//! Besides callbacks, a plugin may add whole endpoints to the host. It
//! declares them on a [`Blueprint`]; the loader later hands every route to
//! the host's [`RouteSink`], wrapped in the host's endpoint decorators.
//!
//! Every route is wrapped in the `main_handler` decorator (outermost) and in
//! the route's extra decorators, which are listed topmost first, the way
//! stacked decorators read in source. Names without a known decorator are
//! skipped.
//!
//! ```rust,ignore
//! fn routes() -> Blueprint {
//!     Blueprint::new("test1").route_with(
//!         "/test",
//!         "test",
//!         RouteOptions::new().extra_decorators(["test_decor"]),
//!         |args, _request| Ok(json!({"args": args})),
//!     )
//! }
//! korp_plugins::submit_blueprint!(routes);
//! ```

use korp_plugins_core::{BoxError, Request};
use serde_json::{Map, Value};
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::debug;

/// Name of the decorator every endpoint is wrapped in.
pub const MAIN_HANDLER: &str = "main_handler";

/// An endpoint handler: request arguments and request in, response body out.
pub type EndpointFn =
    Arc<dyn Fn(&Map<String, Value>, &dyn Request) -> Result<Value, BoxError> + Send + Sync>;

/// A named transformation of endpoint handlers.
pub type EndpointDecorator = Arc<dyn Fn(EndpointFn) -> EndpointFn + Send + Sync>;

/// The endpoint decorators available by name.
#[derive(Clone, Default)]
pub struct EndpointDecorators {
    decorators: HashMap<String, EndpointDecorator>,
}

impl EndpointDecorators {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a decorator under `name`, replacing any previous one.
    pub fn with<F>(mut self, name: impl Into<String>, decorator: F) -> Self
    where
        F: Fn(EndpointFn) -> EndpointFn + Send + Sync + 'static,
    {
        self.add(name, decorator);
        self
    }

    /// Add a decorator under `name` (mutable version).
    pub fn add<F>(&mut self, name: impl Into<String>, decorator: F) -> &mut Self
    where
        F: Fn(EndpointFn) -> EndpointFn + Send + Sync + 'static,
    {
        self.decorators.insert(name.into(), Arc::new(decorator));
        self
    }

    /// Add every decorator of `other`, replacing same-named ones.
    pub fn extend(&mut self, other: &EndpointDecorators) {
        self.decorators.extend(
            other
                .decorators
                .iter()
                .map(|(name, decorator)| (name.clone(), Arc::clone(decorator))),
        );
    }

    /// Replace the whole set with `other`.
    pub fn set(&mut self, other: EndpointDecorators) {
        *self = other;
    }

    /// The decorator named `name`.
    pub fn get(&self, name: &str) -> Option<&EndpointDecorator> {
        self.decorators.get(name)
    }

    /// Whether a decorator named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.decorators.contains_key(name)
    }

    /// Decorator names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.decorators.keys().map(String::as_str)
    }

    /// Get the number of decorators.
    pub fn len(&self) -> usize {
        self.decorators.len()
    }

    /// Check if there are no decorators.
    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    /// Wrap `handler` in `main_handler` and `extra`, `main_handler` outermost.
    pub fn wrap(&self, handler: EndpointFn, extra: &[String]) -> EndpointFn {
        std::iter::once(MAIN_HANDLER)
            .chain(extra.iter().map(String::as_str))
            .rev()
            .filter_map(|name| self.get(name))
            .fold(handler, |wrapped, decorator| decorator(wrapped))
    }
}

impl fmt::Debug for EndpointDecorators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.decorators.keys()).finish()
    }
}

/// Options of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOptions {
    methods: Vec<String>,
    extra_decorators: Vec<String>,
}

impl RouteOptions {
    /// Default options: `GET` and `POST`, no extra decorators.
    pub fn new() -> Self {
        Self {
            methods: vec!["GET".into(), "POST".into()],
            extra_decorators: Vec::new(),
        }
    }

    /// Set the HTTP methods.
    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Set the extra decorators, topmost first.
    pub fn extra_decorators<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_decorators = names.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self::new()
    }
}

struct Route {
    rule: String,
    endpoint: String,
    options: RouteOptions,
    handler: EndpointFn,
}

/// A group of endpoints contributed by a plugin.
pub struct Blueprint {
    name: String,
    routes: Vec<Route>,
    decorators: EndpointDecorators,
}

impl Blueprint {
    /// Create an empty blueprint.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
            decorators: EndpointDecorators::new(),
        }
    }

    /// Add a route with default options.
    pub fn route<F>(self, rule: impl Into<String>, endpoint: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>, &dyn Request) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.route_with(rule, endpoint, RouteOptions::new(), handler)
    }

    /// Add a route.
    pub fn route_with<F>(
        mut self,
        rule: impl Into<String>,
        endpoint: impl Into<String>,
        options: RouteOptions,
        handler: F,
    ) -> Self
    where
        F: Fn(&Map<String, Value>, &dyn Request) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.routes.push(Route {
            rule: rule.into(),
            endpoint: endpoint.into(),
            options,
            handler: Arc::new(handler),
        });
        self
    }

    /// Make `decorator` available to every endpoint under `name`.
    pub fn endpoint_decorator<F>(mut self, name: impl Into<String>, decorator: F) -> Self
    where
        F: Fn(EndpointFn) -> EndpointFn + Send + Sync + 'static,
    {
        self.decorators.add(name, decorator);
        self
    }

    /// Blueprint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Route rules, in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.rule.as_str())
    }

    /// Decorators this blueprint contributes.
    pub fn decorators(&self) -> &EndpointDecorators {
        &self.decorators
    }

    /// Hand every route to `sink`, wrapped with `decorators`.
    pub fn register<S: RouteSink + ?Sized>(self, sink: &mut S, decorators: &EndpointDecorators) {
        for route in self.routes {
            debug!(
                blueprint = %self.name,
                rule = %route.rule,
                endpoint = %route.endpoint,
                "registering route"
            );
            let handler = decorators.wrap(route.handler, &route.options.extra_decorators);
            sink.add_route(RouteDef {
                blueprint: self.name.clone(),
                rule: route.rule,
                endpoint: route.endpoint,
                methods: route.options.methods,
                handler,
            });
        }
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("name", &self.name)
            .field("rules", &self.rules().collect::<Vec<_>>())
            .field("decorators", &self.decorators)
            .finish()
    }
}

/// A fully wrapped route handed to the host.
#[derive(Clone)]
pub struct RouteDef {
    /// Name of the blueprint declaring the route.
    pub blueprint: String,
    /// URL rule.
    pub rule: String,
    /// Endpoint name.
    pub endpoint: String,
    /// Accepted HTTP methods.
    pub methods: Vec<String>,
    /// The decorated handler.
    pub handler: EndpointFn,
}

impl RouteDef {
    /// Invoke the decorated handler.
    pub fn handle(
        &self,
        args: &Map<String, Value>,
        request: &dyn Request,
    ) -> Result<Value, BoxError> {
        (self.handler)(args, request)
    }
}

impl fmt::Debug for RouteDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDef")
            .field("blueprint", &self.blueprint)
            .field("rule", &self.rule)
            .field("endpoint", &self.endpoint)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// The host's routing table.
pub trait RouteSink {
    /// Add one route.
    fn add_route(&mut self, route: RouteDef);
}

impl RouteSink for Vec<RouteDef> {
    fn add_route(&mut self, route: RouteDef) {
        self.push(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSink, TestRequest};
    use serde_json::json;

    fn tagging(tag: &'static str) -> impl Fn(EndpointFn) -> EndpointFn + Send + Sync + 'static {
        move |inner: EndpointFn| -> EndpointFn {
            Arc::new(
                move |args: &Map<String, Value>, request: &dyn Request| -> Result<Value, BoxError> {
                    let mut trail = inner(args, request)?;
                    if let Value::Array(items) = &mut trail {
                        items.push(json!(tag));
                    }
                    Ok(trail)
                },
            )
        }
    }

    #[test]
    fn test_main_handler_is_outermost() {
        let decorators = EndpointDecorators::new()
            .with(MAIN_HANDLER, tagging("main"))
            .with("top", tagging("top"))
            .with("bottom", tagging("bottom"));

        let blueprint = Blueprint::new("test").route_with(
            "/trail",
            "trail",
            RouteOptions::new().extra_decorators(["top", "missing", "bottom"]),
            |_, _| Ok(json!([])),
        );

        let mut sink = RecordingSink::new();
        blueprint.register(&mut sink, &decorators);

        let route = sink.route("/trail").unwrap();
        let body = route.handle(&Map::new(), &TestRequest::new()).unwrap();
        assert_eq!(body, json!(["bottom", "top", "main"]));
    }

    #[test]
    fn test_default_methods() {
        let blueprint = Blueprint::new("test").route("/ping", "ping", |_, _| Ok(json!("pong")));
        let mut routes: Vec<RouteDef> = Vec::new();
        blueprint.register(&mut routes, &EndpointDecorators::new());

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].methods, vec!["GET", "POST"]);
        assert_eq!(routes[0].blueprint, "test");
        assert_eq!(routes[0].endpoint, "ping");
    }

    #[test]
    fn test_explicit_methods() {
        let blueprint = Blueprint::new("test").route_with(
            "/only-get",
            "only_get",
            RouteOptions::new().methods(["GET"]),
            |_, _| Ok(Value::Null),
        );
        let mut routes: Vec<RouteDef> = Vec::new();
        blueprint.register(&mut routes, &EndpointDecorators::new());
        assert_eq!(routes[0].methods, vec!["GET"]);
    }

    #[test]
    fn test_extend_and_set() {
        let mut decorators = EndpointDecorators::new().with(MAIN_HANDLER, |f| f);
        let contributed = Blueprint::new("test").endpoint_decorator("extra", |f| f);
        decorators.extend(contributed.decorators());
        assert!(decorators.contains("extra"));
        assert_eq!(decorators.len(), 2);

        decorators.set(EndpointDecorators::new());
        assert!(decorators.is_empty());
    }
}
