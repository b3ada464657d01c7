#![allow(dead_code)]

use korp_plugins::{
    BoxError, CallerDirectory, EndpointDecorators, EndpointFn, MAIN_HANDLER, Registry,
    RegistryBuilder, Request, testing::TestRequest,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;

// ============================================================================
// Values
// ============================================================================

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

// ============================================================================
// Requests and Directories
// ============================================================================

pub fn request(endpoint: &str) -> Arc<TestRequest> {
    Arc::new(TestRequest::new().endpoint(endpoint))
}

pub fn fresh_directory() -> Arc<CallerDirectory> {
    Arc::new(CallerDirectory::new())
}

pub fn frozen(builder: RegistryBuilder) -> Arc<Registry> {
    Arc::new(builder.build())
}

// ============================================================================
// Endpoint Decorators
// ============================================================================

/// A decorator that adds `"decorated_by": [..name]` to object responses.
pub fn marking(name: &'static str) -> impl Fn(EndpointFn) -> EndpointFn + Send + Sync + 'static {
    move |inner: EndpointFn| -> EndpointFn {
        Arc::new(
            move |args: &Map<String, Value>, request: &dyn Request| -> Result<Value, BoxError> {
                let mut body = inner(args, request)?;
                if let Value::Object(map) = &mut body {
                    let trail = map.entry("decorated_by").or_insert_with(|| json!([]));
                    if let Value::Array(items) = trail {
                        items.push(json!(name));
                    }
                }
                Ok(body)
            },
        )
    }
}

pub fn host_decorators() -> EndpointDecorators {
    EndpointDecorators::new().with(MAIN_HANDLER, marking(MAIN_HANDLER))
}
