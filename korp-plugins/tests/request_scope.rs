mod common;

use common::{fresh_directory, frozen, request};
use korp_plugins::{
    BoxError, CallerDirectory, HookArgs, PluginError, RegistryBuilder, Request, RequestScope,
    ambient, identity,
    testing::{CallLog, ProxyRequest},
};
use serde_json::json;
use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
};

fn tagging_registry(log: CallLog) -> RegistryBuilder {
    RegistryBuilder::new()
        .register_fn("host", "enter_handler", move |_: &mut HookArgs, request: &dyn Request| {
            log.record(request.endpoint().unwrap_or("-").to_string());
        })
        .register_fn("host", "filter_result", |args: &mut HookArgs, _: &dyn Request| {
            let hits: u64 = args.parse(0)?;
            Ok::<_, BoxError>(json!(hits + 1))
        })
}

#[test]
fn test_scope_lifecycle() {
    let log = CallLog::new();
    let registry = frozen(tagging_registry(log.clone()));
    let directory = fresh_directory();
    let r = request("query");

    {
        let scope = RequestScope::enter(r.clone(), registry, &directory);
        scope.call("enter_handler", ()).unwrap();
        assert_eq!(scope.call_chain("filter_result", 41, ()).unwrap(), json!(42));

        let ambient = directory.get_instance(None).unwrap();
        assert!(Arc::ptr_eq(&ambient, scope.caller()));
        assert_eq!(ambient::current().unwrap().id(), r.id());
    }

    assert_eq!(log.entries(), vec!["query"]);
    assert!(directory.is_empty());
    assert!(ambient::current().is_none());
    assert!(matches!(
        directory.call_for_request("enter_handler", (), Some(r.as_ref())),
        Err(PluginError::NoCaller(_))
    ));
    assert!(matches!(
        directory.call_for_request("enter_handler", (), None),
        Err(PluginError::NoAmbientRequest)
    ));
}

#[test]
fn test_scope_cleanup_on_unwind() {
    let registry = frozen(tagging_registry(CallLog::new()));
    let directory = fresh_directory();
    let r = request("query");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let scope = RequestScope::enter(r.clone(), registry.clone(), &directory);
        scope.call("enter_handler", ()).unwrap();
        panic!("handler failed");
    }));

    assert!(outcome.is_err());
    assert!(!directory.contains(r.id()));
    assert!(ambient::current().is_none());
}

#[test]
fn test_nested_scopes_restore_ambient_request() {
    let registry = frozen(RegistryBuilder::new());
    let directory = fresh_directory();
    let outer = request("query");
    let inner = request("count");

    let _outer_scope = RequestScope::enter(outer.clone(), registry.clone(), &directory);
    {
        let _inner_scope = RequestScope::enter(inner.clone(), registry, &directory);
        assert_eq!(directory.get_instance(None).unwrap().id(), inner.id());
        assert_eq!(directory.len(), 2);
    }
    assert_eq!(directory.get_instance(None).unwrap().id(), outer.id());
    assert_eq!(directory.len(), 1);
}

#[test]
fn test_proxy_resolves_to_concrete_request() {
    let directory = fresh_directory();
    let concrete = request("query");
    let proxy = ProxyRequest::new(concrete.clone());

    assert_ne!(proxy.id(), concrete.id());
    assert_eq!(identity(&proxy), concrete.id());

    let scope = RequestScope::enter(concrete, frozen(RegistryBuilder::new()), &directory);
    let found = directory.get_instance(Some(&proxy)).unwrap();
    assert!(Arc::ptr_eq(&found, scope.caller()));
}

#[test]
fn test_caller_created_through_proxy() {
    let directory = fresh_directory();
    let concrete = request("query");
    let proxy: Arc<dyn Request> = Arc::new(ProxyRequest::new(concrete.clone()));

    let scope = RequestScope::enter(proxy, frozen(RegistryBuilder::new()), &directory);
    assert_eq!(scope.id(), concrete.id());
    assert!(directory.get_instance(Some(concrete.as_ref())).is_ok());
}

#[test]
fn test_concurrent_requests_share_global_directory() {
    let log = CallLog::new();
    let registry = frozen(tagging_registry(log.clone()));

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let endpoint = format!("endpoint{n}");
                let r = request(&endpoint);
                let scope = RequestScope::enter(r.clone(), registry, CallerDirectory::global());

                CallerDirectory::global()
                    .call_for_request("enter_handler", (), None)
                    .unwrap();
                let hits = CallerDirectory::global()
                    .call_chain_for_request("filter_result", n, (), Some(r.as_ref()))
                    .unwrap();
                assert_eq!(hits, json!(n + 1));
                assert!(Arc::ptr_eq(
                    &CallerDirectory::global().get_instance(None).unwrap(),
                    scope.caller()
                ));
                drop(scope);
                assert!(!CallerDirectory::global().contains(r.id()));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let mut entries = log.entries();
    entries.sort();
    let mut expected: Vec<String> = (0..8).map(|n| format!("endpoint{n}")).collect();
    expected.sort();
    assert_eq!(entries, expected);
}
