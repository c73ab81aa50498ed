//! Integration tests for transactional dependency substitution.
//!
//! These tests verify:
//! - Direct dependencies receive stubs, deeper ones keep the real module
//! - The registry is restored after success, execute errors and bad stubs
//! - The caller's child list never grows
//! - Aliases are honored for targets and stubs
//! - The harness leaves no trace of its own load

use std::path::PathBuf;
use std::sync::Arc;

use depswap::modules::{ModuleLoader, ModuleRecord};
use depswap::{
    ExecutionError, Harness, HostConfig, LoadError, ModuleHost, ModuleId, ParentContext, Stubs,
    Value,
};

/// Get the path to the test fixtures directory
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn caller() -> ParentContext {
    ParentContext::new(fixtures_dir().join("substitution_test.rs"))
}

/// b exports `greet` and `value`; a wraps and re-exports b; e uses b; d uses both b and e.
fn host_with(config: &HostConfig) -> Arc<ModuleHost> {
    let host = ModuleHost::new(config);
    let dir = fixtures_dir();

    host.define(dir.join("b.mod"), |_| Ok(mock_b("hello world")))
        .unwrap();

    host.define(dir.join("a.mod"), |scope| {
        let b = scope.require("./b")?;
        let value = b.get("value").cloned().unwrap_or(Value::Unit);
        Ok(Value::object([
            (
                "default",
                Value::function(move |_| b.call_member("greet", &[])),
            ),
            ("value", value),
        ]))
    })
    .unwrap();

    host.define(dir.join("e.mod"), |scope| {
        let b = scope.require("./b")?;
        Ok(Value::object([(
            "default",
            Value::function(move |_| b.call_member("greet", &[])),
        )]))
    })
    .unwrap();

    host.define(dir.join("d.mod"), |scope| {
        let b = scope.require("./b")?;
        let e = scope.require("./e")?;
        Ok(Value::object([("b", b), ("e", e)]))
    })
    .unwrap();

    Arc::new(host)
}

fn host() -> Arc<ModuleHost> {
    host_with(&HostConfig::default())
}

fn mock_b(greeting: &'static str) -> Value {
    Value::object([
        (
            "greet",
            Value::function(move |_| Ok(Value::from(greeting))),
        ),
        ("value", Value::from(greeting)),
    ])
}

fn id(host: &ModuleHost, request: &str) -> ModuleId {
    host.resolver()
        .resolve(request, &fixtures_dir())
        .expect("fixture should resolve")
}

fn cached(host: &ModuleHost, request: &str) -> Option<Arc<ModuleRecord>> {
    host.registry().get(&id(host, request))
}

// ============================================================
// Substitution
// ============================================================

#[test]
fn test_hello_world_without_stubs() {
    let host = host();
    let mut me = caller();

    let a = depswap::stub::run(host.as_ref(), "./a", &mut me, &Stubs::new()).unwrap();
    assert_eq!(a.call_member("default", &[]), Ok(Value::from("hello world")));
}

#[test]
fn test_hello_mock() {
    let host = host();
    let mut me = caller();

    let stubs = Stubs::new().with("./b", mock_b("hello mock"));
    let a = depswap::stub::run(host.as_ref(), "./a", &mut me, &stubs).unwrap();
    assert_eq!(a.call_member("default", &[]), Ok(Value::from("hello mock")));
    assert_eq!(a.get("value"), Some(&Value::from("hello mock")));

    // The cached a still talks to the real b.
    let real = depswap::stub::run(host.as_ref(), "./a", &mut me, &Stubs::new()).unwrap();
    assert_eq!(real.call_member("default", &[]), Ok(Value::from("hello world")));
    assert_eq!(real.get("value"), Some(&Value::from("hello world")));
}

#[test]
fn test_repeated_runs_have_same_shape() {
    let host = host();
    let mut me = caller();

    let first = depswap::stub::run(host.as_ref(), "./a", &mut me, &Stubs::new()).unwrap();
    let second = depswap::stub::run(host.as_ref(), "./a", &mut me, &Stubs::new()).unwrap();
    assert_eq!(first.type_name(), second.type_name());
    assert_eq!(
        first.call_member("default", &[]),
        second.call_member("default", &[])
    );
}

#[test]
fn test_deep_dependency_keeps_real_module() {
    let host = host();
    let mut me = caller();

    let stubs = Stubs::new().with("./b", mock_b("hello mock"));
    let d = depswap::stub::run(host.as_ref(), "./d", &mut me, &stubs).unwrap();

    assert_eq!(
        d.get("b").unwrap().call_member("greet", &[]),
        Ok(Value::from("hello mock"))
    );
    assert_eq!(
        d.get("e").unwrap().call_member("default", &[]),
        Ok(Value::from("hello world"))
    );
}

#[test]
fn test_registry_restored_after_success() {
    let host = host();
    let mut me = caller();

    depswap::stub::run(host.as_ref(), "./a", &mut me, &Stubs::new()).unwrap();
    let true_a = cached(&host, "./a").unwrap();
    let true_b = cached(&host, "./b").unwrap();
    let before = host.registry().module_count();

    let stubs = Stubs::new().with("./b", mock_b("hello mock"));
    depswap::stub::run(host.as_ref(), "./a", &mut me, &stubs).unwrap();

    assert!(Arc::ptr_eq(&cached(&host, "./a").unwrap(), &true_a));
    assert!(Arc::ptr_eq(&cached(&host, "./b").unwrap(), &true_b));
    assert_eq!(host.registry().module_count(), before);
}

#[test]
fn test_stub_for_uncached_identity_is_removed() {
    let host = host();
    let mut me = caller();

    // c is never required by a; its slot is empty before and after.
    let stubs = Stubs::new().with("./c", Value::from("unused"));
    depswap::stub::run(host.as_ref(), "./a", &mut me, &stubs).unwrap();
    assert!(cached(&host, "./c").is_none());
}

#[test]
fn test_module_first_loaded_under_stubs_is_evicted() {
    let host = host();
    // c only pulls in e when b looks stubbed; e re-exports b.
    host.define(fixtures_dir().join("c.mod"), |scope| {
        let b = scope.require("./b")?;
        if b == Value::Bool(true) {
            let e = scope.require("./e")?;
            Ok(Value::object([("e", e)]))
        } else {
            Ok(Value::Unit)
        }
    })
    .unwrap();
    host.define(fixtures_dir().join("e.mod"), |scope| scope.require("./b"))
        .unwrap();

    let mut me = caller();
    let stubs = Stubs::new().with("./b", Value::Bool(true));
    let c = depswap::stub::run(host.as_ref(), "./c", &mut me, &stubs).unwrap();
    assert_eq!(c.get("e"), Some(&Value::Bool(true)));

    assert!(cached(&host, "./e").is_none());
    assert_eq!(cached(&host, "./c").unwrap().exports(), &Value::Unit);

    let e = host.require("./e", &mut me).unwrap();
    assert_eq!(e.get("value"), Some(&Value::from("hello world")));
}

// ============================================================
// Failure paths
// ============================================================

#[test]
fn test_execute_error_restores_registry() {
    let host = host();
    host.define(fixtures_dir().join("c.mod"), |scope| {
        let b = scope.require("./b")?;
        b.call_member("greet", &[])?;
        Ok(Value::from("c done"))
    })
    .unwrap();

    let mut me = caller();
    let stubs = Stubs::new().with(
        "./b",
        Value::object([(
            "greet",
            Value::function(|_| Err(ExecutionError::new("Woops"))),
        )]),
    );

    let err = depswap::stub::run(host.as_ref(), "./c", &mut me, &stubs).unwrap_err();
    assert_eq!(err.as_execution().map(|e| e.message()), Some("Woops"));
    assert_eq!(
        err.as_execution().and_then(|e| e.module()),
        Some(&id(&host, "./c"))
    );

    assert!(!cached(&host, "./b").unwrap().is_synthetic());
    assert!(!cached(&host, "./c").unwrap().is_synthetic());
    assert!(me.children().is_empty());

    let again = depswap::stub::run(host.as_ref(), "./c", &mut me, &Stubs::new()).unwrap();
    assert_eq!(again, Value::from("c done"));
}

#[test]
fn test_nonexistent_stub_path() {
    let host = host();
    let mut me = caller();

    depswap::stub::run(host.as_ref(), "./a", &mut me, &Stubs::new()).unwrap();
    let true_a = cached(&host, "./a").unwrap();
    let true_b = cached(&host, "./b").unwrap();

    let stubs = Stubs::new()
        .with("./b", mock_b("hello mock"))
        .with("./wat-this-path-does-not-exist", Value::Unit);
    let err = depswap::stub::run(host.as_ref(), "./a", &mut me, &stubs).unwrap_err();

    match err {
        LoadError::Resolution(e) => assert_eq!(e.request, "./wat-this-path-does-not-exist"),
        other => panic!("expected a resolution error, got {other}"),
    }
    assert!(Arc::ptr_eq(&cached(&host, "./a").unwrap(), &true_a));
    assert!(Arc::ptr_eq(&cached(&host, "./b").unwrap(), &true_b));
    assert!(me.children().is_empty());
}

#[test]
fn test_no_child_edge_leak() {
    let host = host();
    let mut me = caller();
    host.require("./e", &mut me).unwrap();
    let edges = me.children().to_vec();

    let stubs = Stubs::new().with("./b", mock_b("hello mock"));
    depswap::stub::run(host.as_ref(), "./a", &mut me, &stubs).unwrap();
    depswap::stub::run(host.as_ref(), "./d", &mut me, &Stubs::new()).unwrap();
    let _ = depswap::stub::run(host.as_ref(), "./missing", &mut me, &stubs);

    assert_eq!(me.children(), edges.as_slice());
}

// ============================================================
// Aliases
// ============================================================

#[test]
fn test_alias_target_and_stub() {
    let host = host_with(&HostConfig::default().with_alias("@fixtures", fixtures_dir()));
    host.define(fixtures_dir().join("lib/greeting.mod"), |scope| {
        let b = scope.require("@fixtures/b")?;
        Ok(Value::object([(
            "default",
            Value::function(move |_| b.call_member("greet", &[])),
        )]))
    })
    .unwrap();

    let mut me = ParentContext::new(fixtures_dir().join("nested/alias_test.rs"));
    let stubs = Stubs::new().with("@fixtures/b", mock_b("aliased mock"));
    let greeting = depswap::stub::run(host.as_ref(), "@fixtures/lib/greeting", &mut me, &stubs)
        .unwrap();

    assert_eq!(
        greeting.call_member("default", &[]),
        Ok(Value::from("aliased mock"))
    );
}

#[test]
fn test_caller_without_directory() {
    // Integration tests run with the package root as working directory.
    let host = host_with(&HostConfig::default().with_alias("@fx", fixtures_dir()));
    let mut me = ParentContext::new("substitution_test.rs");
    let stubs = Stubs::new().with("./b", mock_b("hello mock"));

    let literal = depswap::stub::run(host.as_ref(), "./tests/fixtures/a", &mut me, &stubs).unwrap();
    let aliased = depswap::stub::run(host.as_ref(), "@fx/a", &mut me, &stubs).unwrap();

    assert_eq!(literal.call_member("default", &[]), Ok(Value::from("hello mock")));
    assert_eq!(aliased.call_member("default", &[]), Ok(Value::from("hello mock")));
    assert!(me.children().is_empty());
}

#[test]
fn test_config_file_aliases() {
    let config = HostConfig::discover(&fixtures_dir())
        .unwrap()
        .expect("fixtures carry a depswap.toml");
    let host = host_with(&config);
    host.define(fixtures_dir().join("lib/greeting.mod"), |scope| scope.require("../b"))
        .unwrap();

    let mut me = caller();
    let stubs = Stubs::new().with("../b", Value::from("stubbed"));
    let greeting = depswap::stub::run(host.as_ref(), "@lib/greeting", &mut me, &stubs).unwrap();
    assert_eq!(greeting, Value::from("stubbed"));
}

// ============================================================
// Harness
// ============================================================

#[test]
fn test_harness_deregisters_itself() {
    let host = host();
    let mut me = caller();
    host.require("./b", &mut me).unwrap();

    let harness = Harness::attach(Arc::clone(&host), &mut me).unwrap();

    let harness_id = ModuleId::builtin(depswap::stub::HARNESS_MODULE);
    assert!(!host.registry().contains(&harness_id));
    assert_eq!(me.children(), &[id(&host, "./b")]);

    let stubs = Stubs::new().with("./b", mock_b("hello mock"));
    let a = harness.run("./a", &mut me, &stubs).unwrap();
    assert_eq!(a.call_member("default", &[]), Ok(Value::from("hello mock")));
    assert_eq!(me.children().len(), 1);
}

#[test]
fn test_global_host() {
    let host = ModuleHost::global();
    host.define(fixtures_dir().join("nested/index.mod"), |_| {
        Ok(Value::from("global nested"))
    })
    .unwrap();

    depswap::alias("@global-fixtures", fixtures_dir());
    assert!(depswap::get_aliases().contains_key("@global-fixtures"));

    let mut me = caller();
    let _harness = Harness::global(&mut me).unwrap();
    let nested = depswap::run("@global-fixtures/nested", &mut me, &Stubs::new()).unwrap();
    assert_eq!(nested, Value::from("global nested"));

    depswap::unalias("@global-fixtures");
    assert!(!depswap::get_aliases().contains_key("@global-fixtures"));
    assert!(me.children().is_empty());
}
