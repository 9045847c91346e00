//! Resolution tests: identity, caching, policies and pass-through.


use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use lazi_core::prelude::*;
use test_utils::{TestHost, installed, installed_with, source_origin};

// ─────────────────────────────────────────────────────────────────────────────
// Identity & caching
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn repeated_resolution_returns_the_same_record() {
    let host = TestHost::new();
    host.define("a");
    let resolver = installed(&host);

    let first = resolver.resolve("a").unwrap();
    let second = resolver.resolve("a").unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(host.locate_count("a"), 1);
    assert_eq!(resolver.records().len(), 1);
    assert!(first.proxy().ptr_eq(&second.proxy()));
}

#[test]
fn resolving_many_names_initializes_nothing() {
    let host = TestHost::new();
    for i in 0..1000 {
        host.define(&format!("m{i}"));
    }
    let resolver = installed(&host);

    for i in 0..1000 {
        resolver.resolve(&format!("m{i}")).unwrap();
    }

    assert_eq!(host.total_inits(), 0);
    let stat = resolver.stat();
    assert_eq!(stat.total, 1000);
    assert_eq!(stat.lazy, 1000);
    assert_eq!(stat.used, 0);
}

#[test]
fn overrides_update_a_cached_specification() {
    let host = TestHost::new();
    host.define("a");
    let resolver = installed(&host);
    let record = resolver.resolve("a").unwrap();
    assert_eq!(record.spec().search_path(), None);

    let target = Object::new();
    let again = resolver
        .resolve_with("a", Some(vec![PathBuf::from("/override")]), Some(target.clone()))
        .unwrap();

    assert!(again.ptr_eq(&record));
    assert_eq!(record.spec().search_path(), Some(vec![PathBuf::from("/override")]));
    assert!(record.spec().target().unwrap().ptr_eq(&target));
    assert_eq!(host.locate_count("a"), 1);
}

#[test]
fn target_override_is_adopted_as_the_backing_object() {
    let host = TestHost::new();
    host.define("a");
    let resolver = installed(&host);
    let target = Object::new();
    target.set("preset", true);

    let record = resolver.resolve_with("a", None, Some(target.clone())).unwrap();
    let object = record.proxy().object().unwrap();

    assert!(object.ptr_eq(&target));
    assert_eq!(object.get("preset"), Some(Value::Bool(true)));
    assert_eq!(object.get("value"), Some(Value::from("a")));
}

// ─────────────────────────────────────────────────────────────────────────────
// Hierarchy
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn parent_search_locations_become_the_child_search_path() {
    let host = TestHost::new();
    host.define_origin(
        "pkg",
        source_origin("pkg").with_search_locations(vec![PathBuf::from("/src/pkg")]),
    );
    host.define("pkg.module");
    let resolver = installed(&host);

    let record = resolver.resolve("pkg.module").unwrap();

    assert_eq!(host.searched("pkg"), None);
    assert_eq!(host.searched("pkg.module"), Some(vec![PathBuf::from("/src/pkg")]));
    assert_eq!(record.spec().parent(), Some("pkg"));
    assert_eq!(record.spec().display_name(), "pkg|module");
    assert!(resolver.record("pkg").is_some());
    assert_eq!(host.total_inits(), 0);
}

#[test]
fn explicit_search_path_skips_parent_resolution() {
    let host = TestHost::new();
    host.define("pkg").define("pkg.module");
    let resolver = installed(&host);

    resolver
        .resolve_with("pkg.module", Some(vec![PathBuf::from("/elsewhere")]), None)
        .unwrap();

    assert_eq!(host.locate_count("pkg"), 0);
    assert_eq!(host.searched("pkg.module"), Some(vec![PathBuf::from("/elsewhere")]));
}

// ─────────────────────────────────────────────────────────────────────────────
// Not found
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn missing_names_resolve_and_fail_on_access() {
    let host = TestHost::new();
    let resolver = installed(&host);

    let record = resolver.resolve("missing").unwrap();
    assert!(record.spec().origin().is_none());
    assert!(resolver.record("missing").is_none());
    assert_eq!(resolver.passthrough_count(), 1);

    let err = record.proxy().get("thing").unwrap_err();
    assert!(matches!(
        err,
        LaziError::NotFound { ref name, attr: Some(ref attr) } if name == "missing" && attr == "thing"
    ));

    let again = resolver.resolve("missing").unwrap();
    assert!(again.ptr_eq(&record));
    assert_eq!(host.locate_count("missing"), 1);
}

#[test]
fn kept_empty_records_are_registered_and_hooked() {
    let host = TestHost::new();
    let resolver = installed_with(&host, Config::default().with_keep_empty_records(true));

    let record = resolver.resolve("ghost").unwrap();

    assert!(resolver.record("ghost").is_some());
    assert!(record.is_hooked());
    assert_eq!(record.state(), State::Created);
    assert!(matches!(
        record.proxy().get("x"),
        Err(LaziError::NotFound { .. })
    ));
    assert_eq!(record.state(), State::Created);
}

#[test]
fn eager_missing_names_still_resolve() {
    let host = TestHost::new();
    let resolver = installed_with(
        &host,
        Config::default()
            .with_keep_empty_records(true)
            .with_default_level(Level::ForceLoad),
    );

    let record = resolver.resolve("ghost").unwrap();
    assert_eq!(record.state(), State::Created);
    assert!(record.materializer().is_forced());
}

// ─────────────────────────────────────────────────────────────────────────────
// Levels & hooking policy
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn level_for_uses_first_matching_rule_and_default() {
    let host = TestHost::new();
    let resolver = installed_with(
        &host,
        Config::default()
            .with_level(r"^app\.models\.", Level::UnwrapProxy)
            .with_level(r"^app\.", Level::Swap)
            .with_level(r"^legacy$", Level::None),
    );

    assert_eq!(resolver.level_for("app.models.user"), Level::UnwrapProxy);
    assert_eq!(resolver.level_for("app.views"), Level::Swap);
    assert_eq!(resolver.level_for("legacy"), Level::Lazy);
    assert_eq!(resolver.level_for("other"), Level::Lazy);
}

#[test]
fn force_all_eager_raises_every_level() {
    let host = TestHost::new();
    host.define("a");
    let resolver = installed_with(&host, Config::default().with_force_all_eager(true));

    assert_eq!(resolver.level_for("a"), Level::ForceLoad);
    let record = resolver.resolve("a").unwrap();
    assert_eq!(record.state(), State::Loaded);
    assert_eq!(host.init_count("a"), 1);
}

#[test]
fn unhooked_resources_load_directly_and_stay_unregistered() {
    let host = TestHost::new();
    host.define("plain");
    let resolver = installed_with(&host, Config::default().with_level("^plain$", Level::Unhook));

    let record = resolver.resolve("plain").unwrap();

    assert!(!record.is_hooked());
    assert_eq!(record.state(), State::Loaded);
    assert!(record.is_used());
    assert!(record.proxy().is_direct());
    assert_eq!(host.init_count("plain"), 1);
    assert!(resolver.record("plain").is_none());
    assert_eq!(resolver.passthrough_count(), 1);

    let again = resolver.resolve("plain").unwrap();
    assert!(again.ptr_eq(&record));
    assert_eq!(host.init_count("plain"), 1);
}

#[test]
fn kept_zero_hook_records_are_registered() {
    let host = TestHost::new();
    host.define("plain");
    let resolver = installed_with(
        &host,
        Config::default()
            .with_level("^plain$", Level::Unhook)
            .with_keep_zero_hook_records(true),
    );

    resolver.resolve("plain").unwrap();

    let record = resolver.record("plain").expect("registered");
    assert!(!record.is_hooked());
    assert_eq!(resolver.stat().hooked, 0);
    assert_eq!(resolver.stat().loaded, 1);
}

#[test]
fn system_and_builtin_resources_are_excluded_at_level_none() {
    let host = TestHost::new();
    host.define_origin("os", Origin::source("/usr/lib/lazi/os.rs"))
        .define_origin("sys", Origin::builtin())
        .define("app");
    let resolver = installed_with(
        &host,
        Config::default()
            .with_default_level(Level::None)
            .with_system_root("/usr/lib/lazi"),
    );

    let os = resolver.resolve("os").unwrap();
    let sys = resolver.resolve("sys").unwrap();
    let app = resolver.resolve("app").unwrap();

    assert!(os.spec().is_system());
    assert!(!os.is_hooked());
    assert_eq!(os.state(), State::Loaded);
    assert!(sys.spec().is_builtin());
    assert!(!sys.is_hooked());
    assert_eq!(sys.state(), State::Loaded);
    assert!(app.is_hooked());
    assert_eq!(app.state(), State::Lazy);
}

#[test]
fn disabled_hook_loads_everything_eagerly() {
    let host = TestHost::new();
    host.define("a");
    let resolver = installed_with(&host, Config::default().with_hook_enabled(false));

    let record = resolver.resolve("a").unwrap();
    assert_eq!(record.state(), State::Loaded);
    assert!(resolver.records().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Re-entrancy & pass-through
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn re_entrant_resolution_of_a_locating_name_returns_a_partial_record() {
    let host = TestHost::new();
    host.define("a");
    let resolver = installed(&host);

    let seen: Rc<RefCell<Option<Record>>> = Rc::new(RefCell::new(None));
    {
        let resolver = resolver.clone();
        let seen = Rc::clone(&seen);
        host.on_locate(move |name| {
            if name == "a" {
                let partial = resolver.resolve("a").expect("partial records never fail");
                *seen.borrow_mut() = Some(partial);
            }
        });
    }

    let record = resolver.resolve("a").unwrap();
    let partial = seen.borrow_mut().take().expect("locator re-entered");

    assert!(partial.is_partial());
    assert!(!partial.ptr_eq(&record));
    assert_eq!(partial.state(), State::Init);
    assert!(partial.spec().origin().is_none());
    assert!(matches!(
        partial.proxy().get("value"),
        Err(LaziError::Unresolved { .. })
    ));
    assert!(!record.is_partial());
    assert_eq!(host.locate_count("a"), 1);
    assert_eq!(resolver.stack_depth(), 0);
}

#[test]
fn uninstalled_resolver_passes_through_eagerly() {
    let host = TestHost::new();
    host.define("a");
    let resolver = Resolver::new(Rc::clone(&host), Rc::clone(&host));

    let first = resolver.resolve("a").unwrap();
    assert_eq!(first.state(), State::Loaded);
    assert!(!first.is_hooked());
    assert!(first.proxy().is_direct());
    assert!(resolver.records().is_empty());

    let second = resolver.resolve("a").unwrap();
    assert!(second.ptr_eq(&first));
    assert_eq!(host.locate_count("a"), 1);
    assert_eq!(host.init_count("a"), 1);
    assert_eq!(resolver.passthrough_count(), 1);
}

#[test]
fn uninstalled_resolution_is_cached_until_invalidation() {
    let host = TestHost::new();
    host.define("a");
    let resolver = Resolver::new(Rc::clone(&host), Rc::clone(&host));

    let first = resolver.resolve("a").unwrap();
    resolver.invalidate_caches();
    assert_eq!(resolver.passthrough_count(), 0);

    let second = resolver.resolve("a").unwrap();
    assert!(!second.ptr_eq(&first));
    assert_eq!(second.state(), State::Loaded);
    assert_eq!(host.init_count("a"), 2);
}

#[test]
fn uninstalled_cycles_see_the_executing_record() {
    let host = TestHost::new();
    host.define_with("a", |ctx| {
        let again = ctx.resolver().resolve("a")?;
        ctx.object().set("seen", again.state().as_str());
        Ok(())
    });
    let resolver = Resolver::new(Rc::clone(&host), Rc::clone(&host));

    let a = resolver.resolve("a").unwrap();
    assert_eq!(a.state(), State::Loaded);
    assert_eq!(a.proxy().get("seen").unwrap(), Value::from("EXECUTING"));
    assert_eq!(host.init_count("a"), 1);
}
