//! Installation, invalidation and observer lifecycle tests.


use std::cell::RefCell;
use std::rc::Rc;

use lazi_core::prelude::*;
use test_utils::{TestHost, event_log, installed, installed_with, transitions};

fn kinds(log: &RefCell<Vec<ResolverEvent>>) -> Vec<&'static str> {
    log.borrow().iter().map(ResolverEvent::kind).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Installation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn install_events_fire_on_the_outermost_transition_only() {
    let host = TestHost::new();
    let resolver = Resolver::new(Rc::clone(&host), Rc::clone(&host));
    let log = event_log(&resolver);

    assert_eq!(resolver.install(), 1);
    assert_eq!(resolver.install(), 2);
    assert!(!resolver.uninstall());
    assert!(resolver.uninstall());

    assert_eq!(kinds(&log), vec!["install", "invalidated", "uninstall"]);
    assert_eq!(
        log.borrow()[1],
        ResolverEvent::Invalidated {
            generation: 1,
            records: 0
        }
    );
}

#[test]
fn uninstall_without_install_is_a_no_op() {
    let host = TestHost::new();
    let resolver = Resolver::new(Rc::clone(&host), Rc::clone(&host));
    let log = event_log(&resolver);

    assert!(!resolver.uninstall());
    assert_eq!(resolver.install_count(), 0);
    assert_eq!(resolver.generation(), 0);
    assert!(log.borrow().is_empty());
}

#[test]
fn final_uninstall_clears_the_registry() {
    let host = TestHost::new();
    host.define("a").define("b");
    let resolver = Resolver::new(Rc::clone(&host), Rc::clone(&host));

    let proxy = {
        let _installed = resolver.scoped();
        resolver.resolve("b").unwrap();
        let proxy = resolver.import("a").unwrap();
        assert_eq!(resolver.records().len(), 2);
        proxy
    };

    assert!(!resolver.is_installed());
    assert!(resolver.records().is_empty());
    assert_eq!(resolver.passthrough_count(), 0);
    assert_eq!(resolver.generation(), 1);
    assert!(matches!(
        proxy.get("value"),
        Err(LaziError::Invalidated { .. })
    ));
}

#[test]
fn staged_configuration_applies_at_the_next_install() {
    let host = TestHost::new();
    host.define("before").define("after");
    let resolver = installed(&host);

    resolver
        .configure(Config::default().with_default_level(Level::ForceLoad))
        .unwrap();
    assert_eq!(resolver.import("before").unwrap().state(), State::Lazy);

    resolver.install();
    assert_eq!(resolver.config().default_level, Level::ForceLoad);
    assert_eq!(resolver.import("after").unwrap().state(), State::Loaded);
    assert_eq!(resolver.record("before").unwrap().state(), State::Lazy);
}

// ─────────────────────────────────────────────────────────────────────────────
// Invalidation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn invalidation_starts_a_new_generation() {
    let host = TestHost::new();
    host.define("a");
    let resolver = installed(&host);

    let old = resolver.resolve("a").unwrap();
    old.proxy().get("value").unwrap();
    assert_eq!(old.generation(), 0);

    resolver.invalidate_caches();
    assert_eq!(resolver.generation(), 1);
    assert!(resolver.records().is_empty());
    assert!(old.materializer().is_invalidated());
    assert!(old.object().is_none());

    let new = resolver.resolve("a").unwrap();
    assert!(!new.ptr_eq(&old));
    assert_eq!(new.generation(), 1);
    assert_eq!(new.state(), State::Lazy);
    assert_eq!(host.locate_count("a"), 2);

    new.proxy().get("value").unwrap();
    assert_eq!(host.init_count("a"), 2);
}

#[test]
fn invalidation_releases_dependency_edges() {
    let host = TestHost::new();
    host.define_with("app", |ctx| {
        ctx.import("db")?;
        Ok(())
    });
    host.define("db");
    let resolver = installed(&host);

    resolver.import("app").unwrap().object().unwrap();
    let app = resolver.record("app").unwrap();
    assert_eq!(app.dependencies().len(), 1);

    resolver.invalidate_caches();
    assert!(app.dependencies().is_empty());
}

#[test]
fn soft_invalidation_keeps_old_records_usable() {
    let host = TestHost::new();
    host.define("a");
    let resolver = installed_with(&host, Config::default().with_soft_invalidation(true));

    let old = resolver.import("a").unwrap();
    resolver.invalidate_caches();

    assert!(resolver.records().is_empty());
    assert_eq!(old.state(), State::Lazy);
    assert_eq!(old.get("value").unwrap(), Value::from("a"));

    let new = resolver.import("a").unwrap();
    assert!(!new.ptr_eq(&old));
    assert_eq!(new.state(), State::Lazy);
}

#[test]
fn invalidated_record_is_replaced_on_the_next_resolve() {
    let host = TestHost::new();
    host.define("a").define("b");
    let resolver = installed(&host);

    let first = resolver.resolve("a").unwrap();
    resolver.resolve("b").unwrap();
    first.invalidate();

    assert!(resolver.record("a").is_none());
    assert_eq!(resolver.records().len(), 1);

    let second = resolver.resolve("a").unwrap();
    assert!(!second.ptr_eq(&first));
    assert_eq!(second.state(), State::Lazy);
    assert_eq!(first.state(), State::Dead);
    assert_eq!(second.proxy().get("value").unwrap(), Value::from("a"));
    assert_eq!(host.locate_count("a"), 2);
}

#[test]
fn stale_records_do_not_evict_their_replacement() {
    let host = TestHost::new();
    host.define("a");
    let resolver = installed_with(&host, Config::default().with_soft_invalidation(true));

    let old = resolver.resolve("a").unwrap();
    resolver.invalidate_caches();
    let new = resolver.resolve("a").unwrap();

    old.invalidate();
    assert!(resolver.record("a").unwrap().ptr_eq(&new));
    assert_eq!(new.state(), State::Lazy);
}

// ─────────────────────────────────────────────────────────────────────────────
// Observers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn events_follow_the_resolution_and_materialization_order() {
    let host = TestHost::new();
    host.define("a");
    let resolver = installed(&host);
    let log = event_log(&resolver);

    let proxy = resolver.import("a").unwrap();
    proxy.get("value").unwrap();

    assert_eq!(
        kinds(&log),
        vec![
            "resolved",
            "state_changed",
            "state_changed",
            "state_changed",
            "pre_materialize",
            "state_changed",
            "materialized",
        ]
    );
    assert_eq!(
        log.borrow()[0],
        ResolverEvent::Resolved {
            name: "a".into(),
            level: Level::Lazy,
            hooked: true,
            found: true,
        }
    );
    assert_eq!(
        log.borrow()[4],
        ResolverEvent::PreMaterialize {
            name: "a".into(),
            from: State::Lazy,
        }
    );
}

#[test]
fn state_changes_carry_the_display_name() {
    let host = TestHost::new();
    host.define("pkg").define("pkg.mod");
    let resolver = installed(&host);
    let log = event_log(&resolver);

    resolver.resolve("pkg.mod").unwrap();

    let display: Vec<String> = log
        .borrow()
        .iter()
        .filter_map(|event| match event {
            ResolverEvent::StateChanged {
                name, display_name, ..
            } if name == "pkg.mod" => Some(display_name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(display, vec!["pkg|mod", "pkg|mod"]);
}

#[test]
fn transitions_only_move_forward() {
    let host = TestHost::new();
    host.define("ok");
    host.define_with("bad", |_| Err("bad".into()));
    let resolver = installed(&host);
    let log = event_log(&resolver);

    let ok = resolver.import("ok").unwrap();
    let bad = resolver.import("bad").unwrap();
    ok.get("value").unwrap();
    let _ = bad.get("value");
    let _ = bad.get("value");
    resolver.invalidate_caches();
    let _ = ok.get("value");

    for name in ["ok", "bad"] {
        let steps = transitions(&log, name);
        assert!(!steps.is_empty());
        for (from, to) in &steps {
            assert!(from < to, "{name}: {from} -> {to}");
        }
        for pair in steps.windows(2) {
            assert_eq!(pair[0].1, pair[1].0, "{name}: transitions must chain");
        }
        assert_eq!(steps.last().map(|step| step.1), Some(State::Dead));
    }
    assert_eq!(transitions(&log, "bad").len(), 4);
}

#[test]
fn panicking_observers_do_not_break_resolution() {
    let host = TestHost::new();
    host.define("a");
    let resolver = installed(&host);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    resolver
        .hooks()
        .register_observer::<OnResolved, _>("broken", |_event: &ResolverEvent| {
            panic!("observer bug");
        })
        .unwrap()
        .register_observer::<OnResolved, _>("recorder", move |event: &ResolverEvent| {
            sink.borrow_mut().push(event.name().map(str::to_owned));
        })
        .unwrap();

    let proxy = resolver.import("a").unwrap();

    assert_eq!(proxy.get("value").unwrap(), Value::from("a"));
    assert_eq!(*seen.borrow(), vec![Some("a".to_owned())]);
    assert_eq!(resolver.stack_depth(), 0);
}

#[test]
fn duplicate_observer_names_are_rejected() {
    let host = TestHost::new();
    let resolver = installed(&host);

    resolver
        .hooks()
        .register_observer::<OnMaterialized, _>("once", |_: &ResolverEvent| {})
        .unwrap();
    let err = resolver
        .hooks()
        .register_observer::<OnMaterialized, _>("once", |_: &ResolverEvent| {})
        .unwrap_err();

    assert!(matches!(err, HookRegistrationError::DuplicateName { ref name, .. } if name == "once"));
    assert_eq!(
        resolver.hooks().hook_count(ScheduleId::of::<OnMaterialized>()),
        1
    );
}

#[test]
fn observers_may_resolve_from_inside_a_hook() {
    let host = TestHost::new();
    host.define("a").define("side");
    let resolver = installed(&host);

    let inner = resolver.clone();
    resolver
        .hooks()
        .register_observer::<OnMaterialized, _>("side_effect", move |event: &ResolverEvent| {
            if event.name() == Some("a") {
                inner.resolve("side").expect("side resolves");
            }
        })
        .unwrap();

    resolver.import("a").unwrap().object().unwrap();

    let side = resolver.record("side").expect("registered by the observer");
    assert_eq!(side.state(), State::Lazy);
    assert!(side.parent().is_none());
    assert!(resolver.record("a").unwrap().dependencies().is_empty());
}
