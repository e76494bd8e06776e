mod common;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;

use common::{entries, new_log, push, recorder, run, setup_test_tracing, test_names, Log};
use expander::prelude::*;

fn logging_body(log: &Log, outcome: Result<(), &'static str>) -> TestMethod<()> {
    let log = Arc::clone(log);
    TestMethod::new("test_body", move |_: &mut (), call: &Call| {
        push(&log, format!("body {}", call.label()));
        outcome.map_err(TestFailure::new)
    })
}

fn expand_one(method: TestMethod<()>) -> Expansion<()> {
    expand(TestClass::with_default("TestRuntime").method(method)).unwrap()
}

#[test]
fn resources_wrap_the_body_on_success() {
    setup_test_tracing();
    let log = new_log();
    let seq = ParamSeq::from(vec![param!(1)
        .with_resource(recorder(&log, "a").spec())
        .with_resource(recorder(&log, "b").spec())])
    .with_resource(recorder(&log, "shared").spec());
    let expansion = expand_one(logging_body(&log, Ok(())).foreach(seq));

    run(&expansion, "test_body__<1>").unwrap();
    assert_eq!(
        entries(&log),
        vec![
            "enter a",
            "enter b",
            "enter shared",
            "body 1",
            "exit shared (ok)",
            "exit b (ok)",
            "exit a (ok)",
        ]
    );
}

#[test]
fn resources_see_the_failure_and_exit_in_reverse() {
    let log = new_log();
    let seq = ParamSeq::from(vec![param!(1)
        .with_resource(recorder(&log, "a").spec())
        .with_resource(recorder(&log, "b").spec())]);
    let expansion = expand_one(logging_body(&log, Err("broken")).foreach(seq));

    let err = run(&expansion, "test_body__<1>").unwrap_err();
    assert_eq!(err.message(), "broken");
    assert_eq!(
        entries(&log),
        vec![
            "enter a",
            "enter b",
            "body 1",
            "exit b (broken)",
            "exit a (broken)",
        ]
    );
}

#[test]
fn each_generated_test_gets_its_own_resources() {
    let log = new_log();
    let seq = ParamSeq::from(vec![1, 2]).with_resource(recorder(&log, "r").spec());
    let expansion = expand_one(logging_body(&log, Ok(())).foreach(seq));
    for name in test_names(&expansion) {
        run(&expansion, &name).unwrap();
    }
    assert_eq!(
        entries(&log),
        vec![
            "enter r", "body 1", "exit r (ok)", "enter r", "body 2", "exit r (ok)",
        ]
    );
}

#[test]
fn suppression_is_ignored_without_opt_in() {
    let log = new_log();
    let seq = ParamSeq::from(vec![
        param!(1).with_resource(recorder(&log, "r").asking_suppress().spec())
    ]);
    let expansion = expand_one(logging_body(&log, Err("broken")).foreach(seq));
    let err = run(&expansion, "test_body__<1>").unwrap_err();
    assert_eq!(err.message(), "broken");
}

#[test]
fn suppression_applies_with_opt_in() {
    let log = new_log();
    let spec = recorder(&log, "r")
        .asking_suppress()
        .spec()
        .suppress_exceptions(true);
    let seq = ParamSeq::from(vec![param!(1).with_resource(spec)]);
    let expansion = expand_one(logging_body(&log, Err("broken")).foreach(seq));
    run(&expansion, "test_body__<1>").unwrap();
    assert_eq!(entries(&log).last().unwrap(), "exit r (broken)");
}

#[test]
fn failing_exit_replaces_the_failure() {
    let log = new_log();
    let seq = ParamSeq::from(vec![
        param!(1).with_resource(recorder(&log, "r").failing_exit().spec())
    ]);
    let expansion = expand_one(logging_body(&log, Err("broken")).foreach(seq));
    let err = run(&expansion, "test_body__<1>").unwrap_err();
    assert_eq!(err.message(), "r failed to exit");
}

#[test]
fn failing_enter_skips_the_body() {
    let log = new_log();
    let seq = ParamSeq::from(vec![param!(1)
        .with_resource(recorder(&log, "a").spec())
        .with_resource(recorder(&log, "b").failing_enter().spec())]);
    let expansion = expand_one(logging_body(&log, Ok(())).foreach(seq));
    let err = run(&expansion, "test_body__<1>").unwrap_err();
    assert_eq!(err.message(), "b failed to enter");
    assert_eq!(
        entries(&log),
        vec!["enter a", "enter b", "exit a (b failed to enter)"]
    );
}

#[test]
fn panics_propagate_after_resources_exit() {
    let log = new_log();
    let body_log = Arc::clone(&log);
    let method = TestMethod::new("test_panic", move |_: &mut (), _: &Call| {
        push(&body_log, "body");
        panic!("assertion went wrong");
    })
    .foreach(ParamSeq::from(vec![1]).with_resource(recorder(&log, "r").spec()));
    let expansion = expand_one(method);

    let result = panic::catch_unwind(AssertUnwindSafe(|| run(&expansion, "test_panic__<1>")));
    let payload = result.unwrap_err();
    assert_eq!(
        expander::diagnostics::panic_message(payload.as_ref()),
        "assertion went wrong"
    );
    assert_eq!(
        entries(&log),
        vec!["enter r", "body", "exit r (assertion went wrong)"]
    );
    assert!(current().is_none());
}

#[test]
fn current_test_is_published_during_the_call_only() {
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let log = new_log();
    let method = TestMethod::new("test_current", move |_: &mut (), call: &Call| {
        let now = current().ok_or_else(|| TestFailure::new("nothing published"))?;
        assert_eq!(now.context_targets(), call.context_targets());
        *sink.lock().unwrap() = Some(now);
        Ok(())
    })
    .foreach(vec![param!(7; flag = true).with_label("seven")])
    .foreach(ParamSeq::from(vec![param!()]).with_resource(recorder(&log, "r").spec()));
    let expansion = expand_one(method);
    let names = test_names(&expansion);
    assert_eq!(names, vec!["test_current__<seven, >"]);

    assert!(current().is_none());
    run(&expansion, &names[0]).unwrap();
    assert!(current().is_none());

    let now = seen.lock().unwrap().take().unwrap();
    assert_eq!(now.base_name(), "test_current");
    assert_eq!(now.name(), "test_current__<seven, >");
    assert_eq!(now.index(), 0);
    assert_eq!(now.count(), 1);
    assert_eq!(now.label(), "seven, ");
    assert_eq!(now.args(), &[Value::Int(7)]);
    assert_eq!(now.kwargs().get("flag"), Some(&Value::Bool(true)));
    assert_eq!(now.context_targets(), &[Value::from("target r")]);
    let original = now.original::<TestMethod<()>>().unwrap();
    assert_eq!(original.name(), "test_current");
}

#[test]
fn concurrent_calls_see_their_own_state() {
    let method = TestMethod::new("test_threads", |_: &mut (), call: &Call| {
        for _ in 0..50 {
            let now = current().ok_or_else(|| TestFailure::new("nothing published"))?;
            if now.args() != call.args() {
                return Err(TestFailure::new("saw another thread's test"));
            }
            thread::yield_now();
        }
        Ok(())
    })
    .foreach((0..8).collect::<Vec<i32>>());
    let expansion = Arc::new(expand_one(method));

    let handles: Vec<_> = test_names(&expansion)
        .into_iter()
        .map(|name| {
            let expansion = Arc::clone(&expansion);
            thread::spawn(move || run(&expansion, &name).map_err(|e| e.to_string()))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(()));
    }
}

#[test]
fn generic_keywords_reach_bodies_that_declare_them() {
    let log = new_log();
    let method = TestMethod::new("test_generic", |_: &mut (), call: &Call| {
        assert_eq!(call.kwarg("label")?, &Value::from("one"));
        assert_eq!(
            call.kwarg("context_targets")?,
            &Value::from(vec!["target r"])
        );
        assert_eq!(call.param("x")?, &Value::Int(1));
        Ok(())
    })
    .with_signature(Signature::of(["x"]).optional("label").optional("context_targets"))
    .foreach(ParamSeq::mapping(vec![("one", 1)]).with_resource(recorder(&log, "r").spec()));
    let expansion = expand_one(method);
    run(&expansion, "test_generic__<one>").unwrap();
}

#[test]
fn generic_keywords_can_be_switched_off() {
    let method = TestMethod::new("test_generic", |_: &mut (), call: &Call| {
        assert!(call.kwarg("label").is_err());
        assert_eq!(call.label(), "1");
        Ok(())
    })
    .with_signature(Signature::of(["x"]).var_kwargs())
    .foreach(vec![1]);
    let expansion = Expander::default()
        .legacy_signature_introspection(false)
        .expand(TestClass::with_default("TestRuntime").method(method))
        .unwrap();
    run(&expansion, "test_generic__<1>").unwrap();
}

#[test]
fn record_values_win_over_generic_keywords() {
    let method = TestMethod::new("test_generic", |_: &mut (), call: &Call| {
        assert_eq!(call.kwarg("label")?, &Value::from("mine"));
        Ok(())
    })
    .with_signature(Signature::new().var_kwargs())
    .foreach(vec![param!(; label = "mine").with_label("given")]);
    let expansion = expand_one(method);
    run(&expansion, "test_generic__<given>").unwrap();
}

#[test]
fn fixtures_are_fresh_per_run() {
    let class = TestClass::new("TestFixture", || vec![String::from("fresh")]).method(
        TestMethod::new("test_push", |fixture: &mut Vec<String>, call: &Call| {
            fixture.push(call.label().to_string());
            if fixture.len() == 2 {
                Ok(())
            } else {
                Err(TestFailure::new(format!("fixture reused: {:?}", fixture)))
            }
        })
        .foreach(vec![1, 2]),
    );
    let expansion = expand(class).unwrap();
    for name in test_names(&expansion) {
        run(&expansion, &name).unwrap();
    }
}
