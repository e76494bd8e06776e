mod common;

use std::sync::{Arc, Mutex};

use common::{run, test_names};
use expander::harness::TestRunner;
use expander::prelude::*;

fn sum_method() -> TestMethod<()> {
    TestMethod::new("test_sum", |_: &mut (), call: &Call| {
        let iterable = call.param("iterable")?;
        let expected = call.param("expected")?.as_int();
        let total: i64 = iterable
            .as_list()
            .unwrap_or(&[])
            .iter()
            .filter_map(Value::as_int)
            .sum();
        if Some(total) == expected {
            Ok(())
        } else {
            Err(TestFailure::new(format!("{} != {:?}", total, expected)))
        }
    })
    .with_signature(Signature::of(["iterable", "expected"]))
}

fn noop(name: &str) -> TestMethod<()> {
    TestMethod::new(name, |_: &mut (), _: &Call| Ok(()))
}

#[test]
fn sum_records_expand_into_named_passing_tests() {
    let class = TestClass::with_default("TestSum").method(sum_method().foreach(vec![
        (vec![], 0),
        (vec![3], 3),
        (vec![1, 3, 1], 5),
    ]));

    let expansion = expand(class).unwrap();
    assert_eq!(
        test_names(&expansion),
        vec![
            "test_sum__<[],0>",
            "test_sum__<[3],3>",
            "test_sum__<[1, 3, 1],5>"
        ]
    );
    assert!(matches!(
        expansion.class().get("test_sum"),
        Some(Member::Substitute(_))
    ));

    let reports = TestRunner::default().run_expansion(&expansion);
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.passed()), "{:?}", reports);
}

#[test]
fn failing_record_is_reported_as_failure() {
    let class = TestClass::with_default("TestSum")
        .method(sum_method().foreach(vec![(vec![1, 1], 3)]));
    let expansion = expand(class).unwrap();
    let err = run(&expansion, "test_sum__<[1, 1],3>").unwrap_err();
    assert_eq!(err.message(), "2 != Some(3)");
}

#[test]
fn stacked_attachments_merge_named_values() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let method = TestMethod::new("test_merge", move |_: &mut (), call: &Call| {
        let pairs: Vec<(String, Value)> = call
            .kwargs()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        sink.lock().unwrap().push(pairs);
        Ok(())
    })
    .foreach(vec![param!(; x = 1, y = 2)])
    .foreach(vec![param!(; y = 2, z = 3)]);

    let expansion = expand(TestClass::with_default("TestMerge").method(method)).unwrap();
    let names = test_names(&expansion);
    assert_eq!(names, vec!["test_merge__<x=1,y=2, y=2,z=3>"]);

    run(&expansion, &names[0]).unwrap();
    let seen = seen.lock().unwrap();
    assert_eq!(
        seen[0],
        vec![
            ("x".to_string(), Value::Int(1)),
            ("y".to_string(), Value::Int(2)),
            ("z".to_string(), Value::Int(3)),
        ]
    );
}

#[test]
fn conflicting_named_values_fail_expansion() {
    let method = noop("test_conflict")
        .foreach(vec![param!(; y = 2, x = 1)])
        .foreach(vec![param!(; y = 3)]);
    let err = expand(TestClass::with_default("TestConflict").method(method)).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::ParamConflict);
    assert_eq!(err.to_string(), "conflicting keyword arguments: 'y'");
}

#[test]
fn explicit_label_names_the_test() {
    let method = noop("test_number").foreach(vec![param!(5).with_label("five")]);
    let expansion = expand(TestClass::with_default("TestLabel").method(method)).unwrap();
    assert_eq!(test_names(&expansion), vec!["test_number__<five>"]);
}

#[test]
fn mapping_keys_label_the_tests() {
    let method = noop("test_size").foreach(ParamSeq::mapping(vec![("small", 1), ("big", 1000)]));
    let expansion = expand(TestClass::with_default("TestSize").method(method)).unwrap();
    assert_eq!(
        test_names(&expansion),
        vec!["test_size__<small>", "test_size__<big>"]
    );
}

#[test]
fn product_of_two_collections() {
    let method = noop("test_grid")
        .foreach(vec![1, 2, 3])
        .foreach(vec!["a", "b", "c", "d"]);
    let expansion = expand(TestClass::with_default("TestGrid").method(method)).unwrap();
    let names = test_names(&expansion);
    assert_eq!(names.len(), 12);
    assert_eq!(names[0], "test_grid__<1, 'a'>");
    assert_eq!(names[1], "test_grid__<1, 'b'>");
    assert_eq!(names[4], "test_grid__<2, 'a'>");
}

#[test]
fn modern_order_varies_last_attachment_slowest() {
    let method = noop("test_grid").foreach(vec![1, 2]).foreach(vec!["a", "b"]);
    let expansion = Expander::default()
        .product_order(ProductOrder::Modern)
        .expand(TestClass::with_default("TestGrid").method(method))
        .unwrap();
    assert_eq!(
        test_names(&expansion),
        vec![
            "test_grid__<1, 'a'>",
            "test_grid__<2, 'a'>",
            "test_grid__<1, 'b'>",
            "test_grid__<2, 'b'>"
        ]
    );
}

#[test]
fn product_order_does_not_change_argument_binding() {
    let bind = |order: ProductOrder| {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let method = TestMethod::new("test_bind", move |_: &mut (), call: &Call| {
            let n = call.param("n")?.clone();
            let s = call.param("s")?.clone();
            sink.lock().unwrap().push((n, s));
            Ok(())
        })
        .with_signature(Signature::of(["n", "s"]))
        .foreach(vec![1])
        .foreach(vec!["a"]);
        let expansion = Expander::default()
            .product_order(order)
            .expand(TestClass::with_default("TestBind").method(method))
            .unwrap();
        for name in test_names(&expansion) {
            run(&expansion, &name).unwrap();
        }
        let seen = seen.lock().unwrap().clone();
        seen
    };

    let expected = vec![(Value::Int(1), Value::from("a"))];
    assert_eq!(bind(ProductOrder::Legacy), expected);
    assert_eq!(bind(ProductOrder::Modern), expected);
}

#[test]
fn duplicate_names_get_ordinal_suffixes() {
    let method = noop("test_dup").foreach(vec![
        param!(1).with_label("same"),
        param!(2).with_label("same"),
        param!(3).with_label("same"),
    ]);
    let class = TestClass::with_default("TestDup")
        .method(noop("test_dup__<other>"))
        .method(method.foreach(vec![param!().with_label("other")]));
    let expansion = expand(class).unwrap();
    assert_eq!(
        test_names(&expansion),
        vec![
            "test_dup__<other>",
            "test_dup__<same, other>",
            "test_dup__<same, other>__2",
            "test_dup__<same, other>__3"
        ]
    );
}

#[test]
fn existing_members_are_reserved() {
    let class = TestClass::with_default("TestReserved")
        .method(noop("test_x__<1>"))
        .method(noop("test_x").foreach(vec![1]));
    let expansion = expand(class).unwrap();
    assert_eq!(
        test_names(&expansion),
        vec!["test_x__<1>", "test_x__<1>__2"]
    );
}

#[test]
fn custom_name_pattern_uses_count() {
    let method = noop("test_n").foreach(vec![10, 20]);
    let expansion = Expander::default()
        .name_pattern("{base_name}_{count}_{{{label}}}")
        .expand(TestClass::with_default("TestPattern").method(method))
        .unwrap();
    assert_eq!(test_names(&expansion), vec!["test_n_1_{10}", "test_n_2_{20}"]);
}

struct Upper;

impl NameFormatter for Upper {
    fn format(&self, _pattern: &str, fields: &NameFields<'_>) -> Result<String, ExpandError> {
        Ok(format!("{}_{}", fields.base_name, fields.label.to_uppercase()))
    }
}

#[test]
fn custom_formatter_is_used() {
    let method = noop("test_word").foreach(vec!["ab"]);
    let expansion = Expander::default()
        .name_formatter(Upper)
        .expand(TestClass::with_default("TestFormatter").method(method))
        .unwrap();
    assert_eq!(test_names(&expansion), vec!["test_word_'AB'"]);
}

#[test]
fn broken_pattern_fails_expansion() {
    let method = noop("test_n").foreach(vec![1]);
    let err = Expander::default()
        .name_pattern("{base_name}_{nope}")
        .expand(TestClass::with_default("TestPattern").method(method))
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::NamePattern);
}

#[test]
fn records_must_fit_the_signature() {
    let method = sum_method().foreach(vec![(vec![1], 1, 1)]);
    let err = expand(TestClass::with_default("TestSum").method(method)).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::SignatureMismatch);
    assert!(err.to_string().contains("takes 2 positional arguments but 3 were given"));

    let method = sum_method().foreach(vec![param!(vec![1]; expectd = 1)]);
    let err = expand(TestClass::with_default("TestSum").method(method)).unwrap_err();
    assert!(err.to_string().contains("unexpected keyword argument 'expectd'"));
}

#[test]
fn generators_see_the_owning_class() {
    let method = noop("test_gen").foreach(ParamSeq::generator_with_owner(|owner: &OwnerInfo| {
        let limit = owner.attribute("limit").and_then(Value::as_int).unwrap_or(0);
        (1..=limit).map(|n| param!(n).with_label(format!("n{}", n)))
    }));
    let class = TestClass::with_default("TestGen")
        .attribute("limit", 3)
        .method(method);
    let expansion = expand(class).unwrap();
    assert_eq!(
        test_names(&expansion),
        vec!["test_gen__<n1>", "test_gen__<n2>", "test_gen__<n3>"]
    );
}

#[test]
fn unmarked_members_are_untouched() {
    let class = TestClass::with_default("TestPlain")
        .attribute("setting", "on")
        .method(noop("test_plain"))
        .method(noop("helper").foreach(vec![1]));
    let expansion = expand(class).unwrap();
    let names: Vec<_> = expansion.class().member_names().collect();
    assert_eq!(names, vec!["setting", "test_plain", "helper", "helper__<1>"]);
    assert_eq!(test_names(&expansion), vec!["test_plain"]);
}

#[test]
fn expanding_twice_changes_nothing() {
    let class = TestClass::with_default("TestTwice").method(noop("test_x").foreach(vec![1, 2]));
    let once = expand(class).unwrap();
    let names = test_names(&once);
    let Expansion::Class(class) = once else {
        panic!("no class-level attachments");
    };
    let twice = expand(class).unwrap();
    assert_eq!(test_names(&twice), names);
}

#[test]
fn subclass_of_expanded_class_keeps_generated_tests() {
    let class = TestClass::with_default("TestBase").method(noop("test_x").foreach(vec![1, 2]));
    let base = expand(class).unwrap();
    let sub = base
        .class()
        .inherit("TestSub")
        .method(noop("test_y").foreach(vec![3]));
    let expanded = expand(sub).unwrap();
    assert_eq!(
        test_names(&expanded),
        vec!["test_x__<1>", "test_x__<2>", "test_y__<3>"]
    );
    assert!(matches!(
        expanded.class().get("test_x"),
        Some(Member::Substitute(_))
    ));
}

#[test]
fn substitutes_refuse_to_run() {
    let class = TestClass::with_default("TestSub").method(noop("test_x").foreach(vec![1]));
    let expansion = expand(class).unwrap();
    let err = run(&expansion, "test_x").unwrap_err();
    assert!(err.message().contains("cannot be called"));

    let Some(Member::Substitute(sub)) = expansion.class().get("test_x") else {
        panic!("test_x should be substituted");
    };
    assert_eq!(sub.attachments().len(), 1);
    assert_eq!(sub.call().unwrap_err().error_type(), ErrorType::NotCallable);
}

#[test]
fn names_outside_the_prefix_are_not_discovered() {
    let method = noop("test_x").foreach(vec![1]);
    let expansion = Expander::default()
        .name_pattern("check_{label}")
        .expand(TestClass::with_default("TestHidden").method(method))
        .unwrap();
    assert!(test_names(&expansion).is_empty());
    assert!(expansion.class().get("check_1").is_some());
}
