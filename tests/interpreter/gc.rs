//! Garbage collection: reachability, cycles and collection triggers

use super::{create_test_runtime, eval, str_value};
use stackjs::Value;

const CYCLE: &str = r#"
    (function () {
        var a = {}, b = { a: a };
        a.b = b;
        a.self = a;
    })();
    1
"#;

#[test]
fn test_unreachable_cycle_is_reclaimed() {
    let mut interp = create_test_runtime();
    // Warm up so every lazily created object exists before measuring
    interp.eval(CYCLE).unwrap();
    interp.collect_garbage();
    let baseline = interp.gc_stats();

    interp.eval(CYCLE).unwrap();
    interp.collect_garbage();
    let after = interp.gc_stats();

    assert_eq!(after.objects, baseline.objects);
    assert_eq!(after.environments, baseline.environments);
    assert_eq!(after.functions, baseline.functions);
}

#[test]
fn test_collection_frees_garbage() {
    let mut interp = create_test_runtime();
    interp.set_gc_threshold(0);
    interp.eval("for (var i = 0; i < 50; i++) { var tmp = { n: i } } 0").unwrap();
    let freed = interp.collect_garbage();
    assert!(freed >= 49, "freed only {}", freed);
    assert_eq!(interp.gc_stats().last_freed, freed);
}

#[test]
fn test_reachable_objects_survive() {
    let mut interp = create_test_runtime();
    interp
        .eval("var keep = { v: 42, nested: { w: 'deep' } }; for (var i = 0; i < 100; i++) { var junk = [i, {}] } 0")
        .unwrap();
    interp.collect_garbage();
    interp.collect_garbage();
    assert_eq!(interp.eval("keep.v").unwrap(), Value::Number(42.0));
    assert_eq!(interp.eval("keep.nested.w").unwrap(), str_value("deep"));
}

#[test]
fn test_closure_scopes_survive() {
    let mut interp = create_test_runtime();
    interp
        .eval("var get = (function () { var secret = { s: 'kept' }; return function () { return secret.s } })(); 0")
        .unwrap();
    interp.collect_garbage();
    assert_eq!(interp.eval("get()").unwrap(), str_value("kept"));
}

#[test]
fn test_values_survive_collection_mid_expression() {
    // Operands on the value stack are roots while a call runs
    let source = r#"
        function churn() { var t = []; for (var i = 0; i < 20; i++) t.push({ i: i }); return 1 }
        var o = { a: "left" };
        o.a + churn() + ["x", "y"].join("") + churn()
    "#;
    assert_eq!(eval(source), str_value("left1xy1"));
}

#[test]
fn test_iterators_survive_collection() {
    let source = r#"
        var o = { a: 1, b: 2, c: 3 };
        var s = "";
        for (var k in o) {
            for (var i = 0; i < 10; i++) { var junk = { i: i } }
            s += k;
        }
        s
    "#;
    assert_eq!(eval(source), str_value("abc"));
}

#[test]
fn test_automatic_collection_runs() {
    let mut interp = create_test_runtime();
    interp.set_gc_threshold(1);
    let before = interp.gc_stats().collections;
    interp.eval("var o; for (var i = 0; i < 10; i++) o = {}; 0").unwrap();
    assert!(interp.gc_stats().collections > before);
}

#[test]
fn test_zero_threshold_disables_automatic_collection() {
    let mut interp = create_test_runtime();
    interp.set_gc_threshold(0);
    assert_eq!(interp.gc_threshold(), 0);
    let before = interp.gc_stats().collections;
    interp.eval("var o; for (var i = 0; i < 100; i++) o = {}; 0").unwrap();
    assert_eq!(interp.gc_stats().collections, before);
}

#[test]
fn test_host_stack_values_are_roots() {
    let mut interp = create_test_runtime();
    interp.push_new_object().unwrap();
    interp.push_string("held").unwrap();
    interp.set_property_at(-2, "label").unwrap();

    interp.eval("for (var i = 0; i < 20; i++) { var junk = {} } 0").unwrap();
    interp.collect_garbage();

    interp.get_property_at(-1, "label").unwrap();
    assert_eq!(interp.to_string_at(-1).unwrap().as_str(), "held");
}

#[test]
fn test_deep_object_graph() {
    let source = r#"
        var head = null;
        for (var i = 0; i < 500; i++) head = { next: head, i: i };
        var n = 0;
        while (head) { n += head.i; head = head.next }
        n
    "#;
    assert_eq!(eval(source), Value::Number(124750.0));
}
