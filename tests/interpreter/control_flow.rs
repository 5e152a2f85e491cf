//! Statements: branches, loops, labels, switch, with and try

use super::{eval, str_value};
use stackjs::Value;

#[test]
fn test_if_else() {
    assert_eq!(eval("var r; if (1 < 2) r = 'yes'; else r = 'no'; r"), str_value("yes"));
    assert_eq!(eval("var r = 0; if (0) r = 1; r"), Value::Number(0.0));
    assert_eq!(
        eval("var x = 5, r; if (x < 0) r = 'neg'; else if (x === 0) r = 'zero'; else r = 'pos'; r"),
        str_value("pos")
    );
}

#[test]
fn test_loops() {
    assert_eq!(eval("var s = 0; for (var i = 1; i <= 10; i++) s += i; s"), Value::Number(55.0));
    assert_eq!(eval("var n = 0; while (n < 7) n++; n"), Value::Number(7.0));
    assert_eq!(eval("var n = 10; do { n++ } while (n < 5); n"), Value::Number(11.0));
    assert_eq!(eval("var n = 0; for (;;) { if (++n === 3) break } n"), Value::Number(3.0));
    assert_eq!(
        eval("var s = 0; for (var i = 0; i < 10; i++) { if (i % 2) continue; s += i } s"),
        Value::Number(20.0)
    );
    assert_eq!(
        eval("var i = 0, s = 0; do { i++; if (i === 2) continue; s += i } while (i < 4); s"),
        Value::Number(8.0)
    );
}

#[test]
fn test_labeled_break_and_continue() {
    assert_eq!(
        eval(
            r#"
            var hits = 0;
            outer: for (var i = 0; i < 5; i++) {
                for (var j = 0; j < 5; j++) {
                    if (j === 2) continue outer;
                    if (i === 3) break outer;
                    hits++;
                }
            }
            hits
            "#
        ),
        Value::Number(6.0)
    );
    assert_eq!(
        eval("var r = 'before'; block: { r = 'inside'; break block; r = 'after' } r"),
        str_value("inside")
    );
}

#[test]
fn test_switch() {
    let source = r#"
        function classify(x) {
            var out = "";
            switch (x) {
                case 1:
                    out += "one ";
                case 2:
                    out += "two ";
                    break;
                default:
                    out += "other ";
                case 3:
                    out += "three ";
            }
            return out;
        }
        classify(1) + "|" + classify(2) + "|" + classify(3) + "|" + classify(9)
    "#;
    assert_eq!(eval(source), str_value("one two |two |three |other three "));
}

#[test]
fn test_switch_uses_strict_equality() {
    assert_eq!(
        eval(r#"var r = "none"; switch ("1") { case 1: r = "number"; break; case "1": r = "string" } r"#),
        str_value("string")
    );
}

#[test]
fn test_switch_inside_loop_with_continue() {
    let source = r#"
        var s = "";
        for (var i = 0; i < 4; i++) {
            switch (i) {
                case 1: continue;
                case 2: s += "two"; break;
                default: s += i;
            }
            s += ";";
        }
        s
    "#;
    assert_eq!(eval(source), str_value("0;two;3;"));
}

#[test]
fn test_for_in_own_properties() {
    assert_eq!(eval("var s = ''; for (var k in { b: 1, a: 2, c: 3 }) s += k; s"), str_value("abc"));
    assert_eq!(eval("var s = ''; for (var k in [5, 6, 7]) s += k; s"), str_value("012"));
    assert_eq!(eval("var s = ''; for (var k in 'hi') s += k; s"), str_value("01"));
    assert_eq!(eval("var n = 0; for (var k in null) n++; for (var k in undefined) n++; n"), Value::Number(0.0));
}

#[test]
fn test_for_in_walks_prototype_chain() {
    let source = r#"
        function B() {}
        B.prototype.y = 1;
        var o = new B();
        o.x = 2;
        var s = "";
        for (var k in o) s += k;
        s
    "#;
    assert_eq!(eval(source), str_value("xy"));
}

#[test]
fn test_for_in_shadowed_names_appear_once() {
    let source = r#"
        function A() {}
        A.prototype.x = 1;
        var o = new A();
        o.x = 2;
        var s = "";
        for (var k in o) s += k;
        s
    "#;
    assert_eq!(eval(source), str_value("x"));
}

#[test]
fn test_for_in_hidden_own_property_hides_inherited_one() {
    // `length` on an arguments object is not enumerable
    let source = r#"
        Object.prototype.length = 5;
        function f() {
            var s = "";
            for (var k in arguments) s += k + ",";
            return s;
        }
        f("a", "b")
    "#;
    assert_eq!(eval(source), str_value("0,1,"));
}

#[test]
fn test_for_in_skips_deleted_names() {
    let source = r#"
        var o = { a: 1, b: 2, c: 3 };
        var s = "";
        for (var k in o) {
            s += k;
            delete o.c;
        }
        s
    "#;
    assert_eq!(eval(source), str_value("ab"));
}

#[test]
fn test_for_in_targets() {
    assert_eq!(eval("var o = {}; for (o.key in { z: 1 }); o.key"), str_value("z"));
    assert_eq!(eval("var a = []; for (a[0] in { q: 1 }); a[0]"), str_value("q"));
    assert_eq!(
        eval("var s = ''; for (var k in { a: 1, b: 2 }) { if (k === 'b') break; s += k } s"),
        str_value("a")
    );
}

#[test]
fn test_with() {
    assert_eq!(eval("var o = { x: 10 }; var x = 1; with (o) { x = x + 5 } o.x + x"), Value::Number(16.0));
    assert_eq!(eval("var o = {}; with (o) { var y = 3 } y"), Value::Number(3.0));
    assert_eq!(eval("var r = 0; with ({ a: 2 }) { r = a * 2 } r"), Value::Number(4.0));
}

#[test]
fn test_with_does_not_see_inherited_names() {
    let source = r#"
        function P() {}
        P.prototype.shadow = "proto";
        var shadow = "global";
        var r;
        with (new P()) { r = shadow }
        r
    "#;
    assert_eq!(eval(source), str_value("global"));
}

#[test]
fn test_break_out_of_with_restores_scope() {
    let source = r#"
        var x = "outer";
        var seen;
        for (var i = 0; i < 3; i++) {
            with ({ x: "inner" }) {
                seen = x;
                break;
            }
        }
        seen + "/" + x
    "#;
    assert_eq!(eval(source), str_value("inner/outer"));
}

#[test]
fn test_try_catch() {
    assert_eq!(eval("var r; try { throw 42 } catch (e) { r = e } r"), Value::Number(42.0));
    assert_eq!(eval("var r = 'ok'; try { r = 'body' } catch (e) { r = 'caught' } r"), str_value("body"));
    assert_eq!(
        eval("var r; try { undefinedFunction() } catch (e) { r = e.name } r"),
        str_value("ReferenceError")
    );
    assert_eq!(eval("var e = 'outer'; try { throw 'inner' } catch (e) {} e"), str_value("outer"));
}

#[test]
fn test_catch_scope_is_its_own() {
    let source = r#"
        try { throw "a" } catch (e) {
            var captured = function () { return e };
        }
        captured()
    "#;
    assert_eq!(eval(source), str_value("a"));
}

#[test]
fn test_finally_runs_once() {
    let source = r#"
        var count = 0;
        function f() {
            try {
                return "body";
            } finally {
                count++;
            }
        }
        f() + count
    "#;
    assert_eq!(eval(source), str_value("body1"));
}

#[test]
fn test_finally_return_overrides() {
    assert_eq!(
        eval("function f() { try { return 1 } finally { return 2 } } f()"),
        Value::Number(2.0)
    );
    assert_eq!(
        eval("function f() { try { throw 1 } finally { return 2 } } f()"),
        Value::Number(2.0)
    );
}

#[test]
fn test_finally_after_catch() {
    let source = r#"
        var log = "";
        try {
            log += "t";
            throw 0;
        } catch (e) {
            log += "c";
        } finally {
            log += "f";
        }
        log
    "#;
    assert_eq!(eval(source), str_value("tcf"));
}

#[test]
fn test_throw_from_catch_runs_finally() {
    let source = r#"
        var log = "";
        try {
            try {
                throw "first";
            } catch (e) {
                log += "c";
                throw "second";
            } finally {
                log += "f";
            }
        } catch (e) {
            log += e;
        }
        log
    "#;
    assert_eq!(eval(source), str_value("cfsecond"));
}

#[test]
fn test_break_inside_finally_discards_exception() {
    let source = r#"
        var log = "";
        for (var i = 0; i < 3; i++) {
            try {
                throw i;
            } catch (e) {
                throw "again";
            } finally {
                log += i;
                break;
            }
        }
        log
    "#;
    assert_eq!(eval(source), str_value("0"));
}

#[test]
fn test_break_and_continue_through_finally() {
    let source = r#"
        var log = "";
        for (var i = 0; i < 4; i++) {
            try {
                if (i === 1) continue;
                if (i === 3) break;
                log += i;
            } finally {
                log += "f";
            }
        }
        log
    "#;
    assert_eq!(eval(source), str_value("0ff2ff"));
}

#[test]
fn test_exception_crosses_function_frames() {
    let source = r#"
        function inner() { throw new Error("deep") }
        function middle() { inner(); return "unreachable" }
        var r;
        try { middle() } catch (e) { r = e.message }
        r
    "#;
    assert_eq!(eval(source), str_value("deep"));
}

#[test]
fn test_loop_state_survives_caught_exceptions() {
    let source = r#"
        var caught = 0, sum = 0;
        for (var i = 0; i < 5; i++) {
            try {
                if (i % 2) throw i;
                sum += i;
            } catch (e) {
                caught += e;
            }
        }
        sum * 100 + caught
    "#;
    assert_eq!(eval(source), Value::Number(604.0));
}
