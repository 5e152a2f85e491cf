//! Objects, arrays, property attributes and the prototype chain

use super::{eval, eval_error, str_value};
use stackjs::Value;

#[test]
fn test_object_literals() {
    assert_eq!(eval("var o = { a: 1, 'b c': 2, 3: 'three' }; o.a + o['b c']"), Value::Number(3.0));
    assert_eq!(eval("var o = { 3: 'three' }; o[3] + o['3']"), str_value("threethree"));
    assert_eq!(eval("var o = { if: 1, new: 2 }; o.if + o.new"), Value::Number(3.0));
    assert_eq!(eval("var o = { inner: { deep: { v: 'x' } } }; o.inner.deep.v"), str_value("x"));
    assert_eq!(eval("var o = { a: 1, a: 2 }; o.a"), Value::Number(2.0));
    assert_eq!(eval("({}).missing"), Value::Undefined);
}

#[test]
fn test_property_assignment() {
    assert_eq!(eval("var o = {}; o.x = 1; o['y'] = 2; o.x + o.y"), Value::Number(3.0));
    assert_eq!(eval("var o = {}; var k = 'dyn'; o[k + 1] = 5; o.dyn1"), Value::Number(5.0));
    assert_eq!(eval("var o = {}; o[1.5] = 'f'; o['1.5']"), str_value("f"));
    assert_eq!(eval("var o = {}; o.x = o.y = 3; o.x + o.y"), Value::Number(6.0));
    assert_eq!(eval("var s = 'abc'; s.extra = 1; s.extra"), Value::Undefined);
    assert_eq!(eval("(5).toString === Number.prototype.toString"), Value::Boolean(true));
}

#[test]
fn test_prototype_lookup_and_shadowing() {
    let source = r#"
        function Base() {}
        Base.prototype.v = "proto";
        var a = new Base(), b = new Base();
        a.v = "own";
        a.v + "/" + b.v + "/" + Base.prototype.v
    "#;
    assert_eq!(eval(source), str_value("own/proto/proto"));

    let source = r#"
        function Base() {}
        var a = new Base();
        Base.prototype.late = 7;
        a.late
    "#;
    assert_eq!(eval(source), Value::Number(7.0));
}

#[test]
fn test_in_and_has_own_property() {
    assert_eq!(eval("'a' in { a: undefined }"), Value::Boolean(true));
    assert_eq!(eval("'b' in { a: 1 }"), Value::Boolean(false));
    assert_eq!(eval("'toString' in {}"), Value::Boolean(true));
    assert_eq!(eval("({}).hasOwnProperty('toString')"), Value::Boolean(false));
    assert_eq!(eval("({ x: 1 }).hasOwnProperty('x')"), Value::Boolean(true));
    assert_eq!(eval("0 in [9]"), Value::Boolean(true));
    assert_eq!(eval("'length' in []"), Value::Boolean(true));
    assert_eq!(eval("'abc'.hasOwnProperty('length')"), Value::Boolean(true));
}

#[test]
fn test_delete() {
    assert_eq!(eval("var o = { a: 1 }; delete o.a; 'a' in o"), Value::Boolean(false));
    assert_eq!(eval("var o = { a: 1 }; delete o.a"), Value::Boolean(true));
    assert_eq!(eval("var o = {}; delete o.missing"), Value::Boolean(true));
    assert_eq!(eval("var o = { a: 1 }; delete o['a']; o.a"), Value::Undefined);
    assert_eq!(eval("function P() {} P.prototype.x = 1; var p = new P(); delete p.x; p.x"), Value::Number(1.0));
    assert_eq!(eval("delete 5"), Value::Boolean(true));
}

#[test]
fn test_delete_variables() {
    assert_eq!(eval("var declared = 1; delete declared"), Value::Boolean(false));
    assert_eq!(eval("var declared = 1; delete declared; declared"), Value::Number(1.0));
    assert_eq!(eval("implicit = 1; delete implicit"), Value::Boolean(true));
    assert_eq!(eval("implicit = 1; delete implicit; typeof implicit"), str_value("undefined"));
    assert_eq!(eval("function f() {} delete f"), Value::Boolean(false));
    assert_eq!(eval("delete neverDeclared"), Value::Boolean(true));
}

#[test]
fn test_read_only_globals() {
    assert_eq!(eval("undefined = 1; typeof undefined"), str_value("undefined"));
    assert_eq!(eval("NaN = 1; NaN !== NaN"), Value::Boolean(true));
    assert_eq!(eval("delete Infinity"), Value::Boolean(false));
    assert_eq!(eval("var s = ''; for (var k in this) if (k === 'NaN') s = k; s"), str_value(""));
}

#[test]
fn test_arrays() {
    assert_eq!(eval("[1, 2, 3].length"), Value::Number(3.0));
    assert_eq!(eval("[].length"), Value::Number(0.0));
    assert_eq!(eval("[1, , 3].length"), Value::Number(3.0));
    assert_eq!(eval("[1, , 3][1]"), Value::Undefined);
    assert_eq!(eval("[1, 2, ].length"), Value::Number(2.0));
    assert_eq!(eval("var a = [[1, 2], [3, 4]]; a[1][0]"), Value::Number(3.0));
    assert_eq!(eval("var a = []; a[4] = 'x'; a.length"), Value::Number(5.0));
    assert_eq!(eval("var a = []; a['2'] = 'x'; a.length"), Value::Number(3.0));
    assert_eq!(eval("var a = []; a.foo = 1; a.length"), Value::Number(0.0));
    assert_eq!(eval("var a = [1, 2]; a.push(3, 4)"), Value::Number(4.0));
    assert_eq!(eval("var a = [1, 2]; a.push(3); a.join('-')"), str_value("1-2-3"));
}

#[test]
fn test_array_length_truncates() {
    assert_eq!(eval("var a = [1, 2, 3, 4]; a.length = 2; a.length"), Value::Number(2.0));
    assert_eq!(eval("var a = [1, 2, 3, 4]; a.length = 2; a[3]"), Value::Undefined);
    assert_eq!(eval("var a = [1, 2, 3, 4]; a.length = 2; 2 in a"), Value::Boolean(false));
    assert_eq!(eval("var a = [1, 2]; a.length = 4; a.join()"), str_value("1,2,,"));
    assert_eq!(eval("var a = [1, 2, 3]; a.length = 0; a.push('z'); a[0]"), str_value("z"));
    assert_eq!(eval("var a = [1, 2, 3]; delete a[2]; a.length"), Value::Number(3.0));
}

#[test]
fn test_invalid_array_length() {
    assert_eq!(eval_error("var a = []; a.length = -1"), "RangeError: invalid array length");
    assert_eq!(eval_error("var a = []; a.length = 1.5"), "RangeError: invalid array length");
    assert_eq!(eval_error("new Array(-3)"), "RangeError: invalid array length");
}

#[test]
fn test_many_properties() {
    let source = r#"
        var o = {};
        for (var i = 0; i < 300; i++) o["k" + i] = i;
        for (var i = 0; i < 300; i += 3) delete o["k" + i];
        var count = 0, sum = 0;
        for (var k in o) { count++; sum += o[k] }
        count + ":" + sum
    "#;
    // 200 survivors; the deleted multiples of 3 sum to 14850
    assert_eq!(eval(source), str_value("200:30000"));
}

#[test]
fn test_enumeration_is_sorted_by_name() {
    assert_eq!(
        eval("var o = { zeta: 1, alpha: 2, mid: 3 }; var s = []; for (var k in o) s.push(k); s.join()"),
        str_value("alpha,mid,zeta")
    );
}

#[test]
fn test_instanceof() {
    assert_eq!(eval("({}) instanceof Object"), Value::Boolean(true));
    assert_eq!(eval("1 instanceof Number"), Value::Boolean(false));
    assert_eq!(eval("function A() {} function B() {} new A() instanceof B"), Value::Boolean(false));
    assert_eq!(
        eval_error("({}) instanceof 5"),
        "TypeError: right-hand side of instanceof is not callable"
    );
}

#[test]
fn test_property_access_on_nullish() {
    assert_eq!(eval_error("var u; u.x"), "TypeError: cannot read property 'x' of undefined");
    assert_eq!(eval_error("null.y"), "TypeError: cannot read property 'y' of null");
    assert_eq!(eval_error("var u; u.x = 1"), "TypeError: cannot set property 'x' of undefined");
}

#[test]
fn test_object_to_string() {
    assert_eq!(eval("Object.prototype.toString.call(null)"), str_value("[object Null]"));
    assert_eq!(eval("Object.prototype.toString.call(1)"), str_value("[object Number]"));
    assert_eq!(eval("Object.prototype.toString.call(function () {})"), str_value("[object Function]"));
    assert_eq!(
        eval("(function () { return Object.prototype.toString.call(arguments) })()"),
        str_value("[object Arguments]")
    );
}
