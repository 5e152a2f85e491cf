//! Operators, conversions and literals

use super::{eval, str_value};
use stackjs::Value;

#[test]
fn test_arithmetic() {
    assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
    assert_eq!(eval("(1 + 2) * 3"), Value::Number(9.0));
    assert_eq!(eval("10 / 4"), Value::Number(2.5));
    assert_eq!(eval("7 % 3"), Value::Number(1.0));
    assert_eq!(eval("-7 % 3"), Value::Number(-1.0));
    assert_eq!(eval("5.5 % 2"), Value::Number(1.5));
    assert_eq!(eval("1 / 0 === Infinity"), Value::Boolean(true));
    assert_eq!(eval("var n = 0 / 0; n !== n"), Value::Boolean(true));
    assert_eq!(eval("-(3)"), Value::Number(-3.0));
    assert_eq!(eval("+'42'"), Value::Number(42.0));
}

#[test]
fn test_string_number_mixing() {
    assert_eq!(eval(r#""5" + 3"#), str_value("53"));
    assert_eq!(eval(r#"3 + "5""#), str_value("35"));
    assert_eq!(eval(r#""5" - 3"#), Value::Number(2.0));
    assert_eq!(eval(r#""5" * "2""#), Value::Number(10.0));
    assert_eq!(eval(r#"1 + 2 + "3""#), str_value("33"));
    assert_eq!(eval(r#""1" + 2 + 3"#), str_value("123"));
    assert_eq!(eval(r#"" 12 " * 1"#), Value::Number(12.0));
    assert_eq!(eval(r#""0x1f" - 0"#), Value::Number(31.0));
    assert_eq!(eval(r#"true + 1"#), Value::Number(2.0));
    assert_eq!(eval(r#"null + 1"#), Value::Number(1.0));
}

#[test]
fn test_bitwise() {
    assert_eq!(eval("1 << 33"), Value::Number(2.0));
    assert_eq!(eval("-16 >> 2"), Value::Number(-4.0));
    assert_eq!(eval("-1 >>> 28"), Value::Number(15.0));
    assert_eq!(eval("-1 >>> 0"), Value::Number(4294967295.0));
    assert_eq!(eval("5 & 3"), Value::Number(1.0));
    assert_eq!(eval("5 | 3"), Value::Number(7.0));
    assert_eq!(eval("5 ^ 3"), Value::Number(6.0));
    assert_eq!(eval("~5"), Value::Number(-6.0));
    assert_eq!(eval("4294967296 | 0"), Value::Number(0.0));
    assert_eq!(eval("2147483648 | 0"), Value::Number(-2147483648.0));
}

#[test]
fn test_comparison() {
    assert_eq!(eval("1 < 2"), Value::Boolean(true));
    assert_eq!(eval("2 <= 2"), Value::Boolean(true));
    assert_eq!(eval("3 > 4"), Value::Boolean(false));
    assert_eq!(eval(r#""10" < "9""#), Value::Boolean(true));
    assert_eq!(eval(r#""10" < 9"#), Value::Boolean(false));
    assert_eq!(eval("var n = 0 / 0; n < 1 || n >= 1"), Value::Boolean(false));
}

#[test]
fn test_equality() {
    assert_eq!(eval("null == undefined"), Value::Boolean(true));
    assert_eq!(eval("null === undefined"), Value::Boolean(false));
    assert_eq!(eval(r#""1" == 1"#), Value::Boolean(true));
    assert_eq!(eval(r#""1" === 1"#), Value::Boolean(false));
    assert_eq!(eval("true == 1"), Value::Boolean(true));
    assert_eq!(eval("null == 0"), Value::Boolean(false));
    assert_eq!(eval("var n = 0 / 0; n == n"), Value::Boolean(false));
    assert_eq!(eval("var a = {}; a === a"), Value::Boolean(true));
    assert_eq!(eval("({}) === ({})"), Value::Boolean(false));
    assert_eq!(eval(r#"var o = { valueOf: function () { return 7 } }; o == "7""#), Value::Boolean(true));
    assert_eq!(eval("1 != 2"), Value::Boolean(true));
    assert_eq!(eval("1 !== 1"), Value::Boolean(false));
}

#[test]
fn test_logical_operators() {
    assert_eq!(eval(r#"0 || "x""#), str_value("x"));
    assert_eq!(eval("1 && 2"), Value::Number(2.0));
    assert_eq!(eval("null && missing()"), Value::Null);
    assert_eq!(eval("1 || missing()"), Value::Number(1.0));
    assert_eq!(eval("!0"), Value::Boolean(true));
    assert_eq!(eval(r#"!"""#), Value::Boolean(true));
    assert_eq!(eval("!{}"), Value::Boolean(false));
}

#[test]
fn test_conditional_comma_void() {
    assert_eq!(eval("true ? 1 : 2"), Value::Number(1.0));
    assert_eq!(eval("0 ? 1 : 2"), Value::Number(2.0));
    assert_eq!(eval("(1, 2, 3)"), Value::Number(3.0));
    assert_eq!(eval("void 0"), Value::Undefined);
}

#[test]
fn test_typeof() {
    assert_eq!(eval("typeof undefined"), str_value("undefined"));
    assert_eq!(eval("typeof null"), str_value("object"));
    assert_eq!(eval("typeof true"), str_value("boolean"));
    assert_eq!(eval("typeof 1"), str_value("number"));
    assert_eq!(eval(r#"typeof "s""#), str_value("string"));
    assert_eq!(eval("typeof {}"), str_value("object"));
    assert_eq!(eval("typeof []"), str_value("object"));
    assert_eq!(eval("typeof function () {}"), str_value("function"));
    assert_eq!(eval("typeof Object"), str_value("function"));
    assert_eq!(eval("typeof notDeclaredAnywhere"), str_value("undefined"));
}

#[test]
fn test_number_to_string() {
    assert_eq!(eval(r#""" + 0.5"#), str_value("0.5"));
    assert_eq!(eval(r#""" + -0"#), str_value("0"));
    assert_eq!(eval(r#""" + 1e21"#), str_value("1e+21"));
    assert_eq!(eval(r#""" + 123456789"#), str_value("123456789"));
    assert_eq!(eval(r#""" + 1 / 0"#), str_value("Infinity"));
    assert_eq!(eval("(255).toString(16)"), str_value("ff"));
    assert_eq!(eval("(-5).toString(2)"), str_value("-101"));
}

#[test]
fn test_object_to_primitive() {
    assert_eq!(eval("[1, 2, 3] + ''"), str_value("1,2,3"));
    assert_eq!(eval("({}) + ''"), str_value("[object Object]"));
    assert_eq!(eval("var o = { valueOf: function () { return 41 } }; o + 1"), Value::Number(42.0));
    assert_eq!(
        eval(r#"var o = { toString: function () { return "obj" } }; "x" + o"#),
        str_value("xobj")
    );
    assert_eq!(eval("[] + []"), str_value(""));
    assert_eq!(eval("[null, undefined, 1].join('-')"), str_value("--1"));
}

#[test]
fn test_strings() {
    assert_eq!(eval(r#""abc".length"#), Value::Number(3.0));
    assert_eq!(eval(r#""abc"[1]"#), str_value("b"));
    assert_eq!(eval(r#""abc"[5]"#), Value::Undefined);
    assert_eq!(eval(r#""héllo".length"#), Value::Number(5.0));
    assert_eq!(eval(r#"var s = "a"; s += "b"; s += 1; s"#), str_value("ab1"));
    assert_eq!(eval(r#"String(12) === "12""#), Value::Boolean(true));
    assert_eq!(eval(r#"typeof new String("x")"#), str_value("object"));
    assert_eq!(eval(r#"new String("xy").length"#), Value::Number(2.0));
}

#[test]
fn test_wrappers() {
    assert_eq!(eval("Number('3') + 1"), Value::Number(4.0));
    assert_eq!(eval("Boolean('')"), Value::Boolean(false));
    assert_eq!(eval("new Number(5) + 1"), Value::Number(6.0));
    assert_eq!(eval("new Boolean(false) ? 1 : 2"), Value::Number(1.0));
    assert_eq!(eval("Object.prototype.toString.call([])"), str_value("[object Array]"));
}

#[test]
fn test_update_expressions() {
    assert_eq!(eval("var i = 1; i++"), Value::Number(1.0));
    assert_eq!(eval("var i = 1; ++i"), Value::Number(2.0));
    assert_eq!(eval("var i = 1; i--; i"), Value::Number(0.0));
    assert_eq!(eval("var o = { n: '5' }; o.n++; o.n"), Value::Number(6.0));
    assert_eq!(eval("var a = [1]; a[0] += 10; a[0]"), Value::Number(11.0));
    assert_eq!(eval("var x = 6; x *= 2; x -= 2; x /= 5; x"), Value::Number(2.0));
    assert_eq!(eval("var x = 1; x <<= 4; x |= 1; x"), Value::Number(17.0));
}

#[test]
fn test_completion_value() {
    assert_eq!(eval("1; 2; 3"), Value::Number(3.0));
    assert_eq!(eval("var x = 1"), Value::Undefined);
    assert_eq!(eval("var x = 1; x; var y = 2"), Value::Number(1.0));
    assert_eq!(eval(""), Value::Undefined);
    assert_eq!(eval("if (true) { 5 } else { 6 }"), Value::Number(5.0));
}
