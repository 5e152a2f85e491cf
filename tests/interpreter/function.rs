//! Functions, closures, `this`, `arguments` and constructors

use super::{eval, str_value};
use stackjs::Value;

#[test]
fn test_function_declaration_and_call() {
    assert_eq!(eval("function add(a, b) { return a + b } add(2, 3)"), Value::Number(5.0));
    assert_eq!(eval("function f(a, b) { return b } f(1)"), Value::Undefined);
    assert_eq!(eval("function f(a) { return a } f(1, 2, 3)"), Value::Number(1.0));
    assert_eq!(eval("function f() {} f()"), Value::Undefined);
    assert_eq!(eval("function f() { return } f()"), Value::Undefined);
}

#[test]
fn test_hoisting() {
    assert_eq!(
        eval("function f() { return g(); function g() { return 1 } } f()"),
        Value::Number(1.0)
    );
    assert_eq!(eval("early(); function early() { return 'hoisted' } early()"), str_value("hoisted"));
    assert_eq!(
        eval("function f() { var r = typeof x; var x = 1; return r } f()"),
        str_value("undefined")
    );
    assert_eq!(eval("var v = typeof later; var later = 1; v"), str_value("undefined"));
}

#[test]
fn test_parameter_and_local_shadowing() {
    assert_eq!(eval("var x = 'global'; function f(x) { return x } f('param')"), str_value("param"));
    assert_eq!(eval("function f(x) { var x; return x } f(7)"), Value::Number(7.0));
    assert_eq!(
        eval("var x = 1; function f() { var x = 2; return x } f() + x"),
        Value::Number(3.0)
    );
    assert_eq!(eval("var x = 1; function f() { x = 5 } f(); x"), Value::Number(5.0));
    assert_eq!(eval("function f() { leaked = 9 } f(); leaked"), Value::Number(9.0));
}

#[test]
fn test_closures() {
    let source = r#"
        function counter() {
            var n = 0;
            return function () { return ++n };
        }
        var a = counter(), b = counter();
        a(); a();
        b();
        a() * 10 + b()
    "#;
    assert_eq!(eval(source), Value::Number(32.0));
}

#[test]
fn test_closures_capture_the_binding() {
    let source = r#"
        var fns = [];
        for (var i = 0; i < 3; i++) {
            fns.push(function () { return i });
        }
        fns[0]() + fns[1]() + fns[2]()
    "#;
    assert_eq!(eval(source), Value::Number(9.0));

    let source = r#"
        var fns = [];
        for (var i = 0; i < 3; i++) {
            fns.push((function (j) { return function () { return j } })(i));
        }
        "" + fns[0]() + fns[1]() + fns[2]()
    "#;
    assert_eq!(eval(source), str_value("012"));
}

#[test]
fn test_recursion() {
    assert_eq!(
        eval("function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2) } fib(15)"),
        Value::Number(610.0)
    );
    assert_eq!(
        eval("function depth(n) { return n === 0 ? 0 : 1 + depth(n - 1) } depth(50)"),
        Value::Number(50.0)
    );
}

#[test]
fn test_named_function_expression() {
    assert_eq!(
        eval("var f = function fact(n) { return n <= 1 ? 1 : n * fact(n - 1) }; f(5)"),
        Value::Number(120.0)
    );
    assert_eq!(eval("var f = function inner() {}; typeof inner"), str_value("undefined"));
    assert_eq!(
        eval("var g = function h() { h = 1; return typeof h }; g()"),
        str_value("function")
    );
}

#[test]
fn test_immediately_invoked() {
    assert_eq!(eval("(function (x) { return x * 2 })(21)"), Value::Number(42.0));
    assert_eq!(eval("(function () { return 'iife' }())"), str_value("iife"));
}

#[test]
fn test_arguments_object() {
    assert_eq!(eval("function f() { return arguments.length } f(1, 2, 3)"), Value::Number(3.0));
    assert_eq!(eval("function f() { return arguments[1] } f('a', 'b')"), str_value("b"));
    assert_eq!(eval("function f() { return arguments.callee === f } f()"), Value::Boolean(true));
    assert_eq!(
        eval("function sum() { var s = 0; for (var i = 0; i < arguments.length; i++) s += arguments[i]; return s } sum(1, 2, 3, 4)"),
        Value::Number(10.0)
    );
    assert_eq!(
        eval("function f(arguments) { return arguments } f('shadowed')"),
        str_value("shadowed")
    );
}

#[test]
fn test_this_binding() {
    assert_eq!(eval("var o = { v: 4, m: function () { return this.v } }; o.m()"), Value::Number(4.0));
    assert_eq!(eval("var o = { v: 4, m: function () { return this.v } }; o['m']()"), Value::Number(4.0));
    assert_eq!(eval("var x = 'g'; function f() { return this.x } f()"), str_value("g"));
    assert_eq!(eval("var top = this; function f() { return this } f() === top"), Value::Boolean(true));
    assert_eq!(
        eval("var o = { m: function () { return this } }; var m = o.m; m() === this"),
        Value::Boolean(true)
    );
}

#[test]
fn test_call_and_apply() {
    assert_eq!(
        eval("function f(a, b) { return this.v + a + b } f.call({ v: 1 }, 2, 3)"),
        Value::Number(6.0)
    );
    assert_eq!(
        eval("function f(a, b) { return this.v + a + b } f.apply({ v: 1 }, [2, 3])"),
        Value::Number(6.0)
    );
    assert_eq!(eval("function f() { return arguments.length } f.apply(null)"), Value::Number(0.0));
    assert_eq!(eval("var g = this; function f() { return this } f.call(null) === g"), Value::Boolean(true));
    assert_eq!(eval("function f() { return typeof this } f.call(5)"), str_value("number"));
    assert_eq!(eval("function f() { return this } f.call('s')"), str_value("s"));
}

#[test]
fn test_function_properties() {
    assert_eq!(eval("function f(a, b) {} f.length"), Value::Number(2.0));
    assert_eq!(eval("function f(a, b) {} f.length = 5; f.length"), Value::Number(2.0));
    assert_eq!(eval("function f() {} typeof f.prototype"), str_value("object"));
    assert_eq!(eval("function f() {} f.prototype.constructor === f"), Value::Boolean(true));
    assert_eq!(eval("function f() {} var s = ''; for (var k in f) s += k; s"), str_value(""));
    assert_eq!(
        eval("function f() {} var s = ''; for (var k in f.prototype) s += k; s"),
        str_value("")
    );
    assert_eq!(eval("function f() {} f.custom = 1; f.custom"), Value::Number(1.0));
}

#[test]
fn test_function_to_string() {
    assert_eq!(
        eval("(function named() { return 1 }).toString()"),
        str_value("function named() { [bytecode] }")
    );
    assert_eq!(eval("Object.toString()"), str_value("function Object() { [native code] }"));
    assert_eq!(eval("'' + function () {}"), str_value("function () { [bytecode] }"));
}

#[test]
fn test_constructors() {
    assert_eq!(eval("function P(x) { this.x = x } var p = new P(3); p.x"), Value::Number(3.0));
    assert_eq!(eval("function P() { this.x = 1 } var p = new P; p.x"), Value::Number(1.0));
    assert_eq!(eval("function P() {} new P() instanceof P"), Value::Boolean(true));
    assert_eq!(eval("function P() {} new P() instanceof Object"), Value::Boolean(true));
    assert_eq!(eval("function P() {} var p = new P(); p.constructor === P"), Value::Boolean(true));
    assert_eq!(
        eval("function P() { this.x = 1; return { x: 2 } } new P().x"),
        Value::Number(2.0)
    );
    assert_eq!(eval("function P() { this.x = 1; return 5 } new P().x"), Value::Number(1.0));
}

#[test]
fn test_prototype_methods() {
    let source = r#"
        function Counter(start) { this.count = start }
        Counter.prototype.increment = function () { this.count++; return this };
        var c = new Counter(10);
        c.increment().increment();
        c.count
    "#;
    assert_eq!(eval(source), Value::Number(12.0));
}

#[test]
fn test_prototype_inheritance() {
    let source = r#"
        function Animal(name) { this.name = name }
        Animal.prototype.speak = function () { return this.name + " makes a sound" };
        function Dog(name) { Animal.call(this, name) }
        Dog.prototype = new Animal();
        Dog.prototype.bark = function () { return this.name + " barks" };
        var d = new Dog("Rex");
        d.speak() + "; " + d.bark() + "; " + (d instanceof Animal)
    "#;
    assert_eq!(eval(source), str_value("Rex makes a sound; Rex barks; true"));
}

#[test]
fn test_native_constructors() {
    assert_eq!(eval("new Object() instanceof Object"), Value::Boolean(true));
    assert_eq!(eval("new Array(3).length"), Value::Number(3.0));
    assert_eq!(eval("new Array(1, 2).length"), Value::Number(2.0));
    assert_eq!(eval("Array('a', 'b').join('')"), str_value("ab"));
    assert_eq!(eval("[] instanceof Array"), Value::Boolean(true));
    assert_eq!(eval("Object(1) instanceof Number"), Value::Boolean(true));
}
