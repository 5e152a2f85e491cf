//! Error objects, uncaught errors and fatal VM conditions

use super::{create_test_runtime, eval, eval_error, eval_result, str_value};
use stackjs::{FatalError, Interpreter, JsError, RuntimeConfig, Value};

fn runtime_with(mut config: RuntimeConfig) -> Interpreter {
    config.gc_threshold = create_test_runtime().gc_threshold();
    Interpreter::with_config(config)
}

#[test]
fn test_uncaught_error_rendering() {
    assert_eq!(eval_error("throw new Error('boom')"), "Error: boom");
    assert_eq!(eval_error("throw new TypeError('bad type')"), "TypeError: bad type");
    assert_eq!(eval_error("throw new RangeError()"), "RangeError");
    assert_eq!(eval_error("throw 'plain'"), "plain");
    assert_eq!(eval_error("throw 42"), "42");
    assert_eq!(eval_result("throw 'raw'").unwrap_err().thrown_value(), Some(&str_value("raw")));
    assert_eq!(eval_error("throw { name: 'Custom', message: 'm' }"), "Custom: m");
}

#[test]
fn test_runtime_error_messages() {
    assert_eq!(eval_error("missingName"), "ReferenceError: 'missingName' is not defined");
    assert_eq!(eval_error("var x; x()"), "TypeError: undefined is not a function");
    assert_eq!(eval_error("var o = {}; o.method()"), "TypeError: undefined is not a function");
    assert_eq!(eval_error("new 5"), "TypeError: number is not a constructor");
    assert_eq!(eval_error("'a' in 'abc'"), "TypeError: right-hand side of 'in' is not an object");
}

#[test]
fn test_error_objects() {
    assert_eq!(eval("new Error('m').message"), str_value("m"));
    assert_eq!(eval("new Error().message"), str_value(""));
    assert_eq!(eval("new TypeError('t').name"), str_value("TypeError"));
    assert_eq!(eval("Error('no new').message"), str_value("no new"));
    assert_eq!(eval("new RangeError('r') instanceof Error"), Value::Boolean(true));
    assert_eq!(eval("new SyntaxError('s') instanceof TypeError"), Value::Boolean(false));
    assert_eq!(eval("String(new EvalError('e'))"), str_value("EvalError: e"));
    assert_eq!(eval("new URIError().toString()"), str_value("URIError"));
    assert_eq!(eval("Object.prototype.toString.call(new Error())"), str_value("[object Error]"));
}

#[test]
fn test_caught_runtime_errors_are_error_objects() {
    let source = r#"
        var r;
        try { null.x } catch (e) { r = (e instanceof TypeError) + ":" + e.message }
        r
    "#;
    assert_eq!(eval(source), str_value("true:cannot read property 'x' of null"));

    let source = r#"
        var r;
        try { nope } catch (e) { r = e.name + ":" + e.message }
        r
    "#;
    assert_eq!(eval(source), str_value("ReferenceError:'nope' is not defined"));
}

#[test]
fn test_custom_error_subclass() {
    let source = r#"
        function MyError(message) { this.message = message }
        MyError.prototype = new Error();
        MyError.prototype.name = "MyError";
        var r;
        try { throw new MyError("custom") } catch (e) { r = (e instanceof Error) + " " + e }
        r
    "#;
    assert_eq!(eval(source), str_value("true MyError: custom"));
}

#[test]
fn test_syntax_errors() {
    let error = eval_result("var = 1").unwrap_err();
    assert!(matches!(error, JsError::SyntaxError { .. }));
    assert!(error.to_string().starts_with("SyntaxError: "));
    assert!(error.to_string().contains("<eval>:1"));

    let error = eval_result("return 1").unwrap_err();
    assert!(error.to_string().contains("return outside of a function"));
}

#[test]
fn test_syntax_error_becomes_script_value() {
    let mut interp = create_test_runtime();
    let result = interp.do_string("bad.js", "if (");
    assert!(matches!(result, Err(JsError::SyntaxError { .. })));
    interp.get_property_at(-1, "name").unwrap();
    assert_eq!(interp.to_string_at(-1).unwrap().as_str(), "SyntaxError");
}

#[test]
fn test_call_depth_is_fatal_and_uncatchable() {
    let mut interp = runtime_with(RuntimeConfig {
        max_call_depth: 50,
        ..RuntimeConfig::default()
    });
    let result = interp.eval("function f() { return f() } var r = 'none'; try { f() } catch (e) { r = 'caught' } r");
    assert!(matches!(result, Err(JsError::Fatal(FatalError::CallDepthExceeded))));
    assert!(result.unwrap_err().is_fatal());

    // The interpreter is usable afterwards and the catch never ran
    assert_eq!(interp.eval("r").unwrap(), str_value("none"));
    assert_eq!(interp.eval("1 + 1").unwrap(), Value::Number(2.0));
}

#[test]
fn test_default_call_depth_fits_a_small_thread() {
    // Runaway recursion must hit the call limit before the native stack
    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let mut interp = runtime_with(RuntimeConfig::default());
            let result = interp.eval("function r(n) { return r(n + 1) } r(0)");
            matches!(result, Err(JsError::Fatal(FatalError::CallDepthExceeded)))
        })
        .unwrap();
    assert!(worker.join().unwrap());
}

#[test]
fn test_try_depth_is_fatal() {
    let mut interp = runtime_with(RuntimeConfig {
        max_try_depth: 8,
        ..RuntimeConfig::default()
    });
    let result = interp.eval("function f() { try { f() } catch (e) { throw e } } f()");
    assert!(matches!(result, Err(JsError::Fatal(FatalError::TryDepthExceeded))));
}

#[test]
fn test_stack_overflow_is_fatal() {
    let mut interp = runtime_with(RuntimeConfig {
        stack_size: 64,
        max_call_depth: 1000,
        ..RuntimeConfig::default()
    });
    let result = interp.eval("function f(a, b, c, d) { return f(a, b, c, d) + 1 } f(1, 2, 3, 4)");
    assert!(matches!(result, Err(JsError::Fatal(FatalError::StackOverflow))));
    assert_eq!(interp.top(), 0);
}

#[test]
fn test_apply_with_huge_length_overflows_the_stack() {
    let mut interp = create_test_runtime();
    let result = interp.eval("var r = 'none'; try { (function () {}).apply(null, { length: 4294967295 }) } catch (e) { r = 'caught' } r");
    assert!(matches!(result, Err(JsError::Fatal(FatalError::StackOverflow))));
    assert_eq!(interp.eval("r").unwrap(), str_value("none"));

    // A length that fits is still spread normally
    let source = "(function () { return arguments.length }).apply(null, { length: 3, 0: 'a' })";
    assert_eq!(interp.eval(source).unwrap(), Value::Number(3.0));
}

#[test]
fn test_fatal_error_rendering() {
    let mut interp = runtime_with(RuntimeConfig {
        max_call_depth: 10,
        ..RuntimeConfig::default()
    });
    let error = interp.eval("function f() { f() } f()").unwrap_err();
    assert_eq!(interp.error_to_string(&error), "fatal: call depth exceeded");
}

#[test]
fn test_error_thrown_from_native_is_catchable() {
    let source = r#"
        var r;
        try { (255).toString(99) } catch (e) { r = e.name }
        r
    "#;
    assert_eq!(eval(source), str_value("RangeError"));
}
