//! The embedding API: stack slots, host functions, protected calls, JSON

use super::create_test_runtime;
use serde_json::json;
use stackjs::{Interpreter, JsError, RuntimeConfig, Value};

fn host_add(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let a = interp.to_number_at(1)?;
    let b = interp.to_number_at(2)?;
    Ok(Value::Number(a + b))
}

fn host_argc(_interp: &mut Interpreter, argc: usize) -> Result<Value, JsError> {
    Ok(Value::from(argc as u32))
}

fn host_this_tag(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    interp.get_property_at(0, "tag")?;
    interp.pop()
}

fn host_fail(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let message = interp.to_string_at(1)?;
    Err(interp.type_error(format!("host says {}", message)))
}

/// Calls its first argument with the second and doubles the result.
fn host_apply_twice(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let callback = interp.arg(1);
    let input = interp.arg(2);
    let once = interp.call_function(callback.clone(), Value::Undefined, &[input])?;
    interp.call_function(callback, Value::Undefined, &[once])
}

fn install(interp: &mut Interpreter, name: &str, call: stackjs::NativeFn, length: u32) {
    interp.push_native_function(name, call, length).unwrap();
    interp.set_global(name).unwrap();
}

#[test]
fn test_stack_slots() {
    let mut interp = create_test_runtime();
    assert_eq!(interp.top(), 0);
    interp.push_number(1.0).unwrap();
    interp.push_string("two").unwrap();
    interp.push_boolean(true).unwrap();
    interp.push_null().unwrap();
    interp.push_undefined().unwrap();
    assert_eq!(interp.top(), 5);

    assert!(interp.is_number(0));
    assert!(interp.is_string(1));
    assert!(interp.is_string(-4));
    assert!(interp.is_boolean(-3));
    assert!(interp.is_null(-2));
    assert!(interp.is_undefined(-1));
    assert!(interp.is_undefined(99));
    assert!(interp.is_undefined(-99));
    assert_eq!(interp.get(1), Value::from("two"));

    interp.copy(0).unwrap();
    assert_eq!(interp.to_number_at(-1).unwrap(), 1.0);
    assert_eq!(interp.pop().unwrap(), Value::Number(1.0));
    assert_eq!(interp.top(), 5);
}

#[test]
fn test_conversions_at() {
    let mut interp = create_test_runtime();
    interp.push_string(" 42 ").unwrap();
    assert_eq!(interp.to_number_at(-1).unwrap(), 42.0);
    assert!(interp.to_boolean_at(-1));

    interp.push_number(0.5).unwrap();
    assert_eq!(interp.to_string_at(-1).unwrap().as_str(), "0.5");

    interp.push_string("").unwrap();
    assert!(!interp.to_boolean_at(-1));
}

#[test]
fn test_globals() {
    let mut interp = create_test_runtime();
    interp.push_number(7.0).unwrap();
    interp.set_global("seven").unwrap();
    assert_eq!(interp.top(), 0);
    assert_eq!(interp.eval("seven * 6").unwrap(), Value::Number(42.0));

    interp.eval("var fromScript = 'hello'").unwrap();
    interp.get_global("fromScript").unwrap();
    assert_eq!(interp.to_string_at(-1).unwrap().as_str(), "hello");

    interp.get_global("missing").unwrap();
    assert!(interp.is_undefined(-1));
}

#[test]
fn test_object_properties_from_host() {
    let mut interp = create_test_runtime();
    interp.push_new_object().unwrap();
    interp.push_number(3.0).unwrap();
    interp.set_property_at(-2, "x").unwrap();
    assert!(interp.has_property_at(-1, "x"));
    assert!(interp.has_property_at(-1, "toString"));
    assert!(!interp.has_property_at(-1, "y"));

    interp.get_property_at(-1, "x").unwrap();
    assert_eq!(interp.to_number_at(-1).unwrap(), 3.0);
    interp.pop().unwrap();

    assert!(interp.delete_property_at(-1, "x").unwrap());
    assert!(!interp.has_property_at(-1, "x"));

    interp.push_undefined().unwrap();
    assert!(interp.get_property_at(-1, "x").is_err());
}

#[test]
fn test_arrays_from_host() {
    let mut interp = create_test_runtime();
    interp.push_new_array().unwrap();
    for (i, word) in ["a", "b", "c"].iter().enumerate() {
        interp.push_string(word).unwrap();
        interp.set_property_at(-2, &i.to_string()).unwrap();
    }
    assert_eq!(interp.length_at(-1).unwrap(), 3);

    interp.set_global("letters").unwrap();
    assert_eq!(interp.eval("letters.join('')").unwrap(), Value::from("abc"));

    interp.push_string("four").unwrap();
    assert_eq!(interp.length_at(-1).unwrap(), 4);
}

#[test]
fn test_native_functions() {
    let mut interp = create_test_runtime();
    install(&mut interp, "add", host_add, 2);
    install(&mut interp, "argc", host_argc, 0);
    install(&mut interp, "thisTag", host_this_tag, 0);

    assert_eq!(interp.eval("add(2, 3)").unwrap(), Value::Number(5.0));
    assert_eq!(interp.eval("add('2', 3)").unwrap(), Value::Number(5.0));
    assert_eq!(interp.eval("add(1)").unwrap().as_number().map(f64::is_nan), Some(true));
    assert_eq!(interp.eval("argc(1, 2, 3)").unwrap(), Value::Number(3.0));
    assert_eq!(interp.eval("add.length").unwrap(), Value::Number(2.0));
    assert_eq!(interp.eval("typeof add").unwrap(), Value::from("function"));
    assert_eq!(interp.eval("var o = { tag: 'obj', m: thisTag }; o.m()").unwrap(), Value::from("obj"));
    assert_eq!(interp.eval("var tag = 'global'; thisTag()").unwrap(), Value::from("global"));
    assert_eq!(interp.eval("add.toString()").unwrap(), Value::from("function add() { [native code] }"));
    assert!(interp.eval("new add()").is_err());
    assert_eq!(interp.top(), 0);
}

#[test]
fn test_native_errors_are_catchable() {
    let mut interp = create_test_runtime();
    install(&mut interp, "fail", host_fail, 1);
    let result = interp.eval("var r; try { fail('no') } catch (e) { r = e.name + ': ' + e.message } r");
    assert_eq!(result.unwrap(), Value::from("TypeError: host says no"));

    let error = interp.eval("fail('loud')").unwrap_err();
    assert_eq!(interp.error_to_string(&error), "TypeError: host says loud");
}

#[test]
fn test_native_calls_back_into_script() {
    let mut interp = create_test_runtime();
    install(&mut interp, "applyTwice", host_apply_twice, 2);
    assert_eq!(
        interp.eval("applyTwice(function (x) { return x * 3 }, 2)").unwrap(),
        Value::Number(18.0)
    );
    let result = interp.eval("var r; try { applyTwice(function () { throw 'inner' }, 0) } catch (e) { r = e } r");
    assert_eq!(result.unwrap(), Value::from("inner"));
}

#[test]
fn test_call_from_host() {
    let mut interp = create_test_runtime();
    interp.eval("function greet(name) { return 'hi ' + name + this.suffix }").unwrap();

    interp.get_global("greet").unwrap();
    interp.push_new_object().unwrap();
    interp.push_string("!").unwrap();
    interp.set_property_at(-2, "suffix").unwrap();
    interp.push_string("bob").unwrap();
    interp.call(1).unwrap();

    assert_eq!(interp.top(), 1);
    assert_eq!(interp.to_string_at(-1).unwrap().as_str(), "hi bob!");
}

#[test]
fn test_call_error_drops_window() {
    let mut interp = create_test_runtime();
    interp.eval("function boom() { throw new Error('x') }").unwrap();
    interp.push_number(1.0).unwrap();
    interp.get_global("boom").unwrap();
    interp.push_undefined().unwrap();
    interp.push_number(5.0).unwrap();
    assert!(interp.call(1).is_err());
    assert_eq!(interp.top(), 1);
}

#[test]
fn test_construct_from_host() {
    let mut interp = create_test_runtime();
    interp.eval("function Point(x, y) { this.x = x; this.y = y }").unwrap();
    interp.get_global("Point").unwrap();
    interp.push_number(1.0).unwrap();
    interp.push_number(2.0).unwrap();
    interp.construct(2).unwrap();

    assert!(interp.is_object(-1));
    interp.get_property_at(-1, "y").unwrap();
    assert_eq!(interp.to_number_at(-1).unwrap(), 2.0);
}

#[test]
fn test_pcall() {
    let mut interp = create_test_runtime();
    interp.eval("function ok(v) { return v + 1 } function bad() { null.x }").unwrap();

    interp.get_global("ok").unwrap();
    interp.push_undefined().unwrap();
    interp.push_number(1.0).unwrap();
    assert!(interp.pcall(1).unwrap());
    assert_eq!(interp.to_number_at(-1).unwrap(), 2.0);
    interp.pop().unwrap();

    interp.get_global("bad").unwrap();
    interp.push_undefined().unwrap();
    assert!(!interp.pcall(0).unwrap());
    assert_eq!(interp.top(), 1);
    interp.get_property_at(-1, "name").unwrap();
    assert_eq!(interp.to_string_at(-1).unwrap().as_str(), "TypeError");
}

#[test]
fn test_pcall_with_fatal_error() {
    let mut config = RuntimeConfig::from_env();
    config.max_call_depth = 40;
    let mut interp = Interpreter::with_config(config);
    interp.eval("function forever() { return forever() }").unwrap();
    interp.get_global("forever").unwrap();
    interp.push_undefined().unwrap();
    assert!(interp.pcall(0).is_err());
    assert_eq!(interp.top(), 0);
}

#[test]
fn test_load_and_do_string() {
    let mut interp = create_test_runtime();
    interp.load_string("loaded.js", "counter = (typeof counter === 'number' ? counter : 0) + 1").unwrap();
    assert!(interp.is_callable(-1));
    interp.copy(-1).unwrap();
    interp.push_undefined().unwrap();
    interp.call(0).unwrap();
    interp.pop().unwrap();
    interp.push_undefined().unwrap();
    interp.call(0).unwrap();
    assert_eq!(interp.to_number_at(-1).unwrap(), 2.0);
    interp.pop().unwrap();

    interp.do_string("run.js", "counter * 10").unwrap();
    assert_eq!(interp.to_number_at(-1).unwrap(), 20.0);
    interp.pop().unwrap();

    assert!(interp.do_string("throws.js", "throw 'up'").is_err());
    assert_eq!(interp.get(-1), Value::from("up"));
}

#[test]
fn test_push_json() {
    let mut interp = create_test_runtime();
    interp
        .push_json(&json!({ "name": "widget", "tags": ["a", "b"], "size": 2.5, "ok": true, "none": null }))
        .unwrap();
    interp.set_global("doc").unwrap();

    assert_eq!(interp.eval("doc.name").unwrap(), Value::from("widget"));
    assert_eq!(interp.eval("doc.tags.length + doc.size").unwrap(), Value::Number(4.5));
    assert_eq!(interp.eval("doc.tags instanceof Array").unwrap(), Value::Boolean(true));
    assert_eq!(interp.eval("doc.ok && doc.none === null").unwrap(), Value::Boolean(true));
}

#[test]
fn test_to_json() {
    let mut interp = create_test_runtime();
    interp
        .do_string(
            "json.js",
            "({ n: 1, s: 'x', list: [1, undefined, function () {}], skip: undefined, f: function () {}, inf: 1 / 0, nested: { b: false } })",
        )
        .unwrap();
    let value = interp.to_json(-1).unwrap();
    assert_eq!(
        value,
        json!({ "n": 1, "s": "x", "list": [1, null, null], "inf": null, "nested": { "b": false } })
    );

    interp.push_number(0.25).unwrap();
    assert_eq!(interp.to_json(-1).unwrap(), json!(0.25));
    interp.push_undefined().unwrap();
    assert_eq!(interp.to_json(-1).unwrap(), json!(null));
}

#[test]
fn test_to_json_rejects_cycles() {
    let mut interp = create_test_runtime();
    interp.do_string("cycle.js", "var a = { name: 'a' }; a.self = a; a").unwrap();
    let error = interp.to_json(-1).unwrap_err();
    assert_eq!(interp.error_to_string(&error), "TypeError: cyclic object value");
}

#[test]
fn test_to_json_sparse_arrays() {
    let mut interp = create_test_runtime();
    interp.do_string("sparse.js", "var a = []; a[3] = 'x'; a.length = 5; a").unwrap();
    assert_eq!(interp.to_json(-1).unwrap(), json!([null, null, null, "x", null]));

    interp.do_string("huge.js", "var b = []; b.length = 4294967295; b").unwrap();
    let error = interp.to_json(-1).unwrap_err();
    assert_eq!(interp.error_to_string(&error), "RangeError: array too long to convert to JSON");
}

#[test]
fn test_json_round_trip_through_script() {
    let mut interp = create_test_runtime();
    interp.push_json(&json!({ "items": [1, 2, 3] })).unwrap();
    interp.set_global("input").unwrap();
    interp
        .do_string("transform.js", "var out = { total: 0 }; for (var i = 0; i < input.items.length; i++) out.total += input.items[i]; out")
        .unwrap();
    assert_eq!(interp.to_json(-1).unwrap(), json!({ "total": 6 }));
}

#[test]
fn test_push_global_and_value() {
    let mut interp = create_test_runtime();
    interp.eval("var shared = 'visible'").unwrap();
    interp.push_global().unwrap();
    interp.get_property_at(-1, "shared").unwrap();
    assert_eq!(interp.get(-1), Value::from("visible"));

    interp.push_value(Value::from(12)).unwrap();
    interp.set_property_at(-3, "twelve").unwrap();
    assert_eq!(interp.eval("twelve").unwrap(), Value::Number(12.0));
}
