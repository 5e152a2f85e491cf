//! String constructor and prototype methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::ObjectClass;
use crate::value::{CheapClone, JsString, Value};

use super::create_constructor;

pub fn init_string(interp: &mut Interpreter) {
    let proto = interp.realm.string_prototype;
    interp.register_method(proto, "toString", string_value_of, 0);
    interp.register_method(proto, "valueOf", string_value_of, 0);

    create_constructor(interp, "String", string_call, string_construct, 1, proto);
}

fn argument_string(interp: &mut Interpreter, argc: usize) -> Result<JsString, JsError> {
    if argc == 0 {
        return Ok(JsString::default());
    }
    let value = interp.arg(1);
    interp.to_js_string(&value)
}

/// `String(value)` converts to a primitive
pub fn string_call(interp: &mut Interpreter, argc: usize) -> Result<Value, JsError> {
    argument_string(interp, argc).map(Value::String)
}

/// `new String(value)` makes a wrapper
pub fn string_construct(interp: &mut Interpreter, argc: usize) -> Result<Value, JsError> {
    let s = argument_string(interp, argc)?;
    let proto = interp.realm.string_prototype;
    Ok(Value::Object(interp.create_object_with_class(ObjectClass::String(s), proto)))
}

/// String.prototype.toString() and valueOf()
pub fn string_value_of(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let s = match interp.this_value() {
        Value::String(s) => Some(s),
        Value::Object(id) => match interp.heap.class(id) {
            Some(ObjectClass::String(s)) => Some(s.cheap_clone()),
            _ => None,
        },
        _ => None,
    };
    match s {
        Some(s) => Ok(Value::String(s)),
        None => Err(interp.type_error("not a string")),
    }
}
