//! Boolean constructor and prototype methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::ObjectClass;
use crate::value::Value;

use super::create_constructor;

pub fn init_boolean(interp: &mut Interpreter) {
    let proto = interp.realm.boolean_prototype;
    interp.register_method(proto, "toString", boolean_to_string, 0);
    interp.register_method(proto, "valueOf", boolean_value_of, 0);

    create_constructor(interp, "Boolean", boolean_call, boolean_construct, 1, proto);
}

/// `Boolean(value)` converts to a primitive
pub fn boolean_call(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    Ok(Value::Boolean(interp.arg(1).to_boolean()))
}

/// `new Boolean(value)` makes a wrapper
pub fn boolean_construct(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let value = interp.arg(1).to_boolean();
    let proto = interp.realm.boolean_prototype;
    Ok(Value::Object(interp.create_object_with_class(ObjectClass::Boolean(value), proto)))
}

fn this_boolean(interp: &mut Interpreter) -> Result<bool, JsError> {
    match interp.this_value() {
        Value::Boolean(b) => Ok(b),
        Value::Object(id) => match interp.heap.class(id) {
            Some(ObjectClass::Boolean(b)) => Ok(*b),
            _ => Err(interp.type_error("not a boolean")),
        },
        _ => Err(interp.type_error("not a boolean")),
    }
}

/// Boolean.prototype.toString()
pub fn boolean_to_string(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let b = this_boolean(interp)?;
    Ok(Value::from(if b { "true" } else { "false" }))
}

/// Boolean.prototype.valueOf()
pub fn boolean_value_of(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    this_boolean(interp).map(Value::Boolean)
}
