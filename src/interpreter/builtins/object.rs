//! Object constructor and Object.prototype methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::value::Value;

use super::create_constructor;

pub fn init_object(interp: &mut Interpreter) {
    let proto = interp.realm.object_prototype;
    interp.register_method(proto, "toString", object_to_string, 0);
    interp.register_method(proto, "valueOf", object_value_of, 0);
    interp.register_method(proto, "hasOwnProperty", object_has_own_property, 1);

    create_constructor(interp, "Object", object_constructor, object_constructor, 1, proto);
}

/// `Object(value)` and `new Object(value)`: wrap primitives, pass objects
/// through, and make a fresh object for null or undefined.
pub fn object_constructor(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let value = interp.arg(1);
    if value.is_nullish() {
        return Ok(Value::Object(interp.create_object()));
    }
    interp.to_object(&value).map(Value::Object)
}

/// Object.prototype.toString(): `[object <Class>]`
pub fn object_to_string(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let this = interp.this_value();
    let class = match &this {
        Value::Undefined => "Undefined",
        Value::Null => "Null",
        other => {
            let object = interp.to_object(other)?;
            interp.heap.class(object).map_or("Object", |class| class.name())
        }
    };
    Ok(Value::from(format!("[object {}]", class)))
}

pub fn object_value_of(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let this = interp.this_value();
    interp.to_object(&this).map(Value::Object)
}

/// Object.prototype.hasOwnProperty(name)
pub fn object_has_own_property(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let key = interp.arg(1);
    let name = interp.to_property_key(&key)?;
    let this = interp.this_value();
    let object = interp.to_object(&this)?;
    Ok(Value::Boolean(interp.has_own_property(object, name.as_str())))
}
