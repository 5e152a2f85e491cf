//! Array constructor and Array.prototype methods

use crate::error::JsError;
use crate::gc::ObjectId;
use crate::interpreter::Interpreter;
use crate::value::{Value, to_uint32};

use super::create_constructor;

pub fn init_array(interp: &mut Interpreter) {
    let proto = interp.realm.array_prototype;
    interp.register_method(proto, "push", array_push, 1);
    interp.register_method(proto, "join", array_join, 1);
    interp.register_method(proto, "toString", array_to_string, 0);

    create_constructor(interp, "Array", array_constructor, array_constructor, 1, proto);
}

/// `Array(n)` makes an empty array of length `n`; any other argument list
/// becomes the elements.
pub fn array_constructor(interp: &mut Interpreter, argc: usize) -> Result<Value, JsError> {
    if argc == 1 {
        if let Value::Number(n) = interp.arg(1) {
            let length = to_uint32(n);
            if f64::from(length) != n {
                return Err(interp.range_error("invalid array length"));
            }
            let array = interp.create_array(Vec::new());
            let key = interp.intern("length");
            interp.set_property(array, &key, Value::from(length))?;
            return Ok(Value::Object(array));
        }
    }
    let elements = (1..=argc).map(|i| interp.arg(i)).collect();
    Ok(Value::Object(interp.create_array(elements)))
}

fn this_object(interp: &mut Interpreter) -> Result<ObjectId, JsError> {
    let this = interp.this_value();
    interp.to_object(&this)
}

fn length_of(interp: &mut Interpreter, object: ObjectId) -> Result<u32, JsError> {
    let length = interp.get_property(object, "length")?;
    Ok(to_uint32(interp.to_number(&length)?))
}

/// Array.prototype.push(...items)
pub fn array_push(interp: &mut Interpreter, argc: usize) -> Result<Value, JsError> {
    let object = this_object(interp)?;
    let mut length = length_of(interp, object)?;
    for i in 1..=argc {
        let value = interp.arg(i);
        let key = interp.intern_index(length);
        interp.set_property(object, &key, value)?;
        length += 1;
    }
    let key = interp.intern("length");
    interp.set_property(object, &key, Value::from(length))?;
    Ok(Value::from(length))
}

/// Array.prototype.join(separator)
pub fn array_join(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let separator = match interp.arg(1) {
        Value::Undefined => ",".to_string(),
        other => interp.to_js_string(&other)?.to_string(),
    };
    join(interp, &separator)
}

/// Array.prototype.toString()
pub fn array_to_string(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    join(interp, ",")
}

fn join(interp: &mut Interpreter, separator: &str) -> Result<Value, JsError> {
    let object = this_object(interp)?;
    let length = length_of(interp, object)?;
    let mut out = String::new();
    for i in 0..length {
        if i > 0 {
            out.push_str(separator);
        }
        let element = interp.get_property(object, &i.to_string())?;
        if !element.is_nullish() {
            out.push_str(interp.to_js_string(&element)?.as_str());
        }
    }
    Ok(Value::from(out))
}
