//! Function.prototype methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::ObjectClass;
use crate::value::{Value, to_uint32};

pub fn init_function(interp: &mut Interpreter) {
    let proto = interp.realm.function_prototype;
    interp.register_method(proto, "call", function_call, 1);
    interp.register_method(proto, "apply", function_apply, 2);
    interp.register_method(proto, "toString", function_to_string, 0);
}

/// Function.prototype is itself callable and returns undefined.
pub fn function_prototype_call(_interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    Ok(Value::Undefined)
}

/// Function.prototype.call(thisArg, ...args)
pub fn function_call(interp: &mut Interpreter, argc: usize) -> Result<Value, JsError> {
    let function = interp.this_value();
    let this = interp.arg(1);
    let args: Vec<Value> = (2..=argc).map(|i| interp.arg(i)).collect();
    interp.call_function(function, this, &args)
}

/// Function.prototype.apply(thisArg, argsArray)
pub fn function_apply(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let function = interp.this_value();
    let this = interp.arg(1);
    let args = match interp.arg(2) {
        Value::Undefined | Value::Null => Vec::new(),
        Value::Object(list) => {
            let length = interp.get_property(list, "length")?;
            let length = to_uint32(interp.to_number(&length)?) as usize;
            // callee, this and the arguments all land on the stack
            interp.ensure_stack(length.saturating_add(2))?;
            let mut args = Vec::new();
            for i in (0u32..).take(length) {
                let key = interp.intern_index(i);
                args.push(interp.get_property(list, key.as_str())?);
            }
            args
        }
        _ => return Err(interp.type_error("second argument to apply must be an array")),
    };
    interp.call_function(function, this, &args)
}

/// Function.prototype.toString()
pub fn function_to_string(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let this = interp.this_value();
    let Value::Object(id) = this else {
        return Err(interp.type_error("Function.prototype.toString called on a non-function"));
    };
    let text = match interp.heap.class(id) {
        Some(ObjectClass::Native(native)) => Some(format!("function {}() {{ [native code] }}", native.name)),
        Some(ObjectClass::Function(closure)) => {
            let name = interp
                .heap
                .function(closure.function)
                .map(|f| f.name.to_string())
                .unwrap_or_default();
            Some(format!("function {}() {{ [bytecode] }}", name))
        }
        _ => None,
    };
    let Some(text) = text else {
        return Err(interp.type_error("Function.prototype.toString called on a non-function"));
    };
    Ok(Value::from(text))
}
