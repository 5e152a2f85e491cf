//! Error constructors and Error.prototype.toString

use crate::error::JsError;
use crate::interpreter::{ErrorKind, Interpreter};
use crate::object::{NativeFn, ObjectClass};
use crate::property::PropertyFlags;
use crate::value::Value;

use super::create_constructor;

/// Constructors indexed like `ErrorKind::ALL`
const CONSTRUCTORS: [NativeFn; 7] = [
    error_constructor::<0>,
    error_constructor::<1>,
    error_constructor::<2>,
    error_constructor::<3>,
    error_constructor::<4>,
    error_constructor::<5>,
    error_constructor::<6>,
];

/// Install `Error` and its six native subtypes.
pub fn init_error(interp: &mut Interpreter) {
    for (kind, constructor) in ErrorKind::ALL.into_iter().zip(CONSTRUCTORS) {
        let proto = interp.realm.error_prototype(kind);
        interp.define_property(proto, "name", Value::from(kind.name()), PropertyFlags::HIDDEN);
        interp.define_property(proto, "message", Value::from(""), PropertyFlags::HIDDEN);
        create_constructor(interp, kind.name(), constructor, constructor, 1, proto);
    }
    let base = interp.realm.error_prototype(ErrorKind::Error);
    interp.register_method(base, "toString", error_to_string, 0);
}

/// `Error(message)` and `new Error(message)` both build a fresh error.
pub fn error_constructor<const KIND: usize>(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let kind = ErrorKind::ALL.get(KIND).copied().unwrap_or(ErrorKind::Error);
    let proto = interp.realm.error_prototype(kind);
    let message = match interp.arg(1) {
        Value::Undefined => None,
        other => Some(interp.to_js_string(&other)?),
    };
    let error = interp.create_object_with_class(ObjectClass::Error, proto);
    if let Some(message) = message {
        interp.define_property(error, "message", Value::String(message), PropertyFlags::HIDDEN);
    }
    Ok(Value::Object(error))
}

/// Error.prototype.toString(): `name: message`, dropping empty parts.
pub fn error_to_string(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let Value::Object(this) = interp.this_value() else {
        return Err(interp.type_error("Error.prototype.toString called on a non-object"));
    };
    let name = match interp.get_property(this, "name")? {
        Value::Undefined => "Error".to_string(),
        other => interp.to_js_string(&other)?.to_string(),
    };
    let message = match interp.get_property(this, "message")? {
        Value::Undefined => String::new(),
        other => interp.to_js_string(&other)?.to_string(),
    };
    let text = match (name.is_empty(), message.is_empty()) {
        (true, _) => message,
        (false, true) => name,
        (false, false) => format!("{}: {}", name, message),
    };
    Ok(Value::from(text))
}
