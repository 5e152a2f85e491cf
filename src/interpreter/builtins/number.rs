//! Number constructor and prototype methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::ObjectClass;
use crate::property::PropertyFlags;
use crate::value::{Value, number_to_string, to_integer};

use super::create_constructor;

pub fn init_number(interp: &mut Interpreter) {
    let proto = interp.realm.number_prototype;
    interp.register_method(proto, "toString", number_to_string_method, 1);
    interp.register_method(proto, "valueOf", number_value_of, 0);

    let constructor = create_constructor(interp, "Number", number_call, number_construct, 1, proto);
    for (name, value) in [
        ("NaN", f64::NAN),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", 5e-324),
    ] {
        interp.define_property(constructor, name, Value::Number(value), PropertyFlags::READONLY);
    }
}

fn argument_number(interp: &mut Interpreter, argc: usize) -> Result<f64, JsError> {
    if argc == 0 {
        return Ok(0.0);
    }
    let value = interp.arg(1);
    interp.to_number(&value)
}

/// `Number(value)` converts to a primitive
pub fn number_call(interp: &mut Interpreter, argc: usize) -> Result<Value, JsError> {
    argument_number(interp, argc).map(Value::Number)
}

/// `new Number(value)` makes a wrapper
pub fn number_construct(interp: &mut Interpreter, argc: usize) -> Result<Value, JsError> {
    let n = argument_number(interp, argc)?;
    let proto = interp.realm.number_prototype;
    Ok(Value::Object(interp.create_object_with_class(ObjectClass::Number(n), proto)))
}

fn this_number(interp: &mut Interpreter) -> Result<f64, JsError> {
    match interp.this_value() {
        Value::Number(n) => Ok(n),
        Value::Object(id) => match interp.heap.class(id) {
            Some(ObjectClass::Number(n)) => Ok(*n),
            _ => Err(interp.type_error("not a number")),
        },
        _ => Err(interp.type_error("not a number")),
    }
}

/// Number.prototype.toString(radix)
pub fn number_to_string_method(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    let n = this_number(interp)?;
    let radix = match interp.arg(1) {
        Value::Undefined => 10.0,
        other => to_integer(interp.to_number(&other)?),
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.range_error("toString() radix must be between 2 and 36"));
    }
    if radix == 10.0 || !n.is_finite() {
        return Ok(Value::from(number_to_string(n)));
    }
    Ok(Value::from(integer_to_radix(n, radix as u32)))
}

/// Integer part of `n` in base `radix`.
fn integer_to_radix(n: f64, radix: u32) -> String {
    let mut value = n.abs().trunc();
    let mut digits = Vec::new();
    let base = f64::from(radix);
    while value >= 1.0 {
        let digit = libm::fmod(value, base) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        value = (value / base).trunc();
    }
    if digits.is_empty() {
        digits.push('0');
    }
    if n < 0.0 && digits != ['0'] {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// Number.prototype.valueOf()
pub fn number_value_of(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    this_number(interp).map(Value::Number)
}
