//! Value properties of the global object

use crate::interpreter::Interpreter;
use crate::property::PropertyFlags;
use crate::value::Value;

pub fn init_globals(interp: &mut Interpreter) {
    let global = interp.global();
    interp.define_property(global, "NaN", Value::Number(f64::NAN), PropertyFlags::READONLY);
    interp.define_property(global, "Infinity", Value::Number(f64::INFINITY), PropertyFlags::READONLY);
    interp.define_property(global, "undefined", Value::Undefined, PropertyFlags::READONLY);
}
