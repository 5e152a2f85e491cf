//! Built-in constructors and prototype methods
//!
//! Only what the core needs: conversions go through `valueOf`/`toString`,
//! runtime errors are instances of the error constructors, and `instanceof`
//! needs real `prototype` links.

pub mod array;
pub mod boolean;
pub mod error;
pub mod function;
pub mod global;
pub mod number;
pub mod object;
pub mod string;

use crate::gc::ObjectId;
use crate::object::NativeFn;
use crate::property::PropertyFlags;
use crate::value::Value;

use super::Interpreter;

/// Populate the realm's prototypes and the global object.
pub fn install(interp: &mut Interpreter) {
    object::init_object(interp);
    function::init_function(interp);
    array::init_array(interp);
    boolean::init_boolean(interp);
    number::init_number(interp);
    string::init_string(interp);
    error::init_error(interp);
    global::init_globals(interp);
}

/// Create a global constructor linked both ways with `prototype`.
pub(crate) fn create_constructor(
    interp: &mut Interpreter,
    name: &str,
    call: NativeFn,
    construct: NativeFn,
    length: u32,
    prototype: ObjectId,
) -> ObjectId {
    let constructor = interp.create_native_function(name, call, Some(construct), length);
    interp.define_property(constructor, "prototype", Value::Object(prototype), PropertyFlags::READONLY);
    interp.define_property(prototype, "constructor", Value::Object(constructor), PropertyFlags::HIDDEN);
    let global = interp.global();
    interp.define_property(global, name, Value::Object(constructor), PropertyFlags::HIDDEN);
    constructor
}
