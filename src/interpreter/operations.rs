//! Type conversions and operator semantics

use std::cmp::Ordering;

use crate::error::JsError;
use crate::gc::ObjectId;
use crate::object::ObjectClass;
use crate::value::{CheapClone, JsString, Value, number_to_string, to_int32, to_uint32};

use super::Interpreter;

/// Preferred result type for ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Number,
    String,
}

impl Interpreter {
    /// ToPrimitive: objects go through `valueOf`/`toString` in hint order.
    pub fn to_primitive(&mut self, value: &Value, hint: Hint) -> Result<Value, JsError> {
        let Value::Object(id) = value else {
            return Ok(value.clone());
        };
        let order = match hint {
            Hint::Number => ["valueOf", "toString"],
            Hint::String => ["toString", "valueOf"],
        };
        for name in order {
            let method = self.get_property(*id, name)?;
            if self.heap.is_callable(&method) {
                let result = self.call_function(method, value.clone(), &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(self.type_error("cannot convert object to primitive value"))
    }

    pub fn to_number(&mut self, value: &Value) -> Result<f64, JsError> {
        match value {
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::Number)?;
                Ok(primitive.to_number_primitive())
            }
            other => Ok(other.to_number_primitive()),
        }
    }

    pub fn to_js_string(&mut self, value: &Value) -> Result<JsString, JsError> {
        match value {
            Value::String(s) => Ok(s.cheap_clone()),
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::String)?;
                Ok(primitive.to_string_primitive())
            }
            other => Ok(other.to_string_primitive()),
        }
    }

    /// Property name for a computed key; numbers use the canonical form.
    pub fn to_property_key(&mut self, value: &Value) -> Result<JsString, JsError> {
        let key = match value {
            Value::String(s) => return Ok(s.cheap_clone()),
            Value::Number(n) => number_to_string(*n),
            other => self.to_js_string(other)?.to_string(),
        };
        Ok(self.intern(&key))
    }

    /// ToObject: primitives get a wrapper, null and undefined throw.
    pub fn to_object(&mut self, value: &Value) -> Result<ObjectId, JsError> {
        let (class, proto) = match value {
            Value::Object(id) => return Ok(*id),
            Value::Undefined | Value::Null => {
                let message = format!("cannot convert {:?} to object", value);
                return Err(self.type_error(message));
            }
            Value::Boolean(b) => (ObjectClass::Boolean(*b), self.realm.boolean_prototype),
            Value::Number(n) => (ObjectClass::Number(*n), self.realm.number_prototype),
            Value::String(s) => (ObjectClass::String(s.cheap_clone()), self.realm.string_prototype),
        };
        Ok(self.create_object_with_class(class, proto))
    }

    pub fn type_of(&self, value: &Value) -> &'static str {
        match value {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) if self.heap.is_callable(value) => "function",
            Value::Object(_) => "object",
        }
    }

    /// The `+` operator
    pub(crate) fn add_values(&mut self, a: &Value, b: &Value) -> Result<Value, JsError> {
        if let (Value::Number(x), Value::Number(y)) = (a, b) {
            return Ok(Value::Number(x + y));
        }
        let a = self.to_primitive(a, Hint::Number)?;
        let b = self.to_primitive(b, Hint::Number)?;
        if a.is_string() || b.is_string() {
            let result = a.to_string_primitive() + &b.to_string_primitive();
            return Ok(Value::String(result));
        }
        Ok(Value::Number(a.to_number_primitive() + b.to_number_primitive()))
    }

    /// Abstract equality (`==`)
    pub fn loose_equals(&mut self, a: &Value, b: &Value) -> Result<bool, JsError> {
        Ok(match (a, b) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                a.to_number_primitive() == b.to_number_primitive()
            }
            (Value::Boolean(_), _) => {
                let a = Value::Number(a.to_number_primitive());
                return self.loose_equals(&a, b);
            }
            (_, Value::Boolean(_)) => {
                let b = Value::Number(b.to_number_primitive());
                return self.loose_equals(a, &b);
            }
            (Value::Object(_), Value::Number(_) | Value::String(_)) => {
                let a = self.to_primitive(a, Hint::Number)?;
                return self.loose_equals(&a, b);
            }
            (Value::Number(_) | Value::String(_), Value::Object(_)) => {
                let b = self.to_primitive(b, Hint::Number)?;
                return self.loose_equals(a, &b);
            }
            _ => a.strict_equals(b),
        })
    }

    /// Ordering of two operands after ToPrimitive; `None` when a NaN is
    /// involved. Converts `a` before `b`.
    pub(crate) fn compare_values(&mut self, a: &Value, b: &Value) -> Result<Option<Ordering>, JsError> {
        let a = self.to_primitive(a, Hint::Number)?;
        let b = self.to_primitive(b, Hint::Number)?;
        if let (Value::String(x), Value::String(y)) = (&a, &b) {
            return Ok(Some(x.as_str().cmp(y.as_str())));
        }
        let x = a.to_number_primitive();
        let y = b.to_number_primitive();
        Ok(x.partial_cmp(&y))
    }

    /// Apply a numeric binary operator after ToNumber on both sides.
    pub(crate) fn numeric_op(
        &mut self,
        a: &Value,
        b: &Value,
        op: fn(f64, f64) -> f64,
    ) -> Result<Value, JsError> {
        let x = self.to_number(a)?;
        let y = self.to_number(b)?;
        Ok(Value::Number(op(x, y)))
    }

    pub(crate) fn int32_op(&mut self, a: &Value, b: &Value, op: fn(i32, i32) -> i32) -> Result<Value, JsError> {
        let x = to_int32(self.to_number(a)?);
        let y = to_int32(self.to_number(b)?);
        Ok(Value::from(op(x, y)))
    }

    pub(crate) fn shift_op(&mut self, a: &Value, b: &Value, op: ShiftOp) -> Result<Value, JsError> {
        let x = self.to_number(a)?;
        let count = to_uint32(self.to_number(b)?) & 31;
        Ok(match op {
            ShiftOp::Left => Value::from(to_int32(x).wrapping_shl(count)),
            ShiftOp::Right => Value::from(to_int32(x).wrapping_shr(count)),
            ShiftOp::UnsignedRight => Value::from(to_uint32(x).wrapping_shr(count)),
        })
    }

    /// `a instanceof b`
    pub(crate) fn instance_of(&mut self, a: &Value, b: &Value) -> Result<bool, JsError> {
        let Some(constructor) = b.as_object().filter(|_| self.heap.is_callable(b)) else {
            return Err(self.type_error("right-hand side of instanceof is not callable"));
        };
        let Value::Object(object) = a else {
            return Ok(false);
        };
        let prototype = self.get_property(constructor, "prototype")?;
        let Value::Object(prototype) = prototype else {
            return Err(self.type_error("function has non-object prototype in instanceof check"));
        };
        Ok(self.heap.has_in_prototype_chain(*object, prototype))
    }

    /// `a in b`
    pub(crate) fn has_in(&mut self, a: &Value, b: &Value) -> Result<bool, JsError> {
        let Value::Object(object) = b else {
            return Err(self.type_error("right-hand side of 'in' is not an object"));
        };
        let key = self.to_property_key(a)?;
        Ok(self.has_property(*object, key.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShiftOp {
    Left,
    Right,
    UnsignedRight,
}

pub(crate) fn js_mod(a: f64, b: f64) -> f64 {
    libm::fmod(a, b)
}
