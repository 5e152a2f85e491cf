//! Bytecode virtual machine
//!
//! A fetch/dispatch loop over `Op`. Operands live on the shared value stack;
//! operators read them in place and only pop once the result is ready, so a
//! collection triggered by a nested call still sees them as roots.
//!
//! Calls recurse through `call_value` → `execute`, a few small Rust frames
//! per script call. A throw is caught here when the innermost unwind point belongs to
//! the running frame; otherwise it propagates as `Err` to the caller.

use std::cmp::Ordering;

use crate::compiler::{ConstantIndex, Op};
use crate::error::{FatalError, JsError};
use crate::gc::{FunctionId, ObjectId};
use crate::object::{JsObject, ObjectClass};
use crate::property::PropertyFlags;
use crate::value::{CheapClone, JsString, Value, to_int32};

use super::Interpreter;
use super::operations::{ShiftOp, js_mod};

/// What the loop does after an instruction
enum Flow {
    Next,
    Jump(usize),
    Return(Value),
}

impl Interpreter {
    /// Run `function` in the current frame until it returns.
    pub(crate) fn execute(&mut self, function: FunctionId) -> Result<Value, JsError> {
        let mut ip = 0;
        loop {
            if self.heap.should_collect() {
                self.collect_garbage();
            }

            let op = match self.heap.function(function).and_then(|f| f.code.get(ip)) {
                Some(op) => *op,
                None => return Err(self.fatal(FatalError::InvalidJump(ip))),
            };

            // Calls bypass `execute_op` so its frame is not held across the
            // callee's `execute`.
            let flow = match op {
                Op::Call { argc } => self.call_value(usize::from(argc)).map(|()| Flow::Next),
                Op::New { argc } => self.construct_value(usize::from(argc)).map(|()| Flow::Next),
                _ => self.execute_op(function, ip, op),
            };
            match flow {
                Ok(Flow::Next) => ip += 1,
                Ok(Flow::Jump(target)) => ip = target,
                Ok(Flow::Return(value)) => return Ok(value),
                Err(JsError::Thrown(exception)) => ip = self.unwind(exception)?,
                Err(error) => return Err(error),
            }
        }
    }

    fn constant_string(&self, function: FunctionId, index: ConstantIndex, ip: usize) -> Result<JsString, JsError> {
        match self.heap.function(function).and_then(|f| f.string(index)) {
            Some(s) => Ok(s.cheap_clone()),
            None => Err(self.fatal(FatalError::InvalidJump(ip))),
        }
    }

    fn top_object(&self, depth: usize) -> Result<ObjectId, JsError> {
        match self.peek(depth)? {
            Value::Object(id) => Ok(*id),
            _ => Err(self.fatal(FatalError::StackUnderflow)),
        }
    }

    /// `a → op(a)`
    fn unary(&mut self, op: impl FnOnce(&mut Self, &Value) -> Result<Value, JsError>) -> Result<Flow, JsError> {
        let a = self.peek(0)?.clone();
        let result = op(self, &a)?;
        self.replace_top(result)?;
        Ok(Flow::Next)
    }

    /// `a b → op(a, b)`
    fn binary(
        &mut self,
        op: impl FnOnce(&mut Self, &Value, &Value) -> Result<Value, JsError>,
    ) -> Result<Flow, JsError> {
        let b = self.peek(0)?.clone();
        let a = self.peek(1)?.clone();
        let result = op(self, &a, &b)?;
        self.pop_n::<2>()?;
        self.push(result)?;
        Ok(Flow::Next)
    }

    fn relational(&mut self, test: fn(Ordering) -> bool) -> Result<Flow, JsError> {
        self.binary(|interp, a, b| {
            let ordering = interp.compare_values(a, b)?;
            Ok(Value::Boolean(ordering.is_some_and(test)))
        })
    }

    #[inline(never)]
    fn execute_op(&mut self, function: FunctionId, ip: usize, op: Op) -> Result<Flow, JsError> {
        match op {
            // ═══════════════════════════════════════════════════════════════════════════
            // Stack shuffling
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Pop => {
                self.pop()?;
            }
            Op::Dup => {
                let value = self.peek(0)?.clone();
                self.push(value)?;
            }
            Op::Dup2 => {
                let a = self.peek(1)?.clone();
                let b = self.peek(0)?.clone();
                self.push(a)?;
                self.push(b)?;
            }
            Op::Rot2 => self.rotate(1)?,
            Op::Rot3 => self.rotate(2)?,
            Op::Rot4 => self.rotate(3)?,

            // ═══════════════════════════════════════════════════════════════════════════
            // Constants
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Undefined => self.push(Value::Undefined)?,
            Op::Null => self.push(Value::Null)?,
            Op::True => self.push(Value::Boolean(true))?,
            Op::False => self.push(Value::Boolean(false))?,
            Op::This => {
                let this = self.this_value();
                self.push(this)?;
            }
            Op::Integer { value } => self.push(Value::from(value))?,
            Op::Number { index } => {
                let number = self
                    .heap
                    .function(function)
                    .and_then(|f| f.numbers.get(usize::from(index)).copied());
                match number {
                    Some(n) => self.push(Value::Number(n))?,
                    None => return Err(self.fatal(FatalError::InvalidJump(ip))),
                }
            }
            Op::String { index } => {
                let s = self.constant_string(function, index, ip)?;
                self.push(Value::String(s))?;
            }
            Op::Closure { index } => {
                let nested = self
                    .heap
                    .function(function)
                    .and_then(|f| f.functions.get(usize::from(index)).copied());
                let Some(nested) = nested else {
                    return Err(self.fatal(FatalError::InvalidJump(ip)));
                };
                let closure = self.create_closure(nested, self.env)?;
                self.push(Value::Object(closure))?;
            }

            // ═══════════════════════════════════════════════════════════════════════════
            // Object and array literals
            // ═══════════════════════════════════════════════════════════════════════════
            Op::NewObject => {
                let object = self.create_object();
                self.push(Value::Object(object))?;
            }
            Op::NewArray => {
                let array = self.create_array(Vec::new());
                self.push(Value::Object(array))?;
            }
            Op::InitProp { name } => {
                let name = self.constant_string(function, name, ip)?;
                let object = self.top_object(1)?;
                let value = self.pop()?;
                self.define_property_key(object, name, value, PropertyFlags::DEFAULT);
            }
            Op::InitArray => {
                let array = self.top_object(1)?;
                let length = match self.heap.class(array) {
                    Some(ObjectClass::Array { length }) => *length,
                    _ => 0,
                };
                let value = self.pop()?;
                let key = self.intern_index(length);
                self.set_property(array, &key, value)?;
            }

            // ═══════════════════════════════════════════════════════════════════════════
            // Scope
            // ═══════════════════════════════════════════════════════════════════════════
            Op::DeclareVar { name } => {
                let name = self.constant_string(function, name, ip)?;
                self.declare_var(&name);
            }
            Op::InitVar { name } => {
                let name = self.constant_string(function, name, ip)?;
                let value = self.pop()?;
                self.init_var(&name, value);
            }
            Op::GetVar { name } => {
                let name = self.constant_string(function, name, ip)?;
                match self.get_var(&name)? {
                    Some(value) => self.push(value)?,
                    None => return Err(self.reference_error(format!("'{}' is not defined", name))),
                }
            }
            Op::TryGetVar { name } => {
                let name = self.constant_string(function, name, ip)?;
                let value = self.get_var(&name)?.unwrap_or_default();
                self.push(value)?;
            }
            Op::SetVar { name } => {
                let name = self.constant_string(function, name, ip)?;
                let value = self.peek(0)?.clone();
                self.set_var(&name, value)?;
            }
            Op::DelVar { name } => {
                let name = self.constant_string(function, name, ip)?;
                let deleted = self.delete_var(&name);
                self.push(Value::Boolean(deleted))?;
            }

            // ═══════════════════════════════════════════════════════════════════════════
            // Properties
            // ═══════════════════════════════════════════════════════════════════════════
            Op::GetProp => {
                return self.binary(|interp, target, key| {
                    let name = interp.to_property_key(key)?;
                    interp.get_value_property(target, &name)
                });
            }
            Op::GetPropName { name } => {
                let name = self.constant_string(function, name, ip)?;
                return self.unary(|interp, target| interp.get_value_property(target, &name));
            }
            Op::SetProp => {
                let target = self.peek(2)?.clone();
                let key = self.peek(1)?.clone();
                let value = self.peek(0)?.clone();
                let name = self.to_property_key(&key)?;
                self.set_value_property(&target, &name, value.clone())?;
                self.pop_n::<3>()?;
                self.push(value)?;
            }
            Op::SetPropName { name } => {
                let name = self.constant_string(function, name, ip)?;
                let target = self.peek(1)?.clone();
                let value = self.peek(0)?.clone();
                self.set_value_property(&target, &name, value.clone())?;
                self.pop_n::<2>()?;
                self.push(value)?;
            }
            Op::DelProp => {
                return self.binary(|interp, target, key| {
                    let name = interp.to_property_key(key)?;
                    interp.delete_value_property(target, name.as_str()).map(Value::Boolean)
                });
            }
            Op::DelPropName { name } => {
                let name = self.constant_string(function, name, ip)?;
                return self.unary(|interp, target| {
                    interp.delete_value_property(target, name.as_str()).map(Value::Boolean)
                });
            }

            // ═══════════════════════════════════════════════════════════════════════════
            // Calls
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Call { argc } => self.call_value(usize::from(argc))?,
            Op::New { argc } => self.construct_value(usize::from(argc))?,

            // ═══════════════════════════════════════════════════════════════════════════
            // Unary operators
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Typeof => {
                return self.unary(|interp, a| Ok(Value::from(interp.type_of(a))));
            }
            Op::Pos => return self.unary(|interp, a| Ok(Value::Number(interp.to_number(a)?))),
            Op::Neg => return self.unary(|interp, a| Ok(Value::Number(-interp.to_number(a)?))),
            Op::BitNot => return self.unary(|interp, a| Ok(Value::from(!to_int32(interp.to_number(a)?)))),
            Op::LogNot => return self.unary(|_, a| Ok(Value::Boolean(!a.to_boolean()))),
            Op::Inc => return self.unary(|interp, a| Ok(Value::Number(interp.to_number(a)? + 1.0))),
            Op::Dec => return self.unary(|interp, a| Ok(Value::Number(interp.to_number(a)? - 1.0))),

            // ═══════════════════════════════════════════════════════════════════════════
            // Binary operators
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Add => return self.binary(|interp, a, b| interp.add_values(a, b)),
            Op::Sub => return self.binary(|interp, a, b| interp.numeric_op(a, b, |x, y| x - y)),
            Op::Mul => return self.binary(|interp, a, b| interp.numeric_op(a, b, |x, y| x * y)),
            Op::Div => return self.binary(|interp, a, b| interp.numeric_op(a, b, |x, y| x / y)),
            Op::Mod => return self.binary(|interp, a, b| interp.numeric_op(a, b, js_mod)),
            Op::Shl => return self.binary(|interp, a, b| interp.shift_op(a, b, ShiftOp::Left)),
            Op::Shr => return self.binary(|interp, a, b| interp.shift_op(a, b, ShiftOp::Right)),
            Op::Ushr => return self.binary(|interp, a, b| interp.shift_op(a, b, ShiftOp::UnsignedRight)),
            Op::BitAnd => return self.binary(|interp, a, b| interp.int32_op(a, b, |x, y| x & y)),
            Op::BitXor => return self.binary(|interp, a, b| interp.int32_op(a, b, |x, y| x ^ y)),
            Op::BitOr => return self.binary(|interp, a, b| interp.int32_op(a, b, |x, y| x | y)),
            Op::Lt => return self.relational(Ordering::is_lt),
            Op::Gt => return self.relational(Ordering::is_gt),
            Op::Le => return self.relational(Ordering::is_le),
            Op::Ge => return self.relational(Ordering::is_ge),
            Op::Eq => return self.binary(|interp, a, b| interp.loose_equals(a, b).map(Value::Boolean)),
            Op::Ne => return self.binary(|interp, a, b| Ok(Value::Boolean(!interp.loose_equals(a, b)?))),
            Op::StrictEq => return self.binary(|_, a, b| Ok(Value::Boolean(a.strict_equals(b)))),
            Op::StrictNe => return self.binary(|_, a, b| Ok(Value::Boolean(!a.strict_equals(b)))),
            Op::In => return self.binary(|interp, a, b| interp.has_in(a, b).map(Value::Boolean)),
            Op::Instanceof => {
                return self.binary(|interp, a, b| interp.instance_of(a, b).map(Value::Boolean));
            }

            // ═══════════════════════════════════════════════════════════════════════════
            // Enumeration and scope objects
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Iterator => {
                return self.unary(|interp, target| interp.create_iterator(target).map(Value::Object));
            }
            Op::NextIter { target } => {
                let iterator = self.top_object(0)?;
                match self.next_iterator_name(iterator) {
                    Some(name) => self.push(Value::String(name))?,
                    None => {
                        self.pop()?;
                        return Ok(Flow::Jump(target as usize));
                    }
                }
            }
            Op::With => {
                let target = self.peek(0)?.clone();
                let object = self.to_object(&target)?;
                self.push_scope(object);
                self.pop()?;
            }
            Op::EndWith | Op::EndCatch => self.pop_scope(),

            // ═══════════════════════════════════════════════════════════════════════════
            // Exceptions
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Try { target } => {
                self.push_unwind_point(ip + 1)?;
                return Ok(Flow::Jump(target as usize));
            }
            Op::EndTry => {
                self.tries.pop();
            }
            Op::Catch { name } => {
                let name = self.constant_string(function, name, ip)?;
                let exception = self.peek(0)?.clone();
                let scope = self.heap.alloc_object(JsObject::new(ObjectClass::Object, None));
                self.define_property_key(scope, name, exception, PropertyFlags::PERMANENT);
                self.push_scope(scope);
                self.pop()?;
            }
            Op::Throw => {
                let exception = self.pop()?;
                return Err(JsError::Thrown(exception));
            }

            // ═══════════════════════════════════════════════════════════════════════════
            // Control flow
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Jump { target } => return Ok(Flow::Jump(target as usize)),
            Op::JumpIfTrue { target } => {
                if self.pop()?.to_boolean() {
                    return Ok(Flow::Jump(target as usize));
                }
            }
            Op::JumpIfFalse { target } => {
                if !self.pop()?.to_boolean() {
                    return Ok(Flow::Jump(target as usize));
                }
            }
            Op::JumpCase { target } => {
                let case = self.pop()?;
                if self.peek(0)?.strict_equals(&case) {
                    self.pop()?;
                    return Ok(Flow::Jump(target as usize));
                }
            }
            Op::StoreCompletion => {
                let value = self.pop()?;
                if let Some(frame) = self.frames.last_mut() {
                    frame.completion = value;
                }
            }
            Op::LoadCompletion => {
                let value = self.frames.last().map(|f| f.completion.clone()).unwrap_or_default();
                self.push(value)?;
            }
            Op::Return => return Ok(Flow::Return(self.pop()?)),
            Op::Debugger => {
                if let Some(f) = self.heap.function(function) {
                    tracing::debug!(
                        target: "stackjs::vm",
                        file = %f.file,
                        line = f.line_at(ip),
                        ip,
                        "debugger statement"
                    );
                }
            }
        }
        Ok(Flow::Next)
    }
}
