//! Function calls and construction
//!
//! A call works on a window of the value stack: `[callee, this, args…]`.
//! The callee's `this` sits at `base` and its arguments follow, so natives
//! and closures read them in place through `Interpreter::arg`. When the call
//! returns, the whole window is replaced by the result.

use crate::error::{FatalError, JsError};
use crate::gc::{FunctionId, ObjectId};
use crate::object::{Closure, Environment, JsObject, NativeFn, ObjectClass};
use crate::property::PropertyFlags;
use crate::value::{CheapClone, Value};

use super::{CallFrame, Interpreter};

/// What a callee turned out to be
enum Callee {
    Closure(Closure),
    Native(NativeFn),
}

impl Interpreter {
    fn callee(&self, value: &Value) -> Option<Callee> {
        let Value::Object(id) = value else { return None };
        match self.heap.class(*id)? {
            ObjectClass::Function(closure) => Some(Callee::Closure(*closure)),
            ObjectClass::Native(native) => Some(Callee::Native(native.call)),
            _ => None,
        }
    }

    /// `[fn, this, arg1..argN] → [result]`
    pub(crate) fn call_value(&mut self, argc: usize) -> Result<(), JsError> {
        let Some(fn_index) = self.stack.len().checked_sub(argc + 2) else {
            return Err(self.fatal(FatalError::StackUnderflow));
        };
        let callee = self.stack.get(fn_index).cloned().unwrap_or_default();

        let global = self.realm.global;
        if let Some(this) = self.stack.get_mut(fn_index + 1) {
            if this.is_nullish() {
                *this = Value::Object(global);
            }
        }

        match self.callee(&callee) {
            Some(Callee::Closure(closure)) => self.call_closure(closure, fn_index, argc),
            Some(Callee::Native(call)) => self.call_native(call, fn_index, argc),
            None => Err(self.not_callable(&callee, "function")),
        }
    }

    #[inline(never)]
    fn not_callable(&mut self, callee: &Value, what: &str) -> JsError {
        let message = format!("{} is not a {}", self.type_of(callee), what);
        self.type_error(message)
    }

    fn enter_frame(&mut self, frame: CallFrame, fn_index: usize, argc: usize) -> Result<(), JsError> {
        if self.frames.len() >= self.config.max_call_depth {
            return Err(self.fatal(FatalError::CallDepthExceeded));
        }
        self.frames.push(frame);
        self.base = fn_index + 1;
        self.argc = argc;
        Ok(())
    }

    /// Pop the current frame, restore the caller and replace the call
    /// window with `result`.
    fn leave_frame(&mut self, fn_index: usize, result: Result<Value, JsError>) -> Result<(), JsError> {
        self.drop_unwind_points(self.frames.len());
        if let Some(frame) = self.frames.pop() {
            self.env = frame.saved_env;
            self.base = frame.saved_base;
            self.argc = frame.saved_argc;
        }
        self.stack.truncate(fn_index);
        let value = result?;
        self.push(value)
    }

    fn caller_frame(&self, function: Option<FunctionId>) -> CallFrame {
        CallFrame {
            function,
            saved_env: self.env,
            saved_base: self.base,
            saved_argc: self.argc,
            completion: Value::Undefined,
        }
    }

    fn call_closure(&mut self, closure: Closure, fn_index: usize, argc: usize) -> Result<(), JsError> {
        let frame = self.caller_frame(Some(closure.function));
        self.enter_frame(frame, fn_index, argc)?;
        let result = match self.activate(closure, fn_index, argc) {
            Ok(()) => self.execute(closure.function),
            Err(error) => Err(error),
        };
        self.leave_frame(fn_index, result)
    }

    /// Point `env` at the callee's scope. Scripts run directly in the scope
    /// they were loaded into; functions get a fresh activation.
    #[inline(never)]
    fn activate(&mut self, closure: Closure, fn_index: usize, argc: usize) -> Result<(), JsError> {
        let (params, script, uses_arguments) = match self.heap.function(closure.function) {
            Some(f) => (f.params.clone(), f.script, f.uses_arguments),
            None => return Err(self.fatal(FatalError::InvalidJump(0))),
        };
        if script {
            self.env = closure.scope;
            return Ok(());
        }

        let activation = self.heap.alloc_object(JsObject::new(ObjectClass::Object, None));
        self.env = self.heap.alloc_env(Environment {
            variables: activation,
            outer: Some(closure.scope),
        });
        if uses_arguments {
            let arguments = self.create_arguments(fn_index, argc);
            let name = self.intern("arguments");
            self.define_property_key(activation, name, Value::Object(arguments), PropertyFlags::PERMANENT);
        }
        for (i, param) in params.iter().enumerate() {
            let value = self.arg(i + 1);
            self.define_property_key(activation, param.cheap_clone(), value, PropertyFlags::PERMANENT);
        }
        Ok(())
    }

    /// The `arguments` object of the call whose window starts at `fn_index`.
    fn create_arguments(&mut self, fn_index: usize, argc: usize) -> ObjectId {
        let proto = self.realm.object_prototype;
        let arguments = self.create_object_with_class(ObjectClass::Arguments, proto);
        for i in 0..argc {
            let name = self.intern_index(i as u32);
            let value = self.arg(i + 1);
            self.define_property_key(arguments, name, value, PropertyFlags::DEFAULT);
        }
        self.define_property(arguments, "length", Value::from(argc as u32), PropertyFlags::HIDDEN);
        let callee = self.stack.get(fn_index).cloned().unwrap_or_default();
        self.define_property(arguments, "callee", callee, PropertyFlags::HIDDEN);
        arguments
    }

    fn call_native(&mut self, call: NativeFn, fn_index: usize, argc: usize) -> Result<(), JsError> {
        let frame = self.caller_frame(None);
        self.enter_frame(frame, fn_index, argc)?;
        let result = call(self, argc);
        self.leave_frame(fn_index, result)
    }

    /// `[ctor, arg1..argN] → [object]`
    pub(crate) fn construct_value(&mut self, argc: usize) -> Result<(), JsError> {
        let Some(fn_index) = self.stack.len().checked_sub(argc + 1) else {
            return Err(self.fatal(FatalError::StackUnderflow));
        };
        let constructor = self.stack.get(fn_index).cloned().unwrap_or_default();
        let class = match &constructor {
            Value::Object(id) => self.heap.class(*id).cloned(),
            _ => None,
        };

        match class {
            Some(ObjectClass::Native(native)) => {
                let Some(construct) = native.construct else {
                    let message = format!("{} is not a constructor", native.name);
                    return Err(self.type_error(message));
                };
                self.insert(fn_index + 1, Value::Undefined)?;
                self.call_native(construct, fn_index, argc)
            }
            Some(ObjectClass::Function(closure)) => {
                let prototype = match &constructor {
                    Value::Object(id) => self.get_property(*id, "prototype")?,
                    _ => Value::Undefined,
                };
                let prototype = prototype.as_object().unwrap_or(self.realm.object_prototype);
                let object = self.create_object_with_class(ObjectClass::Object, prototype);
                self.insert(fn_index + 1, Value::Object(object))?;
                self.call_closure(closure, fn_index, argc)?;
                if !self.peek(0)?.is_object() {
                    self.replace_top(Value::Object(object))?;
                }
                Ok(())
            }
            _ => Err(self.not_callable(&constructor, "constructor")),
        }
    }

    /// Call `function` with an explicit `this` and arguments.
    pub fn call_function(&mut self, function: Value, this: Value, args: &[Value]) -> Result<Value, JsError> {
        let top = self.stack.len();
        let result = self.push_call(function, this, args).and_then(|()| self.call_value(args.len()));
        if let Err(error) = result {
            self.stack.truncate(top);
            return Err(error);
        }
        self.pop()
    }

    fn push_call(&mut self, function: Value, this: Value, args: &[Value]) -> Result<(), JsError> {
        self.push(function)?;
        self.push(this)?;
        for arg in args {
            self.push(arg.clone())?;
        }
        Ok(())
    }
}
