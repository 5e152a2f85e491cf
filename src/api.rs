//! Host API: a stack-oriented interface for embedding the runtime.
//!
//! Hosts and native functions exchange values through the interpreter's
//! value stack. Stack indices are relative: a non-negative index counts from
//! the current frame base (inside a native, 0 is `this` and 1.. are the
//! arguments), a negative index counts from the top (-1 is the top).
//!
//! Values held in Rust variables are not GC roots. Anything that must
//! survive the next script call belongs on the stack.
//!
//! # Example
//!
//! ```ignore
//! use stackjs::Interpreter;
//!
//! let mut interp = Interpreter::new();
//! interp.do_string("init.js", "var greeting = 'hello, ' + 'world'")?;
//! interp.pop()?;
//!
//! interp.get_global("greeting")?;
//! assert_eq!(interp.to_string_at(-1)?.as_str(), "hello, world");
//! ```

use rustc_hash::FxHashSet;

use crate::error::{FatalError, JsError};
use crate::gc::ObjectId;
use crate::interpreter::Interpreter;
use crate::object::{NativeFn, ObjectClass};
use crate::property::PropertyFlags;
use crate::value::{JsString, Value, to_uint32};

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════════════
    // Stack slots
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Absolute stack position of a relative index.
    fn slot(&self, idx: isize) -> Option<usize> {
        let position = if idx < 0 {
            self.stack.len().checked_sub(idx.unsigned_abs())?
        } else {
            self.base.checked_add(idx.unsigned_abs())?
        };
        (position < self.stack.len()).then_some(position)
    }

    /// Number of slots above the current frame base.
    pub fn top(&self) -> usize {
        self.stack.len().saturating_sub(self.base)
    }

    /// The value at `idx`; undefined when out of range.
    pub fn get(&self, idx: isize) -> Value {
        self.slot(idx)
            .and_then(|position| self.stack.get(position))
            .cloned()
            .unwrap_or_default()
    }

    /// Push a copy of the value at `idx`.
    pub fn copy(&mut self, idx: isize) -> Result<(), JsError> {
        let value = self.get(idx);
        self.push(value)
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Push
    // ═══════════════════════════════════════════════════════════════════════════════

    pub fn push_undefined(&mut self) -> Result<(), JsError> {
        self.push(Value::Undefined)
    }

    pub fn push_null(&mut self) -> Result<(), JsError> {
        self.push(Value::Null)
    }

    pub fn push_boolean(&mut self, value: bool) -> Result<(), JsError> {
        self.push(Value::Boolean(value))
    }

    pub fn push_number(&mut self, value: f64) -> Result<(), JsError> {
        self.push(Value::Number(value))
    }

    pub fn push_string(&mut self, value: &str) -> Result<(), JsError> {
        self.push(Value::from(value))
    }

    pub fn push_value(&mut self, value: Value) -> Result<(), JsError> {
        self.push(value)
    }

    pub fn push_global(&mut self) -> Result<(), JsError> {
        self.push(Value::Object(self.realm.global))
    }

    pub fn push_new_object(&mut self) -> Result<(), JsError> {
        let object = self.create_object();
        self.push(Value::Object(object))
    }

    pub fn push_new_array(&mut self) -> Result<(), JsError> {
        let array = self.create_array(Vec::new());
        self.push(Value::Object(array))
    }

    /// Push a host function. It reads its arguments with `arg(i)`.
    ///
    /// ```ignore
    /// fn add(interp: &mut Interpreter, _argc: usize) -> Result<Value, JsError> {
    ///     let a = interp.arg(1).to_number_primitive();
    ///     let b = interp.arg(2).to_number_primitive();
    ///     Ok(Value::Number(a + b))
    /// }
    ///
    /// interp.push_native_function("add", add, 2)?;
    /// interp.set_global("add")?;
    /// ```
    pub fn push_native_function(&mut self, name: &str, call: NativeFn, length: u32) -> Result<(), JsError> {
        let function = self.create_native_function(name, call, None, length);
        self.push(Value::Object(function))
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Inspect
    // ═══════════════════════════════════════════════════════════════════════════════

    pub fn is_undefined(&self, idx: isize) -> bool {
        matches!(self.get(idx), Value::Undefined)
    }

    pub fn is_null(&self, idx: isize) -> bool {
        matches!(self.get(idx), Value::Null)
    }

    pub fn is_boolean(&self, idx: isize) -> bool {
        matches!(self.get(idx), Value::Boolean(_))
    }

    pub fn is_number(&self, idx: isize) -> bool {
        matches!(self.get(idx), Value::Number(_))
    }

    pub fn is_string(&self, idx: isize) -> bool {
        matches!(self.get(idx), Value::String(_))
    }

    pub fn is_object(&self, idx: isize) -> bool {
        matches!(self.get(idx), Value::Object(_))
    }

    pub fn is_callable(&self, idx: isize) -> bool {
        self.heap.is_callable(&self.get(idx))
    }

    pub fn to_boolean_at(&self, idx: isize) -> bool {
        self.get(idx).to_boolean()
    }

    /// ToNumber of the value at `idx`; may run `valueOf`.
    pub fn to_number_at(&mut self, idx: isize) -> Result<f64, JsError> {
        let value = self.get(idx);
        self.to_number(&value)
    }

    /// ToString of the value at `idx`; may run `toString`.
    pub fn to_string_at(&mut self, idx: isize) -> Result<JsString, JsError> {
        let value = self.get(idx);
        self.to_js_string(&value)
    }

    /// The `length` of the value at `idx`, for hosts walking arrays.
    pub fn length_at(&mut self, idx: isize) -> Result<u32, JsError> {
        let target = self.get(idx);
        let name = self.intern("length");
        let length = self.get_value_property(&target, &name)?;
        Ok(to_uint32(self.to_number(&length)?))
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Properties
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Push `stack[idx][name]`.
    pub fn get_property_at(&mut self, idx: isize, name: &str) -> Result<(), JsError> {
        let target = self.get(idx);
        let name = self.intern(name);
        let value = self.get_value_property(&target, &name)?;
        self.push(value)
    }

    /// Pop a value and store it as `stack[idx][name]`. `idx` is resolved
    /// before the pop.
    pub fn set_property_at(&mut self, idx: isize, name: &str) -> Result<(), JsError> {
        let target = self.get(idx);
        let name = self.intern(name);
        let value = self.peek(0)?.clone();
        self.set_value_property(&target, &name, value)?;
        self.pop()?;
        Ok(())
    }

    pub fn has_property_at(&mut self, idx: isize, name: &str) -> bool {
        match self.get(idx) {
            Value::Object(id) => self.has_property(id, name),
            _ => false,
        }
    }

    pub fn delete_property_at(&mut self, idx: isize, name: &str) -> Result<bool, JsError> {
        let target = self.get(idx);
        self.delete_value_property(&target, name)
    }

    /// Push the global `name`.
    pub fn get_global(&mut self, name: &str) -> Result<(), JsError> {
        let global = self.realm.global;
        let value = self.get_property(global, name)?;
        self.push(value)
    }

    /// Pop a value into the global `name`.
    pub fn set_global(&mut self, name: &str) -> Result<(), JsError> {
        let global = self.realm.global;
        let name = self.intern(name);
        let value = self.peek(0)?.clone();
        self.set_property(global, &name, value)?;
        self.pop()?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════════════

    /// `[fn, this, arg1..argN] → [result]`. On error the call window is
    /// dropped.
    pub fn call(&mut self, argc: usize) -> Result<(), JsError> {
        let window = self.stack.len().saturating_sub(argc + 2);
        self.call_value(argc).inspect_err(|_| self.stack.truncate(window))
    }

    /// `[ctor, arg1..argN] → [object]`
    pub fn construct(&mut self, argc: usize) -> Result<(), JsError> {
        let window = self.stack.len().saturating_sub(argc + 1);
        self.construct_value(argc).inspect_err(|_| self.stack.truncate(window))
    }

    /// Protected call: like `call`, but a script error replaces the window
    /// with the error value and returns `Ok(false)`. Fatal errors still
    /// return `Err`.
    pub fn pcall(&mut self, argc: usize) -> Result<bool, JsError> {
        let window = self.stack.len().saturating_sub(argc + 2);
        match self.call_value(argc) {
            Ok(()) => Ok(true),
            Err(error) => {
                self.stack.truncate(window);
                if error.is_fatal() {
                    return Err(error);
                }
                let value = self.error_value(&error);
                self.push(value)?;
                Ok(false)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Load and run
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Compile `source` and push it as a callable script closure.
    pub fn load_string(&mut self, filename: &str, source: &str) -> Result<(), JsError> {
        let function = self.compile(filename, source)?;
        let scope = self.realm.global_env;
        let closure = self.create_closure(function, scope)?;
        self.push(Value::Object(closure))
    }

    /// Compile and run `source`, leaving the completion value on the stack.
    /// On failure the error value is left there instead and the error is
    /// returned.
    pub fn do_string(&mut self, filename: &str, source: &str) -> Result<(), JsError> {
        if let Err(error) = self.load_string(filename, source) {
            let value = self.error_value(&error);
            self.push(value)?;
            return Err(error);
        }
        self.push_undefined()?;
        match self.pcall(0) {
            Ok(true) => Ok(()),
            Ok(false) => Err(JsError::Thrown(self.get(-1))),
            Err(error) => {
                let value = self.error_value(&error);
                self.push(value)?;
                Err(error)
            }
        }
    }

    /// Run `source` and return its completion value.
    ///
    /// The returned value is not rooted; push it back before running more
    /// code if it must stay alive.
    pub fn eval(&mut self, source: &str) -> Result<Value, JsError> {
        let result = self.do_string("<eval>", source);
        let value = self.pop()?;
        result.map(|()| value)
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // JSON conversion
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Push a JSON document as script values.
    pub fn push_json(&mut self, json: &serde_json::Value) -> Result<(), JsError> {
        let value = self.json_to_value(json);
        self.push(value)
    }

    fn json_to_value(&mut self, json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => {
                let elements = items.iter().map(|item| self.json_to_value(item)).collect();
                Value::Object(self.create_array(elements))
            }
            serde_json::Value::Object(map) => {
                let object = self.create_object();
                for (key, item) in map {
                    let value = self.json_to_value(item);
                    self.define_property(object, key, value, PropertyFlags::DEFAULT);
                }
                Value::Object(object)
            }
        }
    }

    /// Serialize the value at `idx` the way `JSON.stringify` would:
    /// functions and undefined are dropped from objects and become null in
    /// arrays, non-finite numbers become null, cycles are a TypeError.
    pub fn to_json(&mut self, idx: isize) -> Result<serde_json::Value, JsError> {
        let value = self.get(idx);
        let mut path = FxHashSet::default();
        let json = self.value_to_json(&value, &mut path)?;
        Ok(json.unwrap_or(serde_json::Value::Null))
    }

    fn value_to_json(
        &mut self,
        value: &Value,
        path: &mut FxHashSet<ObjectId>,
    ) -> Result<Option<serde_json::Value>, JsError> {
        Ok(Some(match value {
            Value::Undefined => return Ok(None),
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Object(id) => {
                if self.heap.is_callable(value) {
                    return Ok(None);
                }
                if path.len() >= self.config.max_call_depth {
                    return Err(self.fatal(FatalError::CallDepthExceeded));
                }
                if !path.insert(*id) {
                    return Err(self.type_error("cyclic object value"));
                }
                let json = self.object_to_json(*id, path);
                path.remove(id);
                json?
            }
        }))
    }

    fn object_to_json(&mut self, id: ObjectId, path: &mut FxHashSet<ObjectId>) -> Result<serde_json::Value, JsError> {
        match self.heap.class(id) {
            Some(ObjectClass::Boolean(b)) => return Ok(serde_json::Value::Bool(*b)),
            Some(ObjectClass::Number(n)) => return Ok(number_to_json(*n)),
            Some(ObjectClass::String(s)) => return Ok(serde_json::Value::String(s.to_string())),
            Some(ObjectClass::Array { length }) => {
                let length = *length;
                if length > MAX_JSON_ARRAY_LENGTH {
                    return Err(self.range_error("array too long to convert to JSON"));
                }
                let mut items = Vec::new();
                for i in 0..length {
                    let key = self.intern_index(i);
                    let element = self.get_property(id, key.as_str())?;
                    let item = self.value_to_json(&element, path)?;
                    items.push(item.unwrap_or(serde_json::Value::Null));
                }
                return Ok(serde_json::Value::Array(items));
            }
            _ => {}
        }

        let names: Vec<JsString> = self
            .heap
            .object(id)
            .map(|object| {
                object
                    .properties
                    .iter()
                    .filter(|p| p.flags.enumerable())
                    .map(|p| p.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        let mut map = serde_json::Map::new();
        for name in names {
            let property = self.get_property(id, name.as_str())?;
            if let Some(item) = self.value_to_json(&property, path)? {
                map.insert(name.to_string(), item);
            }
        }
        Ok(serde_json::Value::Object(map))
    }
}

/// Longest array `to_json` will expand; `length` alone can claim 2^32 - 1.
const MAX_JSON_ARRAY_LENGTH: u32 = 1 << 20;

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 && !(n == 0.0 && n.is_sign_negative()) {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}
