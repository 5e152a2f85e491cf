//! Object model
//!
//! Every object-like entity is a `JsObject`: a class tag with its payload,
//! an ordered property tree, an optional prototype and an extensible flag.
//! Scope chains are made of `Environment` links whose variables live in
//! ordinary objects.

use crate::error::JsError;
use crate::gc::{EnvId, FunctionId, Heap, ObjectId, Trace, Tracer};
use crate::interpreter::Interpreter;
use crate::property::{Property, PropertyTree};
use crate::value::{JsString, Value};

/// Prototype chains longer than this are treated as "not found".
pub const MAX_PROTOTYPE_CHAIN: usize = 1024;

/// Signature of a host or built-in function.
///
/// Arguments are read through `Interpreter::arg`; slot 0 is `this`.
pub type NativeFn = fn(&mut Interpreter, usize) -> Result<Value, JsError>;

/// A compiled function paired with the scope it closes over.
#[derive(Debug, Clone, Copy)]
pub struct Closure {
    pub function: FunctionId,
    pub scope: EnvId,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub call: NativeFn,
    /// Behaviour under `new`; `None` means not a constructor.
    pub construct: Option<NativeFn>,
    pub length: u32,
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// State of a `for-in` enumeration.
#[derive(Debug, Clone)]
pub struct ForInIterator {
    /// The object being enumerated, used to skip names deleted mid-loop
    pub target: Option<ObjectId>,
    pub names: Vec<JsString>,
    pub next: usize,
}

/// Class tag plus per-class payload
#[derive(Debug, Clone)]
pub enum ObjectClass {
    Object,
    Array { length: u32 },
    Function(Closure),
    Native(NativeFunction),
    Error,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Arguments,
    Iterator(ForInIterator),
}

impl ObjectClass {
    /// The `[[Class]]` name reported by `Object.prototype.toString`.
    pub fn name(&self) -> &'static str {
        match self {
            ObjectClass::Object => "Object",
            ObjectClass::Array { .. } => "Array",
            ObjectClass::Function(_) | ObjectClass::Native(_) => "Function",
            ObjectClass::Error => "Error",
            ObjectClass::Boolean(_) => "Boolean",
            ObjectClass::Number(_) => "Number",
            ObjectClass::String(_) => "String",
            ObjectClass::Arguments => "Arguments",
            ObjectClass::Iterator(_) => "Iterator",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, ObjectClass::Function(_) | ObjectClass::Native(_))
    }
}

#[derive(Debug, Clone)]
pub struct JsObject {
    pub class: ObjectClass,
    pub properties: PropertyTree,
    pub prototype: Option<ObjectId>,
    pub extensible: bool,
}

impl JsObject {
    pub fn new(class: ObjectClass, prototype: Option<ObjectId>) -> Self {
        Self {
            class,
            properties: PropertyTree::new(),
            prototype,
            extensible: true,
        }
    }
}

impl Trace for JsObject {
    fn trace(&self, tracer: &mut Tracer) {
        if let Some(proto) = self.prototype {
            tracer.object(proto);
        }
        for property in self.properties.iter() {
            tracer.value(&property.value);
        }
        match &self.class {
            ObjectClass::Function(closure) => {
                tracer.function(closure.function);
                tracer.env(closure.scope);
            }
            ObjectClass::Iterator(iter) => {
                if let Some(target) = iter.target {
                    tracer.object(target);
                }
            }
            _ => {}
        }
    }
}

/// One link of a scope chain.
#[derive(Debug, Clone, Copy)]
pub struct Environment {
    pub variables: ObjectId,
    pub outer: Option<EnvId>,
}

impl Trace for Environment {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.object(self.variables);
        if let Some(outer) = self.outer {
            tracer.env(outer);
        }
    }
}

// ============================================================================
// Property lookup over the heap
// ============================================================================

impl Heap {
    /// Own property of `object`.
    pub fn lookup_own(&self, object: ObjectId, name: &str) -> Option<&Property> {
        self.object(object)?.properties.get(name)
    }

    /// First property named `name` on `object` or its prototype chain,
    /// with the object that holds it.
    pub fn lookup_inherited(&self, object: ObjectId, name: &str) -> Option<(ObjectId, &Property)> {
        let mut current = Some(object);
        for _ in 0..MAX_PROTOTYPE_CHAIN {
            let id = current?;
            let obj = self.object(id)?;
            if let Some(property) = obj.properties.get(name) {
                return Some((id, property));
            }
            current = obj.prototype;
        }
        None
    }

    /// Find-or-create an own property. `None` only for a dead handle.
    pub fn upsert(&mut self, object: ObjectId, name: &JsString) -> Option<(&mut Property, bool)> {
        let obj = self.object_mut(object)?;
        Some(obj.properties.upsert(name))
    }

    /// True when `proto` appears on the prototype chain of `object`
    /// (excluding `object` itself).
    pub fn has_in_prototype_chain(&self, object: ObjectId, proto: ObjectId) -> bool {
        let mut current = self.object(object).and_then(|o| o.prototype);
        for _ in 0..MAX_PROTOTYPE_CHAIN {
            match current {
                Some(id) if id == proto => return true,
                Some(id) => current = self.object(id).and_then(|o| o.prototype),
                None => return false,
            }
        }
        false
    }

    pub fn class(&self, object: ObjectId) -> Option<&ObjectClass> {
        self.object(object).map(|o| &o.class)
    }

    pub fn is_callable(&self, value: &Value) -> bool {
        match value {
            Value::Object(id) => self.class(*id).is_some_and(ObjectClass::is_callable),
            _ => false,
        }
    }
}
