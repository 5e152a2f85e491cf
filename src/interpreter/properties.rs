//! Property access with class-specific behaviour, scope-chain variable
//! access, and `for-in` enumeration.

use rustc_hash::FxHashSet;

use crate::error::JsError;
use crate::gc::ObjectId;
use crate::object::{Environment, ForInIterator, JsObject, MAX_PROTOTYPE_CHAIN, ObjectClass};
use crate::property::PropertyFlags;
use crate::value::{CheapClone, JsString, Value, array_index, to_uint32};

use super::Interpreter;

impl Interpreter {
    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// `object[name]`, walking the prototype chain.
    pub fn get_property(&mut self, object: ObjectId, name: &str) -> Result<Value, JsError> {
        if let Some(value) = self.virtual_property(object, name) {
            return Ok(value);
        }
        Ok(self.lookup_value(object, name))
    }

    /// Properties computed from the class payload rather than stored.
    fn virtual_property(&self, object: ObjectId, name: &str) -> Option<Value> {
        match self.heap.class(object)? {
            ObjectClass::Array { length } if name == "length" => Some(Value::from(*length)),
            ObjectClass::String(s) => string_property(s, name),
            _ => None,
        }
    }

    /// Property read on any value; primitives read through their prototype.
    pub fn get_value_property(&mut self, target: &Value, name: &JsString) -> Result<Value, JsError> {
        let proto = match target {
            Value::Object(id) => return self.get_property(*id, name.as_str()),
            Value::String(s) => {
                if let Some(value) = string_property(s, name.as_str()) {
                    return Ok(value);
                }
                self.realm.string_prototype
            }
            Value::Number(_) => self.realm.number_prototype,
            Value::Boolean(_) => self.realm.boolean_prototype,
            Value::Undefined | Value::Null => {
                let message = format!("cannot read property '{}' of {:?}", name, target);
                return Err(self.type_error(message));
            }
        };
        Ok(self.lookup_value(proto, name.as_str()))
    }

    pub fn has_own_property(&self, object: ObjectId, name: &str) -> bool {
        self.virtual_property(object, name).is_some() || self.heap.lookup_own(object, name).is_some()
    }

    /// The `in` test: own or inherited.
    pub fn has_property(&self, object: ObjectId, name: &str) -> bool {
        let mut current = Some(object);
        for _ in 0..MAX_PROTOTYPE_CHAIN {
            let Some(id) = current else { return false };
            if self.has_own_property(id, name) {
                return true;
            }
            current = self.heap.object(id).and_then(|o| o.prototype);
        }
        false
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// `target[name] = value`
    pub fn set_value_property(&mut self, target: &Value, name: &JsString, value: Value) -> Result<(), JsError> {
        match target {
            Value::Object(id) => self.set_property(*id, name, value),
            Value::Undefined | Value::Null => {
                let message = format!("cannot set property '{}' of {:?}", name, target);
                Err(self.type_error(message))
            }
            // Writes to a temporary wrapper are lost
            _ => Ok(()),
        }
    }

    /// Assignment to an object property. Read-only properties, own or
    /// inherited, silently keep their value.
    pub fn set_property(&mut self, object: ObjectId, name: &JsString, value: Value) -> Result<(), JsError> {
        let array_length = match self.heap.class(object) {
            Some(ObjectClass::Array { length }) => Some(*length),
            Some(ObjectClass::String(s)) => {
                if string_property(s, name.as_str()).is_some() {
                    return Ok(());
                }
                None
            }
            Some(_) => None,
            None => return Ok(()),
        };

        if let Some(length) = array_length {
            if name.as_str() == "length" {
                return self.set_array_length(object, &value);
            }
            if let Some(index) = array_index(name.as_str()) {
                if index >= length {
                    if let Some(ObjectClass::Array { length }) =
                        self.heap.object_mut(object).map(|o| &mut o.class)
                    {
                        *length = index + 1;
                    }
                }
            }
        }

        if let Some(writable) = self.heap.lookup_own(object, name.as_str()).map(|p| p.flags.writable()) {
            if writable {
                if let Some(property) = self
                    .heap
                    .object_mut(object)
                    .and_then(|o| o.properties.get_mut(name.as_str()))
                {
                    property.value = value;
                }
            }
            return Ok(());
        }

        let inherited_readonly = self
            .heap
            .object(object)
            .and_then(|o| o.prototype)
            .and_then(|proto| self.heap.lookup_inherited(proto, name.as_str()))
            .is_some_and(|(_, property)| !property.flags.writable());
        let extensible = self.heap.object(object).is_some_and(|o| o.extensible);
        if inherited_readonly || !extensible {
            return Ok(());
        }

        if let Some((property, _)) = self.heap.upsert(object, name) {
            property.value = value;
            property.flags = PropertyFlags::DEFAULT;
        }
        Ok(())
    }

    fn set_array_length(&mut self, object: ObjectId, value: &Value) -> Result<(), JsError> {
        let requested = self.to_number(value)?;
        let new_length = to_uint32(requested);
        if f64::from(new_length) != requested {
            return Err(self.range_error("invalid array length"));
        }
        let Some(array) = self.heap.object_mut(object) else {
            return Ok(());
        };
        let truncated: Vec<JsString> = array
            .properties
            .iter()
            .filter(|p| array_index(p.name.as_str()).is_some_and(|i| i >= new_length))
            .map(|p| p.name.cheap_clone())
            .collect();
        for name in truncated {
            array.properties.remove(name.as_str());
        }
        if let ObjectClass::Array { length } = &mut array.class {
            *length = new_length;
        }
        Ok(())
    }

    /// `delete object[name]`; false only for non-configurable properties.
    pub fn delete_property(&mut self, object: ObjectId, name: &str) -> bool {
        if self.virtual_property(object, name).is_some() {
            return false;
        }
        let Some(property) = self.heap.lookup_own(object, name) else {
            return true;
        };
        if !property.flags.configurable() {
            return false;
        }
        if let Some(obj) = self.heap.object_mut(object) {
            obj.properties.remove(name);
        }
        true
    }

    /// `delete target[name]` on any value.
    pub(crate) fn delete_value_property(&mut self, target: &Value, name: &str) -> Result<bool, JsError> {
        match target {
            Value::Object(id) => Ok(self.delete_property(*id, name)),
            Value::String(s) => Ok(string_property(s, name).is_none()),
            Value::Undefined | Value::Null => {
                let message = format!("cannot delete property '{}' of {:?}", name, target);
                Err(self.type_error(message))
            }
            _ => Ok(true),
        }
    }

    // ------------------------------------------------------------------------
    // Scope chain
    // ------------------------------------------------------------------------

    /// Innermost scope object holding `name` as an own property.
    fn resolve(&self, name: &str) -> Option<ObjectId> {
        let mut env = Some(self.env);
        while let Some(id) = env {
            let Environment { variables, outer } = *self.heap.env(id)?;
            if self.has_own_property(variables, name) {
                return Some(variables);
            }
            env = outer;
        }
        None
    }

    /// Read a variable; `None` when the name is unbound.
    pub(crate) fn get_var(&mut self, name: &JsString) -> Result<Option<Value>, JsError> {
        match self.resolve(name.as_str()) {
            Some(scope) => self.get_property(scope, name.as_str()).map(Some),
            None => Ok(None),
        }
    }

    /// Assign a variable; unbound names become global properties.
    pub(crate) fn set_var(&mut self, name: &JsString, value: Value) -> Result<(), JsError> {
        let scope = self.resolve(name.as_str()).unwrap_or(self.realm.global);
        self.set_property(scope, name, value)
    }

    fn current_variables(&self) -> Option<ObjectId> {
        self.heap.env(self.env).map(|env| env.variables)
    }

    /// `var name`: bind to undefined unless already bound in this scope.
    pub(crate) fn declare_var(&mut self, name: &JsString) {
        let Some(variables) = self.current_variables() else { return };
        if let Some((property, created)) = self.heap.upsert(variables, name) {
            if created {
                property.flags = PropertyFlags::PERMANENT;
            }
        }
    }

    /// Bind `name` in the current scope, overwriting any existing value.
    pub(crate) fn init_var(&mut self, name: &JsString, value: Value) {
        let Some(variables) = self.current_variables() else { return };
        if let Some((property, created)) = self.heap.upsert(variables, name) {
            property.value = value;
            if created {
                property.flags = PropertyFlags::PERMANENT;
            }
        }
    }

    /// `delete name`
    pub(crate) fn delete_var(&mut self, name: &JsString) -> bool {
        match self.resolve(name.as_str()) {
            Some(scope) => self.delete_property(scope, name.as_str()),
            None => true,
        }
    }

    /// Enter a scope whose variables are `variables`.
    pub(crate) fn push_scope(&mut self, variables: ObjectId) {
        let env = self.heap.alloc_env(Environment {
            variables,
            outer: Some(self.env),
        });
        self.env = env;
    }

    pub(crate) fn pop_scope(&mut self) {
        if let Some(outer) = self.heap.env(self.env).and_then(|env| env.outer) {
            self.env = outer;
        }
    }

    // ------------------------------------------------------------------------
    // for-in
    // ------------------------------------------------------------------------

    /// Snapshot of the enumerable names of `target` and its prototypes.
    /// A name seen on a more-derived object hides the same name further up,
    /// whether or not the derived one is enumerable.
    pub(crate) fn create_iterator(&mut self, target: &Value) -> Result<ObjectId, JsError> {
        let object = match target {
            Value::Undefined | Value::Null => None,
            other => Some(self.to_object(other)?),
        };

        let mut names = Vec::new();
        let mut seen: FxHashSet<JsString> = FxHashSet::default();
        let mut current = object;
        for _ in 0..MAX_PROTOTYPE_CHAIN {
            let Some(id) = current else { break };
            let Some(obj) = self.heap.object(id) else { break };

            if let ObjectClass::String(s) = &obj.class {
                for index in 0..s.char_len() {
                    let name = JsString::from(index.to_string());
                    if seen.insert(name.cheap_clone()) {
                        names.push(name);
                    }
                }
            }
            for property in obj.properties.iter() {
                if seen.insert(property.name.cheap_clone()) && property.flags.enumerable() {
                    names.push(property.name.cheap_clone());
                }
            }
            current = obj.prototype;
        }

        let iterator = JsObject::new(
            ObjectClass::Iterator(ForInIterator {
                target: object,
                names,
                next: 0,
            }),
            None,
        );
        Ok(self.heap.alloc_object(iterator))
    }

    /// Next name still present on the target, advancing the iterator.
    pub(crate) fn next_iterator_name(&mut self, iterator: ObjectId) -> Option<JsString> {
        loop {
            let (name, target) = match self.heap.class(iterator)? {
                ObjectClass::Iterator(state) => (state.names.get(state.next)?.cheap_clone(), state.target),
                _ => return None,
            };
            if let Some(ObjectClass::Iterator(state)) = self.heap.object_mut(iterator).map(|o| &mut o.class) {
                state.next += 1;
            }
            // Skip names deleted since the snapshot
            if target.is_some_and(|t| self.has_property(t, name.as_str())) {
                return Some(name);
            }
        }
    }
}

/// `length` and index reads on a string.
fn string_property(s: &JsString, name: &str) -> Option<Value> {
    if name == "length" {
        return Some(Value::from(s.char_len() as u32));
    }
    let index = array_index(name)?;
    s.as_str()
        .chars()
        .nth(index as usize)
        .map(|c| Value::from(c.to_string()))
}
