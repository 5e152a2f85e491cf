//! The interpreter: realm, heap, value stack and the execution state shared
//! by the bytecode VM and the host API.

pub mod builtins;
mod bytecode_vm;
mod call;
mod operations;
mod properties;
mod stack;

pub use stack::{CallFrame, UnwindPoint};

use crate::compiler::compile_script;
use crate::config::RuntimeConfig;
use crate::error::{FatalError, JsError};
use crate::gc::{EnvId, FunctionId, GcStats, Heap, ObjectId, Trace, Tracer};
use crate::object::{Closure, Environment, JsObject, NativeFn, NativeFunction, ObjectClass};
use crate::parser::parse;
use crate::property::PropertyFlags;
use crate::string_dict::StringDict;
use crate::value::{CheapClone, JsString, Value};

/// The native error constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    URIError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Error,
        ErrorKind::EvalError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::TypeError,
        ErrorKind::URIError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::URIError => "URIError",
        }
    }
}

/// Built-in prototypes plus the global object and scope.
///
/// Everything here is a permanent GC root.
pub struct Realm {
    pub object_prototype: ObjectId,
    pub function_prototype: ObjectId,
    pub array_prototype: ObjectId,
    pub boolean_prototype: ObjectId,
    pub number_prototype: ObjectId,
    pub string_prototype: ObjectId,
    /// Indexed like `ErrorKind::ALL`
    pub error_prototypes: [ObjectId; 7],
    pub global: ObjectId,
    pub global_env: EnvId,
}

impl Realm {
    fn new(heap: &mut Heap) -> Self {
        let object_prototype = heap.alloc_object(JsObject::new(ObjectClass::Object, None));
        let function_prototype = heap.alloc_object(JsObject::new(
            ObjectClass::Native(NativeFunction {
                name: JsString::default(),
                call: builtins::function::function_prototype_call,
                construct: None,
                length: 0,
            }),
            Some(object_prototype),
        ));
        let mut derived = |class: ObjectClass| heap.alloc_object(JsObject::new(class, Some(object_prototype)));
        let array_prototype = derived(ObjectClass::Array { length: 0 });
        let boolean_prototype = derived(ObjectClass::Boolean(false));
        let number_prototype = derived(ObjectClass::Number(0.0));
        let string_prototype = derived(ObjectClass::String(JsString::default()));
        let error_base = derived(ObjectClass::Error);

        let mut error_prototypes = [error_base; 7];
        for slot in error_prototypes.iter_mut().skip(1) {
            *slot = heap.alloc_object(JsObject::new(ObjectClass::Error, Some(error_base)));
        }

        let global = heap.alloc_object(JsObject::new(ObjectClass::Object, Some(object_prototype)));
        let global_env = heap.alloc_env(Environment {
            variables: global,
            outer: None,
        });

        Self {
            object_prototype,
            function_prototype,
            array_prototype,
            boolean_prototype,
            number_prototype,
            string_prototype,
            error_prototypes,
            global,
            global_env,
        }
    }

    pub fn error_prototype(&self, kind: ErrorKind) -> ObjectId {
        let index = ErrorKind::ALL.iter().position(|k| *k == kind).unwrap_or(0);
        self.error_prototypes.get(index).copied().unwrap_or(self.object_prototype)
    }
}

impl Trace for Realm {
    fn trace(&self, tracer: &mut Tracer) {
        for id in [
            self.object_prototype,
            self.function_prototype,
            self.array_prototype,
            self.boolean_prototype,
            self.number_prototype,
            self.string_prototype,
            self.global,
        ] {
            tracer.object(id);
        }
        for id in self.error_prototypes {
            tracer.object(id);
        }
        tracer.env(self.global_env);
    }
}

/// One runtime instance. Single-threaded; every piece of state lives here.
pub struct Interpreter {
    pub(crate) heap: Heap,
    pub(crate) realm: Realm,
    pub(crate) strings: StringDict,
    pub(crate) config: RuntimeConfig,

    /// Value stack shared by all active calls
    pub(crate) stack: Vec<Value>,
    /// Active calls, innermost last
    pub(crate) frames: Vec<CallFrame>,
    /// Active try blocks, innermost last
    pub(crate) tries: Vec<UnwindPoint>,

    /// Current scope
    pub(crate) env: EnvId,
    /// Stack index of the current frame's `this`
    pub(crate) base: usize,
    /// Argument count of the current frame
    pub(crate) argc: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut heap = Heap::new(config.gc_threshold);
        let realm = Realm::new(&mut heap);
        let env = realm.global_env;
        let mut interp = Self {
            heap,
            realm,
            strings: StringDict::with_common_strings(),
            stack: Vec::with_capacity(config.stack_size.min(1024)),
            frames: Vec::new(),
            tries: Vec::new(),
            env,
            base: 0,
            argc: 0,
            config,
        };
        builtins::install(&mut interp);
        interp
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn global(&self) -> ObjectId {
        self.realm.global
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Intern a name through the string dictionary
    pub fn intern(&mut self, s: &str) -> JsString {
        self.strings.get_or_insert(s)
    }

    /// The interned name of array element `index`
    pub fn intern_index(&mut self, index: u32) -> JsString {
        self.strings.index(index)
    }

    /// Parse and compile a script without running it.
    pub fn compile(&mut self, file: &str, source: &str) -> Result<FunctionId, JsError> {
        let file = self.intern(file);
        let max_depth = self.config.max_syntax_depth;
        let program = parse(source, &file, &mut self.strings, max_depth)?;
        compile_script(&mut self.heap, &program, &file, max_depth)
    }

    // ------------------------------------------------------------------------
    // Object creation
    // ------------------------------------------------------------------------

    pub fn create_object(&mut self) -> ObjectId {
        let proto = self.realm.object_prototype;
        self.heap.alloc_object(JsObject::new(ObjectClass::Object, Some(proto)))
    }

    pub fn create_object_with_class(&mut self, class: ObjectClass, proto: ObjectId) -> ObjectId {
        self.heap.alloc_object(JsObject::new(class, Some(proto)))
    }

    pub fn create_array(&mut self, elements: Vec<Value>) -> ObjectId {
        let proto = self.realm.array_prototype;
        let mut array = JsObject::new(
            ObjectClass::Array {
                length: elements.len() as u32,
            },
            Some(proto),
        );
        for (index, value) in (0u32..).zip(elements) {
            let key = self.intern_index(index);
            array.properties.insert(key, value, PropertyFlags::DEFAULT);
        }
        self.heap.alloc_object(array)
    }

    pub fn create_native_function(
        &mut self,
        name: &str,
        call: NativeFn,
        construct: Option<NativeFn>,
        length: u32,
    ) -> ObjectId {
        let name = self.intern(name);
        let proto = self.realm.function_prototype;
        let function = self.heap.alloc_object(JsObject::new(
            ObjectClass::Native(NativeFunction {
                name,
                call,
                construct,
                length,
            }),
            Some(proto),
        ));
        self.define_property(function, "length", Value::from(length), PropertyFlags::READONLY);
        function
    }

    /// Create a closure over `function` in `scope`, with its own
    /// `prototype` object for use as a constructor.
    pub(crate) fn create_closure(&mut self, function: FunctionId, scope: EnvId) -> Result<ObjectId, JsError> {
        let (name, length, named_expression) = match self.heap.function(function) {
            Some(f) => (f.name.cheap_clone(), f.params.len() as u32, f.named_expression),
            None => return Err(self.type_error("dead function reference")),
        };

        // A named function expression sees its own name in a scope of its own
        let scope = if named_expression {
            let variables = self.heap.alloc_object(JsObject::new(ObjectClass::Object, None));
            self.heap.alloc_env(Environment {
                variables,
                outer: Some(scope),
            })
        } else {
            scope
        };

        let function_prototype = self.realm.function_prototype;
        let closure = self.heap.alloc_object(JsObject::new(
            ObjectClass::Function(Closure { function, scope }),
            Some(function_prototype),
        ));

        if named_expression {
            if let Some(env) = self.heap.env(scope).copied() {
                self.define_property_key(env.variables, name, Value::Object(closure), PropertyFlags::READONLY);
            }
        }

        let prototype = self.create_object();
        self.define_property(prototype, "constructor", Value::Object(closure), PropertyFlags::HIDDEN);
        self.define_property(
            closure,
            "prototype",
            Value::Object(prototype),
            PropertyFlags::new(true, false, false),
        );
        self.define_property(closure, "length", Value::from(length), PropertyFlags::READONLY);
        Ok(closure)
    }

    /// Define (or overwrite) an own property, ignoring attributes.
    pub fn define_property(&mut self, object: ObjectId, name: &str, value: Value, flags: PropertyFlags) {
        let name = self.intern(name);
        self.define_property_key(object, name, value, flags);
    }

    pub(crate) fn define_property_key(&mut self, object: ObjectId, name: JsString, value: Value, flags: PropertyFlags) {
        if let Some(obj) = self.heap.object_mut(object) {
            obj.properties.insert(name, value, flags);
        }
    }

    /// Install a native method as a hidden property of `object`.
    pub fn register_method(&mut self, object: ObjectId, name: &str, call: NativeFn, length: u32) {
        let function = self.create_native_function(name, call, None, length);
        self.define_property(object, name, Value::Object(function), PropertyFlags::HIDDEN);
    }

    // ------------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------------

    /// Build an error object of the given kind.
    pub fn create_error(&mut self, kind: ErrorKind, message: &str) -> ObjectId {
        let proto = self.realm.error_prototype(kind);
        let error = self.heap.alloc_object(JsObject::new(ObjectClass::Error, Some(proto)));
        self.define_property(error, "message", Value::from(message), PropertyFlags::HIDDEN);
        error
    }

    /// An error object of the given kind, ready to be thrown.
    pub fn throw_error(&mut self, kind: ErrorKind, message: impl AsRef<str>) -> JsError {
        JsError::Thrown(Value::Object(self.create_error(kind, message.as_ref())))
    }

    pub fn type_error(&mut self, message: impl AsRef<str>) -> JsError {
        self.throw_error(ErrorKind::TypeError, message)
    }

    pub fn reference_error(&mut self, message: impl AsRef<str>) -> JsError {
        self.throw_error(ErrorKind::ReferenceError, message)
    }

    pub fn range_error(&mut self, message: impl AsRef<str>) -> JsError {
        self.throw_error(ErrorKind::RangeError, message)
    }

    /// Turn any error into a script value: compile errors become
    /// `SyntaxError` objects, fatal errors plain `Error` objects.
    pub fn error_value(&mut self, error: &JsError) -> Value {
        match error {
            JsError::Thrown(value) => value.clone(),
            JsError::SyntaxError { message, location } => {
                let text = format!("{} ({})", message, location);
                Value::Object(self.create_error(ErrorKind::SyntaxError, &text))
            }
            JsError::Fatal(fatal) => Value::Object(self.create_error(ErrorKind::Error, &fatal.to_string())),
        }
    }

    /// Render an error as `<name>: <message>`.
    pub fn error_to_string(&mut self, error: &JsError) -> String {
        match error {
            JsError::Thrown(value) => self.describe_error_value(value),
            other => other.to_string(),
        }
    }

    fn describe_error_value(&mut self, value: &Value) -> String {
        let Value::Object(id) = value else {
            return value.to_string_primitive().to_string();
        };
        let name = self.lookup_value(*id, "name");
        let message = self.lookup_value(*id, "message");
        let name = if name.is_undefined() {
            "Error".to_string()
        } else {
            name.to_string_primitive().to_string()
        };
        let message = if message.is_undefined() {
            String::new()
        } else {
            message.to_string_primitive().to_string()
        };
        match (name.is_empty(), message.is_empty()) {
            (true, _) => message,
            (false, true) => name,
            (false, false) => format!("{}: {}", name, message),
        }
    }

    /// Inherited data lookup without conversions or side effects.
    pub(crate) fn lookup_value(&self, object: ObjectId, name: &str) -> Value {
        self.heap
            .lookup_inherited(object, name)
            .map(|(_, property)| property.value.clone())
            .unwrap_or_default()
    }

    pub(crate) fn fatal(&self, error: FatalError) -> JsError {
        tracing::warn!(target: "stackjs::vm", error = %error, frames = self.frames.len(), "fatal VM condition");
        JsError::Fatal(error)
    }

    // ------------------------------------------------------------------------
    // Garbage collection
    // ------------------------------------------------------------------------

    /// Run a full collection now. Returns the number of slots freed.
    pub fn collect_garbage(&mut self) -> usize {
        let Self {
            heap,
            realm,
            stack,
            frames,
            tries,
            env,
            ..
        } = self;
        heap.collect(|tracer| {
            realm.trace(tracer);
            tracer.env(*env);
            for value in stack.iter() {
                tracer.value(value);
            }
            for frame in frames.iter() {
                frame.trace(tracer);
            }
            for point in tries.iter() {
                tracer.env(point.env);
            }
        })
    }

    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    pub fn gc_threshold(&self) -> usize {
        self.heap.gc_threshold()
    }

    /// Set the allocation threshold (0 = disable automatic collection)
    pub fn set_gc_threshold(&mut self, threshold: usize) {
        self.config.gc_threshold = threshold;
        self.heap.set_gc_threshold(threshold);
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
