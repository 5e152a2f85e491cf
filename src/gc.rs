//! Mark-and-sweep garbage collection.
//!
//! The heap owns three arenas: objects, environments and compiled functions.
//! Every slot carries a generation, so a handle to a freed slot never aliases
//! the next occupant, and a mark epoch. A collection flips the heap epoch
//! between two values; a slot is "marked this cycle" exactly when its epoch
//! equals the heap's, so no reset pass is needed before marking.
//!
//! Marking is iterative over an explicit work list. Roots are supplied by the
//! caller (the interpreter knows its stack, frames and realm); the heap only
//! knows how to follow edges through the `Trace` trait.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::compiler::Function;
use crate::object::{Environment, JsObject};
use crate::value::Value;

/// Epoch of a freshly allocated slot: matches neither marking epoch.
const UNMARKED: u8 = 0;

// ============================================================================
// Handles
// ============================================================================

/// Generational index into one of the heap arenas.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

pub type ObjectId = Handle<JsObject>;
pub type EnvId = Handle<Environment>;
pub type FunctionId = Handle<Function>;

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

// ============================================================================
// Arena
// ============================================================================

struct Slot<T> {
    generation: u32,
    epoch: u8,
    value: Option<T>,
}

/// Slot storage with a free list. Freed slots are tombstoned and reused.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Arena<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    fn insert(&mut self, value: T) -> Handle<T> {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                slot.value = Some(value);
                slot.epoch = UNMARKED;
                return Handle::new(index, slot.generation);
            }
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            epoch: UNMARKED,
            value: Some(value),
        });
        Handle::new(index, 0)
    }

    fn slot(&self, handle: Handle<T>) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slot(handle).and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live slots
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Mark a slot; returns true the first time it is reached this cycle.
    fn mark(&mut self, handle: Handle<T>, epoch: u8) -> bool {
        match self.slots.get_mut(handle.index as usize) {
            Some(slot)
                if slot.generation == handle.generation
                    && slot.value.is_some()
                    && slot.epoch != epoch =>
            {
                slot.epoch = epoch;
                true
            }
            _ => false,
        }
    }

    /// Free every live slot not marked with `epoch`. Returns the count freed.
    fn sweep(&mut self, epoch: u8) -> usize {
        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.is_some() && slot.epoch != epoch {
                slot.value = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                freed += 1;
            }
        }
        self.live -= freed;
        freed
    }
}

// ============================================================================
// Tracing
// ============================================================================

/// Implemented by everything stored in the heap: report outgoing edges.
pub trait Trace {
    fn trace(&self, tracer: &mut Tracer);
}

/// Work list of handles still to be marked.
#[derive(Default)]
pub struct Tracer {
    objects: Vec<ObjectId>,
    environments: Vec<EnvId>,
    functions: Vec<FunctionId>,
}

impl Tracer {
    pub fn object(&mut self, id: ObjectId) {
        self.objects.push(id);
    }

    pub fn env(&mut self, id: EnvId) {
        self.environments.push(id);
    }

    pub fn function(&mut self, id: FunctionId) {
        self.functions.push(id);
    }

    pub fn value(&mut self, value: &Value) {
        if let Value::Object(id) = value {
            self.objects.push(*id);
        }
    }

    fn clear(&mut self) {
        self.objects.clear();
        self.environments.clear();
        self.functions.clear();
    }
}

// ============================================================================
// Heap
// ============================================================================

/// Statistics about the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GcStats {
    pub objects: usize,
    pub environments: usize,
    pub functions: usize,
    /// Completed collections
    pub collections: usize,
    /// Slots freed by the most recent collection
    pub last_freed: usize,
}

pub struct Heap {
    pub objects: Arena<JsObject>,
    pub environments: Arena<Environment>,
    pub functions: Arena<Function>,
    epoch: u8,
    allocs_since_gc: usize,
    gc_threshold: usize,
    collections: usize,
    last_freed: usize,
    /// Kept between cycles to preserve capacity
    tracer: Tracer,
}

impl Heap {
    pub fn new(gc_threshold: usize) -> Self {
        Self {
            objects: Arena::new(),
            environments: Arena::new(),
            functions: Arena::new(),
            epoch: 1,
            allocs_since_gc: 0,
            gc_threshold,
            collections: 0,
            last_freed: 0,
            tracer: Tracer::default(),
        }
    }

    pub fn alloc_object(&mut self, object: JsObject) -> ObjectId {
        self.allocs_since_gc += 1;
        self.objects.insert(object)
    }

    pub fn alloc_env(&mut self, env: Environment) -> EnvId {
        self.allocs_since_gc += 1;
        self.environments.insert(env)
    }

    pub fn alloc_function(&mut self, function: Function) -> FunctionId {
        self.allocs_since_gc += 1;
        self.functions.insert(function)
    }

    pub fn object(&self, id: ObjectId) -> Option<&JsObject> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut JsObject> {
        self.objects.get_mut(id)
    }

    pub fn env(&self, id: EnvId) -> Option<&Environment> {
        self.environments.get(id)
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id)
    }

    /// Set the allocation threshold (0 = disable automatic collection)
    pub fn set_gc_threshold(&mut self, threshold: usize) {
        self.gc_threshold = threshold;
    }

    pub fn gc_threshold(&self) -> usize {
        self.gc_threshold
    }

    /// True when enough allocations happened since the last collection.
    pub fn should_collect(&self) -> bool {
        self.gc_threshold > 0 && self.allocs_since_gc >= self.gc_threshold
    }

    /// Run a full collection. `roots` seeds the work list.
    /// Returns the number of slots freed across all arenas.
    pub fn collect(&mut self, roots: impl FnOnce(&mut Tracer)) -> usize {
        self.epoch = if self.epoch == 1 { 2 } else { 1 };
        let epoch = self.epoch;

        let mut tracer = std::mem::take(&mut self.tracer);
        tracer.clear();
        roots(&mut tracer);

        tracing::debug!(
            target: "stackjs::gc",
            roots = tracer.objects.len() + tracer.environments.len() + tracer.functions.len(),
            "GC cycle starting"
        );

        loop {
            if let Some(id) = tracer.objects.pop() {
                if self.objects.mark(id, epoch) {
                    if let Some(object) = self.objects.get(id) {
                        object.trace(&mut tracer);
                    }
                }
            } else if let Some(id) = tracer.environments.pop() {
                if self.environments.mark(id, epoch) {
                    if let Some(env) = self.environments.get(id) {
                        env.trace(&mut tracer);
                    }
                }
            } else if let Some(id) = tracer.functions.pop() {
                if self.functions.mark(id, epoch) {
                    if let Some(function) = self.functions.get(id) {
                        function.trace(&mut tracer);
                    }
                }
            } else {
                break;
            }
        }
        self.tracer = tracer;

        let freed = self.objects.sweep(epoch)
            + self.environments.sweep(epoch)
            + self.functions.sweep(epoch);

        self.allocs_since_gc = 0;
        self.collections += 1;
        self.last_freed = freed;

        tracing::debug!(
            target: "stackjs::gc",
            freed,
            live_objects = self.objects.len(),
            live_environments = self.environments.len(),
            live_functions = self.functions.len(),
            "GC cycle complete"
        );
        freed
    }

    pub fn stats(&self) -> GcStats {
        GcStats {
            objects: self.objects.len(),
            environments: self.environments.len(),
            functions: self.functions.len(),
            collections: self.collections,
            last_freed: self.last_freed,
        }
    }
}
