//! Value stack, call frames and unwind points

use crate::error::{FatalError, JsError};
use crate::gc::{EnvId, FunctionId, Trace, Tracer};
use crate::value::Value;

use super::Interpreter;

/// State saved when a call starts, restored when it ends.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// The callee's compiled function; `None` for natives
    pub function: Option<FunctionId>,
    /// Caller scope
    pub saved_env: EnvId,
    /// Caller `this` slot
    pub saved_base: usize,
    pub saved_argc: usize,
    /// Completion value of a script body
    pub completion: Value,
}

impl Trace for CallFrame {
    fn trace(&self, tracer: &mut Tracer) {
        if let Some(function) = self.function {
            tracer.function(function);
        }
        tracer.env(self.saved_env);
        tracer.value(&self.completion);
    }
}

/// Where a `throw` resumes, and the state to restore first.
#[derive(Debug, Clone, Copy)]
pub struct UnwindPoint {
    pub env: EnvId,
    /// Stack height to truncate to
    pub top: usize,
    pub base: usize,
    /// Number of active frames when the point was pushed
    pub depth: usize,
    /// Instruction to resume at, with the exception pushed
    pub resume: usize,
}

impl Interpreter {
    pub(crate) fn push(&mut self, value: Value) -> Result<(), JsError> {
        if self.stack.len() >= self.config.stack_size {
            return Err(self.fatal(FatalError::StackOverflow));
        }
        self.stack.push(value);
        Ok(())
    }

    /// Fail unless `count` more values fit on the stack.
    pub(crate) fn ensure_stack(&mut self, count: usize) -> Result<(), JsError> {
        let free = self.config.stack_size.saturating_sub(self.stack.len());
        if count > free {
            return Err(self.fatal(FatalError::StackOverflow));
        }
        Ok(())
    }

    /// Insert below the top, shifting everything above `index` up.
    pub(crate) fn insert(&mut self, index: usize, value: Value) -> Result<(), JsError> {
        if self.stack.len() >= self.config.stack_size {
            return Err(self.fatal(FatalError::StackOverflow));
        }
        if index > self.stack.len() {
            return Err(self.fatal(FatalError::StackUnderflow));
        }
        self.stack.insert(index, value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, JsError> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.fatal(FatalError::StackUnderflow)),
        }
    }

    /// Pop `N` values, returned in push order.
    pub(crate) fn pop_n<const N: usize>(&mut self) -> Result<[Value; N], JsError> {
        let Some(start) = self.stack.len().checked_sub(N) else {
            return Err(self.fatal(FatalError::StackUnderflow));
        };
        let mut values: [Value; N] = std::array::from_fn(|_| Value::Undefined);
        for (slot, value) in values.iter_mut().zip(self.stack.drain(start..)) {
            *slot = value;
        }
        Ok(values)
    }

    /// The value `depth` slots below the top (0 = top).
    pub(crate) fn peek(&self, depth: usize) -> Result<&Value, JsError> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|index| self.stack.get(index))
            .ok_or_else(|| self.fatal(FatalError::StackUnderflow))
    }

    /// Move the top value `n` slots down: `a b c → c a b` for n = 2.
    pub(crate) fn rotate(&mut self, n: usize) -> Result<(), JsError> {
        let len = self.stack.len();
        let Some(start) = len.checked_sub(n + 1) else {
            return Err(self.fatal(FatalError::StackUnderflow));
        };
        if let Some(window) = self.stack.get_mut(start..) {
            window.rotate_right(1);
        }
        Ok(())
    }

    pub(crate) fn replace_top(&mut self, value: Value) -> Result<(), JsError> {
        match self.stack.last_mut() {
            Some(top) => {
                *top = value;
                Ok(())
            }
            None => Err(self.fatal(FatalError::StackUnderflow)),
        }
    }

    /// Argument `i` of the current call (0 = `this`); undefined when absent.
    pub fn arg(&self, i: usize) -> Value {
        if i > self.argc {
            return Value::Undefined;
        }
        self.stack.get(self.base + i).cloned().unwrap_or_default()
    }

    /// The current frame's `this`
    pub fn this_value(&self) -> Value {
        self.arg(0)
    }

    pub(crate) fn push_unwind_point(&mut self, resume: usize) -> Result<(), JsError> {
        if self.tries.len() >= self.config.max_try_depth {
            return Err(self.fatal(FatalError::TryDepthExceeded));
        }
        self.tries.push(UnwindPoint {
            env: self.env,
            top: self.stack.len(),
            base: self.base,
            depth: self.frames.len(),
            resume,
        });
        Ok(())
    }

    /// Unwind to the innermost try block of the current frame, returning
    /// where to resume. Without one the exception is handed back.
    pub(crate) fn unwind(&mut self, exception: Value) -> Result<usize, JsError> {
        let point = match self.tries.last() {
            Some(point) if point.depth == self.frames.len() => *point,
            _ => return Err(JsError::Thrown(exception)),
        };
        self.tries.pop();
        self.env = point.env;
        self.base = point.base;
        self.stack.truncate(point.top);
        self.stack.push(exception);
        Ok(point.resume)
    }

    /// Drop the unwind points owned by frames at `depth` or deeper.
    pub(crate) fn drop_unwind_points(&mut self, depth: usize) {
        while self.tries.last().is_some_and(|point| point.depth >= depth) {
            self.tries.pop();
        }
    }
}
