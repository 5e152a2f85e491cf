//! BytecodeBuilder - helper for emitting bytecode instructions
//!
//! Collects instructions, a per-instruction line table and the three
//! constant tables of a function, and patches forward jumps.

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

use super::bytecode::{ConstantIndex, Function, JumpTarget, Op};
use crate::error::JsError;
use crate::gc::FunctionId;
use crate::value::{CheapClone, JsString};

/// Placeholder for a jump that needs to be patched later
#[derive(Debug, Clone, Copy)]
pub struct JumpPlaceholder {
    /// Index of the jump instruction in the code
    pub instruction_index: usize,
}

/// Builder for one compiled function
pub struct BytecodeBuilder {
    code: Vec<Op>,
    lines: Vec<u32>,

    /// Number constants, deduplicated by bit pattern
    numbers: IndexSet<u64, FxBuildHasher>,

    /// String constants (names and literals), deduplicated
    strings: IndexSet<JsString, FxBuildHasher>,

    functions: Vec<FunctionId>,

    file: JsString,
    current_line: u32,
}

impl BytecodeBuilder {
    pub fn new(file: JsString, line: u32) -> Self {
        Self {
            code: Vec::new(),
            lines: Vec::new(),
            numbers: IndexSet::default(),
            strings: IndexSet::default(),
            functions: Vec::new(),
            file,
            current_line: line,
        }
    }

    /// Set the source line recorded for subsequent instructions
    pub fn set_line(&mut self, line: u32) {
        self.current_line = line;
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    /// Emit an instruction and return its index
    pub fn emit(&mut self, op: Op) -> usize {
        let index = self.code.len();
        self.code.push(op);
        self.lines.push(self.current_line);
        index
    }

    fn emit_placeholder(&mut self, op: Op) -> JumpPlaceholder {
        JumpPlaceholder {
            instruction_index: self.emit(op),
        }
    }

    /// Emit a jump instruction with a placeholder target
    pub fn emit_jump(&mut self) -> JumpPlaceholder {
        self.emit_placeholder(Op::Jump { target: 0 })
    }

    pub fn emit_jump_if_true(&mut self) -> JumpPlaceholder {
        self.emit_placeholder(Op::JumpIfTrue { target: 0 })
    }

    pub fn emit_jump_if_false(&mut self) -> JumpPlaceholder {
        self.emit_placeholder(Op::JumpIfFalse { target: 0 })
    }

    pub fn emit_jump_case(&mut self) -> JumpPlaceholder {
        self.emit_placeholder(Op::JumpCase { target: 0 })
    }

    pub fn emit_next_iter(&mut self) -> JumpPlaceholder {
        self.emit_placeholder(Op::NextIter { target: 0 })
    }

    /// Emit `Try` whose target (the protected body) is patched later
    pub fn emit_try(&mut self) -> JumpPlaceholder {
        self.emit_placeholder(Op::Try { target: 0 })
    }

    /// Emit a jump to a known target
    pub fn emit_jump_to(&mut self, target: usize) {
        self.emit(Op::Jump {
            target: target as JumpTarget,
        });
    }

    pub fn emit_jump_if_true_to(&mut self, target: usize) {
        self.emit(Op::JumpIfTrue {
            target: target as JumpTarget,
        });
    }

    /// Patch a jump placeholder to jump to the current position
    pub fn patch_jump(&mut self, placeholder: JumpPlaceholder) {
        let target = self.code.len() as JumpTarget;
        self.patch_jump_to(placeholder, target);
    }

    /// Patch a jump placeholder to jump to a specific target
    pub fn patch_jump_to(&mut self, placeholder: JumpPlaceholder, target: JumpTarget) {
        if let Some(op) = self.code.get_mut(placeholder.instruction_index) {
            op.set_target(target);
        }
    }

    /// Get the current instruction offset (for jump targets)
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    fn constant_index(&self, len: usize, table: &str) -> Result<ConstantIndex, JsError> {
        ConstantIndex::try_from(len).map_err(|_| {
            JsError::syntax_error(
                format!("too many {} constants", table),
                &self.file,
                self.current_line,
                0,
            )
        })
    }

    /// Add a string constant to the table (with deduplication)
    pub fn add_string(&mut self, s: &JsString) -> Result<ConstantIndex, JsError> {
        if let Some(index) = self.strings.get_index_of(s) {
            return self.constant_index(index, "string");
        }
        let index = self.constant_index(self.strings.len(), "string")?;
        self.strings.insert(s.cheap_clone());
        Ok(index)
    }

    /// Add a number constant to the table (with deduplication)
    pub fn add_number(&mut self, n: f64) -> Result<ConstantIndex, JsError> {
        let bits = n.to_bits();
        if let Some(index) = self.numbers.get_index_of(&bits) {
            return self.constant_index(index, "number");
        }
        let index = self.constant_index(self.numbers.len(), "number")?;
        self.numbers.insert(bits);
        Ok(index)
    }

    /// Add a nested function; returns its index for `Op::Closure`
    pub fn add_function(&mut self, function: FunctionId) -> Result<ConstantIndex, JsError> {
        let index = self.constant_index(self.functions.len(), "function")?;
        self.functions.push(function);
        Ok(index)
    }

    /// Emit a string push
    pub fn emit_load_string(&mut self, s: &JsString) -> Result<(), JsError> {
        let index = self.add_string(s)?;
        self.emit(Op::String { index });
        Ok(())
    }

    /// Emit a number push, inlining integral values that fit in an i32
    pub fn emit_load_number(&mut self, n: f64) -> Result<(), JsError> {
        let is_negative_zero = n == 0.0 && n.is_sign_negative();
        if n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64 && !is_negative_zero {
            self.emit(Op::Integer { value: n as i32 });
            return Ok(());
        }

        let index = self.add_number(n)?;
        self.emit(Op::Number { index });
        Ok(())
    }

    /// Finish building and return the compiled function
    pub fn finish(self, header: Function) -> Function {
        Function {
            code: self.code,
            lines: self.lines,
            numbers: self.numbers.into_iter().map(f64::from_bits).collect(),
            strings: self.strings.into_iter().collect(),
            functions: self.functions,
            ..header
        }
    }
}
