//! Bytecode instruction set and compiled function format
//!
//! The VM is a stack machine: operands are pushed, operators pop them and
//! push their result. Stack pictures in the docs below list the top last.

use std::fmt::Write as _;

use crate::gc::{FunctionId, Trace, Tracer};
use crate::value::{JsString, number_to_string};

/// Index into one of a function's constant tables
pub type ConstantIndex = u16;

/// Jump target (absolute instruction index)
pub type JumpTarget = u32;

/// Bytecode instruction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    // ═══════════════════════════════════════════════════════════════════════════════
    // Stack shuffling
    // ═══════════════════════════════════════════════════════════════════════════════
    /// a →
    Pop,

    /// a → a a
    Dup,

    /// a b → a b a b
    Dup2,

    /// a b → b a
    Rot2,

    /// a b c → c a b
    Rot3,

    /// a b c d → d a b c
    Rot4,

    // ═══════════════════════════════════════════════════════════════════════════════
    // Constants
    // ═══════════════════════════════════════════════════════════════════════════════
    Undefined,
    Null,
    True,
    False,

    /// Push the current `this`
    This,

    /// Push a small integer stored inline
    Integer { value: i32 },

    /// Push numbers[index]
    Number { index: ConstantIndex },

    /// Push strings[index]
    String { index: ConstantIndex },

    /// Push a new closure over functions[index] and the current scope
    Closure { index: ConstantIndex },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Object and array literals
    // ═══════════════════════════════════════════════════════════════════════════════
    /// → {}
    NewObject,

    /// → []
    NewArray,

    /// obj value → obj, defining obj[name] = value
    InitProp { name: ConstantIndex },

    /// array value → array, appending value
    InitArray,

    // ═══════════════════════════════════════════════════════════════════════════════
    // Scope
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Bind `name` to undefined in the current scope unless already bound
    DeclareVar { name: ConstantIndex },

    /// value →, binding `name` in the current scope
    InitVar { name: ConstantIndex },

    /// → value; ReferenceError when unbound
    GetVar { name: ConstantIndex },

    /// → value; undefined when unbound (for `typeof`)
    TryGetVar { name: ConstantIndex },

    /// value → value; unbound names land on the global object
    SetVar { name: ConstantIndex },

    /// → bool
    DelVar { name: ConstantIndex },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Properties
    // ═══════════════════════════════════════════════════════════════════════════════
    /// obj key → value
    GetProp,

    /// obj → value
    GetPropName { name: ConstantIndex },

    /// obj key value → value
    SetProp,

    /// obj value → value
    SetPropName { name: ConstantIndex },

    /// obj key → bool
    DelProp,

    /// obj → bool
    DelPropName { name: ConstantIndex },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════════════
    /// fn this arg1..argN → result
    Call { argc: u16 },

    /// ctor arg1..argN → object
    New { argc: u16 },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Unary operators (a → result)
    // ═══════════════════════════════════════════════════════════════════════════════
    Typeof,
    /// ToNumber
    Pos,
    Neg,
    BitNot,
    LogNot,
    /// ToNumber + 1
    Inc,
    /// ToNumber - 1
    Dec,

    // ═══════════════════════════════════════════════════════════════════════════════
    // Binary operators (a b → result)
    // ═══════════════════════════════════════════════════════════════════════════════
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Ushr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    In,
    Instanceof,
    BitAnd,
    BitXor,
    BitOr,

    // ═══════════════════════════════════════════════════════════════════════════════
    // Enumeration and scope objects
    // ═══════════════════════════════════════════════════════════════════════════════
    /// obj → iterator
    Iterator,

    /// iterator → iterator name, or pops the iterator and jumps when done
    NextIter { target: JumpTarget },

    /// obj →, pushing a scope whose variables are the object's properties
    With,

    /// Leave the innermost `with` scope
    EndWith,

    // ═══════════════════════════════════════════════════════════════════════════════
    // Exceptions
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Push an unwind point resuming at the next instruction, then jump
    /// to the protected body at `target`
    Try { target: JumpTarget },

    /// Drop the innermost unwind point
    EndTry,

    /// exception →, entering a scope binding `name`
    Catch { name: ConstantIndex },

    /// Leave the catch scope
    EndCatch,

    /// value → (never returns normally)
    Throw,

    // ═══════════════════════════════════════════════════════════════════════════════
    // Control flow
    // ═══════════════════════════════════════════════════════════════════════════════
    Jump { target: JumpTarget },

    /// cond →
    JumpIfTrue { target: JumpTarget },

    /// cond →
    JumpIfFalse { target: JumpTarget },

    /// discriminant case → discriminant; on a strict match pops the
    /// discriminant too and jumps
    JumpCase { target: JumpTarget },

    /// value →, recording the script completion value
    StoreCompletion,

    /// → completion value
    LoadCompletion,

    /// value → (leaves the function)
    Return,

    /// `debugger` statement
    Debugger,
}

impl Op {
    /// Net stack effect when execution falls through to the next instruction.
    pub fn stack_effect(&self) -> i32 {
        match self {
            Op::Pop => -1,
            Op::Dup => 1,
            Op::Dup2 => 2,
            Op::Rot2 | Op::Rot3 | Op::Rot4 => 0,
            Op::Undefined
            | Op::Null
            | Op::True
            | Op::False
            | Op::This
            | Op::Integer { .. }
            | Op::Number { .. }
            | Op::String { .. }
            | Op::Closure { .. }
            | Op::NewObject
            | Op::NewArray => 1,
            Op::InitProp { .. } | Op::InitArray => -1,
            Op::DeclareVar { .. } => 0,
            Op::InitVar { .. } => -1,
            Op::GetVar { .. } | Op::TryGetVar { .. } | Op::DelVar { .. } => 1,
            Op::SetVar { .. } => 0,
            Op::GetProp => -1,
            Op::GetPropName { .. } => 0,
            Op::SetProp => -2,
            Op::SetPropName { .. } => -1,
            Op::DelProp => -1,
            Op::DelPropName { .. } => 0,
            Op::Call { argc } => -i32::from(*argc) - 1,
            Op::New { argc } => -i32::from(*argc),
            Op::Typeof | Op::Pos | Op::Neg | Op::BitNot | Op::LogNot | Op::Inc | Op::Dec => 0,
            Op::Mul
            | Op::Div
            | Op::Mod
            | Op::Add
            | Op::Sub
            | Op::Shl
            | Op::Shr
            | Op::Ushr
            | Op::Lt
            | Op::Gt
            | Op::Le
            | Op::Ge
            | Op::Eq
            | Op::Ne
            | Op::StrictEq
            | Op::StrictNe
            | Op::In
            | Op::Instanceof
            | Op::BitAnd
            | Op::BitXor
            | Op::BitOr => -1,
            Op::Iterator => 0,
            Op::NextIter { .. } => 1,
            Op::With => -1,
            Op::EndWith => 0,
            // The fall-through of Try is the handler entry, which receives
            // the exception value.
            Op::Try { .. } => 1,
            Op::EndTry => 0,
            Op::Catch { .. } => -1,
            Op::EndCatch => 0,
            Op::Throw => -1,
            Op::Jump { .. } => 0,
            Op::JumpIfTrue { .. } | Op::JumpIfFalse { .. } => -1,
            Op::JumpCase { .. } => -1,
            Op::StoreCompletion => -1,
            Op::LoadCompletion => 1,
            Op::Return => -1,
            Op::Debugger => 0,
        }
    }

    /// Branch target and the stack effect along the taken branch.
    pub fn branch(&self) -> Option<(JumpTarget, i32)> {
        match self {
            Op::Jump { target } => Some((*target, 0)),
            Op::JumpIfTrue { target } | Op::JumpIfFalse { target } => Some((*target, -1)),
            Op::JumpCase { target } => Some((*target, -2)),
            Op::NextIter { target } => Some((*target, -1)),
            Op::Try { target } => Some((*target, 0)),
            _ => None,
        }
    }

    /// True for instructions that never fall through.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Op::Jump { .. } | Op::Throw | Op::Return)
    }

    pub(crate) fn set_target(&mut self, new_target: JumpTarget) {
        match self {
            Op::Jump { target }
            | Op::JumpIfTrue { target }
            | Op::JumpIfFalse { target }
            | Op::JumpCase { target }
            | Op::NextIter { target }
            | Op::Try { target } => *target = new_target,
            _ => {}
        }
    }
}

/// A compiled function: immutable once built, shared by all its closures.
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub name: JsString,
    pub file: JsString,
    /// First source line
    pub line: u32,
    pub params: Vec<JsString>,
    pub code: Vec<Op>,
    /// Source line of each instruction
    pub lines: Vec<u32>,
    pub numbers: Vec<f64>,
    pub strings: Vec<JsString>,
    pub functions: Vec<FunctionId>,
    /// Top-level program rather than a function body
    pub script: bool,
    /// The body mentions `arguments`
    pub uses_arguments: bool,
    /// A named function expression, which can see its own name
    pub named_expression: bool,
}

impl Function {
    pub fn line_at(&self, ip: usize) -> u32 {
        self.lines.get(ip).copied().unwrap_or(self.line)
    }

    pub fn string(&self, index: ConstantIndex) -> Option<&JsString> {
        self.strings.get(usize::from(index))
    }

    /// Human-readable listing, one instruction per line.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let name = if self.name.is_empty() { "<anonymous>" } else { self.name.as_str() };
        let _ = writeln!(out, "function {} ({}:{})", name, self.file, self.line);
        for (ip, op) in self.code.iter().enumerate() {
            let _ = write!(out, "{:4} ", ip);
            let _ = match op {
                Op::Number { index } => writeln!(
                    out,
                    "Number {}",
                    self.numbers
                        .get(usize::from(*index))
                        .map_or_else(|| "?".to_string(), |n| number_to_string(*n))
                ),
                Op::String { index } => {
                    writeln!(out, "String {:?}", self.string(*index).map_or("?", |s| s.as_str()))
                }
                Op::InitProp { name }
                | Op::DeclareVar { name }
                | Op::InitVar { name }
                | Op::GetVar { name }
                | Op::TryGetVar { name }
                | Op::SetVar { name }
                | Op::DelVar { name }
                | Op::GetPropName { name }
                | Op::SetPropName { name }
                | Op::DelPropName { name }
                | Op::Catch { name } => {
                    let label = format!("{:?}", op);
                    let mnemonic = label.split_whitespace().next().unwrap_or("");
                    writeln!(out, "{} {}", mnemonic, self.string(*name).map_or("?", |s| s.as_str()))
                }
                other => writeln!(out, "{:?}", other),
            };
        }
        out
    }
}

impl Trace for Function {
    fn trace(&self, tracer: &mut Tracer) {
        for nested in &self.functions {
            tracer.function(*nested);
        }
    }
}
