//! Bytecode compiler
//!
//! Lowers the AST to stack-machine bytecode. Each function body (and the
//! top-level program) becomes one `Function` in the heap; nested functions
//! are compiled depth-first and referenced from their parent's function
//! table.

mod builder;
mod bytecode;
mod compile_expr;
mod compile_stmt;
mod hoist;

pub use builder::{BytecodeBuilder, JumpPlaceholder};
pub use bytecode::{ConstantIndex, Function, JumpTarget, Op};

use std::rc::Rc;

use crate::ast::{BlockStatement, FunctionNode, Program, Statement};
use crate::error::JsError;
use crate::gc::{FunctionId, Heap};
use crate::lexer::Span;
use crate::value::{CheapClone, JsString};

/// Compile a whole program into a script function.
pub fn compile_script(
    heap: &mut Heap,
    program: &Program,
    file: &JsString,
    max_depth: usize,
) -> Result<FunctionId, JsError> {
    let mut compiler = Compiler::new(heap, file, program.span.line, max_depth, false);
    compiler.compile_body(&program.body, &[])?;
    compiler.builder.emit(Op::LoadCompletion);
    compiler.builder.emit(Op::Return);

    let header = Function {
        file: file.cheap_clone(),
        line: program.span.line,
        script: true,
        ..Function::default()
    };
    Ok(compiler.finish(header))
}

/// Which part of a `try` statement is being compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TryRegion {
    Body,
    Catch,
    /// An inlined `finally` block: exits need no compensation for this try
    Finally,
}

#[derive(Debug, Clone)]
enum ScopeKind {
    Loop,
    /// Loop with its iterator held on the stack
    ForIn,
    Switch,
    /// Labeled statement that is not a loop or switch
    Label,
    With,
    Try {
        finalizer: Option<Rc<BlockStatement>>,
        region: TryRegion,
    },
    /// A value parked on the stack while a `finally` block runs
    Pending,
}

/// Construct that a `break`, `continue` or `return` may have to leave
#[derive(Debug)]
struct JumpScope {
    kind: ScopeKind,
    labels: Vec<JsString>,
    break_jumps: Vec<JumpPlaceholder>,
    continue_jumps: Vec<JumpPlaceholder>,
}

impl JumpScope {
    fn new(kind: ScopeKind, labels: Vec<JsString>) -> Self {
        Self {
            kind,
            labels,
            break_jumps: Vec::new(),
            continue_jumps: Vec::new(),
        }
    }

    fn is_breakable(&self) -> bool {
        matches!(self.kind, ScopeKind::Loop | ScopeKind::ForIn | ScopeKind::Switch)
    }

    fn is_continuable(&self) -> bool {
        matches!(self.kind, ScopeKind::Loop | ScopeKind::ForIn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Break,
    Continue,
    Return,
}

/// Compiler state for one function body
pub struct Compiler<'h> {
    heap: &'h mut Heap,
    builder: BytecodeBuilder,
    file: JsString,

    /// Enclosing jump scopes, innermost last
    targets: Vec<JumpScope>,

    /// Labels waiting for the statement they name
    pending_labels: Vec<JsString>,

    depth: usize,
    max_depth: usize,
    in_function: bool,
}

impl<'h> Compiler<'h> {
    fn new(heap: &'h mut Heap, file: &JsString, line: u32, max_depth: usize, in_function: bool) -> Self {
        Self {
            heap,
            builder: BytecodeBuilder::new(file.cheap_clone(), line),
            file: file.cheap_clone(),
            targets: Vec::new(),
            pending_labels: Vec::new(),
            depth: 0,
            max_depth,
            in_function,
        }
    }

    fn finish(self, header: Function) -> FunctionId {
        let function = self.builder.finish(header);
        tracing::trace!(
            target: "stackjs::compiler",
            name = %function.name,
            file = %function.file,
            line = function.line,
            instructions = function.code.len(),
            "compiled function"
        );
        self.heap.alloc_function(function)
    }

    fn error(&self, message: impl Into<String>, span: Span) -> JsError {
        JsError::syntax_error(message, &self.file, span.line, span.column)
    }

    /// Guard against runaway recursion on deeply nested input
    fn enter(&mut self, span: Span) -> Result<(), JsError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error("exceeded maximum nesting depth", span));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Prologue (hoisted declarations) followed by the statements.
    fn compile_body(&mut self, body: &[Statement], params: &[JsString]) -> Result<bool, JsError> {
        let hoisted = hoist::scan(body);

        for function in &hoisted.functions {
            let Some(id) = &function.id else { continue };
            self.builder.set_line(function.span.line);
            let index = self.compile_nested_function(function, false)?;
            self.builder.emit(Op::Closure { index });
            let name = self.builder.add_string(&id.name)?;
            self.builder.emit(Op::InitVar { name });
        }
        for var in &hoisted.vars {
            if params.contains(var) {
                continue;
            }
            let name = self.builder.add_string(var)?;
            self.builder.emit(Op::DeclareVar { name });
        }

        for statement in body {
            self.compile_statement(statement)?;
        }
        Ok(hoisted.uses_arguments)
    }

    /// Compile a function body into its own `Function` and register it in
    /// the current function table.
    fn compile_nested_function(
        &mut self,
        node: &FunctionNode,
        named_expression: bool,
    ) -> Result<ConstantIndex, JsError> {
        self.enter(node.span)?;
        let depth = self.depth;
        let max_depth = self.max_depth;
        let file = self.file.cheap_clone();

        let params: Vec<JsString> = node.params.iter().map(|p| p.name.cheap_clone()).collect();
        let mut nested = Compiler::new(&mut *self.heap, &file, node.span.line, max_depth, true);
        nested.depth = depth;
        let uses_arguments = nested.compile_body(&node.body, &params)?;
        nested.builder.emit(Op::Undefined);
        nested.builder.emit(Op::Return);

        let header = Function {
            name: node.id.as_ref().map(|id| id.name.cheap_clone()).unwrap_or_default(),
            file,
            line: node.span.line,
            params,
            uses_arguments,
            named_expression: named_expression && node.id.is_some(),
            ..Function::default()
        };
        let id = nested.finish(header);
        self.leave();
        self.builder.add_function(id)
    }

    // ------------------------------------------------------------------------
    // Jump scopes
    // ------------------------------------------------------------------------

    fn push_scope(&mut self, kind: ScopeKind) {
        let labels = std::mem::take(&mut self.pending_labels);
        self.targets.push(JumpScope::new(kind, labels));
    }

    /// Pop the innermost scope and patch its pending jumps.
    /// `continue_target` is where `continue` resumes, if the scope is a loop.
    fn pop_scope(&mut self, continue_target: Option<usize>) {
        let Some(scope) = self.targets.pop() else { return };
        for jump in scope.break_jumps {
            self.builder.patch_jump(jump);
        }
        if let Some(target) = continue_target {
            for jump in scope.continue_jumps {
                self.builder.patch_jump_to(jump, target as JumpTarget);
            }
        }
    }

    fn is_label_active(&self, label: &JsString) -> bool {
        self.pending_labels.contains(label)
            || self.targets.iter().any(|scope| scope.labels.contains(label))
    }

    fn find_break_target(&self, label: Option<&JsString>) -> Option<usize> {
        match label {
            Some(label) => self.targets.iter().rposition(|s| s.labels.contains(label)),
            None => self.targets.iter().rposition(JumpScope::is_breakable),
        }
    }

    fn find_continue_target(&self, label: Option<&JsString>) -> Result<Option<usize>, &'static str> {
        match label {
            Some(label) => match self.targets.iter().rposition(|s| s.labels.contains(label)) {
                Some(index) if self.targets.get(index).is_some_and(JumpScope::is_continuable) => {
                    Ok(Some(index))
                }
                Some(_) => Err("continue target is not a loop"),
                None => Ok(None),
            },
            None => Ok(self.targets.iter().rposition(JumpScope::is_continuable)),
        }
    }

    /// Emit the compensation for leaving every scope above `target`
    /// (all scopes for a `return`).
    fn emit_exit(&mut self, target: Option<usize>, exit: Exit) -> Result<(), JsError> {
        let floor = target.map_or(0, |t| t + 1);
        let mut index = self.targets.len();
        while index > floor {
            index -= 1;
            let Some(kind) = self.targets.get(index).map(|s| s.kind.clone()) else {
                continue;
            };
            match kind {
                ScopeKind::Loop | ScopeKind::Switch | ScopeKind::Label => {}
                ScopeKind::With => {
                    self.builder.emit(Op::EndWith);
                }
                ScopeKind::ForIn | ScopeKind::Pending => self.emit_drop_operand(exit),
                ScopeKind::Try { region: TryRegion::Finally, .. } => {}
                ScopeKind::Try {
                    region: TryRegion::Body,
                    finalizer,
                } => {
                    self.builder.emit(Op::EndTry);
                    if let Some(finalizer) = finalizer {
                        self.inline_finally(index, &finalizer, exit == Exit::Return)?;
                    }
                }
                ScopeKind::Try {
                    region: TryRegion::Catch,
                    finalizer,
                } => {
                    self.builder.emit(Op::EndCatch);
                    if let Some(finalizer) = finalizer {
                        self.builder.emit(Op::EndTry);
                        self.inline_finally(index, &finalizer, exit == Exit::Return)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Drop the value a scope holds on the stack. A `return` keeps its
    /// result on top.
    fn emit_drop_operand(&mut self, exit: Exit) {
        if exit == Exit::Return {
            self.builder.emit(Op::Rot2);
        }
        self.builder.emit(Op::Pop);
    }

    /// Compile a copy of a `finally` block at an exit of the try at `index`.
    fn inline_finally(
        &mut self,
        index: usize,
        finalizer: &BlockStatement,
        pending: bool,
    ) -> Result<(), JsError> {
        let inner = self.targets.split_off(index + 1);
        let saved_region = self.set_try_region(index, TryRegion::Finally);
        if pending {
            self.targets.push(JumpScope::new(ScopeKind::Pending, Vec::new()));
        }

        let result = self.compile_statements(&finalizer.body);

        if pending {
            self.targets.pop();
        }
        if let Some(region) = saved_region {
            self.set_try_region(index, region);
        }
        self.targets.extend(inner);
        result
    }

    fn set_try_region(&mut self, index: usize, new_region: TryRegion) -> Option<TryRegion> {
        match self.targets.get_mut(index).map(|s| &mut s.kind) {
            Some(ScopeKind::Try { region, .. }) => Some(std::mem::replace(region, new_region)),
            _ => None,
        }
    }

    fn compile_statements(&mut self, statements: &[Statement]) -> Result<(), JsError> {
        for statement in statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }
}
