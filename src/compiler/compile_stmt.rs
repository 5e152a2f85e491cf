//! Statement compilation
//!
//! Every statement leaves the operand stack as it found it.

use std::rc::Rc;

use super::bytecode::{JumpTarget, Op};
use super::{Compiler, Exit, ScopeKind, TryRegion};
use crate::ast::{
    BlockStatement, DoWhileStatement, Expression, ForInStatement, ForInTarget, ForInit,
    ForStatement, IfStatement, JumpStatement, LabeledStatement, MemberProperty, ReturnStatement,
    Statement, SwitchStatement, TryStatement, VariableDeclaration, WhileStatement, WithStatement,
};
use crate::error::JsError;
use crate::value::CheapClone;

impl Compiler<'_> {
    /// Compile a statement
    pub(super) fn compile_statement(&mut self, stmt: &Statement) -> Result<(), JsError> {
        let span = stmt.span();
        self.enter(span)?;
        self.builder.set_line(span.line);

        // Only loops, switches and nested labels consume pending labels
        if !self.pending_labels.is_empty()
            && !matches!(
                stmt,
                Statement::For(_)
                    | Statement::ForIn(_)
                    | Statement::While(_)
                    | Statement::DoWhile(_)
                    | Statement::Switch(_)
                    | Statement::Labeled(_)
            )
        {
            self.push_scope(ScopeKind::Label);
            let result = self.compile_statement_inner(stmt);
            self.pop_scope(None);
            self.leave();
            return result;
        }

        let result = self.compile_statement_inner(stmt);
        self.leave();
        result
    }

    fn compile_statement_inner(&mut self, stmt: &Statement) -> Result<(), JsError> {
        match stmt {
            Statement::Expression(expr_stmt) => {
                self.compile_expression(&expr_stmt.expression)?;
                if self.in_function {
                    self.builder.emit(Op::Pop);
                } else {
                    self.builder.emit(Op::StoreCompletion);
                }
                Ok(())
            }

            Statement::VariableDeclaration(decl) => self.compile_variable_declaration(decl),

            // Hoisted into the prologue
            Statement::FunctionDeclaration(_) => Ok(()),

            Statement::Block(block) => self.compile_block(block),

            Statement::If(if_stmt) => self.compile_if(if_stmt),

            Statement::While(while_stmt) => self.compile_while(while_stmt),

            Statement::DoWhile(do_while) => self.compile_do_while(do_while),

            Statement::For(for_stmt) => self.compile_for(for_stmt),

            Statement::ForIn(for_in) => self.compile_for_in(for_in),

            Statement::Switch(switch_stmt) => self.compile_switch(switch_stmt),

            Statement::Return(return_stmt) => self.compile_return(return_stmt),

            Statement::Break(jump) => self.compile_break(jump),

            Statement::Continue(jump) => self.compile_continue(jump),

            Statement::Throw(throw_stmt) => {
                self.compile_expression(&throw_stmt.argument)?;
                self.builder.emit(Op::Throw);
                Ok(())
            }

            Statement::Try(try_stmt) => self.compile_try(try_stmt),

            Statement::With(with_stmt) => self.compile_with(with_stmt),

            Statement::Labeled(labeled) => self.compile_labeled(labeled),

            Statement::Empty(_) => Ok(()),

            Statement::Debugger(_) => {
                self.builder.emit(Op::Debugger);
                Ok(())
            }
        }
    }

    /// `var` bindings were made by the prologue; only initializers run here.
    fn compile_variable_declaration(&mut self, decl: &VariableDeclaration) -> Result<(), JsError> {
        for declarator in &decl.declarations {
            let Some(init) = &declarator.init else { continue };
            self.builder.set_line(declarator.span.line);
            self.compile_expression(init)?;
            let name = self.builder.add_string(&declarator.id.name)?;
            self.builder.emit(Op::SetVar { name });
            self.builder.emit(Op::Pop);
        }
        Ok(())
    }

    pub(super) fn compile_block(&mut self, block: &BlockStatement) -> Result<(), JsError> {
        self.compile_statements(&block.body)
    }

    fn compile_if(&mut self, if_stmt: &IfStatement) -> Result<(), JsError> {
        self.compile_expression(&if_stmt.test)?;
        let else_jump = self.builder.emit_jump_if_false();
        self.compile_statement(&if_stmt.consequent)?;

        match &if_stmt.alternate {
            Some(alternate) => {
                let end_jump = self.builder.emit_jump();
                self.builder.patch_jump(else_jump);
                self.compile_statement(alternate)?;
                self.builder.patch_jump(end_jump);
            }
            None => self.builder.patch_jump(else_jump),
        }
        Ok(())
    }

    fn compile_while(&mut self, stmt: &WhileStatement) -> Result<(), JsError> {
        let loop_start = self.builder.current_offset();
        self.push_scope(ScopeKind::Loop);

        self.compile_expression(&stmt.test)?;
        let exit_jump = self.builder.emit_jump_if_false();
        self.compile_statement(&stmt.body)?;
        self.builder.emit_jump_to(loop_start);

        self.builder.patch_jump(exit_jump);
        self.pop_scope(Some(loop_start));
        Ok(())
    }

    fn compile_do_while(&mut self, stmt: &DoWhileStatement) -> Result<(), JsError> {
        let loop_start = self.builder.current_offset();
        self.push_scope(ScopeKind::Loop);

        self.compile_statement(&stmt.body)?;
        let continue_target = self.builder.current_offset();
        self.builder.set_line(stmt.test.span().line);
        self.compile_expression(&stmt.test)?;
        self.builder.emit_jump_if_true_to(loop_start);

        self.pop_scope(Some(continue_target));
        Ok(())
    }

    fn compile_for(&mut self, stmt: &ForStatement) -> Result<(), JsError> {
        match &stmt.init {
            Some(ForInit::Variable(decl)) => self.compile_variable_declaration(decl)?,
            Some(ForInit::Expression(expr)) => {
                self.compile_expression(expr)?;
                self.builder.emit(Op::Pop);
            }
            None => {}
        }

        let loop_start = self.builder.current_offset();
        self.push_scope(ScopeKind::Loop);

        let exit_jump = match &stmt.test {
            Some(test) => {
                self.compile_expression(test)?;
                Some(self.builder.emit_jump_if_false())
            }
            None => None,
        };

        self.compile_statement(&stmt.body)?;

        let continue_target = self.builder.current_offset();
        if let Some(update) = &stmt.update {
            self.builder.set_line(update.span().line);
            self.compile_expression(update)?;
            self.builder.emit(Op::Pop);
        }
        self.builder.emit_jump_to(loop_start);

        if let Some(jump) = exit_jump {
            self.builder.patch_jump(jump);
        }
        self.pop_scope(Some(continue_target));
        Ok(())
    }

    /// `obj; Iterator; L: NextIter end; <assign key>; body; Jump L; end:`
    fn compile_for_in(&mut self, stmt: &ForInStatement) -> Result<(), JsError> {
        self.compile_expression(&stmt.right)?;
        self.builder.emit(Op::Iterator);

        let loop_start = self.builder.current_offset();
        self.push_scope(ScopeKind::ForIn);
        let exit_jump = self.builder.emit_next_iter();

        self.compile_for_in_assignment(&stmt.left)?;
        self.compile_statement(&stmt.body)?;
        self.builder.emit_jump_to(loop_start);

        self.builder.patch_jump(exit_jump);
        self.pop_scope(Some(loop_start));
        Ok(())
    }

    /// Store the key on top of the stack into the loop target, consuming it.
    fn compile_for_in_assignment(&mut self, left: &ForInTarget) -> Result<(), JsError> {
        let target = match left {
            ForInTarget::Variable(id) => {
                let name = self.builder.add_string(&id.name)?;
                self.builder.emit(Op::SetVar { name });
                self.builder.emit(Op::Pop);
                return Ok(());
            }
            ForInTarget::Expression(expr) => expr,
        };

        match target {
            Expression::Identifier(id) => {
                let name = self.builder.add_string(&id.name)?;
                self.builder.emit(Op::SetVar { name });
            }
            Expression::Member(member) => {
                self.compile_expression(&member.object)?;
                self.builder.emit(Op::Rot2);
                match &member.property {
                    MemberProperty::Identifier(id) => {
                        let name = self.builder.add_string(&id.name)?;
                        self.builder.emit(Op::SetPropName { name });
                    }
                    MemberProperty::Expression(key) => {
                        self.compile_expression(key)?;
                        self.builder.emit(Op::Rot2);
                        self.builder.emit(Op::SetProp);
                    }
                }
            }
            other => {
                return Err(self.error("invalid assignment target in for-in", other.span()));
            }
        }
        self.builder.emit(Op::Pop);
        Ok(())
    }

    fn compile_switch(&mut self, stmt: &SwitchStatement) -> Result<(), JsError> {
        self.compile_expression(&stmt.discriminant)?;

        let mut case_jumps = Vec::with_capacity(stmt.cases.len());
        let mut default_case = None;
        for (index, case) in stmt.cases.iter().enumerate() {
            match &case.test {
                Some(test) => {
                    self.builder.set_line(case.span.line);
                    self.compile_expression(test)?;
                    case_jumps.push((index, self.builder.emit_jump_case()));
                }
                None => {
                    if default_case.is_some() {
                        return Err(self.error("more than one default label in switch", case.span));
                    }
                    default_case = Some(index);
                }
            }
        }
        self.builder.emit(Op::Pop);
        let fallback_jump = self.builder.emit_jump();

        self.push_scope(ScopeKind::Switch);
        for (index, case) in stmt.cases.iter().enumerate() {
            let entry = self.builder.current_offset();
            for (_, jump) in case_jumps.iter().filter(|(i, _)| *i == index) {
                self.builder.patch_jump(*jump);
            }
            if default_case == Some(index) {
                self.builder.patch_jump_to(fallback_jump, entry as JumpTarget);
            }
            self.compile_statements(&case.consequent)?;
        }
        if default_case.is_none() {
            self.builder.patch_jump(fallback_jump);
        }
        self.pop_scope(None);
        Ok(())
    }

    fn compile_return(&mut self, stmt: &ReturnStatement) -> Result<(), JsError> {
        if !self.in_function {
            return Err(self.error("return outside of a function", stmt.span));
        }
        match &stmt.argument {
            Some(argument) => self.compile_expression(argument)?,
            None => {
                self.builder.emit(Op::Undefined);
            }
        }
        self.emit_exit(None, Exit::Return)?;
        self.builder.emit(Op::Return);
        Ok(())
    }

    fn compile_break(&mut self, stmt: &JumpStatement) -> Result<(), JsError> {
        let label = stmt.label.as_ref().map(|l| &l.name);
        let Some(target) = self.find_break_target(label) else {
            let message = match label {
                Some(label) => format!("undefined label '{}'", label),
                None => "break must be inside a loop or switch".to_string(),
            };
            return Err(self.error(message, stmt.span));
        };

        self.emit_exit(Some(target), Exit::Break)?;
        if self
            .targets
            .get(target)
            .is_some_and(|scope| matches!(scope.kind, ScopeKind::ForIn))
        {
            self.builder.emit(Op::Pop);
        }
        let jump = self.builder.emit_jump();
        if let Some(scope) = self.targets.get_mut(target) {
            scope.break_jumps.push(jump);
        }
        Ok(())
    }

    fn compile_continue(&mut self, stmt: &JumpStatement) -> Result<(), JsError> {
        let label = stmt.label.as_ref().map(|l| &l.name);
        let target = match self.find_continue_target(label) {
            Ok(Some(target)) => target,
            Ok(None) => {
                let message = match label {
                    Some(label) => format!("undefined label '{}'", label),
                    None => "continue must be inside a loop".to_string(),
                };
                return Err(self.error(message, stmt.span));
            }
            Err(message) => return Err(self.error(message, stmt.span)),
        };

        self.emit_exit(Some(target), Exit::Continue)?;
        let jump = self.builder.emit_jump();
        if let Some(scope) = self.targets.get_mut(target) {
            scope.continue_jumps.push(jump);
        }
        Ok(())
    }

    fn compile_labeled(&mut self, stmt: &LabeledStatement) -> Result<(), JsError> {
        let label = &stmt.label.name;
        if self.is_label_active(label) {
            return Err(self.error(format!("duplicate label '{}'", label), stmt.label.span));
        }
        self.pending_labels.push(label.cheap_clone());
        self.compile_statement(&stmt.body)
    }

    fn compile_with(&mut self, stmt: &WithStatement) -> Result<(), JsError> {
        self.compile_expression(&stmt.object)?;
        self.builder.emit(Op::With);
        self.push_scope(ScopeKind::With);
        self.compile_statement(&stmt.body)?;
        self.pop_scope(None);
        self.builder.emit(Op::EndWith);
        Ok(())
    }

    /// Layouts, where `Try L` resumes at the next instruction on a throw
    /// and otherwise jumps to `L`:
    ///
    /// ```text
    /// catch:          Try L1; Catch; handler; EndCatch; Jump L2;
    ///                 L1: body; EndTry; L2:
    /// finally:        Try L1; finally; Throw;
    ///                 L1: body; EndTry; finally
    /// catch+finally:  Try L1; Try L2; Rot2; Pop; finally; Throw;
    ///                 L2: Catch; handler; EndCatch; EndTry; Jump L3;
    ///                 L1: body; EndTry; L3: finally
    /// ```
    fn compile_try(&mut self, stmt: &TryStatement) -> Result<(), JsError> {
        match (&stmt.handler, &stmt.finalizer) {
            (Some(handler), None) => {
                let body_jump = self.builder.emit_try();

                self.builder.set_line(handler.span.line);
                let name = self.builder.add_string(&handler.param.name)?;
                self.builder.emit(Op::Catch { name });
                self.compile_try_region(None, TryRegion::Catch, &handler.body)?;
                self.builder.emit(Op::EndCatch);
                let end_jump = self.builder.emit_jump();

                self.builder.patch_jump(body_jump);
                self.compile_try_region(None, TryRegion::Body, &stmt.block)?;
                self.builder.emit(Op::EndTry);
                self.builder.patch_jump(end_jump);
            }

            (None, Some(finalizer)) => {
                let body_jump = self.builder.emit_try();
                self.compile_rethrowing_finally(finalizer)?;

                self.builder.patch_jump(body_jump);
                self.compile_try_region(Some(finalizer), TryRegion::Body, &stmt.block)?;
                self.builder.emit(Op::EndTry);
                self.compile_block(finalizer)?;
            }

            (Some(handler), Some(finalizer)) => {
                let body_jump = self.builder.emit_try();
                let handler_jump = self.builder.emit_try();
                // A throw from the handler lands above the caught exception
                self.builder.emit(Op::Rot2);
                self.builder.emit(Op::Pop);
                self.compile_rethrowing_finally(finalizer)?;

                self.builder.patch_jump(handler_jump);
                self.builder.set_line(handler.span.line);
                let name = self.builder.add_string(&handler.param.name)?;
                self.builder.emit(Op::Catch { name });
                self.compile_try_region(Some(finalizer), TryRegion::Catch, &handler.body)?;
                self.builder.emit(Op::EndCatch);
                self.builder.emit(Op::EndTry);
                let finally_jump = self.builder.emit_jump();

                self.builder.patch_jump(body_jump);
                self.compile_try_region(Some(finalizer), TryRegion::Body, &stmt.block)?;
                self.builder.emit(Op::EndTry);
                self.builder.patch_jump(finally_jump);
                self.compile_block(finalizer)?;
            }

            (None, None) => {
                return Err(self.error("missing catch or finally after try", stmt.span));
            }
        }
        Ok(())
    }

    fn compile_try_region(
        &mut self,
        finalizer: Option<&Rc<BlockStatement>>,
        region: TryRegion,
        block: &BlockStatement,
    ) -> Result<(), JsError> {
        self.push_scope(ScopeKind::Try {
            finalizer: finalizer.map(Rc::clone),
            region,
        });
        let result = self.compile_block(block);
        self.pop_scope(None);
        result
    }

    /// The `finally` copy on the exception path: the exception stays on the
    /// stack underneath and is rethrown afterwards.
    fn compile_rethrowing_finally(&mut self, finalizer: &BlockStatement) -> Result<(), JsError> {
        self.push_scope(ScopeKind::Pending);
        let result = self.compile_block(finalizer);
        self.pop_scope(None);
        result?;
        self.builder.emit(Op::Throw);
        Ok(())
    }
}
