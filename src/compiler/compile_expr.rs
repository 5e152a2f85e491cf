//! Expression compilation
//!
//! Every expression leaves exactly one value on the operand stack.

use super::bytecode::Op;
use super::Compiler;
use crate::ast::{
    ArrayExpression, AssignmentExpression, AssignmentOp, BinaryOp, CallExpression,
    ConditionalExpression, Expression, LiteralValue, LogicalExpression, LogicalOp,
    MemberExpression, MemberProperty, ObjectExpression, UnaryExpression, UnaryOp,
    UpdateExpression, UpdateOp,
};
use crate::error::JsError;

impl Compiler<'_> {
    /// Compile an expression
    pub(super) fn compile_expression(&mut self, expr: &Expression) -> Result<(), JsError> {
        self.enter(expr.span())?;
        let result = self.compile_expression_inner(expr);
        self.leave();
        result
    }

    fn compile_expression_inner(&mut self, expr: &Expression) -> Result<(), JsError> {
        match expr {
            Expression::Identifier(id) => {
                let name = self.builder.add_string(&id.name)?;
                self.builder.emit(Op::GetVar { name });
            }

            Expression::Literal(literal) => match &literal.value {
                LiteralValue::Null => {
                    self.builder.emit(Op::Null);
                }
                LiteralValue::Boolean(true) => {
                    self.builder.emit(Op::True);
                }
                LiteralValue::Boolean(false) => {
                    self.builder.emit(Op::False);
                }
                LiteralValue::Number(n) => self.builder.emit_load_number(*n)?,
                LiteralValue::String(s) => self.builder.emit_load_string(s)?,
            },

            Expression::This(_) => {
                self.builder.emit(Op::This);
            }

            Expression::Array(array) => self.compile_array(array)?,

            Expression::Object(object) => self.compile_object(object)?,

            Expression::Function(function) => {
                let index = self.compile_nested_function(function, true)?;
                self.builder.emit(Op::Closure { index });
            }

            Expression::Unary(unary) => self.compile_unary(unary)?,

            Expression::Update(update) => self.compile_update(update)?,

            Expression::Binary(binary) => {
                self.compile_expression(&binary.left)?;
                self.compile_expression(&binary.right)?;
                self.builder.emit(binary_op(binary.operator));
            }

            Expression::Logical(logical) => self.compile_logical(logical)?,

            Expression::Conditional(conditional) => self.compile_conditional(conditional)?,

            Expression::Assignment(assign) => self.compile_assignment(assign)?,

            Expression::Sequence(sequence) => {
                let mut iter = sequence.expressions.iter().peekable();
                while let Some(expression) = iter.next() {
                    self.compile_expression(expression)?;
                    if iter.peek().is_some() {
                        self.builder.emit(Op::Pop);
                    }
                }
            }

            Expression::Member(member) => {
                self.compile_expression(&member.object)?;
                self.compile_member_get(member)?;
            }

            Expression::Call(call) => self.compile_call(call)?,

            Expression::New(call) => {
                self.compile_expression(&call.callee)?;
                let argc = self.compile_arguments(call)?;
                self.builder.emit(Op::New { argc });
            }
        }
        Ok(())
    }

    /// `obj → obj[property]`; for a computed key the key is compiled here.
    fn compile_member_get(&mut self, member: &MemberExpression) -> Result<(), JsError> {
        match &member.property {
            MemberProperty::Identifier(id) => {
                let name = self.builder.add_string(&id.name)?;
                self.builder.emit(Op::GetPropName { name });
            }
            MemberProperty::Expression(key) => {
                self.compile_expression(key)?;
                self.builder.emit(Op::GetProp);
            }
        }
        Ok(())
    }

    fn compile_array(&mut self, array: &ArrayExpression) -> Result<(), JsError> {
        self.builder.emit(Op::NewArray);
        for element in &array.elements {
            match element {
                Some(element) => self.compile_expression(element)?,
                None => {
                    self.builder.emit(Op::Undefined);
                }
            }
            self.builder.emit(Op::InitArray);
        }
        Ok(())
    }

    fn compile_object(&mut self, object: &ObjectExpression) -> Result<(), JsError> {
        self.builder.emit(Op::NewObject);
        for property in &object.properties {
            self.compile_expression(&property.value)?;
            let name = self.builder.add_string(&property.key)?;
            self.builder.emit(Op::InitProp { name });
        }
        Ok(())
    }

    fn compile_unary(&mut self, unary: &UnaryExpression) -> Result<(), JsError> {
        let op = match unary.operator {
            UnaryOp::Minus => Op::Neg,
            UnaryOp::Plus => Op::Pos,
            UnaryOp::Not => Op::LogNot,
            UnaryOp::BitNot => Op::BitNot,
            UnaryOp::Typeof => {
                // An unbound name is "undefined", not a ReferenceError
                if let Expression::Identifier(id) = unary.argument.as_ref() {
                    let name = self.builder.add_string(&id.name)?;
                    self.builder.emit(Op::TryGetVar { name });
                } else {
                    self.compile_expression(&unary.argument)?;
                }
                self.builder.emit(Op::Typeof);
                return Ok(());
            }
            UnaryOp::Void => {
                self.compile_expression(&unary.argument)?;
                self.builder.emit(Op::Pop);
                self.builder.emit(Op::Undefined);
                return Ok(());
            }
            UnaryOp::Delete => return self.compile_delete(&unary.argument),
        };
        self.compile_expression(&unary.argument)?;
        self.builder.emit(op);
        Ok(())
    }

    fn compile_delete(&mut self, argument: &Expression) -> Result<(), JsError> {
        match argument {
            Expression::Identifier(id) => {
                let name = self.builder.add_string(&id.name)?;
                self.builder.emit(Op::DelVar { name });
            }
            Expression::Member(member) => {
                self.compile_expression(&member.object)?;
                match &member.property {
                    MemberProperty::Identifier(id) => {
                        let name = self.builder.add_string(&id.name)?;
                        self.builder.emit(Op::DelPropName { name });
                    }
                    MemberProperty::Expression(key) => {
                        self.compile_expression(key)?;
                        self.builder.emit(Op::DelProp);
                    }
                }
            }
            other => {
                // Deleting a non-reference evaluates it and yields true
                self.compile_expression(other)?;
                self.builder.emit(Op::Pop);
                self.builder.emit(Op::True);
            }
        }
        Ok(())
    }

    fn compile_update(&mut self, update: &UpdateExpression) -> Result<(), JsError> {
        let step = match update.operator {
            UpdateOp::Increment => Op::Inc,
            UpdateOp::Decrement => Op::Dec,
        };

        match update.argument.as_ref() {
            Expression::Identifier(id) => {
                let name = self.builder.add_string(&id.name)?;
                self.builder.emit(Op::GetVar { name });
                if update.prefix {
                    self.builder.emit(step);
                    self.builder.emit(Op::SetVar { name });
                } else {
                    // old; old new → store new, keep old
                    self.builder.emit(Op::Pos);
                    self.builder.emit(Op::Dup);
                    self.builder.emit(step);
                    self.builder.emit(Op::SetVar { name });
                    self.builder.emit(Op::Pop);
                }
            }
            Expression::Member(member) => {
                self.compile_expression(&member.object)?;
                match &member.property {
                    MemberProperty::Identifier(id) => {
                        let name = self.builder.add_string(&id.name)?;
                        self.builder.emit(Op::Dup);
                        self.builder.emit(Op::GetPropName { name });
                        if update.prefix {
                            self.builder.emit(step);
                        } else {
                            self.builder.emit(Op::Pos);
                            self.builder.emit(Op::Dup);
                            self.builder.emit(Op::Rot3);
                            self.builder.emit(step);
                        }
                        self.builder.emit(Op::SetPropName { name });
                    }
                    MemberProperty::Expression(key) => {
                        self.compile_expression(key)?;
                        self.builder.emit(Op::Dup2);
                        self.builder.emit(Op::GetProp);
                        if update.prefix {
                            self.builder.emit(step);
                        } else {
                            self.builder.emit(Op::Pos);
                            self.builder.emit(Op::Dup);
                            self.builder.emit(Op::Rot4);
                            self.builder.emit(step);
                        }
                        self.builder.emit(Op::SetProp);
                    }
                }
                if !update.prefix {
                    self.builder.emit(Op::Pop);
                }
            }
            other => {
                return Err(self.error("invalid increment/decrement operand", other.span()));
            }
        }
        Ok(())
    }

    /// `a && b`: a; Dup; JumpIfFalse end; Pop; b; end:
    fn compile_logical(&mut self, logical: &LogicalExpression) -> Result<(), JsError> {
        self.compile_expression(&logical.left)?;
        self.builder.emit(Op::Dup);
        let end_jump = match logical.operator {
            LogicalOp::And => self.builder.emit_jump_if_false(),
            LogicalOp::Or => self.builder.emit_jump_if_true(),
        };
        self.builder.emit(Op::Pop);
        self.compile_expression(&logical.right)?;
        self.builder.patch_jump(end_jump);
        Ok(())
    }

    fn compile_conditional(&mut self, conditional: &ConditionalExpression) -> Result<(), JsError> {
        self.compile_expression(&conditional.test)?;
        let else_jump = self.builder.emit_jump_if_false();
        self.compile_expression(&conditional.consequent)?;
        let end_jump = self.builder.emit_jump();
        self.builder.patch_jump(else_jump);
        self.compile_expression(&conditional.alternate)?;
        self.builder.patch_jump(end_jump);
        Ok(())
    }

    fn compile_assignment(&mut self, assign: &AssignmentExpression) -> Result<(), JsError> {
        let compound = assign.operator.binary_op().map(binary_op);

        match assign.left.as_ref() {
            Expression::Identifier(id) => {
                let name = self.builder.add_string(&id.name)?;
                if let Some(op) = compound {
                    self.builder.emit(Op::GetVar { name });
                    self.compile_expression(&assign.right)?;
                    self.builder.emit(op);
                } else {
                    self.compile_expression(&assign.right)?;
                }
                self.builder.emit(Op::SetVar { name });
            }
            Expression::Member(member) => {
                self.compile_expression(&member.object)?;
                match &member.property {
                    MemberProperty::Identifier(id) => {
                        let name = self.builder.add_string(&id.name)?;
                        if let Some(op) = compound {
                            self.builder.emit(Op::Dup);
                            self.builder.emit(Op::GetPropName { name });
                            self.compile_expression(&assign.right)?;
                            self.builder.emit(op);
                        } else {
                            self.compile_expression(&assign.right)?;
                        }
                        self.builder.emit(Op::SetPropName { name });
                    }
                    MemberProperty::Expression(key) => {
                        self.compile_expression(key)?;
                        if let Some(op) = compound {
                            self.builder.emit(Op::Dup2);
                            self.builder.emit(Op::GetProp);
                            self.compile_expression(&assign.right)?;
                            self.builder.emit(op);
                        } else {
                            self.compile_expression(&assign.right)?;
                        }
                        self.builder.emit(Op::SetProp);
                    }
                }
            }
            other => {
                let message = if assign.operator == AssignmentOp::Assign {
                    "invalid assignment target"
                } else {
                    "invalid compound assignment target"
                };
                return Err(self.error(message, other.span()));
            }
        }
        Ok(())
    }

    /// `[fn, this, args…]` then `Call`; a member callee supplies its base
    /// object as `this`.
    fn compile_call(&mut self, call: &CallExpression) -> Result<(), JsError> {
        match call.callee.as_ref() {
            Expression::Member(member) => {
                self.compile_expression(&member.object)?;
                self.builder.emit(Op::Dup);
                self.compile_member_get(member)?;
                self.builder.emit(Op::Rot2);
            }
            callee => {
                self.compile_expression(callee)?;
                self.builder.emit(Op::Undefined);
            }
        }
        let argc = self.compile_arguments(call)?;
        self.builder.set_line(call.span.line);
        self.builder.emit(Op::Call { argc });
        Ok(())
    }

    fn compile_arguments(&mut self, call: &CallExpression) -> Result<u16, JsError> {
        let argc = u16::try_from(call.arguments.len())
            .map_err(|_| self.error("too many arguments", call.span))?;
        for argument in &call.arguments {
            self.compile_expression(argument)?;
        }
        Ok(argc)
    }
}

fn binary_op(op: BinaryOp) -> Op {
    match op {
        BinaryOp::Add => Op::Add,
        BinaryOp::Sub => Op::Sub,
        BinaryOp::Mul => Op::Mul,
        BinaryOp::Div => Op::Div,
        BinaryOp::Mod => Op::Mod,
        BinaryOp::Eq => Op::Eq,
        BinaryOp::NotEq => Op::Ne,
        BinaryOp::StrictEq => Op::StrictEq,
        BinaryOp::StrictNotEq => Op::StrictNe,
        BinaryOp::Lt => Op::Lt,
        BinaryOp::LtEq => Op::Le,
        BinaryOp::Gt => Op::Gt,
        BinaryOp::GtEq => Op::Ge,
        BinaryOp::LShift => Op::Shl,
        BinaryOp::RShift => Op::Shr,
        BinaryOp::URShift => Op::Ushr,
        BinaryOp::BitAnd => Op::BitAnd,
        BinaryOp::BitOr => Op::BitOr,
        BinaryOp::BitXor => Op::BitXor,
        BinaryOp::In => Op::In,
        BinaryOp::Instanceof => Op::Instanceof,
    }
}
