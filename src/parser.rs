//! Parser for ES5 source text
//!
//! Recursive descent for statements, precedence climbing for binary
//! operators. Nesting is bounded by `max_depth` so hostile input cannot
//! exhaust the native stack.

use std::rc::Rc;

use crate::ast::*;
use crate::error::JsError;
use crate::lexer::{Lexer, Span, Token, TokenKind};
use crate::string_dict::StringDict;
use crate::value::{JsString, number_to_string};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    file: JsString,
    depth: usize,
    max_depth: usize,
    /// Inside a `for (...;` head, where `in` is not a binary operator
    no_in: bool,
}

impl<'a> Parser<'a> {
    pub fn new(
        source: &'a str,
        file: JsString,
        string_dict: &'a mut StringDict,
        max_depth: usize,
    ) -> Self {
        let mut lexer = Lexer::new(source, string_dict);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            previous: Token::eof(0, 1, 1),
            file,
            depth: 0,
            max_depth,
            no_in: false,
        }
    }

    #[inline]
    fn intern(&mut self, s: &str) -> JsString {
        self.lexer.string_dict().get_or_insert(s)
    }

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program, JsError> {
        let start = self.current.span;
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(Program {
            body,
            span: self.span_from(start),
        })
    }

    fn enter(&mut self) -> Result<(), JsError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error("too much nesting"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // ============ STATEMENTS ============

    fn parse_statement(&mut self) -> Result<Statement, JsError> {
        self.enter()?;
        let result = self.parse_statement_inner();
        self.leave();
        result
    }

    fn parse_statement_inner(&mut self) -> Result<Statement, JsError> {
        if self.check_identifier() && self.peek_is(&TokenKind::Colon) {
            return self.parse_labeled_statement();
        }

        match &self.current.kind {
            TokenKind::LBrace => Ok(Statement::Block(self.parse_block_statement()?)),
            TokenKind::Var => {
                let decl = self.parse_variable_declaration()?;
                self.expect_semicolon()?;
                Ok(Statement::VariableDeclaration(decl))
            }
            TokenKind::Function => {
                let function = self.parse_function(true)?;
                Ok(Statement::FunctionDeclaration(Rc::new(function)))
            }
            TokenKind::If => self.parse_if_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::With => self.parse_with_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => Ok(Statement::Break(self.parse_jump_statement()?)),
            TokenKind::Continue => Ok(Statement::Continue(self.parse_jump_statement()?)),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::Debugger => {
                let span = self.current.span;
                self.advance();
                self.expect_semicolon()?;
                Ok(Statement::Debugger(span))
            }
            TokenKind::Semicolon => {
                let span = self.current.span;
                self.advance();
                Ok(Statement::Empty(span))
            }
            _ => {
                let start = self.current.span;
                let expression = self.parse_expression()?;
                self.expect_semicolon()?;
                Ok(Statement::Expression(ExpressionStatement {
                    expression,
                    span: self.span_from(start),
                }))
            }
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<VariableDeclaration, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Var)?;
        let mut declarations = vec![self.parse_variable_declarator()?];
        while self.match_token(&TokenKind::Comma) {
            declarations.push(self.parse_variable_declarator()?);
        }
        Ok(VariableDeclaration {
            declarations,
            span: self.span_from(start),
        })
    }

    fn parse_variable_declarator(&mut self) -> Result<VariableDeclarator, JsError> {
        let start = self.current.span;
        let id = self.parse_identifier()?;
        let init = if self.match_token(&TokenKind::Eq) {
            Some(self.parse_assignment_expression()?)
        } else {
            None
        };
        Ok(VariableDeclarator {
            id,
            init,
            span: self.span_from(start),
        })
    }

    /// `function name? (params) { body }`; declarations require the name.
    fn parse_function(&mut self, require_name: bool) -> Result<FunctionNode, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Function)?;

        let id = if self.check_identifier() || require_name {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        self.require_token(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.parse_identifier()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.require_token(&TokenKind::RParen)?;

        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        self.require_token(&TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.require_token(&TokenKind::RBrace)?;
        self.no_in = saved_no_in;

        Ok(FunctionNode {
            id,
            params,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_block_statement(&mut self) -> Result<BlockStatement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.require_token(&TokenKind::RBrace)?;
        Ok(BlockStatement {
            body,
            span: self.span_from(start),
        })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::If)?;
        self.require_token(&TokenKind::LParen)?;
        let test = self.parse_expression()?;
        self.require_token(&TokenKind::RParen)?;
        let consequent = Rc::new(self.parse_statement()?);
        let alternate = if self.match_token(&TokenKind::Else) {
            Some(Rc::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
            span: self.span_from(start),
        }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::For)?;
        self.require_token(&TokenKind::LParen)?;

        let mut init = None;
        if self.check(&TokenKind::Var) {
            self.no_in = true;
            let decl = self.parse_variable_declaration();
            self.no_in = false;
            let decl = decl?;

            if self.check(&TokenKind::In) {
                let only = match decl.declarations.as_slice() {
                    [single] if single.init.is_none() => single.id.clone(),
                    _ => return Err(self.error("invalid left-hand side in for-in loop")),
                };
                return self.parse_for_in_rest(start, ForInTarget::Variable(only));
            }
            init = Some(ForInit::Variable(decl));
        } else if !self.check(&TokenKind::Semicolon) {
            self.no_in = true;
            let expr = self.parse_expression();
            self.no_in = false;
            let expr = expr?;

            if self.check(&TokenKind::In) {
                return self.parse_for_in_rest(start, ForInTarget::Expression(expr));
            }
            init = Some(ForInit::Expression(expr));
        }

        self.require_token(&TokenKind::Semicolon)?;
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.require_token(&TokenKind::Semicolon)?;
        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.require_token(&TokenKind::RParen)?;
        let body = Rc::new(self.parse_statement()?);

        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_for_in_rest(&mut self, start: Span, left: ForInTarget) -> Result<Statement, JsError> {
        self.require_token(&TokenKind::In)?;
        let right = self.parse_expression()?;
        self.require_token(&TokenKind::RParen)?;
        let body = Rc::new(self.parse_statement()?);
        Ok(Statement::ForIn(ForInStatement {
            left,
            right,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::While)?;
        self.require_token(&TokenKind::LParen)?;
        let test = self.parse_expression()?;
        self.require_token(&TokenKind::RParen)?;
        let body = Rc::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement {
            test,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Do)?;
        let body = Rc::new(self.parse_statement()?);
        self.require_token(&TokenKind::While)?;
        self.require_token(&TokenKind::LParen)?;
        let test = self.parse_expression()?;
        self.require_token(&TokenKind::RParen)?;
        // The semicolon after do-while is always optional
        self.match_token(&TokenKind::Semicolon);
        Ok(Statement::DoWhile(DoWhileStatement {
            body,
            test,
            span: self.span_from(start),
        }))
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Switch)?;
        self.require_token(&TokenKind::LParen)?;
        let discriminant = self.parse_expression()?;
        self.require_token(&TokenKind::RParen)?;
        self.require_token(&TokenKind::LBrace)?;

        let mut cases = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let case_start = self.current.span;
            let test = if self.match_token(&TokenKind::Case) {
                Some(self.parse_expression()?)
            } else if self.match_token(&TokenKind::Default) {
                None
            } else {
                return Err(self.unexpected_token("'case' or 'default'"));
            };
            self.require_token(&TokenKind::Colon)?;

            let mut consequent = Vec::new();
            while !matches!(
                self.current.kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                consequent.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                test,
                consequent,
                span: self.span_from(case_start),
            });
        }
        self.require_token(&TokenKind::RBrace)?;

        Ok(Statement::Switch(SwitchStatement {
            discriminant,
            cases,
            span: self.span_from(start),
        }))
    }

    fn parse_try_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Try)?;
        let block = self.parse_block_statement()?;

        let handler = if self.check(&TokenKind::Catch) {
            let catch_start = self.current.span;
            self.advance();
            self.require_token(&TokenKind::LParen)?;
            let param = self.parse_identifier()?;
            self.require_token(&TokenKind::RParen)?;
            let body = self.parse_block_statement()?;
            Some(CatchClause {
                param,
                body,
                span: self.span_from(catch_start),
            })
        } else {
            None
        };

        let finalizer = if self.match_token(&TokenKind::Finally) {
            Some(Rc::new(self.parse_block_statement()?))
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected_token("'catch' or 'finally'"));
        }

        Ok(Statement::Try(TryStatement {
            block,
            handler,
            finalizer,
            span: self.span_from(start),
        }))
    }

    fn parse_with_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::With)?;
        self.require_token(&TokenKind::LParen)?;
        let object = self.parse_expression()?;
        self.require_token(&TokenKind::RParen)?;
        let body = Rc::new(self.parse_statement()?);
        Ok(Statement::With(WithStatement {
            object,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Return)?;
        let argument = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_semicolon()?;
        Ok(Statement::Return(ReturnStatement {
            argument,
            span: self.span_from(start),
        }))
    }

    /// `break` or `continue` with an optional same-line label
    fn parse_jump_statement(&mut self) -> Result<JumpStatement, JsError> {
        let start = self.current.span;
        self.advance();
        let label = if self.check_identifier() && !self.lexer.had_newline_before() {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        self.expect_semicolon()?;
        Ok(JumpStatement {
            label,
            span: self.span_from(start),
        })
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Throw)?;
        if self.lexer.had_newline_before() {
            return Err(self.error("illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.expect_semicolon()?;
        Ok(Statement::Throw(ThrowStatement {
            argument,
            span: self.span_from(start),
        }))
    }

    fn parse_labeled_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        let label = self.parse_identifier()?;
        self.require_token(&TokenKind::Colon)?;
        let body = Rc::new(self.parse_statement()?);
        Ok(Statement::Labeled(LabeledStatement {
            label,
            body,
            span: self.span_from(start),
        }))
    }

    // ============ EXPRESSIONS ============

    fn parse_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let first = self.parse_assignment_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.match_token(&TokenKind::Comma) {
            expressions.push(self.parse_assignment_expression()?);
        }
        Ok(Expression::Sequence(SequenceExpression {
            expressions,
            span: self.span_from(start),
        }))
    }

    fn parse_assignment_expression(&mut self) -> Result<Expression, JsError> {
        self.enter()?;
        let result = self.parse_assignment_expression_inner();
        self.leave();
        result
    }

    fn parse_assignment_expression_inner(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let left = self.parse_conditional_expression()?;

        // Target validity is checked by the compiler
        if let Some(operator) = self.current_assignment_op() {
            self.advance();
            let right = self.parse_assignment_expression()?;
            return Ok(Expression::Assignment(AssignmentExpression {
                operator,
                left: Rc::new(left),
                right: Rc::new(right),
                span: self.span_from(start),
            }));
        }

        Ok(left)
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let test = self.parse_binary_expression(0)?;

        if self.match_token(&TokenKind::Question) {
            let saved_no_in = std::mem::replace(&mut self.no_in, false);
            let consequent = self.parse_assignment_expression();
            self.no_in = saved_no_in;
            let consequent = Rc::new(consequent?);
            self.require_token(&TokenKind::Colon)?;
            let alternate = Rc::new(self.parse_assignment_expression()?);
            return Ok(Expression::Conditional(ConditionalExpression {
                test: Rc::new(test),
                consequent,
                alternate,
                span: self.span_from(start),
            }));
        }

        Ok(test)
    }

    /// Precedence climbing over binary and logical operators
    fn parse_binary_expression(&mut self, min_prec: u8) -> Result<Expression, JsError> {
        let depth = self.depth;
        let result = self.parse_binary_chain(min_prec);
        self.depth = depth;
        result
    }

    /// Every operator folded into `left` nests the tree one level deeper.
    fn parse_binary_chain(&mut self, min_prec: u8) -> Result<Expression, JsError> {
        let start = self.current.span;
        let mut left = self.parse_unary_expression()?;

        while let Some((op, prec)) = self.current_binary_op() {
            if prec < min_prec {
                break;
            }
            self.enter()?;
            self.advance();
            let right = Rc::new(self.parse_binary_expression(prec + 1)?);
            let span = self.span_from(start);

            left = match op {
                BinaryOrLogical::Logical(operator) => Expression::Logical(LogicalExpression {
                    operator,
                    left: Rc::new(left),
                    right,
                    span,
                }),
                BinaryOrLogical::Binary(operator) => Expression::Binary(BinaryExpression {
                    operator,
                    left: Rc::new(left),
                    right,
                    span,
                }),
            };
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, JsError> {
        self.enter()?;
        let result = self.parse_unary_expression_inner();
        self.leave();
        result
    }

    fn parse_unary_expression_inner(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;

        if let Some(operator) = self.current_unary_op() {
            self.advance();
            let argument = Rc::new(self.parse_unary_expression()?);
            return Ok(Expression::Unary(UnaryExpression {
                operator,
                argument,
                span: self.span_from(start),
            }));
        }

        if let Some(operator) = self.current_update_op() {
            self.advance();
            let argument = Rc::new(self.parse_unary_expression()?);
            return Ok(Expression::Update(UpdateExpression {
                operator,
                prefix: true,
                argument,
                span: self.span_from(start),
            }));
        }

        self.parse_postfix_expression()
    }

    fn parse_postfix_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let expr = self.parse_left_hand_side_expression()?;

        if !self.lexer.had_newline_before() {
            if let Some(operator) = self.current_update_op() {
                self.advance();
                return Ok(Expression::Update(UpdateExpression {
                    operator,
                    prefix: false,
                    argument: Rc::new(expr),
                    span: self.span_from(start),
                }));
            }
        }

        Ok(expr)
    }

    fn parse_left_hand_side_expression(&mut self) -> Result<Expression, JsError> {
        let depth = self.depth;
        let result = self.parse_call_chain();
        self.depth = depth;
        result
    }

    fn parse_call_chain(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };

        loop {
            self.enter()?;
            if self.check(&TokenKind::LParen) {
                let arguments = self.parse_arguments()?;
                expr = Expression::Call(CallExpression {
                    callee: Rc::new(expr),
                    arguments,
                    span: self.span_from(start),
                });
            } else if let Some(property) = self.parse_member_suffix()? {
                expr = Expression::Member(MemberExpression {
                    object: Rc::new(expr),
                    property,
                    span: self.span_from(start),
                });
            } else {
                return Ok(expr);
            }
        }
    }

    /// `new` callee with its member accesses and optional argument list
    fn parse_new_expression(&mut self) -> Result<Expression, JsError> {
        let depth = self.depth;
        self.enter()?;
        let start = self.current.span;
        let result = (|| {
            self.require_token(&TokenKind::New)?;
            let mut callee = if self.check(&TokenKind::New) {
                self.parse_new_expression()?
            } else {
                self.parse_primary_expression()?
            };
            while let Some(property) = self.parse_member_suffix()? {
                self.enter()?;
                callee = Expression::Member(MemberExpression {
                    object: Rc::new(callee),
                    property,
                    span: self.span_from(start),
                });
            }
            let arguments = if self.check(&TokenKind::LParen) {
                self.parse_arguments()?
            } else {
                Vec::new()
            };
            Ok(Expression::New(CallExpression {
                callee: Rc::new(callee),
                arguments,
                span: self.span_from(start),
            }))
        })();
        self.depth = depth;
        result
    }

    /// `.name` or `[expr]`, if present
    fn parse_member_suffix(&mut self) -> Result<Option<MemberProperty>, JsError> {
        if self.match_token(&TokenKind::Dot) {
            let name = self.parse_identifier_name()?;
            return Ok(Some(MemberProperty::Identifier(name)));
        }
        if self.match_token(&TokenKind::LBracket) {
            let saved_no_in = std::mem::replace(&mut self.no_in, false);
            let property = self.parse_expression();
            self.no_in = saved_no_in;
            let property = property?;
            self.require_token(&TokenKind::RBracket)?;
            return Ok(Some(MemberProperty::Expression(Rc::new(property))));
        }
        Ok(None)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, JsError> {
        self.require_token(&TokenKind::LParen)?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut arguments = Vec::new();
        let result = (|| {
            if !self.check(&TokenKind::RParen) {
                loop {
                    arguments.push(self.parse_assignment_expression()?);
                    if !self.match_token(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.require_token(&TokenKind::RParen)
        })();
        self.no_in = saved_no_in;
        result?;
        Ok(arguments)
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let literal = |value| {
            Ok(Expression::Literal(Literal { value, span: start }))
        };

        match self.current.kind.clone() {
            TokenKind::Identifier(_) => Ok(Expression::Identifier(self.parse_identifier()?)),
            TokenKind::Number(n) => {
                self.advance();
                literal(LiteralValue::Number(n))
            }
            TokenKind::String(s) => {
                self.advance();
                literal(LiteralValue::String(s))
            }
            TokenKind::True => {
                self.advance();
                literal(LiteralValue::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                literal(LiteralValue::Boolean(false))
            }
            TokenKind::Null => {
                self.advance();
                literal(LiteralValue::Null)
            }
            TokenKind::This => {
                self.advance();
                Ok(Expression::This(start))
            }
            TokenKind::LParen => {
                self.advance();
                let saved_no_in = std::mem::replace(&mut self.no_in, false);
                let expr = self.parse_expression();
                self.no_in = saved_no_in;
                let expr = expr?;
                self.require_token(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Function => Ok(Expression::Function(Rc::new(self.parse_function(false)?))),
            TokenKind::Slash | TokenKind::SlashEq => {
                Err(self.error("regular expression literals are not supported"))
            }
            _ => Err(self.unexpected_token("expression")),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::LBracket)?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut elements = Vec::new();
        let result = (|| {
            loop {
                if self.match_token(&TokenKind::RBracket) {
                    return Ok(());
                }
                if self.match_token(&TokenKind::Comma) {
                    elements.push(None);
                    continue;
                }
                elements.push(Some(self.parse_assignment_expression()?));
                if !self.match_token(&TokenKind::Comma) {
                    return self.require_token(&TokenKind::RBracket);
                }
            }
        })();
        self.no_in = saved_no_in;
        result?;
        Ok(Expression::Array(ArrayExpression {
            elements,
            span: self.span_from(start),
        }))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::LBrace)?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut properties = Vec::new();
        let result = (|| {
            while !self.check(&TokenKind::RBrace) {
                let prop_start = self.current.span;
                let key = self.parse_property_name()?;
                if (key == "get" || key == "set") && !self.check(&TokenKind::Colon) {
                    return Err(self.error("getters and setters are not supported"));
                }
                self.require_token(&TokenKind::Colon)?;
                let value = self.parse_assignment_expression()?;
                properties.push(ObjectProperty {
                    key,
                    value,
                    span: self.span_from(prop_start),
                });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.require_token(&TokenKind::RBrace)
        })();
        self.no_in = saved_no_in;
        result?;
        Ok(Expression::Object(ObjectExpression {
            properties,
            span: self.span_from(start),
        }))
    }

    fn parse_property_name(&mut self) -> Result<JsString, JsError> {
        match self.current.kind.clone() {
            TokenKind::String(s) => {
                self.advance();
                Ok(s)
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(self.intern(&number_to_string(n)))
            }
            _ => Ok(self.parse_identifier_name()?.name),
        }
    }

    // ============ HELPERS ============

    fn parse_identifier(&mut self) -> Result<Identifier, JsError> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let id = Identifier {
                    name: name.clone(),
                    span: self.current.span,
                };
                self.advance();
                Ok(id)
            }
            TokenKind::Reserved(word) => {
                Err(self.error(&format!("unexpected reserved word '{}'", word)))
            }
            _ => Err(self.unexpected_token("identifier")),
        }
    }

    /// Identifier, keyword or reserved word: anything allowed after `.`
    fn parse_identifier_name(&mut self) -> Result<Identifier, JsError> {
        let span = self.current.span;
        let name = match self.current.kind.clone() {
            TokenKind::Identifier(name) | TokenKind::Reserved(name) => name,
            kind => match kind.keyword_text() {
                Some(text) => self.intern(text),
                None => return Err(self.unexpected_token("property name")),
            },
        };
        self.advance();
        Ok(Identifier { name, span })
    }

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.lexer.next_token());
    }

    fn require_token(&mut self, kind: &TokenKind) -> Result<(), JsError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected_token(&format!("{:?}", kind)))
        }
    }

    /// No expression follows on this line (restricted productions)
    fn at_statement_end(&self) -> bool {
        self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.is_at_end()
            || self.lexer.had_newline_before()
    }

    fn expect_semicolon(&mut self) -> Result<(), JsError> {
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(());
        }

        // ASI: accept if at end, before }, or after newline
        if self.is_at_end() || self.check(&TokenKind::RBrace) || self.lexer.had_newline_before() {
            return Ok(());
        }

        Err(self.unexpected_token("';'"))
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    /// Check if the token after the current one is of the given kind
    fn peek_is(&mut self, kind: &TokenKind) -> bool {
        let checkpoint = self.lexer.checkpoint();
        let next = self.lexer.next_token();
        self.lexer.restore(checkpoint);
        std::mem::discriminant(&next.kind) == std::mem::discriminant(kind)
    }

    fn check_identifier(&self) -> bool {
        matches!(self.current.kind, TokenKind::Identifier(_))
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    fn span_from(&self, start: Span) -> Span {
        Span::new(
            start.start,
            self.previous.span.end,
            start.line,
            start.column,
        )
    }

    fn error(&self, message: &str) -> JsError {
        JsError::syntax_error(
            message,
            &self.file,
            self.current.span.line,
            self.current.span.column,
        )
    }

    fn unexpected_token(&self, expected: &str) -> JsError {
        let found = match &self.current.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::UnterminatedString => "unterminated string literal".to_string(),
            TokenKind::UnterminatedComment => "unterminated comment".to_string(),
            TokenKind::Invalid(c) => format!("character '{}'", c),
            kind => format!("{:?}", kind),
        };
        self.error(&format!("unexpected {}, expected {}", found, expected))
    }

    /// Operator and precedence of the current token, if it is binary
    fn current_binary_op(&self) -> Option<(BinaryOrLogical, u8)> {
        use BinaryOrLogical::{Binary, Logical};
        Some(match &self.current.kind {
            TokenKind::PipePipe => (Logical(LogicalOp::Or), 1),
            TokenKind::AmpAmp => (Logical(LogicalOp::And), 2),
            TokenKind::Pipe => (Binary(BinaryOp::BitOr), 3),
            TokenKind::Caret => (Binary(BinaryOp::BitXor), 4),
            TokenKind::Amp => (Binary(BinaryOp::BitAnd), 5),
            TokenKind::EqEq => (Binary(BinaryOp::Eq), 6),
            TokenKind::BangEq => (Binary(BinaryOp::NotEq), 6),
            TokenKind::EqEqEq => (Binary(BinaryOp::StrictEq), 6),
            TokenKind::BangEqEq => (Binary(BinaryOp::StrictNotEq), 6),
            TokenKind::Lt => (Binary(BinaryOp::Lt), 7),
            TokenKind::LtEq => (Binary(BinaryOp::LtEq), 7),
            TokenKind::Gt => (Binary(BinaryOp::Gt), 7),
            TokenKind::GtEq => (Binary(BinaryOp::GtEq), 7),
            TokenKind::Instanceof => (Binary(BinaryOp::Instanceof), 7),
            TokenKind::In if !self.no_in => (Binary(BinaryOp::In), 7),
            TokenKind::LtLt => (Binary(BinaryOp::LShift), 8),
            TokenKind::GtGt => (Binary(BinaryOp::RShift), 8),
            TokenKind::GtGtGt => (Binary(BinaryOp::URShift), 8),
            TokenKind::Plus => (Binary(BinaryOp::Add), 9),
            TokenKind::Minus => (Binary(BinaryOp::Sub), 9),
            TokenKind::Star => (Binary(BinaryOp::Mul), 10),
            TokenKind::Slash => (Binary(BinaryOp::Div), 10),
            TokenKind::Percent => (Binary(BinaryOp::Mod), 10),
            _ => return None,
        })
    }

    fn current_unary_op(&self) -> Option<UnaryOp> {
        match &self.current.kind {
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        }
    }

    fn current_update_op(&self) -> Option<UpdateOp> {
        match &self.current.kind {
            TokenKind::PlusPlus => Some(UpdateOp::Increment),
            TokenKind::MinusMinus => Some(UpdateOp::Decrement),
            _ => None,
        }
    }

    fn current_assignment_op(&self) -> Option<AssignmentOp> {
        match &self.current.kind {
            TokenKind::Eq => Some(AssignmentOp::Assign),
            TokenKind::PlusEq => Some(AssignmentOp::AddAssign),
            TokenKind::MinusEq => Some(AssignmentOp::SubAssign),
            TokenKind::StarEq => Some(AssignmentOp::MulAssign),
            TokenKind::SlashEq => Some(AssignmentOp::DivAssign),
            TokenKind::PercentEq => Some(AssignmentOp::ModAssign),
            TokenKind::AmpEq => Some(AssignmentOp::BitAndAssign),
            TokenKind::PipeEq => Some(AssignmentOp::BitOrAssign),
            TokenKind::CaretEq => Some(AssignmentOp::BitXorAssign),
            TokenKind::LtLtEq => Some(AssignmentOp::LShiftAssign),
            TokenKind::GtGtEq => Some(AssignmentOp::RShiftAssign),
            TokenKind::GtGtGtEq => Some(AssignmentOp::URShiftAssign),
            _ => None,
        }
    }
}

enum BinaryOrLogical {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Parse `source` into a program.
pub fn parse(
    source: &str,
    file: &JsString,
    dict: &mut StringDict,
    max_depth: usize,
) -> Result<Program, JsError> {
    Parser::new(source, file.clone(), dict, max_depth).parse_program()
}
