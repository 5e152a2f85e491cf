//! Declaration hoisting
//!
//! `var` declarations and function declarations are bound at the top of
//! their function (or program) before any statement runs. This pass collects
//! them without descending into nested functions, and notes whether the body
//! refers to `arguments` so the VM only builds that object when needed.

use std::rc::Rc;

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

use crate::ast::{
    Expression, ForInTarget, ForInit, FunctionNode, MemberProperty, Statement, VariableDeclaration,
};
use crate::value::{CheapClone, JsString};

#[derive(Default)]
pub(super) struct Hoisted {
    /// `var` names in first-declaration order
    pub vars: IndexSet<JsString, FxBuildHasher>,
    /// Function declarations in source order
    pub functions: Vec<Rc<FunctionNode>>,
    pub uses_arguments: bool,
}

pub(super) fn scan(body: &[Statement]) -> Hoisted {
    let mut hoisted = Hoisted::default();
    for statement in body {
        hoisted.statement(statement);
    }
    hoisted
}

impl Hoisted {
    fn declaration(&mut self, decl: &VariableDeclaration) {
        for declarator in &decl.declarations {
            self.vars.insert(declarator.id.name.cheap_clone());
            if let Some(init) = &declarator.init {
                self.expression(init);
            }
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDeclaration(decl) => self.declaration(decl),
            Statement::FunctionDeclaration(function) => {
                self.functions.push(Rc::clone(function));
            }
            Statement::Block(block) => {
                for s in &block.body {
                    self.statement(s);
                }
            }
            Statement::If(s) => {
                self.expression(&s.test);
                self.statement(&s.consequent);
                if let Some(alternate) = &s.alternate {
                    self.statement(alternate);
                }
            }
            Statement::Switch(s) => {
                self.expression(&s.discriminant);
                for case in &s.cases {
                    if let Some(test) = &case.test {
                        self.expression(test);
                    }
                    for s in &case.consequent {
                        self.statement(s);
                    }
                }
            }
            Statement::For(s) => {
                match &s.init {
                    Some(ForInit::Variable(decl)) => self.declaration(decl),
                    Some(ForInit::Expression(e)) => self.expression(e),
                    None => {}
                }
                if let Some(test) = &s.test {
                    self.expression(test);
                }
                if let Some(update) = &s.update {
                    self.expression(update);
                }
                self.statement(&s.body);
            }
            Statement::ForIn(s) => {
                match &s.left {
                    ForInTarget::Variable(id) => {
                        self.vars.insert(id.name.cheap_clone());
                    }
                    ForInTarget::Expression(e) => self.expression(e),
                }
                self.expression(&s.right);
                self.statement(&s.body);
            }
            Statement::While(s) => {
                self.expression(&s.test);
                self.statement(&s.body);
            }
            Statement::DoWhile(s) => {
                self.statement(&s.body);
                self.expression(&s.test);
            }
            Statement::Try(s) => {
                for stmt in &s.block.body {
                    self.statement(stmt);
                }
                if let Some(handler) = &s.handler {
                    for stmt in &handler.body.body {
                        self.statement(stmt);
                    }
                }
                if let Some(finalizer) = &s.finalizer {
                    for stmt in &finalizer.body {
                        self.statement(stmt);
                    }
                }
            }
            Statement::With(s) => {
                self.expression(&s.object);
                self.statement(&s.body);
            }
            Statement::Return(s) => {
                if let Some(argument) = &s.argument {
                    self.expression(argument);
                }
            }
            Statement::Throw(s) => self.expression(&s.argument),
            Statement::Labeled(s) => self.statement(&s.body),
            Statement::Expression(s) => self.expression(&s.expression),
            Statement::Break(_)
            | Statement::Continue(_)
            | Statement::Debugger(_)
            | Statement::Empty(_) => {}
        }
    }

    /// Only looks for `arguments`; function expressions are opaque.
    fn expression(&mut self, expression: &Expression) {
        if self.uses_arguments {
            return;
        }
        match expression {
            Expression::Identifier(id) => {
                if id.name == "arguments" {
                    self.uses_arguments = true;
                }
            }
            Expression::Literal(_) | Expression::This(_) | Expression::Function(_) => {}
            Expression::Array(e) => {
                for element in e.elements.iter().flatten() {
                    self.expression(element);
                }
            }
            Expression::Object(e) => {
                for property in &e.properties {
                    self.expression(&property.value);
                }
            }
            Expression::Unary(e) => self.expression(&e.argument),
            Expression::Update(e) => self.expression(&e.argument),
            Expression::Binary(e) => {
                self.expression(&e.left);
                self.expression(&e.right);
            }
            Expression::Logical(e) => {
                self.expression(&e.left);
                self.expression(&e.right);
            }
            Expression::Conditional(e) => {
                self.expression(&e.test);
                self.expression(&e.consequent);
                self.expression(&e.alternate);
            }
            Expression::Assignment(e) => {
                self.expression(&e.left);
                self.expression(&e.right);
            }
            Expression::Sequence(e) => {
                for e in &e.expressions {
                    self.expression(e);
                }
            }
            Expression::Member(e) => {
                self.expression(&e.object);
                if let MemberProperty::Expression(property) = &e.property {
                    self.expression(property);
                }
            }
            Expression::Call(e) | Expression::New(e) => {
                self.expression(&e.callee);
                for argument in &e.arguments {
                    self.expression(argument);
                }
            }
        }
    }
}
