//! Abstract Syntax Tree types
//!
//! Produced by the parser and consumed by the bytecode compiler. Child
//! nodes are shared through `Rc` so the compiler can keep a `finally` block
//! around while it inlines it at every exit.

use std::rc::Rc;

use crate::lexer::Span;
use crate::value::JsString;

#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: JsString,
    pub span: Span,
}

// ═══════════════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum Statement {
    VariableDeclaration(VariableDeclaration),
    FunctionDeclaration(Rc<FunctionNode>),
    Block(BlockStatement),
    If(IfStatement),
    Switch(SwitchStatement),
    For(ForStatement),
    ForIn(ForInStatement),
    While(WhileStatement),
    DoWhile(DoWhileStatement),
    Try(TryStatement),
    With(WithStatement),
    Return(ReturnStatement),
    Break(JumpStatement),
    Continue(JumpStatement),
    Throw(ThrowStatement),
    Labeled(LabeledStatement),
    Expression(ExpressionStatement),
    Debugger(Span),
    Empty(Span),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::VariableDeclaration(s) => s.span,
            Statement::FunctionDeclaration(f) => f.span,
            Statement::Block(s) => s.span,
            Statement::If(s) => s.span,
            Statement::Switch(s) => s.span,
            Statement::For(s) => s.span,
            Statement::ForIn(s) => s.span,
            Statement::While(s) => s.span,
            Statement::DoWhile(s) => s.span,
            Statement::Try(s) => s.span,
            Statement::With(s) => s.span,
            Statement::Return(s) => s.span,
            Statement::Break(s) | Statement::Continue(s) => s.span,
            Statement::Throw(s) => s.span,
            Statement::Labeled(s) => s.span,
            Statement::Expression(s) => s.span,
            Statement::Debugger(span) | Statement::Empty(span) => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub declarations: Vec<VariableDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct VariableDeclarator {
    pub id: Identifier,
    pub init: Option<Expression>,
    pub span: Span,
}

/// A function declaration or expression
#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub id: Option<Identifier>,
    pub params: Vec<Identifier>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BlockStatement {
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Rc<Statement>,
    pub alternate: Option<Rc<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchStatement {
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expression>,
    pub consequent: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Rc<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Variable(VariableDeclaration),
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub struct ForInStatement {
    pub left: ForInTarget,
    pub right: Expression,
    pub body: Rc<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ForInTarget {
    /// `for (var x in ...)`
    Variable(Identifier),
    /// `for (lhs in ...)`
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Rc<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DoWhileStatement {
    pub body: Rc<Statement>,
    pub test: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TryStatement {
    pub block: BlockStatement,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Rc<BlockStatement>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Identifier,
    pub body: BlockStatement,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WithStatement {
    pub object: Expression,
    pub body: Rc<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub argument: Option<Expression>,
    pub span: Span,
}

/// `break` or `continue`
#[derive(Debug, Clone)]
pub struct JumpStatement {
    pub label: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ThrowStatement {
    pub argument: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LabeledStatement {
    pub label: Identifier,
    pub body: Rc<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub span: Span,
}

// ═══════════════════════════════════════════════════════════════════════════
// Expressions
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum Expression {
    Identifier(Identifier),
    Literal(Literal),
    This(Span),
    Array(ArrayExpression),
    Object(ObjectExpression),
    Function(Rc<FunctionNode>),
    Unary(UnaryExpression),
    Update(UpdateExpression),
    Binary(BinaryExpression),
    Logical(LogicalExpression),
    Conditional(ConditionalExpression),
    Assignment(AssignmentExpression),
    Sequence(SequenceExpression),
    Member(MemberExpression),
    Call(CallExpression),
    New(CallExpression),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Identifier(e) => e.span,
            Expression::Literal(e) => e.span,
            Expression::This(span) => *span,
            Expression::Array(e) => e.span,
            Expression::Object(e) => e.span,
            Expression::Function(f) => f.span,
            Expression::Unary(e) => e.span,
            Expression::Update(e) => e.span,
            Expression::Binary(e) => e.span,
            Expression::Logical(e) => e.span,
            Expression::Conditional(e) => e.span,
            Expression::Assignment(e) => e.span,
            Expression::Sequence(e) => e.span,
            Expression::Member(e) => e.span,
            Expression::Call(e) | Expression::New(e) => e.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
}

#[derive(Debug, Clone)]
pub struct ArrayExpression {
    /// `None` marks an elision (`[1, , 3]`)
    pub elements: Vec<Option<Expression>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ObjectExpression {
    pub properties: Vec<ObjectProperty>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ObjectProperty {
    pub key: JsString,
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub operator: UnaryOp,
    pub argument: Rc<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Debug, Clone)]
pub struct UpdateExpression {
    pub operator: UpdateOp,
    pub prefix: bool,
    pub argument: Rc<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub operator: BinaryOp,
    pub left: Rc<Expression>,
    pub right: Rc<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LShift,
    RShift,
    URShift,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

#[derive(Debug, Clone)]
pub struct LogicalExpression {
    pub operator: LogicalOp,
    pub left: Rc<Expression>,
    pub right: Rc<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct ConditionalExpression {
    pub test: Rc<Expression>,
    pub consequent: Rc<Expression>,
    pub alternate: Rc<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct AssignmentExpression {
    pub operator: AssignmentOp,
    pub left: Rc<Expression>,
    pub right: Rc<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    LShiftAssign,
    RShiftAssign,
    URShiftAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
}

impl AssignmentOp {
    /// The operator a compound assignment applies; `None` for plain `=`.
    pub fn binary_op(self) -> Option<BinaryOp> {
        Some(match self {
            AssignmentOp::Assign => return None,
            AssignmentOp::AddAssign => BinaryOp::Add,
            AssignmentOp::SubAssign => BinaryOp::Sub,
            AssignmentOp::MulAssign => BinaryOp::Mul,
            AssignmentOp::DivAssign => BinaryOp::Div,
            AssignmentOp::ModAssign => BinaryOp::Mod,
            AssignmentOp::LShiftAssign => BinaryOp::LShift,
            AssignmentOp::RShiftAssign => BinaryOp::RShift,
            AssignmentOp::URShiftAssign => BinaryOp::URShift,
            AssignmentOp::BitAndAssign => BinaryOp::BitAnd,
            AssignmentOp::BitOrAssign => BinaryOp::BitOr,
            AssignmentOp::BitXorAssign => BinaryOp::BitXor,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SequenceExpression {
    pub expressions: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MemberExpression {
    pub object: Rc<Expression>,
    pub property: MemberProperty,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum MemberProperty {
    /// `a.b`
    Identifier(Identifier),
    /// `a[b]`
    Expression(Rc<Expression>),
}

/// Call or `new` expression
#[derive(Debug, Clone)]
pub struct CallExpression {
    pub callee: Rc<Expression>,
    pub arguments: Vec<Expression>,
    pub span: Span,
}
