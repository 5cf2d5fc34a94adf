//! Syntax tree produced by the parser and walked by the interpreter.

use std::rc::Rc;

use crate::types::JsString;

#[derive(Clone, Debug)]
pub struct Program {
    pub body: Vec<Statement>,
}

/// A statement together with the source line it starts on.
#[derive(Clone, Debug)]
pub struct Statement {
    pub line: u32,
    pub kind: StatementKind,
}

#[derive(Clone, Debug)]
pub enum StatementKind {
    Empty,
    Expression(Expression),
    Block(Vec<Statement>),
    Variable(Vec<VariableDeclarator>),
    If(IfStatement),
    While(WhileStatement),
    DoWhile(DoWhileStatement),
    For(ForStatement),
    ForIn(ForInStatement),
    Return(Option<Expression>),
    Break(Option<JsString>),
    Continue(Option<JsString>),
    Throw(Expression),
    Try(TryStatement),
    Switch(SwitchStatement),
    Labeled(JsString, Box<Statement>),
    With(Expression, Box<Statement>),
    FunctionDeclaration(Rc<FunctionDecl>),
}

#[derive(Clone, Debug)]
pub struct VariableDeclarator {
    pub name: JsString,
    pub init: Option<Expression>,
}

#[derive(Clone, Debug)]
pub enum Expression {
    Literal(Literal),
    Identifier(JsString),
    This,
    Array(Vec<Option<Expression>>),
    Object(Vec<Property>),
    Function(Rc<FunctionDecl>),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Logical(LogicalOp, Box<Expression>, Box<Expression>),
    Update(UpdateOp, bool, Box<Expression>), // op, prefix, argument
    Assign(AssignOp, Box<Expression>, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    Call(Box<Expression>, Vec<Expression>),
    New(Box<Expression>, Vec<Expression>),
    Member(Box<Expression>, MemberProperty),
    Typeof(Box<Expression>),
    Void(Box<Expression>),
    Delete(Box<Expression>),
    Sequence(Vec<Expression>),
}

#[derive(Clone, Debug)]
pub enum MemberProperty {
    Dot(JsString),
    Computed(Box<Expression>),
}

#[derive(Clone, Debug)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
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
    Gt,
    LtEq,
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

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
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

impl AssignOp {
    /// The binary operator a compound assignment applies, `None` for plain `=`.
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
            AssignOp::LShiftAssign => Some(BinaryOp::LShift),
            AssignOp::RShiftAssign => Some(BinaryOp::RShift),
            AssignOp::URShiftAssign => Some(BinaryOp::URShift),
            AssignOp::BitAndAssign => Some(BinaryOp::BitAnd),
            AssignOp::BitOrAssign => Some(BinaryOp::BitOr),
            AssignOp::BitXorAssign => Some(BinaryOp::BitXor),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expression,
}

#[derive(Clone, Debug)]
pub enum PropertyKey {
    Identifier(JsString),
    String(JsString),
    Number(f64),
}

#[derive(Clone, Debug)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
}

#[derive(Clone, Debug)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct DoWhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub enum ForInit {
    Variable(Vec<VariableDeclarator>),
    Expression(Expression),
}

#[derive(Clone, Debug)]
pub struct ForInStatement {
    pub left: ForInLeft,
    pub right: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub enum ForInLeft {
    Variable(VariableDeclarator),
    Target(Expression),
}

#[derive(Clone, Debug)]
pub struct TryStatement {
    pub block: Vec<Statement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Vec<Statement>>,
}

#[derive(Clone, Debug)]
pub struct CatchClause {
    pub param: JsString,
    pub body: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub struct SwitchStatement {
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub test: Option<Expression>,
    pub consequent: Vec<Statement>,
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Option<JsString>,
    pub params: Vec<JsString>,
    pub body: Vec<Statement>,
    pub line: u32,
}

impl Statement {
    pub fn is_loop(&self) -> bool {
        matches!(
            self.kind,
            StatementKind::While(_)
                | StatementKind::DoWhile(_)
                | StatementKind::For(_)
                | StatementKind::ForIn(_)
        )
    }
}

/// Names declared with `var` and function declarations directly in `body`,
/// not descending into nested functions. Functions are returned separately
/// so they can be instantiated before the body runs.
pub fn hoisted_declarations(body: &[Statement]) -> (Vec<JsString>, Vec<Rc<FunctionDecl>>) {
    let mut vars = Vec::new();
    let mut funcs = Vec::new();
    for stmt in body {
        collect_hoisted(stmt, &mut vars, &mut funcs);
    }
    (vars, funcs)
}

fn collect_hoisted(stmt: &Statement, vars: &mut Vec<JsString>, funcs: &mut Vec<Rc<FunctionDecl>>) {
    match &stmt.kind {
        StatementKind::Variable(decls) => decls.iter().for_each(|d| push_unique(vars, &d.name)),
        StatementKind::FunctionDeclaration(f) => funcs.push(f.clone()),
        StatementKind::Block(stmts) => {
            for s in stmts {
                collect_hoisted(s, vars, funcs);
            }
        }
        StatementKind::If(i) => {
            collect_hoisted(&i.consequent, vars, funcs);
            if let Some(alt) = &i.alternate {
                collect_hoisted(alt, vars, funcs);
            }
        }
        StatementKind::While(WhileStatement { body, .. })
        | StatementKind::DoWhile(DoWhileStatement { body, .. })
        | StatementKind::Labeled(_, body)
        | StatementKind::With(_, body) => collect_hoisted(body, vars, funcs),
        StatementKind::For(f) => {
            if let Some(ForInit::Variable(decls)) = &f.init {
                decls.iter().for_each(|d| push_unique(vars, &d.name));
            }
            collect_hoisted(&f.body, vars, funcs);
        }
        StatementKind::ForIn(f) => {
            if let ForInLeft::Variable(d) = &f.left {
                push_unique(vars, &d.name);
            }
            collect_hoisted(&f.body, vars, funcs);
        }
        StatementKind::Try(t) => {
            for s in t.block.iter() {
                collect_hoisted(s, vars, funcs);
            }
            if let Some(h) = &t.handler {
                for s in &h.body {
                    collect_hoisted(s, vars, funcs);
                }
            }
            for s in t.finalizer.iter().flatten() {
                collect_hoisted(s, vars, funcs);
            }
        }
        StatementKind::Switch(s) => {
            for s in s.cases.iter().flat_map(|c| &c.consequent) {
                collect_hoisted(s, vars, funcs);
            }
        }
        StatementKind::Empty
        | StatementKind::Expression(_)
        | StatementKind::Return(_)
        | StatementKind::Break(_)
        | StatementKind::Continue(_)
        | StatementKind::Throw(_) => {}
    }
}

fn push_unique(vars: &mut Vec<JsString>, name: &JsString) {
    if !vars.contains(name) {
        vars.push(name.clone());
    }
}
