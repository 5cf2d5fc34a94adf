//! Source text of syntax trees, for error reports and
//! `Function.prototype.toString`.

use std::fmt::{self, Display, Formatter, Write};

use crate::ast::*;
use crate::stack;
use crate::types::{JsNumber, number_ops};

const INDENT: &str = "    ";

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::LShift => "<<",
            BinaryOp::RShift => ">>",
            BinaryOp::URShift => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::In => "in",
            BinaryOp::Instanceof => "instanceof",
        }
    }
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
            AssignOp::LShiftAssign => "<<=",
            AssignOp::RShiftAssign => ">>=",
            AssignOp::URShiftAssign => ">>>=",
            AssignOp::BitAndAssign => "&=",
            AssignOp::BitOrAssign => "|=",
            AssignOp::BitXorAssign => "^=",
        }
    }
}

fn indent(f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_quoted(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

fn write_number(f: &mut Formatter<'_>, n: f64) -> fmt::Result {
    f.write_str(&number_ops::to_string(JsNumber::new(n)))
}

fn write_list<T>(
    f: &mut Formatter<'_>,
    items: &[T],
    depth: usize,
    mut each: impl FnMut(&mut Formatter<'_>, &T, usize) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        each(f, item, depth)?;
    }
    Ok(())
}

/// Operands that print without surrounding parentheses.
fn is_primary(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::Literal(_)
            | Expression::Identifier(_)
            | Expression::This
            | Expression::Array(_)
            | Expression::Object(_)
            | Expression::Member(..)
            | Expression::Call(..)
    )
}

fn write_operand(f: &mut Formatter<'_>, expr: &Expression, depth: usize) -> fmt::Result {
    if is_primary(expr) {
        write_expression(f, expr, depth)
    } else {
        f.write_char('(')?;
        write_expression(f, expr, depth)?;
        f.write_char(')')
    }
}

fn write_expression(f: &mut Formatter<'_>, expr: &Expression, depth: usize) -> fmt::Result {
    if stack::exhausted(stack::DECOMPILE_RED_ZONE) {
        return f.write_str("...");
    }
    match expr {
        Expression::Literal(lit) => match lit {
            Literal::Null => f.write_str("null"),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Number(n) => write_number(f, *n),
            Literal::String(s) => write_quoted(f, s),
        },
        Expression::Identifier(name) => f.write_str(name),
        Expression::This => f.write_str("this"),
        Expression::Array(elements) => {
            f.write_char('[')?;
            write_list(f, elements, depth, |f, e, depth| match e {
                Some(e) => write_expression(f, e, depth),
                None => Ok(()),
            })?;
            f.write_char(']')
        }
        Expression::Object(props) => {
            f.write_char('{')?;
            write_list(f, props, depth, |f, p, depth| {
                match &p.key {
                    PropertyKey::Identifier(s) => f.write_str(s)?,
                    PropertyKey::String(s) => write_quoted(f, s)?,
                    PropertyKey::Number(n) => write_number(f, *n)?,
                }
                f.write_str(": ")?;
                write_expression(f, &p.value, depth)
            })?;
            f.write_char('}')
        }
        Expression::Function(decl) => write_function(f, decl, depth),
        Expression::Unary(op, e) => {
            f.write_str(match op {
                UnaryOp::Minus => "-",
                UnaryOp::Plus => "+",
                UnaryOp::Not => "!",
                UnaryOp::BitNot => "~",
            })?;
            write_operand(f, e, depth)
        }
        Expression::Binary(op, l, r) => {
            write_operand(f, l, depth)?;
            write!(f, " {} ", op.symbol())?;
            write_operand(f, r, depth)
        }
        Expression::Logical(op, l, r) => {
            write_operand(f, l, depth)?;
            f.write_str(match op {
                LogicalOp::And => " && ",
                LogicalOp::Or => " || ",
            })?;
            write_operand(f, r, depth)
        }
        Expression::Update(op, prefix, e) => {
            let symbol = match op {
                UpdateOp::Increment => "++",
                UpdateOp::Decrement => "--",
            };
            if *prefix {
                f.write_str(symbol)?;
                write_operand(f, e, depth)
            } else {
                write_operand(f, e, depth)?;
                f.write_str(symbol)
            }
        }
        Expression::Assign(op, target, value) => {
            write_expression(f, target, depth)?;
            write!(f, " {} ", op.symbol())?;
            write_expression(f, value, depth)
        }
        Expression::Conditional(test, yes, no) => {
            write_operand(f, test, depth)?;
            f.write_str(" ? ")?;
            write_operand(f, yes, depth)?;
            f.write_str(" : ")?;
            write_operand(f, no, depth)
        }
        Expression::Call(callee, args) => {
            write_operand(f, callee, depth)?;
            f.write_char('(')?;
            write_list(f, args, depth, write_expression)?;
            f.write_char(')')
        }
        Expression::New(callee, args) => {
            f.write_str("new ")?;
            write_operand(f, callee, depth)?;
            f.write_char('(')?;
            write_list(f, args, depth, write_expression)?;
            f.write_char(')')
        }
        Expression::Member(object, prop) => {
            write_operand(f, object, depth)?;
            match prop {
                MemberProperty::Dot(name) => write!(f, ".{name}"),
                MemberProperty::Computed(key) => {
                    f.write_char('[')?;
                    write_expression(f, key, depth)?;
                    f.write_char(']')
                }
            }
        }
        Expression::Typeof(e) => {
            f.write_str("typeof ")?;
            write_operand(f, e, depth)
        }
        Expression::Void(e) => {
            f.write_str("void ")?;
            write_operand(f, e, depth)
        }
        Expression::Delete(e) => {
            f.write_str("delete ")?;
            write_operand(f, e, depth)
        }
        Expression::Sequence(exprs) => write_list(f, exprs, depth, write_expression),
    }
}

fn write_function(f: &mut Formatter<'_>, decl: &FunctionDecl, depth: usize) -> fmt::Result {
    f.write_str("function ")?;
    if let Some(name) = &decl.name {
        f.write_str(name)?;
    }
    f.write_char('(')?;
    write_list(f, &decl.params, depth, |f, p, _| f.write_str(p))?;
    f.write_str(") ")?;
    write_block(f, &decl.body, depth)
}

/// `{`, the statements one level deeper, then `}` at `depth`.
fn write_block(f: &mut Formatter<'_>, body: &[Statement], depth: usize) -> fmt::Result {
    f.write_str("{\n")?;
    for stmt in body {
        indent(f, depth + 1)?;
        write_statement(f, stmt, depth + 1)?;
        f.write_char('\n')?;
    }
    indent(f, depth)?;
    f.write_char('}')
}

fn write_declarators(f: &mut Formatter<'_>, decls: &[VariableDeclarator], depth: usize) -> fmt::Result {
    f.write_str("var ")?;
    write_list(f, decls, depth, |f, d, depth| {
        f.write_str(&d.name)?;
        if let Some(init) = &d.init {
            f.write_str(" = ")?;
            write_expression(f, init, depth)?;
        }
        Ok(())
    })
}

/// Loop and branch bodies: blocks stay on the same line, other statements
/// go on their own indented line.
fn write_body(f: &mut Formatter<'_>, body: &Statement, depth: usize) -> fmt::Result {
    if let StatementKind::Block(stmts) = &body.kind {
        f.write_char(' ')?;
        write_block(f, stmts, depth)
    } else {
        f.write_char('\n')?;
        indent(f, depth + 1)?;
        write_statement(f, body, depth + 1)
    }
}

fn write_statement(f: &mut Formatter<'_>, stmt: &Statement, depth: usize) -> fmt::Result {
    if stack::exhausted(stack::DECOMPILE_RED_ZONE) {
        return f.write_str("...");
    }
    match &stmt.kind {
        StatementKind::Empty => f.write_char(';'),
        StatementKind::Expression(e) => {
            write_expression(f, e, depth)?;
            f.write_char(';')
        }
        StatementKind::Block(stmts) => write_block(f, stmts, depth),
        StatementKind::Variable(decls) => {
            write_declarators(f, decls, depth)?;
            f.write_char(';')
        }
        StatementKind::If(i) => {
            f.write_str("if (")?;
            write_expression(f, &i.test, depth)?;
            f.write_char(')')?;
            write_body(f, &i.consequent, depth)?;
            if let Some(alt) = &i.alternate {
                f.write_char('\n')?;
                indent(f, depth)?;
                f.write_str("else")?;
                write_body(f, alt, depth)?;
            }
            Ok(())
        }
        StatementKind::While(w) => {
            f.write_str("while (")?;
            write_expression(f, &w.test, depth)?;
            f.write_char(')')?;
            write_body(f, &w.body, depth)
        }
        StatementKind::DoWhile(d) => {
            f.write_str("do")?;
            write_body(f, &d.body, depth)?;
            if matches!(d.body.kind, StatementKind::Block(_)) {
                f.write_char(' ')?;
            } else {
                f.write_char('\n')?;
                indent(f, depth)?;
            }
            f.write_str("while (")?;
            write_expression(f, &d.test, depth)?;
            f.write_str(");")
        }
        StatementKind::For(l) => {
            f.write_str("for (")?;
            match &l.init {
                Some(ForInit::Variable(decls)) => write_declarators(f, decls, depth)?,
                Some(ForInit::Expression(e)) => write_expression(f, e, depth)?,
                None => {}
            }
            f.write_str("; ")?;
            if let Some(test) = &l.test {
                write_expression(f, test, depth)?;
            }
            f.write_str("; ")?;
            if let Some(update) = &l.update {
                write_expression(f, update, depth)?;
            }
            f.write_char(')')?;
            write_body(f, &l.body, depth)
        }
        StatementKind::ForIn(l) => {
            f.write_str("for (")?;
            match &l.left {
                ForInLeft::Variable(d) => write_declarators(f, std::slice::from_ref(d), depth)?,
                ForInLeft::Target(e) => write_expression(f, e, depth)?,
            }
            f.write_str(" in ")?;
            write_expression(f, &l.right, depth)?;
            f.write_char(')')?;
            write_body(f, &l.body, depth)
        }
        StatementKind::Return(value) => {
            f.write_str("return")?;
            if let Some(v) = value {
                f.write_char(' ')?;
                write_expression(f, v, depth)?;
            }
            f.write_char(';')
        }
        StatementKind::Break(label) => match label {
            Some(l) => write!(f, "break {l};"),
            None => f.write_str("break;"),
        },
        StatementKind::Continue(label) => match label {
            Some(l) => write!(f, "continue {l};"),
            None => f.write_str("continue;"),
        },
        StatementKind::Throw(e) => {
            f.write_str("throw ")?;
            write_expression(f, e, depth)?;
            f.write_char(';')
        }
        StatementKind::Try(t) => {
            f.write_str("try ")?;
            write_block(f, &t.block, depth)?;
            if let Some(h) = &t.handler {
                write!(f, " catch ({}) ", h.param)?;
                write_block(f, &h.body, depth)?;
            }
            if let Some(fin) = &t.finalizer {
                f.write_str(" finally ")?;
                write_block(f, fin, depth)?;
            }
            Ok(())
        }
        StatementKind::Switch(s) => {
            f.write_str("switch (")?;
            write_expression(f, &s.discriminant, depth)?;
            f.write_str(") {\n")?;
            for case in &s.cases {
                indent(f, depth + 1)?;
                match &case.test {
                    Some(test) => {
                        f.write_str("case ")?;
                        write_expression(f, test, depth + 1)?;
                        f.write_str(":\n")?;
                    }
                    None => f.write_str("default:\n")?,
                }
                for stmt in &case.consequent {
                    indent(f, depth + 2)?;
                    write_statement(f, stmt, depth + 2)?;
                    f.write_char('\n')?;
                }
            }
            indent(f, depth)?;
            f.write_char('}')
        }
        StatementKind::Labeled(label, body) => {
            write!(f, "{label}: ")?;
            write_statement(f, body, depth)
        }
        StatementKind::With(object, body) => {
            f.write_str("with (")?;
            write_expression(f, object, depth)?;
            f.write_char(')')?;
            write_body(f, body, depth)
        }
        StatementKind::FunctionDeclaration(decl) => write_function(f, decl, depth),
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_expression(f, self, 0)
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_statement(f, self, 0)
    }
}

impl Display for FunctionDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_function(f, self, 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse;

    fn roundtrip(source: &str) -> String {
        let program = parse(source).expect("parses");
        program
            .body
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn expressions_keep_grouping() {
        assert_eq!(roundtrip("x = (a + b) * c;"), "x = (a + b) * c;");
        assert_eq!(roundtrip("f(a, 'q\"')[0].y;"), "f(a, \"q\\\"\")[0].y;");
        assert_eq!(roundtrip("i++;"), "i++;");
        assert_eq!(roundtrip("new Date(2024, 0, 1);"), "new Date(2024, 0, 1);");
    }

    #[test]
    fn functions_are_indented() {
        assert_eq!(
            roundtrip("function f(a){ if (a) return 1; else { return 2 } }"),
            "function f(a) {\n    if (a)\n        return 1;\n    else {\n        return 2;\n    }\n}"
        );
    }
}
