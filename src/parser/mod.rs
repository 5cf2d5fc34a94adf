use std::rc::Rc;

use thiserror::Error;

use crate::ast::*;
use crate::lexer::{Keyword, LexError, Lexer, Token};
use crate::stack;
use crate::types::JsString;

mod expressions;
mod statements;

/// Deepest syntax tree the parser builds. Left-associative chains such as
/// `a + b + c` count one level per operator.
pub const MAX_NESTING: usize = 1000;

#[derive(Clone, Debug, Error)]
#[error("SyntaxError: {message} (line {line})")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            line: e.location.line,
        }
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    current_line: u32,
    prev_line_terminator: bool,
    pushback: Option<(Token, bool, u32)>, // (token, had_line_terminator_before, line)
    in_function: u32,
    in_iteration: u32,
    in_switch: u32,
    labels: Vec<JsString>,
    no_in: bool,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let mut had_lt = false;
        let current = loop {
            let tok = lexer.next_token()?;
            if tok == Token::LineTerminator {
                had_lt = true;
                continue;
            }
            break tok;
        };
        let current_line = lexer.line();
        Ok(Self {
            lexer,
            current,
            current_line,
            prev_line_terminator: had_lt,
            pushback: None,
            in_function: 0,
            in_iteration: 0,
            in_switch: 0,
            labels: Vec::new(),
            no_in: false,
            depth: 0,
        })
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let old = std::mem::replace(&mut self.current, Token::Eof);
        if let Some((tok, lt, line)) = self.pushback.take() {
            self.current = tok;
            self.prev_line_terminator = lt;
            self.current_line = line;
        } else {
            self.prev_line_terminator = false;
            loop {
                let tok = self.lexer.next_token()?;
                if tok == Token::LineTerminator {
                    self.prev_line_terminator = true;
                    continue;
                }
                self.current_line = self.lexer.line();
                self.current = tok;
                break;
            }
        }
        Ok(old)
    }

    /// Re-inserts `token` in front of the current one.
    fn push_back(&mut self, token: Token, had_lt: bool, line: u32) {
        let old_current = std::mem::replace(&mut self.current, token);
        let old_lt = std::mem::replace(&mut self.prev_line_terminator, had_lt);
        let old_line = std::mem::replace(&mut self.current_line, line);
        self.pushback = Some((old_current, old_lt, old_line));
    }

    fn eat(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error(format!("Expected {expected:?}, got {:?}", self.current)))
        }
    }

    fn eat_semicolon(&mut self) -> Result<(), ParseError> {
        if self.current == Token::Semicolon {
            self.advance()?;
            return Ok(());
        }
        // ASI
        if self.prev_line_terminator
            || self.current == Token::RightBrace
            || self.current == Token::Eof
        {
            return Ok(());
        }
        Err(self.error(format!("Expected ';', got {:?}", self.current)))
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError {
            message: msg.into(),
            line: self.current_line,
        }
    }

    /// Enters one more level of nesting.
    fn nest(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING || stack::exhausted(stack::PARSE_RED_ZONE) {
            return Err(self.error("Expression nested too deeply"));
        }
        Ok(())
    }

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: fn(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.nest()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expect_identifier(&mut self) -> Result<JsString, ParseError> {
        match &self.current {
            Token::Identifier(name) => {
                let name: JsString = Rc::from(name.as_str());
                self.advance()?;
                Ok(name)
            }
            other => Err(self.error(format!("Expected identifier, got {other:?}"))),
        }
    }

    fn parse_optional_label(&mut self) -> Result<Option<JsString>, ParseError> {
        if !self.prev_line_terminator
            && let Token::Identifier(name) = &self.current
        {
            let name: JsString = Rc::from(name.as_str());
            if !self.labels.contains(&name) {
                return Err(self.error(format!("Undefined label '{name}'")));
            }
            self.advance()?;
            return Ok(Some(name));
        }
        Ok(None)
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while self.current != Token::Eof {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    /// `function name(a, b) { ... }` starting at the `function` keyword.
    fn parse_function(&mut self, require_name: bool) -> Result<Rc<FunctionDecl>, ParseError> {
        let line = self.current_line;
        self.eat(&Token::Keyword(Keyword::Function))?;
        let name = if matches!(self.current, Token::Identifier(_)) {
            Some(self.expect_identifier()?)
        } else if require_name {
            return Err(self.error("Function statement requires a name"));
        } else {
            None
        };

        self.eat(&Token::LeftParen)?;
        let mut params = Vec::new();
        while self.current != Token::RightParen {
            params.push(self.expect_identifier()?);
            if self.current != Token::RightParen {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightParen)?;

        self.eat(&Token::LeftBrace)?;
        let saved_labels = std::mem::take(&mut self.labels);
        let saved_iteration = std::mem::replace(&mut self.in_iteration, 0);
        let saved_switch = std::mem::replace(&mut self.in_switch, 0);
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        self.in_function += 1;
        let mut body = Vec::new();
        let result = loop {
            if self.current == Token::RightBrace || self.current == Token::Eof {
                break Ok(());
            }
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(e) => break Err(e),
            }
        };
        self.in_function -= 1;
        self.labels = saved_labels;
        self.in_iteration = saved_iteration;
        self.in_switch = saved_switch;
        self.no_in = saved_no_in;
        result?;
        self.eat(&Token::RightBrace)?;

        Ok(Rc::new(FunctionDecl {
            name,
            params,
            body,
            line,
        }))
    }
}

/// Parses a complete script.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::new(source)?.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        parse(src).unwrap()
    }

    #[test]
    fn parse_empty() {
        let prog = parse_ok("");
        assert!(prog.body.is_empty());
    }

    #[test]
    fn parse_var_declaration() {
        let prog = parse_ok("var x = 42, y;");
        assert_eq!(prog.body.len(), 1);
        match &prog.body[0].kind {
            StatementKind::Variable(decls) => {
                assert_eq!(decls.len(), 2);
                assert_eq!(&*decls[0].name, "x");
                assert!(decls[1].init.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_if_statement() {
        let prog = parse_ok("if (true) { x; } else { y; }");
        assert!(matches!(&prog.body[0].kind, StatementKind::If(_)));
    }

    #[test]
    fn parse_function_declaration() {
        let prog = parse_ok("function foo(a, b) { return a + b; }");
        match &prog.body[0].kind {
            StatementKind::FunctionDeclaration(f) => {
                assert_eq!(f.name.as_deref(), Some("foo"));
                assert_eq!(f.params.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_for_loops() {
        let prog = parse_ok("for (var i = 0; i < 10; i++) { x; }\nfor (k in o) ;");
        assert!(matches!(&prog.body[0].kind, StatementKind::For(_)));
        assert!(matches!(&prog.body[1].kind, StatementKind::ForIn(_)));
        assert_eq!(prog.body[1].line, 2);
    }

    #[test]
    fn parse_try_catch() {
        let prog = parse_ok("try { x; } catch (e) { y; } finally { z; }");
        assert!(matches!(&prog.body[0].kind, StatementKind::Try(_)));
    }

    #[test]
    fn statements_record_lines() {
        let prog = parse_ok("a = 1;\n\nb = 2;\n  if (a)\n    c();");
        let lines: Vec<u32> = prog.body.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 3, 4]);
    }

    #[test]
    fn automatic_semicolons() {
        let prog = parse_ok("a = 1\nb = 2\nreturnValue = a + b");
        assert_eq!(prog.body.len(), 3);
    }

    #[test]
    fn return_outside_function_is_rejected() {
        let err = parse("return 1;").unwrap_err();
        assert!(err.to_string().starts_with("SyntaxError"));
    }

    #[test]
    fn break_needs_enclosing_loop() {
        assert!(parse("break;").is_err());
        assert!(parse("while (1) { break; }").is_ok());
        assert!(parse("outer: for (;;) { for (;;) { break outer; } }").is_ok());
        assert!(parse("for (;;) { continue nowhere; }").is_err());
    }

    #[test]
    fn nesting_is_bounded() {
        let chain = format!("x = 0{};", " + 1".repeat(100_000));
        let err = parse(&chain).unwrap_err();
        assert!(err.message.contains("nested too deeply"), "{err}");
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(parse(&parens).is_err());
        let calls = format!("f{}", "()".repeat(100_000));
        assert!(parse(&calls).is_err());
        assert!(parse(&format!("x = 0{};", " + 1".repeat(500))).is_ok());
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = parse("var a = 1;\nvar = 2;").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
