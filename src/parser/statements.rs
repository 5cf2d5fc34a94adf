use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        self.nested(Self::parse_single_statement)
    }

    fn parse_single_statement(&mut self) -> Result<Statement, ParseError> {
        let line = self.current_line;
        let kind = match &self.current {
            Token::LeftBrace => StatementKind::Block(self.parse_block()?),
            Token::Semicolon => {
                self.advance()?;
                StatementKind::Empty
            }
            Token::Keyword(Keyword::Var) => {
                self.advance()?;
                let decls = self.parse_variable_declarations()?;
                self.eat_semicolon()?;
                StatementKind::Variable(decls)
            }
            Token::Keyword(Keyword::Function) => {
                StatementKind::FunctionDeclaration(self.parse_function(true)?)
            }
            Token::Keyword(Keyword::If) => self.parse_if_statement()?,
            Token::Keyword(Keyword::While) => self.parse_while_statement()?,
            Token::Keyword(Keyword::Do) => self.parse_do_while_statement()?,
            Token::Keyword(Keyword::For) => self.parse_for_statement()?,
            Token::Keyword(Keyword::Return) => self.parse_return_statement()?,
            Token::Keyword(Keyword::Break) => self.parse_break_statement()?,
            Token::Keyword(Keyword::Continue) => self.parse_continue_statement()?,
            Token::Keyword(Keyword::Throw) => self.parse_throw_statement()?,
            Token::Keyword(Keyword::Try) => self.parse_try_statement()?,
            Token::Keyword(Keyword::Switch) => self.parse_switch_statement()?,
            Token::Keyword(Keyword::With) => self.parse_with_statement()?,
            _ => self.parse_expression_statement_or_labeled()?,
        };
        Ok(Statement { line, kind })
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.eat(&Token::LeftBrace)?;
        let mut stmts = Vec::new();
        while self.current != Token::RightBrace && self.current != Token::Eof {
            stmts.push(self.parse_statement()?);
        }
        self.eat(&Token::RightBrace)?;
        Ok(stmts)
    }

    fn parse_variable_declarations(&mut self) -> Result<Vec<VariableDeclarator>, ParseError> {
        let mut decls = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.current == Token::Assign {
                self.advance()?;
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            decls.push(VariableDeclarator { name, init });
            if self.current != Token::Comma {
                return Ok(decls);
            }
            self.advance()?;
        }
    }

    fn parse_expression_statement_or_labeled(&mut self) -> Result<StatementKind, ParseError> {
        if let Token::Identifier(name) = &self.current {
            let name: JsString = Rc::from(name.as_str());
            let orig_token = self.current.clone();
            let ident_lt = self.prev_line_terminator;
            let ident_line = self.current_line;
            self.advance()?;
            if self.current == Token::Colon {
                self.advance()?;
                self.labels.push(name.clone());
                let stmt = self.parse_statement();
                self.labels.pop();
                return Ok(StatementKind::Labeled(name, Box::new(stmt?)));
            }
            // Not a label: restore the identifier in front of what followed it.
            self.push_back(orig_token, ident_lt, ident_line);
        }
        let expr = self.parse_expression()?;
        self.eat_semicolon()?;
        Ok(StatementKind::Expression(expr))
    }

    fn parse_paren_expression(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::LeftParen)?;
        let expr = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        Ok(expr)
    }

    fn parse_if_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // if
        let test = self.parse_paren_expression()?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.current == Token::Keyword(Keyword::Else) {
            self.advance()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StatementKind::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_loop_body(&mut self) -> Result<Box<Statement>, ParseError> {
        self.in_iteration += 1;
        let body = self.parse_statement();
        self.in_iteration -= 1;
        Ok(Box::new(body?))
    }

    fn parse_while_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // while
        let test = self.parse_paren_expression()?;
        let body = self.parse_loop_body()?;
        Ok(StatementKind::While(WhileStatement { test, body }))
    }

    fn parse_do_while_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // do
        let body = self.parse_loop_body()?;
        self.eat(&Token::Keyword(Keyword::While))?;
        let test = self.parse_paren_expression()?;
        if self.current == Token::Semicolon {
            self.advance()?;
        }
        Ok(StatementKind::DoWhile(DoWhileStatement { test, body }))
    }

    fn parse_for_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // for
        self.eat(&Token::LeftParen)?;

        let init = if self.current == Token::Semicolon {
            None
        } else if self.current == Token::Keyword(Keyword::Var) {
            self.advance()?;
            self.no_in = true;
            let decls = self.parse_variable_declarations();
            self.no_in = false;
            let mut decls = decls?;
            if self.current == Token::Keyword(Keyword::In) && decls.len() == 1 {
                let decl = decls.remove(0);
                return self.parse_for_in_rest(ForInLeft::Variable(decl));
            }
            Some(ForInit::Variable(decls))
        } else {
            self.no_in = true;
            let expr = self.parse_expression();
            self.no_in = false;
            let expr = expr?;
            if self.current == Token::Keyword(Keyword::In) {
                if !matches!(expr, Expression::Identifier(_) | Expression::Member(..)) {
                    return Err(self.error("Invalid left-hand side in for-in"));
                }
                return self.parse_for_in_rest(ForInLeft::Target(expr));
            }
            Some(ForInit::Expression(expr))
        };

        self.eat(&Token::Semicolon)?;
        let test = if self.current == Token::Semicolon {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat(&Token::Semicolon)?;
        let update = if self.current == Token::RightParen {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat(&Token::RightParen)?;
        let body = self.parse_loop_body()?;
        Ok(StatementKind::For(ForStatement {
            init,
            test,
            update,
            body,
        }))
    }

    fn parse_for_in_rest(&mut self, left: ForInLeft) -> Result<StatementKind, ParseError> {
        self.advance()?; // in
        let right = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        let body = self.parse_loop_body()?;
        Ok(StatementKind::ForIn(ForInStatement { left, right, body }))
    }

    fn parse_return_statement(&mut self) -> Result<StatementKind, ParseError> {
        if self.in_function == 0 {
            return Err(self.error("'return' outside of function"));
        }
        self.advance()?; // return
        let value = if self.current == Token::Semicolon
            || self.current == Token::RightBrace
            || self.current == Token::Eof
            || self.prev_line_terminator
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat_semicolon()?;
        Ok(StatementKind::Return(value))
    }

    fn parse_break_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // break
        let label = self.parse_optional_label()?;
        if label.is_none() && self.in_iteration == 0 && self.in_switch == 0 {
            return Err(self.error("'break' outside of loop or switch"));
        }
        self.eat_semicolon()?;
        Ok(StatementKind::Break(label))
    }

    fn parse_continue_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // continue
        if self.in_iteration == 0 {
            return Err(self.error("'continue' outside of loop"));
        }
        let label = self.parse_optional_label()?;
        self.eat_semicolon()?;
        Ok(StatementKind::Continue(label))
    }

    fn parse_throw_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // throw
        if self.prev_line_terminator {
            return Err(self.error("Illegal newline after throw"));
        }
        let expr = self.parse_expression()?;
        self.eat_semicolon()?;
        Ok(StatementKind::Throw(expr))
    }

    fn parse_try_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // try
        let block = self.parse_block()?;
        let handler = if self.current == Token::Keyword(Keyword::Catch) {
            self.advance()?;
            self.eat(&Token::LeftParen)?;
            let param = self.expect_identifier()?;
            self.eat(&Token::RightParen)?;
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.current == Token::Keyword(Keyword::Finally) {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }
        Ok(StatementKind::Try(TryStatement {
            block,
            handler,
            finalizer,
        }))
    }

    fn parse_switch_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // switch
        let discriminant = self.parse_paren_expression()?;
        self.eat(&Token::LeftBrace)?;
        self.in_switch += 1;
        let cases = self.parse_switch_cases();
        self.in_switch -= 1;
        let cases = cases?;
        self.eat(&Token::RightBrace)?;
        Ok(StatementKind::Switch(SwitchStatement {
            discriminant,
            cases,
        }))
    }

    fn parse_switch_cases(&mut self) -> Result<Vec<SwitchCase>, ParseError> {
        let mut cases = Vec::new();
        let mut has_default = false;
        while self.current != Token::RightBrace {
            let test = match &self.current {
                Token::Keyword(Keyword::Case) => {
                    self.advance()?;
                    Some(self.parse_expression()?)
                }
                Token::Keyword(Keyword::Default) => {
                    if has_default {
                        return Err(self.error("More than one default clause in switch"));
                    }
                    has_default = true;
                    self.advance()?;
                    None
                }
                other => return Err(self.error(format!("Expected case or default, got {other:?}"))),
            };
            self.eat(&Token::Colon)?;
            let mut consequent = Vec::new();
            while !matches!(
                self.current,
                Token::Keyword(Keyword::Case)
                    | Token::Keyword(Keyword::Default)
                    | Token::RightBrace
                    | Token::Eof
            ) {
                consequent.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, consequent });
        }
        Ok(cases)
    }

    fn parse_with_statement(&mut self) -> Result<StatementKind, ParseError> {
        self.advance()?; // with
        let object = self.parse_paren_expression()?;
        let body = Box::new(self.parse_statement()?);
        Ok(StatementKind::With(object, body))
    }
}
