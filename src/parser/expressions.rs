use super::*;

impl<'a> Parser<'a> {
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let first = self.parse_assignment_expression()?;
        if self.current != Token::Comma {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.current == Token::Comma {
            self.advance()?;
            exprs.push(self.parse_assignment_expression()?);
        }
        Ok(Expression::Sequence(exprs))
    }

    fn is_assignment_target(expr: &Expression) -> bool {
        matches!(expr, Expression::Identifier(_) | Expression::Member(..))
    }

    pub(super) fn parse_assignment_expression(&mut self) -> Result<Expression, ParseError> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_conditional_expression()?;
        let op = match &self.current {
            Token::Assign => AssignOp::Assign,
            Token::PlusAssign => AssignOp::AddAssign,
            Token::MinusAssign => AssignOp::SubAssign,
            Token::StarAssign => AssignOp::MulAssign,
            Token::SlashAssign => AssignOp::DivAssign,
            Token::PercentAssign => AssignOp::ModAssign,
            Token::LeftShiftAssign => AssignOp::LShiftAssign,
            Token::RightShiftAssign => AssignOp::RShiftAssign,
            Token::UnsignedRightShiftAssign => AssignOp::URShiftAssign,
            Token::AmpersandAssign => AssignOp::BitAndAssign,
            Token::PipeAssign => AssignOp::BitOrAssign,
            Token::CaretAssign => AssignOp::BitXorAssign,
            _ => return Ok(left),
        };
        if !Self::is_assignment_target(&left) {
            return Err(self.error("Invalid left-hand side in assignment"));
        }
        self.advance()?;
        let right = self.parse_assignment_expression()?;
        Ok(Expression::Assign(op, Box::new(left), Box::new(right)))
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, ParseError> {
        let test = self.parse_logical_or()?;
        if self.current != Token::Question {
            return Ok(test);
        }
        self.advance()?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let consequent = self.parse_assignment_expression();
        self.no_in = saved_no_in;
        let consequent = consequent?;
        self.eat(&Token::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(Expression::Conditional(
            Box::new(test),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;
        let depth = self.depth;
        while self.current == Token::LogicalOr {
            self.advance()?;
            self.nest()?;
            let right = self.parse_logical_and()?;
            left = Expression::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_or()?;
        let depth = self.depth;
        while self.current == Token::LogicalAnd {
            self.advance()?;
            self.nest()?;
            let right = self.parse_bitwise_or()?;
            left = Expression::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_xor()?;
        let depth = self.depth;
        while self.current == Token::Pipe {
            self.advance()?;
            self.nest()?;
            let right = self.parse_bitwise_xor()?;
            left = Expression::Binary(BinaryOp::BitOr, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_and()?;
        let depth = self.depth;
        while self.current == Token::Caret {
            self.advance()?;
            self.nest()?;
            let right = self.parse_bitwise_and()?;
            left = Expression::Binary(BinaryOp::BitXor, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_equality()?;
        let depth = self.depth;
        while self.current == Token::Ampersand {
            self.advance()?;
            self.nest()?;
            let right = self.parse_equality()?;
            left = Expression::Binary(BinaryOp::BitAnd, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_relational()?;
        let depth = self.depth;
        loop {
            let op = match &self.current {
                Token::Equal => BinaryOp::Eq,
                Token::NotEqual => BinaryOp::NotEq,
                Token::StrictEqual => BinaryOp::StrictEq,
                Token::StrictNotEqual => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance()?;
            self.nest()?;
            let right = self.parse_relational()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_shift()?;
        let depth = self.depth;
        loop {
            let op = match &self.current {
                Token::LessThan => BinaryOp::Lt,
                Token::GreaterThan => BinaryOp::Gt,
                Token::LessThanEqual => BinaryOp::LtEq,
                Token::GreaterThanEqual => BinaryOp::GtEq,
                Token::Keyword(Keyword::Instanceof) => BinaryOp::Instanceof,
                Token::Keyword(Keyword::In) if !self.no_in => BinaryOp::In,
                _ => break,
            };
            self.advance()?;
            self.nest()?;
            let right = self.parse_shift()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        let depth = self.depth;
        loop {
            let op = match &self.current {
                Token::LeftShift => BinaryOp::LShift,
                Token::RightShift => BinaryOp::RShift,
                Token::UnsignedRightShift => BinaryOp::URShift,
                _ => break,
            };
            self.advance()?;
            self.nest()?;
            let right = self.parse_additive()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        let depth = self.depth;
        loop {
            let op = match &self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            self.nest()?;
            let right = self.parse_multiplicative()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        let depth = self.depth;
        loop {
            let op = match &self.current {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            self.nest()?;
            let right = self.parse_unary()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let wrap: fn(Box<Expression>) -> Expression = match &self.current {
            Token::Keyword(Keyword::Delete) => Expression::Delete,
            Token::Keyword(Keyword::Void) => Expression::Void,
            Token::Keyword(Keyword::Typeof) => Expression::Typeof,
            Token::Minus => |e| Expression::Unary(UnaryOp::Minus, e),
            Token::Plus => |e| Expression::Unary(UnaryOp::Plus, e),
            Token::Bang => |e| Expression::Unary(UnaryOp::Not, e),
            Token::Tilde => |e| Expression::Unary(UnaryOp::BitNot, e),
            Token::Increment | Token::Decrement => {
                let op = if self.current == Token::Increment {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance()?;
                let target = self.nested(Self::parse_unary)?;
                if !Self::is_assignment_target(&target) {
                    return Err(self.error("Invalid left-hand side in prefix operation"));
                }
                return Ok(Expression::Update(op, true, Box::new(target)));
            }
            _ => return self.parse_postfix(),
        };
        self.advance()?;
        let operand = self.nested(Self::parse_unary)?;
        Ok(wrap(Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_left_hand_side_expression()?;
        if self.prev_line_terminator {
            return Ok(expr);
        }
        let op = match &self.current {
            Token::Increment => UpdateOp::Increment,
            Token::Decrement => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        if !Self::is_assignment_target(&expr) {
            return Err(self.error("Invalid left-hand side in postfix operation"));
        }
        self.advance()?;
        Ok(Expression::Update(op, false, Box::new(expr)))
    }

    fn parse_dot_member_property(&mut self) -> Result<MemberProperty, ParseError> {
        // Reserved words are allowed after '.'.
        let name = match &self.current {
            Token::Identifier(n) => n.clone(),
            Token::Keyword(kw) => kw.to_string(),
            Token::BooleanLiteral(b) => b.to_string(),
            Token::NullLiteral => "null".to_string(),
            _ => return Err(self.error("Expected identifier after '.'")),
        };
        self.advance()?;
        Ok(MemberProperty::Dot(Rc::from(name)))
    }

    /// Member accesses (`.x`, `[e]`) following `expr`, and calls when `calls` is set.
    fn parse_member_suffixes(
        &mut self,
        mut expr: Expression,
        calls: bool,
    ) -> Result<Expression, ParseError> {
        let depth = self.depth;
        loop {
            match &self.current {
                Token::Dot => {
                    self.advance()?;
                    self.nest()?;
                    let prop = self.parse_dot_member_property()?;
                    expr = Expression::Member(Box::new(expr), prop);
                }
                Token::LeftBracket => {
                    self.advance()?;
                    self.nest()?;
                    let saved_no_in = std::mem::replace(&mut self.no_in, false);
                    let prop = self.parse_expression();
                    self.no_in = saved_no_in;
                    let prop = prop?;
                    self.eat(&Token::RightBracket)?;
                    expr = Expression::Member(
                        Box::new(expr),
                        MemberProperty::Computed(Box::new(prop)),
                    );
                }
                Token::LeftParen if calls => {
                    self.nest()?;
                    let args = self.parse_arguments()?;
                    expr = Expression::Call(Box::new(expr), args);
                }
                _ => {
                    self.depth = depth;
                    return Ok(expr);
                }
            }
        }
    }

    pub(super) fn parse_left_hand_side_expression(&mut self) -> Result<Expression, ParseError> {
        let expr = if self.current == Token::Keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };
        self.parse_member_suffixes(expr, true)
    }

    fn parse_new_expression(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // new
        let callee = if self.current == Token::Keyword(Keyword::New) {
            self.nested(Self::parse_new_expression)?
        } else {
            let primary = self.parse_primary_expression()?;
            self.parse_member_suffixes(primary, false)?
        };
        let args = if self.current == Token::LeftParen {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::New(Box::new(callee), args))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.eat(&Token::LeftParen)?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut args = Vec::new();
        let result = loop {
            if self.current == Token::RightParen {
                break Ok(());
            }
            match self.parse_assignment_expression() {
                Ok(arg) => args.push(arg),
                Err(e) => break Err(e),
            }
            if self.current != Token::RightParen
                && let Err(e) = self.eat(&Token::Comma)
            {
                break Err(e);
            }
        };
        self.no_in = saved_no_in;
        result?;
        self.eat(&Token::RightParen)?;
        Ok(args)
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, ParseError> {
        let expr = match &self.current {
            Token::Keyword(Keyword::This) => Expression::This,
            Token::Identifier(name) => Expression::Identifier(Rc::from(name.as_str())),
            Token::NumericLiteral(n) => Expression::Literal(Literal::Number(*n)),
            Token::StringLiteral(s) => Expression::Literal(Literal::String(Rc::from(s.as_str()))),
            Token::BooleanLiteral(b) => Expression::Literal(Literal::Boolean(*b)),
            Token::NullLiteral => Expression::Literal(Literal::Null),
            Token::Keyword(Keyword::Function) => {
                return Ok(Expression::Function(self.parse_function(false)?));
            }
            Token::LeftParen => {
                self.advance()?;
                let saved_no_in = std::mem::replace(&mut self.no_in, false);
                let expr = self.parse_expression();
                self.no_in = saved_no_in;
                let expr = expr?;
                self.eat(&Token::RightParen)?;
                return Ok(expr);
            }
            Token::LeftBracket => return self.parse_array_literal(),
            Token::LeftBrace => return self.parse_object_literal(),
            other => return Err(self.error(format!("Unexpected token {other:?}"))),
        };
        self.advance()?;
        Ok(expr)
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::LeftBracket)?;
        let mut elements = Vec::new();
        while self.current != Token::RightBracket {
            if self.current == Token::Comma {
                self.advance()?;
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_assignment_expression()?));
            if self.current != Token::RightBracket {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightBracket)?;
        Ok(Expression::Array(elements))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::LeftBrace)?;
        let mut props = Vec::new();
        while self.current != Token::RightBrace {
            let key = match &self.current {
                Token::Identifier(n) => PropertyKey::Identifier(Rc::from(n.as_str())),
                Token::Keyword(kw) => PropertyKey::Identifier(Rc::from(kw.to_string())),
                Token::StringLiteral(s) => PropertyKey::String(Rc::from(s.as_str())),
                Token::NumericLiteral(n) => PropertyKey::Number(*n),
                other => return Err(self.error(format!("Unexpected token {other:?} in object literal"))),
            };
            self.advance()?;
            self.eat(&Token::Colon)?;
            let value = self.parse_assignment_expression()?;
            props.push(Property { key, value });
            if self.current != Token::RightBrace {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightBrace)?;
        Ok(Expression::Object(props))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(src: &str) -> Expression {
        let prog = parse(src).unwrap();
        match prog.body.into_iter().next().map(|s| s.kind) {
            Some(StatementKind::Expression(e)) => e,
            other => panic!("not an expression statement: {other:?}"),
        }
    }

    #[test]
    fn multiplicative_binds_tighter() {
        match expr("1 + 2 * 3") {
            Expression::Binary(BinaryOp::Add, _, rhs) => {
                assert!(matches!(*rhs, Expression::Binary(BinaryOp::Mul, _, _)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        match expr("a = b += 1") {
            Expression::Assign(AssignOp::Assign, _, rhs) => {
                assert!(matches!(*rhs, Expression::Assign(AssignOp::AddAssign, _, _)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_assignment_target() {
        assert!(parse("1 = 2;").is_err());
        assert!(parse("a + b = 2;").is_err());
        assert!(parse("++3;").is_err());
    }

    #[test]
    fn new_with_member_and_call() {
        match expr("new a.B(1).c") {
            Expression::Member(obj, MemberProperty::Dot(name)) => {
                assert_eq!(&*name, "c");
                assert!(matches!(*obj, Expression::New(_, ref args) if args.len() == 1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn keywords_allowed_as_property_names() {
        assert!(matches!(expr("o.default"), Expression::Member(..)));
        assert!(matches!(expr("x = {new: 1, 'a b': 2, 3: 4}"), Expression::Assign(..)));
    }

    #[test]
    fn array_literal_holes() {
        match expr("[1,,2]") {
            Expression::Array(elems) => {
                assert_eq!(elems.len(), 3);
                assert!(elems[1].is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn postfix_respects_line_terminator() {
        let prog = parse("a\n++b").unwrap();
        assert_eq!(prog.body.len(), 2);
    }

    #[test]
    fn sequence_and_conditional() {
        assert!(matches!(expr("a, b, c"), Expression::Sequence(ref v) if v.len() == 3));
        assert!(matches!(expr("a ? b : c"), Expression::Conditional(..)));
    }
}
