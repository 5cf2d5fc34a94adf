use std::fmt;
use std::str::Chars;

use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Identifier(String),
    Keyword(Keyword),

    NumericLiteral(f64),
    StringLiteral(String),
    BooleanLiteral(bool),
    NullLiteral,

    LeftBrace,          // {
    RightBrace,         // }
    LeftParen,          // (
    RightParen,         // )
    LeftBracket,        // [
    RightBracket,       // ]
    Dot,                // .
    Semicolon,          // ;
    Comma,              // ,
    LessThan,           // <
    GreaterThan,        // >
    LessThanEqual,      // <=
    GreaterThanEqual,   // >=
    Equal,              // ==
    NotEqual,           // !=
    StrictEqual,        // ===
    StrictNotEqual,     // !==
    Plus,               // +
    Minus,              // -
    Star,               // *
    Slash,              // /
    Percent,            // %
    Increment,          // ++
    Decrement,          // --
    LeftShift,          // <<
    RightShift,         // >>
    UnsignedRightShift, // >>>
    Ampersand,          // &
    Pipe,               // |
    Caret,              // ^
    Bang,               // !
    Tilde,              // ~
    LogicalAnd,         // &&
    LogicalOr,          // ||
    Question,           // ?
    Colon,              // :
    Assign,             // =
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    LeftShiftAssign,
    RightShiftAssign,
    UnsignedRightShiftAssign,
    AmpersandAssign,
    PipeAssign,
    CaretAssign,

    LineTerminator,
    Eof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Break,
    Case,
    Catch,
    Continue,
    Default,
    Delete,
    Do,
    Else,
    Finally,
    For,
    Function,
    If,
    In,
    Instanceof,
    New,
    Return,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
}

impl Keyword {
    pub fn from_str(s: &str) -> Option<Keyword> {
        match s {
            "break" => Some(Keyword::Break),
            "case" => Some(Keyword::Case),
            "catch" => Some(Keyword::Catch),
            "continue" => Some(Keyword::Continue),
            "default" => Some(Keyword::Default),
            "delete" => Some(Keyword::Delete),
            "do" => Some(Keyword::Do),
            "else" => Some(Keyword::Else),
            "finally" => Some(Keyword::Finally),
            "for" => Some(Keyword::For),
            "function" => Some(Keyword::Function),
            "if" => Some(Keyword::If),
            "in" => Some(Keyword::In),
            "instanceof" => Some(Keyword::Instanceof),
            "new" => Some(Keyword::New),
            "return" => Some(Keyword::Return),
            "switch" => Some(Keyword::Switch),
            "this" => Some(Keyword::This),
            "throw" => Some(Keyword::Throw),
            "try" => Some(Keyword::Try),
            "typeof" => Some(Keyword::Typeof),
            "var" => Some(Keyword::Var),
            "void" => Some(Keyword::Void),
            "while" => Some(Keyword::While),
            "with" => Some(Keyword::With),
            _ => None,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Keyword::Break => "break",
            Keyword::Case => "case",
            Keyword::Catch => "catch",
            Keyword::Continue => "continue",
            Keyword::Default => "default",
            Keyword::Delete => "delete",
            Keyword::Do => "do",
            Keyword::Else => "else",
            Keyword::Finally => "finally",
            Keyword::For => "for",
            Keyword::Function => "function",
            Keyword::If => "if",
            Keyword::In => "in",
            Keyword::Instanceof => "instanceof",
            Keyword::New => "new",
            Keyword::Return => "return",
            Keyword::Switch => "switch",
            Keyword::This => "this",
            Keyword::Throw => "throw",
            Keyword::Try => "try",
            Keyword::Typeof => "typeof",
            Keyword::Var => "var",
            Keyword::Void => "void",
            Keyword::While => "while",
            Keyword::With => "with",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

#[derive(Clone, Debug, Error)]
#[error("{}:{}: {message}", location.line, location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

pub struct Lexer<'a> {
    chars: Chars<'a>,
    current: Option<char>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            chars,
            current,
            line: 1,
            column: 0,
        }
    }

    /// Line of the next unread character.
    pub fn line(&self) -> u32 {
        self.line
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current;
        if ch.is_some() {
            self.column += 1;
            self.current = self.chars.next();
        }
        ch
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            location: self.location(),
        }
    }

    fn is_line_terminator(ch: char) -> bool {
        matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
    }

    fn is_whitespace(ch: char) -> bool {
        matches!(ch, '\t' | '\u{000B}' | '\u{000C}' | ' ' | '\u{00A0}' | '\u{FEFF}')
            || ch.is_whitespace() && !Self::is_line_terminator(ch)
    }

    fn is_identifier_start(ch: char) -> bool {
        ch == '_'
            || ch == '$'
            || ch.is_ascii_alphabetic()
            || !ch.is_ascii() && unicode_ident::is_xid_start(ch)
    }

    fn is_identifier_continue(ch: char) -> bool {
        ch == '_'
            || ch == '$'
            || ch.is_ascii_alphanumeric()
            || !ch.is_ascii() && unicode_ident::is_xid_continue(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(Self::is_whitespace) {
            self.advance();
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if Self::is_line_terminator(ch) {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<bool, LexError> {
        let mut has_line_terminator = false;
        loop {
            match self.advance() {
                Some('*') => {
                    if self.eat('/') {
                        return Ok(has_line_terminator);
                    }
                }
                Some(ch) if Self::is_line_terminator(ch) => {
                    has_line_terminator = true;
                    self.handle_newline(ch);
                }
                Some(_) => {}
                None => return Err(self.error("Unterminated block comment")),
            }
        }
    }

    fn handle_newline(&mut self, ch: char) {
        if ch == '\r' && self.peek() == Some('\n') {
            self.advance();
        }
        self.line += 1;
        self.column = 0;
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated string literal")),
                Some(ch) if ch == quote => return Ok(s),
                Some(ch) if Self::is_line_terminator(ch) => {
                    return Err(self.error("Unterminated string literal"));
                }
                Some('\\') => self.read_escape_sequence(&mut s)?,
                Some(ch) => s.push(ch),
            }
        }
    }

    fn read_escape_sequence(&mut self, out: &mut String) -> Result<(), LexError> {
        match self.advance() {
            None => return Err(self.error("Unterminated escape sequence")),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('v') => out.push('\u{000B}'),
            Some(ch @ '0'..='7') => {
                let mut val = ch as u32 - '0' as u32;
                let max_digits = if ch <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match self.peek() {
                        Some(d @ '0'..='7') => {
                            self.advance();
                            val = val * 8 + (d as u32 - '0' as u32);
                        }
                        _ => break,
                    }
                }
                out.extend(char::from_u32(val));
            }
            Some('x') => {
                let val = self.read_hex_digits(2)?;
                out.extend(char::from_u32(val));
            }
            Some('u') => {
                let val = self.read_hex_digits(4)?;
                out.push(char::from_u32(val).unwrap_or('\u{FFFD}'));
            }
            Some(ch) if Self::is_line_terminator(ch) => self.handle_newline(ch),
            Some(ch) => out.push(ch),
        }
        Ok(())
    }

    fn read_hex_digits(&mut self, count: usize) -> Result<u32, LexError> {
        let mut val = 0;
        for _ in 0..count {
            let digit = self
                .advance()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("Invalid hexadecimal escape sequence"))?;
            val = val * 16 + digit;
        }
        Ok(val)
    }

    fn read_numeric_literal(&mut self, first: char) -> Result<Token, LexError> {
        let mut s = String::new();
        s.push(first);

        if first == '0' {
            match self.peek() {
                Some('x' | 'X') => {
                    self.advance();
                    return self.read_radix_literal(16);
                }
                Some(c) if c.is_ascii_digit() => return self.read_legacy_octal_or_decimal(s),
                _ => {}
            }
        }

        self.read_decimal_digits(&mut s);
        if first != '.' && self.eat('.') {
            s.push('.');
            self.read_decimal_digits(&mut s);
        }
        self.read_exponent(&mut s);

        if self.peek().is_some_and(Self::is_identifier_start) {
            return Err(self.error("Identifier starts immediately after numeric literal"));
        }
        let val: f64 = s
            .parse()
            .map_err(|_| self.error("Invalid numeric literal"))?;
        Ok(Token::NumericLiteral(val))
    }

    fn read_decimal_digits(&mut self, s: &mut String) {
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            s.push(ch);
            self.advance();
        }
    }

    fn read_exponent(&mut self, s: &mut String) {
        if let Some(e @ ('e' | 'E')) = self.peek() {
            s.push(e);
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                s.push(sign);
                self.advance();
            }
            self.read_decimal_digits(s);
        }
    }

    fn read_radix_literal(&mut self, radix: u32) -> Result<Token, LexError> {
        let mut val = 0.0;
        let mut digits = 0;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(radix)) {
            val = val * f64::from(radix) + f64::from(d);
            digits += 1;
            self.advance();
        }
        if digits == 0 {
            return Err(self.error("Invalid hexadecimal literal"));
        }
        Ok(Token::NumericLiteral(val))
    }

    fn read_legacy_octal_or_decimal(&mut self, mut s: String) -> Result<Token, LexError> {
        self.read_decimal_digits(&mut s);
        let is_octal = s.chars().all(|c| ('0'..='7').contains(&c));
        if is_octal && !matches!(self.peek(), Some('.' | 'e' | 'E')) {
            let val = s[1..]
                .chars()
                .fold(0.0, |acc, c| acc * 8.0 + f64::from(c as u32 - '0' as u32));
            return Ok(Token::NumericLiteral(val));
        }
        if self.eat('.') {
            s.push('.');
            self.read_decimal_digits(&mut s);
        }
        self.read_exponent(&mut s);
        let val: f64 = s
            .parse()
            .map_err(|_| self.error("Invalid numeric literal"))?;
        Ok(Token::NumericLiteral(val))
    }

    fn read_identifier(&mut self, first: char) -> Token {
        let mut name = String::new();
        name.push(first);
        while let Some(ch) = self.peek() {
            if !Self::is_identifier_continue(ch) {
                break;
            }
            name.push(ch);
            self.advance();
        }

        match name.as_str() {
            "true" => Token::BooleanLiteral(true),
            "false" => Token::BooleanLiteral(false),
            "null" => Token::NullLiteral,
            _ => match Keyword::from_str(&name) {
                Some(kw) => Token::Keyword(kw),
                None => Token::Identifier(name),
            },
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();

            let ch = match self.peek() {
                None => return Ok(Token::Eof),
                Some(ch) => ch,
            };

            if Self::is_line_terminator(ch) {
                self.advance();
                self.handle_newline(ch);
                return Ok(Token::LineTerminator);
            }

            if ch == '/' {
                if self.peek_next() == Some('/') {
                    self.advance();
                    self.advance();
                    self.skip_line_comment();
                    continue;
                }
                if self.peek_next() == Some('*') {
                    self.advance();
                    self.advance();
                    if self.skip_block_comment()? {
                        return Ok(Token::LineTerminator);
                    }
                    continue;
                }
            }

            // HTML comment openers are skipped like line comments in inline scripts.
            if ch == '<' && self.chars.as_str().starts_with("!--") {
                self.skip_line_comment();
                continue;
            }

            self.advance();

            if ch == '\'' || ch == '"' {
                return self.read_string(ch).map(Token::StringLiteral);
            }
            if ch.is_ascii_digit() || ch == '.' && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.read_numeric_literal(ch);
            }
            if Self::is_identifier_start(ch) {
                return Ok(self.read_identifier(ch));
            }
            return self.read_punctuator(ch);
        }
    }

    fn compound(&mut self, base: Token, assign: Token) -> Token {
        if self.eat('=') { assign } else { base }
    }

    fn read_punctuator(&mut self, ch: char) -> Result<Token, LexError> {
        let token = match ch {
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '~' => Token::Tilde,
            ':' => Token::Colon,
            '?' => Token::Question,
            '.' => Token::Dot,
            '<' => {
                if self.eat('<') {
                    self.compound(Token::LeftShift, Token::LeftShiftAssign)
                } else {
                    self.compound(Token::LessThan, Token::LessThanEqual)
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') {
                        self.compound(Token::UnsignedRightShift, Token::UnsignedRightShiftAssign)
                    } else {
                        self.compound(Token::RightShift, Token::RightShiftAssign)
                    }
                } else {
                    self.compound(Token::GreaterThan, Token::GreaterThanEqual)
                }
            }
            '=' => {
                if self.eat('=') {
                    self.compound(Token::Equal, Token::StrictEqual)
                } else {
                    Token::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    self.compound(Token::NotEqual, Token::StrictNotEqual)
                } else {
                    Token::Bang
                }
            }
            '+' => {
                if self.eat('+') {
                    Token::Increment
                } else {
                    self.compound(Token::Plus, Token::PlusAssign)
                }
            }
            '-' => {
                if self.eat('-') {
                    Token::Decrement
                } else {
                    self.compound(Token::Minus, Token::MinusAssign)
                }
            }
            '&' => {
                if self.eat('&') {
                    Token::LogicalAnd
                } else {
                    self.compound(Token::Ampersand, Token::AmpersandAssign)
                }
            }
            '|' => {
                if self.eat('|') {
                    Token::LogicalOr
                } else {
                    self.compound(Token::Pipe, Token::PipeAssign)
                }
            }
            '*' => self.compound(Token::Star, Token::StarAssign),
            '/' => self.compound(Token::Slash, Token::SlashAssign),
            '%' => self.compound(Token::Percent, Token::PercentAssign),
            '^' => self.compound(Token::Caret, Token::CaretAssign),
            _ => return Err(self.error(format!("Unexpected character: {ch}"))),
        };
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize_all(src: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(src);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn lex(src: &str) -> Vec<Token> {
        tokenize_all(src).unwrap()
    }

    fn lex_no_lt(src: &str) -> Vec<Token> {
        lex(src)
            .into_iter()
            .filter(|t| !matches!(t, Token::LineTerminator))
            .collect()
    }

    #[test]
    fn empty_source() {
        assert_eq!(lex(""), vec![Token::Eof]);
    }

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(
            lex_no_lt("var x = 42;"),
            vec![
                Token::Keyword(Keyword::Var),
                Token::Identifier("x".into()),
                Token::Assign,
                Token::NumericLiteral(42.0),
                Token::Semicolon,
                Token::Eof,
            ]
        );
        assert_eq!(
            lex_no_lt("let"),
            vec![Token::Identifier("let".into()), Token::Eof]
        );
    }

    #[test]
    fn string_literals() {
        assert_eq!(
            lex_no_lt(r#""hello""#),
            vec![Token::StringLiteral("hello".into()), Token::Eof]
        );
        assert_eq!(
            lex_no_lt(r"'he\nllo'"),
            vec![Token::StringLiteral("he\nllo".into()), Token::Eof]
        );
        assert_eq!(
            lex_no_lt(r#""\x41B\101""#),
            vec![Token::StringLiteral("ABA".into()), Token::Eof]
        );
    }

    #[test]
    fn unterminated_string_reports_line() {
        let err = tokenize_all("\n'abc").unwrap_err();
        assert_eq!(err.location.line, 2);
        assert!(err.to_string().contains("Unterminated string"));
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(lex_no_lt("0xff"), vec![Token::NumericLiteral(255.0), Token::Eof]);
        assert_eq!(lex_no_lt("017"), vec![Token::NumericLiteral(15.0), Token::Eof]);
        assert_eq!(lex_no_lt("019"), vec![Token::NumericLiteral(19.0), Token::Eof]);
        assert_eq!(lex_no_lt("1e3"), vec![Token::NumericLiteral(1000.0), Token::Eof]);
        assert_eq!(lex_no_lt(".5"), vec![Token::NumericLiteral(0.5), Token::Eof]);
        assert_eq!(lex_no_lt("2.5e-1"), vec![Token::NumericLiteral(0.25), Token::Eof]);
    }

    #[test]
    fn boolean_null() {
        assert_eq!(
            lex_no_lt("true false null"),
            vec![
                Token::BooleanLiteral(true),
                Token::BooleanLiteral(false),
                Token::NullLiteral,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn punctuators() {
        assert_eq!(lex_no_lt("==="), vec![Token::StrictEqual, Token::Eof]);
        assert_eq!(lex_no_lt("!=="), vec![Token::StrictNotEqual, Token::Eof]);
        assert_eq!(lex_no_lt(">>>="), vec![Token::UnsignedRightShiftAssign, Token::Eof]);
        assert_eq!(lex_no_lt("<<"), vec![Token::LeftShift, Token::Eof]);
        assert_eq!(
            lex_no_lt("a/=2"),
            vec![
                Token::Identifier("a".into()),
                Token::SlashAssign,
                Token::NumericLiteral(2.0),
                Token::Eof
            ]
        );
    }

    #[test]
    fn comments() {
        assert_eq!(lex_no_lt("// comment\n42"), vec![Token::NumericLiteral(42.0), Token::Eof]);
        assert_eq!(lex_no_lt("/* block */ 42"), vec![Token::NumericLiteral(42.0), Token::Eof]);
        assert_eq!(lex_no_lt("<!-- hide\n42"), vec![Token::NumericLiteral(42.0), Token::Eof]);
        assert_eq!(
            lex("/* a\nb */ 1"),
            vec![Token::LineTerminator, Token::NumericLiteral(1.0), Token::Eof]
        );
    }

    #[test]
    fn line_numbers_advance() {
        let mut lexer = Lexer::new("a\r\nb\nc");
        while lexer.next_token().unwrap() != Token::Eof {}
        assert_eq!(lexer.line(), 3);
    }
}
