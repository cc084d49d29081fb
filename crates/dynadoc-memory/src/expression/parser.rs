//! Tokenizer and recursive-descent parser for store expressions.
//!
//! Keywords and function names are case-insensitive. Precedence, lowest
//! first: `OR`, `AND`, `NOT`, then comparisons and functions.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use super::ExpressionError;
use super::ast::{CompareOp, Condition, Function, Operand, Path, PathElement, SetValue, UpdateExpr};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Name(String),
    Value(String),
    Index(usize),
    Op(CompareOp),
    Plus,
    Minus,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(s) | Self::Name(s) | Self::Value(s) => write!(f, "'{s}'"),
            Self::Index(n) => write!(f, "'{n}'"),
            Self::Op(op) => write!(f, "'{op}'"),
            Self::Plus => f.write_str("'+'"),
            Self::Minus => f.write_str("'-'"),
            Self::Dot => f.write_str("'.'"),
            Self::Comma => f.write_str("','"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::Eof => f.write_str("end of expression"),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn take_while(chars: &mut Peekable<Chars<'_>>, pred: fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if !pred(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        let token = match c {
            c if c.is_ascii_whitespace() => {
                chars.next();
                continue;
            }
            '#' | ':' => {
                chars.next();
                let rest = take_while(&mut chars, is_ident_char);
                if rest.is_empty() {
                    return Err(ExpressionError::UnexpectedToken {
                        expected: format!("placeholder after '{c}'"),
                        found: "nothing".to_owned(),
                    });
                }
                if c == '#' {
                    Token::Name(format!("#{rest}"))
                } else {
                    Token::Value(format!(":{rest}"))
                }
            }
            '0'..='9' => {
                let digits = take_while(&mut chars, |c| c.is_ascii_digit());
                let index = digits.parse().map_err(|_| ExpressionError::UnexpectedToken {
                    expected: "list index".to_owned(),
                    found: digits.clone(),
                })?;
                Token::Index(index)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                Token::Ident(take_while(&mut chars, is_ident_char))
            }
            _ => {
                chars.next();
                let next = chars.peek().copied();
                let (token, wide) = match (c, next) {
                    ('<', Some('>')) => (Token::Op(CompareOp::Ne), true),
                    ('<', Some('=')) => (Token::Op(CompareOp::Le), true),
                    ('>', Some('=')) => (Token::Op(CompareOp::Ge), true),
                    ('<', _) => (Token::Op(CompareOp::Lt), false),
                    ('>', _) => (Token::Op(CompareOp::Gt), false),
                    ('=', _) => (Token::Op(CompareOp::Eq), false),
                    ('+', _) => (Token::Plus, false),
                    ('-', _) => (Token::Minus, false),
                    ('.', _) => (Token::Dot, false),
                    (',', _) => (Token::Comma, false),
                    ('(', _) => (Token::LParen, false),
                    (')', _) => (Token::RParen, false),
                    ('[', _) => (Token::LBracket, false),
                    (']', _) => (Token::RBracket, false),
                    _ => {
                        return Err(ExpressionError::UnexpectedToken {
                            expected: "a valid token".to_owned(),
                            found: format!("'{c}'"),
                        });
                    }
                };
                if wide {
                    chars.next();
                }
                token
            }
        };
        tokens.push(token);
    }
    tokens.push(Token::Eof);
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self, ExpressionError> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn unexpected<T>(&self, expected: &str) -> Result<T, ExpressionError> {
        Err(ExpressionError::UnexpectedToken {
            expected: expected.to_owned(),
            found: self.peek().to_string(),
        })
    }

    fn expect(&mut self, token: &Token) -> Result<(), ExpressionError> {
        if self.peek() == token {
            self.pos += 1;
            Ok(())
        } else {
            self.unexpected(&token.to_string())
        }
    }

    /// Consume a keyword if it is next.
    fn keyword(&mut self, word: &str) -> bool {
        match self.peek() {
            Token::Ident(s) if s.eq_ignore_ascii_case(word) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn peek_keyword(&self, words: &[&str]) -> bool {
        matches!(self.peek(), Token::Ident(s) if words.iter().any(|w| s.eq_ignore_ascii_case(w)))
    }

    fn peek_call(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s.eq_ignore_ascii_case(name))
            && self.tokens.get(self.pos + 1) == Some(&Token::LParen)
    }

    fn finish(&self) -> Result<(), ExpressionError> {
        if *self.peek() == Token::Eof {
            Ok(())
        } else {
            self.unexpected("end of expression")
        }
    }

    fn comma_separated<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, ExpressionError>,
    ) -> Result<Vec<T>, ExpressionError> {
        let mut items = vec![item(self)?];
        while *self.peek() == Token::Comma {
            self.advance();
            items.push(item(self)?);
        }
        Ok(items)
    }

    // -- conditions --

    fn or(&mut self) -> Result<Condition, ExpressionError> {
        let mut left = self.and()?;
        while self.keyword("OR") {
            left = Condition::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Condition, ExpressionError> {
        let mut left = self.not()?;
        while self.keyword("AND") {
            left = Condition::And(Box::new(left), Box::new(self.not()?));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Condition, ExpressionError> {
        if self.keyword("NOT") {
            return Ok(Condition::Not(Box::new(self.not()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Condition, ExpressionError> {
        if *self.peek() == Token::LParen {
            self.advance();
            let inner = self.or()?;
            self.expect(&Token::RParen)?;
            return Ok(inner);
        }

        let function = [
            ("attribute_exists", Function::AttributeExists),
            ("attribute_not_exists", Function::AttributeNotExists),
            ("attribute_type", Function::AttributeType),
            ("begins_with", Function::BeginsWith),
            ("contains", Function::Contains),
        ]
        .into_iter()
        .find(|(name, _)| self.peek_call(name));
        if let Some((_, function)) = function {
            self.advance();
            self.expect(&Token::LParen)?;
            let args = self.comma_separated(Self::operand)?;
            self.expect(&Token::RParen)?;
            if args.len() != function.arity() {
                return Err(ExpressionError::UnexpectedToken {
                    expected: format!("{} arguments to {function}", function.arity()),
                    found: args.len().to_string(),
                });
            }
            return Ok(Condition::Function { function, args });
        }

        let left = self.operand()?;
        if let Token::Op(op) = *self.peek() {
            self.advance();
            let right = self.operand()?;
            return Ok(Condition::Compare { left, op, right });
        }
        if self.keyword("BETWEEN") {
            let low = self.operand()?;
            if !self.keyword("AND") {
                return self.unexpected("AND");
            }
            let high = self.operand()?;
            return Ok(Condition::Between {
                value: left,
                low,
                high,
            });
        }
        if self.keyword("IN") {
            self.expect(&Token::LParen)?;
            let list = self.comma_separated(Self::operand)?;
            self.expect(&Token::RParen)?;
            return Ok(Condition::In { value: left, list });
        }
        self.unexpected("comparison, BETWEEN or IN")
    }

    // -- operands and paths --

    fn operand(&mut self) -> Result<Operand, ExpressionError> {
        if let Token::Value(name) = self.peek() {
            let name = name.clone();
            self.advance();
            return Ok(Operand::Value(name));
        }
        if self.peek_call("size") {
            self.advance();
            self.expect(&Token::LParen)?;
            let path = self.path()?;
            self.expect(&Token::RParen)?;
            return Ok(Operand::Size(path));
        }
        Ok(Operand::Path(self.path()?))
    }

    fn path(&mut self) -> Result<Path, ExpressionError> {
        let mut elements = vec![self.path_name()?];
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    elements.push(self.path_name()?);
                }
                Token::LBracket => {
                    self.advance();
                    let Token::Index(idx) = self.advance() else {
                        self.pos -= 1;
                        return self.unexpected("list index");
                    };
                    self.expect(&Token::RBracket)?;
                    elements.push(PathElement::Index(idx));
                }
                _ => return Ok(Path(elements)),
            }
        }
    }

    fn path_name(&mut self) -> Result<PathElement, ExpressionError> {
        match self.peek() {
            Token::Ident(s) | Token::Name(s) => {
                let name = s.clone();
                self.advance();
                Ok(PathElement::Name(name))
            }
            _ => self.unexpected("attribute name"),
        }
    }

    // -- updates --

    fn update(&mut self) -> Result<UpdateExpr, ExpressionError> {
        let mut update = UpdateExpr::default();
        while *self.peek() != Token::Eof {
            if self.keyword("SET") {
                let actions = self.comma_separated(|p| {
                    let path = p.path()?;
                    p.expect(&Token::Op(CompareOp::Eq))?;
                    Ok((path, p.set_value()?))
                })?;
                update.set.extend(actions);
            } else if self.keyword("REMOVE") {
                let paths = self.comma_separated(Self::path)?;
                update.remove.extend(paths);
            } else if self.keyword("ADD") {
                let actions = self.comma_separated(|p| Ok((p.path()?, p.operand()?)))?;
                update.add.extend(actions);
            } else if self.keyword("DELETE") {
                let actions = self.comma_separated(|p| Ok((p.path()?, p.operand()?)))?;
                update.delete.extend(actions);
            } else {
                return self.unexpected("SET, REMOVE, ADD or DELETE");
            }
        }
        Ok(update)
    }

    fn set_value(&mut self) -> Result<SetValue, ExpressionError> {
        let left = self.set_term()?;
        match self.peek() {
            Token::Plus => {
                self.advance();
                Ok(SetValue::Plus(Box::new(left), Box::new(self.set_term()?)))
            }
            Token::Minus => {
                self.advance();
                Ok(SetValue::Minus(Box::new(left), Box::new(self.set_term()?)))
            }
            _ => Ok(left),
        }
    }

    fn set_term(&mut self) -> Result<SetValue, ExpressionError> {
        if self.peek_call("if_not_exists") {
            self.advance();
            self.expect(&Token::LParen)?;
            let path = self.path()?;
            self.expect(&Token::Comma)?;
            let fallback = self.set_term()?;
            self.expect(&Token::RParen)?;
            return Ok(SetValue::IfNotExists(path, Box::new(fallback)));
        }
        if self.peek_call("list_append") {
            self.advance();
            self.expect(&Token::LParen)?;
            let first = self.set_term()?;
            self.expect(&Token::Comma)?;
            let second = self.set_term()?;
            self.expect(&Token::RParen)?;
            return Ok(SetValue::ListAppend(Box::new(first), Box::new(second)));
        }
        if self.peek_keyword(&["SET", "REMOVE", "ADD", "DELETE"]) {
            return self.unexpected("operand");
        }
        Ok(SetValue::Operand(self.operand()?))
    }
}

/// Parse a condition, filter or key-condition expression.
pub fn parse_condition(input: &str) -> Result<Condition, ExpressionError> {
    let mut parser = Parser::new(input)?;
    let condition = parser.or()?;
    parser.finish()?;
    Ok(condition)
}

/// Parse an update expression.
pub fn parse_update(input: &str) -> Result<UpdateExpr, ExpressionError> {
    let mut parser = Parser::new(input)?;
    let update = parser.update()?;
    if update.is_empty() {
        return parser.unexpected("SET, REMOVE, ADD or DELETE");
    }
    Ok(update)
}

/// Parse a projection expression.
pub fn parse_projection(input: &str) -> Result<Vec<Path>, ExpressionError> {
    let mut parser = Parser::new(input)?;
    let paths = parser.comma_separated(Parser::path)?;
    parser.finish()?;
    Ok(paths)
}
