//! Recursive-descent parser for template expressions.
//!
//! Precedence, lowest first: `or`, `and`, `?:`, `??`, `||`, `&&`,
//! equality, comparison, `.`, `+ -`, `* / %`, unary, postfix access.

use chumsky::prelude::*;

use super::lexer::{lex, Token};
use super::{
    ArrayItem, AssignOp, BinaryOp, Expr, ExprError, ForHeader, ForeachHeader, Stmt, UnaryOp,
};

type Spanned<'src> = (Token<'src>, SimpleSpan);

fn tokenize(source: &str) -> Result<Vec<Spanned<'_>>, ExprError> {
    lex(source).map_err(|errs| {
        let first = errs.into_iter().next();
        match first {
            Some(e) => {
                let span = e.span();
                ExprError::new(e.to_string(), span.start..span.end)
            }
            None => ExprError::new("invalid expression", 0..source.len()),
        }
    })
}

/// Parse a single expression.
pub fn parse_expr(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens, source.len());
    if parser.at_end() {
        return Err(ExprError::new("expected an expression", 0..source.len()));
    }
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a comma separated argument list (without the parentheses).
pub fn parse_args(source: &str) -> Result<Vec<Expr>, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens, source.len());
    let mut args = Vec::new();
    while !parser.at_end() {
        args.push(parser.expression()?);
        if !parser.eat(&Token::Comma) {
            break;
        }
    }
    parser.expect_end()?;
    Ok(args)
}

/// Parse `;` separated statements.
pub fn parse_statements(source: &str) -> Result<Vec<Stmt>, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens, source.len());
    let mut statements = Vec::new();
    while !parser.at_end() {
        if parser.eat(&Token::Semicolon) {
            continue;
        }
        statements.push(parser.statement()?);
        if !parser.at_end() {
            parser.expect(&Token::Semicolon)?;
        }
    }
    Ok(statements)
}

/// Parse `source as $value` or `source as $key => $value`.
pub fn parse_foreach_header(source: &str) -> Result<ForeachHeader, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens, source.len());
    let collection = parser.expression()?;
    parser.expect(&Token::As)?;
    let first = parser.variable()?;
    let header = if parser.eat(&Token::FatArrow) {
        ForeachHeader {
            source: collection,
            key: Some(first),
            value: parser.variable()?,
        }
    } else {
        ForeachHeader {
            source: collection,
            key: None,
            value: first,
        }
    };
    parser.expect_end()?;
    Ok(header)
}

/// Parse `init; condition; step`, where init and step are comma separated.
pub fn parse_for_header(source: &str) -> Result<ForHeader, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens, source.len());

    let init = parser.statement_list(&Token::Semicolon)?;
    parser.expect(&Token::Semicolon)?;
    let condition = if parser.check(&Token::Semicolon) {
        None
    } else {
        Some(parser.expression()?)
    };
    parser.expect(&Token::Semicolon)?;
    let step = parser.statement_list(&Token::Semicolon)?;
    parser.expect_end()?;

    Ok(ForHeader {
        init,
        condition,
        step,
    })
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'t, 'src> {
    tokens: &'t [Spanned<'src>],
    pos: usize,
    end: usize,
}

impl<'t, 'src> Parser<'t, 'src> {
    fn new(tokens: &'t [Spanned<'src>], end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn span(&self) -> std::ops::Range<usize> {
        match self.tokens.get(self.pos) {
            Some((_, span)) => span.start..span.end,
            None => self.end..self.end,
        }
    }

    fn advance(&mut self) -> Option<&Token<'src>> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t);
        self.pos += 1;
        token
    }

    fn check(&self, token: &Token<'_>) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token<'_>) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ExprError {
        let found = match self.peek() {
            Some(token) => format!("'{}'", token),
            None => "end of input".to_string(),
        };
        ExprError::new(format!("expected {}, found {}", expected, found), self.span())
    }

    fn expect(&mut self, token: &Token<'_>) -> Result<(), ExprError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", token)))
        }
    }

    fn expect_end(&self) -> Result<(), ExprError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of expression"))
        }
    }

    fn variable(&mut self) -> Result<String, ExprError> {
        match self.peek() {
            Some(Token::Var(name)) => {
                let name = name.to_string();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("a variable")),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement_list(&mut self, stop: &Token<'_>) -> Result<Vec<Stmt>, ExprError> {
        let mut statements = Vec::new();
        while !self.at_end() && !self.check(stop) {
            statements.push(self.statement()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(statements)
    }

    fn statement(&mut self) -> Result<Stmt, ExprError> {
        let start = self.span();

        if let Some(delta) = self.step_delta() {
            self.pos += 1;
            let target = self.postfix()?;
            return self.place(target, start).map(|target| Stmt::Step { target, delta });
        }

        let expr = self.expression()?;

        if let Some(delta) = self.step_delta() {
            self.pos += 1;
            return self.place(expr, start).map(|target| Stmt::Step { target, delta });
        }

        let op = match self.peek() {
            Some(Token::Eq) => AssignOp::Set,
            Some(Token::PlusEq) => AssignOp::Add,
            Some(Token::MinusEq) => AssignOp::Sub,
            Some(Token::StarEq) => AssignOp::Mul,
            Some(Token::SlashEq) => AssignOp::Div,
            Some(Token::DotEq) => AssignOp::Concat,
            Some(Token::CoalesceEq) => AssignOp::Coalesce,
            _ => return Ok(Stmt::Expr { expr }),
        };
        self.pos += 1;
        let target = self.place(expr, start)?;
        let value = self.expression()?;
        Ok(Stmt::Assign { target, op, value })
    }

    fn step_delta(&self) -> Option<i64> {
        match self.peek() {
            Some(Token::PlusPlus) => Some(1),
            Some(Token::MinusMinus) => Some(-1),
            _ => None,
        }
    }

    fn place(&self, expr: Expr, start: std::ops::Range<usize>) -> Result<Expr, ExprError> {
        if expr.is_place() {
            Ok(expr)
        } else {
            Err(ExprError::new("cannot assign to this expression", start))
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.low_and()?;
        while self.eat(&Token::Or) {
            let right = self.low_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn low_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.ternary()?;
        while self.eat(&Token::And) {
            let right = self.ternary()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let condition = self.coalesce()?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let then = if self.eat(&Token::Colon) {
            None
        } else {
            let then = self.ternary()?;
            self.expect(&Token::Colon)?;
            Some(Box::new(then))
        };
        let otherwise = self.ternary()?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then,
            otherwise: Box::new(otherwise),
        })
    }

    fn coalesce(&mut self) -> Result<Expr, ExprError> {
        let left = self.binary(0)?;
        if self.eat(&Token::Coalesce) {
            let right = self.coalesce()?;
            return Ok(Expr::Coalesce {
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    /// Precedence climbing over the left-associative binary operators.
    fn binary(&mut self, min_prec: u8) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        while let Some((prec, op)) = self.peek().and_then(binary_op) {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let right = self.binary(prec + 1)?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Arrow) {
                let name = match self.peek() {
                    Some(Token::Ident(name)) => name.to_string(),
                    _ => return Err(self.unexpected("a property name")),
                };
                self.pos += 1;
                if self.check(&Token::LParen) {
                    return Err(ExprError::new(
                        format!("method calls are not supported: ->{}()", name),
                        self.span(),
                    ));
                }
                expr = Expr::Property {
                    object: Box::new(expr),
                    name,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(&Token::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let span = self.span();
        let token = match self.advance() {
            Some(token) => token.clone(),
            None => return Err(ExprError::new("expected an expression, found end of input", span)),
        };

        match token {
            Token::Var(name) => Ok(Expr::Var {
                name: name.to_string(),
            }),
            Token::Number(text) => Ok(number(text)),
            Token::Str(value) => Ok(Expr::Str { value }),
            Token::True => Ok(Expr::Bool { value: true }),
            Token::False => Ok(Expr::Bool { value: false }),
            Token::Null => Ok(Expr::Null),
            Token::LParen => {
                let expr = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => self.array_items(&Token::RBracket),
            Token::Ident(name) if self.check(&Token::LParen) => {
                self.pos += 1;
                if name.eq_ignore_ascii_case("array") {
                    return self.array_items(&Token::RParen);
                }
                let args = self.call_args()?;
                Ok(Expr::Call {
                    function: name.to_ascii_lowercase(),
                    args,
                })
            }
            other => Err(ExprError::new(
                format!("unexpected '{}' in expression", other),
                span,
            )),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            args.push(self.expression()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn array_items(&mut self, close: &Token<'_>) -> Result<Expr, ExprError> {
        let mut items = Vec::new();
        while !self.check(close) {
            let first = self.expression()?;
            let item = if self.eat(&Token::FatArrow) {
                ArrayItem {
                    key: Some(first),
                    value: self.expression()?,
                }
            } else {
                ArrayItem {
                    key: None,
                    value: first,
                }
            };
            items.push(item);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(Expr::Array { items })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn binary_op(token: &Token<'_>) -> Option<(u8, BinaryOp)> {
    let entry = match token {
        Token::OrOr => (1, BinaryOp::Or),
        Token::AndAnd => (2, BinaryOp::And),
        Token::EqEq => (3, BinaryOp::Eq),
        Token::NotEq => (3, BinaryOp::NotEq),
        Token::StrictEq => (3, BinaryOp::StrictEq),
        Token::StrictNotEq => (3, BinaryOp::StrictNotEq),
        Token::Lt => (4, BinaryOp::Lt),
        Token::LtEq => (4, BinaryOp::LtEq),
        Token::Gt => (4, BinaryOp::Gt),
        Token::GtEq => (4, BinaryOp::GtEq),
        Token::Dot => (5, BinaryOp::Concat),
        Token::Plus => (6, BinaryOp::Add),
        Token::Minus => (6, BinaryOp::Sub),
        Token::Star => (7, BinaryOp::Mul),
        Token::Slash => (7, BinaryOp::Div),
        Token::Percent => (7, BinaryOp::Mod),
        _ => return None,
    };
    Some(entry)
}

fn number(text: &str) -> Expr {
    if !text.contains('.') {
        if let Ok(value) = text.parse::<i64>() {
            return Expr::Int { value };
        }
    }
    Expr::Float {
        value: text.parse().unwrap_or(f64::INFINITY),
    }
}
