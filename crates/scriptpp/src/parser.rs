//! Precedence-correct recursive-descent parser: token sequence -> Module
//! AST. Fails fast with a span on the first malformed construct.
use std::fmt;
use std::rc::Rc;

use crate::ast::{BinOp, Node, Param};
use crate::number::Number;
use crate::span::Span;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl std::error::Error for ParseError {}

pub fn parse_module(tokens: &[Token], file: &str) -> Result<Node, ParseError> {
    let mut p = Parser { tokens, pos: 0, file: Rc::from(file) };
    let mut statements = Vec::new();
    let start = p.here();
    while !p.at(TokenKind::Eof) {
        statements.push(p.parse_statement()?);
    }
    let end = p.here();
    Ok(Node::Module { statements, span: start.union(&end) })
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    file: Rc<str>,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn here(&self) -> Span {
        self.peek().span.clone()
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) { Some(self.advance()) } else { None }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError {
                message: format!("expected {what}, found {:?} {:?}", self.peek().kind, self.peek().lexeme),
                span: self.here(),
            })
        }
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> Result<Node, ParseError> {
        let start = self.here();
        let node = match self.peek().kind {
            TokenKind::Fn => self.parse_function(true)?,
            TokenKind::Class => self.parse_class()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::Try => self.parse_try()?,
            TokenKind::Return => {
                self.advance();
                let value = if self.at(TokenKind::Semicolon) { None } else { Some(Box::new(self.parse_expression()?)) };
                let end = self.here();
                self.eat(TokenKind::Semicolon);
                return Ok(Node::Return { value, span: start.union(&end) });
            }
            TokenKind::Throw => {
                self.advance();
                let value = Box::new(self.parse_expression()?);
                let end = self.here();
                self.eat(TokenKind::Semicolon);
                return Ok(Node::Throw { value, span: start.union(&end) });
            }
            TokenKind::Break => {
                self.advance();
                self.eat(TokenKind::Semicolon);
                return Ok(Node::Break { span: start });
            }
            TokenKind::Continue => {
                self.advance();
                self.eat(TokenKind::Semicolon);
                return Ok(Node::Continue { span: start });
            }
            TokenKind::LBrace => self.parse_scope()?,
            _ => {
                let expr = self.parse_expression()?;
                self.eat(TokenKind::Semicolon);
                return Ok(expr);
            }
        };
        Ok(node)
    }

    fn parse_scope(&mut self) -> Result<Node, ParseError> {
        let start = self.expect(TokenKind::LBrace, "'{'")?.span;
        let mut statements = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        Ok(Node::Scope { statements, span: start.union(&end) })
    }

    fn parse_function(&mut self, as_statement: bool) -> Result<Node, ParseError> {
        let _ = as_statement;
        let start = self.expect(TokenKind::Fn, "'fn'")?.span;
        let name = self.eat(TokenKind::Identifier).map(|t| Rc::from(t.lexeme.as_str()));
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            let ident = self.expect(TokenKind::Identifier, "parameter name")?;
            let default = if self.eat(TokenKind::Assign).is_some() {
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            params.push(Param { name: Rc::from(ident.lexeme.as_str()), default });
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let body = if self.eat(TokenKind::Arrow).is_some() {
            Box::new(self.parse_expression()?)
        } else {
            Box::new(self.parse_scope()?)
        };
        let end = body.span().clone();
        Ok(Node::Function { name, params, body, span: start.union(&end) })
    }

    fn parse_class(&mut self) -> Result<Node, ParseError> {
        let start = self.expect(TokenKind::Class, "'class'")?.span;
        let name = self.eat(TokenKind::Identifier).map(|t| Rc::from(t.lexeme.as_str()));
        let mut parents = Vec::new();
        if self.eat(TokenKind::Colon).is_some() {
            loop {
                parents.push(self.parse_primary()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let body = Box::new(self.parse_scope()?);
        let end = body.span().clone();
        Ok(Node::Class { name, parents, body, span: start.union(&end) })
    }

    fn parse_for(&mut self) -> Result<Node, ParseError> {
        let start = self.expect(TokenKind::For, "'for'")?.span;
        self.expect(TokenKind::LParen, "'('")?;
        let init = if self.at(TokenKind::Semicolon) { None } else { Some(Box::new(self.parse_expression()?)) };
        self.expect(TokenKind::Semicolon, "';'")?;
        let cond = if self.at(TokenKind::Semicolon) { None } else { Some(Box::new(self.parse_expression()?)) };
        self.expect(TokenKind::Semicolon, "';'")?;
        let update = if self.at(TokenKind::RParen) { None } else { Some(Box::new(self.parse_expression()?)) };
        self.expect(TokenKind::RParen, "')'")?;
        let body = Box::new(self.parse_scope()?);
        let end = body.span().clone();
        Ok(Node::For { init, cond, update, body, span: start.union(&end) })
    }

    fn parse_while(&mut self) -> Result<Node, ParseError> {
        let start = self.expect(TokenKind::While, "'while'")?.span;
        self.expect(TokenKind::LParen, "'('")?;
        let cond = Box::new(self.parse_expression()?);
        self.expect(TokenKind::RParen, "')'")?;
        let body = Box::new(self.parse_scope()?);
        let end = body.span().clone();
        Ok(Node::While { cond, body, span: start.union(&end) })
    }

    fn parse_try(&mut self) -> Result<Node, ParseError> {
        let start = self.expect(TokenKind::Try, "'try'")?.span;
        let try_scope = Box::new(self.parse_scope()?);
        self.expect(TokenKind::Catch, "'catch'")?;
        let catch_ident = self.eat(TokenKind::Identifier).map(|t| Rc::from(t.lexeme.as_str()));
        let catch_scope = Box::new(self.parse_scope()?);
        let end = catch_scope.span().clone();
        Ok(Node::TryCatch { try_scope, catch_ident, catch_scope, span: start.union(&end) })
    }

    // ---- expressions ----

    fn parse_expression(&mut self) -> Result<Node, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Node, ParseError> {
        if self.at(TokenKind::Let) {
            return self.parse_let();
        }
        let start = self.here();
        let target = self.parse_logical()?;

        let compound = match self.peek().kind {
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::PercentEq => Some(BinOp::Mod),
            _ => None,
        };
        if let Some(op) = compound {
            self.advance();
            let rhs = self.parse_assignment()?;
            let end = rhs.span().clone();
            let span = start.union(&end);
            let combined =
                Node::BinaryOp { op, lhs: Box::new(target.clone()), rhs: Box::new(rhs), span: span.clone() };
            return Ok(Node::Assign { target: Box::new(target), value: Box::new(combined), span });
        }

        if self.eat(TokenKind::Assign).is_some() {
            let value = self.parse_assignment()?;
            let end = value.span().clone();
            return Ok(Node::Assign { target: Box::new(target), value: Box::new(value), span: start.union(&end) });
        }

        Ok(target)
    }

    fn parse_let(&mut self) -> Result<Node, ParseError> {
        let start = self.expect(TokenKind::Let, "'let'")?.span;
        let mut names = Vec::new();
        while self.at(TokenKind::Identifier) {
            names.push(Rc::from(self.advance().lexeme.as_str()));
        }
        if names.is_empty() {
            return Err(ParseError { message: "expected identifier after 'let'".into(), span: self.here() });
        }
        self.expect(TokenKind::Assign, "'=' in let binding")?;
        let value = Box::new(self.parse_assignment()?);
        let end = value.span().clone();
        Ok(Node::CreateAndAssign { names, value, span: start.union(&end) })
    }

    fn parse_logical(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::AndAnd => BinOp::And,
                TokenKind::OrOr => BinOp::Or,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            let span = lhs.span().union(rhs.span());
            lhs = Node::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            let span = lhs.span().union(rhs.span());
            lhs = Node::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            let span = lhs.span().union(rhs.span());
            lhs = Node::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_postfix()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_postfix()?;
            let span = lhs.span().union(rhs.span());
            lhs = Node::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let ident = self.expect(TokenKind::Identifier, "property name")?;
                    let span = expr.span().union(&ident.span);
                    expr = Node::Access { object: Box::new(expr), name: Rc::from(ident.lexeme.as_str()), span };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    let end = self.expect(TokenKind::RBracket, "']'")?.span;
                    let span = expr.span().union(&end);
                    expr = Node::Index { object: Box::new(expr), index: Box::new(index), span };
                }
                TokenKind::LParen => {
                    self.advance();
                    let mut positional = Vec::new();
                    let mut named = Vec::new();
                    while !self.at(TokenKind::RParen) {
                        if self.at(TokenKind::Identifier) && self.tokens.get(self.pos + 1).map(|t| t.kind) == Some(TokenKind::Colon) {
                            let ident = self.advance();
                            self.advance();
                            let value = self.parse_expression()?;
                            named.push((Rc::from(ident.lexeme.as_str()), value));
                        } else {
                            positional.push(self.parse_expression()?);
                        }
                        if self.eat(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                    let end = self.expect(TokenKind::RParen, "')'")?.span;
                    let span = expr.span().union(&end);
                    expr = Node::Call { callee: Box::new(expr), positional, named, span };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        if self.at(TokenKind::Minus) {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.union(operand.span());
            // `-expr` lowers to `expr * -1`.
            let neg_one = Node::NumericLiteral { value: Number::Int32(-1), span: span.clone() };
            return Ok(Node::BinaryOp { op: BinOp::Mul, lhs: Box::new(operand), rhs: Box::new(neg_one), span });
        }
        if self.at(TokenKind::Bang) {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.union(operand.span());
            return Ok(Node::Not { operand: Box::new(operand), span });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Number => {
                self.advance();
                let value = parse_number_literal(&tok.lexeme);
                Ok(Node::NumericLiteral { value, span: tok.span })
            }
            TokenKind::String => {
                self.advance();
                Ok(Node::StringLiteral { value: tok.lexeme, span: tok.span })
            }
            TokenKind::True => {
                self.advance();
                Ok(Node::BooleanLiteral { value: true, span: tok.span })
            }
            TokenKind::False => {
                self.advance();
                Ok(Node::BooleanLiteral { value: false, span: tok.span })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Node::NullLiteral { span: tok.span })
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Node::Identifier { name: Rc::from(tok.lexeme.as_str()), span: tok.span })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBrace => self.parse_scope(),
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.at(TokenKind::RBracket) {
                    items.push(self.parse_expression()?);
                    if self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
                let end = self.expect(TokenKind::RBracket, "']'")?.span;
                Ok(Node::ListLiteral { items, span: tok.span.union(&end) })
            }
            TokenKind::When => self.parse_when(),
            TokenKind::Fn => self.parse_function(false),
            TokenKind::Break => {
                self.advance();
                Ok(Node::Break { span: tok.span })
            }
            TokenKind::Continue => {
                self.advance();
                Ok(Node::Continue { span: tok.span })
            }
            TokenKind::Throw => {
                self.advance();
                let value = Box::new(self.parse_expression()?);
                let end = value.span().clone();
                Ok(Node::Throw { value, span: tok.span.union(&end) })
            }
            TokenKind::Let => self.parse_let(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Node::NoOp { span: tok.span })
            }
            _ => Err(ParseError { message: format!("unexpected token {:?}", tok.kind), span: tok.span }),
        }
    }

    fn parse_when(&mut self) -> Result<Node, ParseError> {
        let start = self.expect(TokenKind::When, "'when'")?.span;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut branches = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let cond = self.parse_expression()?;
            self.expect(TokenKind::Arrow, "'->'")?;
            let stmt = self.parse_statement()?;
            branches.push((cond, stmt));
            self.eat(TokenKind::Semicolon);
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        Ok(Node::When { branches, span: start.union(&end) })
    }
}

fn parse_number_literal(lexeme: &str) -> Number {
    if lexeme.contains('.') {
        Number::Float64(lexeme.parse().unwrap_or(0.0))
    } else {
        match lexeme.parse::<i32>() {
            Ok(n) => Number::Int32(n),
            Err(_) => Number::Int64(lexeme.parse().unwrap_or(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(src: &str) -> Node {
        let toks = tokenize(src, "t").unwrap();
        parse_module(&toks, "t").unwrap()
    }

    #[test]
    fn precedence_multiplication_binds_tighter() {
        let Node::Module { statements, .. } = parse("1 + 2 * 3;") else { panic!() };
        let Node::BinaryOp { op, .. } = &statements[0] else { panic!() };
        assert_eq!(*op, BinOp::Add);
    }

    #[test]
    fn destructuring_let() {
        let Node::Module { statements, .. } = parse("let a b c = 1;") else { panic!() };
        let Node::CreateAndAssign { names, .. } = &statements[0] else { panic!() };
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn named_and_positional_call_args() {
        let Node::Module { statements, .. } = parse("f(1, x: 2);") else { panic!() };
        let Node::Call { positional, named, .. } = &statements[0] else { panic!() };
        assert_eq!(positional.len(), 1);
        assert_eq!(named.len(), 1);
    }

    #[test]
    fn compound_assignment_desugars() {
        let Node::Module { statements, .. } = parse("a += 1;") else { panic!() };
        let Node::Assign { value, .. } = &statements[0] else { panic!() };
        assert!(matches!(**value, Node::BinaryOp { op: BinOp::Add, .. }));
    }
}
