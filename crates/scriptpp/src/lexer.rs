//! Raw text to an ordered token sequence. Single pass, no lookahead beyond
//! what greedy operator matching needs.
use std::fmt;
use std::rc::Rc;

use crate::span::Span;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl std::error::Error for LexError {}

struct Cursor<'a> {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    file: Rc<str>,
    _src: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str, file: Rc<str>) -> Self {
        Self { chars: src.chars().collect(), pos: 0, line: 1, col: 1, file, _src: src }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn here(&self) -> Span {
        Span::point(self.file.clone(), self.line, self.col)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || "{}()[],.:;=!<>+-*/%&|\"'".contains(c)
}

/// Longest-match table for multi-character operators, checked widest first.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("->", TokenKind::Arrow),
    ("==", TokenKind::Eq),
    ("!=", TokenKind::NotEq),
    ("<=", TokenKind::LtEq),
    (">=", TokenKind::GtEq),
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    ("+=", TokenKind::PlusEq),
    ("-=", TokenKind::MinusEq),
    ("*=", TokenKind::StarEq),
    ("/=", TokenKind::SlashEq),
    ("%=", TokenKind::PercentEq),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    (":", TokenKind::Colon),
    (";", TokenKind::Semicolon),
    ("=", TokenKind::Assign),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("!", TokenKind::Bang),
];

pub fn tokenize(source: &str, file: &str) -> Result<Vec<Token>, LexError> {
    let file: Rc<str> = Rc::from(file);
    let mut cur = Cursor::new(source, file.clone());
    let mut tokens = Vec::new();

    while !cur.at_end() {
        let c = cur.peek().unwrap();

        if c.is_whitespace() {
            cur.bump();
            continue;
        }

        if c == '/' && cur.peek_at(1) == Some('/') {
            while !cur.at_end() && cur.peek() != Some('\n') {
                cur.bump();
            }
            continue;
        }

        if c == '/' && cur.peek_at(1) == Some('*') {
            let start = cur.here();
            cur.bump();
            cur.bump();
            let mut closed = false;
            while !cur.at_end() {
                if cur.peek() == Some('*') && cur.peek_at(1) == Some('/') {
                    cur.bump();
                    cur.bump();
                    closed = true;
                    break;
                }
                cur.bump();
            }
            if !closed {
                return Err(LexError { message: "unterminated block comment".into(), span: start });
            }
            continue;
        }

        if c == '"' || c == '\'' {
            tokens.push(lex_string(&mut cur, c)?);
            continue;
        }

        if c.is_ascii_digit() {
            tokens.push(lex_number(&mut cur));
            continue;
        }

        if !is_separator(c) {
            tokens.push(lex_identifier(&mut cur));
            continue;
        }

        tokens.push(lex_operator(&mut cur)?);
    }

    tokens.push(Token::new(TokenKind::Eof, "", cur.here()));
    Ok(tokens)
}

fn lex_string(cur: &mut Cursor<'_>, quote: char) -> Result<Token, LexError> {
    let start = cur.here();
    cur.bump();
    let mut out = String::new();
    loop {
        match cur.peek() {
            None => return Err(LexError { message: "unterminated string literal".into(), span: start }),
            Some(c) if c == quote => {
                cur.bump();
                break;
            }
            Some('\\') => {
                cur.bump();
                match cur.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c @ ('"' | '\'' | '\\')) => out.push(c),
                    Some(other) => out.push(other),
                    None => return Err(LexError { message: "unterminated string literal".into(), span: start }),
                }
            }
            Some(c) => {
                out.push(c);
                cur.bump();
            }
        }
    }
    let end = cur.here();
    Ok(Token::new(TokenKind::String, out, start.union(&end)))
}

fn lex_number(cur: &mut Cursor<'_>) -> Token {
    let start = cur.here();
    let mut lexeme = String::new();
    while let Some(c) = cur.peek() {
        if c.is_ascii_digit() {
            lexeme.push(c);
            cur.bump();
        } else {
            break;
        }
    }
    if cur.peek() == Some('.') && cur.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
        lexeme.push('.');
        cur.bump();
        while let Some(c) = cur.peek() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                cur.bump();
            } else {
                break;
            }
        }
    }
    let end = cur.here();
    Token::new(TokenKind::Number, lexeme, start.union(&end))
}

fn lex_identifier(cur: &mut Cursor<'_>) -> Token {
    let start = cur.here();
    let mut lexeme = String::new();
    while let Some(c) = cur.peek() {
        if is_separator(c) {
            break;
        }
        lexeme.push(c);
        cur.bump();
    }
    let end = cur.here();
    let span = start.union(&end);
    match Token::keyword_kind(&lexeme) {
        Some(kind) => Token::new(kind, lexeme, span),
        None => Token::new(TokenKind::Identifier, lexeme, span),
    }
}

fn lex_operator(cur: &mut Cursor<'_>) -> Result<Token, LexError> {
    let start = cur.here();
    for (lexeme, kind) in OPERATORS {
        let len = lexeme.chars().count();
        let matches = lexeme.chars().enumerate().all(|(i, c)| cur.peek_at(i) == Some(c));
        if matches {
            for _ in 0..len {
                cur.bump();
            }
            let end = cur.here();
            return Ok(Token::new(*kind, *lexeme, start.union(&end)));
        }
    }
    Err(LexError { message: format!("unexpected character {:?}", cur.peek().unwrap()), span: start })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_arithmetic() {
        let toks = tokenize("1 + 2 * 3", "t").unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Star,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn longest_match_wins_for_operators() {
        let toks = tokenize("a += 1", "t").unwrap();
        assert_eq!(toks[1].kind, TokenKind::PlusEq);
    }

    #[test]
    fn unterminated_string_is_lex_error() {
        assert!(tokenize("\"abc", "t").is_err());
    }

    #[test]
    fn block_comment_is_stripped() {
        let toks = tokenize("1 /* hi\nthere */ + 2", "t").unwrap();
        assert_eq!(toks.len(), 4);
    }

    #[test]
    fn keyword_vs_identifier() {
        let toks = tokenize("let x fn y", "t").unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Let, TokenKind::Identifier, TokenKind::Fn, TokenKind::Identifier, TokenKind::Eof]
        );
    }
}
