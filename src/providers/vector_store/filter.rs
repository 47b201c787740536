//! Filter expression parsing and evaluation
//!
//! Stores accept a small scalar predicate language over persisted document
//! fields:
//!
//! ```text
//! file_extension == "rs" and (start_line in [1, 2] or not relative_path == "lib.rs")
//! metadata.codebase_path == "/home/user/project"
//! ```
//!
//! Supported: `==`/`=`, `!=`, `in [..]`, `and`, `or`, `not`, parentheses,
//! string and integer literals, and `metadata.<key>` lookups. Referencing an
//! unknown top-level field fails with `InvalidFilter` at parse time.

use crate::domain::error::{Error, Result};
use crate::domain::types::VectorDocument;

/// Parsed filter predicate
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `field == literal`
    Eq(FieldRef, Literal),
    /// `field != literal`
    Ne(FieldRef, Literal),
    /// `field in [literal, ...]`
    In(FieldRef, Vec<Literal>),
    /// Conjunction
    And(Box<FilterExpr>, Box<FilterExpr>),
    /// Disjunction
    Or(Box<FilterExpr>, Box<FilterExpr>),
    /// Negation
    Not(Box<FilterExpr>),
}

/// A persisted field addressable from a filter
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef {
    /// Document id
    Id,
    /// Chunk text
    Content,
    /// Path relative to the codebase root
    RelativePath,
    /// Extension without dot
    FileExtension,
    /// First covered line
    StartLine,
    /// Last covered line
    EndLine,
    /// Modification time in epoch milliseconds
    MtimeMs,
    /// A key inside the parsed metadata mapping
    Metadata(String),
}

impl FieldRef {
    fn resolve(name: &str) -> Result<Self> {
        if let Some(key) = name.strip_prefix("metadata.") {
            if key.is_empty() {
                return Err(Error::invalid_filter("empty metadata key"));
            }
            return Ok(Self::Metadata(key.to_string()));
        }
        match name {
            "id" => Ok(Self::Id),
            "content" => Ok(Self::Content),
            "relative_path" => Ok(Self::RelativePath),
            "file_extension" => Ok(Self::FileExtension),
            "start_line" => Ok(Self::StartLine),
            "end_line" => Ok(Self::EndLine),
            "mtime_ms" => Ok(Self::MtimeMs),
            other => Err(Error::invalid_filter(format!("unknown field: {other}"))),
        }
    }
}

/// Scalar literal in a filter
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted string
    Str(String),
    /// Signed integer
    Int(i64),
}

impl FilterExpr {
    /// Parse a filter expression, failing with `InvalidFilter` on syntax
    /// errors or unknown fields.
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(Error::invalid_filter(format!(
                "unexpected trailing input at token {}",
                parser.pos
            )));
        }
        Ok(expr)
    }

    /// Evaluate the predicate against one document.
    pub fn matches(&self, doc: &VectorDocument) -> bool {
        match self {
            Self::Eq(field, lit) => field_equals(field, lit, doc),
            Self::Ne(field, lit) => !field_equals(field, lit, doc),
            Self::In(field, lits) => lits.iter().any(|lit| field_equals(field, lit, doc)),
            Self::And(a, b) => a.matches(doc) && b.matches(doc),
            Self::Or(a, b) => a.matches(doc) || b.matches(doc),
            Self::Not(inner) => !inner.matches(doc),
        }
    }
}

fn field_equals(field: &FieldRef, lit: &Literal, doc: &VectorDocument) -> bool {
    match field {
        FieldRef::Id => lit_is_str(lit, &doc.id),
        FieldRef::Content => lit_is_str(lit, &doc.content),
        FieldRef::RelativePath => lit_is_str(lit, &doc.relative_path),
        FieldRef::FileExtension => lit_is_str(lit, &doc.file_extension),
        FieldRef::StartLine => lit_is_int(lit, doc.start_line as i64),
        FieldRef::EndLine => lit_is_int(lit, doc.end_line as i64),
        FieldRef::MtimeMs => lit_is_int(lit, doc.mtime_ms),
        FieldRef::Metadata(key) => match doc.metadata.get(key) {
            Some(serde_json::Value::String(s)) => lit_is_str(lit, s),
            Some(serde_json::Value::Number(n)) => {
                n.as_i64().map(|v| lit_is_int(lit, v)).unwrap_or(false)
            }
            _ => false,
        },
    }
}

fn lit_is_str(lit: &Literal, value: &str) -> bool {
    matches!(lit, Literal::Str(s) if s == value)
}

fn lit_is_int(lit: &Literal, value: i64) -> bool {
    matches!(lit, Literal::Int(i) if *i == value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    EqEq,
    Ne,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    And,
    Or,
    Not,
    In,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    i += 2;
                } else {
                    i += 1;
                }
                tokens.push(Token::EqEq);
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    return Err(Error::invalid_filter("expected '=' after '!'"));
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                        None => return Err(Error::invalid_filter("unterminated string literal")),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '-' | '0'..='9' => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<i64>()
                    .map_err(|_| Error::invalid_filter(format!("bad integer: {text}")))?;
                tokens.push(Token::Int(value));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.to_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    _ => Token::Ident(word),
                });
            }
            other => {
                return Err(Error::invalid_filter(format!("unexpected character: {other}")));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        match self.next() {
            Some(t) if t == token => Ok(()),
            other => Err(Error::invalid_filter(format!(
                "expected {token:?}, found {other:?}"
            ))),
        }
    }

    fn parse_or(&mut self) -> Result<FilterExpr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterExpr> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let right = self.parse_unary()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<FilterExpr> {
        if self.peek() == Some(&Token::Not) {
            self.next();
            let inner = self.parse_unary()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<FilterExpr> {
        if self.peek() == Some(&Token::LParen) {
            self.next();
            let expr = self.parse_or()?;
            self.expect(Token::RParen)?;
            return Ok(expr);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<FilterExpr> {
        let field = match self.next() {
            Some(Token::Ident(name)) => FieldRef::resolve(&name)?,
            other => {
                return Err(Error::invalid_filter(format!(
                    "expected field name, found {other:?}"
                )))
            }
        };
        match self.next() {
            Some(Token::EqEq) => Ok(FilterExpr::Eq(field, self.parse_literal()?)),
            Some(Token::Ne) => Ok(FilterExpr::Ne(field, self.parse_literal()?)),
            Some(Token::In) => {
                self.expect(Token::LBracket)?;
                let mut items = vec![self.parse_literal()?];
                while self.peek() == Some(&Token::Comma) {
                    self.next();
                    items.push(self.parse_literal()?);
                }
                self.expect(Token::RBracket)?;
                Ok(FilterExpr::In(field, items))
            }
            other => Err(Error::invalid_filter(format!(
                "expected comparison operator, found {other:?}"
            ))),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Literal::Str(s)),
            Some(Token::Int(i)) => Ok(Literal::Int(i)),
            other => Err(Error::invalid_filter(format!(
                "expected literal, found {other:?}"
            ))),
        }
    }
}
