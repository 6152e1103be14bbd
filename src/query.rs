//! A small boolean query language evaluated against JSON documents.
//!
//! Expressions look like `name = 'John'` or `age >= 21 and (role = 'admin' or
//! role = 'staff')`. Field names may use dotted paths (`user.name`) and are
//! resolved against the document; a comparison against an array field matches
//! if any element compares true, which makes the same expression work for URL
//! query parameters (always rendered as arrays of values) and for JSON bodies.
//!
//! A malformed expression is a configuration defect, not a routing miss: it is
//! reported as a [`QueryError`] value and the engine surfaces it as a 500.

use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, thiserror::Error)]
#[error("invalid query expression '{expr}': {reason}")]
pub(crate) struct QueryError {
    expr: String,
    reason: String,
}

/// Evaluate `expr` against `document`.
///
/// An array document matches if any of its elements does.
pub(crate) fn matches(expr: &str, document: &Value) -> Result<bool, QueryError> {
    let parsed = parse(expr)?;
    Ok(match document {
        Value::Array(items) => items.iter().any(|item| eval(&parsed, item)),
        other => eval(&parsed, other),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn check(self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
        }
    }

    fn check_numbers(self, left: f64, right: f64) -> bool {
        left.partial_cmp(&right)
            .map(|ordering| self.check(ordering))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

#[derive(Debug)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Cmp {
        path: Vec<String>,
        op: CmpOp,
        value: Literal,
    },
}

fn eval(expr: &Expr, document: &Value) -> bool {
    match expr {
        Expr::Or(left, right) => eval(left, document) || eval(right, document),
        Expr::And(left, right) => eval(left, document) && eval(right, document),
        Expr::Cmp { path, op, value } => match lookup(document, path) {
            Some(field) => compare(field, *op, value),
            // A missing field never satisfies a comparison.
            None => false,
        },
    }
}

fn lookup<'a>(document: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = document;
    for segment in path {
        current = current.get(segment)?;
    }
    Some(current)
}

fn compare(field: &Value, op: CmpOp, literal: &Literal) -> bool {
    if let Value::Array(items) = field {
        return items.iter().any(|item| compare(item, op, literal));
    }
    match (field, literal) {
        (Value::String(field), Literal::Str(literal)) => {
            op.check(field.as_str().cmp(literal.as_str()))
        }
        (Value::Number(field), Literal::Num(literal)) => field
            .as_f64()
            .map(|field| op.check_numbers(field, *literal))
            .unwrap_or(false),
        // URL query parameter values are always strings. Compare them
        // numerically when the expression uses a number literal.
        (Value::String(field), Literal::Num(literal)) => field
            .parse::<f64>()
            .map(|field| op.check_numbers(field, *literal))
            .unwrap_or(false),
        (Value::Number(field), Literal::Str(literal)) => literal
            .parse::<f64>()
            .ok()
            .zip(field.as_f64())
            .map(|(literal, field)| op.check_numbers(field, literal))
            .unwrap_or(false),
        (Value::Bool(field), Literal::Bool(literal)) => match op {
            CmpOp::Eq => field == literal,
            CmpOp::Ne => field != literal,
            _ => false,
        },
        (Value::Null, Literal::Null) => matches!(op, CmpOp::Eq),
        (_, Literal::Null) => matches!(op, CmpOp::Ne),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(Literal),
    Op(CmpOp),
    And,
    Or,
    LParen,
    RParen,
}

fn error(expr: &str, reason: impl Into<String>) -> QueryError {
    QueryError {
        expr: expr.to_string(),
        reason: reason.into(),
    }
}

fn lex(expr: &str) -> Result<Vec<Token>, QueryError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => return Err(error(expr, "unterminated string literal")),
                    }
                }
                tokens.push(Token::Literal(Literal::Str(value)));
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                }
                tokens.push(Token::Op(CmpOp::Eq));
            }
            '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err(error(expr, "expected '=' after '!'"));
                }
                tokens.push(Token::Op(CmpOp::Ne));
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Op(CmpOp::Le));
                    }
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::Op(CmpOp::Ne));
                    }
                    _ => tokens.push(Token::Op(CmpOp::Lt)),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(CmpOp::Ge));
                } else {
                    tokens.push(Token::Op(CmpOp::Gt));
                }
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut number = String::new();
                number.push(c);
                chars.next();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        number.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = number
                    .parse::<f64>()
                    .map_err(|_| error(expr, format!("invalid number '{number}'")))?;
                tokens.push(Token::Literal(Literal::Num(value)));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' || c == '-' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.to_ascii_lowercase().as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "true" => tokens.push(Token::Literal(Literal::Bool(true))),
                    "false" => tokens.push(Token::Literal(Literal::Bool(false))),
                    "null" => tokens.push(Token::Literal(Literal::Null)),
                    _ => tokens.push(Token::Ident(word)),
                }
            }
            c => return Err(error(expr, format!("unexpected character '{c}'"))),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    expr: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn or_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.unit()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let right = self.unit()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unit(&mut self) -> Result<Expr, QueryError> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(error(self.expr, "expected ')'")),
                }
            }
            Some(Token::Ident(name)) => {
                let op = match self.next() {
                    Some(Token::Op(op)) => op,
                    _ => {
                        return Err(error(
                            self.expr,
                            format!("expected a comparison operator after '{name}'"),
                        ))
                    }
                };
                let value = match self.next() {
                    Some(Token::Literal(literal)) => literal,
                    _ => return Err(error(self.expr, "expected a literal value")),
                };
                Ok(Expr::Cmp {
                    path: name.split('.').map(str::to_string).collect(),
                    op,
                    value,
                })
            }
            _ => Err(error(self.expr, "expected a field comparison")),
        }
    }
}

fn parse(expr: &str) -> Result<Expr, QueryError> {
    let tokens = lex(expr)?;
    let mut parser = Parser {
        expr,
        tokens,
        position: 0,
    };
    let parsed = parser.or_expr()?;
    if parser.peek().is_some() {
        return Err(error(expr, "trailing tokens after expression"));
    }
    Ok(parsed)
}
