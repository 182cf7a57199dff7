//! A small host expression language.
//!
//! `evaluate` runs a single expression and `execute` runs `;`/newline
//! separated statements. Names resolve against locals, then globals, then
//! the host builtins; every call target goes through
//! [`overload_of`](crate::registry::overload_of) first, the way converted
//! code invokes builtins.

use std::cmp::Ordering;

use tracing::trace;

use crate::context::Scope;
use crate::error::BuiltinError;
use crate::registry::{overload_of, Builtin, Callable};
use crate::value::{format_float, CallArgs, Value};

// ── Tokens ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// Statement separator: `;` or a line break.
    Separator,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "{}", n),
            TokenKind::Float(x) => write!(f, "{}", format_float(*x)),
            TokenKind::Str(s) => write!(f, "{}", Value::str(s.clone()).repr()),
            TokenKind::Bytes(b) => write!(f, "{}", Value::Bytes(b.clone())),
            TokenKind::Ident(s) => write!(f, "{}", s),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Assign => write!(f, "'='"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::SlashSlash => write!(f, "'//'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::LtEq => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::GtEq => write!(f, "'>='"),
            TokenKind::Separator => write!(f, "end of statement"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    /// Character offset in the source.
    pos: usize,
}

fn syntax(msg: impl Into<String>) -> BuiltinError {
    BuiltinError::Syntax(msg.into())
}

struct Lexer {
    source: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.pos += 1;
        Some(ch)
    }

    fn tokenize(mut self) -> Result<Vec<Token>, BuiltinError> {
        let mut tokens = Vec::new();
        // Brackets let expressions span lines.
        let mut depth = 0usize;
        while let Some(ch) = self.current() {
            let start = self.pos;
            let kind = match ch {
                ' ' | '\t' | '\r' => {
                    self.advance();
                    continue;
                }
                '#' => {
                    while !matches!(self.current(), None | Some('\n')) {
                        self.advance();
                    }
                    continue;
                }
                '\n' | ';' => {
                    self.advance();
                    if depth > 0 {
                        if ch == ';' {
                            return Err(syntax(format!("unexpected ';' at offset {}", start)));
                        }
                        continue;
                    }
                    TokenKind::Separator
                }
                '0'..='9' => self.read_number()?,
                '.' if matches!(self.peek(), Some(d) if d.is_ascii_digit()) => self.read_number()?,
                '\'' | '"' => TokenKind::Str(self.read_string()?),
                'b' | 'B' if matches!(self.peek(), Some('\'' | '"')) => {
                    self.advance();
                    let text = self.read_string()?;
                    if !text.is_ascii() {
                        return Err(syntax("bytes can only contain ASCII literal characters"));
                    }
                    TokenKind::Bytes(text.into_bytes())
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut ident = String::new();
                    while let Some(c) = self.current() {
                        if c.is_alphanumeric() || c == '_' {
                            ident.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    TokenKind::Ident(ident)
                }
                _ => {
                    self.advance();
                    match (ch, self.current()) {
                        ('(', _) => {
                            depth += 1;
                            TokenKind::LParen
                        }
                        ('[', _) => {
                            depth += 1;
                            TokenKind::LBracket
                        }
                        (')', _) => {
                            depth = depth.saturating_sub(1);
                            TokenKind::RParen
                        }
                        (']', _) => {
                            depth = depth.saturating_sub(1);
                            TokenKind::RBracket
                        }
                        (',', _) => TokenKind::Comma,
                        ('+', _) => TokenKind::Plus,
                        ('-', _) => TokenKind::Minus,
                        ('*', _) => TokenKind::Star,
                        ('%', _) => TokenKind::Percent,
                        ('/', Some('/')) => {
                            self.advance();
                            TokenKind::SlashSlash
                        }
                        ('/', _) => TokenKind::Slash,
                        ('=', Some('=')) => {
                            self.advance();
                            TokenKind::EqEq
                        }
                        ('=', _) => TokenKind::Assign,
                        ('!', Some('=')) => {
                            self.advance();
                            TokenKind::NotEq
                        }
                        ('<', Some('=')) => {
                            self.advance();
                            TokenKind::LtEq
                        }
                        ('<', _) => TokenKind::Lt,
                        ('>', Some('=')) => {
                            self.advance();
                            TokenKind::GtEq
                        }
                        ('>', _) => TokenKind::Gt,
                        _ => {
                            return Err(syntax(format!(
                                "invalid character '{}' at offset {}",
                                ch, start
                            )))
                        }
                    }
                }
            };
            tokens.push(Token { kind, pos: start });
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            pos: self.pos,
        });
        Ok(tokens)
    }

    fn read_number(&mut self) -> Result<TokenKind, BuiltinError> {
        let start = self.pos;
        let mut text = String::new();
        let mut is_float = false;
        while let Some(ch) = self.current() {
            match ch {
                '0'..='9' => text.push(ch),
                '_' => {}
                '.' if !is_float => {
                    is_float = true;
                    text.push(ch);
                }
                'e' | 'E' if matches!(self.peek(), Some(d) if d.is_ascii_digit() || d == '-' || d == '+') => {
                    is_float = true;
                    text.push(ch);
                    self.advance();
                    if let Some(sign @ ('-' | '+')) = self.current() {
                        text.push(sign);
                        self.advance();
                    }
                    continue;
                }
                _ => break,
            }
            self.advance();
        }
        let invalid = || syntax(format!("invalid number literal at offset {}", start));
        if is_float {
            text.parse::<f64>().map(TokenKind::Float).map_err(|_| invalid())
        } else {
            text.parse::<i64>().map(TokenKind::Int).map_err(|_| invalid())
        }
    }

    fn read_string(&mut self) -> Result<String, BuiltinError> {
        let start = self.pos;
        let quote = self.advance().unwrap_or('\'');
        let mut s = String::new();
        loop {
            match self.advance() {
                None | Some('\n') => {
                    return Err(syntax(format!(
                        "unterminated string literal at offset {}",
                        start
                    )))
                }
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('0') => s.push('\0'),
                    Some(c @ ('\\' | '\'' | '"')) => s.push(c),
                    Some(c) => {
                        s.push('\\');
                        s.push(c);
                    }
                    None => {
                        return Err(syntax(format!(
                            "unterminated string literal at offset {}",
                            start
                        )))
                    }
                },
                Some(c) if c == quote => break,
                Some(c) => s.push(c),
            }
        }
        Ok(s)
    }
}

// ── Syntax tree ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    None,
    Bool(bool),
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<(String, Expr)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Stmt {
    Assign(String, Expr),
    Expr(Expr),
}

// ── Parser ──────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, BuiltinError> {
        Ok(Parser {
            tokens: Lexer::new(source).tokenize()?,
            pos: 0,
        })
    }

    fn peek_kind(&self) -> &TokenKind {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)].kind
    }

    fn peek_next_kind(&self) -> &TokenKind {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + 1).min(last)].kind
    }

    fn advance(&mut self) -> Token {
        let last = self.tokens.len() - 1;
        let tok = self.tokens[self.pos.min(last)].clone();
        if self.pos < last {
            self.pos += 1;
        }
        tok
    }

    fn unexpected(&self, expected: &str) -> BuiltinError {
        let last = self.tokens.len() - 1;
        let tok = &self.tokens[self.pos.min(last)];
        syntax(format!(
            "unexpected {} at offset {}; expected {}",
            tok.kind, tok.pos, expected
        ))
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), BuiltinError> {
        if self.peek_kind() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Separator) {
            self.advance();
        }
    }

    fn parse_expression_input(&mut self) -> Result<Expr, BuiltinError> {
        self.skip_separators();
        let expr = self.parse_expr(0)?;
        self.skip_separators();
        self.expect(&TokenKind::Eof)?;
        Ok(expr)
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>, BuiltinError> {
        let mut stmts = Vec::new();
        self.skip_separators();
        while !matches!(self.peek_kind(), TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
            match self.peek_kind() {
                TokenKind::Separator => self.skip_separators(),
                TokenKind::Eof => {}
                _ => return Err(self.unexpected("end of statement")),
            }
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, BuiltinError> {
        if let (TokenKind::Ident(name), TokenKind::Assign) = (self.peek_kind(), self.peek_next_kind()) {
            let name = name.clone();
            if is_keyword(&name) {
                return Err(syntax(format!("cannot assign to {}", name)));
            }
            self.advance();
            self.advance();
            return Ok(Stmt::Assign(name, self.parse_expr(0)?));
        }
        Ok(Stmt::Expr(self.parse_expr(0)?))
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, BuiltinError> {
        let mut lhs = self.parse_prefix()?;
        loop {
            let (op, (l_bp, r_bp)) = match self.peek_kind() {
                TokenKind::EqEq => (BinOp::Eq, (4, 5)),
                TokenKind::NotEq => (BinOp::NotEq, (4, 5)),
                TokenKind::Lt => (BinOp::Lt, (4, 5)),
                TokenKind::LtEq => (BinOp::LtEq, (4, 5)),
                TokenKind::Gt => (BinOp::Gt, (4, 5)),
                TokenKind::GtEq => (BinOp::GtEq, (4, 5)),
                TokenKind::Plus => (BinOp::Add, (10, 11)),
                TokenKind::Minus => (BinOp::Sub, (10, 11)),
                TokenKind::Star => (BinOp::Mul, (12, 13)),
                TokenKind::Slash => (BinOp::Div, (12, 13)),
                TokenKind::SlashSlash => (BinOp::FloorDiv, (12, 13)),
                TokenKind::Percent => (BinOp::Mod, (12, 13)),
                TokenKind::LParen => {
                    if min_bp > 16 {
                        break;
                    }
                    lhs = self.parse_call(lhs)?;
                    continue;
                }
                _ => break,
            };
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(r_bp)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, BuiltinError> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Int(n) => Ok(Expr::Int(n)),
            TokenKind::Float(x) => Ok(Expr::Float(x)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Bytes(b) => Ok(Expr::Bytes(b)),
            TokenKind::Minus => Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_expr(14)?))),
            TokenKind::Plus => Ok(Expr::Unary(UnaryOp::Pos, Box::new(self.parse_expr(14)?))),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "None" => Expr::None,
                "True" => Expr::Bool(true),
                "False" => Expr::Bool(false),
                "not" => Expr::Unary(UnaryOp::Not, Box::new(self.parse_expr(3)?)),
                _ => Expr::Name(name),
            }),
            TokenKind::LParen => {
                if matches!(self.peek_kind(), TokenKind::RParen) {
                    self.advance();
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let first = self.parse_expr(0)?;
                if matches!(self.peek_kind(), TokenKind::RParen) {
                    self.advance();
                    return Ok(first);
                }
                let mut items = vec![first];
                while matches!(self.peek_kind(), TokenKind::Comma) {
                    self.advance();
                    if matches!(self.peek_kind(), TokenKind::RParen) {
                        break;
                    }
                    items.push(self.parse_expr(0)?);
                }
                self.expect(&TokenKind::RParen)?;
                Ok(Expr::Tuple(items))
            }
            TokenKind::LBracket => {
                let mut items = Vec::new();
                while !matches!(self.peek_kind(), TokenKind::RBracket) {
                    items.push(self.parse_expr(0)?);
                    if matches!(self.peek_kind(), TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(Expr::List(items))
            }
            other => Err(syntax(format!(
                "unexpected {} at offset {}; expected expression",
                other, tok.pos
            ))),
        }
    }

    fn parse_call(&mut self, callee: Expr) -> Result<Expr, BuiltinError> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        let mut keywords: Vec<(String, Expr)> = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RParen) {
            if let (TokenKind::Ident(name), TokenKind::Assign) = (self.peek_kind(), self.peek_next_kind()) {
                let name = name.clone();
                self.advance();
                self.advance();
                if keywords.iter().any(|(k, _)| *k == name) {
                    return Err(syntax(format!("keyword argument repeated: {}", name)));
                }
                keywords.push((name, self.parse_expr(0)?));
            } else {
                if !keywords.is_empty() {
                    return Err(syntax("positional argument follows keyword argument"));
                }
                args.push(self.parse_expr(0)?);
            }
            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            keywords,
        })
    }
}

fn is_keyword(name: &str) -> bool {
    matches!(name, "None" | "True" | "False" | "not")
}

// ── Interpreter ─────────────────────────────────────────────────────────

struct Interpreter<'a> {
    globals: &'a Scope,
    locals: &'a Scope,
}

impl Interpreter<'_> {
    fn lookup(&self, name: &str) -> Result<Value, BuiltinError> {
        if let Some(v) = self.locals.get(name) {
            return Ok(v);
        }
        if let Some(v) = self.globals.get(name) {
            return Ok(v);
        }
        Builtin::from_name(name)
            .map(|b| Value::Callable(Callable::Builtin(b)))
            .ok_or_else(|| BuiltinError::Name(name.to_string()))
    }

    fn eval(&self, expr: &Expr) -> Result<Value, BuiltinError> {
        Ok(match expr {
            Expr::Int(n) => Value::Int(*n),
            Expr::Float(x) => Value::Float(*x),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Bytes(b) => Value::Bytes(b.clone()),
            Expr::None => Value::None,
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Name(name) => self.lookup(name)?,
            Expr::List(items) => Value::List(self.eval_all(items)?),
            Expr::Tuple(items) => Value::Tuple(self.eval_all(items)?),
            Expr::Unary(op, operand) => unary(*op, self.eval(operand)?)?,
            Expr::Binary(op, lhs, rhs) => binary(*op, &self.eval(lhs)?, &self.eval(rhs)?)?,
            Expr::Call {
                callee,
                args,
                keywords,
            } => {
                let target = match self.eval(callee)? {
                    Value::Callable(c) => overload_of(c),
                    other => {
                        return Err(BuiltinError::type_error(format!(
                            "'{}' object is not callable",
                            other.type_name()
                        )))
                    }
                };
                let mut call = CallArgs::new(self.eval_all(args)?);
                for (name, value) in keywords {
                    call = call.keyword(name.clone(), self.eval(value)?);
                }
                trace!(callee = %target, "call");
                target.call(&call)?
            }
        })
    }

    fn eval_all(&self, items: &[Expr]) -> Result<Vec<Value>, BuiltinError> {
        items.iter().map(|e| self.eval(e)).collect()
    }
}

fn unary(op: UnaryOp, v: Value) -> Result<Value, BuiltinError> {
    match (op, &v) {
        (UnaryOp::Not, _) => Ok(Value::Bool(!v.is_truthy())),
        (_, Value::Float(x)) => Ok(Value::Float(if op == UnaryOp::Neg { -x } else { *x })),
        (_, Value::Int(_) | Value::Bool(_)) => {
            let n = v.as_index().unwrap_or(0);
            if op == UnaryOp::Pos {
                return Ok(Value::Int(n));
            }
            n.checked_neg()
                .map(Value::Int)
                .ok_or_else(|| BuiltinError::value_error("integer overflow"))
        }
        _ => Err(BuiltinError::type_error(format!(
            "bad operand type for unary {}: '{}'",
            if op == UnaryOp::Neg { "-" } else { "+" },
            v.type_name()
        ))),
    }
}

fn binary(op: BinOp, a: &Value, b: &Value) -> Result<Value, BuiltinError> {
    match op {
        BinOp::Eq => return Ok(Value::Bool(a == b)),
        BinOp::NotEq => return Ok(Value::Bool(a != b)),
        BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => {
            let ord = compare(a, b).ok_or_else(|| {
                BuiltinError::type_error(format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    op.symbol(),
                    a.type_name(),
                    b.type_name()
                ))
            })?;
            let holds = match op {
                BinOp::Lt => ord == Ordering::Less,
                BinOp::LtEq => ord != Ordering::Greater,
                BinOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            return Ok(Value::Bool(holds));
        }
        _ => {}
    }

    let unsupported = || {
        BuiltinError::type_error(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            a.type_name(),
            b.type_name()
        ))
    };
    match (a, b) {
        (Value::Str(x), Value::Str(y)) if op == BinOp::Add => Ok(Value::Str(format!("{}{}", x, y))),
        (Value::List(x), Value::List(y)) if op == BinOp::Add => {
            Ok(Value::List(x.iter().chain(y).cloned().collect()))
        }
        (Value::Tuple(x), Value::Tuple(y)) if op == BinOp::Add => {
            Ok(Value::Tuple(x.iter().chain(y).cloned().collect()))
        }
        (Value::Str(s), n) | (n, Value::Str(s)) if op == BinOp::Mul && n.as_index().is_some() => {
            Ok(Value::Str(s.repeat(n.as_index().unwrap_or(0).max(0) as usize)))
        }
        (Value::List(items), n) | (n, Value::List(items))
            if op == BinOp::Mul && n.as_index().is_some() =>
        {
            let times = n.as_index().unwrap_or(0).max(0) as usize;
            Ok(Value::List(items.iter().cloned().cycle().take(items.len() * times).collect()))
        }
        _ => match (a.as_index(), b.as_index()) {
            (Some(x), Some(y)) => int_arith(op, x, y),
            _ => match (as_f64(a), as_f64(b)) {
                (Some(x), Some(y)) => float_arith(op, x, y),
                _ => Err(unsupported()),
            },
        },
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Float(x) => Some(*x),
        other => other.as_index().map(|n| n as f64),
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Bytes(x), Value::Bytes(y)) => Some(x.cmp(y)),
        _ => match (a.as_index(), b.as_index()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => as_f64(a)?.partial_cmp(&as_f64(b)?),
        },
    }
}

fn int_arith(op: BinOp, x: i64, y: i64) -> Result<Value, BuiltinError> {
    let overflow = || BuiltinError::value_error("integer overflow");
    let zero_div = |what: &str| BuiltinError::value_error(format!("ZeroDivisionError: {}", what));
    let n = match op {
        BinOp::Add => x.checked_add(y).ok_or_else(overflow)?,
        BinOp::Sub => x.checked_sub(y).ok_or_else(overflow)?,
        BinOp::Mul => x.checked_mul(y).ok_or_else(overflow)?,
        BinOp::Div => {
            if y == 0 {
                return Err(zero_div("division by zero"));
            }
            return Ok(Value::Float(x as f64 / y as f64));
        }
        BinOp::FloorDiv => {
            if y == 0 {
                return Err(zero_div("integer division or modulo by zero"));
            }
            let q = x.checked_div(y).ok_or_else(overflow)?;
            if x % y != 0 && ((x < 0) != (y < 0)) {
                q - 1
            } else {
                q
            }
        }
        BinOp::Mod => {
            if y == 0 {
                return Err(zero_div("integer division or modulo by zero"));
            }
            let r = x.checked_rem(y).ok_or_else(overflow)?;
            if r != 0 && ((r < 0) != (y < 0)) {
                r + y
            } else {
                r
            }
        }
        _ => return Err(BuiltinError::type_error(format!("unsupported operator {}", op.symbol()))),
    };
    Ok(Value::Int(n))
}

fn float_arith(op: BinOp, x: f64, y: f64) -> Result<Value, BuiltinError> {
    let zero_div = || BuiltinError::value_error("ZeroDivisionError: float division by zero");
    let v = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod if y == 0.0 => return Err(zero_div()),
        BinOp::Div => x / y,
        BinOp::FloorDiv => (x / y).floor(),
        BinOp::Mod => {
            let r = x % y;
            if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
                r + y
            } else {
                r
            }
        }
        _ => return Err(BuiltinError::type_error(format!("unsupported operator {}", op.symbol()))),
    };
    Ok(Value::Float(v))
}

// ── Entry points ────────────────────────────────────────────────────────

/// Evaluate a single expression.
pub fn evaluate(source: &str, globals: &Scope, locals: &Scope) -> Result<Value, BuiltinError> {
    let expr = Parser::new(source)?.parse_expression_input()?;
    Interpreter { globals, locals }.eval(&expr)
}

/// Execute statements, binding assignments into `locals`.
///
/// Returns the value of a trailing expression statement, else `None`.
pub fn execute(source: &str, globals: &Scope, locals: &Scope) -> Result<Value, BuiltinError> {
    let stmts = Parser::new(source)?.parse_program()?;
    let interp = Interpreter { globals, locals };
    let mut last = Value::None;
    for stmt in &stmts {
        last = match stmt {
            Stmt::Assign(name, expr) => {
                let value = interp.eval(expr)?;
                locals.set(name.clone(), value);
                Value::None
            }
            Stmt::Expr(expr) => interp.eval(expr)?,
        };
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Result<Value, BuiltinError> {
        evaluate(source, &Scope::new(), &Scope::new())
    }

    #[test]
    fn arithmetic_follows_host_rules() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Int(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Value::Int(9));
        assert_eq!(eval("7 // -2").unwrap(), Value::Int(-4));
        assert_eq!(eval("-7 % 3").unwrap(), Value::Int(2));
        assert_eq!(eval("1 / 2").unwrap(), Value::Float(0.5));
        assert_eq!(eval("2 * 1.5").unwrap(), Value::Float(3.0));
        assert_eq!(eval("'ab' + 'c'").unwrap(), Value::str("abc"));
        assert_eq!(eval("-(3)").unwrap(), Value::Int(-3));
        assert!(eval("1 // 0").is_err());
    }

    #[test]
    fn comparisons_and_literals() {
        assert_eq!(eval("1 < 2").unwrap(), Value::Bool(true));
        assert_eq!(eval("'a' >= 'b'").unwrap(), Value::Bool(false));
        assert_eq!(eval("[1, 2] == [1, 2]").unwrap(), Value::Bool(true));
        assert_eq!(eval("not None").unwrap(), Value::Bool(true));
        assert_eq!(eval("(1,)").unwrap(), Value::Tuple(vec![Value::Int(1)]));
        assert_eq!(eval("b'hi'").unwrap(), Value::Bytes(b"hi".to_vec()));
        assert_eq!(eval("1e3").unwrap(), Value::Float(1000.0));
    }

    #[test]
    fn calls_go_through_overloads() {
        assert_eq!(eval("abs(-4)").unwrap(), Value::Int(4));
        assert_eq!(eval("len('abc')").unwrap(), Value::Int(3));
        assert_eq!(eval("int('ff', base=16)").unwrap(), Value::Int(255));
        assert_eq!(eval("len(range(2, 10, 3))").unwrap(), Value::Int(3));
        assert_eq!(eval("len(xrange(4))").unwrap(), Value::Int(4));
        assert_eq!(
            eval("enumerate(['a'], start=5)").unwrap(),
            Value::List(vec![Value::Tuple(vec![Value::Int(5), Value::str("a")])])
        );
    }

    #[test]
    fn name_resolution_order() {
        let globals: Scope = [("x", Value::Int(1)), ("y", Value::Int(2))].into_iter().collect();
        let locals: Scope = [("x", Value::Int(10))].into_iter().collect();
        assert_eq!(evaluate("x + y", &globals, &locals).unwrap(), Value::Int(12));
        let err = evaluate("z", &globals, &locals).unwrap_err();
        assert_eq!(err.to_string(), "NameError: name 'z' is not defined");
    }

    #[test]
    fn locals_can_shadow_builtins() {
        let locals: Scope = [("len", Value::Int(3))].into_iter().collect();
        let err = evaluate("len('a')", &Scope::new(), &locals).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: 'int' object is not callable");
    }

    #[test]
    fn execute_binds_locals() {
        let locals = Scope::new();
        let out = execute("a = 2; b = a * 3\nb + 1", &Scope::new(), &locals).unwrap();
        assert_eq!(out, Value::Int(7));
        assert_eq!(locals.get("a"), Some(Value::Int(2)));
        assert_eq!(execute("c = 1", &Scope::new(), &locals).unwrap(), Value::None);
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(eval("1 +"), Err(BuiltinError::Syntax(_))));
        assert!(matches!(eval("f(a=1, 2)"), Err(BuiltinError::Syntax(_))));
        assert!(matches!(eval("'open"), Err(BuiltinError::Syntax(_))));
        assert!(matches!(eval("1 2"), Err(BuiltinError::Syntax(_))));
        assert!(matches!(eval("x = 1"), Err(BuiltinError::Syntax(_))));
    }
}
