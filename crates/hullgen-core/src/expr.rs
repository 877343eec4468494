//! 规则表达式语言
//!
//! 规则的期望值由外部配置的表达式字符串计算。表达式只能使用：
//! - 数字、字符串、`true` / `false`（也接受 `True` / `False`）字面量
//! - 算术 `+ - * / %`、一元 `-`
//! - 比较 `< <= > >= == !=`，逻辑 `and or not`
//! - 白名单函数 `max` `min` `abs` `float` `int`
//! - 上下文中的变量名
//!
//! 没有属性访问、导入或任何副作用；解析为语法树后只针对上下文映射求值。
//!
//! # 示例
//!
//! ```rust
//! use hullgen_core::expr::{Context, Expression, Value};
//!
//! let mut context = Context::new();
//! context.insert("lbp".into(), Value::Float(96.0));
//!
//! let expr = Expression::parse("max(lbp * 0.5, 40)").unwrap();
//! assert_eq!(expr.evaluate(&context).unwrap(), Value::Float(48.0));
//! ```

use crate::error::RuleError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 表达式源码最大长度
pub const MAX_EXPRESSION_LEN: usize = 4096;

/// 最大嵌套深度
pub const MAX_DEPTH: usize = 64;

/// 求值上下文：参数名到值
pub type Context = BTreeMap<String, Value>;

/// 表达式值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// 从 JSON 值转换；null、数组和对象没有对应的值
    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float)),
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
        }
    }

    /// 转为浮点数，用于数值比较
    pub fn to_f64(&self) -> Result<f64, RuleError> {
        match self {
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| RuleError::NotNumeric(s.clone())),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(*b as i64)),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            Value::Text(_) => None,
        }
    }
}

/// 文本形式，用于 `==` / `!=` 比较。整数值的浮点数保留一位小数以区分类型，
/// 布尔值写作 `True` / `False`，与已有规则库中的写法一致。
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{:.1}", x)
            }
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

// ---------------------------------------------------------------------------
// 词法分析
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    source: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            source,
        }
    }

    fn tokenize(mut self) -> Result<Vec<(usize, Token)>, RuleError> {
        let mut tokens = Vec::new();
        while let Some(&(pos, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                continue;
            }

            let token = match c {
                '0'..='9' => self.number(pos)?,
                '.' => {
                    let next = self.source[pos + 1..].chars().next();
                    if next.is_some_and(|n| n.is_ascii_digit()) {
                        self.number(pos)?
                    } else {
                        return Err(syntax(pos, "attribute access is not allowed"));
                    }
                }
                '\'' | '"' => self.string(pos, c)?,
                c if c.is_alphabetic() || c == '_' => self.ident(),
                _ => {
                    self.chars.next();
                    self.operator(pos, c)?
                }
            };
            tokens.push((pos, token));
        }
        Ok(tokens)
    }

    fn number(&mut self, start: usize) -> Result<Token, RuleError> {
        let mut end = start;
        let mut is_float = false;
        let mut seen_exp = false;
        while let Some(&(pos, c)) = self.chars.peek() {
            let accept = match c {
                '0'..='9' => true,
                '.' if !is_float && !seen_exp => {
                    is_float = true;
                    true
                }
                'e' | 'E' if !seen_exp => {
                    seen_exp = true;
                    is_float = true;
                    true
                }
                '+' | '-' => matches!(self.source[..pos].chars().last(), Some('e' | 'E')),
                _ => false,
            };
            if !accept {
                break;
            }
            end = pos + c.len_utf8();
            self.chars.next();
        }

        let text = &self.source[start..end];
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| syntax(start, format!("invalid number `{}`", text)))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| syntax(start, format!("integer out of range `{}`", text)))
        }
    }

    fn string(&mut self, start: usize, quote: char) -> Result<Token, RuleError> {
        self.chars.next();
        let mut value = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                c if c == quote => return Ok(Token::Str(value)),
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c => value.push(c),
            }
        }
        Err(syntax(start, "unterminated string literal"))
    }

    fn ident(&mut self) -> Token {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        Token::Ident(name)
    }

    fn eat_eq(&mut self) -> bool {
        if matches!(self.chars.peek(), Some(&(_, '='))) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn operator(&mut self, pos: usize, c: char) -> Result<Token, RuleError> {
        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '<' if self.eat_eq() => Token::Le,
            '<' => Token::Lt,
            '>' if self.eat_eq() => Token::Ge,
            '>' => Token::Gt,
            '=' if self.eat_eq() => Token::EqEq,
            '!' if self.eat_eq() => Token::Ne,
            _ => return Err(syntax(pos, format!("unexpected character `{}`", c))),
        };
        Ok(token)
    }
}

fn syntax(position: usize, message: impl Into<String>) -> RuleError {
    RuleError::Syntax {
        position,
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// 语法树
// ---------------------------------------------------------------------------

/// 白名单函数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Max,
    Min,
    Abs,
    Float,
    Int,
}

impl Function {
    pub fn lookup(name: &str) -> Option<Function> {
        match name {
            "max" => Some(Function::Max),
            "min" => Some(Function::Min),
            "abs" => Some(Function::Abs),
            "float" => Some(Function::Float),
            "int" => Some(Function::Int),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Max => "max",
            Function::Min => "min",
            Function::Abs => "abs",
            Function::Float => "float",
            Function::Int => "int",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Name(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

// ---------------------------------------------------------------------------
// 递归下降解析
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<(usize, Token)>,
    position: usize,
    depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.position)
            .map(|(pos, _)| *pos)
            .unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).map(|(_, t)| t.clone());
        self.position += 1;
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(name)) if name == keyword) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), RuleError> {
        if self.peek() == Some(&expected) {
            self.position += 1;
            Ok(())
        } else {
            Err(syntax(self.offset(), format!("expected {}", what)))
        }
    }

    fn enter(&mut self) -> Result<(), RuleError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(RuleError::TooComplex(format!(
                "nesting deeper than {}",
                MAX_DEPTH
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_expr(&mut self) -> Result<Expr, RuleError> {
        self.enter()?;
        let expr = self.parse_or();
        self.leave();
        expr
    }

    fn parse_or(&mut self) -> Result<Expr, RuleError> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("or") {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, RuleError> {
        let mut lhs = self.parse_not()?;
        while self.eat_keyword("and") {
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, RuleError> {
        if self.eat_keyword("not") {
            self.enter()?;
            let inner = self.parse_not();
            self.leave();
            return Ok(Expr::Not(Box::new(inner?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, RuleError> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            Some(Token::EqEq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            _ => return Ok(lhs),
        };
        self.position += 1;
        let rhs = self.parse_additive()?;

        if matches!(
            self.peek(),
            Some(Token::Lt | Token::Le | Token::Gt | Token::Ge | Token::EqEq | Token::Ne)
        ) {
            return Err(syntax(self.offset(), "chained comparisons are not supported"));
        }
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_additive(&mut self) -> Result<Expr, RuleError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.position += 1;
            let rhs = self.parse_term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_term(&mut self) -> Result<Expr, RuleError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.position += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, RuleError> {
        match self.peek() {
            Some(Token::Minus) | Some(Token::Plus) => {
                let negate = self.advance() == Some(Token::Minus);
                self.enter()?;
                let inner = self.parse_unary();
                self.leave();
                let inner = inner?;
                Ok(if negate { Expr::Neg(Box::new(inner)) } else { inner })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, RuleError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Text(s))),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "true" | "True" => Ok(Expr::Literal(Value::Bool(true))),
                "false" | "False" => Ok(Expr::Literal(Value::Bool(false))),
                "and" | "or" | "not" => Err(syntax(offset, format!("unexpected `{}`", name))),
                _ if self.peek() == Some(&Token::LParen) => self.parse_call(name),
                _ => Ok(Expr::Name(name)),
            },
            Some(token) => Err(syntax(offset, format!("unexpected token {:?}", token))),
            None => Err(syntax(offset, "unexpected end of expression")),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Expr, RuleError> {
        let function = Function::lookup(&name).ok_or(RuleError::UnknownFunction(name))?;
        self.expect(Token::LParen, "`(`")?;

        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.peek() == Some(&Token::Comma) {
                    self.position += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "`)` after arguments")?;
        Ok(Expr::Call(function, args))
    }
}

// ---------------------------------------------------------------------------
// 求值
// ---------------------------------------------------------------------------

/// 已解析的表达式
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, RuleError> {
        if source.len() > MAX_EXPRESSION_LEN {
            return Err(RuleError::TooComplex(format!(
                "expression longer than {} bytes",
                MAX_EXPRESSION_LEN
            )));
        }

        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Parser {
            tokens,
            position: 0,
            depth: 0,
            end: source.len(),
        };
        let root = parser.parse_expr()?;
        if parser.peek().is_some() {
            return Err(syntax(parser.offset(), "unexpected trailing input"));
        }

        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 针对上下文求值
    pub fn evaluate(&self, context: &Context) -> Result<Value, RuleError> {
        eval(&self.root, context)
    }
}

impl FromStr for Expression {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

/// 解析并立即求值
pub fn evaluate(source: &str, context: &Context) -> Result<Value, RuleError> {
    Expression::parse(source)?.evaluate(context)
}

fn eval(expr: &Expr, context: &Context) -> Result<Value, RuleError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => context
            .get(name)
            .cloned()
            .ok_or_else(|| RuleError::UnknownName(name.clone())),
        Expr::Neg(inner) => match eval(inner, context)?.as_number() {
            Some(Number::Int(i)) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| RuleError::Type("integer overflow".into())),
            Some(Number::Float(f)) => Ok(Value::Float(-f)),
            None => Err(RuleError::Type("cannot negate text".into())),
        },
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, context)?.is_truthy())),
        Expr::And(lhs, rhs) => {
            let left = eval(lhs, context)?;
            if left.is_truthy() {
                eval(rhs, context)
            } else {
                Ok(left)
            }
        }
        Expr::Or(lhs, rhs) => {
            let left = eval(lhs, context)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                eval(rhs, context)
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let left = eval(lhs, context)?;
            let right = eval(rhs, context)?;
            binary(*op, &left, &right)
        }
        Expr::Call(function, args) => {
            let values = args
                .iter()
                .map(|arg| eval(arg, context))
                .collect::<Result<Vec<_>, _>>()?;
            call(*function, values)
        }
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuleError> {
    match op {
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(left, right)?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(left, right))),
        _ => arithmetic(op, left, right),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuleError> {
    if let (BinaryOp::Add, Value::Text(a), Value::Text(b)) = (op, left, right) {
        return Ok(Value::Text(format!("{}{}", a, b)));
    }

    let (a, b) = match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(RuleError::Type(format!(
                "unsupported operand types {} and {}",
                left.type_name(),
                right.type_name()
            )))
        }
    };

    let overflow = || RuleError::Type("integer overflow".into());

    match (a, b) {
        (Number::Int(a), Number::Int(b)) => match op {
            BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Div => {
                if b == 0 {
                    return Err(RuleError::DivisionByZero);
                }
                Ok(Value::Float(a as f64 / b as f64))
            }
            _ => {
                if b == 0 {
                    return Err(RuleError::DivisionByZero);
                }
                // 余数符号跟随除数
                let r = a.checked_rem(b).ok_or_else(overflow)?;
                Ok(Value::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
            }
        },
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            let value = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err(RuleError::DivisionByZero);
                    }
                    a / b
                }
                _ => {
                    if b == 0.0 {
                        return Err(RuleError::DivisionByZero);
                    }
                    let r = a % b;
                    if r != 0.0 && (r < 0.0) != (b < 0.0) {
                        r + b
                    } else {
                        r
                    }
                }
            };
            Ok(Value::Float(value))
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Text(a), Value::Text(b)) => a == b,
        (Value::Text(_), _) | (_, Value::Text(_)) => false,
        _ => matches!(compare(left, right), Ok(Ordering::Equal)),
    }
}

fn compare(left: &Value, right: &Value) -> Result<Ordering, RuleError> {
    match (left, right) {
        (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
        _ => match (left.as_number(), right.as_number()) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => Ok(a.cmp(&b)),
            (Some(a), Some(b)) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .ok_or_else(|| RuleError::Type("cannot order NaN".into())),
            _ => Err(RuleError::Type(format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn call(function: Function, args: Vec<Value>) -> Result<Value, RuleError> {
    match function {
        Function::Max | Function::Min => {
            let mut iter = args.into_iter();
            let mut best = iter.next().ok_or(RuleError::Arity {
                function: function.name(),
                expected: "at least 1",
                found: 0,
            })?;
            for value in iter {
                let ordering = compare(&value, &best)?;
                let replace = match function {
                    Function::Max => ordering == Ordering::Greater,
                    _ => ordering == Ordering::Less,
                };
                if replace {
                    best = value;
                }
            }
            Ok(best)
        }
        Function::Abs | Function::Float | Function::Int => {
            let value = single_arg(function, args)?;
            match function {
                Function::Abs => match value.as_number() {
                    Some(Number::Int(i)) => i
                        .checked_abs()
                        .map(Value::Int)
                        .ok_or_else(|| RuleError::Type("integer overflow".into())),
                    Some(Number::Float(f)) => Ok(Value::Float(f.abs())),
                    None => Err(RuleError::Type("abs() of text".into())),
                },
                Function::Float => value.to_f64().map(Value::Float),
                _ => to_int(&value),
            }
        }
    }
}

fn single_arg(function: Function, args: Vec<Value>) -> Result<Value, RuleError> {
    let found = args.len();
    let mut iter = args.into_iter();
    match (iter.next(), iter.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(RuleError::Arity {
            function: function.name(),
            expected: "exactly 1",
            found,
        }),
    }
}

/// 向零截断
fn to_int(value: &Value) -> Result<Value, RuleError> {
    match value {
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) => {
            let truncated = f.trunc();
            if !truncated.is_finite() || truncated.abs() >= 9.2e18 {
                return Err(RuleError::Type(format!("cannot convert {} to int", f)));
            }
            Ok(Value::Int(truncated as i64))
        }
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| RuleError::NotNumeric(s.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        let mut ctx = Context::new();
        ctx.insert("loa".into(), Value::Float(120.0));
        ctx.insert("lbp".into(), Value::Float(112.0));
        ctx.insert("frames".into(), Value::Int(7));
        ctx.insert("vessel_type".into(), Value::Text("bulk".into()));
        ctx.insert("bulbous_bow".into(), Value::Bool(true));
        ctx
    }

    fn eval_str(source: &str) -> Result<Value, RuleError> {
        evaluate(source, &context())
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval_str("1 + 2 * 3").unwrap(), Value::Int(7));
        assert_eq!(eval_str("(1 + 2) * 3").unwrap(), Value::Int(9));
        assert_eq!(eval_str("-2 * -3").unwrap(), Value::Int(6));
        assert_eq!(eval_str("7 / 2").unwrap(), Value::Float(3.5));
        assert_eq!(eval_str("1.5e2 - 50").unwrap(), Value::Float(100.0));
        assert_eq!(eval_str(".5 + .25").unwrap(), Value::Float(0.75));
    }

    #[test]
    fn test_modulo_follows_divisor_sign() {
        assert_eq!(eval_str("-7 % 3").unwrap(), Value::Int(2));
        assert_eq!(eval_str("7 % -3").unwrap(), Value::Int(-2));
        assert_eq!(eval_str("7.5 % 2").unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_variables_and_functions() {
        assert_eq!(eval_str("lbp * 0.5").unwrap(), Value::Float(56.0));
        assert_eq!(eval_str("max(loa, 200)").unwrap(), Value::Int(200));
        assert_eq!(eval_str("min(loa, lbp, 150)").unwrap(), Value::Float(112.0));
        assert_eq!(eval_str("abs(lbp - loa)").unwrap(), Value::Float(8.0));
        assert_eq!(eval_str("int(lbp / 10)").unwrap(), Value::Int(11));
        assert_eq!(eval_str("int(-2.7)").unwrap(), Value::Int(-2));
        assert_eq!(eval_str("float(frames)").unwrap(), Value::Float(7.0));
        assert_eq!(eval_str("float('2.5')").unwrap(), Value::Float(2.5));
        assert_eq!(eval_str("int(\"42\")").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval_str("loa >= lbp").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("frames == 7.0").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("vessel_type == 'bulk'").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("vessel_type != 7").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("bulbous_bow and loa > 100").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("not bulbous_bow or false").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("0 or 5").unwrap(), Value::Int(5));
    }

    #[test]
    fn test_capitalized_bool_literals() {
        assert_eq!(eval_str("True").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("bulbous_bow == True").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("False or bulbous_bow").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("not True").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_short_circuit_skips_unknown_names() {
        assert_eq!(eval_str("false and missing").unwrap(), Value::Bool(false));
        assert!(matches!(
            eval_str("true and missing"),
            Err(RuleError::UnknownName(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_rejects_unlisted_functions() {
        assert!(matches!(
            eval_str("open('/etc/passwd')"),
            Err(RuleError::UnknownFunction(name)) if name == "open"
        ));
        assert!(matches!(
            eval_str("__import__('os')"),
            Err(RuleError::UnknownFunction(_))
        ));
        // 变量不能被调用
        assert!(matches!(eval_str("loa(1)"), Err(RuleError::UnknownFunction(_))));
    }

    #[test]
    fn test_rejects_attribute_access() {
        assert!(matches!(
            eval_str("vessel_type.upper()"),
            Err(RuleError::Syntax { .. })
        ));
        assert!(matches!(eval_str("loa.__class__"), Err(RuleError::Syntax { .. })));
    }

    #[test]
    fn test_syntax_errors() {
        for source in ["", "1 +", "(1 + 2", "1 2", "max(1,", "a = 1", "'open", "1 < 2 < 3", "[1]"] {
            assert!(
                matches!(eval_str(source), Err(RuleError::Syntax { .. })),
                "expected syntax error for {:?}",
                source
            );
        }
    }

    #[test]
    fn test_runtime_errors() {
        assert_eq!(eval_str("loa / 0"), Err(RuleError::DivisionByZero));
        assert_eq!(eval_str("5 % 0"), Err(RuleError::DivisionByZero));
        assert!(matches!(eval_str("vessel_type * 2"), Err(RuleError::Type(_))));
        assert!(matches!(eval_str("vessel_type < 2"), Err(RuleError::Type(_))));
        assert!(matches!(eval_str("float('abc')"), Err(RuleError::NotNumeric(_))));
        assert!(matches!(eval_str("max()"), Err(RuleError::Arity { .. })));
        assert!(matches!(eval_str("abs(1, 2)"), Err(RuleError::Arity { .. })));
        assert!(matches!(eval_str("9223372036854775807 + 1"), Err(RuleError::Type(_))));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(eval_str(&deep), Err(RuleError::TooComplex(_))));

        let long = "1+".repeat(MAX_EXPRESSION_LEN) + "1";
        assert!(matches!(eval_str(&long), Err(RuleError::TooComplex(_))));
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(Value::Float(40.0).to_string(), "40.0");
        assert_eq!(Value::Float(0.1).to_string(), "0.1");
        assert_eq!(Value::Int(40).to_string(), "40");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Bool(false).to_string(), "False");
        assert_eq!(Value::Text("bulk".into()).to_string(), "bulk");
    }

    #[test]
    fn test_value_from_json() {
        let json = serde_json::json!({"a": 3, "b": 2.5, "c": "x", "d": null});
        assert_eq!(Value::from_json(&json["a"]), Some(Value::Int(3)));
        assert_eq!(Value::from_json(&json["b"]), Some(Value::Float(2.5)));
        assert_eq!(Value::from_json(&json["c"]), Some(Value::Text("x".into())));
        assert_eq!(Value::from_json(&json["d"]), None);
    }

    #[test]
    fn test_parsed_expression_is_reusable() {
        let expr: Expression = "lbp * 0.9".parse().unwrap();
        assert_eq!(expr.source(), "lbp * 0.9");
        let mut ctx = Context::new();
        ctx.insert("lbp".into(), Value::Int(100));
        assert_eq!(expr.evaluate(&ctx).unwrap(), Value::Float(90.0));
        assert_eq!(expr.evaluate(&context()).unwrap(), Value::Float(112.0 * 0.9));
    }
}
