//! 受限表达式求值沙箱
//!
//! 构建清单本质上是字面量数据，这里不嵌入完整脚本引擎，只实现清单实际用到的表达式子集：
//! - 对象/数组/字符串/数字/布尔/`null`/`undefined` 字面量，`void 0`、`!0`、一元 `-`/`+`
//! - 标识符（函数参数或预置的空对象 `self`）与成员访问
//! - `function(a,b){ return <表达式> }` 函数表达式及其调用
//!
//! 没有任何宿主能力（网络、文件、定时器），并限制求值步数、嵌套深度与调用深度。

use std::collections::HashMap;
use std::rc::Rc;
use serde_json::{Map, Number, Value};

use crate::error::{NextrayError, NxResult};

/// 语法嵌套深度上限（含成员访问与调用链长度）
const MAX_NESTING: usize = 64;
/// 函数调用深度上限
const MAX_CALL_DEPTH: usize = 64;

fn parse_err(msg: impl Into<String>) -> NextrayError {
    NextrayError::ManifestParse(msg.into())
}

fn eval_err(msg: impl Into<String>) -> NextrayError {
    NextrayError::ManifestEval(msg.into())
}

// ======== 词法 ========

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Num(f64),
    Punct(char),
    Unknown(char),
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    start: usize,
    end: usize,
}

struct Lexer<'s> {
    src: &'s str,
    pos: usize,
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_alphanumeric()
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.src[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// 跳过空白与注释
    fn skip_trivia(&mut self) -> NxResult<()> {
        loop {
            let rest = &self.src[self.pos..];
            if rest.starts_with("//") {
                self.pos = match rest.find('\n') {
                    Some(idx) => self.pos + idx + 1,
                    None => self.src.len(),
                };
            } else if rest.starts_with("/*") {
                match rest[2..].find("*/") {
                    Some(idx) => self.pos += idx + 4,
                    None => return Err(parse_err("块注释未闭合")),
                }
            } else if let Some(c) = rest.chars().next().filter(|c| c.is_whitespace()) {
                self.pos += c.len_utf8();
            } else {
                return Ok(());
            }
        }
    }

    fn next_token(&mut self) -> NxResult<Token> {
        self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(Token { tok: Tok::Eof, start, end: start });
        };

        let tok = if c == '"' || c == '\'' || c == '`' {
            self.bump();
            Tok::Str(self.lex_string(c)?)
        } else if c.is_ascii_digit() || (c == '.' && self.peek_second().is_some_and(|n| n.is_ascii_digit())) {
            Tok::Num(self.lex_number()?)
        } else if is_ident_start(c) {
            Tok::Ident(self.lex_ident())
        } else {
            self.bump();
            if "{}[](),:;.!-+=".contains(c) {
                Tok::Punct(c)
            } else {
                Tok::Unknown(c)
            }
        };

        Ok(Token { tok, start, end: self.pos })
    }

    fn lex_ident(&mut self) -> String {
        let start = self.pos;
        while self.peek_char().is_some_and(is_ident_part) {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn lex_number(&mut self) -> NxResult<f64> {
        let start = self.pos;
        let rest = &self.src[self.pos..];
        if rest.starts_with("0x") || rest.starts_with("0X") {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.bump();
            }
            let digits = self.src[digits_start..self.pos].replace('_', "");
            return u64::from_str_radix(&digits, 16)
                .map(|n| n as f64)
                .map_err(|_| parse_err(format!("非法十六进制数字：{}", &self.src[start..self.pos])));
        }

        while let Some(c) = self.peek_char() {
            match c {
                '0'..='9' | '.' | '_' => {
                    self.bump();
                }
                'e' | 'E' => {
                    self.bump();
                    if matches!(self.peek_char(), Some('+') | Some('-')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
        let literal = self.src[start..self.pos].replace('_', "");
        literal.parse::<f64>()
            .map_err(|_| parse_err(format!("非法数字：{}", literal)))
    }

    fn lex_hex(&mut self, len: usize) -> NxResult<u32> {
        let start = self.pos;
        for _ in 0..len {
            match self.bump() {
                Some(c) if c.is_ascii_hexdigit() => {}
                _ => return Err(parse_err("非法转义序列")),
            }
        }
        u32::from_str_radix(&self.src[start..self.pos], 16).map_err(|_| parse_err("非法转义序列"))
    }

    fn lex_unicode_escape(&mut self) -> NxResult<u32> {
        if self.peek_char() == Some('{') {
            self.bump();
            let start = self.pos;
            while self.peek_char().is_some_and(|c| c != '}') {
                self.bump();
            }
            let code = u32::from_str_radix(&self.src[start..self.pos], 16)
                .map_err(|_| parse_err("非法 unicode 转义"))?;
            self.bump();
            Ok(code)
        } else {
            self.lex_hex(4)
        }
    }

    fn lex_string(&mut self, quote: char) -> NxResult<String> {
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(parse_err("字符串未闭合"));
            };
            match c {
                c if c == quote => return Ok(out),
                '\n' if quote != '`' => return Err(parse_err("字符串中存在换行")),
                '$' if quote == '`' && self.peek_char() == Some('{') => {
                    return Err(parse_err("不支持模板字符串插值"));
                }
                '\\' => self.lex_escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn lex_escape(&mut self, out: &mut String) -> NxResult<()> {
        let Some(c) = self.bump() else {
            return Err(parse_err("字符串未闭合"));
        };
        match c {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek_char().is_some_and(|n| n.is_ascii_digit()) => out.push('\0'),
            'x' => {
                let code = self.lex_hex(2)?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let code = self.lex_unicode_escape()?;
                if (0xD800..0xDC00).contains(&code) && self.src[self.pos..].starts_with("\\u") {
                    let save = self.pos;
                    self.pos += 2;
                    let low = self.lex_unicode_escape()?;
                    if (0xDC00..0xE000).contains(&low) {
                        let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                        out.push(char::from_u32(combined).unwrap_or('\u{fffd}'));
                        return Ok(());
                    }
                    self.pos = save;
                }
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            // 行延续
            '\r' => {
                if self.peek_char() == Some('\n') {
                    self.bump();
                }
            }
            '\n' => {}
            other => out.push(other),
        }
        Ok(())
    }
}

// ======== 语法 ========

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Function { params: Vec<String>, body: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Member { object: Box<Expr>, property: Box<Expr> },
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Plus(Box<Expr>),
    Void(Box<Expr>),
}

struct Parser<'s> {
    lexer: Lexer<'s>,
    current: Token,
    last_end: usize,
    depth: usize,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str) -> NxResult<Self> {
        let mut lexer = Lexer::new(src);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current, last_end: 0, depth: 0 })
    }

    fn advance(&mut self) -> NxResult<Token> {
        let next = self.lexer.next_token()?;
        let prev = std::mem::replace(&mut self.current, next);
        self.last_end = prev.end;
        Ok(prev)
    }

    fn at_punct(&self, c: char) -> bool {
        self.current.tok == Tok::Punct(c)
    }

    fn eat_punct(&mut self, c: char) -> NxResult<bool> {
        if self.at_punct(c) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_punct(&mut self, c: char) -> NxResult<()> {
        if self.eat_punct(c)? {
            Ok(())
        } else {
            Err(self.unexpected(&format!("期望 '{}'", c)))
        }
    }

    fn at_ident(&self, name: &str) -> bool {
        matches!(&self.current.tok, Tok::Ident(n) if n == name)
    }

    fn unexpected(&self, expectation: &str) -> NextrayError {
        parse_err(format!("{}，位置 {} 处为 {:?}", expectation, self.current.start, self.current.tok))
    }

    fn parse_expression(&mut self) -> NxResult<Expr> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(parse_err("表达式嵌套过深"));
        }
        let expr = self.parse_unary();
        self.depth -= 1;
        expr
    }

    fn parse_unary(&mut self) -> NxResult<Expr> {
        match &self.current.tok {
            Tok::Punct('!') => {
                self.advance()?;
                Ok(Expr::Not(Box::new(self.parse_expression()?)))
            }
            Tok::Punct('-') => {
                self.advance()?;
                Ok(Expr::Neg(Box::new(self.parse_expression()?)))
            }
            Tok::Punct('+') => {
                self.advance()?;
                Ok(Expr::Plus(Box::new(self.parse_expression()?)))
            }
            Tok::Ident(name) if name == "void" => {
                self.advance()?;
                Ok(Expr::Void(Box::new(self.parse_expression()?)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> NxResult<Expr> {
        let mut expr = self.parse_primary()?;
        let base_depth = self.depth;
        let result = self.parse_postfix_chain(&mut expr);
        self.depth = base_depth;
        result.map(|_| expr)
    }

    /// 成员访问与调用链，每一环计入嵌套深度
    fn parse_postfix_chain(&mut self, expr: &mut Expr) -> NxResult<()> {
        loop {
            if !(self.at_punct('.') || self.at_punct('[') || self.at_punct('(')) {
                return Ok(());
            }
            self.depth += 1;
            if self.depth > MAX_NESTING {
                return Err(parse_err("表达式嵌套过深"));
            }
            let object = std::mem::replace(expr, Expr::Undefined);
            if self.eat_punct('.')? {
                let Tok::Ident(name) = self.advance()?.tok else {
                    return Err(parse_err("成员访问缺少属性名"));
                };
                *expr = Expr::Member { object: Box::new(object), property: Box::new(Expr::Str(name)) };
            } else if self.eat_punct('[')? {
                let property = self.parse_expression()?;
                self.expect_punct(']')?;
                *expr = Expr::Member { object: Box::new(object), property: Box::new(property) };
            } else {
                self.expect_punct('(')?;
                let args = self.parse_arguments()?;
                *expr = Expr::Call { callee: Box::new(object), args };
            }
        }
    }

    fn parse_arguments(&mut self) -> NxResult<Vec<Expr>> {
        let mut args = Vec::new();
        loop {
            if self.eat_punct(')')? {
                return Ok(args);
            }
            args.push(self.parse_expression()?);
            if !self.eat_punct(',')? {
                self.expect_punct(')')?;
                return Ok(args);
            }
        }
    }

    fn parse_primary(&mut self) -> NxResult<Expr> {
        let token = self.current.clone();
        match token.tok {
            Tok::Num(n) => {
                self.advance()?;
                Ok(Expr::Num(n))
            }
            Tok::Str(s) => {
                self.advance()?;
                Ok(Expr::Str(s))
            }
            Tok::Ident(name) => {
                if name == "function" {
                    return self.parse_function();
                }
                self.advance()?;
                Ok(match name.as_str() {
                    "true" => Expr::Bool(true),
                    "false" => Expr::Bool(false),
                    "null" => Expr::Null,
                    "undefined" => Expr::Undefined,
                    "NaN" => Expr::Num(f64::NAN),
                    "Infinity" => Expr::Num(f64::INFINITY),
                    _ => Expr::Ident(name),
                })
            }
            Tok::Punct('(') => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect_punct(')')?;
                Ok(expr)
            }
            Tok::Punct('[') => {
                self.advance()?;
                self.parse_array()
            }
            Tok::Punct('{') => {
                self.advance()?;
                self.parse_object()
            }
            _ => Err(self.unexpected("意外的记号")),
        }
    }

    fn parse_array(&mut self) -> NxResult<Expr> {
        let mut items = Vec::new();
        loop {
            if self.eat_punct(']')? {
                return Ok(Expr::Array(items));
            }
            if self.eat_punct(',')? {
                // 空位
                items.push(Expr::Undefined);
                continue;
            }
            items.push(self.parse_expression()?);
            if !self.eat_punct(',')? {
                self.expect_punct(']')?;
                return Ok(Expr::Array(items));
            }
        }
    }

    fn parse_object(&mut self) -> NxResult<Expr> {
        let mut props = Vec::new();
        loop {
            if self.eat_punct('}')? {
                return Ok(Expr::Object(props));
            }
            let (key, shorthand) = match self.advance()?.tok {
                Tok::Ident(name) => (name, true),
                Tok::Str(s) => (s, false),
                Tok::Num(n) => (number_to_string(n), false),
                other => return Err(parse_err(format!("不支持的对象键：{:?}", other))),
            };
            let value = if self.eat_punct(':')? {
                self.parse_expression()?
            } else if shorthand {
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected("对象键后期望 ':'"));
            };
            props.push((key, value));
            if !self.eat_punct(',')? {
                self.expect_punct('}')?;
                return Ok(Expr::Object(props));
            }
        }
    }

    /// `function [name](params) { ["directive";]* return expr; }`
    fn parse_function(&mut self) -> NxResult<Expr> {
        self.advance()?;
        if matches!(self.current.tok, Tok::Ident(_)) {
            self.advance()?;
        }
        self.expect_punct('(')?;
        let mut params = Vec::new();
        loop {
            if self.eat_punct(')')? {
                break;
            }
            match self.advance()?.tok {
                Tok::Ident(name) => params.push(name),
                other => return Err(parse_err(format!("不支持的函数参数：{:?}", other))),
            }
            if !self.eat_punct(',')? {
                self.expect_punct(')')?;
                break;
            }
        }
        self.expect_punct('{')?;

        while let Tok::Str(_) = self.current.tok {
            self.advance()?;
            self.eat_punct(';')?;
        }
        if !self.at_ident("return") {
            return Err(self.unexpected("函数体仅支持单条 return 语句"));
        }
        self.advance()?;
        let body = if self.at_punct('}') || self.at_punct(';') {
            Expr::Undefined
        } else {
            self.parse_expression()?
        };
        self.eat_punct(';')?;
        self.expect_punct('}')?;

        Ok(Expr::Function { params, body: Box::new(body) })
    }
}

/// 从源码开头解析一个完整表达式，返回其结束的字节偏移
pub fn expression_prefix_len(src: &str) -> NxResult<usize> {
    let mut parser = Parser::new(src)?;
    parser.parse_expression()?;
    Ok(parser.last_end)
}

/// 解析整段源码为单个表达式（允许结尾分号）
fn parse_complete(src: &str) -> NxResult<Expr> {
    let mut parser = Parser::new(src)?;
    let expr = parser.parse_expression()?;
    while parser.eat_punct(';')? {}
    if parser.current.tok != Tok::Eof {
        return Err(parser.unexpected("表达式后存在多余内容"));
    }
    Ok(expr)
}

/// 查找顶层赋值号的位置（括号配平，跳过字符串与注释，排除 `==`、`=>`、`<=` 等）
pub fn top_level_assignment(src: &str) -> Option<usize> {
    let mut lexer = Lexer::new(src);
    let mut depth: usize = 0;
    let mut prev: Option<Token> = None;
    loop {
        let token = lexer.next_token().ok()?;
        match token.tok {
            Tok::Eof => return None,
            Tok::Punct('(' | '[' | '{') => depth += 1,
            Tok::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
            Tok::Punct('=') if depth == 0 => {
                let glued_before = prev.as_ref().is_some_and(|p| {
                    p.end == token.start && matches!(p.tok, Tok::Punct('=' | '!' | '+' | '-') | Tok::Unknown(_))
                });
                let glued_after = src[token.end..].starts_with(['=', '>']);
                if !glued_before && !glued_after {
                    return Some(token.start);
                }
            }
            _ => {}
        }
        prev = Some(token);
    }
}

// ======== 求值 ========

#[derive(Debug, Clone)]
enum JsValue<'e> {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(Vec<JsValue<'e>>),
    Object(Vec<(String, JsValue<'e>)>),
    Function(Rc<Closure<'e>>),
}

#[derive(Debug)]
struct Closure<'e> {
    params: &'e [String],
    body: &'e Expr,
    scope: Scope<'e>,
}

type Scope<'e> = HashMap<String, JsValue<'e>>;

impl JsValue<'_> {
    fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "null",
            JsValue::Bool(_) => "boolean",
            JsValue::Num(_) => "number",
            JsValue::Str(_) => "string",
            JsValue::Array(_) => "array",
            JsValue::Object(_) => "object",
            JsValue::Function(_) => "function",
        }
    }

    fn truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Bool(b) => *b,
            JsValue::Num(n) => *n != 0.0 && !n.is_nan(),
            JsValue::Str(s) => !s.is_empty(),
            JsValue::Array(_) | JsValue::Object(_) | JsValue::Function(_) => true,
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            JsValue::Num(n) => *n,
            JsValue::Bool(b) => if *b { 1.0 } else { 0.0 },
            JsValue::Null => 0.0,
            JsValue::Str(s) if s.trim().is_empty() => 0.0,
            JsValue::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }
}

fn number_to_string(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn to_json(value: &JsValue<'_>) -> Value {
    match value {
        JsValue::Undefined | JsValue::Null | JsValue::Function(_) => Value::Null,
        JsValue::Bool(b) => Value::Bool(*b),
        JsValue::Num(n) => number_to_json(*n),
        JsValue::Str(s) => Value::String(s.clone()),
        JsValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        JsValue::Object(entries) => Value::Object(object_to_map(entries)),
    }
}

fn object_to_map(entries: &[(String, JsValue<'_>)]) -> Map<String, Value> {
    entries.iter()
        .map(|(key, value)| (key.clone(), to_json(value)))
        .collect()
}

struct Evaluator {
    steps_left: usize,
    call_depth: usize,
}

impl Evaluator {
    fn tick(&mut self) -> NxResult<()> {
        if self.steps_left == 0 {
            return Err(eval_err("执行预算耗尽"));
        }
        self.steps_left -= 1;
        Ok(())
    }

    fn eval<'e>(&mut self, expr: &'e Expr, scope: &Scope<'e>) -> NxResult<JsValue<'e>> {
        self.tick()?;
        match expr {
            Expr::Undefined => Ok(JsValue::Undefined),
            Expr::Null => Ok(JsValue::Null),
            Expr::Bool(b) => Ok(JsValue::Bool(*b)),
            Expr::Num(n) => Ok(JsValue::Num(*n)),
            Expr::Str(s) => Ok(JsValue::Str(s.clone())),
            Expr::Ident(name) => scope.get(name)
                .cloned()
                .ok_or_else(|| eval_err(format!("{} 未定义", name))),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, scope)?);
                }
                Ok(JsValue::Array(values))
            }
            Expr::Object(props) => {
                let mut entries: Vec<(String, JsValue<'e>)> = Vec::with_capacity(props.len());
                for (key, value) in props {
                    let value = self.eval(value, scope)?;
                    // 重复键以后者为准
                    match entries.iter_mut().find(|(k, _)| k == key) {
                        Some(entry) => entry.1 = value,
                        None => entries.push((key.clone(), value)),
                    }
                }
                Ok(JsValue::Object(entries))
            }
            Expr::Function { params, body } => Ok(JsValue::Function(Rc::new(Closure {
                params,
                body,
                scope: scope.clone(),
            }))),
            Expr::Call { callee, args } => {
                let callee = self.eval(callee, scope)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, scope)?);
                }
                match callee {
                    JsValue::Function(closure) => self.call(&closure, values),
                    other => Err(eval_err(format!("{} 不是可调用的函数", other.type_name()))),
                }
            }
            Expr::Member { object, property } => {
                let object = self.eval(object, scope)?;
                let key = match self.eval(property, scope)? {
                    JsValue::Str(s) => s,
                    JsValue::Num(n) => number_to_string(n),
                    other => return Err(eval_err(format!("不支持的属性键类型：{}", other.type_name()))),
                };
                get_property(object, &key)
            }
            Expr::Not(inner) => Ok(JsValue::Bool(!self.eval(inner, scope)?.truthy())),
            Expr::Neg(inner) => Ok(JsValue::Num(-self.eval(inner, scope)?.to_number())),
            Expr::Plus(inner) => Ok(JsValue::Num(self.eval(inner, scope)?.to_number())),
            Expr::Void(inner) => {
                self.eval(inner, scope)?;
                Ok(JsValue::Undefined)
            }
        }
    }

    fn call<'e>(&mut self, closure: &Closure<'e>, args: Vec<JsValue<'e>>) -> NxResult<JsValue<'e>> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(eval_err("函数调用层级过深"));
        }
        self.call_depth += 1;

        let mut scope = closure.scope.clone();
        let mut args = args.into_iter();
        for param in closure.params {
            scope.insert(param.clone(), args.next().unwrap_or(JsValue::Undefined));
        }
        let result = self.eval(closure.body, &scope);

        self.call_depth -= 1;
        result
    }
}

fn get_property<'e>(object: JsValue<'e>, key: &str) -> NxResult<JsValue<'e>> {
    match object {
        JsValue::Undefined | JsValue::Null => {
            Err(eval_err(format!("无法读取 {} 的属性 '{}'", object.type_name(), key)))
        }
        JsValue::Object(entries) => Ok(entries.into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .unwrap_or(JsValue::Undefined)),
        JsValue::Array(items) => {
            if key == "length" {
                return Ok(JsValue::Num(items.len() as f64));
            }
            Ok(key.parse::<usize>()
                .ok()
                .and_then(|idx| items.into_iter().nth(idx))
                .unwrap_or(JsValue::Undefined))
        }
        JsValue::Str(s) if key == "length" => Ok(JsValue::Num(s.encode_utf16().count() as f64)),
        _ => Ok(JsValue::Undefined),
    }
}

/// 求值沙箱
#[derive(Debug, Clone, Copy)]
pub struct Sandbox {
    step_budget: usize,
}

impl Sandbox {
    pub fn new(step_budget: usize) -> Self {
        Self { step_budget }
    }

    /// 求值表达式，结果转换为 JSON（函数与 undefined 记为 null）
    pub fn evaluate(&self, source: &str) -> NxResult<Value> {
        let expr = parse_complete(source)?;
        let value = self.run(&expr)?;
        Ok(to_json(&value))
    }

    /// 求值表达式，要求结果为对象
    pub fn evaluate_object(&self, source: &str) -> NxResult<Map<String, Value>> {
        let expr = parse_complete(source)?;
        match self.run(&expr)? {
            JsValue::Object(entries) => Ok(object_to_map(&entries)),
            other => Err(NextrayError::ManifestNotObject(other.type_name())),
        }
    }

    fn run<'e>(&self, expr: &'e Expr) -> NxResult<JsValue<'e>> {
        let mut global = Scope::new();
        // 清单脚本会引用 self，预置为空对象
        global.insert("self".to_string(), JsValue::Object(Vec::new()));

        let mut evaluator = Evaluator { steps_left: self.step_budget, call_depth: 0 };
        evaluator.eval(expr, &global)
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(200_000)
    }
}
