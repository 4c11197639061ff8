//! Recursive-descent parser producing the query AST.
//!
//! Precedence, loosest first: `|`, `,`, `//` (right-assoc), `or`, `and`, comparisons
//! (non-associative), `+ -`, `* / %`, unary `-`, postfix (`.name`, `[...]`, `?`).
//!
//! Both the parser's descent and the height of the finished tree are capped at
//! [`MAX_DEPTH`], so neither parsing nor evaluation can exhaust the stack.

use super::lexer::{tokenize, Token};
use serde_json::{Number, Value};
use state_error::{StateError, StateResult};

/// Deepest nesting accepted, counted both in parser descent and in AST height.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Piece of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum StrPart {
    Lit(String),
    Expr(Ast),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Identity,
    RecurseAll,
    Field(Box<Ast>, String),
    Index(Box<Ast>, Box<Ast>),
    Slice(Box<Ast>, Option<Box<Ast>>, Option<Box<Ast>>),
    Iterate(Box<Ast>),
    Optional(Box<Ast>),
    Literal(Value),
    Array(Option<Box<Ast>>),
    Object(Vec<(Ast, Ast)>),
    Format(Vec<StrPart>),
    Pipe(Box<Ast>, Box<Ast>),
    Comma(Vec<Ast>),
    Alt(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
    And(Box<Ast>, Box<Ast>),
    Compare(CmpOp, Box<Ast>, Box<Ast>),
    Arith(ArithOp, Box<Ast>, Box<Ast>),
    Neg(Box<Ast>),
    If(Box<Ast>, Box<Ast>, Option<Box<Ast>>),
    Call(Builtin, Vec<Ast>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Empty,
    Error,
    Not,
    Length,
    Keys,
    Type,
    ToString,
    ToJson,
    FromJson,
    ToNumber,
    ToEntries,
    FromEntries,
    WithEntries,
    Add,
    Any,
    All,
    First,
    Last,
    Reverse,
    Sort,
    Unique,
    Min,
    Max,
    AsciiDowncase,
    AsciiUpcase,
    Select,
    Map,
    Has,
    Join,
    Split,
    Test,
    StartsWith,
    EndsWith,
    LtrimStr,
    RtrimStr,
}

impl Builtin {
    fn lookup(name: &str, arity: usize) -> Option<Builtin> {
        let builtin = match (name, arity) {
            ("empty", 0) => Builtin::Empty,
            ("error", 0 | 1) => Builtin::Error,
            ("not", 0) => Builtin::Not,
            ("length", 0) => Builtin::Length,
            ("keys", 0) => Builtin::Keys,
            ("type", 0) => Builtin::Type,
            ("tostring", 0) => Builtin::ToString,
            ("tojson", 0) => Builtin::ToJson,
            ("fromjson", 0) => Builtin::FromJson,
            ("tonumber", 0) => Builtin::ToNumber,
            ("to_entries", 0) => Builtin::ToEntries,
            ("from_entries", 0) => Builtin::FromEntries,
            ("with_entries", 1) => Builtin::WithEntries,
            ("add", 0) => Builtin::Add,
            ("any", 0) => Builtin::Any,
            ("all", 0) => Builtin::All,
            ("first", 0) => Builtin::First,
            ("last", 0) => Builtin::Last,
            ("reverse", 0) => Builtin::Reverse,
            ("sort", 0) => Builtin::Sort,
            ("unique", 0) => Builtin::Unique,
            ("min", 0) => Builtin::Min,
            ("max", 0) => Builtin::Max,
            ("ascii_downcase", 0) => Builtin::AsciiDowncase,
            ("ascii_upcase", 0) => Builtin::AsciiUpcase,
            ("select", 1) => Builtin::Select,
            ("map", 1) => Builtin::Map,
            ("has", 1) => Builtin::Has,
            ("join", 1) => Builtin::Join,
            ("split", 1) => Builtin::Split,
            ("test", 1) => Builtin::Test,
            ("startswith", 1) => Builtin::StartsWith,
            ("endswith", 1) => Builtin::EndsWith,
            ("ltrimstr", 1) => Builtin::LtrimStr,
            ("rtrimstr", 1) => Builtin::RtrimStr,
            _ => return None,
        };
        Some(builtin)
    }
}

fn parse_err(msg: impl Into<String>) -> StateError {
    StateError::QueryParse(msg.into())
}

fn too_deep() -> StateError {
    parse_err("expression nested too deeply")
}

pub fn parse(src: &str) -> StateResult<Ast> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(parse_err("empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let node = parser.parse_pipe()?;
    match parser.peek() {
        None => Ok(node.ast),
        Some(tok) => Err(parse_err(format!("unexpected token {:?}", tok))),
    }
}

/// AST plus its height, tracked so over-deep trees are rejected as they are built.
struct Node {
    ast: Ast,
    height: usize,
}

impl Node {
    fn leaf(ast: Ast) -> Node {
        Node { ast, height: 1 }
    }

    fn field_of_input(name: String) -> Node {
        Node {
            ast: Ast::Field(Box::new(Ast::Identity), name),
            height: 2,
        }
    }
}

fn grow(children: impl IntoIterator<Item = usize>) -> StateResult<usize> {
    let height = children.into_iter().max().unwrap_or(0) + 1;
    if height > MAX_DEPTH {
        return Err(too_deep());
    }
    Ok(height)
}

fn unary(inner: Node, make: impl FnOnce(Box<Ast>) -> Ast) -> StateResult<Node> {
    let height = grow([inner.height])?;
    Ok(Node {
        ast: make(Box::new(inner.ast)),
        height,
    })
}

fn binary(
    lhs: Node,
    rhs: Node,
    make: impl FnOnce(Box<Ast>, Box<Ast>) -> Ast,
) -> StateResult<Node> {
    let height = grow([lhs.height, rhs.height])?;
    Ok(Node {
        ast: make(Box::new(lhs.ast), Box::new(rhs.ast)),
        height,
    })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, want: &Token) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, want: Token) -> StateResult<()> {
        match self.next() {
            Some(ref tok) if *tok == want => Ok(()),
            Some(tok) => Err(parse_err(format!("expected {:?}, found {:?}", want, tok))),
            None => Err(parse_err(format!("expected {:?}, found end of input", want))),
        }
    }

    fn peek_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(id)) if id == word)
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.peek_keyword(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, word: &str) -> StateResult<()> {
        if self.eat_keyword(word) {
            return Ok(());
        }
        match self.peek() {
            Some(tok) => Err(parse_err(format!("expected {}, found {:?}", word, tok))),
            None => Err(parse_err(format!("expected {}, found end of input", word))),
        }
    }

    /// Runs `f` one level deeper, failing once the descent limit is reached.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> StateResult<T>) -> StateResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(too_deep());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_pipe(&mut self) -> StateResult<Node> {
        self.nested(|p| {
            let lhs = p.parse_comma()?;
            if p.eat(&Token::Pipe) {
                let rhs = p.parse_pipe()?;
                return binary(lhs, rhs, Ast::Pipe);
            }
            Ok(lhs)
        })
    }

    fn parse_comma(&mut self) -> StateResult<Node> {
        let first = self.parse_alt()?;
        if self.peek() != Some(&Token::Comma) {
            return Ok(first);
        }
        let mut height = first.height;
        let mut items = vec![first.ast];
        while self.eat(&Token::Comma) {
            let next = self.parse_alt()?;
            height = height.max(next.height);
            items.push(next.ast);
        }
        Ok(Node {
            ast: Ast::Comma(items),
            height: grow([height])?,
        })
    }

    fn parse_alt(&mut self) -> StateResult<Node> {
        let lhs = self.parse_or()?;
        if self.eat(&Token::Alt) {
            let rhs = self.nested(|p| p.parse_alt())?;
            return binary(lhs, rhs, Ast::Alt);
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> StateResult<Node> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("or") {
            let rhs = self.parse_and()?;
            lhs = binary(lhs, rhs, Ast::Or)?;
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> StateResult<Node> {
        let mut lhs = self.parse_compare()?;
        while self.eat_keyword("and") {
            let rhs = self.parse_compare()?;
            lhs = binary(lhs, rhs, Ast::And)?;
        }
        Ok(lhs)
    }

    fn parse_compare(&mut self) -> StateResult<Node> {
        let lhs = self.parse_additive()?;
        let Some(op) = self.peek().and_then(cmp_op) else {
            return Ok(lhs);
        };
        self.pos += 1;
        let rhs = self.parse_additive()?;
        if self.peek().and_then(cmp_op).is_some() {
            return Err(parse_err("comparison operators are non-associative"));
        }
        binary(lhs, rhs, |l, r| Ast::Compare(op, l, r))
    }

    fn parse_additive(&mut self) -> StateResult<Node> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = binary(lhs, rhs, |l, r| Ast::Arith(op, l, r))?;
        }
    }

    fn parse_multiplicative(&mut self) -> StateResult<Node> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                Some(Token::Percent) => ArithOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = binary(lhs, rhs, |l, r| Ast::Arith(op, l, r))?;
        }
    }

    fn parse_unary(&mut self) -> StateResult<Node> {
        if !self.eat(&Token::Minus) {
            return self.parse_postfix();
        }
        let inner = self.nested(|p| p.parse_unary())?;
        if let Ast::Literal(Value::Number(n)) = &inner.ast {
            let negated = number_value(-n.as_f64().unwrap_or(0.0))?;
            return Ok(Node::leaf(Ast::Literal(negated)));
        }
        unary(inner, Ast::Neg)
    }

    fn parse_postfix(&mut self) -> StateResult<Node> {
        let mut term = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Field(_)) => {
                    if let Some(Token::Field(name)) = self.next() {
                        term = unary(term, |base| Ast::Field(base, name))?;
                    }
                }
                Some(Token::Dot) if matches!(self.peek_at(1), Some(Token::Str(_))) => {
                    self.pos += 1;
                    if let Some(Token::Str(name)) = self.next() {
                        term = unary(term, |base| Ast::Field(base, name))?;
                    }
                }
                Some(Token::Dot) if matches!(self.peek_at(1), Some(Token::LBracket)) => {
                    self.pos += 1;
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    term = self.parse_bracket_suffix(term)?;
                }
                Some(Token::Question) => {
                    self.pos += 1;
                    term = unary(term, Ast::Optional)?;
                }
                _ => return Ok(term),
            }
        }
    }

    /// Everything after `[` in `term[...]`: iteration, index or slice.
    fn parse_bracket_suffix(&mut self, term: Node) -> StateResult<Node> {
        if self.eat(&Token::RBracket) {
            return unary(term, Ast::Iterate);
        }
        let from = if self.peek() == Some(&Token::Colon) {
            None
        } else {
            Some(self.parse_pipe()?)
        };
        if !self.eat(&Token::Colon) {
            self.expect(Token::RBracket)?;
            let index = from.ok_or_else(|| parse_err("empty index"))?;
            return binary(term, index, Ast::Index);
        }
        let to = if self.peek() == Some(&Token::RBracket) {
            None
        } else {
            Some(self.parse_pipe()?)
        };
        self.expect(Token::RBracket)?;
        if from.is_none() && to.is_none() {
            return Err(parse_err("slice needs a start or an end"));
        }
        let height = grow([
            term.height,
            from.as_ref().map_or(0, |n| n.height),
            to.as_ref().map_or(0, |n| n.height),
        ])?;
        Ok(Node {
            ast: Ast::Slice(
                Box::new(term.ast),
                from.map(|n| Box::new(n.ast)),
                to.map(|n| Box::new(n.ast)),
            ),
            height,
        })
    }

    fn parse_primary(&mut self) -> StateResult<Node> {
        let tok = self
            .next()
            .ok_or_else(|| parse_err("unexpected end of input"))?;
        match tok {
            Token::Dot => {
                if let Some(Token::Str(name)) = self.peek().cloned() {
                    self.pos += 1;
                    return Ok(Node::field_of_input(name));
                }
                Ok(Node::leaf(Ast::Identity))
            }
            Token::DotDot => Ok(Node::leaf(Ast::RecurseAll)),
            Token::Field(name) => Ok(Node::field_of_input(name)),
            Token::Str(s) => Ok(Node::leaf(Ast::Literal(Value::String(s)))),
            Token::InterpStart(s) => self.parse_format(s),
            Token::Num(n) => Ok(Node::leaf(Ast::Literal(number_value(n)?))),
            Token::LParen => {
                let inner = self.parse_pipe()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                if self.eat(&Token::RBracket) {
                    return Ok(Node::leaf(Ast::Array(None)));
                }
                let inner = self.parse_pipe()?;
                self.expect(Token::RBracket)?;
                unary(inner, |items| Ast::Array(Some(items)))
            }
            Token::LBrace => self.parse_object(),
            Token::Ident(name) => self.parse_ident(name),
            other => Err(parse_err(format!("unexpected token {:?}", other))),
        }
    }

    fn parse_ident(&mut self, name: String) -> StateResult<Node> {
        match name.as_str() {
            "true" => return Ok(Node::leaf(Ast::Literal(Value::Bool(true)))),
            "false" => return Ok(Node::leaf(Ast::Literal(Value::Bool(false)))),
            "null" => return Ok(Node::leaf(Ast::Literal(Value::Null))),
            "if" => return self.parse_if(),
            "and" | "or" | "then" | "elif" | "else" | "end" => {
                return Err(parse_err(format!("unexpected keyword {}", name)))
            }
            _ => {}
        }
        let mut args = Vec::new();
        if self.eat(&Token::LParen) {
            loop {
                args.push(self.parse_pipe()?);
                if self.eat(&Token::Semicolon) {
                    continue;
                }
                self.expect(Token::RParen)?;
                break;
            }
        }
        let builtin = Builtin::lookup(&name, args.len())
            .ok_or_else(|| parse_err(format!("{}/{} is not defined", name, args.len())))?;
        let height = grow(args.iter().map(|a| a.height))?;
        Ok(Node {
            ast: Ast::Call(builtin, args.into_iter().map(|a| a.ast).collect()),
            height,
        })
    }

    /// `if` already consumed; `elif` chains share the final `end`.
    fn parse_if(&mut self) -> StateResult<Node> {
        let cond = self.parse_pipe()?;
        self.expect_keyword("then")?;
        let then = self.parse_pipe()?;
        let otherwise = if self.eat_keyword("elif") {
            Some(self.nested(|p| p.parse_if())?)
        } else if self.eat_keyword("else") {
            let node = self.parse_pipe()?;
            self.expect_keyword("end")?;
            Some(node)
        } else {
            self.expect_keyword("end")?;
            None
        };
        let height = grow([
            cond.height,
            then.height,
            otherwise.as_ref().map_or(0, |n| n.height),
        ])?;
        Ok(Node {
            ast: Ast::If(
                Box::new(cond.ast),
                Box::new(then.ast),
                otherwise.map(|n| Box::new(n.ast)),
            ),
            height,
        })
    }

    /// `{` already consumed.
    fn parse_object(&mut self) -> StateResult<Node> {
        let mut entries = Vec::new();
        let mut height = 0;
        if self.eat(&Token::RBrace) {
            return Ok(Node::leaf(Ast::Object(entries)));
        }
        loop {
            let (key, shorthand) = self.parse_object_key()?;
            let value = if self.eat(&Token::Colon) {
                self.nested(|p| p.parse_alt())?
            } else {
                let name = shorthand
                    .ok_or_else(|| parse_err("computed object key needs a value"))?;
                Node::field_of_input(name)
            };
            height = height.max(key.height).max(value.height);
            entries.push((key.ast, value.ast));
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RBrace)?;
            break;
        }
        Ok(Node {
            ast: Ast::Object(entries),
            height: grow([height])?,
        })
    }

    /// Returns the key expression and, for literal keys, the name `{name}` shorthand reads.
    fn parse_object_key(&mut self) -> StateResult<(Node, Option<String>)> {
        match self.next() {
            Some(Token::Ident(name)) | Some(Token::Str(name)) => Ok((
                Node::leaf(Ast::Literal(Value::String(name.clone()))),
                Some(name),
            )),
            Some(Token::InterpStart(s)) => Ok((self.parse_format(s)?, None)),
            Some(Token::LParen) => {
                let key = self.parse_pipe()?;
                self.expect(Token::RParen)?;
                Ok((key, None))
            }
            Some(tok) => Err(parse_err(format!("unexpected object key {:?}", tok))),
            None => Err(parse_err("unterminated object")),
        }
    }

    /// Opening segment already consumed.
    fn parse_format(&mut self, first: String) -> StateResult<Node> {
        let mut parts = vec![StrPart::Lit(first)];
        let mut height = 1;
        loop {
            let expr = self.parse_pipe()?;
            height = height.max(grow([expr.height])?);
            parts.push(StrPart::Expr(expr.ast));
            match self.next() {
                Some(Token::InterpMid(s)) => parts.push(StrPart::Lit(s)),
                Some(Token::InterpEnd(s)) => {
                    parts.push(StrPart::Lit(s));
                    break;
                }
                Some(tok) => {
                    return Err(parse_err(format!(
                        "expected end of interpolation, found {:?}",
                        tok
                    )))
                }
                None => return Err(parse_err("unterminated string interpolation")),
            }
        }
        Ok(Node {
            ast: Ast::Format(parts),
            height,
        })
    }
}

fn cmp_op(tok: &Token) -> Option<CmpOp> {
    match tok {
        Token::Eq => Some(CmpOp::Eq),
        Token::Ne => Some(CmpOp::Ne),
        Token::Lt => Some(CmpOp::Lt),
        Token::Le => Some(CmpOp::Le),
        Token::Gt => Some(CmpOp::Gt),
        Token::Ge => Some(CmpOp::Ge),
        _ => None,
    }
}

/// Integral literals become JSON integers so they print without a fraction.
fn number_value(n: f64) -> StateResult<Value> {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Ok(Value::from(n as i64));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| parse_err(format!("number {} is not representable", n)))
}
