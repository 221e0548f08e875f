//! Recursive-descent parser producing the expression AST
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := eq ( "&&" eq )*
//! eq      := cmp ( ("==" | "!=") cmp )*
//! cmp     := sum ( ("<" | "<=" | ">" | ">=") sum )*
//! sum     := product ( ("+" | "-") product )*
//! product := unary ( ("*" | "/" | "%") unary )*
//! unary   := ("-" | "!") unary | primary
//! primary := number | "{" name "}" | ident | "(" or ")"
//! ```

use crate::error::{ExprError, Result};
use crate::lexer::{tokenize, Spanned, Token};

const MAX_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Braced `{field}` reference
    Field(String),
    /// Bare identifier reference
    Name(String),
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
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
    And,
    Or,
}

impl Expr {
    /// Every referenced name, braced or bare, in order of first appearance
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Field(name) | Expr::Name(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Unary { expr, .. } => expr.collect_refs(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_refs(out);
                rhs.collect_refs(out);
            }
        }
    }
}

/// Parse formula text into an AST
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let expr = parser.or()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some(extra) => Err(unexpected(Some(extra))),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    /// Consume the next token if it maps to an operator
    fn binary_op(&mut self, pick: fn(&Token) -> Option<BinaryOp>) -> Option<BinaryOp> {
        let op = self.peek().and_then(pick)?;
        self.pos += 1;
        Some(op)
    }

    fn left_assoc(
        &mut self,
        pick: fn(&Token) -> Option<BinaryOp>,
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut lhs = next(self)?;
        while let Some(op) = self.binary_op(pick) {
            let rhs = next(self)?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<Expr> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        let expr = self.left_assoc(|t| matches!(t, Token::OrOr).then_some(BinaryOp::Or), Self::and);
        self.depth -= 1;
        expr
    }

    fn and(&mut self) -> Result<Expr> {
        self.left_assoc(|t| matches!(t, Token::AndAnd).then_some(BinaryOp::And), Self::equality)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.left_assoc(
            |t| match t {
                Token::EqEq => Some(BinaryOp::Eq),
                Token::NotEq => Some(BinaryOp::Ne),
                _ => None,
            },
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.left_assoc(
            |t| match t {
                Token::Lt => Some(BinaryOp::Lt),
                Token::Le => Some(BinaryOp::Le),
                Token::Gt => Some(BinaryOp::Gt),
                Token::Ge => Some(BinaryOp::Ge),
                _ => None,
            },
            Self::sum,
        )
    }

    fn sum(&mut self) -> Result<Expr> {
        self.left_assoc(
            |t| match t {
                Token::Plus => Some(BinaryOp::Add),
                Token::Minus => Some(BinaryOp::Sub),
                _ => None,
            },
            Self::product,
        )
    }

    fn product(&mut self) -> Result<Expr> {
        self.left_assoc(
            |t| match t {
                Token::Star => Some(BinaryOp::Mul),
                Token::Slash => Some(BinaryOp::Div),
                Token::Percent => Some(BinaryOp::Rem),
                _ => None,
            },
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.primary(),
        };
        self.pos += 1;
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        let expr = self.unary();
        self.depth -= 1;
        Ok(Expr::Unary { op, expr: Box::new(expr?) })
    }

    fn primary(&mut self) -> Result<Expr> {
        let next = self.advance();
        match next.as_ref().map(|s| &s.token) {
            Some(Token::Number(n)) => Ok(Expr::Number(*n)),
            Some(Token::Field(name)) => Ok(Expr::Field(name.clone())),
            Some(Token::Ident(name)) => Ok(Expr::Name(name.clone())),
            Some(Token::LParen) => {
                let inner = self.or()?;
                match self.advance() {
                    Some(Spanned { token: Token::RParen, .. }) => Ok(inner),
                    other => Err(unexpected(other.as_ref())),
                }
            }
            _ => Err(unexpected(next.as_ref())),
        }
    }
}

fn unexpected(found: Option<&Spanned>) -> ExprError {
    match found {
        Some(s) => ExprError::UnexpectedToken { found: s.token.describe(), pos: s.pos },
        None => ExprError::UnexpectedToken { found: "end of expression".into(), pos: usize::MAX },
    }
}
