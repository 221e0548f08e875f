//! Tokenizer for formula text

use crate::error::{ExprError, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    /// `{field_id}`
    Field(String),
    /// Bare identifier such as a grid row ID
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Bang,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Field(name) => format!("reference {{{}}}", name),
            Token::Ident(name) => format!("identifier \"{}\"", name),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Bang => "!",
            Token::Number(_) | Token::Field(_) | Token::Ident(_) => "",
        }
    }
}

/// Token with its byte offset in the source
#[derive(Clone, Debug, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, ch) = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        let peek = chars.get(i + 1).map(|(_, c)| *c);
        let (token, width) = match (ch, peek) {
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('!', _) => (Token::Bang, 1),
            ('{', _) => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|(_, c)| *c == '}')
                    .map(|offset| start + offset)
                    .ok_or(ExprError::UnterminatedReference(pos))?;
                let name: String = chars[start..end].iter().map(|(_, c)| c).collect();
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(ExprError::UnexpectedChar { ch: '}', pos: chars[end].0 });
                }
                tokens.push(Spanned { token: Token::Field(name), pos });
                i = end + 1;
                continue;
            }
            (c, _) if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|(_, c)| c).collect();
                let value = text.parse::<f64>().map_err(|_| ExprError::InvalidNumber(text))?;
                tokens.push(Spanned { token: Token::Number(value), pos });
                continue;
            }
            (c, _) if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().map(|(_, c)| c).collect();
                tokens.push(Spanned { token: Token::Ident(name), pos });
                continue;
            }
            (c, _) => return Err(ExprError::UnexpectedChar { ch: c, pos }),
        };

        tokens.push(Spanned { token, pos });
        i += width;
    }

    Ok(tokens)
}
