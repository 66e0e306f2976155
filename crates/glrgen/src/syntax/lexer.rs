//! Lexer for grammar files.

use crate::syntax::{ParseError, Span};
use logos::Logos;

#[derive(Debug, Clone, Copy, PartialEq, Logos)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"--[^\n]*")]
#[logos(skip r"\{-([^-]|-[^}])*-+\}")]
pub enum Tok<'src> {
    #[token("::=")]
    Derives,

    #[token(".")]
    Dot,

    #[token(";")]
    Semi,

    #[token("[")]
    LBrack,

    #[token("]")]
    RBrack,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(":")]
    Colon,

    #[token("_")]
    Under,

    #[token("token")]
    KwToken,

    #[token("separator")]
    KwSeparator,

    #[token("terminator")]
    KwTerminator,

    #[token("coercions")]
    KwCoercions,

    #[token("nonempty")]
    KwNonempty,

    #[regex(r"[0-9]+")]
    Int(&'src str),

    #[regex(r"[A-Za-z][A-Za-z0-9_]*")]
    Ident(&'src str),

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str(&'src str),
}

/// Tokenize the whole input, spans in byte offsets.
pub fn tokenize(source: &str) -> Result<Vec<(Tok<'_>, Span)>, ParseError> {
    let mut tokens = Vec::new();
    for (res, range) in Tok::lexer(source).spanned() {
        let span = Span::new(range.clone());
        match res {
            Ok(tok) => tokens.push((tok, span)),
            Err(()) => {
                return Err(ParseError::at(
                    source,
                    span,
                    format!("unrecognized input `{}`", &source[range]),
                ))
            }
        }
    }
    Ok(tokens)
}

/// Strip the surrounding quotes and resolve escapes in a string literal.
pub fn unquote(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(esc) => out.push(esc),
            None => break,
        }
    }
    out
}
