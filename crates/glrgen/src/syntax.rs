//! Grammar file front-end.
//!
//! [`parse`] turns the source text of a labelled BNF grammar into the
//! abstract tree in [`ast`], which the normalizer in [`crate::grammar`]
//! lowers to the flat rule form the rest of the pipeline works on.

pub mod ast;
pub mod lexer;

use self::lexer::{unquote, Tok};
use std::{fmt, ops::Range};

/// A byte range in the grammar source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(range: Range<usize>) -> Self {
        Self {
            start: range.start as u32,
            end: range.end as u32,
        }
    }

    fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("syntax error at line {line}, column {column}: {msg}")]
pub struct ParseError {
    pub msg: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    fn at(source: &str, span: Span, msg: String) -> Self {
        let upto = &source[..(span.start as usize).min(source.len())];
        let line = upto.bytes().filter(|&b| b == b'\n').count() + 1;
        let column = upto.len() - upto.rfind('\n').map_or(0, |i| i + 1) + 1;
        Self { msg, line, column }
    }
}

/// Parse grammar source into its abstract tree.
pub fn parse(source: &str) -> Result<ast::Grammar, ParseError> {
    let tokens = lexer::tokenize(source)?;
    Parser {
        source,
        tokens,
        pos: 0,
    }
    .grammar()
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Tok<'src>, Span)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<Tok<'src>> {
        self.tokens.get(self.pos).map(|&(tok, _)| tok)
    }

    fn bump(&mut self) -> Option<(Tok<'src>, Span)> {
        let tok = self.tokens.get(self.pos).copied();
        self.pos += 1;
        tok
    }

    fn here(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(Span::default(), |&(_, span)| span)
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::at(self.source, self.here(), msg.into())
    }

    fn expect(&mut self, tok: Tok<'static>, what: &str) -> Result<Span, ParseError> {
        match self.bump() {
            Some((found, span)) if found == tok => Ok(span),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error(format!("expected {what}")))
            }
        }
    }

    fn ident(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.bump() {
            Some((Tok::Ident(name), span)) => Ok((name.to_owned(), span)),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error(format!("expected {what}")))
            }
        }
    }

    fn literal(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.bump() {
            Some((Tok::Str(raw), span)) => Ok((unquote(raw), span)),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error(format!("expected {what}")))
            }
        }
    }

    fn grammar(mut self) -> Result<ast::Grammar, ParseError> {
        let start = self.here();
        let mut tokens = Vec::new();
        let mut defs = Vec::new();
        let mut end = start;

        while let Some(tok) = self.peek() {
            match tok {
                Tok::KwToken => tokens.push(self.token_decl()?),
                Tok::KwSeparator | Tok::KwTerminator => defs.push(self.list_pragma()?),
                Tok::KwCoercions => defs.push(self.coercions()?),
                _ => defs.push(self.rule()?),
            }
            end = self
                .tokens
                .get(self.pos.saturating_sub(1))
                .map_or(end, |&(_, span)| span);
        }

        Ok(ast::Grammar {
            span: start.to(end),
            tokens,
            defs,
        })
    }

    /// `token Name int ;` / `token Name "lit" ;` / `token Name ;`
    fn token_decl(&mut self) -> Result<ast::TokenDecl, ParseError> {
        let start = self.expect(Tok::KwToken, "`token`")?;
        let (name, _) = self.ident("a token name")?;
        let decl = match self.peek() {
            Some(Tok::Ident(attr)) => {
                let attr = attr.to_owned();
                self.bump();
                ast::TokenDecl::Attr {
                    span: start,
                    name,
                    attr,
                }
            }
            Some(Tok::Str(raw)) => {
                let literal = unquote(raw);
                self.bump();
                ast::TokenDecl::Keyword {
                    span: start,
                    name,
                    literal,
                }
            }
            _ => ast::TokenDecl::NoAttr { span: start, name },
        };
        self.expect(Tok::Semi, "`;` after token declaration")?;
        Ok(decl)
    }

    /// `separator|terminator [nonempty] Cat "lit" ;`
    fn list_pragma(&mut self) -> Result<ast::Def, ParseError> {
        let (kind, span) = match self.bump() {
            Some((tok @ (Tok::KwSeparator | Tok::KwTerminator), span)) => (tok, span),
            _ => return Err(self.error("expected `separator` or `terminator`")),
        };
        let minsize = if self.peek() == Some(Tok::KwNonempty) {
            self.bump();
            ast::MinSize::Nonempty
        } else {
            ast::MinSize::Empty
        };
        let cat = self.category()?;
        let (delim, _) = self.literal("a delimiter literal")?;
        self.expect(Tok::Semi, "`;` after list pragma")?;
        Ok(match kind {
            Tok::KwSeparator => ast::Def::Separator {
                span,
                minsize,
                cat,
                sep: delim,
            },
            _ => ast::Def::Terminator {
                span,
                minsize,
                cat,
                term: delim,
            },
        })
    }

    /// `coercions Ident Int ;`
    fn coercions(&mut self) -> Result<ast::Def, ParseError> {
        let span = self.expect(Tok::KwCoercions, "`coercions`")?;
        let (ident, _) = self.ident("a category name")?;
        let level = match self.bump() {
            Some((Tok::Int(digits), _)) => digits
                .parse::<u8>()
                .ok()
                .filter(|&n| n >= 1)
                .ok_or_else(|| self.error("coercion level must be between 1 and 255"))?,
            _ => return Err(self.error("expected a coercion level")),
        };
        self.expect(Tok::Semi, "`;` after coercions")?;
        Ok(ast::Def::Coercions { span, ident, level })
    }

    /// `Label. Cat ::= item* ;`
    fn rule(&mut self) -> Result<ast::Def, ParseError> {
        let label = self.label()?;
        self.expect(Tok::Dot, "`.` after rule label")?;
        let cat = self.category()?;
        let span = self.expect(Tok::Derives, "`::=`")?;
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::Semi) => {
                    self.bump();
                    break;
                }
                Some(Tok::Str(raw)) => {
                    let (_, span) = self.bump().unwrap();
                    items.push(ast::Item::Terminal(span, unquote(raw)));
                }
                Some(Tok::Ident(_) | Tok::LBrack) => {
                    let cat = self.category()?;
                    items.push(ast::Item::NTerminal(cat.span(), cat));
                }
                _ => return Err(self.error("expected a rule item or `;`")),
            }
        }
        Ok(ast::Def::Rule {
            span,
            label,
            cat,
            items,
        })
    }

    fn label(&mut self) -> Result<ast::Label, ParseError> {
        match self.peek() {
            Some(Tok::Ident(name)) => {
                let name = name.to_owned();
                let (_, span) = self.bump().unwrap();
                Ok(ast::Label::Id(span, name))
            }
            Some(Tok::Under) => {
                let (_, span) = self.bump().unwrap();
                Ok(ast::Label::Wild(span))
            }
            Some(Tok::LBrack) => {
                let (_, span) = self.bump().unwrap();
                self.expect(Tok::RBrack, "`]` in `[]` label")?;
                Ok(ast::Label::ListE(span))
            }
            Some(Tok::LParen) => {
                let (_, span) = self.bump().unwrap();
                self.expect(Tok::Colon, "`:` in list label")?;
                match self.peek() {
                    Some(Tok::RParen) => {
                        self.bump();
                        Ok(ast::Label::ListCons(span))
                    }
                    Some(Tok::LBrack) => {
                        self.bump();
                        self.expect(Tok::RBrack, "`]` in `(:[])` label")?;
                        self.expect(Tok::RParen, "`)` in `(:[])` label")?;
                        Ok(ast::Label::ListOne(span))
                    }
                    _ => Err(self.error("expected `)` or `[]` in list label")),
                }
            }
            _ => Err(self.error("expected a rule label")),
        }
    }

    fn category(&mut self) -> Result<ast::Cat, ParseError> {
        match self.bump() {
            Some((Tok::Ident(name), span)) => Ok(ast::Cat::Id(span, name.to_owned())),
            Some((Tok::LBrack, span)) => {
                let inner = self.category()?;
                let end = self.expect(Tok::RBrack, "`]` closing a list category")?;
                Ok(ast::Cat::List(span.to(end), Box::new(inner)))
            }
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error("expected a category"))
            }
        }
    }
}
