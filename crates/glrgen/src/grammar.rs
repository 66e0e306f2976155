//! Grammar types and normalization.
//!
//! The surface grammar is lowered in three passes: token declarations first,
//! so every terminal has its kind before any category is seen; then category
//! discovery over rule heads and pragma targets; finally rule expansion,
//! which flattens list and coercion macros into atomic rules. Rule order is
//! the textual definition order, which fixes the start symbol and the
//! emission order downstream.

use crate::syntax::{self, ast};
use crate::types::Map;
use crate::util::{base_name, display_fn};
use std::{fmt, path::Path};

/// The attribute carried by a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermKind {
    Unit,
    Int,
    String,
    Char,
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    Nonterminal,
    Terminal(TermKind),
}

/// A grammatical symbol: a name, a list-nesting level and a kind.
///
/// Equality is structural. Within one grammar the pair `(name, level)`
/// determines the kind; the symbol table enforces this.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    pub name: String,
    pub level: u8,
    pub kind: SymbolKind,
}

/// Reserved name of the synthetic start nonterminal. Unlexable as an
/// identifier, so user grammars cannot collide with it.
const ACCEPT_NAME: &str = "S'";

/// Reserved name of the end-of-input terminal.
const EOI_NAME: &str = "$end";

impl Symbol {
    pub fn nonterminal(name: impl Into<String>, level: u8) -> Self {
        Self {
            name: name.into(),
            level,
            kind: SymbolKind::Nonterminal,
        }
    }

    pub fn terminal(name: impl Into<String>, kind: TermKind) -> Self {
        Self {
            name: name.into(),
            level: 0,
            kind: SymbolKind::Terminal(kind),
        }
    }

    /// The synthetic start symbol `S'`.
    pub fn accept() -> Self {
        Self::nonterminal(ACCEPT_NAME, 0)
    }

    /// The end-of-input terminal.
    pub fn eoi() -> Self {
        Self::terminal(EOI_NAME, TermKind::Unit)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, SymbolKind::Terminal(_))
    }

    pub fn is_accept(&self) -> bool {
        self.level == 0 && self.name == ACCEPT_NAME
    }

    pub fn is_eoi(&self) -> bool {
        self.level == 0 && self.name == EOI_NAME
    }

    /// The attribute kind, for terminals.
    pub fn term_kind(&self) -> Option<TermKind> {
        match self.kind {
            SymbolKind::Terminal(kind) => Some(kind),
            SymbolKind::Nonterminal => None,
        }
    }

    /// The name with trailing precedence digits stripped.
    pub fn base(&self) -> &str {
        base_name(&self.name)
    }

    /// Whether the symbol carries a semantic value: every nonterminal, and
    /// every terminal with an attribute.
    pub fn carries_value(&self) -> bool {
        self.kind != SymbolKind::Terminal(TermKind::Unit)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.level {
            f.write_str("[")?;
        }
        f.write_str(&self.name)?;
        for _ in 0..self.level {
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// How a rule builds its semantic value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constructor {
    /// A user-labelled node.
    Named(String),
    /// A coercion: the single child value passes through unchanged.
    Wild,
    /// The empty list.
    ListEmpty,
    /// `head :: tail`.
    ListCons,
    /// A singleton list.
    ListOne,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub ctor: Constructor,
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
}

impl Rule {
    pub fn display(&self) -> impl fmt::Display + '_ {
        display_fn(|f| {
            match &self.ctor {
                Constructor::Named(name) => write!(f, "{name}.")?,
                Constructor::Wild => f.write_str("_.")?,
                Constructor::ListEmpty => f.write_str("[].")?,
                Constructor::ListCons => f.write_str("(:).")?,
                Constructor::ListOne => f.write_str("(:[]).")?,
            }
            write!(f, " {} ::=", self.lhs)?;
            for sym in &self.rhs {
                write!(f, " {sym}")?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("unknown attribute type `{attr}` for token `{name}`")]
    UnknownTokenType { name: String, attr: String },

    #[error("conflicting declarations for `{name}`")]
    ConflictingToken { name: String },

    #[error("undefined symbol `{name}` in the definition of `{lhs}`")]
    UndefinedSymbol { name: String, lhs: String },

    #[error("the left-hand side `{name}` must be a nonterminal")]
    NonterminalRequired { name: String },

    #[error("a wildcard rule for `{lhs}` must carry exactly one value")]
    WildcardArity { lhs: String },

    #[error("the list rule for `{lhs}` has an unexpected shape")]
    ListRuleShape { lhs: String },

    #[error("the grammar defines no rules")]
    NoRules,

    #[error(transparent)]
    Parse(#[from] syntax::ParseError),
}

/// A normalized grammar: flat symbol sets, atomic rules, a fixed start.
#[derive(Debug)]
pub struct Grammar {
    pub terminals: Vec<Symbol>,
    pub nonterminals: Vec<Symbol>,
    pub rules: Vec<Rule>,
    pub start: Symbol,
}

impl Grammar {
    /// Parse and normalize grammar source text.
    pub fn from_source(source: &str) -> Result<Self, GrammarError> {
        let tree = syntax::parse(source)?;
        Self::from_ast(&tree)
    }

    /// Read, parse and normalize a grammar file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context as _;
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let grammar = Self::from_source(&source)
            .with_context(|| format!("failed to process {}", path.display()))?;
        Ok(grammar)
    }

    /// Lower the abstract tree into the normalized form.
    pub fn from_ast(tree: &ast::Grammar) -> Result<Self, GrammarError> {
        let mut table = SymbolTable::default();

        // Terminal pass.
        for decl in &tree.tokens {
            match decl {
                ast::TokenDecl::Keyword { name, literal, .. } => {
                    let sym = table.declare_terminal(name, TermKind::Unit)?;
                    table.alias(literal, sym);
                }
                ast::TokenDecl::Attr { name, attr, .. } => {
                    let kind = match attr.as_str() {
                        "string" => TermKind::String,
                        "int" => TermKind::Int,
                        "char" => TermKind::Char,
                        "real" => TermKind::Real,
                        _ => {
                            return Err(GrammarError::UnknownTokenType {
                                name: name.clone(),
                                attr: attr.clone(),
                            })
                        }
                    };
                    table.declare_terminal(name, kind)?;
                }
                ast::TokenDecl::NoAttr { name, .. } => {
                    table.declare_terminal(name, TermKind::Unit)?;
                }
            }
        }

        // Category pass over rule heads and pragma targets.
        for def in &tree.defs {
            match def {
                ast::Def::Rule { cat, .. } => {
                    table.declare_category(cat.name(), cat.level())?;
                }
                ast::Def::Separator { cat, .. } | ast::Def::Terminator { cat, .. } => {
                    table.declare_category(cat.name(), cat.level() + 1)?;
                }
                ast::Def::Coercions { ident, level, .. } => {
                    table.declare_category(ident, 0)?;
                    for tier in 1..=*level {
                        table.declare_category(&format!("{ident}{tier}"), 0)?;
                    }
                }
            }
        }

        // Rule expansion pass.
        let mut rules = Vec::new();
        for def in &tree.defs {
            match def {
                ast::Def::Rule {
                    label, cat, items, ..
                } => {
                    let lhs = table.resolve_head(cat.name(), cat.level())?;
                    let mut rhs = Vec::with_capacity(items.len());
                    for item in items {
                        rhs.push(match item {
                            ast::Item::Terminal(_, lit) => table.literal_terminal(lit)?,
                            ast::Item::NTerminal(_, cat) => {
                                table.resolve_reference(cat.name(), cat.level(), &lhs)?
                            }
                        });
                    }
                    let ctor = match label {
                        ast::Label::Id(_, name) => Constructor::Named(name.clone()),
                        ast::Label::Wild(_) => Constructor::Wild,
                        ast::Label::ListE(_) => Constructor::ListEmpty,
                        ast::Label::ListCons(_) => Constructor::ListCons,
                        ast::Label::ListOne(_) => Constructor::ListOne,
                    };
                    let rule = Rule { ctor, lhs, rhs };
                    check_rule_shape(&rule)?;
                    rules.push(rule);
                }
                ast::Def::Separator {
                    minsize, cat, sep, ..
                } => {
                    expand_list(&mut table, &mut rules, cat, sep, *minsize, ListStyle::Separator)?;
                }
                ast::Def::Terminator {
                    minsize, cat, term, ..
                } => {
                    expand_list(&mut table, &mut rules, cat, term, *minsize, ListStyle::Terminator)?;
                }
                ast::Def::Coercions { ident, level, .. } => {
                    let base = table.resolve_head(ident, 0)?;
                    for tier in 1..=*level {
                        let outer = if tier == 1 {
                            base.clone()
                        } else {
                            table.resolve_head(&format!("{ident}{}", tier - 1), 0)?
                        };
                        let inner = table.resolve_head(&format!("{ident}{tier}"), 0)?;
                        rules.push(Rule {
                            ctor: Constructor::Wild,
                            lhs: outer,
                            rhs: vec![inner],
                        });
                    }
                    let innermost = table.resolve_head(&format!("{ident}{level}"), 0)?;
                    let lparen = table.literal_terminal("(")?;
                    let rparen = table.literal_terminal(")")?;
                    rules.push(Rule {
                        ctor: Constructor::Wild,
                        lhs: innermost,
                        rhs: vec![lparen, base, rparen],
                    });
                }
            }
        }

        let start = rules.first().map(|r| r.lhs.clone()).ok_or(GrammarError::NoRules)?;

        let (terminals, nonterminals) = table.into_symbols();
        Ok(Self {
            terminals,
            nonterminals,
            rules,
            start,
        })
    }

    /// All rules whose left-hand side is `lhs`, in definition order.
    pub fn rules_for<'g>(&'g self, lhs: &'g Symbol) -> impl Iterator<Item = &'g Rule> + 'g {
        self.rules.iter().filter(move |rule| rule.lhs == *lhs)
    }

    /// The virtual rule `S' -> start` the automaton is seeded with.
    pub fn accept_rule(&self) -> Rule {
        Rule {
            ctor: Constructor::Wild,
            lhs: Symbol::accept(),
            rhs: vec![self.start.clone()],
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "terminals:")?;
        for sym in &self.terminals {
            write!(f, " {sym}")?;
        }
        write!(f, "\nnonterminals:")?;
        for sym in &self.nonterminals {
            write!(f, " {sym}")?;
        }
        writeln!(f, "\nstart: {}", self.start)?;
        writeln!(f, "rules:")?;
        for (i, rule) in self.rules.iter().enumerate() {
            writeln!(f, "  [{:02}] {}", i, rule.display())?;
        }
        Ok(())
    }
}

fn check_rule_shape(rule: &Rule) -> Result<(), GrammarError> {
    let values = rule.rhs.iter().filter(|sym| sym.carries_value()).count();
    let ok = match rule.ctor {
        Constructor::Named(_) => true,
        Constructor::Wild => values == 1,
        Constructor::ListEmpty => values == 0,
        Constructor::ListOne => values == 1,
        Constructor::ListCons => values == 2,
    };
    if ok {
        Ok(())
    } else if matches!(rule.ctor, Constructor::Wild) {
        Err(GrammarError::WildcardArity {
            lhs: rule.lhs.to_string(),
        })
    } else {
        Err(GrammarError::ListRuleShape {
            lhs: rule.lhs.to_string(),
        })
    }
}

#[derive(Clone, Copy)]
enum ListStyle {
    Separator,
    Terminator,
}

/// Expand a `separator`/`terminator` pragma into its list rules over `[C]`.
fn expand_list(
    table: &mut SymbolTable,
    rules: &mut Vec<Rule>,
    cat: &ast::Cat,
    delim: &str,
    minsize: ast::MinSize,
    style: ListStyle,
) -> Result<(), GrammarError> {
    let list = table.resolve_head(cat.name(), cat.level() + 1)?;
    let elem = table.resolve_reference(cat.name(), cat.level(), &list)?;
    let delim = table.literal_terminal(delim)?;

    if minsize == ast::MinSize::Empty {
        rules.push(Rule {
            ctor: Constructor::ListEmpty,
            lhs: list.clone(),
            rhs: vec![],
        });
    }
    let one = match style {
        ListStyle::Separator => vec![elem.clone()],
        ListStyle::Terminator => vec![elem.clone(), delim.clone()],
    };
    rules.push(Rule {
        ctor: Constructor::ListOne,
        lhs: list.clone(),
        rhs: one,
    });
    rules.push(Rule {
        ctor: Constructor::ListCons,
        lhs: list.clone(),
        rhs: vec![elem, delim, list],
    });
    Ok(())
}

/// Canonicalizes symbols over `(name, level)` and resolves literal aliases.
#[derive(Debug, Default)]
struct SymbolTable {
    symbols: Map<(String, u8), Symbol>,
    aliases: Map<String, Symbol>,
}

impl SymbolTable {
    /// Register a terminal, merging compatible duplicates.
    fn declare_terminal(&mut self, name: &str, kind: TermKind) -> Result<Symbol, GrammarError> {
        let key = (name.to_owned(), 0);
        if let Some(existing) = self.symbols.get(&key) {
            if existing.kind == SymbolKind::Terminal(kind) {
                return Ok(existing.clone());
            }
            return Err(GrammarError::ConflictingToken {
                name: name.to_owned(),
            });
        }
        let sym = Symbol::terminal(name, kind);
        self.symbols.insert(key, sym.clone());
        Ok(sym)
    }

    /// Point a literal spelling at a terminal. The first declaration of a
    /// spelling is authoritative; later ones are dropped.
    fn alias(&mut self, literal: &str, sym: Symbol) {
        self.aliases.entry(literal.to_owned()).or_insert(sym);
    }

    /// The terminal a quoted literal denotes, registering an anonymous unit
    /// terminal on first use. A spelling that already names a category is a
    /// conflict.
    fn literal_terminal(&mut self, literal: &str) -> Result<Symbol, GrammarError> {
        if let Some(sym) = self.aliases.get(literal) {
            return Ok(sym.clone());
        }
        let sym = self
            .symbols
            .entry((literal.to_owned(), 0))
            .or_insert_with(|| Symbol::terminal(literal, TermKind::Unit))
            .clone();
        if !sym.is_terminal() {
            return Err(GrammarError::ConflictingToken {
                name: literal.to_owned(),
            });
        }
        self.alias(literal, sym.clone());
        Ok(sym)
    }

    /// Register a category (and, for lists, the categories below it) as
    /// nonterminals. A level-0 name already declared as a token stays a
    /// terminal; lists of token categories are still nonterminals.
    fn declare_category(&mut self, name: &str, level: u8) -> Result<(), GrammarError> {
        for lvl in 0..=level {
            let key = (name.to_owned(), lvl);
            if let Some(existing) = self.symbols.get(&key) {
                if lvl > 0 && existing.is_terminal() {
                    return Err(GrammarError::ConflictingToken {
                        name: name.to_owned(),
                    });
                }
                continue;
            }
            self.symbols
                .insert(key, Symbol::nonterminal(name, lvl));
        }
        Ok(())
    }

    /// Resolve a rule head; it must be a nonterminal.
    fn resolve_head(&self, name: &str, level: u8) -> Result<Symbol, GrammarError> {
        match self.symbols.get(&(name.to_owned(), level)) {
            Some(sym) if !sym.is_terminal() => Ok(sym.clone()),
            Some(_) => Err(GrammarError::NonterminalRequired {
                name: name.to_owned(),
            }),
            None => Err(GrammarError::UndefinedSymbol {
                name: name.to_owned(),
                lhs: name.to_owned(),
            }),
        }
    }

    /// Resolve a right-hand-side category reference against the declared
    /// tokens and categories.
    fn resolve_reference(
        &self,
        name: &str,
        level: u8,
        lhs: &Symbol,
    ) -> Result<Symbol, GrammarError> {
        self.symbols
            .get(&(name.to_owned(), level))
            .cloned()
            .ok_or_else(|| GrammarError::UndefinedSymbol {
                name: Symbol::nonterminal(name, level).to_string(),
                lhs: lhs.to_string(),
            })
    }

    /// Split the table into terminal and nonterminal symbol lists, in
    /// declaration order.
    fn into_symbols(self) -> (Vec<Symbol>, Vec<Symbol>) {
        let mut terminals = Vec::new();
        let mut nonterminals = Vec::new();
        for (_, sym) in self.symbols {
            if sym.is_terminal() {
                terminals.push(sym);
            } else {
                nonterminals.push(sym);
            }
        }
        (terminals, nonterminals)
    }
}
