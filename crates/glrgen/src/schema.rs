//! Derivation of the abstract-syntax schema implied by labelled rules.
//!
//! Categories that differ only in trailing precedence digits (`Exp`,
//! `Exp1`, ...) share one sum type, so coercion chains add no nodes of
//! their own. Level-`n` list categories contribute `list`-wrapped fields
//! rather than types.

use crate::grammar::{Constructor, Grammar, Symbol, TermKind};
use crate::types::Map;

/// The target type of one constructor field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Int,
    String,
    Char,
    Real,
    /// The sum type of `base`, wrapped in `lists` list layers.
    Node { base: String, lists: u8 },
}

/// One case of a sum type: a labelled rule's constructor and the types of
/// its value-carrying right-hand-side symbols, in rule order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub ctor: String,
    pub fields: Vec<FieldType>,
}

/// The mutually recursive sum types derived from a grammar, keyed by base
/// name in first-appearance order.
#[derive(Debug, Default)]
pub struct AstSchema {
    pub types: Map<String, Vec<Case>>,
}

impl AstSchema {
    pub fn derive(grammar: &Grammar) -> Self {
        let mut types: Map<String, Vec<Case>> = Map::default();
        for rule in &grammar.rules {
            let Constructor::Named(ctor) = &rule.ctor else {
                continue;
            };
            if rule.lhs.level != 0 {
                continue;
            }
            let case = Case {
                ctor: ctor.clone(),
                fields: rule.rhs.iter().filter_map(field_type).collect(),
            };
            let cases = types.entry(rule.lhs.base().to_owned()).or_default();
            if !cases.contains(&case) {
                cases.push(case);
            }
        }
        Self { types }
    }

    /// The cases of the sum type for `base`, if any labelled rule produced
    /// one.
    pub fn cases(&self, base: &str) -> Option<&[Case]> {
        self.types.get(base).map(Vec::as_slice)
    }
}

/// The field a symbol contributes to its constructor's payload, if it
/// carries a value.
pub fn field_type(sym: &Symbol) -> Option<FieldType> {
    match sym.term_kind() {
        Some(TermKind::Unit) => None,
        Some(TermKind::Int) => Some(FieldType::Int),
        Some(TermKind::String) => Some(FieldType::String),
        Some(TermKind::Char) => Some(FieldType::Char),
        Some(TermKind::Real) => Some(FieldType::Real),
        None => Some(FieldType::Node {
            base: sym.base().to_owned(),
            lists: sym.level,
        }),
    }
}
