//! LR(0) items and item-set operations.
//!
//! An item is a rule with a dot splitting the right-hand side. Items are
//! plain values compared structurally, so two textually identical rules
//! contribute a single item to any set they both reach.

use crate::grammar::{Constructor, Grammar, Rule, Symbol};
use crate::types::Set;
use crate::util::display_fn;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub ctor: Constructor,
    pub lhs: Symbol,
    pub before: Vec<Symbol>,
    pub after: Vec<Symbol>,
}

impl Item {
    /// The item for `rule` with the dot at the far left.
    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            ctor: rule.ctor.clone(),
            lhs: rule.lhs.clone(),
            before: Vec::new(),
            after: rule.rhs.clone(),
        }
    }

    /// The symbol immediately after the dot, if any.
    pub fn next_symbol(&self) -> Option<&Symbol> {
        self.after.first()
    }

    /// Whether the dot has reached the end of the right-hand side.
    pub fn is_reduce(&self) -> bool {
        self.after.is_empty()
    }

    /// The item with the dot advanced over one symbol.
    ///
    /// Panics if the dot is already at the end.
    pub fn advanced(&self) -> Self {
        let mut before = self.before.clone();
        let mut after = self.after.clone();
        before.push(after.remove(0));
        Self {
            ctor: self.ctor.clone(),
            lhs: self.lhs.clone(),
            before,
            after,
        }
    }

    /// The rule this item was lifted from.
    pub fn rule(&self) -> Rule {
        let mut rhs = self.before.clone();
        rhs.extend(self.after.iter().cloned());
        Rule {
            ctor: self.ctor.clone(),
            lhs: self.lhs.clone(),
            rhs,
        }
    }

    pub fn display(&self) -> impl fmt::Display + '_ {
        display_fn(|f| {
            write!(f, "{} ->", self.lhs)?;
            for sym in &self.before {
                write!(f, " {sym}")?;
            }
            f.write_str(" .")?;
            for sym in &self.after {
                write!(f, " {sym}")?;
            }
            Ok(())
        })
    }
}

/// A deduplicated set of items.
///
/// Iteration order is the order items were first added (kernel items first,
/// then closure items), which downstream code relies on for stable emission.
/// Equality and hashing ignore the order: two sets holding the same items
/// are the same state.
#[derive(Debug, Clone, Eq)]
pub struct ItemSet {
    items: Vec<Item>,
}

impl PartialEq for ItemSet {
    fn eq(&self, other: &Self) -> bool {
        self.sorted() == other.sorted()
    }
}

impl Hash for ItemSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for item in self.sorted() {
            item.hash(state);
        }
    }
}

impl ItemSet {
    /// The closure of `seed` under the grammar's rules: whenever a dot
    /// precedes a nonterminal, the fresh items of all of its rules join the
    /// set, to a fixed point.
    pub fn closure_of<I>(seed: I, grammar: &Grammar) -> Self
    where
        I: IntoIterator<Item = Item>,
    {
        let mut items: Set<Item> = seed.into_iter().collect();
        let mut cursor = 0;
        while cursor < items.len() {
            let next = items[cursor].next_symbol().cloned();
            cursor += 1;
            let Some(sym) = next else { continue };
            if sym.is_terminal() {
                continue;
            }
            for rule in grammar.rules_for(&sym) {
                items.insert(Item::from_rule(rule));
            }
        }
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// The successor state under `sym`: advance every item whose dot sits
    /// before `sym`, then close.
    pub fn goto(&self, sym: &Symbol, grammar: &Grammar) -> Self {
        let kernel = self
            .items
            .iter()
            .filter(|item| item.next_symbol() == Some(sym))
            .map(Item::advanced);
        Self::closure_of(kernel, grammar)
    }

    /// Every symbol that appears immediately after a dot.
    pub fn next_symbols(&self) -> Set<Symbol> {
        self.items
            .iter()
            .filter_map(|item| item.next_symbol().cloned())
            .collect()
    }

    /// Split into `(reduce_items, shift_items)`: items with the dot at the
    /// end versus items still expecting a symbol.
    pub fn partition(&self) -> (Vec<&Item>, Vec<&Item>) {
        self.items.iter().partition(|item| item.is_reduce())
    }

    /// The reduce items in set order.
    pub fn reduce_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| item.is_reduce())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.items.contains(item)
    }

    fn sorted(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.iter().collect();
        items.sort();
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arithmetic() -> Grammar {
        Grammar::from_source(
            r#"
token Integer int ;
EInt. Exp ::= Integer ;
ESub. Exp ::= Exp "-" Exp ;
"#,
        )
        .unwrap()
    }

    fn initial(grammar: &Grammar) -> ItemSet {
        ItemSet::closure_of([Item::from_rule(&grammar.accept_rule())], grammar)
    }

    #[test]
    fn closure_pulls_in_rules_of_dotted_nonterminals() {
        let g = arithmetic();
        let set = initial(&g);
        // S' -> . Exp, plus both Exp rules.
        assert_eq!(set.len(), 3);
        for rule in &g.rules {
            assert!(set.contains(&Item::from_rule(rule)));
        }
    }

    #[test]
    fn closure_is_idempotent() {
        let g = arithmetic();
        let set = initial(&g);
        let again = ItemSet::closure_of(set.iter().cloned(), &g);
        assert_eq!(set, again);
    }

    #[test]
    fn goto_advances_and_closes() {
        let g = arithmetic();
        let exp = Symbol::nonterminal("Exp", 0);
        let set = initial(&g).goto(&exp, &g);
        // S' -> Exp . and ESub with the dot past the first Exp.
        assert_eq!(set.len(), 2);
        assert!(set.iter().any(|item| item.lhs.is_accept() && item.is_reduce()));
        assert!(set
            .iter()
            .any(|item| item.before.len() == 1 && item.after.len() == 2));
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let g = arithmetic();
        let set = initial(&g);
        let mut reversed: Vec<Item> = set.iter().cloned().collect();
        reversed.reverse();
        let other = ItemSet { items: reversed };
        assert_eq!(set, other);

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let digest = |set: &ItemSet| {
            let mut hasher = DefaultHasher::new();
            set.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(digest(&set), digest(&other));
    }

    #[test]
    fn duplicate_rules_collapse_into_one_item() {
        let g = Grammar::from_source(
            r#"
token Integer int ;
EInt. Exp1 ::= Integer ;
_. Exp ::= Exp1 ;
coercions Exp 1 ;
"#,
        )
        .unwrap();
        // The user coercion and the macro-generated one are the same rule,
        // so the closure holds a single `Exp -> . Exp1` item.
        let set = ItemSet::closure_of([Item::from_rule(&g.accept_rule())], &g);
        let count = set
            .iter()
            .filter(|item| item.ctor == Constructor::Wild && item.lhs.name == "Exp")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn partition_splits_on_the_dot() {
        let g = arithmetic();
        let exp = Symbol::nonterminal("Exp", 0);
        let set = initial(&g).goto(&exp, &g);
        let (reduces, shifts) = set.partition();
        assert_eq!(reduces.len(), 1);
        assert_eq!(shifts.len(), 1);
        assert!(reduces[0].lhs.is_accept());
    }

    #[test]
    fn next_symbols_of_initial_state() {
        let g = arithmetic();
        let set = initial(&g);
        let next = set.next_symbols();
        assert!(next.contains(&Symbol::nonterminal("Exp", 0)));
        assert!(next.contains(&Symbol::terminal("Integer", crate::grammar::TermKind::Int)));
        assert_eq!(next.len(), 2);
    }
}
