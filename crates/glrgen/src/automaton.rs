//! LR(0) automaton construction.
//!
//! States are item sets interned to dense numbers through a [`Pool`]; the
//! worklist keeps expanding freshly interned states until no transition
//! discovers a new one. The item universe is finite, so the loop terminates.

use crate::grammar::{Grammar, Symbol};
use crate::item::{Item, ItemSet};
use crate::pool::Pool;
use crate::util::display_fn;
use std::{collections::VecDeque, fmt};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s#{:03}", self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: StateId,
    pub symbol: Symbol,
    pub to: StateId,
}

#[derive(Debug)]
pub struct Automaton {
    states: Pool<ItemSet>,
    transitions: Vec<Transition>,
}

impl Automaton {
    /// Build the canonical LR(0) collection for `grammar`, with state 0 the
    /// closure of the virtual item `S' -> . start`.
    pub fn build(grammar: &Grammar) -> Self {
        let accept = grammar.accept_rule();
        let initial = ItemSet::closure_of([Item::from_rule(&accept)], grammar);

        let mut states: Pool<ItemSet> = Pool::new();
        let (start_id, _) = states.intern(initial);
        let mut transitions = Vec::new();
        let mut pending = VecDeque::from([StateId(start_id)]);

        while let Some(from) = pending.pop_front() {
            let set = states.value_of(from.raw()).clone();
            for symbol in set.next_symbols() {
                let successor = set.goto(&symbol, grammar);
                let (id, is_new) = states.intern(successor);
                let to = StateId(id);
                transitions.push(Transition { from, symbol, to });
                if is_new {
                    pending.push_back(to);
                }
            }
        }

        tracing::debug!(
            states = states.len(),
            transitions = transitions.len(),
            "LR(0) automaton built"
        );

        Self {
            states,
            transitions,
        }
    }

    pub fn start(&self) -> StateId {
        StateId(0)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &ItemSet)> + '_ {
        self.states.entries().map(|(id, set)| (StateId(id), set))
    }

    pub fn state(&self, id: StateId) -> &ItemSet {
        self.states.value_of(id.raw())
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn transitions_from(&self, from: StateId) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions.iter().filter(move |t| t.from == from)
    }

    /// The successor of `from` under `symbol`, if the edge exists.
    pub fn target(&self, from: StateId, symbol: &Symbol) -> Option<StateId> {
        self.transitions
            .iter()
            .find(|t| t.from == from && t.symbol == *symbol)
            .map(|t| t.to)
    }

    /// Whether the state has at least one outgoing edge.
    pub fn has_shift(&self, id: StateId) -> bool {
        self.transitions.iter().any(|t| t.from == id)
    }

    /// Human-readable dump of every state's items and edges.
    pub fn display(&self) -> impl fmt::Display + '_ {
        display_fn(|f| {
            for (id, set) in self.states() {
                writeln!(f, "state {id}:")?;
                for item in set.iter() {
                    writeln!(f, "  {}", item.display())?;
                }
                for t in self.transitions_from(id) {
                    writeln!(f, "  {} => {}", t.symbol, t.to)?;
                }
            }
            Ok(())
        })
    }

    /// Graphviz rendering of the state graph.
    pub fn dot(&self) -> impl fmt::Display + '_ {
        display_fn(|f| {
            writeln!(f, "digraph automaton {{")?;
            writeln!(f, "  rankdir = LR;")?;
            writeln!(f, "  node [shape = box, fontname = monospace];")?;
            for (id, set) in self.states() {
                write!(f, "  s{id} [label = \"{id}")?;
                for item in set.iter() {
                    let line = item.display().to_string().replace('"', "\\\"");
                    write!(f, "\\n{line}")?;
                }
                writeln!(f, "\"];")?;
            }
            for t in &self.transitions {
                let label = t.symbol.to_string().replace('"', "\\\"");
                writeln!(f, "  s{} -> s{} [label = \"{label}\"];", t.from, t.to)?;
            }
            writeln!(f, "}}")
        })
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

    #[test]
    fn state_zero_is_the_start_closure() {
        let g = arithmetic();
        let automaton = Automaton::build(&g);
        let expected = ItemSet::closure_of([Item::from_rule(&g.accept_rule())], &g);
        assert_eq!(*automaton.state(automaton.start()), expected);
    }

    #[test]
    fn edges_are_unique_per_symbol() {
        let g = arithmetic();
        let automaton = Automaton::build(&g);
        for (id, _) in automaton.states() {
            let mut seen = crate::types::Set::default();
            for t in automaton.transitions_from(id) {
                assert!(
                    seen.insert(t.symbol.clone()),
                    "duplicate edge on {} from state {}",
                    t.symbol,
                    id
                );
            }
        }
    }

    #[test]
    fn every_target_is_interned() {
        let g = arithmetic();
        let automaton = Automaton::build(&g);
        for t in automaton.transitions() {
            assert!((t.to.raw() as usize) < automaton.len());
        }
    }

    #[test]
    fn goto_recomputation_matches_edges() {
        let g = arithmetic();
        let automaton = Automaton::build(&g);
        for t in automaton.transitions() {
            let recomputed = automaton.state(t.from).goto(&t.symbol, &g);
            assert_eq!(recomputed, *automaton.state(t.to));
        }
    }

    #[test]
    fn ambiguous_grammars_build_without_complaint() {
        // ESub is left- and right-recursive at once; the automaton must
        // carry the shift/reduce conflict rather than reject it.
        let g = arithmetic();
        let automaton = Automaton::build(&g);
        let conflicted = automaton.states().any(|(id, set)| {
            set.reduce_items().next().is_some() && automaton.has_shift(id)
        });
        assert!(conflicted);
    }
}
