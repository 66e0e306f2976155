//! Structural invariants checked across the whole fixture set.

use glrgen::automaton::Automaton;
use glrgen::grammar::{Grammar, Symbol};
use glrgen::item::ItemSet;
use glrgen::types::Set;
use glrgen_tests::grammars;

fn fixtures() -> impl Iterator<Item = (&'static str, Grammar)> {
    grammars::ALL.iter().map(|(name, source)| {
        let grammar = Grammar::from_source(source)
            .unwrap_or_else(|err| panic!("fixture {name} failed to normalize: {err}"));
        (*name, grammar)
    })
}

#[test]
fn symbols_are_unique_and_closed() {
    for (name, grammar) in fixtures() {
        let mut keys = Set::default();
        for sym in grammar.terminals.iter().chain(&grammar.nonterminals) {
            assert!(
                keys.insert((sym.name.clone(), sym.level)),
                "{name}: duplicate symbol {sym}"
            );
        }

        let known: Set<&Symbol> = grammar
            .terminals
            .iter()
            .chain(&grammar.nonterminals)
            .collect();
        for rule in &grammar.rules {
            assert!(known.contains(&rule.lhs), "{name}: unknown lhs {}", rule.lhs);
            for sym in &rule.rhs {
                assert!(known.contains(sym), "{name}: unknown rhs symbol {sym}");
            }
        }
    }
}

#[test]
fn start_is_the_first_rule_head() {
    for (name, grammar) in fixtures() {
        assert_eq!(grammar.start, grammar.rules[0].lhs, "{name}");
    }
}

#[test]
fn every_state_is_closed() {
    for (name, grammar) in fixtures() {
        let automaton = Automaton::build(&grammar);
        for (id, set) in automaton.states() {
            let reclosed = ItemSet::closure_of(set.iter().cloned(), &grammar);
            assert_eq!(*set, reclosed, "{name}: state {id} is not closed");
        }
    }
}

#[test]
fn transitions_are_total_and_stable() {
    for (name, grammar) in fixtures() {
        let automaton = Automaton::build(&grammar);
        for (id, set) in automaton.states() {
            for symbol in set.next_symbols() {
                let edges: Vec<_> = automaton
                    .transitions_from(id)
                    .filter(|t| t.symbol == symbol)
                    .collect();
                assert_eq!(
                    edges.len(),
                    1,
                    "{name}: state {id} must have exactly one edge on {symbol}"
                );
                let recomputed = set.goto(&symbol, &grammar);
                assert_eq!(
                    recomputed,
                    *automaton.state(edges[0].to),
                    "{name}: goto disagrees with the edge on {symbol}"
                );
            }
        }
    }
}

#[test]
fn reduce_items_cover_only_grammar_rules() {
    for (name, grammar) in fixtures() {
        let automaton = Automaton::build(&grammar);
        let accept = grammar.accept_rule();
        for (id, set) in automaton.states() {
            for item in set.reduce_items() {
                let rule = item.rule();
                assert!(
                    rule == accept || grammar.rules.contains(&rule),
                    "{name}: state {id} reduces by a rule outside the grammar: {}",
                    rule.display()
                );
            }
        }
    }
}

#[test]
fn exploration_order_does_not_change_the_state_count() {
    // Rebuilding is deterministic; the pool numbering depends only on the
    // grammar, with state 0 always the start closure.
    for (name, grammar) in fixtures() {
        let first = Automaton::build(&grammar);
        let second = Automaton::build(&grammar);
        assert_eq!(first.len(), second.len(), "{name}");
        for (a, b) in first.transitions().iter().zip(second.transitions()) {
            assert_eq!(a, b, "{name}");
        }
    }
}
