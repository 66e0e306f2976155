//! A reference interpreter for the generated GLR driver.
//!
//! Executes the same automaton the emitter walks, with the same list-of-
//! configurations semantics: a stack entry is `(value, from_pos, state)`,
//! entering a state appends its shifted configuration plus one reduce result
//! per completed item, and a stack that reduces the start symbol parks under
//! an accept sentinel until end of input. Scenario tests use it to count
//! parses and inspect the values an emitted parser would build.

use glrgen::automaton::{Automaton, StateId};
use glrgen::grammar::{Constructor, Grammar, Symbol};
use glrgen::item::Item;
use std::fmt::Write as _;

/// A semantic value, mirroring what the emitted parser constructs.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Node {
        ctor: String,
        span: (usize, usize),
        children: Vec<Value>,
    },
    Int(i64),
    Str(String),
    Chr(char),
    Real(f64),
    List(Vec<Value>),
}

impl Value {
    /// Compact span-free rendering for assertions: `ESub(EInt(1), EInt(2))`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Value::Node { ctor, children, .. } => {
                out.push_str(ctor);
                if !children.is_empty() {
                    out.push('(');
                    for (i, child) in children.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        child.render_into(out);
                    }
                    out.push(')');
                }
            }
            Value::Int(n) => {
                let _ = write!(out, "{n}");
            }
            Value::Str(s) => out.push_str(s),
            Value::Chr(ch) => {
                let _ = write!(out, "{ch:?}");
            }
            Value::Real(x) => {
                let _ = write!(out, "{x}");
            }
            Value::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render_into(out);
                }
                out.push(']');
            }
        }
    }
}

/// A lexed token offered to the engine: the terminal's name (or literal
/// spelling) and its attribute value, if any.
#[derive(Debug, Clone)]
pub struct Token {
    pub name: String,
    pub value: Option<Value>,
}

impl Token {
    pub fn unit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    sym: Symbol,
    value: Option<Value>,
    from: usize,
    state: StateId,
}

#[derive(Debug, Clone)]
struct Config {
    /// `None` is the accept sentinel: the stack finished reducing to the
    /// start symbol and only survives to end of input.
    state: Option<StateId>,
    stack: Vec<Entry>,
}

pub struct Engine<'g> {
    grammar: &'g Grammar,
    automaton: Automaton,
}

impl<'g> Engine<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            automaton: Automaton::build(grammar),
        }
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    /// Run every configuration over the token stream and collect the start
    /// values of the configurations parked on the accept sentinel.
    pub fn parse(&self, tokens: &[Token]) -> Vec<Value> {
        let symbols: Vec<(Symbol, Option<Value>)> = tokens
            .iter()
            .map(|tok| (self.terminal(&tok.name), tok.value.clone()))
            .collect();

        let start = self.automaton.start();
        let mut configs = vec![Config {
            state: Some(start),
            stack: vec![],
        }];
        for item in self.automaton.state(start).reduce_items() {
            configs.extend(self.reduce(start, item, &[], 0));
        }

        for (i, (sym, value)) in symbols.iter().enumerate() {
            let mut next = Vec::new();
            for config in &configs {
                // A stack already parked on the sentinel dies on any input.
                let Some(state) = config.state else { continue };
                next.extend(self.advance(state, &config.stack, sym, value.clone(), i, i + 1));
            }
            configs = next;
        }

        configs
            .into_iter()
            .filter(|config| config.state.is_none())
            .filter_map(|config| config.stack.last().and_then(|entry| entry.value.clone()))
            .collect()
    }

    /// Parse and render every accepted value, sorted for stable comparison.
    pub fn parses(&self, tokens: &[Token]) -> Vec<String> {
        let mut rendered: Vec<String> = self
            .parse(tokens)
            .iter()
            .map(Value::render)
            .collect();
        rendered.sort();
        rendered
    }

    fn terminal(&self, name: &str) -> Symbol {
        self.grammar
            .terminals
            .iter()
            .find(|sym| sym.name == name)
            .unwrap_or_else(|| panic!("token `{name}` is not a terminal of the grammar"))
            .clone()
    }

    /// `go`: move from `state` over `sym`, then fan out into the shifted
    /// configuration and the reduce results of the target state.
    fn advance(
        &self,
        state: StateId,
        stack: &[Entry],
        sym: &Symbol,
        value: Option<Value>,
        from: usize,
        to: usize,
    ) -> Vec<Config> {
        let Some(target) = self.automaton.target(state, sym) else {
            return vec![];
        };
        let mut stack = stack.to_vec();
        stack.push(Entry {
            sym: sym.clone(),
            value,
            from,
            state,
        });

        let mut out = Vec::new();
        if self.automaton.has_shift(target) {
            out.push(Config {
                state: Some(target),
                stack: stack.clone(),
            });
        }
        for item in self.automaton.state(target).reduce_items() {
            out.extend(self.reduce(target, item, &stack, to));
        }
        out
    }

    /// `reduce_n_i`: pop the handle, build the value, return through
    /// [`Engine::advance`] from the uncovered state.
    fn reduce(&self, state: StateId, item: &Item, stack: &[Entry], pos: usize) -> Vec<Config> {
        if item.lhs.is_accept() {
            return vec![Config {
                state: None,
                stack: stack.to_vec(),
            }];
        }

        let arity = item.before.len();
        if stack.len() < arity {
            return vec![];
        }
        let (rest, popped) = stack.split_at(stack.len() - arity);
        if popped
            .iter()
            .zip(&item.before)
            .any(|(entry, expected)| entry.sym != *expected)
        {
            return vec![];
        }

        let (return_state, start_pos) = match popped.first() {
            Some(entry) => (entry.state, entry.from),
            None => (state, pos),
        };
        let values: Vec<&Value> = popped.iter().filter_map(|e| e.value.as_ref()).collect();
        let value = match &item.ctor {
            Constructor::Named(ctor) => Value::Node {
                ctor: ctor.clone(),
                span: (start_pos, pos),
                children: values.into_iter().cloned().collect(),
            },
            Constructor::Wild => values[0].clone(),
            Constructor::ListEmpty => Value::List(vec![]),
            Constructor::ListOne => Value::List(vec![values[0].clone()]),
            Constructor::ListCons => {
                let Value::List(tail) = values[1] else {
                    return vec![];
                };
                let mut list = Vec::with_capacity(tail.len() + 1);
                list.push(values[0].clone());
                list.extend(tail.iter().cloned());
                Value::List(list)
            }
        };

        self.advance(return_state, rest, &item.lhs, Some(value), start_pos, pos)
    }
}
