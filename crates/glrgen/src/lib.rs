//! A GLR parser generator for labelled BNF grammars.
//!
//! The pipeline is a pure transformation: the grammar file is parsed into an
//! abstract tree ([`syntax`]), normalized into flat rules over a canonical
//! symbol table ([`grammar`]), lifted into the LR(0) item-set automaton
//! ([`item`], [`automaton`]), and finally written out as a generalized LR
//! parser ([`schema`], [`codegen`]) that explores every viable stack in
//! parallel instead of rejecting ambiguous grammars.

pub mod automaton;
pub mod build;
pub mod codegen;
pub mod emit;
pub mod grammar;
pub mod item;
pub mod pool;
pub mod schema;
pub mod syntax;
pub mod types;
pub mod util;
