//! GLR parser code generation.
//!
//! The emitted module keeps one function per state with outgoing edges
//! (`shift_n`), one per reduce item (`reduce_n_i`), a `go` dispatcher over
//! state numbers and a driver `loop` carrying a list of `(state, stack)`
//! configurations. Conflicts never fail: a state that can shift and reduce
//! simply contributes several successor configurations, and dead
//! configurations vanish by returning the empty list. A stack reduced all
//! the way to the start symbol parks under the sentinel state `~1` until
//! end of input.

use crate::automaton::{Automaton, StateId};
use crate::emit::{self, Clause, DataBind, Decl, Exp, FunBind, Spec};
use crate::grammar::{Constructor, Grammar, Symbol, TermKind};
use crate::item::Item;
use crate::schema::{AstSchema, FieldType};
use std::fmt;

pub struct Codegen<'g> {
    grammar: &'g Grammar,
    automaton: &'g Automaton,
    schema: &'g AstSchema,
}

impl<'g> Codegen<'g> {
    pub fn new(grammar: &'g Grammar, automaton: &'g Automaton, schema: &'g AstSchema) -> Self {
        Self {
            grammar,
            automaton,
            schema,
        }
    }

    fn decls(&self) -> Vec<Decl> {
        vec![
            Decl::Raw("(* Generated by glrgen. Do not edit. *)".into()),
            self.token_structure(),
            self.lexer_signature(),
            self.parser_functor(),
        ]
    }

    /// `structure Token`: one case per terminal, end-of-input included.
    fn token_structure(&self) -> Decl {
        let mut ctors = vec![("EOF".to_owned(), vec![])];
        for sym in &self.grammar.terminals {
            ctors.push((term_ctor(sym), attr_args(sym)));
        }
        Decl::Structure {
            name: "Token".into(),
            decls: vec![Decl::Data(vec![DataBind {
                name: "t".into(),
                ctors,
            }])],
        }
    }

    fn lexer_signature(&self) -> Decl {
        Decl::Signature {
            name: "LEXER".into(),
            specs: vec![
                Spec::Type {
                    name: "sourcemap".into(),
                    definition: None,
                },
                Spec::Type {
                    name: "strm".into(),
                    definition: None,
                },
                Spec::EqType { name: "pos".into() },
                Spec::Type {
                    name: "span".into(),
                    definition: Some("pos * pos".into()),
                },
                Spec::EqType { name: "tok".into() },
                Spec::Val {
                    name: "lex".into(),
                    ty: "sourcemap * strm -> tok * span * strm".into(),
                },
                Spec::Val {
                    name: "getPos".into(),
                    ty: "strm -> pos".into(),
                },
            ],
        }
    }

    fn parser_functor(&self) -> Decl {
        let mut decls = vec![self.ast_structure(), self.category_datatype()];
        decls.push(self.from_token_fun());
        decls.push(Decl::Fun(self.machine_funs()));
        decls.push(self.loop_fun());
        decls.push(self.parse_fun());
        Decl::Functor {
            name: "Parser".into(),
            param: "Lex".into(),
            param_sig: "LEXER where type tok = Token.t".into(),
            decls,
        }
    }

    /// `structure Ast`: the mutually recursive sum types of the schema.
    fn ast_structure(&self) -> Decl {
        let mut decls = vec![Decl::Raw("type span = Lex.pos * Lex.pos".into())];
        let binds: Vec<DataBind> = self
            .schema
            .types
            .iter()
            .map(|(base, cases)| DataBind {
                name: ast_type(base),
                ctors: cases
                    .iter()
                    .map(|case| {
                        let mut args = vec!["span".to_owned()];
                        args.extend(case.fields.iter().map(field_ty));
                        (case.ctor.clone(), args)
                    })
                    .collect(),
            })
            .collect();
        if !binds.is_empty() {
            decls.push(Decl::Data(binds));
        }
        Decl::Structure {
            name: "Ast".into(),
            decls,
        }
    }

    /// `datatype cat`: the union of every terminal and nonterminal, the
    /// element type of parse stacks.
    fn category_datatype(&self) -> Decl {
        let mut ctors = vec![("EOF".to_owned(), vec![])];
        for sym in &self.grammar.terminals {
            ctors.push((term_ctor(sym), attr_args(sym)));
        }
        for sym in &self.grammar.nonterminals {
            ctors.push((nt_ctor(sym), vec![self.value_ty(sym)]));
        }
        Decl::Data(vec![DataBind {
            name: "cat".into(),
            ctors,
        }])
    }

    fn from_token_fun(&self) -> Decl {
        let mut arms = vec![("Token.EOF".to_owned(), Exp::atom("EOF"))];
        for sym in &self.grammar.terminals {
            let ctor = term_ctor(sym);
            if sym.carries_value() {
                arms.push((
                    format!("Token.{ctor} v"),
                    Exp::app(ctor.clone(), vec![Exp::atom("v")]),
                ));
            } else {
                arms.push((format!("Token.{ctor}"), Exp::atom(ctor.clone())));
            }
        }
        Decl::Fun(vec![FunBind {
            name: "from_token".into(),
            clauses: vec![Clause {
                pattern: "t".into(),
                body: Exp::Case {
                    scrutinee: Box::new(Exp::atom("t")),
                    arms,
                },
            }],
        }])
    }

    /// The mutually recursive state machine: shifts, reduces and `go`.
    fn machine_funs(&self) -> Vec<FunBind> {
        let mut binds = Vec::new();
        for (id, set) in self.automaton.states() {
            let (reduces, shifts) = set.partition();
            if !shifts.is_empty() {
                binds.push(self.shift_fun(id));
            }
            for (i, item) in reduces.into_iter().enumerate() {
                binds.push(self.reduce_fun(id, i, item));
            }
        }
        binds.push(self.go_fun());
        binds
    }

    fn shift_fun(&self, id: StateId) -> FunBind {
        let mut arms = Vec::new();
        for t in self.automaton.transitions_from(id) {
            arms.push((self.shift_pattern(&t.symbol), self.successors(t.to)));
        }
        arms.push(("_".to_owned(), Exp::atom("[]")));
        FunBind {
            name: format!("shift_{id}"),
            clauses: vec![Clause {
                pattern: "(stack, cat, (p0, p1))".into(),
                body: Exp::Let {
                    binds: vec![(
                        "item".into(),
                        Exp::Tuple(vec![
                            Exp::atom("cat"),
                            Exp::atom("p0"),
                            Exp::atom(id.to_string()),
                        ]),
                    )],
                    body: Box::new(Exp::Case {
                        scrutinee: Box::new(Exp::atom("cat")),
                        arms,
                    }),
                },
            }],
        }
    }

    /// The category pattern a transition matches on.
    fn shift_pattern(&self, sym: &Symbol) -> String {
        let ctor = cat_ctor(sym);
        if sym.carries_value() {
            format!("{ctor} _")
        } else {
            ctor
        }
    }

    /// Configurations produced when a stack enters `to`: the shifted stack
    /// itself if the state can move on, plus one reduce call per completed
    /// item, in set order.
    fn successors(&self, to: StateId) -> Exp {
        let mut parts = Vec::new();
        if self.automaton.has_shift(to) {
            parts.push(Exp::List(vec![Exp::Tuple(vec![
                Exp::atom(to.to_string()),
                Exp::atom("item :: stack"),
            ])]));
        }
        for (i, _) in self.automaton.state(to).reduce_items().enumerate() {
            parts.push(Exp::app(
                format!("reduce_{to}_{i}"),
                vec![Exp::atom("item :: stack"), Exp::atom("p1")],
            ));
        }
        Exp::Append(parts)
    }

    fn reduce_fun(&self, id: StateId, index: usize, item: &Item) -> FunBind {
        let name = format!("reduce_{id}_{index}");

        if item.lhs.is_accept() {
            return FunBind {
                name,
                clauses: vec![Clause {
                    pattern: "(stack, _)".into(),
                    body: Exp::List(vec![Exp::Tuple(vec![
                        Exp::atom("~1"),
                        Exp::atom("stack"),
                    ])]),
                }],
            };
        }

        let rhs = &item.before;
        let vars: Vec<Option<String>> = {
            let mut counter = 0;
            rhs.iter()
                .map(|sym| {
                    sym.carries_value().then(|| {
                        let var = format!("v{counter}");
                        counter += 1;
                        var
                    })
                })
                .collect()
        };
        let bound: Vec<&String> = vars.iter().flatten().collect();

        if rhs.is_empty() {
            // Nothing to pop: reduce in place and leave from this very state.
            let value = self.semantic_value(item, &bound, "(p, p)");
            let body = Exp::app(
                "go",
                vec![
                    Exp::atom(id.to_string()),
                    Exp::atom("stack"),
                    Exp::app(nt_ctor(&item.lhs), vec![value]),
                    Exp::atom("(p, p)"),
                ],
            );
            return FunBind {
                name,
                clauses: vec![Clause {
                    pattern: "(stack, p)".into(),
                    body,
                }],
            };
        }

        // The stack pattern lists popped items topmost first; the leftmost
        // one carries the state to return to and the span start.
        let mut entries: Vec<String> = rhs
            .iter()
            .zip(&vars)
            .enumerate()
            .map(|(idx, (sym, var))| {
                let core = match var {
                    Some(var) => format!("{} {var}", cat_ctor(sym)),
                    None => cat_ctor(sym),
                };
                if idx == 0 {
                    format!("({core}, p0, st0)")
                } else {
                    format!("({core}, _, _)")
                }
            })
            .collect();
        entries.reverse();
        let pattern = format!("{} :: rest", entries.join(" :: "));

        let value = self.semantic_value(item, &bound, "(p0, p)");
        let call = Exp::app(
            "go",
            vec![
                Exp::atom("st0"),
                Exp::atom("rest"),
                Exp::app(nt_ctor(&item.lhs), vec![value]),
                Exp::atom("(p0, p)"),
            ],
        );
        FunBind {
            name,
            clauses: vec![Clause {
                pattern: "(stack, p)".into(),
                body: Exp::Case {
                    scrutinee: Box::new(Exp::atom("stack")),
                    arms: vec![(pattern, call), ("_".to_owned(), Exp::atom("[]"))],
                },
            }],
        }
    }

    /// The value the reduced nonterminal carries, per constructor.
    fn semantic_value(&self, item: &Item, vars: &[&String], span: &str) -> Exp {
        match &item.ctor {
            Constructor::Named(ctor) => {
                let mut args = vec![Exp::atom(span)];
                args.extend(vars.iter().map(|v| Exp::atom(v.as_str())));
                Exp::app(format!("Ast.{ctor}"), args)
            }
            Constructor::Wild => Exp::atom(vars[0].as_str()),
            Constructor::ListEmpty => Exp::atom("[]"),
            Constructor::ListOne => Exp::List(vec![Exp::atom(vars[0].as_str())]),
            Constructor::ListCons => Exp::atom(format!("{} :: {}", vars[0], vars[1])),
        }
    }

    fn go_fun(&self) -> FunBind {
        let mut arms = Vec::new();
        for (id, _) in self.automaton.states() {
            if self.automaton.has_shift(id) {
                arms.push((
                    id.to_string(),
                    Exp::app(
                        format!("shift_{id}"),
                        vec![Exp::atom("stack"), Exp::atom("cat"), Exp::atom("sp")],
                    ),
                ));
            }
        }
        arms.push(("_".to_owned(), Exp::atom("[]")));
        FunBind {
            name: "go".into(),
            clauses: vec![Clause {
                pattern: "(st, stack, cat, sp)".into(),
                body: Exp::Case {
                    scrutinee: Box::new(Exp::atom("st")),
                    arms,
                },
            }],
        }
    }

    fn loop_fun(&self) -> Decl {
        let accept = format!(
            "(fn (~1, ({} v, _, _) :: _) => SOME v | _ => NONE)",
            nt_ctor(&self.grammar.start)
        );
        let eof_arm = Exp::atom(format!("List.mapPartial {accept} stacks"));
        let step = Exp::Let {
            binds: vec![
                ("cat".into(), Exp::app("from_token", vec![Exp::atom("tok")])),
                (
                    "next".into(),
                    Exp::atom(
                        "List.concat (List.map (fn (st, stack) => go (st, stack, cat, sp)) stacks)",
                    ),
                ),
            ],
            body: Box::new(Exp::app(
                "loop",
                vec![Exp::atom("sm"), Exp::atom("next"), Exp::atom("strm'")],
            )),
        };
        Decl::Fun(vec![FunBind {
            name: "loop".into(),
            clauses: vec![Clause {
                pattern: "(sm, stacks, strm)".into(),
                body: Exp::Let {
                    binds: vec![
                        ("p".into(), Exp::app("Lex.getPos", vec![Exp::atom("strm")])),
                        (
                            "(tok, sp, strm')".into(),
                            Exp::app("Lex.lex", vec![Exp::atom("sm"), Exp::atom("strm")]),
                        ),
                    ],
                    body: Box::new(Exp::Case {
                        scrutinee: Box::new(Exp::atom("tok")),
                        arms: vec![("Token.EOF".to_owned(), eof_arm), ("_".to_owned(), step)],
                    }),
                },
            }],
        }])
    }

    fn parse_fun(&self) -> Decl {
        let mut stacks = vec![Exp::List(vec![Exp::Tuple(vec![
            Exp::atom("0"),
            Exp::atom("[]"),
        ])])];
        let start = self.automaton.start();
        for (i, _) in self.automaton.state(start).reduce_items().enumerate() {
            stacks.push(Exp::app(
                format!("reduce_{start}_{i}"),
                vec![Exp::atom("[]"), Exp::atom("p")],
            ));
        }
        Decl::Fun(vec![FunBind {
            name: "parse".into(),
            clauses: vec![Clause {
                pattern: "(sm, strm)".into(),
                body: Exp::Let {
                    binds: vec![
                        ("p".into(), Exp::app("Lex.getPos", vec![Exp::atom("strm")])),
                        ("stacks".into(), Exp::Append(stacks)),
                    ],
                    body: Box::new(Exp::app(
                        "loop",
                        vec![Exp::atom("sm"), Exp::atom("stacks"), Exp::atom("strm")],
                    )),
                },
            }],
        }])
    }

    /// The type text of the value a nonterminal carries in `cat`.
    fn value_ty(&self, sym: &Symbol) -> String {
        let elem = self
            .grammar
            .terminals
            .iter()
            .find(|t| t.name == sym.name)
            .map(|t| match t.term_kind() {
                Some(TermKind::Int) => "int".to_owned(),
                Some(TermKind::String) => "string".to_owned(),
                Some(TermKind::Char) => "char".to_owned(),
                Some(TermKind::Real) => "real".to_owned(),
                _ => "unit".to_owned(),
            })
            .unwrap_or_else(|| format!("Ast.{}", ast_type(sym.base())));
        let mut ty = elem;
        for _ in 0..sym.level {
            ty.push_str(" list");
        }
        ty
    }
}

impl fmt::Display for Codegen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&emit::render(&self.decls()))
    }
}

/// The token constructor for a terminal: declared names pass through,
/// literal spellings are mangled into identifiers.
fn term_ctor(sym: &Symbol) -> String {
    if sym.is_eoi() {
        return "EOF".into();
    }
    if is_ident(&sym.name) {
        sym.name.clone()
    } else {
        literal_ctor(&sym.name)
    }
}

fn nt_ctor(sym: &Symbol) -> String {
    format!("NT_{}{}", "L".repeat(sym.level as usize), sym.name)
}

fn cat_ctor(sym: &Symbol) -> String {
    if sym.is_terminal() {
        term_ctor(sym)
    } else {
        nt_ctor(sym)
    }
}

fn attr_args(sym: &Symbol) -> Vec<String> {
    match sym.term_kind() {
        Some(TermKind::Int) => vec!["int".into()],
        Some(TermKind::String) => vec!["string".into()],
        Some(TermKind::Char) => vec!["char".into()],
        Some(TermKind::Real) => vec!["real".into()],
        _ => vec![],
    }
}

fn field_ty(field: &FieldType) -> String {
    match field {
        FieldType::Int => "int".into(),
        FieldType::String => "string".into(),
        FieldType::Char => "char".into(),
        FieldType::Real => "real".into(),
        FieldType::Node { base, lists } => {
            let mut ty = ast_type(base);
            for _ in 0..*lists {
                ty.push_str(" list");
            }
            ty
        }
    }
}

/// The ML type name for a category base: lowercased, nudged off reserved
/// words.
fn ast_type(base: &str) -> String {
    let name = base.to_lowercase();
    if is_reserved(&name) {
        format!("{name}'")
    } else {
        name
    }
}

fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        "and" | "as" | "case" | "datatype" | "do" | "else" | "end" | "exception" | "fn"
            | "fun" | "handle" | "if" | "in" | "let" | "local" | "of" | "op" | "open"
            | "orelse" | "raise" | "rec" | "then" | "type" | "val" | "while" | "with"
    )
}

fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .map_or(false, |ch| ch == '_' || unicode_ident::is_xid_start(ch))
        && chars.all(unicode_ident::is_xid_continue)
}

/// A stable identifier for a literal terminal's spelling.
fn literal_ctor(lit: &str) -> String {
    let parts: Vec<String> = lit.chars().map(char_name).collect();
    format!("SYM_{}", parts.join("_"))
}

fn char_name(ch: char) -> String {
    match ch {
        '+' => "PLUS".into(),
        '-' => "MINUS".into(),
        '*' => "STAR".into(),
        '/' => "SLASH".into(),
        '(' => "LPAREN".into(),
        ')' => "RPAREN".into(),
        '[' => "LBRACK".into(),
        ']' => "RBRACK".into(),
        '{' => "LBRACE".into(),
        '}' => "RBRACE".into(),
        ',' => "COMMA".into(),
        ';' => "SEMI".into(),
        ':' => "COLON".into(),
        '.' => "DOT".into(),
        '=' => "EQ".into(),
        '<' => "LT".into(),
        '>' => "GT".into(),
        '|' => "BAR".into(),
        '&' => "AMP".into(),
        '!' => "BANG".into(),
        '?' => "QUEST".into(),
        '@' => "AT".into(),
        '#' => "HASH".into(),
        '%' => "PERCENT".into(),
        '^' => "CARET".into(),
        '~' => "TILDE".into(),
        ch if ch.is_alphanumeric() || ch == '_' => ch.to_string(),
        ch => format!("U{:04X}", ch as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(source: &str) -> String {
        let grammar = Grammar::from_source(source).unwrap();
        let automaton = Automaton::build(&grammar);
        let schema = AstSchema::derive(&grammar);
        Codegen::new(&grammar, &automaton, &schema).to_string()
    }

    #[test]
    fn emits_the_module_skeleton() {
        let out = generate(
            r#"
token Integer int ;
EInt. Exp ::= Integer ;
ESub. Exp ::= Exp "-" Exp ;
"#,
        );
        assert!(out.contains("structure Token = struct"));
        assert!(out.contains("datatype t = EOF | Integer of int | SYM_MINUS"));
        assert!(out.contains("signature LEXER = sig"));
        assert!(out.contains("functor Parser (Lex : LEXER where type tok = Token.t) = struct"));
        assert!(out.contains("type span = Lex.pos * Lex.pos"));
        assert!(out.contains("EInt of span * int"));
        assert!(out.contains("ESub of span * exp * exp"));
        assert!(out.contains("NT_Exp of Ast.exp"));
        assert!(out.contains("fun from_token t ="));
        assert!(out.contains("Token.Integer v => Integer v"));
        assert!(out.contains("fun shift_0 (stack, cat, (p0, p1)) ="));
        assert!(out.contains("and go (st, stack, cat, sp) ="));
        assert!(out.contains("fun parse (sm, strm) ="));
    }

    #[test]
    fn accept_reduce_parks_under_the_sentinel() {
        let out = generate(
            r#"
token Integer int ;
EInt. Exp ::= Integer ;
"#,
        );
        assert!(out.contains("[(~1, stack)]"));
        assert!(out.contains("(fn (~1, (NT_Exp v, _, _) :: _) => SOME v | _ => NONE)"));
    }

    #[test]
    fn named_reduce_builds_the_node_and_returns_through_go() {
        let out = generate(
            r#"
token Integer int ;
EInt. Exp ::= Integer ;
ESub. Exp ::= Exp "-" Exp ;
"#,
        );
        assert!(out
            .contains("(NT_Exp v1, _, _) :: (SYM_MINUS, _, _) :: (NT_Exp v0, p0, st0) :: rest"));
        assert!(out.contains("go (st0, rest, NT_Exp (Ast.ESub ((p0, p), v0, v1)), (p0, p))"));
    }

    #[test]
    fn list_rules_use_list_values() {
        let out = generate(
            r#"
token Integer int ;
Start. S ::= [Exp] ;
EInt. Exp ::= Integer ;
separator Exp "," ;
"#,
        );
        assert!(out.contains("NT_LExp of Ast.exp list"));
        assert!(out.contains("NT_LExp (v0 :: v1)"));
        assert!(out.contains("NT_LExp [v0]"));
        assert!(out.contains("NT_LExp []"));
    }

    #[test]
    fn empty_reduce_in_the_start_state_seeds_parse() {
        // The start symbol derives the empty list, so state 0 owns an
        // epsilon reduce and `parse` must fire it before the first token.
        let out = generate(
            r#"
token Integer int ;
Start. S ::= [Exp] ;
EInt. Exp ::= Integer ;
separator Exp "," ;
"#,
        );
        assert!(out.contains("[(0, [])] @ reduce_0_0 ([], p)"));
    }

    #[test]
    fn reduce_only_states_have_no_shift_function() {
        let out = generate(
            r#"
token Integer int ;
EInt. Exp ::= Integer ;
"#,
        );
        // Three states: start, after Integer (reduce only), after Exp
        // (accept reduce only). Only the start state can shift.
        assert!(out.contains("fun shift_0"));
        assert!(!out.contains("shift_1 ("));
        assert!(!out.contains("shift_2 ("));
        assert!(out.contains("reduce_1_0"));
        assert!(out.contains("reduce_2_0"));
    }

    #[test]
    fn wildcard_reduce_passes_the_value_through() {
        let out = generate(
            r#"
token Integer int ;
EInt. Exp1 ::= Integer ;
_. Exp ::= Exp1 ;
coercions Exp 1 ;
"#,
        );
        assert!(out.contains("NT_Exp v0"));
        assert!(out.contains("SYM_LPAREN"));
        assert!(out.contains("SYM_RPAREN"));
    }

    #[test]
    fn literal_mangling_is_stable() {
        assert_eq!(literal_ctor("+"), "SYM_PLUS");
        assert_eq!(literal_ctor("::="), "SYM_COLON_COLON_EQ");
        assert_eq!(literal_ctor("<-"), "SYM_LT_MINUS");
    }

    #[test]
    fn keyword_literals_keep_their_declared_name() {
        let out = generate(
            r#"
token KwIf "if" ;
token Integer int ;
EIf. Exp ::= KwIf Exp Exp ;
EInt. Exp ::= Integer ;
"#,
        );
        assert!(out.contains("| KwIf"));
        assert!(!out.contains("SYM_i_f"));
    }
}
