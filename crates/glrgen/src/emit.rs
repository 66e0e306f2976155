//! Target-neutral emission tree.
//!
//! The code emitter builds declarations out of this small closed vocabulary
//! and the printer renders them with ML-style concrete syntax. Expressions
//! that fit within [`MAX_WIDTH`] columns are inlined into their clause;
//! anything wider is broken over indented lines. Line layout is a rendering
//! decision only, nothing downstream depends on exact whitespace.

/// Column limit for inlining an expression into its clause.
pub const MAX_WIDTH: usize = 70;

const INDENT: &str = "  ";

#[derive(Debug, Clone)]
pub enum Decl {
    /// A batch of mutually recursive sum types, joined with `and`.
    Data(Vec<DataBind>),
    /// A group of mutually recursive function bindings, joined with `and`.
    Fun(Vec<FunBind>),
    /// A value binding.
    Val { name: String, rhs: Exp },
    /// Verbatim declaration text, emitted as-is.
    Raw(String),
    /// A named namespace of declarations.
    Structure { name: String, decls: Vec<Decl> },
    /// An interface: named type and value specifications.
    Signature { name: String, specs: Vec<Spec> },
    /// A module parameterized over an interface.
    Functor {
        name: String,
        param: String,
        param_sig: String,
        decls: Vec<Decl>,
    },
}

#[derive(Debug, Clone)]
pub struct DataBind {
    pub name: String,
    /// Constructor name and argument types (already rendered).
    pub ctors: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Clone)]
pub struct FunBind {
    pub name: String,
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone)]
pub struct Clause {
    /// The parameter pattern, already rendered.
    pub pattern: String,
    pub body: Exp,
}

#[derive(Debug, Clone)]
pub enum Spec {
    Type {
        name: String,
        definition: Option<String>,
    },
    EqType {
        name: String,
    },
    Val {
        name: String,
        ty: String,
    },
}

#[derive(Debug, Clone)]
pub enum Exp {
    /// An atomic fragment: a literal, a variable, a rendered pattern.
    Atom(String),
    /// Application of a named function to arguments; several arguments are
    /// passed as a tuple.
    App(String, Vec<Exp>),
    Tuple(Vec<Exp>),
    List(Vec<Exp>),
    /// List concatenation, `e1 @ e2 @ ...`; empty renders as `[]`.
    Append(Vec<Exp>),
    Let {
        binds: Vec<(String, Exp)>,
        body: Box<Exp>,
    },
    Case {
        scrutinee: Box<Exp>,
        arms: Vec<(String, Exp)>,
    },
}

impl Exp {
    pub fn atom(s: impl Into<String>) -> Self {
        Exp::Atom(s.into())
    }

    pub fn app(f: impl Into<String>, args: Vec<Exp>) -> Self {
        Exp::App(f.into(), args)
    }

    /// Single-line rendering, or `None` for forms that always break.
    fn inline(&self) -> Option<String> {
        match self {
            Exp::Atom(s) => Some(s.clone()),
            Exp::App(f, args) => {
                let args: Vec<String> =
                    args.iter().map(|a| a.inline()).collect::<Option<_>>()?;
                Some(match &args[..] {
                    [] => format!("{f} ()"),
                    [single] if is_atomic(single) => format!("{f} {single}"),
                    [single] => format!("{f} ({single})"),
                    many => format!("{f} ({})", many.join(", ")),
                })
            }
            Exp::Tuple(items) => {
                let items: Vec<String> =
                    items.iter().map(|a| a.inline()).collect::<Option<_>>()?;
                Some(format!("({})", items.join(", ")))
            }
            Exp::List(items) => {
                let items: Vec<String> =
                    items.iter().map(|a| a.inline()).collect::<Option<_>>()?;
                Some(format!("[{}]", items.join(", ")))
            }
            Exp::Append(items) => {
                if items.is_empty() {
                    return Some("[]".into());
                }
                let items: Vec<String> =
                    items.iter().map(|a| a.inline()).collect::<Option<_>>()?;
                Some(items.join(" @ "))
            }
            Exp::Let { .. } | Exp::Case { .. } => None,
        }
    }
}

fn is_atomic(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    // Bracketed fragments we emit are always fully delimited already.
    if (s.starts_with('(') && s.ends_with(')')) || (s.starts_with('[') && s.ends_with(']')) {
        return true;
    }
    s.chars()
        .all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '\'' || ch == '.')
}

/// Render a sequence of top-level declarations.
pub fn render(decls: &[Decl]) -> String {
    let mut printer = Printer::default();
    for (i, decl) in decls.iter().enumerate() {
        if i > 0 {
            printer.out.push('\n');
        }
        printer.decl(decl);
    }
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn column(&self) -> usize {
        self.depth * INDENT.len()
    }

    fn decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Data(binds) => self.data(binds),
            Decl::Fun(binds) => self.fun(binds),
            Decl::Val { name, rhs } => {
                self.binding(&format!("val {name} ="), rhs);
            }
            Decl::Raw(text) => {
                for line in text.lines() {
                    self.line(line);
                }
            }
            Decl::Structure { name, decls } => {
                self.line(&format!("structure {name} = struct"));
                self.nested(decls);
                self.line("end");
            }
            Decl::Signature { name, specs } => {
                self.line(&format!("signature {name} = sig"));
                self.depth += 1;
                for spec in specs {
                    match spec {
                        Spec::Type {
                            name,
                            definition: Some(def),
                        } => self.line(&format!("type {name} = {def}")),
                        Spec::Type {
                            name,
                            definition: None,
                        } => self.line(&format!("type {name}")),
                        Spec::EqType { name } => self.line(&format!("eqtype {name}")),
                        Spec::Val { name, ty } => self.line(&format!("val {name} : {ty}")),
                    }
                }
                self.depth -= 1;
                self.line("end");
            }
            Decl::Functor {
                name,
                param,
                param_sig,
                decls,
            } => {
                self.line(&format!("functor {name} ({param} : {param_sig}) = struct"));
                self.nested(decls);
                self.line("end");
            }
        }
    }

    fn nested(&mut self, decls: &[Decl]) {
        self.depth += 1;
        for (i, decl) in decls.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.decl(decl);
        }
        self.depth -= 1;
    }

    fn data(&mut self, binds: &[DataBind]) {
        for (i, bind) in binds.iter().enumerate() {
            let keyword = if i == 0 { "datatype" } else { "and" };
            let ctors: Vec<String> = bind
                .ctors
                .iter()
                .map(|(name, args)| {
                    if args.is_empty() {
                        name.clone()
                    } else {
                        format!("{name} of {}", args.join(" * "))
                    }
                })
                .collect();
            let one_line = format!("{keyword} {} = {}", bind.name, ctors.join(" | "));
            if self.column() + one_line.len() <= MAX_WIDTH {
                self.line(&one_line);
            } else {
                self.line(&format!("{keyword} {} =", bind.name));
                self.depth += 1;
                for (j, ctor) in ctors.iter().enumerate() {
                    if j == 0 {
                        self.line(&format!("  {ctor}"));
                    } else {
                        self.line(&format!("| {ctor}"));
                    }
                }
                self.depth -= 1;
            }
        }
    }

    fn fun(&mut self, binds: &[FunBind]) {
        for (i, bind) in binds.iter().enumerate() {
            for (j, clause) in bind.clauses.iter().enumerate() {
                let keyword = match (i, j) {
                    (0, 0) => "fun".to_owned(),
                    (_, 0) => "and".to_owned(),
                    _ => "  |".to_owned(),
                };
                let head = format!("{keyword} {} {} =", bind.name, clause.pattern);
                self.binding(&head, &clause.body);
            }
        }
    }

    /// `<head> <exp>` on one line when it fits, otherwise the expression is
    /// broken on the following lines.
    fn binding(&mut self, head: &str, exp: &Exp) {
        if let Some(inline) = exp.inline() {
            if self.column() + head.len() + 1 + inline.len() <= MAX_WIDTH {
                self.line(&format!("{head} {inline}"));
                return;
            }
        }
        self.line(head);
        self.depth += 1;
        self.exp(exp);
        self.depth -= 1;
    }

    fn exp(&mut self, exp: &Exp) {
        if let Some(inline) = exp.inline() {
            if self.column() + inline.len() <= MAX_WIDTH {
                self.line(&inline);
                return;
            }
        }
        match exp {
            Exp::Atom(s) => self.line(s),
            Exp::App(f, args) => {
                self.line(f);
                self.depth += 1;
                self.seq("(", args, ")");
                self.depth -= 1;
            }
            Exp::Tuple(items) => self.seq("(", items, ")"),
            Exp::List(items) => self.seq("[", items, "]"),
            Exp::Append(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.line("@");
                    }
                    self.exp(item);
                }
            }
            Exp::Let { binds, body } => {
                self.line("let");
                self.depth += 1;
                for (name, rhs) in binds {
                    self.binding(&format!("val {name} ="), rhs);
                }
                self.depth -= 1;
                self.line("in");
                self.depth += 1;
                self.exp(body);
                self.depth -= 1;
                self.line("end");
            }
            Exp::Case { scrutinee, arms } => {
                let scrut = scrutinee
                    .inline()
                    .unwrap_or_else(|| "<scrutinee>".to_owned());
                self.line(&format!("case {scrut} of"));
                self.depth += 1;
                for (i, (pattern, body)) in arms.iter().enumerate() {
                    let lead = if i == 0 { "  " } else { "| " };
                    let head = format!("{lead}{pattern} =>");
                    if let Some(inline) = body.inline() {
                        if self.column() + head.len() + 1 + inline.len() <= MAX_WIDTH {
                            self.line(&format!("{head} {inline}"));
                            continue;
                        }
                    }
                    self.line(&head);
                    self.depth += 2;
                    self.exp(body);
                    self.depth -= 2;
                }
                self.depth -= 1;
            }
        }
    }

    /// A bracketed, comma-separated multi-line sequence.
    fn seq(&mut self, open: &str, items: &[Exp], close: &str) {
        self.line(open);
        self.depth += 1;
        for (i, item) in items.iter().enumerate() {
            self.exp(item);
            if i + 1 < items.len() {
                self.out.pop();
                self.out.push_str(",\n");
            }
        }
        self.depth -= 1;
        self.line(close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_bindings_stay_inline() {
        let out = render(&[Decl::Val {
            name: "answer".into(),
            rhs: Exp::app("succ", vec![Exp::atom("41")]),
        }]);
        assert_eq!(out.trim_end(), "val answer = succ 41");
    }

    #[test]
    fn wide_expressions_break() {
        let args: Vec<Exp> = (0..12)
            .map(|i| Exp::atom(format!("argument_number_{i}")))
            .collect();
        let out = render(&[Decl::Val {
            name: "wide".into(),
            rhs: Exp::app("combine", args),
        }]);
        assert!(out.lines().count() > 1);
        assert!(out.lines().all(|line| line.len() <= 90));
        assert!(out.contains("combine"));
    }

    #[test]
    fn datatype_renders_alternatives() {
        let out = render(&[Decl::Data(vec![DataBind {
            name: "t".into(),
            ctors: vec![
                ("EOF".into(), vec![]),
                ("Integer".into(), vec!["int".into()]),
            ],
        }])]);
        assert_eq!(out.trim_end(), "datatype t = EOF | Integer of int");
    }

    #[test]
    fn mutually_recursive_datatypes_chain_with_and() {
        let bind = |name: &str| DataBind {
            name: name.into(),
            ctors: vec![("C".into(), vec![format!("{name} list")])],
        };
        let out = render(&[Decl::Data(vec![bind("exp"), bind("stm")])]);
        assert!(out.contains("datatype exp"));
        assert!(out.contains("and stm"));
    }

    #[test]
    fn fun_groups_share_one_keyword() {
        let clause = |pattern: &str| Clause {
            pattern: pattern.into(),
            body: Exp::atom("[]"),
        };
        let out = render(&[Decl::Fun(vec![
            FunBind {
                name: "go".into(),
                clauses: vec![clause("(0, stack)"), clause("(_, _)")],
            },
            FunBind {
                name: "halt".into(),
                clauses: vec![clause("()")],
            },
        ])]);
        assert!(out.contains("fun go (0, stack) = []"));
        assert!(out.contains("  | go (_, _) = []"));
        assert!(out.contains("and halt () = []"));
        assert_eq!(out.matches("fun ").count(), 1);
    }

    #[test]
    fn case_arms_align() {
        let out = render(&[Decl::Fun(vec![FunBind {
            name: "f".into(),
            clauses: vec![Clause {
                pattern: "x".into(),
                body: Exp::Case {
                    scrutinee: Box::new(Exp::atom("x")),
                    arms: vec![
                        ("SOME v".into(), Exp::atom("v")),
                        ("NONE".into(), Exp::atom("raise Empty")),
                    ],
                },
            }],
        }])]);
        assert!(out.contains("case x of"));
        assert!(out.contains("SOME v => v"));
        assert!(out.contains("| NONE => raise Empty"));
    }

    #[test]
    fn structures_nest() {
        let out = render(&[Decl::Structure {
            name: "Token".into(),
            decls: vec![Decl::Raw("type t = int".into())],
        }]);
        assert!(out.starts_with("structure Token = struct"));
        assert!(out.contains("  type t = int"));
        assert!(out.trim_end().ends_with("end"));
    }

    #[test]
    fn signatures_list_specs() {
        let out = render(&[Decl::Signature {
            name: "LEXER".into(),
            specs: vec![
                Spec::Type {
                    name: "strm".into(),
                    definition: None,
                },
                Spec::EqType { name: "pos".into() },
                Spec::Type {
                    name: "span".into(),
                    definition: Some("pos * pos".into()),
                },
                Spec::Val {
                    name: "getPos".into(),
                    ty: "strm -> pos".into(),
                },
            ],
        }]);
        assert!(out.contains("signature LEXER = sig"));
        assert!(out.contains("type strm"));
        assert!(out.contains("eqtype pos"));
        assert!(out.contains("type span = pos * pos"));
        assert!(out.contains("val getPos : strm -> pos"));
    }

    #[test]
    fn append_of_nothing_is_the_empty_list() {
        let out = render(&[Decl::Val {
            name: "nothing".into(),
            rhs: Exp::Append(vec![]),
        }]);
        assert_eq!(out.trim_end(), "val nothing = []");
    }
}
