//! Fixture grammars.

/// Ambiguous arithmetic: subtraction with no precedence.
pub const ARITHMETIC: &str = r#"
token Integer int ;

EInt. Exp ::= Integer ;
ESub. Exp ::= Exp "-" Exp ;
"#;

/// A one-level coercion chain with the atomic parenthesization rule.
pub const COERCION: &str = r#"
token Integer int ;

EInt. Exp1 ::= Integer ;
_. Exp ::= Exp1 ;
coercions Exp 1 ;
"#;

/// A comma-separated list that may be empty.
pub const SEPARATOR: &str = r#"
token Integer int ;

Start. S ::= [Exp] ;
EInt. Exp ::= Integer ;
separator Exp "," ;
"#;

/// A semicolon-terminated list that must not be empty.
pub const TERMINATOR: &str = r#"
token Ident string ;

Prog. Prog ::= [Stm] ;
SId.  Stm ::= Ident ;
terminator nonempty Stm ";" ;
"#;

/// The classic dangling else.
pub const DANGLING_ELSE: &str = r#"
token Ident string ;

SIf.   Stm ::= "if" Exp "then" Stm ;
SIfE.  Stm ::= "if" Exp "then" Stm "else" Stm ;
SSkip. Stm ::= "skip" ;
EVar.  Exp ::= Ident ;
"#;

/// The grammar of the grammar language itself, shared with the core
/// crate's fixtures.
pub const LBNF: &str = include_str!("../../glrgen/tests/lbnf.cf");

pub const ALL: &[(&str, &str)] = &[
    ("arithmetic", ARITHMETIC),
    ("coercion", COERCION),
    ("separator", SEPARATOR),
    ("terminator", TERMINATOR),
    ("dangling_else", DANGLING_ELSE),
    ("lbnf", LBNF),
];
