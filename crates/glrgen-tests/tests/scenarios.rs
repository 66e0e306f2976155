//! End-to-end scenarios driven through the reference engine.

use glrgen::grammar::Grammar;
use glrgen_tests::engine::{Engine, Token, Value};
use glrgen_tests::grammars;

fn int(n: i64) -> Token {
    Token::with_value("Integer", Value::Int(n))
}

fn ident(name: &str) -> Token {
    Token::with_value("Ident", Value::Str(name.into()))
}

fn lit(spelling: &str) -> Token {
    Token::unit(spelling)
}

#[test]
fn arithmetic_is_ambiguous_both_ways() {
    let grammar = Grammar::from_source(grammars::ARITHMETIC).unwrap();
    let engine = Engine::new(&grammar);

    // 1-2-3 associates left or right; both stacks survive.
    let parses = engine.parses(&[int(1), lit("-"), int(2), lit("-"), int(3)]);
    assert_eq!(
        parses,
        [
            "ESub(EInt(1), ESub(EInt(2), EInt(3)))",
            "ESub(ESub(EInt(1), EInt(2)), EInt(3))",
        ]
    );

    let unambiguous = engine.parses(&[int(1), lit("-"), int(2)]);
    assert_eq!(unambiguous, ["ESub(EInt(1), EInt(2))"]);

    assert!(engine.parses(&[lit("-"), int(1)]).is_empty());
}

#[test]
fn coercions_collapse_to_one_parse() {
    let grammar = Grammar::from_source(grammars::COERCION).unwrap();
    let engine = Engine::new(&grammar);

    // The user coercion duplicates the macro one; value-identical items
    // must not multiply parses.
    let parses = engine.parses(&[lit("("), int(7), lit(")")]);
    assert_eq!(parses, ["EInt(7)"]);

    let bare = engine.parses(&[int(7)]);
    assert_eq!(bare, ["EInt(7)"]);
}

#[test]
fn separated_lists_accept_the_empty_input() {
    let grammar = Grammar::from_source(grammars::SEPARATOR).unwrap();
    let engine = Engine::new(&grammar);

    let parses = engine.parses(&[int(1), lit(","), int(2), lit(","), int(3)]);
    assert_eq!(parses, ["Start([EInt(1), EInt(2), EInt(3)])"]);

    let empty = engine.parses(&[]);
    assert_eq!(empty, ["Start([])"]);
}

#[test]
fn terminated_nonempty_lists_reject_the_empty_input() {
    let grammar = Grammar::from_source(grammars::TERMINATOR).unwrap();
    let engine = Engine::new(&grammar);

    let parses = engine.parses(&[ident("s1"), lit(";"), ident("s2"), lit(";")]);
    assert_eq!(parses, ["Prog([SId(s1), SId(s2)])"]);

    assert!(engine.parses(&[]).is_empty());

    // A trailing statement without its terminator fails too.
    assert!(engine
        .parses(&[ident("s1"), lit(";"), ident("s2")])
        .is_empty());
}

#[test]
fn dangling_else_yields_both_attachments() {
    let grammar = Grammar::from_source(grammars::DANGLING_ELSE).unwrap();
    let engine = Engine::new(&grammar);

    let tokens = [
        lit("if"),
        ident("a"),
        lit("then"),
        lit("if"),
        ident("b"),
        lit("then"),
        lit("skip"),
        lit("else"),
        lit("skip"),
    ];
    let parses = engine.parses(&tokens);
    assert_eq!(parses.len(), 2);
    assert!(parses.contains(&"SIf(EVar(a), SIfE(EVar(b), SSkip, SSkip))".to_owned()));
    assert!(parses.contains(&"SIfE(EVar(a), SIf(EVar(b), SSkip), SSkip)".to_owned()));
}

#[test]
fn the_grammar_language_accepts_itself() {
    use glrgen::syntax::lexer::{tokenize, Tok};

    let grammar = Grammar::from_source(grammars::LBNF).unwrap();
    let engine = Engine::new(&grammar);

    let tokens: Vec<Token> = tokenize(grammars::LBNF)
        .unwrap()
        .into_iter()
        .map(|(tok, _)| match tok {
            Tok::Ident(s) => Token::with_value("Ident", Value::Str(s.into())),
            Tok::Str(raw) => Token::with_value("Str", Value::Str(raw.into())),
            Tok::Int(digits) => Token::with_value("Int", Value::Int(digits.parse().unwrap())),
            Tok::Derives => Token::unit("::="),
            Tok::Dot => Token::unit("."),
            Tok::Semi => Token::unit(";"),
            Tok::LBrack => Token::unit("["),
            Tok::RBrack => Token::unit("]"),
            Tok::LParen => Token::unit("("),
            Tok::RParen => Token::unit(")"),
            Tok::Colon => Token::unit(":"),
            Tok::Under => Token::unit("_"),
            Tok::KwToken => Token::unit("token"),
            Tok::KwSeparator => Token::unit("separator"),
            Tok::KwTerminator => Token::unit("terminator"),
            Tok::KwCoercions => Token::unit("coercions"),
            Tok::KwNonempty => Token::unit("nonempty"),
        })
        .collect();

    let parses = engine.parse(&tokens);
    // The terminated definition list can always end through either its
    // singleton or its cons rule, so the fixed point comes back twice.
    assert_eq!(parses.len(), 2);
    for value in &parses {
        let Value::Node { ctor, children, .. } = value else {
            panic!("expected a node, got {value:?}");
        };
        assert_eq!(ctor, "GGrammar");
        let Value::List(defs) = &children[0] else {
            panic!("expected a definition list");
        };
        // Three token declarations, one start rule, one terminator pragma
        // and twenty category rules.
        assert_eq!(defs.len(), 25);
    }
}
