use canlr::{
    engine::{ParseTree, Parser},
    grammar::{Grammar, Symbol::*},
};

fn demo_parser() -> Parser {
    let grammar = Grammar::from_str(
        "\
S : A \"b\" | B \"a\" | S S ;
A : \"b\" ;
B : \"c\" ;
",
    )
    .unwrap();
    Parser::new(grammar)
}

#[test]
fn round_trip() {
    let parser = demo_parser();

    let mut session = parser.begin();
    for token in "bbca".chars() {
        session.put(token);
    }
    assert!(!session.has_error());
    let tree = session.end().unwrap();
    assert_eq!(tree.frontier(), "bbca");
}

#[test]
fn rejection_latches() {
    let parser = demo_parser();

    let mut session = parser.begin();
    for token in "abc".chars() {
        session.put(token);
    }
    assert!(session.has_error());
    assert!(session.end().is_none());
}

#[test]
fn shift_is_preferred_over_reduce() {
    // dangling-else-style ambiguity: in `i i x e x', the `e' can extend the
    // inner conditional (shift) or close it off (reduce)
    let grammar = Grammar::define(|g| {
        let s = g.nonterminal("S")?;
        g.rule(s, [T('i'), N(s)])?;
        g.rule(s, [T('i'), N(s), T('e'), N(s)])?;
        g.rule(s, [T('x')])?;
        Ok(())
    })
    .unwrap();
    let parser = Parser::new(grammar);
    assert!(parser.has_conflict());

    let tree = parser.parse("iixex").unwrap();
    assert_eq!(tree.frontier(), "iixex");

    // shifting binds the `e' to the inner `i': the outer node is `i S' and
    // the inner one is the four-element `i S e S'
    let outer = match &tree {
        ParseTree::Node { children, .. } => children,
        ParseTree::Leaf(..) => panic!("expected a node at the root"),
    };
    assert_eq!(outer.len(), 2);
    let inner = match &outer[1] {
        ParseTree::Node { children, .. } => children,
        ParseTree::Leaf(..) => panic!("expected a nested conditional"),
    };
    assert_eq!(inner.len(), 4);
}

#[test]
fn reduce_reduce_keeps_the_earlier_rule() {
    let grammar = Grammar::define(|g| {
        let s = g.nonterminal("S")?;
        let a = g.nonterminal("A")?;
        let b = g.nonterminal("B")?;
        g.start_symbol(s)?;
        g.rule(s, [N(a)])?;
        g.rule(s, [N(b)])?;
        g.rule(a, [T('a')])?;
        g.rule(b, [T('a')])?;
        Ok(())
    })
    .unwrap();
    let parser = Parser::new(grammar);
    assert!(parser.has_conflict());

    let tree = parser.parse("a").unwrap();
    let child = match tree {
        ParseTree::Node { children, .. } => children.into_iter().next().unwrap(),
        ParseTree::Leaf(..) => panic!("expected a node at the root"),
    };
    // `A := "a"' was recorded before `B := "a"', so it wins the cell
    assert!(matches!(child, ParseTree::Node { ref symbol, .. } if symbol == "A"));
}

#[test]
fn empty_input_on_nullable_start() {
    let grammar = Grammar::define(|g| {
        let s = g.nonterminal("S")?;
        g.rule(s, [])?;
        g.rule(s, [T('a')])?;
        Ok(())
    })
    .unwrap();
    let parser = Parser::new(grammar);

    match parser.parse("").unwrap() {
        ParseTree::Node { symbol, children } => {
            assert_eq!(symbol, "S");
            assert!(children.is_empty());
        }
        ParseTree::Leaf(..) => panic!("expected a node at the root"),
    }

    // the same grammar still accepts the nonempty form
    assert_eq!(parser.parse("a").unwrap().frontier(), "a");
}

#[test]
fn textual_and_programmatic_definitions_agree() {
    let from_text = Parser::new(Grammar::from_str(r#"S : "(" S ")" | "1" ;"#).unwrap());
    let programmatic = Parser::new(
        Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.rule(s, [T('('), N(s), T(')')])?;
            g.rule(s, [T('1')])?;
            Ok(())
        })
        .unwrap(),
    );

    for input in ["1", "(1)", "((1))"] {
        assert_eq!(from_text.parse(input), programmatic.parse(input));
    }
    assert!(from_text.parse("(1").is_none());
    assert!(programmatic.parse("(1").is_none());
}
