//! The textual grammar front end.
//!
//! A grammar description is a sequence of statements:
//!
//! ```text
//! S : A "b" | B "a" | S S ;
//! A : "b" ;
//! B : "c" ;
//! ```
//!
//! Bare identifiers denote nonterminals, interned by name on first
//! occurrence. Each character of a double-quoted literal contributes one
//! terminal. An empty alternative denotes an epsilon production. The first
//! statement's left-hand side is the start symbol.

use crate::{
    grammar::{Grammar, GrammarDef, GrammarDefError, NonterminalID, Symbol},
    types::Map,
};
use anyhow::Context as _;
use logos::Logos;
use std::{fs, path::Path};

#[derive(Logos, Debug, Copy, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token<'source> {
    #[token(":")]
    Colon,

    #[token("|")]
    VertBar,

    #[token(";")]
    Semicolon,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Ident(&'source str),

    /// A quoted run of terminal characters, quotes stripped.
    #[regex(r#""[^"]*""#, |lex| {
        let slice = lex.slice();
        &slice[1..slice.len() - 1]
    })]
    Str(&'source str),
}

pub fn parse_file(path: impl AsRef<Path>) -> anyhow::Result<Grammar> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)
        .with_context(|| anyhow::anyhow!("failed to read {}", path.display()))?;
    parse(&source)
}

/// Parse a grammar description into a `Grammar`.
pub fn parse(source: &str) -> anyhow::Result<Grammar> {
    let span = tracing::trace_span!("parse_grammar");
    let _entered = span.enter();

    let mut tokens = Vec::new();
    for (token, span) in Token::lexer(source).spanned() {
        let token = token
            .map_err(|()| anyhow::anyhow!("unexpected character at byte offset {}", span.start))?;
        tokens.push(token);
    }
    tracing::trace!("lexed {} tokens", tokens.len());

    let grammar = Grammar::define(|g| define_from_tokens(g, &tokens))?;
    Ok(grammar)
}

fn define_from_tokens(g: &mut GrammarDef<'_>, tokens: &[Token<'_>]) -> Result<(), GrammarDefError> {
    // Front-end interning: names map onto declared IDs on first occurrence,
    // whether that occurrence is a left-hand side or inside a sequence.
    let mut nonterminals: Map<String, NonterminalID> = Map::default();
    let mut start = None;

    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        let name = match token {
            Token::Ident(name) => *name,
            other => {
                return Err(format!("expected a rule name, found {:?}", other).into());
            }
        };
        let left = intern(g, &mut nonterminals, name)?;
        start.get_or_insert(left);

        match iter.next() {
            Some(Token::Colon) => (),
            other => {
                return Err(format!("expected `:' after `{}', found {:?}", name, other).into());
            }
        }

        let mut seq: Vec<Symbol> = Vec::new();
        loop {
            match iter.next() {
                Some(Token::Ident(symbol)) => {
                    seq.push(Symbol::N(intern(g, &mut nonterminals, symbol)?));
                }
                Some(Token::Str(literal)) => {
                    seq.extend(literal.chars().map(Symbol::T));
                }
                Some(Token::VertBar) => {
                    g.rule(left, seq.drain(..))?;
                }
                Some(Token::Semicolon) => {
                    g.rule(left, seq.drain(..))?;
                    break;
                }
                other => {
                    return Err(format!(
                        "unterminated statement for `{}', found {:?}",
                        name, other
                    )
                    .into());
                }
            }
        }
    }

    match start {
        Some(start) => g.start_symbol(start),
        None => Err("the grammar description contains no statements".into()),
    }
}

fn intern(
    g: &mut GrammarDef<'_>,
    nonterminals: &mut Map<String, NonterminalID>,
    name: &str,
) -> Result<NonterminalID, GrammarDefError> {
    if let Some(id) = nonterminals.get(name) {
        return Ok(*id);
    }
    let id = g.nonterminal(name)?;
    nonterminals.insert(name.to_owned(), id);
    Ok(id)
}
