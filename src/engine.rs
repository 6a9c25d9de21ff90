//! The table-driven shift-reduce engine.

use crate::{
    grammar::{Grammar, RuleID, Symbol},
    lr1::{Automaton, StateID},
    parse_table::{Action, ParseTable},
};
use std::fmt;

/// A bottom-up parse tree. Internal nodes carry the reduced rule's
/// left-hand nonterminal name; leaves are the shifted input tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseTree {
    Leaf(char),
    Node {
        symbol: String,
        children: Vec<ParseTree>,
    },
}

impl ParseTree {
    /// The terminal yield of this tree, left to right.
    pub fn frontier(&self) -> String {
        let mut buf = String::new();
        self.collect_frontier(&mut buf);
        buf
    }

    fn collect_frontier(&self, buf: &mut String) {
        match self {
            ParseTree::Leaf(token) => buf.push(*token),
            ParseTree::Node { children, .. } => {
                for child in children {
                    child.collect_frontier(buf);
                }
            }
        }
    }

    fn fmt_indent(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            f.write_str("  ")?;
        }
        match self {
            ParseTree::Leaf(token) => writeln!(f, "{}", token),
            ParseTree::Node { symbol, children } => {
                writeln!(f, "{}", symbol)?;
                for child in children {
                    child.fmt_indent(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indent(f, 0)
    }
}

/// A parser for one grammar.
///
/// Construction eagerly builds the LR(1) automaton and the action/goto
/// tables; the cost is paid once and every parse afterwards is pure table
/// lookups. The tables are frozen, so a `Parser` can serve any number of
/// parses, including concurrently — each session owns its own stacks.
#[derive(Debug)]
pub struct Parser {
    grammar: Grammar,
    table: ParseTable,
}

impl Parser {
    pub fn new(grammar: Grammar) -> Self {
        let automaton = Automaton::generate(&grammar);
        let table = ParseTable::generate(&grammar, &automaton);
        Self { grammar, table }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// True iff table construction hit a shift/reduce or reduce/reduce
    /// clash. The parser still works; the tie-breaks are shift over reduce
    /// and earliest rule among reduces.
    pub fn has_conflict(&self) -> bool {
        self.table.has_conflict()
    }

    /// Start a parse with fresh stacks.
    pub fn begin(&self) -> ParseSession<'_> {
        ParseSession {
            parser: self,
            state_stack: vec![self.table.initial_state()],
            tree_stack: vec![],
            status: Status::Running,
        }
    }

    /// Parse a full input, one terminal per character. Returns the tree on
    /// acceptance and `None` on the first unexpected symbol.
    pub fn parse(&self, input: &str) -> Option<ParseTree> {
        let mut session = self.begin();
        for token in input.chars() {
            session.put(token);
        }
        session.end()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Status {
    Running,
    /// Latched on the first unexpected symbol; absorbing.
    Error,
    /// Reached only through `Accept`; absorbing.
    Done,
}

/// The state of one parse over one input: a stack of automaton states and a
/// parallel stack of partial trees, always equal in length.
#[derive(Debug)]
pub struct ParseSession<'p> {
    parser: &'p Parser,
    state_stack: Vec<StateID>,
    tree_stack: Vec<ParseTree>,
    status: Status,
}

impl<'p> ParseSession<'p> {
    /// Offer the next input token. Once a parse has failed, every further
    /// `put` is a no-op.
    pub fn put(&mut self, token: char) {
        self.feed(Symbol::T(token));
    }

    /// Feed the end-of-input sentinel and finish the parse. Returns the
    /// tree root on acceptance, `None` on failure. No partial tree is ever
    /// produced.
    pub fn end(mut self) -> Option<ParseTree> {
        self.feed(Symbol::End);
        match self.status {
            Status::Done => self.tree_stack.drain(..).next(),
            Status::Running | Status::Error => None,
        }
    }

    pub fn has_error(&self) -> bool {
        matches!(self.status, Status::Error)
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, Status::Done)
    }

    // Resolve actions for `symbol` until it is shifted or the input is
    // accepted. A single symbol may trigger a chain of reduces first, since
    // each reduce changes the current state without consuming input.
    fn feed(&mut self, symbol: Symbol) {
        if self.status != Status::Running {
            return;
        }
        loop {
            let current = self.state_stack.last().copied().unwrap();
            let action = match self.parser.table.action(current, symbol) {
                Some(action) => action,
                None => {
                    tracing::trace!("state {}: no action, rejecting input", current);
                    self.status = Status::Error;
                    return;
                }
            };
            match action {
                Action::Shift(next) => {
                    let token = match symbol {
                        Symbol::T(token) => token,
                        _ => unreachable!("only terminal symbols are ever shifted"),
                    };
                    tracing::trace!("state {}: shift {:?} into state {}", current, token, next);
                    self.tree_stack.push(ParseTree::Leaf(token));
                    self.state_stack.push(next);
                    return;
                }
                Action::Reduce(rule) => {
                    self.reduce(rule);
                    if self.status != Status::Running {
                        return;
                    }
                }
                Action::Accept => {
                    tracing::trace!("state {}: accept", current);
                    self.status = Status::Done;
                    return;
                }
            }
        }
    }

    // Pop the rule's right-hand side off both stacks (nothing for an
    // epsilon rule), push the labeled node, and enter the goto state.
    fn reduce(&mut self, id: RuleID) {
        let rule = self.parser.grammar.rule(id);
        let len = rule.right().len();
        let children = self.tree_stack.split_off(self.tree_stack.len() - len);
        self.state_stack.truncate(self.state_stack.len() - len);

        let symbol = self
            .parser
            .grammar
            .nonterminal_name(rule.left())
            .to_owned();
        tracing::trace!("reduce {}", rule.display(self.parser.grammar()));
        self.tree_stack.push(ParseTree::Node { symbol, children });

        let current = self.state_stack.last().copied().unwrap();
        match self.parser.table.goto(current, rule.left()) {
            Some(next) => self.state_stack.push(next),
            // Unreachable for tables derived from the automaton; latch
            // instead of panicking if the invariant is ever violated.
            None => self.status = Status::Error,
        }
    }
}
