//! Grammar types and FIRST/FOLLOW queries.

use crate::types::{display_fn, Map, Set};
use std::{borrow::Cow, fmt, fs, io, marker::PhantomData, path::Path, slice};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// Reserved symbol on the left of the synthetic augmenting rule. It never
    /// appears on any right-hand side.
    pub const START: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}
impl RuleID {
    /// The synthetic augmenting rule `$start := <start-symbol>`, always rule 0.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

/// A grammar symbol.
///
/// The end-of-input and empty-string sentinels are ordinary variants compared
/// by tag, not shared singleton values. `Empty` only shows up inside the
/// FIRST computation; it is stripped from every caller-visible set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    /// A terminal symbol carrying its token, one input character.
    T(char),
    /// A nonterminal symbol interned in the grammar.
    N(NonterminalID),
    /// The end-of-input sentinel.
    End,
    /// The empty-string marker used while propagating nullability.
    Empty,
}

impl Symbol {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Symbol::T(c) => write!(f, "\"{}\"", c),
            Symbol::N(n) => f.write_str(g.nonterminal_name(*n)),
            Symbol::End => f.write_str("$end"),
            Symbol::Empty => f.write_str("$empty"),
        })
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    export_name: Option<Cow<'static, str>>,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn export_name(&self) -> Option<&str> {
        self.export_name.as_deref()
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            NonterminalID::START => f.write_str("$start"),
            _ => f.write_str(self.export_name().unwrap_or("<unknown>")),
        }
    }
}

/// A production rule. Equality is structural over the left-hand nonterminal
/// and the right-hand sequence.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<Symbol>,
}
impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// The left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// The right-hand side of this production. An empty sequence denotes an
    /// epsilon production.
    pub fn right(&self) -> &[Symbol] {
        &self.right[..]
    }

    // `"LHS := R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} :=", g.nonterminal_name(self.left))?;
            for symbol in self.right() {
                write!(f, " {}", symbol.display(g))?;
            }
            Ok(())
        })
    }
}

/// An immutable grammar: the ordered rule set (rule 0 is the synthetic
/// augmenting rule) plus the interned nonterminal names.
#[derive(Debug)]
pub struct Grammar {
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    terminals: Set<char>,
    start_symbol: NonterminalID,
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        Self::from_str(&source)
    }

    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        crate::syntax::parse(source).map_err(GrammarDefError::Syntax)
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            nonterminals: Map::default(),
            rules: Vec::new(),
            start: None,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
            _marker: PhantomData,
        };

        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                export_name: None,
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    /// Iterate the rules in definition order, the augmenting rule first.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values()
    }

    /// The terminal tokens occurring on any right-hand side.
    pub fn terminals(&self) -> impl Iterator<Item = char> + '_ {
        self.terminals.iter().copied()
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &Nonterminal> + '_ {
        self.nonterminals.values()
    }

    pub fn nonterminal_name(&self, id: NonterminalID) -> &str {
        self.nonterminals
            .get(&id)
            .and_then(|n| n.export_name())
            .unwrap_or("$start")
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals() {
            writeln!(f, "\"{}\"", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules() {
            writeln!(f, "{}", rule.display(self))?;
        }

        Ok(())
    }
}

// === FIRST/FOLLOW ===

impl Grammar {
    /// `First(symbols)`: the terminals (or `End`) that can begin a derivation
    /// of the sequence. The `Empty` marker never appears in the result.
    pub fn first(&self, symbols: &[Symbol]) -> Set<Symbol> {
        let mut set = self.first_seq(symbols, &mut Vec::new());
        set.shift_remove(&Symbol::Empty);
        set
    }

    /// `First(prefix lookahead)`: falls through to `lookahead` when the whole
    /// prefix can derive the empty string. Used for closure lookaheads.
    pub(crate) fn first_concat(&self, prefix: &[Symbol], lookahead: Symbol) -> Set<Symbol> {
        let mut set = self.first_seq(prefix, &mut Vec::new());
        if set.shift_remove(&Symbol::Empty) {
            set.insert(lookahead);
        }
        set
    }

    /// `Follow(nt)`: the terminals (or `End`) that can immediately follow the
    /// nonterminal in some derivation.
    pub fn follow(&self, nt: NonterminalID) -> Set<Symbol> {
        self.follow_inner(nt, &mut Vec::new())
    }

    // The `expanding` stack records the nonterminals currently being expanded
    // on this call chain; revisiting one yields the empty set. This is what
    // bounds the recursion on left-recursive and mutually recursive grammars.
    // Entries are pushed on entry and popped on exit, so sibling calls never
    // observe each other's state.
    fn first_symbol(&self, symbol: Symbol, expanding: &mut Vec<NonterminalID>) -> Set<Symbol> {
        match symbol {
            Symbol::T(..) | Symbol::End | Symbol::Empty => {
                let mut set = Set::default();
                set.insert(symbol);
                set
            }
            Symbol::N(nt) => {
                if expanding.contains(&nt) {
                    return Set::default();
                }
                expanding.push(nt);
                let mut set = Set::default();
                for rule in self.rules.values() {
                    if rule.left() != nt {
                        continue;
                    }
                    set.extend(self.first_seq(rule.right(), expanding));
                }
                expanding.pop();
                set
            }
        }
    }

    // First of a sequence, with `Empty` present iff the entire sequence can
    // derive the empty string.
    fn first_seq(&self, seq: &[Symbol], expanding: &mut Vec<NonterminalID>) -> Set<Symbol> {
        let mut set = Set::default();
        for symbol in seq {
            let first = self.first_symbol(*symbol, expanding);
            let nullable = first.contains(&Symbol::Empty);
            set.extend(first.into_iter().filter(|s| *s != Symbol::Empty));
            if !nullable {
                return set;
            }
        }
        set.insert(Symbol::Empty);
        set
    }

    fn follow_inner(&self, nt: NonterminalID, expanding: &mut Vec<NonterminalID>) -> Set<Symbol> {
        if expanding.contains(&nt) {
            return Set::default();
        }
        expanding.push(nt);
        let mut set = Set::default();
        for rule in self.rules.values() {
            for (i, symbol) in rule.right().iter().enumerate() {
                if *symbol != Symbol::N(nt) {
                    continue;
                }
                match rule.right().get(i + 1) {
                    Some(next) => {
                        set.extend(self.first(slice::from_ref(next)));
                    }
                    // Rule-final occurrence: whatever follows the producing
                    // nonterminal follows this one.
                    None => {
                        set.extend(self.follow_inner(rule.left(), expanding));
                    }
                }
            }
        }
        expanding.pop();
        set
    }
}

/// The contextual values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Vec<Rule>,
    start: Option<NonterminalID>,
    next_nonterminal_id: u16,
    next_rule_id: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, export_name: &str) -> Result<NonterminalID, GrammarDefError> {
        if !verify_ident(export_name) {
            return Err(GrammarDefError::Other {
                msg: format!("incorrect symbol name: `{}'", export_name),
            });
        }

        for nonterminal in self.nonterminals.values() {
            if matches!(nonterminal.export_name(), Some(name) if name == export_name) {
                return Err(GrammarDefError::Other {
                    msg: format!("the nonterminal `{}' has already been declared", export_name),
                });
            }
        }

        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id += 1;

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                export_name: Some(export_name.to_owned().into()),
            },
        );

        Ok(id)
    }

    /// Specify a production rule.
    ///
    /// A structurally identical rule collapses onto the existing one and its
    /// `RuleID` is returned unchanged; grammars assembled from several
    /// sources may repeat a production.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = Symbol>,
    {
        let right: Vec<Symbol> = right.into_iter().collect();
        for symbol in &right {
            match symbol {
                Symbol::T(..) => (),
                Symbol::N(NonterminalID::START) => {
                    return Err("the start marker cannot appear on a right-hand side".into());
                }
                Symbol::N(n) => {
                    if !self.nonterminals.contains_key(n) {
                        return Err("undeclared nonterminal on a right-hand side".into());
                    }
                }
                Symbol::End | Symbol::Empty => {
                    return Err(
                        "sentinel symbols cannot appear on a right-hand side; \
                         denote an epsilon production by an empty sequence"
                            .into(),
                    );
                }
            }
        }

        if let Some(rule) = self
            .rules
            .iter()
            .find(|rule| rule.left == left && rule.right == right)
        {
            return Ok(rule.id);
        }

        let id = RuleID::new(self.next_rule_id);
        self.next_rule_id += 1;
        self.rules.push(Rule { id, left, right });

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        if !self.nonterminals.contains_key(&symbol) || symbol == NonterminalID::START {
            return Err("unknown start symbol".into());
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // Fall back to the first declared nonterminal when no start symbol
        // was specified.
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or_else(|| GrammarDefError::Other {
                    msg: "empty nonterminal symbols".into(),
                })?,
        };

        let mut terminals = Set::default();
        for rule in &self.rules {
            for symbol in &rule.right {
                if let Symbol::T(c) = symbol {
                    terminals.insert(*c);
                }
            }
        }

        // The augmenting rule goes in front so that `rules()` yields it at
        // index 0.
        let mut rules = Map::default();
        rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![Symbol::N(start)],
            },
        );
        for rule in self.rules {
            rules.insert(rule.id, rule);
        }

        Ok(Grammar {
            nonterminals: self.nonterminals,
            rules,
            terminals,
            start_symbol: start,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("syntax error: {}", _0)]
    Syntax(anyhow::Error),

    #[error("{}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

fn verify_ident(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let mut chars = s.chars();
    let first = chars.next().expect("nonempty checked above");
    if !(first == '_' || unicode_ident::is_xid_start(first)) {
        return false;
    }
    chars.all(unicode_ident::is_xid_continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Symbol::*;

    fn left_recursive() -> Grammar {
        // S := S "-" A | A ; A := "-" S | "1"
        Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            g.start_symbol(s)?;
            g.rule(s, [N(s), T('-'), N(a)])?;
            g.rule(s, [N(a)])?;
            g.rule(a, [T('-'), N(s)])?;
            g.rule(a, [T('1')])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn first_terminates_on_left_recursion() {
        let g = left_recursive();
        let s = g.start_symbol();
        let first = g.first(&[N(s)]);
        assert_eq!(first, [T('-'), T('1')].into_iter().collect::<Set<_>>());
    }

    #[test]
    fn follow_terminates_on_left_recursion() {
        let g = left_recursive();
        let s = g.start_symbol();
        let follow = g.follow(s);
        assert_eq!(follow, [T('-')].into_iter().collect::<Set<_>>());
    }

    #[test]
    fn empty_marker_does_not_leak() {
        // A := epsilon ; S := A "x"
        let g = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            g.start_symbol(s)?;
            g.rule(s, [N(a), T('x')])?;
            g.rule(a, [])?;
            Ok(())
        })
        .unwrap();

        let s = g.start_symbol();
        let first = g.first(&[N(s)]);
        assert_eq!(first, g.first(&[T('x')]));
        assert!(!first.contains(&Empty));
    }

    #[test]
    fn duplicate_rules_collapse() {
        let g = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            let id1 = g.rule(s, [T('a')])?;
            let id2 = g.rule(s, [T('a')])?;
            assert_eq!(id1, id2);
            g.rule(s, [T('b')])?;
            Ok(())
        })
        .unwrap();

        // accept rule + two distinct productions
        assert_eq!(g.rules().count(), 3);
        assert_eq!(g.rules().next().unwrap().id(), RuleID::ACCEPT);
    }

    #[test]
    fn sentinels_rejected_on_rhs() {
        let err = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.rule(s, [End])?;
            Ok(())
        });
        assert!(err.is_err());
    }
}
