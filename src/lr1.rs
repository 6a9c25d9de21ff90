//! The canonical LR(1) automaton.
//!
//! States are deduplicated purely by structural equality of their item sets.
//! No LALR-style merging of same-core states is performed; two states whose
//! items differ only in lookaheads stay distinct.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, Symbol},
    types::{display_fn, Map},
};
use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u64,
}

impl StateID {
    pub(crate) const START: Self = Self::new(0);

    const fn new(raw: u64) -> Self {
        Self { raw }
    }

    pub(crate) fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// An LR(1) item: a dotted rule plus one lookahead terminal (or `End`).
///
/// Items are plain values; advancing the dot produces a new item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub rule: RuleID,
    pub marker: usize,
    pub lookahead: Symbol,
}

impl Item {
    /// True iff the dot, advanced by `offset` extra positions, is at or past
    /// the end of the rule's right-hand side.
    pub fn is_end(self, g: &Grammar, offset: usize) -> bool {
        self.marker + offset >= g.rule(self.rule).right().len()
    }

    /// The symbol at `marker + offset`. The caller must check `is_end` first.
    pub fn at(self, g: &Grammar, offset: usize) -> Symbol {
        g.rule(self.rule).right()[self.marker + offset]
    }

    fn advanced(self) -> Self {
        Self {
            marker: self.marker + 1,
            ..self
        }
    }

    // `"(LHS := R1 . R2) ["c"]"`
    pub fn display(self, g: &Grammar) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            let rule = g.rule(self.rule);
            write!(f, "({} :=", g.nonterminal_name(rule.left()))?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", symbol.display(g))?;
            }
            if self.marker == rule.right().len() {
                f.write_str(" .")?;
            }
            write!(f, ") [{}]", self.lookahead.display(g))
        })
    }
}

/// A deduplicated, closed collection of items. The `BTreeSet` gives both
/// canonical structural equality between candidate states and a
/// deterministic iteration order (ascending rule id first).
pub type ItemSet = BTreeSet<Item>;

/// Expand an item set to its closure in place.
///
/// For every item `(X := ... . Y beta, a)` with nonterminal `Y` at the dot,
/// add `(Y := . gamma, b)` for every rule of `Y` and every
/// `b` in `First(beta a)`. Classic fixpoint; insertion order does not affect
/// the final set.
pub fn closure(g: &Grammar, items: &mut ItemSet) {
    let mut changed = true;
    while changed {
        changed = false;

        let mut added = Vec::new();
        for item in items.iter() {
            if item.is_end(g, 0) {
                continue;
            }
            let y = match item.at(g, 0) {
                Symbol::N(n) => n,
                _ => continue,
            };

            let beta = &g.rule(item.rule).right()[item.marker + 1..];
            let lookaheads = g.first_concat(beta, item.lookahead);

            for rule in g.rules() {
                if rule.left() != y {
                    continue;
                }
                for lookahead in &lookaheads {
                    added.push(Item {
                        rule: rule.id(),
                        marker: 0,
                        lookahead: *lookahead,
                    });
                }
            }
        }

        for item in added {
            changed |= items.insert(item);
        }
    }
}

/// The state reached from `items` by advancing the dot past `symbol`, or
/// `None` when no item has the symbol at its dot. Absence is not a failure.
pub fn goto(g: &Grammar, items: &ItemSet, symbol: Symbol) -> Option<ItemSet> {
    let mut next: ItemSet = items
        .iter()
        .filter(|item| !item.is_end(g, 0) && item.at(g, 0) == symbol)
        .map(|item| item.advanced())
        .collect();
    if next.is_empty() {
        return None;
    }
    closure(g, &mut next);
    Some(next)
}

#[derive(Debug)]
pub struct State {
    item_set: ItemSet,
    edges: Map<Symbol, StateID>,
}

impl State {
    pub fn items(&self) -> impl Iterator<Item = Item> + '_ {
        self.item_set.iter().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (Symbol, StateID)> + '_ {
        self.edges.iter().map(|(symbol, target)| (*symbol, *target))
    }
}

/// The ordered state graph. State 0 is the closure of
/// `{(rule 0, dot 0, lookahead End)}`.
#[derive(Debug)]
pub struct Automaton {
    states: Vec<State>,
}

impl Automaton {
    /// Breadth-first construction of the reachable item sets.
    ///
    /// Terminates because the set of distinct item sets over a finite
    /// grammar is finite; candidate states are looked up by their
    /// normalized item-set content before a new index is assigned.
    pub fn generate(g: &Grammar) -> Self {
        let mut states: Vec<State> = Vec::new();
        let mut known: Map<ItemSet, StateID> = Map::default();
        let mut pending = VecDeque::new();

        let mut initial: ItemSet = Some(Item {
            rule: RuleID::ACCEPT,
            marker: 0,
            lookahead: Symbol::End,
        })
        .into_iter()
        .collect();
        closure(g, &mut initial);

        known.insert(initial.clone(), StateID::START);
        states.push(State {
            item_set: initial,
            edges: Map::default(),
        });
        pending.push_back(StateID::START);

        let symbols: Vec<Symbol> = g
            .nonterminals()
            .map(|n| n.id())
            .filter(|id| *id != NonterminalID::START)
            .map(Symbol::N)
            .chain(g.terminals().map(Symbol::T))
            .collect();

        while let Some(id) = pending.pop_front() {
            let item_set = states[id.index()].item_set.clone();
            for &symbol in &symbols {
                let next = match goto(g, &item_set, symbol) {
                    Some(next) => next,
                    None => continue,
                };
                let target = match known.get(&next) {
                    Some(target) => *target,
                    None => {
                        let target = StateID::new(states.len() as u64);
                        known.insert(next.clone(), target);
                        states.push(State {
                            item_set: next,
                            edges: Map::default(),
                        });
                        pending.push_back(target);
                        target
                    }
                };
                states[id.index()].edges.insert(symbol, target);
            }
        }

        tracing::debug!("generated {} LR(1) states", states.len());

        Self { states }
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID::new(i as u64), state))
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, state)) in self.states().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## items")?;
                for item in state.items() {
                    writeln!(f, "- {}", item.display(g))?;
                }
                writeln!(f, "## edges")?;
                for (symbol, target) in state.edges() {
                    writeln!(f, "- {} => {:02}", symbol.display(g), target)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Symbol::*;

    fn demo_grammar() -> Grammar {
        // S := A "b" | B "a" | S S ; A := "b" ; B := "c"
        Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            let b = g.nonterminal("B")?;
            g.start_symbol(s)?;
            g.rule(s, [N(a), T('b')])?;
            g.rule(s, [N(b), T('a')])?;
            g.rule(s, [N(s), N(s)])?;
            g.rule(a, [T('b')])?;
            g.rule(b, [T('c')])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn closure_is_idempotent() {
        let g = demo_grammar();
        let mut items: ItemSet = Some(Item {
            rule: RuleID::ACCEPT,
            marker: 0,
            lookahead: End,
        })
        .into_iter()
        .collect();
        closure(&g, &mut items);
        let closed = items.clone();
        closure(&g, &mut items);
        assert_eq!(items, closed);
    }

    #[test]
    fn goto_on_unmatched_symbol_is_absent() {
        let g = demo_grammar();
        let mut items: ItemSet = Some(Item {
            rule: RuleID::ACCEPT,
            marker: 0,
            lookahead: End,
        })
        .into_iter()
        .collect();
        closure(&g, &mut items);
        assert!(goto(&g, &items, T('z')).is_none());
    }

    #[test]
    fn smoketest() {
        let g = demo_grammar();
        eprintln!("{}", g);

        let automaton = Automaton::generate(&g);
        eprintln!("states:\n---\n{}", automaton.display(&g));
        assert!(automaton.states().count() > 1);
    }
}
