//! Action/goto table construction.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, Symbol},
    lr1::{Automaton, StateID},
    types::Map,
};

/// The action performed in a state on a particular lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Consume the lookahead symbol and transition to the specified state.
    Shift(StateID),
    /// Reduce by the specified production rule.
    Reduce(RuleID),
    /// Recognize the whole input.
    Accept,
}

/// The frozen action/goto tables derived from an automaton.
///
/// Construction always completes; ambiguity is reported through the
/// `conflict` flag and the table stays usable with the documented
/// tie-breaks applied. Once built, the table is never mutated, so it can be
/// shared read-only between concurrent parses.
#[derive(Debug)]
pub struct ParseTable {
    actions: Vec<Map<Symbol, Action>>,
    gotos: Vec<Map<NonterminalID, StateID>>,
    conflict: bool,
}

impl ParseTable {
    /// Derive the tables from the state graph. Pure: all accumulation is
    /// local and the result is frozen on return.
    pub fn generate(g: &Grammar, automaton: &Automaton) -> Self {
        let mut actions = Vec::new();
        let mut gotos = Vec::new();
        let mut conflict = false;

        for (id, state) in automaton.states() {
            let mut action_row: Map<Symbol, Action> = Map::default();
            let mut goto_row: Map<NonterminalID, StateID> = Map::default();

            // Reduce and accept cells first, in item order (ascending rule
            // id), so a reduce/reduce clash keeps the earlier-numbered rule.
            for item in state.items() {
                if !item.is_end(g, 0) {
                    continue;
                }
                let action = if item.rule == RuleID::ACCEPT {
                    Action::Accept
                } else {
                    Action::Reduce(item.rule)
                };
                let contested =
                    matches!(action_row.get(&item.lookahead), Some(existing) if *existing != action);
                if contested {
                    tracing::debug!(
                        "reduce/reduce conflict in state {} on {}",
                        id,
                        item.lookahead.display(g),
                    );
                    conflict = true;
                } else {
                    action_row.insert(item.lookahead, action);
                }
            }

            // Shift and goto cells from the recorded edges. A shift
            // overwrites a competing reduce: shift preference is an explicit
            // priority here, not an iteration-order accident.
            for (symbol, target) in state.edges() {
                match symbol {
                    Symbol::T(..) => {
                        let action = Action::Shift(target);
                        if let Some(existing) = action_row.insert(symbol, action) {
                            if existing != action {
                                tracing::debug!(
                                    "shift/reduce conflict in state {} on {}, preferring shift",
                                    id,
                                    symbol.display(g),
                                );
                                conflict = true;
                            }
                        }
                    }
                    Symbol::N(n) => {
                        goto_row.insert(n, target);
                    }
                    Symbol::End | Symbol::Empty => {
                        unreachable!("automaton edges are labeled by grammar symbols only")
                    }
                }
            }

            actions.push(action_row);
            gotos.push(goto_row);
        }

        if conflict {
            tracing::warn!("ambiguous grammar; the tables use the shift-preference tie-break");
        }

        Self {
            actions,
            gotos,
            conflict,
        }
    }

    pub fn initial_state(&self) -> StateID {
        StateID::START
    }

    /// The action for `(state, lookahead)`, or `None` when the symbol is
    /// unexpected in that state.
    pub fn action(&self, state: StateID, lookahead: Symbol) -> Option<Action> {
        self.actions.get(state.index())?.get(&lookahead).copied()
    }

    /// The state entered after reducing to `nt` with `state` on top of the
    /// state stack.
    pub fn goto(&self, state: StateID, nt: NonterminalID) -> Option<StateID> {
        self.gotos.get(state.index())?.get(&nt).copied()
    }

    /// True iff any action cell was contested during construction.
    /// Diagnostic only; the table is still usable.
    pub fn has_conflict(&self) -> bool {
        self.conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Symbol::*;

    #[test]
    fn generation_is_deterministic() {
        let g = Grammar::define(|g| {
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
        .unwrap();

        let automaton1 = Automaton::generate(&g);
        let table1 = ParseTable::generate(&g, &automaton1);
        let automaton2 = Automaton::generate(&g);
        let table2 = ParseTable::generate(&g, &automaton2);

        // identical rows in identical order, same flag
        assert_eq!(format!("{:?}", table1), format!("{:?}", table2));
    }

    #[test]
    fn unambiguous_grammar_has_no_conflict() {
        let g = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.rule(s, [T('('), N(s), T(')')])?;
            g.rule(s, [T('1')])?;
            Ok(())
        })
        .unwrap();

        let automaton = Automaton::generate(&g);
        let table = ParseTable::generate(&g, &automaton);
        assert!(!table.has_conflict());
    }

    #[test]
    fn accept_sits_on_the_end_column() {
        let g = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.rule(s, [T('x')])?;
            Ok(())
        })
        .unwrap();

        let automaton = Automaton::generate(&g);
        let table = ParseTable::generate(&g, &automaton);

        let mut accepts = 0;
        for (id, _) in automaton.states() {
            if let Some(Action::Accept) = table.action(id, End) {
                accepts += 1;
            }
        }
        assert_eq!(accepts, 1);
    }
}
