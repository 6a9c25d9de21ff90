//! Canonical LR(1) parsing over character streams.
//!
//! A [`grammar::Grammar`] goes through [`lr1::Automaton`] construction and
//! [`parse_table::ParseTable`] generation into an [`engine::Parser`], which
//! drives a shift-reduce state machine over input characters and yields a
//! labeled [`engine::ParseTree`]. Grammars can be described programmatically
//! through `Grammar::define` or textually through the [`syntax`] front end.

pub mod engine;
pub mod grammar;
pub mod lr1;
pub mod parse_table;
pub mod syntax;
pub mod types;
