#![allow(clippy::new_without_default)]

//! A library for building priority-annotated grammars. Instead of encoding operator precedence
//! structurally (one rule per precedence level), rules carry a numeric priority and an
//! associativity directly, plus an optional uid group that can take part in a compulsory
//! priority override. `pdtable` compiles such a grammar into a shift-reduce transition table and
//! `pdpar` executes it.
//!
//! A [`Grammar`](grammar/struct.Grammar.html) is built up imperatively:
//!
//!   * `declare_start` marks one or more non-terminals as valid parse roots.
//!   * `add_rule` registers a production; a body symbol marked optional expands the registration
//!     into one rule per include/exclude combination.
//!   * `add_extra_priority` records a compulsory override edge between two uid groups.
//!
//! After setup the grammar is frozen: compilation and parsing only read it (reduction callbacks
//! excepted, which hold `FnMut` state).

mod idxnewtype;
pub mod grammar;

pub use crate::idxnewtype::{RIdx, SyIdx};
pub use crate::grammar::{
    Assoc, Grammar, GrammarError, ParseSymbol, Priority, ReduceCallback, Rule, RuleOptions,
    SymbolSpec, EOF_SYMBOL,
};
