#![allow(clippy::new_without_default)]

//! Compiles a [`pdgrammar::Grammar`] into an immutable shift-reduce
//! [`StateTable`](statetable/struct.StateTable.html). States are canonical item sets discovered
//! by a worklist search from the start state; shift/reduce ambiguity is resolved by the rules'
//! numeric priorities and associativities, re-entering the GOTO function with one terminal of
//! lookahead where a priority demands it. The resulting table is the only artifact the runtime
//! needs and can be persisted and reloaded without recompiling.

pub mod itemset;
pub mod statetable;

pub use crate::itemset::Itemset;
pub use crate::statetable::{
    Action, LAction, StateTable, TableError, TableLoadError,
};

/// A type specifically for state table indices. The start state is always `StIdx(0)`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StIdx(pub u32);

impl From<StIdx> for usize {
    fn from(st: StIdx) -> usize {
        st.0 as usize
    }
}

impl From<usize> for StIdx {
    fn from(i: usize) -> StIdx {
        debug_assert!(u32::try_from(i).is_ok());
        StIdx(i as u32)
    }
}
