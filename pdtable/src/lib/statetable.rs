use std::{collections::VecDeque, error::Error, fmt};

use fnv::{FnvHashMap, FnvHashSet};
use indexmap::IndexSet;
use pdgrammar::{Assoc, Grammar, Priority, RIdx, SyIdx};
use serde::{Deserialize, Serialize};

use crate::itemset::Itemset;
use crate::StIdx;

/// Version tag written into saved tables. Bumped whenever the persisted layout changes.
const TABLE_FORMAT_VERSION: u32 = 1;

/// The decision for one `(state, symbol)` pair. The absence of an entry is a reject: no valid
/// continuation exists.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Push the symbol and move to state X.
    Shift(StIdx),
    /// Reduce rule X unconditionally; no lookahead needed.
    Reduce(RIdx),
    /// The shift/reduce decision depends on one terminal of lookahead. The map covers every
    /// terminal in the alphabet, including the end-of-input symbol.
    Lookahead(FnvHashMap<SyIdx, LAction>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LAction {
    Shift(StIdx),
    Reduce(RIdx),
}

/// An immutable shift-reduce transition table: the sole artifact handed from the compiler to the
/// runtime. The table carries its own copy of the alphabet so that a saved table can be reloaded
/// and driven without recompiling the grammar.
#[derive(Debug, PartialEq)]
pub struct StateTable {
    symbols: Vec<String>,
    sym_map: FnvHashMap<String, SyIdx>,
    actions: FnvHashMap<(StIdx, SyIdx), Action>,
    states_len: u32,
    start_state: StIdx,
}

/// Compiler-local state: the interned canonical item sets (whose insertion index is the state
/// id) and the GOTO memo table. The start state is the empty item set at index 0; because item
/// sets are canonical, an empty GOTO result re-interns to index 0, which callers treat as
/// reject.
struct CompileCtx<'a> {
    grm: &'a Grammar,
    states: IndexSet<Itemset>,
    goto_memo: FnvHashMap<(StIdx, SyIdx), StIdx>,
}

impl<'a> CompileCtx<'a> {
    fn new(grm: &'a Grammar) -> Self {
        let mut states = IndexSet::new();
        states.insert(Itemset::empty());
        CompileCtx {
            grm,
            states,
            goto_memo: FnvHashMap::default(),
        }
    }

    fn itemset(&self, stidx: StIdx) -> &Itemset {
        self.states.get_index(usize::from(stidx)).unwrap()
    }

    /// Memoized GOTO: compute (or recall) the successor state of `stidx` under `sym`, interning
    /// the successor item set if it is new.
    fn goto(&mut self, stidx: StIdx, sym: SyIdx) -> StIdx {
        if let Some(&tgt) = self.goto_memo.get(&(stidx, sym)) {
            return tgt;
        }
        let src = self.itemset(stidx).clone();
        let tgt_set = src.goto(self.grm, sym);
        let tgt = StIdx::from(self.states.insert_full(tgt_set).0);
        self.goto_memo.insert((stidx, sym), tgt);
        tgt
    }

    /// Decide the table entry for `(stidx, sym)` whose successor state `tgt` contains at least
    /// one complete item. `full` is the list of reduce candidates.
    fn resolve(
        &mut self,
        stidx: StIdx,
        sym: SyIdx,
        tgt: StIdx,
        full: &[RIdx],
    ) -> Result<Action, TableError> {
        let grm = self.grm;

        // Select the highest-priority candidate; absent priority only wins if it is the sole
        // candidate, and numeric ties go to Left associativity.
        let mut winner = full[0];
        for &cand in &full[1..] {
            let beats = match (grm.rule_priority(winner), grm.rule_priority(cand)) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(w), Some(c)) => c > w || (c == w && grm.rule_assoc(cand) == Assoc::Left),
            };
            if beats {
                winner = cand;
            }
        }

        // Apply compulsory overrides: a single candidate from an overriding uid group replaces
        // the selection; two or more such candidates make the grammar ambiguous.
        if let Some(w_uid) = grm.rule_uid(winner) {
            if let Some(higher) = grm.overriders(w_uid) {
                let mut exempt: FnvHashSet<RIdx> = FnvHashSet::default();
                for huid in higher {
                    if let Some(rs) = grm.uid_rules(huid) {
                        exempt.extend(rs.iter().copied());
                    }
                }
                let mut chosen = None;
                for &r in full {
                    if exempt.contains(&r) {
                        if chosen.is_some() {
                            return Err(TableError::AmbiguousOverride {
                                state: stidx,
                                symbol: grm.symbol_name(sym).to_string(),
                                rules: full.iter().map(|&r| grm.rule_pp(r)).collect(),
                            });
                        }
                        chosen = Some(r);
                    }
                }
                if let Some(r) = chosen {
                    winner = r;
                }
            }
        }

        // Candidates tied with the winner on (priority, associativity). A candidate whose uid
        // group declares the winner's group as a compulsory override is already resolved and
        // doesn't count towards the tie.
        let w_prio = grm.rule_priority(winner);
        let w_assoc = grm.rule_assoc(winner);
        let w_uid = grm.rule_uid(winner);
        let same_tier = full
            .iter()
            .copied()
            .filter(|&r| {
                grm.rule_priority(r) == w_prio
                    && grm.rule_assoc(r) == w_assoc
                    && !outranked_by(grm, r, w_uid)
            })
            .collect::<Vec<_>>();
        let rr_conflict = |lookahead: Option<String>| TableError::ReduceReduce {
            state: stidx,
            symbol: grm.symbol_name(sym).to_string(),
            lookahead,
            rules: same_tier.iter().map(|&r| grm.rule_pp(r)).collect(),
        };

        let w_prio = match w_prio {
            None => {
                // Without a priority there is nothing to compare a shift against: reduce
                // unconditionally.
                if same_tier.len() > 1 {
                    return Err(rr_conflict(None));
                }
                return Ok(Action::Reduce(winner));
            }
            Some(p) => p,
        };

        // The winner has a priority, so the decision needs one terminal of lookahead: for each
        // terminal, re-enter GOTO from the successor state and compare the strictest option
        // found there against the winner.
        let terms = grm.iter_term_idxs().collect::<Vec<_>>();
        let mut map = FnvHashMap::default();
        for t in terms {
            let ahead = self.goto(tgt, t);
            let moststrict = self.itemset(ahead).items.iter().fold(
                None,
                |ms: Option<(Option<Priority>, Assoc)>, &(r, _)| {
                    let cand = (grm.rule_priority(r), grm.rule_assoc(r));
                    let stricter = match ms {
                        None => true,
                        Some((ms_p, _)) if tighter(cand.0, ms_p) => true,
                        Some((ms_p, _)) => cand.0 == ms_p && cand.1 == Assoc::Right,
                    };
                    if stricter { Some(cand) } else { ms }
                },
            );
            let reduces = match moststrict {
                None => true,
                // Absent priority is treated as tighter than any numeric one here, so it forces
                // a shift; see `tighter`.
                Some((None, _)) => false,
                Some((Some(ms_p), ms_a)) => ms_p > w_prio || (ms_p == w_prio && ms_a != Assoc::Right),
            };
            if reduces {
                if same_tier.len() > 1 {
                    return Err(rr_conflict(Some(grm.symbol_name(t).to_string())));
                }
                map.insert(t, LAction::Reduce(winner));
            } else {
                map.insert(t, LAction::Shift(tgt));
            }
        }
        Ok(Action::Lookahead(map))
    }
}

/// Is priority `a` strictly tighter than `b`? Lower numbers bind tighter, and an absent priority
/// is tighter than any numeric one (a rule without a priority, e.g. a bracketing rule, always
/// wins the "strictest option ahead" scan).
fn tighter(a: Option<Priority>, b: Option<Priority>) -> bool {
    match (a, b) {
        (None, Some(_)) => true,
        (Some(x), Some(y)) => x < y,
        _ => false,
    }
}

/// Does `r`'s uid group declare the group of `w_uid` as a compulsory override?
fn outranked_by(grm: &Grammar, r: RIdx, w_uid: Option<&str>) -> bool {
    match (grm.rule_uid(r), w_uid) {
        (Some(r_uid), Some(w_uid)) if r_uid != w_uid => grm
            .overriders(r_uid)
            .is_some_and(|higher| higher.contains(w_uid)),
        _ => false,
    }
}

impl StateTable {
    /// Compile `grm` into a transition table.
    ///
    /// This is a worklist search over canonical item-set states: every state is paired with
    /// every symbol in the alphabet, the successor item set computed via the memoized GOTO, and
    /// the shift/reduce decision recorded. Newly discovered non-empty states are enqueued
    /// exactly once, whether first reached as shift targets or reduce sites.
    pub fn new(grm: &Grammar) -> Result<Self, TableError> {
        if grm.start_syms().next().is_none() {
            return Err(TableError::NoStartSymbol);
        }
        for s in grm.start_syms() {
            if !grm.is_rule_head(s) {
                return Err(TableError::UnknownStartSymbol {
                    name: grm.symbol_name(s).to_string(),
                });
            }
        }

        let mut ctx = CompileCtx::new(grm);
        let start = StIdx(0);
        let mut actions = FnvHashMap::default();
        let mut seen: FnvHashSet<StIdx> = FnvHashSet::default();
        seen.insert(start);
        let mut todo = VecDeque::new();
        todo.push_back(start);

        while let Some(stidx) = todo.pop_front() {
            for sym in grm.iter_sym_idxs() {
                let tgt = ctx.goto(stidx, sym);
                if tgt == start {
                    // Empty successor set: reject, i.e. no entry.
                    continue;
                }
                if seen.insert(tgt) {
                    todo.push_back(tgt);
                }
                let full = ctx.itemset(tgt).complete_rules(grm);
                let action = if full.is_empty() {
                    Action::Shift(tgt)
                } else {
                    ctx.resolve(stidx, sym, tgt, &full)?
                };
                actions.insert((stidx, sym), action);
            }
        }

        let symbols = grm
            .iter_sym_idxs()
            .map(|s| grm.symbol_name(s).to_string())
            .collect::<Vec<_>>();
        let sym_map = symbols
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), SyIdx::from(i)))
            .collect();
        Ok(StateTable {
            symbols,
            sym_map,
            actions,
            states_len: seen.len() as u32,
            start_state: start,
        })
    }

    /// Return the action for `stidx` and `sym`, or `None` if there isn't any.
    pub fn action(&self, stidx: StIdx, sym: SyIdx) -> Option<&Action> {
        self.actions.get(&(stidx, sym))
    }

    pub fn start_state(&self) -> StIdx {
        self.start_state
    }

    pub fn states_len(&self) -> u32 {
        self.states_len
    }

    /// A table with no entries cannot drive a parse; this only arises from hand-edited saves.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn symbol_idx(&self, name: &str) -> Option<SyIdx> {
        self.sym_map.get(name).copied()
    }

    /// Return the name of symbol `sym`. Panics if `sym` doesn't exist.
    pub fn symbol_name(&self, sym: SyIdx) -> &str {
        &self.symbols[usize::from(sym)]
    }

    /// The end-of-input terminal's column. By construction it is always the first symbol.
    pub fn eof_idx(&self) -> SyIdx {
        SyIdx(0)
    }

    /// Serialize the table (alone, not the grammar) to a versioned JSON text. Entries are
    /// emitted in sorted order so equal tables save to identical text.
    pub fn save(&self) -> Result<String, serde_json::Error> {
        let mut entries = self
            .actions
            .iter()
            .map(|(&(st, sym), action)| {
                let saved = match action {
                    Action::Shift(tgt) => SavedAction::Shift(tgt.0),
                    Action::Reduce(r) => SavedAction::Reduce(r.0),
                    Action::Lookahead(map) => {
                        let mut la = map
                            .iter()
                            .map(|(&t, dec)| {
                                let dec = match dec {
                                    LAction::Shift(tgt) => SavedLAction::Shift(tgt.0),
                                    LAction::Reduce(r) => SavedLAction::Reduce(r.0),
                                };
                                (t.0, dec)
                            })
                            .collect::<Vec<_>>();
                        la.sort_unstable_by_key(|&(t, _)| t);
                        SavedAction::Lookahead(la)
                    }
                };
                (st.0, sym.0, saved)
            })
            .collect::<Vec<_>>();
        entries.sort_unstable_by_key(|&(st, sym, _)| (st, sym));
        serde_json::to_string(&SavedTable {
            version: TABLE_FORMAT_VERSION,
            symbols: self.symbols.clone(),
            states_len: self.states_len,
            start_state: self.start_state.0,
            actions: entries,
        })
    }

    /// Reconstruct a table from [`save`](#method.save) output, bypassing compilation entirely.
    pub fn load(s: &str) -> Result<Self, TableLoadError> {
        let saved: SavedTable = serde_json::from_str(s)?;
        if saved.version != TABLE_FORMAT_VERSION {
            return Err(TableLoadError::Version {
                found: saved.version,
                expected: TABLE_FORMAT_VERSION,
            });
        }
        if saved.actions.is_empty() {
            return Err(TableLoadError::Empty);
        }
        let sym_map = saved
            .symbols
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), SyIdx::from(i)))
            .collect();
        let actions = saved
            .actions
            .into_iter()
            .map(|(st, sym, action)| {
                let action = match action {
                    SavedAction::Shift(tgt) => Action::Shift(StIdx(tgt)),
                    SavedAction::Reduce(r) => Action::Reduce(RIdx(r)),
                    SavedAction::Lookahead(la) => Action::Lookahead(
                        la.into_iter()
                            .map(|(t, dec)| {
                                let dec = match dec {
                                    SavedLAction::Shift(tgt) => LAction::Shift(StIdx(tgt)),
                                    SavedLAction::Reduce(r) => LAction::Reduce(RIdx(r)),
                                };
                                (SyIdx(t), dec)
                            })
                            .collect(),
                    ),
                };
                ((StIdx(st), SyIdx(sym)), action)
            })
            .collect();
        Ok(StateTable {
            symbols: saved.symbols,
            sym_map,
            actions,
            states_len: saved.states_len,
            start_state: StIdx(saved.start_state),
        })
    }
}

#[derive(Deserialize, Serialize)]
struct SavedTable {
    version: u32,
    symbols: Vec<String>,
    states_len: u32,
    start_state: u32,
    actions: Vec<(u32, u32, SavedAction)>,
}

#[derive(Deserialize, Serialize)]
enum SavedAction {
    Shift(u32),
    Reduce(u32),
    Lookahead(Vec<(u32, SavedLAction)>),
}

#[derive(Deserialize, Serialize)]
enum SavedLAction {
    Shift(u32),
    Reduce(u32),
}

/// Grammar compilation errors. Conflicts report the competing rules (pretty-printed) and the
/// state/symbol (and, where relevant, lookahead terminal) at which they collide.
#[derive(Debug, Eq, PartialEq)]
pub enum TableError {
    /// `compile` was called before any start symbol was declared.
    NoStartSymbol,
    /// A declared start symbol has no rules.
    UnknownStartSymbol { name: String },
    /// Two or more rules are reducible at the same point with identical priority and
    /// associativity, and no lookahead terminal separates them.
    ReduceReduce {
        state: StIdx,
        symbol: String,
        lookahead: Option<String>,
        rules: Vec<String>,
    },
    /// A compulsory override matched two or more candidate rules at one reduction point.
    AmbiguousOverride {
        state: StIdx,
        symbol: String,
        rules: Vec<String>,
    },
}

impl Error for TableError {}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TableError::NoStartSymbol => write!(f, "no start symbol declared"),
            TableError::UnknownStartSymbol { name } => {
                write!(f, "start symbol '{}' has no rules", name)
            }
            TableError::ReduceReduce {
                state,
                symbol,
                lookahead,
                rules,
            } => {
                write!(
                    f,
                    "reduce/reduce conflict at state {} on '{}'",
                    state.0, symbol
                )?;
                if let Some(la) = lookahead {
                    write!(f, " (lookahead '{}')", la)?;
                }
                write!(f, " between: {}", rules.join(" | "))
            }
            TableError::AmbiguousOverride {
                state,
                symbol,
                rules,
            } => write!(
                f,
                "ambiguous compulsory override at state {} on '{}' between: {}",
                state.0,
                symbol,
                rules.join(" | ")
            ),
        }
    }
}

/// Errors reconstructing a table from its persisted form.
#[derive(Debug)]
pub enum TableLoadError {
    Json(serde_json::Error),
    Version { found: u32, expected: u32 },
    Empty,
}

impl From<serde_json::Error> for TableLoadError {
    fn from(e: serde_json::Error) -> Self {
        TableLoadError::Json(e)
    }
}

impl Error for TableLoadError {}

impl fmt::Display for TableLoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TableLoadError::Json(e) => write!(f, "malformed table: {}", e),
            TableLoadError::Version { found, expected } => {
                write!(f, "table format version {} (expected {})", found, expected)
            }
            TableLoadError::Empty => write!(f, "table has no entries"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Action, LAction, StateTable, TableError, TableLoadError};
    use crate::StIdx;
    use pdgrammar::{Grammar, RIdx, RuleOptions, SymbolSpec};

    fn syms(names: &[&str]) -> Vec<SymbolSpec> {
        names.iter().map(|n| SymbolSpec::new(*n)).collect()
    }

    fn expr_grammar() -> Grammar {
        let mut grm = Grammar::new();
        grm.add_rule("E", &syms(&["E", "+", "E"]), RuleOptions::new().priority(2))
            .unwrap();
        grm.add_rule("E", &syms(&["E", "*", "E"]), RuleOptions::new().priority(1))
            .unwrap();
        grm.add_rule("E", &syms(&["Id"]), RuleOptions::new()).unwrap();
        grm.declare_start("E");
        grm
    }

    fn shift_target(st: &StateTable, from: StIdx, sym: &str) -> StIdx {
        match st.action(from, st.symbol_idx(sym).unwrap()) {
            Some(Action::Shift(tgt)) => *tgt,
            a => panic!("expected shift on '{}', got {:?}", sym, a),
        }
    }

    #[test]
    fn expr_grammar_table_shape() {
        let grm = expr_grammar();
        let st = StateTable::new(&grm).unwrap();
        let s0 = st.start_state();

        // Id completes E: Id and reduces unconditionally (no priority on that rule).
        assert_eq!(
            st.action(s0, st.symbol_idx("Id").unwrap()),
            Some(&Action::Reduce(RIdx(2)))
        );

        // Pushing E from the start state opens the two binary rules.
        let s1 = shift_target(&st, s0, "E");
        let s2 = shift_target(&st, s1, "+");
        assert_eq!(
            st.action(s2, st.symbol_idx("Id").unwrap()),
            Some(&Action::Reduce(RIdx(2)))
        );

        // After `E + E` the decision is lookahead-dependent: `*` binds tighter and shifts,
        // `+` and end-of-input reduce (left associativity).
        match st.action(s2, st.symbol_idx("E").unwrap()) {
            Some(Action::Lookahead(map)) => {
                assert!(matches!(
                    map.get(&st.symbol_idx("*").unwrap()),
                    Some(LAction::Shift(_))
                ));
                assert_eq!(
                    map.get(&st.symbol_idx("+").unwrap()),
                    Some(&LAction::Reduce(RIdx(0)))
                );
                assert_eq!(map.get(&st.eof_idx()), Some(&LAction::Reduce(RIdx(0))));
            }
            a => panic!("expected lookahead split, got {:?}", a),
        }

        // And symmetrically after `E * E`, `+` reduces the tighter `*` rule first.
        let s3 = shift_target(&st, s1, "*");
        match st.action(s3, st.symbol_idx("E").unwrap()) {
            Some(Action::Lookahead(map)) => {
                assert_eq!(
                    map.get(&st.symbol_idx("+").unwrap()),
                    Some(&LAction::Reduce(RIdx(1)))
                );
                assert_eq!(
                    map.get(&st.symbol_idx("*").unwrap()),
                    Some(&LAction::Reduce(RIdx(1)))
                );
            }
            a => panic!("expected lookahead split, got {:?}", a),
        }

        // No entry at all for a token that can't appear here.
        assert_eq!(st.action(s2, st.symbol_idx("+").unwrap()), None);

        // Exactly the worklist states count: start, E-after-start, Id-complete, E +, E *,
        // E + E, E * E.
        assert_eq!(st.states_len(), 7);
    }

    #[test]
    fn compile_is_deterministic() {
        let a = StateTable::new(&expr_grammar()).unwrap();
        let b = StateTable::new(&expr_grammar()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn no_start_symbol_rejected() {
        let mut grm = Grammar::new();
        grm.add_rule("S", &syms(&["a"]), RuleOptions::new()).unwrap();
        match StateTable::new(&grm) {
            Err(TableError::NoStartSymbol) => (),
            r => panic!("expected NoStartSymbol, got {:?}", r.map(|_| ())),
        }

        grm.declare_start("T");
        match StateTable::new(&grm) {
            Err(TableError::UnknownStartSymbol { name }) => assert_eq!(name, "T"),
            r => panic!("expected UnknownStartSymbol, got {:?}", r.map(|_| ())),
        }
    }

    #[test]
    fn reduce_reduce_conflict_detected() {
        // A and B are both reducible after `a` at the same tier, with no lookahead to separate
        // them.
        let mut grm = Grammar::new();
        grm.add_rule("S", &syms(&["A", "x"]), RuleOptions::new()).unwrap();
        grm.add_rule("S", &syms(&["B", "y"]), RuleOptions::new()).unwrap();
        grm.add_rule("A", &syms(&["a"]), RuleOptions::new().priority(1))
            .unwrap();
        grm.add_rule("B", &syms(&["a"]), RuleOptions::new().priority(1))
            .unwrap();
        grm.declare_start("S");
        match StateTable::new(&grm) {
            Err(TableError::ReduceReduce { symbol, rules, .. }) => {
                assert_eq!(symbol, "a");
                assert_eq!(rules, vec!["A: a".to_string(), "B: a".to_string()]);
            }
            r => panic!("expected ReduceReduce, got {:?}", r.map(|_| ())),
        }
    }

    #[test]
    fn priorityless_reduce_reduce_conflict_detected() {
        let mut grm = Grammar::new();
        grm.add_rule("S", &syms(&["A"]), RuleOptions::new()).unwrap();
        grm.add_rule("S", &syms(&["B"]), RuleOptions::new()).unwrap();
        grm.add_rule("A", &syms(&["a"]), RuleOptions::new()).unwrap();
        grm.add_rule("B", &syms(&["a"]), RuleOptions::new()).unwrap();
        grm.declare_start("S");
        match StateTable::new(&grm) {
            Err(TableError::ReduceReduce { lookahead, .. }) => assert_eq!(lookahead, None),
            r => panic!("expected ReduceReduce, got {:?}", r.map(|_| ())),
        }
    }

    #[test]
    fn compulsory_override_resolves_tie() {
        let mut grm = Grammar::new();
        grm.add_rule("S", &syms(&["A", "x"]), RuleOptions::new()).unwrap();
        grm.add_rule("S", &syms(&["B", "y"]), RuleOptions::new()).unwrap();
        grm.add_rule("A", &syms(&["a"]), RuleOptions::new().priority(1).uid("ua"))
            .unwrap();
        grm.add_rule("B", &syms(&["a"]), RuleOptions::new().priority(1).uid("ub"))
            .unwrap();
        grm.declare_start("S");
        grm.add_extra_priority("ua", "ub").unwrap();

        let st = StateTable::new(&grm).unwrap();
        let b_ridx = grm.uid_rules("ub").unwrap()[0];
        match st.action(st.start_state(), st.symbol_idx("a").unwrap()) {
            Some(Action::Lookahead(map)) => {
                for (_, dec) in map.iter() {
                    assert_eq!(dec, &LAction::Reduce(b_ridx));
                }
            }
            a => panic!("expected lookahead split, got {:?}", a),
        }
    }

    #[test]
    fn ambiguous_override_rejected() {
        let mut grm = Grammar::new();
        grm.add_rule("S", &syms(&["A", "x"]), RuleOptions::new()).unwrap();
        grm.add_rule("S", &syms(&["B", "y"]), RuleOptions::new()).unwrap();
        grm.add_rule("S", &syms(&["C", "z"]), RuleOptions::new()).unwrap();
        grm.add_rule("A", &syms(&["a"]), RuleOptions::new().priority(2).uid("ua"))
            .unwrap();
        grm.add_rule("B", &syms(&["a"]), RuleOptions::new().priority(1).uid("ub"))
            .unwrap();
        grm.add_rule("C", &syms(&["a"]), RuleOptions::new().priority(1).uid("uc"))
            .unwrap();
        grm.declare_start("S");
        grm.add_extra_priority("ua", "ub").unwrap();
        grm.add_extra_priority("ua", "uc").unwrap();
        match StateTable::new(&grm) {
            Err(TableError::AmbiguousOverride { symbol, .. }) => assert_eq!(symbol, "a"),
            r => panic!("expected AmbiguousOverride, got {:?}", r.map(|_| ())),
        }
    }

    #[test]
    fn save_load_round_trip() {
        let st = StateTable::new(&expr_grammar()).unwrap();
        let text = st.save().unwrap();
        let st2 = StateTable::load(&text).unwrap();
        assert_eq!(st, st2);
        // Saving is deterministic text, too.
        assert_eq!(text, st2.save().unwrap());
    }

    #[test]
    fn load_rejects_bad_version() {
        let st = StateTable::new(&expr_grammar()).unwrap();
        let text = st.save().unwrap().replace("\"version\":1", "\"version\":99");
        match StateTable::load(&text) {
            Err(TableLoadError::Version { found: 99, expected: 1 }) => (),
            r => panic!("expected Version, got {:?}", r.map(|_| ())),
        }
    }
}
