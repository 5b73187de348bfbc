use std::{collections::HashSet, error::Error, fmt};

use indexmap::{IndexMap, IndexSet};

use crate::{RIdx, SyIdx};

/// The name of the reserved end-of-input terminal. It is interned into every grammar's alphabet
/// at `SyIdx(0)` and may not be used as a rule head.
pub const EOF_SYMBOL: &str = "$end";

pub type Priority = u32;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Assoc {
    #[default]
    Left,
    Right,
}

/// A reference to a symbol inside a rule body at grammar-definition time. Marking a symbol
/// optional causes [`Grammar::add_rule`] to register one rule variant with the symbol and one
/// without it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SymbolSpec {
    name: String,
    optional: bool,
}

impl SymbolSpec {
    pub fn new<S: Into<String>>(name: S) -> Self {
        SymbolSpec {
            name: name.into(),
            optional: false,
        }
    }

    /// An optional occurrence of `name`.
    pub fn opt<S: Into<String>>(name: S) -> Self {
        SymbolSpec {
            name: name.into(),
            optional: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// A symbol instance observed (for terminals) or synthesized (for rule heads) during a parse.
/// Reduction callbacks receive the synthesized head plus the matched body symbols, each already
/// reduced to its head form for non-terminals.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseSymbol {
    pub name: String,
}

impl ParseSymbol {
    pub fn new<S: Into<String>>(name: S) -> Self {
        ParseSymbol { name: name.into() }
    }
}

pub type ReduceCallback = Box<dyn FnMut(&ParseSymbol, &[ParseSymbol])>;

/// Per-rule metadata. One `RuleOptions` value is shared by every optional-expansion variant of a
/// single [`Grammar::add_rule`] call, so variants share their uid, priority, and callback.
///
/// An absent priority means "always reduce, no lookahead needed"; a present priority makes the
/// shift/reduce decision at reduction points depend on one token of lookahead.
#[derive(Default)]
pub struct RuleOptions {
    pub(crate) priority: Option<Priority>,
    pub(crate) assoc: Assoc,
    pub(crate) uid: Option<String>,
    pub(crate) callback: Option<ReduceCallback>,
}

impl RuleOptions {
    pub fn new() -> Self {
        RuleOptions::default()
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn assoc(mut self, assoc: Assoc) -> Self {
        self.assoc = assoc;
        self
    }

    /// An opaque grouping identifier, unique across `add_rule` calls. Needed only by rules that
    /// take part in a compulsory priority override.
    pub fn uid<S: Into<String>>(mut self, uid: S) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: FnMut(&ParseSymbol, &[ParseSymbol]) + 'static,
    {
        self.callback = Some(Box::new(f));
        self
    }
}

/// A single concrete production: a head symbol and a non-empty body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rule {
    head: SyIdx,
    body: Vec<SyIdx>,
    opts: usize,
}

impl Rule {
    pub fn head(&self) -> SyIdx {
        self.head
    }

    pub fn body(&self) -> &[SyIdx] {
        &self.body
    }
}

/// A mutable grammar under construction: registered rules, the interned alphabet, declared start
/// symbols, and the compulsory-override relation. A `Grammar` is only mutated during the setup
/// phase; compiling it (`pdtable::StateTable::new`) never changes it.
///
/// The terminal/non-terminal split is derived rather than declared: a symbol is a non-terminal
/// iff some rule has been registered with it as head. A symbol that first appears in a rule body
/// is classified as a terminal until (if ever) a rule for it arrives, at which point it is
/// promoted. Registration order therefore affects intermediate classification but not compiled
/// behavior.
pub struct Grammar {
    symbols: IndexSet<String>,
    rules: Vec<Rule>,
    opts: Vec<RuleOptions>,
    heads: HashSet<SyIdx>,
    uid_rules: IndexMap<String, Vec<RIdx>>,
    overrides: IndexMap<String, IndexSet<String>>,
    starts: IndexSet<SyIdx>,
}

impl Grammar {
    pub fn new() -> Self {
        let mut symbols = IndexSet::new();
        symbols.insert(EOF_SYMBOL.to_string());
        Grammar {
            symbols,
            rules: Vec::new(),
            opts: Vec::new(),
            heads: HashSet::new(),
            uid_rules: IndexMap::new(),
            overrides: IndexMap::new(),
            starts: IndexSet::new(),
        }
    }

    fn intern(&mut self, name: &str) -> SyIdx {
        SyIdx::from(self.symbols.insert_full(name.to_string()).0)
    }

    /// Mark `name` as a valid parse root. May be called more than once; duplicates are ignored.
    /// At least one start symbol must be declared before the grammar is compiled.
    pub fn declare_start(&mut self, name: &str) {
        let sidx = self.intern(name);
        self.starts.insert(sidx);
    }

    /// Register a rule `head -> body`. If any body symbol is optional, the registration expands
    /// into one concrete rule per include/exclude combination (`2^m` rules for `m` optional
    /// symbols), all sharing `options`. The body must be non-empty, and at least one symbol must
    /// be non-optional so that no variant is empty.
    pub fn add_rule(
        &mut self,
        head: &str,
        body: &[SymbolSpec],
        options: RuleOptions,
    ) -> Result<(), GrammarError> {
        if head == EOF_SYMBOL {
            return Err(GrammarError::ReservedSymbol {
                name: head.to_string(),
            });
        }
        if body.is_empty() || body.iter().all(|s| s.optional) {
            return Err(GrammarError::EmptyBody {
                head: head.to_string(),
            });
        }
        if let Some(uid) = &options.uid {
            if self.uid_rules.contains_key(uid) {
                return Err(GrammarError::DuplicateUid { uid: uid.clone() });
            }
        }

        let uid = options.uid.clone();
        self.opts.push(options);
        let oidx = self.opts.len() - 1;

        let hidx = self.intern(head);
        self.heads.insert(hidx);

        for variant in expand_optionals(body) {
            let body_idxs = variant
                .iter()
                .map(|spec| self.intern(spec.name()))
                .collect::<Vec<_>>();
            self.rules.push(Rule {
                head: hidx,
                body: body_idxs,
                opts: oidx,
            });
            if let Some(uid) = &uid {
                let ridx = RIdx::from(self.rules.len() - 1);
                self.uid_rules.entry(uid.clone()).or_default().push(ridx);
            }
        }
        Ok(())
    }

    /// Record that, where rules from the two groups compete for the same reduction at the same
    /// priority/associativity tier, the member of `higher_uid`'s group wins. Both uids must
    /// already have been used by a registered rule.
    pub fn add_extra_priority(
        &mut self,
        lower_uid: &str,
        higher_uid: &str,
    ) -> Result<(), GrammarError> {
        for uid in [lower_uid, higher_uid] {
            if !self.uid_rules.contains_key(uid) {
                return Err(GrammarError::UnknownUid {
                    uid: uid.to_string(),
                });
            }
        }
        self.overrides
            .entry(lower_uid.to_string())
            .or_default()
            .insert(higher_uid.to_string());
        Ok(())
    }

    pub fn rules_len(&self) -> usize {
        self.rules.len()
    }

    /// Return the rule for `ridx`. Panics if `ridx` doesn't exist.
    pub fn rule(&self, ridx: RIdx) -> &Rule {
        &self.rules[usize::from(ridx)]
    }

    pub fn rule_options(&self, ridx: RIdx) -> &RuleOptions {
        &self.opts[self.rules[usize::from(ridx)].opts]
    }

    pub fn rule_priority(&self, ridx: RIdx) -> Option<Priority> {
        self.rule_options(ridx).priority
    }

    pub fn rule_assoc(&self, ridx: RIdx) -> Assoc {
        self.rule_options(ridx).assoc
    }

    pub fn rule_uid(&self, ridx: RIdx) -> Option<&str> {
        self.rule_options(ridx).uid.as_deref()
    }

    pub fn symbols_len(&self) -> usize {
        self.symbols.len()
    }

    /// Return the name of symbol `sidx`. Panics if `sidx` doesn't exist.
    pub fn symbol_name(&self, sidx: SyIdx) -> &str {
        self.symbols
            .get_index(usize::from(sidx))
            .map(|s| s.as_str())
            .unwrap()
    }

    pub fn symbol_idx(&self, name: &str) -> Option<SyIdx> {
        self.symbols.get_index_of(name).map(SyIdx::from)
    }

    pub fn eof_idx(&self) -> SyIdx {
        SyIdx(0)
    }

    pub fn is_rule_head(&self, sidx: SyIdx) -> bool {
        self.heads.contains(&sidx)
    }

    /// Iterate over the full alphabet (terminals and non-terminals) in interning order.
    pub fn iter_sym_idxs(&self) -> impl Iterator<Item = SyIdx> {
        (0..self.symbols.len()).map(SyIdx::from)
    }

    /// Iterate over the terminal alphabet, including the end-of-input symbol.
    pub fn iter_term_idxs(&self) -> impl Iterator<Item = SyIdx> + '_ {
        self.iter_sym_idxs().filter(|s| !self.is_rule_head(*s))
    }

    pub fn start_syms(&self) -> impl Iterator<Item = SyIdx> + '_ {
        self.starts.iter().copied()
    }

    pub fn uid_rules(&self, uid: &str) -> Option<&[RIdx]> {
        self.uid_rules.get(uid).map(|v| v.as_slice())
    }

    /// The set of uids whose rules compulsorily outrank `lower_uid`'s, if any edge was declared.
    pub fn overriders(&self, lower_uid: &str) -> Option<&IndexSet<String>> {
        self.overrides.get(lower_uid)
    }

    /// Pretty-print rule `ridx` as `Head: sym1 sym2 ...` for diagnostics.
    pub fn rule_pp(&self, ridx: RIdx) -> String {
        let rule = self.rule(ridx);
        let mut s = format!("{}:", self.symbol_name(rule.head()));
        for &sidx in rule.body() {
            s.push(' ');
            s.push_str(self.symbol_name(sidx));
        }
        s
    }

    /// Fire the reduction callback of `ridx`, if one was registered. Callbacks may have arbitrary
    /// side effects but have no access to the parser's stacks.
    pub fn invoke_callback(&mut self, ridx: RIdx, head: &ParseSymbol, matched: &[ParseSymbol]) {
        let oidx = self.rules[usize::from(ridx)].opts;
        if let Some(cb) = self.opts[oidx].callback.as_mut() {
            cb(head, matched);
        }
    }
}

/// Expand a body with optional symbols into all include/exclude combinations, preserving the
/// relative order of the symbols that remain. The first variant is the one with every symbol
/// included.
fn expand_optionals(body: &[SymbolSpec]) -> Vec<Vec<&SymbolSpec>> {
    let mut variants = vec![vec![&body[0]]];
    if body[0].optional {
        variants.push(vec![]);
    }
    for spec in &body[1..] {
        let l = variants.len();
        if spec.optional {
            for i in 0..l {
                let clone = variants[i].clone();
                variants.push(clone);
            }
        }
        for variant in variants.iter_mut().take(l) {
            variant.push(spec);
        }
    }
    variants
}

#[derive(Debug, Eq, PartialEq)]
pub enum GrammarError {
    /// The reserved end-of-input symbol was used as a rule head.
    ReservedSymbol { name: String },
    /// A rule body was empty, or expanded to an empty variant because every symbol was optional.
    EmptyBody { head: String },
    /// The same uid was passed to more than one `add_rule` call.
    DuplicateUid { uid: String },
    /// `add_extra_priority` referenced a uid no registered rule carries.
    UnknownUid { uid: String },
}

impl Error for GrammarError {}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GrammarError::ReservedSymbol { name } => {
                write!(f, "'{}' is reserved and cannot head a rule", name)
            }
            GrammarError::EmptyBody { head } => {
                write!(f, "rule for '{}' has an empty body", head)
            }
            GrammarError::DuplicateUid { uid } => {
                write!(f, "rule uid '{}' registered twice", uid)
            }
            GrammarError::UnknownUid { uid } => {
                write!(f, "unknown rule uid '{}'", uid)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Assoc, Grammar, GrammarError, RuleOptions, SymbolSpec, EOF_SYMBOL};
    use crate::SyIdx;

    fn syms(names: &[&str]) -> Vec<SymbolSpec> {
        names.iter().map(|n| SymbolSpec::new(*n)).collect()
    }

    #[test]
    fn eof_is_reserved_at_index_zero() {
        let mut grm = Grammar::new();
        assert_eq!(grm.symbol_idx(EOF_SYMBOL), Some(SyIdx(0)));
        assert_eq!(grm.eof_idx(), SyIdx(0));
        assert!(!grm.is_rule_head(grm.eof_idx()));

        // It can appear in a body (where it stays a terminal) but never head a rule.
        match grm.add_rule(EOF_SYMBOL, &syms(&["a"]), RuleOptions::new()) {
            Err(GrammarError::ReservedSymbol { name }) => assert_eq!(name, EOF_SYMBOL),
            r => panic!("expected ReservedSymbol, got {:?}", r.map(|_| ())),
        }
        assert!(!grm.is_rule_head(grm.eof_idx()));
    }

    #[test]
    fn empty_body_rejected() {
        let mut grm = Grammar::new();
        match grm.add_rule("S", &[], RuleOptions::new()) {
            Err(GrammarError::EmptyBody { head }) => assert_eq!(head, "S"),
            r => panic!("expected EmptyBody, got {:?}", r.map(|_| ())),
        }
        // All-optional bodies would expand to an empty variant.
        match grm.add_rule("S", &[SymbolSpec::opt("a")], RuleOptions::new()) {
            Err(GrammarError::EmptyBody { .. }) => (),
            r => panic!("expected EmptyBody, got {:?}", r.map(|_| ())),
        }
    }

    #[test]
    fn optional_expansion_powerset() {
        let mut grm = Grammar::new();
        grm.add_rule(
            "Decl",
            &[
                SymbolSpec::opt("const"),
                SymbolSpec::new("type"),
                SymbolSpec::opt("name"),
                SymbolSpec::new("semi"),
            ],
            RuleOptions::new().uid("decl"),
        )
        .unwrap();

        // 2 optional symbols -> 2^2 variants, all under the same uid group.
        assert_eq!(grm.rules_len(), 4);
        assert_eq!(grm.uid_rules("decl").unwrap().len(), 4);

        let bodies = (0..grm.rules_len())
            .map(|i| {
                grm.rule(crate::RIdx::from(i))
                    .body()
                    .iter()
                    .map(|&s| grm.symbol_name(s))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        // The first variant keeps every symbol; all variants preserve left-to-right order.
        assert_eq!(bodies[0], vec!["const", "type", "name", "semi"]);
        assert!(bodies.contains(&vec!["type", "semi"]));
        assert!(bodies.contains(&vec!["const", "type", "semi"]));
        assert!(bodies.contains(&vec!["type", "name", "semi"]));
        for body in &bodies {
            let in_order = body
                .iter()
                .map(|n| ["const", "type", "name", "semi"].iter().position(|x| x == n).unwrap())
                .collect::<Vec<_>>();
            assert!(in_order.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn duplicate_uid_rejected() {
        let mut grm = Grammar::new();
        grm.add_rule("S", &syms(&["a"]), RuleOptions::new().uid("u1"))
            .unwrap();
        match grm.add_rule("S", &syms(&["b"]), RuleOptions::new().uid("u1")) {
            Err(GrammarError::DuplicateUid { uid }) => assert_eq!(uid, "u1"),
            r => panic!("expected DuplicateUid, got {:?}", r.map(|_| ())),
        }
    }

    #[test]
    fn extra_priority_requires_known_uids() {
        let mut grm = Grammar::new();
        grm.add_rule("S", &syms(&["a"]), RuleOptions::new().uid("u1"))
            .unwrap();
        match grm.add_extra_priority("u1", "nope") {
            Err(GrammarError::UnknownUid { uid }) => assert_eq!(uid, "nope"),
            r => panic!("expected UnknownUid, got {:?}", r.map(|_| ())),
        }
        grm.add_rule("S", &syms(&["b"]), RuleOptions::new().uid("u2"))
            .unwrap();
        grm.add_extra_priority("u1", "u2").unwrap();
        assert!(grm.overriders("u1").unwrap().contains("u2"));
        assert!(grm.overriders("u2").is_none());
    }

    #[test]
    fn terminal_promoted_to_nonterminal() {
        let mut grm = Grammar::new();
        grm.add_rule("S", &syms(&["A", "b"]), RuleOptions::new())
            .unwrap();
        let a = grm.symbol_idx("A").unwrap();
        // "A" has only been seen in a body so far: it's a terminal.
        assert!(!grm.is_rule_head(a));
        assert!(grm.iter_term_idxs().any(|s| s == a));

        grm.add_rule("A", &syms(&["a"]), RuleOptions::new()).unwrap();
        assert!(grm.is_rule_head(a));
        assert!(grm.iter_term_idxs().all(|s| s != a));
    }

    #[test]
    fn rule_priority_and_assoc_shared_across_variants() {
        let mut grm = Grammar::new();
        grm.add_rule(
            "E",
            &[SymbolSpec::new("E"), SymbolSpec::opt("x"), SymbolSpec::new("y")],
            RuleOptions::new().priority(3).assoc(Assoc::Right),
        )
        .unwrap();
        for i in 0..grm.rules_len() {
            let ridx = crate::RIdx::from(i);
            assert_eq!(grm.rule_priority(ridx), Some(3));
            assert_eq!(grm.rule_assoc(ridx), Assoc::Right);
        }
    }

    #[test]
    fn rule_pp_formats_head_and_body() {
        let mut grm = Grammar::new();
        grm.add_rule("E", &syms(&["E", "+", "E"]), RuleOptions::new())
            .unwrap();
        assert_eq!(grm.rule_pp(crate::RIdx(0)), "E: E + E");
    }
}
