use std::collections::HashSet;

use pdgrammar::{Grammar, RIdx, SyIdx};

/// An item is a rule paired with a cursor into its body. A dot equal to the body length means
/// the rule is fully matched ("complete").
pub type Item = (RIdx, u32);

/// A canonical set of items: sorted by `(rule, dot)` and deduplicated, so that structurally
/// identical sets compare (and hash) equal. The empty set is the start state: no input prefix
/// has been consumed yet.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Itemset {
    pub items: Vec<Item>,
}

impl Itemset {
    pub fn empty() -> Self {
        Itemset { items: Vec::new() }
    }

    pub fn is_start(&self) -> bool {
        self.items.is_empty()
    }

    /// Compute the successor item set for input `sym`.
    ///
    /// Items whose next unconsumed body symbol is `sym` are advanced by one. In addition, every
    /// rule that could freshly begin here enters the set at dot 1: its head must be reachable
    /// as a next-expected non-terminal (transitively through leading body symbols; for the
    /// start state, seeded from the declared start symbols) and its first body symbol must
    /// equal `sym`.
    pub fn goto(&self, grm: &Grammar, sym: SyIdx) -> Itemset {
        let mut new = Vec::new();
        let mut valid: HashSet<SyIdx> = HashSet::new();
        if self.is_start() {
            valid.extend(grm.start_syms());
        }

        for &(ridx, dot) in &self.items {
            let body = grm.rule(ridx).body();
            if (dot as usize) < body.len() {
                let next = body[dot as usize];
                if next == sym {
                    new.push((ridx, dot + 1));
                }
                if grm.is_rule_head(next) {
                    valid.insert(next);
                }
            }
        }

        // Close `valid` over leading body symbols: if A is expected and A's rules can begin
        // with B, then B is expected too.
        loop {
            let before = valid.len();
            for i in 0..grm.rules_len() {
                let rule = grm.rule(RIdx::from(i));
                let first = rule.body()[0];
                if valid.contains(&rule.head()) && grm.is_rule_head(first) {
                    valid.insert(first);
                }
            }
            if valid.len() == before {
                break;
            }
        }

        for i in 0..grm.rules_len() {
            let rule = grm.rule(RIdx::from(i));
            if valid.contains(&rule.head()) && rule.body()[0] == sym {
                new.push((RIdx::from(i), 1));
            }
        }

        new.sort_unstable();
        new.dedup();
        Itemset { items: new }
    }

    /// The rules of all complete items in this set: the reduce candidates.
    pub fn complete_rules(&self, grm: &Grammar) -> Vec<RIdx> {
        self.items
            .iter()
            .filter(|&&(ridx, dot)| dot as usize == grm.rule(ridx).body().len())
            .map(|&(ridx, _)| ridx)
            .collect()
    }
}
