use std::{error::Error, fmt};

use pdgrammar::{Grammar, ParseSymbol, RIdx};
use pdtable::{Action, LAction, StIdx, StateTable};

use crate::token::{TokenError, TokenSource};

/// The marker at the bottom of the symbol stack. A finished parse leaves exactly the marker and
/// one result symbol on the stack.
const STACK_BOTTOM: &str = "$";

/// Drives a token stream through a compiled [`StateTable`], invoking the grammar's reduction
/// callbacks as rules complete. The grammar is borrowed mutably for the duration because
/// callbacks are `FnMut`.
pub struct Parser<'a> {
    grm: &'a mut Grammar,
    stable: &'a StateTable,
    lenient_eof: bool,
}

impl<'a> Parser<'a> {
    pub fn new(grm: &'a mut Grammar, stable: &'a StateTable) -> Self {
        Parser {
            grm,
            stable,
            lenient_eof: true,
        }
    }

    /// Controls the accept-at-end allowance: a symbol with no table entry is pushed onto the
    /// symbol stack anyway, rather than failing, when the stream is already at its final token.
    /// This is how a fully reduced start symbol lands on the stack when no rule consumes it, so
    /// disabling it rejects grammars whose start symbol never reappears in a rule body.
    pub fn lenient_eof(mut self, flag: bool) -> Self {
        self.lenient_eof = flag;
        self
    }

    /// Parse `toks` to completion, or until a reduction leaves `stop` as the sole symbol on the
    /// stack. Returns the number of tokens consumed; the token that triggered a stop is left
    /// under the cursor and not counted.
    pub fn parse<T: TokenSource>(
        &mut self,
        toks: &mut T,
        stop: Option<&str>,
    ) -> Result<usize, ParseError> {
        if self.stable.is_empty() {
            return Err(ParseError::NotCompiled);
        }
        let mut statestack = vec![self.stable.start_state()];
        let mut symbolstack = vec![ParseSymbol::new(STACK_BOTTOM)];
        let mut consumed = 0;
        loop {
            let tok = toks.current().clone();
            if tok.is_end() {
                break;
            }
            self.push_symbol(
                &ParseSymbol::new(tok.name()),
                &mut statestack,
                &mut symbolstack,
                toks,
            )?;
            if let Some(stop) = stop {
                if symbolstack.len() == 2 && symbolstack[1].name == stop {
                    break;
                }
            }
            toks.next()?;
            consumed += 1;
        }
        if symbolstack.len() != 2 {
            return Err(ParseError::UnexpectedFinish {
                statestack,
                symbolstack: names(&symbolstack),
            });
        }
        Ok(consumed)
    }

    /// Push one symbol (a token or a freshly reduced non-terminal) against the current state.
    /// Reductions recurse back in here with the synthesized head, so a single token can trigger
    /// a cascade of reductions before it finally shifts.
    fn push_symbol<T: TokenSource>(
        &mut self,
        sym: &ParseSymbol,
        statestack: &mut Vec<StIdx>,
        symbolstack: &mut Vec<ParseSymbol>,
        toks: &mut T,
    ) -> Result<(), ParseError> {
        let stable = self.stable;
        let stidx = *statestack.last().unwrap();
        let sidx = stable.symbol_idx(&sym.name);
        let action = sidx.and_then(|sidx| stable.action(stidx, sidx));
        match action {
            None => {
                // Reject, unless the symbol is in the alphabet and the stream is at its final
                // token: then the symbol (typically a fully reduced start symbol with no entry
                // of its own) is stacked unresolved and the finish check decides acceptance.
                // Symbols the grammar has never seen always reject.
                if self.lenient_eof && sidx.is_some() {
                    toks.next()?;
                    let at_end = toks.current().is_end();
                    toks.unnext()?;
                    if at_end {
                        symbolstack.push(sym.clone());
                        return Ok(());
                    }
                }
                Err(ParseError::Unexpected {
                    symbol: sym.name.clone(),
                    statestack: statestack.clone(),
                    symbolstack: names(symbolstack),
                })
            }
            Some(Action::Shift(tgt)) => {
                statestack.push(*tgt);
                symbolstack.push(sym.clone());
                Ok(())
            }
            Some(&Action::Reduce(ridx)) => {
                self.reduce_by_rule(ridx, sym, statestack, symbolstack, toks)
            }
            Some(Action::Lookahead(map)) => {
                toks.next()?;
                let peek = toks.current().clone();
                toks.unnext()?;
                let key = if peek.is_end() {
                    Some(stable.eof_idx())
                } else {
                    stable.symbol_idx(peek.name())
                };
                match key.and_then(|k| map.get(&k)) {
                    Some(&LAction::Shift(tgt)) => {
                        statestack.push(tgt);
                        symbolstack.push(sym.clone());
                        Ok(())
                    }
                    Some(&LAction::Reduce(ridx)) => {
                        self.reduce_by_rule(ridx, sym, statestack, symbolstack, toks)
                    }
                    None => Err(ParseError::NoLookahead {
                        symbol: sym.name.clone(),
                        lookahead: if peek.is_end() {
                            "<end of input>".to_string()
                        } else {
                            peek.name().to_string()
                        },
                    }),
                }
            }
        }
    }

    /// Complete rule `ridx`: pop its matched body, fire the reduction callback, and push the
    /// synthesized head. `sym` is the symbol whose push completed the rule; it counts as the
    /// last body element and has not itself been stacked yet.
    fn reduce_by_rule<T: TokenSource>(
        &mut self,
        ridx: RIdx,
        sym: &ParseSymbol,
        statestack: &mut Vec<StIdx>,
        symbolstack: &mut Vec<ParseSymbol>,
        toks: &mut T,
    ) -> Result<(), ParseError> {
        let (head_sidx, body_len) = {
            let rule = self.grm.rule(ridx);
            (rule.head(), rule.body().len())
        };
        let keep = body_len - 1;
        debug_assert!(statestack.len() > keep && symbolstack.len() > keep);
        statestack.truncate(statestack.len() - keep);
        let mut matched = symbolstack.split_off(symbolstack.len() - keep);
        matched.push(sym.clone());
        let head = ParseSymbol::new(self.grm.symbol_name(head_sidx));
        self.grm.invoke_callback(ridx, &head, &matched);
        self.push_symbol(&head, statestack, symbolstack, toks)
    }
}

fn names(symbolstack: &[ParseSymbol]) -> Vec<String> {
    symbolstack.iter().map(|s| s.name.clone()).collect()
}

/// Runtime parse failures. Stack snapshots are included so a caller can report where the parse
/// was when it went wrong.
#[derive(Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The table has no entries (only possible with a hand-edited saved table).
    NotCompiled,
    /// No action exists for the pushed symbol in the current state.
    Unexpected {
        symbol: String,
        statestack: Vec<StIdx>,
        symbolstack: Vec<String>,
    },
    /// A lookahead decision point was reached but the next token resolves to no decision.
    NoLookahead { symbol: String, lookahead: String },
    /// The input ran out with more than one symbol left on the stack.
    UnexpectedFinish {
        statestack: Vec<StIdx>,
        symbolstack: Vec<String>,
    },
    Token(TokenError),
}

impl From<TokenError> for ParseError {
    fn from(e: TokenError) -> Self {
        ParseError::Token(e)
    }
}

impl Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::NotCompiled => write!(f, "state table is empty"),
            ParseError::Unexpected {
                symbol, symbolstack, ..
            } => write!(
                f,
                "unexpected symbol '{}' (stack: {})",
                symbol,
                symbolstack.join(" ")
            ),
            ParseError::NoLookahead { symbol, lookahead } => write!(
                f,
                "no decision for symbol '{}' with lookahead '{}'",
                symbol, lookahead
            ),
            ParseError::UnexpectedFinish { symbolstack, .. } => write!(
                f,
                "input ended mid-parse (stack: {})",
                symbolstack.join(" ")
            ),
            ParseError::Token(e) => write!(f, "{}", e),
        }
    }
}
