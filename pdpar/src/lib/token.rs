use std::{error::Error, fmt};

/// A terminal as fed to the parser: a symbol name, or the end-of-input marker. Tokens carry no
/// lexeme or span; the caller's reduction callbacks are expected to track those themselves.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    name: String,
    end: bool,
}

impl Token {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Token {
            name: name.into(),
            end: false,
        }
    }

    /// The end-of-input marker. Its name is never looked up in the table.
    pub fn eof() -> Self {
        Token {
            name: String::new(),
            end: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_end(&self) -> bool {
        self.end
    }
}

/// A cursor over a token stream. The parser both advances and, for lookahead decisions, rewinds
/// by a single token, so implementations must support stepping back over anything already
/// yielded.
pub trait TokenSource {
    /// The token under the cursor. Once the stream is exhausted this must keep returning a
    /// token for which [`Token::is_end`] is true.
    fn current(&self) -> &Token;

    /// Advance the cursor by one token.
    fn next(&mut self) -> Result<(), TokenError>;

    /// Step the cursor back by one token.
    fn unnext(&mut self) -> Result<(), TokenError>;
}

/// Errors stepping a [`TokenSource`] cursor outside the stream.
#[derive(Debug, Eq, PartialEq)]
pub enum TokenError {
    AdvancePastEnd,
    RewindPastStart,
}

impl Error for TokenError {}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenError::AdvancePastEnd => write!(f, "token cursor advanced past end of input"),
            TokenError::RewindPastStart => write!(f, "token cursor rewound past start of input"),
        }
    }
}

/// An in-memory [`TokenSource`] over a fixed list of tokens, terminated by an implicit
/// end-of-input marker.
pub struct VecTokenSource {
    toks: Vec<Token>,
    cursor: usize,
}

impl VecTokenSource {
    pub fn new(mut toks: Vec<Token>) -> Self {
        toks.push(Token::eof());
        VecTokenSource { toks, cursor: 0 }
    }

    pub fn from_names(names: &[&str]) -> Self {
        VecTokenSource::new(names.iter().map(|n| Token::new(*n)).collect())
    }
}

impl TokenSource for VecTokenSource {
    fn current(&self) -> &Token {
        &self.toks[self.cursor]
    }

    fn next(&mut self) -> Result<(), TokenError> {
        if self.cursor + 1 == self.toks.len() {
            return Err(TokenError::AdvancePastEnd);
        }
        self.cursor += 1;
        Ok(())
    }

    fn unnext(&mut self) -> Result<(), TokenError> {
        if self.cursor == 0 {
            return Err(TokenError::RewindPastStart);
        }
        self.cursor -= 1;
        Ok(())
    }
}
