//! The shift-reduce runtime: drives a token stream through a compiled
//! [`pdtable::StateTable`], firing the grammar's reduction callbacks as rules complete.
//!
//! A typical session builds a [`pdgrammar::Grammar`], compiles it once, then parses any number
//! of token streams against the same table:
//!
//! ```rust,ignore
//! let stable = StateTable::new(&grm)?;
//! let mut toks = VecTokenSource::from_names(&["Id", "+", "Id"]);
//! let consumed = Parser::new(&mut grm, &stable).parse(&mut toks, None)?;
//! ```

pub mod parser;
pub mod token;

pub use crate::parser::{ParseError, Parser};
pub use crate::token::{Token, TokenError, TokenSource, VecTokenSource};
