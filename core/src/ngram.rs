//! Token and n-gram key types.
//!
//! Tokens are oldest-first, the same order they appear in an ARPA file: the
//! n-gram `a b c` is "c after the context a b".
use std::borrow::Borrow;
use std::fmt;

/// Vocabulary word identifier.
pub type Token = u32;

/// Reserved token: "no token". A null token in a sentence terminates the
/// usable context, since nothing before it can be looked up.
pub const NULL_TOKEN: Token = 0;

/// An owned sequence of tokens used as a key in the model tables.
///
/// Hashes and compares exactly like the `[Token]` slice it wraps, so maps keyed
/// by `Ngram` can be probed with a borrowed `&[Token]` without allocating.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ngram(Vec<Token>);

impl Ngram {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }

    /// The zero-length context.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    /// Split into (context, predicted token).
    pub fn split_last(&self) -> Option<(&[Token], Token)> {
        self.0.split_last().map(|(last, rest)| (rest, *last))
    }

    /// New key with the final token removed: the context this n-gram predicts from.
    pub fn context(&self) -> Ngram {
        match self.split_last() {
            Some((rest, _)) => Ngram::from(rest),
            None => Ngram::empty(),
        }
    }

    /// New key with the oldest token removed: the backoff context.
    pub fn truncated(&self) -> Ngram {
        match self.0.split_first() {
            Some((_, rest)) => Ngram::from(rest),
            None => Ngram::empty(),
        }
    }

    /// Highest token id in the key (`NULL_TOKEN` for the empty key).
    pub fn max_token(&self) -> Token {
        self.0.iter().copied().max().unwrap_or(NULL_TOKEN)
    }
}

impl Borrow<[Token]> for Ngram {
    fn borrow(&self) -> &[Token] {
        &self.0
    }
}

impl From<&[Token]> for Ngram {
    fn from(tokens: &[Token]) -> Self {
        Ngram(tokens.to_vec())
    }
}

impl From<Vec<Token>> for Ngram {
    fn from(tokens: Vec<Token>) -> Self {
        Ngram(tokens)
    }
}

impl FromIterator<Token> for Ngram {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Ngram(iter.into_iter().collect())
    }
}

impl fmt::Debug for Ngram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ngram{:?}", self.0)
    }
}
