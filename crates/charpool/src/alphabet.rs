//! The token alphabet: the fixed, ordered, duplicate-free pool of tokens.

use core::{fmt, str::FromStr};
use std::{collections::HashSet, sync::Arc};

use crate::{Error, Result};

/// A single-character token drawn from an [`Alphabet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Token(char);

impl Token {
    pub const fn new(c: char) -> Self {
        Self(c)
    }

    pub const fn as_char(self) -> char {
        self.0
    }
}

impl From<char> for Token {
    fn from(c: char) -> Self {
        Self(c)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The immutable pool of tokens available for allocation.
///
/// The length of the alphabet is the total pool size `N`. Cloning is cheap:
/// the tokens live behind an [`Arc`] and are never mutated, so an alphabet can
/// be shared across threads without synchronization.
///
/// # Example
/// ```
/// use charpool::{Alphabet, Token};
///
/// let alphabet: Alphabet = "ABC".parse().unwrap();
/// assert_eq!(alphabet.len(), 3);
/// assert!(alphabet.contains(Token::new('B')));
/// assert!("ABA".parse::<Alphabet>().is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Alphabet {
    tokens: Arc<[Token]>,
}

impl Alphabet {
    /// Builds an alphabet from the given tokens, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAlphabet`] if `tokens` is empty or repeats a
    /// token.
    pub fn new<I, T>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Token>,
    {
        let tokens: Vec<Token> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            return Err(Error::InvalidAlphabet {
                reason: "alphabet must contain at least one token".to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(tokens.len());
        for token in &tokens {
            if !seen.insert(*token) {
                return Err(Error::InvalidAlphabet {
                    reason: format!("duplicate token `{token}`"),
                });
            }
        }

        Ok(Self {
            tokens: tokens.into(),
        })
    }

    /// Pool size `N`. Always at least 1.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always `false`; construction rejects empty alphabets.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Token> {
        self.tokens.get(index).copied()
    }

    pub fn contains(&self, token: Token) -> bool {
        self.tokens.contains(&token)
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = Token> + '_ {
        self.tokens.iter().copied()
    }
}

impl FromStr for Alphabet {
    type Err = Error;

    /// Every character of `s` becomes one token.
    fn from_str(s: &str) -> Result<Self> {
        Self::new(s.chars())
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tokens.iter().try_for_each(|t| write!(f, "{t}"))
    }
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alphabet")
            .field("len", &self.len())
            .field("tokens", &self.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order() {
        let alphabet: Alphabet = "XYZ".parse().unwrap();
        let tokens: Vec<char> = alphabet.iter().map(Token::as_char).collect();
        assert_eq!(tokens, vec!['X', 'Y', 'Z']);
        assert_eq!(alphabet.get(1), Some(Token::new('Y')));
        assert_eq!(alphabet.get(3), None);
        assert_eq!(alphabet.to_string(), "XYZ");
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            "".parse::<Alphabet>(),
            Err(Error::InvalidAlphabet { .. })
        ));
    }

    #[test]
    fn rejects_duplicates() {
        let err = Alphabet::new(['A', 'B', 'A']).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidAlphabet {
                reason: "duplicate token `A`".to_string()
            }
        );
    }

    #[test]
    fn multibyte_characters_are_single_tokens() {
        let alphabet: Alphabet = "αβγ🦀".parse().unwrap();
        assert_eq!(alphabet.len(), 4);
        assert!(alphabet.contains(Token::new('🦀')));
        assert!(!alphabet.is_empty());
    }
}
