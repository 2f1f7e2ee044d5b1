use core::{fmt, str::FromStr};

use crate::{Error, Result, Token};

/// Number of characters every identity code must have.
pub const IDENTITY_CODE_LEN: usize = 5;

/// Opaque, fixed-length participant identifier.
///
/// Codes are compared as strings. `"00001"` and `"1"` are different codes, and
/// only the second is invalid. Length is counted in Unicode scalar values.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct IdentityCode(String);

impl IdentityCode {
    /// Validates `code` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentityCode`] unless `code` has exactly
    /// [`IDENTITY_CODE_LEN`] characters.
    ///
    /// # Example
    /// ```
    /// use charpool::IdentityCode;
    ///
    /// assert!(IdentityCode::parse("00001").is_ok());
    /// assert!(IdentityCode::parse("0001").is_err());
    /// ```
    pub fn parse(code: &str) -> Result<Self> {
        let len = code.chars().count();
        if len != IDENTITY_CODE_LEN {
            return Err(Error::InvalidIdentityCode {
                len,
                expected: IDENTITY_CODE_LEN,
            });
        }
        Ok(Self(code.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdentityCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for IdentityCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IdentityCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<IdentityCode> for String {
    fn from(code: IdentityCode) -> Self {
        code.0
    }
}

/// A registered participant and the token it holds, if any.
///
/// `token` moves from `None` to `Some` exactly once and is never cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Participant {
    pub code: IdentityCode,
    pub token: Option<Token>,
}

impl Participant {
    /// A freshly registered participant with no token.
    pub const fn registered(code: IdentityCode) -> Self {
        Self { code, token: None }
    }

    pub const fn is_allocated(&self) -> bool {
        self.token.is_some()
    }
}
