use std::{borrow::Borrow, fmt::Display, ops::Deref};

use crate::error::Error;

/// Symbolic values from a constrained domain
///
/// encoding name = "sym8", encoding code = 0xa3,
/// category = variable, width = 1
/// label="up to 2^8 - 1 seven bit ASCII characters representing a symbolic value"
///
/// encoding name = "sym32", encoding code = 0xb3
/// category = variable, width = 4
/// label="up to 2^32 - 1 seven bit ASCII characters representing a symbolic value"
///
/// Constructing a symbol from a `&str` does not check the characters. The decoder rejects
/// non-ASCII input with [`Error::InvalidSymbol`], and so does [`Symbol::try_new`].
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(pub String);

impl Symbol {
    /// Creates a new symbol
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Creates a new symbol, failing if it contains non-ASCII characters
    pub fn try_new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        match s.is_ascii() {
            true => Ok(Self(s)),
            false => Err(Error::InvalidSymbol),
        }
    }

    /// Returns the inner value as str
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper into the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for Symbol {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
