//! Tokens are the keys under which providers are registered and requested. A token is either a
//! name (usually a type name produced by [Token::of] or a custom string) or a unique [Symbol].

use std::any::type_name;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

/// Key identifying a provider, independent of its type.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Token {
    /// Named token - either a custom string or a type name.
    Name(Cow<'static, str>),
    /// Unique token which never collides with any name or other symbol.
    Symbol(Symbol),
}

impl Token {
    /// Returns the token used to look up providers of type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Name(Cow::Borrowed(type_name::<T>()))
    }

    /// Checks if this token can be used as a lookup key. Empty names cannot.
    #[inline]
    pub fn is_determined(&self) -> bool {
        match self {
            Self::Name(name) => !name.is_empty(),
            Self::Symbol(_) => true,
        }
    }

    /// Returns the name for named tokens.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Symbol(_) => None,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Symbol(symbol) => symbol.fmt(f),
        }
    }
}

impl From<&'static str> for Token {
    #[inline]
    fn from(value: &'static str) -> Self {
        Self::Name(Cow::Borrowed(value))
    }
}

impl From<String> for Token {
    #[inline]
    fn from(value: String) -> Self {
        Self::Name(Cow::Owned(value))
    }
}

impl From<Symbol> for Token {
    #[inline]
    fn from(value: Symbol) -> Self {
        Self::Symbol(value)
    }
}

impl From<&Token> for Token {
    #[inline]
    fn from(value: &Token) -> Self {
        value.clone()
    }
}

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique token. Two symbols are only equal if one is a copy of the other.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Symbol {
    id: u64,
    description: &'static str,
}

impl Symbol {
    pub fn new(description: &'static str) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description,
        }
    }

    #[inline]
    pub fn description(&self) -> &'static str {
        self.description
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}
