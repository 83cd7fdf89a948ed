//! Grammar errors for item key text

/// What went wrong while scanning an item key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyErrorKind {
    /// Input is empty or whitespace only
    Empty,
    /// Input exceeds `KEY_LEN_MAX` bytes
    TooLong,
    /// Key name is missing or contains a character outside the key charset
    InvalidName,
    /// A `[` group was never closed
    UnterminatedBracket,
    /// A quoted parameter was never closed
    UnterminatedQuote,
    /// Something other than `,` or `]` follows a quoted or array parameter
    UnexpectedCharacter,
    /// Characters follow the closing `]` of the parameter list
    TrailingCharacters,
    /// An array parameter contains another array
    NestingTooDeep,
    /// More than `PARAMS_MAX` parameters
    TooManyParameters,
}

impl KeyErrorKind {
    fn describe(self) -> &'static str {
        match self {
            KeyErrorKind::Empty => "key is empty",
            KeyErrorKind::TooLong => "key is too long",
            KeyErrorKind::InvalidName => "invalid key name",
            KeyErrorKind::UnterminatedBracket => "unterminated parameter list",
            KeyErrorKind::UnterminatedQuote => "unterminated quoted parameter",
            KeyErrorKind::UnexpectedCharacter => "unexpected character after parameter",
            KeyErrorKind::TrailingCharacters => "unexpected characters after parameter list",
            KeyErrorKind::NestingTooDeep => "nested arrays are not supported",
            KeyErrorKind::TooManyParameters => "too many parameters",
        }
    }
}

/// Malformed item key text. Never corrected, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyError {
    pub kind: KeyErrorKind,
    /// Byte offset into the input where scanning stopped
    pub position: usize,
}

impl KeyError {
    pub(crate) fn new(kind: KeyErrorKind, position: usize) -> Self {
        KeyError { kind, position }
    }
}

impl std::fmt::Display for KeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid item key at position {}: {}",
            self.position,
            self.kind.describe()
        )
    }
}

impl std::error::Error for KeyError {}
