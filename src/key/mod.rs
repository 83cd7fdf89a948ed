//! Item key grammar
//!
//! Converts between the textual key syntax (`vfs.dir.size[/tmp,"a,b"]`) and a
//! structured `(name, params)` form.
//!
//! - Parameters are bare, quoted (`"…"` with `\"` escapes) or one level of
//!   nested array, whose value keeps the inner quoting
//! - Serialization quotes only when a parameter would not survive a parse as
//!   a bare token

mod error;
mod parser;
mod serializer;


pub use error::{KeyError, KeyErrorKind};
pub use parser::{is_key_char, parse_key, split_key};
pub use serializer::{make_key, needs_quoting, quote_param};

use std::str::FromStr;

/// Maximum accepted length of key text, in bytes
pub const KEY_LEN_MAX: usize = 2048;

/// Maximum number of parameters in one key
pub const PARAMS_MAX: usize = 256;

/// How a parameter was written in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Unquoted token
    Bare,
    /// `"…"` with backslash escapes
    Quoted,
    /// Nested `[...]` group, value holds the inner literal text
    Array,
}

/// A parsed item key
///
/// Two keys are equal when their names and parameter values are equal; the
/// way a parameter was written does not matter.
#[derive(Debug, Clone)]
pub struct ItemKey {
    name: String,
    params: Vec<String>,
    kinds: Vec<ParamKind>,
}

impl ItemKey {
    /// Build a key from parts, validating the name.
    ///
    /// Parameter kinds are derived from how each value would be serialized.
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Result<Self, KeyError> {
        let name = name.into();
        if name.is_empty() {
            return Err(KeyError::new(KeyErrorKind::InvalidName, 0));
        }
        if let Some(pos) = name.bytes().position(|c| !is_key_char(c)) {
            return Err(KeyError::new(KeyErrorKind::InvalidName, pos));
        }
        if params.len() > PARAMS_MAX {
            return Err(KeyError::new(KeyErrorKind::TooManyParameters, name.len()));
        }

        let kinds = params
            .iter()
            .map(|p| {
                if needs_quoting(p) {
                    ParamKind::Quoted
                } else {
                    ParamKind::Bare
                }
            })
            .collect();

        Ok(ItemKey {
            name,
            params,
            kinds,
        })
    }

    pub(crate) fn from_parts(name: String, params: Vec<String>, kinds: Vec<ParamKind>) -> Self {
        let key = ItemKey {
            name,
            params,
            kinds,
        };

        #[cfg(debug_assertions)]
        key.verify_invariants();

        key
    }

    /// Parse key text
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        parse_key(text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Source form of each parameter, parallel to `params()`
    pub fn param_kinds(&self) -> &[ParamKind] {
        &self.kinds
    }

    /// Serialized key text
    pub fn to_key_string(&self) -> String {
        make_key(&self.name, &self.params)
    }

    /// TigerStyle: Verify all invariants hold
    ///
    /// # Invariants
    /// - name is non-empty and made of key characters only
    /// - one kind per parameter
    #[cfg(debug_assertions)]
    fn verify_invariants(&self) {
        debug_assert!(!self.name.is_empty(), "Invariant violated: empty key name");
        debug_assert!(
            self.name.bytes().all(is_key_char),
            "Invariant violated: key name '{}' contains non-key characters",
            self.name
        );
        debug_assert_eq!(
            self.params.len(),
            self.kinds.len(),
            "Invariant violated: params ({}) and kinds ({}) out of step",
            self.params.len(),
            self.kinds.len()
        );
    }
}

impl PartialEq for ItemKey {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl Eq for ItemKey {}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_key_string())
    }
}

impl FromStr for ItemKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_key(s)
    }
}
