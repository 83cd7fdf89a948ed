//! Alias resolution
//!
//! Rewrites requested keys through configured `pattern:target` rules:
//! - `x:y` renames an exact key
//! - `a[*]:k[*]` renames any `a[...]` request and keeps its bracket content
//! - `a[*]:k[fixed]` renames any `a[...]` request to a fixed key
//!
//! Keys that match no rule pass through unchanged.
//!
//! The rule table is an immutable snapshot. Reloading builds a new table and
//! publishes it atomically; lookups never lock.

mod rule;

pub use rule::{is_wildcard_bracket, parse_alias, AliasRule, KeyPattern};

use arc_swap::ArcSwap;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Alias-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasError {
    /// Definition line could not be parsed
    InvalidRule { rule: String, reason: String },
    /// Two rules declare the same pattern
    DuplicateName { name: String },
}

impl std::fmt::Display for AliasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AliasError::InvalidRule { rule, reason } => {
                write!(f, "cannot add alias \"{}\": {}", rule, reason)
            }
            AliasError::DuplicateName { name } => {
                write!(f, "cannot add alias \"{}\": duplicate name", name)
            }
        }
    }
}

impl std::error::Error for AliasError {}

/// Immutable set of alias rules
#[derive(Debug, Default)]
pub struct AliasTable {
    rules: Vec<AliasRule>,
    /// Full pattern text -> rule index
    exact: HashMap<String, usize>,
    /// Pattern name of `name[*]` rules -> first declared rule index
    wildcard: HashMap<String, usize>,
}

impl AliasTable {
    /// Build a table from `pattern:target` lines
    pub fn build<S: AsRef<str>>(lines: &[S]) -> Result<Self, AliasError> {
        let mut table = AliasTable::default();

        for line in lines {
            let rule = parse_alias(line.as_ref())?;
            table.insert(rule)?;
        }

        #[cfg(debug_assertions)]
        table.verify_invariants();

        Ok(table)
    }

    fn insert(&mut self, rule: AliasRule) -> Result<(), AliasError> {
        if self.exact.contains_key(&rule.pattern.text) {
            return Err(AliasError::DuplicateName {
                name: rule.pattern.text,
            });
        }

        let index = self.rules.len();
        self.exact.insert(rule.pattern.text.clone(), index);
        if rule.pattern.is_wildcard() {
            self.wildcard.entry(rule.pattern.name.clone()).or_insert(index);
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve a requested key. Returns `None` when no rule applies.
    pub fn lookup(&self, requested: &str) -> Option<String> {
        let resolved = if let Some(&index) = self.exact.get(requested) {
            self.rules[index].target.text.clone()
        } else {
            let open = memchr::memchr(b'[', requested.as_bytes()).filter(|&open| open > 0)?;
            let &index = self.wildcard.get(&requested[..open])?;
            let rule = &self.rules[index];

            if rule.passes_params_through() {
                format!("{}{}", rule.target.name, &requested[open..])
            } else {
                rule.target.text.clone()
            }
        };

        // A rule that maps a key onto itself does not apply
        (resolved != requested).then_some(resolved)
    }

    /// Like [`lookup`](Self::lookup), but fail-open: the request comes back
    /// unchanged when no rule applies
    pub fn resolve<'a>(&self, requested: &'a str) -> Cow<'a, str> {
        match self.lookup(requested) {
            Some(resolved) => {
                debug!(requested, resolved = %resolved, "alias applied");
                Cow::Owned(resolved)
            }
            None => Cow::Borrowed(requested),
        }
    }

    /// TigerStyle: Verify all invariants hold
    ///
    /// # Invariants
    /// - every rule is indexed by its exact pattern text
    /// - wildcard entries point at wildcard rules with the same name
    #[cfg(debug_assertions)]
    fn verify_invariants(&self) {
        debug_assert_eq!(
            self.exact.len(),
            self.rules.len(),
            "Invariant violated: exact index ({}) out of step with rules ({})",
            self.exact.len(),
            self.rules.len()
        );
        for (name, &index) in &self.wildcard {
            let rule = &self.rules[index];
            debug_assert!(
                rule.pattern.is_wildcard() && &rule.pattern.name == name,
                "Invariant violated: wildcard entry '{}' points at '{}'",
                name,
                rule.pattern.text
            );
        }
    }
}

/// Alias resolver with a reloadable rule table
#[derive(Debug)]
pub struct AliasResolver {
    table: ArcSwap<AliasTable>,
}

impl AliasResolver {
    /// Create a resolver from `pattern:target` lines
    pub fn new<S: AsRef<str>>(lines: &[S]) -> Result<Self, AliasError> {
        let table = AliasTable::build(lines)?;
        info!(rules = table.len(), "alias table loaded");

        Ok(AliasResolver {
            table: ArcSwap::from_pointee(table),
        })
    }

    /// Resolver without any rules
    pub fn empty() -> Self {
        AliasResolver {
            table: ArcSwap::from_pointee(AliasTable::default()),
        }
    }

    /// Replace the rule table. On error the current table stays in place.
    pub fn reload<S: AsRef<str>>(&self, lines: &[S]) -> Result<(), AliasError> {
        let table = AliasTable::build(lines)?;
        self.install(table);
        Ok(())
    }

    fn install(&self, table: AliasTable) {
        info!(rules = table.len(), "alias table installed");
        self.table.store(Arc::new(table));
    }

    /// Resolve a requested key, returning it unchanged when no rule applies
    pub fn resolve<'a>(&self, requested: &'a str) -> Cow<'a, str> {
        self.table.load().resolve(requested)
    }
}

impl Default for AliasResolver {
    fn default() -> Self {
        Self::empty()
    }
}
