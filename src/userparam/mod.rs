//! User parameters: administrator-defined key -> shell command bindings
//!
//! Definitions are `key,command` lines. A key declared as `name[*]` accepts
//! any number of parameters, which are substituted into `$1`..`$9` of the
//! command. A plain `name` accepts none.
//!
//! Parameters come from the server and are untrusted. Unless unsafe user
//! parameters are enabled, any parameter containing a shell metacharacter is
//! rejected and no command is built. Nothing here executes a command.

mod policy;
mod template;

pub use policy::{classify, first_denied, CharClass, SafetyPolicy, DENIED_CHARACTERS};
pub use template::substitute;

use crate::alias::is_wildcard_bracket;
use crate::key::{parse_key, KeyError};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// User parameter errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserParamError {
    /// Definition line is not `key,command`
    InvalidDefinition { line: String, reason: String },
    /// Key part of a definition does not parse
    InvalidKey { key: String, source: KeyError },
    /// Bracket part of a definition key is something other than `[*]`
    InvalidParameters { key: String },
    /// Same key bound twice
    DuplicateKey { key: String },
    /// No binding for the requested key
    NotSupported { key: String },
    /// Parameters passed to a key bound without `[*]`
    TooManyParameters { key: String },
    /// A parameter contains a denied character
    UnsafeParameter { key: String, character: char },
}

impl std::fmt::Display for UserParamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserParamError::InvalidDefinition { line, reason } => {
                write!(f, "cannot add user parameter \"{}\": {}", line, reason)
            }
            UserParamError::InvalidKey { key, source } => {
                write!(f, "cannot add user parameter \"{}\": {}", key, source)
            }
            UserParamError::InvalidParameters { key } => write!(
                f,
                "cannot add user parameter \"{}\": parameters must be \"[*]\" or absent",
                key
            ),
            UserParamError::DuplicateKey { key } => {
                write!(f, "cannot add user parameter \"{}\": duplicate key", key)
            }
            UserParamError::NotSupported { key } => {
                write!(f, "unsupported item key \"{}\"", key)
            }
            UserParamError::TooManyParameters { key } => {
                write!(f, "too many parameters for \"{}\"", key)
            }
            UserParamError::UnsafeParameter { key, .. } => write!(
                f,
                "special characters \"{}\" are not allowed in the parameters of \"{}\"",
                DENIED_CHARACTERS.escape_debug(),
                key
            ),
        }
    }
}

impl std::error::Error for UserParamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UserParamError::InvalidKey { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A key bound to a command template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub key_name: String,
    /// Declared as `name[*]`
    pub accepts_wildcard_params: bool,
    pub command_template: String,
}

impl Binding {
    /// Bind `key_text` (`name` or `name[*]`) to `template`
    pub fn new(key_text: &str, template: &str) -> Result<Self, UserParamError> {
        let key = parse_key(key_text).map_err(|source| UserParamError::InvalidKey {
            key: key_text.to_string(),
            source,
        })?;

        let accepts_wildcard_params = match key.params() {
            [] => false,
            [only] if is_wildcard_bracket(only) => true,
            _ => {
                return Err(UserParamError::InvalidParameters {
                    key: key_text.to_string(),
                })
            }
        };

        if template.is_empty() {
            return Err(UserParamError::InvalidDefinition {
                line: key_text.to_string(),
                reason: "command is empty".to_string(),
            });
        }

        Ok(Binding {
            key_name: key.name().to_string(),
            accepts_wildcard_params,
            command_template: template.to_string(),
        })
    }

    /// Description shown when listing supported keys
    pub fn describe(&self) -> String {
        format!("User parameter: {}", self.command_template)
    }
}

/// Split a `key,command` definition at its first comma
pub fn parse_definition(line: &str) -> Result<(&str, &str), UserParamError> {
    let invalid = |reason: &str| UserParamError::InvalidDefinition {
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let (key, command) = line.split_once(',').ok_or_else(|| invalid("missing ','"))?;
    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if command.is_empty() {
        return Err(invalid("command is empty"));
    }
    Ok((key, command))
}

/// Immutable set of bindings plus the policy they are evaluated under
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: HashMap<String, Binding>,
    policy: SafetyPolicy,
}

impl BindingTable {
    pub fn new(policy: SafetyPolicy) -> Self {
        BindingTable {
            bindings: HashMap::new(),
            policy,
        }
    }

    /// Build a table from `key,command` lines
    pub fn build<S: AsRef<str>>(lines: &[S], policy: SafetyPolicy) -> Result<Self, UserParamError> {
        let mut table = BindingTable::new(policy);
        for line in lines {
            let (key, command) = parse_definition(line.as_ref())?;
            table.bind(key, command)?;
        }
        Ok(table)
    }

    /// Add one binding
    pub fn bind(&mut self, key_text: &str, template: &str) -> Result<(), UserParamError> {
        let binding = Binding::new(key_text, template)?;
        if self.bindings.contains_key(&binding.key_name) {
            return Err(UserParamError::DuplicateKey {
                key: binding.key_name,
            });
        }
        self.bindings.insert(binding.key_name.clone(), binding);
        Ok(())
    }

    pub fn policy(&self) -> SafetyPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, key_name: &str) -> Option<&Binding> {
        self.bindings.get(key_name)
    }

    pub fn contains(&self, key_name: &str) -> bool {
        self.bindings.contains_key(key_name)
    }

    /// Bound key names, sorted
    pub fn key_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Build the command for `key_name` called with `params`
    pub fn build_command<S: AsRef<str>>(
        &self,
        key_name: &str,
        params: &[S],
    ) -> Result<String, UserParamError> {
        let binding = self
            .bindings
            .get(key_name)
            .ok_or_else(|| UserParamError::NotSupported {
                key: key_name.to_string(),
            })?;

        if !binding.accepts_wildcard_params && !params.is_empty() {
            return Err(UserParamError::TooManyParameters {
                key: key_name.to_string(),
            });
        }

        if let Some((index, character)) = self.policy.check(params) {
            warn!(
                key = key_name,
                param = index + 1,
                character = %character.escape_debug(),
                "rejected user parameter with special character"
            );
            return Err(UserParamError::UnsafeParameter {
                key: key_name.to_string(),
                character,
            });
        }

        Ok(substitute(&binding.command_template, params))
    }
}

/// Command templater with a reloadable binding table
#[derive(Debug)]
pub struct CommandTemplater {
    table: ArcSwap<BindingTable>,
}

impl CommandTemplater {
    /// Create from `key,command` lines and the `UnsafeUserParameters` policy
    pub fn new<S: AsRef<str>>(lines: &[S], policy: SafetyPolicy) -> Result<Self, UserParamError> {
        let table = BindingTable::build(lines, policy)?;
        info!(
            bindings = table.len(),
            unsafe_params = policy.allows_unsafe(),
            "user parameters loaded"
        );

        Ok(CommandTemplater {
            table: ArcSwap::from_pointee(table),
        })
    }

    /// Templater without bindings
    pub fn empty() -> Self {
        CommandTemplater {
            table: ArcSwap::from_pointee(BindingTable::default()),
        }
    }

    /// Replace the binding table. On error the current table stays in place.
    pub fn reload<S: AsRef<str>>(&self, lines: &[S], policy: SafetyPolicy) -> Result<(), UserParamError> {
        let table = BindingTable::build(lines, policy)?;
        self.install(table);
        Ok(())
    }

    fn install(&self, table: BindingTable) {
        info!(
            bindings = table.len(),
            unsafe_params = table.policy().allows_unsafe(),
            "user parameter table installed"
        );
        self.table.store(Arc::new(table));
    }

    pub fn is_bound(&self, key_name: &str) -> bool {
        self.table.load().contains(key_name)
    }

    /// Build the command for `key_name` called with `params`
    pub fn build<S: AsRef<str>>(&self, key_name: &str, params: &[S]) -> Result<String, UserParamError> {
        self.table.load().build_command(key_name, params)
    }
}

impl Default for CommandTemplater {
    fn default() -> Self {
        Self::empty()
    }
}
