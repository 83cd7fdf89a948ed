//! Alias definition lines (`pattern:target`)

use super::AliasError;
use crate::key::split_key;

/// One side of an alias rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    /// Full text as written (`alias5[ *]`)
    pub text: String,
    /// Name part before any bracket
    pub name: String,
    /// Bracket content without the brackets, if present
    pub bracket: Option<String>,
}

impl KeyPattern {
    fn new(text: &str) -> Self {
        let (name, bracket) = match text.find('[') {
            Some(open) => (
                text[..open].to_string(),
                Some(text[open + 1..text.len() - 1].to_string()),
            ),
            None => (text.to_string(), None),
        };

        KeyPattern {
            text: text.to_string(),
            name,
            bracket,
        }
    }

    /// Whether the bracket content is the wildcard `*`
    pub fn is_wildcard(&self) -> bool {
        self.bracket.as_deref().is_some_and(is_wildcard_bracket)
    }
}

/// Bracket content that matches anything: `*`, optionally preceded by spaces
pub fn is_wildcard_bracket(content: &str) -> bool {
    content.trim_start_matches(' ') == "*"
}

/// A rename rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRule {
    pub pattern: KeyPattern,
    pub target: KeyPattern,
}

impl AliasRule {
    /// Whether requests matching the wildcard pattern carry their bracket
    /// content over to the target
    pub fn passes_params_through(&self) -> bool {
        self.pattern.is_wildcard() && self.target.is_wildcard()
    }
}

/// Parse a `pattern:target` definition.
///
/// Both sides must be complete keys; no spaces around the colon, no escaped
/// colons, nothing after the target.
pub fn parse_alias(line: &str) -> Result<AliasRule, AliasError> {
    let invalid = |reason: String| AliasError::InvalidRule {
        rule: line.to_string(),
        reason,
    };

    let pattern_end = split_key(line).map_err(|e| invalid(format!("invalid alias name: {}", e)))?;

    let target = match line[pattern_end..].strip_prefix(':') {
        Some(target) => target,
        None if pattern_end == line.len() => return Err(invalid("missing ':'".to_string())),
        None => {
            return Err(invalid(format!(
                "unexpected character at position {}",
                pattern_end
            )))
        }
    };

    let target_end = split_key(target).map_err(|e| invalid(format!("invalid target key: {}", e)))?;
    if target_end != target.len() {
        return Err(invalid(format!(
            "unexpected character at position {}",
            pattern_end + 1 + target_end
        )));
    }

    Ok(AliasRule {
        pattern: KeyPattern::new(&line[..pattern_end]),
        target: KeyPattern::new(target),
    })
}
