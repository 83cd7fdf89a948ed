//! Parameter safety policy
//!
//! Parameters substituted into a shell command are checked against a fixed
//! deny-set of shell metacharacters. The check is a table lookup per byte;
//! every denied character is ASCII so multi-byte UTF-8 sequences are never
//! denied.

/// Characters rejected in parameters unless unsafe parameters are allowed
pub const DENIED_CHARACTERS: &str = "\\'\"`*?[]{}~$!&;()<>|#@\n";

const DENY_TABLE: [bool; 256] = build_deny_table();

const fn build_deny_table() -> [bool; 256] {
    let mut table = [false; 256];
    let denied = DENIED_CHARACTERS.as_bytes();
    let mut i = 0;
    while i < denied.len() {
        table[denied[i] as usize] = true;
        i += 1;
    }
    table
}

/// Classification of a single character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Allowed,
    Denied,
}

/// Classify one character against the deny-set
pub fn classify(c: char) -> CharClass {
    if c.is_ascii() && DENY_TABLE[c as usize] {
        CharClass::Denied
    } else {
        CharClass::Allowed
    }
}

/// First denied character in `param`, if any
pub fn first_denied(param: &str) -> Option<char> {
    param
        .bytes()
        .find(|&b| DENY_TABLE[b as usize])
        .map(char::from)
}

/// Whether parameter values may contain shell metacharacters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SafetyPolicy {
    /// Reject parameters containing any denied character
    #[default]
    Restrictive,
    /// Pass parameters through verbatim
    AllowUnsafe,
}

impl SafetyPolicy {
    /// Policy from the `UnsafeUserParameters` option (0 or 1)
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(SafetyPolicy::Restrictive),
            1 => Some(SafetyPolicy::AllowUnsafe),
            _ => None,
        }
    }

    pub fn allows_unsafe(self) -> bool {
        self == SafetyPolicy::AllowUnsafe
    }

    /// First `(index, character)` that violates the policy
    pub fn check<S: AsRef<str>>(self, params: &[S]) -> Option<(usize, char)> {
        if self.allows_unsafe() {
            return None;
        }
        params
            .iter()
            .enumerate()
            .find_map(|(i, p)| first_denied(p.as_ref()).map(|c| (i, c)))
    }
}
