//! Item key serialization (inverse of the parser)

use std::borrow::Cow;

/// Characters that force a parameter into quotes
const QUOTE_TRIGGERS: &[char] = &[',', '[', ']', '"'];

/// Whether a parameter must be quoted to survive a parse
///
/// Empty values and values with a leading space are quoted too: the parser
/// would read the first as an empty bare token just the same, but drops the
/// leading spaces of bare parameters.
pub fn needs_quoting(param: &str) -> bool {
    param.is_empty() || param.starts_with(' ') || param.contains(QUOTE_TRIGGERS)
}

/// Render one parameter, quoting and escaping `"` when needed
pub fn quote_param(param: &str) -> Cow<'_, str> {
    if !needs_quoting(param) {
        return Cow::Borrowed(param);
    }

    let mut quoted = String::with_capacity(param.len() + 2);
    quoted.push('"');
    for c in param.chars() {
        if c == '"' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Build item key text from a name and parameters.
///
/// `make_key("key", &[])` is `key`; any parameter list, even a single empty
/// parameter, produces a bracket group.
pub fn make_key<S: AsRef<str>>(name: &str, params: &[S]) -> String {
    if params.is_empty() {
        return name.to_string();
    }

    let mut text = String::with_capacity(name.len() + 2 + params.len() * 8);
    text.push_str(name);
    text.push('[');
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            text.push(',');
        }
        text.push_str(&quote_param(param.as_ref()));
    }
    text.push(']');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_key_bare() {
        assert_eq!(make_key::<&str>("key", &[]), "key");
        assert_eq!(make_key("key", &["1"]), "key[1]");
        assert_eq!(make_key("key", &["1", "2"]), "key[1,2]");
    }

    #[test]
    fn test_make_key_quoted() {
        assert_eq!(make_key("key", &["1,2", "3"]), r#"key["1,2",3]"#);
        assert_eq!(make_key("key", &[r#"1,2,"3""#]), r#"key["1,2,\"3\""]"#);
        assert_eq!(make_key("key", &["]"]), r#"key["]"]"#);
        assert_eq!(make_key("key", &["["]), r#"key["["]"#);
        assert_eq!(make_key("key", &["\""]), r#"key["\""]"#);
        assert_eq!(make_key("key", &[" "]), r#"key[" "]"#);
    }

    #[test]
    fn test_empty_param_is_quoted() {
        assert_eq!(make_key("key", &[""]), r#"key[""]"#);
        assert_eq!(make_key("key", &["a", ""]), r#"key[a,""]"#);
    }

    #[test]
    fn test_quote_param_borrows_when_bare() {
        assert!(matches!(quote_param("abc"), Cow::Borrowed("abc")));
        assert!(matches!(quote_param("a b"), Cow::Borrowed("a b")));
        assert!(matches!(quote_param(" a"), Cow::Owned(_)));
    }
}
