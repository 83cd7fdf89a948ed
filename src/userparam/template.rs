//! Positional placeholder substitution

/// Substitute `$1`..`$9` in `template` with the matching parameter.
///
/// Single left-to-right pass; substituted text is never scanned again.
/// Placeholders beyond the parameter count stay as written, and a `$` not
/// followed by `1`-`9` (`$0`, `$$`, trailing `$`) is copied literally.
pub fn substitute<S: AsRef<str>>(template: &str, params: &[S]) -> String {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut segment = 0;
    let mut pos = 0;

    while let Some(offset) = memchr::memchr(b'$', &bytes[pos..]) {
        let dollar = pos + offset;
        match bytes.get(dollar + 1).copied() {
            Some(digit @ b'1'..=b'9') => {
                let index = usize::from(digit - b'1');
                if let Some(param) = params.get(index) {
                    out.push_str(&template[segment..dollar]);
                    out.push_str(param.as_ref());
                    segment = dollar + 2;
                }
                pos = dollar + 2;
            }
            _ => pos = dollar + 1,
        }
    }

    out.push_str(&template[segment..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &str = "$1$1$2$3$2$4$5$6$5$7$8$9";

    #[test]
    fn test_substitute_all_positions() {
        let params = ["1", "2", "3", "4", "5", "6", "7", "8", "9"];
        assert_eq!(substitute(ALL, &params), "112324565789");

        let params = ["1a", "2a", "3a", "4a", "5a", "6a", "7a", "8a", "9a"];
        assert_eq!(substitute(ALL, &params), "1a1a2a3a2a4a5a6a5a7a8a9a");

        let params = ["1a", "2a", "3a", "4a", "5a", "6", "7a", "8a", "9a"];
        assert_eq!(substitute(ALL, &params), "1a1a2a3a2a4a5a65a7a8a9a");
    }

    #[test]
    fn test_missing_positions_stay_literal() {
        assert_eq!(substitute(ALL, &["foo"]), "foofoo$2$3$2$4$5$6$5$7$8$9");
        assert_eq!(substitute::<&str>("echo $1", &[]), "echo $1");
        assert_eq!(substitute::<&str>("echo $1 foo", &[]), "echo $1 foo");
    }

    #[test]
    fn test_plain_dollars_stay_literal() {
        for template in ["$", "$b", "b$", "$$", "$0", "a$0b", "$ 1"] {
            assert_eq!(substitute(template, &["c"]), template);
        }
    }

    #[test]
    fn test_double_dollar_before_placeholder() {
        let template = "awk '{sum += $$1} END {print sum}";
        assert_eq!(
            substitute(template, &["foo"]),
            "awk '{sum += $foo} END {print sum}"
        );
    }

    #[test]
    fn test_no_rescan_of_substituted_text() {
        assert_eq!(substitute("$1-$2", &["$2", "x"]), "$2-x");
        assert_eq!(substitute("$1", &["$1$1"]), "$1$1");
    }

    #[test]
    fn test_multibyte_text_around_placeholders() {
        assert_eq!(substitute("ü$1ü$", &["ö"]), "üöü$");
    }
}
