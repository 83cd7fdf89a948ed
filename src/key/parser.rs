//! Index-based scanner for item key text.
//!
//! ```text
//! key       := name ('[' paramlist ']')?
//! paramlist := param (',' param)*
//! param     := quoted | array | bare
//! ```
//!
//! Every delimiter the grammar cares about is ASCII, so all slicing happens on
//! byte offsets that are guaranteed to be char boundaries.
//!
//! Array parameters are only allowed directly inside the top-level list. The
//! depth is tracked explicitly and checked against `NESTING_DEPTH_MAX`.

use super::error::{KeyError, KeyErrorKind};
use super::{ItemKey, ParamKind, KEY_LEN_MAX, PARAMS_MAX};

/// Array parameters may appear at depth 0 only
const NESTING_DEPTH_MAX: usize = 1;

/// A parameter as scanned, before it is attached to a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScannedParam {
    pub value: String,
    pub kind: ParamKind,
}

/// Result of scanning a key prefix
struct ScannedKey {
    name_end: usize,
    params: Option<Vec<ScannedParam>>,
    /// Offset just past the key (past `]` when there is a bracket group)
    end: usize,
}

/// Characters permitted in a key name
pub fn is_key_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'.' | b'_' | b'-')
}

/// Parse item key text into a structured key.
///
/// # Errors
///
/// Returns a [`KeyError`] for empty input, an invalid name, unterminated
/// brackets or quotes, a second nesting level, or anything after the
/// closing `]`.
pub fn parse_key(text: &str) -> Result<ItemKey, KeyError> {
    let scanned = scan_key(text)?;

    if scanned.end != text.len() {
        return Err(KeyError::new(KeyErrorKind::TrailingCharacters, scanned.end));
    }

    let name = text[..scanned.name_end].to_string();
    let (params, kinds) = match scanned.params {
        None => (Vec::new(), Vec::new()),
        Some(list) => list.into_iter().map(|p| (p.value, p.kind)).unzip(),
    };

    Ok(ItemKey::from_parts(name, params, kinds))
}

/// Length of the `name[...]` prefix of `text`.
///
/// Validates the name and the bracket group exactly like [`parse_key`] but
/// leaves whatever follows for the caller. Used where a key is embedded in a
/// larger line (alias definitions).
pub fn split_key(text: &str) -> Result<usize, KeyError> {
    scan_key(text).map(|scanned| scanned.end)
}

fn scan_key(text: &str) -> Result<ScannedKey, KeyError> {
    let bytes = text.as_bytes();

    if text.trim().is_empty() {
        return Err(KeyError::new(KeyErrorKind::Empty, 0));
    }
    if bytes.len() > KEY_LEN_MAX {
        return Err(KeyError::new(KeyErrorKind::TooLong, KEY_LEN_MAX));
    }

    let name_end = bytes.iter().position(|&c| !is_key_char(c)).unwrap_or(bytes.len());
    if name_end == 0 {
        return Err(KeyError::new(KeyErrorKind::InvalidName, 0));
    }

    if name_end == bytes.len() || bytes[name_end] != b'[' {
        return Ok(ScannedKey {
            name_end,
            params: None,
            end: name_end,
        });
    }

    let (params, end) = scan_param_list(text, name_end + 1, 0)?;

    Ok(ScannedKey {
        name_end,
        params: Some(params),
        end,
    })
}

/// Scan a parameter list starting just after its opening `[`.
///
/// Returns the parameters and the offset just past the closing `]`.
fn scan_param_list(
    text: &str,
    start: usize,
    depth: usize,
) -> Result<(Vec<ScannedParam>, usize), KeyError> {
    let bytes = text.as_bytes();
    let mut params = Vec::new();
    let mut pos = start;

    loop {
        pos = skip_spaces(bytes, pos);
        if pos >= bytes.len() {
            return Err(KeyError::new(KeyErrorKind::UnterminatedBracket, pos));
        }

        let (param, next) = match bytes[pos] {
            b'"' => {
                let (value, after_quote) = scan_quoted(text, pos)?;
                // Inside an array the literal text is kept, escapes included
                let value = if depth > 0 {
                    text[pos..after_quote].to_string()
                } else {
                    value
                };
                (
                    ScannedParam {
                        value,
                        kind: ParamKind::Quoted,
                    },
                    expect_delimiter(bytes, after_quote)?,
                )
            }
            b'[' => {
                if depth + 1 > NESTING_DEPTH_MAX {
                    return Err(KeyError::new(KeyErrorKind::NestingTooDeep, pos));
                }
                let (inner, after_array) = scan_param_list(text, pos + 1, depth + 1)?;
                let value = inner
                    .iter()
                    .map(|p| p.value.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                (
                    ScannedParam {
                        value,
                        kind: ParamKind::Array,
                    },
                    expect_delimiter(bytes, after_array)?,
                )
            }
            _ => {
                let end = bytes[pos..]
                    .iter()
                    .position(|&c| c == b',' || c == b']')
                    .map(|offset| pos + offset)
                    .ok_or_else(|| KeyError::new(KeyErrorKind::UnterminatedBracket, bytes.len()))?;
                (
                    ScannedParam {
                        value: text[pos..end].to_string(),
                        kind: ParamKind::Bare,
                    },
                    end,
                )
            }
        };

        params.push(param);
        if params.len() > PARAMS_MAX {
            return Err(KeyError::new(KeyErrorKind::TooManyParameters, next));
        }

        // `next` always points at a delimiter here
        if bytes[next] == b']' {
            return Ok((params, next + 1));
        }
        pos = next + 1;
    }
}

/// Scan a quoted parameter whose opening quote is at `start`.
///
/// Returns the unescaped value and the offset just past the closing quote.
/// Only `\"` is an escape; any other backslash is kept as is.
fn scan_quoted(text: &str, start: usize) -> Result<(String, usize), KeyError> {
    let bytes = text.as_bytes();
    let mut value = String::new();
    let mut segment = start + 1;
    let mut pos = start + 1;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if bytes.get(pos + 1) == Some(&b'"') => {
                value.push_str(&text[segment..pos]);
                value.push('"');
                pos += 2;
                segment = pos;
            }
            b'"' => {
                value.push_str(&text[segment..pos]);
                return Ok((value, pos + 1));
            }
            _ => pos += 1,
        }
    }

    Err(KeyError::new(KeyErrorKind::UnterminatedQuote, start))
}

/// After a quoted or array parameter only spaces then `,` or `]` may follow
fn expect_delimiter(bytes: &[u8], pos: usize) -> Result<usize, KeyError> {
    let pos = skip_spaces(bytes, pos);
    match bytes.get(pos) {
        Some(b',') | Some(b']') => Ok(pos),
        Some(_) => Err(KeyError::new(KeyErrorKind::UnexpectedCharacter, pos)),
        None => Err(KeyError::new(KeyErrorKind::UnterminatedBracket, pos)),
    }
}

fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos] == b' ' {
        pos += 1;
    }
    pos
}
