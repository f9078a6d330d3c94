//! Pattern Lexer - Delimiter Splitting
//!
//! A delimited PCRE pattern has the shape `D pattern D flags` where `D` is
//! any non-alphanumeric delimiter; the four bracket pairs open with one
//! character and close with its counterpart. The lexer splits the input
//! into (delimiter, pattern body, flags) without interpreting the body
//! beyond what the split requires: backslash escapes never close the
//! pattern, an unescaped delimiter inside a character class does not close
//! it either, and bracket delimiters nest.

use crate::core::errors::LexerError;

/// Result of splitting a delimited pattern string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexedPattern {
    pub delimiter: char,
    pub closing: char,
    pub pattern: String,
    pub flags: String,
    /// Byte offset of the pattern body inside the original input.
    pub pattern_offset: usize,
}

/// Closing counterpart for bracket delimiters; every other delimiter closes
/// with itself.
pub fn closing_delimiter(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        other => other,
    }
}

const FLAG_CHARS: &str = "imsxuADUXJ";

/// Split `D pattern D flags` into its parts.
pub fn lex(input: &str) -> Result<LexedPattern, LexerError> {
    let mut chars = input.char_indices();
    let (_, open) = chars
        .next()
        .ok_or_else(|| LexerError::new("Empty regular expression", 0, input))?;

    if open.is_alphanumeric() || open == '\\' || open.is_whitespace() {
        return Err(LexerError::new(
            format!("Delimiter must not be alphanumeric, backslash or whitespace: '{}'", open),
            0,
            input,
        ));
    }

    let close = closing_delimiter(open);
    let bracket_style = close != open;
    let body_start = open.len_utf8();

    let mut escaped = false;
    let mut in_class = false;
    let mut depth = 0usize;
    let mut body_end = None;

    for (idx, ch) in chars {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '[' if !in_class && !(bracket_style && open == '[') => in_class = true,
            ']' if in_class => in_class = false,
            _ if in_class => {}
            _ if bracket_style && ch == open => depth += 1,
            _ if ch == close => {
                if depth == 0 {
                    body_end = Some(idx);
                    break;
                }
                depth -= 1;
            }
            _ => {}
        }
    }

    let body_end = body_end.ok_or_else(|| {
        LexerError::new(
            format!("No ending delimiter '{}' found", close),
            input.len(),
            input,
        )
    })?;

    let pattern = input[body_start..body_end].to_string();
    let flags = input[body_end + close.len_utf8()..].to_string();

    for (idx, flag) in flags.char_indices() {
        if !FLAG_CHARS.contains(flag) {
            return Err(LexerError::new(
                format!("Unknown modifier '{}'", flag),
                body_end + close.len_utf8() + idx,
                input,
            ));
        }
    }

    Ok(LexedPattern {
        delimiter: open,
        closing: close,
        pattern,
        flags,
        pattern_offset: body_start,
    })
}
