//! Markup escaping for leaf text and attribute values.

use recast_core::{RecastError, RecastResult};
use std::borrow::Cow;

/// Escape the five markup metacharacters
#[must_use]
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['<', '>', '&', '\'', '"']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Resolve entity and character references.
///
/// `offset` is the byte position of `text` in the document, used in fault
/// positions.
///
/// # Errors
///
/// Returns `MalformedInput` for an unterminated or unknown reference
pub fn unescape(text: &str, offset: usize) -> RecastResult<Cow<'_, str>> {
    if !text.contains('&') {
        return Ok(Cow::Borrowed(text));
    }
    let mut plain = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        plain.push_str(&rest[..start]);
        let position = offset + (text.len() - rest.len()) + start;
        let tail = &rest[start + 1..];
        let end = tail
            .find(';')
            .ok_or_else(|| RecastError::malformed(position, "unterminated entity reference"))?;
        plain.push(resolve_entity(&tail[..end], position)?);
        rest = &tail[end + 1..];
    }
    plain.push_str(rest);
    Ok(Cow::Owned(plain))
}

fn resolve_entity(name: &str, position: usize) -> RecastResult<char> {
    let numeric = |digits: &str, radix: u32| {
        u32::from_str_radix(digits, radix)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| RecastError::malformed(position, format!("bad character reference &{};", name)))
    };
    match name {
        "lt" => Ok('<'),
        "gt" => Ok('>'),
        "amp" => Ok('&'),
        "apos" => Ok('\''),
        "quot" => Ok('"'),
        _ => {
            if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                numeric(hex, 16)
            } else if let Some(decimal) = name.strip_prefix('#') {
                numeric(decimal, 10)
            } else {
                Err(RecastError::malformed(position, format!("unknown entity &{};", name)))
            }
        }
    }
}
