//! Tag stripping, whitespace normalization, and first-match extraction.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|\d+);").expect("valid regex"));

/// Collapses every run of whitespace to a single space and trims.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Removes all markup, decodes common entities, and collapses whitespace.
///
/// Nested tags inside a capture are removed along with their wrappers, so
/// `<td><b>SMITH</b></td>` becomes `SMITH`.
#[must_use]
pub fn strip_tags(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, " ");
    let decoded = decode_entities(&without_tags);
    collapse_whitespace(&decoded)
}

fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");

    let numeric = NUMERIC_ENTITY_RE.replace_all(&named, |caps: &regex::Captures<'_>| {
        let code = &caps[1];
        let value = code
            .strip_prefix('x')
            .map_or_else(|| code.parse::<u32>().ok(), |hex| u32::from_str_radix(hex, 16).ok());
        value
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });

    // Last so that `&amp;lt;` decodes to the literal `&lt;`.
    numeric.replace("&amp;", "&")
}

/// Returns capture group 1 of the first match whose cleaned value is
/// non-empty.
#[must_use]
pub fn first_match(text: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| strip_tags(m.as_str()))
        .find(|value| !value.is_empty())
}

/// Tries each pattern in order and returns the first non-empty capture.
#[must_use]
pub fn first_match_any(text: &str, patterns: &[&Regex]) -> Option<String> {
    patterns.iter().find_map(|pattern| first_match(text, pattern))
}

/// Every non-empty cleaned capture group 1, in document order.
#[must_use]
pub fn all_captures(text: &str, pattern: &Regex) -> Vec<String> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| strip_tags(m.as_str()))
        .filter(|value| !value.is_empty())
        .collect()
}

/// Value of the table cell that follows a `<td>` containing `label`.
///
/// Matches `Label</td> <td ...>value<`, the layout used by report-style
/// booking pages.
#[must_use]
pub fn labeled_cell(html: &str, label: &str) -> Option<String> {
    let pattern = format!(
        r"(?i){}\s*:?\s*</t[dh]>\s*<td[^>]*>(.*?)</td>",
        regex::escape(label)
    );
    Regex::new(&pattern)
        .ok()
        .and_then(|re| first_match(html, &re))
}

/// Value of a hidden form input, located by `id` or `name` attribute.
///
/// Attribute order varies between servers, so both `id=... value=...` and
/// `value=... id=...` are accepted.
#[must_use]
pub fn hidden_field(html: &str, field: &str) -> Option<String> {
    let escaped = regex::escape(field);
    let patterns = [
        format!(r#"(?:id|name)="{escaped}"[^>]*value="([^"]*)""#),
        format!(r#"value="([^"]*)"[^>]*(?:id|name)="{escaped}""#),
    ];

    patterns.iter().find_map(|pattern| {
        Regex::new(pattern)
            .ok()?
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().replace("&amp;", "&"))
    })
}

/// Lowercases everything, then uppercases the first letter of each word.
#[must_use]
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = c != '\'';
        }
    }
    out
}
