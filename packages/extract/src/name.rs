//! Person-name decomposition.
//!
//! Booking sites publish names either as `"Last, First Middle Suffix"` or as
//! `"First Middle Last"`. A trailing generational suffix is peeled off first
//! so that `"Smith, John Jr."` never ends up with a middle name of `"Jr."`.

use crate::text::collapse_whitespace;

/// Generational suffixes, compared uppercase with periods removed.
const SUFFIXES: &[&str] = &[
    "JR", "SR", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "2ND", "3RD", "4TH", "5TH",
];

/// The components of a decomposed name. Any component may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameParts {
    pub first: String,
    pub middle: String,
    pub last: String,
    /// The suffix token as published (e.g. `"Jr."`).
    pub suffix: String,
}

impl NameParts {
    /// Formats as `"Last, First Middle Suffix"`, skipping empty parts.
    #[must_use]
    pub fn full_name(&self) -> String {
        let given = [
            self.first.as_str(),
            self.middle.as_str(),
            self.suffix.as_str(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        match (self.last.is_empty(), given.is_empty()) {
            (true, _) => given,
            (false, true) => self.last.clone(),
            (false, false) => format!("{}, {given}", self.last),
        }
    }
}

/// Whether `token` is a generational suffix (case-insensitive, periods
/// ignored).
#[must_use]
pub fn is_suffix(token: &str) -> bool {
    let normalized = token.replace('.', "").to_ascii_uppercase();
    SUFFIXES.contains(&normalized.as_str())
}

fn split_tokens(text: &str) -> Vec<&str> {
    text.split([' ', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

fn take_suffix(tokens: &mut Vec<&str>) -> Option<String> {
    if tokens.len() > 1 && tokens.last().is_some_and(|t| is_suffix(t)) {
        tokens.pop().map(ToString::to_string)
    } else {
        None
    }
}

/// Splits a published name into first/middle/last/suffix.
///
/// * With a comma: everything before the first comma is the last name.
/// * Without a comma: the final token is the last name, the first token is
///   the first name, and anything in between is the middle name.
/// * A single token becomes the last name only.
#[must_use]
pub fn decompose_name(raw: &str) -> NameParts {
    let name = collapse_whitespace(raw);
    if name.is_empty() {
        return NameParts::default();
    }

    if let Some((last_part, given_part)) = name.split_once(',') {
        let mut last_tokens = split_tokens(last_part);
        let mut given = split_tokens(given_part);

        // "Smith, John Jr." or "Smith Jr, John"
        let suffix = take_suffix(&mut given)
            .or_else(|| take_suffix(&mut last_tokens))
            .or_else(|| {
                (given.len() == 1 && is_suffix(given[0]) && !last_tokens.is_empty())
                    .then(|| given.remove(0).to_string())
            })
            .unwrap_or_default();

        return NameParts {
            first: given.first().map(ToString::to_string).unwrap_or_default(),
            middle: given.get(1..).map(|rest| rest.join(" ")).unwrap_or_default(),
            last: last_tokens.join(" "),
            suffix,
        };
    }

    let mut tokens = split_tokens(&name);
    let suffix = take_suffix(&mut tokens).unwrap_or_default();

    match tokens.as_slice() {
        [] => NameParts::default(),
        [only] => NameParts {
            last: (*only).to_string(),
            suffix,
            ..NameParts::default()
        },
        [first, middle @ .., last] => NameParts {
            first: (*first).to_string(),
            middle: middle.join(" "),
            last: (*last).to_string(),
            suffix,
        },
    }
}
