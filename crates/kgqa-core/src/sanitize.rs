//! Cleanup of generated mutation statements before they reach a store.
//!
//! Generative models routinely emit possessives inside single-quoted
//! literals (`'Levi's Stadium'`), HTML entities and typographic quotes. This
//! pass repairs what it can and rejects what it cannot, so a broken literal
//! never reaches the store and swallows the text around it.
//!
//! Stripping inner apostrophes loses information (`Levi's` becomes `Levis`);
//! [`SanitizePolicy::Escape`] keeps it by emitting `\'` instead.

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};

/// What to do with an apostrophe found inside a single-quoted literal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizePolicy {
    /// Remove it.
    #[default]
    Strip,
    /// Backslash-escape it.
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
    Backtick,
}

/// Sanitize one generated statement.
///
/// Returns the cleaned statement, or an error when it is empty or its quoting
/// is still unbalanced after repair.
pub fn sanitize_statement(raw: &str, policy: SanitizePolicy) -> Result<String, ExtractionError> {
    let text = strip_fences(raw);
    let text = decode_entities(text);
    let text = normalize_quotes(&text);
    let text = text.trim();

    if text.is_empty() {
        return Err(ExtractionError::EmptyStatement);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut state = Quote::None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match state {
            Quote::None => {
                state = match c {
                    '\'' => Quote::Single,
                    '"' => Quote::Double,
                    '`' => Quote::Backtick,
                    _ => Quote::None,
                };
                out.push(c);
            }
            Quote::Single | Quote::Double if c == '\\' => {
                out.push(c);
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                    i += 1;
                }
            }
            Quote::Single if c == '\'' => {
                let inner = i > 0
                    && chars[i - 1].is_alphanumeric()
                    && chars.get(i + 1).is_some_and(|n| n.is_alphanumeric());
                if inner {
                    if policy == SanitizePolicy::Escape {
                        out.push_str("\\'");
                    }
                } else {
                    state = Quote::None;
                    out.push(c);
                }
            }
            Quote::Double if c == '"' => {
                state = Quote::None;
                out.push(c);
            }
            Quote::Backtick if c == '`' => {
                state = Quote::None;
                out.push(c);
            }
            _ => out.push(c),
        }
        i += 1;
    }

    if state != Quote::None {
        return Err(ExtractionError::UnbalancedQuotes(text.to_string()));
    }

    Ok(out)
}

/// Drop markdown code fences the model wrapped around a statement.
fn strip_fences(raw: &str) -> &str {
    let text = raw.trim();
    let text = text
        .strip_prefix("```cypher")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text)
}

fn decode_entities(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{2032}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect()
}
