//! String literal deflation and inflation.
//!
//! Deflating swaps the contents of every quoted string literal for a
//! numbered marker so the parser never has to reason about quotes, escapes
//! or keywords hiding inside values:
//!
//! ```text
//! SELECT * FROM t WHERE k = 'it\'s' AND v = "x"
//! SELECT * FROM t WHERE k = '[[literal:1]]' AND v = "[[literal:2]]"
//! ```
//!
//! Any `[[` outside literals is escaped (see [`crate::marker::escape`]) so
//! text in the query can never pass for a marker. Inflating restores the
//! query byte for byte.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::marker::{self, MarkerKind};

/// Literal id → original literal contents (without quotes).
pub type LiteralMap = BTreeMap<usize, String>;

/// A query with its string literals swapped for markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deflated {
    pub query: String,
    pub literals: LiteralMap,
}

/// Replace the contents of every single- or double-quoted literal with a
/// `[[literal:N]]` marker, N counting from 1 in order of appearance.
///
/// Backslash escapes are honoured inside literals. An unterminated quote is
/// left in place as plain text.
pub fn deflate(query: &str) -> Deflated {
    let mut out = String::with_capacity(query.len());
    let mut literals = LiteralMap::new();
    let bytes = query.as_bytes();
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let quote = bytes[i];
        if quote != b'\'' && quote != b'"' {
            i += 1;
            continue;
        }

        let Some(close) = find_closing_quote(bytes, i + 1, quote) else {
            break;
        };

        let id = literals.len() + 1;
        literals.insert(id, query[i + 1..close].to_string());

        out.push_str(&marker::escape(&query[copied..=i]));
        out.push_str(&marker::marker(MarkerKind::Literal, id));
        out.push(quote as char);

        i = close + 1;
        copied = i;
    }

    out.push_str(&marker::escape(&query[copied..]));
    Deflated {
        query: out,
        literals,
    }
}

/// Restore every `[[literal:N]]` marker from `literals`, and every escaped
/// `[[`.
///
/// Literal markers without an entry in the map are kept verbatim.
pub fn inflate(query: &str, literals: &LiteralMap) -> String {
    marker::expand(query, |kind, name| match kind {
        MarkerKind::Literal => literal_content(literals, name).map(str::to_string),
        MarkerKind::Escape => Some("[[".to_string()),
        _ => None,
    })
}

/// Look up the contents of a literal by the id text of its marker.
pub(crate) fn literal_content<'a>(literals: &'a LiteralMap, id: &str) -> Option<&'a str> {
    let id: usize = id.parse().ok()?;
    literals.get(&id).map(String::as_str)
}

fn find_closing_quote(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut j = start;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b if b == quote => return Some(j),
            _ => j += 1,
        }
    }
    None
}
