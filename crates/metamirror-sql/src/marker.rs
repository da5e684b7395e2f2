//! Positional markers embedded in query templates.
//!
//! Markers have the form `[[kind:NAME]]`. The kinds are `literal` (string
//! literal contents, numbered from 1), `table` (a table reference), `column`
//! (a WHERE-clause column reference) and `escape`: `[[escape:]]` stands for
//! a `[[` the query itself contained.

use std::fmt;

const OPEN: &str = "[[";
const CLOSE: &str = "]]";

/// The kind of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Literal,
    Table,
    Column,
    Escape,
}

impl MarkerKind {
    fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Literal => "literal",
            MarkerKind::Table => "table",
            MarkerKind::Column => "column",
            MarkerKind::Escape => "escape",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "literal" => Some(MarkerKind::Literal),
            "table" => Some(MarkerKind::Table),
            "column" => Some(MarkerKind::Column),
            "escape" => Some(MarkerKind::Escape),
            _ => None,
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a marker.
pub fn marker(kind: MarkerKind, name: impl fmt::Display) -> String {
    format!("{OPEN}{kind}:{name}{CLOSE}")
}

/// Replace every `[[` in `text` with an escape marker.
pub fn escape(text: &str) -> String {
    text.replace(OPEN, &marker(MarkerKind::Escape, ""))
}

/// Replace markers in a single left-to-right pass.
///
/// `resolve` returns the replacement for a marker, or `None` to keep the
/// marker text as is. Replacement text is never rescanned.
pub fn expand<F>(template: &str, mut resolve: F) -> String
where
    F: FnMut(MarkerKind, &str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(OPEN) {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + OPEN.len()..];

        let parsed = after_open.find(CLOSE).and_then(|close| {
            let body = &after_open[..close];
            let (kind, name) = body.split_once(':')?;
            if name.contains(OPEN) {
                return None;
            }
            Some((MarkerKind::from_str(kind)?, name, close))
        });

        match parsed {
            Some((kind, name, close)) => {
                let consumed = OPEN.len() + close + CLOSE.len();
                match resolve(kind, name) {
                    Some(replacement) => out.push_str(&replacement),
                    None => out.push_str(&rest[open..open + consumed]),
                }
                rest = &rest[open + consumed..];
            }
            None => {
                out.push('[');
                rest = &rest[open + 1..];
            }
        }
    }

    out.push_str(rest);
    out
}
