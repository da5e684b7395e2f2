//! SQL `LIKE` pattern matching.
//!
//! `%` matches any run of characters, `_` exactly one, and a backslash
//! makes the next character literal. [`matches`] is case-sensitive and
//! [`matches_ignore_case`] folds ASCII case. The store compares under the
//! column's collation, which may fold case: a binary match is a match
//! there too, while a binary mismatch may not be a mismatch.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Any,
    One,
    Char(char),
}

fn compile(pattern: &str) -> Vec<Piece> {
    let mut pieces = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        pieces.push(match c {
            '%' => Piece::Any,
            '_' => Piece::One,
            // A trailing backslash matches itself.
            '\\' => Piece::Char(chars.next().unwrap_or('\\')),
            other => Piece::Char(other),
        });
    }
    pieces
}

/// Does `value` match the LIKE `pattern`?
pub fn matches(pattern: &str, value: &str) -> bool {
    let pieces = compile(pattern);
    let chars: Vec<char> = value.chars().collect();

    let (mut p, mut v) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while v < chars.len() {
        match pieces.get(p) {
            Some(Piece::Any) => {
                star = Some((p, v));
                p += 1;
            }
            Some(Piece::One) => {
                p += 1;
                v += 1;
            }
            Some(Piece::Char(c)) if *c == chars[v] => {
                p += 1;
                v += 1;
            }
            _ => match star {
                Some((star_p, star_v)) => {
                    p = star_p + 1;
                    v = star_v + 1;
                    star = Some((star_p, star_v + 1));
                }
                None => return false,
            },
        }
    }

    pieces[p..].iter().all(|piece| *piece == Piece::Any)
}

/// Does `value` match `pattern` when ASCII case is ignored?
pub fn matches_ignore_case(pattern: &str, value: &str) -> bool {
    matches(&pattern.to_ascii_lowercase(), &value.to_ascii_lowercase())
}

/// Does the pattern contain an unescaped wildcard?
pub fn has_wildcards(pattern: &str) -> bool {
    compile(pattern)
        .iter()
        .any(|piece| matches!(piece, Piece::Any | Piece::One))
}
