//! Tokenizer for deflated queries.
//!
//! Whitespace is dropped from the token stream; every token keeps its byte
//! span so the parser can rebuild the query around the tokens it rewrites.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// Bare identifier or keyword.
    Word,
    /// Backtick-quoted identifier, backticks included in the text.
    QuotedIdent,
    /// Quoted string literal, quotes included in the text.
    Literal,
    Number,
    /// Comparison operator (`=`, `!=`, `<>`, `<`, `>`, `<=`, `>=`, `<=>`) or
    /// one of the symbolic connectors `||` and `&&`.
    Operator,
    /// One of `, . ( ) ; *`.
    Punct,
    /// `-- ` or `#` to end of line, or a `/* */` block (possibly unclosed).
    Comment,
    /// Anything else, including an unterminated quote running to the end.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> Token<'a> {
    /// Case-insensitive keyword check.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct && self.text.len() == 1 && self.text.starts_with(c)
    }

    /// Identifier name, without backticks for quoted identifiers.
    pub fn ident(&self) -> &'a str {
        match self.kind {
            TokenKind::QuotedIdent => &self.text[1..self.text.len() - 1],
            _ => self.text,
        }
    }
}

const OPERATORS: [&str; 10] = ["<=>", "<=", ">=", "<>", "!=", "||", "&&", "=", "<", ">"];

pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        let kind = if c.is_ascii_whitespace() {
            i += 1;
            continue;
        } else if let Some(end) = comment_end(input, i) {
            i = end;
            TokenKind::Comment
        } else if is_word_byte(c) {
            while i < bytes.len() && is_word_byte(bytes[i]) {
                i += 1;
            }
            if bytes[start..i].iter().all(u8::is_ascii_digit) {
                if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                TokenKind::Number
            } else {
                TokenKind::Word
            }
        } else if c == b'`' {
            match input[i + 1..].find('`') {
                Some(offset) => {
                    i += offset + 2;
                    TokenKind::QuotedIdent
                }
                None => {
                    i = bytes.len();
                    TokenKind::Other
                }
            }
        } else if c == b'\'' || c == b'"' {
            match closing_quote(bytes, i + 1, c) {
                Some(close) => {
                    i = close + 1;
                    TokenKind::Literal
                }
                None => {
                    i = bytes.len();
                    TokenKind::Other
                }
            }
        } else if let Some(op) = OPERATORS.iter().find(|op| input[i..].starts_with(*op)) {
            i += op.len();
            TokenKind::Operator
        } else if b",.();*".contains(&c) {
            i += 1;
            TokenKind::Punct
        } else {
            i += input[i..].chars().next().map_or(1, char::len_utf8);
            TokenKind::Other
        };

        tokens.push(Token {
            kind,
            text: &input[start..i],
            start,
            end: i,
        });
    }

    tokens
}

/// End of the comment starting at `i`, if one does. `--` only opens a
/// comment when followed by whitespace, a control byte or the end of input.
fn comment_end(input: &str, i: usize) -> Option<usize> {
    let rest = &input[i..];
    let line_end = || rest.find('\n').map_or(input.len(), |n| i + n);
    if rest.starts_with('#') {
        return Some(line_end());
    }
    if let Some(after) = rest.strip_prefix("--") {
        return match after.bytes().next() {
            None => Some(input.len()),
            Some(b) if b.is_ascii_whitespace() || b.is_ascii_control() => Some(line_end()),
            Some(_) => None,
        };
    }
    if rest.starts_with("/*") {
        return Some(rest[2..].find("*/").map_or(input.len(), |n| i + n + 4));
    }
    None
}

fn is_word_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

fn closing_quote(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
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
