//! SQL-subset parser.
//!
//! This is not a SQL grammar. It recognizes the narrow statement shapes a
//! host query builder emits against metadata tables, and reports through
//! [`ParsedQuery::fully_parsed`] whether every token was accounted for. A
//! query that is not fully parsed must not be rewritten.
//!
//! Recognized shapes:
//!
//! ```text
//! SELECT <anything> FROM <table> [[AS] alias][, ...] <join>* [<where>] <tail>
//! UPDATE <table> [[AS] alias][, ...] <join>* SET col = x[, ...] [<where>] <tail>
//! DELETE <anything> FROM <table> [[AS] alias] <join>* [<where>] <tail>
//!
//! join  := [LEFT|RIGHT|INNER|OUTER|CROSS] [OUTER] JOIN <table> [[AS] alias]
//!          ON [(] col op col [)]
//! where := WHERE span ((AND|&&|OR|XOR|'||') span)*
//! tail  := [GROUP BY cols] [ORDER BY cols [ASC|DESC]] [LIMIT n [, n | OFFSET n]] [OFFSET n]
//! ```
//!
//! Parsing runs on the deflated query (see [`crate::literal`]). Table
//! references and WHERE-clause columns are replaced by markers in
//! [`ParsedQuery::template`] so the rewriter can substitute them without
//! touching anything else.

use serde::Serialize;

use crate::error::SqlError;
use crate::lexer::{Token, TokenKind, tokenize};
use crate::literal::{self, LiteralMap};
use crate::marker::{self, MarkerKind};

/// Words that can never be a table name, alias or leading column.
const RESERVED: &[&str] = &[
    "SELECT", "FROM", "WHERE", "JOIN", "LEFT", "RIGHT", "INNER", "OUTER", "CROSS", "ON", "USING",
    "AS", "SET", "VALUES", "GROUP", "ORDER", "BY", "HAVING", "LIMIT", "OFFSET", "AND", "OR",
    "XOR", "NOT", "UNION", "IS", "NULL", "LIKE", "IN", "EXISTS",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Select,
    Update,
    Delete,
    Unknown,
}

/// A table occurrence in the FROM/UPDATE/JOIN position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// The name other clauses use to refer to this occurrence.
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Condition,
}

/// `column op column`, as found in a join's ON clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub left: ColumnRef,
    pub operator: Operator,
    pub right: ColumnRef,
}

/// A possibly qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
    /// The reference exactly as written.
    pub raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    NullSafeEq,
    Like,
    NotLike,
    Is,
    IsNot,
    In,
    NotIn,
}

impl Operator {
    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => Operator::Eq,
            "!=" | "<>" => Operator::NotEq,
            "<" => Operator::Lt,
            ">" => Operator::Gt,
            "<=" => Operator::LtEq,
            ">=" => Operator::GtEq,
            "<=>" => Operator::NullSafeEq,
            _ => return None,
        })
    }
}

/// Right-hand side of a WHERE-clause predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Operand {
    /// A single string literal, by literal id.
    Literal(usize),
    /// `IN ('a', 'b')`: every element a string literal.
    LiteralList(Vec<usize>),
    /// Anything else, as written (deflated).
    Other(String),
}

/// A WHERE-clause span that starts with a column reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhereColumn {
    pub column: ColumnRef,
    pub operator: Operator,
    pub operand: Operand,
}

/// Skeleton of a parsed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    pub operation: Operation,
    /// Every table occurrence: primary tables first, then joined tables.
    pub tables: Vec<TableRef>,
    pub joins: Vec<Join>,
    pub where_columns: Vec<WhereColumn>,
    /// Whether any WHERE-clause spans are joined by OR.
    pub uses_or: bool,
    pub literals: LiteralMap,
    /// The deflated query with table and column markers.
    pub template: String,
    /// True only if every token was consumed by a recognized production.
    pub fully_parsed: bool,
}

impl ParsedQuery {
    fn unknown() -> Self {
        Self {
            operation: Operation::Unknown,
            tables: Vec::new(),
            joins: Vec::new(),
            where_columns: Vec::new(),
            uses_or: false,
            literals: LiteralMap::new(),
            template: String::new(),
            fully_parsed: false,
        }
    }

    /// Canonical table name for an alias (or unaliased table name).
    pub fn resolve(&self, alias_or_name: &str) -> Option<&str> {
        self.tables
            .iter()
            .rev()
            .find(|t| t.key() == alias_or_name)
            .map(|t| t.name.as_str())
    }

    /// Every occurrence of a table.
    pub fn references<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a TableRef> + 'a {
        self.tables.iter().filter(move |t| t.name == table)
    }

    /// Rebuild the query, choosing the name written for each table marker.
    pub fn render<F>(&self, mut table_name: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        marker::expand(&self.template, |kind, name| match kind {
            MarkerKind::Table => Some(table_name(name)),
            MarkerKind::Column => Some(name.to_string()),
            MarkerKind::Literal => literal::literal_content(&self.literals, name).map(str::to_string),
            MarkerKind::Escape => Some("[[".to_string()),
        })
    }

    /// Rebuild the query unchanged.
    pub fn inflate(&self) -> String {
        self.render(str::to_string)
    }
}

/// Parse a query.
///
/// Fails only on subqueries; every other unrecognized shape yields a result
/// with `fully_parsed == false`.
pub fn parse(query: &str) -> Result<ParsedQuery, SqlError> {
    let deflated = literal::deflate(query);
    let mut parser = Parser::new(&deflated.query);

    let operation = parser.operation();
    if operation == Operation::Unknown {
        return Ok(ParsedQuery::unknown());
    }

    parser.statement(operation)?;
    // A comment can hide or reveal text depending on the server's reading of
    // it, so a commented query is never rewritten.
    let fully_parsed =
        parser.at_end() && !parser.tokens.iter().any(|t| t.kind == TokenKind::Comment);

    Ok(ParsedQuery {
        operation,
        template: parser.template(),
        tables: parser.tables,
        joins: parser.joins,
        where_columns: parser.where_columns,
        uses_or: parser.uses_or,
        literals: deflated.literals,
        fully_parsed,
    })
}

/// A pending replacement of `src[start..end]` in the template.
#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    pos: usize,
    edits: usize,
    tables: usize,
    joins: usize,
    where_columns: usize,
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    edits: Vec<Edit>,
    tables: Vec<TableRef>,
    joins: Vec<Join>,
    where_columns: Vec<WhereColumn>,
    uses_or: bool,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            tokens: tokenize(src),
            pos: 0,
            edits: Vec::new(),
            tables: Vec::new(),
            joins: Vec::new(),
            where_columns: Vec::new(),
            uses_or: false,
        }
    }

    // ---- cursor helpers ----

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'a>> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            edits: self.edits.len(),
            tables: self.tables.len(),
            joins: self.joins.len(),
            where_columns: self.where_columns.len(),
        }
    }

    fn rewind(&mut self, cp: Checkpoint) {
        self.pos = cp.pos;
        self.edits.truncate(cp.edits);
        self.tables.truncate(cp.tables);
        self.joins.truncate(cp.joins);
        self.where_columns.truncate(cp.where_columns);
    }

    /// Nothing left but an optional single statement terminator.
    fn at_end(&self) -> bool {
        match self.tokens.len() - self.pos.min(self.tokens.len()) {
            0 => true,
            1 => self.tokens[self.pos].is_punct(';'),
            _ => false,
        }
    }

    fn template(&self) -> String {
        let mut out = String::with_capacity(self.src.len() + self.edits.len() * 16);
        let mut copied = 0;
        for edit in &self.edits {
            out.push_str(&self.src[copied..edit.start]);
            out.push_str(&edit.replacement);
            copied = edit.end;
        }
        out.push_str(&self.src[copied..]);
        out
    }

    // ---- productions ----

    fn operation(&mut self) -> Operation {
        let operation = match self.peek() {
            Some(t) if t.is_keyword("SELECT") => Operation::Select,
            Some(t) if t.is_keyword("UPDATE") => Operation::Update,
            Some(t) if t.is_keyword("DELETE") => Operation::Delete,
            _ => return Operation::Unknown,
        };
        self.pos += 1;
        operation
    }

    /// Everything after the operation keyword. Stops quietly at the first
    /// production that does not match; the caller checks [`at_end`].
    fn statement(&mut self, operation: Operation) -> Result<(), SqlError> {
        let has_tables = match operation {
            Operation::Select => self.skip_to_from()? && self.table_list(true),
            Operation::Update => self.table_list(true),
            Operation::Delete => self.skip_to_from()? && self.table_list(false),
            Operation::Unknown => false,
        };
        if !has_tables {
            return Ok(());
        }

        while let Some(join) = self.join() {
            self.joins.push(join);
        }

        if operation == Operation::Update && !self.set_clause() {
            return Ok(());
        }

        self.where_clause()?;
        self.tail_clauses();
        Ok(())
    }

    /// Consume up to and including the first top-level FROM.
    fn skip_to_from(&mut self) -> Result<bool, SqlError> {
        let start = self.pos;
        let mut depth = 0usize;

        while let Some(token) = self.bump() {
            if token.is_keyword("SELECT") {
                return Err(subquery());
            }
            if token.is_punct('(') {
                depth += 1;
            } else if token.is_punct(')') {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && token.is_keyword("FROM") {
                return Ok(true);
            }
        }

        self.pos = start;
        Ok(false)
    }

    fn table_list(&mut self, allow_many: bool) -> bool {
        if self.table_ref().is_none() {
            return false;
        }
        while allow_many {
            let cp = self.checkpoint();
            if !self.eat_punct(',') {
                break;
            }
            if self.table_ref().is_none() {
                self.rewind(cp);
                break;
            }
        }
        true
    }

    /// `name [[AS] alias]`, recorded and replaced by a table marker.
    fn table_ref(&mut self) -> Option<TableRef> {
        let cp = self.checkpoint();
        let name = self.peek().filter(is_identifier)?;
        self.pos += 1;

        // Schema-qualified names are not supported.
        if self.peek().is_some_and(|t| t.is_punct('.')) {
            self.rewind(cp);
            return None;
        }

        let before_alias = self.pos;
        let has_as = self.eat_keyword("AS");
        let alias = match self.peek() {
            Some(t) if is_identifier(&t) => {
                self.pos += 1;
                Some(t.ident().to_string())
            }
            _ => {
                if has_as {
                    self.pos = before_alias;
                }
                None
            }
        };

        let (start, end) = match name.kind {
            TokenKind::QuotedIdent => (name.start + 1, name.end - 1),
            _ => (name.start, name.end),
        };
        self.edits.push(Edit {
            start,
            end,
            replacement: marker::marker(MarkerKind::Table, name.ident()),
        });

        let table = TableRef {
            name: name.ident().to_string(),
            alias,
        };
        self.tables.push(table.clone());
        Some(table)
    }

    fn join(&mut self) -> Option<Join> {
        let cp = self.checkpoint();
        let parsed = self.join_inner();
        if parsed.is_none() {
            self.rewind(cp);
        }
        parsed
    }

    fn join_inner(&mut self) -> Option<Join> {
        let kind = self.join_kind()?;
        let table = self.table_ref()?;

        if !self.eat_keyword("ON") {
            return None;
        }
        let parenthesized = self.eat_punct('(');
        let on = self.condition()?;
        if parenthesized && !self.eat_punct(')') {
            return None;
        }

        Some(Join { kind, table, on })
    }

    /// `[LEFT|RIGHT|INNER|OUTER|CROSS] [OUTER] JOIN`
    fn join_kind(&mut self) -> Option<JoinKind> {
        let kind = match self.peek() {
            Some(t) if t.is_keyword("LEFT") => JoinKind::Left,
            Some(t) if t.is_keyword("RIGHT") => JoinKind::Right,
            Some(t) if t.is_keyword("INNER") => JoinKind::Inner,
            Some(t) if t.is_keyword("OUTER") => JoinKind::Outer,
            Some(t) if t.is_keyword("CROSS") => JoinKind::Cross,
            Some(t) if t.is_keyword("JOIN") => {
                self.pos += 1;
                return Some(JoinKind::Inner);
            }
            _ => return None,
        };
        self.pos += 1;
        if matches!(kind, JoinKind::Left | JoinKind::Right) {
            self.eat_keyword("OUTER");
        }
        self.eat_keyword("JOIN").then_some(kind)
    }

    /// `column op column`
    fn condition(&mut self) -> Option<Condition> {
        let (left, _, _) = self.column_ref()?;
        let operator = self.operator(false)?;
        let (right, _, _) = self.column_ref()?;
        Some(Condition {
            left,
            operator,
            right,
        })
    }

    /// `[qualifier.]name`, returning the reference and its byte span.
    fn column_ref(&mut self) -> Option<(ColumnRef, usize, usize)> {
        let start_pos = self.pos;
        let first = self.peek().filter(is_identifier)?;
        self.pos += 1;

        if self.peek().is_some_and(|t| t.is_punct('.')) {
            match self.peek_at(1) {
                Some(second)
                    if matches!(second.kind, TokenKind::Word | TokenKind::QuotedIdent) =>
                {
                    self.pos += 2;
                    return Some((
                        ColumnRef {
                            qualifier: Some(first.ident().to_string()),
                            name: second.ident().to_string(),
                            raw: self.src[first.start..second.end].to_string(),
                        },
                        first.start,
                        second.end,
                    ));
                }
                _ => {
                    self.pos = start_pos;
                    return None;
                }
            }
        }

        Some((
            ColumnRef {
                qualifier: None,
                name: first.ident().to_string(),
                raw: first.text.to_string(),
            },
            first.start,
            first.end,
        ))
    }

    /// Comparison, `[NOT] LIKE`, `IS [NOT]`, and with `allow_in`, `[NOT] IN`
    /// directly followed by `(`.
    fn operator(&mut self, allow_in: bool) -> Option<Operator> {
        let start = self.pos;
        let token = self.bump()?;

        let operator = if token.kind == TokenKind::Operator {
            Operator::from_symbol(token.text)
        } else if token.is_keyword("LIKE") {
            Some(Operator::Like)
        } else if token.is_keyword("IS") {
            Some(if self.eat_keyword("NOT") {
                Operator::IsNot
            } else {
                Operator::Is
            })
        } else if token.is_keyword("NOT") {
            if self.eat_keyword("LIKE") {
                Some(Operator::NotLike)
            } else if allow_in && self.eat_keyword("IN") {
                Some(Operator::NotIn)
            } else {
                None
            }
        } else if allow_in && token.is_keyword("IN") {
            Some(Operator::In)
        } else {
            None
        };

        let in_without_list = matches!(operator, Some(Operator::In | Operator::NotIn))
            && !self.peek().is_some_and(|t| t.is_punct('('));
        if operator.is_none() || in_without_list {
            self.pos = start;
            return None;
        }
        operator
    }

    /// `SET column = operand[, ...]`, each operand a single token.
    fn set_clause(&mut self) -> bool {
        let cp = self.checkpoint();
        if !self.eat_keyword("SET") {
            return false;
        }

        loop {
            let assigned = self.column_ref().is_some()
                && self.peek().is_some_and(|t| t.kind == TokenKind::Operator && t.text == "=")
                && {
                    self.pos += 1;
                    self.bump().is_some_and(|t| {
                        matches!(
                            t.kind,
                            TokenKind::Literal
                                | TokenKind::Number
                                | TokenKind::Word
                                | TokenKind::QuotedIdent
                        ) && !is_reserved(&t)
                            || t.is_keyword("NULL")
                    })
                };
            if !assigned {
                self.rewind(cp);
                return false;
            }
            if !self.eat_punct(',') {
                return true;
            }
        }
    }

    fn where_clause(&mut self) -> Result<(), SqlError> {
        if !self.eat_keyword("WHERE") {
            return Ok(());
        }

        let mut first = true;
        let mut depth = 0i32;
        loop {
            let cp = self.checkpoint();
            if !first {
                if self.eat_disjunction() {
                    self.uses_or = true;
                } else if !self.eat_conjunction() {
                    break;
                }
            }

            let start = self.pos;
            let end = self.span_end()?;
            if end == start {
                self.rewind(cp);
                break;
            }

            // Only a span outside every parenthesis is a top-level conjunct.
            if depth == 0 {
                self.where_span(start, end);
            }
            depth += self.tokens[start..end]
                .iter()
                .map(|t| match t {
                    t if t.is_punct('(') => 1,
                    t if t.is_punct(')') => -1,
                    _ => 0,
                })
                .sum::<i32>();
            self.pos = end;
            first = false;
        }
        Ok(())
    }

    fn eat_conjunction(&mut self) -> bool {
        self.eat_keyword("AND") || self.eat_operator("&&")
    }

    fn eat_disjunction(&mut self) -> bool {
        self.eat_keyword("OR") || self.eat_keyword("XOR") || self.eat_operator("||")
    }

    fn eat_operator(&mut self, symbol: &str) -> bool {
        if self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Operator && t.text == symbol)
        {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Index of the token ending the WHERE span that starts at `pos`.
    fn span_end(&self) -> Result<usize, SqlError> {
        let last = self.tokens.len();
        let mut i = self.pos;

        while i < last {
            let token = self.tokens[i];
            let next = self.tokens.get(i + 1);

            if token.is_keyword("SELECT") {
                return Err(subquery());
            }

            let boundary = token.is_keyword("AND")
                || token.is_keyword("OR")
                || token.is_keyword("XOR")
                || (token.kind == TokenKind::Operator && matches!(token.text, "||" | "&&"))
                || token.is_keyword("LIMIT")
                || token.is_keyword("OFFSET")
                || token.is_keyword("HAVING")
                || token.is_keyword("FOR")
                || token.is_keyword("INTO")
                || ((token.is_keyword("GROUP") || token.is_keyword("ORDER"))
                    && next.is_some_and(|n| n.is_keyword("BY")))
                || (token.is_punct(';') && i + 1 == last);
            if boundary {
                return Ok(i);
            }
            i += 1;
        }
        Ok(last)
    }

    /// Tag the span's leading column if the span reads `column op ...`.
    fn where_span(&mut self, start: usize, end: usize) {
        self.pos = start;

        let Some((column, col_start, col_end)) = self.column_ref() else {
            return;
        };
        let Some(operator) = self.operator(true) else {
            return;
        };
        if self.pos > end {
            return;
        }

        let operand = self.operand(&self.tokens[self.pos..end], operator);
        self.edits.push(Edit {
            start: col_start,
            end: col_end,
            replacement: marker::marker(MarkerKind::Column, &column.raw),
        });
        self.where_columns.push(WhereColumn {
            column,
            operator,
            operand,
        });
    }

    fn operand(&self, tokens: &[Token<'a>], operator: Operator) -> Operand {
        if let [token] = tokens {
            if let Some(id) = literal_id(token) {
                return Operand::Literal(id);
            }
        }

        if matches!(operator, Operator::In | Operator::NotIn) {
            if let Some(ids) = literal_list(tokens) {
                return Operand::LiteralList(ids);
            }
        }

        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => Operand::Other(self.src[first.start..last.end].to_string()),
            _ => Operand::Other(String::new()),
        }
    }

    fn tail_clauses(&mut self) {
        if self.peek_keyword("GROUP") && self.peek_at(1).is_some_and(|t| t.is_keyword("BY")) {
            let cp = self.checkpoint();
            self.pos += 2;
            if !self.sort_list(false) {
                self.rewind(cp);
                return;
            }
        }

        if self.peek_keyword("ORDER") && self.peek_at(1).is_some_and(|t| t.is_keyword("BY")) {
            let cp = self.checkpoint();
            self.pos += 2;
            if !self.sort_list(true) {
                self.rewind(cp);
                return;
            }
        }

        if self.peek_keyword("LIMIT") {
            let cp = self.checkpoint();
            self.pos += 1;
            if !self.eat_number() {
                self.rewind(cp);
                return;
            }
            let second = self.checkpoint();
            if (self.eat_punct(',') || self.eat_keyword("OFFSET")) && !self.eat_number() {
                self.rewind(second);
            }
        }

        if self.peek_keyword("OFFSET") {
            let cp = self.checkpoint();
            self.pos += 1;
            if !self.eat_number() {
                self.rewind(cp);
            }
        }
    }

    /// Comma-separated columns (or positions), with optional direction.
    fn sort_list(&mut self, directions: bool) -> bool {
        loop {
            if !self.eat_number() && self.column_ref().is_none() {
                return false;
            }
            if directions && !self.eat_keyword("ASC") {
                self.eat_keyword("DESC");
            }
            if !self.eat_punct(',') {
                return true;
            }
        }
    }

    fn eat_number(&mut self) -> bool {
        if self.peek().is_some_and(|t| t.kind == TokenKind::Number) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

fn subquery() -> SqlError {
    SqlError::NotImplemented {
        construct: "subquery".to_string(),
    }
}

fn is_reserved(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Word && RESERVED.iter().any(|kw| token.is_keyword(kw))
}

/// Identifiers that become marker names may not contain brackets.
fn is_identifier(token: &Token<'_>) -> bool {
    match token.kind {
        TokenKind::QuotedIdent => !token.text.contains(['[', ']']),
        TokenKind::Word => !is_reserved(token),
        _ => false,
    }
}

/// Id of a deflated string literal token (`'[[literal:N]]'`).
fn literal_id(token: &Token<'_>) -> Option<usize> {
    if token.kind != TokenKind::Literal || token.text.len() < 2 {
        return None;
    }
    let inner = &token.text[1..token.text.len() - 1];
    inner
        .strip_prefix("[[literal:")?
        .strip_suffix("]]")?
        .parse()
        .ok()
}

/// `( literal [, literal]* )`
fn literal_list(tokens: &[Token<'_>]) -> Option<Vec<usize>> {
    let (open, rest) = tokens.split_first()?;
    let (close, items) = rest.split_last()?;
    if !open.is_punct('(') || !close.is_punct(')') || items.is_empty() {
        return None;
    }

    let mut ids = Vec::new();
    for (i, token) in items.iter().enumerate() {
        if i % 2 == 0 {
            ids.push(literal_id(token)?);
        } else if !token.is_punct(',') {
            return None;
        }
    }
    (items.len() % 2 == 1).then_some(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parsed(query: &str) -> ParsedQuery {
        parse(query).unwrap()
    }

    fn table(name: &str, alias: Option<&str>) -> TableRef {
        TableRef {
            name: name.to_string(),
            alias: alias.map(str::to_string),
        }
    }

    #[test]
    fn test_simple_select() {
        let q = parsed("SELECT * FROM wp_postmeta");
        assert_eq!(q.operation, Operation::Select);
        assert_eq!(q.tables, vec![table("wp_postmeta", None)]);
        assert_eq!(q.template, "SELECT * FROM [[table:wp_postmeta]]");
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_unknown_operation() {
        for query in ["INSERT INTO t VALUES (1)", "WHERE a = a", "", "  show tables"] {
            let q = parsed(query);
            assert_eq!(q.operation, Operation::Unknown);
            assert!(q.tables.is_empty());
            assert!(q.template.is_empty());
            assert!(!q.fully_parsed);
        }
    }

    #[test]
    fn test_operation_case_and_whitespace() {
        let q = parsed("  \n select meta_value from wp_postmeta;");
        assert_eq!(q.operation, Operation::Select);
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_table_alias_forms() {
        let q = parsed("SELECT m.meta_id FROM `wp_postmeta` AS m");
        assert_eq!(q.tables, vec![table("wp_postmeta", Some("m"))]);
        assert_eq!(q.template, "SELECT m.meta_id FROM `[[table:wp_postmeta]]` AS m");
        assert_eq!(q.resolve("m"), Some("wp_postmeta"));
        assert!(q.fully_parsed);

        let q = parsed("SELECT * FROM wp_postmeta pm WHERE pm.meta_key = 'a'");
        assert_eq!(q.tables, vec![table("wp_postmeta", Some("pm"))]);
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_comma_separated_tables() {
        let q = parsed("SELECT * FROM wp_posts p, wp_postmeta m WHERE p.ID = m.post_id");
        assert_eq!(
            q.tables,
            vec![table("wp_posts", Some("p")), table("wp_postmeta", Some("m"))]
        );
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_left_join() {
        let q = parsed(
            "SELECT meta_id FROM wp_postmeta m1 LEFT JOIN wp_postmeta m2 ON m1.meta_id = m2.meta_id",
        );
        assert_eq!(
            q.tables,
            vec![table("wp_postmeta", Some("m1")), table("wp_postmeta", Some("m2"))]
        );
        assert_eq!(q.joins.len(), 1);
        assert_eq!(q.joins[0].kind, JoinKind::Left);
        assert_eq!(q.joins[0].on.left.qualifier.as_deref(), Some("m1"));
        assert_eq!(q.joins[0].on.operator, Operator::Eq);
        assert_eq!(
            q.template,
            "SELECT meta_id FROM [[table:wp_postmeta]] m1 LEFT JOIN [[table:wp_postmeta]] m2 ON m1.meta_id = m2.meta_id"
        );
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_join_variants() {
        let q = parsed(
            "SELECT * FROM a INNER JOIN b ON (a.id = b.a_id) LEFT OUTER JOIN c AS x ON x.k LIKE b.k JOIN d ON d.v IS NOT b.v",
        );
        let kinds: Vec<JoinKind> = q.joins.iter().map(|j| j.kind).collect();
        assert_eq!(kinds, vec![JoinKind::Inner, JoinKind::Left, JoinKind::Inner]);
        assert_eq!(q.joins[1].table, table("c", Some("x")));
        assert_eq!(q.joins[1].on.operator, Operator::Like);
        assert_eq!(q.joins[2].on.operator, Operator::IsNot);
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_join_without_on_stops_join_recognition() {
        let q = parsed("SELECT * FROM a m1 JOIN b m2 USING (id)");
        assert_eq!(q.tables, vec![table("a", Some("m1"))]);
        assert!(q.joins.is_empty());
        assert_eq!(q.template, "SELECT * FROM [[table:a]] m1 JOIN b m2 USING (id)");
        assert!(!q.fully_parsed);
    }

    #[test]
    fn test_where_columns_tagged() {
        let q = parsed(
            "SELECT * FROM wp_postmeta WHERE meta_key = 'color' AND `meta_value` LIKE 'bl%' OR post_id IN (1, 2)",
        );
        assert_eq!(q.where_columns.len(), 3);
        assert_eq!(q.where_columns[0].column.name, "meta_key");
        assert_eq!(q.where_columns[0].operand, Operand::Literal(1));
        assert_eq!(q.where_columns[1].operator, Operator::Like);
        assert_eq!(q.where_columns[1].column.raw, "`meta_value`");
        assert_eq!(q.where_columns[2].operator, Operator::In);
        assert_eq!(q.where_columns[2].operand, Operand::Other("(1, 2)".to_string()));
        assert!(q.uses_or);
        assert_eq!(
            q.template,
            "SELECT * FROM [[table:wp_postmeta]] WHERE [[column:meta_key]] = '[[literal:1]]' AND [[column:`meta_value`]] LIKE '[[literal:2]]' OR [[column:post_id]] IN (1, 2)"
        );
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_where_literal_list_operand() {
        let q = parsed("SELECT * FROM t WHERE t.k NOT IN ('a', \"b\")");
        assert_eq!(q.where_columns[0].operator, Operator::NotIn);
        assert_eq!(q.where_columns[0].operand, Operand::LiteralList(vec![1, 2]));
        assert_eq!(q.where_columns[0].column.qualifier.as_deref(), Some("t"));
    }

    #[test]
    fn test_non_column_span_left_untouched() {
        let q = parsed("SELECT * FROM wp_postmeta WHERE 1 = 1 AND meta_key = 'x'");
        assert_eq!(q.where_columns.len(), 1);
        assert_eq!(
            q.template,
            "SELECT * FROM [[table:wp_postmeta]] WHERE 1 = 1 AND [[column:meta_key]] = '[[literal:1]]'"
        );
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_where_is_null() {
        let q = parsed("DELETE FROM wp_postmeta WHERE meta_value IS NOT NULL");
        assert_eq!(q.operation, Operation::Delete);
        assert_eq!(q.where_columns[0].operator, Operator::IsNot);
        assert_eq!(q.where_columns[0].operand, Operand::Other("NULL".to_string()));
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_tail_clauses() {
        let q = parsed(
            "SELECT post_id, COUNT(*) FROM wp_postmeta WHERE meta_key = 'a' GROUP BY post_id ORDER BY post_id DESC, 2 LIMIT 10 OFFSET 20;",
        );
        assert!(q.fully_parsed);

        let q = parsed("SELECT * FROM wp_postmeta ORDER BY meta_id ASC LIMIT 0, 5");
        assert!(q.fully_parsed);

        let q = parsed("SELECT * FROM wp_postmeta HAVING x > 1");
        assert!(!q.fully_parsed);
    }

    #[test]
    fn test_update_with_set() {
        let q = parsed("UPDATE wp_postmeta SET meta_value = 'x', post_id = 3 WHERE meta_id = 7");
        assert_eq!(q.operation, Operation::Update);
        assert_eq!(q.tables, vec![table("wp_postmeta", None)]);
        assert_eq!(q.where_columns.len(), 1);
        assert!(q.fully_parsed);

        let q = parsed("UPDATE wp_postmeta SET meta_value = meta_value + 1");
        assert!(!q.fully_parsed);
    }

    #[test]
    fn test_delete() {
        let q = parsed("DELETE FROM `wp_postmeta` WHERE post_id = 12 AND meta_key LIKE '\\_edit%'");
        assert_eq!(q.tables, vec![table("wp_postmeta", None)]);
        assert_eq!(q.literals[&1], "\\_edit%");
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_subquery_not_implemented() {
        let err = parse("SELECT * FROM wp_postmeta WHERE post_id IN (SELECT ID FROM wp_posts)")
            .unwrap_err();
        assert_eq!(
            err,
            SqlError::NotImplemented {
                construct: "subquery".to_string()
            }
        );

        assert!(parse("SELECT (SELECT 1) FROM wp_postmeta").is_err());
        assert!(parse("SELECT * FROM a WHERE x = 1 UNION SELECT * FROM b").is_err());
    }

    #[test]
    fn test_keywords_inside_literals_do_not_confuse_parser() {
        let q = parsed("SELECT * FROM t WHERE k = 'a AND (SELECT 1) OR b' AND v = \"FROM\"");
        assert_eq!(q.where_columns.len(), 2);
        assert!(!q.uses_or);
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_unconsumed_input() {
        assert!(!parsed("SELECT 1").fully_parsed);
        assert!(!parsed("SELECT * FROM db.wp_postmeta").fully_parsed);
        assert!(!parsed("SELECT * FROM t WHERE a = 1 AND").fully_parsed);
        assert!(!parsed("SELECT * FROM t;;").fully_parsed);
        assert!(!parsed("SELECT * FROM t WHERE a = 1 FOR UPDATE").fully_parsed);
    }

    #[test]
    fn test_comments_are_never_fully_parsed() {
        for query in [
            "SELECT * FROM wp_postmeta WHERE 1 = 1 -- AND meta_key = 'hello'",
            "SELECT * FROM wp_postmeta WHERE 1 = 1 # AND meta_key = 'hello'",
            "SELECT * FROM wp_postmeta WHERE 1 = 1 /* AND meta_key = 'hello' */",
            "SELECT * FROM wp_postmeta WHERE meta_key = 'hello' /*!50000 OR 1 */",
            "SELECT * FROM wp_postmeta WHERE meta_key = 'hello' -- it's\n",
        ] {
            assert!(!parsed(query).fully_parsed, "{query}");
        }

        let q = parsed("SELECT * FROM wp_postmeta WHERE post_id = 1--1");
        assert_eq!(q.where_columns[0].operand, Operand::Other("1--1".to_string()));
    }

    #[test]
    fn test_symbolic_and_xor_connectors() {
        let q = parsed("SELECT * FROM wp_postmeta WHERE post_id = 1 || meta_key = 'hello'");
        assert!(q.uses_or);
        assert_eq!(q.where_columns.len(), 2);
        assert!(q.fully_parsed);

        let q = parsed("SELECT * FROM wp_postmeta WHERE post_id = 1 XOR meta_key = 'hello'");
        assert!(q.uses_or);
        assert!(q.fully_parsed);

        let q = parsed("SELECT * FROM wp_postmeta WHERE post_id = 1 && meta_key = 'hello'");
        assert!(!q.uses_or);
        assert_eq!(q.where_columns.len(), 2);
        assert_eq!(q.where_columns[1].operand, Operand::Literal(1));
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_spans_inside_parens_are_not_tagged() {
        let q = parsed(
            "SELECT * FROM wp_postmeta WHERE NOT (post_id = 1 AND meta_key = 'hello' AND 1) AND meta_value = 'x'",
        );
        assert_eq!(q.where_columns.len(), 1);
        assert_eq!(q.where_columns[0].column.name, "meta_value");
        assert!(!q.uses_or);
    }

    #[test]
    fn test_bracketed_names_are_not_identifiers() {
        let q = parsed("SELECT * FROM `wp]]postmeta`");
        assert!(q.tables.is_empty());
        assert!(!q.fully_parsed);

        let query = "SELECT `[[literal:1]]` FROM wp_postmeta WHERE meta_key = 'v'";
        let q = parsed(query);
        assert!(q.fully_parsed);
        assert_eq!(q.inflate(), query);
        assert_eq!(
            q.render(|name| format!("{name}_mm")),
            "SELECT `[[literal:1]]` FROM wp_postmeta_mm WHERE meta_key = 'v'"
        );
    }

    #[test]
    fn test_extract_from_inside_parens_is_skipped() {
        let q = parsed("SELECT EXTRACT(YEAR FROM meta_value) FROM wp_postmeta");
        assert_eq!(q.tables, vec![table("wp_postmeta", None)]);
        assert!(q.fully_parsed);
    }

    #[test]
    fn test_inflate_restores_query() {
        for query in [
            "SELECT * FROM `wp_postmeta` m WHERE m.meta_key = 'it\\'s' AND 1 = 1 LIMIT 1",
            "UPDATE wp_postmeta SET meta_value = \"v\" WHERE meta_key LIKE 'a%'",
            "SELECT * FROM a JOIN b ON a.x = b.y WHERE a.z IN ('1','2') ORDER BY a.x;",
        ] {
            assert_eq!(parsed(query).inflate(), query);
        }
    }

    #[test]
    fn test_render_substitutes_tables() {
        let q = parsed("SELECT * FROM wp_postmeta pm WHERE pm.meta_key = 'k'");
        let out = q.render(|name| format!("{name}_mm_integer"));
        assert_eq!(out, "SELECT * FROM wp_postmeta_mm_integer pm WHERE pm.meta_key = 'k'");
    }

    #[test]
    fn test_productions_in_isolation() {
        let mut parser = Parser::new("m1.meta_id <=> `m2`.`meta_id`");
        let condition = parser.condition().unwrap();
        assert_eq!(condition.left.raw, "m1.meta_id");
        assert_eq!(condition.operator, Operator::NullSafeEq);
        assert_eq!(condition.right.name, "meta_id");
        assert!(parser.at_end());

        let mut parser = Parser::new("NOT IN x");
        assert_eq!(parser.operator(true), None);
        assert_eq!(parser.pos, 0);

        let mut parser = Parser::new("LEFT OUTER JOIN");
        assert_eq!(parser.join_kind(), Some(JoinKind::Left));

        let mut parser = Parser::new("wp_postmeta AS");
        let table = parser.table_ref().unwrap();
        assert_eq!(table.alias, None);
        assert!(parser.peek_keyword("AS"));
    }
}
