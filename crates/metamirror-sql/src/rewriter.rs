//! Mirror query routing.

use serde::Serialize;

use metamirror_core::{CommittedRegistry, MirrorDefinition};

use crate::like;
use crate::marker::{self, MarkerKind};
use crate::parser::{self, Operand, Operation, Operator, ParsedQuery, TableRef, WhereColumn};

/// Host hook for outgoing queries.
///
/// Implementations must be pure and idempotent: the host may call the hook
/// more than once on the same query.
pub trait QueryFilter: Send + Sync {
    fn rewrite(&self, query: &str) -> String;
}

/// Redirects reads on metadata tables to their typed mirrors.
#[derive(Debug, Clone)]
pub struct QueryRewriter {
    mirrors: Vec<MirrorDefinition>,
    source_tables: Vec<String>,
}

impl QueryRewriter {
    pub fn new(registry: &CommittedRegistry) -> Self {
        Self::from_mirrors(registry.mirrors().to_vec())
    }

    /// Build from an explicit mirror list, in priority order.
    pub fn from_mirrors(mirrors: Vec<MirrorDefinition>) -> Self {
        let mut source_tables: Vec<String> = Vec::new();
        for mirror in &mirrors {
            if !source_tables.iter().any(|t| t == mirror.source_table()) {
                source_tables.push(mirror.source_table().to_string());
            }
        }
        Self {
            mirrors,
            source_tables,
        }
    }

    /// Source tables covered by at least one mirror.
    pub fn source_tables(&self) -> &[String] {
        &self.source_tables
    }

    /// Rewrite a query, or return it unchanged.
    pub fn rewrite(&self, query: &str) -> String {
        self.explain(query).rewritten
    }

    /// Rewrite a query and report how each table was routed.
    pub fn explain(&self, query: &str) -> RewriteResult {
        if !self
            .source_tables
            .iter()
            .any(|table| query.contains(table.as_str()))
        {
            return RewriteResult::unchanged(query, false, SkipReason::NoMirroredTable);
        }

        let parsed = match parser::parse(query) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(error = %err, "Query left on source tables");
                return RewriteResult::unchanged(query, false, SkipReason::NotImplemented);
            }
        };

        if !parsed.fully_parsed {
            tracing::debug!(operation = ?parsed.operation, "Query not fully parsed");
            return RewriteResult::unchanged(query, false, SkipReason::NotFullyParsed);
        }
        if parsed.operation != Operation::Select {
            return RewriteResult::unchanged(query, true, SkipReason::NotARead);
        }

        let mut routes = Vec::new();
        for source in &self.source_tables {
            let references: Vec<&TableRef> = parsed.references(source).collect();
            if references.is_empty() {
                continue;
            }
            match self.choose(&parsed, source, &references) {
                Some(mirror) => routes.push(TableRoute {
                    source_table: source.clone(),
                    mirror_table: mirror.mirror_table().to_string(),
                }),
                None => tracing::debug!(table = %source, "No single eligible mirror"),
            }
        }

        if routes.is_empty() {
            return RewriteResult::unchanged(query, true, SkipReason::NoEligibleMirror);
        }

        // A routed table must not be named anywhere but its table markers,
        // e.g. as a column qualifier, or the rewritten query would dangle.
        let unmarked = marker::expand(&parsed.template, |kind, _| match kind {
            MarkerKind::Table => Some(String::new()),
            _ => None,
        });
        if let Some(route) = routes
            .iter()
            .find(|route| mentions_identifier(&unmarked, &route.source_table))
        {
            tracing::debug!(table = %route.source_table, "Table named outside its references");
            return RewriteResult::unchanged(query, true, SkipReason::Ambiguous);
        }

        let rewritten = parsed.render(|name| {
            routes
                .iter()
                .find(|route| route.source_table == name)
                .map_or_else(|| name.to_string(), |route| route.mirror_table.clone())
        });

        tracing::debug!(routes = routes.len(), "Query routed to mirrors");

        RewriteResult {
            original: query.to_string(),
            rewritten,
            parsed: true,
            routed: routes,
            skipped: None,
        }
    }

    /// The one mirror of `source` eligible for every reference, if any.
    fn choose(
        &self,
        parsed: &ParsedQuery,
        source: &str,
        references: &[&TableRef],
    ) -> Option<&MirrorDefinition> {
        let candidates: Vec<&MirrorDefinition> = self
            .mirrors
            .iter()
            .filter(|m| m.source_table() == source)
            .collect();

        let mut eligible = candidates.iter().enumerate().filter_map(|(i, mirror)| {
            // Triggers hand a key to the first whitelisted mirror claiming it.
            let earlier: Vec<&MirrorDefinition> = candidates[..i]
                .iter()
                .copied()
                .filter(|m| !m.is_unfiltered())
                .collect();
            references
                .iter()
                .all(|r| covers(parsed, mirror, &earlier, r))
                .then_some(*mirror)
        });

        match (eligible.next(), eligible.next()) {
            (Some(mirror), None) => Some(mirror),
            _ => None,
        }
    }
}

impl QueryFilter for QueryRewriter {
    fn rewrite(&self, query: &str) -> String {
        QueryRewriter::rewrite(self, query)
    }
}

/// Why a query was returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No covered source table is mentioned.
    NoMirroredTable,
    /// The parser refused the query (subquery).
    NotImplemented,
    NotFullyParsed,
    /// Writes always go to the source table so its triggers fire.
    NotARead,
    NoEligibleMirror,
    /// A routed table is also named outside its table references.
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRoute {
    pub source_table: String,
    pub mirror_table: String,
}

/// Outcome of [`QueryRewriter::explain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteResult {
    pub original: String,
    pub rewritten: String,
    /// Whether the query was fully parsed.
    pub parsed: bool,
    pub routed: Vec<TableRoute>,
    pub skipped: Option<SkipReason>,
}

impl RewriteResult {
    fn unchanged(query: &str, parsed: bool, reason: SkipReason) -> Self {
        Self {
            original: query.to_string(),
            rewritten: query.to_string(),
            parsed,
            routed: Vec::new(),
            skipped: Some(reason),
        }
    }
}

/// Is every row the query can read from `table` present in `mirror`?
///
/// `earlier` holds the whitelisted mirrors of the same source registered
/// before `mirror`; keys they match never reach `mirror`.
fn covers(
    parsed: &ParsedQuery,
    mirror: &MirrorDefinition,
    earlier: &[&MirrorDefinition],
    table: &TableRef,
) -> bool {
    if mirror.is_unfiltered() {
        return true;
    }
    if parsed.uses_or {
        return false;
    }

    let single_table = parsed.tables.len() == 1;
    parsed
        .where_columns
        .iter()
        .filter(|wc| is_key_predicate(wc, mirror, table, single_table))
        .any(|wc| predicate_claimed(parsed, wc, mirror, earlier))
}

fn is_key_predicate(
    wc: &WhereColumn,
    mirror: &MirrorDefinition,
    table: &TableRef,
    single_table: bool,
) -> bool {
    if !wc.column.name.eq_ignore_ascii_case(mirror.key_column()) {
        return false;
    }
    match &wc.column.qualifier {
        Some(qualifier) => qualifier == table.key(),
        None => single_table,
    }
}

fn predicate_claimed(
    parsed: &ParsedQuery,
    wc: &WhereColumn,
    mirror: &MirrorDefinition,
    earlier: &[&MirrorDefinition],
) -> bool {
    // Escaped literals mean something different to LIKE than to `=`.
    let literal = |id: &usize| {
        parsed
            .literals
            .get(id)
            .map(String::as_str)
            .filter(|value| !value.contains('\\'))
    };
    let claimed = |value: &str| {
        matches_any(mirror.whitelist(), value)
            && !earlier.iter().any(|e| may_claim(e.whitelist(), value))
    };

    match (wc.operator, &wc.operand) {
        (Operator::Eq | Operator::NullSafeEq, Operand::Literal(id)) => {
            literal(id).is_some_and(claimed)
        }
        (Operator::Like, Operand::Literal(id)) => literal(id).is_some_and(|value| {
            if like::has_wildcards(value) {
                earlier.is_empty() && mirror.whitelist().iter().any(|p| p == value)
            } else {
                claimed(value)
            }
        }),
        (Operator::In, Operand::LiteralList(ids)) => {
            !ids.is_empty() && ids.iter().all(|id| literal(id).is_some_and(claimed))
        }
        _ => false,
    }
}

fn matches_any(patterns: &[String], value: &str) -> bool {
    patterns.iter().any(|pattern| like::matches(pattern, value))
}

/// Could a trigger hand rows equal to `value` to a mirror with `patterns`
/// under a case- or accent-insensitive collation? Non-ASCII text always
/// could.
fn may_claim(patterns: &[String], value: &str) -> bool {
    patterns.iter().any(|pattern| {
        !pattern.is_ascii() || !value.is_ascii() || like::matches_ignore_case(pattern, value)
    })
}

/// Does `name` occur in `text` as a whole identifier?
fn mentions_identifier(text: &str, name: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$';
    text.match_indices(name).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + name.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}
