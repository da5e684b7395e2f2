//! Schema and trigger synthesis.
//!
//! Every mirror becomes one table, created empty and then backfilled from
//! its source. Each source table gets three triggers (`insert_mm_<source>`,
//! `update_mm_<source>`, `delete_mm_<source>`) that fan writes out to all
//! of its mirrors.
//!
//! Whitelisted mirrors of a source share one `IF ... ELSEIF` chain, so a key
//! goes to the first whitelisted mirror (in registry order) whose patterns
//! match it. Backfill and update eviction apply the same first-claim rule so
//! a mirror's contents never depend on whether a row was written before or
//! after the commit. Unfiltered mirrors sit outside the chain and see every
//! row.

use serde::Serialize;

use metamirror_core::{
    CommittedRegistry, MirrorDefinition, MirrorError, MirrorId, validate_identifier,
};

const INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    pub const ALL: [TriggerEvent; 3] = [
        TriggerEvent::Insert,
        TriggerEvent::Update,
        TriggerEvent::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "insert",
            TriggerEvent::Update => "update",
            TriggerEvent::Delete => "delete",
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }

    /// The row image the trigger routes on.
    fn row(&self) -> &'static str {
        match self {
            TriggerEvent::Delete => "OLD",
            _ => "NEW",
        }
    }
}

/// `<event>_mm_<source_table>`
pub fn trigger_name(event: TriggerEvent, source_table: &str) -> String {
    format!("{}_mm_{}", event.as_str(), source_table)
}

/// Statements materializing one mirror table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorPlan {
    pub mirror: MirrorId,
    pub mirror_table: String,
    /// Source triggers, then the mirror table itself.
    pub drops: Vec<String>,
    pub create: String,
    pub backfill: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerPlan {
    pub name: String,
    pub source_table: String,
    pub event: TriggerEvent,
    pub drop: String,
    pub create: String,
}

/// Everything a commit executes, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitPlan {
    pub mirrors: Vec<MirrorPlan>,
    pub triggers: Vec<TriggerPlan>,
}

impl CommitPlan {
    pub fn statements(&self) -> Vec<&str> {
        let mut statements = Vec::new();
        for mirror in &self.mirrors {
            statements.extend(mirror.drops.iter().map(String::as_str));
            statements.push(mirror.create.as_str());
            statements.push(mirror.backfill.as_str());
        }
        for trigger in &self.triggers {
            statements.push(trigger.drop.as_str());
            statements.push(trigger.create.as_str());
        }
        statements
    }
}

/// Turns a committed registry into DDL.
pub struct Synthesizer;

impl Synthesizer {
    pub fn plan(registry: &CommittedRegistry) -> Result<CommitPlan, MirrorError> {
        let mut plan = CommitPlan::default();

        for mirror in registry.iter() {
            let earlier = earlier_claims(registry, mirror);
            plan.mirrors.push(mirror_plan(mirror, &earlier)?);
        }

        for source in registry.source_tables() {
            let mirrors: Vec<&MirrorDefinition> = registry.mirrors_for(source).collect();
            for event in TriggerEvent::ALL {
                plan.triggers.push(trigger_plan(source, event, &mirrors)?);
            }
        }

        Ok(plan)
    }
}

/// Whitelisted mirrors of the same source registered before `mirror`.
fn earlier_claims<'a>(
    registry: &'a CommittedRegistry,
    mirror: &'a MirrorDefinition,
) -> Vec<&'a MirrorDefinition> {
    registry
        .mirrors_for(mirror.source_table())
        .take_while(|m| m.id() != mirror.id())
        .filter(|m| !m.is_unfiltered())
        .collect()
}

fn mirror_plan(
    mirror: &MirrorDefinition,
    earlier: &[&MirrorDefinition],
) -> Result<MirrorPlan, MirrorError> {
    let table = quote_ident(mirror.mirror_table())?;
    let source = quote_ident(mirror.source_table())?;
    let [id, object_id, key, value] = quoted_columns(mirror)?;

    let mut drops = Vec::with_capacity(TriggerEvent::ALL.len() + 1);
    for event in TriggerEvent::ALL {
        drops.push(drop_trigger(&trigger_name(event, mirror.source_table()))?);
    }
    drops.push(format!("DROP TABLE IF EXISTS {table}"));

    let create = format!(
        "CREATE TABLE {table} (\n\
         {INDENT}{id} BIGINT UNSIGNED NOT NULL,\n\
         {INDENT}{object_id} BIGINT UNSIGNED NOT NULL,\n\
         {INDENT}{key} VARCHAR(255),\n\
         {INDENT}{value} {value_type},\n\
         {INDENT}PRIMARY KEY ({id}),\n\
         {INDENT}KEY ({object_id}),\n\
         {INDENT}KEY ({key})\n\
         )",
        value_type = mirror.value_column_type(),
    );

    let columns = format!("{id}, {object_id}, {key}, {value}");
    let mut backfill = format!("INSERT INTO {table} ({columns}) SELECT {columns} FROM {source}");
    if let Some(condition) = claim_condition(mirror, earlier, None)? {
        backfill.push_str(" WHERE ");
        backfill.push_str(&condition);
    }

    Ok(MirrorPlan {
        mirror: mirror.id().clone(),
        mirror_table: mirror.mirror_table().to_string(),
        drops,
        create,
        backfill,
    })
}

fn trigger_plan(
    source_table: &str,
    event: TriggerEvent,
    mirrors: &[&MirrorDefinition],
) -> Result<TriggerPlan, MirrorError> {
    let name = trigger_name(event, source_table);
    let (whitelisted, unfiltered): (Vec<&MirrorDefinition>, Vec<&MirrorDefinition>) =
        mirrors.iter().copied().partition(|m| !m.is_unfiltered());

    let mut body = Vec::new();

    for (i, mirror) in whitelisted.iter().enumerate() {
        let keyword = if i == 0 { "IF" } else { "ELSEIF" };
        let condition = key_condition(mirror, Some(event.row()))?;
        body.push(format!("{INDENT}{keyword} {condition} THEN"));
        body.push(format!("{INDENT}{INDENT}{};", write_statement(mirror, event)?));
    }
    if !whitelisted.is_empty() {
        body.push(format!("{INDENT}END IF;"));
    }

    if event == TriggerEvent::Update {
        for (i, mirror) in whitelisted.iter().enumerate() {
            body.push(format!("{INDENT}{};", evict_statement(mirror, &whitelisted[..i])?));
        }
    }

    for mirror in &unfiltered {
        body.push(format!("{INDENT}{};", write_statement(mirror, event)?));
    }

    let create = format!(
        "CREATE TRIGGER {} AFTER {} ON {} FOR EACH ROW\nBEGIN\n{}\nEND",
        quote_ident(&name)?,
        event.keyword(),
        quote_ident(source_table)?,
        body.join("\n"),
    );

    Ok(TriggerPlan {
        drop: drop_trigger(&name)?,
        name,
        source_table: source_table.to_string(),
        event,
        create,
    })
}

/// The statement keeping `mirror` in step with one row event.
fn write_statement(mirror: &MirrorDefinition, event: TriggerEvent) -> Result<String, MirrorError> {
    let table = quote_ident(mirror.mirror_table())?;
    let [id, object_id, key, value] = quoted_columns(mirror)?;

    Ok(match event {
        TriggerEvent::Insert => format!(
            "INSERT INTO {table} ({id}, {object_id}, {key}, {value}) \
             VALUES (NEW.{id}, NEW.{object_id}, NEW.{key}, NEW.{value})"
        ),
        TriggerEvent::Update => format!(
            "INSERT INTO {table} ({id}, {object_id}, {key}, {value}) \
             VALUES (NEW.{id}, NEW.{object_id}, NEW.{key}, NEW.{value}) \
             ON DUPLICATE KEY UPDATE {object_id} = NEW.{object_id}, {key} = NEW.{key}, {value} = NEW.{value}"
        ),
        TriggerEvent::Delete => format!("DELETE FROM {table} WHERE {id} = OLD.{id}"),
    })
}

/// Removes a row whose new key no longer belongs to `mirror`. A NULL key
/// belongs to no mirror.
fn evict_statement(
    mirror: &MirrorDefinition,
    earlier: &[&MirrorDefinition],
) -> Result<String, MirrorError> {
    let table = quote_ident(mirror.mirror_table())?;
    let id = quote_ident(mirror.id_column())?;
    let condition = claim_condition(mirror, earlier, Some("NEW"))?
        .unwrap_or_else(|| "TRUE".to_string());
    Ok(format!(
        "DELETE FROM {table} WHERE {id} = OLD.{id} AND NOT COALESCE({condition}, FALSE)"
    ))
}

/// `key LIKE 'p1' OR key LIKE 'p2' ...` over the mirror's whitelist.
fn key_condition(mirror: &MirrorDefinition, row: Option<&str>) -> Result<String, MirrorError> {
    let key = match row {
        Some(row) => format!("{row}.{}", quote_ident(mirror.key_column())?),
        None => quote_ident(mirror.key_column())?,
    };
    Ok(mirror
        .whitelist()
        .iter()
        .map(|pattern| format!("{key} LIKE {}", quote_string(pattern)))
        .collect::<Vec<_>>()
        .join(" OR "))
}

/// Keys `mirror` owns: its own patterns minus those claimed earlier in the
/// chain. `None` for unfiltered mirrors.
fn claim_condition(
    mirror: &MirrorDefinition,
    earlier: &[&MirrorDefinition],
    row: Option<&str>,
) -> Result<Option<String>, MirrorError> {
    if mirror.is_unfiltered() {
        return Ok(None);
    }
    let own = key_condition(mirror, row)?;
    if earlier.is_empty() {
        return Ok(Some(own));
    }

    let mut claimed = Vec::with_capacity(earlier.len());
    for other in earlier {
        claimed.push(key_condition(other, row)?);
    }
    Ok(Some(format!("({own}) AND NOT ({})", claimed.join(" OR "))))
}

fn quoted_columns(mirror: &MirrorDefinition) -> Result<[String; 4], MirrorError> {
    let [id, object_id, key, value] = mirror.columns();
    Ok([
        quote_ident(id)?,
        quote_ident(object_id)?,
        quote_ident(key)?,
        quote_ident(value)?,
    ])
}

fn drop_trigger(name: &str) -> Result<String, MirrorError> {
    Ok(format!("DROP TRIGGER IF EXISTS {}", quote_ident(name)?))
}

/// Backtick-quote a validated identifier.
pub fn quote_ident(ident: &str) -> Result<String, MirrorError> {
    validate_identifier(ident)?;
    Ok(format!("`{ident}`"))
}

/// Single-quote a string, escaping backslashes and quotes.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
