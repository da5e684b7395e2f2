use serde::Serialize;

use metamirror_core::{CommittedRegistry, MirrorId};

use crate::error::SynthesisError;
use crate::store::{MirrorStore, WarningLevel};
use crate::synth::{CommitPlan, Synthesizer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommittedMirror {
    pub mirror: MirrorId,
    pub mirror_table: String,
    pub rows_backfilled: u64,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub mirrors: Vec<CommittedMirror>,
    pub triggers: Vec<String>,
}

/// (Re)create every mirror of `registry` and its source triggers.
///
/// Mirrors are committed one at a time in registry order. The first failing
/// statement, or the first store warning raised while creating or
/// backfilling, aborts the commit; mirrors already committed stay in place.
/// Running it again drops and recreates everything.
pub async fn commit<S>(
    registry: &CommittedRegistry,
    store: &mut S,
) -> Result<CommitReport, SynthesisError>
where
    S: MirrorStore + ?Sized,
{
    let plan = Synthesizer::plan(registry)?;
    commit_plan(&plan, store).await
}

/// Execute a precomputed plan.
pub async fn commit_plan<S>(
    plan: &CommitPlan,
    store: &mut S,
) -> Result<CommitReport, SynthesisError>
where
    S: MirrorStore + ?Sized,
{
    let mut report = CommitReport::default();

    for mirror in &plan.mirrors {
        let subject = mirror.mirror.as_str();
        tracing::info!(mirror = subject, "Committing mirror");

        for sql in &mirror.drops {
            run(store, subject, sql, false).await?;
        }
        run(store, subject, &mirror.create, true).await?;
        let rows = run(store, subject, &mirror.backfill, true).await?;

        tracing::info!(mirror = subject, rows, "Mirror backfilled");
        report.mirrors.push(CommittedMirror {
            mirror: mirror.mirror.clone(),
            mirror_table: mirror.mirror_table.clone(),
            rows_backfilled: rows,
        });
    }

    for trigger in &plan.triggers {
        run(store, &trigger.name, &trigger.drop, false).await?;
        run(store, &trigger.name, &trigger.create, true).await?;
        report.triggers.push(trigger.name.clone());
    }

    tracing::info!(
        mirrors = report.mirrors.len(),
        triggers = report.triggers.len(),
        "Mirrors committed"
    );
    Ok(report)
}

async fn run<S>(
    store: &mut S,
    subject: &str,
    sql: &str,
    check_warnings: bool,
) -> Result<u64, SynthesisError>
where
    S: MirrorStore + ?Sized,
{
    tracing::debug!(subject, sql, "Executing statement");

    let rows = store
        .execute(sql)
        .await
        .map_err(|err| SynthesisError::failure(subject, format!("{err:#}")))?;

    if check_warnings {
        let warnings: Vec<_> = store
            .warnings()
            .await
            .map_err(SynthesisError::Store)?
            .into_iter()
            .filter(|w| w.level != WarningLevel::Note)
            .collect();

        if !warnings.is_empty() {
            for warning in &warnings {
                tracing::warn!(
                    subject,
                    level = ?warning.level,
                    code = warning.code,
                    message = %warning.message,
                    "Store warning"
                );
            }
            let reason = warnings
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SynthesisError::failure(subject, reason));
        }
    }

    Ok(rows)
}
