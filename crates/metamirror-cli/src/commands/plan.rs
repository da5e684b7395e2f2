//! `metamirror plan`: print the statements a commit would run.

use std::fmt::Write;

use anyhow::{Context, Result};
use metamirror_core::MetamirrorConfig;
use metamirror_runtime::{CommitPlan, Synthesizer};

use super::load_registry;

pub fn run(config: &MetamirrorConfig, json: bool) -> Result<()> {
    let registry = load_registry(config)?;
    let plan = Synthesizer::plan(&registry).context("failed to plan mirrors")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render_script(&plan));
    }
    Ok(())
}

/// Render the plan as a script the `mysql` client accepts. Trigger bodies
/// contain `;`, so triggers are wrapped in a `DELIMITER` switch.
pub fn render_script(plan: &CommitPlan) -> String {
    let mut out = String::new();

    for mirror in &plan.mirrors {
        let _ = writeln!(out, "-- mirror {}", mirror.mirror);
        for drop in &mirror.drops {
            let _ = writeln!(out, "{drop};");
        }
        let _ = writeln!(out, "{};", mirror.create);
        let _ = writeln!(out, "{};", mirror.backfill);
        out.push('\n');
    }

    for trigger in &plan.triggers {
        let _ = writeln!(out, "-- trigger {}", trigger.name);
        let _ = writeln!(out, "{};", trigger.drop);
        out.push_str("DELIMITER //\n");
        let _ = writeln!(out, "{} //", trigger.create);
        out.push_str("DELIMITER ;\n\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::sample_config;

    #[test]
    fn test_script_contains_every_statement() {
        let registry = load_registry(&sample_config()).unwrap();
        let plan = Synthesizer::plan(&registry).unwrap();
        let script = render_script(&plan);

        for statement in plan.statements() {
            assert!(script.contains(statement), "missing: {statement}");
        }
        assert_eq!(script.matches("DELIMITER //").count(), 3);
        assert!(script.starts_with("-- mirror wp_postmeta_mm_varchar_16\n"));
    }

    #[test]
    fn test_empty_plan_renders_nothing() {
        assert_eq!(render_script(&CommitPlan::default()), "");
    }
}
