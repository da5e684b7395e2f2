//! `metamirror check`: validate the configuration and list its mirrors.

use anyhow::Result;
use metamirror_core::{CommittedRegistry, MetamirrorConfig};

use super::load_registry;

pub fn run(config: &MetamirrorConfig) -> Result<()> {
    let registry = load_registry(config)?;

    if registry.is_empty() {
        println!("No mirrors declared.");
        return Ok(());
    }

    println!("{} mirror(s):", registry.len());
    for line in describe(&registry) {
        println!("  {line}");
    }
    Ok(())
}

/// One line per mirror: table, source, column type and key filter.
pub fn describe(registry: &CommittedRegistry) -> Vec<String> {
    registry
        .iter()
        .map(|mirror| {
            let keys = if mirror.is_unfiltered() {
                "all keys".to_string()
            } else {
                mirror.whitelist().join(", ")
            };
            format!(
                "{} <- {} as {} ({})",
                mirror.mirror_table(),
                mirror.source_table(),
                mirror.value_column_type(),
                keys
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::sample_config;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_describe_lists_mirrors() {
        let registry = load_registry(&sample_config()).unwrap();
        assert_eq!(
            describe(&registry),
            vec![
                "wp_postmeta_mm_varchar_16 <- wp_postmeta as VARCHAR(16) (hello)",
                "wp_postmeta_mm_integer <- wp_postmeta as INTEGER (bye)",
            ]
        );
    }
}
