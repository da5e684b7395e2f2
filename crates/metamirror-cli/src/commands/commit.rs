//! `metamirror commit`: materialize every declared mirror in the store.

use anyhow::{Context, Result};
use metamirror_adapter_mysql::MySqlStore;
use metamirror_core::MetamirrorConfig;

use super::load_registry;

pub async fn run(config: &MetamirrorConfig) -> Result<()> {
    let registry = load_registry(config)?;

    let mut store = MySqlStore::from_config(&config.database)
        .await
        .with_context(|| {
            format!(
                "failed to connect to {}:{}/{}",
                config.database.host, config.database.port, config.database.database
            )
        })?;

    let report = metamirror_runtime::commit(&registry, &mut store).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
