//! CLI command implementations.

pub mod check;
pub mod commit;
pub mod parse;
pub mod plan;
pub mod rewrite;

use std::path::Path;

use anyhow::{Context, Result};
use metamirror_core::{CommittedRegistry, MetamirrorConfig, SetupWindow};

pub fn load_config(path: &Path) -> Result<MetamirrorConfig> {
    MetamirrorConfig::from_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

/// Register the declared mirrors, then close setup.
pub fn load_registry(config: &MetamirrorConfig) -> Result<CommittedRegistry> {
    let window = SetupWindow::open();
    let builder = config
        .registry_builder(window.clone())
        .context("invalid mirror declaration")?;
    window.close();
    Ok(builder.finalize())
}
