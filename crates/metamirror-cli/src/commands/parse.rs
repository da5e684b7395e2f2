//! `metamirror parse`: show the parser's view of a query.

use anyhow::{Context, Result};

pub fn run(query: &str) -> Result<()> {
    let parsed = metamirror_sql::parse(query).context("query not supported")?;
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}
