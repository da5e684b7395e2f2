//! `metamirror rewrite`: apply the query rewriter to one query.

use anyhow::Result;
use metamirror_core::MetamirrorConfig;
use metamirror_sql::QueryRewriter;

use super::load_registry;

pub fn run(config: &MetamirrorConfig, query: &str, explain: bool) -> Result<()> {
    let rewriter = QueryRewriter::new(&load_registry(config)?);
    println!("{}", render(&rewriter, query, explain)?);
    Ok(())
}

pub fn render(rewriter: &QueryRewriter, query: &str, explain: bool) -> Result<String> {
    if explain {
        Ok(serde_json::to_string_pretty(&rewriter.explain(query))?)
    } else {
        Ok(rewriter.rewrite(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::sample_config;
    use pretty_assertions::assert_eq;

    fn rewriter() -> QueryRewriter {
        QueryRewriter::new(&load_registry(&sample_config()).unwrap())
    }

    #[test]
    fn test_render_rewritten_query() {
        let out = render(
            &rewriter(),
            "SELECT post_id FROM wp_postmeta WHERE meta_key = 'hello'",
            false,
        )
        .unwrap();
        assert_eq!(
            out,
            "SELECT post_id FROM wp_postmeta_mm_varchar_16 WHERE meta_key = 'hello'"
        );
    }

    #[test]
    fn test_explain_reports_skip_reason() {
        let out = render(&rewriter(), "DELETE FROM wp_postmeta WHERE meta_key = 'hello'", true)
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["skipped"], "not_a_read");
        assert_eq!(json["rewritten"], json["original"]);
    }
}
