//! # metamirror-sql
//!
//! Query-side half of metamirror: a deliberately narrow SQL parser and the
//! rewriter that sends reads on metadata tables to their typed mirrors.
//!
//! ## How It Works
//!
//! **Before (from the host):**
//! ```sql
//! SELECT post_id FROM wp_postmeta WHERE meta_key = 'price' AND meta_value > 10
//! ```
//!
//! **After (to the store):**
//! ```sql
//! SELECT post_id FROM wp_postmeta_mm_integer WHERE meta_key = 'price' AND meta_value > 10
//! ```
//!
//! A read is only rewritten when:
//!
//! - the parser accounted for every token (`fully_parsed`),
//! - exactly one mirror of each routed table is known to hold every row the
//!   query can select,
//! - the routed table is not named anywhere else in the query.
//!
//! Anything else goes out unchanged. UPDATE and DELETE are never rewritten.
//!
//! ```
//! use metamirror_core::{MetaTableCatalog, MirrorRegistryBuilder, SetupWindow};
//! use metamirror_sql::{QueryFilter, QueryRewriter};
//!
//! let mut builder = MirrorRegistryBuilder::new(MetaTableCatalog::default(), SetupWindow::open());
//! let id = builder.register("wp_postmeta", "INTEGER", [""; 0]).unwrap();
//! builder.add_key(&id, "price").unwrap();
//!
//! let rewriter = QueryRewriter::new(&builder.finalize());
//! assert_eq!(
//!     rewriter.rewrite("SELECT * FROM wp_postmeta WHERE meta_key = 'price'"),
//!     "SELECT * FROM wp_postmeta_mm_integer WHERE meta_key = 'price'",
//! );
//! ```

pub mod error;
pub mod lexer;
pub mod like;
pub mod literal;
pub mod marker;
pub mod parser;
pub mod rewriter;

pub use error::SqlError;
pub use literal::{Deflated, LiteralMap, deflate, inflate};
pub use parser::{
    ColumnRef, Condition, Join, JoinKind, Operand, Operation, Operator, ParsedQuery, TableRef,
    WhereColumn, parse,
};
pub use rewriter::{QueryFilter, QueryRewriter, RewriteResult, SkipReason, TableRoute};
