//! # metamirror-runtime
//!
//! Materializes a [`CommittedRegistry`](metamirror_core::CommittedRegistry)
//! in a store: one typed table per mirror, backfilled from its source, and
//! one trigger per source table and write event keeping the mirrors in step.
//!
//! Store access goes through the [`MirrorStore`] trait; the MySQL
//! implementation lives in `metamirror-adapter-mysql`.

pub mod commit;
pub mod error;
pub mod store;
pub mod synth;

pub use commit::{CommitReport, CommittedMirror, commit, commit_plan};
pub use error::SynthesisError;
pub use store::{MirrorStore, StoreWarning, WarningLevel};
pub use synth::{
    CommitPlan, MirrorPlan, Synthesizer, TriggerEvent, TriggerPlan, quote_ident, quote_string,
    trigger_name,
};
