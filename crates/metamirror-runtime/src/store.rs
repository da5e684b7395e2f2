use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningLevel {
    Note,
    Warning,
    Error,
}

impl WarningLevel {
    /// Parse the level column of a diagnostics listing. Unknown levels are
    /// treated as warnings.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("note") {
            WarningLevel::Note
        } else if label.eq_ignore_ascii_case("error") {
            WarningLevel::Error
        } else {
            WarningLevel::Warning
        }
    }
}

/// A diagnostic the store attached to the last statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreWarning {
    pub level: WarningLevel,
    pub code: u32,
    pub message: String,
}

impl fmt::Display for StoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}: {}", self.level, self.code, self.message)
    }
}

/// The backing store mirrors are synthesized into.
///
/// Statements run in order on one session: `warnings` must describe the
/// statement passed to the preceding `execute`.
#[async_trait]
pub trait MirrorStore: Send {
    /// Run one statement, returning the number of affected rows.
    async fn execute(&mut self, sql: &str) -> anyhow::Result<u64>;

    /// Diagnostics raised by the last executed statement.
    async fn warnings(&mut self) -> anyhow::Result<Vec<StoreWarning>>;
}
