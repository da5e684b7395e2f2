//! MySQL/MariaDB implementation of [`MirrorStore`].
//!
//! Statements are sent over the text protocol (`sqlx::raw_sql`) because
//! trigger bodies are not accepted as prepared statements by every server
//! version. Store diagnostics are per session, so the store holds on to a
//! single pooled connection for its whole lifetime.

use async_trait::async_trait;
use metamirror_core::DatabaseConfig;
use metamirror_runtime::{MirrorStore, StoreWarning, WarningLevel};
use sqlx::mysql::{MySql, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{Executor, Row};

#[derive(Debug, Clone, Copy)]
pub struct MySqlStoreOptions {
    pub max_connections: u32,
}

impl Default for MySqlStoreOptions {
    fn default() -> Self {
        Self { max_connections: 2 }
    }
}

pub struct MySqlStore {
    pool: MySqlPool,
    conn: PoolConnection<MySql>,
}

impl MySqlStore {
    pub async fn new(database_url: &str, options: MySqlStoreOptions) -> anyhow::Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(options.max_connections.max(1))
            .connect(database_url)
            .await?;
        let conn = pool.acquire().await?;
        tracing::debug!(max_connections = options.max_connections, "Connected to MySQL");
        Ok(Self { pool, conn })
    }

    pub async fn from_config(config: &DatabaseConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.connection_string(),
            MySqlStoreOptions {
                max_connections: config.max_connections,
            },
        )
        .await
    }

    /// The underlying pool, for reads outside the commit session.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl MirrorStore for MySqlStore {
    async fn execute(&mut self, sql: &str) -> anyhow::Result<u64> {
        let result = (&mut *self.conn).execute(sqlx::raw_sql(sql)).await?;
        Ok(result.rows_affected())
    }

    async fn warnings(&mut self) -> anyhow::Result<Vec<StoreWarning>> {
        let rows = (&mut *self.conn)
            .fetch_all(sqlx::raw_sql("SHOW WARNINGS"))
            .await?;
        rows.iter().map(warning_from_row).collect()
    }
}

fn warning_from_row(row: &MySqlRow) -> anyhow::Result<StoreWarning> {
    let level: String = row.try_get("Level")?;
    let code: u32 = row.try_get("Code")?;
    let message: String = row.try_get("Message")?;
    Ok(StoreWarning {
        level: WarningLevel::from_label(&level),
        code,
        message,
    })
}
