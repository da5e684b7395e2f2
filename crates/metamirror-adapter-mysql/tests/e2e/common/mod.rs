//! Shared fixtures for the end-to-end scenarios.

use metamirror_adapter_mysql::MySqlStore;
use metamirror_core::{CommittedRegistry, MetaTableCatalog, MirrorRegistryBuilder, SetupWindow};
use metamirror_runtime::MirrorStore;
use sqlx::MySqlPool;

pub const DATABASE_URL_ENV: &str = "METAMIRROR_TEST_DATABASE_URL";

pub fn database_url() -> Option<String> {
    std::env::var(DATABASE_URL_ENV).ok().filter(|url| !url.is_empty())
}

/// The WordPress `postmeta` layout.
const SOURCE_SCHEMA: &str = "CREATE TABLE wp_postmeta (
    meta_id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT,
    post_id BIGINT UNSIGNED NOT NULL DEFAULT 0,
    meta_key VARCHAR(255) DEFAULT NULL,
    meta_value LONGTEXT,
    PRIMARY KEY (meta_id),
    KEY post_id (post_id),
    KEY meta_key (meta_key(191))
)";

/// Drop and recreate the source table. Dropping it also drops its triggers.
pub async fn reset_source(store: &mut MySqlStore) {
    store
        .execute("DROP TABLE IF EXISTS wp_postmeta")
        .await
        .expect("drop wp_postmeta");
    store
        .execute(SOURCE_SCHEMA)
        .await
        .expect("create wp_postmeta");
}

/// Register mirrors on the default WordPress catalog and close the window.
pub fn registry(setup: impl FnOnce(&mut MirrorRegistryBuilder)) -> CommittedRegistry {
    let window = SetupWindow::open();
    let mut builder = MirrorRegistryBuilder::new(MetaTableCatalog::default(), window.clone());
    setup(&mut builder);
    window.close();
    builder.finalize()
}

pub async fn insert_meta(pool: &MySqlPool, post_id: u64, key: &str, value: &str) -> u64 {
    sqlx::query("INSERT INTO wp_postmeta (post_id, meta_key, meta_value) VALUES (?, ?, ?)")
        .bind(post_id)
        .bind(key)
        .bind(value)
        .execute(pool)
        .await
        .expect("insert meta row")
        .last_insert_id()
}

/// Values stored in `table` under `key`, as text.
pub async fn values(pool: &MySqlPool, table: &str, key: &str) -> Vec<String> {
    let sql = format!(
        "SELECT CAST(meta_value AS CHAR) FROM `{table}` WHERE meta_key = ? ORDER BY meta_id"
    );
    sqlx::query_scalar::<_, String>(&sql)
        .bind(key)
        .fetch_all(pool)
        .await
        .expect("read mirror values")
}

pub async fn row_count(pool: &MySqlPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM `{table}`"))
        .fetch_one(pool)
        .await
        .expect("count rows")
}
