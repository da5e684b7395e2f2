use metamirror_adapter_mysql::MySqlStore;
use metamirror_runtime::{SynthesisError, commit};
use metamirror_sql::QueryRewriter;
use pretty_assertions::assert_eq;

use crate::common::{insert_meta, registry, reset_source, row_count, values};

const TEXT_MIRROR: &str = "wp_postmeta_mm_varchar_16";
const NUMBER_MIRROR: &str = "wp_postmeta_mm_integer";

pub async fn unfiltered_mirror_tracks_writes(store: &mut MySqlStore) {
    reset_source(store).await;
    let pool = store.pool().clone();
    insert_meta(&pool, 1, "test1", "1").await;

    let registry = registry(|b| {
        b.register("wp_postmeta", "VARCHAR", ["16"]).unwrap();
    });
    let report = commit(&registry, store).await.expect("commit");
    assert_eq!(report.mirrors[0].rows_backfilled, 1);
    assert_eq!(values(&pool, TEXT_MIRROR, "test1").await, vec!["1"]);

    insert_meta(&pool, 1, "test2", "2").await;
    assert_eq!(values(&pool, TEXT_MIRROR, "test2").await, vec!["2"]);

    sqlx::query("UPDATE wp_postmeta SET meta_value = '3' WHERE meta_key = 'test2'")
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(values(&pool, TEXT_MIRROR, "test2").await, vec!["3"]);
}

pub async fn oversized_value_fails_commit(store: &mut MySqlStore) {
    reset_source(store).await;
    let pool = store.pool().clone();
    insert_meta(&pool, 1, "long", "this value is far longer than sixteen").await;

    let registry = registry(|b| {
        b.register("wp_postmeta", "VARCHAR", ["16"]).unwrap();
    });
    match commit(&registry, store).await {
        Err(SynthesisError::SynthesisFailure { mirror, .. }) => assert_eq!(mirror, TEXT_MIRROR),
        other => panic!("expected a synthesis failure, got {other:?}"),
    }
}

pub async fn whitelisted_mirrors_split_keys(store: &mut MySqlStore) {
    reset_source(store).await;
    let pool = store.pool().clone();

    let registry = registry(|b| {
        let text = b.register("wp_postmeta", "VARCHAR", ["16"]).unwrap();
        b.add_key(&text, "hello").unwrap();
        let number = b.register("wp_postmeta", "INTEGER", [""; 0]).unwrap();
        b.add_key(&number, "bye").unwrap();
    });
    commit(&registry, store).await.expect("commit");

    let hello = insert_meta(&pool, 7, "hello", "hi").await;
    insert_meta(&pool, 7, "bye", "42").await;

    assert_eq!(values(&pool, TEXT_MIRROR, "hello").await, vec!["hi"]);
    assert_eq!(values(&pool, TEXT_MIRROR, "bye").await, Vec::<String>::new());
    assert_eq!(values(&pool, NUMBER_MIRROR, "bye").await, vec!["42"]);
    assert_eq!(values(&pool, NUMBER_MIRROR, "hello").await, Vec::<String>::new());

    sqlx::query("DELETE FROM wp_postmeta WHERE meta_id = ?")
        .bind(hello)
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(row_count(&pool, TEXT_MIRROR).await, 0);
    assert_eq!(row_count(&pool, NUMBER_MIRROR).await, 1);
}

/// Runs after `whitelisted_mirrors_split_keys` and reuses its mirrors.
pub async fn rewritten_read_hits_mirror(store: &mut MySqlStore) {
    let pool = store.pool().clone();
    let registry = registry(|b| {
        let text = b.register("wp_postmeta", "VARCHAR", ["16"]).unwrap();
        b.add_key(&text, "hello").unwrap();
        let number = b.register("wp_postmeta", "INTEGER", [""; 0]).unwrap();
        b.add_key(&number, "bye").unwrap();
    });
    let rewriter = QueryRewriter::new(&registry);

    let query = rewriter.rewrite("SELECT meta_value FROM wp_postmeta WHERE meta_key = 'bye'");
    assert_eq!(
        query,
        "SELECT meta_value FROM wp_postmeta_mm_integer WHERE meta_key = 'bye'"
    );

    let value: i32 = sqlx::query_scalar(&query).fetch_one(&pool).await.unwrap();
    assert_eq!(value, 42);
}

pub async fn commit_is_repeatable(store: &mut MySqlStore) {
    reset_source(store).await;
    let pool = store.pool().clone();
    insert_meta(&pool, 3, "bye", "5").await;

    let registry = registry(|b| {
        let number = b.register("wp_postmeta", "INTEGER", [""; 0]).unwrap();
        b.add_key(&number, "bye").unwrap();
    });
    commit(&registry, store).await.expect("first commit");
    commit(&registry, store).await.expect("second commit");

    assert_eq!(row_count(&pool, NUMBER_MIRROR).await, 1);
    insert_meta(&pool, 4, "bye", "6").await;
    assert_eq!(row_count(&pool, NUMBER_MIRROR).await, 2);

    // A key cleared to NULL leaves every whitelisted mirror.
    sqlx::query("UPDATE wp_postmeta SET meta_key = NULL WHERE post_id = 4")
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(row_count(&pool, NUMBER_MIRROR).await, 1);
}
