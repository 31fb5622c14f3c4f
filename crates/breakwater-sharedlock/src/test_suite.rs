//! Reusable contract checks for [`SharedLockAdapter`] implementations.

use std::time::Duration;

use crate::adapter::SharedLockAdapter;

/// Exercises the full adapter contract. Panics on the first violation.
pub async fn shared_lock_adapter_contract<A: SharedLockAdapter + ?Sized>(adapter: &A) {
    writer_excludes_writer(adapter).await;
    writer_excludes_readers(adapter).await;
    readers_share_up_to_the_limit(adapter).await;
    expiry_frees_both_sides(adapter).await;
    refresh_extends_live_leases(adapter).await;
    force_release_clears_the_key(adapter).await;
}

async fn writer_excludes_writer<A: SharedLockAdapter + ?Sized>(adapter: &A) {
    assert!(adapter.acquire_writer("contract/ww", "a", None).await.unwrap());
    assert!(!adapter.acquire_writer("contract/ww", "b", None).await.unwrap());
    assert!(!adapter.release_writer("contract/ww", "b").await.unwrap());
    assert!(adapter.release_writer("contract/ww", "a").await.unwrap());
    assert!(adapter.acquire_writer("contract/ww", "b", None).await.unwrap());
    assert!(adapter.release_writer("contract/ww", "b").await.unwrap());
}

async fn writer_excludes_readers<A: SharedLockAdapter + ?Sized>(adapter: &A) {
    assert!(adapter.acquire_writer("contract/wr", "w", None).await.unwrap());
    assert!(
        !adapter
            .acquire_reader("contract/wr", "r1", 4, None)
            .await
            .unwrap(),
        "readers must be refused while a writer holds the key"
    );
    assert!(adapter.release_writer("contract/wr", "w").await.unwrap());

    assert!(adapter
        .acquire_reader("contract/wr", "r1", 4, None)
        .await
        .unwrap());
    assert!(
        !adapter.acquire_writer("contract/wr", "w", None).await.unwrap(),
        "a writer must be refused while readers hold the key"
    );
    assert!(adapter.release_reader("contract/wr", "r1").await.unwrap());
}

async fn readers_share_up_to_the_limit<A: SharedLockAdapter + ?Sized>(adapter: &A) {
    assert!(adapter
        .acquire_reader("contract/rl", "r1", 2, None)
        .await
        .unwrap());
    assert!(adapter
        .acquire_reader("contract/rl", "r2", 2, None)
        .await
        .unwrap());
    assert!(
        !adapter
            .acquire_reader("contract/rl", "r3", 2, None)
            .await
            .unwrap(),
        "a third reader must not fit a limit of two"
    );
    assert_eq!(adapter.reader_count("contract/rl").await.unwrap(), 2);

    assert!(adapter.release_reader("contract/rl", "r1").await.unwrap());
    assert!(adapter.release_reader("contract/rl", "r2").await.unwrap());
}

async fn expiry_frees_both_sides<A: SharedLockAdapter + ?Sized>(adapter: &A) {
    assert!(adapter
        .acquire_writer("contract/exp", "w", Some(Duration::from_millis(20)))
        .await
        .unwrap());
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(
        adapter
            .acquire_reader("contract/exp", "r1", 2, Some(Duration::from_millis(20)))
            .await
            .unwrap(),
        "an expired writer must not block readers"
    );
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(adapter.reader_count("contract/exp").await.unwrap(), 0);
    assert!(
        adapter.acquire_writer("contract/exp", "w2", None).await.unwrap(),
        "expired readers must not block a writer"
    );
    assert!(adapter.release_writer("contract/exp", "w2").await.unwrap());
}

async fn refresh_extends_live_leases<A: SharedLockAdapter + ?Sized>(adapter: &A) {
    assert!(adapter
        .acquire_writer("contract/ref", "w", Some(Duration::from_millis(40)))
        .await
        .unwrap());
    assert!(adapter
        .refresh_writer("contract/ref", "w", Duration::from_secs(60))
        .await
        .unwrap());
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(
        adapter.writer_of("contract/ref").await.unwrap().is_some(),
        "a refreshed writer must outlive its original ttl"
    );
    assert!(adapter.release_writer("contract/ref", "w").await.unwrap());

    assert!(adapter
        .acquire_reader("contract/ref", "r1", 2, Some(Duration::from_millis(40)))
        .await
        .unwrap());
    assert!(adapter
        .refresh_reader("contract/ref", "r1", Duration::from_secs(60))
        .await
        .unwrap());
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(adapter.reader_count("contract/ref").await.unwrap(), 1);
    assert!(adapter.release_reader("contract/ref", "r1").await.unwrap());
}

async fn force_release_clears_the_key<A: SharedLockAdapter + ?Sized>(adapter: &A) {
    assert!(adapter
        .acquire_reader("contract/force", "r1", 4, None)
        .await
        .unwrap());
    assert!(adapter.force_release("contract/force").await.unwrap());
    assert_eq!(adapter.reader_count("contract/force").await.unwrap(), 0);
    assert!(
        !adapter.force_release("contract/force").await.unwrap(),
        "force releasing an empty key must report false"
    );
    assert!(adapter
        .acquire_writer("contract/force", "w", None)
        .await
        .unwrap());
    assert!(adapter.release_writer("contract/force", "w").await.unwrap());
}
