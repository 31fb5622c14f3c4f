//! Reusable contract checks for [`SemaphoreAdapter`] implementations.

use std::time::Duration;

use crate::adapter::SemaphoreAdapter;

/// Exercises the full adapter contract. Panics on the first violation.
pub async fn semaphore_adapter_contract<A: SemaphoreAdapter + ?Sized>(adapter: &A) {
    limit_caps_live_slots(adapter).await;
    release_frees_a_slot(adapter).await;
    expired_slots_do_not_count(adapter).await;
    refresh_extends_live_slots_only(adapter).await;
    force_release_all_clears_everything(adapter).await;
}

async fn limit_caps_live_slots<A: SemaphoreAdapter + ?Sized>(adapter: &A) {
    assert!(adapter.acquire("contract/cap", "s1", 2, None).await.unwrap());
    assert!(adapter.acquire("contract/cap", "s2", 2, None).await.unwrap());
    assert!(
        !adapter.acquire("contract/cap", "s3", 2, None).await.unwrap(),
        "a third slot must not fit a limit of two"
    );
    assert_eq!(adapter.acquired_count("contract/cap").await.unwrap(), 2);
}

async fn release_frees_a_slot<A: SemaphoreAdapter + ?Sized>(adapter: &A) {
    assert!(adapter.acquire("contract/rel", "s1", 1, None).await.unwrap());
    assert!(
        !adapter.release("contract/rel", "other").await.unwrap(),
        "releasing an unknown slot must report false"
    );
    assert!(adapter.release("contract/rel", "s1").await.unwrap());
    assert_eq!(adapter.acquired_count("contract/rel").await.unwrap(), 0);
    assert!(adapter.acquire("contract/rel", "s2", 1, None).await.unwrap());
}

async fn expired_slots_do_not_count<A: SemaphoreAdapter + ?Sized>(adapter: &A) {
    assert!(adapter
        .acquire("contract/ttl", "s1", 1, Some(Duration::from_millis(20)))
        .await
        .unwrap());
    assert!(!adapter.acquire("contract/ttl", "s2", 1, None).await.unwrap());

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(
        adapter.acquired_count("contract/ttl").await.unwrap(),
        0,
        "expired slots must not count as acquired"
    );
    assert!(
        adapter.acquire("contract/ttl", "s2", 1, None).await.unwrap(),
        "an expired slot must free capacity"
    );
}

async fn refresh_extends_live_slots_only<A: SemaphoreAdapter + ?Sized>(adapter: &A) {
    assert!(adapter
        .acquire("contract/refresh", "s1", 1, Some(Duration::from_millis(40)))
        .await
        .unwrap());
    assert!(adapter
        .refresh("contract/refresh", "s1", Duration::from_secs(60))
        .await
        .unwrap());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(
        adapter.acquired_count("contract/refresh").await.unwrap(),
        1,
        "a refreshed slot must outlive its original ttl"
    );

    assert!(adapter
        .acquire("contract/refresh-exp", "s1", 1, Some(Duration::from_millis(20)))
        .await
        .unwrap());
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(
        !adapter
            .refresh("contract/refresh-exp", "s1", Duration::from_secs(60))
            .await
            .unwrap(),
        "an expired slot must not be refreshable"
    );
}

async fn force_release_all_clears_everything<A: SemaphoreAdapter + ?Sized>(adapter: &A) {
    assert!(adapter.acquire("contract/force", "s1", 2, None).await.unwrap());
    assert!(adapter.acquire("contract/force", "s2", 2, None).await.unwrap());
    assert!(adapter.force_release_all("contract/force").await.unwrap());
    assert_eq!(adapter.acquired_count("contract/force").await.unwrap(), 0);
    assert!(
        !adapter.force_release_all("contract/force").await.unwrap(),
        "force releasing an empty semaphore must report false"
    );
}
