//! Reusable contract checks for [`LockAdapter`] implementations.
//!
//! Run these against any adapter to verify it honours the acquire/release/
//! refresh semantics the providers rely on. Keys are prefixed per check so
//! one adapter instance can host the whole battery.

use std::time::Duration;

use crate::adapter::LockAdapter;

/// Exercises the full adapter contract. Panics on the first violation.
pub async fn lock_adapter_contract<A: LockAdapter + ?Sized>(adapter: &A) {
    acquire_is_exclusive(adapter).await;
    release_requires_ownership(adapter).await;
    expired_leases_are_acquirable(adapter).await;
    refresh_extends_live_leases_only(adapter).await;
    force_release_ignores_ownership(adapter).await;
}

async fn acquire_is_exclusive<A: LockAdapter + ?Sized>(adapter: &A) {
    assert!(
        adapter.acquire("contract/excl", "a", None).await.unwrap(),
        "first acquire must succeed"
    );
    assert!(
        !adapter.acquire("contract/excl", "b", None).await.unwrap(),
        "second owner must not acquire a held key"
    );
    assert!(
        !adapter.acquire("contract/excl", "a", None).await.unwrap(),
        "re-acquire by the holder must also report unavailable"
    );
}

async fn release_requires_ownership<A: LockAdapter + ?Sized>(adapter: &A) {
    assert!(adapter.acquire("contract/rel", "a", None).await.unwrap());
    assert!(
        !adapter.release("contract/rel", "b").await.unwrap(),
        "non-owner release must be refused"
    );
    assert!(
        adapter.release("contract/rel", "a").await.unwrap(),
        "owner release must succeed"
    );
    assert!(
        !adapter.release("contract/rel", "a").await.unwrap(),
        "releasing a released key must report false"
    );
    assert!(
        adapter.acquire("contract/rel", "b", None).await.unwrap(),
        "released key must be acquirable"
    );
}

async fn expired_leases_are_acquirable<A: LockAdapter + ?Sized>(adapter: &A) {
    assert!(adapter
        .acquire("contract/ttl", "a", Some(Duration::from_millis(20)))
        .await
        .unwrap());
    assert!(!adapter.acquire("contract/ttl", "b", None).await.unwrap());

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(
        !adapter.release("contract/ttl", "a").await.unwrap(),
        "an expired lease must not be releasable"
    );
    assert!(
        adapter.acquire("contract/ttl", "b", None).await.unwrap(),
        "an expired lease must be acquirable by another owner"
    );
}

async fn refresh_extends_live_leases_only<A: LockAdapter + ?Sized>(adapter: &A) {
    assert!(adapter
        .acquire("contract/refresh", "a", Some(Duration::from_millis(40)))
        .await
        .unwrap());
    assert!(
        !adapter
            .refresh("contract/refresh", "b", Duration::from_secs(60))
            .await
            .unwrap(),
        "non-owner refresh must be refused"
    );
    assert!(adapter
        .refresh("contract/refresh", "a", Duration::from_secs(60))
        .await
        .unwrap());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(
        !adapter.acquire("contract/refresh", "b", None).await.unwrap(),
        "a refreshed lease must outlive its original ttl"
    );

    assert!(adapter
        .acquire("contract/refresh-exp", "a", Some(Duration::from_millis(20)))
        .await
        .unwrap());
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(
        !adapter
            .refresh("contract/refresh-exp", "a", Duration::from_secs(60))
            .await
            .unwrap(),
        "an expired lease must not be refreshable"
    );
}

async fn force_release_ignores_ownership<A: LockAdapter + ?Sized>(adapter: &A) {
    assert!(adapter.acquire("contract/force", "a", None).await.unwrap());
    assert!(adapter.force_release("contract/force").await.unwrap());
    assert!(
        !adapter.force_release("contract/force").await.unwrap(),
        "force releasing an empty key must report false"
    );
    assert!(adapter.acquire("contract/force", "b", None).await.unwrap());
}
