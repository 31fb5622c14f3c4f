//! Reusable contract checks for [`CacheAdapter`] implementations.

use std::time::Duration;

use serde_json::Value;

use crate::adapter::CacheAdapter;

/// Exercises the full adapter contract. Panics on the first violation.
pub async fn cache_adapter_contract<A: CacheAdapter + ?Sized>(adapter: &A) {
    add_is_write_if_absent(adapter).await;
    put_reports_replacement(adapter).await;
    update_touches_live_entries_only(adapter).await;
    increment_requires_numbers(adapter).await;
    ttl_hides_expired_entries(adapter).await;
    remove_many_reports_live_removals(adapter).await;
    prefix_removal_is_scoped(adapter).await;
}

async fn add_is_write_if_absent<A: CacheAdapter + ?Sized>(adapter: &A) {
    assert!(adapter
        .add("contract/add", Value::from(1), None)
        .await
        .unwrap());
    assert!(
        !adapter
            .add("contract/add", Value::from(2), None)
            .await
            .unwrap(),
        "add must not overwrite a live entry"
    );
    assert_eq!(
        adapter.get("contract/add").await.unwrap(),
        Some(Value::from(1))
    );
}

async fn put_reports_replacement<A: CacheAdapter + ?Sized>(adapter: &A) {
    assert!(
        !adapter
            .put("contract/put", Value::from("a"), None)
            .await
            .unwrap(),
        "a fresh put must report no replacement"
    );
    assert!(adapter
        .put("contract/put", Value::from("b"), None)
        .await
        .unwrap());
    assert_eq!(
        adapter.get("contract/put").await.unwrap(),
        Some(Value::from("b"))
    );
}

async fn update_touches_live_entries_only<A: CacheAdapter + ?Sized>(adapter: &A) {
    assert!(
        !adapter
            .update("contract/update", Value::from(1))
            .await
            .unwrap(),
        "update must not create entries"
    );
    adapter
        .put("contract/update", Value::from(1), None)
        .await
        .unwrap();
    assert!(adapter
        .update("contract/update", Value::from(2))
        .await
        .unwrap());
    assert_eq!(
        adapter.get("contract/update").await.unwrap(),
        Some(Value::from(2))
    );
}

async fn increment_requires_numbers<A: CacheAdapter + ?Sized>(adapter: &A) {
    adapter
        .put("contract/incr", Value::from(10), None)
        .await
        .unwrap();
    assert!(adapter.increment("contract/incr", 5).await.unwrap());
    assert_eq!(
        adapter.get("contract/incr").await.unwrap(),
        Some(Value::from(15))
    );
    assert!(
        !adapter.increment("contract/incr-absent", 1).await.unwrap(),
        "incrementing an absent key must report false"
    );

    adapter
        .put("contract/incr-str", Value::from("text"), None)
        .await
        .unwrap();
    assert!(
        adapter
            .increment("contract/incr-str", 1)
            .await
            .unwrap_err()
            .is_type_error(),
        "incrementing a non-numeric entry must fail with the typed error"
    );
}

async fn ttl_hides_expired_entries<A: CacheAdapter + ?Sized>(adapter: &A) {
    adapter
        .put(
            "contract/ttl",
            Value::from("v"),
            Some(Duration::from_millis(20)),
        )
        .await
        .unwrap();
    assert!(adapter.get("contract/ttl").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(adapter.get("contract/ttl").await.unwrap(), None);
    assert!(
        adapter
            .add("contract/ttl", Value::from("fresh"), None)
            .await
            .unwrap(),
        "an expired entry must be addable again"
    );
}

async fn remove_many_reports_live_removals<A: CacheAdapter + ?Sized>(adapter: &A) {
    adapter
        .put("contract/rm-1", Value::from(1), None)
        .await
        .unwrap();
    assert!(adapter
        .remove_many(&["contract/rm-1".to_string(), "contract/rm-absent".to_string()])
        .await
        .unwrap());
    assert_eq!(adapter.get("contract/rm-1").await.unwrap(), None);
    assert!(
        !adapter
            .remove_many(&["contract/rm-absent".to_string()])
            .await
            .unwrap(),
        "removing only absent keys must report false"
    );
}

async fn prefix_removal_is_scoped<A: CacheAdapter + ?Sized>(adapter: &A) {
    adapter
        .put("contract/prefix/a", Value::from(1), None)
        .await
        .unwrap();
    adapter
        .put("contract/prefix/b", Value::from(2), None)
        .await
        .unwrap();
    adapter
        .put("contract/other", Value::from(3), None)
        .await
        .unwrap();

    adapter.remove_by_key_prefix("contract/prefix/").await.unwrap();
    assert_eq!(adapter.get("contract/prefix/a").await.unwrap(), None);
    assert_eq!(adapter.get("contract/prefix/b").await.unwrap(), None);
    assert_eq!(
        adapter.get("contract/other").await.unwrap(),
        Some(Value::from(3))
    );
}
