//! Property tests for the cache contract.
//!
//! Invariants tested:
//! - add never overwrites a live entry; put always wins
//! - increment is additive over any sequence of deltas

use std::sync::Arc;

use breakwater_cache::{CacheAdapter, MemoryCacheAdapter};
use proptest::prelude::*;
use serde_json::Value;
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// Property: after any sequence of adds, the first value wins until a
    /// put replaces it.
    #[test]
    fn add_preserves_put_replaces(values in prop::collection::vec(0i64..1000, 1..10)) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let adapter = MemoryCacheAdapter::new();

            let first = values[0];
            for (index, value) in values.iter().enumerate() {
                let added = adapter
                    .add("slot", Value::from(*value), None)
                    .await
                    .unwrap();
                prop_assert_eq!(added, index == 0);
            }
            prop_assert_eq!(
                adapter.get("slot").await.unwrap(),
                Some(Value::from(first))
            );

            adapter.put("slot", Value::from(-1), None).await.unwrap();
            prop_assert_eq!(adapter.get("slot").await.unwrap(), Some(Value::from(-1)));
            Ok(())
        })?;
    }

    /// Property: increment is additive over any delta sequence.
    #[test]
    fn increment_is_additive(
        start in -1000i64..1000,
        deltas in prop::collection::vec(-100i64..100, 0..20),
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let adapter = MemoryCacheAdapter::new();
            adapter.put("count", Value::from(start), None).await.unwrap();

            let mut expected = start;
            for delta in deltas {
                prop_assert!(adapter.increment("count", delta).await.unwrap());
                expected += delta;
            }
            prop_assert_eq!(
                adapter.get("count").await.unwrap(),
                Some(Value::from(expected))
            );
            Ok(())
        })?;
    }

    /// Property: concurrent adds on one key admit exactly one writer.
    #[test]
    fn concurrent_adds_admit_one(writers in 2usize..=12) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let adapter = Arc::new(MemoryCacheAdapter::new());

            let mut handles = Vec::new();
            for writer in 0..writers {
                let adapter = Arc::clone(&adapter);
                handles.push(tokio::spawn(async move {
                    adapter
                        .add("slot", Value::from(writer as i64), None)
                        .await
                        .unwrap()
                }));
            }

            let mut winners = 0;
            for handle in handles {
                if handle.await.unwrap() {
                    winners += 1;
                }
            }
            prop_assert_eq!(winners, 1);
            Ok(())
        })?;
    }
}
