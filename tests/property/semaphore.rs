//! Property tests for the semaphore cap.
//!
//! Invariants tested:
//! - Of N concurrent claims against limit L, exactly min(N, L) win
//! - The live slot count never exceeds the limit

use std::sync::Arc;

use breakwater_semaphore::{MemorySemaphoreAdapter, SemaphoreAdapter};
use proptest::prelude::*;
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: concurrent claims never exceed the limit.
    #[test]
    fn claims_never_exceed_the_limit(
        limit in 1usize..=8,
        contenders in 1usize..=16,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let adapter = Arc::new(MemorySemaphoreAdapter::new());

            let mut handles = Vec::new();
            for slot in 0..contenders {
                let adapter = Arc::clone(&adapter);
                handles.push(tokio::spawn(async move {
                    adapter
                        .acquire("pool", &format!("slot-{slot}"), limit, None)
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

            prop_assert_eq!(winners, contenders.min(limit));
            prop_assert!(adapter.acquired_count("pool").await.unwrap() <= limit);
            Ok(())
        })?;
    }

    /// Property: releasing a slot frees exactly one unit of capacity.
    #[test]
    fn release_frees_one_unit(limit in 1usize..=6) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let adapter = MemorySemaphoreAdapter::new();

            for slot in 0..limit {
                let slot_id = format!("s-{}", slot);
                prop_assert!(adapter
                    .acquire("pool", &slot_id, limit, None)
                    .await
                    .unwrap());
            }
            prop_assert!(!adapter.acquire("pool", "extra", limit, None).await.unwrap());

            prop_assert!(adapter.release("pool", "s-0").await.unwrap());
            prop_assert!(adapter.acquire("pool", "extra", limit, None).await.unwrap());
            prop_assert!(!adapter.acquire("pool", "extra-2", limit, None).await.unwrap());
            Ok(())
        })?;
    }
}
