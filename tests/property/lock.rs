//! Property tests for lock exclusivity.
//!
//! Invariants tested:
//! - Of N concurrent acquires with distinct owners, exactly one wins
//! - Exclusivity holds across release/re-acquire cycles

use std::sync::Arc;

use breakwater_lock::{LockAdapter, MemoryLockAdapter};
use proptest::prelude::*;
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: concurrent acquires against one key admit exactly one
    /// owner.
    #[test]
    fn concurrent_acquires_admit_one_owner(contenders in 2usize..=16) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let adapter = Arc::new(MemoryLockAdapter::new());

            let mut handles = Vec::new();
            for owner in 0..contenders {
                let adapter = Arc::clone(&adapter);
                handles.push(tokio::spawn(async move {
                    adapter
                        .acquire("contended", &format!("owner-{owner}"), None)
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
            prop_assert_eq!(winners, 1, "exactly one acquire must win");
            Ok(())
        })?;
    }

    /// Property: after each release, exactly one new owner wins.
    #[test]
    fn release_hands_over_exactly_once(rounds in 1usize..=8) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let adapter = MemoryLockAdapter::new();

            for round in 0..rounds {
                let owner = format!("round-{round}");
                prop_assert!(adapter.acquire("baton", &owner, None).await.unwrap());
                prop_assert!(!adapter
                    .acquire("baton", "interloper", None)
                    .await
                    .unwrap());
                prop_assert!(adapter.release("baton", &owner).await.unwrap());
            }
            Ok(())
        })?;
    }
}
