//! Property tests for shared-lock exclusivity.
//!
//! Invariant tested: in no observable state does a live writer coexist
//! with a live reader slot, whatever interleaving of operations runs.

use std::sync::Arc;

use breakwater_sharedlock::{MemorySharedLockAdapter, SharedLockAdapter};
use proptest::prelude::*;
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
enum Op {
    AcquireWriter(u8),
    ReleaseWriter(u8),
    AcquireReader(u8),
    ReleaseReader(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4).prop_map(Op::AcquireWriter),
        (0u8..4).prop_map(Op::ReleaseWriter),
        (0u8..4).prop_map(Op::AcquireReader),
        (0u8..4).prop_map(Op::ReleaseReader),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// Property: writer/reader exclusivity holds after every operation.
    #[test]
    fn exclusivity_holds_across_interleavings(ops in prop::collection::vec(op(), 1..60)) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let adapter = MemorySharedLockAdapter::new();

            for operation in ops {
                match operation {
                    Op::AcquireWriter(id) => {
                        let _ = adapter
                            .acquire_writer("key", &format!("w-{id}"), None)
                            .await
                            .unwrap();
                    }
                    Op::ReleaseWriter(id) => {
                        let _ = adapter
                            .release_writer("key", &format!("w-{id}"))
                            .await
                            .unwrap();
                    }
                    Op::AcquireReader(id) => {
                        let _ = adapter
                            .acquire_reader("key", &format!("r-{id}"), 3, None)
                            .await
                            .unwrap();
                    }
                    Op::ReleaseReader(id) => {
                        let _ = adapter
                            .release_reader("key", &format!("r-{id}"))
                            .await
                            .unwrap();
                    }
                }

                let writer = adapter.writer_of("key").await.unwrap();
                let readers = adapter.reader_count("key").await.unwrap();
                prop_assert!(
                    writer.is_none() || readers == 0,
                    "writer {writer:?} coexists with {readers} readers"
                );
                prop_assert!(readers <= 3, "reader limit exceeded: {readers}");
            }
            Ok(())
        })?;
    }

    /// Property: concurrent writer claims admit at most one, and never
    /// alongside readers.
    #[test]
    fn concurrent_mixed_claims_stay_exclusive(contenders in 2usize..=10) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let adapter = Arc::new(MemorySharedLockAdapter::new());

            let mut handles = Vec::new();
            for id in 0..contenders {
                let adapter = Arc::clone(&adapter);
                handles.push(tokio::spawn(async move {
                    if id % 2 == 0 {
                        adapter
                            .acquire_writer("key", &format!("w-{id}"), None)
                            .await
                            .unwrap()
                    } else {
                        adapter
                            .acquire_reader("key", &format!("r-{id}"), 8, None)
                            .await
                            .unwrap()
                    }
                }));
            }
            for handle in handles {
                let _ = handle.await.unwrap();
            }

            let writer = adapter.writer_of("key").await.unwrap();
            let readers = adapter.reader_count("key").await.unwrap();
            prop_assert!(writer.is_none() || readers == 0);
            Ok(())
        })?;
    }
}
