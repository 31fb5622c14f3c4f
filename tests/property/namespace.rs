//! Property tests for key namespacing.
//!
//! Invariants tested:
//! - The namespaced form is injective in (root, key)
//! - Inputs containing the reserved token are always rejected

use breakwater_core::namespace::Namespace;
use proptest::prelude::*;

/// Inputs that never contain the default root identifier `_rt`.
fn clean_input() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9/:.-]{1,24}".prop_filter("must not contain the reserved token", |s| {
        !s.contains("_rt")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: distinct (root, key) pairs produce distinct namespaced
    /// keys.
    #[test]
    fn namespaced_form_is_injective(
        root_a in clean_input(),
        key_a in clean_input(),
        root_b in clean_input(),
        key_b in clean_input(),
    ) {
        prop_assume!((root_a.clone(), key_a.clone()) != (root_b.clone(), key_b.clone()));

        let a = Namespace::new(root_a).unwrap().create(key_a).unwrap();
        let b = Namespace::new(root_b).unwrap().create(key_b).unwrap();
        prop_assert_ne!(a.namespaced(), b.namespaced());
    }

    /// Property: round-tripping preserves the original key.
    #[test]
    fn original_key_is_preserved(root in clean_input(), key in clean_input()) {
        let namespaced = Namespace::new(root).unwrap().create(key.clone()).unwrap();
        prop_assert_eq!(namespaced.original(), key.as_str());
        prop_assert!(namespaced.namespaced().ends_with(&key));
    }

    /// Property: keys containing the reserved token are rejected.
    #[test]
    fn reserved_token_is_rejected(prefix in clean_input(), suffix in clean_input()) {
        let ns = Namespace::new("app").unwrap();
        let poisoned = format!("{prefix}_rt{suffix}");
        prop_assert!(ns.create(poisoned).is_err());
    }
}
