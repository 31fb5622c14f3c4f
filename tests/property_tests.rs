//! Property-based tests for breakwater.
//!
//! Run with: cargo test --test property_tests
//!
//! These tests use proptest to generate random inputs and verify that
//! key invariants hold across the patterns and providers.

mod property;
