//! Request Pipeline Deterministic Simulation Tests
//!
//! DST tests for the key grammar, alias table and command templater with
//! multiple seeds. These tests verify that the real implementation matches
//! a shadow model for randomly generated inputs.

use agent_request::dst::{
    run_request_batch, summarize_request_batch, RequestDSTConfig, RequestDSTHarness,
};

// =============================================================================
// Standard Configuration Tests - 100 Seeds
// =============================================================================

#[test]
fn test_request_dst_100_seeds_standard() {
    let results = run_request_batch(0, 100, 500, RequestDSTConfig::new);
    let summary = summarize_request_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(
        passed, 100,
        "All 100 seeds should pass with standard config"
    );
}

#[test]
fn test_request_dst_100_seeds_dense_aliases() {
    let results = run_request_batch(1000, 100, 500, RequestDSTConfig::dense_aliases);
    let summary = summarize_request_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 100, "All 100 seeds should pass with dense aliases");
}

#[test]
fn test_request_dst_100_seeds_wide_keys() {
    let results = run_request_batch(2000, 100, 500, RequestDSTConfig::wide_keys);
    let summary = summarize_request_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 100, "All 100 seeds should pass with wide keys");
}

// =============================================================================
// Stress Tests
// =============================================================================

#[test]
fn test_request_dst_stress_5000_ops() {
    let config = RequestDSTConfig::dense_aliases(12345);
    let mut harness = RequestDSTHarness::new(config);
    harness.run(5000);
    let result = harness.result();
    println!("Stress 5000 ops: {}", result.summary());
    assert!(
        result.is_success(),
        "5000 ops should maintain invariants: {:?}",
        result.invariant_violations
    );
    assert_eq!(result.total_operations, 5000);
}

#[test]
fn test_request_dst_same_seed_same_run() {
    let mut first = RequestDSTHarness::with_seed(777);
    let mut second = RequestDSTHarness::with_seed(777);
    first.run(300);
    second.run(300);

    let (a, b) = (first.result(), second.result());
    assert_eq!(a.round_trips, b.round_trips);
    assert_eq!(a.reloads, b.reloads);
    assert_eq!(a.resolves, b.resolves);
    assert_eq!(a.substitutions, b.substitutions);
    assert_eq!(a.deny_checks, b.deny_checks);
}

// =============================================================================
// Longer Tests (ignored by default)
// =============================================================================

#[test]
#[ignore]
fn test_request_dst_1000_seeds() {
    let results = run_request_batch(0, 1000, 1000, RequestDSTConfig::new);
    let summary = summarize_request_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 1000, "All 1000 seeds should pass");
}
