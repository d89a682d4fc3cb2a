// Metrics Derivation Tests
// Rolling/lifetime ratio math, counter-reset clamping, sanitize guards and
// the fixed rounding policy.

use std::time::{Duration, Instant};

use cacheflux_core::metrics::{
    RawBackendStats, SampleState, derive_snapshot, round_to, sanitize,
};

fn raw(hits: f64, misses: f64, evictions: f64, bytes: f64, keys: u64) -> RawBackendStats {
    RawBackendStats {
        hits,
        misses,
        evictions,
        memory_bytes: bytes,
        key_count: keys,
    }
}

#[test]
fn rolling_ratios_sum_to_one_when_deltas_present() {
    let mut state = SampleState::default();
    let t0 = Instant::now();
    derive_snapshot(&raw(100.0, 40.0, 0.0, 0.0, 0), &mut state, t0);

    let snapshot = derive_snapshot(
        &raw(130.0, 50.0, 0.0, 0.0, 0),
        &mut state,
        t0 + Duration::from_secs(5),
    );
    // deltas: 30 hits, 10 misses
    assert_eq!(snapshot.hit_ratio_rolling, 0.75);
    assert_eq!(snapshot.miss_ratio_rolling, 0.25);
    assert!((snapshot.hit_ratio_rolling + snapshot.miss_ratio_rolling - 1.0).abs() < 1e-3);
}

#[test]
fn zero_delta_denominator_defines_ratios_as_zero() {
    let mut state = SampleState::default();
    let t0 = Instant::now();
    derive_snapshot(&raw(100.0, 40.0, 0.0, 0.0, 0), &mut state, t0);

    // no traffic between samples
    let snapshot = derive_snapshot(
        &raw(100.0, 40.0, 0.0, 0.0, 0),
        &mut state,
        t0 + Duration::from_secs(5),
    );
    assert_eq!(snapshot.hit_ratio_rolling, 0.0);
    assert_eq!(snapshot.miss_ratio_rolling, 0.0);
}

#[test]
fn lifetime_ratios_use_cumulative_counters() {
    let mut state = SampleState::default();
    let snapshot = derive_snapshot(&raw(75.0, 25.0, 0.0, 0.0, 0), &mut state, Instant::now());
    assert_eq!(snapshot.hit_ratio_lifetime, 0.75);
    assert_eq!(snapshot.miss_ratio_lifetime, 0.25);
}

#[test]
fn empty_backend_has_all_zero_ratios() {
    let mut state = SampleState::default();
    let snapshot = derive_snapshot(&raw(0.0, 0.0, 0.0, 0.0, 0), &mut state, Instant::now());
    assert_eq!(snapshot.hit_ratio_lifetime, 0.0);
    assert_eq!(snapshot.miss_ratio_lifetime, 0.0);
    assert_eq!(snapshot.avg_key_size, 0.0);
}

#[test]
fn counter_reset_clamps_delta_to_zero() {
    let mut state = SampleState::default();
    let t0 = Instant::now();
    derive_snapshot(&raw(100.0, 50.0, 20.0, 0.0, 0), &mut state, t0);

    // backend restarted: cumulative counters went backwards
    let snapshot = derive_snapshot(
        &raw(40.0, 60.0, 5.0, 0.0, 0),
        &mut state,
        t0 + Duration::from_secs(60),
    );
    assert_eq!(snapshot.hit_ratio_rolling, 0.0);
    assert_eq!(snapshot.miss_ratio_rolling, 1.0);
    assert_eq!(snapshot.data_change_rate, 0.0);
}

#[test]
fn change_rate_is_evictions_per_minute() {
    let mut state = SampleState::default();
    let t0 = Instant::now();
    let first = derive_snapshot(&raw(0.0, 0.0, 10.0, 0.0, 0), &mut state, t0);
    // no previous sample: rate defined as 0
    assert_eq!(first.data_change_rate, 0.0);

    let snapshot = derive_snapshot(
        &raw(0.0, 0.0, 40.0, 0.0, 0),
        &mut state,
        t0 + Duration::from_secs(120),
    );
    // 30 evictions over 2 minutes
    assert_eq!(snapshot.data_change_rate, 15.0);
}

#[test]
fn sizes_normalize_to_mb_and_round_to_two_decimals() {
    let mut state = SampleState::default();
    let snapshot = derive_snapshot(
        &raw(0.0, 0.0, 0.0, 2_621_440.0, 10),
        &mut state,
        Instant::now(),
    );
    assert_eq!(snapshot.cache_size_mb, 2.5);
    assert_eq!(snapshot.avg_key_size, 262_144.0);
    assert_eq!(snapshot.key_count, 10);
}

#[test]
fn ratios_round_to_three_decimals() {
    let mut state = SampleState::default();
    let snapshot = derive_snapshot(&raw(1.0, 2.0, 0.0, 0.0, 0), &mut state, Instant::now());
    assert_eq!(snapshot.hit_ratio_lifetime, 0.333);
    assert_eq!(snapshot.miss_ratio_lifetime, 0.667);
}

#[test]
fn malformed_raw_values_coerce_to_zero() {
    let mut state = SampleState::default();
    let snapshot = derive_snapshot(
        &raw(f64::NAN, -12.0, f64::INFINITY, -1.0, 0),
        &mut state,
        Instant::now(),
    );
    assert_eq!(snapshot.hit_ratio_lifetime, 0.0);
    assert_eq!(snapshot.miss_ratio_lifetime, 0.0);
    assert_eq!(snapshot.cache_size_mb, 0.0);
    assert_eq!(snapshot.data_change_rate, 0.0);
}

#[test]
fn sanitize_guards() {
    assert_eq!(sanitize(3.2), 3.2);
    assert_eq!(sanitize(0.0), 0.0);
    assert_eq!(sanitize(-5.0), 0.0);
    assert_eq!(sanitize(f64::NAN), 0.0);
    assert_eq!(sanitize(f64::INFINITY), 0.0);
    assert_eq!(sanitize(f64::NEG_INFINITY), 0.0);
}

#[test]
fn rounding_policy() {
    assert_eq!(round_to(0.123456, 3), 0.123);
    assert_eq!(round_to(0.9996, 3), 1.0);
    assert_eq!(round_to(12.346, 2), 12.35);
    // non-finite results coerce to zero in the output
    assert_eq!(round_to(f64::NAN, 2), 0.0);
    assert_eq!(round_to(f64::INFINITY, 3), 0.0);
}
