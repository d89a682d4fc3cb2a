// TTL Predictor Tests
// The model output must be a deterministic integer >= 60 for every input.

use cacheflux_core::ttl::{MIN_TTL_SECS, TtlFeatures, predict};

fn features(hit: f64, miss: f64, size_mb: f64, rate: f64) -> TtlFeatures {
    TtlFeatures {
        hit_ratio: hit,
        miss_ratio: miss,
        cache_size_mb: size_mb,
        change_rate: rate,
    }
}

#[test]
fn known_vector_predicts_1186() {
    // 1501.178899*0.8 - 1501.178899*0.2 + 0.297697*1024 - 399.212876*0.05
    assert_eq!(predict(&features(0.8, 0.2, 1024.0, 0.05)), 1186);
}

#[test]
fn zero_vector_floors_to_60() {
    assert_eq!(predict(&features(0.0, 0.0, 0.0, 0.0)), 60);
}

#[test]
fn negative_raw_result_takes_absolute_value() {
    // all-miss traffic: raw = -1501.178899, abs -> 1501
    assert_eq!(predict(&features(0.0, 1.0, 0.0, 0.0)), 1501);
}

#[test]
fn small_positive_result_clamps_to_floor() {
    // raw ~= 0.297697 * 100 = 29.77, below the floor
    assert_eq!(predict(&features(0.0, 0.0, 100.0, 0.0)), 60);
}

#[test]
fn non_finite_features_fall_back_to_floor() {
    assert_eq!(predict(&features(f64::NAN, 0.0, 0.0, 0.0)), 60);
    assert_eq!(predict(&features(0.0, 0.0, f64::INFINITY, 0.0)), MIN_TTL_SECS);
    assert_eq!(predict(&features(0.0, 0.0, f64::NEG_INFINITY, 0.0)), 60);
}

#[test]
fn no_upper_bound_on_huge_caches() {
    // a pathological cache size yields an arbitrarily large TTL
    assert_eq!(predict(&features(0.0, 0.0, 1e9, 0.0)), 297_697_000);
}

#[test]
fn output_is_always_at_least_the_floor() {
    let grid = [-1.0, 0.0, 0.05, 0.2, 0.5, 0.8, 1.0];
    let sizes = [0.0, 1.0, 64.0, 1024.0, 16384.0];
    let rates = [0.0, 0.01, 1.0, 50.0, 1000.0];

    for &hit in &grid {
        for &miss in &grid {
            for &size in &sizes {
                for &rate in &rates {
                    let ttl = predict(&features(hit, miss, size, rate));
                    assert!(
                        ttl >= MIN_TTL_SECS,
                        "predict({hit}, {miss}, {size}, {rate}) = {ttl} < {MIN_TTL_SECS}"
                    );
                }
            }
        }
    }
}

#[test]
fn prediction_is_deterministic() {
    let input = features(0.63, 0.37, 512.5, 2.25);
    assert_eq!(predict(&input), predict(&input));
}
