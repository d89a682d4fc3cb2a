//! Adaptive TTL prediction
//!
//! A fixed linear model maps a 4-feature metrics vector to a TTL in seconds.
//! The model weights come from an offline regression over cache traces;
//! training is out of scope here, only inference.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::metrics::MetricsSnapshot;

/// Weight on the lifetime hit ratio
pub const HIT_RATIO_WEIGHT: f64 = 1501.178899;
/// Weight on the lifetime miss ratio
pub const MISS_RATIO_WEIGHT: f64 = -1501.178899;
/// Weight on the cache size in MB
pub const CACHE_SIZE_WEIGHT: f64 = 0.297697;
/// Weight on the data change rate (evictions per minute)
pub const CHANGE_RATE_WEIGHT: f64 = -399.212876;
/// Model intercept
pub const INTERCEPT: f64 = 0.0;

/// Floor for every predicted TTL, in seconds
pub const MIN_TTL_SECS: u64 = 60;

/// Feature vector consumed by [`predict`], in model order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TtlFeatures {
    pub hit_ratio: f64,
    pub miss_ratio: f64,
    pub cache_size_mb: f64,
    pub change_rate: f64,
}

impl From<&MetricsSnapshot> for TtlFeatures {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            hit_ratio: snapshot.hit_ratio_lifetime,
            miss_ratio: snapshot.miss_ratio_lifetime,
            cache_size_mb: snapshot.cache_size_mb,
            change_rate: snapshot.data_change_rate,
        }
    }
}

/// Predict a TTL in seconds from live cache metrics
///
/// Pure and deterministic. The raw model output goes through a fixed policy:
/// a non-finite or non-positive result is replaced by its absolute value, a
/// result below [`MIN_TTL_SECS`] is clamped up to it, and the final value is
/// rounded to the nearest integer. The output is therefore always an integer
/// `>= 60`. There is no upper bound: a pathological feature vector (huge
/// cache size) yields an arbitrarily large TTL.
pub fn predict(features: &TtlFeatures) -> u64 {
    let raw = HIT_RATIO_WEIGHT * features.hit_ratio
        + MISS_RATIO_WEIGHT * features.miss_ratio
        + CACHE_SIZE_WEIGHT * features.cache_size_mb
        + CHANGE_RATE_WEIGHT * features.change_rate
        + INTERCEPT;

    let mut ttl = if !raw.is_finite() || raw <= 0.0 {
        raw.abs()
    } else {
        raw
    };
    // abs() of NaN/inf is still not finite
    if !ttl.is_finite() {
        ttl = 0.0;
    }
    if ttl < MIN_TTL_SECS as f64 {
        ttl = MIN_TTL_SECS as f64;
    }
    ttl.round() as u64
}

/// Shared adaptive-TTL hint
///
/// One handle is created per [`CacheManager`](crate::CacheManager) and cloned
/// into every adapter the factory builds. The metrics collector stores fresh
/// predictions into it; adapters consult it on writes that carry no explicit
/// TTL. Disabled until the configuration asks for `autoTTL`.
#[derive(Clone, Default)]
pub struct AdaptiveTtl {
    inner: Arc<AdaptiveTtlState>,
}

#[derive(Default)]
struct AdaptiveTtlState {
    /// Last predicted TTL in seconds, 0 until the first prediction
    secs: AtomicU64,
    enabled: AtomicBool,
}

impl AdaptiveTtl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn prediction consumption on or off (follows `autoTTL` in config)
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    /// Record a prediction derived from a fresh metrics snapshot
    pub fn observe(&self, snapshot: &MetricsSnapshot) {
        let ttl = predict(&TtlFeatures::from(snapshot));
        self.inner.secs.store(ttl, Ordering::Relaxed);
    }

    /// TTL to apply to a write that carries none, when enabled
    pub fn suggestion(&self) -> Option<u64> {
        if !self.is_enabled() {
            return None;
        }
        match self.inner.secs.load(Ordering::Relaxed) {
            0 => None,
            secs => Some(secs),
        }
    }
}
