//! Cache metrics: raw backend counters, derived snapshots, periodic
//! collection and the JSON metrics log

mod collector;
mod sink;

pub use collector::MetricsCollector;
pub use sink::MetricsSink;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Cumulative counters as reported by a backend, already sanitized
///
/// Backends report these over the wire (Redis `INFO`, Memcached `stats`); any
/// field that arrives non-numeric, negative, NaN or infinite must be coerced
/// to 0 via [`sanitize`] before it lands here.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawBackendStats {
    pub hits: f64,
    pub misses: f64,
    pub evictions: f64,
    pub memory_bytes: f64,
    pub key_count: u64,
}

/// Previous cumulative counters, owned by one adapter instance
///
/// Starts zeroed on adapter construction, so the first sample's rolling
/// ratios equal the lifetime ratios and every migration visibly restarts the
/// rolling series.
#[derive(Debug, Default)]
pub struct SampleState {
    hits: f64,
    misses: f64,
    evictions: f64,
    last_sample: Option<Instant>,
}

/// Derived metrics for one sampling cycle
///
/// Ratios are rounded to 3 decimals, sizes and rates to 2. Serialized in
/// camelCase for the JSON metrics log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub hit_ratio_rolling: f64,
    pub miss_ratio_rolling: f64,
    pub hit_ratio_lifetime: f64,
    pub miss_ratio_lifetime: f64,
    pub cache_size_mb: f64,
    /// Evictions per minute since the previous sample
    pub data_change_rate: f64,
    pub key_count: u64,
    pub avg_key_size: f64,
}

/// Coerce a raw backend value into a usable non-negative finite number
pub fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        0.0
    }
}

/// Round to `decimals` places, coercing a non-finite result to 0
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() { rounded } else { 0.0 }
}

/// Ratio with a defined value of 0 for an empty denominator
fn ratio(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total } else { 0.0 }
}

/// Derive one snapshot from current cumulative counters and the previous
/// sample state, advancing the state
///
/// Deltas clamp at zero so a backend restart (counters reset) cannot produce
/// negative rates. The data change rate is defined as 0 on the very first
/// sample and whenever no measurable time has elapsed.
pub fn derive_snapshot(
    raw: &RawBackendStats,
    state: &mut SampleState,
    now: Instant,
) -> MetricsSnapshot {
    let hits = sanitize(raw.hits);
    let misses = sanitize(raw.misses);
    let evictions = sanitize(raw.evictions);
    let memory_bytes = sanitize(raw.memory_bytes);

    let hits_delta = (hits - state.hits).max(0.0);
    let misses_delta = (misses - state.misses).max(0.0);
    let evictions_delta = (evictions - state.evictions).max(0.0);

    let minutes_elapsed = state
        .last_sample
        .map(|last| now.duration_since(last).as_secs_f64() / 60.0)
        .unwrap_or(0.0);
    let change_rate = if minutes_elapsed > 0.0 {
        evictions_delta / minutes_elapsed
    } else {
        0.0
    };

    let cache_size_mb = memory_bytes / (1024.0 * 1024.0);
    let avg_key_size = if raw.key_count > 0 {
        memory_bytes / raw.key_count as f64
    } else {
        0.0
    };

    state.hits = hits;
    state.misses = misses;
    state.evictions = evictions;
    state.last_sample = Some(now);

    MetricsSnapshot {
        timestamp: Utc::now(),
        hit_ratio_rolling: round_to(ratio(hits_delta, hits_delta + misses_delta), 3),
        miss_ratio_rolling: round_to(ratio(misses_delta, hits_delta + misses_delta), 3),
        hit_ratio_lifetime: round_to(ratio(hits, hits + misses), 3),
        miss_ratio_lifetime: round_to(ratio(misses, hits + misses), 3),
        cache_size_mb: round_to(cache_size_mb, 2),
        data_change_rate: round_to(change_rate, 2),
        key_count: raw.key_count,
        avg_key_size: round_to(avg_key_size, 2),
    }
}
