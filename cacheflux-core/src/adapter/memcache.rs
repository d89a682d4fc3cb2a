//! Memcached adapter
//!
//! Variant B of the capability set. The protocol has no wire-level key
//! enumeration, so `keys()` reports only keys this process wrote since the
//! adapter was constructed; the sync client runs on the blocking pool so it
//! cannot stall the runtime.

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

use crate::adapter::{CacheAdapter, decode_value, encode_value};
use crate::config::BackendType;
use crate::error::{CacheError, Result};
use crate::metrics::{MetricsSnapshot, RawBackendStats, SampleState, derive_snapshot, sanitize};
use crate::ttl::AdaptiveTtl;

/// Hard bound on one stats round-trip
const STATS_TIMEOUT: Duration = Duration::from_secs(5);

/// Adapter over one Memcached server
pub struct MemcacheAdapter {
    client: RwLock<Option<memcache::Client>>,
    /// Keys this process has written since construction; the only key
    /// visibility Memcached gives us
    local_keys: RwLock<HashSet<String>>,
    ttl_hint: AdaptiveTtl,
    sample_state: Mutex<SampleState>,
}

impl MemcacheAdapter {
    /// Connect to the configured target
    ///
    /// Accepts `memcache://` URLs or bare `host:port`.
    pub async fn connect(target: &str, ttl_hint: AdaptiveTtl) -> Result<Self> {
        let url = normalize_target(target);
        let client = spawn_blocking({
            let url = url.clone();
            move || memcache::connect(url.as_str())
        })
        .await
        .map_err(|e| CacheError::Transport(format!("connect task failed: {e}")))?
        .map_err(|e| CacheError::Transport(format!("cannot connect to {url}: {e}")))?;

        info!("Connected memcache adapter to {url}");
        Ok(Self {
            client: RwLock::new(Some(client)),
            local_keys: RwLock::new(HashSet::new()),
            ttl_hint,
            sample_state: Mutex::new(SampleState::default()),
        })
    }

    fn client(&self) -> Option<memcache::Client> {
        self.client.read().clone()
    }

    fn resolve_ttl(&self, ttl_secs: Option<u64>) -> Option<u64> {
        ttl_secs.filter(|t| *t > 0).or_else(|| self.ttl_hint.suggestion())
    }
}

#[async_trait::async_trait]
impl CacheAdapter for MemcacheAdapter {
    fn backend(&self) -> BackendType {
        BackendType::Memcache
    }

    async fn get(&self, key: &str) -> Option<Value> {
        let Some(client) = self.client() else {
            warn!("GET {key} on disconnected memcache adapter");
            return None;
        };
        let owned = key.to_string();
        match spawn_blocking(move || client.get::<String>(&owned)).await {
            Ok(Ok(raw)) => raw.map(|r| decode_value(&r)),
            Ok(Err(e)) => {
                warn!("Memcache GET {key} failed: {e}");
                None
            }
            Err(e) => {
                warn!("Memcache GET {key} task failed: {e}");
                None
            }
        }
    }

    /// Write errors are swallowed after logging; only the caller-visible
    /// contract differs from the Redis variant, the encoding is identical
    async fn set(&self, key: &str, value: &Value, ttl_secs: Option<u64>) -> Result<()> {
        let Some(client) = self.client() else {
            warn!("SET {key} on disconnected memcache adapter");
            return Ok(());
        };
        let encoded = encode_value(value)?;
        // expiration 0 = server default retention
        let expiration = self
            .resolve_ttl(ttl_secs)
            .map(|t| t.min(u32::MAX as u64) as u32)
            .unwrap_or(0);
        debug!("Memcache SET {key} (exp={expiration}s)");

        let owned = key.to_string();
        let result =
            spawn_blocking(move || client.set(&owned, encoded.as_str(), expiration)).await;
        match result {
            Ok(Ok(())) => {
                self.local_keys.write().insert(key.to_string());
            }
            Ok(Err(e)) => warn!("Memcache SET {key} failed (swallowed): {e}"),
            Err(e) => warn!("Memcache SET {key} task failed (swallowed): {e}"),
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.local_keys.write().remove(key);
        let Some(client) = self.client() else {
            return Err(CacheError::Transport(
                "memcache adapter is disconnected".to_string(),
            ));
        };
        let owned = key.to_string();
        spawn_blocking(move || client.delete(&owned))
            .await
            .map_err(|e| CacheError::Transport(format!("delete task failed: {e}")))?
            .map_err(|e| CacheError::Transport(format!("memcache DELETE {key} failed: {e}")))?;
        Ok(())
    }

    async fn has_key(&self, key: &str) -> bool {
        // no dedicated exists command; a get doubles as the probe
        self.get(key).await.is_some()
    }

    async fn clear(&self) -> Result<()> {
        self.local_keys.write().clear();
        let Some(client) = self.client() else {
            return Err(CacheError::Transport(
                "memcache adapter is disconnected".to_string(),
            ));
        };
        spawn_blocking(move || client.flush())
            .await
            .map_err(|e| CacheError::Transport(format!("flush task failed: {e}")))?
            .map_err(|e| CacheError::Transport(format!("memcache FLUSH failed: {e}")))?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.local_keys.read().iter().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn disconnect(&self) {
        if self.client.write().take().is_some() {
            info!("Memcache adapter disconnected");
        } else {
            debug!("Memcache adapter already disconnected");
        }
    }

    async fn cache_metrics(&self) -> Result<MetricsSnapshot> {
        let client = self.client().ok_or_else(|| {
            CacheError::Metrics("memcache adapter is disconnected".to_string())
        })?;

        let stats = tokio::time::timeout(STATS_TIMEOUT, spawn_blocking(move || client.stats()))
            .await
            .map_err(|_| {
                CacheError::Metrics(format!(
                    "memcache stats timed out after {}s",
                    STATS_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| CacheError::Metrics(format!("stats task failed: {e}")))?
            .map_err(|e| CacheError::Metrics(format!("memcache stats failed: {e}")))?;

        // single-server deployment: first server's table is the table
        let table = stats
            .into_iter()
            .next()
            .map(|(_, table)| table)
            .ok_or_else(|| CacheError::Metrics("memcache stats returned no servers".to_string()))?;

        let raw = RawBackendStats {
            hits: stat_field(&table, "get_hits"),
            misses: stat_field(&table, "get_misses"),
            evictions: stat_field(&table, "evictions"),
            memory_bytes: stat_field(&table, "bytes"),
            key_count: stat_field(&table, "curr_items") as u64,
        };

        let mut state = self.sample_state.lock();
        Ok(derive_snapshot(&raw, &mut state, Instant::now()))
    }
}

/// Parse one stats field, sanitized
fn stat_field(table: &HashMap<String, String>, field: &str) -> f64 {
    table
        .get(field)
        .and_then(|v| v.parse::<f64>().ok())
        .map(sanitize)
        .unwrap_or(0.0)
}

/// Bare `host:port` targets get the `memcache://` scheme prepended
fn normalize_target(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("memcache://{target}")
    }
}
