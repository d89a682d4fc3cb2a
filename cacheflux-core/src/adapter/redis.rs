//! Redis adapter
//!
//! Variant A of the capability set. Reads fail soft; write errors propagate
//! to the caller (unlike the Memcached variant).

use parking_lot::{Mutex, RwLock};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::adapter::{CacheAdapter, decode_value, encode_value};
use crate::config::BackendType;
use crate::error::{CacheError, Result};
use crate::metrics::{MetricsSnapshot, RawBackendStats, SampleState, derive_snapshot, sanitize};
use crate::ttl::AdaptiveTtl;

/// Adapter over one Redis logical database
pub struct RedisAdapter {
    /// `None` once disconnected; the manager auto-reconnects while present
    conn: RwLock<Option<ConnectionManager>>,
    ttl_hint: AdaptiveTtl,
    sample_state: Mutex<SampleState>,
}

impl RedisAdapter {
    /// Connect to the configured target
    ///
    /// Accepts `redis://` URLs or bare `host:port`.
    pub async fn connect(target: &str, ttl_hint: AdaptiveTtl) -> Result<Self> {
        let url = normalize_target(target);
        let client = redis::Client::open(url.as_str())
            .map_err(|e| CacheError::Transport(format!("invalid redis target {url}: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Transport(format!("cannot connect to {url}: {e}")))?;

        info!("Connected redis adapter to {url}");
        Ok(Self {
            conn: RwLock::new(Some(conn)),
            ttl_hint,
            sample_state: Mutex::new(SampleState::default()),
        })
    }

    fn connection(&self) -> Option<ConnectionManager> {
        self.conn.read().clone()
    }

    fn resolve_ttl(&self, ttl_secs: Option<u64>) -> Option<u64> {
        ttl_secs.filter(|t| *t > 0).or_else(|| self.ttl_hint.suggestion())
    }
}

#[async_trait::async_trait]
impl CacheAdapter for RedisAdapter {
    fn backend(&self) -> BackendType {
        BackendType::Redis
    }

    async fn get(&self, key: &str) -> Option<Value> {
        let Some(mut conn) = self.connection() else {
            warn!("GET {key} on disconnected redis adapter");
            return None;
        };
        match conn.get::<_, Option<String>>(key).await {
            Ok(raw) => raw.map(|r| decode_value(&r)),
            Err(e) => {
                warn!("Redis GET {key} failed: {e}");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl_secs: Option<u64>) -> Result<()> {
        let mut conn = self
            .connection()
            .ok_or_else(|| CacheError::Transport("redis adapter is disconnected".to_string()))?;
        let encoded = encode_value(value)?;

        let result = match self.resolve_ttl(ttl_secs) {
            Some(ttl) => {
                debug!("Redis SET {key} (ttl={ttl}s)");
                conn.set_ex::<_, _, ()>(key, encoded, ttl).await
            }
            None => {
                debug!("Redis SET {key} (no expiry)");
                conn.set::<_, _, ()>(key, encoded).await
            }
        };
        result.map_err(|e| CacheError::Transport(format!("redis SET {key} failed: {e}")))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self
            .connection()
            .ok_or_else(|| CacheError::Transport("redis adapter is disconnected".to_string()))?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| CacheError::Transport(format!("redis DEL {key} failed: {e}")))
    }

    async fn has_key(&self, key: &str) -> bool {
        let Some(mut conn) = self.connection() else {
            return false;
        };
        match conn.exists::<_, bool>(key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("Redis EXISTS {key} failed: {e}");
                false
            }
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self
            .connection()
            .ok_or_else(|| CacheError::Transport("redis adapter is disconnected".to_string()))?;
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::Transport(format!("redis FLUSHDB failed: {e}")))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut conn = self
            .connection()
            .ok_or_else(|| CacheError::Transport("redis adapter is disconnected".to_string()))?;
        conn.keys::<_, Vec<String>>("*")
            .await
            .map_err(|e| CacheError::Transport(format!("redis KEYS failed: {e}")))
    }

    async fn disconnect(&self) {
        if self.conn.write().take().is_some() {
            info!("Redis adapter disconnected");
        } else {
            debug!("Redis adapter already disconnected");
        }
    }

    async fn cache_metrics(&self) -> Result<MetricsSnapshot> {
        let mut conn = self
            .connection()
            .ok_or_else(|| CacheError::Metrics("redis adapter is disconnected".to_string()))?;

        let info: String = redis::cmd("INFO")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Metrics(format!("redis INFO failed: {e}")))?;
        let key_count: u64 = redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Metrics(format!("redis DBSIZE failed: {e}")))?;

        let raw = RawBackendStats {
            hits: info_field(&info, "keyspace_hits"),
            misses: info_field(&info, "keyspace_misses"),
            evictions: info_field(&info, "evicted_keys"),
            memory_bytes: info_field(&info, "used_memory"),
            key_count,
        };

        let mut state = self.sample_state.lock();
        Ok(derive_snapshot(&raw, &mut state, std::time::Instant::now()))
    }
}

/// Parse one `field:value` line out of an INFO payload, sanitized
fn info_field(info: &str, field: &str) -> f64 {
    info.lines()
        .find_map(|line| line.strip_prefix(field)?.strip_prefix(':'))
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(sanitize)
        .unwrap_or(0.0)
}

/// Bare `host:port` targets get the `redis://` scheme prepended
fn normalize_target(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("redis://{target}")
    }
}
