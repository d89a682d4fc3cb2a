//! Backend adapters
//!
//! Every backend family implements the same capability set behind
//! [`CacheAdapter`]; the manager only ever holds the trait object.

mod memcache;
mod redis;

pub use memcache::MemcacheAdapter;
pub use redis::RedisAdapter;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::BackendType;
use crate::error::Result;
use crate::metrics::MetricsSnapshot;

/// Uniform capability set over one live cache backend
///
/// Read paths fail soft: `get` and `has_key` never surface a transport error,
/// they log it and report a miss. Write behavior is intentionally asymmetric
/// between variants — Redis propagates `set` failures, Memcached swallows
/// them after logging — and callers must handle both.
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    /// Backend family served by this adapter
    fn backend(&self) -> BackendType;

    /// Read a value; `None` on a miss or on any backend error
    async fn get(&self, key: &str) -> Option<Value>;

    /// Write a value, canonically JSON-encoded
    ///
    /// `ttl_secs` of `None` or `Some(0)` defers to the adaptive-TTL hint when
    /// enabled, otherwise to the backend's default retention (no expiry for
    /// Redis, server default for Memcached).
    async fn set(&self, key: &str, value: &Value, ttl_secs: Option<u64>) -> Result<()>;

    /// Remove a key
    async fn delete(&self, key: &str) -> Result<()>;

    /// Existence check; `false` on any backend error
    async fn has_key(&self, key: &str) -> bool;

    /// Wipe the entire addressable namespace this adapter is configured
    /// against, not just keys this process wrote
    async fn clear(&self) -> Result<()>;

    /// Enumerate visible keys
    ///
    /// Redis scans the whole namespace; Memcached has no wire-level
    /// enumeration, so its adapter reports only keys this process wrote since
    /// adapter construction. Migration inherits that completeness gap.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Release the underlying connection; idempotent
    async fn disconnect(&self);

    /// Sample backend counters and derive a metrics snapshot
    async fn cache_metrics(&self) -> Result<MetricsSnapshot>;
}

impl std::fmt::Debug for dyn CacheAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAdapter")
            .field("backend", &self.backend())
            .finish()
    }
}

/// Canonical text encoding applied before every store
pub(crate) fn encode_value(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode stored text back into a value
///
/// Text that some foreign writer stored without JSON encoding comes back as a
/// plain JSON string instead of an error.
pub(crate) fn decode_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn codec_round_trip() {
        let value = json!({"user": "ada", "visits": 3});
        let encoded = encode_value(&value).unwrap();
        assert_eq!(decode_value(&encoded), value);
    }

    #[test]
    fn foreign_text_decodes_as_string() {
        assert_eq!(decode_value("not json at all {"), json!("not json at all {"));
        // but valid JSON scalars decode as themselves
        assert_eq!(decode_value("42"), json!(42));
    }
}
