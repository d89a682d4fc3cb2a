//! # CacheFlux
//!
//! Cache-backend abstraction with adaptive TTL and hot backend migration.
//!
//! A [`CacheManager`] owns one live backend adapter (Redis or Memcached)
//! behind the [`CacheAdapter`] trait, watches a JSON configuration file for
//! edits and migrates live data to a new backend when the target changes —
//! without downtime. A [`MetricsCollector`] samples the active backend and
//! feeds a fixed linear model that predicts TTLs for writes that carry none.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cacheflux_core::CacheManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = Arc::new(CacheManager::new("cache-config.json"));
//!
//!     let cache = manager.acquire().await?;
//!     cache.set("user:1", &serde_json::json!("ada"), Some(300)).await?;
//!     let value = cache.get("user:1").await;
//!     println!("Value: {:?}", value);
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod ttl;

// Re-export commonly used types
pub use adapter::{CacheAdapter, MemcacheAdapter, RedisAdapter};
pub use config::{BackendType, CacheConfig};
pub use error::{CacheError, Result};
pub use manager::{AdapterFactory, BackendFactory, CacheManager, MigrationReport, copy_entries};
pub use metrics::{MetricsCollector, MetricsSink, MetricsSnapshot};
pub use ttl::{AdaptiveTtl, TtlFeatures, predict};
