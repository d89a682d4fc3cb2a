//! Periodic metrics sampling

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::manager::CacheManager;
use crate::metrics::MetricsSink;

/// Default sampling cadence
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Samples the active adapter on a fixed cadence, feeding the metrics log and
/// the adaptive-TTL hint
///
/// Runs on its own task so a slow backend cannot block request-serving paths.
/// A failed sampling cycle is logged and skipped; collection resumes on the
/// next tick.
pub struct MetricsCollector {
    manager: Arc<CacheManager>,
    sink: MetricsSink,
    interval: Duration,
}

impl MetricsCollector {
    pub fn new(manager: Arc<CacheManager>, sink: MetricsSink) -> Self {
        Self {
            manager,
            sink,
            interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start the background sampling task
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        info!(
            "Starting metrics collector (interval={}ms, log={:?})",
            self.interval.as_millis(),
            self.sink.path()
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                self.sample().await;
            }
        })
    }

    /// One sampling cycle; only reads from the currently active adapter
    async fn sample(&self) {
        let Some(adapter) = self.manager.active().await else {
            debug!("Metrics sample skipped: no active adapter");
            return;
        };

        let snapshot = match adapter.cache_metrics().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Metrics sample skipped: {e}");
                return;
            }
        };

        if let Err(e) = self.sink.append(&snapshot) {
            warn!("Failed to append metrics sample: {e}");
        }

        let hint = self.manager.ttl_hint();
        if hint.is_enabled() {
            hint.observe(&snapshot);
        }
    }
}
