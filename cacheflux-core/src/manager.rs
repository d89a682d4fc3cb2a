//! Cache manager: adapter factory, configuration watcher and live migrator
//!
//! The manager owns the single active adapter behind the [`CacheAdapter`]
//! trait and keeps it in sync with the external configuration file. A
//! detected `(type, url)` change triggers an online migration: the old
//! adapter keeps serving traffic while its keys are copied into a freshly
//! built replacement, then traffic cuts over.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::adapter::{CacheAdapter, MemcacheAdapter, RedisAdapter};
use crate::config::{BackendType, CacheConfig};
use crate::error::Result;
use crate::ttl::AdaptiveTtl;

/// How often the configuration file's mtime is polled
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Quiet window that must elapse after the last observed edit before a
/// reload; rapid successive edits coalesce into one migration
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// Builds adapters from configuration
///
/// The seam between the manager's state machine and concrete backends;
/// [`BackendFactory`] is the production implementation.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn build(
        &self,
        config: &CacheConfig,
        ttl_hint: AdaptiveTtl,
    ) -> Result<Arc<dyn CacheAdapter>>;
}

/// Production factory covering the known backend families
pub struct BackendFactory;

#[async_trait]
impl AdapterFactory for BackendFactory {
    async fn build(
        &self,
        config: &CacheConfig,
        ttl_hint: AdaptiveTtl,
    ) -> Result<Arc<dyn CacheAdapter>> {
        config.validate()?;
        match config.backend_type()? {
            BackendType::Redis => {
                Ok(Arc::new(RedisAdapter::connect(&config.url, ttl_hint).await?))
            }
            BackendType::Memcache => {
                Ok(Arc::new(MemcacheAdapter::connect(&config.url, ttl_hint).await?))
            }
        }
    }
}

enum ManagerState {
    Uninitialized,
    /// One adapter serving traffic
    Active {
        adapter: Arc<dyn CacheAdapter>,
        config: CacheConfig,
    },
    /// Copy in flight; the old adapter still serves traffic until cutover
    Migrating {
        adapter: Arc<dyn CacheAdapter>,
        config: CacheConfig,
    },
}

impl ManagerState {
    fn adapter(&self) -> Option<Arc<dyn CacheAdapter>> {
        match self {
            Self::Uninitialized => None,
            Self::Active { adapter, .. } | Self::Migrating { adapter, .. } => {
                Some(adapter.clone())
            }
        }
    }

    fn config(&self) -> Option<&CacheConfig> {
        match self {
            Self::Uninitialized => None,
            Self::Active { config, .. } | Self::Migrating { config, .. } => Some(config),
        }
    }
}

/// Outcome of one migration copy phase
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    /// Keys the old adapter enumerated
    pub total: usize,
    pub copied: usize,
    /// Keys whose read came back empty (not written to the target)
    pub skipped: usize,
    pub failed: usize,
}

/// Owner of the single active backend adapter
///
/// Construct once, wrap in an [`Arc`] and pass the handle to every call site;
/// "one active backend at a time" lives inside the manager instead of in
/// process-global state.
pub struct CacheManager {
    config_path: PathBuf,
    factory: Box<dyn AdapterFactory>,
    state: RwLock<ManagerState>,
    ttl_hint: AdaptiveTtl,
    watcher: Mutex<Option<tokio::task::JoinHandle<()>>>,
    poll_interval: Duration,
    debounce_window: Duration,
}

impl CacheManager {
    /// Manager over the given configuration file, with real backends
    pub fn new<P: AsRef<Path>>(config_path: P) -> Self {
        Self::with_factory(config_path, Box::new(BackendFactory))
    }

    /// Manager with a custom adapter factory
    pub fn with_factory<P: AsRef<Path>>(config_path: P, factory: Box<dyn AdapterFactory>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            factory,
            state: RwLock::new(ManagerState::Uninitialized),
            ttl_hint: AdaptiveTtl::new(),
            watcher: Mutex::new(None),
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
        }
    }

    /// Override watcher timings (mainly for tests)
    pub fn with_timings(mut self, poll_interval: Duration, debounce_window: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.debounce_window = debounce_window;
        self
    }

    /// Shared adaptive-TTL hint fed by the metrics collector
    pub fn ttl_hint(&self) -> &AdaptiveTtl {
        &self.ttl_hint
    }

    /// Path of the watched configuration file
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The adapter currently serving traffic, or the still-serving old
    /// adapter while a migration is in flight
    ///
    /// The returned `Arc` is a direct reference: holding it across a
    /// migration means talking to a disconnected backend. Call
    /// [`acquire`](Self::acquire) per use instead of caching the result.
    pub async fn acquire(self: &Arc<Self>) -> Result<Arc<dyn CacheAdapter>> {
        {
            let state = self.state.read().await;
            if let Some(adapter) = state.adapter() {
                return Ok(adapter);
            }
        }

        let mut state = self.state.write().await;
        // raced with another initializer
        if let Some(adapter) = state.adapter() {
            return Ok(adapter);
        }

        let config = CacheConfig::load(&self.config_path)?;
        info!(
            "Initializing cache backend: {} at {}",
            config.backend, config.url
        );
        let adapter = self.factory.build(&config, self.ttl_hint.clone()).await?;
        self.ttl_hint.set_enabled(config.auto_ttl);
        *state = ManagerState::Active {
            adapter: adapter.clone(),
            config,
        };
        drop(state);

        self.start_watching();
        Ok(adapter)
    }

    /// Like [`acquire`](Self::acquire) but never initializes; used by
    /// observers such as the metrics collector
    pub async fn active(&self) -> Option<Arc<dyn CacheAdapter>> {
        self.state.read().await.adapter()
    }

    /// Configuration the active adapter was built from
    pub async fn current_config(&self) -> Option<CacheConfig> {
        self.state.read().await.config().cloned()
    }

    /// Start the configuration watcher task; a no-op while one is running
    pub fn start_watching(self: &Arc<Self>) {
        let mut watcher = self.watcher.lock();
        if watcher.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        info!(
            "Watching {:?} (poll={}ms, debounce={}ms)",
            self.config_path,
            self.poll_interval.as_millis(),
            self.debounce_window.as_millis()
        );
        let manager = self.clone();
        *watcher = Some(tokio::spawn(manager.watch_loop()));
    }

    /// Stop the configuration watcher task
    pub fn stop_watching(&self) {
        if let Some(handle) = self.watcher.lock().take() {
            handle.abort();
            debug!("Configuration watcher stopped");
        }
    }

    /// Poll the config file's mtime; act only after a debounce-length quiet
    /// window so an edit burst triggers a single reload of the final content
    async fn watch_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut last_seen = modified_at(&self.config_path);
        let mut quiet_since: Option<Instant> = None;

        loop {
            interval.tick().await;

            let current = modified_at(&self.config_path);
            if current != last_seen {
                last_seen = current;
                // restart the quiet window
                quiet_since = Some(Instant::now());
                debug!("Configuration change observed, debouncing");
            }

            if let Some(since) = quiet_since {
                if since.elapsed() >= self.debounce_window {
                    quiet_since = None;
                    self.handle_config_change().await;
                }
            }
        }
    }

    /// React to a settled configuration edit
    ///
    /// An unreadable or invalid file is logged and ignored; the previous
    /// configuration stays live. An `autoTTL`-only change flips the shared
    /// hint without touching the backend.
    async fn handle_config_change(&self) {
        let new_config = match CacheConfig::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring configuration change: {e}");
                return;
            }
        };

        let Some(current) = self.current_config().await else {
            // watcher running before first acquire; nothing to swap yet
            return;
        };

        if !current.requires_migration(&new_config) {
            if current.auto_ttl != new_config.auto_ttl {
                info!("autoTTL switched to {}", new_config.auto_ttl);
                self.ttl_hint.set_enabled(new_config.auto_ttl);
            }
            let mut state = self.state.write().await;
            match &mut *state {
                ManagerState::Active { config, .. } | ManagerState::Migrating { config, .. } => {
                    *config = new_config;
                }
                ManagerState::Uninitialized => {}
            }
            return;
        }

        self.migrate(new_config).await;
    }

    /// Online migration to a new backend
    ///
    /// Best-effort by design: copy failures are logged and do not stop the
    /// cutover, so a failed copy phase still swaps traffic onto the (possibly
    /// mostly empty) new backend. There is no rollback and no atomicity
    /// across keys. Writes landing on the old adapter after enumeration are
    /// not re-copied — a known race under the best-effort consistency model.
    async fn migrate(&self, new_config: CacheConfig) {
        let old_adapter = {
            let mut state = self.state.write().await;
            let (adapter, config) = match &*state {
                ManagerState::Active { adapter, config }
                | ManagerState::Migrating { adapter, config } => {
                    (adapter.clone(), config.clone())
                }
                ManagerState::Uninitialized => return,
            };
            *state = ManagerState::Migrating {
                adapter: adapter.clone(),
                config,
            };
            adapter
        };

        info!(
            "Migrating cache backend to {} at {}",
            new_config.backend, new_config.url
        );

        let new_adapter = match self.factory.build(&new_config, self.ttl_hint.clone()).await {
            Ok(adapter) => adapter,
            Err(e) => {
                // cutting over to nothing serves nobody; keep the old backend
                error!("Cannot build replacement backend, keeping current: {e}");
                let mut state = self.state.write().await;
                if let ManagerState::Migrating { adapter, config } =
                    std::mem::replace(&mut *state, ManagerState::Uninitialized)
                {
                    *state = ManagerState::Active { adapter, config };
                }
                return;
            }
        };

        let report = copy_entries(old_adapter.as_ref(), new_adapter.as_ref()).await;
        info!(
            "Migration copy finished: {}/{} copied, {} skipped, {} failed",
            report.copied, report.total, report.skipped, report.failed
        );

        old_adapter.disconnect().await;

        self.ttl_hint.set_enabled(new_config.auto_ttl);
        let mut state = self.state.write().await;
        *state = ManagerState::Active {
            adapter: new_adapter,
            config: new_config,
        };
        info!("Migration complete, traffic cut over");
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

/// Copy every key visible to `source` into `target`
///
/// Keys whose read comes back empty are skipped. Per-key write failures and
/// enumeration failures are logged and swallowed (fail-open): migration never
/// aborts the cutover.
pub async fn copy_entries(
    source: &dyn CacheAdapter,
    target: &dyn CacheAdapter,
) -> MigrationReport {
    let keys = match source.keys().await {
        Ok(keys) => keys,
        Err(e) => {
            warn!("Migration key enumeration failed, nothing copied: {e}");
            return MigrationReport::default();
        }
    };

    let mut report = MigrationReport {
        total: keys.len(),
        ..MigrationReport::default()
    };
    for key in keys {
        let Some(value) = source.get(&key).await else {
            debug!("Migration skipping {key}: read came back empty");
            report.skipped += 1;
            continue;
        };
        match target.set(&key, &value, None).await {
            Ok(()) => report.copied += 1,
            Err(e) => {
                warn!("Migration copy of {key} failed, continuing: {e}");
                report.failed += 1;
            }
        }
    }
    report
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
