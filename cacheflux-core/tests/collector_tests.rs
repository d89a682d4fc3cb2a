// Metrics Collector Tests
// End-to-end over mock adapters: sampling cadence, sink appends and the
// adaptive-TTL feedback loop.


use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cacheflux_core::{CacheManager, MetricsCollector, MetricsSink};
use mock_adapter::MockFactory;

fn write_config(path: &Path, auto_ttl: bool) {
    let content = serde_json::to_string(&json!({
        "type": "redis",
        "url": "127.0.0.1:6379",
        "autoTTL": auto_ttl,
    }))
    .unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn samples_land_in_the_sink() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("cache-config.json");
    write_config(&config_path, false);

    let factory = MockFactory::default();
    let manager = Arc::new(CacheManager::with_factory(
        &config_path,
        Box::new(factory.clone()),
    ));
    manager.acquire().await.unwrap();

    let sink = MetricsSink::new(dir.path().join("metrics.json"));
    let handle = MetricsCollector::new(manager.clone(), sink.clone())
        .with_interval(Duration::from_millis(30))
        .start();

    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.abort();
    manager.stop_watching();

    assert!(
        sink.read_entries().len() >= 2,
        "expected several samples, got {}",
        sink.read_entries().len()
    );
}

#[tokio::test]
async fn no_active_adapter_means_no_samples() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("cache-config.json");
    write_config(&config_path, false);

    // never acquired: manager stays uninitialized
    let manager = Arc::new(CacheManager::with_factory(
        &config_path,
        Box::new(MockFactory::default()),
    ));

    let sink = MetricsSink::new(dir.path().join("metrics.json"));
    let handle = MetricsCollector::new(manager, sink.clone())
        .with_interval(Duration::from_millis(20))
        .start();

    tokio::time::sleep(Duration::from_millis(120)).await;
    handle.abort();

    assert!(sink.read_entries().is_empty());
}

#[tokio::test]
async fn collector_feeds_the_adaptive_ttl_hint() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("cache-config.json");
    write_config(&config_path, true);

    let factory = MockFactory::default();
    let manager = Arc::new(CacheManager::with_factory(
        &config_path,
        Box::new(factory.clone()),
    ));
    manager.acquire().await.unwrap();
    assert!(manager.ttl_hint().is_enabled());
    assert_eq!(manager.ttl_hint().suggestion(), None);

    let sink = MetricsSink::new(dir.path().join("metrics.json"));
    let handle = MetricsCollector::new(manager.clone(), sink)
        .with_interval(Duration::from_millis(20))
        .start();

    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.abort();
    manager.stop_watching();

    // mock snapshots are all zeros, so the model floors the prediction
    assert_eq!(manager.ttl_hint().suggestion(), Some(60));
}
