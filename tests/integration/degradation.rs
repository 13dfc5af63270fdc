//! Behavior with a broken cache or store.

use std::sync::Arc;

use cluster_catalog::cache::InMemoryCache;
use cluster_catalog::config::CatalogConfig;
use cluster_catalog::core::{CatalogError, NewTemplate, TemplateUpdate};
use cluster_catalog::query::TemplateFilter;
use cluster_catalog::service::TemplateService;
use cluster_catalog::store::InMemoryStore;
use cluster_catalog::test_utils::{FailingCache, FlakyStore};

/// With the cache down every operation still succeeds against the store.
#[tokio::test]
async fn test_failing_cache_is_transparent() {
    let cache = Arc::new(FailingCache::new());
    let svc = TemplateService::new(
        Arc::new(InMemoryStore::new()),
        cache.clone(),
        &CatalogConfig::default(),
    );

    let a = svc.create(NewTemplate::new("A", "").with_segment("x")).await.unwrap();
    let b = svc.create(NewTemplate::new("B", "").with_segment("x")).await.unwrap();
    svc.set_dependencies(a, &[b]).await.unwrap();
    assert_eq!(svc.list(&TemplateFilter::all().segment("x")).await.unwrap(), vec![a, b]);
    assert_eq!(svc.get(a).await.unwrap().dependencies, vec![b]);

    let err = svc.set_dependencies(b, &[a]).await.unwrap_err();
    assert!(matches!(err, CatalogError::CycleDetected { .. }));

    let update = TemplateUpdate {
        name: Some("C".to_string()),
        ..TemplateUpdate::default()
    };
    svc.update(a, update).await.unwrap();
    assert_eq!(svc.get(a).await.unwrap().template.name, "C");

    svc.delete(b).await.unwrap();
    assert_eq!(svc.list(&TemplateFilter::all()).await.unwrap(), vec![a]);
    assert!(cache.calls() > 0);
}

/// Store failures are surfaced as retryable errors, never as empty results.
#[tokio::test]
async fn test_store_outage_is_reported() {
    let store = Arc::new(FlakyStore::new());
    let svc = TemplateService::new(
        store.clone(),
        Arc::new(InMemoryCache::new()),
        &CatalogConfig::default(),
    );
    let a = svc.create(NewTemplate::new("A", "")).await.unwrap();
    let b = svc.create(NewTemplate::new("B", "")).await.unwrap();

    store.set_down(true);
    let err = svc.list(&TemplateFilter::all().segment("never-cached")).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, CatalogError::StoreUnavailable { .. }));
    assert!(svc.set_dependencies(a, &[b]).await.unwrap_err().is_retryable());
    assert!(svc.create(NewTemplate::new("C", "")).await.unwrap_err().is_retryable());

    store.set_down(false);
    assert!(svc.get(a).await.unwrap().dependencies.is_empty());
    svc.set_dependencies(a, &[b]).await.unwrap();
    assert_eq!(svc.get(a).await.unwrap().dependencies, vec![b]);
}

/// A listing cached before an outage is still served; the store is not consulted.
#[tokio::test]
async fn test_cached_listing_survives_store_outage() {
    let store = Arc::new(FlakyStore::new());
    let svc = TemplateService::new(
        store.clone(),
        Arc::new(InMemoryCache::new()),
        &CatalogConfig::default(),
    );
    let a = svc.create(NewTemplate::new("A", "")).await.unwrap();
    assert_eq!(svc.list(&TemplateFilter::all()).await.unwrap(), vec![a]);

    store.set_down(true);
    assert_eq!(svc.list(&TemplateFilter::all()).await.unwrap(), vec![a]);
}

/// Reading the version counter directly reports the outage instead of hiding it.
#[tokio::test]
async fn test_cache_version_reports_outage() {
    let svc = TemplateService::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(FailingCache::new()),
        &CatalogConfig::default(),
    );
    svc.create(NewTemplate::new("A", "")).await.unwrap();

    let err = svc.cache_version().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(
        err,
        CatalogError::CacheUnavailable {
            operation: "get_counter".to_string(),
            reason: "connection refused".to_string(),
        }
    );
}
