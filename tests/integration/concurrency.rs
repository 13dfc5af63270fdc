//! Racing writers.

use std::sync::Arc;
use std::thread;

use cluster_catalog::cache::{Cache, EntityType, InMemoryCache, VersionedCache};
use cluster_catalog::config::CatalogConfig;
use cluster_catalog::core::{CatalogError, NewTemplate, TemplateId};
use cluster_catalog::service::TemplateService;

async fn service_with(names: &[&str]) -> (Arc<TemplateService>, Vec<TemplateId>) {
    let svc = TemplateService::in_memory(&CatalogConfig::default());
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        ids.push(svc.create(NewTemplate::new(*name, "")).await.unwrap());
    }
    (Arc::new(svc), ids)
}

/// Two requests that are each acyclic alone but cyclic together: at most one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposing_edges_never_both_commit() {
    for _ in 0..50 {
        let (svc, ids) = service_with(&["A", "B"]).await;
        let (a, b) = (ids[0], ids[1]);

        let first = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.set_dependencies(a, &[b]).await })
        };
        let second = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.set_dependencies(b, &[a]).await })
        };
        let results = [first.await.unwrap(), second.await.unwrap()];

        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        assert!(results.iter().any(|r| matches!(r, Err(CatalogError::CycleDetected { .. }))));
        assert!(svc.topological_order().await.is_ok());
    }
}

/// A ring split across tasks: every edge but one can commit.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ring_of_writers_leaves_acyclic_graph() {
    let names: Vec<String> = (0..8).map(|i| format!("R{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let (svc, ids) = service_with(&refs).await;

    let handles: Vec<_> = (0..ids.len())
        .map(|i| {
            let svc = Arc::clone(&svc);
            let from = ids[i];
            let to = ids[(i + 1) % ids.len()];
            tokio::spawn(async move { svc.set_dependencies(from, &[to]).await })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            committed += 1;
        }
    }
    assert_eq!(committed, ids.len() - 1);
    assert!(svc.topological_order().await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_same_name() {
    let svc = Arc::new(TemplateService::in_memory(&CatalogConfig::default()));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.create(NewTemplate::new("Pump", "")).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert!(matches!(e, CatalogError::DuplicateName { .. })),
        }
    }
    assert_eq!(created, 1);
}

/// N threads bumping once each never lose an increment.
#[test]
fn test_version_bumps_from_threads_are_not_lost() {
    let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
    let versioned = VersionedCache::new(Arc::clone(&cache), "");
    let runtime = Arc::new(tokio::runtime::Runtime::new().unwrap());

    let handles: Vec<_> = (0..24)
        .map(|_| {
            let versioned = versioned.clone();
            let runtime = Arc::clone(&runtime);
            thread::spawn(move || runtime.block_on(versioned.bump_version(EntityType::Template)))
        })
        .collect();

    let mut seen: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (1..=24).collect::<Vec<_>>());
    assert_eq!(runtime.block_on(versioned.current_version(EntityType::Template)).unwrap(), 24);
}
