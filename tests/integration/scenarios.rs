//! End-to-end catalog workflows.

use cluster_catalog::config::CatalogConfig;
use cluster_catalog::core::{CatalogError, NewTemplate};
use cluster_catalog::query::TemplateFilter;
use cluster_catalog::service::TemplateService;
use cluster_catalog::test_utils::{PlantFixture, init_test_logging};

fn service() -> TemplateService {
    init_test_logging(None);
    TemplateService::in_memory(&CatalogConfig::default())
}

/// A → B, B → C, then C → A must fail with the full cycle and leave C alone.
#[tokio::test]
async fn test_closing_a_cycle_is_rejected() {
    let svc = service();
    let a = svc.create(NewTemplate::new("A", "")).await.unwrap();
    let b = svc.create(NewTemplate::new("B", "")).await.unwrap();
    let c = svc.create(NewTemplate::new("C", "")).await.unwrap();

    svc.set_dependencies(a, &[b]).await.unwrap();
    svc.set_dependencies(b, &[c]).await.unwrap();

    let err = svc.set_dependencies(c, &[a]).await.unwrap_err();
    assert_eq!(
        err,
        CatalogError::CycleDetected {
            path: vec![c, a, b, c]
        }
    );
    assert!(err.is_invalid_input());
    assert!(svc.get(c).await.unwrap().dependencies.is_empty());
}

/// An empty filtered list is cached, and a create under that filter is visible next time.
#[tokio::test]
async fn test_empty_listing_invalidated_by_create() {
    let svc = service();
    let filter = TemplateFilter::all().segment("x");

    assert!(svc.list(&filter).await.unwrap().is_empty());
    // Second call is served from the cached empty result
    assert!(svc.list(&filter).await.unwrap().is_empty());

    let id = svc.create(NewTemplate::new("New", "").with_segment("x")).await.unwrap();
    assert_eq!(svc.list(&filter).await.unwrap(), vec![id]);
}

/// Deleting a dependency removes it from the dependent's live dependency list.
#[tokio::test]
async fn test_delete_dependency_drops_edge() {
    let svc = service();
    let a = svc.create(NewTemplate::new("A", "")).await.unwrap();
    let b = svc.create(NewTemplate::new("B", "")).await.unwrap();
    svc.set_dependencies(a, &[b]).await.unwrap();
    assert_eq!(svc.get(a).await.unwrap().dependencies, vec![b]);

    svc.delete(b).await.unwrap();

    assert!(svc.get(a).await.unwrap().dependencies.is_empty());
    assert_eq!(svc.get(b).await, Err(CatalogError::template_not_found(b)));
}

#[tokio::test]
async fn test_plant_views() {
    let plant = PlantFixture::new().await;
    let svc = &plant.service;

    assert_eq!(
        svc.dependency_order(plant.pump).await.unwrap(),
        vec![plant.valve, plant.motor, plant.pump]
    );
    assert_eq!(
        svc.dependency_tree(plant.pump).await.unwrap(),
        format!(
            "Pump (#{p})\n├── Motor (#{m})\n│   └── Valve (#{v})\n└── Valve (#{v})\n",
            p = plant.pump,
            m = plant.motor,
            v = plant.valve
        )
    );
    assert_eq!(
        svc.segment_counts().await.unwrap(),
        vec![("Water".to_string(), 3), ("Power".to_string(), 1)]
    );

    let order = svc.topological_order().await.unwrap();
    let position = |id| order.iter().position(|x| *x == id).unwrap();
    assert!(position(plant.valve) < position(plant.motor));
    assert!(position(plant.motor) < position(plant.pump));
    assert!(order.contains(&plant.heater));
}

#[tokio::test]
async fn test_full_replace_semantics() {
    let plant = PlantFixture::new().await;
    let svc = &plant.service;

    let change = svc.set_dependencies(plant.pump, &[plant.heater]).await.unwrap();
    assert!(change.changed);
    assert_eq!(change.dependencies, vec![plant.heater]);
    assert_eq!(svc.get(plant.pump).await.unwrap().dependencies, vec![plant.heater]);

    let cleared = svc.set_dependencies(plant.pump, &[]).await.unwrap();
    assert!(cleared.dependencies.is_empty());
    assert!(svc.get(plant.pump).await.unwrap().dependencies.is_empty());
}

#[tokio::test]
async fn test_missing_dependency_rejected_without_commit() {
    let plant = PlantFixture::new().await;
    let missing = cluster_catalog::core::TemplateId(9_999);

    let err = plant.service.set_dependencies(plant.heater, &[plant.valve, missing]).await;
    assert_eq!(err, Err(CatalogError::template_not_found(missing)));
    assert!(plant.service.get(plant.heater).await.unwrap().dependencies.is_empty());
}
