//! Graph-level properties over many operations.

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use cluster_catalog::cache::Cache;
use cluster_catalog::config::{BumpPolicy, CatalogConfig, SelfReferencePolicy};
use cluster_catalog::core::{CatalogError, NewTemplate, TemplateId};
use cluster_catalog::service::TemplateService;
use cluster_catalog::test_utils::PlantFixture;

const POOL: usize = 12;
const OPERATIONS: usize = 400;

/// Acyclicity checked with an independent graph built from the stored edges.
fn assert_acyclic(edges: &[(TemplateId, TemplateId)]) {
    let mut graph = DiGraph::<TemplateId, ()>::new();
    let mut nodes = HashMap::new();
    for (from, to) in edges {
        let a = *nodes.entry(*from).or_insert_with(|| graph.add_node(*from));
        let b = *nodes.entry(*to).or_insert_with(|| graph.add_node(*to));
        graph.add_edge(a, b, ());
    }
    assert!(toposort(&graph, None).is_ok(), "stored graph has a cycle: {edges:?}");
}

#[tokio::test]
async fn test_random_operations_keep_graph_acyclic() {
    for seed in [7_u64, 42, 1_234] {
        let svc = TemplateService::in_memory(&CatalogConfig::default());
        let mut ids = Vec::with_capacity(POOL);
        for i in 0..POOL {
            ids.push(svc.create(NewTemplate::new(format!("T{i}"), "")).await.unwrap());
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut rejected = 0;
        for _ in 0..OPERATIONS {
            let target = ids[rng.gen_range(0..POOL)];
            let count = rng.gen_range(0..4);
            let deps: Vec<TemplateId> = (0..count).map(|_| ids[rng.gen_range(0..POOL)]).collect();

            match svc.set_dependencies(target, &deps).await {
                Ok(change) => assert!(!change.dependencies.contains(&target)),
                Err(CatalogError::CycleDetected {
                    path,
                }) => {
                    rejected += 1;
                    assert_eq!(path.first(), Some(&target));
                    assert_eq!(path.last(), Some(&target));
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let snapshot = svc.graph().snapshot_all().await.unwrap();
        let edges: Vec<_> = snapshot.edges().collect();
        assert_acyclic(&edges);
        assert!(svc.topological_order().await.is_ok());
        assert!(rejected > 0, "seed {seed} never exercised the detector");
    }
}

#[tokio::test]
async fn test_self_reference_stripped_by_default() {
    let plant = PlantFixture::new().await;
    let change = plant.service.set_dependencies(plant.heater, &[plant.heater, plant.valve]).await;
    assert_eq!(change.unwrap().dependencies, vec![plant.valve]);

    let change = plant.service.set_dependencies(plant.valve, &[plant.valve]).await.unwrap();
    assert!(change.dependencies.is_empty());
    assert!(plant.service.get(plant.valve).await.unwrap().dependencies.is_empty());
}

#[tokio::test]
async fn test_self_reference_rejected_when_configured() {
    let mut config = CatalogConfig::default();
    config.graph.self_reference = SelfReferencePolicy::Reject;
    let plant = PlantFixture::with_config(&config).await;

    let err = plant.service.set_dependencies(plant.heater, &[plant.valve, plant.heater]).await;
    assert_eq!(
        err,
        Err(CatalogError::CycleDetected {
            path: vec![plant.heater, plant.heater]
        })
    );
    assert!(plant.service.get(plant.heater).await.unwrap().dependencies.is_empty());
}

async fn version(plant: &PlantFixture) -> u64 {
    plant.cache.get_counter("cluster_templates:version").await.unwrap()
}

#[tokio::test]
async fn test_repeated_set_bumps_once_on_change() {
    let plant = PlantFixture::new().await;
    let deps = [plant.valve, plant.motor];

    let first = plant.service.set_dependencies(plant.heater, &deps).await.unwrap();
    let after_first = version(&plant).await;
    let second = plant.service.set_dependencies(plant.heater, &deps).await.unwrap();

    assert!(first.changed);
    assert!(!second.changed);
    assert_eq!(first.dependencies, second.dependencies);
    assert_eq!(version(&plant).await, after_first);
}

#[tokio::test]
async fn test_repeated_set_bumps_every_time_when_configured() {
    let mut config = CatalogConfig::default();
    config.graph.bump_policy = BumpPolicy::Always;
    let plant = PlantFixture::with_config(&config).await;
    let deps = [plant.valve];

    plant.service.set_dependencies(plant.heater, &deps).await.unwrap();
    let after_first = version(&plant).await;
    let second = plant.service.set_dependencies(plant.heater, &deps).await.unwrap();

    assert!(!second.changed);
    assert_eq!(second.dependencies, vec![plant.valve]);
    assert_eq!(version(&plant).await, after_first + 1);
}
