//! A listing cached before a mutation is never served after it.

use cluster_catalog::cache::{Cache, canonicalize};
use cluster_catalog::config::CatalogConfig;
use cluster_catalog::core::{NewTemplate, TemplateUpdate};
use cluster_catalog::query::TemplateFilter;
use cluster_catalog::store::Store;
use cluster_catalog::test_utils::PlantFixture;

const VERSION_COUNTER: &str = "cluster_templates:version";

#[tokio::test]
async fn test_every_mutation_bumps_and_refreshes_listing() {
    let plant = PlantFixture::new().await;
    let svc = &plant.service;
    let water = TemplateFilter::all().segment("Water");

    let mut before = svc.list(&water).await.unwrap();
    let mut version = plant.cache.get_counter(VERSION_COUNTER).await.unwrap();

    // create
    let tank = svc.create(NewTemplate::new("Tank", "").with_segment("Water")).await.unwrap();
    let after = svc.list(&water).await.unwrap();
    assert_ne!(after, before);
    assert!(after.contains(&tank));
    assert!(plant.cache.get_counter(VERSION_COUNTER).await.unwrap() > version);
    before = after;
    version = plant.cache.get_counter(VERSION_COUNTER).await.unwrap();

    // update moving a template out of the segment
    let update = TemplateUpdate {
        segment: Some("Power".to_string()),
        ..TemplateUpdate::default()
    };
    svc.update(tank, update).await.unwrap();
    let after = svc.list(&water).await.unwrap();
    assert_ne!(after, before);
    assert!(!after.contains(&tank));
    assert!(plant.cache.get_counter(VERSION_COUNTER).await.unwrap() > version);
    before = after;
    version = plant.cache.get_counter(VERSION_COUNTER).await.unwrap();

    // delete
    svc.delete(plant.motor).await.unwrap();
    let after = svc.list(&water).await.unwrap();
    assert_ne!(after, before);
    assert!(!after.contains(&plant.motor));
    assert!(plant.cache.get_counter(VERSION_COUNTER).await.unwrap() > version);
    version = plant.cache.get_counter(VERSION_COUNTER).await.unwrap();

    // dependency change
    svc.set_dependencies(plant.heater, &[plant.valve]).await.unwrap();
    assert!(plant.cache.get_counter(VERSION_COUNTER).await.unwrap() > version);
}

#[tokio::test]
async fn test_rename_reorders_cached_listing() {
    let plant = PlantFixture::new().await;
    let svc = &plant.service;
    let all = TemplateFilter::all();

    // Heater, Motor, Pump, Valve
    assert_eq!(
        svc.list(&all).await.unwrap(),
        vec![plant.heater, plant.motor, plant.pump, plant.valve]
    );

    let update = TemplateUpdate {
        name: Some("Zone Heater".to_string()),
        ..TemplateUpdate::default()
    };
    svc.update(plant.heater, update).await.unwrap();
    assert_eq!(
        svc.list(&all).await.unwrap(),
        vec![plant.motor, plant.pump, plant.valve, plant.heater]
    );
}

#[tokio::test]
async fn test_filter_order_does_not_change_key() {
    let plant = PlantFixture::new().await;
    let svc = &plant.service;

    let one = TemplateFilter::all().segment("Water").block_type("FB");
    let other = TemplateFilter::all().block_type("FB").segment("Water");
    assert_eq!(svc.list(&one).await.unwrap(), vec![plant.motor, plant.pump]);
    assert_eq!(svc.list(&other).await.unwrap(), vec![plant.motor, plant.pump]);

    let version = plant.cache.get_counter(VERSION_COUNTER).await.unwrap();
    assert!(plant.cache.contains_key(&format!(
        "cluster_templates:v{version}:block_type=FB&segment=Water"
    )));
    assert_eq!(
        canonicalize([("b", "2"), ("a", "1")]),
        canonicalize([("a", "1"), ("b", "2")])
    );
}

#[tokio::test]
async fn test_ttl_expiry_refetches() {
    let mut config = CatalogConfig::default();
    config.cache.list_ttl_secs = 1;
    let plant = PlantFixture::with_config(&config).await;
    let all = TemplateFilter::all();

    assert_eq!(plant.service.list(&all).await.unwrap().len(), 4);
    // Bypass the service so no version bump happens
    plant.store.insert_template(NewTemplate::new("Orphan", "")).await.unwrap();
    assert_eq!(plant.service.list(&all).await.unwrap().len(), 4);

    tokio::time::sleep(std::time::Duration::from_millis(1_100)).await;
    assert_eq!(plant.service.list(&all).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_unvalidated_huge_ttl_still_serves_listings() {
    let mut config = CatalogConfig::default();
    config.cache.list_ttl_secs = u64::MAX;
    config.cache.instance_ttl_secs = u64::MAX;
    let plant = PlantFixture::with_config(&config).await;
    let all = TemplateFilter::all();

    assert_eq!(plant.service.list(&all).await.unwrap().len(), 4);
    assert_eq!(plant.service.list(&all).await.unwrap().len(), 4);
    assert_eq!(plant.service.get(plant.pump).await.unwrap().template.name, "Pump");
    assert!(plant.cache.stats().hits >= 1);
}
