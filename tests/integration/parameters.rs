//! Parameter counts and cached parameter listings.

use cluster_catalog::core::{AssignmentUpdate, CatalogError, NewParameter, ParameterId};
use cluster_catalog::test_utils::PlantFixture;

#[tokio::test]
async fn test_parameter_count_tracks_adds_and_removes() {
    let plant = PlantFixture::new().await;
    let svc = &plant.service;

    let added = svc
        .add_parameters(vec![
            NewParameter::new(plant.pump, "Speed", "REAL").at(1),
            NewParameter::new(plant.pump, "Run", "BOOL").at(2),
            NewParameter::new(plant.motor, "Current", "REAL"),
        ])
        .await
        .unwrap();
    assert_eq!(added.len(), 3);
    assert_eq!(svc.get(plant.pump).await.unwrap().template.parameter_count, 2);
    assert_eq!(svc.get(plant.motor).await.unwrap().template.parameter_count, 1);

    svc.remove_parameter(added[0].id).await.unwrap();
    assert_eq!(svc.get(plant.pump).await.unwrap().template.parameter_count, 1);

    let names: Vec<String> =
        svc.list_parameters(plant.pump).await.unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Run"]);
}

#[tokio::test]
async fn test_bulk_assignment_validates_before_writing() {
    let plant = PlantFixture::new().await;
    let svc = &plant.service;
    let speed = svc.add_parameter(NewParameter::new(plant.pump, "Speed", "REAL")).await.unwrap();
    let current = svc.add_parameter(NewParameter::new(plant.motor, "Current", "REAL")).await.unwrap();

    // Warm both listings
    svc.list_parameters(plant.pump).await.unwrap();
    svc.list_parameters(plant.motor).await.unwrap();

    let missing = ParameterId(4_242);
    let err = svc
        .bulk_update_assignments(
            vec![
                AssignmentUpdate {
                    id: speed.id,
                    assignment_value: Some("DB10.DBD0".to_string()),
                },
                AssignmentUpdate {
                    id: missing,
                    assignment_value: None,
                },
            ],
            "operator",
        )
        .await;
    assert_eq!(
        err,
        Err(CatalogError::NotFound {
            entity: "parameter",
            id: missing.0
        })
    );
    assert_eq!(svc.list_parameters(plant.pump).await.unwrap()[0].assignment_value, None);

    let updated = svc
        .bulk_update_assignments(
            vec![
                AssignmentUpdate {
                    id: speed.id,
                    assignment_value: Some("DB10.DBD0".to_string()),
                },
                AssignmentUpdate {
                    id: current.id,
                    assignment_value: Some("DB11.DBD4".to_string()),
                },
            ],
            "operator",
        )
        .await
        .unwrap();
    assert_eq!(updated, 2);
    assert_eq!(
        svc.list_parameters(plant.pump).await.unwrap()[0].assignment_value.as_deref(),
        Some("DB10.DBD0")
    );
    assert_eq!(
        svc.list_parameters(plant.motor).await.unwrap()[0].assignment_value.as_deref(),
        Some("DB11.DBD4")
    );
}

#[tokio::test]
async fn test_parameters_of_missing_template() {
    let plant = PlantFixture::new().await;
    plant.service.delete(plant.heater).await.unwrap();

    assert_eq!(
        plant.service.add_parameter(NewParameter::new(plant.heater, "Power", "REAL")).await,
        Err(CatalogError::template_not_found(plant.heater))
    );
    assert_eq!(
        plant.service.list_parameters(plant.heater).await,
        Err(CatalogError::template_not_found(plant.heater))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_adds_racing_template_delete() {
    let plant = PlantFixture::new().await;
    let service = std::sync::Arc::new(plant.service);
    service.add_parameter(NewParameter::new(plant.pump, "Speed", "REAL")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..32 {
        let service = std::sync::Arc::clone(&service);
        let heater = plant.heater;
        handles.push(tokio::spawn(async move {
            service
                .add_parameter(NewParameter::new(heater, format!("Zone{i}"), "REAL"))
                .await
                .map(|_| ())
        }));
    }
    let deleter = std::sync::Arc::clone(&service);
    let heater = plant.heater;
    handles.insert(16, tokio::spawn(async move { deleter.delete(heater).await }));

    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => {}
            Err(err) => assert_eq!(err, CatalogError::template_not_found(plant.heater)),
        }
    }

    // None of the racing adds outlived the heater
    assert_eq!(plant.store.parameter_count(), 1);
    assert_eq!(
        service.list_parameters(plant.heater).await,
        Err(CatalogError::template_not_found(plant.heater))
    );
}
