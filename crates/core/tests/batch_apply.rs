use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aguaruta_core::engine::{ApplyFlags, BatchApplier};
use aguaruta_core::merge::ConflictPolicy;
use aguaruta_core::point::NewDeliveryPoint;
use aguaruta_core::report::ApplyOutcome;
use aguaruta_core::roster::VehicleRoster;
use aguaruta_core::source::{BatchSource, DocumentSource};
use aguaruta_core::store::{DeliveryStore, MemoryDeliveryStore};
use aguaruta_core::validation::RejectReason;
use serde_json::{json, Value};
use tokio::sync::Mutex;

fn applier() -> BatchApplier {
    BatchApplier::new(VehicleRoster::default())
}

fn protected_point(name: &str) -> NewDeliveryPoint {
    NewDeliveryPoint {
        vehicle: "M3".to_string(),
        name: name.to_string(),
        day: Some("VIERNES".to_string()),
        liters: 1200,
        phone: Some("+56 9 8765 4321".to_string()),
        latitude: Some(-33.02),
        longitude: Some(-71.55),
    }
}

fn legacy_point(name: &str) -> NewDeliveryPoint {
    NewDeliveryPoint {
        vehicle: "A4".to_string(),
        name: name.to_string(),
        day: Some("LUNES".to_string()),
        liters: 300,
        phone: None,
        latitude: None,
        longitude: None,
    }
}

fn batch() -> Vec<Value> {
    vec![
        json!({ "Camión": "a1", "Nombre": "Ana Soto", "Día": "lunes", "Litros": "500" }),
        json!({ "camion": "A2", "nombre": "Beto Rojas", "dia": "MAR", "litros": 250,
                "latitud": "-33,04", "longitud": "-71,60" }),
        json!({ "vehiculo": "A3", "name": "Carla Díaz", "day": "miércoles", "liters": "120,9" }),
    ]
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mixed_batch_reports_each_rejection_reason() {
    let store = MemoryDeliveryStore::new();
    let records = vec![
        json!({ "camion": "A1", "nombre": "Ana", "dia": "LUNES", "litros": 100 }),
        json!({ "camion": "A1", "nombre": "   ", "dia": "LUNES", "litros": 100 }),
        json!({ "camion": "M3", "nombre": "Beto", "dia": "LUNES", "litros": 100 }),
    ];

    let report = applier().apply(&store, &records, ApplyFlags::default()).await;

    assert!(report.ok);
    assert_eq!(report.read, 3);
    assert_eq!(report.validated, 1);
    assert_eq!(report.omitted, 2);
    assert_eq!(report.motivos.len(), 2);
    assert_eq!(report.motivos[&RejectReason::MissingName], 1);
    assert_eq!(report.motivos[&RejectReason::ProtectedVehicle], 1);
    assert_eq!(report.samples.len(), 2);
    assert_eq!(store.rows().await.len(), 1);
}

#[tokio::test]
async fn report_serializes_with_reason_codes() {
    let store = MemoryDeliveryStore::new();
    let records = vec![json!({ "camion": "A1", "dia": "LUNES", "litros": 100 })];
    let flags = ApplyFlags {
        replace: false,
        ..Default::default()
    };

    let report = applier().apply(&store, &records, flags).await;
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["outcome"], json!("appended"));
    assert_eq!(value["motivos"], json!({ "sin_nombre": 1 }));
    assert_eq!(value["samples"][0]["reason"], json!("sin_nombre"));
}

// ---------------------------------------------------------------------------
// Replace semantics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn replace_clears_table_and_normalizes_rows() {
    let store = MemoryDeliveryStore::with_points([legacy_point("Viejo 1"), legacy_point("Viejo 2")]);

    let report = applier().apply(&store, &batch(), ApplyFlags::default()).await;

    assert!(report.ok, "{}", report.message);
    assert_eq!(report.outcome, ApplyOutcome::Replaced);
    assert_eq!(report.inserted, 3);

    let rows = store.rows().await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| !r.name.starts_with("Viejo")));

    let beto = rows.iter().find(|r| r.name == "Beto Rojas").unwrap();
    assert_eq!(beto.vehicle, "A2");
    assert_eq!(beto.day.as_deref(), Some("MARTES"));
    assert_eq!(beto.coordinates(), Some((-33.04, -71.60)));

    let carla = rows.iter().find(|r| r.name == "Carla Díaz").unwrap();
    assert_eq!(carla.day.as_deref(), Some("MIERCOLES"));
    assert_eq!(carla.liters, 120);
}

#[tokio::test]
async fn applying_the_same_batch_twice_is_idempotent() {
    let store = MemoryDeliveryStore::with_points([protected_point("Hospital")]);
    let applier = applier();

    applier.apply(&store, &batch(), ApplyFlags::default()).await;
    let first: Vec<_> = store.rows().await.into_iter().map(|r| (r.name, r.vehicle, r.day, r.liters)).collect();

    applier.apply(&store, &batch(), ApplyFlags::default()).await;
    let second: Vec<_> = store.rows().await.into_iter().map(|r| (r.name, r.vehicle, r.day, r.liters)).collect();

    assert_eq!(first, second);
    assert_eq!(second.len(), 4);
}

#[tokio::test]
async fn protected_rows_survive_replace_unchanged() {
    let store = MemoryDeliveryStore::with_points([
        protected_point("Hospital"),
        legacy_point("Viejo"),
        protected_point("Escuela"),
    ]);
    let before: Vec<_> = store.rows().await.into_iter().filter(|r| r.vehicle == "M3").collect();

    let report = applier().apply(&store, &batch(), ApplyFlags::default()).await;
    assert_eq!(report.preserved_protected, 2);

    let after: Vec<_> = store.rows().await.into_iter().filter(|r| r.vehicle == "M3").collect();
    assert_eq!(before, after);
    assert_eq!(store.rows().await.len(), 5);
}

#[tokio::test]
async fn protected_rows_are_dropped_when_not_preserved() {
    let store = MemoryDeliveryStore::with_points([protected_point("Hospital")]);
    let flags = ApplyFlags {
        preserve_protected: false,
        ..Default::default()
    };

    let report = applier().apply(&store, &batch(), flags).await;

    assert_eq!(report.preserved_protected, 0);
    assert!(store.rows().await.iter().all(|r| r.vehicle != "M3"));
}

#[tokio::test]
async fn append_keeps_existing_rows() {
    let store = MemoryDeliveryStore::with_points([legacy_point("Viejo")]);
    let flags = ApplyFlags {
        replace: false,
        ..Default::default()
    };

    let report = applier().apply(&store, &batch(), flags).await;

    assert_eq!(report.outcome, ApplyOutcome::Appended);
    assert_eq!(store.rows().await.len(), 4);
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_batch_leaves_store_untouched_under_guard() {
    let store = MemoryDeliveryStore::with_points([legacy_point("Viejo"), protected_point("Hospital")]);
    let before = store.rows().await;
    let records = vec![json!({ "camion": "Z9", "nombre": "Nadie", "dia": "LUNES", "litros": 1 })];

    let report = applier().apply(&store, &records, ApplyFlags::default()).await;

    assert!(!report.ok);
    assert_eq!(report.outcome, ApplyOutcome::SkippedEmpty);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.motivos[&RejectReason::UnknownVehicle], 1);
    assert_eq!(store.rows().await, before);
}

#[tokio::test]
async fn empty_batch_clears_table_when_guard_disabled() {
    let store = MemoryDeliveryStore::with_points([legacy_point("Viejo"), protected_point("Hospital")]);
    let flags = ApplyFlags {
        replace_only_if_nonempty: false,
        ..Default::default()
    };

    let report = applier().apply(&store, &[], flags).await;

    assert!(report.ok);
    assert_eq!(report.outcome, ApplyOutcome::Replaced);
    let rows = store.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].vehicle, "M3");
}

// ---------------------------------------------------------------------------
// Merge and conflicts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conflicting_household_keeps_first_assignment_by_default() {
    let store = MemoryDeliveryStore::new();
    let records = vec![
        json!({ "camion": "A1", "nombre": "Ana Soto", "dia": "LUNES", "litros": 100 }),
        json!({ "camion": "A1", "nombre": "ana soto", "dia": "LUNES", "litros": 50 }),
        json!({ "camion": "A2", "nombre": "ANA SOTO", "dia": "JUEVES", "litros": 70 }),
    ];

    let report = applier().apply(&store, &records, ApplyFlags::default()).await;

    assert_eq!(report.validated, 3);
    assert_eq!(report.merged, 1);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].incoming.vehicle, "A2");

    let rows = store.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].vehicle, "A1");
    assert_eq!(rows[0].day.as_deref(), Some("LUNES"));
    assert_eq!(rows[0].liters, 150);
}

#[tokio::test]
async fn last_wins_policy_takes_the_later_assignment() {
    let store = MemoryDeliveryStore::new();
    let records = vec![
        json!({ "camion": "A1", "nombre": "Ana", "dia": "LUNES", "litros": 100 }),
        json!({ "camion": "A2", "nombre": "Ana", "dia": "JUEVES", "litros": 70 }),
    ];

    applier()
        .with_policy(ConflictPolicy::LastWins)
        .apply(&store, &records, ApplyFlags::default())
        .await;

    let rows = store.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].vehicle, "A2");
    assert_eq!(rows[0].liters, 70);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_failure_rolls_back_the_replace() {
    let store = MemoryDeliveryStore::with_points([legacy_point("Viejo"), protected_point("Hospital")]);
    let before = store.rows().await;
    store.fail_inserts(true);

    let report = applier().apply(&store, &batch(), ApplyFlags::default()).await;

    assert!(!report.ok);
    assert_eq!(report.outcome, ApplyOutcome::Failed);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.validated, 3);
    assert_eq!(store.rows().await, before);
}

#[tokio::test]
async fn apply_times_out_while_another_writer_holds_the_store() {
    let store = MemoryDeliveryStore::with_points([legacy_point("Viejo")]);
    let held = store.begin().await.unwrap();

    let report = applier()
        .with_timeout(Duration::from_millis(50))
        .apply(&store, &batch(), ApplyFlags::default())
        .await;
    drop(held);

    assert!(!report.ok);
    assert_eq!(report.outcome, ApplyOutcome::Failed);
    assert!(report.message.contains("timed out"), "{}", report.message);
    assert_eq!(store.rows().await.len(), 1);
}

#[tokio::test]
async fn apply_waiting_on_the_writer_lock_still_reports() {
    let writer = Arc::new(Mutex::new(()));
    let store = MemoryDeliveryStore::with_points([legacy_point("Viejo")]);
    let held = writer.lock().await;

    let report = applier()
        .with_writer(writer.clone())
        .with_timeout(Duration::from_millis(50))
        .apply(&store, &batch(), ApplyFlags::default())
        .await;
    drop(held);

    assert_eq!(report.outcome, ApplyOutcome::Failed);
    assert_eq!(report.validated, 3);
    assert_eq!(report.inserted, 0);
    assert_eq!(store.rows().await.len(), 1);
}

#[tokio::test]
async fn unreadable_source_is_reported_without_processing() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryDeliveryStore::with_points([legacy_point("Viejo")]);
    let source = BatchSource::Document(DocumentSource {
        path: "rutas_activas.json".into(),
    });

    let report = applier()
        .with_source_dir(dir.path())
        .apply_source(&store, source, ApplyFlags::default())
        .await;

    assert!(!report.ok);
    assert_eq!(report.outcome, ApplyOutcome::InvalidSource);
    assert_eq!(report.read, 0);
    assert_eq!(store.rows().await.len(), 1);
}

#[tokio::test]
async fn document_outside_source_dir_is_never_read() {
    let outer = tempfile::tempdir().unwrap();
    let data = outer.path().join("data");
    std::fs::create_dir(&data).unwrap();
    std::fs::write(
        outer.path().join("credentials.json"),
        r#"[{"name": "sk_live_SECRET", "vehicle": "ZZ", "day": "x", "liters": "1"}]"#,
    )
    .unwrap();
    let store = MemoryDeliveryStore::new();
    let applier = applier().with_source_dir(&data);

    for path in [
        PathBuf::from("../credentials.json"),
        outer.path().join("credentials.json"),
    ] {
        let source = BatchSource::Document(DocumentSource { path });
        let report = applier.apply_source(&store, source, ApplyFlags::default()).await;

        assert_eq!(report.outcome, ApplyOutcome::InvalidSource);
        assert!(report.samples.is_empty());
        assert!(!report.message.contains("SECRET"));
    }
}

#[tokio::test]
async fn document_inside_source_dir_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("rutas.json"),
        r#"[{"Camión": "a2", "Nombre": "Carla", "Día": "mar", "Litros": "40,5"}]"#,
    )
    .unwrap();
    let store = MemoryDeliveryStore::new();
    let source = BatchSource::Document(DocumentSource {
        path: "rutas.json".into(),
    });

    let report = applier()
        .with_source_dir(dir.path())
        .apply_source(&store, source, ApplyFlags::default())
        .await;

    assert_eq!(report.outcome, ApplyOutcome::Replaced);
    assert_eq!(store.rows().await[0].vehicle, "A2");
}
