//! HTTP tests for the `/api/v1/deliveries` resource.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json};
use serde_json::json;
use sqlx::PgPool;

async fn record(pool: &PgPool, body: serde_json::Value) -> StatusCode {
    post_json(common::build_test_app(pool.clone()), "/api/v1/deliveries", body)
        .await
        .status()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn record_and_list_deliveries(pool: PgPool) {
    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/deliveries",
        json!({ "nombre": "Ana", "camion": "a1", "litros": "300", "estado": "entregado",
                "fecha": "2025-03-01T10:00:00Z", "latitud": -33.04, "longitud": -71.6 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "ENTREGADO");
    assert_eq!(json["data"]["vehicle_code"], "A1");

    assert_eq!(
        record(&pool, json!({ "nombre": "Beto", "camion": "A2", "estado": "NO ENTREGADO", "fecha": "2025-03-02" })).await,
        StatusCode::CREATED
    );

    let listed = body_json(get(common::build_test_app(pool.clone()), "/api/v1/deliveries").await).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 2);
    assert_eq!(listed["data"][0]["household_name"], "Beto");

    let listed = body_json(
        get(common::build_test_app(pool.clone()), "/api/v1/deliveries?desde=2025-03-01&hasta=2025-03-01&camion=a1").await,
    )
    .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["household_name"], "Ana");

    let listed = body_json(get(common::build_test_app(pool), "/api/v1/deliveries/undelivered").await).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["status"], "NO ENTREGADO");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_delivery_requests_are_rejected(pool: PgPool) {
    assert_eq!(record(&pool, json!({ "nombre": "Ana" })).await, StatusCode::BAD_REQUEST);
    assert_eq!(
        record(&pool, json!({ "nombre": "Ana", "estado": "ENTREGADO", "litros": "-3" })).await,
        StatusCode::BAD_REQUEST
    );

    let response = get(common::build_test_app(pool.clone()), "/api/v1/deliveries?desde=ayer").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let listed = body_json(get(common::build_test_app(pool), "/api/v1/deliveries").await).await;
    assert_eq!(listed["data"], json!([]));
}
