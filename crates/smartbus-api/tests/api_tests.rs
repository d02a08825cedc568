//! Integration tests for the SmartBus API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. State is backed by the in-memory stores.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use smartbus_api::{AppState, DEFAULT_SEND_TIMEOUT, build_router};
use smartbus_core::{BroadcastHub, LocationStore, MemoryLocationStore, MemoryTopology};
use tower::ServiceExt;

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post(router: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn register_bus(router: &Router, number: &str) -> i64 {
    let (status, bus) = post(
        router,
        "/api/bus/register",
        &json!({"bus_number": number, "driver_name": "Ravi"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    bus["id"].as_i64().unwrap()
}

async fn create_route(router: &Router, name: &str) -> i64 {
    let (status, route) = post(
        router,
        "/api/routes",
        &json!({"route_name": name, "start_location": "Broadway", "end_location": "Adyar"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    route["id"].as_i64().unwrap()
}

fn location(bus_id: i64, speed: f64) -> Value {
    json!({"bus_id": bus_id, "latitude": 13.0827, "longitude": 80.2707, "speed": speed})
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_liveness_string() {
    let router = build_router(Arc::new(AppState::in_memory()));

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"SmartBus Backend Running");
}

#[tokio::test]
async fn test_latest_location_is_most_recent_report() {
    let router = build_router(Arc::new(AppState::in_memory()));
    let bus = register_bus(&router, "B1").await;

    for speed in [10.0, 20.0, 30.0] {
        let (status, body) = post(&router, "/api/bus/location", &location(bus, speed)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Location updated successfully");
    }

    let uri = format!("/api/bus/{bus}/location");
    let (status, first) = get(&router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["speed"], 30.0);
    assert_eq!(first["bus_id"], bus);

    let (_, second) = get(&router, &uri).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_location_without_reports_is_not_an_error() {
    let router = build_router(Arc::new(AppState::in_memory()));
    let bus = register_bus(&router, "B1").await;

    let (status, body) = get(&router, &format!("/api/bus/{bus}/location")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "No location data found"}));
}

#[tokio::test]
async fn test_invalid_bus_id_in_path_is_bad_request() {
    let router = build_router(Arc::new(AppState::in_memory()));

    let (status, body) = get(&router, "/api/bus/abc/location").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_malformed_report_is_rejected_and_not_broadcast() {
    let state = Arc::new(AppState::in_memory());
    let router = build_router(Arc::clone(&state));
    let bus = register_bus(&router, "B1").await;
    let mut sub = state.subscribe();

    let (status, body) = post(
        &router,
        "/api/bus/location",
        &json!({"bus_id": bus, "latitude": 13.0, "speed": 5}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("longitude"));

    let (status, _) = post(
        &router,
        "/api/bus/location",
        &json!({"bus_id": bus, "latitude": "north", "longitude": 80.0, "speed": 5}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(sub.try_recv().is_none());
    let (_, latest) = get(&router, &format!("/api/bus/{bus}/location")).await;
    assert_eq!(latest["message"], "No location data found");
}

#[tokio::test]
async fn test_non_json_body_is_bad_request() {
    let router = build_router(Arc::new(AppState::in_memory()));

    let response = router
        .oneshot(
            Request::post("/api/bus/register")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_report_for_unregistered_bus_is_not_found() {
    let router = build_router(Arc::new(AppState::in_memory()));

    let (status, body) = post(&router, "/api/bus/location", &location(404, 12.0)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_persistence_failure_is_500_and_never_broadcast() {
    let locations = Arc::new(MemoryLocationStore::new());
    let store: Arc<dyn LocationStore> = Arc::clone(&locations) as Arc<dyn LocationStore>;
    let state = Arc::new(AppState::new(
        store,
        Arc::new(MemoryTopology::new()),
        BroadcastHub::default(),
        DEFAULT_SEND_TIMEOUT,
    ));
    let router = build_router(Arc::clone(&state));
    let bus = register_bus(&router, "B1").await;
    let mut sub = state.subscribe();

    locations.set_fail_writes(true);
    let (status, body) = post(&router, "/api/bus/location", &location(bus, 40.0)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], 500);
    assert!(sub.try_recv().is_none());

    locations.set_fail_writes(false);
    let (status, _) = post(&router, "/api/bus/location", &location(bus, 41.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sub.try_recv().unwrap().speed, 41.0);
}

#[tokio::test]
async fn test_late_subscriber_only_sees_later_updates() {
    let state = Arc::new(AppState::in_memory());
    let router = build_router(Arc::clone(&state));
    let bus = register_bus(&router, "B2").await;

    let mut s1 = state.subscribe();
    post(&router, "/api/bus/location", &location(bus, 1.0)).await;
    let mut s2 = state.subscribe();
    post(&router, "/api/bus/location", &location(bus, 2.0)).await;

    assert_eq!(s1.recv().await.unwrap().speed, 1.0);
    assert_eq!(s1.recv().await.unwrap().speed, 2.0);
    assert_eq!(s2.recv().await.unwrap().speed, 2.0);
    assert!(s1.try_recv().is_none());
    assert!(s2.try_recv().is_none());
}

#[tokio::test]
async fn test_route_stops_are_returned_in_order() {
    let router = build_router(Arc::new(AppState::in_memory()));
    let route = create_route(&router, "21G").await;

    for (name, order) in [("Adyar", 3), ("Broadway", 1), ("Mylapore", 2)] {
        let (status, stop) = post(
            &router,
            &format!("/api/routes/{route}/stops"),
            &json!({"stop_name": name, "latitude": 13.0, "longitude": 80.2, "stop_order": order}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stop["route_id"], route);
    }

    let (status, detail) = get(&router, &format!("/api/routes/{route}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["route"]["route_name"], "21G");
    let orders: Vec<i64> = detail["stops"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["stop_order"].as_i64().unwrap())
        .collect();
    assert_eq!(orders, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_duplicate_stop_order_conflicts() {
    let router = build_router(Arc::new(AppState::in_memory()));
    let route = create_route(&router, "21G").await;
    let uri = format!("/api/routes/{route}/stops");
    let stop = json!({"stop_name": "Broadway", "latitude": 13.0, "longitude": 80.2, "stop_order": 1});

    assert_eq!(post(&router, &uri, &stop).await.0, StatusCode::OK);
    let (status, body) = post(&router, &uri, &stop).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn test_stop_for_unknown_route_is_not_found() {
    let router = build_router(Arc::new(AppState::in_memory()));

    let (status, _) = post(
        &router,
        "/api/routes/77/stops",
        &json!({"stop_name": "Nowhere", "latitude": 0.0, "longitude": 0.0, "stop_order": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_route_returns_not_found_message() {
    let router = build_router(Arc::new(AppState::in_memory()));

    let (status, body) = get(&router, "/api/routes/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "Route not found"}));
}

#[tokio::test]
async fn test_reassignment_replaces_route() {
    let router = build_router(Arc::new(AppState::in_memory()));
    let bus = register_bus(&router, "B1").await;
    let r1 = create_route(&router, "R1").await;
    let r2 = create_route(&router, "R2").await;
    let uri = format!("/api/bus/{bus}/assign-route");

    let (status, body) = post(&router, &uri, &json!({"route_id": r1})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Bus assigned to route successfully");
    post(&router, &uri, &json!({"route_id": r2})).await;

    let (_, buses) = get(&router, "/api/buses").await;
    assert_eq!(buses[0]["id"], bus);
    assert_eq!(buses[0]["route_id"], r2);

    let (status, _) = post(&router, &uri, &json!({"route_id": 999})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = post(&router, "/api/bus/999/assign-route", &json!({"route_id": r1})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_endpoints_return_every_record() {
    let router = build_router(Arc::new(AppState::in_memory()));
    register_bus(&router, "B1").await;
    register_bus(&router, "B2").await;
    create_route(&router, "R1").await;

    let (status, buses) = get(&router, "/api/buses").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(buses.as_array().unwrap().len(), 2);

    let (status, routes) = get(&router, "/api/routes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(routes.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_blank_registration_fields_are_rejected() {
    let router = build_router(Arc::new(AppState::in_memory()));

    let (status, _) = post(
        &router,
        "/api/bus/register",
        &json!({"bus_number": "  ", "driver_name": "Ravi"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_reports_end_with_latest_broadcast() {
    let state = Arc::new(AppState::in_memory());
    let router = build_router(Arc::clone(&state));
    let bus = register_bus(&router, "B9").await;
    let mut sub = state.subscribe();

    let posts = (1..=20).map(|i| {
        let router = router.clone();
        async move { post(&router, "/api/bus/location", &location(bus, f64::from(i))).await }
    });
    let results = futures::future::join_all(posts).await;
    assert!(results.iter().all(|(status, _)| *status == StatusCode::OK));

    let mut seen = Vec::new();
    while let Some(update) = sub.try_recv() {
        seen.push(update.speed);
    }
    assert_eq!(seen.len(), 20);

    // The last broadcast for a bus is the report the snapshot returns.
    let (_, latest) = get(&router, &format!("/api/bus/{bus}/location")).await;
    assert_eq!(latest["speed"], *seen.last().unwrap());
}
