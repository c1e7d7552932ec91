use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::router::booking_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

const PROVIDER_ID: i64 = 7;
const SERVICE_ID: i64 = 2;
const DATE: &str = "2025-06-10";

async fn create_test_app(config: AppConfig) -> Router {
    booking_routes(Arc::new(config))
}

fn config_for(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

fn slot(hour: u32, minute: u32) -> DateTime<Utc> {
    NaiveDate::parse_from_str(DATE, "%Y-%m-%d")
        .unwrap()
        .and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
        .and_utc()
}

/// Provider, requested service, and the offered-service link.
async fn mount_catalog_mocks(mock_server: &MockServer, duration_hours: i32) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/providers"))
        .and(query_param("id", format!("eq.{}", PROVIDER_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::provider_row(PROVIDER_ID, "Provider A")
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("id", format!("eq.{}", SERVICE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::service_row(SERVICE_ID, "Consultation", duration_hours)
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::provider_service_row(1, PROVIDER_ID, SERVICE_ID)
        ])))
        .mount(mock_server)
        .await;
}

async fn get_slots(app: &Router, token: &str, query: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(format!("/availability?{}", query))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn empty_day_returns_full_slot_grid() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);

    mount_catalog_mocks(&mock_server, 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let user = TestUser::customer("customer@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config).await;

    let (status, body) = get_slots(
        &app,
        &token,
        &format!("provider_id={}&service_id={}&date={}", PROVIDER_ID, SERVICE_ID, DATE),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let slots: Vec<DateTime<Utc>> = serde_json::from_value(body).unwrap();
    assert_eq!(slots.len(), 38);
    assert_eq!(slots[0], slot(5, 0));
    assert_eq!(*slots.last().unwrap(), slot(23, 30));
}

#[tokio::test]
async fn existing_booking_blocks_overlapping_slots() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);

    // Requested service runs two hours; the day holds a one-hour booking
    // of service 3 at 08:00.
    mount_catalog_mocks(&mock_server, 2).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(11, "someone", PROVIDER_ID, 3, slot(8, 0))
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("id", "in.(3)"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(json!([{"id": 3, "duration_hours": 1}])))
        .mount(&mock_server)
        .await;

    let user = TestUser::customer("customer@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config).await;

    let (status, body) = get_slots(
        &app,
        &token,
        &format!("provider_id={}&service_id={}&date={}", PROVIDER_ID, SERVICE_ID, DATE),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let slots: Vec<DateTime<Utc>> = serde_json::from_value(body).unwrap();

    for blocked in [slot(6, 30), slot(7, 0), slot(7, 30), slot(8, 0), slot(8, 30)] {
        assert!(!slots.contains(&blocked), "{} should be blocked", blocked);
    }
    assert_eq!(slots.len(), 33);
    assert!(slots.contains(&slot(6, 0)));
    assert!(slots.contains(&slot(9, 0)));
}

#[tokio::test]
async fn unknown_provider_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let user = TestUser::customer("customer@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config).await;

    let (status, body) = get_slots(
        &app,
        &token,
        &format!("provider_id=99&service_id={}&date={}", SERVICE_ID, DATE),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Provider with ID 99"));
}

#[tokio::test]
async fn service_outside_providers_set_conflicts() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::provider_row(PROVIDER_ID, "Provider A")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::service_row(SERVICE_ID, "Consultation", 1)
        ])))
        .mount(&mock_server)
        .await;

    // Provider does not offer the requested service
    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let user = TestUser::customer("customer@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config).await;

    let (status, body) = get_slots(
        &app,
        &token,
        &format!("provider_id={}&service_id={}&date={}", PROVIDER_ID, SERVICE_ID, DATE),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("does not offer"));
}

#[tokio::test]
async fn excluded_appointment_frees_its_slot() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);

    mount_catalog_mocks(&mock_server, 1).await;

    // With the edited appointment excluded the day is empty; mounted first
    // so it wins over the catch-all below.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "neq.11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(11, "someone", PROVIDER_ID, 3, slot(10, 0))
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("id", "in.(3)"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(json!([{"id": 3, "duration_hours": 1}])))
        .mount(&mock_server)
        .await;

    let user = TestUser::customer("customer@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config).await;

    let base_query = format!(
        "provider_id={}&service_id={}&date={}",
        PROVIDER_ID, SERVICE_ID, DATE
    );

    let (status, body) = get_slots(&app, &token, &base_query).await;
    assert_eq!(status, StatusCode::OK);
    let slots: Vec<DateTime<Utc>> = serde_json::from_value(body).unwrap();
    assert!(!slots.contains(&slot(10, 0)));

    let (status, body) =
        get_slots(&app, &token, &format!("{}&exclude_appointment_id=11", base_query)).await;
    assert_eq!(status, StatusCode::OK);
    let slots: Vec<DateTime<Utc>> = serde_json::from_value(body).unwrap();
    assert!(slots.contains(&slot(10, 0)));
    assert_eq!(slots.len(), 38);
}

#[tokio::test]
async fn availability_requires_authentication() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let app = create_test_app(config).await;

    let request = Request::builder()
        .method("GET")
        .uri(format!(
            "/availability?provider_id={}&service_id={}&date={}",
            PROVIDER_ID, SERVICE_ID, DATE
        ))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
