use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::appointment_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

const CLIENT_ID: i64 = 1;
const PROVIDER_ID: i64 = 7;

fn create_test_app(config: &AppConfig) -> Router {
    appointment_routes(std::sync::Arc::new(config.clone()))
}

fn token_for(user: &TestUser, config: &AppConfig) -> String {
    JwtTestUtils::create_test_token(user, &config.supabase_jwt_secret, Some(24))
}

fn post_appointment(token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_appointments(token: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn mock_provider(mock_server: &MockServer, provider: &TestUser) {
    let rows = if provider.provider {
        json!([MockSupabaseResponses::provider_response(provider)])
    } else {
        json!([])
    };

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", provider.id)))
        .and(query_param("provider", "is.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(mock_server)
        .await;
}

async fn mock_slot(mock_server: &MockServer, provider_id: i64, date: &str, taken: bool) {
    let rows = if taken {
        json!([MockSupabaseResponses::appointment_response(99, 2, provider_id, date)])
    } else {
        json!([])
    };

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("provider_id", format!("eq.{}", provider_id)))
        .and(query_param("date", format!("eq.{}", date)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(mock_server)
        .await;
}

async fn mock_insert(mock_server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(1, CLIENT_ID, PROVIDER_ID, "2999-01-01T10:00:00Z")
        ])))
        .expect(expected_calls)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_create_appointment_success() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let client = TestUser::client(CLIENT_ID);

    mock_provider(&mock_server, &TestUser::provider(PROVIDER_ID)).await;
    mock_slot(&mock_server, PROVIDER_ID, "2999-01-01T10:00:00Z", false).await;
    mock_insert(&mock_server, 1).await;

    let response = create_test_app(&config)
        .oneshot(post_appointment(
            &token_for(&client, &config),
            json!({ "provider_id": PROVIDER_ID, "date": "2999-01-01T10:15:00Z" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["user_id"], CLIENT_ID);
    assert_eq!(body["provider_id"], PROVIDER_ID);
    assert_eq!(body["date"], "2999-01-01T10:00:00Z");
    assert_eq!(body["canceled_at"], Value::Null);
}

#[tokio::test]
async fn test_create_appointment_validation_fails() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let token = token_for(&TestUser::client(CLIENT_ID), &config);
    mock_insert(&mock_server, 0).await;

    for body in [
        json!({}),
        json!({ "provider_id": PROVIDER_ID }),
        json!({ "date": "2999-01-01T10:00:00Z" }),
        json!({ "provider_id": "abc", "date": "2999-01-01T10:00:00Z" }),
        json!({ "provider_id": PROVIDER_ID, "date": "not a date" }),
        json!("just a string"),
    ] {
        let response = create_test_app(&config)
            .oneshot(post_appointment(&token, body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({ "error": "Validation fails" }));
    }
}

#[tokio::test]
async fn test_create_appointment_with_malformed_json() {
    let config = TestConfig::default().to_app_config();
    let token = token_for(&TestUser::client(CLIENT_ID), &config);

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from("{\"provider_id\": 7,"))
        .unwrap();

    let response = create_test_app(&config).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "Validation fails" }));
}

#[tokio::test]
async fn test_create_appointment_with_non_provider() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let client = TestUser::client(CLIENT_ID);

    mock_provider(&mock_server, &TestUser::client(3)).await;
    mock_insert(&mock_server, 0).await;

    let response = create_test_app(&config)
        .oneshot(post_appointment(
            &token_for(&client, &config),
            json!({ "provider_id": 3, "date": "2000-01-01T10:00:00Z" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "You can only appointments with providers" })
    );
}

#[tokio::test]
async fn test_create_appointment_with_fractional_provider_id() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let token = token_for(&TestUser::client(CLIENT_ID), &config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;
    mock_insert(&mock_server, 0).await;

    for provider_id in [json!(7.5), json!("7.5")] {
        let response = create_test_app(&config)
            .oneshot(post_appointment(
                &token,
                json!({ "provider_id": provider_id, "date": "2999-01-01T10:00:00Z" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "You can only appointments with providers" })
        );
    }
}

#[tokio::test]
async fn test_create_appointment_with_short_iso_dates() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let token = token_for(&TestUser::client(CLIENT_ID), &config);

    mock_provider(&mock_server, &TestUser::provider(PROVIDER_ID)).await;
    mock_slot(&mock_server, PROVIDER_ID, "2999-01-01T10:00:00Z", false).await;
    mock_insert(&mock_server, 5).await;

    for date in [
        "2999-01-01T10:15Z",
        "2999-01-01T12:15+02:00",
        "2999-01-01T12:15:00+0200",
        "2999-01-01T10Z",
        "2999-01-01 10:15:00",
    ] {
        let response = create_test_app(&config)
            .oneshot(post_appointment(
                &token,
                json!({ "provider_id": PROVIDER_ID, "date": date }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "for {}", date);
        assert_eq!(json_body(response).await["date"], "2999-01-01T10:00:00Z");
    }
}

#[tokio::test]
async fn test_create_appointment_in_the_past() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();

    mock_provider(&mock_server, &TestUser::provider(PROVIDER_ID)).await;
    mock_insert(&mock_server, 0).await;

    let response = create_test_app(&config)
        .oneshot(post_appointment(
            &token_for(&TestUser::client(CLIENT_ID), &config),
            json!({ "provider_id": PROVIDER_ID, "date": "2000-01-01T10:00:00Z" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "Past date are not permitted" }));
}

#[tokio::test]
async fn test_create_appointment_slot_taken() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();

    mock_provider(&mock_server, &TestUser::provider(PROVIDER_ID)).await;
    mock_slot(&mock_server, PROVIDER_ID, "2999-01-01T10:00:00Z", true).await;
    mock_insert(&mock_server, 0).await;

    let response = create_test_app(&config)
        .oneshot(post_appointment(
            &token_for(&TestUser::client(CLIENT_ID), &config),
            json!({ "provider_id": PROVIDER_ID, "date": "2999-01-01T10:30:00Z" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Appointment date is not available" })
    );
}

#[tokio::test]
async fn test_create_appointment_store_failure() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let response = create_test_app(&config)
        .oneshot(post_appointment(
            &token_for(&TestUser::client(CLIENT_ID), &config),
            json!({ "provider_id": PROVIDER_ID, "date": "2999-01-01T10:00:00Z" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_list_appointments_with_providers() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let provider = TestUser::provider(PROVIDER_ID);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("user_id", format!("eq.{}", CLIENT_ID)))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_summary_response(10, "2999-01-01T10:00:00Z", PROVIDER_ID),
            MockSupabaseResponses::appointment_summary_response(11, "2999-01-01T12:00:00Z", PROVIDER_ID)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", PROVIDER_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::provider_profile_response(&provider, Some(3))
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/files"))
        .and(query_param("id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::file_response(3, "avatar.png")
        ])))
        .mount(&mock_server)
        .await;

    let response = create_test_app(&config)
        .oneshot(get_appointments(&token_for(&TestUser::client(CLIENT_ID), &config), "/"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!([
            {
                "id": 10,
                "date": "2999-01-01T10:00:00Z",
                "provider": {
                    "id": PROVIDER_ID,
                    "name": provider.name,
                    "avatar": { "id": 3, "path": "avatar.png", "url": "http://localhost:3333/files/avatar.png" }
                }
            },
            {
                "id": 11,
                "date": "2999-01-01T12:00:00Z",
                "provider": {
                    "id": PROVIDER_ID,
                    "name": provider.name,
                    "avatar": { "id": 3, "path": "avatar.png", "url": "http://localhost:3333/files/avatar.png" }
                }
            }
        ])
    );
}

#[tokio::test]
async fn test_list_appointments_second_page() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("limit", "20"))
        .and(query_param("offset", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = create_test_app(&config)
        .oneshot(get_appointments(
            &token_for(&TestUser::client(CLIENT_ID), &config),
            "/?page=2",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn test_list_appointments_invalid_page_reads_first_page() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let token = token_for(&TestUser::client(CLIENT_ID), &config);
    for uri in ["/?page=abc", "/?page=0"] {
        let response = create_test_app(&config)
            .oneshot(get_appointments(&token, uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let config = TestConfig::default().to_app_config();

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = create_test_app(&config).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_numeric_subject_is_unauthorized() {
    let config = TestConfig::default().to_app_config();
    let token = JwtTestUtils::create_token_for_subject("a1b2c3", &config.supabase_jwt_secret);

    let response = create_test_app(&config)
        .oneshot(get_appointments(&token, "/"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({ "error": "Invalid user identifier" }));
}
