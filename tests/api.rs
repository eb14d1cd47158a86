//! HTTP API tests driven through the full router.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use uptimeguard::api::LoginResponse;
use uptimeguard::config::Config;

const ADMIN_EMAIL: &str = "admin@uptimeguard.ai";
const ADMIN_PASSWORD: &str = "admin123";
const ORIGIN: &str = "http://localhost:3000";

struct TestApp {
    _dir: TempDir,
    app: Router,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.storage.db_path = dir.path().join("api.db").to_string_lossy().to_string();
    config.auth.jwt_secret = "integration-secret".to_string();
    config.auth.bcrypt_cost = 4;
    config.simulator.seed = Some(17);

    let state = uptimeguard::bootstrap(&config).unwrap();
    let app = uptimeguard::api::router(state, &config.server.cors_origins);
    TestApp { _dir: dir, app }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), 1_000_000)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::String(
            String::from_utf8_lossy(&body).to_string(),
        ))
    };
    (status, headers, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn login(app: &Router) -> String {
    let (status, _, body) = send(
        app,
        post_json(
            "/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let login: LoginResponse = serde_json::from_value(body).unwrap();
    assert_eq!(login.token_type, "bearer");
    login.access_token
}

#[tokio::test]
async fn test_root_and_health() {
    let t = test_app();
    let (status, _, body) = send(&t.app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");

    let (status, _, body) = send(&t.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_live_metrics_wire_shape() {
    let t = test_app();
    let (status, _, body) = send(&t.app, get("/metrics/live")).await;
    assert_eq!(status, StatusCode::OK);

    let obj = body.as_object().unwrap();
    assert_eq!(obj.len(), 7);
    for field in ["cpu", "ram", "response_time", "error_rate", "db_latency"] {
        assert!(obj[field].is_f64() || obj[field].is_u64(), "{field} not numeric");
    }
    let status = obj["status"].as_str().unwrap();
    assert!(["operational", "degraded", "down"].contains(&status));
    assert!(obj["timestamp"].is_string());
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let t = test_app();
    let (status, headers, body) = send(
        &t.app,
        post_json(
            "/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers[header::WWW_AUTHENTICATE], "Bearer");
    assert_eq!(body["detail"], "Incorrect email or password");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let t = test_app();
    for uri in [
        "/incidents/create",
        "/maintenance/enable",
        "/maintenance/disable",
        "/predict/update-risk",
    ] {
        let (status, _, _) = send(&t.app, post_json(uri, None, json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");

        let (status, _, _) = send(&t.app, post_json(uri, Some("garbage"), json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_manual_incident_lifecycle() {
    let t = test_app();
    let token = login(&t.app).await;

    let (status, _, body) = send(
        &t.app,
        post_json(
            "/incidents/create",
            Some(&token),
            json!({ "severity": "high", "message": "Payment provider timeouts" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Incident created");
    let id = body["id"].as_i64().unwrap();

    let (status, _, body) = send(&t.app, get("/incidents?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    let created = list.iter().find(|i| i["id"] == id).unwrap();
    assert_eq!(created["severity"], "high");
    assert_eq!(created["status"], "active");
    assert_eq!(created["message"], "Payment provider timeouts");
}

#[tokio::test]
async fn test_manual_incident_validation() {
    let t = test_app();
    let token = login(&t.app).await;

    let (status, _, body) = send(
        &t.app,
        post_json(
            "/incidents/create",
            Some(&token),
            json!({ "severity": "apocalyptic", "message": "x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("severity"));

    let (status, _, body) = send(
        &t.app,
        post_json(
            "/incidents/create",
            Some(&token),
            json!({ "severity": "low", "message": "   " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_maintenance_mode_drives_live_status() {
    let t = test_app();
    let token = login(&t.app).await;

    let (_, _, body) = send(&t.app, get("/maintenance")).await;
    assert_eq!(body["enabled"], false);

    let (status, _, body) = send(
        &t.app,
        post_json("/maintenance/enable", Some(&token), json!({ "eta_minutes": 25 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eta_minutes"], 25);

    let (_, _, body) = send(&t.app, get("/maintenance")).await;
    assert_eq!(body["enabled"], true);
    assert!(body["enabled_at"].is_string());

    for _ in 0..5 {
        let (_, _, reading) = send(&t.app, get("/metrics/live")).await;
        assert_eq!(reading["status"], "maintenance");
    }

    let (status, _, body) = send(
        &t.app,
        post_json("/maintenance/disable", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Maintenance mode disabled");

    let (_, _, reading) = send(&t.app, get("/metrics/live")).await;
    assert_ne!(reading["status"], "maintenance");
}

#[tokio::test]
async fn test_negative_eta_is_rejected() {
    let t = test_app();
    let token = login(&t.app).await;
    let (status, _, _) = send(
        &t.app,
        post_json("/maintenance/enable", Some(&token), json!({ "eta_minutes": -3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_update_risk() {
    let t = test_app();
    let token = login(&t.app).await;
    let (status, _, body) = send(
        &t.app,
        post_json(
            "/predict/update-risk",
            Some(&token),
            json!({
                "update_title": "Auth service upgrade",
                "update_type": "hotfix",
                "services_affected": ["auth"],
                "db_migration": false,
                "expected_minutes": 10,
                "description": "Patch token refresh"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk_score"], 35);
    assert_eq!(body["risk_level"], "Medium");
    assert_eq!(body["predicted_downtime_min"], 8);
}

#[tokio::test]
async fn test_malformed_requests_use_detail_body() {
    let t = test_app();
    let token = login(&t.app).await;

    let (status, _, body) = send(&t.app, get("/incidents?limit=-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    let (status, _, body) = send(
        &t.app,
        post_json(
            "/predict/update-risk",
            Some(&token),
            json!({ "update_title": "x", "update_type": "yolo" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let req = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, body) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_cors_preflight_allows_dashboard_origin() {
    let t = test_app();
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/maintenance/enable")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&t.app, req).await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let t = test_app();
    let (status, _, _) = send(&t.app, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
