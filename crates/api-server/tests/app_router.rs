//! The assembled application: probes are open, the admin API is not.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use portal_api::ApiServer;
use portal_core::config::AppConfig;
use portal_management::{CampaignStore, ContactDirectory, ManagementState, SessionAuth};
use portal_notifier::{HttpNotificationEngine, NotificationProxy};
use std::sync::Arc;
use tower::ServiceExt;

fn server(allowed_domains: Vec<String>) -> ApiServer {
    let mut config = AppConfig::default();
    config.auth.allowed_domains = allowed_domains;
    let engine = HttpNotificationEngine::new(&config.notification_engine).unwrap();
    let state = ManagementState::new(
        Arc::new(CampaignStore::with_demo_data()),
        Arc::new(ContactDirectory::with_demo_data()),
        NotificationProxy::new(Arc::new(engine)),
    );
    ApiServer::new(config, state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn probes_need_no_session() {
    let app = server(vec!["acme.io".into()]).router();
    for uri in ["/health", "/ready", "/live"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn not_ready_without_admin_domains() {
    let app = server(Vec::new()).router();
    let response = app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn admin_api_requires_session() {
    let app = server(vec!["acme.io".into()]).router();
    let response = app
        .clone()
        .oneshot(get("/api/v1/admin/campaigns"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let session = SessionAuth::new(AppConfig::default().auth);
    let token = session
        .issue_token("ops@acme.io", chrono::Duration::minutes(5))
        .unwrap();
    let request = Request::builder()
        .uri("/api/v1/admin/campaigns")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let campaigns: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(!campaigns.as_array().unwrap().is_empty());
}
