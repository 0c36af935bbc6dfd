//! Router-level tests for the admin API, driven through `tower::ServiceExt`.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Duration;
use portal_core::config::AuthConfig;
use portal_management::lifecycle::CampaignAction;
use portal_management::{management_router, CampaignStore, ContactDirectory, ManagementState, SessionAuth};
use portal_notifier::{EngineCall, EngineReply, NotificationEngine, NotificationProxy, NotifierError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const ADMIN: &str = "ana@acme.io";

/// Answers every engine call with one scripted reply and records the calls.
struct FakeEngine {
    reply: Result<EngineReply, String>,
    calls: Mutex<Vec<EngineCall>>,
}

impl FakeEngine {
    fn replying(status: u16, body: Value) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(EngineReply { status, body }),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn down() -> Arc<Self> {
        Arc::new(Self {
            reply: Err("connection refused".into()),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl NotificationEngine for FakeEngine {
    async fn send(&self, call: EngineCall) -> Result<EngineReply, NotifierError> {
        self.calls.lock().unwrap().push(call);
        self.reply.clone().map_err(NotifierError::Config)
    }
}

/// Cancels and deletes every campaign while a send is in flight, then reports
/// a delivered batch.
struct DeletingEngine {
    store: Arc<CampaignStore>,
}

#[async_trait]
impl NotificationEngine for DeletingEngine {
    async fn send(&self, _call: EngineCall) -> Result<EngineReply, NotifierError> {
        for campaign in self.store.list_campaigns(None) {
            self.store
                .transition(campaign.id, CampaignAction::Cancel, "ops@acme.io", None)
                .unwrap();
            self.store.delete_campaign(campaign.id, "ops@acme.io").unwrap();
        }
        Ok(EngineReply {
            status: 200,
            body: json!({"sent": 7, "failed": 0, "skipped": 0}),
        })
    }
}

struct Harness {
    app: Router,
    session: SessionAuth,
    store: Arc<CampaignStore>,
}

impl Harness {
    fn build(engine: Arc<dyn NotificationEngine>, store: Arc<CampaignStore>) -> Self {
        let session = SessionAuth::new(AuthConfig {
            session_secret: "router-test-secret".into(),
            allowed_domains: vec!["acme.io".into()],
        });
        let state = ManagementState::new(
            store.clone(),
            Arc::new(ContactDirectory::with_demo_data()),
            NotificationProxy::new(engine),
        );
        Self {
            app: management_router(state, session.clone()),
            session,
            store,
        }
    }

    fn with_engine(engine: Arc<FakeEngine>) -> Self {
        Self::build(engine, Arc::new(CampaignStore::new()))
    }

    fn new() -> Self {
        Self::with_engine(FakeEngine::replying(200, json!({})))
    }

    fn token(&self, email: &str) -> String {
        self.session.issue_token(email, Duration::hours(1)).unwrap()
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let token = self.token(ADMIN);
        self.send_as(method, uri, body, Some(&token), &[]).await
    }

    async fn send_as(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        extra_headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let body = body.map(|b| b.to_string());
        let response = self.raw(method, uri, body, token, extra_headers).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Unparsed response, for asserting on headers and raw bodies.
    async fn raw(
        &self,
        method: Method,
        uri: &str,
        body: Option<String>,
        token: Option<&str>,
        extra_headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn create_ready_campaign(&self) -> String {
        let (status, campaign) = self
            .send(
                Method::POST,
                "/api/v1/admin/campaigns",
                Some(json!({
                    "title": "Autumn stories",
                    "audienceSource": "both",
                    "userNotificationPreferences": ["news"],
                    "dailySendLimit": 500
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = campaign["id"].as_str().unwrap().to_string();

        let (status, _) = self
            .send(
                Method::PUT,
                &format!("/api/v1/admin/campaigns/{id}/assets/en"),
                Some(json!({"subject": "New stories", "htmlBody": "<p>Hello</p>"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        id
    }
}

#[tokio::test]
async fn missing_or_bad_session_is_unauthorized() {
    let h = Harness::new();
    let (status, body) = h
        .send_as(Method::GET, "/api/v1/admin/campaigns", None, None, &[])
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = h
        .send_as(Method::GET, "/api/v1/admin/campaigns", None, Some("garbage"), &[])
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn foreign_domain_is_forbidden() {
    let h = Harness::new();
    let token = h.token("eve@elsewhere.com");
    let (status, body) = h
        .send_as(Method::GET, "/api/v1/admin/campaigns", None, Some(&token), &[])
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn create_rejects_invalid_campaign_with_field_errors() {
    let h = Harness::new();
    let (status, body) = h
        .send(
            Method::POST,
            "/api/v1/admin/campaigns",
            Some(json!({"title": "", "audienceSource": "users"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_failed");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"title"));
    assert!(fields.contains(&"userNotificationPreferences"));
}

#[tokio::test]
async fn lifecycle_walks_through_the_state_machine() {
    let h = Harness::new();
    let id = h.create_ready_campaign().await;

    let (status, campaign) = h
        .send(Method::POST, &format!("/api/v1/admin/campaigns/{id}/activate"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(campaign["status"], "active");
    assert_eq!(campaign["updatedBy"], ADMIN);

    let (status, campaign) = h
        .send(Method::POST, &format!("/api/v1/admin/campaigns/{id}/pause"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(campaign["status"], "paused");

    let (status, campaign) = h
        .send(Method::POST, &format!("/api/v1/admin/campaigns/{id}/complete"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(campaign["status"], "completed");

    // Terminal: nothing else applies.
    let (status, body) = h
        .send(Method::POST, &format!("/api/v1/admin/campaigns/{id}/activate"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    let (_, detail) = h
        .send(Method::GET, &format!("/api/v1/admin/campaigns/{id}"), None)
        .await;
    assert_eq!(detail["campaign"]["status"], "completed");
    assert_eq!(detail["assets"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn activation_without_assets_is_rejected() {
    let h = Harness::new();
    let (_, campaign) = h
        .send(
            Method::POST,
            "/api/v1/admin/campaigns",
            Some(json!({"title": "Bare", "audienceSource": "leads"})),
        )
        .await;
    let id = campaign["id"].as_str().unwrap();

    let (status, body) = h
        .send(Method::POST, &format!("/api/v1/admin/campaigns/{id}/activate"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_failed");
}

#[tokio::test]
async fn stale_expected_version_conflicts() {
    let h = Harness::new();
    let id = h.create_ready_campaign().await;
    let (_, detail) = h
        .send(Method::GET, &format!("/api/v1/admin/campaigns/{id}"), None)
        .await;
    let version = detail["campaign"]["version"].as_u64().unwrap();

    let (status, _) = h
        .send(
            Method::PUT,
            &format!("/api/v1/admin/campaigns/{id}"),
            Some(json!({"title": "Renamed", "expectedVersion": version})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .send(
            Method::POST,
            &format!("/api/v1/admin/campaigns/{id}/activate"),
            Some(json!({"expectedVersion": version})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "version_conflict");
    assert_eq!(h.store.get_campaign(id.parse().unwrap()).unwrap().title, "Renamed");
}

#[tokio::test]
async fn asset_upsert_is_idempotent_per_language() {
    let h = Harness::new();
    let id = h.create_ready_campaign().await;
    let uri = format!("/api/v1/admin/campaigns/{id}/assets/en");

    let (status, asset) = h
        .send(Method::PUT, &uri, Some(json!({"subject": "Updated", "htmlBody": "<p>v2</p>"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset["subject"], "Updated");

    let (_, assets) = h
        .send(Method::GET, &format!("/api/v1/admin/campaigns/{id}/assets"), None)
        .await;
    assert_eq!(assets.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn delete_guards_status_and_cascades() {
    let h = Harness::new();
    let id = h.create_ready_campaign().await;
    h.send(Method::POST, &format!("/api/v1/admin/campaigns/{id}/activate"), None)
        .await;

    let (status, body) = h
        .send(Method::DELETE, &format!("/api/v1/admin/campaigns/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    h.send(Method::POST, &format!("/api/v1/admin/campaigns/{id}/cancel"), None)
        .await;
    let (status, _) = h
        .send(Method::DELETE, &format!("/api/v1/admin/campaigns/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = h
        .send(Method::GET, &format!("/api/v1/admin/campaigns/{id}/assets"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(h.store.asset_count(id.parse().unwrap()), 0);
}

#[tokio::test]
async fn list_filters_by_status() {
    let h = Harness::new();
    let active = h.create_ready_campaign().await;
    h.create_ready_campaign().await;
    h.send(Method::POST, &format!("/api/v1/admin/campaigns/{active}/activate"), None)
        .await;

    let (_, all) = h.send(Method::GET, "/api/v1/admin/campaigns", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, only_active) = h
        .send(Method::GET, "/api/v1/admin/campaigns?status=active", None)
        .await;
    let only_active = only_active.as_array().unwrap();
    assert_eq!(only_active.len(), 1);
    assert_eq!(only_active[0]["id"], active.as_str());
}

#[tokio::test]
async fn audience_preview_counts_pools() {
    let h = Harness::new();

    // Demo pools: three contactable leads; two users opted into news.
    let (status, count) = h
        .send(
            Method::POST,
            "/api/v1/admin/audience/preview",
            Some(json!({"audienceSource": "both", "userNotificationPreferences": ["news"]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count, json!({"leads": 3, "users": 2, "total": 5}));

    let id = h.create_ready_campaign().await;
    let (_, stored) = h
        .send(Method::GET, &format!("/api/v1/admin/campaigns/{id}/audience"), None)
        .await;
    assert_eq!(stored["total"], 5);

    // Unsaved edits narrow the preview without touching the campaign.
    let (_, preview) = h
        .send(
            Method::POST,
            &format!("/api/v1/admin/campaigns/{id}/audience/preview"),
            Some(json!({"audienceSource": "leads"})),
        )
        .await;
    assert_eq!(preview, json!({"leads": 3, "users": 0, "total": 3}));

    let (status, _) = h
        .send(Method::POST, "/api/v1/admin/audience/preview", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn campaign_send_records_batch_and_progress() {
    let engine = FakeEngine::replying(200, json!({"sent": 15, "failed": 2, "skipped": 1, "queued": 40}));
    let h = Harness::with_engine(engine.clone());
    let id = h.create_ready_campaign().await;
    h.send(Method::POST, &format!("/api/v1/admin/campaigns/{id}/activate"), None)
        .await;

    let token = h.token(ADMIN);
    let (status, body) = h
        .send_as(
            Method::POST,
            &format!("/api/v1/admin/campaigns/{id}/send-batch"),
            None,
            Some(&token),
            &[("idempotency-key", "click-42")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sent"], 15);

    {
        let calls = engine.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].idempotency_key.as_deref(), Some("click-42"));
        assert_eq!(calls[0].actor.as_deref(), Some(ADMIN));
    }

    let (_, batches) = h
        .send(Method::GET, &format!("/api/v1/admin/campaigns/{id}/batches"), None)
        .await;
    assert_eq!(batches.as_array().unwrap().len(), 1);

    let (_, progress) = h
        .send(Method::GET, &format!("/api/v1/admin/campaigns/{id}/progress"), None)
        .await;
    assert_eq!(progress["sent"], 15);
    assert_eq!(progress["failed"], 2);
    assert_eq!(progress["queued"], 40);
    assert_eq!(progress["total"], 58);
}

#[tokio::test]
async fn send_requires_active_campaign() {
    let engine = FakeEngine::replying(200, json!({"sent": 1, "failed": 0, "skipped": 0}));
    let h = Harness::with_engine(engine.clone());
    let id = h.create_ready_campaign().await;

    let (status, _) = h
        .send(Method::POST, &format!("/api/v1/admin/campaigns/{id}/send-batch"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(engine.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn engine_rejections_pass_through_verbatim() {
    let rejection = json!({"error": "window_closed", "retryAfter": "08:00"});
    let h = Harness::with_engine(FakeEngine::replying(429, rejection.clone()));

    let (status, body) = h
        .send(Method::POST, "/api/v1/admin/mail-marketing/send-batch", None)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, rejection);
}

#[tokio::test]
async fn unreachable_engine_is_bad_gateway() {
    let h = Harness::with_engine(FakeEngine::down());
    let (status, body) = h
        .send(Method::GET, "/api/v1/admin/mail-marketing/config", None)
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream_failure");
}

#[tokio::test]
async fn mail_config_update_is_validated_and_audited() {
    let stored = json!({
        "paused": true,
        "batchSize": 250,
        "sendWindowStart": "08:00",
        "sendWindowEnd": "20:00",
        "timezone": "Europe/Berlin"
    });
    let h = Harness::with_engine(FakeEngine::replying(200, stored.clone()));

    let (status, body) = h
        .send(Method::PUT, "/api/v1/admin/mail-marketing/config", Some(stored.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, stored);

    let mut invalid = stored.clone();
    invalid["batchSize"] = json!(0);
    let (status, _) = h
        .send(Method::PUT, "/api/v1/admin/mail-marketing/config", Some(invalid))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, log) = h.send(Method::GET, "/api/v1/admin/audit-log", None).await;
    let actions: Vec<&str> = log
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions.iter().filter(|a| **a == "update_mail_config").count(), 1);
}

async fn assert_validation_field(response: Response, expected: &str) {
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "application/json"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "validation_failed");
    let field = body["fields"][0]["field"].as_str().unwrap();
    assert!(field.starts_with(expected), "field {field} should start with {expected}");
}

#[tokio::test]
async fn malformed_payloads_are_located_validation_errors() {
    let h = Harness::new();
    let token = h.token(ADMIN);

    let unknown_source = json!({"title": "x", "audienceSource": "everyone"}).to_string();
    let response = h
        .raw(Method::POST, "/api/v1/admin/campaigns", Some(unknown_source), Some(&token), &[])
        .await;
    assert_validation_field(response, "audienceSource").await;

    let bad_operator = json!({
        "title": "x",
        "audienceSource": "leads",
        "filterTree": {
            "logic": "and",
            "conditions": [{"field": "locale", "operator": "contains", "value": "en"}]
        }
    })
    .to_string();
    let response = h
        .raw(Method::POST, "/api/v1/admin/campaigns", Some(bad_operator), Some(&token), &[])
        .await;
    assert_validation_field(response, "filterTree").await;

    let response = h
        .raw(Method::POST, "/api/v1/admin/campaigns", Some("{not json".into()), Some(&token), &[])
        .await;
    assert_validation_field(response, "body").await;
}

#[tokio::test]
async fn malformed_ids_are_validation_errors() {
    let h = Harness::new();
    let token = h.token(ADMIN);

    let response = h
        .raw(Method::GET, "/api/v1/admin/campaigns/not-a-uuid", None, Some(&token), &[])
        .await;
    assert_validation_field(response, "id").await;

    let response = h
        .raw(
            Method::POST,
            "/api/v1/admin/campaigns/not-a-uuid/pause",
            None,
            Some(&token),
            &[],
        )
        .await;
    assert_validation_field(response, "id").await;
}

#[tokio::test]
async fn campaign_deleted_during_send_leaves_no_ledger() {
    let store = Arc::new(CampaignStore::new());
    let h = Harness::build(Arc::new(DeletingEngine { store: store.clone() }), store);
    let id = h.create_ready_campaign().await;
    h.send(Method::POST, &format!("/api/v1/admin/campaigns/{id}/activate"), None)
        .await;

    let token = h.token(ADMIN);
    let response = h
        .raw(
            Method::POST,
            &format!("/api/v1/admin/campaigns/{id}/send-batch"),
            None,
            Some(&token),
            &[("idempotency-key", "click-7")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["idempotency-key"], "click-7");

    let campaign_id = id.parse().unwrap();
    assert!(h.store.list_batches(campaign_id).is_empty());
    assert!(h.store.get_campaign(campaign_id).is_err());
}

#[tokio::test]
async fn send_batch_echoes_idempotency_key_on_engine_rejection() {
    let h = Harness::with_engine(FakeEngine::replying(429, json!({"error": "window_closed"})));
    let token = h.token(ADMIN);
    let response = h
        .raw(
            Method::POST,
            "/api/v1/admin/mail-marketing/send-batch",
            None,
            Some(&token),
            &[("idempotency-key", "click-9")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["idempotency-key"], "click-9");

    let h = Harness::with_engine(FakeEngine::down());
    let response = h
        .raw(
            Method::POST,
            "/api/v1/admin/mail-marketing/send-batch",
            None,
            Some(&token),
            &[("idempotency-key", "click-10")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()["idempotency-key"], "click-10");
}

#[tokio::test]
async fn empty_engine_reply_is_relayed_without_body() {
    let h = Harness::with_engine(FakeEngine::replying(204, Value::Null));
    let token = h.token(ADMIN);
    let response = h
        .raw(
            Method::POST,
            "/api/v1/admin/mail-marketing/send-batch",
            None,
            Some(&token),
            &[("idempotency-key", "click-11")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["idempotency-key"], "click-11");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}
