//! Axum REST handlers for the admin API.

use crate::audience::{self, AudienceCriteria};
use crate::auth::AdminIdentity;
use crate::contacts::ContactDirectory;
use crate::error::{ApiError, ApiResult};
use crate::extract::{decode_json, ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::lifecycle::CampaignAction;
use crate::models::*;
use crate::store::CampaignStore;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use portal_core::{PortalError, PortalResult};
use portal_notifier::{MailMarketingConfig, NotificationProxy};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const IDEMPOTENCY_HEADER: &str = "idempotency-key";
const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Shared admin API state.
#[derive(Clone)]
pub struct ManagementState {
    pub store: Arc<CampaignStore>,
    pub contacts: Arc<ContactDirectory>,
    pub notifier: NotificationProxy,
}

impl ManagementState {
    pub fn new(store: Arc<CampaignStore>, contacts: Arc<ContactDirectory>, notifier: NotificationProxy) -> Self {
        Self { store, contacts, notifier }
    }
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

pub async fn list_campaigns(
    State(state): State<ManagementState>,
    ValidatedQuery(query): ValidatedQuery<ListCampaignsQuery>,
) -> Json<Vec<Campaign>> {
    Json(state.store.list_campaigns(query.status))
}

pub async fn get_campaign(
    State(state): State<ManagementState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> ApiResult<Json<CampaignDetail>> {
    Ok(Json(state.store.get_detail(id)?))
}

pub async fn create_campaign(
    State(state): State<ManagementState>,
    Extension(admin): Extension<AdminIdentity>,
    ValidatedJson(req): ValidatedJson<CreateCampaignRequest>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    let campaign = state.store.create_campaign(req, &admin.email)?;
    metrics::counter!("portal.campaigns.created").increment(1);
    Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn update_campaign(
    State(state): State<ManagementState>,
    Extension(admin): Extension<AdminIdentity>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCampaignRequest>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.store.update_campaign(id, req, &admin.email)?))
}

pub async fn delete_campaign(
    State(state): State<ManagementState>,
    Extension(admin): Extension<AdminIdentity>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete_campaign(id, &admin.email)?;
    metrics::counter!("portal.campaigns.deleted").increment(1);
    Ok(StatusCode::NO_CONTENT)
}

// ─── Lifecycle ─────────────────────────────────────────────────────────────

pub async fn activate_campaign(
    state: State<ManagementState>,
    admin: Extension<AdminIdentity>,
    id: ValidatedPath<Uuid>,
    body: Bytes,
) -> ApiResult<Json<Campaign>> {
    run_transition(state, admin, id, body, CampaignAction::Activate)
}

pub async fn pause_campaign(
    state: State<ManagementState>,
    admin: Extension<AdminIdentity>,
    id: ValidatedPath<Uuid>,
    body: Bytes,
) -> ApiResult<Json<Campaign>> {
    run_transition(state, admin, id, body, CampaignAction::Pause)
}

pub async fn cancel_campaign(
    state: State<ManagementState>,
    admin: Extension<AdminIdentity>,
    id: ValidatedPath<Uuid>,
    body: Bytes,
) -> ApiResult<Json<Campaign>> {
    run_transition(state, admin, id, body, CampaignAction::Cancel)
}

pub async fn complete_campaign(
    state: State<ManagementState>,
    admin: Extension<AdminIdentity>,
    id: ValidatedPath<Uuid>,
    body: Bytes,
) -> ApiResult<Json<Campaign>> {
    run_transition(state, admin, id, body, CampaignAction::Complete)
}

fn run_transition(
    State(state): State<ManagementState>,
    Extension(admin): Extension<AdminIdentity>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    body: Bytes,
    action: CampaignAction,
) -> ApiResult<Json<Campaign>> {
    let req = parse_transition_body(&body)?;
    let campaign = state
        .store
        .transition(id, action, &admin.email, req.expected_version)?;
    metrics::counter!("portal.campaigns.transitions", "action" => action.as_str()).increment(1);
    Ok(Json(campaign))
}

/// Transition bodies are optional; an empty body means no version check.
fn parse_transition_body(body: &Bytes) -> PortalResult<TransitionRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TransitionRequest::default());
    }
    decode_json(body)
}

// ─── Assets ────────────────────────────────────────────────────────────────

pub async fn list_assets(
    State(state): State<ManagementState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> ApiResult<Json<Vec<CampaignAsset>>> {
    state.store.get_campaign(id)?;
    Ok(Json(state.store.list_assets(id)))
}

pub async fn upsert_asset(
    State(state): State<ManagementState>,
    Extension(admin): Extension<AdminIdentity>,
    ValidatedPath((id, language)): ValidatedPath<(Uuid, String)>,
    ValidatedJson(req): ValidatedJson<UpsertAssetRequest>,
) -> ApiResult<(StatusCode, Json<CampaignAsset>)> {
    let (asset, created) = state.store.upsert_asset(id, &language, req, &admin.email)?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(asset)))
}

// ─── Batches & progress ────────────────────────────────────────────────────

pub async fn list_batches(
    State(state): State<ManagementState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> ApiResult<Json<Vec<CampaignBatch>>> {
    state.store.get_campaign(id)?;
    Ok(Json(state.store.list_batches(id)))
}

pub async fn campaign_progress(
    State(state): State<ManagementState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> ApiResult<Json<Progress>> {
    Ok(Json(state.store.get_progress(id)?))
}

/// POST /campaigns/:id/send-batch — proxied to the notification engine.
/// The engine's reply is passed through; outcome counts, when present, are
/// appended to the batch ledger.
pub async fn send_campaign_batch(
    State(state): State<ManagementState>,
    Extension(admin): Extension<AdminIdentity>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let campaign = state.store.get_campaign(id)?;
    if campaign.status != CampaignStatus::Active {
        return Err(PortalError::invalid_transition(campaign.status, "send_batch").into());
    }

    let key = idempotency_key(&headers)?;
    let reply = match state.notifier.send_campaign_batch(id, &admin.email, &key).await {
        Ok(reply) => reply,
        Err(e) => return Ok(with_idempotency_key(ApiError(e).into_response(), &key)),
    };

    if let Some(outcome) = reply.outcome {
        // The campaign may have been cancelled and deleted while the engine
        // was sending; its ledger must not outlive it.
        let batch = match state.store.record_batch(id, outcome, &admin.email) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(campaign_id = %id, sent = outcome.sent, "Campaign removed during send; batch not recorded");
                return Ok(with_idempotency_key(ApiError(e).into_response(), &key));
            }
        };
        metrics::counter!("portal.batches.sent").increment(outcome.sent);
        metrics::counter!("portal.batches.failed").increment(outcome.failed);
        info!(campaign_id = %id, batch_id = %batch.id, sent = outcome.sent, failed = outcome.failed, "Campaign batch recorded");
    }

    Ok(passthrough(reply.status, reply.body, &key))
}

// ─── Audience ──────────────────────────────────────────────────────────────

pub async fn campaign_audience(
    State(state): State<ManagementState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> ApiResult<Json<AudienceCount>> {
    let campaign = state.store.get_campaign(id)?;
    let criteria = AudienceCriteria::from_campaign(&campaign);
    Ok(Json(audience::count_audience(&state.contacts, &criteria)))
}

/// Live preview: evaluate unsaved edits against a stored campaign.
pub async fn preview_campaign_audience(
    State(state): State<ManagementState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    ValidatedJson(overrides): ValidatedJson<AudienceOverrides>,
) -> ApiResult<Json<AudienceCount>> {
    let campaign = state.store.get_campaign(id)?;
    let criteria = AudienceCriteria::from_campaign(&campaign).with_overrides(&overrides)?;
    Ok(Json(audience::count_audience(&state.contacts, &criteria)))
}

/// Preview for the "new campaign" form, before anything is stored.
pub async fn preview_audience(
    State(state): State<ManagementState>,
    ValidatedJson(overrides): ValidatedJson<AudienceOverrides>,
) -> ApiResult<Json<AudienceCount>> {
    let criteria = AudienceCriteria::from_overrides(&overrides)?;
    Ok(Json(audience::count_audience(&state.contacts, &criteria)))
}

// ─── Mail-marketing (notification engine) ──────────────────────────────────

pub async fn get_mail_config(
    State(state): State<ManagementState>,
    Extension(admin): Extension<AdminIdentity>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(state.notifier.fetch_mail_config(&admin.email).await?))
}

pub async fn update_mail_config(
    State(state): State<ManagementState>,
    Extension(admin): Extension<AdminIdentity>,
    ValidatedJson(config): ValidatedJson<MailMarketingConfig>,
) -> ApiResult<Json<serde_json::Value>> {
    let body = state.notifier.update_mail_config(&config, &admin.email).await?;
    state.store.log_audit(
        &admin.email,
        AuditAction::UpdateMailConfig,
        "mail_marketing_config",
        "global",
        serde_json::to_value(&config).map_err(PortalError::from)?,
    );
    Ok(Json(body))
}

pub async fn trigger_batch_send(
    State(state): State<ManagementState>,
    Extension(admin): Extension<AdminIdentity>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let key = idempotency_key(&headers)?;
    let reply = match state.notifier.trigger_batch_send(&admin.email, &key).await {
        Ok(reply) => reply,
        Err(e) => return Ok(with_idempotency_key(ApiError(e).into_response(), &key)),
    };
    state.store.log_audit(
        &admin.email,
        AuditAction::TriggerSend,
        "mail_marketing",
        "global",
        serde_json::json!({"idempotencyKey": &key}),
    );
    metrics::counter!("portal.batches.triggered").increment(1);
    Ok(passthrough(reply.status, reply.body, &key))
}

// ─── Audit Log ─────────────────────────────────────────────────────────────

pub async fn audit_log(State(state): State<ManagementState>) -> Json<Vec<AuditLogEntry>> {
    Json(state.store.get_audit_log())
}

// ─── Helpers ───────────────────────────────────────────────────────────────

/// Use the caller's `Idempotency-Key` when given so a repeated click maps to
/// the same engine operation; otherwise mint one.
fn idempotency_key(headers: &HeaderMap) -> PortalResult<String> {
    let Some(value) = headers.get(IDEMPOTENCY_HEADER) else {
        return Ok(Uuid::new_v4().to_string());
    };
    let key = value
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|k| !k.is_empty() && k.len() <= MAX_IDEMPOTENCY_KEY_LEN)
        .ok_or_else(|| {
            PortalError::validation(
                IDEMPOTENCY_HEADER,
                format!("must be 1-{MAX_IDEMPOTENCY_KEY_LEN} visible ASCII characters"),
            )
        })?;
    Ok(key.to_string())
}

/// Relay an engine reply. Empty replies (204 and the like) stay empty.
fn passthrough(status: u16, body: serde_json::Value, key: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    let response = if body.is_null() {
        status.into_response()
    } else {
        (status, Json(body)).into_response()
    };
    with_idempotency_key(response, key)
}

fn with_idempotency_key(mut response: Response, key: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(key) {
        response.headers_mut().insert(IDEMPOTENCY_HEADER, value);
    }
    response
}
