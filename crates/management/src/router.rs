//! Admin API router — mounts all campaign endpoints under /api/v1/admin.

use crate::auth::{self, SessionAuth};
use crate::handlers::{self, ManagementState};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;

/// Build the admin router. Every route requires an allowed admin session;
/// unmatched paths fall through without authentication.
pub fn management_router(state: ManagementState, session: SessionAuth) -> Router {
    Router::new()
        // Campaigns
        .route("/api/v1/admin/campaigns", get(handlers::list_campaigns).post(handlers::create_campaign))
        .route("/api/v1/admin/campaigns/:id", get(handlers::get_campaign).put(handlers::update_campaign).delete(handlers::delete_campaign))
        // Lifecycle
        .route("/api/v1/admin/campaigns/:id/activate", post(handlers::activate_campaign))
        .route("/api/v1/admin/campaigns/:id/pause", post(handlers::pause_campaign))
        .route("/api/v1/admin/campaigns/:id/cancel", post(handlers::cancel_campaign))
        .route("/api/v1/admin/campaigns/:id/complete", post(handlers::complete_campaign))
        // Assets
        .route("/api/v1/admin/campaigns/:id/assets", get(handlers::list_assets))
        .route("/api/v1/admin/campaigns/:id/assets/:language", put(handlers::upsert_asset))
        // Sending & monitoring
        .route("/api/v1/admin/campaigns/:id/batches", get(handlers::list_batches))
        .route("/api/v1/admin/campaigns/:id/progress", get(handlers::campaign_progress))
        .route("/api/v1/admin/campaigns/:id/send-batch", post(handlers::send_campaign_batch))
        // Audience
        .route("/api/v1/admin/campaigns/:id/audience", get(handlers::campaign_audience))
        .route("/api/v1/admin/campaigns/:id/audience/preview", post(handlers::preview_campaign_audience))
        .route("/api/v1/admin/audience/preview", post(handlers::preview_audience))
        // Mail marketing
        .route("/api/v1/admin/mail-marketing/config", get(handlers::get_mail_config).put(handlers::update_mail_config))
        .route("/api/v1/admin/mail-marketing/send-batch", post(handlers::trigger_batch_send))
        // Audit log
        .route("/api/v1/admin/audit-log", get(handlers::audit_log))
        .route_layer(middleware::from_fn_with_state(session, auth::require_admin))
        .with_state(state)
}
