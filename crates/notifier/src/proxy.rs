//! Typed proxy operations over the notification engine.
//!
//! This layer only shapes requests and maps replies: no retries, no pacing.
//! Non-success replies surface as [`PortalError::Upstream`] carrying the
//! engine's status and body verbatim.

use portal_core::{PortalError, PortalResult};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::{EngineCall, EngineReply, NotificationEngine};
use crate::models::{BatchOutcome, MailMarketingConfig};

const MAIL_CONFIG_PATH: &str = "/mail-marketing/config";
const SEND_BATCH_PATH: &str = "/mail-marketing/send-batch";

/// Result of a campaign batch send: the engine's body for passthrough, plus
/// the outcome counts when the body carried them.
#[derive(Debug, Clone)]
pub struct CampaignSendReply {
    pub status: u16,
    pub body: serde_json::Value,
    pub outcome: Option<BatchOutcome>,
}

#[derive(Clone)]
pub struct NotificationProxy {
    engine: Arc<dyn NotificationEngine>,
}

impl NotificationProxy {
    pub fn new(engine: Arc<dyn NotificationEngine>) -> Self {
        Self { engine }
    }

    pub async fn fetch_mail_config(&self, actor: &str) -> PortalResult<serde_json::Value> {
        let reply = self
            .call(EngineCall::get(MAIL_CONFIG_PATH).acting_as(actor))
            .await?;
        Ok(reply.body)
    }

    /// Validates locally before forwarding so obviously bad settings never
    /// reach the engine.
    pub async fn update_mail_config(
        &self,
        config: &MailMarketingConfig,
        actor: &str,
    ) -> PortalResult<serde_json::Value> {
        config.validate().map_err(PortalError::Validation)?;
        let payload = serde_json::to_value(config)?;
        let reply = self
            .call(EngineCall::put(MAIL_CONFIG_PATH, payload).acting_as(actor))
            .await?;
        info!(actor = %actor, paused = config.paused, batch_size = config.batch_size, "Mail-marketing config updated");
        Ok(reply.body)
    }

    /// Ask the engine to run its next global batch across all active campaigns.
    pub async fn trigger_batch_send(
        &self,
        actor: &str,
        idempotency_key: &str,
    ) -> PortalResult<EngineReply> {
        let call = EngineCall::post(SEND_BATCH_PATH, serde_json::json!({ "triggeredBy": actor }))
            .acting_as(actor)
            .idempotency_key(idempotency_key);
        self.call(call).await
    }

    pub async fn send_campaign_batch(
        &self,
        campaign_id: Uuid,
        actor: &str,
        idempotency_key: &str,
    ) -> PortalResult<CampaignSendReply> {
        let call = EngineCall::post(
            format!("/mail-marketing/campaigns/{campaign_id}/send-batch"),
            serde_json::json!({ "campaignId": campaign_id, "triggeredBy": actor }),
        )
        .acting_as(actor)
        .idempotency_key(idempotency_key);

        let reply = self.call(call).await?;
        let outcome = serde_json::from_value::<BatchOutcome>(reply.body.clone()).ok();
        if outcome.is_none() {
            warn!(campaign_id = %campaign_id, "Engine accepted batch without outcome counts");
        }
        Ok(CampaignSendReply {
            status: reply.status,
            body: reply.body,
            outcome,
        })
    }

    async fn call(&self, call: EngineCall) -> PortalResult<EngineReply> {
        let path = call.path.clone();
        let reply = match self.engine.send(call).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, path = %path, "Notification engine unreachable");
                metrics::counter!("portal.upstream.errors", "kind" => "transport").increment(1);
                return Err(PortalError::UpstreamUnavailable(e.to_string()));
            }
        };
        if reply.is_success() {
            Ok(reply)
        } else {
            warn!(status = reply.status, path = %path, "Notification engine rejected request");
            metrics::counter!("portal.upstream.errors", "kind" => "status").increment(1);
            Err(PortalError::Upstream {
                status: reply.status,
                body: reply.body,
            })
        }
    }
}
