//! Campaign domain types — campaigns, assets, batches, audit log, and the
//! request/response shapes of the admin API.

use chrono::{DateTime, Utc};
use portal_core::FieldError;
use portal_segmentation::FilterNode;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ─── Campaign ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub audience_source: AudienceSource,
    pub user_notification_preferences: Vec<NotificationCategory>,
    pub filter_tree: Option<FilterNode>,
    pub daily_send_limit: Option<u32>,
    pub status: CampaignStatus,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every mutation; clients echo it back as `expectedVersion`.
    pub version: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AudienceSource {
    Users,
    Leads,
    Both,
}

impl AudienceSource {
    pub fn includes_leads(&self) -> bool {
        matches!(self, AudienceSource::Leads | AudienceSource::Both)
    }

    pub fn includes_users(&self) -> bool {
        matches!(self, AudienceSource::Users | AudienceSource::Both)
    }
}

/// Categories of email a user can opt into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Essential,
    Inspiration,
    News,
}

// ─── Assets ────────────────────────────────────────────────────────────────

/// Rendered content for one locale of a campaign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignAsset {
    pub campaign_id: Uuid,
    pub language: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─── Batches & progress ────────────────────────────────────────────────────

/// One send attempt as reported by the notification engine. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignBatch {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    #[serde(default)]
    pub queued: u64,
    pub triggered_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    pub queued: u64,
    pub total: u64,
}

// ─── Audience ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AudienceCount {
    pub leads: u64,
    pub users: u64,
    pub total: u64,
}

/// Hypothetical audience settings evaluated without being persisted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceOverrides {
    pub audience_source: Option<AudienceSource>,
    pub user_notification_preferences: Option<Vec<NotificationCategory>>,
    #[serde(default, deserialize_with = "double_option")]
    pub filter_tree: Option<Option<FilterNode>>,
}

// ─── Audit Log ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Activate,
    Pause,
    Cancel,
    Complete,
    UpsertAsset,
    SendBatch,
    TriggerSend,
    UpdateMailConfig,
}

// ─── API Request/Response types ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub title: String,
    pub description: Option<String>,
    pub audience_source: AudienceSource,
    #[serde(default)]
    pub user_notification_preferences: Vec<NotificationCategory>,
    pub filter_tree: Option<FilterNode>,
    pub daily_send_limit: Option<u32>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// Partial update. For nullable fields, an explicit `null` clears the value
/// while an absent key leaves it untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCampaignRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub audience_source: Option<AudienceSource>,
    pub user_notification_preferences: Option<Vec<NotificationCategory>>,
    #[serde(default, deserialize_with = "double_option")]
    pub filter_tree: Option<Option<FilterNode>>,
    #[serde(default, deserialize_with = "double_option")]
    pub daily_send_limit: Option<Option<u32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_at: Option<Option<DateTime<Utc>>>,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAssetRequest {
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListCampaignsQuery {
    pub status: Option<CampaignStatus>,
}

/// Detail view: the campaign plus everything the detail page shows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDetail {
    pub campaign: Campaign,
    pub assets: Vec<CampaignAsset>,
    pub progress: Progress,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
