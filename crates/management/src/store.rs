//! In-memory campaign store backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store.
//! Each campaign mutation runs under that campaign's entry guard, which gives
//! the same row-level atomicity a transactional update would.

use crate::lifecycle::{self, CampaignAction};
use crate::models::*;
use crate::progress;
use crate::validation;
use chrono::Utc;
use dashmap::DashMap;
use portal_core::{PortalError, PortalResult};
use portal_notifier::BatchOutcome;
use tracing::info;
use uuid::Uuid;

/// Thread-safe store for campaigns, their assets and batch ledgers, and the
/// audit log.
pub struct CampaignStore {
    campaigns: DashMap<Uuid, Campaign>,
    assets: DashMap<(Uuid, String), CampaignAsset>,
    batches: DashMap<Uuid, Vec<CampaignBatch>>,
    audit_log: DashMap<Uuid, AuditLogEntry>,
}

impl CampaignStore {
    pub fn new() -> Self {
        Self {
            campaigns: DashMap::new(),
            assets: DashMap::new(),
            batches: DashMap::new(),
            audit_log: DashMap::new(),
        }
    }

    pub fn with_demo_data() -> Self {
        let store = Self::new();
        store.seed_demo_data();
        info!(
            campaigns = store.campaigns.len(),
            "Campaign store initialized (in-memory, development mode)"
        );
        store
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn list_campaigns(&self, status: Option<CampaignStatus>) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|r| status.map_or(true, |s| r.value().status == s))
            .map(|r| r.value().clone())
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn get_campaign(&self, id: Uuid) -> PortalResult<Campaign> {
        self.campaigns
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| PortalError::not_found("campaign", id))
    }

    pub fn create_campaign(&self, req: CreateCampaignRequest, actor: &str) -> PortalResult<Campaign> {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            title: req.title.trim().to_string(),
            description: req.description,
            audience_source: req.audience_source,
            user_notification_preferences: dedup(req.user_notification_preferences),
            filter_tree: req.filter_tree,
            daily_send_limit: req.daily_send_limit,
            status: CampaignStatus::Draft,
            start_at: req.start_at,
            end_at: req.end_at,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
            created_at: now,
            updated_at: now,
            version: 1,
        };
        validation::validate_campaign(&campaign)?;

        let id = campaign.id;
        self.campaigns.insert(id, campaign.clone());
        self.log_audit(
            actor,
            AuditAction::Create,
            "campaign",
            &id.to_string(),
            serde_json::json!({"title": &campaign.title}),
        );
        info!(campaign_id = %id, actor = %actor, "Campaign created");
        Ok(campaign)
    }

    /// Apply a partial update. Allowed only while the campaign is `draft` or
    /// `paused`; the merged result must validate as a whole.
    pub fn update_campaign(
        &self,
        id: Uuid,
        req: UpdateCampaignRequest,
        actor: &str,
    ) -> PortalResult<Campaign> {
        let mut entry = self
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| PortalError::not_found("campaign", id))?;
        let current = entry.value();
        check_version(current, req.expected_version)?;
        if !current.status.is_editable() {
            return Err(PortalError::invalid_transition(current.status, "update"));
        }

        let mut next = current.clone();
        if let Some(title) = req.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = req.description {
            next.description = description;
        }
        if let Some(source) = req.audience_source {
            next.audience_source = source;
        }
        if let Some(prefs) = req.user_notification_preferences {
            next.user_notification_preferences = dedup(prefs);
        }
        if let Some(tree) = req.filter_tree {
            next.filter_tree = tree;
        }
        if let Some(limit) = req.daily_send_limit {
            next.daily_send_limit = limit;
        }
        if let Some(start) = req.start_at {
            next.start_at = start;
        }
        if let Some(end) = req.end_at {
            next.end_at = end;
        }
        validation::validate_campaign(&next)?;

        stamp(&mut next, actor);
        *entry.value_mut() = next.clone();
        drop(entry);

        self.log_audit(
            actor,
            AuditAction::Update,
            "campaign",
            &id.to_string(),
            serde_json::json!({"version": next.version}),
        );
        Ok(next)
    }

    /// Delete a `draft` or `cancelled` campaign together with its assets and
    /// batch ledger.
    pub fn delete_campaign(&self, id: Uuid, actor: &str) -> PortalResult<()> {
        let removed = self
            .campaigns
            .remove_if(&id, |_, c| c.status.is_deletable());
        let Some((_, campaign)) = removed else {
            return match self.campaigns.get(&id) {
                Some(c) => Err(PortalError::invalid_transition(c.status, "delete")),
                None => Err(PortalError::not_found("campaign", id)),
            };
        };

        self.assets.retain(|(campaign_id, _), _| *campaign_id != id);
        self.batches.remove(&id);
        self.log_audit(
            actor,
            AuditAction::Delete,
            "campaign",
            &id.to_string(),
            serde_json::json!({"title": campaign.title, "status": campaign.status}),
        );
        info!(campaign_id = %id, actor = %actor, "Campaign deleted");
        Ok(())
    }

    /// Run a lifecycle transition. On any failure the stored campaign is left
    /// untouched.
    pub fn transition(
        &self,
        id: Uuid,
        action: CampaignAction,
        actor: &str,
        expected_version: Option<u64>,
    ) -> PortalResult<Campaign> {
        let mut entry = self
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| PortalError::not_found("campaign", id))?;
        let from = entry.status;
        check_version(entry.value(), expected_version)?;
        let to = lifecycle::next_status(from, action)?;

        // The engine has nothing to send without content.
        if action == CampaignAction::Activate && self.asset_count(id) == 0 {
            return Err(PortalError::validation(
                "assets",
                "at least one language asset is required before activation",
            ));
        }

        let campaign = entry.value_mut();
        campaign.status = to;
        stamp(campaign, actor);
        let updated = campaign.clone();
        drop(entry);

        self.log_audit(
            actor,
            action.audit_action(),
            "campaign",
            &id.to_string(),
            serde_json::json!({"from": from, "to": to}),
        );
        info!(campaign_id = %id, actor = %actor, from = %from, to = %to, "Campaign transitioned");
        Ok(updated)
    }

    // ─── Assets ────────────────────────────────────────────────────────────

    pub fn list_assets(&self, campaign_id: Uuid) -> Vec<CampaignAsset> {
        let mut assets: Vec<CampaignAsset> = self
            .assets
            .iter()
            .filter(|r| r.key().0 == campaign_id)
            .map(|r| r.value().clone())
            .collect();
        assets.sort_by(|a, b| a.language.cmp(&b.language));
        assets
    }

    pub fn asset_count(&self, campaign_id: Uuid) -> usize {
        self.assets.iter().filter(|r| r.key().0 == campaign_id).count()
    }

    /// Insert or replace the asset for `(campaign_id, language)`. Returns the
    /// stored asset and whether it was newly created.
    pub fn upsert_asset(
        &self,
        campaign_id: Uuid,
        language: &str,
        req: UpsertAssetRequest,
        actor: &str,
    ) -> PortalResult<(CampaignAsset, bool)> {
        // Held until the asset is written so a concurrent delete cannot
        // cascade in between and leave the asset orphaned.
        let campaign = self
            .campaigns
            .get(&campaign_id)
            .ok_or_else(|| PortalError::not_found("campaign", campaign_id))?;
        validation::validate_asset(language, &req)?;

        let now = Utc::now();
        let key = (campaign_id, language.to_string());
        let mut created = false;
        let asset = self
            .assets
            .entry(key)
            .and_modify(|a| {
                a.subject = req.subject.trim().to_string();
                a.html_body = req.html_body.clone();
                a.text_body = req.text_body.clone();
                a.updated_by = actor.to_string();
                a.updated_at = now;
            })
            .or_insert_with(|| {
                created = true;
                CampaignAsset {
                    campaign_id,
                    language: language.to_string(),
                    subject: req.subject.trim().to_string(),
                    html_body: req.html_body.clone(),
                    text_body: req.text_body.clone(),
                    updated_by: actor.to_string(),
                    created_at: now,
                    updated_at: now,
                }
            })
            .value()
            .clone();
        drop(campaign);

        self.log_audit(
            actor,
            AuditAction::UpsertAsset,
            "campaign_asset",
            &format!("{campaign_id}/{language}"),
            serde_json::json!({"created": created}),
        );
        Ok((asset, created))
    }

    // ─── Batches ───────────────────────────────────────────────────────────

    /// Append a batch to the ledger. Fails with `NotFound` if the campaign was
    /// deleted while the engine was sending.
    pub fn record_batch(
        &self,
        campaign_id: Uuid,
        outcome: BatchOutcome,
        actor: &str,
    ) -> PortalResult<CampaignBatch> {
        let campaign = self
            .campaigns
            .get(&campaign_id)
            .ok_or_else(|| PortalError::not_found("campaign", campaign_id))?;
        let batch = CampaignBatch {
            id: Uuid::new_v4(),
            campaign_id,
            sent: outcome.sent,
            failed: outcome.failed,
            skipped: outcome.skipped,
            queued: outcome.queued,
            triggered_by: actor.to_string(),
            created_at: Utc::now(),
        };
        self.batches.entry(campaign_id).or_default().push(batch.clone());
        drop(campaign);

        self.log_audit(
            actor,
            AuditAction::SendBatch,
            "campaign",
            &campaign_id.to_string(),
            serde_json::json!({"batchId": batch.id, "sent": batch.sent, "failed": batch.failed}),
        );
        Ok(batch)
    }

    /// Batch ledger, newest first.
    pub fn list_batches(&self, campaign_id: Uuid) -> Vec<CampaignBatch> {
        let mut batches = self
            .batches
            .get(&campaign_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        batches
    }

    pub fn get_progress(&self, campaign_id: Uuid) -> PortalResult<Progress> {
        if !self.campaigns.contains_key(&campaign_id) {
            return Err(PortalError::not_found("campaign", campaign_id));
        }
        let batches = self
            .batches
            .get(&campaign_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        Ok(progress::aggregate(&batches))
    }

    pub fn get_detail(&self, id: Uuid) -> PortalResult<CampaignDetail> {
        let campaign = self.get_campaign(id)?;
        Ok(CampaignDetail {
            assets: self.list_assets(id),
            progress: self.get_progress(id)?,
            campaign,
        })
    }

    // ─── Audit Log ─────────────────────────────────────────────────────────

    pub fn get_audit_log(&self) -> Vec<AuditLogEntry> {
        let mut entries: Vec<AuditLogEntry> = self.audit_log.iter().map(|r| r.value().clone()).collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    pub fn log_audit(
        &self,
        actor: &str,
        action: AuditAction,
        resource_type: &str,
        resource_id: &str,
        details: serde_json::Value,
    ) {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            action,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            details,
            timestamp: Utc::now(),
        };
        self.audit_log.insert(entry.id, entry);
    }

    // ─── Demo Data ─────────────────────────────────────────────────────────

    fn seed_demo_data(&self) {
        use chrono::Duration;
        use portal_segmentation::FilterBuilder;
        let now = Utc::now();
        let seeder = "seed@localhost";

        let campaigns = vec![
            ("Spring story challenge", CampaignStatus::Active, AudienceSource::Both, vec![NotificationCategory::Inspiration], Some((120, 4, 9, 300))),
            ("Re-engage trial leads", CampaignStatus::Paused, AudienceSource::Leads, vec![], Some((80, 1, 3, 0))),
            ("New voices feature", CampaignStatus::Draft, AudienceSource::Users, vec![NotificationCategory::News], None),
            ("Holiday bedtime series", CampaignStatus::Completed, AudienceSource::Both, vec![NotificationCategory::Inspiration, NotificationCategory::News], Some((950, 12, 40, 0))),
        ];

        for (i, (title, status, source, prefs, batch)) in campaigns.into_iter().enumerate() {
            let id = Uuid::new_v4();
            let created_at = now - Duration::days(30 - i as i64 * 7);
            self.campaigns.insert(id, Campaign {
                id,
                title: title.to_string(),
                description: Some(format!("{title} (demo)")),
                audience_source: source,
                user_notification_preferences: prefs,
                filter_tree: Some(FilterBuilder::all().field_in("locale", vec!["en".into(), "de".into()]).build()),
                daily_send_limit: Some(1_000),
                status,
                start_at: Some(created_at + Duration::days(1)),
                end_at: Some(created_at + Duration::days(60)),
                created_by: seeder.to_string(),
                updated_by: seeder.to_string(),
                created_at,
                updated_at: created_at,
                version: 1,
            });

            for (language, subject) in [("en", title.to_string()), ("de", format!("{title} (DE)"))] {
                self.assets.insert((id, language.to_string()), CampaignAsset {
                    campaign_id: id,
                    language: language.to_string(),
                    subject,
                    html_body: format!("<h1>{title}</h1><p>Create a new story tonight.</p>"),
                    text_body: Some(format!("{title}\n\nCreate a new story tonight.")),
                    updated_by: seeder.to_string(),
                    created_at,
                    updated_at: created_at,
                });
            }

            if let Some((sent, failed, skipped, queued)) = batch {
                self.batches.insert(id, vec![CampaignBatch {
                    id: Uuid::new_v4(),
                    campaign_id: id,
                    sent,
                    failed,
                    skipped,
                    queued,
                    triggered_by: seeder.to_string(),
                    created_at: created_at + Duration::days(2),
                }]);
            }
        }
    }
}

impl Default for CampaignStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_version(campaign: &Campaign, expected: Option<u64>) -> PortalResult<()> {
    match expected {
        Some(expected) if expected != campaign.version => Err(PortalError::VersionConflict {
            expected,
            actual: campaign.version,
        }),
        _ => Ok(()),
    }
}

fn stamp(campaign: &mut Campaign, actor: &str) {
    campaign.updated_by = actor.to_string();
    campaign.updated_at = Utc::now();
    campaign.version += 1;
}

fn dedup(mut categories: Vec<NotificationCategory>) -> Vec<NotificationCategory> {
    let mut seen = Vec::with_capacity(categories.len());
    categories.retain(|c| {
        if seen.contains(c) {
            false
        } else {
            seen.push(*c);
            true
        }
    });
    categories
}
