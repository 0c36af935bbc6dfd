//! Audience resolution — sizes a campaign's recipient pools.

use portal_core::{PortalError, PortalResult};
use portal_segmentation::FilterNode;

use crate::contacts::ContactDirectory;
use crate::models::{AudienceCount, AudienceOverrides, AudienceSource, Campaign, NotificationCategory};

/// The parts of a campaign that decide who receives it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudienceCriteria {
    pub source: AudienceSource,
    pub preferences: Vec<NotificationCategory>,
    pub filter: Option<FilterNode>,
}

impl AudienceCriteria {
    pub fn from_campaign(campaign: &Campaign) -> Self {
        Self {
            source: campaign.audience_source,
            preferences: campaign.user_notification_preferences.clone(),
            filter: campaign.filter_tree.clone(),
        }
    }

    /// Criteria for a campaign that does not exist yet. `audienceSource` is
    /// mandatory in that case.
    pub fn from_overrides(overrides: &AudienceOverrides) -> PortalResult<Self> {
        let source = overrides
            .audience_source
            .ok_or_else(|| PortalError::validation("audienceSource", "is required"))?;
        let criteria = Self {
            source,
            preferences: overrides
                .user_notification_preferences
                .clone()
                .unwrap_or_default(),
            filter: overrides.filter_tree.clone().flatten(),
        };
        criteria.validate()?;
        Ok(criteria)
    }

    /// Apply unsaved draft values on top of stored criteria.
    pub fn with_overrides(mut self, overrides: &AudienceOverrides) -> PortalResult<Self> {
        if let Some(source) = overrides.audience_source {
            self.source = source;
        }
        if let Some(preferences) = &overrides.user_notification_preferences {
            self.preferences = preferences.clone();
        }
        if let Some(filter) = &overrides.filter_tree {
            self.filter = filter.clone();
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> PortalResult<()> {
        match &self.filter {
            Some(tree) => {
                portal_segmentation::validate(tree, "filterTree").map_err(PortalError::Validation)
            }
            None => Ok(()),
        }
    }
}

/// Count candidate recipients per pool.
///
/// Leads that unsubscribed or hard-bounced never count. Users count only when
/// their notification preferences intersect the campaign's categories.
pub fn count_audience(directory: &ContactDirectory, criteria: &AudienceCriteria) -> AudienceCount {
    let filter = criteria.filter.as_ref();

    let leads = if criteria.source.includes_leads() {
        directory.count_leads(|lead| {
            lead.email_status.is_contactable() && portal_segmentation::matches(filter, lead)
        })
    } else {
        0
    };

    let users = if criteria.source.includes_users() {
        directory.count_users(|user| {
            user.accepts_any(&criteria.preferences) && portal_segmentation::matches(filter, user)
        })
    } else {
        0
    };

    AudienceCount {
        leads,
        users,
        total: leads + users,
    }
}
