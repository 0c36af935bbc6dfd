//! Request validation at the API boundary.
//!
//! Validators collect every violation rather than stopping at the first, so
//! the admin UI can highlight all offending fields at once.

use portal_core::{FieldError, PortalError, PortalResult};

use crate::models::{Campaign, UpsertAssetRequest};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2_000;
pub const MAX_SUBJECT_LEN: usize = 255;

/// Validate a campaign as it would be stored, after defaults or a partial
/// update have been applied.
pub fn validate_campaign(campaign: &Campaign) -> PortalResult<()> {
    let mut errors = Vec::new();

    let title = campaign.title.trim();
    if title.is_empty() {
        errors.push(FieldError::new("title", "must not be empty"));
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.push(FieldError::new(
            "title",
            format!("must be at most {MAX_TITLE_LEN} characters"),
        ));
    }

    if let Some(description) = &campaign.description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            errors.push(FieldError::new(
                "description",
                format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
            ));
        }
    }

    if campaign.audience_source.includes_users()
        && campaign.user_notification_preferences.is_empty()
    {
        errors.push(FieldError::new(
            "userNotificationPreferences",
            "at least one category is required when the audience includes users",
        ));
    }

    if campaign.daily_send_limit == Some(0) {
        errors.push(FieldError::new("dailySendLimit", "must be greater than zero"));
    }

    if let (Some(start), Some(end)) = (campaign.start_at, campaign.end_at) {
        if start >= end {
            errors.push(FieldError::new("endAt", "must be after startAt"));
        }
    }

    if let Some(tree) = &campaign.filter_tree {
        if let Err(tree_errors) = portal_segmentation::validate(tree, "filterTree") {
            errors.extend(tree_errors);
        }
    }

    finish(errors)
}

pub fn validate_asset(language: &str, req: &UpsertAssetRequest) -> PortalResult<()> {
    let mut errors = Vec::new();

    if !is_language_tag(language) {
        errors.push(FieldError::new(
            "language",
            "must be a language tag such as en, de or pt-BR",
        ));
    }

    let subject = req.subject.trim();
    if subject.is_empty() {
        errors.push(FieldError::new("subject", "must not be empty"));
    } else if subject.chars().count() > MAX_SUBJECT_LEN {
        errors.push(FieldError::new(
            "subject",
            format!("must be at most {MAX_SUBJECT_LEN} characters"),
        ));
    }

    if req.html_body.trim().is_empty() {
        errors.push(FieldError::new("htmlBody", "must not be empty"));
    }

    finish(errors)
}

/// Accepts a 2–3 letter primary subtag, optionally followed by one 2–4
/// character alphanumeric subtag (`en`, `pt-BR`, `zh-Hant`).
pub fn is_language_tag(tag: &str) -> bool {
    let mut parts = tag.split('-');
    let primary = parts.next().unwrap_or_default();
    let primary_ok =
        (2..=3).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_lowercase());
    let rest_ok = match parts.next() {
        None => true,
        Some(sub) => {
            (2..=4).contains(&sub.len()) && sub.chars().all(|c| c.is_ascii_alphanumeric())
        }
    };
    primary_ok && rest_ok && parts.next().is_none()
}

fn finish(errors: Vec<FieldError>) -> PortalResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PortalError::Validation(errors))
    }
}
