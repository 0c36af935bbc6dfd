//! Contact directory — the lead and user pools campaigns draw recipients from.
//!
//! Leads and users are owned by other parts of the platform; this subsystem
//! only reads them to size audiences. Data stored in DashMap (development).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use portal_segmentation::FilterRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::models::NotificationCategory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Active,
    Unsubscribed,
    /// Hard bounce; the address is undeliverable.
    Bounced,
}

impl EmailStatus {
    pub fn is_contactable(&self) -> bool {
        matches!(self, EmailStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub email: String,
    pub email_status: EmailStatus,
    pub locale: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub notification_preferences: Vec<NotificationCategory>,
    pub locale: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(email: impl Into<String>, email_status: EmailStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            email_status,
            locale: None,
            source: None,
            attributes: HashMap::new(),
            created_at: Utc::now(),
        }
    }
}

impl User {
    pub fn new(email: impl Into<String>, preferences: Vec<NotificationCategory>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            notification_preferences: preferences,
            locale: None,
            attributes: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether the user opted into at least one of `categories`.
    pub fn accepts_any(&self, categories: &[NotificationCategory]) -> bool {
        self.notification_preferences
            .iter()
            .any(|p| categories.contains(p))
    }
}

// Fixed columns resolve first; anything else falls through to attributes.
impl FilterRecord for Lead {
    fn field(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "id" => Some(serde_json::json!(self.id)),
            "email" => Some(serde_json::json!(self.email)),
            "emailStatus" => serde_json::to_value(self.email_status).ok(),
            "locale" => self.locale.as_ref().map(|v| serde_json::json!(v)),
            "source" => self.source.as_ref().map(|v| serde_json::json!(v)),
            "createdAt" => Some(serde_json::json!(self.created_at.to_rfc3339())),
            other => self.attributes.get(other).cloned(),
        }
    }
}

impl FilterRecord for User {
    fn field(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "id" => Some(serde_json::json!(self.id)),
            "email" => Some(serde_json::json!(self.email)),
            "notificationPreferences" => serde_json::to_value(&self.notification_preferences).ok(),
            "locale" => self.locale.as_ref().map(|v| serde_json::json!(v)),
            "createdAt" => Some(serde_json::json!(self.created_at.to_rfc3339())),
            other => self.attributes.get(other).cloned(),
        }
    }
}

/// Thread-safe in-memory lead and user pools.
pub struct ContactDirectory {
    leads: DashMap<Uuid, Lead>,
    users: DashMap<Uuid, User>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self {
            leads: DashMap::new(),
            users: DashMap::new(),
        }
    }

    pub fn with_demo_data() -> Self {
        let directory = Self::new();
        directory.seed_demo_data();
        info!(
            leads = directory.leads.len(),
            users = directory.users.len(),
            "Contact directory seeded with demo data"
        );
        directory
    }

    pub fn upsert_lead(&self, lead: Lead) {
        self.leads.insert(lead.id, lead);
    }

    pub fn upsert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Count leads matching `predicate`. The predicate sees each lead under
    /// the shard read lock, so it must not call back into the directory.
    pub fn count_leads(&self, predicate: impl Fn(&Lead) -> bool) -> u64 {
        self.leads.iter().filter(|r| predicate(r.value())).count() as u64
    }

    pub fn count_users(&self, predicate: impl Fn(&User) -> bool) -> u64 {
        self.users.iter().filter(|r| predicate(r.value())).count() as u64
    }

    pub fn lead_count(&self) -> usize {
        self.leads.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    // ─── Demo Data ─────────────────────────────────────────────────────────

    fn seed_demo_data(&self) {
        use chrono::Duration;
        use NotificationCategory::*;
        let now = Utc::now();

        let leads = [
            ("mila@example.com", EmailStatus::Active, "en", "landing_page", 2),
            ("jonas@example.de", EmailStatus::Active, "de", "referral", 14),
            ("lucia@example.es", EmailStatus::Unsubscribed, "es", "landing_page", 30),
            ("tom@example.com", EmailStatus::Bounced, "en", "ads", 45),
            ("ines@example.pt", EmailStatus::Active, "pt-BR", "ads", 60),
        ];
        for (email, status, locale, source, age_days) in leads {
            let mut lead = Lead::new(email, status);
            lead.locale = Some(locale.to_string());
            lead.source = Some(source.to_string());
            lead.created_at = now - Duration::days(age_days);
            self.upsert_lead(lead);
        }

        let users = [
            ("parent1@example.com", vec![Essential, Inspiration, News], "en", 12),
            ("parent2@example.de", vec![Essential], "de", 3),
            ("teacher@example.fr", vec![Essential, News], "fr", 40),
            ("grandma@example.com", vec![Inspiration], "en", 0),
        ];
        for (email, prefs, locale, stories) in users {
            let mut user = User::new(email, prefs);
            user.locale = Some(locale.to_string());
            user.attributes
                .insert("storiesCreated".to_string(), serde_json::json!(stories));
            self.upsert_user(user);
        }
    }
}

impl Default for ContactDirectory {
    fn default() -> Self {
        Self::new()
    }
}
