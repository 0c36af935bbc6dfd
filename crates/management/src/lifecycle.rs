//! Campaign lifecycle state machine.
//!
//! ```text
//! draft ──activate──▶ active ──pause──▶ paused
//!   │                  ▲  │               │
//!   │                  └──┼───activate────┘
//!   │                     └──complete──▶ completed ◀──complete── paused
//!   └──cancel──▶ cancelled ◀──cancel── active | paused
//! ```

use portal_core::{PortalError, PortalResult};
use serde::{Deserialize, Serialize};

use crate::models::{AuditAction, CampaignStatus};

/// An explicit lifecycle operation requested by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignAction {
    Activate,
    Pause,
    Complete,
    Cancel,
}

/// Describes a single valid state transition.
#[derive(Debug, Clone, Copy)]
pub struct StateTransition {
    pub from: CampaignStatus,
    pub action: CampaignAction,
    pub to: CampaignStatus,
}

const TRANSITIONS: &[StateTransition] = &[
    // draft ->
    StateTransition {
        from: CampaignStatus::Draft,
        action: CampaignAction::Activate,
        to: CampaignStatus::Active,
    },
    StateTransition {
        from: CampaignStatus::Draft,
        action: CampaignAction::Cancel,
        to: CampaignStatus::Cancelled,
    },
    // active ->
    StateTransition {
        from: CampaignStatus::Active,
        action: CampaignAction::Pause,
        to: CampaignStatus::Paused,
    },
    StateTransition {
        from: CampaignStatus::Active,
        action: CampaignAction::Complete,
        to: CampaignStatus::Completed,
    },
    StateTransition {
        from: CampaignStatus::Active,
        action: CampaignAction::Cancel,
        to: CampaignStatus::Cancelled,
    },
    // paused ->
    StateTransition {
        from: CampaignStatus::Paused,
        action: CampaignAction::Activate,
        to: CampaignStatus::Active,
    },
    StateTransition {
        from: CampaignStatus::Paused,
        action: CampaignAction::Complete,
        to: CampaignStatus::Completed,
    },
    StateTransition {
        from: CampaignStatus::Paused,
        action: CampaignAction::Cancel,
        to: CampaignStatus::Cancelled,
    },
];

impl CampaignAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignAction::Activate => "activate",
            CampaignAction::Pause => "pause",
            CampaignAction::Complete => "complete",
            CampaignAction::Cancel => "cancel",
        }
    }

    pub fn audit_action(&self) -> AuditAction {
        match self {
            CampaignAction::Activate => AuditAction::Activate,
            CampaignAction::Pause => AuditAction::Pause,
            CampaignAction::Complete => AuditAction::Complete,
            CampaignAction::Cancel => AuditAction::Cancel,
        }
    }
}

impl CampaignStatus {
    /// `completed` and `cancelled` accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Cancelled)
    }

    /// Only campaigns that never sent, or were abandoned, may be deleted.
    pub fn is_deletable(&self) -> bool {
        matches!(self, CampaignStatus::Draft | CampaignStatus::Cancelled)
    }

    /// Metadata may change while nothing is being sent.
    pub fn is_editable(&self) -> bool {
        matches!(self, CampaignStatus::Draft | CampaignStatus::Paused)
    }
}

/// Returns `true` if `action` is permitted from `from`.
pub fn can_transition(from: CampaignStatus, action: CampaignAction) -> bool {
    TRANSITIONS
        .iter()
        .any(|t| t.from == from && t.action == action)
}

/// Resolve the status `action` leads to from `from`, or an
/// `InvalidTransition` error.
pub fn next_status(from: CampaignStatus, action: CampaignAction) -> PortalResult<CampaignStatus> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.action == action)
        .map(|t| t.to)
        .ok_or_else(|| PortalError::invalid_transition(from, action.as_str()))
}
