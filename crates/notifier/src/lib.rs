//! Client side of the external notification engine — the service that
//! performs email delivery, batching and pacing.
//!
//! Handlers talk to [`NotificationProxy`], which shapes requests and maps
//! replies onto the portal error taxonomy. The transport sits behind the
//! [`NotificationEngine`] trait so it can be swapped or faked in tests.

pub mod engine;
pub mod models;
pub mod proxy;

pub use engine::{
    EngineCall, EngineMethod, EngineReply, HttpNotificationEngine, NotificationEngine,
    NotifierError,
};
pub use models::{BatchOutcome, MailMarketingConfig};
pub use proxy::{CampaignSendReply, NotificationProxy};
