//! Campaign admin backend — campaigns, localized assets, audience sizing,
//! send batches and the audit trail.
//!
//! Provides the REST API behind the admin portal UI. Data is held in DashMap;
//! email delivery is delegated to the notification engine.

pub mod audience;
pub mod auth;
pub mod contacts;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod progress;
pub mod router;
pub mod store;
pub mod validation;

pub use auth::{AdminIdentity, SessionAuth};
pub use contacts::ContactDirectory;
pub use handlers::ManagementState;
pub use router::management_router;
pub use store::CampaignStore;
