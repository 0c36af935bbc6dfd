use serde::Deserialize;

use crate::error::{PortalError, PortalResult};

/// Signing secret used when none is configured. Only fit for local development.
pub const DEV_SESSION_SECRET: &str = "admin-portal-dev-secret";

/// Root application configuration. Loaded from environment variables
/// with the prefix `ADMIN_PORTAL__`, falling back to defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub notification_engine: NotificationEngineConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Populate the in-memory store with sample campaigns and contacts.
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Connection settings for the external notification engine.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationEngineConfig {
    #[serde(default = "default_engine_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_engine_timeout_ms")]
    pub timeout_ms: u64,
}

/// Session verification settings. Tokens are issued by the OAuth login flow
/// and signed with `session_secret`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_secret")]
    pub session_secret: String,
    /// Email domains whose holders may use the portal, e.g. `["acme.io"]`.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

// Default functions
fn default_seed_demo_data() -> bool {
    true
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_engine_base_url() -> String {
    "http://localhost:8090".to_string()
}
fn default_engine_timeout_ms() -> u64 {
    10_000
}
fn default_session_secret() -> String {
    DEV_SESSION_SECRET.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for NotificationEngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_engine_base_url(),
            api_key: String::new(),
            timeout_ms: default_engine_timeout_ms(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: default_session_secret(),
            allowed_domains: Vec::new(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            notification_engine: NotificationEngineConfig::default(),
            auth: AuthConfig::default(),
            seed_demo_data: default_seed_demo_data(),
        }
    }
}

impl AuthConfig {
    /// Whether `email` belongs to one of the allowed domains (case-insensitive).
    pub fn is_allowed_email(&self, email: &str) -> bool {
        let Some((local, domain)) = email.rsplit_once('@') else {
            return false;
        };
        !local.is_empty()
            && self
                .allowed_domains
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(domain))
    }
}

impl AuthConfig {
    /// True when sessions would be signed with a blank or well-known secret.
    pub fn uses_dev_secret(&self) -> bool {
        let secret = self.session_secret.trim();
        secret.is_empty() || secret == DEV_SESSION_SECRET
    }
}

impl AppConfig {
    /// Reject settings that cannot be served safely. Admitting any domain
    /// while signing with the development secret would let anyone mint a
    /// valid session.
    pub fn validate(&self) -> PortalResult<()> {
        if !self.auth.allowed_domains.is_empty() && self.auth.uses_dev_secret() {
            return Err(PortalError::validation(
                "auth.session_secret",
                "must be set to a private value when auth.allowed_domains is configured",
            ));
        }
        Ok(())
    }

    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("ADMIN_PORTAL")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("auth.allowed_domains"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
