//! Notification engine transport.

use async_trait::async_trait;
use portal_core::config::NotificationEngineConfig;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Notification engine misconfigured: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMethod {
    Get,
    Post,
    Put,
}

impl From<EngineMethod> for reqwest::Method {
    fn from(method: EngineMethod) -> Self {
        match method {
            EngineMethod::Get => reqwest::Method::GET,
            EngineMethod::Post => reqwest::Method::POST,
            EngineMethod::Put => reqwest::Method::PUT,
        }
    }
}

/// One outbound request to the engine.
#[derive(Debug, Clone)]
pub struct EngineCall {
    pub method: EngineMethod,
    /// Path relative to the engine base URL, starting with `/`.
    pub path: String,
    pub payload: Option<serde_json::Value>,
    /// Email of the admin on whose behalf the call is made.
    pub actor: Option<String>,
    pub idempotency_key: Option<String>,
}

impl EngineCall {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: EngineMethod::Get,
            path: path.into(),
            payload: None,
            actor: None,
            idempotency_key: None,
        }
    }

    pub fn post(path: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            method: EngineMethod::Post,
            path: path.into(),
            payload: Some(payload),
            actor: None,
            idempotency_key: None,
        }
    }

    pub fn put(path: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            method: EngineMethod::Put,
            path: path.into(),
            payload: Some(payload),
            actor: None,
            idempotency_key: None,
        }
    }

    pub fn acting_as(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// The engine's answer, whatever its status. Non-JSON bodies are wrapped as
/// `{"message": "<text>"}`; an empty body is `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineReply {
    pub status: u16,
    pub body: serde_json::Value,
}

impl EngineReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Narrow seam to the external notification engine.
#[async_trait]
pub trait NotificationEngine: Send + Sync {
    async fn send(&self, call: EngineCall) -> Result<EngineReply, NotifierError>;
}

/// reqwest-backed engine client authenticating with an API key header.
pub struct HttpNotificationEngine {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpNotificationEngine {
    pub fn new(config: &NotificationEngineConfig) -> Result<Self, NotifierError> {
        if config.base_url.trim().is_empty() {
            return Err(NotifierError::Config("base_url must not be empty".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl NotificationEngine for HttpNotificationEngine {
    async fn send(&self, call: EngineCall) -> Result<EngineReply, NotifierError> {
        let url = format!("{}{}", self.base_url, call.path);
        debug!(method = ?call.method, url = %url, "Calling notification engine");

        let mut request = self
            .client
            .request(call.method.into(), &url)
            .header("x-api-key", &self.api_key);
        if let Some(actor) = &call.actor {
            request = request.header("x-admin-email", actor);
        }
        if let Some(key) = &call.idempotency_key {
            request = request.header("idempotency-key", key);
        }
        if let Some(payload) = &call.payload {
            request = request.json(payload);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::json!({ "message": String::from_utf8_lossy(&bytes) })
            })
        };

        Ok(EngineReply { status, body })
    }
}
