//! Admin Portal — backend for the email-campaign admin UI.
//!
//! Main entry point that wires the stores, the notification engine client and
//! session auth, then starts the server.

use clap::Parser;
use portal_api::ApiServer;
use portal_core::config::AppConfig;
use portal_management::{CampaignStore, ContactDirectory, ManagementState, SessionAuth};
use portal_notifier::{HttpNotificationEngine, NotificationProxy};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "admin-portal")]
#[command(about = "Admin backend for email marketing campaigns")]
#[command(version)]
struct Cli {
    /// Bind address (overrides config)
    #[arg(long, env = "ADMIN_PORTAL__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "ADMIN_PORTAL__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Prometheus exporter port (overrides config)
    #[arg(long, env = "ADMIN_PORTAL__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Start with empty stores instead of demo campaigns and contacts
    #[arg(long, default_value_t = false)]
    no_demo_data: bool,

    /// Print a session token for this email and exit (local development)
    #[arg(long, value_name = "EMAIL")]
    issue_dev_token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admin_portal=info,portal_management=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if cli.no_demo_data {
        config.seed_demo_data = false;
    }

    if let Some(email) = cli.issue_dev_token {
        if config.auth.uses_dev_secret() {
            warn!("Signing with the development session secret; set ADMIN_PORTAL__AUTH__SESSION_SECRET for shared deployments");
        }
        let token = SessionAuth::new(config.auth.clone()).issue_token(&email, chrono::Duration::hours(8))?;
        println!("{token}");
        return Ok(());
    }

    if let Err(e) = config.validate() {
        error!(error = ?e, "Refusing to start with unsafe configuration");
        return Err(e.into());
    }

    info!("Admin Portal starting up");
    info!(
        host = %config.api.host,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        engine = %config.notification_engine.base_url,
        allowed_domains = ?config.auth.allowed_domains,
        "Configuration loaded"
    );

    let (store, contacts) = if config.seed_demo_data {
        (CampaignStore::with_demo_data(), ContactDirectory::with_demo_data())
    } else {
        (CampaignStore::new(), ContactDirectory::new())
    };

    let engine = HttpNotificationEngine::new(&config.notification_engine)?;
    let state = ManagementState::new(
        Arc::new(store),
        Arc::new(contacts),
        NotificationProxy::new(Arc::new(engine)),
    );

    let api_server = ApiServer::new(config, state);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Admin Portal is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
