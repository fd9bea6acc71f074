//! License Manager
//!
//! Serves the redemption API, the admin API and the chat bridge.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use license_manager::{
    routes, AppState, Config, ConsoleNotifier, Conversation, InMemorySessionStore,
    InMemoryTokenStore, LicenseEngine, Notifier, SmtpNotifier, SqliteStore, TokenStore,
};

/// How often idle chat sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "license_manager=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(?config, "Loaded configuration");

    let notifier: Box<dyn Notifier> = match config.smtp.clone() {
        Some(smtp) => match SmtpNotifier::new(smtp) {
            Ok(notifier) => Box::new(notifier),
            Err(e) => {
                tracing::warn!(error = %e, "SMTP unavailable, falling back to console");
                Box::new(ConsoleNotifier::new())
            }
        },
        None => Box::new(ConsoleNotifier::new()),
    };

    match config.database_path.as_deref() {
        Some(path) => {
            tracing::info!(path, "Using SQLite token store");
            serve(&config, SqliteStore::open(path)?, notifier).await
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, tokens will not survive a restart");
            serve(&config, InMemoryTokenStore::new(), notifier).await
        }
    }
}

async fn serve<S>(config: &Config, store: S, notifier: Box<dyn Notifier>) -> Result<()>
where
    S: TokenStore + 'static,
{
    let engine = Arc::new(
        LicenseEngine::new(store)
            .with_policy(config.expiry_policy)
            .with_renewal_anchor(config.renewal_anchor),
    );
    let conversation = Conversation::new(engine.clone(), InMemorySessionStore::new(), notifier)
        .with_session_ttl(chrono::Duration::minutes(config.session_ttl_minutes));

    let state = Arc::new(AppState::new(
        engine,
        conversation,
        config.admin_api_key.clone(),
    ));

    // Sweep idle chat sessions
    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.conversation.purge_stale_sessions();
        }
    });

    let app = routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("License manager listening on http://{}", addr);
    if config.admin_api_key.is_none() {
        tracing::warn!("ADMIN_API_KEY not set, admin routes are open");
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
