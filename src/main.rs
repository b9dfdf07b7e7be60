use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tower_http::cors::CorsLayer;

use swift2me::config::ServerConfig;
use swift2me::onboarding::{OnboardingManager, OnboardingRouteState, onboarding_routes};
use swift2me::store::{LibSqlStore, SessionStore};

/// How often abandoned signups are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;

    eprintln!("🛵 Swift2Me v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Signup API: http://0.0.0.0:{}/api/signup", config.port);
    eprintln!("   Session API: http://0.0.0.0:{}/api/session", config.port);
    eprintln!("   Login API: http://0.0.0.0:{}/api/login", config.port);
    eprintln!("   Cities: {}", config.wizard.cities.join(", "));

    // ── Accounts + session store ─────────────────────────────────────────
    let store = Arc::new(LibSqlStore::new_local(&config.db_path).await?);
    eprintln!("   Database: {}", config.db_path.display());

    match store.load().await? {
        Some(profile) => eprintln!(
            "   Session: {} signed in as {} (wizard skipped)",
            profile.email, profile.role
        ),
        None => eprintln!("   Session: none (signup or login required)"),
    }

    // ── HTTP ─────────────────────────────────────────────────────────────
    let manager = Arc::new(
        OnboardingManager::new(store.clone(), store, config.wizard)
            .with_signup_ttl(TimeDelta::seconds(i64::from(config.signup_ttl_secs))),
    );

    let sweeper = Arc::clone(&manager);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            sweeper.expire_stale().await;
        }
    });
    eprintln!("   Abandoned signups expire after {}s\n", config.signup_ttl_secs);

    let app = onboarding_routes(OnboardingRouteState { manager }).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Onboarding server started");
    axum::serve(listener, app).await?;

    Ok(())
}
