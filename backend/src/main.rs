use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geoattend_backend::{
    config::Config,
    db::connection::{create_pool, DbPool},
    routes::app_router,
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geoattend_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        jwt_secret = %mask_secret(&config.jwt_secret),
        geofence_radius_meters = config.geofence_radius_meters,
        session_code_ttl_minutes = config.session_code_ttl_minutes,
        ip_intel_base_url = %config.ip_intel_base_url,
        ip_intel_api_key = %mask_secret(config.ip_intel_api_key.as_deref().unwrap_or_default()),
        ip_intel_failure_policy = ?config.ip_intel_failure_policy,
        ip_location_check_enabled = config.ip_location_check_enabled,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(pool.as_ref()).await?;

    let addr = config.bind_addr;
    let state = AppState::from_pool(&pool, config)?;
    let app = app_router(state);

    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
