use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use progdealer_server::config::Config;
use progdealer_server::notify::ResendMailer;
use progdealer_server::routes::create_routes;
use progdealer_server::store::PgStore;
use progdealer_server::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await?;

    tracing::info!("Successfully connected to database");

    sqlx::migrate!().run(&pool).await?;

    tracing::info!("Migrations run successfully");

    if config.resend_api_key.is_none() {
        tracing::warn!("RESEND_API_KEY not set, outgoing email is disabled");
    }

    let addr = config.socket_addr().await?;
    let mailer = ResendMailer::new(&config);
    let state = AppState::new(Arc::new(PgStore::new(pool)), Arc::new(mailer), config);
    let app = create_routes(state);

    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
