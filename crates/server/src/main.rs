use db::DBService;
use server::{AppState, config::ServerConfig, routes};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env()?;
    let db = DBService::new(&config.database_url).await?;
    let app = routes::router(AppState::new(db, config.unknown_fields));

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(
        address = %listener.local_addr()?,
        unknown_fields = %config.unknown_fields,
        "Server listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
