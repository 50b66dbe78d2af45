use std::sync::Arc;

use axum::{routing::get, Router};
use mundo_headlines::config::Config;
use mundo_headlines::db::Database;
use mundo_headlines::ingestor::Ingestor;
use mundo_headlines::routes::{self, AppState};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mundo_headlines=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load("headlines.toml")?;
    info!(
        "Loaded configuration: feed {}, {} keyword patterns",
        config.feed_url,
        config.keywords.len()
    );

    // Initialize database
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database_url.clone());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    info!("Database initialized");

    let state = Arc::new(AppState {
        db: Arc::new(db),
        ingestor: Arc::new(Ingestor::new(&config)?),
        max_items: config.max_items,
        max_news: config.max_news,
    });

    // Build router
    let app = Router::new()
        .route("/", get(routes::index))
        .route("/scrape", get(routes::scrape))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str()).await?;
    info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
