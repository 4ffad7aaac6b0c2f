use std::sync::Arc;
use tracing::info;

use zkb_report::server::router;
use zkb_report::{Config, FileStorage, KillboardClient, MemoryStorage, Reporter, ResponseCache, Storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "zkb_report=info,tower_http=debug");
    }

    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    info!("Statistics API: {}", config.statistics_api_base);
    info!("Game-data API: {}", config.game_data_api_base);

    let storage: Arc<dyn Storage> = match &config.cache_file {
        Some(path) => {
            info!("Caching game data in {}", path.display());
            Arc::new(FileStorage::open(path))
        }
        None => {
            info!("Caching game data in memory");
            Arc::new(MemoryStorage::new())
        }
    };

    let addr = format!("{}:{}", config.host, config.port);
    let client = KillboardClient::new(config, ResponseCache::new(storage))?;
    let app = router(Reporter::new(client));

    info!("Killboard report running on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
