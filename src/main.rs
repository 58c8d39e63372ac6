use std::net::TcpListener;

use blogicum::{init_db, make_router, run_app, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

async fn start() -> blogicum::Result<()> {
    let config = Config::from_env()?;
    let db = init_db(&config.database_url).await?;
    let listener = TcpListener::bind(config.socket_addr()?)?;
    run_app(make_router(), listener, db, config).await
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blogicum=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match start().await {
        Ok(_) => (),
        Err(error) => tracing::error!("Error: {:#}", error),
    }
}
