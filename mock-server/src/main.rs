use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use automation_mock::{shared, Store};

const DEMO_USER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let user_id = std::env::var("AUTOMATION_USER_ID").unwrap_or_else(|_| DEMO_USER_ID.to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, %user_id, "mock automation API listening");
    automation_mock::run(listener, shared(Store::demo(&user_id))).await
}
