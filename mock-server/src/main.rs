use mock_server::MockConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let pending_polls = std::env::var("MOCK_PENDING_POLLS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2);
    let config = MockConfig {
        pending_polls,
        api_key: std::env::var("URLSCAN_API_KEY").ok(),
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, pending_polls, "mock scan service listening");
    mock_server::run(listener, config).await
}
