use desk_shell::relay::{RelayConfig, relay_routes};

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let config = RelayConfig::from_env()?;
    let addr = std::env::var("RELAY_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let route_path = config.route_path().to_string();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, path = %route_path, "Token exchange relay listening");

    axum::serve(listener, relay_routes(config))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down relay");
        })
        .await?;

    Ok(())
}
